//! Static line topology.
//!
//! Each line is an ordered sequence of station names describing the
//! physical order of stops. This is separate from the fare graph: movement
//! reads line sequences, routing reads fare rows.
//!
//! Interchanges are not shared between lines here. A stop served by two
//! lines appears under two names (e.g. "Pasar Seni (KJL)" and
//! "Pasar Seni (SBK)") and is only linked across lines by fare rows.

use std::collections::HashMap;

use crate::domain::{DomainError, ErrorKind, LineId, LineSequence};

/// Errors from line lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineError {
    #[error("unknown line: {0}")]
    UnknownLine(LineId),

    #[error("station {station} is not on line {line}")]
    StationNotOnLine { station: String, line: LineId },

    #[error("line {0} is defined more than once")]
    DuplicateLine(LineId),

    #[error(transparent)]
    Invalid(#[from] DomainError),
}

impl LineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LineError::StationNotOnLine { .. } => ErrorKind::StationNotOnLine,
            _ => ErrorKind::UnknownLine,
        }
    }
}

/// Where a station sits in the line table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub line_id: LineId,
    pub index: usize,

    /// More than one line carries a station with this exact name.
    /// The first line in declaration order is reported.
    pub ambiguous: bool,
}

/// Immutable lookup from line id to its stop sequence.
#[derive(Debug, Clone, Default)]
pub struct LineTable {
    lines: Vec<LineSequence>,
    by_id: HashMap<LineId, usize>,
}

impl LineTable {
    /// Build a table, rejecting repeated line ids.
    ///
    /// Declaration order is kept and decides [`LineTable::locate`] ties.
    pub fn new(lines: Vec<LineSequence>) -> Result<Self, LineError> {
        let mut by_id = HashMap::with_capacity(lines.len());
        for (idx, line) in lines.iter().enumerate() {
            if by_id.insert(line.line_id().clone(), idx).is_some() {
                return Err(LineError::DuplicateLine(line.line_id().clone()));
            }
        }
        Ok(Self { lines, by_id })
    }

    /// Build from raw `(line, stations)` pairs, validating each sequence.
    pub fn from_definitions<I>(defs: I) -> Result<Self, LineError>
    where
        I: IntoIterator<Item = (LineId, Vec<String>)>,
    {
        let lines = defs
            .into_iter()
            .map(|(id, stations)| LineSequence::new(id, stations))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(lines)
    }

    pub fn sequence_for(&self, line_id: &LineId) -> Result<&LineSequence, LineError> {
        self.by_id
            .get(line_id)
            .map(|&idx| &self.lines[idx])
            .ok_or_else(|| LineError::UnknownLine(line_id.clone()))
    }

    /// Find the first line carrying `station_name`.
    pub fn locate(&self, station_name: &str) -> Option<Location> {
        let mut hits = self
            .lines
            .iter()
            .filter_map(|line| line.position(station_name).map(|idx| (line, idx)));

        let (line, index) = hits.next()?;
        Some(Location {
            line_id: line.line_id().clone(),
            index,
            ambiguous: hits.next().is_some(),
        })
    }

    /// Index of `station_name` on a specific line.
    pub fn index_on(&self, line_id: &LineId, station_name: &str) -> Result<usize, LineError> {
        let sequence = self.sequence_for(line_id)?;
        sequence
            .position(station_name)
            .ok_or_else(|| LineError::StationNotOnLine {
                station: station_name.to_string(),
                line: line_id.clone(),
            })
    }

    pub fn lines(&self) -> impl Iterator<Item = &LineSequence> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(id: &str, stations: &[&str]) -> (LineId, Vec<String>) {
        (
            LineId::from(id),
            stations.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn table() -> LineTable {
        LineTable::from_definitions([
            def("KJL", &["Gombak", "KLCC", "Pasar Seni", "KL Sentral"]),
            def("SBK", &["Pasar Seni", "Merdeka", "Bukit Bintang"]),
            def("AMP", &["Sungai Buloh", "Semantan"]),
        ])
        .unwrap()
    }

    #[test]
    fn sequence_for_known_and_unknown() {
        let t = table();
        assert_eq!(t.sequence_for(&LineId::from("SBK")).unwrap().len(), 3);
        assert_eq!(
            t.sequence_for(&LineId::from("XYZ")).unwrap_err(),
            LineError::UnknownLine(LineId::from("XYZ"))
        );
    }

    #[test]
    fn locate_unique_station() {
        let loc = table().locate("Merdeka").unwrap();
        assert_eq!(loc.line_id, LineId::from("SBK"));
        assert_eq!(loc.index, 1);
        assert!(!loc.ambiguous);
    }

    #[test]
    fn locate_shared_name_picks_first_line_and_flags() {
        let loc = table().locate("Pasar Seni").unwrap();
        assert_eq!(loc.line_id, LineId::from("KJL"));
        assert_eq!(loc.index, 2);
        assert!(loc.ambiguous);
    }

    #[test]
    fn locate_missing_station() {
        assert!(table().locate("Nowhere").is_none());
    }

    #[test]
    fn index_on_specific_line() {
        let t = table();
        assert_eq!(t.index_on(&LineId::from("SBK"), "Pasar Seni").unwrap(), 0);

        let err = t.index_on(&LineId::from("AMP"), "KLCC").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StationNotOnLine);

        let err = t.index_on(&LineId::from("NOPE"), "KLCC").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownLine);
    }

    #[test]
    fn duplicate_line_rejected() {
        let err = LineTable::from_definitions([def("A", &["x", "y"]), def("A", &["p", "q"])])
            .unwrap_err();
        assert_eq!(err, LineError::DuplicateLine(LineId::from("A")));
    }

    #[test]
    fn invalid_sequence_rejected() {
        let err = LineTable::from_definitions([def("A", &["x"])]).unwrap_err();
        assert!(matches!(err, LineError::Invalid(_)));
    }

    #[test]
    fn error_display() {
        let err = LineError::StationNotOnLine {
            station: "KLCC".into(),
            line: LineId::from("AMP"),
        };
        assert_eq!(err.to_string(), "station KLCC is not on line AMP");
        assert_eq!(
            LineError::UnknownLine(LineId::from("X")).to_string(),
            "unknown line: X"
        );
    }
}
