//! Line identifiers and physical stop sequences.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::DomainError;

/// Name of a metro line, e.g. `"LRT Kelana Jaya"`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(String);

impl LineId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LineId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Debug for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LineId({})", self.0)
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The ordered stops of one line, in the physical direction of travel.
///
/// Guaranteed by construction to hold at least two stations and no
/// repeated station name, so every index has a neighbour to step to.
///
/// # Examples
///
/// ```
/// use metro_server::domain::{LineId, LineSequence};
///
/// let seq = LineSequence::new(
///     LineId::from("Test"),
///     vec!["A".to_string(), "B".to_string(), "C".to_string()],
/// )
/// .unwrap();
/// assert_eq!(seq.last_index(), 2);
/// assert_eq!(seq.position("B"), Some(1));
///
/// // Too short
/// assert!(LineSequence::new(LineId::from("Stub"), vec!["A".to_string()]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSequence {
    line_id: LineId,
    stations: Vec<String>,
}

impl LineSequence {
    /// Validate and build a sequence.
    pub fn new(line_id: LineId, stations: Vec<String>) -> Result<Self, DomainError> {
        if stations.len() < 2 {
            return Err(DomainError::SequenceTooShort(line_id));
        }

        let mut seen = HashSet::new();
        for name in &stations {
            if !seen.insert(name.as_str()) {
                return Err(DomainError::DuplicateStation {
                    line: line_id,
                    station: name.clone(),
                });
            }
        }

        Ok(Self { line_id, stations })
    }

    pub fn line_id(&self) -> &LineId {
        &self.line_id
    }

    pub fn stations(&self) -> &[String] {
        &self.stations
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.stations.get(index).map(String::as_str)
    }

    /// Index of a station by exact name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.stations.iter().position(|s| s == name)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    /// Never true for a constructed sequence.
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.stations.len() - 1
    }
}
