//! Domain error types.
//!
//! These errors represent validation failures in the domain layer. They
//! are distinct from storage and query errors, which carry an
//! [`ErrorKind`] for API callers.

use serde::Serialize;

use super::LineId;

/// Domain-level errors for validation and data consistency.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// A line sequence needs somewhere to move to
    #[error("line {0} must have at least 2 stations")]
    SequenceTooShort(LineId),

    /// A station name appears twice in one sequence
    #[error("station {station} appears more than once on line {line}")]
    DuplicateStation { line: LineId, station: String },

    /// Unrecognised direction text
    #[error("invalid direction: {0:?}")]
    InvalidDirection(String),
}

/// The error categories visible to API callers.
///
/// Every query or movement error maps to exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    UnknownStation,
    UnknownLine,
    StationNotOnLine,
    NoRouteFound,
    NoFareFound,
    TrainNotFound,
    #[serde(rename = "TopologyIOError")]
    TopologyIo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = DomainError::SequenceTooShort(LineId::from("KJL"));
        assert_eq!(err.to_string(), "line KJL must have at least 2 stations");

        let err = DomainError::DuplicateStation {
            line: LineId::from("KJL"),
            station: "KLCC".into(),
        };
        assert_eq!(
            err.to_string(),
            "station KLCC appears more than once on line KJL"
        );

        let err = DomainError::InvalidDirection("up".into());
        assert_eq!(err.to_string(), "invalid direction: \"up\"");
    }

    #[test]
    fn kind_serializes_by_name() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::NoRouteFound).unwrap(),
            "\"NoRouteFound\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorKind::TopologyIo).unwrap(),
            "\"TopologyIOError\""
        );
    }
}
