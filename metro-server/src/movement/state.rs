//! Per-train movement state and the step rule.
//!
//! A train walks its line's sequence one stop per advance. At either end it
//! turns around in the same step that would otherwise leave the sequence:
//!
//! | direction | position        | next index | direction after |
//! |-----------|-----------------|------------|-----------------|
//! | Forward   | `< last`        | `i + 1`    | Forward         |
//! | Forward   | `== last`       | `i - 1`    | Backward        |
//! | Backward  | `> 0`           | `i - 1`    | Backward        |
//! | Backward  | `== 0`          | `i + 1`    | Forward         |

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{Direction, LineId, TrainId};

/// Where a train is on its line and which way it is heading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainState {
    pub train_id: TrainId,
    pub line_id: LineId,

    /// Index into the line's station sequence. Always in range.
    pub position_index: usize,

    pub direction: Direction,
    pub last_update: DateTime<Utc>,

    /// Number of reversals since initialization.
    pub direction_change_count: u32,
}

/// The outcome of one step, before it is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub from_index: usize,
    pub to_index: usize,
    pub direction: Direction,

    /// The train turned around at a terminus.
    pub reversed: bool,
}

impl TrainState {
    pub fn new(
        train_id: TrainId,
        line_id: LineId,
        position_index: usize,
        direction: Direction,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            train_id,
            line_id,
            position_index,
            direction,
            last_update: now,
            direction_change_count: 0,
        }
    }

    /// Compute the next step on a sequence of `len` stations.
    ///
    /// `len` must be at least 2, which [`crate::domain::LineSequence`]
    /// guarantees.
    pub fn next_step(&self, len: usize) -> Step {
        let last = len.saturating_sub(1);
        let from_index = self.position_index.min(last);

        let (to_index, direction) = match self.direction {
            Direction::Forward if from_index < last => (from_index + 1, self.direction),
            Direction::Backward if from_index > 0 => (from_index - 1, self.direction),
            // At a terminus: bounce back the way we came
            Direction::Forward => (from_index.saturating_sub(1), self.direction.reversed()),
            Direction::Backward => ((from_index + 1).min(last), self.direction.reversed()),
        };

        Step {
            from_index,
            to_index,
            direction,
            reversed: direction != self.direction,
        }
    }

    pub fn apply(&mut self, step: &Step, at: DateTime<Utc>) {
        self.position_index = step.to_index;
        self.direction = step.direction;
        if step.reversed {
            self.direction_change_count += 1;
        }
        self.last_update = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(index: usize, direction: Direction) -> TrainState {
        TrainState::new(TrainId(1), LineId::from("L"), index, direction, Utc::now())
    }

    #[test]
    fn forward_mid_line() {
        let step = state(1, Direction::Forward).next_step(3);
        assert_eq!(step.to_index, 2);
        assert_eq!(step.direction, Direction::Forward);
        assert!(!step.reversed);
    }

    #[test]
    fn forward_at_terminus_reverses() {
        let step = state(2, Direction::Forward).next_step(3);
        assert_eq!(step.to_index, 1);
        assert_eq!(step.direction, Direction::Backward);
        assert!(step.reversed);
    }

    #[test]
    fn backward_mid_line() {
        let step = state(2, Direction::Backward).next_step(3);
        assert_eq!(step.to_index, 1);
        assert!(!step.reversed);
    }

    #[test]
    fn backward_at_origin_reverses() {
        let step = state(0, Direction::Backward).next_step(3);
        assert_eq!(step.to_index, 1);
        assert_eq!(step.direction, Direction::Forward);
        assert!(step.reversed);
    }

    #[test]
    fn two_station_shuttle() {
        let mut s = state(0, Direction::Forward);
        let mut visited = Vec::new();
        for _ in 0..4 {
            let step = s.next_step(2);
            s.apply(&step, Utc::now());
            visited.push(s.position_index);
        }
        assert_eq!(visited, vec![1, 0, 1, 0]);
        assert_eq!(s.direction_change_count, 3);
    }

    /// A, B, C starting at A heading forward.
    #[test]
    fn three_station_walk() {
        let mut s = state(0, Direction::Forward);
        let expected = [
            (1, Direction::Forward, 0),
            (2, Direction::Forward, 0),
            (1, Direction::Backward, 1),
            (0, Direction::Backward, 1),
            (1, Direction::Forward, 2),
        ];
        for (index, direction, changes) in expected {
            let step = s.next_step(3);
            s.apply(&step, Utc::now());
            assert_eq!(s.position_index, index);
            assert_eq!(s.direction, direction);
            assert_eq!(s.direction_change_count, changes);
        }
    }

    #[test]
    fn apply_updates_timestamp() {
        let mut s = state(0, Direction::Forward);
        let later = s.last_update + chrono::Duration::seconds(5);
        let step = s.next_step(3);
        s.apply(&step, later);
        assert_eq!(s.last_update, later);
    }
}
