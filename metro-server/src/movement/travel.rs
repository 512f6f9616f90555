//! Scheduled travel times between adjacent stops.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;

use crate::domain::TravelTime;

/// Immutable time matrix keyed by `(origin name, destination name)`.
///
/// Lookups are directional; `(A, B)` says nothing about `(B, A)`.
#[derive(Debug, Clone, Default)]
pub struct TravelTimes {
    minutes: HashMap<(String, String), u32>,
}

impl TravelTimes {
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = TravelTime>,
    {
        let minutes = rows
            .into_iter()
            .map(|r| ((r.origin, r.destination), r.minutes))
            .collect();
        Self { minutes }
    }

    pub fn minutes(&self, origin: &str, destination: &str) -> Option<u32> {
        self.minutes
            .get(&(origin.to_string(), destination.to_string()))
            .copied()
    }

    /// Scheduled time for the hop, if the matrix has it.
    pub fn scheduled(&self, origin: &str, destination: &str) -> Option<Duration> {
        self.minutes(origin, destination)
            .map(|m| Duration::from_secs(u64::from(m) * 60))
    }

    pub fn len(&self) -> usize {
        self.minutes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.minutes.is_empty()
    }
}

/// Scale `base` by a random factor in `[1 - fraction, 1 + fraction]`.
///
/// A fraction of zero (or less) returns `base` unchanged.
pub fn apply_jitter<R: Rng + ?Sized>(base: Duration, fraction: f64, rng: &mut R) -> Duration {
    if fraction <= 0.0 || !fraction.is_finite() {
        return base;
    }
    let fraction = fraction.min(1.0);
    let factor = rng.gen_range((1.0 - fraction)..=(1.0 + fraction));
    base.mul_f64(factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn lookups_are_directional() {
        let times = TravelTimes::from_rows([
            TravelTime::new("Gombak", "Taman Melati", 3),
            TravelTime::new("Taman Melati", "Gombak", 2),
        ]);

        assert_eq!(
            times.scheduled("Gombak", "Taman Melati"),
            Some(Duration::from_secs(180))
        );
        assert_eq!(times.minutes("Taman Melati", "Gombak"), Some(2));
        assert_eq!(times.minutes("Gombak", "KLCC"), None);
        assert_eq!(times.len(), 2);
    }

    #[test]
    fn zero_jitter_is_identity() {
        let mut rng = StdRng::seed_from_u64(1);
        let base = Duration::from_secs(120);
        assert_eq!(apply_jitter(base, 0.0, &mut rng), base);
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let base = Duration::from_secs(180);
        for _ in 0..1000 {
            let t = apply_jitter(base, 0.10, &mut rng);
            assert!(t >= Duration::from_millis(161_900) && t <= Duration::from_millis(198_100));
        }
    }
}
