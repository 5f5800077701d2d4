use serde::{Deserialize, Serialize};

use crate::error::{Result, TeleopError};

/// The speeds the vehicle's motor driver understands.
pub const DEFAULT_SPEED_LEVELS: [u16; 6] = [40, 80, 120, 160, 200, 255];

/// Snaps `raw` to the member of `allowed` closest to it.
///
/// `allowed` is expected to be ascending. On an exact tie the lower level wins,
/// since only a strictly smaller difference replaces the current candidate.
/// Returns `None` only when `allowed` is empty.
pub fn quantize(raw: f64, allowed: &[u16]) -> Option<u16> {
    let mut levels = allowed.iter().copied();
    let mut best = levels.next()?;
    let mut best_delta = (f64::from(best) - raw).abs();

    for level in levels {
        let delta = (f64::from(level) - raw).abs();
        if delta < best_delta {
            best = level;
            best_delta = delta;
        }
    }
    Some(best)
}

/// A non-empty, strictly increasing set of discrete levels.
///
/// Used for both motor speed and steering servo angles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u16>", into = "Vec<u16>")]
pub struct LevelSet {
    levels: Vec<u16>,
}

impl LevelSet {
    pub fn new(levels: Vec<u16>) -> Result<LevelSet> {
        if levels.is_empty() {
            return Err(TeleopError::Config("level set cannot be empty".into()));
        }
        if levels.windows(2).any(|w| w[0] >= w[1]) {
            return Err(TeleopError::Config(format!(
                "levels must be strictly increasing, got {:?}",
                levels
            )));
        }
        Ok(LevelSet { levels })
    }

    /// `0, step, 2*step, ...` up to and including `max` when it lands on the grid.
    pub fn stepped(step: u16, max: u16) -> Result<LevelSet> {
        if step == 0 {
            return Err(TeleopError::Config("step must be non-zero".into()));
        }
        Self::new((0..=max).step_by(step as usize).collect())
    }

    pub fn speeds() -> LevelSet {
        LevelSet {
            levels: DEFAULT_SPEED_LEVELS.to_vec(),
        }
    }

    pub fn quantize(&self, raw: f64) -> u16 {
        // Construction guarantees at least one level.
        quantize(raw, &self.levels).unwrap_or(self.levels[0])
    }

    pub fn contains(&self, level: u16) -> bool {
        self.levels.binary_search(&level).is_ok()
    }

    pub fn min(&self) -> u16 {
        self.levels[0]
    }

    pub fn max(&self) -> u16 {
        self.levels[self.levels.len() - 1]
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.levels
    }
}

impl TryFrom<Vec<u16>> for LevelSet {
    type Error = TeleopError;

    fn try_from(levels: Vec<u16>) -> Result<Self> {
        LevelSet::new(levels)
    }
}

impl From<LevelSet> for Vec<u16> {
    fn from(set: LevelSet) -> Self {
        set.levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(100.0, 80)]
    #[case(101.0, 120)]
    #[case(0.0, 40)]
    #[case(-500.0, 40)]
    #[case(227.5, 200)]
    #[case(228.0, 255)]
    #[case(9000.0, 255)]
    #[case(160.0, 160)]
    fn snaps_to_nearest_speed(#[case] raw: f64, #[case] expected: u16) {
        assert_eq!(quantize(raw, &DEFAULT_SPEED_LEVELS), Some(expected));
    }

    #[test]
    fn result_is_always_a_member_and_never_farther_than_any_level() {
        let mut raw = -50.0;
        while raw < 320.0 {
            let q = quantize(raw, &DEFAULT_SPEED_LEVELS).unwrap();
            assert!(DEFAULT_SPEED_LEVELS.contains(&q));
            for s in DEFAULT_SPEED_LEVELS {
                assert!((f64::from(q) - raw).abs() <= (f64::from(s) - raw).abs());
            }
            raw += 0.25;
        }
    }

    #[test]
    fn empty_set_has_no_level() {
        assert_eq!(quantize(12.0, &[]), None);
    }

    #[test]
    fn rejects_unordered_levels() {
        assert!(LevelSet::new(vec![]).is_err());
        assert!(LevelSet::new(vec![40, 40, 80]).is_err());
        assert!(LevelSet::new(vec![80, 40]).is_err());
        assert!(LevelSet::stepped(0, 180).is_err());
    }

    #[rstest]
    #[case(0.0, 0)]
    #[case(10.0, 0)]
    #[case(11.0, 20)]
    #[case(95.0, 100)]
    #[case(179.0, 180)]
    #[case(400.0, 180)]
    #[case(-30.0, 0)]
    fn steering_snaps_to_twenty_degrees(#[case] raw: f64, #[case] expected: u16) {
        let steering = LevelSet::stepped(20, 180).unwrap();
        assert_eq!(steering.as_slice().len(), 10);
        assert_eq!(steering.quantize(raw), expected);
    }
}
