use std::fmt;
use std::str::FromStr;

use crate::error::TraceError;

/// All tracing parameters in one struct.
///
/// Validated once at pipeline entry; the pipeline itself assumes
/// well-formed values.
#[derive(Debug, Clone)]
pub struct TraceParams {
    /// Drop contours whose enclosed area (in pixels) is at most this.
    /// Range 0..=1000. Default: 2.
    pub turdsize: i64,
    /// Tie-break rule at ambiguous diagonal crossings.
    pub turnpolicy: TurnPolicy,
    /// Corner threshold for smoothing. 0 = everything is a corner
    /// (polygonal output), ~1.33 = no corners at all.
    /// Range 0..=1.334. Default: 1.0.
    pub alphamax: f64,
    /// Maximum deviation allowed when merging consecutive curve
    /// segments. 0 disables the optimization stage entirely.
    /// Range 0..=5. Default: 0.2.
    pub opttolerance: f64,
}

impl Default for TraceParams {
    fn default() -> Self {
        Self {
            turdsize: 2,
            turnpolicy: TurnPolicy::Minority,
            alphamax: 1.0,
            opttolerance: 0.2,
        }
    }
}

impl TraceParams {
    /// Check all parameters against their documented ranges.
    pub fn validate(&self) -> Result<(), TraceError> {
        if !(0..=1000).contains(&self.turdsize) {
            return Err(TraceError::InvalidParameter(format!(
                "turdsize must be in 0..=1000, got {}",
                self.turdsize
            )));
        }
        if !self.alphamax.is_finite() || !(0.0..=1.334).contains(&self.alphamax) {
            return Err(TraceError::InvalidParameter(format!(
                "alphamax must be in 0..=1.334, got {}",
                self.alphamax
            )));
        }
        if !self.opttolerance.is_finite() || !(0.0..=5.0).contains(&self.opttolerance) {
            return Err(TraceError::InvalidParameter(format!(
                "opttolerance must be in 0..=5, got {}",
                self.opttolerance
            )));
        }
        Ok(())
    }
}

/// Rule for resolving ambiguous diagonal crossings, where two equally
/// valid continuations of a contour exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnPolicy {
    /// Prefer the turn that keeps foreground connected.
    Black,
    /// Prefer the turn that keeps background connected.
    White,
    /// Always turn left.
    Left,
    /// Always turn right.
    Right,
    /// Turn towards the locally less common pixel color.
    #[default]
    Minority,
    /// Turn towards the locally more common pixel color.
    Majority,
    /// Decide by a deterministic pseudo-random coin flip.
    Random,
}

impl fmt::Display for TurnPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnPolicy::Black => "black",
            TurnPolicy::White => "white",
            TurnPolicy::Left => "left",
            TurnPolicy::Right => "right",
            TurnPolicy::Minority => "minority",
            TurnPolicy::Majority => "majority",
            TurnPolicy::Random => "random",
        };
        f.write_str(name)
    }
}

impl FromStr for TurnPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "black" => Ok(TurnPolicy::Black),
            "white" => Ok(TurnPolicy::White),
            "left" => Ok(TurnPolicy::Left),
            "right" => Ok(TurnPolicy::Right),
            "minority" => Ok(TurnPolicy::Minority),
            "majority" => Ok(TurnPolicy::Majority),
            "random" => Ok(TurnPolicy::Random),
            other => Err(format!(
                "unknown turn policy '{other}' (expected one of: black, white, left, right, minority, majority, random)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        TraceParams::default().validate().unwrap();
    }

    #[test]
    fn out_of_range_turdsize_is_rejected() {
        let params = TraceParams {
            turdsize: 1001,
            ..TraceParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn nan_tolerance_is_rejected() {
        let params = TraceParams {
            opttolerance: f64::NAN,
            ..TraceParams::default()
        };
        assert!(params.validate().is_err());

        let params = TraceParams {
            alphamax: f64::NAN,
            ..TraceParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn turn_policy_round_trips_through_str() {
        for policy in [
            TurnPolicy::Black,
            TurnPolicy::White,
            TurnPolicy::Left,
            TurnPolicy::Right,
            TurnPolicy::Minority,
            TurnPolicy::Majority,
            TurnPolicy::Random,
        ] {
            assert_eq!(policy.to_string().parse::<TurnPolicy>().unwrap(), policy);
        }
    }
}
