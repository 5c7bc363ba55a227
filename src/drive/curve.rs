// ==============================================================================
// curve.rs — KEYFRAMED HERMITE CURVE (TORQUE + GRIP LOOKUPS)
// ------------------------------------------------------------------------------
// A curve is an ordered list of keyframes (time, value, in_tangent, out_tangent).
// Between two keys the value is the cubic Hermite blend of both endpoints using
// the stored tangents scaled by the segment width:
//
//     s   = (t - t0) / (t1 - t0)
//     v   = h00(s)*v0 + h10(s)*w*out0 + h01(s)*v1 + h11(s)*w*in1
//
// Outside the key range the value saturates at the nearest endpoint. Evaluation
// never fails; validation happens once when the curve is built.
//
// The same type serves the engine torque curve (normalized rpm -> torque fraction)
// and the tire grip curve (normalized slip -> grip).
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
    #[serde(default)]
    pub in_tangent: f32,
    #[serde(default)]
    pub out_tangent: f32,
}

impl Keyframe {
    pub const fn new(time: f32, value: f32, in_tangent: f32, out_tangent: f32) -> Self {
        Self { time, value, in_tangent, out_tangent }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Keyframe>", into = "Vec<Keyframe>")]
pub struct Curve {
    keys: Vec<Keyframe>,
}

/// Normalized engine rpm [0, 1] -> torque fraction.
pub type TorqueCurve = Curve;
/// Normalized lateral slip [0, 1] -> grip coefficient.
pub type GripCurve = Curve;

impl Curve {
    /// Keys must be non-empty with strictly increasing, finite times.
    pub fn new(keys: Vec<Keyframe>) -> Result<Self, ConfigError> {
        if keys.is_empty() {
            return Err(ConfigError::EmptyCurve);
        }
        for (index, pair) in keys.windows(2).enumerate() {
            if !(pair[1].time > pair[0].time) {
                return Err(ConfigError::UnorderedCurve { index: index + 1, time: pair[1].time });
            }
        }
        if let Some(bad) = keys.iter().position(|k| !k.time.is_finite() || !k.value.is_finite()) {
            return Err(ConfigError::UnorderedCurve { index: bad, time: keys[bad].time });
        }
        Ok(Self { keys })
    }

    /// Additionally requires the keys to span exactly [0, 1].
    pub fn normalized(keys: Vec<Keyframe>) -> Result<Self, ConfigError> {
        let curve = Self::new(keys)?;
        curve.ensure_normalized()?;
        Ok(curve)
    }

    pub fn ensure_normalized(&self) -> Result<(), ConfigError> {
        let (start, end) = (self.first().time, self.last().time);
        if start != 0.0 || end != 1.0 {
            return Err(ConfigError::CurveRange { start, end });
        }
        Ok(())
    }

    /// Default engine curve: builds to peak torque at 80% of the band, falls off hard after.
    pub fn default_torque() -> Self {
        Self {
            keys: vec![
                Keyframe::new(0.0, 0.0, 0.0, 0.5),
                Keyframe::new(0.8, 1.0, 0.0, 0.0),
                Keyframe::new(1.0, 0.0, -4.0, 0.0),
            ],
        }
    }

    /// Default tire curve: grip collapses as slip grows.
    pub fn default_grip() -> Self {
        Self {
            keys: vec![
                Keyframe::new(0.0, 0.6, 0.0, -0.3),
                Keyframe::new(0.3, 0.5, -0.3, 0.0),
                Keyframe::new(0.5, 0.1, 0.0, 0.0),
                Keyframe::new(1.0, 0.05, 0.0, 0.0),
            ],
        }
    }

    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    pub fn first(&self) -> &Keyframe {
        &self.keys[0]
    }

    pub fn last(&self) -> &Keyframe {
        &self.keys[self.keys.len() - 1]
    }

    pub fn evaluate(&self, t: f32) -> f32 {
        let first = self.first();
        let last = self.last();

        if t.is_nan() || t <= first.time {
            return first.value;
        }
        if t >= last.time {
            return last.value;
        }

        // first key strictly after t; exists because t < last.time
        let upper = self.keys.partition_point(|k| k.time <= t);
        let k0 = &self.keys[upper - 1];
        let k1 = &self.keys[upper];

        hermite(k0, k1, t)
    }
}

impl Default for Curve {
    fn default() -> Self {
        Self::default_torque()
    }
}

impl TryFrom<Vec<Keyframe>> for Curve {
    type Error = ConfigError;

    fn try_from(keys: Vec<Keyframe>) -> Result<Self, Self::Error> {
        Self::new(keys)
    }
}

impl From<Curve> for Vec<Keyframe> {
    fn from(curve: Curve) -> Self {
        curve.keys
    }
}

#[inline]
fn hermite(k0: &Keyframe, k1: &Keyframe, t: f32) -> f32 {
    let width = k1.time - k0.time;
    let s = (t - k0.time) / width;
    let s2 = s * s;
    let s3 = s2 * s;

    let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
    let h10 = s3 - 2.0 * s2 + s;
    let h01 = -2.0 * s3 + 3.0 * s2;
    let h11 = s3 - s2;

    h00 * k0.value + h10 * width * k0.out_tangent + h01 * k1.value + h11 * width * k1.in_tangent
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn endpoints_match_first_and_last_keys() {
        let curve = Curve::default_torque();
        assert_eq!(curve.evaluate(0.0), curve.first().value);
        assert_eq!(curve.evaluate(1.0), curve.last().value);
    }

    #[test]
    fn out_of_range_saturates() {
        let curve = Curve::default_grip();
        assert_eq!(curve.evaluate(-2.0), 0.6);
        assert_eq!(curve.evaluate(7.5), 0.05);
        assert_eq!(curve.evaluate(f32::NAN), 0.6);
    }

    #[test]
    fn passes_through_interior_keys() {
        let curve = Curve::default_torque();
        assert_relative_eq!(curve.evaluate(0.8), 1.0, epsilon = 1e-6);
        let grip = Curve::default_grip();
        assert_relative_eq!(grip.evaluate(0.3), 0.5, epsilon = 1e-6);
        assert_relative_eq!(grip.evaluate(0.5), 0.1, epsilon = 1e-6);
    }

    #[test]
    fn linear_tangents_reproduce_a_line() {
        let curve = Curve::normalized(vec![
            Keyframe::new(0.0, 0.0, 1.0, 1.0),
            Keyframe::new(1.0, 1.0, 1.0, 1.0),
        ])
        .unwrap();
        for i in 0..=20 {
            let t = i as f32 / 20.0;
            assert_relative_eq!(curve.evaluate(t), t, epsilon = 1e-5);
        }
    }

    #[test]
    fn continuous_across_control_points() {
        let mut rng = StdRng::seed_from_u64(0x7019);
        for _ in 0..50 {
            let mut time = 0.0;
            let mut keys = Vec::new();
            for _ in 0..5 {
                keys.push(Keyframe::new(
                    time,
                    rng.gen_range(0.0..1.0),
                    rng.gen_range(-4.0..4.0),
                    rng.gen_range(-4.0..4.0),
                ));
                time += rng.gen_range(0.05..0.4);
            }
            let curve = Curve::new(keys.clone()).unwrap();

            for key in &keys[1..keys.len() - 1] {
                let before = curve.evaluate(key.time - 1e-4);
                let after = curve.evaluate(key.time + 1e-4);
                assert!((before - key.value).abs() < 5e-3, "left limit at {}", key.time);
                assert!((after - key.value).abs() < 5e-3, "right limit at {}", key.time);
            }
        }
    }

    #[test]
    fn rejects_unordered_and_empty_keys() {
        assert!(matches!(Curve::new(vec![]), Err(ConfigError::EmptyCurve)));

        let err = Curve::new(vec![
            Keyframe::new(0.0, 0.0, 0.0, 0.0),
            Keyframe::new(0.5, 1.0, 0.0, 0.0),
            Keyframe::new(0.5, 0.2, 0.0, 0.0),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnorderedCurve { index: 2, .. }));
    }

    #[test]
    fn normalized_requires_unit_span() {
        let err = Curve::normalized(vec![
            Keyframe::new(0.1, 0.0, 0.0, 0.0),
            Keyframe::new(1.0, 1.0, 0.0, 0.0),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::CurveRange { .. }));
        assert!(Curve::default_torque().ensure_normalized().is_ok());
    }

    #[test]
    fn deserializes_through_validation() {
        let ok: Curve = serde_json::from_str(
            r#"[{"time":0.0,"value":0.2},{"time":1.0,"value":0.9,"in_tangent":0.0}]"#,
        )
        .unwrap();
        assert_relative_eq!(ok.evaluate(0.0), 0.2);

        let bad = serde_json::from_str::<Curve>(r#"[{"time":1.0,"value":0.0},{"time":0.0,"value":1.0}]"#);
        assert!(bad.is_err());
    }
}
