//! Gain values, the balance law and sample scaling

/// Effective gain of one audio track as heard locally
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gain {
    pub volume: f64,
    pub muted: bool,
}

impl Gain {
    pub const UNITY: Gain = Gain {
        volume: 1.0,
        muted: false,
    };

    /// Linear factor to multiply samples with (0 when muted)
    pub fn factor(&self) -> f64 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }
}

impl Default for Gain {
    fn default() -> Self {
        Self::UNITY
    }
}

/// Equal-power balance between the own signal and everybody else
///
/// `balance` runs from -1 (only own tracks) to 1 (only others) and is
/// clamped to that range.
pub fn balance(balance: f64, is_local: bool) -> f64 {
    let b = if balance.is_nan() {
        0.0
    } else {
        balance.clamp(-1.0, 1.0)
    };
    if is_local {
        (0.5 * (1.0 - b)).sqrt()
    } else {
        (0.5 * (1.0 + b)).sqrt()
    }
}

/// A PCM sample that can be scaled by a gain factor
pub trait Sample: Copy {
    fn scale(self, factor: f64) -> Self;
}

impl Sample for f32 {
    fn scale(self, factor: f64) -> Self {
        (self as f64 * factor) as f32
    }
}

impl Sample for f64 {
    fn scale(self, factor: f64) -> Self {
        self * factor
    }
}

impl Sample for i16 {
    fn scale(self, factor: f64) -> Self {
        (self as f64 * factor).round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
    }
}

impl Sample for i32 {
    fn scale(self, factor: f64) -> Self {
        (self as f64 * factor).round().clamp(i32::MIN as f64, i32::MAX as f64) as i32
    }
}

/// Scale a buffer in place
pub fn apply<S: Sample>(gain: Gain, samples: &mut [S]) {
    let factor = gain.factor();
    for sample in samples.iter_mut() {
        *sample = sample.scale(factor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_balance_extremes() {
        assert_eq!(balance(0.0, true), 0.5f64.sqrt());
        assert_eq!(balance(0.0, false), 0.5f64.sqrt());
        assert_eq!(balance(-1.0, true), 1.0);
        assert_eq!(balance(-1.0, false), 0.0);
        assert_eq!(balance(1.0, true), 0.0);
        assert_eq!(balance(1.0, false), 1.0);
    }

    #[test]
    fn test_balance_clamps() {
        assert_eq!(balance(5.0, false), 1.0);
        assert_eq!(balance(-5.0, true), 1.0);
        assert_eq!(balance(f64::NAN, true), 0.5f64.sqrt());
    }

    #[test]
    fn test_apply_scales_and_silences() {
        let mut buf = [1.0f32, -0.5, 0.25];
        apply(Gain { volume: 0.5, muted: false }, &mut buf);
        assert_eq!(buf, [0.5, -0.25, 0.125]);

        apply(Gain { volume: 0.5, muted: true }, &mut buf);
        assert!(buf.iter().all(|s| *s == 0.0));

        let mut pcm = [i16::MAX, -100];
        apply(Gain { volume: 2.0, muted: false }, &mut pcm);
        assert_eq!(pcm, [i16::MAX, -200]);
    }

    proptest! {
        #[test]
        fn prop_balance_is_equal_power(b in -1.0f64..=1.0) {
            let local = balance(b, true);
            let remote = balance(b, false);
            prop_assert!((local * local + remote * remote - 1.0).abs() < 1e-9);
            prop_assert!((0.0..=1.0).contains(&local));
            prop_assert!((0.0..=1.0).contains(&remote));
        }
    }
}
