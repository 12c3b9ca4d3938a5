//! Probability gates for optional stages.

use rand::Rng;

/// Hundredths of a percent; the resolution of a gate threshold.
const SCALE: u16 = 10_000;

/// Chance that a gated stage runs, from 0% to 100% in steps of 0.01%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Probability(u16);

impl Probability {
    pub const NEVER: Self = Self(0);
    pub const ALWAYS: Self = Self(SCALE);

    /// Clamp an arbitrary whole percentage into `[0, 100]`.
    pub fn clamped(percent: i64) -> Self {
        Self(percent.clamp(0, 100) as u16 * 100)
    }

    /// Parse a user-supplied percentage.
    ///
    /// Fractions are kept to two decimals (`"0.5"` is half a percent),
    /// out-of-range values are clamped, and anything non-numeric maps to
    /// [`Probability::NEVER`] so a typo disables the stage instead of failing
    /// the run.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => {
                Self((value.clamp(0.0, 100.0) * 100.0).round() as u16)
            }
            _ => Self::NEVER,
        }
    }

    pub fn percent(self) -> f64 {
        f64::from(self.0) / 100.0
    }

    pub fn basis_points(self) -> u16 {
        self.0
    }
}

/// Result of evaluating one gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateRoll {
    /// Uniform draw in `[0, 10000)`, in hundredths of a percent.
    pub draw: u16,
    pub threshold: Probability,
    pub passed: bool,
}

/// Draw once and compare against `threshold` (`draw < threshold` passes).
pub fn roll<R: Rng + ?Sized>(rng: &mut R, threshold: Probability) -> GateRoll {
    let draw = rng.gen_range(0..SCALE);
    GateRoll {
        draw,
        threshold,
        passed: draw < threshold.basis_points(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn parse_clamps_out_of_range() {
        assert_eq!(Probability::parse("42"), Probability::clamped(42));
        assert_eq!(Probability::parse("250"), Probability::ALWAYS);
        assert_eq!(Probability::parse("-5"), Probability::NEVER);
    }

    #[test]
    fn parse_keeps_fractions() {
        assert_eq!(Probability::parse(" 42.9 ").basis_points(), 4_290);
        assert_eq!(Probability::parse("0.5").basis_points(), 50);
        assert_eq!(Probability::parse("0.004").basis_points(), 0);
        assert!(Probability::parse("0.5") > Probability::NEVER);
    }

    #[test]
    fn parse_non_numeric_is_never() {
        assert_eq!(Probability::parse("often"), Probability::NEVER);
        assert_eq!(Probability::parse(""), Probability::NEVER);
        assert_eq!(Probability::parse("NaN"), Probability::NEVER);
        assert_eq!(Probability::parse("inf"), Probability::NEVER);
    }

    #[test]
    fn zero_never_passes_and_hundred_always_passes() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            assert!(!roll(&mut rng, Probability::NEVER).passed);
            assert!(roll(&mut rng, Probability::ALWAYS).passed);
        }
    }

    #[test]
    fn roll_compares_draw_against_threshold() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let outcome = roll(&mut rng, Probability::clamped(30));
            assert!(outcome.draw < 10_000);
            assert_eq!(outcome.passed, outcome.draw < 3_000);
        }
    }

    #[test]
    fn half_percent_gate_passes_sometimes() {
        let mut rng = StdRng::seed_from_u64(5);
        let threshold = Probability::parse("0.5");
        let passed = (0..100_000)
            .filter(|_| roll(&mut rng, threshold).passed)
            .count();
        assert!((200..900).contains(&passed), "passed {passed} times");
    }
}
