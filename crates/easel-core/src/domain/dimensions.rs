//! Pixel dimension math shared by the image processors.

use serde::{Deserialize, Serialize};

/// Long edge used when a request only gives an aspect ratio.
pub const DEFAULT_BASE_DIMENSION: u32 = 1024;

/// Scale factors the upscaler supports, ascending.
pub const SUPPORTED_UPSCALE_FACTORS: [u32; 2] = [2, 4];

/// Factor used when an upscale task does not ask for one.
pub const DEFAULT_UPSCALE_FACTOR: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn square(base: u32) -> Self {
        Self::new(base, base)
    }

    /// Derive dimensions from a `W:H` ratio string.
    ///
    /// The long side gets `base` (width for landscape and square, height
    /// for portrait); the short side is scaled and rounded. Malformed or
    /// degenerate ratios (`0:5`, `abc`, `16:`) fall back to a square.
    pub fn from_aspect_ratio(ratio: &str, base: u32) -> Self {
        let Some((w, h)) = parse_ratio(ratio) else {
            return Self::square(base);
        };
        let base_f = f64::from(base);
        if w >= h {
            Self::new(base, scale_edge(base_f * h / w))
        } else {
            Self::new(scale_edge(base_f * w / h), base)
        }
    }

    /// Pick generation dimensions: explicit width and height win, then the
    /// aspect ratio, then a square of `base`.
    pub fn resolve(
        width: Option<u32>,
        height: Option<u32>,
        aspect_ratio: Option<&str>,
        base: u32,
    ) -> Self {
        match (width, height, aspect_ratio) {
            (Some(w), Some(h), _) if w > 0 && h > 0 => Self::new(w, h),
            (_, _, Some(ratio)) => Self::from_aspect_ratio(ratio, base),
            _ => Self::square(base),
        }
    }

    /// Build from optional parts; `None` unless both are known.
    pub fn known(width: Option<u32>, height: Option<u32>) -> Option<Self> {
        match (width, height) {
            (Some(w), Some(h)) => Some(Self::new(w, h)),
            _ => None,
        }
    }

    pub fn scaled(self, factor: u32) -> Self {
        Self::new(
            self.width.saturating_mul(factor),
            self.height.saturating_mul(factor),
        )
    }
}

fn parse_ratio(ratio: &str) -> Option<(f64, f64)> {
    let (w, h) = ratio.trim().split_once(':')?;
    let w: f64 = w.trim().parse().ok()?;
    let h: f64 = h.trim().parse().ok()?;
    let valid = |v: f64| v.is_finite() && v > 0.0;
    (valid(w) && valid(h)).then_some((w, h))
}

fn scale_edge(value: f64) -> u32 {
    (value.round() as u32).max(1)
}

/// Snap a requested upscale factor to the nearest supported one.
///
/// Ties go to the larger factor, so 3 becomes 4.
pub fn coerce_upscale_factor(requested: u32) -> u32 {
    SUPPORTED_UPSCALE_FACTORS
        .iter()
        .copied()
        .min_by_key(|&factor| (factor.abs_diff(requested), std::cmp::Reverse(factor)))
        .unwrap_or(DEFAULT_UPSCALE_FACTOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("16:9", 1024, 576)]
    #[case("9:16", 576, 1024)]
    #[case("1:1", 1024, 1024)]
    #[case("4:3", 1024, 768)]
    #[case("3:2", 1024, 683)]
    #[case(" 2 : 3 ", 683, 1024)]
    #[case("1.5:1", 1024, 683)]
    fn aspect_ratio_scales_to_base(#[case] ratio: &str, #[case] width: u32, #[case] height: u32) {
        assert_eq!(
            Dimensions::from_aspect_ratio(ratio, DEFAULT_BASE_DIMENSION),
            Dimensions::new(width, height)
        );
    }

    #[rstest]
    #[case("0:5")]
    #[case("5:0")]
    #[case("-16:9")]
    #[case("abc")]
    #[case("16:")]
    #[case("16x9")]
    #[case("")]
    #[case("NaN:1")]
    #[case("inf:1")]
    fn degenerate_ratios_fall_back_to_square(#[case] ratio: &str) {
        assert_eq!(
            Dimensions::from_aspect_ratio(ratio, DEFAULT_BASE_DIMENSION),
            Dimensions::square(1024)
        );
    }

    #[test]
    fn explicit_dimensions_override_ratio() {
        let dims = Dimensions::resolve(Some(640), Some(480), Some("16:9"), 1024);
        assert_eq!(dims, Dimensions::new(640, 480));

        // one explicit edge is not enough; the ratio decides
        let dims = Dimensions::resolve(Some(640), None, Some("16:9"), 1024);
        assert_eq!(dims, Dimensions::new(1024, 576));

        let dims = Dimensions::resolve(None, None, None, 512);
        assert_eq!(dims, Dimensions::square(512));
    }

    #[rstest]
    #[case(0, 2)]
    #[case(1, 2)]
    #[case(2, 2)]
    #[case(3, 4)]
    #[case(4, 4)]
    #[case(8, 4)]
    fn upscale_factor_snaps_to_supported(#[case] requested: u32, #[case] expected: u32) {
        assert_eq!(coerce_upscale_factor(requested), expected);
    }

    #[test]
    fn scaled_multiplies_both_edges() {
        assert_eq!(Dimensions::new(300, 200).scaled(4), Dimensions::new(1200, 800));
    }
}
