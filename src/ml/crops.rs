//! Per-crop yield adjustment applied to neighbor estimates.

/// Multipliers keyed by lowercase crop label.
pub const CROP_MULTIPLIERS: &[(&str, f64)] = &[
    ("rice", 1.1),
    ("wheat", 0.9),
    ("corn", 1.05),
    ("soybean", 0.95),
    ("barley", 0.85),
];

/// Look up the yield multiplier for a crop label, ignoring case.
///
/// Unknown crops are left unadjusted.
pub fn crop_multiplier(crop: &str) -> f64 {
    let crop = crop.trim();
    CROP_MULTIPLIERS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(crop))
        .map(|(_, multiplier)| *multiplier)
        .unwrap_or(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplier_ignores_case() {
        for label in ["Rice", "RICE", "rice", "rIcE"] {
            assert_eq!(crop_multiplier(label), 1.1);
        }
        assert_eq!(crop_multiplier("WHEAT"), 0.9);
        assert_eq!(crop_multiplier("Corn"), 1.05);
        assert_eq!(crop_multiplier("soybean"), 0.95);
        assert_eq!(crop_multiplier("Barley"), 0.85);
    }

    #[test]
    fn unknown_crops_are_unadjusted() {
        assert_eq!(crop_multiplier("sorghum"), 1.0);
        assert_eq!(crop_multiplier(""), 1.0);
        assert_eq!(crop_multiplier("rice paddy"), 1.0);
    }
}
