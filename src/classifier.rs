use crate::models::StatusKey;

/// BMI from weight in kilograms and height in centimetres.
///
/// Returns `None` when either measurement is missing, zero or not finite.
pub fn compute_bmi(weight_kg: Option<f64>, height_cm: Option<f64>) -> Option<f64> {
    let weight = weight_kg.filter(|value| value.is_finite() && *value != 0.0)?;
    let height = height_cm.filter(|value| value.is_finite() && *value != 0.0)?;
    let metres = height / 100.0;
    Some(weight / (metres * metres))
}

/// Maps a BMI value onto a nutrition status. Thresholds apply to the
/// unrounded value.
pub fn classify(bmi: Option<f64>) -> StatusKey {
    match bmi {
        None => StatusKey::Unknown,
        Some(value) if value.is_nan() => StatusKey::Unknown,
        Some(value) if value < 18.5 => StatusKey::Underweight,
        Some(value) if value < 25.0 => StatusKey::Normal,
        Some(value) if value < 30.0 => StatusKey::Overweight,
        Some(_) => StatusKey::Obese,
    }
}

/// Rounds on the exact binary value, so 0.15 (stored just below the
/// half) becomes 0.1 rather than 0.2.
pub fn round_one_decimal(value: f64) -> f64 {
    format!("{value:.1}").parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bmi_requires_both_measurements() {
        assert_eq!(compute_bmi(Some(0.0), Some(120.0)), None);
        assert_eq!(compute_bmi(Some(20.0), Some(0.0)), None);
        assert_eq!(compute_bmi(None, Some(120.0)), None);
        assert_eq!(compute_bmi(Some(20.0), None), None);
        assert_eq!(compute_bmi(Some(f64::NAN), Some(120.0)), None);
        assert_eq!(compute_bmi(Some(20.0), Some(f64::INFINITY)), None);
    }

    #[test]
    fn bmi_uses_height_in_metres() {
        let bmi = compute_bmi(Some(22.0), Some(100.0)).unwrap();
        assert!((bmi - 22.0).abs() < 1e-9);
    }

    #[test]
    fn thresholds_match_at_boundaries() {
        assert_eq!(classify(None), StatusKey::Unknown);
        assert_eq!(classify(Some(f64::NAN)), StatusKey::Unknown);
        assert_eq!(classify(Some(18.499)), StatusKey::Underweight);
        assert_eq!(classify(Some(18.5)), StatusKey::Normal);
        assert_eq!(classify(Some(24.999)), StatusKey::Normal);
        assert_eq!(classify(Some(25.0)), StatusKey::Overweight);
        assert_eq!(classify(Some(29.999)), StatusKey::Overweight);
        assert_eq!(classify(Some(30.0)), StatusKey::Obese);
    }

    #[test]
    fn classification_uses_unrounded_value() {
        // 24.96 rounds to 25.0 for display but is still normal.
        assert_eq!(classify(Some(24.96)), StatusKey::Normal);
        assert_eq!(round_one_decimal(24.96), 25.0);
    }

    #[test]
    fn rounding_follows_the_stored_value() {
        assert_eq!(round_one_decimal(0.15), 0.1);
        assert_eq!(round_one_decimal(17.46875), 17.5);
        assert_eq!(round_one_decimal(22.04), 22.0);
        assert_eq!(round_one_decimal(-1.26), -1.3);
    }

    #[test]
    fn labels_follow_keys() {
        assert_eq!(StatusKey::Underweight.label(), "Underweight");
        assert_eq!(StatusKey::Obese.key(), "obese");
        assert_eq!(StatusKey::parse(" Normal "), StatusKey::Normal);
        assert_eq!(StatusKey::parse("healthy"), StatusKey::Normal);
        assert_eq!(StatusKey::parse("stunted"), StatusKey::Unknown);
    }
}
