//! Offer ranking score.

/// Day count at which approval and payment terms stop contributing.
pub const RATING_HORIZON_DAYS: f64 = 90.0;

/// Compute the ranking score for an offer variant.
///
/// `ecpl * (10 * (1 - approval/90)) * (100 * (1 - payment/90))`
///
/// Terms longer than the horizon yield negative factors, so the result can be
/// negative or very large. Overflow saturates at the finite `f64` range and an
/// undefined product rates zero, so every stored rating orders.
pub fn compute_rating(ecpl: f64, approval_days: i64, payment_days: i64) -> f64 {
    let approval_factor = 10.0 * (1.0 - approval_days as f64 / RATING_HORIZON_DAYS);
    let payment_factor = 100.0 * (1.0 - payment_days as f64 / RATING_HORIZON_DAYS);
    let rating = ecpl * approval_factor * payment_factor;
    if rating.is_nan() {
        0.0
    } else {
        rating.clamp(f64::MIN, f64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_zero_terms_give_full_weight() {
        assert_eq!(compute_rating(2.0, 0, 0), 2000.0);
    }

    #[test]
    fn test_known_value() {
        // 1.5 * (10 * (1 - 30/90)) * (100 * (1 - 45/90))
        let rating = compute_rating(1.5, 30, 45);
        assert!((rating - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_horizon_zeroes_rating() {
        assert_eq!(compute_rating(10.0, 90, 0), 0.0);
        assert_eq!(compute_rating(10.0, 0, 90), 0.0);
    }

    #[test]
    fn test_terms_beyond_horizon_go_negative() {
        assert!(compute_rating(1.0, 120, 0) < 0.0);
    }

    #[test]
    fn test_overflow_saturates() {
        assert_eq!(compute_rating(f64::MAX, -1_000_000, -1_000_000), f64::MAX);
        assert_eq!(compute_rating(f64::MAX, 1_000_000, -1_000_000), f64::MIN);
        assert_eq!(compute_rating(f64::NAN, 0, 0), 0.0);
        assert_eq!(compute_rating(f64::INFINITY, 90, 0), 0.0);
    }

    proptest! {
        #[test]
        fn prop_zero_ecpl_is_zero(approval in -1000i64..1000, payment in -1000i64..1000) {
            prop_assert_eq!(compute_rating(0.0, approval, payment), 0.0);
        }

        #[test]
        fn prop_rating_is_finite(ecpl in proptest::num::f64::ANY, approval in any::<i64>(), payment in any::<i64>()) {
            prop_assert!(compute_rating(ecpl, approval, payment).is_finite());
        }

        #[test]
        fn prop_rating_scales_with_ecpl(ecpl in 0.0f64..1000.0, approval in 0i64..90, payment in 0i64..90) {
            let single = compute_rating(ecpl, approval, payment);
            let double = compute_rating(ecpl * 2.0, approval, payment);
            prop_assert!((double - 2.0 * single).abs() <= 1e-6 * single.abs().max(1.0));
        }
    }
}
