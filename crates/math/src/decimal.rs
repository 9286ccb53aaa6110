//! Checked decimal operations.
//!
//! Wraps `BigDecimal` with the two conventions every caller must share:
//! divisions carry 36 significant digits of working precision, and any
//! quantity bound for the ledger is rounded half-away-from-zero to 18
//! fractional digits. Invalid input fails with `InvalidNumericInput`
//! instead of propagating a silent NaN into a transaction amount.

use bigdecimal::num_bigint::BigInt;
use bigdecimal::{BigDecimal, One, RoundingMode, Zero};

use crest_types::constants::{SUBMISSION_SCALE, WORKING_PRECISION};
use crest_types::{EngineError, EngineResult};

/// Parse a decimal from its string form.
pub fn parse_decimal(field: &str, input: &str) -> EngineResult<BigDecimal> {
    input
        .parse::<BigDecimal>()
        .map_err(|e| EngineError::invalid_input(field, format!("'{input}' is not a decimal: {e}")))
}

/// Convert a float into a decimal, rejecting NaN and infinities. Only for
/// ingesting UI input; amounts are never carried as floats afterwards.
pub fn decimal_from_f64(field: &str, value: f64) -> EngineResult<BigDecimal> {
    BigDecimal::try_from(value)
        .map_err(|e| EngineError::invalid_input(field, format!("{value} is not finite: {e}")))
}

/// Division with an explicit zero-divisor check, held to the working
/// precision.
pub fn checked_div(
    field: &str,
    numerator: &BigDecimal,
    denominator: &BigDecimal,
) -> EngineResult<BigDecimal> {
    if denominator.is_zero() {
        return Err(EngineError::invalid_input(field, "division by zero"));
    }
    Ok((numerator / denominator).with_prec(WORKING_PRECISION))
}

/// Round half-away-from-zero to the ledger's 18 fractional digits. Applied
/// to every quantity before it is embedded in a transaction.
pub fn round_for_submission(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(SUBMISSION_SCALE, RoundingMode::HalfUp)
}

/// One unit in the last place at the submission scale (10^-18).
pub fn submission_epsilon() -> BigDecimal {
    BigDecimal::new(BigInt::one(), SUBMISSION_SCALE)
}

/// Reject negative quantities.
pub fn ensure_non_negative(field: &str, value: &BigDecimal) -> EngineResult<()> {
    if *value < BigDecimal::zero() {
        return Err(EngineError::invalid_input(field, "quantity is negative"));
    }
    Ok(())
}

/// Reject non-positive quantities.
pub fn ensure_positive(field: &str, value: &BigDecimal) -> EngineResult<()> {
    if *value <= BigDecimal::zero() {
        return Err(EngineError::invalid_input(field, "quantity is not positive"));
    }
    Ok(())
}

/// `1 + fraction` slippage envelope. The fraction must be non-negative.
pub fn slippage_envelope(fraction: &BigDecimal) -> EngineResult<BigDecimal> {
    ensure_non_negative("slippage_fraction", fraction)?;
    Ok(BigDecimal::one() + fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimals_and_rejects_garbage() {
        assert_eq!(
            parse_decimal("supply", "1234.5678").unwrap(),
            "1234.5678".parse::<BigDecimal>().unwrap()
        );
        assert!(matches!(
            parse_decimal("supply", "12a.4").unwrap_err(),
            EngineError::InvalidNumericInput { .. }
        ));
    }

    #[test]
    fn rejects_non_finite_floats() {
        assert!(decimal_from_f64("amount", 0.25).is_ok());
        assert!(decimal_from_f64("amount", f64::NAN).is_err());
        assert!(decimal_from_f64("amount", f64::INFINITY).is_err());
    }

    #[test]
    fn division_by_zero_is_an_input_error() {
        let one = BigDecimal::one();
        let zero = BigDecimal::zero();
        assert!(matches!(
            checked_div("ratio", &one, &zero).unwrap_err(),
            EngineError::InvalidNumericInput { .. }
        ));
        assert_eq!(
            checked_div("ratio", &BigDecimal::from(6), &BigDecimal::from(3)).unwrap(),
            BigDecimal::from(2)
        );
    }

    #[test]
    fn submission_rounding_is_half_away_from_zero() {
        let just_over: BigDecimal = "0.0000000000000000005".parse().unwrap();
        assert_eq!(round_for_submission(&just_over), submission_epsilon());

        let just_under: BigDecimal = "0.0000000000000000004".parse().unwrap();
        assert_eq!(round_for_submission(&just_under), BigDecimal::zero());

        let negative: BigDecimal = "-0.0000000000000000005".parse().unwrap();
        assert_eq!(round_for_submission(&negative), -submission_epsilon());
    }

    #[test]
    fn envelope_requires_a_non_negative_fraction() {
        let half_pct: BigDecimal = "0.005".parse().unwrap();
        assert_eq!(
            slippage_envelope(&half_pct).unwrap(),
            "1.005".parse::<BigDecimal>().unwrap()
        );
        assert!(slippage_envelope(&"-0.1".parse().unwrap()).is_err());
    }

    #[test]
    fn negativity_guards() {
        assert!(ensure_non_negative("q", &BigDecimal::zero()).is_ok());
        assert!(ensure_non_negative("q", &"-1".parse().unwrap()).is_err());
        assert!(ensure_positive("q", &BigDecimal::zero()).is_err());
        assert!(ensure_positive("q", &BigDecimal::one()).is_ok());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Submission rounding is idempotent and moves a value by at
            /// most half an ulp at the submission scale.
            #[test]
            fn submission_rounding_is_idempotent_and_bounded(
                mantissa in proptest::num::i64::ANY,
                scale in 0i64..=24,
            ) {
                let value = BigDecimal::new(BigInt::from(mantissa), scale);
                let rounded = round_for_submission(&value);

                prop_assert_eq!(round_for_submission(&rounded), rounded.clone());
                let drift = (&rounded - &value).abs();
                prop_assert!(&drift + &drift <= submission_epsilon());
            }

            /// Parsing the display form reproduces the value exactly.
            #[test]
            fn parse_round_trips_through_display(
                mantissa in proptest::num::i64::ANY,
                scale in -12i64..=24,
            ) {
                let value = BigDecimal::new(BigInt::from(mantissa), scale);
                let reparsed = parse_decimal("value", &value.to_string()).unwrap();
                prop_assert_eq!(reparsed, value);
            }
        }
    }
}
