//! Ledger amount shapes and native-unit conversion.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

/// Ticker of the ledger's native asset.
pub const NATIVE_CURRENCY: &str = "XRP";

/// Drops per whole native unit.
pub const DROPS_PER_NATIVE: i64 = 1_000_000;

/// Sentinel the ledger reports when a delivered amount cannot be determined
/// (partial payments validated before the field existed).
pub const AMOUNT_UNAVAILABLE: &str = "unavailable";

/// Decoded form of an `Amount` / `delivered_amount` JSON value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerAmount {
    /// Native asset, denominated in drops (decimal string on the wire).
    Native { drops: String },
    /// The `"unavailable"` sentinel.
    Unavailable,
    /// Issued currency. `value` keeps the wire text; it may be a plain or
    /// scientific decimal.
    Issued {
        currency: String,
        issuer: Option<String>,
        value: String,
    },
}

impl LedgerAmount {
    /// Decode a JSON amount. Returns `None` for shapes that are neither a
    /// string nor an object with a `value` field.
    pub fn from_json(v: &Value) -> Option<Self> {
        match v {
            Value::String(s) if s == AMOUNT_UNAVAILABLE => Some(LedgerAmount::Unavailable),
            Value::String(s) => Some(LedgerAmount::Native { drops: s.clone() }),
            Value::Object(map) => {
                let value = match map.get("value")? {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    _ => return None,
                };
                let currency = map
                    .get("currency")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let issuer = map
                    .get("issuer")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Some(LedgerAmount::Issued {
                    currency,
                    issuer,
                    value,
                })
            }
            _ => None,
        }
    }

    /// Currency code the amount is denominated in.
    pub fn currency(&self) -> &str {
        match self {
            LedgerAmount::Issued { currency, .. } if !currency.is_empty() => currency,
            _ => NATIVE_CURRENCY,
        }
    }

    /// Value in major units, or `None` when the wire text does not parse.
    /// `Unavailable` is a defined zero, not a parse failure.
    pub fn major_units(&self) -> Option<Decimal> {
        match self {
            LedgerAmount::Native { drops } => drops_to_native(drops),
            LedgerAmount::Unavailable => Some(Decimal::ZERO),
            LedgerAmount::Issued { value, .. } => parse_decimal(value),
        }
    }
}

/// Convert a drops string into major native units.
pub fn drops_to_native(drops: &str) -> Option<Decimal> {
    let d = Decimal::from_str(drops.trim()).ok()?;
    d.checked_div(Decimal::from(DROPS_PER_NATIVE))
}

/// Parse a decimal in plain (`"12500"`, `"0.5"`) or scientific (`"1.25e4"`)
/// notation.
///
/// Well-formed numbers outside the decimal range saturate: magnitudes above
/// `Decimal::MAX` become `Decimal::MAX` (or `MIN`), magnitudes below the
/// smallest representable scale become zero. Text that is not a number is
/// `None`.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = Decimal::from_str(s).or_else(|_| Decimal::from_scientific(s)) {
        return Some(d);
    }

    // Only used to tell "too big / too small" apart from garbage.
    let f = s.parse::<f64>().ok().filter(|f| f.is_finite())?;
    Some(match f {
        f if f.abs() < 1.0 => Decimal::ZERO,
        f if f > 0.0 => Decimal::MAX,
        _ => Decimal::MIN,
    })
}

/// True when `d` is the saturated upper bound produced by [`parse_decimal`]
/// for out-of-range input.
pub fn is_saturated(d: Decimal) -> bool {
    d == Decimal::MAX
}

/// Round to two decimal places, midpoint away from zero (half-up for the
/// non-negative amounts this workspace produces).
pub fn round_2dp(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn native_string_converts_drops() {
        let a = LedgerAmount::from_json(&json!("12500000")).unwrap();
        assert_eq!(a.currency(), "XRP");
        assert_eq!(a.major_units(), Some(dec!(12.5)));
    }

    #[test]
    fn unavailable_is_zero() {
        let a = LedgerAmount::from_json(&json!("unavailable")).unwrap();
        assert_eq!(a, LedgerAmount::Unavailable);
        assert_eq!(a.major_units(), Some(Decimal::ZERO));
    }

    #[test]
    fn issued_accepts_string_or_number_value() {
        let s = LedgerAmount::from_json(&json!({"currency": "JPY", "issuer": "rI", "value": "12500"}))
            .unwrap();
        let n = LedgerAmount::from_json(&json!({"currency": "JPY", "value": 12500})).unwrap();
        assert_eq!(s.currency(), "JPY");
        assert_eq!(s.major_units(), Some(dec!(12500)));
        assert_eq!(n.major_units(), Some(dec!(12500)));
    }

    #[test]
    fn issued_scientific_notation() {
        assert_eq!(parse_decimal("1.25e4"), Some(dec!(12500)));
        assert_eq!(parse_decimal("5e-3"), Some(dec!(0.005)));
        assert_eq!(parse_decimal("abc"), None);
    }

    #[test]
    fn out_of_range_values_saturate() {
        assert_eq!(parse_decimal("1e30"), Some(Decimal::MAX));
        assert_eq!(parse_decimal("79228162514264337593543950336"), Some(Decimal::MAX));
        assert_eq!(parse_decimal("-1e40"), Some(Decimal::MIN));
        assert_eq!(parse_decimal("1e-40"), Some(Decimal::ZERO));
        assert_eq!(parse_decimal("inf"), None);
        assert_eq!(parse_decimal("NaN"), None);
        assert!(is_saturated(parse_decimal("9.99e95").unwrap()));
    }

    #[test]
    fn round_half_up() {
        assert_eq!(round_2dp(dec!(1.005)), dec!(1.01));
        assert_eq!(round_2dp(dec!(1.004)), dec!(1.00));
        assert_eq!(round_2dp(dec!(0.125)), dec!(0.13));
    }

    #[test]
    fn unrecognised_shapes_are_none() {
        assert_eq!(LedgerAmount::from_json(&json!(42)), None);
        assert_eq!(LedgerAmount::from_json(&json!({"currency": "USD"})), None);
    }
}
