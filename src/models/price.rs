//! Price type
//!
//! Positive amount with at most two fractional digits, held as integer cents
//! and exchanged as a JSON decimal number (`9.99`).

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Largest amount accepted, in cents. Keeps the f64 form exact to the cent.
const MAX_CENTS: i64 = 1 << 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(i64);

impl Price {
    /// Wraps a stored cent amount. `None` unless positive.
    pub fn from_cents(cents: i64) -> Option<Self> {
        (cents > 0 && cents <= MAX_CENTS).then_some(Self(cents))
    }

    /// Parses a decimal amount, rejecting zero, negatives, non-finite values
    /// and anything finer than a cent.
    pub fn from_decimal(value: f64) -> Result<Self, String> {
        if !value.is_finite() || value <= 0.0 {
            return Err("Price must be greater than 0".to_string());
        }
        // Display yields the shortest text that reads back as `value`, never
        // in exponent form, so its digits are the digits the client sent.
        Self::parse_decimal(&value.to_string())
    }

    /// Exact conversion of unsigned decimal text (`12`, `12.5`, `12.99`).
    fn parse_decimal(text: &str) -> Result<Self, String> {
        let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
        let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !is_digits(whole) || !is_digits(fraction) {
            return Err(format!("Invalid price {text:?}"));
        }
        if fraction.len() > 2 {
            return Err("Price must have at most 2 decimal places".to_string());
        }

        let too_large = || "Price is too large".to_string();
        let whole: i64 = whole.parse().map_err(|_| too_large())?;
        let fraction: i64 = format!("{fraction:0<2}").parse().map_err(|_| too_large())?;
        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(fraction))
            .filter(|c| *c <= MAX_CENTS)
            .ok_or_else(too_large)?;

        Self::from_cents(cents).ok_or_else(|| "Price must be greater than 0".to_string())
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    pub fn as_decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_decimal())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Price::from_decimal(value).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_decimal() {
        assert_eq!(Price::from_decimal(9.99).unwrap().cents(), 999);
        assert_eq!(Price::from_decimal(12.99).unwrap().cents(), 1299);
        assert_eq!(Price::from_decimal(0.29).unwrap().cents(), 29);
        assert_eq!(Price::from_decimal(5.0).unwrap().cents(), 500);
    }

    #[test]
    fn test_rejects_non_positive() {
        assert!(Price::from_decimal(0.0).is_err());
        assert!(Price::from_decimal(-1.5).is_err());
        assert!(Price::from_decimal(f64::NAN).is_err());
        assert!(Price::from_decimal(f64::INFINITY).is_err());
    }

    #[test]
    fn test_rejects_sub_cent_precision() {
        assert!(Price::from_decimal(9.999).is_err());
        assert!(Price::from_decimal(0.001).is_err());
        assert!(Price::from_decimal(9.999999999).is_err());
        assert!(Price::from_decimal(0.0000001).is_err());
        assert!(Price::from_decimal(2.675).is_err());
    }

    #[test]
    fn test_parse_decimal_is_exact() {
        assert_eq!(Price::parse_decimal("7").unwrap().cents(), 700);
        assert_eq!(Price::parse_decimal("7.5").unwrap().cents(), 750);
        assert_eq!(Price::parse_decimal("0.01").unwrap().cents(), 1);
        assert!(Price::parse_decimal("0.00").is_err());
        assert!(Price::parse_decimal("1.").is_ok());
        assert!(Price::parse_decimal("1e3").is_err());
        assert!(Price::parse_decimal("99999999999999999999").is_err());
    }

    #[test]
    fn test_large_whole_amounts() {
        assert_eq!(Price::from_decimal(1e12).unwrap().cents(), 100_000_000_000_000);
        assert!(Price::from_decimal(1e300).is_err());
    }

    #[test]
    fn test_json_shape() {
        let price = Price::from_cents(1299).unwrap();
        assert_eq!(serde_json::to_string(&price).unwrap(), "12.99");
        assert_eq!(serde_json::from_str::<Price>("12.99").unwrap(), price);
        assert!(serde_json::from_str::<Price>("-3").is_err());
    }
}
