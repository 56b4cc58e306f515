//! EAN-13 barcodes.
//!
//! The free functions in this module are total: they never panic and never
//! return an error, whatever the input. [`Ean`] is the validated form used
//! once a code has passed [`is_valid_ean`].
//!
//! ## Variable-price codes
//!
//! Codes starting with `2` are in-store codes for weighed or priced items
//! (deli, produce). Their layout is `2PPPPPPP CCCC K`: an eight digit product
//! part, the price in cents, and the check digit.

use core::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize};

/// Number of digits in an EAN-13 code.
pub const EAN_LENGTH: usize = 13;

/// Number of payload digits covered by the check digit.
pub const EAN_PREFIX_LENGTH: usize = 12;

/// Leading digit of variable-price codes.
const VARIABLE_PRICE_PREFIX: char = '2';

/// Product part of a variable-price code.
const VARIABLE_PRICE_PRODUCT_DIGITS: usize = 8;

/// Largest price (in cents) that fits the four price digits.
const MAX_EMBEDDED_CENTS: u32 = 9999;

/// Compute the EAN-13 check digit for a 12 digit prefix.
///
/// Digits at even positions (counting from zero on the left) weigh 1, digits
/// at odd positions weigh 3. The check digit brings the weighted sum up to
/// the next multiple of ten.
///
/// Callers pass exactly twelve decimal digits. Anything else still yields a
/// digit, computed from the bytes as if they were digits, which carries no
/// meaning.
///
/// ```
/// use grocery_aid_core::calculate_check_digit;
///
/// assert_eq!(calculate_check_digit("400638133393"), '1');
/// assert_eq!(calculate_check_digit("200000000000"), '8');
/// ```
#[must_use]
pub fn calculate_check_digit(prefix: &str) -> char {
    let checksum = prefix
        .bytes()
        .enumerate()
        .fold(0_u32, |sum, (index, byte)| {
            let weight = if index % 2 == 0 { 1 } else { 3 };
            let digit = u32::from(byte.wrapping_sub(b'0'));
            (sum + weight * (digit % 10)) % 10
        });

    char::from_digit((10 - checksum) % 10, 10).unwrap_or('0')
}

/// Returns `true` if `code` is thirteen decimal digits with a correct check digit.
///
/// ```
/// use grocery_aid_core::is_valid_ean;
///
/// assert!(is_valid_ean("4006381333931"));
/// assert!(!is_valid_ean("4006381333932"));
/// assert!(!is_valid_ean("123"));
/// ```
#[must_use]
pub fn is_valid_ean(code: &str) -> bool {
    if code.len() != EAN_LENGTH || !code.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    match (code.get(..EAN_PREFIX_LENGTH), code.chars().last()) {
        (Some(prefix), Some(check)) => calculate_check_digit(prefix) == check,
        _ => false,
    }
}

/// Returns `true` if `code` belongs to the variable-price range.
///
/// Only the leading digit is inspected. The code is not validated here;
/// check [`is_valid_ean`] first before relying on the classification.
#[must_use]
pub fn is_variable_price_ean(code: &str) -> bool {
    code.starts_with(VARIABLE_PRICE_PREFIX)
}

/// Errors that can occur when parsing an [`Ean`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EanError {
    /// The input does not have the expected number of characters.
    #[error("EAN must be {expected} digits (got {found})")]
    WrongLength {
        /// Required number of digits.
        expected: usize,
        /// Number of characters in the input.
        found: usize,
    },
    /// The input contains something other than a decimal digit.
    #[error("EAN contains a non-digit character {character:?} at position {position}")]
    NonDigit {
        /// Zero-based character position.
        position: usize,
        /// The offending character.
        character: char,
    },
    /// The check digit does not match the payload.
    #[error("EAN check digit mismatch (expected {expected}, found {found})")]
    Checksum {
        /// Check digit computed from the first twelve digits.
        expected: char,
        /// Check digit present in the input.
        found: char,
    },
    /// A price was embedded into a code outside the variable-price range.
    #[error("EAN {0} is not a variable-price code")]
    NotVariablePrice(String),
    /// The price does not fit the four price digits of a variable-price code.
    #[error("price {0} cannot be embedded in an EAN (must be between 0.00 and 99.99)")]
    PriceOutOfRange(Decimal),
}

/// A validated EAN-13 code.
///
/// ## Examples
///
/// ```
/// use grocery_aid_core::Ean;
///
/// let ean = Ean::parse("4006381333931").unwrap();
/// assert_eq!(ean.check_digit(), '1');
/// assert!(!ean.is_variable_price());
///
/// // Complete a code from its twelve payload digits
/// let ean = Ean::from_prefix("400638133393").unwrap();
/// assert_eq!(ean.as_str(), "4006381333931");
///
/// assert!(Ean::parse("4006381333932").is_err()); // bad check digit
/// assert!(Ean::parse("abcdefghijklm").is_err()); // not digits
/// ```
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Ean(String);

impl Ean {
    /// Parse and validate an EAN-13 code.
    ///
    /// Surrounding whitespace is not trimmed; scanners and forms are expected
    /// to hand over the bare code.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not thirteen decimal digits or if the
    /// check digit is wrong.
    pub fn parse(s: &str) -> Result<Self, EanError> {
        check_digits(s, EAN_LENGTH)?;

        let expected = calculate_check_digit(s.get(..EAN_PREFIX_LENGTH).unwrap_or_default());
        let found = s.chars().last().unwrap_or_default();
        if expected != found {
            return Err(EanError::Checksum { expected, found });
        }

        Ok(Self(s.to_owned()))
    }

    /// Build a full code from its twelve payload digits.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix is not twelve decimal digits.
    pub fn from_prefix(prefix: &str) -> Result<Self, EanError> {
        check_digits(prefix, EAN_PREFIX_LENGTH)?;

        let mut code = String::with_capacity(EAN_LENGTH);
        code.push_str(prefix);
        code.push(calculate_check_digit(prefix));
        Ok(Self(code))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Ean` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// The twelve payload digits.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.0.get(..EAN_PREFIX_LENGTH).unwrap_or_default()
    }

    /// The trailing check digit.
    #[must_use]
    pub fn check_digit(&self) -> char {
        self.0.chars().last().unwrap_or('0')
    }

    /// Returns `true` for codes in the variable-price range.
    #[must_use]
    pub fn is_variable_price(&self) -> bool {
        is_variable_price_ean(&self.0)
    }

    /// The price embedded in a variable-price code.
    ///
    /// Returns `None` for fixed-price codes.
    #[must_use]
    pub fn embedded_price(&self) -> Option<Decimal> {
        if !self.is_variable_price() {
            return None;
        }
        let cents: i64 = self
            .0
            .get(VARIABLE_PRICE_PRODUCT_DIGITS..EAN_PREFIX_LENGTH)?
            .parse()
            .ok()?;
        Some(Decimal::new(cents, 2))
    }

    /// The code under which the product is listed in a store's catalogue.
    ///
    /// Variable-price codes are listed with a zero price part; fixed-price
    /// codes are returned unchanged.
    ///
    /// ```
    /// use grocery_aid_core::Ean;
    ///
    /// let weighed = Ean::parse("2123456012347").unwrap();
    /// assert_eq!(weighed.lookup_code().as_str(), "2123456000009");
    /// ```
    #[must_use]
    pub fn lookup_code(&self) -> Self {
        if !self.is_variable_price() {
            return self.clone();
        }
        self.with_price_digits("0000")
    }

    /// Embed `price` into a variable-price code.
    ///
    /// The price is rounded to whole cents.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is not a variable-price code or if the
    /// price does not fit four digits of cents.
    pub fn with_price(&self, price: Decimal) -> Result<Self, EanError> {
        if !self.is_variable_price() {
            return Err(EanError::NotVariablePrice(self.0.clone()));
        }

        let cents = (price.round_dp(2) * Decimal::ONE_HUNDRED)
            .to_u32()
            .filter(|cents| *cents <= MAX_EMBEDDED_CENTS)
            .ok_or(EanError::PriceOutOfRange(price))?;

        Ok(self.with_price_digits(&format!("{cents:04}")))
    }

    fn with_price_digits(&self, price_digits: &str) -> Self {
        let product = self
            .0
            .get(..VARIABLE_PRICE_PRODUCT_DIGITS)
            .unwrap_or_default();
        let prefix = format!("{product}{price_digits}");
        let check = calculate_check_digit(&prefix);
        Self(format!("{prefix}{check}"))
    }
}

/// Check that `s` is exactly `len` ASCII digits.
fn check_digits(s: &str, len: usize) -> Result<(), EanError> {
    if let Some((position, character)) = s.chars().enumerate().find(|(_, c)| !c.is_ascii_digit())
    {
        return Err(EanError::NonDigit {
            position,
            character,
        });
    }

    if s.len() != len {
        return Err(EanError::WrongLength {
            expected: len,
            found: s.len(),
        });
    }

    Ok(())
}

impl fmt::Display for Ean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Ean {
    type Err = EanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Ean {
    type Error = EanError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Ean> for String {
    fn from(ean: Ean) -> Self {
        ean.0
    }
}

impl AsRef<str> for Ean {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Ean {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_check_digit_known_codes() {
        assert_eq!(calculate_check_digit("400638133393"), '1');
        assert_eq!(calculate_check_digit("590123412345"), '7');
        assert_eq!(calculate_check_digit("200000000000"), '8');
    }

    #[test]
    fn test_check_digit_zero_checksum() {
        // Weighted sum is a multiple of ten
        assert_eq!(calculate_check_digit("000000000000"), '0');
    }

    #[test]
    fn test_check_digit_garbage_input_is_total() {
        let digit = calculate_check_digit("not a barcode at all");
        assert!(digit.is_ascii_digit());
        assert!(calculate_check_digit("").is_ascii_digit());
    }

    #[test]
    fn test_is_valid_ean() {
        assert!(is_valid_ean("4006381333931"));
        assert!(is_valid_ean("5901234123457"));
        assert!(!is_valid_ean("4006381333932"));
        assert!(!is_valid_ean("123"));
        assert!(!is_valid_ean("abcdefghijklm"));
        assert!(!is_valid_ean(""));
        assert!(!is_valid_ean("40063813339311"));
        assert!(!is_valid_ean(" 4006381333931"));
    }

    #[test]
    fn test_is_valid_ean_multibyte_input() {
        // Thirteen bytes but not thirteen digits
        assert!(!is_valid_ean("40063813339é"));
    }

    #[test]
    fn test_is_variable_price_ean() {
        assert!(is_variable_price_ean("2000000000000"));
        assert!(!is_variable_price_ean("4006381333931"));
        // Not validated on its own
        assert!(is_variable_price_ean("2"));
        assert!(!is_variable_price_ean(""));
    }

    #[test]
    fn test_parse_valid() {
        let ean = Ean::parse("4006381333931").unwrap();
        assert_eq!(ean.as_str(), "4006381333931");
        assert_eq!(ean.prefix(), "400638133393");
        assert_eq!(ean.check_digit(), '1');
    }

    #[test]
    fn test_parse_wrong_length() {
        assert_eq!(
            Ean::parse("123"),
            Err(EanError::WrongLength {
                expected: 13,
                found: 3
            })
        );
    }

    #[test]
    fn test_parse_non_digit() {
        assert_eq!(
            Ean::parse("40063813x3931"),
            Err(EanError::NonDigit {
                position: 8,
                character: 'x'
            })
        );
    }

    #[test]
    fn test_parse_checksum() {
        assert_eq!(
            Ean::parse("4006381333932"),
            Err(EanError::Checksum {
                expected: '1',
                found: '2'
            })
        );
    }

    #[test]
    fn test_from_prefix() {
        let ean = Ean::from_prefix("590123412345").unwrap();
        assert_eq!(ean.as_str(), "5901234123457");
        assert!(Ean::from_prefix("59012341234").is_err());
        assert!(Ean::from_prefix("59012341234a").is_err());
    }

    #[test]
    fn test_embedded_price() {
        let ean = Ean::parse("2123456012347").unwrap();
        assert!(ean.is_variable_price());
        assert_eq!(ean.embedded_price(), Some(Decimal::new(1234, 2)));

        let fixed = Ean::parse("4006381333931").unwrap();
        assert_eq!(fixed.embedded_price(), None);
    }

    #[test]
    fn test_lookup_code() {
        let ean = Ean::parse("2123456012347").unwrap();
        let lookup = ean.lookup_code();
        assert_eq!(lookup.as_str(), "2123456000009");
        assert!(is_valid_ean(lookup.as_str()));

        let fixed = Ean::parse("4006381333931").unwrap();
        assert_eq!(fixed.lookup_code(), fixed);
    }

    #[test]
    fn test_with_price() {
        let base = Ean::parse("2123456000009").unwrap();
        let priced = base.with_price(Decimal::new(1234, 2)).unwrap();
        assert_eq!(priced.as_str(), "2123456012347");
        assert_eq!(priced.lookup_code(), base);
    }

    #[test]
    fn test_with_price_rounds_to_cents() {
        let base = Ean::parse("2123456000009").unwrap();
        let priced = base.with_price(Decimal::new(12_345, 3)).unwrap();
        assert_eq!(priced.embedded_price(), Some(Decimal::new(1234, 2)));
    }

    #[test]
    fn test_with_price_out_of_range() {
        let base = Ean::parse("2123456000009").unwrap();
        assert!(matches!(
            base.with_price(Decimal::new(10_000, 2)),
            Err(EanError::PriceOutOfRange(_))
        ));
        assert!(matches!(
            base.with_price(Decimal::new(-1, 2)),
            Err(EanError::PriceOutOfRange(_))
        ));
    }

    #[test]
    fn test_with_price_fixed_price_code() {
        let fixed = Ean::parse("4006381333931").unwrap();
        assert!(matches!(
            fixed.with_price(Decimal::ONE),
            Err(EanError::NotVariablePrice(_))
        ));
    }

    #[test]
    fn test_serde_roundtrip() {
        let ean = Ean::parse("4006381333931").unwrap();
        let json = serde_json::to_string(&ean).unwrap();
        assert_eq!(json, "\"4006381333931\"");

        let parsed: Ean = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ean);
    }

    #[test]
    fn test_deserialize_rejects_invalid() {
        assert!(serde_json::from_str::<Ean>("\"4006381333932\"").is_err());
    }

    #[test]
    fn test_from_str_and_display() {
        let ean = Ean::from_str("4006381333931").unwrap();
        assert_eq!(format!("{ean}"), "4006381333931");
        let s: &str = ean.as_ref();
        assert_eq!(s, "4006381333931");
    }
}
