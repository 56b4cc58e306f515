//! Offline EAN-13 tools.
//!
//! # Usage
//!
//! ```bash
//! grocery-aid ean check 2123456012347
//! grocery-aid ean complete 212345601234
//! grocery-aid ean price 2123456000009 4.99
//! ```

use std::io::Write;

use rust_decimal::Decimal;

use grocery_aid_core::Ean;

/// Validate `code` and describe it.
///
/// # Errors
///
/// Returns an error if `code` is not a valid EAN-13 or the output cannot be
/// written.
pub fn check(out: &mut impl Write, code: &str) -> Result<(), Box<dyn std::error::Error>> {
    let ean = Ean::parse(code.trim())?;

    writeln!(out, "{ean}: valid")?;
    if let Some(price) = ean.embedded_price() {
        writeln!(out, "  Variable price: {price:.2}")?;
        writeln!(out, "  Catalogue code: {}", ean.lookup_code())?;
    }
    Ok(())
}

/// Complete a 12-digit prefix with its check digit.
///
/// # Errors
///
/// Returns an error if `prefix` is not twelve digits or the output cannot be
/// written.
pub fn complete(out: &mut impl Write, prefix: &str) -> Result<(), Box<dyn std::error::Error>> {
    let ean = Ean::from_prefix(prefix.trim())?;
    writeln!(out, "{ean}")?;
    Ok(())
}

/// Embed `price` into the variable-price code `code`.
///
/// # Errors
///
/// Returns an error if `code` is not a valid variable-price EAN, the price
/// does not fit, or the output cannot be written.
pub fn price(
    out: &mut impl Write,
    code: &str,
    price: Decimal,
) -> Result<(), Box<dyn std::error::Error>> {
    let ean = Ean::parse(code.trim())?.with_price(price)?;
    writeln!(out, "{ean}")?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn output(f: impl FnOnce(&mut Vec<u8>) -> Result<(), Box<dyn std::error::Error>>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_check_fixed_price() {
        let text = output(|out| check(out, "4006381333931"));
        assert_eq!(text, "4006381333931: valid\n");
    }

    #[test]
    fn test_check_variable_price() {
        let text = output(|out| check(out, "2123456012347"));
        assert!(text.contains("Variable price: 12.34"));
        assert!(text.contains("Catalogue code: 2123456000009"));
    }

    #[test]
    fn test_check_invalid() {
        let mut out = Vec::new();
        assert!(check(&mut out, "4006381333932").is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_complete() {
        assert_eq!(
            output(|out| complete(out, "400638133393")),
            "4006381333931\n"
        );
        assert!(complete(&mut Vec::new(), "4006").is_err());
    }

    #[test]
    fn test_price() {
        let text = output(|out| price(out, "2123456000009", Decimal::new(1234, 2)));
        assert_eq!(text, "2123456012347\n");
    }

    #[test]
    fn test_price_rejects_fixed_price_code() {
        assert!(price(&mut Vec::new(), "4006381333931", Decimal::ONE).is_err());
    }
}
