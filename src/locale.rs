// Locale codec for the source file (pt-BR conventions)
//
// Amount grammar, input and display:
//
//   amount  := ["-"] group ("." group3)* ["," digit+]
//   group   := digit{1,3}          (display always groups by three)
//
// `.` separates thousands, `,` separates decimals. Display always renders
// exactly two decimals. The input parser is lenient about grouping (it only
// strips `.`), so plain "1234,5" and "1.234,50" both read as 1234.50.

use crate::error::FieldCoercionError;
use chrono::{Datelike, NaiveDate};

/// Day/month/year pattern used by the source file and the detail table.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Prefix used when an amount is shown as money.
pub const CURRENCY_PREFIX: &str = "R$ ";

/// Month labels for selectors, January first.
pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Fev", "Mar", "Abr", "Mai", "Jun", "Jul", "Ago", "Set", "Out", "Nov", "Dez",
];

/// Decode ISO-8859-1 bytes. Every byte is the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Parse a source amount such as `1.234,56`.
///
/// Rejects blanks, non-numeric text, non-finite values and negatives.
pub fn parse_amount(raw: &str) -> Result<f64, FieldCoercionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FieldCoercionError::InvalidAmount(raw.to_string()));
    }

    let normalized = trimmed.replace('.', "").replace(',', ".");
    let value: f64 = normalized
        .parse()
        .map_err(|_| FieldCoercionError::InvalidAmount(raw.to_string()))?;

    if !value.is_finite() {
        return Err(FieldCoercionError::InvalidAmount(raw.to_string()));
    }
    if value < 0.0 {
        return Err(FieldCoercionError::NegativeAmount(raw.to_string()));
    }

    // -0,00 reads as plain zero
    Ok(if value == 0.0 { 0.0 } else { value })
}

/// Format an amount as `1.234,56`, rounded to cents.
pub fn format_amount(value: f64) -> String {
    let cents = (value * 100.0).round() as i64;
    let negative = cents < 0;
    let cents = cents.unsigned_abs();

    let units = (cents / 100).to_string();
    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, digit) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    format!(
        "{}{},{:02}",
        if negative { "-" } else { "" },
        grouped,
        cents % 100
    )
}

/// Format an amount as money: `R$ 1.234,56`.
pub fn format_currency(value: f64) -> String {
    format!("{}{}", CURRENCY_PREFIX, format_amount(value))
}

/// Parse a `DD/MM/YYYY` issue date. Impossible dates like `31/02/2023` fail.
pub fn parse_issue_date(raw: &str) -> Result<NaiveDate, FieldCoercionError> {
    let date = NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| FieldCoercionError::InvalidDate(raw.to_string()))?;

    if !(1000..=9999).contains(&date.year()) {
        return Err(FieldCoercionError::InvalidDate(raw.to_string()));
    }

    Ok(date)
}

/// Render a date for display, `DD/MM/YYYY`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_with_thousands() {
        assert_eq!(parse_amount("1.234,56"), Ok(1234.56));
        assert_eq!(parse_amount("1.000.000,00"), Ok(1_000_000.0));
    }

    #[test]
    fn test_parse_amount_without_groups() {
        assert_eq!(parse_amount("150,00"), Ok(150.0));
        assert_eq!(parse_amount("75"), Ok(75.0));
        assert_eq!(parse_amount(" 12,5 "), Ok(12.5));
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert!(matches!(
            parse_amount(""),
            Err(FieldCoercionError::InvalidAmount(_))
        ));
        assert!(matches!(
            parse_amount("abc"),
            Err(FieldCoercionError::InvalidAmount(_))
        ));
        assert!(matches!(
            parse_amount("NaN"),
            Err(FieldCoercionError::InvalidAmount(_))
        ));
        assert!(matches!(
            parse_amount("inf"),
            Err(FieldCoercionError::InvalidAmount(_))
        ));
        assert!(matches!(
            parse_amount("1,2,3"),
            Err(FieldCoercionError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_parse_amount_rejects_negative() {
        assert_eq!(
            parse_amount("-10,00"),
            Err(FieldCoercionError::NegativeAmount("-10,00".to_string()))
        );
        assert_eq!(parse_amount("-0,00"), Ok(0.0));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0), "0,00");
        assert_eq!(format_amount(5.5), "5,50");
        assert_eq!(format_amount(999.999), "1.000,00");
        assert_eq!(format_amount(1234.56), "1.234,56");
        assert_eq!(format_amount(1234567.8), "1.234.567,80");
        assert_eq!(format_amount(-1234.5), "-1.234,50");
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(1234.56), "R$ 1.234,56");
    }

    #[test]
    fn test_format_then_parse_returns_same_cents() {
        for value in [0.0, 0.01, 9.99, 100.0, 1234.56, 98765.43, 1_234_567.89] {
            let parsed = parse_amount(&format_amount(value)).unwrap();
            assert!((parsed - value).abs() < 0.005, "{} -> {}", value, parsed);
        }
    }

    #[test]
    fn test_parse_issue_date() {
        let date = parse_issue_date("05/03/2023").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 3, 5).unwrap());
        assert_eq!(format_date(date), "05/03/2023");
    }

    #[test]
    fn test_parse_issue_date_rejects_impossible_dates() {
        assert!(parse_issue_date("31/02/2023").is_err());
        assert!(parse_issue_date("2023-03-05").is_err());
        assert!(parse_issue_date("05/03/23").is_err());
        assert!(parse_issue_date("").is_err());
    }

    #[test]
    fn test_decode_latin1() {
        assert_eq!(decode_latin1(b"Jo\xe3o Di\xe1ria"), "João Diária");
    }
}
