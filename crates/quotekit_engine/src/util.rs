//! Cell coercion helpers shared by extraction and composition.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{Days, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;

use crate::conf::{
    N_EXCEL_SERIAL_MAX, PATTERN_EMAIL, TUP_CURRENCY_MARKS, TUP_DATE_FORMATS, derive_excel_epoch,
};
use crate::spec::{CellCoerceError, EnumCellValue};

static RE_EMAIL: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(PATTERN_EMAIL).ok());

/// Loose syntactic email check.
pub(crate) fn is_valid_email(value: &str) -> bool {
    RE_EMAIL
        .as_ref()
        .is_some_and(|re| re.is_match(value.trim()))
}

/// Parse numeric text such as `1,200`, `¥1,200` or `1200円`.
pub(crate) fn parse_decimal_text(value: &str) -> Option<Decimal> {
    let txt: String = value
        .trim()
        .chars()
        .filter(|c| *c != ',' && !TUP_CURRENCY_MARKS.contains(c))
        .collect();
    let txt = txt.trim();
    if txt.is_empty() {
        return None;
    }
    Decimal::from_str(txt).ok()
}

/// Coerce a cell into a number.
///
/// `Ok(None)` for blank cells.
pub(crate) fn coerce_decimal(
    value: &EnumCellValue,
) -> Result<Option<Decimal>, CellCoerceError> {
    let not_a_number = || CellCoerceError::NotANumber(value.to_text());
    match value {
        EnumCellValue::Empty => Ok(None),
        EnumCellValue::Number(n) => Ok(Some(*n)),
        EnumCellValue::Text(s) if s.trim().is_empty() => Ok(None),
        EnumCellValue::Text(s) => parse_decimal_text(s).map(Some).ok_or_else(not_a_number),
        EnumCellValue::Date(_) => Err(not_a_number()),
    }
}

/// Convert an Excel serial day number; the time fraction is ignored.
pub(crate) fn derive_date_from_serial(serial: Decimal) -> Option<NaiveDate> {
    let n_days = u64::try_from(serial.trunc()).ok()?;
    if n_days == 0 || n_days > N_EXCEL_SERIAL_MAX {
        return None;
    }
    derive_excel_epoch()?.checked_add_days(Days::new(n_days))
}

/// Parse `YYYY-MM-DD`, `YYYY/MM/DD` or `YYYY.MM.DD`.
pub(crate) fn parse_date_text(value: &str) -> Option<NaiveDate> {
    let txt = value.trim();
    TUP_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(txt, fmt).ok())
}

/// Coerce a cell into a date.
///
/// `Ok(None)` for blank cells; serial numbers outside the Excel range fail.
pub(crate) fn coerce_date(
    value: &EnumCellValue,
) -> Result<Option<NaiveDate>, CellCoerceError> {
    let not_a_date = || CellCoerceError::NotADate(value.to_text());
    match value {
        EnumCellValue::Empty => Ok(None),
        EnumCellValue::Date(d) => Ok(Some(*d)),
        EnumCellValue::Number(n) => derive_date_from_serial(*n).map(Some).ok_or_else(not_a_date),
        EnumCellValue::Text(s) if s.trim().is_empty() => Ok(None),
        EnumCellValue::Text(s) => parse_date_text(s).map(Some).ok_or_else(not_a_date),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::{
        coerce_date, coerce_decimal, derive_date_from_serial, is_valid_email, parse_decimal_text,
    };
    use crate::spec::{CellCoerceError, EnumCellValue};

    #[test]
    fn numeric_text_allows_separators_and_currency_marks() {
        assert_eq!(parse_decimal_text("1,200"), Some(Decimal::new(1200, 0)));
        assert_eq!(parse_decimal_text(" ¥1,200.5 "), Some(Decimal::new(12005, 1)));
        assert_eq!(parse_decimal_text("300円"), Some(Decimal::new(300, 0)));
        assert_eq!(parse_decimal_text("-2"), Some(Decimal::new(-2, 0)));
        assert_eq!(parse_decimal_text("twelve"), None);
        assert_eq!(parse_decimal_text(","), None);
    }

    #[test]
    fn decimal_coercion_distinguishes_blank_from_invalid() {
        assert_eq!(coerce_decimal(&EnumCellValue::Empty), Ok(None));
        assert_eq!(coerce_decimal(&EnumCellValue::from(" ")), Ok(None));
        assert_eq!(
            coerce_decimal(&EnumCellValue::from("2")),
            Ok(Some(Decimal::TWO))
        );
        assert_eq!(
            coerce_decimal(&EnumCellValue::from("n/a")),
            Err(CellCoerceError::NotANumber("n/a".to_string()))
        );
    }

    #[test]
    fn dates_from_serials_and_text() {
        let d = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        assert_eq!(derive_date_from_serial(Decimal::new(45383, 0)), Some(d));
        assert_eq!(derive_date_from_serial(Decimal::new(453835, 1)), Some(d));
        assert_eq!(derive_date_from_serial(Decimal::ZERO), None);
        assert_eq!(derive_date_from_serial(Decimal::new(-5, 0)), None);

        for txt in ["2024-04-01", "2024/04/01", "2024.04.01"] {
            assert_eq!(coerce_date(&EnumCellValue::from(txt)), Ok(Some(d)));
        }
        assert_eq!(
            coerce_date(&EnumCellValue::from("April 1st")).map_err(|e| e.to_string()),
            Err("`April 1st` is not a date".to_string())
        );
        assert_eq!(coerce_date(&EnumCellValue::Empty), Ok(None));
    }

    #[test]
    fn email_syntax() {
        assert!(is_valid_email("sales@example.co.jp"));
        assert!(is_valid_email(" a.b+c@example.com "));
        assert!(!is_valid_email("no-at-sign.example.com"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("space in@example.com"));
        assert!(!is_valid_email("user@localhost"));
    }
}
