//! Engine constants: accepted input formats and output formats.

use chrono::NaiveDate;

/// Text date formats accepted for the issue date, tried in order.
pub const TUP_DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

/// Largest Excel serial day number (9999-12-31).
pub const N_EXCEL_SERIAL_MAX: u64 = 2_958_465;

/// Currency marks stripped from numeric text before parsing.
pub const TUP_CURRENCY_MARKS: [char; 3] = ['¥', '￥', '円'];

/// Loose syntactic email check: one `@`, no whitespace, dotted domain.
pub const PATTERN_EMAIL: &str = r"^[^\s@]+@[^\s@]+\.[^\s@.]+$";

/// Timestamp format written to the history log.
pub const FMT_HISTORY_TIMESTAMP: &str = "%Y/%m/%d %H:%M:%S";

/// Date format used inside generated document names.
pub const FMT_NAME_DATE: &str = "%Y%m%d";

/// Day zero of the Excel 1900 date system (accounts for the 1900 leap bug).
pub fn derive_excel_epoch() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30)
}
