//! XLSX constants and default cell format presets.

use rust_xlsxwriter::{Format, FormatAlign};

/// File extension of every workbook this crate writes.
pub const EXT_WORKBOOK: &str = "xlsx";

/// Staging subfolder (under the documents root) for unpersisted copies.
pub const NAME_DIR_STAGING: &str = ".staging";

/// Number format for amounts. Two decimals are shown only when present.
pub const FMT_NUM_AMOUNT: &str = "#,##0.##";

/// Number format for dates.
pub const FMT_NUM_DATE: &str = "yyyy/mm/dd";

/// Build the default amount format.
pub fn derive_default_number_format() -> Format {
    Format::new()
        .set_num_format(FMT_NUM_AMOUNT)
        .set_align(FormatAlign::Right)
}

/// Build the default date format.
pub fn derive_default_date_format() -> Format {
    Format::new().set_num_format(FMT_NUM_DATE)
}
