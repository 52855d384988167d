//! In-memory workbook loaded with calamine and saved with rust_xlsxwriter.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use calamine::{Data, Reader, open_workbook_auto};
use chrono::{Datelike, Days, NaiveDate};
use quotekit_engine::conf::{N_EXCEL_SERIAL_MAX, derive_excel_epoch};
use quotekit_engine::{CellStore, EnumCellValue, StoreError};
use quotekit_schema::{EnumSheetRole, SpecCellCoordinate};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet};

use crate::conf::{derive_default_date_format, derive_default_number_format};
use crate::spec::XlsxError;

#[derive(Debug, Clone, Default)]
struct SpecSheetCells {
    name: String,
    dict_cells: BTreeMap<(u32, u32), EnumCellValue>,
}

/// Sheet values keyed by zero-based `(row, col)`, plus a role -> sheet map.
///
/// Only values survive a load/save cycle. Styling of the source workbook is
/// not carried over; saved cells use the number/date presets from
/// [`crate::conf`].
#[derive(Debug, Clone, Default)]
pub struct XlsxWorkbook {
    path_source: Option<PathBuf>,
    l_sheets: Vec<SpecSheetCells>,
    dict_roles: BTreeMap<EnumSheetRole, String>,
}

impl XlsxWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty sheet bound to `role`. An existing sheet is reused.
    pub fn with_sheet(mut self, role: EnumSheetRole, name: &str) -> Self {
        if self.sheet(name).is_none() {
            self.l_sheets.push(SpecSheetCells {
                name: name.to_string(),
                ..Default::default()
            });
        }
        self.dict_roles.insert(role, name.to_string());
        self
    }

    /// Load every sheet of `path`; each role in `dict_roles` must name one.
    pub fn open(
        path: &Path,
        dict_roles: BTreeMap<EnumSheetRole, String>,
    ) -> Result<Self, XlsxError> {
        let mut workbook = open_workbook_auto(path).map_err(|e| XlsxError::Open {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut l_sheets = Vec::new();
        for name_sheet in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&name_sheet)
                .map_err(|e| XlsxError::SheetRead {
                    path: path.to_path_buf(),
                    sheet: name_sheet.clone(),
                    message: e.to_string(),
                })?;
            let (n_row_start, n_col_start) = range.start().unwrap_or((0, 0));

            let mut dict_cells = BTreeMap::new();
            for (idx_row, idx_col, data) in range.used_cells() {
                let value = convert_data(data);
                if value.is_empty() {
                    continue;
                }
                let (Ok(idx_row), Ok(idx_col)) = (u32::try_from(idx_row), u32::try_from(idx_col))
                else {
                    continue;
                };
                dict_cells.insert((n_row_start + idx_row, n_col_start + idx_col), value);
            }
            l_sheets.push(SpecSheetCells {
                name: name_sheet,
                dict_cells,
            });
        }

        for name_sheet in dict_roles.values() {
            if !l_sheets.iter().any(|s| &s.name == name_sheet) {
                return Err(XlsxError::SheetMissing {
                    path: path.to_path_buf(),
                    sheet: name_sheet.clone(),
                });
            }
        }

        tracing::debug!(
            path = %path.display(),
            n_sheets = l_sheets.len(),
            "workbook loaded"
        );
        Ok(Self {
            path_source: Some(path.to_path_buf()),
            l_sheets,
            dict_roles,
        })
    }

    /// Path this workbook was loaded from, if any.
    pub fn path_source(&self) -> Option<&Path> {
        self.path_source.as_deref()
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.l_sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Write every sheet to `path`, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<(), XlsxError> {
        let fmt_number = derive_default_number_format();
        let fmt_date = derive_default_date_format();

        let mut workbook = Workbook::new();
        for spec_sheet in &self.l_sheets {
            let worksheet = workbook.add_worksheet();
            worksheet
                .set_name(&spec_sheet.name)
                .map_err(|e| XlsxError::write(path, e))?;
            for ((idx_row, idx_col), value) in &spec_sheet.dict_cells {
                write_cell(worksheet, *idx_row, *idx_col, value, &fmt_number, &fmt_date)
                    .map_err(|message| XlsxError::Write {
                        path: path.to_path_buf(),
                        message,
                    })?;
            }
        }
        workbook.save(path).map_err(|e| XlsxError::write(path, e))?;
        tracing::debug!(path = %path.display(), "workbook saved");
        Ok(())
    }

    fn sheet(&self, name: &str) -> Option<&SpecSheetCells> {
        self.l_sheets.iter().find(|s| s.name == name)
    }

    fn sheet_for_role(&self, role: EnumSheetRole) -> Result<&SpecSheetCells, StoreError> {
        self.dict_roles
            .get(&role)
            .and_then(|name| self.sheet(name))
            .ok_or(StoreError::SheetUnavailable(role))
    }

    fn sheet_for_role_mut(
        &mut self,
        role: EnumSheetRole,
    ) -> Result<&mut SpecSheetCells, StoreError> {
        let name = self
            .dict_roles
            .get(&role)
            .ok_or(StoreError::SheetUnavailable(role))?;
        self.l_sheets
            .iter_mut()
            .find(|s| &s.name == name)
            .ok_or(StoreError::SheetUnavailable(role))
    }
}

impl CellStore for XlsxWorkbook {
    fn read_cell(
        &self,
        role: EnumSheetRole,
        coord: SpecCellCoordinate,
    ) -> Result<EnumCellValue, StoreError> {
        let spec_sheet = self.sheet_for_role(role)?;
        Ok(spec_sheet
            .dict_cells
            .get(&(coord.row, coord.col))
            .cloned()
            .unwrap_or_default())
    }

    fn write_cell(
        &mut self,
        role: EnumSheetRole,
        coord: SpecCellCoordinate,
        value: EnumCellValue,
    ) -> Result<(), StoreError> {
        let spec_sheet = self.sheet_for_role_mut(role)?;
        if value.is_empty() {
            spec_sheet.dict_cells.remove(&(coord.row, coord.col));
        } else {
            spec_sheet.dict_cells.insert((coord.row, coord.col), value);
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// #region Conversion

fn convert_data(data: &Data) -> EnumCellValue {
    match data {
        Data::Empty => EnumCellValue::Empty,
        Data::String(s) => EnumCellValue::Text(s.clone()),
        Data::Int(n) => EnumCellValue::Number(Decimal::from(*n)),
        Data::Float(n) => match Decimal::try_from(*n) {
            Ok(v) => EnumCellValue::Number(v.normalize()),
            Err(_) => EnumCellValue::Text(n.to_string()),
        },
        Data::Bool(b) => EnumCellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => EnumCellValue::Text(e.to_string()),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            match derive_date_from_serial(serial) {
                Some(date) => EnumCellValue::Date(date),
                None => EnumCellValue::Text(serial.to_string()),
            }
        }
        Data::DateTimeIso(s) => s
            .get(..10)
            .and_then(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d").ok())
            .map(EnumCellValue::Date)
            .unwrap_or_else(|| EnumCellValue::Text(s.clone())),
        Data::DurationIso(s) => EnumCellValue::Text(s.clone()),
    }
}

fn derive_date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let n_days = serial.floor() as u64;
    if n_days > N_EXCEL_SERIAL_MAX {
        return None;
    }
    derive_excel_epoch()?.checked_add_days(Days::new(n_days))
}

fn write_cell(
    worksheet: &mut Worksheet,
    idx_row: u32,
    idx_col: u32,
    value: &EnumCellValue,
    fmt_number: &Format,
    fmt_date: &Format,
) -> Result<(), String> {
    let idx_col = cast_col_num(idx_col)?;
    match value {
        EnumCellValue::Empty => {}
        EnumCellValue::Text(val) => {
            worksheet
                .write_string(idx_row, idx_col, val)
                .map_err(|e| e.to_string())?;
        }
        EnumCellValue::Number(val) => {
            let n_value = val
                .to_f64()
                .ok_or_else(|| format!("amount {val} is not representable as a number"))?;
            worksheet
                .write_number_with_format(idx_row, idx_col, n_value, fmt_number)
                .map_err(|e| e.to_string())?;
        }
        EnumCellValue::Date(val) => {
            let (Ok(n_year), Ok(n_month), Ok(n_day)) = (
                u16::try_from(val.year()),
                u8::try_from(val.month()),
                u8::try_from(val.day()),
            ) else {
                return Err(format!("date {val} is out of range"));
            };
            let datetime =
                ExcelDateTime::from_ymd(n_year, n_month, n_day).map_err(|e| e.to_string())?;
            worksheet
                .write_datetime_with_format(idx_row, idx_col, &datetime, fmt_date)
                .map_err(|e| e.to_string())?;
        }
    }
    Ok(())
}

fn cast_col_num(value: u32) -> Result<u16, String> {
    u16::try_from(value).map_err(|_| format!("column index overflow: {value}"))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
