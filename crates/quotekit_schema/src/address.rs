//! A1-style cell coordinates and rectangular ranges.
//!
//! Coordinates are parsed once when the registry is built and stored as
//! zero-based `(row, col)` pairs; rendering never re-parses strings.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::conf::{N_NCOLS_SHEET_MAX, N_NROWS_SHEET_MAX};

////////////////////////////////////////////////////////////////////////////////
// #region CellCoordinate

/// Zero-based cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpecCellCoordinate {
    /// Zero-based row index (`A1` -> 0).
    pub row: u32,
    /// Zero-based column index (`A1` -> 0).
    pub col: u32,
}

impl SpecCellCoordinate {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse an A1 reference such as `B7` or `$F$15`.
    pub fn from_a1(a1: &str) -> Result<Self, A1ParseError> {
        let s = a1.trim();
        if s.is_empty() {
            return Err(A1ParseError::Empty);
        }

        let bytes = s.as_bytes();
        let mut idx = 0usize;
        if bytes.get(idx) == Some(&b'$') {
            idx += 1;
        }

        let col_start = idx;
        while idx < bytes.len() && bytes[idx].is_ascii_alphabetic() {
            idx += 1;
        }
        if idx == col_start {
            return Err(A1ParseError::MissingColumn);
        }
        let col = derive_col_index(&s[col_start..idx])?;

        if bytes.get(idx) == Some(&b'$') {
            idx += 1;
        }

        let row_start = idx;
        while idx < bytes.len() && bytes[idx].is_ascii_digit() {
            idx += 1;
        }
        if idx == row_start {
            return Err(A1ParseError::MissingRow);
        }
        if idx != bytes.len() {
            return Err(A1ParseError::TrailingCharacters(s[idx..].to_string()));
        }

        let row_1based: u32 = s[row_start..idx]
            .parse()
            .map_err(|_| A1ParseError::InvalidRow)?;
        if row_1based == 0 || row_1based > N_NROWS_SHEET_MAX {
            return Err(A1ParseError::InvalidRow);
        }

        Ok(Self::new(row_1based - 1, col))
    }

    /// Render as an A1 reference without `$` markers.
    pub fn to_a1(self) -> String {
        format!("{}{}", derive_col_name(self.col), self.row + 1)
    }

    /// One-based row number as shown in spreadsheet UIs.
    pub fn row_number(self) -> u32 {
        self.row + 1
    }

    /// Shift down by `n_rows`, staying within sheet limits.
    pub fn offset_rows(self, n_rows: u32) -> Option<Self> {
        let row = self.row.checked_add(n_rows)?;
        (row < N_NROWS_SHEET_MAX).then_some(Self::new(row, self.col))
    }

    /// Shift right by `n_cols`, staying within sheet limits.
    pub fn offset_cols(self, n_cols: u32) -> Option<Self> {
        let col = self.col.checked_add(n_cols)?;
        (col < N_NCOLS_SHEET_MAX).then_some(Self::new(self.row, col))
    }
}

impl fmt::Display for SpecCellCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

impl FromStr for SpecCellCoordinate {
    type Err = A1ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_a1(s)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellRange

/// Inclusive rectangular range, normalized so that `start <= end` per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpecCellRange {
    /// Top-left corner.
    pub start: SpecCellCoordinate,
    /// Bottom-right corner.
    pub end: SpecCellCoordinate,
}

impl SpecCellRange {
    pub fn new(a: SpecCellCoordinate, b: SpecCellCoordinate) -> Self {
        Self {
            start: SpecCellCoordinate::new(a.row.min(b.row), a.col.min(b.col)),
            end: SpecCellCoordinate::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    /// Parse `A10:D14`; a lone `A1` yields a single-cell range.
    pub fn from_a1(a1: &str) -> Result<Self, RangeParseError> {
        let s = a1.trim();
        if s.is_empty() {
            return Err(RangeParseError::Empty);
        }
        match s.split_once(':') {
            None => {
                let cell = SpecCellCoordinate::from_a1(s)?;
                Ok(Self::new(cell, cell))
            }
            Some((a, b)) => {
                let start = SpecCellCoordinate::from_a1(a)?;
                let end = SpecCellCoordinate::from_a1(b)?;
                Ok(Self::new(start, end))
            }
        }
    }

    pub fn n_rows(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    pub fn n_cols(&self) -> u32 {
        self.end.col - self.start.col + 1
    }

    pub fn is_single_cell(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, coord: SpecCellCoordinate) -> bool {
        (self.start.row..=self.end.row).contains(&coord.row)
            && (self.start.col..=self.end.col).contains(&coord.col)
    }
}

impl fmt::Display for SpecCellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_cell() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// A1 reference parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum A1ParseError {
    #[error("empty cell reference")]
    Empty,
    #[error("cell reference has no column letters")]
    MissingColumn,
    #[error("cell reference column is out of range")]
    InvalidColumn,
    #[error("cell reference has no row number")]
    MissingRow,
    #[error("cell reference row is out of range")]
    InvalidRow,
    #[error("unexpected trailing characters `{0}` in cell reference")]
    TrailingCharacters(String),
}

/// A1 range parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeParseError {
    #[error("empty range reference")]
    Empty,
    #[error(transparent)]
    Cell(#[from] A1ParseError),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ColumnNames

fn derive_col_name(col: u32) -> String {
    let mut n = col + 1;
    let mut l_letters = Vec::<char>::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        l_letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    l_letters.iter().rev().collect()
}

fn derive_col_index(letters: &str) -> Result<u32, A1ParseError> {
    let mut col: u32 = 0;
    for b in letters.bytes() {
        let v = u32::from(b.to_ascii_uppercase() - b'A') + 1;
        col = col
            .checked_mul(26)
            .and_then(|c| c.checked_add(v))
            .ok_or(A1ParseError::InvalidColumn)?;
    }
    if col == 0 || col > N_NCOLS_SHEET_MAX {
        return Err(A1ParseError::InvalidColumn);
    }
    Ok(col - 1)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{A1ParseError, RangeParseError, SpecCellCoordinate, SpecCellRange};

    #[test]
    fn parses_plain_and_absolute_references() {
        assert_eq!(
            SpecCellCoordinate::from_a1("B2").unwrap(),
            SpecCellCoordinate::new(1, 1)
        );
        assert_eq!(
            SpecCellCoordinate::from_a1("$F$15").unwrap(),
            SpecCellCoordinate::new(14, 5)
        );
        assert_eq!(
            SpecCellCoordinate::from_a1(" aa10 ").unwrap(),
            SpecCellCoordinate::new(9, 26)
        );
    }

    #[test]
    fn renders_back_to_a1() {
        for a1 in ["A1", "Z9", "AA10", "XFD1048576"] {
            assert_eq!(SpecCellCoordinate::from_a1(a1).unwrap().to_a1(), a1);
        }
    }

    #[test]
    fn rejects_malformed_references() {
        assert_eq!(SpecCellCoordinate::from_a1(""), Err(A1ParseError::Empty));
        assert_eq!(
            SpecCellCoordinate::from_a1("15"),
            Err(A1ParseError::MissingColumn)
        );
        assert_eq!(
            SpecCellCoordinate::from_a1("B"),
            Err(A1ParseError::MissingRow)
        );
        assert_eq!(
            SpecCellCoordinate::from_a1("B0"),
            Err(A1ParseError::InvalidRow)
        );
        assert_eq!(
            SpecCellCoordinate::from_a1("XFE1"),
            Err(A1ParseError::InvalidColumn)
        );
        assert!(matches!(
            SpecCellCoordinate::from_a1("B2:C3"),
            Err(A1ParseError::TrailingCharacters(_))
        ));
    }

    #[test]
    fn range_is_normalized_and_sized() {
        let range = SpecCellRange::from_a1("D14:A10").unwrap();
        assert_eq!(range.to_string(), "A10:D14");
        assert_eq!(range.n_rows(), 5);
        assert_eq!(range.n_cols(), 4);
        assert!(range.contains(SpecCellCoordinate::from_a1("C12").unwrap()));
        assert!(!range.contains(SpecCellCoordinate::from_a1("E12").unwrap()));
        assert!(SpecCellRange::from_a1("F15").unwrap().is_single_cell());
        assert_eq!(SpecCellRange::from_a1(" "), Err(RangeParseError::Empty));
    }

    #[test]
    fn offsets_stay_within_sheet() {
        let coord = SpecCellCoordinate::from_a1("A10").unwrap();
        assert_eq!(coord.offset_rows(4).unwrap().to_a1(), "A14");
        assert_eq!(coord.offset_cols(3).unwrap().to_a1(), "D10");
        assert!(
            SpecCellCoordinate::from_a1("A1048576")
                .unwrap()
                .offset_rows(1)
                .is_none()
        );
    }
}
