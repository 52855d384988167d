//! `quotekit_io_xlsx` v1:
//! Workbook-backed cell and document stores.
//!
//! Modules:
//! - `workbook` : `XlsxWorkbook` (calamine in, rust_xlsxwriter out)
//! - `document` : `XlsxDocumentStore` over a documents root
//! - `conf`     : formats and folder constants
//! - `spec`     : errors and store options

pub mod conf;
pub mod document;
pub mod spec;
pub mod workbook;

pub use document::{XlsxDocumentStore, derive_file_url};
pub use spec::{SpecXlsxStoreOptions, XlsxError};
pub use workbook::XlsxWorkbook;
