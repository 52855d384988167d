//! `quotekit_schema` v1:
//! Declarative layout registry for the estimate/invoice workbook.
//!
//! Modules:
//! - `address`  : A1 coordinates and ranges
//! - `conf`     : sheet limits and the stock layout preset
//! - `spec`     : enums, raw/validated models, errors
//! - `registry` : validated, read-only `SchemaRegistry`
//! - `util`     : validation helpers

pub mod address;
pub mod conf;
pub mod registry;
pub mod spec;
mod util;

pub use address::{A1ParseError, RangeParseError, SpecCellCoordinate, SpecCellRange};
pub use conf::derive_default_schema_raw;
pub use registry::SchemaRegistry;
pub use spec::{
    ConfigurationError, EnumDocumentType, EnumField, EnumHistoryColumn, EnumHistoryHeaderRaw,
    EnumItemRange, EnumLayout, EnumOverflowPolicy, EnumSheetRole, EnumTaxRounding,
    SpecDispatchPolicy, SpecDocumentLabels, SpecEmailIdentity, SpecFieldMap, SpecFieldMapRaw,
    SpecHistoryHeader, SpecItemWindow, SpecSchemaRaw, SpecTaxPolicy, SpecTaxPolicyRaw,
};
