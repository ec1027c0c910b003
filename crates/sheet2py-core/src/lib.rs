//! # sheet2py-core
//!
//! Core data structures for the sheet2py formula compiler.
//!
//! This crate provides the fundamental types used throughout sheet2py:
//! - [`CellAddress`] and [`CellRange`] - Cell addressing and ranges
//! - [`Reference`] - Sheet-qualified references and their canonical keys
//! - [`CellValue`] - Values read from a workbook
//! - [`DefinedName`] - Workbook-level names
//! - [`WorkbookSource`] - The read interface to a workbook, with the
//!   in-memory [`MemoryWorkbook`] implementation
//!
//! ## Example
//!
//! ```rust
//! use sheet2py_core::{MemoryWorkbook, Reference, WorkbookSource};
//!
//! let mut workbook = MemoryWorkbook::new();
//! workbook.add_sheet("Inputs").unwrap();
//! workbook.set_value("Inputs", "D6", 3.0).unwrap();
//!
//! let reference = Reference::parse("Inputs!D6").unwrap();
//! assert_eq!(reference.canonical_key(None), "Inputs!$D$6");
//! ```

pub mod cell;
pub mod error;
pub mod named_range;
pub mod reference;
pub mod source;
pub mod workbook;

// Re-exports for convenience
pub use cell::{excel_serial, CellAddress, CellRange, CellValue};
pub use error::{Error, Result};
pub use named_range::DefinedName;
pub use reference::Reference;
pub use source::WorkbookSource;
pub use workbook::{CellEntry, MemoryWorkbook, WorkbookDump};

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
