//! Cell-related types and utilities
//!
//! This module contains:
//! - [`CellValue`] - The constant value stored in a cell
//! - [`CellAddress`] - A cell's location (e.g., "A1")
//! - [`CellRange`] - A rectangular range of cells (e.g., "A1:B10")

mod address;
mod value;

pub use address::{CellAddress, CellRange};
pub use value::{excel_serial, CellValue};
