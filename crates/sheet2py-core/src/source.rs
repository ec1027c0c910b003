//! Read access to a workbook
//!
//! The compiler never opens spreadsheet files itself. Everything it knows
//! about a workbook comes through [`WorkbookSource`], a pull interface asked
//! one cell at a time.

use crate::cell::{CellAddress, CellRange, CellValue};
use crate::named_range::DefinedName;

/// A workbook the compiler can read formulas, values and names from
pub trait WorkbookSource {
    /// Sheet names as the workbook spells them, in workbook order
    fn sheet_names(&self) -> Vec<String>;

    /// Whether a sheet with this name exists, ignoring ASCII case
    fn has_sheet(&self, sheet: &str) -> bool;

    /// Formula text of a cell, including the leading `=`, or `None` for a
    /// constant or empty cell
    fn formula(&self, sheet: &str, address: CellAddress) -> Option<String>;

    /// The constant value of a cell
    fn value(&self, sheet: &str, address: CellAddress) -> CellValue;

    /// The number format string of a cell (`"General"` when unset)
    fn number_format(&self, sheet: &str, address: CellAddress) -> String;

    /// All defined names, in workbook order
    fn defined_names(&self) -> Vec<DefinedName>;

    /// Formulas of every cell in a range, row by row
    fn formulas_in(&self, sheet: &str, range: &CellRange) -> Vec<Vec<Option<String>>> {
        range
            .rows()
            .into_iter()
            .map(|row| row.into_iter().map(|addr| self.formula(sheet, addr)).collect())
            .collect()
    }

    /// Values of every cell in a range, row by row
    fn values_in(&self, sheet: &str, range: &CellRange) -> Vec<Vec<CellValue>> {
        range
            .rows()
            .into_iter()
            .map(|row| row.into_iter().map(|addr| self.value(sheet, addr)).collect())
            .collect()
    }
}
