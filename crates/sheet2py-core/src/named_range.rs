//! Defined names
//!
//! Defined names let users give meaningful names to cells, ranges, or
//! formulas. They become the attribute names of the generated class.
//!
//! # Example
//!
//! ```text
//! // "TaxRate" refers to cell B1 on Sheet1
//! TaxRate  =Sheet1!$B$1
//!
//! // "Total" is a name-level formula
//! Total    =SUM(Sheet1!$A$1:$A$10)
//! ```

use crate::reference::Reference;
use serde::{Deserialize, Serialize};

/// A workbook defined name
///
/// `refers_to` is stored as the spreadsheet reports it, which for a cell or
/// range is a formula with a leading `=`:
/// - `=Sheet1!$A$1` - single cell
/// - `=Sheet1!$A$1:$D$10` - range
/// - `=0.0725` - constant
/// - `=SUM(Sales)` - formula
/// - `=#REF!` or `=#NAME?` - broken names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinedName {
    /// The name (e.g., "SalesData", "TaxRate")
    pub name: String,
    /// What the name refers to
    pub refers_to: String,
    /// Sheet the name is local to, if it is not workbook-wide
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_sheet: Option<String>,
}

impl DefinedName {
    /// Create a workbook-scoped name
    pub fn new(name: impl Into<String>, refers_to: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            refers_to: refers_to.into(),
            local_sheet: None,
        }
    }

    /// Create a name local to one sheet
    pub fn sheet_scope(
        name: impl Into<String>,
        refers_to: impl Into<String>,
        sheet: impl Into<String>,
    ) -> Self {
        Self {
            local_sheet: Some(sheet.into()),
            ..Self::new(name, refers_to)
        }
    }

    /// Get the refers_to expression without the leading `=`
    pub fn expression(&self) -> &str {
        self.refers_to
            .strip_prefix('=')
            .unwrap_or(&self.refers_to)
            .trim()
    }

    /// The reference this name points at, if it is a plain cell or range
    pub fn reference(&self) -> Option<Reference> {
        let reference = Reference::parse(self.expression()).ok()?;
        match (&reference.sheet, &self.local_sheet) {
            (None, Some(sheet)) => Some(reference.qualified(sheet)),
            _ => Some(reference),
        }
    }

    /// The name as the spreadsheet could not resolve it (`=#NAME?`)
    pub fn is_unresolved(&self) -> bool {
        self.expression() == "#NAME?"
    }

    /// The name points at deleted cells
    pub fn is_broken(&self) -> bool {
        self.refers_to.contains("#REF!")
    }

    /// Print areas and titles the spreadsheet defines for itself
    pub fn is_builtin(&self) -> bool {
        let base = self.name.rsplit('!').next().unwrap_or(&self.name);
        let base = base.strip_prefix("_xlnm.").unwrap_or(base);
        matches!(base, "Print_Area" | "Print_Titles")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_name() {
        let name = DefinedName::new("TaxRate", "=Sheet1!$B$1");
        let reference = name.reference().unwrap();
        assert_eq!(reference.canonical_key(None), "Sheet1!$B$1");
        assert!(!name.is_broken());
    }

    #[test]
    fn test_formula_name() {
        let name = DefinedName::new("Total", "=SUM(Sheet1!A1:A10)");
        assert!(name.reference().is_none());
        assert_eq!(name.expression(), "SUM(Sheet1!A1:A10)");
    }

    #[test]
    fn test_local_name_gets_sheet() {
        let name = DefinedName::sheet_scope("Rate", "=$C$3", "Calc");
        assert_eq!(name.reference().unwrap().canonical_key(None), "Calc!$C$3");
    }

    #[test]
    fn test_broken_and_builtin() {
        assert!(DefinedName::new("Gone", "=#REF!$A$1").is_broken());
        assert!(DefinedName::new("Odd", "=#NAME?").is_unresolved());
        assert!(DefinedName::new("Calc!Print_Area", "=Calc!$A$1:$F$40").is_builtin());
        assert!(DefinedName::new("_xlnm.Print_Titles", "=Calc!$1:$1").is_builtin());
        assert!(!DefinedName::new("Print_Total", "=Calc!$A$1").is_builtin());
    }
}
