//! In-memory workbook
//!
//! [`MemoryWorkbook`] is the [`WorkbookSource`] used by the command line tool
//! and the tests. It is filled either through its builder methods or from a
//! JSON workbook dump:
//!
//! ```json
//! {
//!   "sheets": {
//!     "Inputs": { "D6": { "value": 3 } },
//!     "Calc":   { "B2": { "formula": "=MAX(Inputs!D6,4)" },
//!                 "C2": { "value": 43101, "format": "dd/mm/yyyy" } }
//!   },
//!   "names": [ { "name": "BIGGER", "refers_to": "=Calc!$B$2" } ]
//! }
//! ```

use crate::cell::{CellAddress, CellValue};
use crate::error::{Error, Result};
use crate::named_range::DefinedName;
use crate::source::WorkbookSource;
use crate::MAX_SHEET_NAME_LEN;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Contents of one cell in a workbook dump
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellEntry {
    /// Formula text including the leading `=`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    /// Constant value (ignored for formula cells)
    #[serde(default, skip_serializing_if = "CellValue::is_empty")]
    pub value: CellValue,
    /// Number format string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Serialized form of a workbook
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkbookDump {
    /// Sheet name -> A1 address -> cell
    #[serde(default)]
    pub sheets: BTreeMap<String, BTreeMap<String, CellEntry>>,
    /// Defined names
    #[serde(default)]
    pub names: Vec<DefinedName>,
}

#[derive(Debug)]
struct MemorySheet {
    name: String,
    cells: AHashMap<(u32, u16), CellEntry>,
}

/// A workbook held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryWorkbook {
    sheets: Vec<MemorySheet>,
    names: Vec<DefinedName>,
}

impl MemoryWorkbook {
    /// Create an empty workbook with no sheets
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a workbook from its JSON dump
    pub fn from_json(json: &str) -> Result<Self> {
        let dump: WorkbookDump = serde_json::from_str(json)?;
        Self::from_dump(dump)
    }

    /// Build a workbook from a deserialized dump
    pub fn from_dump(dump: WorkbookDump) -> Result<Self> {
        let mut workbook = Self::new();
        for (sheet, cells) in dump.sheets {
            workbook.add_sheet(&sheet)?;
            for (address, entry) in cells {
                let address = CellAddress::parse(&address)?;
                workbook.sheet_mut(&sheet)?.cells.insert((address.row, address.col), entry);
            }
        }
        for name in dump.names {
            workbook.define_name(name)?;
        }
        Ok(workbook)
    }

    /// Convert back into the serialized form
    pub fn to_dump(&self) -> WorkbookDump {
        let sheets = self
            .sheets
            .iter()
            .map(|sheet| {
                let cells = sheet
                    .cells
                    .iter()
                    .map(|(&(row, col), entry)| {
                        (CellAddress::new(row, col).to_a1_string(), entry.clone())
                    })
                    .collect();
                (sheet.name.clone(), cells)
            })
            .collect();
        WorkbookDump {
            sheets,
            names: self.names.clone(),
        }
    }

    /// Add a new, empty sheet
    pub fn add_sheet(&mut self, name: &str) -> Result<()> {
        self.validate_sheet_name(name)?;
        self.sheets.push(MemorySheet {
            name: name.to_string(),
            cells: AHashMap::new(),
        });
        Ok(())
    }

    /// Set a constant cell value
    pub fn set_value<V: Into<CellValue>>(&mut self, sheet: &str, address: &str, value: V) -> Result<()> {
        let entry = self.entry_mut(sheet, address)?;
        entry.formula = None;
        entry.value = value.into();
        Ok(())
    }

    /// Set a cell formula (text must start with `=`)
    pub fn set_formula(&mut self, sheet: &str, address: &str, formula: &str) -> Result<()> {
        if !formula.trim_start().starts_with('=') {
            return Err(Error::other(format!(
                "formula for {}!{} must start with '=': {}",
                sheet, address, formula
            )));
        }
        let entry = self.entry_mut(sheet, address)?;
        entry.formula = Some(formula.to_string());
        entry.value = CellValue::Empty;
        Ok(())
    }

    /// Set the number format of a cell
    pub fn set_number_format(&mut self, sheet: &str, address: &str, format: &str) -> Result<()> {
        self.entry_mut(sheet, address)?.format = Some(format.to_string());
        Ok(())
    }

    /// Define a name
    ///
    /// Names are case-insensitive; defining the same name twice in the same
    /// scope is an error.
    pub fn define_name(&mut self, name: DefinedName) -> Result<()> {
        let clash = self.names.iter().any(|existing| {
            existing.local_sheet == name.local_sheet
                && existing.name.eq_ignore_ascii_case(&name.name)
        });
        if clash {
            return Err(Error::InvalidName(format!(
                "'{}' already exists in this scope",
                name.name
            )));
        }
        self.names.push(name);
        Ok(())
    }

    fn entry_mut(&mut self, sheet: &str, address: &str) -> Result<&mut CellEntry> {
        let address = CellAddress::parse(address)?;
        Ok(self
            .sheet_mut(sheet)?
            .cells
            .entry((address.row, address.col))
            .or_default())
    }

    // Sheet names are case-insensitive, as in spreadsheet applications
    fn sheet(&self, name: &str) -> Option<&MemorySheet> {
        self.sheets.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    fn sheet_mut(&mut self, name: &str) -> Result<&mut MemorySheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))
    }

    fn cell(&self, sheet: &str, address: CellAddress) -> Option<&CellEntry> {
        self.sheet(sheet)?.cells.get(&(address.row, address.col))
    }

    fn validate_sheet_name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidSheetName("Sheet name cannot be empty".into()));
        }
        if name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name too long (max {} characters)",
                MAX_SHEET_NAME_LEN
            )));
        }

        const INVALID_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']'];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name cannot contain '{}'",
                c
            )));
        }

        if self.sheets.iter().any(|s| s.name.eq_ignore_ascii_case(name)) {
            return Err(Error::DuplicateSheetName(name.into()));
        }

        Ok(())
    }
}

impl WorkbookSource for MemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn has_sheet(&self, sheet: &str) -> bool {
        self.sheet(sheet).is_some()
    }

    fn formula(&self, sheet: &str, address: CellAddress) -> Option<String> {
        self.cell(sheet, address)?.formula.clone()
    }

    fn value(&self, sheet: &str, address: CellAddress) -> CellValue {
        match self.cell(sheet, address) {
            Some(entry) if entry.formula.is_none() => entry.value.clone(),
            _ => CellValue::Empty,
        }
    }

    fn number_format(&self, sheet: &str, address: CellAddress) -> String {
        self.cell(sheet, address)
            .and_then(|entry| entry.format.clone())
            .unwrap_or_else(|| "General".to_string())
    }

    fn defined_names(&self) -> Vec<DefinedName> {
        self.names.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellRange;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builder_and_source() {
        let mut wb = MemoryWorkbook::new();
        wb.add_sheet("Calc").unwrap();
        wb.set_value("Calc", "A1", 2.0).unwrap();
        wb.set_formula("Calc", "B1", "=A1*2").unwrap();
        wb.set_number_format("Calc", "A1", "0.00").unwrap();

        let a1 = CellAddress::parse("A1").unwrap();
        let b1 = CellAddress::parse("$B$1").unwrap();
        assert_eq!(wb.value("Calc", a1), CellValue::Number(2.0));
        assert_eq!(wb.formula("Calc", a1), None);
        assert_eq!(wb.formula("Calc", b1).as_deref(), Some("=A1*2"));
        assert_eq!(wb.value("Calc", b1), CellValue::Empty);
        assert_eq!(wb.number_format("Calc", a1), "0.00");
        assert_eq!(wb.number_format("Calc", b1), "General");
        assert!(wb.has_sheet("Calc"));
        assert!(!wb.has_sheet("Other"));
    }

    #[test]
    fn test_sheet_names_ignore_case() {
        let mut wb = MemoryWorkbook::new();
        wb.add_sheet("Inputs").unwrap();
        wb.set_value("inputs", "D6", 3.0).unwrap();

        let d6 = CellAddress::parse("D6").unwrap();
        assert!(wb.has_sheet("INPUTS"));
        assert_eq!(wb.value("Inputs", d6), CellValue::Number(3.0));
        assert_eq!(wb.sheet_names(), vec!["Inputs".to_string()]);
    }

    #[test]
    fn test_invalid_sheets() {
        let mut wb = MemoryWorkbook::new();
        wb.add_sheet("Calc").unwrap();
        assert!(matches!(wb.add_sheet("calc"), Err(Error::DuplicateSheetName(_))));
        assert!(wb.add_sheet("").is_err());
        assert!(wb.add_sheet("a/b").is_err());
        assert!(wb.add_sheet(&"x".repeat(MAX_SHEET_NAME_LEN + 1)).is_err());
        assert!(matches!(
            wb.set_value("Missing", "A1", 1.0),
            Err(Error::SheetNotFound(_))
        ));
        assert!(wb.set_formula("Calc", "A1", "A2").is_err());
    }

    #[test]
    fn test_duplicate_name() {
        let mut wb = MemoryWorkbook::new();
        wb.define_name(DefinedName::new("Rate", "=Calc!$A$1")).unwrap();
        assert!(wb.define_name(DefinedName::new("RATE", "=Calc!$A$2")).is_err());
        wb.define_name(DefinedName::sheet_scope("Rate", "=Calc!$A$3", "Calc"))
            .unwrap();
    }

    #[test]
    fn test_from_json() {
        let wb = MemoryWorkbook::from_json(
            r#"{
                "sheets": {
                    "Inputs": { "D6": { "value": 3 } },
                    "Calc": {
                        "B2": { "formula": "=MAX(Inputs!D6,4)" },
                        "C2": { "value": 43101, "format": "dd/mm/yyyy" }
                    }
                },
                "names": [ { "name": "BIGGER", "refers_to": "=Calc!$B$2" } ]
            }"#,
        )
        .unwrap();

        let range = CellRange::parse("B2:C2").unwrap();
        assert_eq!(
            wb.formulas_in("Calc", &range),
            vec![vec![Some("=MAX(Inputs!D6,4)".to_string()), None]]
        );
        assert_eq!(
            wb.values_in("Calc", &range),
            vec![vec![CellValue::Empty, CellValue::Number(43101.0)]]
        );
        assert_eq!(wb.defined_names().len(), 1);

        let dump = wb.to_dump();
        assert_eq!(dump.sheets["Calc"]["C2"].format.as_deref(), Some("dd/mm/yyyy"));
    }

    #[test]
    fn test_bad_dump() {
        assert!(matches!(MemoryWorkbook::from_json("{"), Err(Error::Dump(_))));
        assert!(MemoryWorkbook::from_json(r#"{"sheets": {"S": {"A0": {}}}}"#).is_err());
    }
}
