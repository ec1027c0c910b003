//! Sheet-qualified references and their canonical keys
//!
//! A [`Reference`] is what a formula or a defined name points at: an optional
//! sheet plus a cell or rectangular range. Lookups never use the text as it
//! was written. They use the canonical key, which always names the sheet and
//! always writes both coordinates absolute, so `Inputs!D6`, `Inputs!$D$6` and
//! a bare `D6` typed on the `Inputs` sheet are one and the same entry.

use crate::cell::{CellAddress, CellRange};
use crate::error::{Error, Result};
use lazy_regex::{regex_is_match, regex_replace_all};
use std::fmt;

/// A reference to a cell or range, optionally qualified with a sheet
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    /// Sheet name without quotes, if the reference names one
    pub sheet: Option<String>,
    /// The referenced cells
    pub range: CellRange,
}

impl Reference {
    /// Create a reference from its parts
    pub fn new(sheet: Option<String>, range: CellRange) -> Self {
        Self { sheet, range }
    }

    /// Reference to a single cell on a sheet
    pub fn cell(sheet: impl Into<String>, address: CellAddress) -> Self {
        Self::new(Some(sheet.into()), CellRange::single(address))
    }

    /// Parse `Sheet!A1`, `'My Sheet'!$A$1:$B$2`, `A1`, with or without a
    /// leading `=`
    ///
    /// # Examples
    /// ```
    /// use sheet2py_core::Reference;
    ///
    /// let r = Reference::parse("='Proforma Preserved'!$E$46").unwrap();
    /// assert_eq!(r.sheet.as_deref(), Some("Proforma Preserved"));
    /// assert_eq!(r.canonical_key(None), "'Proforma Preserved'!$E$46");
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let text = text.strip_prefix('=').unwrap_or(text).trim();

        let (sheet, cells) = match text.rfind('!') {
            Some(bang) => (Some(unquote_sheet(&text[..bang])?), &text[bang + 1..]),
            None => (None, text),
        };

        let range = CellRange::parse(cells)
            .map_err(|e| Error::InvalidReference(format!("'{}': {}", text, e)))?;
        Ok(Self { sheet, range })
    }

    /// Whether the reference spans more than one cell
    pub fn is_multi_cell(&self) -> bool {
        !self.range.is_single_cell()
    }

    /// The sheet this reference lives on, falling back to `current_sheet`
    pub fn sheet_or<'a>(&'a self, current_sheet: Option<&'a str>) -> Option<&'a str> {
        self.sheet.as_deref().or(current_sheet)
    }

    /// Attach `sheet` when the reference does not already name one
    pub fn qualified(&self, sheet: &str) -> Self {
        Self {
            sheet: Some(self.sheet.clone().unwrap_or_else(|| sheet.to_string())),
            range: self.range,
        }
    }

    /// The canonical lookup key: `Sheet!$A$1` or `'My Sheet'!$A$1:$B$2`
    ///
    /// A reference with neither its own sheet nor a `current_sheet` keys on
    /// the absolute coordinates alone.
    pub fn canonical_key(&self, current_sheet: Option<&str>) -> String {
        match self.sheet_or(current_sheet) {
            Some(sheet) => format!("{}!{}", quote_sheet(sheet), self.range.to_absolute_string()),
            None => self.range.to_absolute_string(),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sheet {
            Some(sheet) => write!(f, "{}!{}", quote_sheet(sheet), self.range),
            None => write!(f, "{}", self.range),
        }
    }
}

/// Whether a sheet name must be quoted inside a reference
pub fn sheet_needs_quotes(sheet: &str) -> bool {
    !regex_is_match!(r"^[A-Za-z_][A-Za-z0-9_]*$", sheet)
}

/// Write a sheet name the way it appears in a reference
pub fn quote_sheet(sheet: &str) -> String {
    if sheet_needs_quotes(sheet) {
        format!("'{}'", sheet.replace('\'', "''"))
    } else {
        sheet.to_string()
    }
}

fn unquote_sheet(text: &str) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::InvalidReference(format!("empty sheet name in '{}'", text)));
    }
    match text.strip_prefix('\'') {
        Some(rest) => rest
            .strip_suffix('\'')
            .map(|inner| inner.replace("''", "'"))
            .ok_or_else(|| Error::InvalidSheetName(text.to_string())),
        None => Ok(text.to_string()),
    }
}

/// Derive a Python identifier from a canonical key
///
/// Reference punctuation (spaces, underscores, `!`, `:`, `$`, quotes) and any
/// other character that cannot appear in an identifier is deleted:
/// `'Proforma Preserved'!$E$46` becomes `ProformaPreservedE46`. A key whose
/// remainder starts with a digit gets a `ref_` prefix.
pub fn identifier_for_key(key: &str) -> String {
    let stripped = regex_replace_all!(r"[^A-Za-z0-9]+", key, "");
    let first = stripped.chars().next();
    match first {
        Some(c) if c.is_ascii_alphabetic() => stripped.into_owned(),
        _ => format!("ref_{}", stripped),
    }
}
