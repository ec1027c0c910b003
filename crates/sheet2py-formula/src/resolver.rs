//! Reference resolution
//!
//! [`AliasTable`] maps canonical reference keys to Python identifiers. Entries
//! come from three layers, highest precedence first:
//!
//! 1. configured input/output aliases
//! 2. workbook defined names
//! 3. identifiers synthesized for references met during translation
//!
//! A synthesized entry is also queued for discovery so the driver can fetch
//! the referenced cells and emit them as attributes of their own.
//!
//! Sheet names are matched without regard to ASCII case. Once a sheet is
//! registered with [`AliasTable::insert_sheet`], keys always use its
//! registered spelling, so `inputs!D6` and `Inputs!D6` share one entry.

use ahash::{AHashMap, AHashSet};
use sheet2py_core::reference::identifier_for_key;
use sheet2py_core::Reference;
use std::collections::VecDeque;

/// Where an alias came from, in increasing precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AliasSource {
    /// Derived from the reference text
    Synthesized,
    /// A workbook defined name
    DefinedName,
    /// Explicit configuration
    Config,
}

#[derive(Debug, Clone)]
struct Alias {
    identifier: String,
    source: AliasSource,
}

/// Canonical reference key to identifier, plus the discovery queue
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    by_key: AHashMap<String, Alias>,
    /// Plain-name renames such as `lambda -> my_lambda`
    names: AHashMap<String, String>,
    /// Identifiers handed out so far
    used: AHashSet<String>,
    /// Sheet spellings keys are normalized to
    sheets: Vec<String>,
    pending: VecDeque<String>,
}

impl AliasTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sheet spelling for key normalization
    pub fn insert_sheet(&mut self, sheet: impl Into<String>) {
        let sheet = sheet.into();
        if !self.sheets.iter().any(|known| known.eq_ignore_ascii_case(&sheet)) {
            self.sheets.push(sheet);
        }
    }

    /// The canonical key of a reference, with the sheet spelled as registered
    pub fn canonical_key(&self, reference: &Reference, current_sheet: Option<&str>) -> String {
        let known = reference
            .sheet
            .as_deref()
            .or(current_sheet)
            .and_then(|sheet| self.sheets.iter().find(|known| known.eq_ignore_ascii_case(sheet)));
        match known {
            Some(sheet) => Reference::new(Some(sheet.clone()), reference.range).canonical_key(None),
            None => reference.canonical_key(current_sheet),
        }
    }

    /// Bind a configured alias (highest precedence)
    pub fn insert_config(&mut self, reference: &Reference, identifier: impl Into<String>) {
        let key = self.canonical_key(reference, None);
        self.insert(key, identifier.into(), AliasSource::Config);
    }

    /// Bind a workbook defined name
    ///
    /// Returns `false` when a configured alias already owns the key.
    pub fn insert_defined_name(&mut self, reference: &Reference, name: impl Into<String>) -> bool {
        let key = self.canonical_key(reference, None);
        self.insert(key, name.into(), AliasSource::DefinedName)
    }

    /// Rename a plain name wherever it is used
    pub fn insert_name_alias(&mut self, name: impl Into<String>, identifier: impl Into<String>) {
        let identifier = identifier.into();
        self.used.insert(identifier.clone());
        self.names.insert(name.into(), identifier);
    }

    /// Mark an identifier as taken without binding a reference to it
    ///
    /// Defined names that refer to formulas rather than cells own their
    /// identifier too, and a synthesized name must not shadow them.
    pub fn reserve(&mut self, identifier: impl Into<String>) {
        self.used.insert(identifier.into());
    }

    fn insert(&mut self, key: String, identifier: String, source: AliasSource) -> bool {
        if let Some(existing) = self.by_key.get(&key) {
            if existing.source >= source {
                return false;
            }
        }
        self.used.insert(identifier.clone());
        self.by_key.insert(key, Alias { identifier, source });
        true
    }

    /// The identifier for a reference, synthesizing and queueing one on a miss
    ///
    /// A reference without a sheet is taken to live on `current_sheet`.
    /// Resolving the same key again returns the same identifier and never
    /// queues it twice.
    pub fn resolve(&mut self, reference: &Reference, current_sheet: Option<&str>) -> String {
        let key = self.canonical_key(reference, current_sheet);
        if let Some(alias) = self.by_key.get(&key) {
            return alias.identifier.clone();
        }

        let identifier = self.unique_identifier(identifier_for_key(&key));
        tracing::debug!("discovered {} as {}", key, identifier);
        self.used.insert(identifier.clone());
        self.by_key.insert(
            key.clone(),
            Alias {
                identifier: identifier.clone(),
                source: AliasSource::Synthesized,
            },
        );
        self.pending.push_back(key);
        identifier
    }

    fn unique_identifier(&self, base: String) -> String {
        if !self.used.contains(&base) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}_{}", base, n);
            if !self.used.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Apply a plain-name rename, if any
    pub fn rename<'a>(&'a self, name: &'a str) -> &'a str {
        self.names.get(name).map(String::as_str).unwrap_or(name)
    }

    /// The identifier bound to a canonical key
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.by_key.get(key).map(|alias| alias.identifier.as_str())
    }

    /// Whether `identifier` can only mean `key`: it is bound to that key, or
    /// nothing has claimed it yet
    pub fn denotes(&self, identifier: &str, key: &str) -> bool {
        match self.by_key.get(key) {
            Some(alias) if alias.identifier == identifier => true,
            _ => !self.used.contains(identifier),
        }
    }

    /// Which layer bound a canonical key
    pub fn source_of(&self, key: &str) -> Option<AliasSource> {
        self.by_key.get(key).map(|alias| alias.source)
    }

    /// Next discovered key, in discovery order
    pub fn pop_pending(&mut self) -> Option<String> {
        self.pending.pop_front()
    }

    /// Whether discovered keys are waiting
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Number of bound keys
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Whether no key is bound
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn r(text: &str) -> Reference {
        Reference::parse(text).unwrap()
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut table = AliasTable::new();
        let first = table.resolve(&r("Calc!B2"), None);
        let second = table.resolve(&r("Calc!$B$2"), None);
        assert_eq!(first, "CalcB2");
        assert_eq!(first, second);
        assert_eq!(table.pop_pending().as_deref(), Some("Calc!$B$2"));
        assert_eq!(table.pop_pending(), None);

        // Popped keys stay resolved and are not queued again
        assert_eq!(table.resolve(&r("Calc!B2"), None), "CalcB2");
        assert!(!table.has_pending());
    }

    #[test]
    fn test_current_sheet_is_attached() {
        let mut table = AliasTable::new();
        let bare = table.resolve(&r("A1"), Some("Sheet1"));
        let qualified = table.resolve(&r("Sheet1!A1"), Some("Other"));
        assert_eq!(bare, qualified);
        assert_eq!(table.resolve(&r("A1"), Some("My Sheet")), "MySheetA1");
    }

    #[test]
    fn test_layers() {
        let mut table = AliasTable::new();
        table.insert_config(&r("Inputs!D6"), "first_input");
        assert!(!table.insert_defined_name(&r("Inputs!$D$6"), "InputOne"));
        assert!(table.insert_defined_name(&r("Calc!$B$2"), "BIGGER"));
        table.insert_config(&r("Calc!B2"), "bigger_out");

        assert_eq!(table.resolve(&r("Inputs!$D$6"), None), "first_input");
        assert_eq!(table.resolve(&r("Calc!B2"), None), "bigger_out");
        assert_eq!(table.source_of("Calc!$B$2"), Some(AliasSource::Config));
        assert!(!table.has_pending());
    }

    #[test]
    fn test_defined_name_replaces_synthesized() {
        let mut table = AliasTable::new();
        table.resolve(&r("Calc!B2"), None);
        assert!(table.insert_defined_name(&r("Calc!B2"), "BIGGER"));
        assert_eq!(table.lookup("Calc!$B$2"), Some("BIGGER"));
    }

    #[test]
    fn test_distinct_keys_never_collide() {
        let mut table = AliasTable::new();
        // Both strip down to "CalcA1"
        let a = table.resolve(&r("Calc!A1"), None);
        let b = table.resolve(&r("'Cal c'!A1"), None);
        let c = table.resolve(&r("Cal_c!A1"), None);
        assert_eq!(a, "CalcA1");
        assert_eq!(b, "CalcA1_2");
        assert_eq!(c, "CalcA1_3");

        table.reserve("TotalB9");
        assert_eq!(table.resolve(&r("Total!B9"), None), "TotalB9_2");
    }

    #[test]
    fn test_sheet_case_follows_registration() {
        let mut table = AliasTable::new();
        table.insert_sheet("Inputs");
        table.insert_config(&r("inputs!D6"), "first_input");
        assert_eq!(table.resolve(&r("INPUTS!$D$6"), None), "first_input");
        assert_eq!(table.resolve(&r("D7"), Some("inputs")), "InputsD7");
        assert_eq!(table.pop_pending().as_deref(), Some("Inputs!$D$7"));

        // Unregistered sheets keep their own spelling
        assert_eq!(table.canonical_key(&r("other!A1"), None), "other!$A$1");
    }

    #[test]
    fn test_denotes() {
        let mut table = AliasTable::new();
        assert!(table.denotes("InputsD1", "Inputs!$D$1"));
        table.insert_defined_name(&r("Inputs!D2"), "InputsD1");
        assert!(!table.denotes("InputsD1", "Inputs!$D$1"));
        assert!(table.denotes("InputsD1", "Inputs!$D$2"));
    }

    #[test]
    fn test_name_alias() {
        let mut table = AliasTable::new();
        table.insert_name_alias("lambda", "my_lambda");
        assert_eq!(table.rename("lambda"), "my_lambda");
        assert_eq!(table.rename("other"), "other");
    }

    #[test]
    fn test_discovery_order() {
        let mut table = AliasTable::new();
        for cell in ["Calc!C1", "Calc!A1", "Calc!B1", "Calc!A1"] {
            table.resolve(&r(cell), None);
        }
        let order: Vec<_> = std::iter::from_fn(|| table.pop_pending()).collect();
        assert_eq!(order, vec!["Calc!$C$1", "Calc!$A$1", "Calc!$B$1"]);
        assert_eq!(table.len(), 3);
    }
}
