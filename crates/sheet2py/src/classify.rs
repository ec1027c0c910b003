//! Name classification
//!
//! Each workbook name is offered to the sections in a fixed order and the
//! first one whose predicate holds claims it. Emission order is a separate
//! table ([`SectionKind::EMISSION_ORDER`]) and does not depend on the order
//! names were classified in.

use std::fmt;

/// The section a name is emitted in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    /// Names with nothing usable behind them, listed as comments
    Diagnostics,
    /// Constructor parameters and the `calculate` method
    Interface,
    /// Formula cells, as cached properties
    Properties,
    /// Value cells, as class attributes, and discovered cells that are empty
    Constants,
}

impl SectionKind {
    /// Order sections appear in the generated module
    pub const EMISSION_ORDER: [SectionKind; 4] = [
        SectionKind::Diagnostics,
        SectionKind::Interface,
        SectionKind::Properties,
        SectionKind::Constants,
    ];

    /// Comment line that opens the section
    pub fn comment(&self) -> &'static str {
        match self {
            SectionKind::Diagnostics => "EXCEL VARIABLES WITH NO USABLE FORMULA",
            SectionKind::Interface => "External interface",
            SectionKind::Properties => "PROPERTIES",
            SectionKind::Constants => "CONSTANTS",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SectionKind::Diagnostics => "diagnostics",
            SectionKind::Interface => "interface",
            SectionKind::Properties => "properties",
            SectionKind::Constants => "constants",
        };
        f.write_str(name)
    }
}

/// What the generator knows about a name when classifying it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NameFacts {
    /// Found while translating, not declared in the workbook
    pub discovered: bool,
    /// Refers to `#NAME?`
    pub unresolved: bool,
    /// A print area or print titles name
    pub builtin: bool,
    /// Refers to something containing `#REF!`
    pub broken: bool,
    /// Lives on an ignored sheet
    pub on_ignored_sheet: bool,
    /// Another name already owns the same identifier
    pub duplicate: bool,
    /// A declared constructor parameter
    pub is_input: bool,
    /// At least one referenced cell holds a formula, or the name is a formula
    pub has_formula: bool,
    /// At least one referenced cell holds a value
    pub has_value: bool,
}

impl NameFacts {
    fn is_unusable(&self) -> bool {
        !self.discovered
            && (self.unresolved
                || self.builtin
                || self.broken
                || self.on_ignored_sheet
                || self.duplicate)
    }
}

type Predicate = fn(&NameFacts) -> bool;

const PREDICATES: [(SectionKind, Predicate); 4] = [
    (SectionKind::Diagnostics, NameFacts::is_unusable),
    (SectionKind::Interface, |facts| facts.is_input),
    (SectionKind::Properties, |facts| facts.has_formula),
    (SectionKind::Constants, |facts| facts.has_value || facts.discovered),
];

/// The section that claims a name, if any
pub fn classify(facts: &NameFacts) -> Option<SectionKind> {
    PREDICATES
        .iter()
        .find(|(_, accepts)| accepts(facts))
        .map(|(kind, _)| *kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_wins() {
        let facts = NameFacts {
            broken: true,
            has_formula: true,
            ..Default::default()
        };
        assert_eq!(classify(&facts), Some(SectionKind::Diagnostics));

        let facts = NameFacts {
            is_input: true,
            has_value: true,
            ..Default::default()
        };
        assert_eq!(classify(&facts), Some(SectionKind::Interface));

        let facts = NameFacts {
            has_formula: true,
            has_value: true,
            ..Default::default()
        };
        assert_eq!(classify(&facts), Some(SectionKind::Properties));
    }

    #[test]
    fn test_discovered_names_skip_diagnostics() {
        let facts = NameFacts {
            discovered: true,
            on_ignored_sheet: true,
            has_value: true,
            ..Default::default()
        };
        assert_eq!(classify(&facts), Some(SectionKind::Constants));
    }

    #[test]
    fn test_empty_discovered_cell_is_a_constant() {
        let facts = NameFacts {
            discovered: true,
            ..Default::default()
        };
        assert_eq!(classify(&facts), Some(SectionKind::Constants));
    }

    #[test]
    fn test_nothing_claims_an_empty_name() {
        assert_eq!(classify(&NameFacts::default()), None);
    }

    #[test]
    fn test_emission_order_is_fixed() {
        assert_eq!(SectionKind::EMISSION_ORDER[0], SectionKind::Diagnostics);
        assert_eq!(SectionKind::EMISSION_ORDER[3], SectionKind::Constants);
        assert_eq!(SectionKind::Properties.comment(), "PROPERTIES");
    }
}
