//! Formula to Python translation
//!
//! [`Translator`] folds an AST into a Python expression. References become
//! attributes of the generated class (`self.Rate`), recognized globals stay
//! bare (`MAX`, `None`) and spreadsheet operators are rewritten where Python
//! spells them differently.

use crate::ast::{Constant, Expression, Formula, NumberLiteral, Term};
use crate::error::FormulaResult;
use crate::parser::{parse_expression_text, parse_formula};
use crate::resolver::AliasTable;
use crate::symbols::GlobalSymbols;
use regex::Regex;
use rust_decimal::Decimal;
use sheet2py_core::reference::identifier_for_key;
use std::str::FromStr;

/// Translation context for one formula
#[derive(Clone, Copy)]
struct Scope<'a> {
    sheet: Option<&'a str>,
    /// Loop variables that are emitted bare
    locals: &'a [String],
}

/// Translates parsed formulas into Python expressions
#[derive(Debug, Clone, Default)]
pub struct Translator {
    symbols: GlobalSymbols,
}

impl Translator {
    /// Create a translator over a symbol set
    pub fn new(symbols: GlobalSymbols) -> Self {
        Self { symbols }
    }

    /// The symbols emitted bare
    pub fn symbols(&self) -> &GlobalSymbols {
        &self.symbols
    }

    /// Translate a parsed formula
    ///
    /// References without a sheet are read as living on `current_sheet`.
    /// Every reference is resolved through `aliases`, which queues the ones
    /// it has not seen before.
    ///
    /// # Example
    /// ```rust
    /// use sheet2py_formula::{parse_formula, AliasTable, Translator};
    /// use sheet2py_core::Reference;
    ///
    /// let mut aliases = AliasTable::new();
    /// aliases.insert_config(&Reference::parse("Inputs!D6").unwrap(), "first_input");
    ///
    /// let formula = parse_formula("=MAX(Inputs!D6,4)").unwrap();
    /// let python = Translator::default().translate(&formula, Some("Calc"), &mut aliases);
    /// assert_eq!(python, "MAX(self.first_input, 4)");
    /// ```
    pub fn translate(
        &self,
        formula: &Formula,
        current_sheet: Option<&str>,
        aliases: &mut AliasTable,
    ) -> String {
        self.translate_with_locals(formula, current_sheet, aliases, &[])
    }

    /// Parse and translate formula text, with or without its leading `=`
    pub fn translate_text(
        &self,
        text: &str,
        current_sheet: Option<&str>,
        aliases: &mut AliasTable,
    ) -> FormulaResult<String> {
        let text = text.trim();
        let formula = if text.starts_with('=') {
            parse_formula(text)?
        } else {
            parse_expression_text(text)?
        };
        Ok(self.translate(&formula, current_sheet, aliases))
    }

    /// Translate with extra names that are emitted bare
    pub(crate) fn translate_with_locals(
        &self,
        formula: &Formula,
        current_sheet: Option<&str>,
        aliases: &mut AliasTable,
        locals: &[String],
    ) -> String {
        let scope = Scope {
            sheet: current_sheet,
            locals,
        };
        formula
            .expressions
            .iter()
            .map(|e| self.expression(e, scope, aliases))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// `identifier` as it appears in a method body: bare for globals,
    /// `self.`-qualified otherwise
    pub fn qualify(&self, identifier: &str) -> String {
        if self.symbols.contains(identifier) {
            identifier.to_string()
        } else {
            format!("self.{}", identifier)
        }
    }

    fn expression(&self, expression: &Expression, scope: Scope<'_>, aliases: &mut AliasTable) -> String {
        let mut out = String::new();
        for (term, op) in expression.links() {
            out.push_str(&self.term(term, scope, aliases));
            if let Some(op) = op {
                out.push_str(op.python());
            }
        }
        out
    }

    fn term(&self, term: &Term, scope: Scope<'_>, aliases: &mut AliasTable) -> String {
        match term {
            Term::Constant(Constant::Number(literal)) => number_literal(literal),
            Term::Constant(Constant::Text(text)) => python_string(text),
            Term::Name(name) => self.name(name, scope, aliases),
            Term::Range(reference) => {
                let identifier = aliases.resolve(reference, scope.sheet);
                self.qualify(&identifier)
            }
            Term::FunctionCall { name, args } => {
                // TRUE() and FALSE() are the boolean values, not calls
                if args.is_empty() && (name == "TRUE" || name == "FALSE") {
                    return self.name(name, scope, aliases);
                }
                format!(
                    "{}({})",
                    self.name(name, scope, aliases),
                    self.list(args, scope, aliases)
                )
            }
            Term::Group(items) => format!("({})", self.list(items, scope, aliases)),
            Term::Null => "None".to_string(),
            Term::Negate(inner) => format!("-{}", self.term(inner, scope, aliases)),
        }
    }

    fn list(&self, items: &[Expression], scope: Scope<'_>, aliases: &mut AliasTable) -> String {
        items
            .iter()
            .map(|e| self.expression(e, scope, aliases))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn name(&self, name: &str, scope: Scope<'_>, aliases: &AliasTable) -> String {
        if scope.locals.iter().any(|local| local == name) {
            return name.to_string();
        }
        match aliases.rename(name) {
            "TRUE" => "True".to_string(),
            "FALSE" => "False".to_string(),
            renamed => self.qualify(renamed),
        }
    }
}

/// Render a number literal as Python
///
/// Digits are kept as written. A percentage is divided by 100 in decimal
/// arithmetic so `50%` is `0.5` and `12.5%` is `0.125`, with no binary
/// rounding noise.
pub fn number_literal(literal: &NumberLiteral) -> String {
    if !literal.percent {
        return literal.digits.clone();
    }

    let digits = literal.digits.trim_start_matches('+');
    let exact = Decimal::from_str(digits).or_else(|_| Decimal::from_scientific(digits));
    match exact.ok().and_then(|d| d.checked_div(Decimal::ONE_HUNDRED)) {
        Some(value) => {
            let text = value.normalize().to_string();
            if text.contains('.') {
                text
            } else {
                format!("{}.0", text)
            }
        }
        // Beyond decimal range: fall back to float formatting
        None => digits
            .parse::<f64>()
            .map(|v| format!("{:?}", v / 100.0))
            .unwrap_or_else(|_| literal.digits.clone()),
    }
}

/// Render text as a Python string literal
///
/// Double quotes are used unless the text itself contains a double quote,
/// in which case single quotes avoid escaping. Text holding both kinds is
/// double quoted with `\"` escapes.
pub fn python_string(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "\\r");
    match (escaped.contains('"'), escaped.contains('\'')) {
        (false, _) => format!("\"{}\"", escaped),
        (true, false) => format!("'{}'", escaped),
        (true, true) => format!("\"{}\"", escaped.replace('"', "\\\"")),
    }
}

/// Render items as a Python tuple, `(a,)` for a single item
pub fn python_tuple(items: &[String]) -> String {
    match items {
        [single] => format!("({},)", single),
        _ => format!("({})", items.join(", ")),
    }
}

/// Replace raw input references with their parameter names
///
/// `inputs` pairs a canonical key (`Inputs!$D$6`) with the declared
/// parameter name. The raw key is always replaced by `self.<parameter>`.
/// The synthesized attribute (`self.InputsD6`) is replaced only while
/// `aliases` does not give that identifier to another reference. A token
/// only matches at an identifier boundary, so `InputsD1` is left alone
/// inside `InputsD12`.
pub fn substitute_inputs<'a, I>(text: &str, inputs: I, aliases: &AliasTable) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut out = text.to_string();
    for (key, parameter) in inputs {
        let replacement = format!("self.{}", parameter);
        let synthesized = identifier_for_key(key);
        if aliases.denotes(&synthesized, key) {
            out = replace_token(&out, &format!("self.{}", synthesized), &replacement);
        }
        out = replace_token(&out, key, &replacement);
    }
    out
}

fn replace_token(text: &str, token: &str, replacement: &str) -> String {
    let pattern = match Regex::new(&format!(r"{}\b", regex::escape(token))) {
        Ok(pattern) => pattern,
        Err(_) => return text.to_string(),
    };

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for found in pattern.find_iter(text) {
        let preceded_by_identifier = text[..found.start()]
            .chars()
            .next_back()
            .map_or(false, |c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        if preceded_by_identifier {
            continue;
        }
        out.push_str(&text[last..found.start()]);
        out.push_str(replacement);
        last = found.end();
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheet2py_core::Reference;

    fn translate_on(sheet: &str, text: &str) -> String {
        let mut aliases = AliasTable::new();
        Translator::default()
            .translate_text(text, Some(sheet), &mut aliases)
            .unwrap()
    }

    fn translate(text: &str) -> String {
        translate_on("Sheet1", text)
    }

    #[test]
    fn test_percent_is_exact() {
        assert_eq!(translate("50%"), "0.5");
        assert_eq!(translate("100%"), "1.0");
        assert_eq!(translate("12.5%"), "0.125");
        assert_eq!(translate("-3%"), "-0.03");
        assert_eq!(translate("0.1%"), "0.001");
    }

    #[test]
    fn test_numbers_keep_their_digits() {
        assert_eq!(translate("2.50"), "2.50");
        assert_eq!(translate("1E+3"), "1E+3");
        assert_eq!(translate("-2"), "-2");
    }

    #[test]
    fn test_operator_rewrites() {
        assert_eq!(translate("A1=B1"), "self.Sheet1A1 == self.Sheet1B1");
        assert_eq!(translate("A1<>B1"), "self.Sheet1A1 != self.Sheet1B1");
        assert_eq!(translate("A1^2"), "self.Sheet1A1**2");
        assert_eq!(translate("A1&B1"), "self.Sheet1A1 + self.Sheet1B1");
        assert_eq!(translate("A1>=B1"), "self.Sheet1A1>=self.Sheet1B1");
        assert_eq!(translate("A1-B1/2"), "self.Sheet1A1-self.Sheet1B1/2");
    }

    #[test]
    fn test_text_quoting() {
        assert_eq!(translate(r#""FULL""#), r#""FULL""#);
        assert_eq!(translate(r#""say ""hi""""#), r#"'say "hi"'"#);
        assert_eq!(translate(r#""it's ""x""""#), r#""it's \"x\"""#);
        assert_eq!(translate(r#""C:\temp""#), r#""C:\\temp""#);
    }

    #[test]
    fn test_globals_are_bare() {
        assert_eq!(translate("SUM(A1:A3)"), "SUM(self.Sheet1A1A3)");
        assert_eq!(translate("Rate*2"), "self.Rate*2");
        assert_eq!(translate("TRUE"), "True");
        assert_eq!(translate("IF(FALSE(),1,None)"), "IF(False, 1, None)");
        assert_eq!(translate("UserFunc(1)"), "self.UserFunc(1)");

        let mut aliases = AliasTable::new();
        let translator = Translator::new(GlobalSymbols::with_externals(["tk_function"]));
        let python = translator
            .translate_text("tk_function(D18, Sheet1!B3:C5)", Some("Sheet1"), &mut aliases)
            .unwrap();
        assert_eq!(python, "tk_function(self.Sheet1D18, self.Sheet1B3C5)");
    }

    #[test]
    fn test_reference_canonicalization() {
        let mut aliases = AliasTable::new();
        let translator = Translator::default();
        let qualified = translator
            .translate_text("Sheet1!A1", Some("Other"), &mut aliases)
            .unwrap();
        let bare = translator
            .translate_text("A1", Some("Sheet1"), &mut aliases)
            .unwrap();
        assert_eq!(qualified, bare);
        assert_eq!(
            translator
                .translate_text("'Proforma Preserved'!$E$46", None, &mut aliases)
                .unwrap(),
            "self.ProformaPreservedE46"
        );
    }

    #[test]
    fn test_aliases_and_renames() {
        let mut aliases = AliasTable::new();
        aliases.insert_config(&Reference::parse("Sheet1!A1").unwrap(), "my_input");
        aliases.insert_config(&Reference::parse("Sheet1!B3:C5").unwrap(), "a_table");
        aliases.insert_name_alias("lambda", "my_lambda");

        let translator = Translator::default();
        let python = translator
            .translate_text("E4^Sheet1!A1+SUM(B3:C5)*lambda", Some("Sheet1"), &mut aliases)
            .unwrap();
        assert_eq!(python, "self.Sheet1E4**self.my_input+SUM(self.a_table)*self.my_lambda");
        assert_eq!(aliases.pop_pending().as_deref(), Some("Sheet1!$E$4"));
        assert!(!aliases.has_pending());
    }

    #[test]
    fn test_nested_groups_and_negation() {
        assert_eq!(
            translate(r#"ROUND(IF(G6="FULL",G21,IF(G6="FIXED",G23,G25))*G12,2)-G26"#),
            "ROUND(IF(self.Sheet1G6 == \"FULL\", self.Sheet1G21, IF(self.Sheet1G6 == \"FIXED\", \
             self.Sheet1G23, self.Sheet1G25))*self.Sheet1G12, 2)-self.Sheet1G26"
        );
        assert_eq!(translate("-(A1+1)"), "-(self.Sheet1A1+1)");
        assert_eq!(translate("(1,2)"), "(1, 2)");
    }

    #[test]
    fn test_top_level_expressions_joined_by_space() {
        assert_eq!(translate("A1:B2 B1:C3"), "self.Sheet1A1B2 self.Sheet1B1C3");
    }

    #[test]
    fn test_substitute_inputs() {
        let aliases = AliasTable::new();
        let text = "MAX(self.InputsD6, self.InputsD12) + self.InputsD1";
        let out = substitute_inputs(
            text,
            [("Inputs!$D$1", "first"), ("Inputs!$D$6", "second")],
            &aliases,
        );
        assert_eq!(out, "MAX(self.second, self.InputsD12) + self.first");

        let raw = substitute_inputs("f(Inputs!$D$6)", [("Inputs!$D$6", "second")], &aliases);
        assert_eq!(raw, "f(self.second)");

        let untouched =
            substitute_inputs("self.myself.InputsD6", [("Inputs!$D$6", "x")], &aliases);
        assert_eq!(untouched, "self.myself.InputsD6");
    }

    #[test]
    fn test_substitute_inputs_skips_identifier_owned_elsewhere() {
        let mut aliases = AliasTable::new();
        aliases.insert_defined_name(&Reference::parse("Inputs!D2").unwrap(), "InputsD1");
        let out = substitute_inputs(
            "self.first+self.InputsD1",
            [("Inputs!$D$1", "first")],
            &aliases,
        );
        assert_eq!(out, "self.first+self.InputsD1");
    }

    #[test]
    fn test_python_tuple() {
        assert_eq!(python_tuple(&["1".to_string()]), "(1,)");
        assert_eq!(python_tuple(&["1".to_string(), "2".to_string()]), "(1, 2)");
        assert_eq!(python_tuple(&[]), "()");
    }
}
