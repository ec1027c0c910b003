//! Output sections
//!
//! A section collects the declarations of the names classified into it and
//! renders them as an indented block of the generated class. Every section
//! opens with its own comment line and ends with a complete statement, so
//! sections can be concatenated in any order.

use crate::classify::SectionKind;
use crate::emit::wrap_text;
use sheet2py_core::{excel_serial, CellValue};
use sheet2py_formula::python_string;
use std::fmt::Write;

/// A block of the generated class
pub trait Section {
    /// Which section this is
    fn kind(&self) -> SectionKind;

    /// Append the declarations
    fn write_body(&self, out: &mut String);

    /// The complete section text
    fn render(&self) -> String {
        let mut out = format!("\n    # {}\n\n", self.kind().comment());
        self.write_body(&mut out);
        out
    }
}

/// Names the generator could not use
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsSection {
    lines: Vec<String>,
    ignored: usize,
}

impl DiagnosticsSection {
    /// Skip a name silently
    pub fn ignore(&mut self) {
        self.ignored += 1;
    }

    /// A name whose target contains `#REF!`
    pub fn broken(&mut self, name: &str, refers_to: &str) {
        self.lines.push(format!("# {} = '{}'", name, refers_to));
    }

    /// A name sharing its identifier with an earlier one
    pub fn duplicate(&mut self, name: &str, identifier: &str) {
        self.lines.push(format!("# {} duplicates {}", name, identifier));
    }

    /// A name no section accepts
    pub fn unclassified(&mut self, name: &str, reason: &str) {
        self.lines.push(format!("# {}: {}", name, reason));
    }

    /// Number of names skipped without comment
    pub fn ignored(&self) -> usize {
        self.ignored
    }

    /// Number of comment lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether no comment lines were recorded
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl Section for DiagnosticsSection {
    fn kind(&self) -> SectionKind {
        SectionKind::Diagnostics
    }

    fn write_body(&self, out: &mut String) {
        for line in &self.lines {
            let _ = writeln!(out, "    {}", line);
        }
    }
}

/// Constructor parameters and results
#[derive(Debug, Clone, Default)]
pub struct InterfaceSection {
    inputs: Vec<String>,
    outputs: Vec<String>,
}

impl InterfaceSection {
    /// Declare a constructor parameter; returns `false` if already declared
    pub fn add_input(&mut self, name: impl Into<String>) -> bool {
        push_unique(&mut self.inputs, name.into())
    }

    /// Declare a result; returns `false` if already declared
    pub fn add_output(&mut self, name: impl Into<String>) -> bool {
        push_unique(&mut self.outputs, name.into())
    }

    /// Whether `name` is a constructor parameter
    pub fn has_input(&self, name: &str) -> bool {
        self.inputs.iter().any(|n| n == name)
    }

    /// Constructor parameters in declaration order
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Results in declaration order
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }
}

fn push_unique(names: &mut Vec<String>, name: String) -> bool {
    if names.contains(&name) {
        return false;
    }
    names.push(name);
    true
}

/// A Python set literal of quoted names
fn python_set(names: &[String]) -> String {
    if names.is_empty() {
        return "set()".to_string();
    }
    let quoted: Vec<_> = names.iter().map(|n| format!("'{}'", n)).collect();
    format!("{{{}}}", quoted.join(", "))
}

/// A Python list literal of quoted names
fn python_list(names: &[String]) -> String {
    let quoted: Vec<_> = names.iter().map(|n| format!("'{}'", n)).collect();
    format!("[{}]", quoted.join(", "))
}

impl Section for InterfaceSection {
    fn kind(&self) -> SectionKind {
        SectionKind::Interface
    }

    fn write_body(&self, out: &mut String) {
        let _ = writeln!(out, "    inputs = {}", python_set(&self.inputs));
        let _ = writeln!(out, "    outputs = {}", python_set(&self.outputs));
        out.push('\n');

        out.push_str("    def __init__(self,\n");
        for input in &self.inputs {
            let _ = writeln!(out, "        {},", input);
        }
        out.push_str("        **args):\n");
        for input in &self.inputs {
            let _ = writeln!(out, "        self.{0} = {0}", input);
        }
        out.push_str("        self.private_construction()\n\n");

        out.push_str("    def calculate(self):\n");
        out.push_str("        return namedtuple('CalcResult',\n");
        let _ = writeln!(out, "{})(", wrap_text(&python_list(&self.outputs), 120, "            "));
        for output in &self.outputs {
            let _ = writeln!(out, "            {0}=self.{0},", output);
        }
        out.push_str("    )\n\n");
    }
}

/// Formula names as cached properties
#[derive(Debug, Clone, Default)]
pub struct PropertiesSection {
    properties: Vec<(String, String)>,
}

impl PropertiesSection {
    /// Add a property computing `body`
    pub fn add(&mut self, name: impl Into<String>, body: impl Into<String>) {
        self.properties.push((name.into(), body.into()));
    }

    /// The body of a property
    pub fn body(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, body)| body.as_str())
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether there are no properties
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl Section for PropertiesSection {
    fn kind(&self) -> SectionKind {
        SectionKind::Properties
    }

    fn write_body(&self, out: &mut String) {
        for (name, body) in &self.properties {
            let _ = write!(
                out,
                "    @property\n\
                 \x20   def {0}(self):\n\
                 \x20       if self._{0} is not None:\n\
                 \x20           return self._{0}\n\
                 \x20       self._{0} = {1}\n\
                 \x20       return self._{0}\n\n",
                name, body
            );
        }

        // Memo slots, reset by the constructor
        out.push_str("\n\n    def private_construction(self):\n");
        if self.properties.is_empty() {
            out.push_str("        pass\n");
        }
        for (name, _) in &self.properties {
            let _ = writeln!(out, "        self._{} = None", name);
        }
        out.push('\n');
    }
}

/// Value names as class attributes
#[derive(Debug, Clone, Default)]
pub struct ConstantsSection {
    constants: Vec<(String, String)>,
}

impl ConstantsSection {
    /// Add `name = literal`
    pub fn add(&mut self, name: impl Into<String>, literal: impl Into<String>) {
        self.constants.push((name.into(), literal.into()));
    }

    /// The literal bound to a constant
    pub fn literal(&self, name: &str) -> Option<&str> {
        self.constants
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, literal)| literal.as_str())
    }

    /// Number of constants
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    /// Whether there are no constants
    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }
}

impl Section for ConstantsSection {
    fn kind(&self) -> SectionKind {
        SectionKind::Constants
    }

    fn write_body(&self, out: &mut String) {
        for (name, literal) in &self.constants {
            let _ = writeln!(out, "    {} = {}", name, literal);
        }
    }
}

/// All sections of one run
#[derive(Debug, Clone, Default)]
pub struct Sections {
    pub diagnostics: DiagnosticsSection,
    pub interface: InterfaceSection,
    pub properties: PropertiesSection,
    pub constants: ConstantsSection,
}

impl Sections {
    /// The section of a kind
    pub fn get(&self, kind: SectionKind) -> &dyn Section {
        match kind {
            SectionKind::Diagnostics => &self.diagnostics,
            SectionKind::Interface => &self.interface,
            SectionKind::Properties => &self.properties,
            SectionKind::Constants => &self.constants,
        }
    }
}

/// A float as Python writes it
pub fn python_float(value: f64) -> String {
    if value.is_nan() {
        "float('nan')".to_string()
    } else if value.is_infinite() {
        if value > 0.0 {
            "float('inf')".to_string()
        } else {
            "-float('inf')".to_string()
        }
    } else {
        format!("{:?}", value)
    }
}

/// A cell value as a Python literal
///
/// `as_date` marks a number whose format is one of the configured date
/// formats; it is wrapped in `ex_datetime` like a stored date. Error values
/// have no Python counterpart and become `None`.
pub fn value_literal(value: &CellValue, as_date: bool) -> String {
    match value {
        CellValue::Empty | CellValue::Error { .. } => "None".to_string(),
        CellValue::Boolean(true) => "True".to_string(),
        CellValue::Boolean(false) => "False".to_string(),
        CellValue::Number(n) if as_date => format!("ex_datetime({})", python_float(*n)),
        CellValue::Number(n) => python_float(*n),
        CellValue::Date { date } => format!("ex_datetime({})", python_float(excel_serial(date))),
        CellValue::String(s) => python_string(s),
    }
}
