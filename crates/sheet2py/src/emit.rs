//! Code emitter
//!
//! Assembles the module header and the sections into the generated file.

use crate::classify::SectionKind;
use crate::config::ClassNames;
use crate::section::Sections;
use std::fmt::Write;

/// Module header contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Subclass users write to override generated behavior
    pub class_name: String,
    /// The generated class
    pub gen_class_name: String,
    /// When the file was generated, ISO 8601
    pub generated_at: Option<String>,
    /// Command line that produced the file
    pub command_line: Option<String>,
    /// Extra import lines
    pub imports: String,
}

impl Header {
    /// A header for the derived class names, without timestamp or command line
    pub fn new(names: &ClassNames, imports: impl Into<String>) -> Self {
        Self {
            class_name: names.class_name.clone(),
            gen_class_name: names.gen_class_name.clone(),
            generated_at: None,
            command_line: None,
            imports: imports.into(),
        }
    }

    /// Record the current local time
    pub fn stamped(mut self) -> Self {
        self.generated_at = Some(
            chrono::Local::now()
                .naive_local()
                .format("%Y-%m-%dT%H:%M:%S%.6f")
                .to_string(),
        );
        self
    }

    fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("# WARNING: AUTOMATICALLY GENERATED CODE\n");
        let _ = writeln!(out, "# Override this class using {}", self.class_name);
        if let Some(at) = &self.generated_at {
            let _ = writeln!(out, "# Generated at {}", at);
        }
        if let Some(command_line) = &self.command_line {
            let _ = writeln!(out, "# {}", command_line);
        }
        out.push('\n');

        out.push_str("from collections import namedtuple\n");
        out.push_str("from excel2py.excel_functions import *\n");
        out.push_str("from excel2py.base_proforma_calc import BaseProformaCalc\n");
        for line in self.imports.lines().filter(|l| !l.trim().is_empty()) {
            let _ = writeln!(out, "{}", line);
        }
        out.push_str("from excel2py.ex_datetime import ex_datetime\n");
        out.push_str("\n\n");

        let _ = writeln!(out, "class {}(BaseProformaCalc):", self.gen_class_name);
        out
    }
}

/// Assemble the generated module
///
/// Sections are written in [`SectionKind::EMISSION_ORDER`], whatever order
/// their names were classified in.
pub fn emit(header: &Header, sections: &Sections) -> String {
    let mut out = header.render();
    for kind in SectionKind::EMISSION_ORDER {
        out.push_str(&sections.get(kind).render());
    }
    out
}

/// Wrap text at spaces so no line exceeds `max_length`, prefix included
///
/// A word longer than the available width is kept whole on its own line.
pub fn wrap_text(text: &str, max_length: usize, prefix: &str) -> String {
    let width = max_length.saturating_sub(prefix.len()).max(1);
    let mut lines = Vec::new();
    let mut rest = text;

    while rest.len() > width {
        let window = match rest.char_indices().nth(width + 1) {
            Some((end, _)) => &rest[..end],
            None => rest,
        };
        let split = window
            .rfind(' ')
            .or_else(|| rest.find(' '))
            .filter(|&at| at > 0);
        match split {
            Some(at) => {
                lines.push(format!("{}{}", prefix, &rest[..at]));
                rest = &rest[at + 1..];
            }
            None => break,
        }
    }
    lines.push(format!("{}{}", prefix, rest));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn header() -> Header {
        Header {
            class_name: "Mycalc".into(),
            gen_class_name: "GenMycalc".into(),
            generated_at: None,
            command_line: None,
            imports: "from excel2py.toolkit import *\n".into(),
        }
    }

    #[test]
    fn test_header() {
        let expected = "# WARNING: AUTOMATICALLY GENERATED CODE
# Override this class using Mycalc

from collections import namedtuple
from excel2py.excel_functions import *
from excel2py.base_proforma_calc import BaseProformaCalc
from excel2py.toolkit import *
from excel2py.ex_datetime import ex_datetime


class GenMycalc(BaseProformaCalc):
";
        assert_eq!(header().render(), expected);
    }

    #[test]
    fn test_header_with_provenance() {
        let header = Header {
            command_line: Some("sheet2py generate mycalc.json".into()),
            ..header()
        }
        .stamped();
        let text = header.render();
        assert!(text.contains("\n# Generated at 20"));
        assert!(text.contains("\n# sheet2py generate mycalc.json\n"));
    }

    #[test]
    fn test_sections_in_fixed_order() {
        let mut sections = Sections::default();
        sections.constants.add("Rate", "0.05");
        sections.properties.add("Total", "self.Rate*2");
        sections.diagnostics.broken("Gone", "=#REF!");

        let text = emit(&header(), &sections);
        let position = |needle: &str| text.find(needle).unwrap();
        assert!(position("# EXCEL VARIABLES") < position("# External interface"));
        assert!(position("# External interface") < position("# PROPERTIES"));
        assert!(position("# PROPERTIES") < position("# CONSTANTS"));
        assert!(text.ends_with("    Rate = 0.05\n"));
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("['a', 'b']", 120, "    "), "    ['a', 'b']");
        assert_eq!(
            wrap_text("aaa bbb ccc ddd", 11, "  "),
            "  aaa bbb\n  ccc ddd"
        );
        assert_eq!(wrap_text("aaaaaaaaaaaa b", 6, ""), "aaaaaaaaaaaa\nb");
        assert_eq!(wrap_text("", 10, "  "), "  ");
    }

    #[test]
    fn test_wrap_text_respects_width() {
        let names: Vec<String> = (0..40).map(|i| format!("'output_number_{}'", i)).collect();
        let text = format!("[{}]", names.join(", "));
        let wrapped = wrap_text(&text, 120, "            ");
        for line in wrapped.lines() {
            assert!(line.len() <= 120, "{}", line);
            assert!(line.starts_with("            "));
        }
        let rejoined: Vec<&str> = wrapped.lines().map(str::trim_start).collect();
        assert_eq!(rejoined.join(" "), text);
    }
}
