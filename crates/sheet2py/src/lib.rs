//! # sheet2py
//!
//! Compiles the formulas of a spreadsheet into a Python class.
//!
//! Each named cell or range of the workbook becomes an attribute of the
//! generated class:
//!
//! - value cells become class constants
//! - formula cells become cached properties whose bodies are the translated
//!   formulas
//! - named cells on the input sheets become constructor parameters, and
//!   named formulas on the output sheets are returned by `calculate()`
//!
//! Cells a formula refers to without a name are discovered during
//! translation and emitted under a name derived from their address.
//!
//! ## Example
//!
//! ```rust
//! use sheet2py::{Generator, GeneratorConfig};
//! use sheet2py_core::{DefinedName, MemoryWorkbook};
//!
//! let mut workbook = MemoryWorkbook::new();
//! workbook.add_sheet("Calc").unwrap();
//! workbook.set_value("Calc", "A1", 0.2).unwrap();
//! workbook.set_formula("Calc", "A2", "=A1*50%").unwrap();
//! workbook.define_name(DefinedName::new("Half", "=Calc!$A$2")).unwrap();
//!
//! let config = GeneratorConfig {
//!     timestamp: false,
//!     ..GeneratorConfig::for_spreadsheet("calc.xlsx")
//! };
//! let generated = Generator::new(config).unwrap().render(&workbook).unwrap();
//! assert!(generated.text.contains("self._Half = self.CalcA1*0.5"));
//! assert!(generated.text.contains("    CalcA1 = 0.2"));
//! ```

pub mod classify;
pub mod config;
pub mod emit;
pub mod error;
pub mod generator;
pub mod section;
pub mod sink;

pub use classify::{classify, NameFacts, SectionKind};
pub use config::{CellAlias, ClassNames, GeneratorConfig, DEFAULT_MAX_DISCOVERIES};
pub use emit::{emit, wrap_text, Header};
pub use error::{GenerateResult, GenerationError};
pub use generator::{Generated, GenerationReport, Generator, MAX_RANGE_CELLS};
pub use section::{
    python_float, value_literal, ConstantsSection, DiagnosticsSection, InterfaceSection,
    PropertiesSection, Section, Sections,
};
pub use sink::{FileSink, OutputSink, StringSink};

// Re-export the compiler and workbook model
pub use sheet2py_core::{
    CellAddress, CellRange, CellValue, DefinedName, MemoryWorkbook, Reference, WorkbookSource,
};
pub use sheet2py_formula::{
    parse_formula, parse_single, AliasTable, FormulaError, GlobalSymbols, Translator,
};
