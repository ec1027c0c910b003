//! Generator configuration
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration. Class and file names are derived from the spreadsheet
//! file name unless given explicitly:
//!
//! ```rust
//! use sheet2py::GeneratorConfig;
//!
//! let config = GeneratorConfig::for_spreadsheet("myCalc.v1.xlsm");
//! let names = config.class_names().unwrap();
//! assert_eq!(names.class_name, "Mycalc");
//! assert_eq!(names.gen_class_name, "GenMycalc");
//! assert_eq!(names.output.to_str(), Some("gen_mycalc.py"));
//! ```

use crate::error::{GenerateResult, GenerationError};
use lazy_regex::regex_is_match;
use serde::{Deserialize, Serialize};
use sheet2py_core::Reference;
use sheet2py_formula::GlobalSymbols;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default budget for discovered references in one run
pub const DEFAULT_MAX_DISCOVERIES: usize = 10_000;

/// A cell bound to an explicit Python name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellAlias {
    /// Sheet-qualified cell, e.g. `Inputs!D6`
    pub cell: String,
    /// Python identifier
    pub name: String,
}

impl CellAlias {
    /// Create an alias
    pub fn new(cell: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            cell: cell.into(),
            name: name.into(),
        }
    }

    /// The aliased reference; it must name its sheet
    pub fn reference(&self) -> GenerateResult<Reference> {
        let reference = Reference::parse(&self.cell)
            .map_err(|e| GenerationError::config(format!("alias {}: {}", self.name, e)))?;
        if reference.sheet.is_none() {
            return Err(GenerationError::config(format!(
                "alias {} must name the sheet of {}",
                self.name, self.cell
            )));
        }
        Ok(reference)
    }
}

/// Configuration for one generation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Workbook file name the class and output names derive from
    pub spreadsheet: String,
    /// Prefix for the generated class and file
    pub prefix: String,
    /// Name of the hand-written subclass (derived when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Name of the generated class (derived when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gen_class_name: Option<String>,
    /// Output file (derived when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// Sheets whose named value cells become constructor parameters
    pub input_sheets: Vec<String>,
    /// Sheets whose named formula cells become results
    pub output_sheets: Vec<String>,
    /// Sheets whose defined names are skipped
    pub ignore_sheets: Vec<String>,
    /// Explicit constructor parameters, in declaration order
    pub inputs: Vec<CellAlias>,
    /// Explicit results, in declaration order
    pub outputs: Vec<CellAlias>,
    /// Functions supplied by the extra imports, emitted bare
    pub globals: Vec<String>,
    /// Renames for plain names, e.g. `lambda -> my_lambda`
    pub name_aliases: BTreeMap<String, String>,
    /// Number formats that mark a number as a date
    pub valid_date_formats: Vec<String>,
    /// Extra import lines for the generated module
    pub imports: String,
    /// Budget for references discovered during one run
    pub max_discoveries: usize,
    /// Write the generation time into the header
    pub timestamp: bool,
    /// Command line recorded in the header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_line: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            spreadsheet: String::new(),
            prefix: "gen".into(),
            class_name: None,
            gen_class_name: None,
            output: None,
            input_sheets: vec!["Inputs".into()],
            output_sheets: vec!["Results".into()],
            ignore_sheets: vec!["Notes".into()],
            inputs: Vec::new(),
            outputs: Vec::new(),
            globals: Vec::new(),
            name_aliases: BTreeMap::new(),
            valid_date_formats: vec!["dd/mm/yyyy".into()],
            imports: "from excel2py.toolkit import *\n".into(),
            max_discoveries: DEFAULT_MAX_DISCOVERIES,
            timestamp: true,
            command_line: None,
        }
    }
}

/// Names derived for the generated module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassNames {
    /// Subclass users write to override generated behavior
    pub class_name: String,
    /// The generated class
    pub gen_class_name: String,
    /// Output path
    pub output: PathBuf,
}

impl GeneratorConfig {
    /// Defaults for a workbook file
    pub fn for_spreadsheet(spreadsheet: impl Into<String>) -> Self {
        Self {
            spreadsheet: spreadsheet.into(),
            ..Self::default()
        }
    }

    /// Parse a JSON configuration
    pub fn from_json(json: &str) -> GenerateResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> GenerateResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Pretty JSON, as written by `config-template`
    pub fn to_json_pretty(&self) -> GenerateResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// A starting point for a new configuration
    pub fn template() -> Self {
        Self {
            spreadsheet: "mycalc.xlsx".into(),
            inputs: vec![
                CellAlias::new("Inputs!D6", "first_input"),
                CellAlias::new("Inputs!D7", "second_input"),
            ],
            outputs: vec![
                CellAlias::new("Results!C5", "first_output"),
                CellAlias::new("Results!C6", "second_output"),
            ],
            ..Self::default()
        }
    }

    /// Class and output names, explicit values first
    ///
    /// The base name is the file name up to its first `.`, so `myCalc.v1.xlsm`
    /// gives `mycalc`. The output file sits next to the spreadsheet.
    pub fn class_names(&self) -> GenerateResult<ClassNames> {
        let path = Path::new(&self.spreadsheet);
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        let base = match file_name.find('.') {
            Some(dot) if dot > 0 => &file_name[..dot],
            _ if self.class_name.is_some()
                && self.gen_class_name.is_some()
                && self.output.is_some() =>
            {
                ""
            }
            _ => {
                return Err(GenerationError::config(format!(
                    "spreadsheet {:?} needs a file extension to derive class names",
                    self.spreadsheet
                )))
            }
        };

        let class_name = self
            .class_name
            .clone()
            .unwrap_or_else(|| capitalize(base));
        let gen_class_name = self
            .gen_class_name
            .clone()
            .unwrap_or_else(|| format!("{}{}", capitalize(&self.prefix), class_name));
        let output = match &self.output {
            Some(output) => output.clone(),
            None => {
                let file = format!("{}_{}.py", self.prefix, base).to_lowercase();
                match path.parent() {
                    Some(dir) => dir.join(file),
                    None => PathBuf::from(file),
                }
            }
        };

        Ok(ClassNames {
            class_name,
            gen_class_name,
            output,
        })
    }

    /// Check every configured name is usable in the generated code
    pub fn validate(&self) -> GenerateResult<()> {
        for alias in self.inputs.iter().chain(&self.outputs) {
            check_identifier(&alias.name)?;
            alias.reference()?;
        }
        for (name, identifier) in &self.name_aliases {
            check_identifier(identifier)
                .map_err(|_| GenerationError::config(format!("rename of {} to {:?}", name, identifier)))?;
        }
        for name in &self.globals {
            check_identifier(name)?;
        }

        let mut seen = ahash::AHashSet::new();
        for alias in &self.inputs {
            if !seen.insert(alias.name.as_str()) {
                return Err(GenerationError::config(format!(
                    "input {} is declared twice",
                    alias.name
                )));
            }
        }
        Ok(())
    }

    /// Whether a sheet is one of the input sheets (sheet names ignore case)
    pub fn is_input_sheet(&self, sheet: &str) -> bool {
        self.input_sheets.iter().any(|s| s.eq_ignore_ascii_case(sheet))
    }

    /// Whether a sheet is one of the output sheets
    pub fn is_output_sheet(&self, sheet: &str) -> bool {
        self.output_sheets.iter().any(|s| s.eq_ignore_ascii_case(sheet))
    }

    /// Whether a sheet is skipped
    pub fn is_ignored_sheet(&self, sheet: &str) -> bool {
        self.ignore_sheets.iter().any(|s| s.eq_ignore_ascii_case(sheet))
    }

    /// Whether a number format marks a date
    pub fn is_date_format(&self, format: &str) -> bool {
        self.valid_date_formats.iter().any(|f| f == format)
    }
}

/// First character upper case, the rest lower case
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn check_identifier(name: &str) -> GenerateResult<()> {
    if !regex_is_match!(r"^[A-Za-z_][A-Za-z0-9_]*$", name) {
        return Err(GenerationError::config(format!(
            "{:?} is not a Python identifier",
            name
        )));
    }
    if GlobalSymbols::is_python_keyword(name) {
        return Err(GenerationError::config(format!(
            "{:?} is a Python keyword",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_derived_names() {
        let config = GeneratorConfig {
            prefix: "auto".into(),
            ..GeneratorConfig::for_spreadsheet("models/ProForma.xlsm")
        };
        let names = config.class_names().unwrap();
        assert_eq!(names.class_name, "Proforma");
        assert_eq!(names.gen_class_name, "AutoProforma");
        assert_eq!(names.output, Path::new("models").join("auto_proforma.py"));
    }

    #[test]
    fn test_explicit_names_win() {
        let config = GeneratorConfig {
            class_name: Some("Calc".into()),
            output: Some("out/calc_gen.py".into()),
            ..GeneratorConfig::for_spreadsheet("book.xlsx")
        };
        let names = config.class_names().unwrap();
        assert_eq!(names.class_name, "Calc");
        assert_eq!(names.gen_class_name, "GenCalc");
        assert_eq!(names.output, PathBuf::from("out/calc_gen.py"));
    }

    #[test]
    fn test_missing_extension() {
        let config = GeneratorConfig::for_spreadsheet("book");
        assert!(matches!(
            config.class_names(),
            Err(GenerationError::Config(_))
        ));
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = GeneratorConfig::from_json("{}").unwrap();
        assert_eq!(config, GeneratorConfig::default());
        assert_eq!(config.input_sheets, vec!["Inputs"]);
        assert_eq!(config.max_discoveries, DEFAULT_MAX_DISCOVERIES);
        assert!(config.is_date_format("dd/mm/yyyy"));
    }

    #[test]
    fn test_json_fields() {
        let config = GeneratorConfig::from_json(
            r#"{
                "spreadsheet": "calc.xlsx",
                "inputs": [{"cell": "Inputs!D6", "name": "first_input"}],
                "name_aliases": {"lambda": "my_lambda"},
                "timestamp": false
            }"#,
        )
        .unwrap();
        assert_eq!(config.inputs, vec![CellAlias::new("Inputs!D6", "first_input")]);
        assert_eq!(config.name_aliases["lambda"], "my_lambda");
        assert!(!config.timestamp);
        assert_eq!(config.prefix, "gen");
    }

    #[test]
    fn test_template_round_trips() {
        let template = GeneratorConfig::template();
        let json = template.to_json_pretty().unwrap();
        assert_eq!(GeneratorConfig::from_json(&json).unwrap(), template);
        assert!(template.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        let mut config = GeneratorConfig::default();
        config.inputs.push(CellAlias::new("Inputs!D6", "lambda"));
        assert!(config.validate().is_err());

        let mut config = GeneratorConfig::default();
        config.inputs.push(CellAlias::new("D6", "rate"));
        assert!(config.validate().is_err());

        let mut config = GeneratorConfig::default();
        config.inputs.push(CellAlias::new("Inputs!D6", "rate"));
        config.inputs.push(CellAlias::new("Inputs!D7", "rate"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("myCalc"), "Mycalc");
        assert_eq!(capitalize("gen"), "Gen");
        assert_eq!(capitalize(""), "");
    }
}
