//! Generation driver
//!
//! A [`Generator`] turns a workbook into the source of one Python class.
//! Names are classified into sections in workbook order, then every
//! reference the translated formulas touch without a name is discovered,
//! read back from the workbook and classified in turn, until nothing new
//! turns up.
//!
//! # Example
//!
//! ```rust
//! use sheet2py::{CellAlias, Generator, GeneratorConfig, StringSink};
//! use sheet2py_core::{DefinedName, MemoryWorkbook};
//!
//! let mut workbook = MemoryWorkbook::new();
//! workbook.add_sheet("Inputs").unwrap();
//! workbook.add_sheet("Calc").unwrap();
//! workbook.set_value("Inputs", "D6", 3.0).unwrap();
//! workbook.set_formula("Calc", "B2", "=MAX(Inputs!D6,4)").unwrap();
//! workbook.define_name(DefinedName::new("BIGGER", "=Calc!$B$2")).unwrap();
//!
//! let config = GeneratorConfig {
//!     inputs: vec![CellAlias::new("Inputs!D6", "first_input")],
//!     timestamp: false,
//!     ..GeneratorConfig::for_spreadsheet("demo.xlsx")
//! };
//! let mut sink = StringSink::new();
//! let report = Generator::new(config).unwrap().generate(&workbook, &mut sink).unwrap();
//!
//! assert!(report.is_success());
//! assert!(sink.text().unwrap().contains("self._BIGGER = MAX(self.first_input, 4)"));
//! ```

use crate::classify::{classify, NameFacts, SectionKind};
use crate::config::{ClassNames, GeneratorConfig};
use crate::emit::{emit, Header};
use crate::error::{GenerateResult, GenerationError};
use crate::section::{value_literal, Sections};
use crate::sink::OutputSink;
use ahash::{AHashMap, AHashSet};
use sheet2py_core::{
    CellAddress, CellRange, CellValue, DefinedName, Error as SourceError, Reference,
    WorkbookSource,
};
use sheet2py_formula::{
    generalize, parse_single, python_tuple, substitute_inputs, AliasTable,
    FormulaBlock, GlobalSymbols, Translator,
};
use std::fmt;
use std::path::Path;

/// Largest range read from the workbook for a single name
pub const MAX_RANGE_CELLS: u64 = 1_000_000;

/// Outcome of a generation run
#[derive(Debug, Default)]
pub struct GenerationReport {
    /// Names classified, declared and discovered
    pub names: usize,
    /// References found during translation and emitted in their own right
    pub discovered: usize,
    /// Constructor parameters
    pub inputs: usize,
    /// Results returned by `calculate`
    pub outputs: usize,
    /// Properties emitted
    pub properties: usize,
    /// Constants emitted
    pub constants: usize,
    /// Formula blocks collapsed into one comprehension
    pub generalized: usize,
    /// Multi-cell names emitted cell by cell
    pub fallbacks: usize,
    /// Errors that prevent writing the output
    pub errors: Vec<GenerationError>,
    /// Problems that are listed in the output but do not stop it
    pub warnings: Vec<GenerationError>,
}

impl GenerationReport {
    /// Whether the output can be written
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    fn record(&mut self, error: GenerationError) {
        if error.is_fatal() {
            tracing::error!("{}", error);
            self.errors.push(error);
        } else {
            tracing::warn!("{}", error);
            self.warnings.push(error);
        }
    }
}

impl fmt::Display for GenerationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} names ({} discovered): {} inputs, {} outputs, {} properties, {} constants; \
             {} errors, {} warnings",
            self.names,
            self.discovered,
            self.inputs,
            self.outputs,
            self.properties,
            self.constants,
            self.errors.len(),
            self.warnings.len()
        )
    }
}

/// Generated text with the report of the run that produced it
#[derive(Debug)]
pub struct Generated {
    /// The Python module
    pub text: String,
    /// What happened along the way
    pub report: GenerationReport,
}

/// Generates a Python class from a workbook
#[derive(Debug, Clone)]
pub struct Generator {
    config: GeneratorConfig,
    names: ClassNames,
    translator: Translator,
}

impl Generator {
    /// Validate a configuration and prepare a generator for it
    pub fn new(config: GeneratorConfig) -> GenerateResult<Self> {
        config.validate()?;
        let names = config.class_names()?;
        let translator = Translator::new(GlobalSymbols::with_externals(config.globals.iter().cloned()));
        Ok(Self {
            config,
            names,
            translator,
        })
    }

    /// The configuration in use
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Where the generated module belongs
    pub fn output_path(&self) -> &Path {
        &self.names.output
    }

    /// Generate the module text without writing it
    pub fn render<S: WorkbookSource + ?Sized>(&self, source: &S) -> GenerateResult<Generated> {
        let mut run = Run::new(source, &self.config, &self.translator);
        run.bind_config()?;
        for candidate in run.bind_defined_names(source.defined_names()) {
            run.process(candidate);
        }
        run.discover();

        let Run {
            sections,
            mut report,
            ..
        } = run;
        report.inputs = sections.interface.inputs().len();
        report.outputs = sections.interface.outputs().len();
        report.properties = sections.properties.len();
        report.constants = sections.constants.len();
        tracing::info!("{}", report);

        let text = emit(&self.header(), &sections);
        Ok(Generated { text, report })
    }

    /// Generate the module and write it to `sink` if the run succeeded
    pub fn generate<S, O>(&self, source: &S, sink: &mut O) -> GenerateResult<GenerationReport>
    where
        S: WorkbookSource + ?Sized,
        O: OutputSink + ?Sized,
    {
        let Generated { text, report } = self.render(source)?;
        if report.is_success() {
            sink.write(&text)?;
        } else {
            tracing::error!(
                "not writing {}: {} errors",
                self.names.gen_class_name,
                report.errors.len()
            );
        }
        Ok(report)
    }

    fn header(&self) -> Header {
        let mut header = Header::new(&self.names, self.config.imports.clone());
        header.command_line = self.config.command_line.clone();
        if self.config.timestamp {
            header = header.stamped();
        }
        header
    }
}

/// What a name points at
#[derive(Debug, Clone)]
enum Target {
    Cells(Reference),
    Expression { text: String, sheet: Option<String> },
    Unresolved,
    Builtin,
    Broken,
}

/// A name waiting to be classified
#[derive(Debug, Clone)]
struct Candidate {
    /// Name as the workbook spells it
    name: String,
    /// Python identifier it is emitted under
    identifier: String,
    refers_to: String,
    target: Target,
    discovered: bool,
}

/// Cells behind a name, read once
struct CellData {
    sheet: String,
    range: CellRange,
    formulas: Vec<Vec<Option<String>>>,
    values: Vec<Vec<CellValue>>,
}

impl CellData {
    fn address(&self, row: usize, col: usize) -> CellAddress {
        CellAddress::new(self.range.start.row + row as u32, self.range.start.col + col as u16)
    }

    fn has_formula(&self) -> bool {
        self.formulas.iter().flatten().any(Option::is_some)
    }

    fn has_value(&self) -> bool {
        self.values.iter().flatten().any(|v| !v.is_empty())
    }
}

/// State of one generation run
struct Run<'a, S: ?Sized> {
    source: &'a S,
    config: &'a GeneratorConfig,
    translator: &'a Translator,
    aliases: AliasTable,
    sections: Sections,
    report: GenerationReport,
    /// Canonical keys already classified
    visited: AHashSet<String>,
    /// Identifier to the name that claimed it
    claimed: AHashMap<String, String>,
    /// Canonical key and parameter of every constructor input
    inputs: Vec<(String, String)>,
}

impl<'a, S: WorkbookSource + ?Sized> Run<'a, S> {
    fn new(source: &'a S, config: &'a GeneratorConfig, translator: &'a Translator) -> Self {
        let mut aliases = AliasTable::new();
        for sheet in source.sheet_names() {
            aliases.insert_sheet(sheet);
        }
        Self {
            source,
            config,
            translator,
            aliases,
            sections: Sections::default(),
            report: GenerationReport::default(),
            visited: AHashSet::new(),
            claimed: AHashMap::new(),
            inputs: Vec::new(),
        }
    }

    /// Bind the configured renames, inputs and outputs
    fn bind_config(&mut self) -> GenerateResult<()> {
        for (name, identifier) in &self.config.name_aliases {
            self.aliases.insert_name_alias(name.clone(), identifier.clone());
        }
        for alias in &self.config.inputs {
            let reference = alias.reference()?;
            self.aliases.insert_config(&reference, alias.name.clone());
            let key = self.aliases.canonical_key(&reference, None);
            self.inputs.push((key, alias.name.clone()));
            self.sections.interface.add_input(alias.name.clone());
        }
        for alias in &self.config.outputs {
            let reference = alias.reference()?;
            self.aliases.insert_config(&reference, alias.name.clone());
            self.sections.interface.add_output(alias.name.clone());
        }
        Ok(())
    }

    /// Bind every defined name and return them, plus configured outputs no
    /// name covers, as candidates in workbook order
    fn bind_defined_names(&mut self, names: Vec<DefinedName>) -> Vec<Candidate> {
        let mut candidates = Vec::with_capacity(names.len());
        let mut named_keys = AHashSet::new();

        for defined in names {
            let identifier = self.aliases.rename(&defined.name).to_string();
            let target = if defined.is_unresolved() {
                Target::Unresolved
            } else if defined.is_builtin() {
                Target::Builtin
            } else if defined.is_broken() {
                Target::Broken
            } else {
                match defined.reference() {
                    Some(reference) => Target::Cells(reference),
                    None => Target::Expression {
                        text: defined.expression().to_string(),
                        sheet: defined.local_sheet.clone(),
                    },
                }
            };

            let identifier = match &target {
                Target::Cells(reference) => {
                    let key = self.aliases.canonical_key(reference, None);
                    named_keys.insert(key.clone());
                    self.bind_reference_name(&defined.name, identifier, reference, &key)
                }
                Target::Expression { .. } => {
                    self.aliases.reserve(identifier.clone());
                    identifier
                }
                _ => identifier,
            };

            candidates.push(Candidate {
                name: defined.name.clone(),
                identifier,
                refers_to: defined.refers_to.clone(),
                target,
                discovered: false,
            });
        }

        // Results configured by cell only
        for alias in &self.config.outputs {
            let Ok(reference) = alias.reference() else {
                continue;
            };
            if named_keys.insert(self.aliases.canonical_key(&reference, None)) {
                candidates.push(Candidate {
                    name: alias.name.clone(),
                    identifier: alias.name.clone(),
                    refers_to: alias.cell.clone(),
                    target: Target::Cells(reference),
                    discovered: false,
                });
            }
        }
        candidates
    }

    /// Bind a name that refers to cells and return the identifier it ends up with
    fn bind_reference_name(
        &mut self,
        name: &str,
        identifier: String,
        reference: &Reference,
        key: &str,
    ) -> String {
        if !self.aliases.insert_defined_name(reference, identifier.clone()) {
            // A configured alias or an earlier name owns the cells
            let owner = self.aliases.lookup(key).unwrap_or(identifier.as_str()).to_string();
            if owner != name {
                self.aliases.insert_name_alias(name, owner.clone());
            }
            return owner;
        }

        let Some(sheet) = reference.sheet.as_deref() else {
            return identifier;
        };
        if !self.source.has_sheet(sheet) || reference.range.cell_count() > MAX_RANGE_CELLS {
            return identifier;
        }

        if self.config.is_input_sheet(sheet) && !reference.is_multi_cell() {
            let address = reference.range.start;
            let holds_value = self.source.formula(sheet, address).is_none()
                && !self.source.value(sheet, address).is_empty();
            if holds_value && self.sections.interface.add_input(identifier.clone()) {
                tracing::debug!("{} is an input", identifier);
                self.inputs.push((key.to_string(), identifier.clone()));
            }
        } else if self.config.is_output_sheet(sheet) {
            let has_formula = self
                .source
                .formulas_in(sheet, &reference.range)
                .iter()
                .flatten()
                .any(Option::is_some);
            if has_formula && self.sections.interface.add_output(identifier.clone()) {
                tracing::debug!("{} is an output", identifier);
            }
        }
        identifier
    }

    /// Classify every discovered reference until the queue runs dry
    fn discover(&mut self) {
        let limit = self.config.max_discoveries;
        let mut processed = 0;

        while let Some(key) = self.aliases.pop_pending() {
            if self.visited.contains(&key) {
                continue;
            }
            if processed >= limit {
                let mut pending = 1;
                while self.aliases.pop_pending().is_some() {
                    pending += 1;
                }
                self.report
                    .record(GenerationError::UnresolvedReferenceCycle { limit, pending });
                return;
            }
            processed += 1;

            let reference = match Reference::parse(&key) {
                Ok(reference) => reference,
                Err(source) => {
                    self.report.record(GenerationError::Source { name: key, source });
                    continue;
                }
            };
            let identifier = self.aliases.lookup(&key).unwrap_or_default().to_string();
            tracing::debug!("processing discovered {} as {}", key, identifier);

            self.report.discovered += 1;
            self.process(Candidate {
                name: identifier.clone(),
                identifier,
                refers_to: key,
                target: Target::Cells(reference),
                discovered: true,
            });
        }
    }

    /// Classify a name and add it to the section that claims it
    fn process(&mut self, candidate: Candidate) {
        self.report.names += 1;

        let mut facts = NameFacts {
            discovered: candidate.discovered,
            ..Default::default()
        };
        let mut cells = None;
        match &candidate.target {
            Target::Unresolved => facts.unresolved = true,
            Target::Builtin => facts.builtin = true,
            Target::Broken => facts.broken = true,
            Target::Expression { sheet, .. } => {
                facts.has_formula = true;
                facts.on_ignored_sheet = sheet
                    .as_deref()
                    .map_or(false, |sheet| self.config.is_ignored_sheet(sheet));
            }
            Target::Cells(reference) => match self.read_cells(&candidate.name, reference) {
                Ok(data) => {
                    facts.on_ignored_sheet = self.config.is_ignored_sheet(&data.sheet);
                    facts.has_formula = data.has_formula();
                    facts.has_value = data.has_value();
                    let key = self.aliases.canonical_key(reference, None);
                    self.visited.insert(key);
                    cells = Some(data);
                }
                Err(error) => {
                    self.report.record(error);
                    return;
                }
            },
        }
        facts.is_input = self.sections.interface.has_input(&candidate.identifier);
        facts.duplicate = self
            .claimed
            .get(&candidate.identifier)
            .map_or(false, |owner| owner != &candidate.name);

        let claimed = match classify(&facts) {
            Some(SectionKind::Diagnostics) => {
                if facts.broken {
                    self.sections
                        .diagnostics
                        .broken(&candidate.name, &candidate.refers_to);
                } else if facts.duplicate {
                    self.sections
                        .diagnostics
                        .duplicate(&candidate.name, &candidate.identifier);
                } else {
                    tracing::debug!("ignoring {}", candidate.name);
                    self.sections.diagnostics.ignore();
                }
                false
            }
            Some(SectionKind::Interface) => true,
            Some(SectionKind::Properties) => match self.property_body(&candidate, cells.as_ref()) {
                Ok(body) => {
                    self.sections
                        .properties
                        .add(candidate.identifier.clone(), body);
                    true
                }
                Err(error) => {
                    self.report.record(error);
                    false
                }
            },
            Some(SectionKind::Constants) => {
                let literal = match &cells {
                    Some(data) => self.constant_literal(data),
                    None => "None".to_string(),
                };
                self.sections
                    .constants
                    .add(candidate.identifier.clone(), literal);
                true
            }
            None => {
                let reason = match &candidate.target {
                    Target::Cells(reference) => format!(
                        "{} holds no value or formula",
                        self.aliases.canonical_key(reference, None)
                    ),
                    _ => format!("nothing usable in {}", candidate.refers_to),
                };
                self.sections
                    .diagnostics
                    .unclassified(&candidate.name, &reason);
                self.report.record(GenerationError::UnclassifiedName {
                    name: candidate.name.clone(),
                    reason,
                });
                // Formulas may still refer to the name
                self.sections
                    .constants
                    .add(candidate.identifier.clone(), "None".to_string());
                true
            }
        };

        if claimed {
            self.claimed
                .insert(candidate.identifier.clone(), candidate.name.clone());
        }
    }

    fn read_cells(&self, name: &str, reference: &Reference) -> GenerateResult<CellData> {
        let source_error = |source: SourceError| GenerationError::Source {
            name: name.to_string(),
            source,
        };
        let sheet = reference
            .sheet
            .clone()
            .ok_or_else(|| source_error(SourceError::InvalidReference(format!("{} names no sheet", reference))))?;
        if !self.source.has_sheet(&sheet) {
            return Err(source_error(SourceError::SheetNotFound(sheet)));
        }
        if reference.range.cell_count() > MAX_RANGE_CELLS {
            return Err(source_error(SourceError::InvalidRange(format!(
                "{} spans more than {} cells",
                reference, MAX_RANGE_CELLS
            ))));
        }

        let range = reference.range;
        Ok(CellData {
            formulas: self.source.formulas_in(&sheet, &range),
            values: self.source.values_in(&sheet, &range),
            sheet,
            range,
        })
    }

    /// Python expression for a formula name, with inputs substituted
    fn property_body(
        &mut self,
        candidate: &Candidate,
        cells: Option<&CellData>,
    ) -> GenerateResult<String> {
        let body = match (&candidate.target, cells) {
            (Target::Expression { text, sheet }, _) => {
                let formula = parse_single(text).map_err(|source| GenerationError::Parse {
                    name: candidate.name.clone(),
                    location: candidate.refers_to.clone(),
                    source,
                })?;
                self.translator
                    .translate(&formula, sheet.as_deref(), &mut self.aliases)
            }
            (_, Some(data)) if data.range.is_single_cell() => match &data.formulas[0][0] {
                Some(text) => self.translate_cell(&candidate.name, data, 0, 0, text)?,
                None => value_literal(&data.values[0][0], false),
            },
            (_, Some(data)) => self.block_body(&candidate.name, data)?,
            (_, None) => "None".to_string(),
        };

        let inputs = self.inputs.iter().map(|(key, param)| (key.as_str(), param.as_str()));
        Ok(substitute_inputs(&body, inputs, &self.aliases))
    }

    /// A multi-cell name: one comprehension if the block generalizes,
    /// otherwise a tuple of row tuples
    fn block_body(&mut self, name: &str, data: &CellData) -> GenerateResult<String> {
        let all_formulas: Option<Vec<Vec<String>>> = data
            .formulas
            .iter()
            .map(|row| row.iter().cloned().collect::<Option<Vec<String>>>())
            .collect();

        if let Some(rows) = all_formulas {
            let block = FormulaBlock::new(data.sheet.clone(), data.range.start, rows);
            if !block.is_uniform() {
                match generalize(&block, self.translator, &mut self.aliases) {
                    Ok(python) => {
                        tracing::debug!("{} generalized to {}", name, python);
                        self.report.generalized += 1;
                        return Ok(python);
                    }
                    Err(failure) => {
                        tracing::debug!("{} emitted cell by cell: {}", name, failure);
                    }
                }
            }
        }

        self.report.fallbacks += 1;
        let mut rows = Vec::with_capacity(data.formulas.len());
        for (r, row) in data.formulas.iter().enumerate() {
            let mut items = Vec::with_capacity(row.len());
            for (c, formula) in row.iter().enumerate() {
                let item = match formula {
                    Some(text) => self.translate_cell(name, data, r, c, text)?,
                    None => self.cell_literal(data, r, c),
                };
                items.push(item);
            }
            rows.push(python_tuple(&items));
        }
        Ok(python_tuple(&rows))
    }

    fn translate_cell(
        &mut self,
        name: &str,
        data: &CellData,
        row: usize,
        col: usize,
        text: &str,
    ) -> GenerateResult<String> {
        let formula = parse_single(text).map_err(|source| GenerationError::Parse {
            name: name.to_string(),
            location: Reference::cell(data.sheet.clone(), data.address(row, col)).to_string(),
            source,
        })?;
        Ok(self
            .translator
            .translate(&formula, Some(&data.sheet), &mut self.aliases))
    }

    fn constant_literal(&self, data: &CellData) -> String {
        if data.range.is_single_cell() {
            return self.cell_literal(data, 0, 0);
        }
        let rows: Vec<String> = (0..data.values.len())
            .map(|r| {
                let items: Vec<String> = (0..data.values[r].len())
                    .map(|c| self.cell_literal(data, r, c))
                    .collect();
                python_tuple(&items)
            })
            .collect();
        python_tuple(&rows)
    }

    fn cell_literal(&self, data: &CellData, row: usize, col: usize) -> String {
        let value = &data.values[row][col];
        let as_date = matches!(value, CellValue::Number(_))
            && self
                .config
                .is_date_format(&self.source.number_format(&data.sheet, data.address(row, col)));
        value_literal(value, as_date)
    }
}
