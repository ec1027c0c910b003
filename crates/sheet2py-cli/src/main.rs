//! sheet2py CLI - compiles spreadsheet formulas into a Python class

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sheet2py::{
    AliasTable, FileSink, Generator, GeneratorConfig, GlobalSymbols, MemoryWorkbook, Translator,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sheet2py")]
#[command(
    author,
    version,
    about = "Compile spreadsheet formulas into a Python class"
)]
struct Cli {
    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the Python module for a workbook dump
    #[command(alias = "gen")]
    Generate {
        /// Workbook dump (JSON)
        workbook: PathBuf,

        /// Generator configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file (default: derived from the spreadsheet name)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Spreadsheet name used to derive class and file names
        /// (default: the configured spreadsheet, then the workbook path)
        #[arg(short, long)]
        spreadsheet: Option<String>,

        /// Leave the generation timestamp out of the header
        #[arg(long)]
        no_timestamp: bool,
    },

    /// Translate one formula and print the Python expression
    Translate {
        /// Formula text, with or without the leading `=`
        formula: String,

        /// Sheet that unqualified references live on
        #[arg(short, long)]
        sheet: Option<String>,

        /// Functions emitted without `self.`
        #[arg(short, long, value_delimiter = ',')]
        globals: Vec<String>,
    },

    /// Print a configuration template
    ConfigTemplate {
        /// Write the template to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Generate {
            workbook,
            config,
            output,
            spreadsheet,
            no_timestamp,
        } => generate(
            &workbook,
            config.as_deref(),
            output,
            spreadsheet,
            no_timestamp,
        ),
        Commands::Translate {
            formula,
            sheet,
            globals,
        } => translate(&formula, sheet.as_deref(), globals),
        Commands::ConfigTemplate { output } => config_template(output.as_deref()),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn generate(
    workbook_path: &Path,
    config_path: Option<&Path>,
    output: Option<PathBuf>,
    spreadsheet: Option<String>,
    no_timestamp: bool,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => GeneratorConfig::from_file(path)
            .with_context(|| format!("Failed to read configuration '{}'", path.display()))?,
        None => GeneratorConfig::default(),
    };
    if let Some(spreadsheet) = spreadsheet {
        config.spreadsheet = spreadsheet;
    } else if config.spreadsheet.is_empty() {
        config.spreadsheet = workbook_path.to_string_lossy().into_owned();
    }
    if output.is_some() {
        config.output = output;
    }
    if no_timestamp {
        config.timestamp = false;
    }
    config.command_line = Some(std::env::args().collect::<Vec<_>>().join(" "));

    let text = std::fs::read_to_string(workbook_path)
        .with_context(|| format!("Failed to open '{}'", workbook_path.display()))?;
    let workbook = MemoryWorkbook::from_json(&text)
        .with_context(|| format!("Failed to load workbook '{}'", workbook_path.display()))?;

    let generator = Generator::new(config).context("Invalid configuration")?;
    let mut sink = FileSink::new(generator.output_path());
    let report = generator
        .generate(&workbook, &mut sink)
        .context("Generation failed")?;

    for warning in &report.warnings {
        eprintln!("Warning: {}", warning);
    }
    for error in &report.errors {
        eprintln!("Error: {}", error);
    }
    eprintln!("{}", report);

    if !report.is_success() {
        bail!(
            "{} errors, nothing written to '{}'",
            report.errors.len(),
            sink.path().display()
        );
    }
    eprintln!("Wrote '{}'", sink.path().display());
    Ok(())
}

fn translate(formula: &str, sheet: Option<&str>, globals: Vec<String>) -> Result<()> {
    let translator = Translator::new(GlobalSymbols::with_externals(globals));
    let mut aliases = AliasTable::new();
    let python = translator
        .translate_text(formula, sheet, &mut aliases)
        .with_context(|| format!("Failed to parse '{}'", formula))?;
    println!("{}", python);
    Ok(())
}

fn config_template(output: Option<&Path>) -> Result<()> {
    let json = GeneratorConfig::template()
        .to_json_pretty()
        .context("Failed to serialize the template")?;

    match output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", json))
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            eprintln!("Wrote template to '{}'", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate() {
        let cli = Cli::try_parse_from([
            "sheet2py",
            "-vv",
            "generate",
            "calc.json",
            "--config",
            "calc.config.json",
            "--no-timestamp",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Generate {
                workbook,
                config,
                output,
                no_timestamp,
                ..
            } => {
                assert_eq!(workbook, PathBuf::from("calc.json"));
                assert_eq!(config, Some(PathBuf::from("calc.config.json")));
                assert_eq!(output, None);
                assert!(no_timestamp);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_parse_translate_globals() {
        let cli = Cli::try_parse_from([
            "sheet2py",
            "translate",
            "=tk_scale(A1,2)",
            "--sheet",
            "Calc",
            "--globals",
            "tk_scale,tk_round",
        ])
        .unwrap();
        match cli.command {
            Commands::Translate { sheet, globals, .. } => {
                assert_eq!(sheet.as_deref(), Some("Calc"));
                assert_eq!(globals, vec!["tk_scale", "tk_round"]);
            }
            _ => panic!("expected translate"),
        }
    }

    #[test]
    fn test_config_template_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        config_template(Some(&path)).unwrap();
        let config = GeneratorConfig::from_file(&path).unwrap();
        assert_eq!(config.inputs.len(), 2);
        assert_eq!(config.spreadsheet, "mycalc.xlsx");
    }
}
