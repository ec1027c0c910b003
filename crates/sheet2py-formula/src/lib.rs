//! # sheet2py-formula
//!
//! Formula compiler for sheet2py.
//!
//! This crate provides:
//! - Formula parsing (text → AST)
//! - Reference resolution through an [`AliasTable`] with a discovery queue
//! - Translation of the AST into a Python expression
//! - Generalization of blocks of related formulas into one comprehension
//!
//! ## Example
//!
//! ```rust
//! use sheet2py_formula::{parse_formula, AliasTable, Translator};
//!
//! let mut aliases = AliasTable::new();
//! let ast = parse_formula("=SUM(A1:A10)*50%").unwrap();
//! let python = Translator::default().translate(&ast, Some("Calc"), &mut aliases);
//! assert_eq!(python, "SUM(self.CalcA1A10)*0.5");
//! assert_eq!(aliases.pop_pending().as_deref(), Some("Calc!$A$1:$A$10"));
//! ```

pub mod ast;
pub mod error;
pub mod parser;
pub mod resolver;
pub mod symbols;
pub mod translate;
pub mod tuple;

pub use ast::{Constant, Expression, Formula, NumberLiteral, Operator, Term};
pub use error::{FormulaError, FormulaResult};
pub use parser::{parse_expression_text, parse_formula, parse_single};
pub use resolver::{AliasSource, AliasTable};
pub use symbols::GlobalSymbols;
pub use translate::{number_literal, python_string, python_tuple, substitute_inputs, Translator};
pub use tuple::{generalize, FormulaBlock, GeneralizationFailure};
