//! Formula Abstract Syntax Tree types
//!
//! The tree mirrors the formula grammar rather than operator semantics: an
//! [`Expression`] is a term optionally followed by an operator and the rest
//! of the chain, so `1+2*3` is `1 + (2 * 3)` and `1*2+3` is `1 * (2 + 3)`.
//! No precedence is applied while parsing. The emitted Python re-applies its
//! own precedence when the text is evaluated.

use sheet2py_core::Reference;
use std::fmt;

/// A parsed formula: one or more expressions
///
/// Almost every formula holds a single expression. Several appear when the
/// spreadsheet uses the space (intersection) operator between references.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    pub expressions: Vec<Expression>,
}

/// A term, optionally chained to the rest of the expression by an operator
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub term: Term,
    pub tail: Option<(Operator, Box<Expression>)>,
}

impl Expression {
    /// An expression made of a single term
    pub fn single(term: Term) -> Self {
        Self { term, tail: None }
    }

    /// Chain `self <op> rest`
    pub fn chain(term: Term, op: Operator, rest: Expression) -> Self {
        Self {
            term,
            tail: Some((op, Box::new(rest))),
        }
    }

    /// Terms and operators in written order
    pub fn links(&self) -> ExpressionLinks<'_> {
        ExpressionLinks { next: Some(self) }
    }
}

/// Iterator over the `(term, operator)` links of an expression chain
pub struct ExpressionLinks<'a> {
    next: Option<&'a Expression>,
}

impl<'a> Iterator for ExpressionLinks<'a> {
    type Item = (&'a Term, Option<Operator>);

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        match &current.tail {
            Some((op, rest)) => {
                self.next = Some(rest);
                Some((&current.term, Some(*op)))
            }
            None => Some((&current.term, None)),
        }
    }
}

/// An operand
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// Number or text literal
    Constant(Constant),
    /// `NAME(args...)`
    FunctionCall { name: String, args: Vec<Expression> },
    /// Parenthesized, comma separated expressions
    Group(Vec<Expression>),
    /// Cell or range reference, optionally sheet-qualified
    Range(Reference),
    /// Bare name: a defined name, a boolean, or a function used as a value
    Name(String),
    /// The literal `None`
    Null,
    /// `-term`
    Negate(Box<Term>),
}

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Number(NumberLiteral),
    Text(String),
}

/// A number as written
///
/// The digits are kept verbatim so the generated code shows the same
/// literal the workbook does. A trailing `%` is recorded separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberLiteral {
    /// Sign, digits, decimal point and exponent exactly as written
    pub digits: String,
    /// Whether the literal ended in `%`
    pub percent: bool,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    GreaterEqual,
    LessEqual,
    NotEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Equal,
    Greater,
    Less,
    Concat,
}

impl Operator {
    /// The operator as written in a formula
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::GreaterEqual => ">=",
            Operator::LessEqual => "<=",
            Operator::NotEqual => "<>",
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Power => "^",
            Operator::Equal => "=",
            Operator::Greater => ">",
            Operator::Less => "<",
            Operator::Concat => "&",
        }
    }

    /// The equivalent Python operator text
    pub fn python(&self) -> &'static str {
        match self {
            Operator::Equal => " == ",
            Operator::Power => "**",
            Operator::Concat => " + ",
            Operator::NotEqual => " != ",
            other => other.symbol(),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Formula {
    /// Visit every term, parents before their children
    ///
    /// The callback may replace the term it is given; the walk then
    /// descends into the replacement.
    pub fn for_each_term_mut(&mut self, f: &mut impl FnMut(&mut Term)) {
        for expression in &mut self.expressions {
            visit_expression(expression, f);
        }
    }
}

fn visit_expression(expression: &mut Expression, f: &mut impl FnMut(&mut Term)) {
    visit_term(&mut expression.term, f);
    if let Some((_, rest)) = &mut expression.tail {
        visit_expression(rest, f);
    }
}

fn visit_term(term: &mut Term, f: &mut impl FnMut(&mut Term)) {
    f(term);
    match term {
        Term::FunctionCall { args, .. } | Term::Group(args) => {
            for arg in args {
                visit_expression(arg, f);
            }
        }
        Term::Negate(inner) => visit_term(inner, f),
        Term::Constant(_) | Term::Range(_) | Term::Name(_) | Term::Null => {}
    }
}
