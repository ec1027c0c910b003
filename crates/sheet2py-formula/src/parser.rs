//! Formula parser
//!
//! A recursive descent parser for spreadsheet formulas. Operators form a
//! flat right-associative chain (see [`crate::ast`]); the parser recognizes
//! structure only and leaves precedence to the target language.

use crate::ast::{Constant, Expression, Formula, NumberLiteral, Operator, Term};
use crate::error::{FormulaError, FormulaResult};
use lazy_regex::regex_is_match;
use sheet2py_core::{CellAddress, CellRange, Reference};

/// Parse a formula string (with its leading `=`) into an AST
///
/// # Example
/// ```rust
/// use sheet2py_formula::parse_formula;
///
/// let ast = parse_formula("=1+2").unwrap();
/// let ast = parse_formula("=SUM(A1:A10)").unwrap();
/// let ast = parse_formula("=IF(A1>0,\"Yes\",\"No\")").unwrap();
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<Formula> {
    let formula = formula.trim();
    let payload = formula
        .strip_prefix('=')
        .ok_or_else(|| FormulaError::NotAFormula(formula.to_string()))?;
    parse_expression_text(payload)
}

/// Parse formula text, with or without its leading `=`, that must hold
/// exactly one top-level expression
///
/// Space-separated expressions such as `=A1:B2 B1:C3` parse, but they have
/// no single Python value to stand for.
pub fn parse_single(text: &str) -> FormulaResult<Formula> {
    let text = text.trim();
    let formula = match text.strip_prefix('=') {
        Some(payload) => parse_expression_text(payload)?,
        None => parse_expression_text(text)?,
    };
    match formula.expressions.len() {
        1 => Ok(formula),
        count => Err(FormulaError::MultipleExpressions { count }),
    }
}

/// Parse formula text that has already had its `=` removed
pub fn parse_expression_text(payload: &str) -> FormulaResult<Formula> {
    let mut parser = FormulaParser::new(payload)?;
    if parser.current_token() == &Token::Eof {
        return Err(FormulaError::parse(0, "empty formula"));
    }

    let mut expressions = Vec::new();
    while parser.current_token() != &Token::Eof {
        expressions.push(parser.parse_expression()?);
    }
    Ok(Formula { expressions })
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number { digits: String, percent: bool },
    Text(String),
    Identifier(String),
    Cell(String),
    Sheet(String),
    Operator(Operator),
    Colon,
    Comma,
    LeftParen,
    RightParen,
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number { digits, percent } => {
                format!("number {}{}", digits, if *percent { "%" } else { "" })
            }
            Token::Text(s) => format!("text \"{}\"", s),
            Token::Identifier(s) => format!("name '{}'", s),
            Token::Cell(s) => format!("cell '{}'", s),
            Token::Sheet(s) => format!("sheet '{}'", s),
            Token::Operator(op) => format!("operator '{}'", op),
            Token::Colon => "':'".into(),
            Token::Comma => "','".into(),
            Token::LeftParen => "'('".into(),
            Token::RightParen => "')'".into(),
            Token::Eof => "end of formula".into(),
        }
    }
}

/// Formula parser
struct FormulaParser<'a> {
    input: &'a str,
    pos: usize,
    current_token: Token,
    token_start: usize,
    token_end: usize,
}

impl<'a> FormulaParser<'a> {
    fn new(input: &'a str) -> FormulaResult<Self> {
        let mut parser = Self {
            input,
            pos: 0,
            current_token: Token::Eof,
            token_start: 0,
            token_end: 0,
        };
        parser.advance_token()?;
        Ok(parser)
    }

    // === Token scanning ===

    fn advance_token(&mut self) -> FormulaResult<()> {
        self.skip_whitespace();
        self.token_start = self.pos;
        self.current_token = self.scan_token()?;
        self.token_end = self.pos;
        Ok(())
    }

    fn scan_token(&mut self) -> FormulaResult<Token> {
        let c = match self.peek_char() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        let single = match c {
            '+' => Some(Token::Operator(Operator::Add)),
            '-' => Some(Token::Operator(Operator::Subtract)),
            '*' => Some(Token::Operator(Operator::Multiply)),
            '/' => Some(Token::Operator(Operator::Divide)),
            '^' => Some(Token::Operator(Operator::Power)),
            '&' => Some(Token::Operator(Operator::Concat)),
            '=' => Some(Token::Operator(Operator::Equal)),
            ':' => Some(Token::Colon),
            ',' => Some(Token::Comma),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return Ok(token);
        }

        // Multi-character operators are matched before their prefixes
        if c == '<' {
            self.advance();
            return Ok(Token::Operator(match self.peek_char() {
                Some('=') => {
                    self.advance();
                    Operator::LessEqual
                }
                Some('>') => {
                    self.advance();
                    Operator::NotEqual
                }
                _ => Operator::Less,
            }));
        }
        if c == '>' {
            self.advance();
            if self.peek_char() == Some('=') {
                self.advance();
                return Ok(Token::Operator(Operator::GreaterEqual));
            }
            return Ok(Token::Operator(Operator::Greater));
        }

        if c == '"' {
            return self.scan_text();
        }
        if c == '\'' {
            return self.scan_quoted_sheet();
        }
        if c.is_ascii_digit() {
            return Ok(self.scan_number());
        }
        if c.is_ascii_alphabetic() || c == '_' || c == '$' {
            return self.scan_identifier_or_ref();
        }

        Err(FormulaError::parse(
            self.pos,
            format!("unexpected character '{}'", c),
        ))
    }

    fn scan_text(&mut self) -> FormulaResult<Token> {
        let start = self.pos;
        self.advance(); // opening quote

        let mut s = String::new();
        loop {
            match self.peek_char() {
                Some('"') if self.peek_char_at(1) == Some('"') => {
                    s.push('"');
                    self.advance();
                    self.advance();
                }
                Some('"') => {
                    self.advance();
                    return Ok(Token::Text(s));
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
                None => return Err(FormulaError::parse(start, "unterminated text")),
            }
        }
    }

    fn scan_quoted_sheet(&mut self) -> FormulaResult<Token> {
        let start = self.pos;
        self.advance(); // opening quote

        let mut name = String::new();
        loop {
            match self.peek_char() {
                Some('\'') if self.peek_char_at(1) == Some('\'') => {
                    name.push('\'');
                    self.advance();
                    self.advance();
                }
                Some('\'') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    name.push(c);
                    self.advance();
                }
                None => return Err(FormulaError::parse(start, "unterminated sheet name")),
            }
        }

        if name.is_empty() {
            return Err(FormulaError::parse(start, "empty sheet name"));
        }
        if self.peek_char() != Some('!') {
            return Err(FormulaError::parse(
                self.pos,
                format!("expected '!' after sheet name '{}'", name),
            ));
        }
        self.advance();
        Ok(Token::Sheet(name))
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;

        self.skip_digits();
        if self.peek_char() == Some('.') {
            self.advance();
            self.skip_digits();
        }

        // Exponent, only when digits actually follow
        if matches!(self.peek_char(), Some('e' | 'E')) {
            let signed = matches!(self.peek_char_at(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_char_at(digit_at).map_or(false, |c| c.is_ascii_digit()) {
                for _ in 0..digit_at {
                    self.advance();
                }
                self.skip_digits();
            }
        }

        let digits = self.input[start..self.pos].to_string();
        let percent = self.peek_char() == Some('%');
        if percent {
            self.advance();
        }
        Token::Number { digits, percent }
    }

    fn scan_identifier_or_ref(&mut self) -> FormulaResult<Token> {
        let start = self.pos;
        while self.peek_char().map_or(false, |c| {
            c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.'
        }) {
            self.advance();
        }
        let text = &self.input[start..self.pos];

        if self.peek_char() == Some('!') {
            if !regex_is_match!(r"^[A-Za-z_][A-Za-z0-9_.]*$", text) {
                return Err(FormulaError::parse(
                    start,
                    format!("invalid sheet name '{}'", text),
                ));
            }
            self.advance();
            return Ok(Token::Sheet(text.to_string()));
        }

        if Self::is_cell_reference(text) {
            return Ok(Token::Cell(text.to_string()));
        }
        if text.contains('$') {
            return Err(FormulaError::parse(
                start,
                format!("invalid cell reference '{}'", text),
            ));
        }
        Ok(Token::Identifier(text.to_string()))
    }

    fn is_cell_reference(text: &str) -> bool {
        regex_is_match!(r"^\$?[A-Z]+\$?[0-9]+$", text)
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_digits(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn current_token(&self) -> &Token {
        &self.current_token
    }

    fn consume(&mut self) -> FormulaResult<Token> {
        let token = std::mem::replace(&mut self.current_token, Token::Eof);
        self.advance_token()?;
        Ok(token)
    }

    fn expect(&mut self, expected: &Token) -> FormulaResult<()> {
        if self.current_token() == expected {
            self.consume()?;
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected {}", expected.describe())))
        }
    }

    fn unexpected(&self, context: &str) -> FormulaError {
        FormulaError::parse(
            self.token_start,
            format!("{}, found {}", context, self.current_token().describe()),
        )
    }

    // === Grammar ===

    /// `expression := term operator expression | term`
    fn parse_expression(&mut self) -> FormulaResult<Expression> {
        let term = self.parse_term()?;
        if let Token::Operator(op) = *self.current_token() {
            self.consume()?;
            let rest = self.parse_expression()?;
            return Ok(Expression::chain(term, op, rest));
        }
        Ok(Expression::single(term))
    }

    fn parse_term(&mut self) -> FormulaResult<Term> {
        match self.current_token().clone() {
            Token::Number { digits, percent } => {
                self.consume()?;
                Ok(Term::Constant(Constant::Number(NumberLiteral { digits, percent })))
            }

            Token::Text(s) => {
                self.consume()?;
                Ok(Term::Constant(Constant::Text(s)))
            }

            Token::Operator(op @ (Operator::Subtract | Operator::Add)) => {
                let sign_end = self.token_end;
                self.consume()?;

                // A sign written against the digits belongs to the literal
                if let Token::Number { digits, percent } = self.current_token().clone() {
                    if self.token_start == sign_end {
                        self.consume()?;
                        return Ok(Term::Constant(Constant::Number(NumberLiteral {
                            digits: format!("{}{}", op.symbol(), digits),
                            percent,
                        })));
                    }
                }

                let operand = self.parse_term()?;
                Ok(match op {
                    Operator::Subtract => Term::Negate(Box::new(operand)),
                    _ => operand,
                })
            }

            Token::LeftParen => Ok(Term::Group(self.parse_group()?)),

            Token::Sheet(sheet) => {
                self.consume()?;
                match self.current_token().clone() {
                    Token::Cell(cell) => {
                        let pos = self.token_start;
                        self.consume()?;
                        self.parse_range(Some(sheet), &cell, pos)
                    }
                    _ => Err(self.unexpected(&format!(
                        "expected a cell reference after '{}!'",
                        sheet
                    ))),
                }
            }

            Token::Cell(cell) => {
                let pos = self.token_start;
                self.consume()?;
                // LOG10(...) is a function, not cell LOG10
                if self.current_token() == &Token::LeftParen {
                    return self.parse_function_call(cell);
                }
                self.parse_range(None, &cell, pos)
            }

            Token::Identifier(name) => {
                self.consume()?;
                if self.current_token() == &Token::LeftParen {
                    return self.parse_function_call(name);
                }
                if name == "None" {
                    return Ok(Term::Null);
                }
                Ok(Term::Name(name))
            }

            _ => Err(self.unexpected("expected a value")),
        }
    }

    /// `group := '(' [expression {',' expression}] [','] ')'`
    fn parse_group(&mut self) -> FormulaResult<Vec<Expression>> {
        self.expect(&Token::LeftParen)?;

        let mut items = Vec::new();
        loop {
            if self.current_token() == &Token::RightParen {
                break;
            }
            items.push(self.parse_expression()?);
            match self.current_token() {
                Token::Comma => {
                    self.consume()?;
                }
                Token::RightParen => break,
                _ => return Err(self.unexpected("expected ',' or ')'")),
            }
        }

        self.expect(&Token::RightParen)?;
        Ok(items)
    }

    fn parse_function_call(&mut self, name: String) -> FormulaResult<Term> {
        let args = self.parse_group()?;
        Ok(Term::FunctionCall { name, args })
    }

    /// `range := [sheet] cell [':' cell]`, sheet already consumed
    fn parse_range(
        &mut self,
        sheet: Option<String>,
        first: &str,
        first_pos: usize,
    ) -> FormulaResult<Term> {
        let start = self.cell_address(first, first_pos)?;

        let end = if self.current_token() == &Token::Colon {
            self.consume()?;
            match self.current_token().clone() {
                Token::Cell(cell) => {
                    let pos = self.token_start;
                    self.consume()?;
                    self.cell_address(&cell, pos)?
                }
                _ => return Err(self.unexpected("expected a cell after ':'")),
            }
        } else {
            start
        };

        Ok(Term::Range(Reference::new(sheet, CellRange::new(start, end))))
    }

    fn cell_address(&self, text: &str, position: usize) -> FormulaResult<CellAddress> {
        CellAddress::parse(text).map_err(|e| {
            FormulaError::parse(position, format!("invalid cell reference '{}': {}", text, e))
        })
    }
}
