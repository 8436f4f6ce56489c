//! Arithmetic formulas over row reference codes.
//!
//! Grammar:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('-' | '+') unary | primary
//! primary := NUMBER | CODE | '(' expr ')'
//! ```
//!
//! Codes may contain `-`. A run such as `GROSS-PROFIT` is one code when a row
//! defines it; otherwise it is cut back to the longest defined code before a
//! `-` (or to the text before the first `-`) and the rest lexes as
//! subtraction.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::str::FromStr;

use rust_decimal::Decimal;

use super::error::FormulaError;
use crate::fiscal::Period;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Decimal),
    Code(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

/// Binary arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

/// Parsed formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Numeric literal.
    Number(Decimal),
    /// Another row's value.
    Reference(String),
    /// Negation.
    Neg(Box<Expr>),
    /// Binary operation.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
}

impl Expr {
    /// Parses a formula; `known_codes` decides how hyphenated runs split.
    ///
    /// # Errors
    ///
    /// Returns [`FormulaError::Syntax`] for malformed input, including
    /// formulas nested or chained more than 256 levels deep.
    pub fn parse(source: &str, known_codes: &HashSet<&str>) -> Result<Self, FormulaError> {
        let tokens = tokenize(source, known_codes)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            end: source.len(),
            nesting: 0,
        };
        let (expr, _) = parser.expr()?;
        if parser.pos < parser.tokens.len() {
            return Err(FormulaError::syntax(parser.offset(), "unexpected token"));
        }
        Ok(expr)
    }

    /// Codes referenced anywhere in the formula.
    #[must_use]
    pub fn references(&self) -> BTreeSet<&str> {
        let mut codes = BTreeSet::new();
        self.collect_references(&mut codes);
        codes
    }

    fn collect_references<'a>(&'a self, codes: &mut BTreeSet<&'a str>) {
        match self {
            Self::Number(_) => {}
            Self::Reference(code) => {
                codes.insert(code);
            }
            Self::Neg(inner) => inner.collect_references(codes),
            Self::Binary { lhs, rhs, .. } => {
                lhs.collect_references(codes);
                rhs.collect_references(codes);
            }
        }
    }

    /// Evaluates the formula for one period.
    ///
    /// Division by zero yields zero.
    ///
    /// # Errors
    ///
    /// Returns [`FormulaError::UnknownReference`] if `lookup` has no value
    /// for a code and [`FormulaError::Overflow`] if a result leaves the
    /// decimal range.
    pub fn evaluate<F>(&self, lookup: &F) -> Result<Decimal, FormulaError>
    where
        F: Fn(&str) -> Option<Decimal>,
    {
        match self {
            Self::Number(value) => Ok(*value),
            Self::Reference(code) => {
                lookup(code).ok_or_else(|| FormulaError::UnknownReference(code.clone()))
            }
            Self::Neg(inner) => Ok(-inner.evaluate(lookup)?),
            Self::Binary { op, lhs, rhs } => {
                let lhs = lhs.evaluate(lookup)?;
                let rhs = rhs.evaluate(lookup)?;
                let result = match op {
                    BinaryOp::Add => lhs.checked_add(rhs),
                    BinaryOp::Sub => lhs.checked_sub(rhs),
                    BinaryOp::Mul => lhs.checked_mul(rhs),
                    BinaryOp::Div if rhs.is_zero() => Some(Decimal::ZERO),
                    BinaryOp::Div => lhs.checked_div(rhs),
                };
                result.ok_or(FormulaError::Overflow)
            }
        }
    }
}

fn is_code_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_code_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn tokenize(
    source: &str,
    known_codes: &HashSet<&str>,
) -> Result<Vec<(Token, usize)>, FormulaError> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while let Some(ch) = source[pos..].chars().next() {
        let start = pos;
        let token = match ch {
            c if c.is_whitespace() => {
                pos += c.len_utf8();
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '0'..='9' | '.' => {
                let len = source[start..]
                    .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                    .unwrap_or(source.len() - start);
                let text = &source[start..start + len];
                let value = Decimal::from_str(text).map_err(|_| {
                    FormulaError::syntax(start, format!("malformed number '{text}'"))
                })?;
                pos += len;
                tokens.push((Token::Number(value), start));
                continue;
            }
            c if is_code_start(c) => {
                let run_len = source[start..]
                    .find(|c: char| !is_code_char(c))
                    .unwrap_or(source.len() - start);
                let code = split_code(&source[start..start + run_len], known_codes);
                pos += code.len();
                tokens.push((Token::Code(code.to_string()), start));
                continue;
            }
            other => {
                return Err(FormulaError::syntax(
                    start,
                    format!("unexpected character '{other}'"),
                ));
            }
        };
        pos += ch.len_utf8();
        tokens.push((token, start));
    }

    Ok(tokens)
}

/// Picks the code at the start of an identifier run.
fn split_code<'s>(run: &'s str, known_codes: &HashSet<&str>) -> &'s str {
    if !run.contains('-') || known_codes.contains(run) {
        return run;
    }
    run.char_indices()
        .rev()
        .filter(|&(_, c)| c == '-')
        .map(|(i, _)| &run[..i])
        .find(|prefix| known_codes.contains(prefix))
        .unwrap_or_else(|| run.split('-').next().unwrap_or(run))
}

/// Deepest formula tree the parser builds; longer chains and deeper nesting
/// are syntax errors.
const MAX_DEPTH: usize = 256;

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    end: usize,
    nesting: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |(_, o)| *o)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Checks the depth of a node about to be built.
    fn node(&self, depth: usize, offset: usize) -> Result<usize, FormulaError> {
        if depth > MAX_DEPTH {
            Err(FormulaError::syntax(offset, "formula nested too deeply"))
        } else {
            Ok(depth)
        }
    }

    fn binary(
        &self,
        op: BinaryOp,
        (lhs, lhs_depth): (Expr, usize),
        (rhs, rhs_depth): (Expr, usize),
        offset: usize,
    ) -> Result<(Expr, usize), FormulaError> {
        let depth = self.node(lhs_depth.max(rhs_depth) + 1, offset)?;
        let expr = Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        };
        Ok((expr, depth))
    }

    fn expr(&mut self) -> Result<(Expr, usize), FormulaError> {
        let mut lhs = self.term()?;
        loop {
            let offset = self.offset();
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = self.binary(op, lhs, rhs, offset)?;
        }
    }

    fn term(&mut self) -> Result<(Expr, usize), FormulaError> {
        let mut lhs = self.unary()?;
        loop {
            let offset = self.offset();
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = self.binary(op, lhs, rhs, offset)?;
        }
    }

    fn unary(&mut self) -> Result<(Expr, usize), FormulaError> {
        let offset = self.offset();
        self.nesting = self.node(self.nesting + 1, offset)?;
        let result = match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                self.unary().and_then(|(inner, depth)| {
                    let depth = self.node(depth + 1, offset)?;
                    Ok((Expr::Neg(Box::new(inner)), depth))
                })
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.primary(),
        };
        self.nesting -= 1;
        result
    }

    fn primary(&mut self) -> Result<(Expr, usize), FormulaError> {
        let offset = self.offset();
        match self.advance() {
            Some(Token::Number(value)) => Ok((Expr::Number(value), 1)),
            Some(Token::Code(code)) => Ok((Expr::Reference(code), 1)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                if self.peek() == Some(&Token::RParen) {
                    self.pos += 1;
                    Ok(inner)
                } else {
                    Err(FormulaError::syntax(self.offset(), "expected ')'"))
                }
            }
            Some(_) => Err(FormulaError::syntax(offset, "expected a value")),
            None => Err(FormulaError::syntax(offset, "unexpected end of formula")),
        }
    }
}

/// Evaluates formulas elementwise over per-period row series.
pub struct FormulaCalculator<'a> {
    row_data: &'a HashMap<String, Vec<Decimal>>,
    period_count: usize,
}

impl<'a> FormulaCalculator<'a> {
    /// Creates a calculator over the series computed so far.
    #[must_use]
    pub fn new(row_data: &'a HashMap<String, Vec<Decimal>>, periods: &[Period]) -> Self {
        Self {
            row_data,
            period_count: periods.len(),
        }
    }

    /// Evaluates `expression` once per period.
    ///
    /// A series shorter than the period list reads as zero past its end.
    ///
    /// # Errors
    ///
    /// Returns a [`FormulaError`] for syntax errors, codes without a series
    /// and arithmetic overflow.
    pub fn evaluate_formula(&self, expression: &str) -> Result<Vec<Decimal>, FormulaError> {
        let known: HashSet<&str> = self.row_data.keys().map(String::as_str).collect();
        let expr = Expr::parse(expression, &known)?;

        (0..self.period_count)
            .map(|index| {
                expr.evaluate(&|code: &str| {
                    self.row_data
                        .get(code)
                        .map(|series| series.get(index).copied().unwrap_or_default())
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn periods(count: u32) -> Vec<Period> {
        (1..=count)
            .map(|m| {
                let from = NaiveDate::from_ymd_opt(2024, m, 1).unwrap();
                Period::new(format!("p{m}"), from, from)
            })
            .collect()
    }

    fn series(entries: &[(&str, Vec<Decimal>)]) -> HashMap<String, Vec<Decimal>> {
        entries
            .iter()
            .map(|(code, values)| ((*code).to_string(), values.clone()))
            .collect()
    }

    fn codes(expression: &str, known: &[&str]) -> Vec<String> {
        let known: HashSet<&str> = known.iter().copied().collect();
        Expr::parse(expression, &known)
            .unwrap()
            .references()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_subtraction_per_period() {
        let data = series(&[
            ("INC001", vec![dec!(1000), dec!(1200), dec!(1500)]),
            ("EXP001", vec![dec!(800), dec!(900), dec!(1100)]),
        ]);
        let result = FormulaCalculator::new(&data, &periods(3))
            .evaluate_formula("INC001 - EXP001")
            .unwrap();
        assert_eq!(result, vec![dec!(200), dec!(300), dec!(400)]);
    }

    #[test]
    fn test_precedence_parentheses_and_literals() {
        let data = series(&[("A", vec![dec!(2)]), ("B", vec![dec!(3)])]);
        let calc = FormulaCalculator::new(&data, &periods(1));
        assert_eq!(calc.evaluate_formula("A + B * 2").unwrap(), vec![dec!(8)]);
        assert_eq!(calc.evaluate_formula("(A + B) * 2").unwrap(), vec![dec!(10)]);
        assert_eq!(calc.evaluate_formula("-A + 100.5").unwrap(), vec![dec!(98.5)]);
        assert_eq!(calc.evaluate_formula("B / A * 4").unwrap(), vec![dec!(6)]);
    }

    #[test]
    fn test_division_by_zero_yields_zero() {
        let data = series(&[
            ("NET", vec![dec!(50), dec!(30)]),
            ("REV", vec![dec!(200), dec!(0)]),
        ]);
        let result = FormulaCalculator::new(&data, &periods(2))
            .evaluate_formula("NET / REV * 100")
            .unwrap();
        assert_eq!(result, vec![dec!(25), dec!(0)]);
    }

    #[test]
    fn test_overflow_is_an_error() {
        let data = series(&[("BIG", vec![Decimal::MAX])]);
        let err = FormulaCalculator::new(&data, &periods(1))
            .evaluate_formula("BIG * 2")
            .unwrap_err();
        assert_eq!(err, FormulaError::Overflow);
    }

    #[test]
    fn test_unknown_reference() {
        let data = series(&[("A", vec![dec!(1)])]);
        let err = FormulaCalculator::new(&data, &periods(1))
            .evaluate_formula("A + B")
            .unwrap_err();
        assert_eq!(err, FormulaError::UnknownReference("B".to_string()));
    }

    #[test]
    fn test_short_series_reads_as_zero() {
        let data = series(&[("A", vec![dec!(5)])]);
        let result = FormulaCalculator::new(&data, &periods(3))
            .evaluate_formula("A + 1")
            .unwrap();
        assert_eq!(result, vec![dec!(6), dec!(1), dec!(1)]);
    }

    #[test]
    fn test_whole_token_references() {
        assert_eq!(codes("INC0010 + 1", &["INC001", "INC0010"]), vec!["INC0010"]);
        assert_eq!(codes("INC001*2", &["INC001"]), vec!["INC001"]);
    }

    #[test]
    fn test_deep_nesting_is_a_syntax_error() {
        let known = HashSet::new();
        let deep = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        assert!(matches!(
            Expr::parse(&deep, &known),
            Err(FormulaError::Syntax { ref message, .. }) if message == "formula nested too deeply"
        ));

        let negations = format!("{}1", "-".repeat(100_000));
        assert!(matches!(
            Expr::parse(&negations, &known),
            Err(FormulaError::Syntax { .. })
        ));

        let chain = vec!["1"; 100_000].join(" + ");
        assert!(matches!(
            Expr::parse(&chain, &known),
            Err(FormulaError::Syntax { .. })
        ));
    }

    #[test]
    fn test_moderate_nesting_still_parses() {
        let data = series(&[("A", vec![dec!(2)])]);
        let calc = FormulaCalculator::new(&data, &periods(1));
        let nested = format!("{}A{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(calc.evaluate_formula(&nested).unwrap(), vec![dec!(2)]);

        let sum = vec!["A"; 200].join(" + ");
        assert_eq!(calc.evaluate_formula(&sum).unwrap(), vec![dec!(400)]);
    }

    #[test]
    fn test_hyphenated_codes() {
        assert_eq!(codes("GROSS-PROFIT", &["GROSS-PROFIT"]), vec!["GROSS-PROFIT"]);
        assert_eq!(codes("GROSS-TAX", &["GROSS", "TAX"]), vec!["GROSS", "TAX"]);
        assert_eq!(codes("A-B-C", &["A-B", "C"]), vec!["A-B", "C"]);
        assert_eq!(codes("X-Y", &[]), vec!["X", "Y"]);
        assert_eq!(codes("INC-100", &["INC"]), vec!["INC"]);
    }

    #[test]
    fn test_hyphenated_evaluation() {
        let data = series(&[("GROSS", vec![dec!(10)]), ("TAX", vec![dec!(3)])]);
        let result = FormulaCalculator::new(&data, &periods(1))
            .evaluate_formula("GROSS-TAX")
            .unwrap();
        assert_eq!(result, vec![dec!(7)]);
    }

    #[test]
    fn test_syntax_errors() {
        let known = HashSet::new();
        for formula in ["", "A +", "(A", "A B", "A $ B", "1.2.3", "()"] {
            assert!(
                matches!(Expr::parse(formula, &known), Err(FormulaError::Syntax { .. })),
                "{formula}"
            );
        }
    }
}
