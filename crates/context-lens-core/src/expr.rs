//! Arithmetic evaluator behind the `code_interpreter` tool.
//!
//! The model is told the tool runs "a single-line Python expression", so
//! the grammar follows Python's arithmetic precedence:
//!
//! ```text
//! expr    := term (("+" | "-") term)*
//! term    := unary (("*" | "/" | "//" | "%") unary)*
//! unary   := ("+" | "-") unary | power
//! power   := primary ("**" unary)?
//! primary := NUMBER | NAME | NAME "(" args ")" | "(" expr ")"
//! ```
//!
//! Names: `pi`, `e`. Functions: `abs`, `round`, `min`, `max`, `sqrt`.
//! Thousands separators are not accepted (`2,340` is a syntax error).

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Why an expression could not be evaluated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("empty expression")]
    Empty,

    #[error("invalid syntax: unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),

    #[error("invalid syntax: unexpected {0}")]
    UnexpectedToken(String),

    #[error("invalid syntax: unexpected end of expression")]
    UnexpectedEnd,

    #[error("invalid number literal '{0}'")]
    BadNumber(String),

    #[error("name '{0}' is not defined")]
    UnknownName(String),

    #[error("{name}() takes {expected} argument(s) ({found} given)")]
    Arity {
        name: String,
        expected: &'static str,
        found: usize,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("math domain error")]
    Domain,

    #[error("result is not a finite number")]
    NonFinite,

    #[error("expression is too long (more than {0} tokens)")]
    TooLong(usize),

    #[error("expression is nested too deeply (more than {0} levels)")]
    TooDeep(usize),
}

/// Upper bound on tokens, which also bounds the depth of operator chains.
const MAX_TOKENS: usize = 1024;
/// Upper bound on nested parentheses and unary operators.
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Name(String),
    Plus,
    Minus,
    Star,
    Slash,
    SlashSlash,
    Percent,
    StarStar,
    LParen,
    RParen,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Num(n) => write!(f, "number {}", n),
            Token::Name(n) => write!(f, "name '{}'", n),
            Token::Plus => f.write_str("'+'"),
            Token::Minus => f.write_str("'-'"),
            Token::Star => f.write_str("'*'"),
            Token::Slash => f.write_str("'/'"),
            Token::SlashSlash => f.write_str("'//'"),
            Token::Percent => f.write_str("'%'"),
            Token::StarStar => f.write_str("'**'"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::Comma => f.write_str("','"),
        }
    }
}

fn tokenize(src: &str) -> Result<Vec<Token>, EvalError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_digit() || chars[i] == '.' || chars[i] == '_')
                {
                    i += 1;
                }
                // exponent: 1e3, 2.5E-4
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .replace('_', "")
                    .parse::<f64>()
                    .map_err(|_| EvalError::BadNumber(literal.clone()))?;
                tokens.push(Token::Num(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Name(chars[start..i].iter().collect()));
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    tokens.push(Token::StarStar);
                    i += 2;
                } else {
                    tokens.push(Token::Star);
                    i += 1;
                }
            }
            '/' => {
                if chars.get(i + 1) == Some(&'/') {
                    tokens.push(Token::SlashSlash);
                    i += 2;
                } else {
                    tokens.push(Token::Slash);
                    i += 1;
                }
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            other => return Err(EvalError::UnexpectedChar(other, i)),
        }
    }

    Ok(tokens)
}

#[derive(Debug, Clone, Copy)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone)]
enum Expr {
    Num(f64),
    Name(String),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expect(&mut self, want: Token) -> Result<(), EvalError> {
        match self.next() {
            Some(tok) if tok == want => Ok(()),
            Some(tok) => Err(EvalError::UnexpectedToken(tok.to_string())),
            None => Err(EvalError::UnexpectedEnd),
        }
    }

    fn expr(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::SlashSlash) => BinOp::FloorDiv,
                Some(Token::Percent) => BinOp::Mod,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    /// Every nesting path (parentheses, call arguments, unary operators,
    /// exponents) passes through here, so the depth guard lives here.
    fn unary(&mut self) -> Result<Expr, EvalError> {
        if self.depth >= MAX_DEPTH {
            return Err(EvalError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let result = self.unary_inner();
        self.depth -= 1;
        result
    }

    fn unary_inner(&mut self) -> Result<Expr, EvalError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr, EvalError> {
        let base = self.primary()?;
        if matches!(self.peek(), Some(Token::StarStar)) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        match self.next() {
            Some(Token::Num(n)) => Ok(Expr::Num(n)),
            Some(Token::Name(name)) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    self.pos += 1;
                    let mut args = Vec::new();
                    if !matches!(self.peek(), Some(Token::RParen)) {
                        loop {
                            args.push(self.expr()?);
                            if matches!(self.peek(), Some(Token::Comma)) {
                                self.pos += 1;
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect(Token::RParen)?;
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Name(name))
                }
            }
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(tok) => Err(EvalError::UnexpectedToken(tok.to_string())),
            None => Err(EvalError::UnexpectedEnd),
        }
    }
}

fn parse(src: &str) -> Result<Expr, EvalError> {
    let tokens = tokenize(src)?;
    if tokens.is_empty() {
        return Err(EvalError::Empty);
    }
    if tokens.len() > MAX_TOKENS {
        return Err(EvalError::TooLong(MAX_TOKENS));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;
    if let Some(tok) = parser.peek() {
        return Err(EvalError::UnexpectedToken(tok.to_string()));
    }
    Ok(expr)
}

fn arity(name: &str, args: &[f64], expected: &'static str, ok: bool) -> Result<(), EvalError> {
    if ok {
        Ok(())
    } else {
        Err(EvalError::Arity {
            name: name.to_string(),
            expected,
            found: args.len(),
        })
    }
}

fn call(name: &str, args: &[f64]) -> Result<f64, EvalError> {
    match name {
        "abs" => {
            arity(name, args, "1", args.len() == 1)?;
            Ok(args[0].abs())
        }
        "sqrt" => {
            arity(name, args, "1", args.len() == 1)?;
            if args[0] < 0.0 {
                return Err(EvalError::Domain);
            }
            Ok(args[0].sqrt())
        }
        "round" => {
            arity(name, args, "1 or 2", matches!(args.len(), 1 | 2))?;
            let digits = args.get(1).copied().unwrap_or(0.0).trunc();
            let scale = 10f64.powf(digits);
            Ok((args[0] * scale).round_ties_even() / scale)
        }
        "min" => {
            arity(name, args, "at least 1", !args.is_empty())?;
            Ok(args.iter().copied().fold(f64::INFINITY, f64::min))
        }
        "max" => {
            arity(name, args, "at least 1", !args.is_empty())?;
            Ok(args.iter().copied().fold(f64::NEG_INFINITY, f64::max))
        }
        other => Err(EvalError::UnknownName(other.to_string())),
    }
}

fn eval(expr: &Expr) -> Result<f64, EvalError> {
    match expr {
        Expr::Num(n) => Ok(*n),
        Expr::Name(name) => match name.as_str() {
            "pi" => Ok(std::f64::consts::PI),
            "e" => Ok(std::f64::consts::E),
            other => Err(EvalError::UnknownName(other.to_string())),
        },
        Expr::Neg(inner) => Ok(-eval(inner)?),
        Expr::Call(name, args) => {
            let values = args.iter().map(eval).collect::<Result<Vec<_>, _>>()?;
            call(name, &values)
        }
        Expr::Binary(op, lhs, rhs) => {
            let a = eval(lhs)?;
            let b = eval(rhs)?;
            match op {
                BinOp::Add => Ok(a + b),
                BinOp::Sub => Ok(a - b),
                BinOp::Mul => Ok(a * b),
                BinOp::Div if b == 0.0 => Err(EvalError::DivisionByZero),
                BinOp::Div => Ok(a / b),
                BinOp::FloorDiv if b == 0.0 => Err(EvalError::DivisionByZero),
                BinOp::FloorDiv => Ok((a / b).floor()),
                BinOp::Mod if b == 0.0 => Err(EvalError::DivisionByZero),
                // sign follows the divisor
                BinOp::Mod => Ok(a - b * (a / b).floor()),
                BinOp::Pow if a == 0.0 && b < 0.0 => Err(EvalError::DivisionByZero),
                BinOp::Pow => Ok(a.powf(b)),
            }
        }
    }
}

/// Evaluate a single-line arithmetic expression.
pub fn evaluate(src: &str) -> Result<f64, EvalError> {
    let value = eval(&parse(src)?)?;
    if !value.is_finite() {
        return Err(EvalError::NonFinite);
    }
    Ok(value)
}

/// Largest magnitude below which every integer is exactly representable.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Evaluate and encode as JSON: integral results become JSON integers.
///
/// ```rust
/// use context_lens_core::expr::evaluate_json;
/// use serde_json::json;
///
/// assert_eq!(evaluate_json("2+2").unwrap(), json!(4));
/// assert_eq!(evaluate_json("7 / 2").unwrap(), json!(3.5));
/// ```
pub fn evaluate_json(src: &str) -> Result<Value, EvalError> {
    let value = evaluate(src)?;
    if value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
        Ok(Value::from(value as i64))
    } else {
        Ok(Value::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn approx(src: &str, want: f64) {
        let got = evaluate(src).unwrap();
        assert!((got - want).abs() < 1e-9, "{src} = {got}, want {want}");
    }

    #[test]
    fn test_precedence() {
        approx("2 + 3 * 4", 14.0);
        approx("(2 + 3) * 4", 20.0);
        approx("10 - 4 - 3", 3.0);
        approx("2 * 3 ** 2", 18.0);
    }

    #[test]
    fn test_power_rules() {
        approx("2 ** 3 ** 2", 512.0);
        approx("-2 ** 2", -4.0);
        approx("2 ** -1", 0.5);
    }

    #[test]
    fn test_division_family() {
        approx("150 / 3", 50.0);
        approx("7 // 2", 3.0);
        approx("-7 // 2", -4.0);
        approx("-7 % 3", 2.0);
        approx("7 % -3", -2.0);
    }

    #[test]
    fn test_names_and_functions() {
        approx("3.14 * (5**2)", 78.5);
        approx("pi * 2", std::f64::consts::PI * 2.0);
        approx("sqrt(16) + abs(-2)", 6.0);
        approx("max(1, 9, 4) - min(3, 2)", 7.0);
        approx("round(2.5)", 2.0);
        approx("round(3.14159, 2)", 3.14);
        approx("1e3 + 1_000", 2000.0);
    }

    #[test]
    fn test_integral_results_are_json_integers() {
        assert_eq!(evaluate_json("2+2").unwrap(), json!(4));
        assert_eq!(evaluate_json("150 / 3").unwrap(), json!(50));
        assert_eq!(evaluate_json("0.1 * 3").unwrap(), json!(0.1 * 3.0));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(evaluate("1/0"), Err(EvalError::DivisionByZero));
        assert_eq!(evaluate("5 % 0"), Err(EvalError::DivisionByZero));
        assert_eq!(evaluate("0 ** -1"), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(
            evaluate("1/0 syntax error"),
            Err(EvalError::UnexpectedToken(_))
        ));
        assert_eq!(evaluate(""), Err(EvalError::Empty));
        assert_eq!(evaluate("(1 + 2"), Err(EvalError::UnexpectedEnd));
        assert!(matches!(evaluate("2 $ 3"), Err(EvalError::UnexpectedChar('$', 2))));
        assert!(matches!(evaluate("2,340 * 0.15"), Err(EvalError::UnexpectedToken(_))));
        assert!(matches!(evaluate("1..2"), Err(EvalError::BadNumber(_))));
    }

    #[test]
    fn test_semantic_errors() {
        assert_eq!(
            evaluate("foo + 1"),
            Err(EvalError::UnknownName("foo".to_string()))
        );
        assert_eq!(
            evaluate("print(1)"),
            Err(EvalError::UnknownName("print".to_string()))
        );
        assert!(matches!(evaluate("abs(1, 2)"), Err(EvalError::Arity { .. })));
        assert_eq!(evaluate("sqrt(-1)"), Err(EvalError::Domain));
        assert_eq!(evaluate("10 ** 400"), Err(EvalError::NonFinite));
    }

    #[test]
    fn test_hostile_nesting_is_rejected() {
        assert_eq!(
            evaluate(&"-".repeat(100_000)),
            Err(EvalError::TooLong(MAX_TOKENS))
        );
        assert_eq!(
            evaluate(&format!("{}1", "(".repeat(100_000))),
            Err(EvalError::TooLong(MAX_TOKENS))
        );
        assert_eq!(
            evaluate(&format!("{}1", "1+".repeat(5_000))),
            Err(EvalError::TooLong(MAX_TOKENS))
        );

        let parens = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(evaluate(&parens), Err(EvalError::TooDeep(MAX_DEPTH)));
        assert_eq!(
            evaluate(&format!("{}1", "-".repeat(100))),
            Err(EvalError::TooDeep(MAX_DEPTH))
        );
        assert_eq!(
            evaluate(&format!("{}1", "1**".repeat(100))),
            Err(EvalError::TooDeep(MAX_DEPTH))
        );
        assert_eq!(
            evaluate(&format!("{}1{}", "abs(".repeat(100), ")".repeat(100))),
            Err(EvalError::TooDeep(MAX_DEPTH))
        );
    }

    #[test]
    fn test_reasonable_nesting_still_evaluates() {
        let parens = format!("{}7{}", "(".repeat(20), ")".repeat(20));
        assert_eq!(evaluate(&parens), Ok(7.0));
        assert_eq!(evaluate(&format!("{}5", "-".repeat(10))), Ok(5.0));
        assert_eq!(evaluate(&format!("{}1", "1+".repeat(400))), Ok(401.0));
    }

    #[test]
    fn test_error_messages_are_readable() {
        assert_eq!(EvalError::DivisionByZero.to_string(), "division by zero");
        assert_eq!(
            EvalError::UnknownName("x".into()).to_string(),
            "name 'x' is not defined"
        );
    }
}
