use std::{cell::RefCell, collections::HashMap, fmt, rc::Rc};

use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    ast::{BinOp, Expr, Token},
    lexer::{LexError, lex},
    value::Value,
};

/// Where a parse error was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// 1-based column of the offending token
    Column(usize),
    /// Input ran out
    End,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Column(column) => write!(f, "at column {column} in"),
            Location::End => f.write_str("at the end of"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("Parser Error: {reason} {location} expression [{input}]")]
    Syntax {
        reason: String,
        location: Location,
        input: String,
    },
}

impl ParseError {
    pub fn reason(&self) -> &str {
        match self {
            ParseError::Lex(err) => &err.reason,
            ParseError::Syntax { reason, .. } => reason,
        }
    }
}

/// Parser with a per-instance cache keyed by the exact input text.
///
/// Parsing the same text twice returns the same tree instance.
///
/// # Examples
///
/// ```
/// use std::rc::Rc;
/// use ngexpr::Parser;
///
/// let parser = Parser::new();
/// let first = parser.parse("items[0].name").unwrap();
/// let second = parser.parse("items[0].name").unwrap();
/// assert!(Rc::ptr_eq(&first, &second));
/// ```
#[derive(Debug, Default)]
pub struct Parser {
    cache: RefCell<HashMap<String, Rc<Expr>>>,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(&self, input: &str) -> Result<Rc<Expr>, ParseError> {
        if let Some(expr) = self.cache.borrow().get(input) {
            trace!(input, "parse cache hit");
            return Ok(Rc::clone(expr));
        }

        debug!(input, "parsing expression");
        let expr = Rc::new(ParserImpl::new(input)?.parse_chain()?);
        let mut cache = self.cache.borrow_mut();
        Ok(Rc::clone(cache.entry(input.to_string()).or_insert(expr)))
    }

    /// Number of distinct inputs parsed so far.
    pub fn cached(&self) -> usize {
        self.cache.borrow().len()
    }
}

struct ParserImpl<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    index: usize,
}

impl<'a> ParserImpl<'a> {
    fn new(input: &'a str) -> Result<Self, LexError> {
        Ok(ParserImpl {
            input,
            tokens: lex(input)?,
            index: 0,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn peek_is(&self, text: &str) -> bool {
        self.peek().is_some_and(|t| t.is(text))
    }

    fn advance(&mut self) {
        self.index += 1;
    }

    /// Character offset of the current token, or the input length at the end.
    fn peek_index(&self) -> usize {
        self.peek()
            .map_or_else(|| self.input.chars().count(), |t| t.index)
    }

    /// Source text between two character offsets, without surrounding whitespace.
    fn slice(&self, start: usize, end: usize) -> String {
        let text: String = self
            .input
            .chars()
            .skip(start)
            .take(end.saturating_sub(start))
            .collect();
        text.trim().to_string()
    }

    fn error(&self, reason: impl Into<String>) -> ParseError {
        let location = match self.peek() {
            Some(token) => Location::Column(token.index + 1),
            None => Location::End,
        };
        ParseError::Syntax {
            reason: reason.into(),
            location,
            input: self.input.to_string(),
        }
    }

    fn optional(&mut self, text: &str) -> bool {
        if self.peek_is(text) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, text: &str) -> Result<(), ParseError> {
        if self.optional(text) {
            Ok(())
        } else {
            Err(self.error(format!("Missing expected {}", text)))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match self.peek().and_then(|t| t.key.clone()) {
            Some(name) => {
                self.advance();
                Ok(name)
            }
            None => Err(self.unexpected()),
        }
    }

    fn unexpected(&self) -> ParseError {
        match self.peek() {
            Some(token) => self.error(format!("Unexpected token {}", token.text)),
            None => self.error("Unexpected end of expression"),
        }
    }

    fn parse_chain(&mut self) -> Result<Expr, ParseError> {
        let mut is_chain = false;
        let mut expressions = Vec::new();

        while self.optional(";") {
            is_chain = true;
        }

        while let Some(token) = self.peek() {
            if token.is(")") || token.is("}") || token.is("]") {
                return Err(self.error(format!("Unconsumed token {}", token.text)));
            }

            let expr = self.parse_filter()?;

            while self.optional(";") {
                is_chain = true;
            }

            if is_chain && matches!(expr, Expr::Filter { .. }) {
                return Err(self.error("cannot have a filter in a chain"));
            }
            expressions.push(expr);
        }

        if expressions.len() == 1 {
            Ok(expressions.remove(0))
        } else {
            Ok(Expr::Chain(expressions))
        }
    }

    fn parse_filter(&mut self) -> Result<Expr, ParseError> {
        let mut result = self.parse_expression()?;

        while self.optional("|") {
            let name = self.expect_identifier()?;
            let mut args = Vec::new();
            while self.optional(":") {
                args.push(self.parse_expression()?);
            }
            result = Expr::Filter {
                expr: Box::new(result),
                name,
                args,
            };
        }

        Ok(result)
    }

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let start = self.peek_index();
        let result = self.parse_conditional()?;

        if !self.peek_is("=") {
            return Ok(result);
        }
        if !result.is_assignable() {
            let expression = self.slice(start, self.peek_index());
            return Err(self.error(format!("Expression {} is not assignable", expression)));
        }

        self.expect("=")?;
        Ok(Expr::Assign {
            target: Box::new(result),
            value: Box::new(self.parse_expression()?),
        })
    }

    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        let start = self.peek_index();
        let result = self.parse_logical_or()?;

        if !self.optional("?") {
            return Ok(result);
        }

        let yes = self.parse_expression()?;
        if !self.optional(":") {
            let expression = self.slice(start, self.peek_index());
            return Err(self.error(format!(
                "Conditional expression {} requires all 3 expressions",
                expression
            )));
        }
        let no = self.parse_expression()?;

        Ok(Expr::Conditional {
            condition: Box::new(result),
            yes: Box::new(yes),
            no: Box::new(no),
        })
    }

    /// Parse a left-associative run of the operators in `ops` over operands from `next`.
    fn parse_binary(
        &mut self,
        ops: &[BinOp],
        next: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let mut result = next(self)?;

        'operands: loop {
            for op in ops {
                if self.optional(op.symbol()) {
                    result = Expr::Binary {
                        op: *op,
                        left: Box::new(result),
                        right: Box::new(next(self)?),
                    };
                    continue 'operands;
                }
            }
            return Ok(result);
        }
    }

    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(&[BinOp::Or], Self::parse_logical_and)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(&[BinOp::And], Self::parse_equality)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(&[BinOp::Equal, BinOp::NotEqual], Self::parse_relational)
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(
            &[
                BinOp::LessThan,
                BinOp::GreaterThan,
                BinOp::LessEqual,
                BinOp::GreaterEqual,
            ],
            Self::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(&[BinOp::Add, BinOp::Subtract], Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(
            &[
                BinOp::Multiply,
                BinOp::Modulo,
                BinOp::Divide,
                BinOp::FloorDivide,
            ],
            Self::parse_prefix,
        )
    }

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        if self.optional("+") {
            self.parse_prefix()
        } else if self.optional("-") {
            Ok(Expr::Binary {
                op: BinOp::Subtract,
                left: Box::new(Expr::LiteralPrimitive(Value::Integer(0))),
                right: Box::new(self.parse_prefix()?),
            })
        } else if self.optional("!") {
            Ok(Expr::PrefixNot {
                expr: Box::new(self.parse_prefix()?),
            })
        } else {
            self.parse_access_or_call_member()
        }
    }

    fn parse_access_or_call_member(&mut self) -> Result<Expr, ParseError> {
        let mut result = self.parse_primary()?;

        loop {
            if self.optional(".") {
                let name = self.expect_identifier()?;
                if self.optional("(") {
                    let args = self.parse_expression_list(")")?;
                    self.expect(")")?;
                    result = Expr::CallMember {
                        object: Box::new(result),
                        name,
                        args,
                    };
                } else {
                    result = Expr::AccessMember {
                        object: Box::new(result),
                        name,
                    };
                }
            } else if self.optional("[") {
                let key = self.parse_expression()?;
                self.expect("]")?;
                result = Expr::AccessKeyed {
                    object: Box::new(result),
                    key: Box::new(key),
                };
            } else if self.optional("(") {
                let args = self.parse_expression_list(")")?;
                self.expect(")")?;
                result = Expr::CallFunction {
                    function: Box::new(result),
                    args,
                };
            } else {
                return Ok(result);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        if self.optional("(") {
            let result = self.parse_expression()?;
            self.expect(")")?;
            return Ok(result);
        }
        if self.optional("null") || self.optional("undefined") {
            return Ok(Expr::LiteralPrimitive(Value::Null));
        }
        if self.optional("true") {
            return Ok(Expr::LiteralPrimitive(Value::Boolean(true)));
        }
        if self.optional("false") {
            return Ok(Expr::LiteralPrimitive(Value::Boolean(false)));
        }
        if self.optional("[") {
            let elements = self.parse_expression_list("]")?;
            self.expect("]")?;
            return Ok(Expr::LiteralArray(elements));
        }
        if self.peek_is("{") {
            return self.parse_object();
        }

        let Some(token) = self.peek() else {
            return Err(self.unexpected());
        };
        if token.is_identifier() {
            return self.parse_access_or_call_scope();
        }
        match token.value.clone() {
            Some(Value::String(s)) => {
                self.advance();
                Ok(Expr::LiteralString(s))
            }
            Some(value) => {
                self.advance();
                Ok(Expr::LiteralPrimitive(value))
            }
            None => Err(self.unexpected()),
        }
    }

    fn parse_access_or_call_scope(&mut self) -> Result<Expr, ParseError> {
        let name = self.expect_identifier()?;

        if !self.optional("(") {
            return Ok(Expr::AccessScope { name });
        }

        let args = self.parse_expression_list(")")?;
        self.expect(")")?;
        Ok(Expr::CallScope { name, args })
    }

    fn parse_object(&mut self) -> Result<Expr, ParseError> {
        let mut keys = Vec::new();
        let mut values = Vec::new();

        self.expect("{")?;

        if !self.peek_is("}") {
            loop {
                let key = match self.peek() {
                    Some(Token {
                        value: Some(Value::String(s)),
                        ..
                    }) => s.clone(),
                    Some(token) if token.is_identifier() || token.is_number() => token.text.clone(),
                    _ => return Err(self.unexpected()),
                };
                self.advance();
                self.expect(":")?;
                keys.push(key);
                values.push(self.parse_expression()?);

                if !self.optional(",") {
                    break;
                }
            }
        }

        self.expect("}")?;
        Ok(Expr::LiteralObject { keys, values })
    }

    fn parse_expression_list(&mut self, terminator: &str) -> Result<Vec<Expr>, ParseError> {
        let mut result = Vec::new();

        if !self.peek_is(terminator) {
            loop {
                result.push(self.parse_expression()?);
                if !self.optional(",") {
                    break;
                }
            }
        }

        Ok(result)
    }
}
