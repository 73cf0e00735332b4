use thiserror::Error;

use crate::{ast::Token, value::Value};

/// Error raised while splitting an expression into tokens.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Lexer Error: {reason} at column {column} in expression [{input}]")]
pub struct LexError {
    pub reason: String,
    /// 1-based column of the offending character
    pub column: usize,
    pub input: String,
}

pub struct Lexer {
    source: String,
    input: Vec<char>,
    position: usize,
}

/// Split `input` into tokens.
///
/// # Examples
///
/// ```
/// use ngexpr::lexer::lex;
///
/// let tokens = lex("a.b[1]").unwrap();
/// let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
/// assert_eq!(texts, ["a", ".", "b", "[", "1", "]"]);
/// ```
pub fn lex(input: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(input).tokenize()
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_identifier_part(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            source: input.to_string(),
            input: input.chars().collect(),
            position: 0,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn text_from(&self, start: usize) -> String {
        self.input[start..self.position].iter().collect()
    }

    fn error(&self, reason: impl Into<String>, offset: usize) -> LexError {
        LexError {
            reason: reason.into(),
            column: offset + 1,
            input: self.source.clone(),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> Token {
        let start = self.position;
        while self.current_char().is_some_and(is_identifier_part) {
            self.advance();
        }
        Token::identifier(start, self.text_from(start))
    }

    fn read_string(&mut self, quote: char) -> Result<Token, LexError> {
        let start = self.position;
        let mut value = String::new();
        self.advance(); // Consume opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(Token::literal(start, self.text_from(start), Value::String(value)));
                }
                '\\' => {
                    let escape = self.position;
                    self.advance(); // Consume backslash
                    match self.current_char() {
                        Some('u') => {
                            let hex: String = self.input[self.position + 1..]
                                .iter()
                                .take(4)
                                .collect();
                            let decoded = (hex.len() == 4 && hex.chars().all(|c| c.is_ascii_hexdigit()))
                                .then(|| u32::from_str_radix(&hex, 16).ok())
                                .flatten()
                                .and_then(char::from_u32);
                            match decoded {
                                Some(c) => value.push(c),
                                None => {
                                    return Err(self.error(
                                        format!("Invalid unicode escape [\\u{}]", hex),
                                        escape,
                                    ));
                                }
                            }
                            self.position += 4;
                        }
                        Some('n') => value.push('\n'),
                        Some('f') => value.push('\u{000C}'),
                        Some('r') => value.push('\r'),
                        Some('t') => value.push('\t'),
                        Some('v') => value.push('\u{000B}'),
                        Some(other) => value.push(other),
                        None => break,
                    }
                    self.advance();
                }
                _ => {
                    value.push(ch);
                    self.advance();
                }
            }
        }

        Err(self.error("Unterminated quote", start))
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        let mut is_float = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                self.advance();
            } else if ch == '.'
                && !is_float
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                self.advance();
            } else if ch == 'e' || ch == 'E' {
                let marker = self.position;
                is_float = true;
                self.advance();
                if matches!(self.current_char(), Some('+' | '-')) {
                    self.advance();
                }
                if !self.current_char().is_some_and(|c| c.is_ascii_digit()) {
                    return Err(self.error("Invalid exponent", marker));
                }
                while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
                break;
            } else {
                break;
            }
        }

        let text = self.text_from(start);
        let value = if is_float {
            None
        } else {
            text.parse::<i64>().ok().map(Value::Integer)
        };
        let value = match value {
            Some(v) => v,
            None => text
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| self.error(format!("Invalid number {}", text), start))?,
        };

        Ok(Token::literal(start, text, value))
    }

    /// Consume `len` characters as one operator token.
    fn operator(&mut self, len: usize) -> Token {
        let start = self.position;
        self.position += len;
        Token::operator(start, self.text_from(start))
    }

    /// Produce the next token, or `None` at the end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_whitespace();

        let Some(ch) = self.current_char() else {
            return Ok(None);
        };
        let next = self.peek_char(1);

        let token = match ch {
            c if is_identifier_start(c) => self.read_identifier(),
            c if c.is_ascii_digit() => self.read_number()?,
            '.' if next.is_some_and(|c| c.is_ascii_digit()) => self.read_number()?,
            '"' | '\'' => self.read_string(ch)?,
            '(' | ')' | '[' | ']' | '{' | '}' | '.' | ',' | ':' | ';' | '?' => self.operator(1),
            '+' | '-' | '*' | '/' | '%' => self.operator(1),
            '~' if next == Some('/') => self.operator(2),
            '=' | '!' | '<' | '>' if next == Some('=') => self.operator(2),
            '=' | '!' | '<' | '>' => self.operator(1),
            '&' if next == Some('&') => self.operator(2),
            '|' if next == Some('|') => self.operator(2),
            '|' => self.operator(1),
            other => {
                return Err(self.error(
                    format!("Unexpected next character [{}]", other),
                    self.position,
                ));
            }
        };

        Ok(Some(token))
    }
}

#[test]
fn test_reserved_words_are_identifiers() {
    let tokens = lex("if this null undefined").unwrap();
    let keys: Vec<_> = tokens.iter().map(|t| t.key.as_deref()).collect();
    assert_eq!(keys, [Some("if"), Some("this"), Some("null"), Some("undefined")]);
}

#[test]
fn test_filter_pipe() {
    let tokens = lex("a | f:1 || b").unwrap();
    let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, ["a", "|", "f", ":", "1", "||", "b"]);
    assert_eq!(tokens[4].value, Some(Value::Integer(1)));
}
