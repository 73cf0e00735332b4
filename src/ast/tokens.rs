use crate::value::Value;

/// A lexical token.
///
/// Tokens keep the exact source text they were read from, so the parser can
/// match operators by text and report errors by column.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Character offset of the token's first character in the source
    pub index: usize,

    /// Source text of the token, quotes included for strings
    ///
    /// # Examples
    /// ```text
    /// a     ==    'x'    1.5e3
    /// ```
    pub text: String,

    /// Identifier name, set for identifier and keyword tokens only
    ///
    /// Reserved words (`if`, `this`, `null`, ...) are identifiers here; the
    /// parser decides what they mean.
    pub key: Option<String>,

    /// Literal value, set for number and string tokens only
    ///
    /// Strings carry their unescaped contents.
    pub value: Option<Value>,
}

impl Token {
    pub fn operator(index: usize, text: impl Into<String>) -> Self {
        Token {
            index,
            text: text.into(),
            key: None,
            value: None,
        }
    }

    pub fn identifier(index: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        Token {
            index,
            key: Some(text.clone()),
            text,
            value: None,
        }
    }

    pub fn literal(index: usize, text: impl Into<String>, value: Value) -> Self {
        Token {
            index,
            text: text.into(),
            key: None,
            value: Some(value),
        }
    }

    /// Check whether this token is the operator or keyword spelled `text`
    pub fn is(&self, text: &str) -> bool {
        self.value.is_none() && self.text == text
    }

    pub fn is_identifier(&self) -> bool {
        self.key.is_some()
    }

    pub fn is_string(&self) -> bool {
        matches!(self.value, Some(Value::String(_)))
    }

    pub fn is_number(&self) -> bool {
        matches!(self.value, Some(Value::Integer(_) | Value::Float(_)))
    }
}
