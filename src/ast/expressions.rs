use std::fmt;

use crate::{ast::BinOp, value::Value};

/// Abstract Syntax Tree node representing a parsed expression.
///
/// The set of variants is closed; the evaluator, the watch bridge and the
/// source renderer each match on it exhaustively. Trees are immutable once
/// the parser has built them.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // Access
    /// Bare identifier read from the scope
    ///
    /// # Example
    /// ```text
    /// user
    /// ```
    AccessScope { name: String },

    /// Dotted member read
    ///
    /// # Example
    /// ```text
    /// user.name
    /// ```
    AccessMember { object: Box<Expr>, name: String },

    /// Bracketed read with a computed key
    ///
    /// # Examples
    /// ```text
    /// items[0]
    /// user['first name']
    /// ```
    AccessKeyed { object: Box<Expr>, key: Box<Expr> },

    // Calls
    /// Call of a function found on the scope
    ///
    /// # Example
    /// ```text
    /// format(price, 2)
    /// ```
    CallScope { name: String, args: Vec<Expr> },

    /// Method call on an object
    ///
    /// # Example
    /// ```text
    /// items.indexOf(selected)
    /// ```
    CallMember {
        object: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },

    /// Call of any other callee, such as the result of another call
    ///
    /// # Example
    /// ```text
    /// handlers[0](event)
    /// ```
    CallFunction { function: Box<Expr>, args: Vec<Expr> },

    // Operations
    /// Binary operation (arithmetic, comparison, logical)
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Logical negation (`!`)
    PrefixNot { expr: Box<Expr> },

    /// Ternary conditional
    ///
    /// # Example
    /// ```text
    /// done ? 'yes' : 'no'
    /// ```
    Conditional {
        condition: Box<Expr>,
        yes: Box<Expr>,
        no: Box<Expr>,
    },

    /// Assignment; the target is always an access node
    ///
    /// # Example
    /// ```text
    /// user.name = 'Ada'
    /// ```
    Assign { target: Box<Expr>, value: Box<Expr> },

    // Literals
    /// `null`, booleans and numbers
    LiteralPrimitive(Value),

    /// String literal
    LiteralString(String),

    /// Array literal
    ///
    /// # Example
    /// ```text
    /// [a, 2, 'three']
    /// ```
    LiteralArray(Vec<Expr>),

    /// Object literal with keys in source order
    ///
    /// # Example
    /// ```text
    /// {name: user.name, 'total': sum}
    /// ```
    LiteralObject { keys: Vec<String>, values: Vec<Expr> },

    // Pipes and statements
    /// Filter pipe
    ///
    /// # Example
    /// ```text
    /// name | uppercase
    /// text | substring:1:offset
    /// ```
    Filter {
        expr: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },

    /// Statements separated by `;`. Never contains a `Filter` statement.
    Chain(Vec<Expr>),
}

impl Expr {
    /// Only scope, member and keyed access can be assigned to.
    pub fn is_assignable(&self) -> bool {
        matches!(
            self,
            Expr::AccessScope { .. } | Expr::AccessMember { .. } | Expr::AccessKeyed { .. }
        )
    }

    /// The filter input followed by its arguments, in call order.
    ///
    /// Empty for every other node.
    pub fn all_args(&self) -> Vec<&Expr> {
        match self {
            Expr::Filter { expr, args, .. } => {
                std::iter::once(expr.as_ref()).chain(args.iter()).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Expr::AccessScope { .. } => "AccessScope",
            Expr::AccessMember { .. } => "AccessMember",
            Expr::AccessKeyed { .. } => "AccessKeyed",
            Expr::CallScope { .. } => "CallScope",
            Expr::CallMember { .. } => "CallMember",
            Expr::CallFunction { .. } => "CallFunction",
            Expr::Binary { .. } => "Binary",
            Expr::PrefixNot { .. } => "PrefixNot",
            Expr::Conditional { .. } => "Conditional",
            Expr::Assign { .. } => "Assign",
            Expr::LiteralPrimitive(_) => "LiteralPrimitive",
            Expr::LiteralString(_) => "LiteralString",
            Expr::LiteralArray(_) => "LiteralArray",
            Expr::LiteralObject { .. } => "LiteralObject",
            Expr::Filter { .. } => "Filter",
            Expr::Chain(_) => "Chain",
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

pub(crate) fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Renders the canonical source text of the tree.
///
/// Binary operations, conditionals and assignments are parenthesized and
/// whole floats keep a fractional part, so the rendering parses back to the
/// same tree. Filters render bare, since a pipe is only valid at statement
/// level.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::AccessScope { name } => f.write_str(name),
            Expr::AccessMember { object, name } => write!(f, "{object}.{name}"),
            Expr::AccessKeyed { object, key } => write!(f, "{object}[{key}]"),
            Expr::CallScope { name, args } => {
                write!(f, "{name}(")?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Expr::CallMember { object, name, args } => {
                write!(f, "{object}.{name}(")?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Expr::CallFunction { function, args } => {
                write!(f, "{function}(")?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Expr::Binary { op, left, right } => write!(f, "({left} {op} {right})"),
            Expr::PrefixNot { expr } => write!(f, "!{expr}"),
            Expr::Conditional { condition, yes, no } => write!(f, "({condition} ? {yes} : {no})"),
            Expr::Assign { target, value } => write!(f, "({target} = {value})"),
            Expr::LiteralPrimitive(Value::Float(n)) if n.is_finite() && n.fract() == 0.0 => {
                write!(f, "{n:.1}")
            }
            // Overflowing literals lex as infinity
            Expr::LiteralPrimitive(Value::Float(n)) if *n == f64::INFINITY => f.write_str("1e999"),
            Expr::LiteralPrimitive(value) => f.write_str(&value.as_string()),
            Expr::LiteralString(s) => f.write_str(&quote(s)),
            Expr::LiteralArray(elements) => {
                f.write_str("[")?;
                write_list(f, elements)?;
                f.write_str("]")
            }
            Expr::LiteralObject { keys, values } => {
                f.write_str("{")?;
                for (i, (key, value)) in keys.iter().zip(values).enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    let plain = key.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
                        && key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$');
                    if plain {
                        write!(f, "{key}: {value}")?;
                    } else {
                        write!(f, "{}: {value}", quote(key))?;
                    }
                }
                f.write_str("}")
            }
            Expr::Filter { expr, name, args } => {
                write!(f, "{expr} | {name}")?;
                for arg in args {
                    write!(f, ":{arg}")?;
                }
                Ok(())
            }
            Expr::Chain(expressions) => {
                for (i, expr) in expressions.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{expr}")?;
                }
                Ok(())
            }
        }
    }
}
