use std::{cell::Cell, cell::RefCell, rc::Rc};

use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    ast::{BinOp, Expr},
    evaluator::EvalError,
    filters::FilterResolver,
    operations,
    parser::{ParseError, Parser},
    value::{Function, Value},
    watch::ast::{Observed, WatchAst},
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WatchError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Construct with no watch-tree equivalent
    #[error("Can not watch expression containing '{0}'.")]
    Unsupported(&'static str),

    #[error("No NgFilter: {0} found!")]
    UnknownFilter(String),
}

/// Turns expression text into watch trees.
///
/// Parsing goes through a shared [`Parser`], so the text cache is common to
/// every caller holding the same parser.
///
/// # Examples
///
/// ```
/// use std::rc::Rc;
/// use ngexpr::{Parser, Value};
/// use ngexpr::watch::WatchParser;
///
/// let bridge = WatchParser::new(Rc::new(Parser::new()));
/// let tree = bridge.parse("a + b", &(), false, None).unwrap();
///
/// let context = Value::object([("a", Value::Integer(1)), ("b", Value::Integer(2))]);
/// assert_eq!(tree.evaluate(&context).unwrap().into_value(), Value::Integer(3));
/// ```
#[derive(Debug)]
pub struct WatchParser {
    parser: Rc<Parser>,
    next_id: Cell<usize>,
}

impl WatchParser {
    pub fn new(parser: Rc<Parser>) -> Self {
        WatchParser {
            parser,
            next_id: Cell::new(0),
        }
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    /// Parse `text` and translate it into a watch tree.
    ///
    /// With a `context`, scope reads resolve against that fixed object
    /// instead of the ambient context. `as_collection` wraps the root in a
    /// collection marker.
    pub fn parse(
        &self,
        text: &str,
        filters: &dyn FilterResolver,
        as_collection: bool,
        context: Option<&Value>,
    ) -> Result<WatchAst, WatchError> {
        let context_ref = match context {
            Some(value) => {
                let id = self.next_id.get();
                self.next_id.set(id + 1);
                WatchAst::constant_with_id(value.clone(), format!("#{id}"))
            }
            None => WatchAst::ContextReference,
        };
        debug!(expression = text, as_collection, "bridging expression");

        let expr = self.parser.parse(text)?;
        let visitor = WatchVisitor {
            context_ref,
            filters,
        };
        if as_collection {
            visitor.visit_collection(&expr)
        } else {
            visitor.visit(&expr)
        }
    }
}

/// State for one translation.
struct WatchVisitor<'a> {
    context_ref: WatchAst,
    filters: &'a dyn FilterResolver,
}

impl WatchVisitor<'_> {
    fn visit(&self, expr: &Expr) -> Result<WatchAst, WatchError> {
        Ok(match expr {
            Expr::AccessScope { name } => WatchAst::field_read(self.context_ref.clone(), name),
            Expr::AccessMember { object, name } => WatchAst::field_read(self.visit(object)?, name),
            Expr::CallScope { name, args } => {
                WatchAst::method(self.context_ref.clone(), name, self.visit_all(args)?)
            }
            Expr::CallMember { object, name, args } => {
                WatchAst::method(self.visit(object)?, name, self.visit_all(args)?)
            }
            Expr::Binary { op, left, right } => {
                let op = *op;
                pure(expr, binary_fn(op), vec![self.visit(left)?, self.visit(right)?])
            }
            Expr::PrefixNot { expr: operand } => pure(
                expr,
                |args| match args {
                    [value] => Ok(operations::not(value.value())),
                    _ => Err(arity("!", 1, args)),
                },
                vec![self.visit(operand)?],
            ),
            Expr::Conditional { condition, yes, no } => pure(
                expr,
                |args| match args {
                    [c, y, n] => Ok(operations::ternary(c.value(), y.value(), n.value())),
                    _ => Err(arity("?:", 3, args)),
                },
                vec![self.visit(condition)?, self.visit(yes)?, self.visit(no)?],
            ),
            Expr::AccessKeyed { object, key } => pure(
                expr,
                |args| match args {
                    [object, key] => operations::keyed(object.value(), key.value()),
                    _ => Err(arity("[]", 2, args)),
                },
                vec![self.visit(object)?, self.visit(key)?],
            ),
            Expr::LiteralPrimitive(value) => WatchAst::constant(value.clone()),
            Expr::LiteralString(s) => WatchAst::constant(Value::String(s.clone())),
            Expr::LiteralArray(elements) => pure(
                expr,
                |args| Ok(operations::array(args.iter().map(|a| a.value().clone()).collect())),
                self.visit_all(elements)?,
            ),
            Expr::LiteralObject { keys, values } => {
                let keys = keys.clone();
                pure(
                    expr,
                    move |args| {
                        let values = args.iter().map(|a| a.value().clone()).collect();
                        Ok(operations::object(&keys, values))
                    },
                    self.visit_all(values)?,
                )
            }
            Expr::Filter { name, .. } => {
                let filter = self
                    .filters
                    .resolve(name)
                    .ok_or_else(|| WatchError::UnknownFilter(name.clone()))?;
                let args = expr
                    .all_args()
                    .into_iter()
                    .map(|arg| self.visit_collection(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                pure(expr, filter_wrapper(name, filter, args.len()), args)
            }
            Expr::CallFunction { .. } | Expr::Assign { .. } | Expr::Chain(_) => {
                return Err(WatchError::Unsupported(expr.kind()));
            }
        })
    }

    fn visit_collection(&self, expr: &Expr) -> Result<WatchAst, WatchError> {
        Ok(WatchAst::collection(self.visit(expr)?))
    }

    fn visit_all(&self, exprs: &[Expr]) -> Result<Vec<WatchAst>, WatchError> {
        exprs.iter().map(|e| self.visit(e)).collect()
    }
}

fn pure(
    expr: &Expr,
    function: impl Fn(&[Observed]) -> Result<Value, EvalError> + 'static,
    args: Vec<WatchAst>,
) -> WatchAst {
    WatchAst::pure_function(expr.to_string(), function, args)
}

fn binary_fn(op: BinOp) -> impl Fn(&[Observed]) -> Result<Value, EvalError> {
    move |args| match args {
        [left, right] => operations::binary(op, left.value(), right.value()),
        _ => Err(arity(op.symbol(), 2, args)),
    }
}

fn arity(label: &str, expected: usize, args: &[Observed]) -> EvalError {
    EvalError::TypeError(format!(
        "'{}' expects {} arguments, got {}",
        label,
        expected,
        args.len()
    ))
}

/// Calls `filter` with the last argument values it saw, replacing only the
/// positions whose identity changed. Change records pass their iterable.
fn filter_wrapper(
    name: &str,
    filter: Function,
    arity: usize,
) -> impl Fn(&[Observed]) -> Result<Value, EvalError> + 'static {
    let name = name.to_string();
    let last = RefCell::new(vec![Value::Null; arity]);

    move |inputs| {
        let args = {
            let mut last = last.borrow_mut();
            if last.len() < inputs.len() {
                last.resize(inputs.len(), Value::Null);
            }
            for (i, input) in inputs.iter().enumerate() {
                let value = input.value();
                if last[i].same(value) {
                    trace!(filter = %name, position = i, "filter argument unchanged");
                } else {
                    last[i] = value.clone();
                }
            }
            last.clone()
        };
        filter.call(&args)
    }
}
