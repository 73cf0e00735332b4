use std::{fmt, rc::Rc};

use crate::{evaluator::EvalError, value::Value};

/// Pure function behind a [`WatchAst::PureFunction`] node, applied to the
/// observed values of its inputs in order.
pub type Combinator = Rc<dyn Fn(&[Observed]) -> Result<Value, EvalError>>;

/// Marks a value that is diffed as an iterable rather than by identity.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionChangeRecord {
    iterable: Value,
}

impl CollectionChangeRecord {
    pub fn new(iterable: Value) -> Self {
        CollectionChangeRecord { iterable }
    }

    /// The collection as currently iterated.
    pub fn iterable(&self) -> &Value {
        &self.iterable
    }
}

/// What a watch node reports when checked.
#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
    Value(Value),
    Changes(CollectionChangeRecord),
}

impl Observed {
    /// The plain value, or the iterated value of a change record.
    pub fn value(&self) -> &Value {
        match self {
            Observed::Value(value) => value,
            Observed::Changes(record) => record.iterable(),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Observed::Value(value) => value,
            Observed::Changes(record) => record.iterable,
        }
    }
}

/// Node of a watch tree, as consumed by a dirty-checking change detector.
///
/// The detector owns scheduling and diffing; [`WatchAst::evaluate`] is the
/// pull-based reading of a tree that a detector performs on every check.
#[derive(Clone)]
pub enum WatchAst {
    /// The ambient context the tree is watched against
    ContextReference,

    /// Fixed value; `id` names it when it stands in for a bound context
    Constant { value: Value, id: Option<String> },

    FieldRead { base: Box<WatchAst>, name: String },

    Method {
        base: Box<WatchAst>,
        name: String,
        args: Vec<WatchAst>,
    },

    /// Pure function of its inputs, labelled with the source it came from
    PureFunction {
        label: String,
        function: Combinator,
        args: Vec<WatchAst>,
    },

    /// Collection marker around the inner node
    Collection(Box<WatchAst>),
}

impl WatchAst {
    pub fn constant(value: Value) -> Self {
        WatchAst::Constant { value, id: None }
    }

    pub fn constant_with_id(value: Value, id: impl Into<String>) -> Self {
        WatchAst::Constant {
            value,
            id: Some(id.into()),
        }
    }

    pub fn field_read(base: WatchAst, name: impl Into<String>) -> Self {
        WatchAst::FieldRead {
            base: Box::new(base),
            name: name.into(),
        }
    }

    pub fn method(base: WatchAst, name: impl Into<String>, args: Vec<WatchAst>) -> Self {
        WatchAst::Method {
            base: Box::new(base),
            name: name.into(),
            args,
        }
    }

    pub fn pure_function(
        label: impl Into<String>,
        function: impl Fn(&[Observed]) -> Result<Value, EvalError> + 'static,
        args: Vec<WatchAst>,
    ) -> Self {
        WatchAst::PureFunction {
            label: label.into(),
            function: Rc::new(function),
            args,
        }
    }

    pub fn collection(inner: WatchAst) -> Self {
        WatchAst::Collection(Box::new(inner))
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, WatchAst::Collection(_))
    }

    /// Read the tree's current value against `context`.
    ///
    /// Field reads and method calls on a null base yield null.
    pub fn evaluate(&self, context: &Value) -> Result<Observed, EvalError> {
        match self {
            WatchAst::ContextReference => Ok(Observed::Value(context.clone())),
            WatchAst::Constant { value, .. } => Ok(Observed::Value(value.clone())),
            WatchAst::FieldRead { base, name } => {
                let base = base.evaluate(context)?.into_value();
                Ok(Observed::Value(base.get(name)?))
            }
            WatchAst::Method { base, name, args } => {
                let base = base.evaluate(context)?.into_value();
                if base.is_null() {
                    return Ok(Observed::Value(Value::Null));
                }
                let args = args
                    .iter()
                    .map(|arg| arg.evaluate(context).map(Observed::into_value))
                    .collect::<Result<Vec<_>, _>>()?;
                base.call_method(name, &args)?
                    .map(Observed::Value)
                    .ok_or_else(|| EvalError::UndefinedFunction(name.clone()))
            }
            WatchAst::PureFunction { function, args, .. } => {
                let inputs = args
                    .iter()
                    .map(|arg| arg.evaluate(context))
                    .collect::<Result<Vec<_>, _>>()?;
                function(&inputs).map(Observed::Value)
            }
            WatchAst::Collection(inner) => {
                let value = inner.evaluate(context)?.into_value();
                Ok(Observed::Changes(CollectionChangeRecord::new(value)))
            }
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[WatchAst]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

impl fmt::Display for WatchAst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchAst::ContextReference => Ok(()),
            WatchAst::Constant { id: Some(id), .. } => f.write_str(id),
            WatchAst::Constant { value: Value::String(s), .. } => write!(f, "{s:?}"),
            WatchAst::Constant { value, .. } => f.write_str(&value.as_string()),
            WatchAst::FieldRead { base, name } => match base.as_ref() {
                WatchAst::ContextReference => f.write_str(name),
                base => write!(f, "{base}.{name}"),
            },
            WatchAst::Method { base, name, args } => {
                match base.as_ref() {
                    WatchAst::ContextReference => write!(f, "{name}(")?,
                    base => write!(f, "{base}.{name}(")?,
                }
                write_args(f, args)?;
                f.write_str(")")
            }
            WatchAst::PureFunction { label, .. } => f.write_str(label),
            WatchAst::Collection(inner) => write!(f, "#collection({inner})"),
        }
    }
}

impl fmt::Debug for WatchAst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchAst::ContextReference => f.write_str("ContextReference"),
            WatchAst::Constant { value, id } => f
                .debug_struct("Constant")
                .field("value", value)
                .field("id", id)
                .finish(),
            WatchAst::FieldRead { base, name } => f
                .debug_struct("FieldRead")
                .field("base", base)
                .field("name", name)
                .finish(),
            WatchAst::Method { base, name, args } => f
                .debug_struct("Method")
                .field("base", base)
                .field("name", name)
                .field("args", args)
                .finish(),
            WatchAst::PureFunction { label, args, .. } => f
                .debug_struct("PureFunction")
                .field("label", label)
                .field("args", args)
                .finish_non_exhaustive(),
            WatchAst::Collection(inner) => f.debug_tuple("Collection").field(inner).finish(),
        }
    }
}
