//! Filter lookup.
//!
//! A filter is a [`Function`] called with the piped value followed by the
//! `:`-separated arguments. Evaluation and the watch bridge find filters
//! through a [`FilterResolver`], so the embedding runtime decides which names
//! exist.

use std::{collections::HashMap, fmt, rc::Rc};

use crate::{
    evaluator::EvalError,
    output,
    value::{Function, Value},
};

/// Maps a filter name to its implementation.
pub trait FilterResolver {
    /// `None` when no filter has this name.
    fn resolve(&self, name: &str) -> Option<Function>;
}

/// Resolver that knows no filters.
impl FilterResolver for () {
    fn resolve(&self, _name: &str) -> Option<Function> {
        None
    }
}

impl<T: FilterResolver + ?Sized> FilterResolver for Rc<T> {
    fn resolve(&self, name: &str) -> Option<Function> {
        (**self).resolve(name)
    }
}

/// Map-backed [`FilterResolver`].
///
/// # Examples
///
/// ```
/// use ngexpr::{FilterMap, Parser, Value};
///
/// let filters = FilterMap::new().with("double", |args| {
///     let n = args.first().and_then(Value::as_int).unwrap_or(0);
///     Ok(Value::Integer(n * 2))
/// });
///
/// let expr = Parser::new().parse("21 | double").unwrap();
/// assert_eq!(expr.evaluate(&Value::empty_object(), &filters).unwrap(), Value::Integer(42));
/// ```
#[derive(Clone, Default)]
pub struct FilterMap {
    filters: HashMap<String, Function>,
}

impl FilterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`FilterMap::insert`].
    pub fn with(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&[Value]) -> Result<Value, EvalError> + 'static,
    ) -> Self {
        self.insert(name, f);
        self
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&[Value]) -> Result<Value, EvalError> + 'static,
    ) {
        self.filters.insert(name.into(), Function::new(f));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// The filters every template runtime ships with.
    ///
    /// - `uppercase` / `lowercase` change the case of strings; other values pass through
    /// - `json` renders the value as pretty JSON
    /// - `limitTo:n` keeps the first `n` items of an array or characters of a
    ///   string, or the last `-n` when `n` is negative
    pub fn builtin() -> Self {
        FilterMap::new()
            .with("uppercase", |args| {
                Ok(match args.first() {
                    Some(Value::String(s)) => Value::String(s.to_uppercase()),
                    Some(other) => other.clone(),
                    None => Value::Null,
                })
            })
            .with("lowercase", |args| {
                Ok(match args.first() {
                    Some(Value::String(s)) => Value::String(s.to_lowercase()),
                    Some(other) => other.clone(),
                    None => Value::Null,
                })
            })
            .with("json", |args| {
                let input = args.first().cloned().unwrap_or(Value::Null);
                Ok(Value::String(output::to_json_pretty(&input)))
            })
            .with("limitTo", limit_to)
    }
}

fn limit_to(args: &[Value]) -> Result<Value, EvalError> {
    let input = args.first().cloned().unwrap_or(Value::Null);
    let Some(limit) = args.get(1).and_then(Value::as_int) else {
        return Ok(input);
    };

    fn window(len: usize, limit: i64) -> (usize, usize) {
        let n = (limit.unsigned_abs() as usize).min(len);
        if limit >= 0 { (0, n) } else { (len - n, len) }
    }

    Ok(match &input {
        Value::Array(items) => {
            let items = items.borrow();
            let (start, end) = window(items.len(), limit);
            Value::array(items[start..end].to_vec())
        }
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let (start, end) = window(chars.len(), limit);
            Value::String(chars[start..end].iter().collect())
        }
        _ => input.clone(),
    })
}

impl FilterResolver for FilterMap {
    fn resolve(&self, name: &str) -> Option<Function> {
        self.filters.get(name).cloned()
    }
}

impl fmt::Debug for FilterMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.filters.keys().collect();
        names.sort();
        f.debug_struct("FilterMap").field("filters", &names).finish()
    }
}

#[test]
fn test_limit_to() {
    let items = Value::array(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
    assert_eq!(
        limit_to(&[items.clone(), Value::Integer(2)]).unwrap(),
        Value::array(vec![Value::Integer(1), Value::Integer(2)])
    );
    assert_eq!(
        limit_to(&[items, Value::Integer(-1)]).unwrap(),
        Value::array(vec![Value::Integer(3)])
    );
    assert_eq!(
        limit_to(&["hello".into(), Value::Integer(10)]).unwrap(),
        Value::from("hello")
    );
}
