use std::{cell::RefCell, collections::HashMap, fmt, rc::Rc};

use crate::evaluator::EvalError;

/// How far past the end of an array a keyed write may land.
pub const MAX_ARRAY_GAP: usize = 1 << 16;

/// Signature shared by scope functions, methods stored on objects and filters.
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value, EvalError>;

/// A callable value.
///
/// Functions compare by identity, never by behaviour.
#[derive(Clone)]
pub struct Function(Rc<NativeFn>);

impl Function {
    pub fn new(f: impl Fn(&[Value]) -> Result<Value, EvalError> + 'static) -> Self {
        Function(Rc::new(f))
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        (self.0)(args)
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({:p})", Rc::as_ptr(&self.0))
    }
}

/// An object provided by the embedding runtime.
///
/// Host objects model getters, setters and methods that live outside the
/// expression language. Any error they return propagates to the caller of
/// `evaluate` unchanged.
pub trait HostObject: fmt::Debug {
    /// Read a property. `None` means the property does not exist.
    fn get(&self, name: &str) -> Result<Option<Value>, EvalError>;

    /// Write a property. Returns `false` when the object rejects the write.
    fn set(&self, name: &str, value: Value) -> Result<bool, EvalError> {
        let _ = (name, value);
        Ok(false)
    }

    /// Invoke a method. `None` means there is no such method.
    ///
    /// The default looks the name up as a property and calls it when it
    /// holds a function.
    fn call(&self, name: &str, args: &[Value]) -> Result<Option<Value>, EvalError> {
        match self.get(name)? {
            Some(Value::Function(f)) => f.call(args).map(Some),
            _ => Ok(None),
        }
    }
}

/// A runtime value of the expression language.
///
/// Scalars are plain data. Arrays, objects, functions and host objects are
/// shared references: cloning a `Value::Object` clones the handle, so an
/// assignment made through one handle is visible through every other, the
/// way a template scope behaves.
///
/// # Type Preservation
///
/// Integers and floats are kept apart. Arithmetic stays integral while the
/// result is whole (see [`crate::operations`]).
///
/// # Examples
///
/// ```
/// use ngexpr::Value;
///
/// let scope = Value::object([("name", Value::from("Ada"))]);
/// let alias = scope.clone();
/// alias.set("age", Value::Integer(36)).unwrap();
///
/// assert_eq!(scope.get("age").unwrap(), Value::Integer(36));
/// assert!(scope.same(&alias));
/// ```
#[derive(Clone)]
pub enum Value {
    /// `null` and `undefined`
    Null,

    Boolean(bool),

    /// Floating-point number
    Float(f64),

    /// Integer number (preserved separately from floats)
    Integer(i64),

    /// UTF-8 string
    String(String),

    /// Shared, growable array
    Array(Rc<RefCell<Vec<Value>>>),

    /// Shared string-keyed map
    Object(Rc<RefCell<HashMap<String, Value>>>),

    /// Callable value
    Function(Function),

    /// Runtime-provided object
    Host(Rc<dyn HostObject>),
}

impl Value {
    pub fn array(values: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(values)))
    }

    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        let map = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Value::Object(Rc::new(RefCell::new(map)))
    }

    pub fn empty_object() -> Self {
        Value::Object(Rc::new(RefCell::new(HashMap::new())))
    }

    pub fn function(f: impl Fn(&[Value]) -> Result<Value, EvalError> + 'static) -> Self {
        Value::Function(Function::new(f))
    }

    pub fn host(object: impl HostObject + 'static) -> Self {
        Value::Host(Rc::new(object))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if the value is truthy (for conditions)
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Float(n) => *n != 0.0 && !n.is_nan(),
            Value::Integer(n) => *n != 0,
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Host(_) => true,
        }
    }

    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Float(n)
                if n.fract() == 0.0 && *n >= i64::MIN as f64 && *n < i64::MAX as f64 =>
            {
                Some(*n as i64)
            }
            _ => None,
        }
    }

    /// Stringify the value the way string concatenation does.
    pub fn as_string(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Float(n) => format_float(*n),
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .borrow()
                .iter()
                .map(|item| match item {
                    Value::Null => String::new(),
                    other => other.as_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) | Value::Host(_) => "[object Object]".to_string(),
            Value::Function(_) => "function".to_string(),
        }
    }

    /// Returns a human-readable type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
            Value::Host(_) => "host object",
        }
    }

    /// Strict equality as `indexOf` uses it: identity for shared values,
    /// numeric comparison across integers and floats, plain equality otherwise.
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
                *a as f64 == *b
            }
            _ => self.same(other),
        }
    }

    /// Identity comparison: shared values compare by reference, scalars by value.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Host(a), Value::Host(b)) => Rc::ptr_eq(a, b),
            (Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Host(_), _)
            | (_, Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Host(_)) => false,
            (a, b) => a == b,
        }
    }

    /// Look a property up, distinguishing a missing property from one holding null.
    pub fn lookup(&self, name: &str) -> Result<Option<Value>, EvalError> {
        match self {
            Value::Object(map) => Ok(map.borrow().get(name).cloned()),
            Value::Host(host) => host.get(name),
            Value::Array(items) if name == "length" => {
                Ok(Some(Value::Integer(items.borrow().len() as i64)))
            }
            Value::String(s) if name == "length" => Ok(Some(Value::Integer(s.chars().count() as i64))),
            _ => Ok(None),
        }
    }

    /// Read a property; missing properties and null receivers read as null.
    pub fn get(&self, name: &str) -> Result<Value, EvalError> {
        Ok(self.lookup(name)?.unwrap_or(Value::Null))
    }

    pub fn set(&self, name: &str, value: Value) -> Result<(), EvalError> {
        match self {
            Value::Object(map) => {
                map.borrow_mut().insert(name.to_string(), value);
                Ok(())
            }
            Value::Host(host) => {
                if host.set(name, value)? {
                    Ok(())
                } else {
                    Err(EvalError::TypeError(format!(
                        "Cannot set property '{}' on host object",
                        name
                    )))
                }
            }
            other => Err(EvalError::TypeError(format!(
                "Cannot set property '{}' on {}",
                name,
                other.type_name()
            ))),
        }
    }

    /// Read `self[key]`.
    pub fn get_keyed(&self, key: &Value) -> Result<Value, EvalError> {
        match (self, key) {
            (Value::Null, _) => Ok(Value::Null),
            (Value::Array(items), index) if index.as_int().is_some() => {
                let index = index.as_int().unwrap_or(-1);
                if index < 0 {
                    return Ok(Value::Null);
                }
                Ok(items.borrow().get(index as usize).cloned().unwrap_or(Value::Null))
            }
            (Value::String(s), index) if index.as_int().is_some() => {
                let index = index.as_int().unwrap_or(-1);
                if index < 0 {
                    return Ok(Value::Null);
                }
                Ok(s.chars()
                    .nth(index as usize)
                    .map(|c| Value::String(c.to_string()))
                    .unwrap_or(Value::Null))
            }
            (object, key) => object.get(&key.as_string()),
        }
    }

    /// Write `self[key] = value`.
    ///
    /// Writing past the end of an array pads it with nulls, up to
    /// [`MAX_ARRAY_GAP`] slots past the current length.
    pub fn set_keyed(&self, key: &Value, value: Value) -> Result<(), EvalError> {
        match (self, key.as_int()) {
            (Value::Array(items), Some(index)) if index >= 0 => {
                let mut items = items.borrow_mut();
                let len = items.len();
                let index = usize::try_from(index)
                    .ok()
                    .filter(|i| *i <= len.saturating_add(MAX_ARRAY_GAP))
                    .ok_or_else(|| {
                        EvalError::TypeError(format!(
                            "Array index {} is too far past the end of an array of length {}",
                            index, len
                        ))
                    })?;
                if len <= index {
                    items.try_reserve(index + 1 - len).map_err(|e| {
                        EvalError::TypeError(format!("Cannot grow array to {} items: {}", index + 1, e))
                    })?;
                    items.resize(index + 1, Value::Null);
                }
                items[index] = value;
                Ok(())
            }
            (Value::Array(_), _) => Err(EvalError::TypeError(format!(
                "Cannot use {} key '{}' on array; use a non-negative integer index instead",
                key.type_name(),
                key.as_string()
            ))),
            _ => self.set(&key.as_string(), value),
        }
    }

    /// Invoke the method `name`. `None` means the receiver has no such method.
    pub fn call_method(&self, name: &str, args: &[Value]) -> Result<Option<Value>, EvalError> {
        match self {
            Value::Object(map) => {
                let member = map.borrow().get(name).cloned();
                match member {
                    Some(Value::Function(f)) => f.call(args).map(Some),
                    _ => Ok(None),
                }
            }
            Value::Host(host) => host.call(name, args),
            Value::Array(items) => Ok(match name {
                "indexOf" => {
                    let needle = args.first().cloned().unwrap_or(Value::Null);
                    let position = items.borrow().iter().position(|item| item.strict_equals(&needle));
                    Some(Value::Integer(position.map_or(-1, |p| p as i64)))
                }
                "join" => {
                    let separator = args.first().map_or_else(|| ",".to_string(), Value::as_string);
                    let joined = items
                        .borrow()
                        .iter()
                        .map(Value::as_string)
                        .collect::<Vec<_>>()
                        .join(&separator);
                    Some(Value::String(joined))
                }
                _ => None,
            }),
            Value::String(s) => Ok(match name {
                "indexOf" => {
                    let needle = args.first().map(Value::as_string).unwrap_or_default();
                    let position = s
                        .find(&needle)
                        .map_or(-1, |byte| s[..byte].chars().count() as i64);
                    Some(Value::Integer(position))
                }
                "toUpperCase" => Some(Value::String(s.to_uppercase())),
                "toLowerCase" => Some(Value::String(s.to_lowercase())),
                _ => None,
            }),
            _ => Ok(None),
        }
    }
}

/// Floats print without a trailing `.0` and with the spelled-out special values.
pub(crate) fn format_float(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else {
        n.to_string()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Host(a), Value::Host(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Boolean(b) => write!(f, "Boolean({b})"),
            Value::Float(n) => write!(f, "Float({n:?})"),
            Value::Integer(n) => write!(f, "Integer({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Array(items) => f.debug_tuple("Array").field(&*items.borrow()).finish(),
            Value::Object(map) => f.debug_tuple("Object").field(&*map.borrow()).finish(),
            Value::Function(func) => func.fmt(f),
            Value::Host(host) => f.debug_tuple("Host").field(host).finish(),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::array(values)
    }
}
