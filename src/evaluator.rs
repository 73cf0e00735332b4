use std::rc::Rc;

use thiserror::Error;

use crate::{
    ast::{BinOp, Expr},
    filters::FilterResolver,
    operations,
    value::{HostObject, Value},
};

/// Errors that can occur during expression evaluation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Call of a scope or member function that does not exist
    #[error("Undefined function {0}")]
    UndefinedFunction(String),

    /// Call of a value that is not a function
    #[error("{0} is not a function")]
    NotAFunction(String),

    /// Filter name the resolver does not know
    #[error("No NgFilter: {0} found!")]
    UnknownFilter(String),

    /// Assignment to something other than an access expression
    #[error("Expression {0} is not assignable")]
    NotAssignable(String),

    /// Type mismatch or invalid operation for the given type
    #[error("Type error: {0}")]
    TypeError(String),

    /// Error raised by a host getter, setter, method or filter
    #[error("{0}")]
    Thrown(String),
}

impl EvalError {
    /// Error to return from host code; its message reaches the caller as is.
    pub fn thrown(message: impl Into<String>) -> Self {
        EvalError::Thrown(message.into())
    }
}

/// Builds the scope a bound expression evaluates against from its base object
/// and the locals passed at evaluation time.
pub type LocalsWrapper = Rc<dyn Fn(&Value, &Value) -> Value>;

impl Expr {
    /// Evaluates the expression against `scope`.
    ///
    /// Filters are looked up through `filters` when a pipe is reached; pass
    /// `&()` when the expression uses none.
    ///
    /// # Examples
    ///
    /// ```
    /// use ngexpr::{Parser, Value};
    ///
    /// let parser = Parser::new();
    /// let scope = Value::object([("price", Value::Integer(100))]);
    ///
    /// let expr = parser.parse("price * 2 + 1").unwrap();
    /// assert_eq!(expr.evaluate(&scope, &()).unwrap(), Value::Integer(201));
    /// ```
    pub fn evaluate(&self, scope: &Value, filters: &dyn FilterResolver) -> Result<Value, EvalError> {
        match self {
            Expr::AccessScope { name } => scope.get(name),
            Expr::AccessMember { object, name } => object.evaluate(scope, filters)?.get(name),
            Expr::AccessKeyed { object, key } => {
                let instance = object.evaluate(scope, filters)?;
                let key = key.evaluate(scope, filters)?;
                operations::keyed(&instance, &key)
            }
            Expr::CallScope { name, args } => {
                let args = evaluate_all(args, scope, filters)?;
                scope
                    .call_method(name, &args)?
                    .ok_or_else(|| EvalError::UndefinedFunction(name.clone()))
            }
            Expr::CallMember { object, name, args } => {
                let instance = object.evaluate(scope, filters)?;
                if instance.is_null() {
                    return Ok(Value::Null);
                }
                let args = evaluate_all(args, scope, filters)?;
                instance
                    .call_method(name, &args)?
                    .ok_or_else(|| EvalError::UndefinedFunction(name.clone()))
            }
            Expr::CallFunction { function, args } => {
                match function.evaluate(scope, filters)? {
                    Value::Function(f) => f.call(&evaluate_all(args, scope, filters)?),
                    Value::Null => Ok(Value::Null),
                    _ => Err(EvalError::NotAFunction(function.to_string())),
                }
            }
            Expr::Binary { op: BinOp::And, left, right } => {
                if !left.evaluate(scope, filters)?.is_truthy() {
                    return Ok(Value::Boolean(false));
                }
                Ok(Value::Boolean(right.evaluate(scope, filters)?.is_truthy()))
            }
            Expr::Binary { op: BinOp::Or, left, right } => {
                if left.evaluate(scope, filters)?.is_truthy() {
                    return Ok(Value::Boolean(true));
                }
                Ok(Value::Boolean(right.evaluate(scope, filters)?.is_truthy()))
            }
            Expr::Binary { op, left, right } => {
                let left_val = left.evaluate(scope, filters)?;
                let right_val = right.evaluate(scope, filters)?;
                operations::binary(*op, &left_val, &right_val)
            }
            Expr::PrefixNot { expr } => Ok(operations::not(&expr.evaluate(scope, filters)?)),
            Expr::Conditional { condition, yes, no } => {
                if condition.evaluate(scope, filters)?.is_truthy() {
                    yes.evaluate(scope, filters)
                } else {
                    no.evaluate(scope, filters)
                }
            }
            Expr::Assign { target, value } => {
                let value = value.evaluate(scope, filters)?;
                target.assign_with(scope, value, filters)
            }
            Expr::LiteralPrimitive(value) => Ok(value.clone()),
            Expr::LiteralString(s) => Ok(Value::String(s.clone())),
            Expr::LiteralArray(elements) => {
                Ok(operations::array(evaluate_all(elements, scope, filters)?))
            }
            Expr::LiteralObject { keys, values } => {
                Ok(operations::object(keys, evaluate_all(values, scope, filters)?))
            }
            Expr::Filter { expr, name, args } => {
                let filter = filters
                    .resolve(name)
                    .ok_or_else(|| EvalError::UnknownFilter(name.clone()))?;
                let mut inputs = Vec::with_capacity(args.len() + 1);
                inputs.push(expr.evaluate(scope, filters)?);
                for arg in args {
                    inputs.push(arg.evaluate(scope, filters)?);
                }
                filter.call(&inputs)
            }
            Expr::Chain(expressions) => {
                let mut result = Value::Null;
                for expr in expressions {
                    let last = expr.evaluate(scope, filters)?;
                    if !last.is_null() {
                        result = last;
                    }
                }
                Ok(result)
            }
        }
    }

    /// Writes `value` to the location this expression reads from and returns it.
    ///
    /// Missing intermediate objects on the path are created, so `x.y.z`
    /// can be assigned on an empty scope.
    pub fn assign(&self, scope: &Value, value: Value) -> Result<Value, EvalError> {
        self.assign_with(scope, value, &())
    }

    fn assign_with(
        &self,
        scope: &Value,
        value: Value,
        filters: &dyn FilterResolver,
    ) -> Result<Value, EvalError> {
        match self {
            Expr::AccessScope { name } => {
                scope.set(name, value.clone())?;
                Ok(value)
            }
            Expr::AccessMember { object, name } => {
                let instance = object.instance_for_write(scope, filters)?;
                instance.set(name, value.clone())?;
                Ok(value)
            }
            Expr::AccessKeyed { object, key } => {
                let instance = object.instance_for_write(scope, filters)?;
                let key = key.evaluate(scope, filters)?;
                instance.set_keyed(&key, value.clone())?;
                Ok(value)
            }
            _ => Err(EvalError::NotAssignable(self.to_string())),
        }
    }

    /// Evaluates the receiver of a write, creating an empty object when it is null.
    fn instance_for_write(
        &self,
        scope: &Value,
        filters: &dyn FilterResolver,
    ) -> Result<Value, EvalError> {
        let instance = self.evaluate(scope, filters)?;
        if !instance.is_null() {
            return Ok(instance);
        }
        let created = Value::empty_object();
        self.assign_with(scope, created.clone(), filters)?;
        Ok(created)
    }

    /// Binds the expression to a fixed base object.
    ///
    /// The returned expression evaluates against `wrapper(base, locals)`,
    /// where the locals are supplied per evaluation. With
    /// [`ScopeLocals::wrapper`] names resolve against the locals first and
    /// the base second, and scope-level writes land on the base.
    pub fn bind(self: Rc<Self>, base: Value, wrapper: LocalsWrapper) -> BoundExpression {
        BoundExpression {
            expr: self,
            base,
            wrapper,
        }
    }
}

fn evaluate_all(
    exprs: &[Expr],
    scope: &Value,
    filters: &dyn FilterResolver,
) -> Result<Vec<Value>, EvalError> {
    exprs.iter().map(|e| e.evaluate(scope, filters)).collect()
}

/// An expression bound to a base object; see [`Expr::bind`].
#[derive(Clone)]
pub struct BoundExpression {
    expr: Rc<Expr>,
    base: Value,
    wrapper: LocalsWrapper,
}

impl BoundExpression {
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn evaluate(&self, locals: &Value, filters: &dyn FilterResolver) -> Result<Value, EvalError> {
        let scope = (self.wrapper)(&self.base, locals);
        self.expr.evaluate(&scope, filters)
    }

    pub fn assign(&self, value: Value, locals: &Value) -> Result<Value, EvalError> {
        let scope = (self.wrapper)(&self.base, locals);
        self.expr.assign(&scope, value)
    }
}

/// Scope overlay consulting `locals` before `scope`.
///
/// Reads and calls look at the locals first. Writes to a bare name always go
/// to the underlying scope.
#[derive(Debug)]
pub struct ScopeLocals {
    scope: Value,
    locals: Value,
}

impl ScopeLocals {
    pub fn new(scope: Value, locals: Value) -> Self {
        ScopeLocals { scope, locals }
    }

    /// The standard [`LocalsWrapper`].
    pub fn wrapper(scope: &Value, locals: &Value) -> Value {
        Value::host(ScopeLocals::new(scope.clone(), locals.clone()))
    }
}

impl HostObject for ScopeLocals {
    fn get(&self, name: &str) -> Result<Option<Value>, EvalError> {
        match self.locals.lookup(name)? {
            Some(value) => Ok(Some(value)),
            None => self.scope.lookup(name),
        }
    }

    fn set(&self, name: &str, value: Value) -> Result<bool, EvalError> {
        self.scope.set(name, value)?;
        Ok(true)
    }

    fn call(&self, name: &str, args: &[Value]) -> Result<Option<Value>, EvalError> {
        if let Some(Value::Function(f)) = self.locals.lookup(name)? {
            return f.call(args).map(Some);
        }
        self.scope.call_method(name, args)
    }
}
