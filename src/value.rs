use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::interpreter::EvalError;

/// Shared object container. Cloning a [`Value::Object`] aliases the same map.
pub type ObjectRef = Rc<RefCell<HashMap<String, Value>>>;

/// Shared array container. Cloning a [`Value::Array`] aliases the same vector.
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;

/// A host function callable from a keypath call expression.
///
/// The first argument is the receiver (the container the function was read
/// from), the second the evaluated argument list.
#[derive(Clone)]
pub struct Callable {
    name: String,
    func: Rc<dyn Fn(&Value, &[Value]) -> Result<Value, EvalError>>,
}

impl Callable {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, EvalError> + 'static,
    {
        Callable {
            name: name.to_string(),
            func: Rc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn invoke(&self, receiver: &Value, args: &[Value]) -> Result<Value, EvalError> {
        (self.func)(receiver, args)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({})", self.name)
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }
}

/// A runtime value traversed by compiled keypath evaluators.
///
/// Containers use shared references so that a container handed out by an
/// evaluator (for example as the context of a member access) aliases the
/// original graph. Writing through such a handle mutates the graph the
/// evaluator was invoked on, which is what makes auto-vivification work.
///
/// "Undefined" is not a variant; an absent value is `Option::<Value>::None`
/// at every API boundary, keeping it distinct from an explicit `Null`.
///
/// # Examples
///
/// ```
/// use keypath_lang::Value;
///
/// let graph = Value::from(serde_json::json!({"user": {"age": 30}}));
/// assert!(matches!(graph, Value::Object(_)));
/// ```
#[derive(Debug, Clone)]
pub enum Value {
    /// Explicit null
    Null,

    /// Boolean
    Bool(bool),

    /// Number (single float representation, like the source grammar)
    Number(f64),

    /// UTF-8 string
    String(String),

    /// Array of values, shared by reference
    Array(ArrayRef),

    /// String-keyed object, shared by reference
    Object(ObjectRef),

    /// Host function invocable from a call expression
    Callable(Callable),
}

impl Value {
    /// Creates a fresh empty object. This is the container vivified for
    /// missing intermediate path segments during writes.
    pub fn object() -> Self {
        Value::Object(Rc::new(RefCell::new(HashMap::new())))
    }

    /// Wraps a vector into a shared array value.
    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Wraps a host function. See [`Callable`].
    pub fn callable<F>(name: &str, func: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, EvalError> + 'static,
    {
        Value::Callable(Callable::new(name, func))
    }

    /// Human-readable type name used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Callable(_) => "function",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Renders the value as an object key. Whole numbers print without a
    /// fractional part so that `0` and `0.0` address the same entry.
    pub fn key_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Number(n) => format_number(*n),
            Value::Bool(b) => b.to_string(),
            Value::Null => "null".to_string(),
            other => format!("{:?}", other),
        }
    }

    /// Interprets the value as an array index, if it is one.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 => Some(*n as usize),
            Value::String(s) => s.parse::<usize>().ok(),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Formats a number the way keys and canonical output expect: integral
/// values without a trailing `.0`.
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl PartialEq for Value {
    /// Deep structural equality; callables compare by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (Value::Object(a), Value::Object(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (Value::Callable(a), Value::Callable(b)) => a == b,
            _ => false,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => {
                Value::array(arr.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(obj) => {
                let map: HashMap<String, Value> =
                    obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect();
                Value::Object(Rc::new(RefCell::new(map)))
            }
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(arr) => serde_json::Value::Array(
                arr.borrow().iter().map(serde_json::Value::from).collect(),
            ),
            Value::Object(obj) => serde_json::Value::Object(
                obj.borrow()
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
            // Host functions have no JSON representation
            Value::Callable(_) => serde_json::Value::Null,
        }
    }
}
