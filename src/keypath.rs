use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};

use crate::ast::Token;
use crate::builder::ParseError;
use crate::interpreter::{EvalError, Evaluator, Interpreter};
use crate::lexer::Lexer;
use crate::value::Value;

/// Any failure the facade can surface: a pattern that does not parse, or an
/// evaluation that faulted.
#[derive(Debug, Clone, PartialEq)]
pub enum KeypathError {
    Parse(ParseError),
    Eval(EvalError),
}

impl std::fmt::Display for KeypathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeypathError::Parse(err) => write!(f, "{}", err),
            KeypathError::Eval(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for KeypathError {}

impl From<ParseError> for KeypathError {
    fn from(err: ParseError) -> Self {
        KeypathError::Parse(err)
    }
}

impl From<EvalError> for KeypathError {
    fn from(err: EvalError) -> Self {
        KeypathError::Eval(err)
    }
}

/// Pattern-to-tokens cache. Lexing is pure, so token lists are shared
/// process-wide; compiled evaluators are per [`Keypath`] because host
/// functions and containers are not thread-safe.
static TOKEN_CACHE: LazyLock<Mutex<HashMap<String, Vec<Token>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

// A poisoned lock bypasses the cache and re-lexes; lexing stays correct
// without it.
fn cached_tokens(pattern: &str) -> Result<Vec<Token>, ParseError> {
    if let Ok(cache) = TOKEN_CACHE.lock() {
        if let Some(tokens) = cache.get(pattern) {
            return Ok(tokens.clone());
        }
    }
    let tokens = Lexer::new(pattern).tokenize()?;
    if let Ok(mut cache) = TOKEN_CACHE.lock() {
        cache.insert(pattern.to_string(), tokens.clone());
    }
    Ok(tokens)
}

/// A parsed pattern, compiled once in both access modes and reusable
/// against any number of targets.
///
/// # Examples
///
/// ```
/// use keypath_lang::{Keypath, Value};
///
/// let keypath = Keypath::new("user.name")?;
/// let scope = Value::from(serde_json::json!({"user": {"name": "ada"}}));
/// assert_eq!(keypath.get(&scope)?, Some(Value::string("ada")));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Keypath {
    pattern: String,
    reader: Evaluator,
    writer: Evaluator,
}

impl Keypath {
    /// Parses and compiles a pattern.
    pub fn new(pattern: &str) -> Result<Keypath, ParseError> {
        let tokens = cached_tokens(pattern)?;
        let reader = Interpreter::compile_tokens(tokens.clone(), false)?;
        let writer = Interpreter::compile_tokens(tokens, true)?;
        Ok(Keypath {
            pattern: pattern.to_string(),
            reader,
            writer,
        })
    }

    /// The source text this keypath was compiled from.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Reads the value the pattern addresses in `scope`. `None` means the
    /// path resolved to nothing (a missing entry or a short-circuited
    /// existential guard), as opposed to an explicit null.
    pub fn get(&self, scope: &Value) -> Result<Option<Value>, EvalError> {
        self.reader.run(scope, None, None)
    }

    /// Like [`get`](Keypath::get), with a lookup table for `%` keys.
    pub fn get_with(&self, scope: &Value, lookup: &Value) -> Result<Option<Value>, EvalError> {
        self.reader.run(scope, None, Some(lookup))
    }

    /// True when the pattern resolves to a present value. Evaluation
    /// failures count as absent.
    pub fn has(&self, scope: &Value) -> bool {
        matches!(self.reader.run(scope, None, None), Ok(Some(_)))
    }

    /// Like [`has`](Keypath::has), with a lookup table for `%` keys.
    pub fn has_with(&self, scope: &Value, lookup: &Value) -> bool {
        matches!(self.reader.run(scope, None, Some(lookup)), Ok(Some(_)))
    }

    /// Writes `value` at the path, vivifying missing intermediate
    /// containers, and returns the value now present at the path. An
    /// existing value at the terminal position is left in place.
    pub fn set(&self, scope: &Value, value: &Value) -> Result<Option<Value>, EvalError> {
        self.writer.run(scope, Some(value), None)
    }

    /// Like [`set`](Keypath::set), with a lookup table for `%` keys.
    pub fn set_with(
        &self,
        scope: &Value,
        value: &Value,
        lookup: &Value,
    ) -> Result<Option<Value>, EvalError> {
        self.writer.run(scope, Some(value), Some(lookup))
    }
}

/// One-shot read of `pattern` against `scope`.
pub fn get(scope: &Value, pattern: &str) -> Result<Option<Value>, KeypathError> {
    Ok(Keypath::new(pattern)?.get(scope)?)
}

/// One-shot read with a lookup table.
pub fn get_with(
    scope: &Value,
    pattern: &str,
    lookup: &Value,
) -> Result<Option<Value>, KeypathError> {
    Ok(Keypath::new(pattern)?.get_with(scope, lookup)?)
}

/// One-shot presence check. Parse and evaluation failures count as absent.
pub fn has(scope: &Value, pattern: &str) -> bool {
    Keypath::new(pattern).map(|kp| kp.has(scope)).unwrap_or(false)
}

/// One-shot write of `value` at `pattern` in `scope`.
pub fn set(scope: &Value, value: &Value, pattern: &str) -> Result<Option<Value>, KeypathError> {
    Ok(Keypath::new(pattern)?.set(scope, value)?)
}

/// One-shot write with a lookup table.
pub fn set_with(
    scope: &Value,
    value: &Value,
    pattern: &str,
    lookup: &Value,
) -> Result<Option<Value>, KeypathError> {
    Ok(Keypath::new(pattern)?.set_with(scope, value, lookup)?)
}
