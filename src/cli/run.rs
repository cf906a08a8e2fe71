//! Execute keypath patterns against JSON input

use super::CliError;
use crate::{Builder, Keypath, Value};

/// Options for the get command
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    /// The keypath pattern to evaluate
    pub pattern: String,
    /// JSON input string
    pub input: Option<String>,
    /// JSON lookup table for `%` keys
    pub lookup: Option<String>,
    /// Pretty-print the output
    pub pretty: bool,
}

/// Options for the set command
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// The keypath pattern to write at
    pub pattern: String,
    /// JSON value to write
    pub value: String,
    /// JSON input string
    pub input: Option<String>,
    /// JSON lookup table for `%` keys
    pub lookup: Option<String>,
    /// Pretty-print the output
    pub pretty: bool,
}

/// Result of a get or set operation
#[derive(Debug)]
pub enum RunResult {
    /// The pattern resolved to no value
    Absent,
    /// Evaluation succeeded with JSON output
    Success(serde_json::Value),
}

/// Execute a keypath read against JSON input.
pub fn execute_get(options: &GetOptions) -> Result<RunResult, CliError> {
    let keypath = Keypath::new(&options.pattern)?;
    let scope = parse_input(options.input.as_deref())?;

    let result = match parse_lookup(options.lookup.as_deref())? {
        Some(lookup) => keypath.get_with(&scope, &lookup)?,
        None => keypath.get(&scope)?,
    };

    Ok(match result {
        Some(value) => RunResult::Success(serde_json::Value::from(&value)),
        None => RunResult::Absent,
    })
}

/// Execute a keypath write against JSON input. Prints the whole mutated
/// input, not just the written value.
pub fn execute_set(options: &SetOptions) -> Result<RunResult, CliError> {
    let keypath = Keypath::new(&options.pattern)?;
    let scope = parse_input(options.input.as_deref())?;
    let value = Value::from(serde_json::from_str::<serde_json::Value>(&options.value)?);

    match parse_lookup(options.lookup.as_deref())? {
        Some(lookup) => keypath.set_with(&scope, &value, &lookup)?,
        None => keypath.set(&scope, &value)?,
    };

    Ok(RunResult::Success(serde_json::Value::from(&scope)))
}

/// Validate a pattern and return its canonical rendering.
pub fn execute_check(pattern: &str) -> Result<String, CliError> {
    let program = Builder::parse(pattern)?;
    Ok(program.to_string())
}

fn parse_input(input: Option<&str>) -> Result<Value, CliError> {
    let text = input.ok_or(CliError::NoInput)?;
    let json: serde_json::Value = serde_json::from_str(text)?;
    Ok(Value::from(json))
}

fn parse_lookup(lookup: Option<&str>) -> Result<Option<Value>, CliError> {
    match lookup {
        Some(text) => {
            let json: serde_json::Value = serde_json::from_str(text)?;
            Ok(Some(Value::from(json)))
        }
        None => Ok(None),
    }
}
