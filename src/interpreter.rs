use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{render_tokens, ListBody, Literal, Node, Program, RangeBounds, Token};
use crate::builder::{Builder, ParseError};
use crate::lexer::Lexer;
use crate::value::Value;

/// Errors raised while a compiled evaluator runs.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// An operation applied to a value of the wrong type
    TypeError(String),

    /// A member access that cannot be performed (absent or null container)
    AccessError(String),

    /// A call whose callee is not a function
    NotAFunction(String),

    /// A write-mode call whose callee is absent; calls are never vivified
    CannotCreateCall,
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::TypeError(msg) => write!(f, "Type error: {}", msg),
            EvalError::AccessError(msg) => write!(f, "Access error: {}", msg),
            EvalError::NotAFunction(name) => write!(f, "'{}' is not a function", name),
            EvalError::CannotCreateCall => write!(f, "Cannot create call expressions"),
        }
    }
}

impl std::error::Error for EvalError {}

/// Run-time arguments of a single evaluator invocation, visible to every
/// compiled closure of the pattern.
pub(crate) struct Frame<'a> {
    /// The original root scope; `~` always resolves against this.
    pub scope: &'a Value,
    /// The value being written; only the depth-zero segment receives it.
    pub value: Option<&'a Value>,
    /// The side-table resolved by `%` keys.
    pub lookup: Option<&'a Value>,
}

/// Result of one evaluation step: the value plus the container and key it
/// was resolved from. Parents that need to recompose container and key
/// (member access, call receivers) read `context`/`name`; everyone else
/// projects `value`.
#[derive(Debug, Clone, Default)]
pub(crate) struct Resolved {
    pub context: Option<Value>,
    pub name: Option<Value>,
    pub value: Option<Value>,
    /// Set when an existential guard short-circuited the chain.
    pub skipped: bool,
}

impl Resolved {
    fn of(value: Option<Value>) -> Self {
        Resolved {
            value,
            ..Default::default()
        }
    }

    fn at(context: Value, name: Value, value: Option<Value>) -> Self {
        Resolved {
            context: Some(context),
            name: Some(name),
            value,
            skipped: false,
        }
    }

    fn skip() -> Self {
        Resolved {
            skipped: true,
            ..Default::default()
        }
    }
}

type EvalFn = Rc<dyn Fn(&Frame) -> Result<Resolved, EvalError>>;

/// A compiled node: its evaluation closure plus whether it denotes several
/// simultaneous targets. The flag is how split state propagates upward to
/// an enclosing member expression at compile time.
#[derive(Clone)]
struct Compiled {
    eval: EvalFn,
    splits: bool,
}

/// Per-node compilation state, threaded explicitly through the single tree
/// walk instead of living in mutable interpreter fields.
#[derive(Debug, Clone, Copy)]
struct CompileContext {
    /// Distance from the outermost node. Depth zero is the right-most
    /// segment of the pattern and the only one that writes the caller's
    /// value; ancestors vivify with a fresh empty object.
    depth: usize,
    write: bool,
}

impl CompileContext {
    fn deeper(self) -> Self {
        CompileContext {
            depth: self.depth + 1,
            write: self.write,
        }
    }

    fn read_only() -> Self {
        CompileContext {
            depth: 0,
            write: false,
        }
    }
}

/// Read accessor: `(container, key) -> value-at-key`.
fn read_entry(container: &Value, key: &Value) -> Result<Option<Value>, EvalError> {
    match container {
        Value::Object(map) => Ok(map.borrow().get(&key.key_string()).cloned()),
        Value::Array(items) => match key.as_index() {
            Some(index) => Ok(items.borrow().get(index).cloned()),
            None => Ok(None),
        },
        Value::String(s) => match key.as_index() {
            Some(index) => Ok(s.chars().nth(index).map(|c| Value::String(c.to_string()))),
            None => Ok(None),
        },
        Value::Null => Err(EvalError::AccessError(format!(
            "cannot read '{}' of null",
            key.key_string()
        ))),
        _ => Ok(None),
    }
}

/// Write accessor: assigns `fallback` at `key` only when the container has
/// no own entry there, then returns the (now present) value at `key`. This
/// is what auto-vivifies missing intermediate containers.
fn write_entry(container: &Value, key: &Value, fallback: Value) -> Result<Option<Value>, EvalError> {
    match container {
        Value::Object(map) => {
            let mut map = map.borrow_mut();
            Ok(Some(map.entry(key.key_string()).or_insert(fallback).clone()))
        }
        Value::Array(items) => {
            let index = key.as_index().ok_or_else(|| {
                EvalError::TypeError(format!(
                    "'{}' is not a valid array index",
                    key.key_string()
                ))
            })?;
            let mut items = items.borrow_mut();
            if index >= items.len() {
                items.resize(index, Value::Null);
                items.push(fallback);
            }
            Ok(items.get(index).cloned())
        }
        other => Err(EvalError::TypeError(format!(
            "cannot create '{}' on a {} value",
            key.key_string(),
            other.kind_name()
        ))),
    }
}

fn apply(cx: CompileContext, frame: &Frame, container: &Value, key: &Value) -> Result<Option<Value>, EvalError> {
    if cx.write {
        write_entry(container, key, terminal_fallback(cx, frame))
    } else {
        read_entry(container, key)
    }
}

/// Only the depth-zero segment receives the caller's value; everything
/// above it on the path vivifies with an empty object.
fn terminal_fallback(cx: CompileContext, frame: &Frame) -> Value {
    if cx.depth == 0 {
        frame.value.cloned().unwrap_or(Value::Null)
    } else {
        Value::object()
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Number(n) => Value::Number(*n),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Null => Value::Null,
    }
}

/// Expands range bounds into the concrete key sequence, inclusive on both
/// ends, ascending or descending. A missing bound counts as zero.
fn materialize_range(bounds: &RangeBounds) -> Vec<f64> {
    let left = bounds.left.unwrap_or(0.0) as i64;
    let right = bounds.right.unwrap_or(0.0) as i64;
    if left <= right {
        (left..=right).map(|n| n as f64).collect()
    } else {
        (right..=left).rev().map(|n| n as f64).collect()
    }
}

fn undefined_access(key: &Resolved) -> EvalError {
    let name = key
        .value
        .as_ref()
        .map(Value::key_string)
        .unwrap_or_else(|| "?".to_string());
    EvalError::AccessError(format!("cannot read '{}' of undefined", name))
}

/// Collects the elements of a fan-out operand.
fn element_list(value: Option<Value>) -> Result<Vec<Value>, EvalError> {
    match value {
        Some(Value::Array(items)) => Ok(items.borrow().iter().cloned().collect()),
        Some(other) => Err(EvalError::TypeError(format!(
            "cannot fan out over a {} value",
            other.kind_name()
        ))),
        None => Err(EvalError::AccessError(
            "cannot fan out over undefined".to_string(),
        )),
    }
}

/// Compiles an AST into a reusable evaluator.
///
/// The tree is walked exactly once per (pattern, mode) pair; each node
/// becomes a closure capturing its already-compiled children. Invoking the
/// resulting [`Evaluator`] only replays the composed closures.
pub struct Interpreter {
    /// Block sub-patterns compiled during this walk, keyed by their exact
    /// token text.
    blocks: HashMap<String, Compiled>,
}

/// A compiled, reusable keypath evaluator.
///
/// Pure with respect to its three run-time arguments: the same evaluator
/// can be reused for any number of invocations against different targets.
#[derive(Clone)]
pub struct Evaluator {
    eval: EvalFn,
    write: bool,
}

impl Evaluator {
    /// Invokes the evaluator. `scope` is the root target; `value` is the
    /// value being written (ignored by read-mode evaluators); `lookup` is
    /// the side-table resolved by `%` keys.
    ///
    /// Returns the resolved value, or `None` when the pattern resolved to
    /// nothing (a missing entry or a short-circuited existential guard).
    pub fn run(
        &self,
        scope: &Value,
        value: Option<&Value>,
        lookup: Option<&Value>,
    ) -> Result<Option<Value>, EvalError> {
        let frame = Frame {
            scope,
            value,
            lookup,
        };
        Ok((self.eval)(&frame)?.value)
    }

    /// True when this evaluator was compiled with the write accessor.
    pub fn is_write(&self) -> bool {
        self.write
    }
}

impl Interpreter {
    /// Compiles a source pattern.
    pub fn compile(source: &str, write: bool) -> Result<Evaluator, ParseError> {
        Self::compile_tokens(Lexer::new(source).tokenize()?, write)
    }

    /// Compiles an already-tokenized pattern.
    pub fn compile_tokens(tokens: Vec<Token>, write: bool) -> Result<Evaluator, ParseError> {
        let program = Builder::with_tokens(tokens).build()?;
        Self::compile_program(&program, write)
    }

    /// Compiles an already-parsed program.
    pub fn compile_program(program: &Program, write: bool) -> Result<Evaluator, ParseError> {
        let mut interpreter = Interpreter {
            blocks: HashMap::new(),
        };
        let eval = interpreter.compile_statements(program, CompileContext { depth: 0, write })?;
        Ok(Evaluator { eval, write })
    }

    /// Statements run in order against the same frame; the last result wins.
    fn compile_statements(
        &mut self,
        program: &Program,
        cx: CompileContext,
    ) -> Result<EvalFn, ParseError> {
        let mut statements = Vec::with_capacity(program.body.len());
        for statement in &program.body {
            statements.push(self.compile_node(&statement.expression, cx)?.eval);
        }
        Ok(Rc::new(move |frame| {
            let mut last = Resolved::default();
            for statement in &statements {
                last = statement(frame)?;
            }
            Ok(last)
        }))
    }

    /// Compiles a node in traversal position: identifiers and literals
    /// apply themselves as keys to the current scope.
    fn compile_node(&mut self, node: &Node, cx: CompileContext) -> Result<Compiled, ParseError> {
        match node {
            Node::Identifier(name) => Ok(key_application(Value::String(name.clone()), cx)),
            Node::Literal(literal) => Ok(key_application(literal_value(literal), cx)),
            Node::Array(body) => self.compile_array(body, cx),
            Node::Sequence(body) => self.compile_sequence(body, cx),
            Node::Member {
                object, property, ..
            } => self.compile_member(object, property, cx),
            Node::Call { callee, args } => self.compile_call(callee, args, cx),
            Node::Lookup { key } => self.compile_lookup(key),
            Node::Root { key } => self.compile_root(key, cx),
            Node::Existential { expression } => self.compile_existential(expression, cx),
            Node::Block { body } => self.compile_block(body),
        }
    }

    /// Compiles a node in key position: identifiers denote their name,
    /// literals their value; anything else evaluates (read-only) and its
    /// result is the key. Key computations never vivify.
    fn compile_key(&mut self, node: &Node) -> Result<Compiled, ParseError> {
        match node {
            Node::Identifier(name) => Ok(constant(Value::String(name.clone()))),
            Node::Literal(literal) => Ok(constant(literal_value(literal))),
            other => self.compile_node(other, CompileContext::read_only()),
        }
    }

    /// Compiles a call argument: literals denote their value; lookups,
    /// roots, and blocks evaluate read-only. The builder has already
    /// rejected every other node kind.
    fn compile_arg(&mut self, node: &Node) -> Result<EvalFn, ParseError> {
        match node {
            Node::Literal(literal) => Ok(constant(literal_value(literal)).eval),
            other => Ok(self.compile_node(other, CompileContext::read_only())?.eval),
        }
    }

    /// An array expression applies each element to the current scope and
    /// materializes the results as one first-class array value.
    fn compile_array(&mut self, body: &ListBody, cx: CompileContext) -> Result<Compiled, ParseError> {
        let elements = self.compile_elements(body, cx)?;
        let eval: EvalFn = Rc::new(move |frame| {
            let mut values = Vec::with_capacity(elements.len());
            for element in &elements {
                let resolved = element(frame)?;
                if resolved.skipped {
                    return Ok(Resolved::skip());
                }
                values.push(resolved.value.unwrap_or(Value::Null));
            }
            Ok(Resolved::of(Some(Value::array(values))))
        });
        Ok(Compiled {
            eval,
            splits: body.is_plural(),
        })
    }

    /// A sequence is a transparent multi-value group: it evaluates to the
    /// list of keys it denotes and marks the enclosing member as split.
    fn compile_sequence(
        &mut self,
        body: &ListBody,
        _cx: CompileContext,
    ) -> Result<Compiled, ParseError> {
        let keys = match body {
            ListBody::Elements(elements) => {
                let mut compiled = Vec::with_capacity(elements.len());
                for element in elements {
                    compiled.push(self.compile_key(element)?.eval);
                }
                compiled
            }
            ListBody::Range(bounds) => materialize_range(bounds)
                .into_iter()
                .map(|n| constant(Value::Number(n)).eval)
                .collect(),
        };
        let eval: EvalFn = Rc::new(move |frame| {
            let mut values = Vec::with_capacity(keys.len());
            for key in &keys {
                let resolved = key(frame)?;
                if resolved.skipped {
                    return Ok(Resolved::skip());
                }
                values.push(resolved.value.unwrap_or(Value::Null));
            }
            Ok(Resolved::of(Some(Value::array(values))))
        });
        Ok(Compiled { eval, splits: true })
    }

    /// Elements of an array expression, in traversal position. A range
    /// expands to one key application per materialized integer.
    fn compile_elements(
        &mut self,
        body: &ListBody,
        cx: CompileContext,
    ) -> Result<Vec<EvalFn>, ParseError> {
        match body {
            ListBody::Elements(elements) => {
                let mut compiled = Vec::with_capacity(elements.len());
                for element in elements {
                    compiled.push(self.compile_node(element, cx)?.eval);
                }
                Ok(compiled)
            }
            ListBody::Range(bounds) => Ok(materialize_range(bounds)
                .into_iter()
                .map(|n| key_application(Value::Number(n), cx).eval)
                .collect()),
        }
    }

    /// Member access with broadcast. The object side is compiled one level
    /// deeper; whether either side denotes several simultaneous targets is
    /// decided here, at compile time, from the node shapes and the
    /// propagated split flags of the children.
    fn compile_member(
        &mut self,
        object: &Node,
        property: &Node,
        cx: CompileContext,
    ) -> Result<Compiled, ParseError> {
        let object_c = self.compile_node(object, cx.deeper())?;
        let key_c = self.compile_key(property)?;

        let left_split = object_c.splits;
        let right_split = key_c.splits;
        let object_eval = object_c.eval;
        let key_eval = key_c.eval;

        let eval: EvalFn = Rc::new(move |frame| {
            let object = object_eval(frame)?;
            if object.skipped {
                return Ok(Resolved::skip());
            }
            let key = key_eval(frame)?;
            if key.skipped {
                return Ok(Resolved::skip());
            }

            match (left_split, right_split) {
                (false, false) => {
                    let container = object.value.ok_or_else(|| undefined_access(&key))?;
                    let name = key.value.unwrap_or(Value::Null);
                    let value = apply(cx, frame, &container, &name)?;
                    Ok(Resolved::at(container, name, value))
                }
                (true, false) => {
                    let containers = element_list(object.value)?;
                    let name = key.value.unwrap_or(Value::Null);
                    let mut out = Vec::with_capacity(containers.len());
                    for container in &containers {
                        out.push(apply(cx, frame, container, &name)?.unwrap_or(Value::Null));
                    }
                    Ok(Resolved::at(
                        Value::array(containers),
                        name,
                        Some(Value::array(out)),
                    ))
                }
                (false, true) => {
                    let container = object.value.ok_or_else(|| undefined_access(&key))?;
                    let names = element_list(key.value)?;
                    let mut out = Vec::with_capacity(names.len());
                    for name in &names {
                        out.push(apply(cx, frame, &container, name)?.unwrap_or(Value::Null));
                    }
                    Ok(Resolved::at(
                        container,
                        Value::array(names),
                        Some(Value::array(out)),
                    ))
                }
                (true, true) => {
                    let containers = element_list(object.value)?;
                    let names = element_list(key.value)?;
                    let mut out = Vec::with_capacity(containers.len());
                    for container in &containers {
                        let mut row = Vec::with_capacity(names.len());
                        for name in &names {
                            row.push(apply(cx, frame, container, name)?.unwrap_or(Value::Null));
                        }
                        out.push(Value::array(row));
                    }
                    Ok(Resolved::at(
                        Value::array(containers),
                        Value::array(names),
                        Some(Value::array(out)),
                    ))
                }
            }
        });

        Ok(Compiled {
            eval,
            splits: left_split || right_split,
        })
    }

    /// A call evaluates its callee in context mode (receiver + function),
    /// its arguments in value mode, and invokes. Callee resolution is
    /// always read-only: calls are never auto-vivified.
    fn compile_call(
        &mut self,
        callee: &Node,
        args: &[Node],
        cx: CompileContext,
    ) -> Result<Compiled, ParseError> {
        let callee_eval = self.compile_node(callee, CompileContext::read_only())?.eval;
        let mut arg_evals = Vec::with_capacity(args.len());
        for arg in args {
            arg_evals.push(self.compile_arg(arg)?);
        }
        let write = cx.write;

        let eval: EvalFn = Rc::new(move |frame| {
            let resolved = callee_eval(frame)?;
            if resolved.skipped {
                return Ok(Resolved::skip());
            }
            match resolved.value {
                Some(Value::Callable(func)) => {
                    let receiver = resolved.context.clone().unwrap_or(Value::Null);
                    let mut argv = Vec::with_capacity(arg_evals.len());
                    for arg in &arg_evals {
                        argv.push(arg(frame)?.value.unwrap_or(Value::Null));
                    }
                    let out = func.invoke(&receiver, &argv)?;
                    Ok(Resolved::of(Some(out)))
                }
                _ if write => Err(EvalError::CannotCreateCall),
                _ => {
                    let name = resolved
                        .name
                        .as_ref()
                        .map(Value::key_string)
                        .unwrap_or_else(|| "expression".to_string());
                    Err(EvalError::NotAFunction(name))
                }
            }
        });
        Ok(Compiled {
            eval,
            splits: false,
        })
    }

    /// `%key` resolves against the invocation's lookup table. A missing
    /// table resolves to no value rather than an error.
    fn compile_lookup(&mut self, key: &Node) -> Result<Compiled, ParseError> {
        let key_eval = self.compile_key(key)?.eval;
        let eval: EvalFn = Rc::new(move |frame| {
            let key = key_eval(frame)?;
            if key.skipped {
                return Ok(Resolved::skip());
            }
            let name = key.value.unwrap_or(Value::Null);
            match frame.lookup {
                Some(table) if !table.is_null() => {
                    let value = read_entry(table, &name)?;
                    Ok(Resolved::at(table.clone(), name, value))
                }
                _ => Ok(Resolved::of(None)),
            }
        });
        Ok(Compiled {
            eval,
            splits: false,
        })
    }

    /// `~key` applies the key to the original root scope, letting a chain
    /// jump back to the root mid-traversal. Participates in vivification
    /// at its own depth like any other traversal segment.
    fn compile_root(&mut self, key: &Node, cx: CompileContext) -> Result<Compiled, ParseError> {
        let key_eval = self.compile_key(key)?.eval;
        let eval: EvalFn = Rc::new(move |frame| {
            let key = key_eval(frame)?;
            if key.skipped {
                return Ok(Resolved::skip());
            }
            let name = key.value.unwrap_or(Value::Null);
            let value = apply(cx, frame, frame.scope, &name)?;
            Ok(Resolved::at(frame.scope.clone(), name, value))
        });
        Ok(Compiled {
            eval,
            splits: false,
        })
    }

    /// The existential guard. An absent scope, a failure beneath the
    /// guard, or an absent/null guarded result all become a skip marker
    /// that the rest of the chain propagates instead of touching its
    /// accessor. This operator never propagates an evaluation failure.
    fn compile_existential(
        &mut self,
        expression: &Node,
        cx: CompileContext,
    ) -> Result<Compiled, ParseError> {
        let inner = self.compile_node(expression, cx)?;
        let inner_eval = inner.eval;
        let eval: EvalFn = Rc::new(move |frame| {
            if frame.scope.is_null() {
                return Ok(Resolved::skip());
            }
            match inner_eval(frame) {
                Err(_) => Ok(Resolved::skip()),
                Ok(resolved) if resolved.skipped => Ok(Resolved::skip()),
                Ok(resolved) => match &resolved.value {
                    None | Some(Value::Null) => Ok(Resolved::skip()),
                    _ => Ok(resolved),
                },
            }
        });
        Ok(Compiled {
            eval,
            splits: inner.splits,
        })
    }

    /// A block's raw tokens are compiled like a top-level pattern (read
    /// mode), memoized by their exact text, and evaluated in value mode to
    /// produce a dynamic property key.
    fn compile_block(&mut self, body: &[Token]) -> Result<Compiled, ParseError> {
        let text = render_tokens(body);
        if let Some(compiled) = self.blocks.get(&text) {
            return Ok(compiled.clone());
        }
        let program = Builder::with_tokens(body.to_vec()).build()?;
        let eval = self.compile_statements(&program, CompileContext::read_only())?;
        let compiled = Compiled {
            eval,
            splits: false,
        };
        self.blocks.insert(text, compiled.clone());
        Ok(compiled)
    }
}

/// A traversal step that applies a fixed key to the current scope.
fn key_application(key: Value, cx: CompileContext) -> Compiled {
    let eval: EvalFn = Rc::new(move |frame| {
        let value = apply(cx, frame, frame.scope, &key)?;
        Ok(Resolved::at(frame.scope.clone(), key.clone(), value))
    });
    Compiled {
        eval,
        splits: false,
    }
}

/// A key or argument that is known at compile time.
fn constant(value: Value) -> Compiled {
    let eval: EvalFn = Rc::new(move |_frame| Ok(Resolved::of(Some(value.clone()))));
    Compiled {
        eval,
        splits: false,
    }
}
