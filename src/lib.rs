pub mod ast;
pub mod builder;
pub mod interpreter;
pub mod keypath;
pub mod lexer;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{ExpressionStatement, ListBody, Literal, Node, Program, RangeBounds, Token, TokenKind};
pub use builder::{Builder, ParseError};
pub use interpreter::{EvalError, Evaluator, Interpreter};
pub use keypath::{get, get_with, has, set, set_with, Keypath, KeypathError};
pub use lexer::Lexer;
pub use value::{ArrayRef, Callable, ObjectRef, Value};
