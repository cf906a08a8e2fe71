//! # Keypath Expressions - Abstract Syntax Tree
//!
//! This module defines the lexical tokens and the Abstract Syntax Tree (AST)
//! for keypath expressions: a compact textual path grammar for reading values
//! out of, and writing values into, nested data.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer and consumed,
//!   right-to-left, by the builder
//! - **[nodes]** - The tagged node taxonomy shared by the builder and the
//!   interpreter
//!
//! ## The Grammar at a Glance
//!
//! ```text
//! foo.bar[100]qux(123,"abc")baz
//! ```
//!
//! A chain is strictly postfix-composable: each suffix (a `.property`, a
//! `[computed]` access, or a `(call)`) modifies whatever precedes it. The
//! builder exploits this by parsing the token stream from the end, so the
//! trailing construct of the source becomes the outermost node of the tree.
//!
//! ## Operators
//!
//! - `?`  - existential guard: `foo?.bar` yields no value instead of an
//!   error when `foo` is absent
//! - `%`  - lookup: `%0` resolves against the invocation-time lookup table
//! - `~`  - root: `~user` resolves against the original root scope
//! - `{}` - block: `foo{bar}` computes a property key from a sub-pattern
//! - `[a..b]` - range: expands to every integer key between the bounds
//! - `[a,b]`  - list: fans the access out over several keys at once

pub mod nodes;
pub mod tokens;

pub use nodes::{ExpressionStatement, ListBody, Literal, Node, Program, RangeBounds};
pub use tokens::{render_tokens, Token, TokenKind};
