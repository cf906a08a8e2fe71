use std::fmt;

use crate::ast::tokens::{render_tokens, Token};
use crate::value::format_number;

/// A parsed keypath program: an ordered list of expression statements.
///
/// Almost always exactly one statement; `;` separates additional ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<ExpressionStatement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStatement {
    pub expression: Node,
}

/// A literal value embedded in a pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Null,
}

/// Bounds of a range inside a bracketed list, e.g. `[1..5]`.
///
/// Invariant (enforced by the builder): never both absent; a missing bound
/// evaluates to zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeBounds {
    pub left: Option<f64>,
    pub right: Option<f64>,
}

/// Payload of a bracketed list: either explicit elements or a range.
#[derive(Debug, Clone, PartialEq)]
pub enum ListBody {
    Elements(Vec<Node>),
    Range(RangeBounds),
}

impl ListBody {
    /// True when the list denotes more than one simultaneous target. Ranges
    /// count as plural regardless of their bounds.
    pub fn is_plural(&self) -> bool {
        match self {
            ListBody::Elements(elements) => elements.len() > 1,
            ListBody::Range(_) => true,
        }
    }
}

/// An AST node. Immutable once built; owned by its parent (or by the
/// [`Program`] for the tree root); no back-references, no cycles.
///
/// The tree shape encodes chain order: the suffix-first parse makes the
/// right-most segment of the source pattern the *outermost* node, so `a.b.c`
/// becomes `Member(Member(a, b), c)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A bare name, e.g. the `foo` in `foo.bar`
    Identifier(String),

    /// Number, string, or `null`
    Literal(Literal),

    /// A bracketed list that forms the entire expression: a first-class
    /// array value, e.g. `[a,b]` in `[a,b].x`
    Array(ListBody),

    /// A bracketed list embedded in a larger chain: a transparent
    /// multi-value group used for fan-out, e.g. `[0,2]` in `foo[0,2]`
    Sequence(ListBody),

    /// Member access. `computed` is false for `.name` access and true for
    /// bracketed access.
    Member {
        object: Box<Node>,
        property: Box<Node>,
        computed: bool,
    },

    /// Function invocation, e.g. `qux(123,"abc")`. Arguments are restricted
    /// to literals, lookups, roots, and blocks (enforced by the builder).
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
    },

    /// `%key` — resolves `key` against the invocation's lookup side-table
    /// instead of the traversal scope.
    Lookup { key: Box<Node> },

    /// `~key` — resolves `key` against the original root scope instead of
    /// the current scope.
    Root { key: Box<Node> },

    /// `expr?` — guards evaluation: an absent scope or a failure beneath
    /// the guard becomes "no value" instead of an error.
    Existential { expression: Box<Node> },

    /// `{tokens}` — a nested sub-pattern compiled and evaluated at run time
    /// to produce a dynamic property key.
    Block { body: Vec<Token> },
}

impl Node {
    pub fn member(object: Node, property: Node, computed: bool) -> Node {
        Node::Member {
            object: Box::new(object),
            property: Box::new(property),
            computed,
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stmt) in self.body.iter().enumerate() {
            if i > 0 {
                write!(f, ";")?;
            }
            write!(f, "{}", stmt.expression)?;
        }
        Ok(())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{}", format_number(*n)),
            Literal::String(s) => write!(f, "{}", Token::string(s.clone())),
            Literal::Null => write!(f, "null"),
        }
    }
}

impl fmt::Display for ListBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        match self {
            ListBody::Elements(elements) => {
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", element)?;
                }
            }
            ListBody::Range(range) => {
                if let Some(left) = range.left {
                    write!(f, "{}", format_number(left))?;
                }
                write!(f, "..")?;
                if let Some(right) = range.right {
                    write!(f, "{}", format_number(right))?;
                }
            }
        }
        write!(f, "]")
    }
}

impl fmt::Display for Node {
    /// Canonical source text. Reparsing the output yields a structurally
    /// identical tree.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Identifier(name) => write!(f, "{}", name),
            Node::Literal(lit) => write!(f, "{}", lit),
            Node::Array(body) | Node::Sequence(body) => write!(f, "{}", body),
            Node::Member {
                object,
                property,
                computed,
            } => {
                write!(f, "{}", object)?;
                // A sequence already carries its own brackets
                if matches!(property.as_ref(), Node::Sequence(_)) {
                    write!(f, "{}", property)
                } else if *computed {
                    write!(f, "[{}]", property)
                } else {
                    write!(f, ".{}", property)
                }
            }
            Node::Call { callee, args } => {
                write!(f, "{}(", callee)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Node::Lookup { key } => write!(f, "%{}", key),
            Node::Root { key } => write!(f, "~{}", key),
            Node::Existential { expression } => write!(f, "{}?", expression),
            Node::Block { body } => write!(f, "{{{}}}", render_tokens(body)),
        }
    }
}
