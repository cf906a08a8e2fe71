use crate::ast::{ExpressionStatement, ListBody, Literal, Node, Program, RangeBounds, Token, TokenKind};
use crate::lexer::Lexer;

/// Errors raised while tokenizing or parsing a pattern.
///
/// All of these are fatal to the parse. There is no recovery mode and no
/// partial result; the first structural problem aborts the whole build.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// A character the lexer does not recognize.
    UnexpectedCharacter { ch: char, position: usize },

    /// A string literal with no closing quote.
    UnterminatedString { position: usize },

    /// An escape sequence the lexer does not recognize.
    InvalidEscape { ch: char, position: usize },

    /// A numeric literal that does not parse as a number.
    InvalidNumber { text: String, position: usize },

    /// The token stream ended while a construct was still open.
    UnexpectedEndOfInput,

    /// A token that cannot appear where it did.
    UnexpectedToken { token: String },

    /// A closing bracket with no matching opener (or the reverse).
    UnmatchedBracket { bracket: char },

    /// A range with both bounds absent, i.e. `[..]`.
    EmptyRange,

    /// A call argument that is not a literal, lookup, root, or block.
    InvalidCallArgument { found: String },

    /// Leftover tokens after a complete statement.
    TrailingTokens { token: String },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::UnexpectedCharacter { ch, position } => {
                write!(f, "Unexpected character '{}' at position {}", ch, position)
            }
            ParseError::UnterminatedString { position } => {
                write!(f, "Unterminated string starting at position {}", position)
            }
            ParseError::InvalidEscape { ch, position } => {
                write!(f, "Invalid escape sequence '\\{}' at position {}", ch, position)
            }
            ParseError::InvalidNumber { text, position } => {
                write!(f, "Invalid number '{}' at position {}", text, position)
            }
            ParseError::UnexpectedEndOfInput => write!(f, "Unexpected end of input"),
            ParseError::UnexpectedToken { token } => write!(f, "Unexpected token '{}'", token),
            ParseError::UnmatchedBracket { bracket } => {
                write!(f, "Unmatched bracket '{}'", bracket)
            }
            ParseError::EmptyRange => write!(f, "Range requires at least one bound"),
            ParseError::InvalidCallArgument { found } => write!(
                f,
                "Invalid call argument '{}': arguments must be literals, lookups, roots, or blocks",
                found
            ),
            ParseError::TrailingTokens { token } => {
                write!(f, "Unexpected trailing token '{}'", token)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Recursive-descent parser for keypath expressions.
///
/// The token list is treated as a stack and consumed from the end: the
/// parser always classifies the *trailing* construct of the remaining input
/// first, builds its node, and then recursively parses whatever sits to its
/// left as that node's operand. Because every suffix of the grammar (a
/// `.property`, a `[computed]` access, a `(call)`) modifies what precedes
/// it, this yields correctly left-associated trees - `a.b.c` parses to
/// `Member(Member(a, b), c)` - with no precedence tables, no lookahead, and
/// no backtracking.
pub struct Builder {
    tokens: Vec<Token>,
}

impl Builder {
    /// Tokenizes and parses a source pattern in one step.
    pub fn parse(source: &str) -> Result<Program, ParseError> {
        Builder::with_tokens(Lexer::new(source).tokenize()?).build()
    }

    /// Wraps an already-tokenized pattern. The tokens are consumed by
    /// [`build`](Builder::build).
    pub fn with_tokens(tokens: Vec<Token>) -> Self {
        Builder { tokens }
    }

    /// Parses the token stream into a [`Program`].
    pub fn build(&mut self) -> Result<Program, ParseError> {
        let mut body = Vec::new();
        while !self.tokens.is_empty() {
            if self.last_is(';') {
                self.tokens.pop();
                continue;
            }
            let expression = self.expression()?;
            // Statements are parsed back to front
            body.insert(0, ExpressionStatement { expression });

            if let Some(token) = self.tokens.last() {
                if !token.is_punctuator(';') {
                    return Err(ParseError::TrailingTokens {
                        token: token.to_string(),
                    });
                }
            }
        }
        Ok(Program { body })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.last()
    }

    fn pop(&mut self) -> Result<Token, ParseError> {
        self.tokens.pop().ok_or(ParseError::UnexpectedEndOfInput)
    }

    fn last_is(&self, ch: char) -> bool {
        self.peek().is_some_and(|t| t.is_punctuator(ch))
    }

    /// Pops the opening bracket that closes (right to left) the current
    /// construct.
    fn expect_opener(&mut self, opener: char) -> Result<(), ParseError> {
        match self.tokens.pop() {
            Some(token) if token.is_punctuator(opener) => Ok(()),
            Some(token) => Err(ParseError::UnexpectedToken {
                token: token.to_string(),
            }),
            None => Err(ParseError::UnmatchedBracket {
                bracket: match opener {
                    '[' => ']',
                    '(' => ')',
                    _ => '}',
                },
            }),
        }
    }

    /// The single top-level rule. Consumes the trailing construct of the
    /// remaining tokens, then extends it leftward into a member chain.
    fn expression(&mut self) -> Result<Node, ParseError> {
        let token = self.pop()?;
        match token.kind {
            TokenKind::Identifier => {
                let node = self.suffixed(Node::Identifier(token.text))?;
                self.chain(node, false)
            }
            TokenKind::Numeric => {
                let value = numeric_value(&token)?;
                let node = self.suffixed(Node::Literal(Literal::Number(value)))?;
                self.chain(node, false)
            }
            TokenKind::String => {
                let node = self.suffixed(Node::Literal(Literal::String(token.text)))?;
                self.chain(node, false)
            }
            TokenKind::Null => {
                let node = self.suffixed(Node::Literal(Literal::Null))?;
                self.chain(node, false)
            }
            TokenKind::Punctuator => match token.text.as_str() {
                "]" => {
                    let node = self.list()?;
                    self.chain(node, true)
                }
                ")" => {
                    let node = self.call()?;
                    self.chain(node, false)
                }
                "}" => {
                    let block = self.block()?;
                    let node = self.suffixed(block)?;
                    self.chain(node, false)
                }
                "?" => {
                    let expression = Box::new(self.expression()?);
                    self.chain(Node::Existential { expression }, false)
                }
                "[" | "(" | "{" => Err(ParseError::UnmatchedBracket {
                    bracket: token.text.chars().next().unwrap_or('['),
                }),
                _ => Err(ParseError::UnexpectedToken {
                    token: token.to_string(),
                }),
            },
        }
    }

    /// Applies the `%`/`~` operators that bind tighter than member and call
    /// suffixes. They attach only to atomic values (identifiers, literals,
    /// blocks), and in suffix-first order they sit immediately to the left
    /// of the key they operate on.
    fn suffixed(&mut self, node: Node) -> Result<Node, ParseError> {
        if self.last_is('%') {
            self.tokens.pop();
            Ok(Node::Lookup {
                key: Box::new(node),
            })
        } else if self.last_is('~') {
            self.tokens.pop();
            Ok(Node::Root {
                key: Box::new(node),
            })
        } else {
            Ok(node)
        }
    }

    /// Extends a freshly built trailing construct leftward: a `.` or plain
    /// adjacency (`[100]qux`, `(...)baz`) means the construct is the
    /// property of a member whose object is everything to its left.
    fn chain(&mut self, node: Node, bracketed: bool) -> Result<Node, ParseError> {
        let computed = bracketed || !matches!(node, Node::Identifier(_));
        match self.peek() {
            None => Ok(node),
            Some(t)
                if t.is_punctuator(',')
                    || t.is_punctuator(';')
                    || t.is_punctuator('[')
                    || t.is_punctuator('(')
                    || t.is_punctuator('{') =>
            {
                // Boundary of an enclosing list, call, or block
                Ok(node)
            }
            Some(t) if t.is_punctuator('.') => {
                self.tokens.pop();
                Ok(Node::member(self.expression()?, node, computed))
            }
            Some(_) => Ok(Node::member(self.expression()?, node, computed)),
        }
    }

    /// Parses a bracketed list after its `]` has been consumed, including
    /// the matching `[`. Whether the list is an array, a sequence, or a
    /// transparent single element depends on its position: a list with no
    /// tokens remaining to its left is the entire expression and becomes a
    /// first-class array; embedded lists become fan-out sequences (or shed
    /// their brackets when they hold a single element).
    fn list(&mut self) -> Result<Node, ParseError> {
        let body = self.list_body()?;
        if self.tokens.is_empty() {
            return Ok(Node::Array(body));
        }
        match body {
            ListBody::Elements(mut elements) if elements.len() == 1 => match elements.pop() {
                Some(element) => Ok(element),
                None => unreachable!(),
            },
            body => Ok(Node::Sequence(body)),
        }
    }

    fn list_body(&mut self) -> Result<ListBody, ParseError> {
        if let Some(range) = self.try_range()? {
            return Ok(range);
        }

        if self.last_is('[') {
            self.tokens.pop();
            return Ok(ListBody::Elements(Vec::new()));
        }

        let mut elements = Vec::new();
        loop {
            let element = self.expression()?;
            elements.insert(0, element);

            if self.last_is(',') {
                self.tokens.pop();
                continue;
            }
            self.expect_opener('[')?;
            break;
        }
        Ok(ListBody::Elements(elements))
    }

    /// Range detection: right to left, an optional numeric bound followed
    /// by `..` marks the list as a range. `[1..3]`, `[5..]`, and `[..7]`
    /// are ranges; `[..]` is an error.
    fn try_range(&mut self) -> Result<Option<ListBody>, ParseError> {
        let n = self.tokens.len();
        let bound_last = n >= 1 && self.tokens[n - 1].kind == TokenKind::Numeric;
        let offset = if bound_last { 1 } else { 0 };
        let dotted = n >= offset + 2
            && self.tokens[n - offset - 1].is_punctuator('.')
            && self.tokens[n - offset - 2].is_punctuator('.');
        if !dotted {
            return Ok(None);
        }

        let right = if bound_last {
            let token = self.pop()?;
            Some(numeric_value(&token)?)
        } else {
            None
        };
        self.tokens.pop();
        self.tokens.pop();
        let left = match self.peek() {
            Some(token) if token.kind == TokenKind::Numeric => {
                let token = self.pop()?;
                Some(numeric_value(&token)?)
            }
            _ => None,
        };
        self.expect_opener('[')?;

        if left.is_none() && right.is_none() {
            return Err(ParseError::EmptyRange);
        }
        Ok(Some(ListBody::Range(RangeBounds { left, right })))
    }

    /// Parses a call after its `)` has been consumed: the argument list,
    /// the matching `(`, and then the callee chain to the left.
    fn call(&mut self) -> Result<Node, ParseError> {
        let mut args = Vec::new();
        if self.last_is('(') {
            self.tokens.pop();
        } else {
            loop {
                let arg = self.expression()?;
                if !valid_call_argument(&arg) {
                    return Err(ParseError::InvalidCallArgument {
                        found: arg.to_string(),
                    });
                }
                args.insert(0, arg);

                if self.last_is(',') {
                    self.tokens.pop();
                    continue;
                }
                self.expect_opener('(')?;
                break;
            }
        }

        // Calls are always applied to something; a bare `(...)` cannot
        // stand on its own.
        let callee = Box::new(self.expression()?);
        Ok(Node::Call { callee, args })
    }

    /// Captures the raw tokens of a `{...}` block, nesting-aware. The body
    /// is kept as tokens and compiled later by the interpreter.
    fn block(&mut self) -> Result<Node, ParseError> {
        let mut nesting = 0usize;
        let mut body = Vec::new();
        loop {
            let token = match self.tokens.pop() {
                Some(token) => token,
                None => return Err(ParseError::UnmatchedBracket { bracket: '}' }),
            };
            if token.is_punctuator('{') {
                if nesting == 0 {
                    break;
                }
                nesting -= 1;
            } else if token.is_punctuator('}') {
                nesting += 1;
            }
            body.push(token);
        }
        body.reverse();
        Ok(Node::Block { body })
    }
}

fn numeric_value(token: &Token) -> Result<f64, ParseError> {
    token
        .text
        .parse::<f64>()
        .map_err(|_| ParseError::UnexpectedToken {
            token: token.to_string(),
        })
}

fn valid_call_argument(node: &Node) -> bool {
    matches!(
        node,
        Node::Literal(_) | Node::Lookup { .. } | Node::Root { .. } | Node::Block { .. }
    )
}
