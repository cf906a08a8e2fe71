use std::fmt;

/// Classification of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Field name or function name
    ///
    /// Must start with a letter, `_`, or `$`, followed by letters, digits,
    /// `_`, or `$`.
    ///
    /// # Examples
    /// ```text
    /// user
    /// item_count
    /// $internal
    /// ```
    Identifier,

    /// Numeric literal, standard float syntax
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 3.14
    /// ```
    Numeric,

    /// String literal enclosed in single or double quotes
    ///
    /// # Examples
    /// ```text
    /// "hello"
    /// 'item #1'
    /// ```
    String,

    /// The reserved literal keyword `null`
    Null,

    /// One of the punctuator characters
    ///
    /// ```text
    /// .  ,  ?  (  )  [  ]  {  }  %  ~  ;
    /// ```
    Punctuator,
}

/// A single lexical token: a kind plus the raw text it matched.
///
/// Tokens are produced once per source string by the [`Lexer`](crate::Lexer)
/// and consumed destructively by the [`Builder`](crate::Builder), which pops
/// them from the end of the list.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn identifier(text: impl Into<String>) -> Self {
        Token {
            kind: TokenKind::Identifier,
            text: text.into(),
        }
    }

    pub fn numeric(text: impl Into<String>) -> Self {
        Token {
            kind: TokenKind::Numeric,
            text: text.into(),
        }
    }

    pub fn string(text: impl Into<String>) -> Self {
        Token {
            kind: TokenKind::String,
            text: text.into(),
        }
    }

    pub fn null() -> Self {
        Token {
            kind: TokenKind::Null,
            text: "null".to_string(),
        }
    }

    pub fn punctuator(ch: char) -> Self {
        Token {
            kind: TokenKind::Punctuator,
            text: ch.to_string(),
        }
    }

    /// True if this is the given punctuator character.
    pub fn is_punctuator(&self, ch: char) -> bool {
        self.kind == TokenKind::Punctuator && self.text.chars().eq(std::iter::once(ch))
    }
}

impl fmt::Display for Token {
    /// Renders the token back to canonical source text. String tokens are
    /// re-quoted and escaped; everything else prints verbatim.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::String => {
                write!(f, "\"")?;
                for ch in self.text.chars() {
                    match ch {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\r' => write!(f, "\\r")?,
                        '\t' => write!(f, "\\t")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                write!(f, "\"")
            }
            _ => write!(f, "{}", self.text),
        }
    }
}

/// Renders a token list back to canonical source text. Used for block
/// bodies, both as a cache key and for canonical printing. Tokens are
/// separated by single spaces: adjacent identifiers like `a b` would
/// otherwise merge into one token on re-lexing, and two distinct blocks
/// could collide on the same cache key.
pub fn render_tokens(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
