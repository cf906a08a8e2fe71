use crate::ast::Token;
use crate::builder::ParseError;

/// Character-level scanner for keypath source text.
///
/// Produces the ordered token list consumed (from the end) by the
/// [`Builder`](crate::Builder). Tokenization happens once per source string;
/// the facade caches the result per pattern.
pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

const PUNCTUATORS: &[char] = &['.', ',', '?', '(', ')', '[', ']', '{', '}', '%', '~', ';'];

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Scans the entire input into a token list.
    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self, quote: char) -> Result<String, ParseError> {
        let start = self.position;
        let mut result = String::new();
        self.advance(); // consume opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    self.advance();
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some('"') => result.push('"'),
                        Some('\'') => result.push('\''),
                        Some('\\') => result.push('\\'),
                        Some(ch) => {
                            return Err(ParseError::InvalidEscape {
                                ch,
                                position: self.position,
                            });
                        }
                        None => return Err(ParseError::UnterminatedString { position: start }),
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(ParseError::UnterminatedString { position: start })
    }

    fn read_number(&mut self) -> Result<Token, ParseError> {
        let start = self.position;
        let mut number = String::new();
        let mut is_float = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.'
                && !is_float
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                // A lone or doubled dot stays punctuation, which is what
                // keeps `1..3` lexing as three tokens.
                is_float = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if number.parse::<f64>().is_err() {
            return Err(ParseError::InvalidNumber {
                text: number,
                position: start,
            });
        }
        Ok(Token::numeric(number))
    }

    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        self.skip_whitespace();

        match self.current_char() {
            None => Ok(None),
            Some(ch) if PUNCTUATORS.contains(&ch) => {
                self.advance();
                Ok(Some(Token::punctuator(ch)))
            }
            Some('"') => Ok(Some(Token::string(self.read_string('"')?))),
            Some('\'') => Ok(Some(Token::string(self.read_string('\'')?))),
            Some(ch) if ch.is_alphabetic() || ch == '_' || ch == '$' => {
                let ident = self.read_identifier();
                match ident.as_str() {
                    "null" => Ok(Some(Token::null())),
                    _ => Ok(Some(Token::identifier(ident))),
                }
            }
            Some(ch) if ch.is_ascii_digit() => Ok(Some(self.read_number()?)),
            Some(ch) => Err(ParseError::UnexpectedCharacter {
                ch,
                position: self.position,
            }),
        }
    }
}

#[test]
fn test_chain_tokens() {
    let tokens = Lexer::new("foo.bar[100]").tokenize().unwrap();
    assert_eq!(
        tokens,
        vec![
            Token::identifier("foo"),
            Token::punctuator('.'),
            Token::identifier("bar"),
            Token::punctuator('['),
            Token::numeric("100"),
            Token::punctuator(']'),
        ]
    );
}

#[test]
fn test_range_is_not_a_float() {
    let tokens = Lexer::new("[1..3]").tokenize().unwrap();
    assert_eq!(
        tokens,
        vec![
            Token::punctuator('['),
            Token::numeric("1"),
            Token::punctuator('.'),
            Token::punctuator('.'),
            Token::numeric("3"),
            Token::punctuator(']'),
        ]
    );
}

#[test]
fn test_null_keyword() {
    let tokens = Lexer::new("null").tokenize().unwrap();
    assert_eq!(tokens, vec![Token::null()]);
}
