//! Query lexer (tokenizer).
//!
//! Converts a backend query string into a stream of tokens for the parser. Backslash
//! escapes are resolved here, so every string a token carries is literal text.

use std::{iter::Peekable, mem, str::Chars};

use crate::error::SyntaxError;

/// A token in the query language.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A bare word with escapes resolved.
    Term(String),

    /// A word containing unescaped `*`, split into the literal pieces around them.
    Wildcard(Vec<String>),

    /// A quoted phrase (the quotes are stripped, escapes resolved).
    Phrase(String),

    /// Field prefix (e.g., `source\:type:` produces `FieldPrefix("source:type")`).
    FieldPrefix(String),

    /// A bracketed range such as `[10 TO *}`.
    Range {
        /// Lower bound, `None` for `*`.
        lower: Option<String>,
        /// Upper bound, `None` for `*`.
        upper: Option<String>,
        /// `[` rather than `{`.
        include_lower: bool,
        /// `]` rather than `}`.
        include_upper: bool,
    },

    /// `AND` or `&&`.
    And,

    /// `OR` or `||`.
    Or,

    /// `NOT`, `!`, or a leading `-`.
    Not,

    /// Left parenthesis.
    LParen,

    /// Right parenthesis.
    RParen,
}

/// A token with the byte position it started at.
pub type Spanned = (Token, usize);

/// A word as read from the input, before it is classified.
#[derive(Default)]
struct Word {
    /// Literal pieces separated by unescaped `*`.
    pieces: Vec<String>,
    /// Piece currently being read.
    current: String,
    /// Whether any character was escaped.
    escaped: bool,
}

impl Word {
    /// Whether nothing at all was read.
    fn is_empty(&self) -> bool {
        self.pieces.is_empty() && self.current.is_empty() && !self.escaped
    }

    /// Classifies the word as a keyword, term, or wildcard.
    fn into_token(mut self) -> Token {
        if !self.pieces.is_empty() {
            self.pieces.push(self.current);
            return Token::Wildcard(self.pieces);
        }
        if !self.escaped {
            match self.current.as_str() {
                "AND" => return Token::And,
                "OR" => return Token::Or,
                "NOT" => return Token::Not,
                _ => {}
            }
        }
        Token::Term(self.current)
    }

    /// The word read as a field name. Wildcards in field names are kept literally.
    fn into_field_name(mut self) -> String {
        if self.pieces.is_empty() {
            return self.current;
        }
        self.pieces.push(self.current);
        self.pieces.join("*")
    }
}

/// Tokenizes a query string.
struct Lexer<'a> {
    /// The whole query, for lookahead past the next character.
    input: &'a str,
    /// Character iterator with one-character lookahead.
    chars: Peekable<Chars<'a>>,
    /// Current byte position in input.
    position: usize,
    /// Whether the previous token was a field prefix.
    after_field: bool,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().peekable(),
            position: 0,
            after_field: false,
        }
    }

    /// Tokenizes the entire input, returning all tokens or an error.
    fn tokenize(mut self) -> Result<Vec<Spanned>, SyntaxError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();
            let start = self.position;
            let Some(token) = self.next_token()? else {
                break;
            };
            self.after_field = matches!(token, Token::FieldPrefix(_));
            tokens.push((token, start));
        }

        Ok(tokens)
    }

    /// Returns the next token, or None if at end of input.
    fn next_token(&mut self) -> Result<Option<Token>, SyntaxError> {
        let Some(&ch) = self.chars.peek() else {
            return Ok(None);
        };

        let rest = &self.input[self.position..];
        if rest.starts_with("&&") || rest.starts_with("||") {
            self.advance();
            self.advance();
            return Ok(Some(if ch == '&' { Token::And } else { Token::Or }));
        }

        match ch {
            '"' => self.read_phrase().map(Some),
            '(' => {
                self.advance();
                Ok(Some(Token::LParen))
            }
            ')' => {
                self.advance();
                Ok(Some(Token::RParen))
            }
            '[' | '{' => self.read_range().map(Some),
            '-' | '!' if !self.after_field => {
                self.advance();
                Ok(Some(Token::Not))
            }
            '+' if !self.after_field => {
                // Required-clause marker; every clause is already required under AND.
                self.advance();
                self.skip_whitespace();
                self.next_token()
            }
            _ => self.read_word(),
        }
    }

    /// Reads a quoted phrase.
    fn read_phrase(&mut self) -> Result<Token, SyntaxError> {
        let start_pos = self.position;
        self.advance(); // opening quote

        let mut content = String::new();

        loop {
            match self.chars.peek().copied() {
                Some('"') => {
                    self.advance();
                    return Ok(Token::Phrase(content));
                }
                Some('\\') => {
                    self.advance();
                    let escaped = self.read_escaped(start_pos)?;
                    content.push(escaped);
                }
                Some(ch) => {
                    content.push(ch);
                    self.advance();
                }
                None => return Err(SyntaxError::at("unclosed quote", start_pos)),
            }
        }
    }

    /// Reads a word: a term, keyword, wildcard, or field prefix.
    fn read_word(&mut self) -> Result<Option<Token>, SyntaxError> {
        let start_pos = self.position;
        let mut word = Word::default();

        while let Some(&ch) = self.chars.peek() {
            match ch {
                c if c.is_whitespace() => break,
                '(' | ')' | '"' => break,
                '\\' => {
                    self.advance();
                    let escaped = self.read_escaped(start_pos)?;
                    word.current.push(escaped);
                    word.escaped = true;
                }
                ':' => {
                    self.advance();
                    if word.is_empty() {
                        continue;
                    }
                    let name = word.into_field_name();
                    return Ok(Some(Token::FieldPrefix(name)));
                }
                '*' => {
                    self.advance();
                    word.pieces.push(mem::take(&mut word.current));
                }
                _ => {
                    word.current.push(ch);
                    self.advance();
                }
            }
        }

        if word.is_empty() {
            self.skip_whitespace();
            return self.next_token();
        }

        Ok(Some(word.into_token()))
    }

    /// Reads a range body after `[` or `{`, through the closing `]` or `}`.
    fn read_range(&mut self) -> Result<Token, SyntaxError> {
        let start_pos = self.position;
        let include_lower = self.chars.peek() == Some(&'[');
        self.advance();

        self.skip_whitespace();
        let lower = self.read_bound(start_pos)?;
        self.skip_whitespace();

        if !self.input[self.position..].starts_with("TO") {
            return Err(SyntaxError::at("expected TO in range", self.position));
        }
        self.advance();
        self.advance();
        self.skip_whitespace();

        let upper = self.read_bound(start_pos)?;
        self.skip_whitespace();

        let include_upper = match self.chars.peek() {
            Some(']') => true,
            Some('}') => false,
            _ => return Err(SyntaxError::at("unclosed range", start_pos)),
        };
        self.advance();

        Ok(Token::Range {
            lower,
            upper,
            include_lower,
            include_upper,
        })
    }

    /// Reads one range bound; `*` is an open bound.
    fn read_bound(&mut self, range_start: usize) -> Result<Option<String>, SyntaxError> {
        let mut bound = String::new();
        let mut escaped = false;

        while let Some(&ch) = self.chars.peek() {
            match ch {
                c if c.is_whitespace() => break,
                ']' | '}' => break,
                '\\' => {
                    self.advance();
                    bound.push(self.read_escaped(range_start)?);
                    escaped = true;
                }
                _ => {
                    bound.push(ch);
                    self.advance();
                }
            }
        }

        if bound.is_empty() && !escaped {
            return Err(SyntaxError::at("unclosed range", range_start));
        }

        Ok((escaped || bound != "*").then_some(bound))
    }

    /// Reads the character after a backslash.
    fn read_escaped(&mut self, token_start: usize) -> Result<char, SyntaxError> {
        match self.chars.peek().copied() {
            Some(ch) => {
                self.advance();
                Ok(ch)
            }
            None => Err(SyntaxError::at("trailing backslash", token_start)),
        }
    }

    /// Skips whitespace characters.
    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.chars.next_if(|c| c.is_whitespace()) {
            self.position += ch.len_utf8();
        }
    }

    /// Advances to the next character.
    fn advance(&mut self) {
        if let Some(ch) = self.chars.next() {
            self.position += ch.len_utf8();
        }
    }
}

/// Tokenizes with the byte position each token started at.
pub fn tokenize_spanned(input: &str) -> Result<Vec<Spanned>, SyntaxError> {
    Lexer::new(input).tokenize()
}

/// Convenience function to tokenize a query string.
pub fn tokenize(input: &str) -> Result<Vec<Token>, SyntaxError> {
    Ok(tokenize_spanned(input)?
        .into_iter()
        .map(|(token, _)| token)
        .collect())
}
