//! Query parser.
//!
//! Parses a token stream into a query AST using recursive descent.
//!
//! # Grammar
//!
//! ```text
//! query      → or_expr
//! or_expr    → and_expr ("OR" and_expr)*
//! and_expr   → unary ("AND"? unary)*
//! unary      → "NOT" unary | primary
//! primary    → TERM | WILDCARD | PHRASE | field_expr | "(" or_expr ")"
//! field_expr → FIELD_PREFIX (TERM | WILDCARD | PHRASE | RANGE | "(" or_expr ")")
//! ```
//!
//! # Precedence (highest to lowest)
//!
//! 1. Grouping: `(...)`
//! 2. Field prefix: `field:`
//! 3. Negation: `NOT`, `!`, `-`
//! 4. AND (explicit, or implicit between adjacent clauses)
//! 5. OR

use std::mem;

use crate::{
    ast::{QueryExpr, RangeExpr},
    error::{QueryError, SyntaxError},
    lexer::{Spanned, Token, tokenize_spanned},
};

/// Recursive descent parser for query expressions.
struct Parser {
    /// Token stream to parse, with byte positions.
    tokens: Vec<Spanned>,
    /// Current position in token stream.
    position: usize,
}

impl Parser {
    /// Creates a new parser from a token stream.
    fn new(tokens: Vec<Spanned>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// Parses the token stream into a query expression.
    fn parse(mut self) -> Result<Option<QueryExpr>, SyntaxError> {
        if self.tokens.is_empty() {
            return Ok(None);
        }

        let expr = self.parse_or_expr()?;

        if let Some(token) = self.peek() {
            return Err(self.error(format!("unexpected token: {token:?}")));
        }

        Ok(Some(expr))
    }

    /// Parses: or_expr → and_expr ("OR" and_expr)*
    fn parse_or_expr(&mut self) -> Result<QueryExpr, SyntaxError> {
        let mut left = self.parse_and_expr()?;

        while self.check(&Token::Or) {
            self.advance();
            let right = self.parse_and_expr()?;
            left = QueryExpr::or(vec![left, right]);
        }

        Ok(left)
    }

    /// Parses: and_expr → unary ("AND"? unary)*
    fn parse_and_expr(&mut self) -> Result<QueryExpr, SyntaxError> {
        let mut exprs = vec![self.parse_unary()?];

        loop {
            if self.check(&Token::And) {
                self.advance();
                exprs.push(self.parse_unary()?);
            } else if self.can_start_unary() {
                exprs.push(self.parse_unary()?);
            } else {
                break;
            }
        }

        Ok(QueryExpr::and(exprs))
    }

    /// Checks if the current token can start a unary expression.
    fn can_start_unary(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::Term(_)
                    | Token::Wildcard(_)
                    | Token::Phrase(_)
                    | Token::Not
                    | Token::LParen
                    | Token::FieldPrefix(_)
                    | Token::Range { .. }
            )
        )
    }

    /// Parses: unary → "NOT" unary | primary
    fn parse_unary(&mut self) -> Result<QueryExpr, SyntaxError> {
        if self.check(&Token::Not) {
            self.advance();
            let expr = self.parse_unary()?;
            return Ok(QueryExpr::Not(Box::new(expr)));
        }

        self.parse_primary()
    }

    /// Parses: primary → TERM | WILDCARD | PHRASE | field_expr | "(" or_expr ")"
    fn parse_primary(&mut self) -> Result<QueryExpr, SyntaxError> {
        match self.peek().cloned() {
            Some(Token::Term(_) | Token::Wildcard(_) | Token::Phrase(_)) => {
                Ok(match self.parse_value() {
                    QueryExpr::Wildcard(pieces) if is_match_all(&pieces) => QueryExpr::MatchAll,
                    other => other,
                })
            }
            Some(Token::FieldPrefix(name)) => {
                self.advance();
                self.parse_field_expr(name)
            }
            Some(Token::LParen) => self.parse_group("expected closing parenthesis"),
            Some(Token::RParen) => Err(self.error("unexpected closing parenthesis")),
            Some(Token::Or) => Err(self.error("unexpected OR (needs expression before it)")),
            Some(Token::And) => Err(self.error("unexpected AND (needs expression before it)")),
            Some(Token::Range { .. }) => Err(self.error("a range must follow a field")),
            Some(Token::Not) => Err(self.error("unexpected negation")),
            None => Err(SyntaxError::at_end("unexpected end of query")),
        }
    }

    /// Parses the expression after a field prefix.
    fn parse_field_expr(&mut self, name: String) -> Result<QueryExpr, SyntaxError> {
        let expr = match self.peek().cloned() {
            Some(Token::Term(_) | Token::Wildcard(_) | Token::Phrase(_)) => self.parse_value(),
            Some(Token::Range {
                lower,
                upper,
                include_lower,
                include_upper,
            }) => {
                self.advance();
                QueryExpr::Range(RangeExpr {
                    lower,
                    upper,
                    include_lower,
                    include_upper,
                })
            }
            Some(Token::LParen) => {
                self.parse_group("expected closing parenthesis after field expression")?
            }
            _ => {
                return Err(self.error(format!(
                    "expected term, phrase, range, or group after '{name}:'"
                )));
            }
        };

        if name == "*" && expr == QueryExpr::Wildcard(vec![String::new(), String::new()]) {
            return Ok(QueryExpr::MatchAll);
        }

        Ok(QueryExpr::field(name, expr))
    }

    /// Parses a TERM, WILDCARD, or PHRASE token, consuming it.
    fn parse_value(&mut self) -> QueryExpr {
        let expr = match self.peek().cloned() {
            Some(Token::Term(text)) => QueryExpr::Term(text),
            Some(Token::Wildcard(pieces)) => QueryExpr::Wildcard(pieces),
            Some(Token::Phrase(text)) => QueryExpr::Phrase(text),
            _ => unreachable!("parse_value called on a non-value token"),
        };
        self.advance();
        expr
    }

    /// Parses a parenthesized group, consuming the surrounding parentheses.
    fn parse_group(&mut self, missing_rparen_msg: &str) -> Result<QueryExpr, SyntaxError> {
        self.advance(); // (
        let inner = self.parse_or_expr()?;

        if !self.check(&Token::RParen) {
            return Err(self.error(missing_rparen_msg));
        }
        self.advance(); // )

        Ok(inner)
    }

    /// Builds an error pointing at the current token.
    fn error(&self, message: impl Into<String>) -> SyntaxError {
        match self.tokens.get(self.position) {
            Some((_, pos)) => SyntaxError::at(message, *pos),
            None => SyntaxError::at_end(message),
        }
    }

    /// Returns the current token without consuming it.
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|(token, _)| token)
    }

    /// Checks if the current token matches the given token.
    fn check(&self, token: &Token) -> bool {
        self.peek()
            .is_some_and(|t| mem::discriminant(t) == mem::discriminant(token))
    }

    /// Advances to the next token.
    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }
}

/// Whether wildcard pieces are a lone `*`.
fn is_match_all(pieces: &[String]) -> bool {
    pieces.iter().all(String::is_empty)
}

/// Parses a query string into an AST.
///
/// Returns `Ok(None)` for empty queries, `Ok(Some(expr))` for valid queries,
/// or `Err(QueryError)` for invalid syntax.
pub fn parse(input: &str) -> Result<Option<QueryExpr>, QueryError> {
    tokenize_spanned(input)
        .and_then(|tokens| Parser::new(tokens).parse())
        .map_err(|err| QueryError::new(err, input))
}
