//! Query abstract syntax tree.
//!
//! Represents a parsed backend query string. Escapes have already been resolved, so
//! every string in the tree is the literal text the analyst meant.

use std::fmt;

/// An inclusive or exclusive range over a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeExpr {
    /// Lower bound, `None` when open (`*`).
    pub lower: Option<String>,
    /// Upper bound, `None` when open (`*`).
    pub upper: Option<String>,
    /// Whether the lower bound itself matches (`[`) or not (`{`).
    pub include_lower: bool,
    /// Whether the upper bound itself matches (`]`) or not (`}`).
    pub include_upper: bool,
}

/// A parsed query expression.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpr {
    /// Matches everything (`*` on its own).
    MatchAll,

    /// A literal term.
    Term(String),

    /// A term containing unescaped `*` wildcards, split into the literal pieces between them.
    Wildcard(Vec<String>),

    /// A quoted exact phrase.
    Phrase(String),

    /// A range; only valid under a field.
    Range(RangeExpr),

    /// Negation: results must NOT match this expression.
    Not(Box<Self>),

    /// Conjunction: all sub-expressions must match.
    And(Vec<Self>),

    /// Disjunction: at least one sub-expression must match.
    Or(Vec<Self>),

    /// Field-scoped query.
    Field {
        /// Field name with escapes resolved (e.g. `source:type`).
        name: String,
        /// Expression to match within that field.
        expr: Box<Self>,
    },
}

impl QueryExpr {
    /// Creates an And expression, flattening nested Ands.
    pub fn and(exprs: Vec<Self>) -> Self {
        let mut flattened: Vec<Self> = exprs
            .into_iter()
            .flat_map(|e| match e {
                Self::And(inner) => inner,
                other => vec![other],
            })
            .collect();

        match flattened.len() {
            1 => flattened.remove(0),
            _ => Self::And(flattened),
        }
    }

    /// Creates an Or expression, flattening nested Ors.
    pub fn or(exprs: Vec<Self>) -> Self {
        let mut flattened: Vec<Self> = exprs
            .into_iter()
            .flat_map(|e| match e {
                Self::Or(inner) => inner,
                other => vec![other],
            })
            .collect();

        match flattened.len() {
            1 => flattened.remove(0),
            _ => Self::Or(flattened),
        }
    }

    /// Creates a field-scoped expression.
    pub fn field(name: impl Into<String>, expr: Self) -> Self {
        Self::Field {
            name: name.into(),
            expr: Box::new(expr),
        }
    }

    /// Whether a wildcard pattern matches `text`.
    ///
    /// Pieces must appear in order; the first is a prefix and the last a suffix.
    pub fn wildcard_matches(pieces: &[String], text: &str) -> bool {
        let Some((first, rest)) = pieces.split_first() else {
            return text.is_empty();
        };
        let Some(mut remaining) = text.strip_prefix(first.as_str()) else {
            return false;
        };
        let Some((last, middle)) = rest.split_last() else {
            return remaining.is_empty();
        };
        for piece in middle {
            match remaining.find(piece.as_str()) {
                Some(pos) => remaining = &remaining[pos + piece.len()..],
                None => return false,
            }
        }
        remaining.ends_with(last.as_str())
    }

    /// Formats the expression as a tree structure with the given indentation level.
    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let prefix = "  ".repeat(indent);
        match self {
            Self::MatchAll => writeln!(f, "{prefix}MatchAll"),
            Self::Term(s) => writeln!(f, "{prefix}Term({s:?})"),
            Self::Wildcard(pieces) => writeln!(f, "{prefix}Wildcard({:?})", pieces.join("*")),
            Self::Phrase(s) => writeln!(f, "{prefix}Phrase({s:?})"),
            Self::Range(range) => writeln!(
                f,
                "{prefix}Range({}{:?} TO {:?}{})",
                if range.include_lower { '[' } else { '{' },
                range.lower,
                range.upper,
                if range.include_upper { ']' } else { '}' },
            ),
            Self::Not(inner) => {
                writeln!(f, "{prefix}Not")?;
                inner.fmt_tree(f, indent + 1)
            }
            Self::And(exprs) => {
                writeln!(f, "{prefix}And")?;
                for expr in exprs {
                    expr.fmt_tree(f, indent + 1)?;
                }
                Ok(())
            }
            Self::Or(exprs) => {
                writeln!(f, "{prefix}Or")?;
                for expr in exprs {
                    expr.fmt_tree(f, indent + 1)?;
                }
                Ok(())
            }
            Self::Field { name, expr } => {
                writeln!(f, "{prefix}Field({name:?})")?;
                expr.fmt_tree(f, indent + 1)
            }
        }
    }
}

impl fmt::Display for QueryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pieces(pattern: &str) -> Vec<String> {
        pattern.split('*').map(String::from).collect()
    }

    #[test]
    fn and_flattens_nested() {
        let nested = QueryExpr::and(vec![
            QueryExpr::Term("a".into()),
            QueryExpr::And(vec![
                QueryExpr::Term("b".into()),
                QueryExpr::Term("c".into()),
            ]),
        ]);

        assert_eq!(
            nested,
            QueryExpr::And(vec![
                QueryExpr::Term("a".into()),
                QueryExpr::Term("b".into()),
                QueryExpr::Term("c".into()),
            ])
        );
    }

    #[test]
    fn single_element_unwraps() {
        assert_eq!(
            QueryExpr::and(vec![QueryExpr::Term("a".into())]),
            QueryExpr::Term("a".into())
        );
        assert_eq!(
            QueryExpr::or(vec![QueryExpr::Term("a".into())]),
            QueryExpr::Term("a".into())
        );
    }

    #[test]
    fn wildcard_prefix_suffix() {
        assert!(QueryExpr::wildcard_matches(&pieces("bro*"), "bro_index"));
        assert!(!QueryExpr::wildcard_matches(&pieces("bro*"), "snort"));
        assert!(QueryExpr::wildcard_matches(&pieces("*.1"), "10.0.0.1"));
        assert!(QueryExpr::wildcard_matches(&pieces("*"), "anything"));
        assert!(QueryExpr::wildcard_matches(&pieces("*"), ""));
    }

    #[test]
    fn wildcard_middle_pieces_in_order() {
        assert!(QueryExpr::wildcard_matches(&pieces("a*b*c"), "aXbYc"));
        assert!(!QueryExpr::wildcard_matches(&pieces("a*c*b"), "aXbYc"));
        assert!(!QueryExpr::wildcard_matches(&pieces("ab*ba"), "aba"));
    }

    #[test]
    fn tree_display() {
        let expr = QueryExpr::and(vec![
            QueryExpr::field("source:type", QueryExpr::Term("bro".into())),
            QueryExpr::Not(Box::new(QueryExpr::MatchAll)),
        ]);
        let shown = expr.to_string();
        assert!(shown.contains("Field(\"source:type\")"));
        assert!(shown.contains("    Term(\"bro\")"));
        assert!(shown.contains("  Not"));
    }
}
