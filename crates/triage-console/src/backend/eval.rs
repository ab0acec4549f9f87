//! Evaluates parsed queries against alerts held in memory.

use std::cmp::Ordering;

use triage_query::{ALERT_STATUS_FIELD, Alert, FieldValue, ID_FIELD, QueryExpr, RangeExpr, UID_FIELD};

/// Whether `alert` satisfies `expr`.
///
/// Unscoped terms match any source field. Terms match a whole value or one of its
/// alphanumeric tokens, ignoring ASCII case; phrases match a substring.
pub fn matches(expr: &QueryExpr, alert: &Alert) -> bool {
    eval(expr, alert, None)
}

/// The value of `field` on `alert`, including the id and status pseudo-fields.
pub fn field_value(alert: &Alert, field: &str) -> Option<FieldValue> {
    match field {
        ID_FIELD | UID_FIELD => Some(FieldValue::Text(alert.id.clone())),
        ALERT_STATUS_FIELD => Some(FieldValue::Text(alert.status.as_str().to_string())),
        _ => alert.field(field).cloned(),
    }
}

/// Evaluates `expr` within the scope of `field`.
fn eval(expr: &QueryExpr, alert: &Alert, field: Option<&str>) -> bool {
    match expr {
        QueryExpr::MatchAll => true,
        QueryExpr::Term(term) => values(alert, field).iter().any(|v| term_matches(v, term)),
        QueryExpr::Wildcard(pieces) => {
            let pieces: Vec<String> = pieces.iter().map(|p| p.to_lowercase()).collect();
            values(alert, field)
                .iter()
                .any(|v| QueryExpr::wildcard_matches(&pieces, &v.to_string().to_lowercase()))
        }
        QueryExpr::Phrase(phrase) => {
            let phrase = phrase.to_lowercase();
            values(alert, field)
                .iter()
                .any(|v| v.to_string().to_lowercase().contains(&phrase))
        }
        QueryExpr::Range(range) => {
            field.is_some() && values(alert, field).iter().any(|v| in_range(v, range))
        }
        QueryExpr::Not(inner) => !eval(inner, alert, field),
        QueryExpr::And(exprs) => exprs.iter().all(|e| eval(e, alert, field)),
        QueryExpr::Or(exprs) => exprs.iter().any(|e| eval(e, alert, field)),
        QueryExpr::Field { name, expr } => eval(expr, alert, Some(name)),
    }
}

/// Values in scope: one field, or every source field when unscoped.
fn values(alert: &Alert, field: Option<&str>) -> Vec<FieldValue> {
    match field {
        Some(name) => field_value(alert, name).into_iter().collect(),
        None => alert.source.values().cloned().collect(),
    }
}

/// Whole-value or token match, ignoring ASCII case.
fn term_matches(value: &FieldValue, term: &str) -> bool {
    let text = value.to_string();
    text.eq_ignore_ascii_case(term)
        || text
            .split(|c: char| !c.is_alphanumeric())
            .any(|token| token.eq_ignore_ascii_case(term))
}

/// Whether `value` lies within `range`.
fn in_range(value: &FieldValue, range: &RangeExpr) -> bool {
    let above = range.lower.as_deref().is_none_or(|bound| {
        matches!(
            (compare(value, bound), range.include_lower),
            (Some(Ordering::Greater), _) | (Some(Ordering::Equal), true)
        )
    });
    let below = range.upper.as_deref().is_none_or(|bound| {
        matches!(
            (compare(value, bound), range.include_upper),
            (Some(Ordering::Less), _) | (Some(Ordering::Equal), true)
        )
    });
    above && below
}

/// Compares numerically when both sides are numbers, as text otherwise.
pub fn compare(value: &FieldValue, bound: &str) -> Option<Ordering> {
    match (value.as_f64(), bound.parse::<f64>()) {
        (Some(v), Ok(b)) => v.partial_cmp(&b),
        _ => Some(value.to_string().as_str().cmp(bound)),
    }
}
