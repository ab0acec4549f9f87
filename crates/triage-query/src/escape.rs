//! Escaping for the backend query-string dialect.
//!
//! Field names and values are spliced into query strings verbatim, so every character
//! the grammar treats as syntax has to be neutralised with a backslash first.

/// Characters that carry meaning in the query-string grammar and are escaped one at a time.
const RESERVED: &[char] = &[
    '*', '+', '-', '=', '~', '>', '<', '"', '?', '^', '$', '{', '}', '(', ')', ':', '!', '/',
    '[', ']', '\\',
];

/// Escapes a field name for use on the left of a `field:value` clause.
///
/// Colons are a namespacing convention in field names (`source:type`) and the field
/// operator in the grammar, so each one is backslash-escaped.
pub fn escape_field(field: &str) -> String {
    field.replace(':', "\\:")
}

/// Escapes a value for use on the right of a `field:value` clause.
///
/// Every reserved character and every whitespace character is escaped individually,
/// then the two-character operators `||` and `&&` are escaped. The order matters: the
/// single-character pass must run first or the backslashes inserted for the operators
/// would themselves be escaped.
pub fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() * 2);
    for ch in value.chars() {
        if RESERVED.contains(&ch) || ch.is_whitespace() {
            escaped.push('\\');
        }
        escaped.push(ch);
    }

    escaped.replace("||", "\\||").replace("&&", "\\&&")
}
