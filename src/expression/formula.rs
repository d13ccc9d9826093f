//! Helpers for formula strings as they arrive from step definitions.
//!
//! The visual builder writes column names containing spaces or operators
//! between square brackets (`[unit price] * qty`). The evaluator expects
//! backtick-quoted names instead, so formulas are cleaned before being
//! parsed. Text inside string literals is left untouched.

/// Whether `value` is a double-quoted string literal (`"high"`).
///
/// Only the first and last characters are inspected. A formula that happens
/// to start and end with `"` is therefore always treated as a literal.
pub fn is_literal_string(value: &str) -> bool {
    value.starts_with('"') && value.ends_with('"')
}

/// Strip the surrounding quotes of a literal string.
///
/// A lone `"` strips to the empty string, as does anything that is not a
/// literal at all.
pub fn strip_literal_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or("")
}

/// Rewrite `[column name]` references to `` `column name` `` and trim
pub fn clean_formula(formula: &str) -> String {
    let mut cleaned = String::with_capacity(formula.len());
    let mut chars = formula.trim().chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' | '"' => {
                cleaned.push(ch);
                for inner in chars.by_ref() {
                    cleaned.push(inner);
                    if inner == ch {
                        break;
                    }
                }
            }
            '[' => {
                let mut name = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == ']' {
                        closed = true;
                        break;
                    }
                    name.push(inner);
                }
                if closed {
                    cleaned.push('`');
                    cleaned.push_str(&name);
                    cleaned.push('`');
                } else {
                    // Unbalanced bracket: keep as is and let the parser report it
                    cleaned.push('[');
                    cleaned.push_str(&name);
                }
            }
            _ => cleaned.push(ch),
        }
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_literal_string() {
        assert!(is_literal_string("\"high\""));
        assert!(is_literal_string("\"\""));
        assert!(!is_literal_string("value * 2"));
        assert!(!is_literal_string("'single'"));
        assert!(!is_literal_string(""));
    }

    #[test]
    fn test_strip_literal_quotes() {
        assert_eq!(strip_literal_quotes("\"high\""), "high");
        assert_eq!(strip_literal_quotes("\"\""), "");
        assert_eq!(strip_literal_quotes("\""), "");
    }

    #[test]
    fn test_clean_formula() {
        assert_eq!(clean_formula("  [unit price] * qty "), "`unit price` * qty");
        assert_eq!(clean_formula("[a] + [b c]"), "`a` + `b c`");
        assert_eq!(clean_formula("label + '[not a column]'"), "label + '[not a column]'");
        assert_eq!(clean_formula("a + [broken"), "a + [broken");
    }
}
