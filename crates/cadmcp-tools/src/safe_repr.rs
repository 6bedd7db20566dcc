//! Safe literal embedding for generated Rhai scripts (spec.md §4.6 "the
//! template escapes/encodes parameters so injection is impossible by
//! construction, not by sanitization").
//!
//! Every template builds its script by interpolating *reprs*, never raw
//! strings, so a parameter containing a quote or backslash can't break out
//! of its literal.

/// Rhai string literal for `s`, quoted and escaped.
pub fn string(s: &str) -> String {
    format!("{s:?}")
}

/// Rhai float literal. `NaN`/`inf` are folded to `0.0` since Rhai's
/// expression grammar has no literal for them and the templates only ever
/// need finite geometry values.
pub fn number(n: f64) -> String {
    if n.is_finite() {
        format!("{n}")
    } else {
        "0.0".to_string()
    }
}

pub fn integer(n: i64) -> String {
    format!("{n}")
}

pub fn boolean(b: bool) -> String {
    if b { "true".to_string() } else { "false".to_string() }
}

/// Rhai array literal of strings, e.g. `["a", "b"]`.
pub fn string_array<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    let parts: Vec<String> = items.into_iter().map(string).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_escapes_quotes() {
        assert_eq!(string("a\"b"), "\"a\\\"b\"");
    }

    #[test]
    fn number_folds_non_finite() {
        assert_eq!(number(f64::NAN), "0.0");
        assert_eq!(number(f64::INFINITY), "0.0");
        assert_eq!(number(1.5), "1.5");
    }

    #[test]
    fn boolean_round_trips() {
        assert_eq!(boolean(true), "true");
        assert_eq!(boolean(false), "false");
    }
}
