//! Suggested expressions for undefined steps

use once_cell::sync::Lazy;
use regex::Regex;

static ARGUMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""[^"]*"|\b\d+\.\d+\b|\b\d+\b"#).expect("argument regex is valid")
});

/// Build a cucumber expression that would match `text`: quoted strings become
/// `{string}`, decimals `{float}` and integers `{int}`.
pub fn suggest_expression(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for found in ARGUMENT_RE.find_iter(text) {
        out.push_str(&escape_literal(&text[last..found.start()]));
        let token = found.as_str();
        out.push_str(if token.starts_with('"') {
            "{string}"
        } else if token.contains('.') {
            "{float}"
        } else {
            "{int}"
        });
        last = found.end();
    }
    out.push_str(&escape_literal(&text[last..]));
    out
}

fn escape_literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '{' | '}' | '(' | ')' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
