//! Parsing of the scheduler's "long" ClassAd text format.
//!
//! Each ad is a run of `Name = expression` lines; ads are separated by a
//! blank line. Parsing recognizes literals only (see [`parse_expr`]).

use super::value::Value;
use super::ClassAd;

/// Parse an expression's text into its literal form.
pub fn parse_expr(text: &str) -> Value {
    let text = text.trim();
    if text.is_empty() {
        return Value::Expr;
    }
    if text.eq_ignore_ascii_case("undefined") {
        return Value::Undefined;
    }
    if text.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if text.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }
    if text.starts_with('"') {
        return match parse_string(text) {
            Some((s, rest)) if rest.is_empty() => Value::String(s),
            _ => Value::Expr,
        };
    }
    if let Some(inner) = enclosed(text, '{', '}') {
        return Value::List(
            split_top_level(inner, ',')
                .into_iter()
                .map(parse_expr)
                .collect(),
        );
    }
    if let Some(inner) = enclosed(text, '[', ']') {
        return parse_record(inner).unwrap_or(Value::Expr);
    }
    if let Ok(i) = text.parse::<i64>() {
        return Value::Integer(i);
    }
    if looks_numeric(text) {
        if let Ok(r) = text.parse::<f64>() {
            return Value::Real(r);
        }
    }
    Value::Expr
}

/// Parse a quoted string literal at the start of `text`, returning the
/// unescaped contents and whatever follows the closing quote.
pub(crate) fn parse_string(text: &str) -> Option<(String, &str)> {
    let mut chars = text.char_indices();
    if chars.next()?.1 != '"' {
        return None;
    }
    let mut out = String::new();
    while let Some((idx, c)) = chars.next() {
        match c {
            '"' => return Some((out, &text[idx + 1..])),
            // only quote and backslash are escapes; any other backslash is kept
            '\\' => match chars.next()? {
                (_, escaped @ ('"' | '\\')) => out.push(escaped),
                (_, other) => {
                    out.push('\\');
                    out.push(other);
                }
            },
            other => out.push(other),
        }
    }
    None
}

/// ClassAd string quoting, the inverse of [`parse_string`].
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

fn looks_numeric(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
        && text
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_record(inner: &str) -> Option<Value> {
    let mut fields = Vec::new();
    for part in split_top_level(inner, ';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (name, expr) = part.split_once('=')?;
        let name = name.trim();
        if !is_identifier(name) {
            return None;
        }
        fields.push((name.to_string(), parse_expr(expr)));
    }
    Some(Value::Record(fields))
}

/// If `text` is exactly one `open ... close` group, return what is inside.
fn enclosed(text: &str, open: char, close: char) -> Option<&str> {
    if !text.starts_with(open) || !text.ends_with(close) || text.len() < 2 {
        return None;
    }
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' | '(' => depth += 1,
            '}' | ']' | ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return (idx == text.len() - close.len_utf8())
                        .then(|| &text[open.len_utf8()..idx]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on `sep` where it is not nested in brackets or a string.
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;
    for (idx, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' | '(' => depth += 1,
            '}' | ']' | ')' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                parts.push(&text[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Incremental reader for long-format output, fed one line at a time.
#[derive(Debug, Default)]
pub struct AdReader {
    current: ClassAd,
}

impl AdReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line. Returns the finished ad when `line` terminates one.
    pub fn push_line(&mut self, line: &str) -> Option<ClassAd> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return self.take();
        }
        match line.split_once('=') {
            Some((name, expr)) if is_identifier(name.trim()) => {
                self.current.insert(name.trim(), expr.trim());
            }
            _ => tracing::trace!(line, "Skipping non-attribute line"),
        }
        None
    }

    /// Flush whatever ad is still being accumulated at end of input.
    pub fn finish(mut self) -> Option<ClassAd> {
        self.take()
    }

    fn take(&mut self) -> Option<ClassAd> {
        if self.current.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.current))
        }
    }
}

/// Parse a whole long-format document.
pub fn parse_ads(text: &str) -> Vec<ClassAd> {
    let mut reader = AdReader::new();
    let mut ads: Vec<ClassAd> = text.lines().filter_map(|l| reader.push_line(l)).collect();
    ads.extend(reader.finish());
    ads
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literals() {
        assert_eq!(parse_expr("2"), Value::Integer(2));
        assert_eq!(parse_expr("-17"), Value::Integer(-17));
        assert_eq!(parse_expr("1.5"), Value::Real(1.5));
        assert_eq!(parse_expr("TRUE"), Value::Boolean(true));
        assert_eq!(parse_expr("false"), Value::Boolean(false));
        assert_eq!(parse_expr("UNDEFINED"), Value::Undefined);
        assert_eq!(parse_expr("\"OSG\""), Value::String("OSG".to_string()));
    }

    #[test]
    fn unescapes_strings() {
        assert_eq!(
            parse_expr(r#""say \"hi\" C:\\tmp""#),
            Value::String(r#"say "hi" C:\tmp"#.to_string())
        );
    }

    #[test]
    fn unknown_escapes_keep_their_backslash() {
        assert_eq!(
            parse_expr(r#""/DC=org/CN=Smith\, John\n""#),
            Value::String(r#"/DC=org/CN=Smith\, John\n"#.to_string())
        );
    }

    #[test]
    fn non_literals_stay_expressions() {
        assert_eq!(parse_expr("RequestMemory * 2"), Value::Expr);
        assert_eq!(parse_expr("ifThenElse(x, 1, 2)"), Value::Expr);
        assert_eq!(parse_expr("error"), Value::Expr);
        assert_eq!(parse_expr("\"a\" + \"b\""), Value::Expr);
        assert_eq!(parse_expr("{1} + {2}"), Value::Expr);
        assert_eq!(parse_expr("inf"), Value::Expr);
    }

    #[test]
    fn parses_nested_lists_and_records() {
        assert_eq!(
            parse_expr(r#"{ "a,b", { 1, 2 }, [ x = 1; y = "}" ] }"#),
            Value::List(vec![
                Value::String("a,b".to_string()),
                Value::List(vec![Value::Integer(1), Value::Integer(2)]),
                Value::Record(vec![
                    ("x".to_string(), Value::Integer(1)),
                    ("y".to_string(), Value::String("}".to_string())),
                ]),
            ])
        );
        assert_eq!(parse_expr("{}"), Value::List(Vec::new()));
        assert_eq!(parse_expr("[]"), Value::Record(Vec::new()));
    }

    #[test]
    fn quote_escapes_specials() {
        assert_eq!(quote(r#"ce"1\x"#), r#""ce\"1\\x""#);
        let quoted = quote("a\"b\\c");
        let (back, rest) = parse_string(&quoted).unwrap();
        assert_eq!(back, "a\"b\\c");
        assert!(rest.is_empty());
    }

    #[test]
    fn reads_ads_separated_by_blank_lines() {
        let text = "JobStatus = 2\nx509UserProxyVOName = \"OSG\"\n\n\nJobStatus = 5\n";
        let ads = parse_ads(text);
        assert_eq!(ads.len(), 2);
        assert_eq!(ads[0].integer("jobstatus"), Some(2));
        assert_eq!(ads[1].integer("JobStatus"), Some(5));
    }

    #[test]
    fn skips_banner_lines() {
        let text = "-- Schedd: ce.example.org : <10.0.0.1:9619?addrs=10.0.0.1-9619>\nJobStatus = 1\n";
        let ads = parse_ads(text);
        assert_eq!(ads.len(), 1);
        assert_eq!(ads[0].len(), 1);
    }
}
