//! ClassAd records as returned by the scheduler.
//!
//! A [`ClassAd`] is a sparse, case-insensitive mapping from attribute name to
//! an expression. Each attribute keeps the verbatim expression text alongside
//! its literal [`Value`], so serializers can hand the original expression
//! back to callers when the value is not a plain scalar.

pub mod eval;
pub mod parse;
pub mod value;

pub use eval::evaluate;
pub use parse::{parse_ads, parse_expr, quote, AdReader};
pub use value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub expr: String,
    pub value: Value,
}

/// Result of reading one attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    /// The ad has no attribute with this name.
    Absent,
    /// The attribute exists but evaluates to `undefined`.
    Undefined,
    Value(&'a Value),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassAd {
    attrs: Vec<Attribute>,
}

impl ClassAd {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to the expression `expr`, replacing any attribute whose
    /// name matches case-insensitively.
    pub fn insert(&mut self, name: &str, expr: &str) {
        let attr = Attribute {
            name: name.to_string(),
            expr: expr.to_string(),
            value: parse_expr(expr),
        };
        match self
            .attrs
            .iter_mut()
            .find(|a| a.name.eq_ignore_ascii_case(name))
        {
            Some(existing) => *existing = attr,
            None => self.attrs.push(attr),
        }
    }

    pub fn with(mut self, name: &str, expr: &str) -> Self {
        self.insert(name, expr);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attrs.iter().find(|a| a.name.eq_ignore_ascii_case(name))
    }

    pub fn lookup(&self, name: &str) -> Lookup<'_> {
        match self.attribute(name) {
            None => Lookup::Absent,
            Some(Attribute {
                value: Value::Undefined,
                ..
            }) => Lookup::Undefined,
            Some(attr) => Lookup::Value(&attr.value),
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.lookup(name) {
            Lookup::Value(v) => v.as_integer(),
            _ => None,
        }
    }

    /// Scalar text of `name`, or `default` when the attribute is absent,
    /// undefined, or not a scalar.
    pub fn text_or(&self, name: &str, default: &str) -> String {
        match self.lookup(name) {
            Lookup::Value(v) => v.scalar_text().unwrap_or_else(|| default.to_string()),
            Lookup::Absent | Lookup::Undefined => default.to_string(),
        }
    }

    /// Value of `name` with its expression evaluated in this ad's scope.
    /// Absent attributes are `Undefined`; expressions that cannot be
    /// computed stay [`Value::Expr`].
    pub fn evaluate(&self, name: &str) -> Value {
        match self.attribute(name) {
            None => Value::Undefined,
            Some(Attribute {
                value: Value::Expr,
                expr,
                ..
            }) => eval::evaluate(self, expr),
            Some(attr) => attr.value.clone(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attrs.iter()
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_distinguishes_absent_undefined_and_value() {
        let ad = ClassAd::new()
            .with("Owner", "\"alice\"")
            .with("x509UserProxyVOName", "undefined");

        assert_eq!(ad.lookup("Cmd"), Lookup::Absent);
        assert_eq!(ad.lookup("x509userproxyvoname"), Lookup::Undefined);
        assert_eq!(
            ad.lookup("OWNER"),
            Lookup::Value(&Value::String("alice".to_string()))
        );
    }

    #[test]
    fn insert_replaces_case_insensitively() {
        let mut ad = ClassAd::new();
        ad.insert("JobStatus", "1");
        ad.insert("jobstatus", "2");
        assert_eq!(ad.len(), 1);
        assert_eq!(ad.integer("JOBSTATUS"), Some(2));
    }

    #[test]
    fn text_or_defaults_for_missing_and_undefined() {
        let ad = ClassAd::new()
            .with("A", "undefined")
            .with("B", "{ 1, 2 }")
            .with("C", "42");
        assert_eq!(ad.text_or("A", "Unknown"), "Unknown");
        assert_eq!(ad.text_or("B", "Unknown"), "Unknown");
        assert_eq!(ad.text_or("C", "Unknown"), "42");
        assert_eq!(ad.text_or("D", ""), "");
    }
}
