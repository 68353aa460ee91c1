use serde_json::Number;

/// Evaluated form of a ClassAd attribute expression.
///
/// Parsing yields literals only; anything else is [`Value::Expr`] until it is
/// evaluated against its ad (see [`ClassAd::evaluate`](super::ClassAd::evaluate)).
/// Expressions that stay `Expr` are handed out as their verbatim text.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    List(Vec<Value>),
    Record(Vec<(String, Value)>),
    Undefined,
    Expr,
}

impl Value {
    /// Strings, numbers and booleans.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::String(_) | Value::Integer(_) | Value::Real(_) | Value::Boolean(_)
        )
    }

    /// Integer view of a numeric value. Reals only qualify when they carry no
    /// fractional part, so `2.0` reads as job status 2.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Real(r) if r.is_finite() && r.fract() == 0.0 => Some(*r as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Plain-text rendering of a scalar: strings unquoted, numbers and
    /// booleans as ClassAd would print them.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Real(r) => Some(r.to_string()),
            Value::Boolean(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// JSON form of a scalar. Returns `None` for everything that must be
    /// emitted as an expression instead, including non-finite reals.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Value::String(s) => Some(serde_json::Value::String(s.clone())),
            Value::Integer(i) => Some(serde_json::Value::Number((*i).into())),
            Value::Real(r) => Number::from_f64(*r).map(serde_json::Value::Number),
            Value::Boolean(b) => Some(serde_json::Value::Bool(*b)),
            Value::List(_) | Value::Record(_) | Value::Undefined | Value::Expr => None,
        }
    }
}
