//! Runtime values.

use core::fmt;

use ecow::EcoString;

use super::heap::ObjectId;
use super::instruction_set::Constant;

/// A value on an operand stack, in a local slot or in a heap object field.
///
/// Derived equality is exactly the `cmpeq` semantics: primitives compare
/// structurally within the same variant, `Nil` equals only `Nil`, and
/// references compare by object id.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// The "no value" sentinel.
    #[default]
    Nil,
    Int(i64),
    Double(f64),
    Bool(bool),
    Char(char),
    Str(EcoString),
    Ref(ObjectId),
}

static_assertions::const_assert!(core::mem::size_of::<Value>() <= 24);

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(s.into())
    }

    pub const fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Name of the runtime type, for diagnostics.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::Bool(_) => "bool",
            Value::Char(_) => "char",
            Value::Str(_) => "string",
            Value::Ref(_) => "object",
        }
    }

    /// The textual form of this value as a string value.
    pub fn to_text(&self) -> EcoString {
        match self {
            Value::Str(s) => s.clone(),
            other => ecow::eco_format!("{other}"),
        }
    }
}

impl From<Constant> for Value {
    fn from(constant: Constant) -> Self {
        match constant {
            Constant::Nil => Value::Nil,
            Constant::Int(i) => Value::Int(i),
            Constant::Double(d) => Value::Double(d),
            Constant::Bool(b) => Value::Bool(b),
            Constant::Char(c) => Value::Char(c),
            Constant::Str(s) => Value::Str(s),
        }
    }
}

impl From<&Constant> for Value {
    fn from(constant: &Constant) -> Self {
        constant.clone().into()
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::str(value)
    }
}

/// The textual form used by `write`, `tostr` and string concatenation.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Double(d) => write_double(f, *d),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Char(c) => write!(f, "{c}"),
            Value::Str(s) => f.write_str(s),
            Value::Ref(id) => write!(f, "{id}"),
        }
    }
}

/// Shortest round-trip form that always carries a fractional part.
///
/// Debug already prints `3.0` for integral doubles, but switches to bare
/// exponent form (`1e16`) at large and small magnitudes.
fn write_double(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    let text = ecow::eco_format!("{value:?}");
    match text.split_once('e') {
        Some((mantissa, exponent)) if !mantissa.contains('.') => {
            write!(f, "{mantissa}.0e{exponent}")
        }
        _ => f.write_str(&text),
    }
}
