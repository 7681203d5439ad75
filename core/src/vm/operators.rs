//! Runtime semantics of the value-level opcodes.
//!
//! Every function checks its operands' runtime types. A nil operand is a
//! [`RuntimeErrorKind::NilDereference`]; any other type mismatch means the
//! bytecode broke its contract and is reported as `InvalidOperand`.

use ecow::EcoString;

use super::{RuntimeErrorKind, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithOp {
    const fn name(self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Mul => "mul",
            ArithOp::Div => "div",
            ArithOp::Mod => "mod",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    const fn name(self) -> &'static str {
        match self {
            CmpOp::Lt => "cmplt",
            CmpOp::Le => "cmple",
            CmpOp::Gt => "cmpgt",
            CmpOp::Ge => "cmpge",
        }
    }

    fn holds<T: PartialOrd + ?Sized>(self, left: &T, right: &T) -> bool {
        match self {
            CmpOp::Lt => left < right,
            CmpOp::Le => left <= right,
            CmpOp::Gt => left > right,
            CmpOp::Ge => left >= right,
        }
    }
}

fn mismatch(op: &str, left: &Value, right: &Value) -> RuntimeErrorKind {
    RuntimeErrorKind::invalid_operand(format!(
        "{} is not defined for {} and {}",
        op,
        left.type_name(),
        right.type_name()
    ))
}

fn mismatch_unary(op: &str, operand: &Value) -> RuntimeErrorKind {
    RuntimeErrorKind::invalid_operand(format!(
        "{} is not defined for {}",
        op,
        operand.type_name()
    ))
}

fn reject_nil(values: &[&Value]) -> Result<(), RuntimeErrorKind> {
    if values.iter().any(|value| value.is_nil()) {
        Err(RuntimeErrorKind::NilDereference)
    } else {
        Ok(())
    }
}

/// `left op right` for the arithmetic opcodes.
///
/// Integer arithmetic wraps. `add` concatenates textual forms when either
/// operand is a string.
pub(crate) fn arithmetic(op: ArithOp, left: &Value, right: &Value) -> Result<Value, RuntimeErrorKind> {
    reject_nil(&[left, right])?;

    if op == ArithOp::Add && (matches!(left, Value::Str(_)) || matches!(right, Value::Str(_))) {
        let mut text: EcoString = left.to_text();
        text.push_str(&right.to_text());
        return Ok(Value::Str(text));
    }

    match (left, right) {
        (Value::Int(a), Value::Int(b)) => eval_int(op, *a, *b).map(Value::Int),
        (Value::Double(a), Value::Double(b)) => match op {
            ArithOp::Mod => Err(mismatch(op.name(), left, right)),
            _ => eval_double(op, *a, *b).map(Value::Double),
        },
        _ => Err(mismatch(op.name(), left, right)),
    }
}

fn eval_int(op: ArithOp, left: i64, right: i64) -> Result<i64, RuntimeErrorKind> {
    match op {
        ArithOp::Add => Ok(left.wrapping_add(right)),
        ArithOp::Sub => Ok(left.wrapping_sub(right)),
        ArithOp::Mul => Ok(left.wrapping_mul(right)),
        ArithOp::Div | ArithOp::Mod if right == 0 => Err(RuntimeErrorKind::DivisionByZero),
        // wrapping_* handles i64::MIN / -1
        ArithOp::Div => Ok(left.wrapping_div(right)),
        ArithOp::Mod => Ok(left.wrapping_rem(right)),
    }
}

fn eval_double(op: ArithOp, left: f64, right: f64) -> Result<f64, RuntimeErrorKind> {
    match op {
        ArithOp::Add => Ok(left + right),
        ArithOp::Sub => Ok(left - right),
        ArithOp::Mul => Ok(left * right),
        ArithOp::Div if right == 0.0 => Err(RuntimeErrorKind::DivisionByZero),
        ArithOp::Div => Ok(left / right),
        ArithOp::Mod => Ok(left % right),
    }
}

/// Ordering of two ints, doubles, chars or strings (lexicographic).
pub(crate) fn compare(op: CmpOp, left: &Value, right: &Value) -> Result<Value, RuntimeErrorKind> {
    reject_nil(&[left, right])?;
    let result = match (left, right) {
        (Value::Int(a), Value::Int(b)) => op.holds(a, b),
        (Value::Double(a), Value::Double(b)) => op.holds(a, b),
        (Value::Char(a), Value::Char(b)) => op.holds(a, b),
        (Value::Str(a), Value::Str(b)) => op.holds(a.as_str(), b.as_str()),
        _ => return Err(mismatch(op.name(), left, right)),
    };
    Ok(Value::Bool(result))
}

/// `and` / `or` on two booleans. Both operands are already evaluated.
pub(crate) fn logical(is_and: bool, left: &Value, right: &Value) -> Result<Value, RuntimeErrorKind> {
    reject_nil(&[left, right])?;
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(if is_and { *a && *b } else { *a || *b })),
        _ => Err(mismatch(if is_and { "and" } else { "or" }, left, right)),
    }
}

pub(crate) fn not(operand: &Value) -> Result<Value, RuntimeErrorKind> {
    match operand {
        Value::Bool(b) => Ok(Value::Bool(!b)),
        Value::Nil => Err(RuntimeErrorKind::NilDereference),
        other => Err(mismatch_unary("not", other)),
    }
}

pub(crate) fn negate(operand: &Value) -> Result<Value, RuntimeErrorKind> {
    match operand {
        Value::Int(i) => Ok(Value::Int(i.wrapping_neg())),
        Value::Double(d) => Ok(Value::Double(-d)),
        Value::Nil => Err(RuntimeErrorKind::NilDereference),
        other => Err(mismatch_unary("neg", other)),
    }
}

fn conversion(text: &str, target: &'static str) -> RuntimeErrorKind {
    RuntimeErrorKind::Conversion {
        text: text.into(),
        target,
    }
}

/// `toint`: ints pass through, doubles truncate toward zero, text holding an
/// integer or a finite decimal is parsed (and truncated).
pub(crate) fn to_int(operand: &Value) -> Result<Value, RuntimeErrorKind> {
    match operand {
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Double(d) => Ok(Value::Int(*d as i64)),
        Value::Str(_) | Value::Char(_) => {
            let text = operand.to_text();
            let trimmed = text.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                return Ok(Value::Int(i));
            }
            match trimmed.parse::<f64>() {
                Ok(d) if d.is_finite() => Ok(Value::Int(d as i64)),
                _ => Err(conversion(&text, "int")),
            }
        }
        Value::Nil => Err(RuntimeErrorKind::NilDereference),
        other => Err(conversion(&other.to_text(), "int")),
    }
}

/// `todbl`: ints widen, doubles pass through, numeric text is parsed.
pub(crate) fn to_double(operand: &Value) -> Result<Value, RuntimeErrorKind> {
    match operand {
        Value::Int(i) => Ok(Value::Double(*i as f64)),
        Value::Double(d) => Ok(Value::Double(*d)),
        Value::Str(_) | Value::Char(_) => {
            let text = operand.to_text();
            text.trim()
                .parse::<f64>()
                .map(Value::Double)
                .map_err(|_| conversion(&text, "double"))
        }
        Value::Nil => Err(RuntimeErrorKind::NilDereference),
        other => Err(conversion(&other.to_text(), "double")),
    }
}

pub(crate) fn to_str(operand: &Value) -> Result<Value, RuntimeErrorKind> {
    match operand {
        Value::Nil => Err(RuntimeErrorKind::NilDereference),
        other => Ok(Value::Str(other.to_text())),
    }
}

/// Character length of a string.
pub(crate) fn length(operand: &Value) -> Result<Value, RuntimeErrorKind> {
    match operand {
        Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
        Value::Nil => Err(RuntimeErrorKind::NilDereference),
        other => Err(mismatch_unary("len", other)),
    }
}

/// The single-character substring of `string` at `index`.
pub(crate) fn char_at(string: &Value, index: &Value) -> Result<Value, RuntimeErrorKind> {
    reject_nil(&[string, index])?;
    let (Value::Str(s), Value::Int(i)) = (string, index) else {
        return Err(mismatch("getchr", string, index));
    };
    let len = s.chars().count();
    usize::try_from(*i)
        .ok()
        .and_then(|at| s.chars().nth(at))
        .map(|c| {
            let mut buf = [0u8; 4];
            Value::str(c.encode_utf8(&mut buf))
        })
        .ok_or(RuntimeErrorKind::IndexOutOfRange { index: *i, len })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::ObjectId;

    #[test]
    fn test_int_arithmetic() {
        let add = arithmetic(ArithOp::Add, &Value::Int(2), &Value::Int(3)).unwrap();
        assert_eq!(add, Value::Int(5));
        let sub = arithmetic(ArithOp::Sub, &Value::Int(3), &Value::Int(10)).unwrap();
        assert_eq!(sub, Value::Int(-7));
        let div = arithmetic(ArithOp::Div, &Value::Int(7), &Value::Int(2)).unwrap();
        assert_eq!(div, Value::Int(3));
        let rem = arithmetic(ArithOp::Mod, &Value::Int(7), &Value::Int(3)).unwrap();
        assert_eq!(rem, Value::Int(1));
    }

    #[test]
    fn test_int_wrapping_overflow() {
        let result = arithmetic(ArithOp::Add, &Value::Int(i64::MAX), &Value::Int(1)).unwrap();
        assert_eq!(result, Value::Int(i64::MIN));
        let result = arithmetic(ArithOp::Div, &Value::Int(i64::MIN), &Value::Int(-1)).unwrap();
        assert_eq!(result, Value::Int(i64::MIN));
    }

    #[test]
    fn test_division_by_zero() {
        for op in [ArithOp::Div, ArithOp::Mod] {
            assert_eq!(
                arithmetic(op, &Value::Int(1), &Value::Int(0)),
                Err(RuntimeErrorKind::DivisionByZero)
            );
        }
        assert_eq!(
            arithmetic(ArithOp::Div, &Value::Double(1.0), &Value::Double(0.0)),
            Err(RuntimeErrorKind::DivisionByZero)
        );
    }

    #[test]
    fn test_double_arithmetic() {
        let result = arithmetic(ArithOp::Mul, &Value::Double(1.5), &Value::Double(2.0)).unwrap();
        assert_eq!(result, Value::Double(3.0));
        assert!(matches!(
            arithmetic(ArithOp::Mod, &Value::Double(1.5), &Value::Double(2.0)),
            Err(RuntimeErrorKind::InvalidOperand { .. })
        ));
    }

    #[test]
    fn test_mixed_numeric_types_are_rejected() {
        assert!(matches!(
            arithmetic(ArithOp::Add, &Value::Int(1), &Value::Double(2.0)),
            Err(RuntimeErrorKind::InvalidOperand { .. })
        ));
    }

    #[test]
    fn test_string_concatenation() {
        let both = arithmetic(ArithOp::Add, &Value::str("foo"), &Value::str("bar")).unwrap();
        assert_eq!(both, Value::str("foobar"));

        let left = arithmetic(ArithOp::Add, &Value::str("n="), &Value::Int(4)).unwrap();
        assert_eq!(left, Value::str("n=4"));

        let right = arithmetic(ArithOp::Add, &Value::Double(2.5), &Value::str("!")).unwrap();
        assert_eq!(right, Value::str("2.5!"));

        // Only `add` concatenates.
        assert!(arithmetic(ArithOp::Sub, &Value::str("a"), &Value::str("b")).is_err());
    }

    #[test]
    fn test_nil_operands() {
        assert_eq!(
            arithmetic(ArithOp::Add, &Value::Nil, &Value::str("x")),
            Err(RuntimeErrorKind::NilDereference)
        );
        assert_eq!(
            compare(CmpOp::Lt, &Value::Int(1), &Value::Nil),
            Err(RuntimeErrorKind::NilDereference)
        );
        assert_eq!(negate(&Value::Nil), Err(RuntimeErrorKind::NilDereference));
        assert_eq!(to_str(&Value::Nil), Err(RuntimeErrorKind::NilDereference));
    }

    #[test]
    fn test_comparisons_share_direction() {
        let cases = [
            (Value::Int(1), Value::Int(2)),
            (Value::Double(1.0), Value::Double(2.0)),
            (Value::Char('a'), Value::Char('b')),
            (Value::str("abc"), Value::str("abd")),
        ];
        for (small, large) in cases {
            assert_eq!(compare(CmpOp::Lt, &small, &large), Ok(Value::Bool(true)));
            assert_eq!(compare(CmpOp::Le, &small, &small), Ok(Value::Bool(true)));
            assert_eq!(compare(CmpOp::Gt, &small, &large), Ok(Value::Bool(false)));
            assert_eq!(compare(CmpOp::Ge, &large, &small), Ok(Value::Bool(true)));
        }
    }

    #[test]
    fn test_references_are_not_ordered() {
        let a = Value::Ref(ObjectId(0));
        let b = Value::Ref(ObjectId(1));
        assert!(compare(CmpOp::Lt, &a, &b).is_err());
    }

    #[test]
    fn test_logical() {
        assert_eq!(
            logical(true, &Value::Bool(true), &Value::Bool(false)),
            Ok(Value::Bool(false))
        );
        assert_eq!(
            logical(false, &Value::Bool(true), &Value::Bool(false)),
            Ok(Value::Bool(true))
        );
        assert_eq!(not(&Value::Bool(false)), Ok(Value::Bool(true)));
        assert!(not(&Value::Int(0)).is_err());
    }

    #[test]
    fn test_negate() {
        assert_eq!(negate(&Value::Int(4)), Ok(Value::Int(-4)));
        assert_eq!(negate(&Value::Double(0.5)), Ok(Value::Double(-0.5)));
    }

    #[test]
    fn test_to_int() {
        assert_eq!(to_int(&Value::str("42")), Ok(Value::Int(42)));
        assert_eq!(to_int(&Value::str(" -7 ")), Ok(Value::Int(-7)));
        assert_eq!(to_int(&Value::str("3.9")), Ok(Value::Int(3)));
        assert_eq!(to_int(&Value::Double(-2.7)), Ok(Value::Int(-2)));
        assert_eq!(to_int(&Value::Char('8')), Ok(Value::Int(8)));
        assert_eq!(
            to_int(&Value::str("abc")),
            Err(RuntimeErrorKind::Conversion {
                text: "abc".into(),
                target: "int"
            })
        );
        assert!(to_int(&Value::str("inf")).is_err());
    }

    #[test]
    fn test_to_double() {
        assert_eq!(to_double(&Value::str("3.125")), Ok(Value::Double(3.125)));
        assert_eq!(to_double(&Value::Int(2)), Ok(Value::Double(2.0)));
        assert!(matches!(
            to_double(&Value::str("three")),
            Err(RuntimeErrorKind::Conversion { target: "double", .. })
        ));
    }

    #[test]
    fn test_to_str() {
        assert_eq!(to_str(&Value::Int(12)), Ok(Value::str("12")));
        assert_eq!(to_str(&Value::Double(4.0)), Ok(Value::str("4.0")));
        assert_eq!(to_str(&Value::Bool(false)), Ok(Value::str("false")));
    }

    #[test]
    fn test_length_counts_characters() {
        assert_eq!(length(&Value::str("héllo")), Ok(Value::Int(5)));
        assert_eq!(length(&Value::str("")), Ok(Value::Int(0)));
    }

    #[test]
    fn test_char_at() {
        let s = Value::str("blue");
        assert_eq!(char_at(&s, &Value::Int(0)), Ok(Value::str("b")));
        assert_eq!(char_at(&s, &Value::Int(3)), Ok(Value::str("e")));
        assert_eq!(
            char_at(&s, &Value::Int(4)),
            Err(RuntimeErrorKind::IndexOutOfRange { index: 4, len: 4 })
        );
        assert_eq!(
            char_at(&s, &Value::Int(-1)),
            Err(RuntimeErrorKind::IndexOutOfRange { index: -1, len: 4 })
        );
    }
}
