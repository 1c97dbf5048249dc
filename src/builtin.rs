//! Operator semantics. Every function here receives already-evaluated
//! operands and either produces a value or rejects the operand types.

use std::cmp::Ordering;

use crate::ast::{BinOp, CompareOp};
use crate::error::SemanticError;
use crate::value::{cmp_integer_real, ListRef, Value};

pub type OpResult<T = Value> = Result<T, SemanticError>;

macro_rules! check_value {
    ($val:expr, $variant:ident, $op:expr) => {
        match $val {
            Value::$variant(inner) => inner,
            other => return Err(mismatch($op, &[other.type_name()])),
        }
    };
}

fn mismatch(op: &'static str, found: &[&str]) -> SemanticError {
    SemanticError::TypeMismatch {
        op,
        found: found.join(" and "),
    }
}

#[derive(Debug, Clone, Copy)]
enum Num {
    Integer(i64),
    Real(f64),
}

impl Num {
    fn of(value: &Value) -> Option<Num> {
        match value {
            Value::Integer(n) => Some(Num::Integer(*n)),
            Value::Real(n) => Some(Num::Real(*n)),
            _ => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Integer(n) => n as f64,
            Num::Real(n) => n,
        }
    }

    /// Exact ordering; an integer is never rounded to meet a real.
    fn partial_cmp(self, other: Num) -> Option<Ordering> {
        match (self, other) {
            (Num::Integer(a), Num::Integer(b)) => Some(a.cmp(&b)),
            (Num::Real(a), Num::Real(b)) => a.partial_cmp(&b),
            (Num::Integer(a), Num::Real(b)) => cmp_integer_real(a, b),
            (Num::Real(a), Num::Integer(b)) => cmp_integer_real(b, a).map(Ordering::reverse),
        }
    }
}

pub fn and_also(left: Value, right: Value) -> OpResult {
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a && b)),
        (a, b) => Err(mismatch("andalso", &[a.type_name(), b.type_name()])),
    }
}

pub fn or_else(left: Value, right: Value) -> OpResult {
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a || b)),
        (a, b) => Err(mismatch("orelse", &[a.type_name(), b.type_name()])),
    }
}

pub fn not(value: Value) -> OpResult {
    let b = check_value!(value, Bool, "not");
    Ok(Value::Bool(!b))
}

pub fn negate(value: Value) -> OpResult {
    match value {
        Value::Integer(n) => n
            .checked_neg()
            .map(Value::Integer)
            .ok_or(SemanticError::Overflow("-")),
        Value::Real(n) => Ok(Value::Real(-n)),
        other => Err(mismatch("-", &[other.type_name()])),
    }
}

/// Unordered operands (NaN) satisfy only `<>`.
fn holds(op: CompareOp, ordering: Option<Ordering>) -> bool {
    let Some(ordering) = ordering else {
        return op == CompareOp::Ne;
    };
    match op {
        CompareOp::Le => ordering.is_le(),
        CompareOp::Lt => ordering.is_lt(),
        CompareOp::Eq => ordering.is_eq(),
        CompareOp::Ne => ordering.is_ne(),
        CompareOp::Ge => ordering.is_ge(),
        CompareOp::Gt => ordering.is_gt(),
    }
}

/// Strings compare with strings and numbers with numbers. A string and a
/// number are never equal and have no order.
pub fn compare(op: CompareOp, left: &Value, right: &Value) -> OpResult {
    let result = match (left, right) {
        (Value::Str(a), Value::Str(b)) => holds(op, Some(a.cmp(b))),
        (Value::Integer(a), Value::Integer(b)) => holds(op, Some(a.cmp(b))),
        (Value::Str(_), Value::Integer(_) | Value::Real(_))
        | (Value::Integer(_) | Value::Real(_), Value::Str(_)) => match op {
            CompareOp::Eq => false,
            CompareOp::Ne => true,
            _ => return Err(mismatch(op.spelling(), &[left.type_name(), right.type_name()])),
        },
        _ => match (Num::of(left), Num::of(right)) {
            (Some(a), Some(b)) => holds(op, a.partial_cmp(b)),
            _ => return Err(mismatch(op.spelling(), &[left.type_name(), right.type_name()])),
        },
    };
    Ok(Value::Bool(result))
}

pub fn binary(op: BinOp, left: Value, right: Value) -> OpResult {
    match op {
        BinOp::Add => add(left, right),
        BinOp::IntDiv | BinOp::Mod => match (left, right) {
            (Value::Integer(a), Value::Integer(b)) => integer_division(op, a, b),
            (a, b) => Err(mismatch(op.spelling(), &[a.type_name(), b.type_name()])),
        },
        _ => match (Num::of(&left), Num::of(&right)) {
            (Some(a), Some(b)) => arithmetic(op, a, b),
            _ => Err(mismatch(op.spelling(), &[left.type_name(), right.type_name()])),
        },
    }
}

fn add(left: Value, right: Value) -> OpResult {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::str(format!("{a}{b}"))),
        (Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Value::list(items))
        }
        (left, right) => match (Num::of(&left), Num::of(&right)) {
            (Some(a), Some(b)) => arithmetic(BinOp::Add, a, b),
            _ => Err(mismatch("+", &[left.type_name(), right.type_name()])),
        },
    }
}

fn arithmetic(op: BinOp, a: Num, b: Num) -> OpResult {
    if let (Num::Integer(a), Num::Integer(b)) = (a, b) {
        let result = match op {
            BinOp::Add => a.checked_add(b),
            BinOp::Sub => a.checked_sub(b),
            BinOp::Mul => a.checked_mul(b),
            BinOp::Pow => return integer_pow(a, b),
            _ => None,
        };
        if let Some(n) = result {
            return Ok(Value::Integer(n));
        }
        if op != BinOp::Div {
            return Err(SemanticError::Overflow(op.spelling()));
        }
    }

    let (a, b) = (a.as_f64(), b.as_f64());
    let result = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b == 0.0 {
                return Err(SemanticError::DivisionByZero);
            }
            a / b
        }
        BinOp::Pow => return real_pow(a, b),
        BinOp::IntDiv | BinOp::Mod => return Err(mismatch(op.spelling(), &["real"])),
    };
    Ok(Value::Real(result))
}

fn integer_pow(base: i64, exponent: i64) -> OpResult {
    if exponent < 0 {
        return real_pow(base as f64, exponent as f64);
    }
    let result = match u32::try_from(exponent) {
        Ok(exponent) => base.checked_pow(exponent),
        Err(_) => match base {
            0 | 1 => Some(base),
            -1 => Some(if exponent % 2 == 0 { 1 } else { -1 }),
            _ => None,
        },
    };
    result.map(Value::Integer).ok_or(SemanticError::Overflow("**"))
}

fn real_pow(base: f64, exponent: f64) -> OpResult {
    if base == 0.0 && exponent < 0.0 {
        return Err(SemanticError::DivisionByZero);
    }
    let result = base.powf(exponent);
    if result.is_nan() && !base.is_nan() && !exponent.is_nan() {
        return Err(SemanticError::NoRealResult("**"));
    }
    if result.is_infinite() && base.is_finite() && exponent.is_finite() {
        return Err(SemanticError::Overflow("**"));
    }
    Ok(Value::Real(result))
}

/// `div` and `mod` round toward negative infinity, so the remainder takes the
/// sign of the divisor.
fn integer_division(op: BinOp, a: i64, b: i64) -> OpResult {
    if b == 0 {
        return Err(SemanticError::DivisionByZero);
    }
    let (quotient, remainder) = match (a.checked_div(b), a.checked_rem(b)) {
        (Some(q), Some(r)) => (q, r),
        _ => return Err(SemanticError::Overflow(op.spelling())),
    };
    let floor = remainder != 0 && ((remainder < 0) != (b < 0));
    Ok(Value::Integer(match (op, floor) {
        (BinOp::IntDiv, true) => quotient - 1,
        (BinOp::IntDiv, false) => quotient,
        (_, true) => remainder + b,
        (_, false) => remainder,
    }))
}

/// `item in container`: substring search when the container is a string,
/// element equality when it is a list.
pub fn member(item: &Value, container: &Value) -> OpResult {
    match (item, container) {
        (Value::Str(needle), Value::Str(haystack)) => Ok(Value::Bool(haystack.contains(&**needle))),
        (_, Value::List(list)) => Ok(Value::Bool(list.borrow().iter().any(|v| v == item))),
        _ => Err(mismatch("in", &[item.type_name(), container.type_name()])),
    }
}

pub fn cons(head: Value, tail: &Value) -> OpResult {
    let tail = check_value!(tail, List, "::");
    let tail = tail.borrow();
    let mut items = Vec::with_capacity(tail.len() + 1);
    items.push(head);
    items.extend(tail.iter().cloned());
    Ok(Value::list(items))
}

fn position(index: i64, len: usize) -> OpResult<usize> {
    usize::try_from(index)
        .ok()
        .filter(|&pos| pos < len)
        .ok_or(SemanticError::IndexOutOfRange { index, len })
}

/// Applies `indices` one level at a time; every level must be a list or a
/// string.
pub fn index(target: Value, indices: &[Value]) -> OpResult {
    let mut value = target;
    for index in indices {
        let i = *check_value!(index, Integer, "[]");
        let next = match &value {
            Value::List(list) => {
                let items = list.borrow();
                items[position(i, items.len())?].clone()
            }
            Value::Str(s) => {
                let found = usize::try_from(i).ok().and_then(|pos| s.chars().nth(pos));
                match found {
                    Some(c) => Value::str(c.to_string()),
                    None => {
                        return Err(SemanticError::IndexOutOfRange {
                            index: i,
                            len: s.chars().count(),
                        })
                    }
                }
            }
            other => return Err(mismatch("[]", &[other.type_name()])),
        };
        value = next;
    }
    Ok(value)
}

/// Replaces the element `indices` leads to inside `target`. Every level,
/// including `target` itself, must be a list.
pub fn assign_index(target: &Value, indices: &[Value], value: Value) -> OpResult<()> {
    let positions = indices
        .iter()
        .map(|index| Ok(*check_value!(index, Integer, "[]")))
        .collect::<OpResult<Vec<i64>>>()?;
    let Some((&last, path)) = positions.split_last() else {
        return Ok(());
    };

    let mut list: ListRef = check_value!(target, List, "[]=").clone();
    for &i in path {
        let next = {
            let items = list.borrow();
            match &items[position(i, items.len())?] {
                Value::List(inner) => inner.clone(),
                other => return Err(mismatch("[]=", &[other.type_name()])),
            }
        };
        list = next;
    }

    let mut items = list.borrow_mut();
    let pos = position(last, items.len())?;
    items[pos] = value;
    Ok(())
}

/// `#field target`, counting fields from 1.
pub fn tuple_field(target: &Value, field: i64) -> OpResult {
    let items = check_value!(target, Tuple, "#");
    field
        .checked_sub(1)
        .and_then(|i| usize::try_from(i).ok())
        .and_then(|i| items.get(i))
        .cloned()
        .ok_or(SemanticError::TupleIndexOutOfRange {
            index: field,
            len: items.len(),
        })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn int(n: i64) -> Value {
        Value::Integer(n)
    }

    fn list(items: &[i64]) -> Value {
        Value::list(items.iter().copied().map(Value::Integer).collect())
    }

    #[test]
    fn division_always_yields_a_real() {
        assert_eq!(binary(BinOp::Div, int(7), int(2)).unwrap(), Value::Real(3.5));
        assert!(matches!(binary(BinOp::Div, int(4), int(2)).unwrap(), Value::Real(_)));
        assert_eq!(
            binary(BinOp::Div, int(1), Value::Real(0.0)).unwrap_err(),
            SemanticError::DivisionByZero
        );
    }

    #[test]
    fn div_and_mod_floor_toward_negative_infinity() {
        assert_eq!(binary(BinOp::IntDiv, int(7), int(2)).unwrap(), int(3));
        assert_eq!(binary(BinOp::Mod, int(7), int(2)).unwrap(), int(1));
        assert_eq!(binary(BinOp::IntDiv, int(-7), int(2)).unwrap(), int(-4));
        assert_eq!(binary(BinOp::Mod, int(-7), int(2)).unwrap(), int(1));
        assert_eq!(binary(BinOp::Mod, int(7), int(-2)).unwrap(), int(-1));
        assert!(binary(BinOp::Mod, Value::Real(7.0), int(2)).is_err());
        assert_eq!(
            binary(BinOp::IntDiv, int(1), int(0)).unwrap_err(),
            SemanticError::DivisionByZero
        );
    }

    #[test]
    fn powers_stay_integral_unless_the_exponent_is_negative() {
        assert_eq!(binary(BinOp::Pow, int(2), int(10)).unwrap(), int(1024));
        assert_eq!(binary(BinOp::Pow, int(2), int(-1)).unwrap(), Value::Real(0.5));
        assert_eq!(binary(BinOp::Pow, Value::Real(4.0), Value::Real(0.5)).unwrap(), Value::Real(2.0));
        assert_eq!(
            binary(BinOp::Pow, int(10), int(40)).unwrap_err(),
            SemanticError::Overflow("**")
        );
        assert!(binary(BinOp::Pow, int(-8), Value::Real(0.5)).is_err());
    }

    #[test]
    fn addition_needs_matching_shapes() {
        assert_eq!(
            binary(BinOp::Add, Value::str("ab"), Value::str("cd")).unwrap().to_string(),
            "abcd"
        );
        assert_eq!(binary(BinOp::Add, list(&[1]), list(&[2, 3])).unwrap(), list(&[1, 2, 3]));
        assert_eq!(binary(BinOp::Add, int(1), Value::Real(0.5)).unwrap(), Value::Real(1.5));
        assert!(binary(BinOp::Add, int(1), Value::str("a")).is_err());
        assert!(binary(BinOp::Add, list(&[1]), Value::str("a")).is_err());
        assert!(binary(BinOp::Add, Value::Bool(true), int(1)).is_err());
        assert!(binary(BinOp::Sub, Value::str("a"), Value::str("b")).is_err());
    }

    #[test]
    fn mixed_string_number_comparisons() {
        assert_eq!(compare(CompareOp::Eq, &Value::str("1"), &int(1)).unwrap(), Value::Bool(false));
        assert_eq!(compare(CompareOp::Ne, &int(1), &Value::str("1")).unwrap(), Value::Bool(true));
        assert!(compare(CompareOp::Lt, &Value::str("1"), &int(1)).is_err());
        assert_eq!(compare(CompareOp::Lt, &int(1), &Value::Real(1.5)).unwrap(), Value::Bool(true));
        assert_eq!(
            compare(CompareOp::Ge, &Value::str("b"), &Value::str("abc")).unwrap(),
            Value::Bool(true)
        );
        assert!(compare(CompareOp::Eq, &Value::Bool(true), &Value::Bool(true)).is_err());
        assert!(compare(CompareOp::Eq, &list(&[]), &list(&[])).is_err());
    }

    #[test]
    fn mixed_numbers_compare_exactly() {
        let above = int(9_007_199_254_740_993);
        let rounded = Value::Real(9_007_199_254_740_992.0);
        assert_eq!(compare(CompareOp::Eq, &above, &rounded).unwrap(), Value::Bool(false));
        assert_eq!(compare(CompareOp::Gt, &above, &rounded).unwrap(), Value::Bool(true));
        assert_eq!(compare(CompareOp::Lt, &rounded, &above).unwrap(), Value::Bool(true));
        assert_eq!(compare(CompareOp::Le, &int(2), &Value::Real(2.0)).unwrap(), Value::Bool(true));
        assert_eq!(compare(CompareOp::Gt, &int(-3), &Value::Real(-3.5)).unwrap(), Value::Bool(true));
        assert_eq!(
            compare(CompareOp::Lt, &int(i64::MAX), &Value::Real(9.3e18)).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(member(&rounded, &Value::list(vec![above])).unwrap(), Value::Bool(false));
    }

    #[test]
    fn nan_only_satisfies_not_equal() {
        let nan = Value::Real(f64::NAN);
        assert_eq!(compare(CompareOp::Eq, &nan, &nan).unwrap(), Value::Bool(false));
        assert_eq!(compare(CompareOp::Ne, &int(1), &nan).unwrap(), Value::Bool(true));
        assert_eq!(compare(CompareOp::Ge, &nan, &int(1)).unwrap(), Value::Bool(false));
    }

    #[test]
    fn membership_terminates_on_distinct_cyclic_lists() {
        let a = list(&[1]);
        let b = list(&[1]);
        for value in [&a, &b] {
            if let Value::List(items) = value {
                items.borrow_mut()[0] = value.clone();
            }
        }
        assert_eq!(member(&a, &Value::list(vec![b.clone()])).unwrap(), Value::Bool(true));
        assert_eq!(member(&a, &Value::list(vec![list(&[1])])).unwrap(), Value::Bool(false));
    }

    #[test]
    fn membership_rules() {
        assert_eq!(member(&Value::str("ell"), &Value::str("hello")).unwrap(), Value::Bool(true));
        assert_eq!(member(&Value::Real(2.0), &list(&[1, 2])).unwrap(), Value::Bool(true));
        assert_eq!(
            member(&Value::str("a"), &Value::list(vec![Value::str("a")])).unwrap(),
            Value::Bool(true)
        );
        assert!(member(&int(1), &Value::str("1")).is_err());
        assert!(member(&int(1), &Value::tuple(vec![int(1)])).is_err());
    }

    #[test]
    fn cons_prepends_to_lists_only() {
        assert_eq!(cons(int(1), &list(&[2, 3])).unwrap(), list(&[1, 2, 3]));
        assert!(cons(int(1), &int(2)).is_err());
    }

    #[test]
    fn index_chains_walk_lists_and_strings() {
        let nested = Value::list(vec![list(&[1, 2]), Value::str("xyz")]);
        assert_eq!(index(nested.clone(), &[int(0), int(1)]).unwrap(), int(2));
        assert_eq!(index(nested.clone(), &[int(1), int(2)]).unwrap().to_string(), "z");
        assert_eq!(
            index(list(&[1, 2, 3]), &[int(5)]).unwrap_err(),
            SemanticError::IndexOutOfRange { index: 5, len: 3 }
        );
        assert!(index(list(&[1, 2, 3]), &[int(-1)]).is_err());
        assert!(index(list(&[1, 2, 3]), &[Value::Real(1.0)]).is_err());
        assert!(index(Value::tuple(vec![int(1)]), &[int(0)]).is_err());
        assert!(index(nested, &[int(0), int(0), int(0)]).is_err());
    }

    #[test]
    fn assign_index_mutates_the_shared_list() {
        let inner = list(&[1, 2]);
        let outer = Value::list(vec![inner.clone(), int(3)]);
        assign_index(&outer, &[int(0), int(1)], int(9)).unwrap();
        assert_eq!(inner, list(&[1, 9]));
        assert!(assign_index(&outer, &[int(1), int(0)], int(0)).is_err());
        assert!(assign_index(&Value::str("abc"), &[int(0)], Value::str("z")).is_err());
        assert!(assign_index(&outer, &[int(2)], int(0)).is_err());
    }

    #[test]
    fn tuple_fields_count_from_one() {
        let t = Value::tuple(vec![int(10), int(20), int(30)]);
        assert_eq!(tuple_field(&t, 1).unwrap(), int(10));
        assert_eq!(tuple_field(&t, 3).unwrap(), int(30));
        assert!(tuple_field(&t, 0).is_err());
        assert!(tuple_field(&t, 4).is_err());
        assert!(tuple_field(&list(&[1]), 1).is_err());
    }

    #[test]
    fn logic_requires_booleans() {
        assert_eq!(and_also(Value::Bool(true), Value::Bool(false)).unwrap(), Value::Bool(false));
        assert_eq!(or_else(Value::Bool(true), Value::Bool(false)).unwrap(), Value::Bool(true));
        assert!(and_also(Value::Bool(true), int(1)).is_err());
        assert_eq!(not(Value::Bool(false)).unwrap(), Value::Bool(true));
        assert!(not(int(0)).is_err());
        assert_eq!(negate(Value::Real(1.5)).unwrap(), Value::Real(-1.5));
        assert!(negate(Value::str("a")).is_err());
    }
}
