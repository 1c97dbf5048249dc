use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt::{self, Display, Write};
use std::mem;
use std::ops::Deref;
use std::rc::Rc;

use crate::stack::ensure_sufficient_stack;

/// Lists are shared: every name (or enclosing list) holding one sees
/// mutations made through the others.
pub type ListRef = Rc<ListItems>;

/// Backing storage of a list.
#[derive(Debug, Default)]
pub struct ListItems(RefCell<Vec<Value>>);

impl Deref for ListItems {
    type Target = RefCell<Vec<Value>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Drop for ListItems {
    fn drop(&mut self) {
        dismantle(mem::take(self.0.get_mut()));
    }
}

/// Backing storage of a tuple.
#[derive(Debug)]
pub struct TupleItems(Vec<Value>);

impl Deref for TupleItems {
    type Target = [Value];

    fn deref(&self) -> &[Value] {
        &self.0
    }
}

impl Drop for TupleItems {
    fn drop(&mut self) {
        dismantle(mem::take(&mut self.0));
    }
}

/// Frees nested containers one level at a time. Only containers this is the
/// last owner of are opened up; their contents join `pending` and each one
/// is dropped empty.
fn dismantle(mut pending: Vec<Value>) {
    while let Some(value) = pending.pop() {
        match value {
            Value::List(mut list) => {
                if let Some(items) = Rc::get_mut(&mut list) {
                    pending.append(items.0.get_mut());
                }
            }
            Value::Tuple(mut tuple) => {
                if let Some(items) = Rc::get_mut(&mut tuple) {
                    pending.append(&mut items.0);
                }
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Real(f64),
    Str(Rc<str>),
    List(ListRef),
    Tuple(Rc<TupleItems>),
}

impl Value {
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(ListItems(RefCell::new(items))))
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(Rc::new(TupleItems(items)))
    }

    pub fn str(text: impl Into<Rc<str>>) -> Self {
        Value::Str(text.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
        }
    }

    /// The form a value takes inside a list or tuple: strings quoted.
    pub fn repr(&self) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = write_repr(&mut out, self, &mut HashSet::new());
        out
    }
}

/// Orders an integer against a real without rounding the integer first.
/// `None` when the real is NaN.
pub fn cmp_integer_real(int: i64, real: f64) -> Option<Ordering> {
    // 2^63, exactly representable
    const BOUND: f64 = 9_223_372_036_854_775_808.0;
    if real.is_nan() {
        return None;
    }
    if real >= BOUND {
        return Some(Ordering::Less);
    }
    if real < -BOUND {
        return Some(Ordering::Greater);
    }
    let whole = real.trunc();
    match int.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0_f64.partial_cmp(&(real - whole)),
        unequal => Some(unequal),
    }
}

type ListPair = (*const ListItems, *const ListItems);

/// Structural equality as used by `in`: integers and reals compare by value,
/// booleans only equal booleans.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        equal(self, other, &mut HashSet::new())
    }
}

/// `comparing` holds the pairs of lists already being compared further up.
/// Reaching one again means both sides cycle back in step, which counts as
/// equal.
fn equal(left: &Value, right: &Value, comparing: &mut HashSet<ListPair>) -> bool {
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Integer(a), Value::Integer(b)) => a == b,
        (Value::Real(a), Value::Real(b)) => a == b,
        (Value::Integer(a), Value::Real(b)) | (Value::Real(b), Value::Integer(a)) => {
            cmp_integer_real(*a, *b) == Some(Ordering::Equal)
        }
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::List(a), Value::List(b)) => {
            if Rc::ptr_eq(a, b) {
                return true;
            }
            let pair = (Rc::as_ptr(a), Rc::as_ptr(b));
            if !comparing.insert(pair) {
                return true;
            }
            let same = all_equal(&a.borrow(), &b.borrow(), comparing);
            comparing.remove(&pair);
            same
        }
        (Value::Tuple(a), Value::Tuple(b)) => all_equal(a, b, comparing),
        _ => false,
    }
}

fn all_equal(left: &[Value], right: &[Value], comparing: &mut HashSet<ListPair>) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right)
            .all(|(a, b)| ensure_sufficient_stack(|| equal(a, b, comparing)))
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            other => write_repr(f, other, &mut HashSet::new()),
        }
    }
}

/// `open` holds the lists currently being written so a list nested in itself
/// prints as `[...]` instead of recursing forever.
fn write_repr(
    out: &mut impl Write,
    value: &Value,
    open: &mut HashSet<*const ListItems>,
) -> fmt::Result {
    match value {
        Value::Bool(true) => out.write_str("True"),
        Value::Bool(false) => out.write_str("False"),
        Value::Integer(n) => write!(out, "{n}"),
        Value::Real(n) => out.write_str(&format_real(*n)),
        Value::Str(s) => write_quoted(out, s),
        Value::List(list) => {
            let ptr = Rc::as_ptr(list);
            if !open.insert(ptr) {
                return out.write_str("[...]");
            }
            out.write_char('[')?;
            write_items(out, &list.borrow(), open)?;
            open.remove(&ptr);
            out.write_char(']')
        }
        Value::Tuple(items) => {
            out.write_char('(')?;
            write_items(out, items, open)?;
            if items.len() == 1 {
                out.write_char(',')?;
            }
            out.write_char(')')
        }
    }
}

fn write_items(
    out: &mut impl Write,
    items: &[Value],
    open: &mut HashSet<*const ListItems>,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.write_str(", ")?;
        }
        ensure_sufficient_stack(|| write_repr(out, item, open))?;
    }
    Ok(())
}

/// Shortest round-trip digits, always with a fractional part or an exponent;
/// exponents carry a sign and at least two digits (`1e+16`, `1e-05`).
fn format_real(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let text = format!("{n:?}");
    match text.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => text,
    }
}

fn write_quoted(out: &mut impl Write, s: &str) -> fmt::Result {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    out.write_char(quote)?;
    for c in s.chars() {
        match c {
            '\\' => out.write_str("\\\\")?,
            '\n' => out.write_str("\\n")?,
            '\t' => out.write_str("\\t")?,
            '\r' => out.write_str("\\r")?,
            c if c == quote => {
                out.write_char('\\')?;
                out.write_char(c)?;
            }
            c => out.write_char(c)?,
        }
    }
    out.write_char(quote)
}
