//! Flag values and the per-kind parsing rules.

use std::{cell::RefCell, fmt, rc::Rc, time::Duration};

/// The kind of value a flag holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Bool,
    Int,
    Int64,
    Uint,
    Uint64,
    Float64,
    String,
    Duration,
    Generic,
    IntSlice,
    Int64Slice,
    UintSlice,
    Uint64Slice,
    Float64Slice,
    StringSlice,
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Int64 => "int64",
            Kind::Uint => "uint",
            Kind::Uint64 => "uint64",
            Kind::Float64 => "float64",
            Kind::String => "string",
            Kind::Duration => "duration",
            Kind::Generic => "generic",
            Kind::IntSlice => "[]int",
            Kind::Int64Slice => "[]int64",
            Kind::UintSlice => "[]uint",
            Kind::Uint64Slice => "[]uint64",
            Kind::Float64Slice => "[]float64",
            Kind::StringSlice => "[]string",
        }
    }

    /// Everything but `bool` consumes the token after the flag.
    pub fn takes_value(self) -> bool {
        self != Kind::Bool
    }

    /// The element kind of a slice kind.
    pub fn element(self) -> Option<Kind> {
        let elem = match self {
            Kind::IntSlice => Kind::Int,
            Kind::Int64Slice => Kind::Int64,
            Kind::UintSlice => Kind::Uint,
            Kind::Uint64Slice => Kind::Uint64,
            Kind::Float64Slice => Kind::Float64,
            Kind::StringSlice => Kind::String,
            _ => return None,
        };
        Some(elem)
    }

    pub fn is_slice(self) -> bool {
        self.element().is_some()
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A user-defined flag type.
///
/// The flag's default is cloned before parsing, and `set` is called once for
/// every occurrence on the command line (or once with an environment or file
/// value).
pub trait Generic: fmt::Debug + fmt::Display {
    fn set(&mut self, value: &str) -> Result<(), String>;

    fn clone_box(&self) -> Box<dyn Generic>;
}

impl Clone for Box<dyn Generic> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl PartialEq for dyn Generic {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(isize),
    Int64(i64),
    Uint(usize),
    Uint64(u64),
    Float64(f64),
    String(String),
    Duration(Duration),
    Generic(Box<dyn Generic>),
    IntSlice(Vec<isize>),
    Int64Slice(Vec<i64>),
    UintSlice(Vec<usize>),
    Uint64Slice(Vec<u64>),
    Float64Slice(Vec<f64>),
    StringSlice(Vec<String>),
}

macro_rules! gather {
    ($items:expr, $variant:ident) => {
        $items
            .into_iter()
            .filter_map(|it| match it {
                Value::$variant(it) => Some(it),
                _ => None,
            })
            .collect()
    };
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Int64(_) => Kind::Int64,
            Value::Uint(_) => Kind::Uint,
            Value::Uint64(_) => Kind::Uint64,
            Value::Float64(_) => Kind::Float64,
            Value::String(_) => Kind::String,
            Value::Duration(_) => Kind::Duration,
            Value::Generic(_) => Kind::Generic,
            Value::IntSlice(_) => Kind::IntSlice,
            Value::Int64Slice(_) => Kind::Int64Slice,
            Value::UintSlice(_) => Kind::UintSlice,
            Value::Uint64Slice(_) => Kind::Uint64Slice,
            Value::Float64Slice(_) => Kind::Float64Slice,
            Value::StringSlice(_) => Kind::StringSlice,
        }
    }

    /// Folds the values of several occurrences into one value of `kind`.
    ///
    /// Slice kinds collect every element, scalar kinds keep the last
    /// occurrence. Items must already have the element kind (or `kind` itself
    /// for scalars).
    pub(crate) fn merge(kind: Kind, items: Vec<Value>) -> Option<Value> {
        let value = match kind {
            Kind::IntSlice => Value::IntSlice(gather!(items, Int)),
            Kind::Int64Slice => Value::Int64Slice(gather!(items, Int64)),
            Kind::UintSlice => Value::UintSlice(gather!(items, Uint)),
            Kind::Uint64Slice => Value::Uint64Slice(gather!(items, Uint64)),
            Kind::Float64Slice => Value::Float64Slice(gather!(items, Float64)),
            Kind::StringSlice => Value::StringSlice(gather!(items, String)),
            _ => return items.into_iter().last(),
        };
        Some(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
            f.write_str("[")?;
            for (i, it) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{it}")?;
            }
            f.write_str("]")
        }
        match self {
            Value::Bool(it) => write!(f, "{it}"),
            Value::Int(it) => write!(f, "{it}"),
            Value::Int64(it) => write!(f, "{it}"),
            Value::Uint(it) => write!(f, "{it}"),
            Value::Uint64(it) => write!(f, "{it}"),
            Value::Float64(it) => write!(f, "{it}"),
            Value::String(it) => write!(f, "{it:?}"),
            Value::Duration(it) => write!(f, "{it:?}"),
            Value::Generic(it) => write!(f, "{it}"),
            Value::IntSlice(it) => list(f, it),
            Value::Int64Slice(it) => list(f, it),
            Value::UintSlice(it) => list(f, it),
            Value::Uint64Slice(it) => list(f, it),
            Value::Float64Slice(it) => list(f, it),
            Value::StringSlice(it) => {
                let quoted = it.iter().map(|it| format!("{it:?}")).collect::<Vec<_>>();
                list(f, &quoted)
            }
        }
    }
}

/// Rust types that a [`Value`] of one particular kind converts into.
pub trait FromValue: Sized {
    const KIND: Kind;

    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        impl FromValue for $ty {
            const KIND: Kind = Kind::$variant;

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(it) => Some(it.clone()),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Value {
            fn from(it: $ty) -> Value {
                Value::$variant(it)
            }
        }
    )*};
}

from_value! {
    bool => Bool,
    isize => Int,
    i64 => Int64,
    usize => Uint,
    u64 => Uint64,
    f64 => Float64,
    String => String,
    Duration => Duration,
    Box<dyn Generic> => Generic,
    Vec<isize> => IntSlice,
    Vec<i64> => Int64Slice,
    Vec<usize> => UintSlice,
    Vec<u64> => Uint64Slice,
    Vec<f64> => Float64Slice,
    Vec<String> => StringSlice,
}

/// Caller-owned storage that receives a flag's resolved value.
///
/// Clones share the same cell.
#[derive(Debug, Default)]
pub struct Slot<T> {
    pub(crate) cell: Rc<RefCell<T>>,
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Slot { cell: Rc::clone(&self.cell) }
    }
}

impl<T> Slot<T> {
    pub fn new(init: T) -> Slot<T> {
        Slot { cell: Rc::new(RefCell::new(init)) }
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.cell.borrow().clone()
    }

    pub fn set(&self, value: T) {
        *self.cell.borrow_mut() = value;
    }
}

/// Type-erased destination of a flag.
pub(crate) trait Sink: fmt::Debug {
    fn store(&self, value: &Value);
}

impl<T: FromValue + fmt::Debug> Sink for RefCell<T> {
    fn store(&self, value: &Value) {
        if let Some(it) = T::from_value(value) {
            *self.borrow_mut() = it;
        }
    }
}

/// A raw string that failed to parse as a kind.
#[derive(Debug)]
pub(crate) struct Rejected {
    pub(crate) raw: String,
    pub(crate) reason: String,
}

/// Parses raw occurrences into a value of `kind`. `Generic` is handled by the
/// flag, which owns the prototype to parse into.
pub(crate) fn parse(kind: Kind, raws: &[&str]) -> Result<Option<Value>, Rejected> {
    let elem = kind.element().unwrap_or(kind);
    let items = raws
        .iter()
        .map(|raw| {
            parse_scalar(elem, raw).map_err(|reason| Rejected { raw: raw.to_string(), reason })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::merge(kind, items))
}

fn parse_scalar(kind: Kind, raw: &str) -> Result<Value, String> {
    let value = match kind {
        Kind::Bool => Value::Bool(parse_bool(raw)?),
        Kind::Int => Value::Int(parse_int(raw)?),
        Kind::Int64 => Value::Int64(parse_int(raw)?),
        Kind::Uint => Value::Uint(parse_int(raw)?),
        Kind::Uint64 => Value::Uint64(parse_int(raw)?),
        Kind::Float64 => Value::Float64(raw.parse().map_err(|err| format!("{err}"))?),
        Kind::String => Value::String(raw.to_string()),
        Kind::Duration => Value::Duration(parse_duration(raw)?),
        _ => return Err(format!("{kind} is not a scalar kind")),
    };
    Ok(value)
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err("invalid syntax".to_string()),
    }
}

fn parse_int<T: TryFrom<i128>>(raw: &str) -> Result<T, String> {
    let (negative, unsigned) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let (radix, digits) = [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)]
        .iter()
        .find_map(|&(prefix, radix)| unsigned.strip_prefix(prefix).map(|rest| (radix, rest)))
        .unwrap_or((10, unsigned));
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return Err("invalid syntax".to_string());
    }
    let magnitude = i128::from_str_radix(digits, radix).map_err(|err| format!("{err}"))?;
    let value = if negative { -magnitude } else { magnitude };
    T::try_from(value).map_err(|_| "value out of range".to_string())
}

/// Parses a duration such as `300ms`, `1.5h` or `2h45m`.
///
/// Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. A bare `0`
/// is accepted; negative durations are not.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let invalid = || format!("invalid duration {raw:?}");
    let mut rest = raw.strip_prefix('+').unwrap_or(raw);
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() || rest.starts_with('-') {
        return Err(invalid());
    }

    let mut nanos: u128 = 0;
    while !rest.is_empty() {
        let split = rest.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(rest.len());
        let (number, tail) = rest.split_at(split);
        let split = tail.find(|c: char| c.is_ascii_digit() || c == '.').unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(split);
        rest = tail;

        let scale: u128 = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 60 * 60 * 1_000_000_000,
            "" => return Err(format!("missing unit in duration {raw:?}")),
            _ => return Err(format!("unknown unit {unit:?} in duration {raw:?}")),
        };
        let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
        if (whole.is_empty() && frac.is_empty()) || frac.contains('.') {
            return Err(invalid());
        }
        let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| invalid())? };
        let mut value = whole.checked_mul(scale).ok_or_else(invalid)?;
        let mut place = scale;
        for digit in frac.bytes() {
            place /= 10;
            if place == 0 {
                break;
            }
            value = u128::from(digit - b'0')
                .checked_mul(place)
                .and_then(|it| value.checked_add(it))
                .ok_or_else(invalid)?;
        }
        nanos = nanos.checked_add(value).ok_or_else(invalid)?;
    }

    let secs = u64::try_from(nanos / 1_000_000_000).map_err(|_| invalid())?;
    Ok(Duration::new(secs, (nanos % 1_000_000_000) as u32))
}
