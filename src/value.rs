//! Dynamically-typed values for generics and results.
//!
//! A block declares generic and result *names*; the values bound to them are
//! [`Value`]s supplied by whoever builds the topology. Blocks read them back
//! through [`FromValue`], which performs the numeric widening a caller would
//! expect (an integer is a valid float, a float is a valid complex number)
//! and refuses conversions that lose range.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A generic or result value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    /// Real number.
    Float(f64),
    /// Complex number.
    Complex(Complex64),
    /// Text.
    Text(String),
    /// Array of signed integers.
    IntArray(Vec<i64>),
    /// Array of real numbers.
    FloatArray(Vec<f64>),
    /// Array of complex numbers.
    ComplexArray(Vec<Complex64>),
}

impl Value {
    /// Short name of the variant, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Complex(_) => "complex",
            Value::Text(_) => "text",
            Value::IntArray(_) => "int array",
            Value::FloatArray(_) => "float array",
            Value::ComplexArray(_) => "complex array",
        }
    }

    /// Typed view of this value, if it converts.
    pub fn get<T: FromValue>(&self) -> Option<T> {
        T::from_value(self)
    }

    fn as_i128(&self) -> Option<i128> {
        match *self {
            Value::Int(v) => Some(i128::from(v)),
            Value::UInt(v) => Some(i128::from(v)),
            _ => None,
        }
    }

    fn items(&self) -> Option<Vec<Value>> {
        match self {
            Value::IntArray(v) => Some(v.iter().copied().map(Value::Int).collect()),
            Value::FloatArray(v) => Some(v.iter().copied().map(Value::Float).collect()),
            Value::ComplexArray(v) => Some(v.iter().copied().map(Value::Complex).collect()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Complex(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v:?}"),
            Value::IntArray(v) => write!(f, "{v:?}"),
            Value::FloatArray(v) => write!(f, "{v:?}"),
            Value::ComplexArray(v) => {
                let items: Vec<String> = v.iter().map(|c| c.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
        }
    }
}

/// Conversion out of a [`Value`].
pub trait FromValue: Sized {
    /// What the conversion expects, for error messages.
    fn expected() -> &'static str;

    /// Convert, or `None` if the value has the wrong shape or range.
    fn from_value(value: &Value) -> Option<Self>;
}

/// Element types allowed inside array generics.
pub trait Numeric: FromValue + Copy {}

macro_rules! impl_integer {
    ($($ty:ty),*) => {$(
        impl FromValue for $ty {
            fn expected() -> &'static str {
                stringify!($ty)
            }

            fn from_value(value: &Value) -> Option<Self> {
                value.as_i128().and_then(|v| <$ty>::try_from(v).ok())
            }
        }

        impl Numeric for $ty {}

        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                match i64::try_from(v) {
                    Ok(v) => Value::Int(v),
                    Err(_) => Value::UInt(v as u64),
                }
            }
        }
    )*};
}

impl_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl FromValue for f64 {
    fn expected() -> &'static str {
        "float"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match *value {
            Value::Float(v) => Some(v),
            Value::Int(v) => Some(v as f64),
            Value::UInt(v) => Some(v as f64),
            _ => None,
        }
    }
}

impl Numeric for f64 {}

impl FromValue for f32 {
    fn expected() -> &'static str {
        "float"
    }

    fn from_value(value: &Value) -> Option<Self> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl Numeric for f32 {}

impl FromValue for Complex64 {
    fn expected() -> &'static str {
        "complex"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match *value {
            Value::Complex(v) => Some(v),
            _ => f64::from_value(value).map(|re| Complex64::new(re, 0.0)),
        }
    }
}

impl Numeric for Complex64 {}

impl FromValue for bool {
    fn expected() -> &'static str {
        "bool"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match *value {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }
}

impl FromValue for String {
    fn expected() -> &'static str {
        "text"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(v) => Some(v.clone()),
            _ => None,
        }
    }
}

/// Opaque access: any value converts to itself.
impl FromValue for Value {
    fn expected() -> &'static str {
        "any value"
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl<T: Numeric> FromValue for Vec<T> {
    fn expected() -> &'static str {
        "array"
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.items()?.iter().map(T::from_value).collect()
    }
}

impl<T: Numeric, const N: usize> FromValue for [T; N] {
    fn expected() -> &'static str {
        "fixed-length array"
    }

    fn from_value(value: &Value) -> Option<Self> {
        Vec::<T>::from_value(value)?.try_into().ok()
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<Complex64> for Value {
    fn from(v: Complex64) -> Self {
        Value::Complex(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Value::IntArray(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::FloatArray(v)
    }
}

impl From<Vec<Complex64>> for Value {
    fn from(v: Vec<Complex64>) -> Self {
        Value::ComplexArray(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_narrow_with_range_check() {
        assert_eq!(Value::Int(200).get::<u8>(), Some(200));
        assert_eq!(Value::Int(300).get::<u8>(), None);
        assert_eq!(Value::Int(-1).get::<u32>(), None);
        assert_eq!(Value::UInt(u64::MAX).get::<u64>(), Some(u64::MAX));
        assert_eq!(Value::UInt(u64::MAX).get::<i64>(), None);
    }

    #[test]
    fn numeric_widening() {
        assert_eq!(Value::Int(3).get::<f64>(), Some(3.0));
        assert_eq!(
            Value::Float(1.5).get::<Complex64>(),
            Some(Complex64::new(1.5, 0.0))
        );
        assert_eq!(Value::Float(1.5).get::<i32>(), None);
        assert_eq!(Value::Bool(true).get::<f64>(), None);
    }

    #[test]
    fn arrays_convert_elementwise() {
        let v = Value::IntArray(vec![1, 2, 3]);
        assert_eq!(v.get::<Vec<f64>>(), Some(vec![1.0, 2.0, 3.0]));
        assert_eq!(v.get::<[i16; 3]>(), Some([1, 2, 3]));
        assert_eq!(v.get::<[i16; 2]>(), None);
        assert_eq!(Value::Int(1).get::<Vec<i64>>(), None);
    }

    #[test]
    fn opaque_access_clones() {
        let v = Value::Text("tap".into());
        assert_eq!(v.get::<Value>(), Some(v.clone()));
        assert_eq!(v.get::<String>().as_deref(), Some("tap"));
    }

    #[test]
    fn unsigned_out_of_i64_range_becomes_uint() {
        assert_eq!(Value::from(u64::MAX), Value::UInt(u64::MAX));
        assert_eq!(Value::from(7u16), Value::Int(7));
    }

    #[test]
    fn json_representation_is_tagged() {
        let v: Value = serde_json::from_str(r#"{"complex": [1.0, -2.0]}"#).unwrap();
        assert_eq!(v, Value::Complex(Complex64::new(1.0, -2.0)));
        let text = serde_json::to_string(&Value::Float(0.5)).unwrap();
        assert_eq!(text, r#"{"float":0.5}"#);
    }
}
