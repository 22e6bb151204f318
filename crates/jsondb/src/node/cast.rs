//! Cross-type conversion matrix for `get<T>`/`set<T>` (spec §4.B "Cast
//! policy", §7 "Cast failure").
//!
//! Per §7's resolved Open Question, every conversion here is infallible:
//! an unrecognized conversion yields the target type's `Default`, it never
//! returns an `Err`.

use crate::value::{Scalar, Tag};

/// A Rust type `get<T>` can produce from a stored [`Scalar`].
pub trait FromScalar: Default {
    fn from_scalar(value: &Scalar) -> Self;
}

/// A Rust type `set<T>`/`add<T>` can be converted into a [`Scalar`] of its
/// own natural tag (before any further coercion to an existing node's tag).
pub trait ToScalar {
    fn to_scalar(&self) -> Scalar;
}

impl FromScalar for String {
    fn from_scalar(value: &Scalar) -> Self {
        match value {
            Scalar::Null => String::default(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int32(n) => n.to_string(),
            Scalar::Int64(n) => n.to_string(),
            Scalar::Float64(n) => n.to_string(),
            Scalar::String(s) => s.clone(),
        }
    }
}

impl ToScalar for String {
    fn to_scalar(&self) -> Scalar {
        Scalar::String(self.clone())
    }
}
impl ToScalar for &str {
    fn to_scalar(&self) -> Scalar {
        Scalar::String(self.to_string())
    }
}

impl FromScalar for i32 {
    fn from_scalar(value: &Scalar) -> Self {
        match value {
            Scalar::Null => 0,
            Scalar::Bool(b) => *b as i32,
            Scalar::Int32(n) => *n,
            Scalar::Int64(n) => *n as i32,
            Scalar::Float64(n) => *n as i32,
            Scalar::String(s) => s.parse().unwrap_or_default(),
        }
    }
}
impl ToScalar for i32 {
    fn to_scalar(&self) -> Scalar {
        Scalar::Int32(*self)
    }
}

impl FromScalar for i64 {
    fn from_scalar(value: &Scalar) -> Self {
        match value {
            Scalar::Null => 0,
            Scalar::Bool(b) => *b as i64,
            Scalar::Int32(n) => *n as i64,
            Scalar::Int64(n) => *n,
            Scalar::Float64(n) => *n as i64,
            Scalar::String(s) => s.parse().unwrap_or_default(),
        }
    }
}
impl ToScalar for i64 {
    fn to_scalar(&self) -> Scalar {
        Scalar::Int64(*self)
    }
}

impl FromScalar for f64 {
    fn from_scalar(value: &Scalar) -> Self {
        match value {
            Scalar::Null => 0.0,
            Scalar::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Scalar::Int32(n) => *n as f64,
            Scalar::Int64(n) => *n as f64,
            Scalar::Float64(n) => *n,
            Scalar::String(s) => s.parse().unwrap_or_default(),
        }
    }
}
impl ToScalar for f64 {
    fn to_scalar(&self) -> Scalar {
        Scalar::Float64(*self)
    }
}

impl FromScalar for bool {
    fn from_scalar(value: &Scalar) -> Self {
        match value {
            Scalar::Null => false,
            Scalar::Bool(b) => *b,
            Scalar::Int32(n) => *n != 0,
            Scalar::Int64(n) => *n != 0,
            Scalar::Float64(n) => *n != 0.0,
            Scalar::String(s) => s == "true",
        }
    }
}
impl ToScalar for bool {
    fn to_scalar(&self) -> Scalar {
        Scalar::Bool(*self)
    }
}

/// Recasts `value` into the scalar type named by `target`, applying the
/// same conversion table `FromScalar` impls use. Used by `set<T>` to keep a
/// node's original scalar tag stable across an overwrite (spec §4.B:
/// "if Scalar, overwrite payload (convert as above)").
pub fn coerce(value: &Scalar, target: Tag) -> Scalar {
    match target {
        Tag::Null => Scalar::Null,
        Tag::String => Scalar::String(String::from_scalar(value)),
        Tag::Int32 => Scalar::Int32(i32::from_scalar(value)),
        Tag::Int64 => Scalar::Int64(i64::from_scalar(value)),
        Tag::Float64 => Scalar::Float64(f64::from_scalar(value)),
        Tag::Bool => Scalar::Bool(bool::from_scalar(value)),
        // Containers are never a scalar's tag; fall back to identity.
        Tag::Object | Tag::ObjectArray | Tag::ValueArray => value.clone(),
    }
}
