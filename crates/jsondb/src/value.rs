//! Scalar value type and its line-oriented codec (spec §4.A).
//!
//! `Scalar` is the payload of a leaf [`crate::node::Node`] and of every
//! element of a `ValueArray`. Its on-disk encoding — a single tag byte, the
//! configured separator, then text — is shared by the value codec and the
//! snapshot codec (spec §4.F).

use crate::error::{Error, Result};

/// A tagged primitive value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    String(String),
}

/// The fixed tag alphabet from spec §4.A. `Null` is not part of the source's
/// published eight-symbol alphabet (it covers the container kinds as well as
/// the primitive scalar kinds); we add `'0'` for it so every `Scalar` can
/// round-trip through the codec without relying on an external sentinel
/// lookup at decode time (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Null,
    Object,
    String,
    Int32,
    Int64,
    Float64,
    Bool,
    ObjectArray,
    ValueArray,
}

impl Tag {
    pub fn as_char(self) -> char {
        match self {
            Tag::Null => '0',
            Tag::Object => '1',
            Tag::String => '2',
            Tag::Int32 => '3',
            Tag::Int64 => '4',
            Tag::Float64 => '5',
            Tag::Bool => '6',
            Tag::ObjectArray => '7',
            Tag::ValueArray => '8',
        }
    }

    pub fn from_char(c: char) -> Option<Tag> {
        Some(match c {
            '0' => Tag::Null,
            '1' => Tag::Object,
            '2' => Tag::String,
            '3' => Tag::Int32,
            '4' => Tag::Int64,
            '5' => Tag::Float64,
            '6' => Tag::Bool,
            '7' => Tag::ObjectArray,
            '8' => Tag::ValueArray,
            _ => return None,
        })
    }
}

impl Scalar {
    pub fn tag(&self) -> Tag {
        match self {
            Scalar::Null => Tag::Null,
            Scalar::Bool(_) => Tag::Bool,
            Scalar::Int32(_) => Tag::Int32,
            Scalar::Int64(_) => Tag::Int64,
            Scalar::Float64(_) => Tag::Float64,
            Scalar::String(_) => Tag::String,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "bool",
            Scalar::Int32(_) => "int32",
            Scalar::Int64(_) => "int64",
            Scalar::Float64(_) => "float64",
            Scalar::String(_) => "string",
        }
    }

    /// Renders the payload text half of `<tag><SEP><text>`, per spec §4.A.
    /// Booleans render as `true`/`false`; the null sentinel is substituted
    /// for `Null`.
    pub fn encode_text(&self, null_sentinel: &str) -> String {
        match self {
            Scalar::Null => null_sentinel.to_string(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int32(n) => n.to_string(),
            Scalar::Int64(n) => n.to_string(),
            Scalar::Float64(n) => n.to_string(),
            Scalar::String(s) => s.clone(),
        }
    }

    /// Checks the reserved-separator precondition from spec §4.A: a string
    /// payload containing the configured separator or a newline cannot be
    /// written without escaping, and this codec does not escape, so it is
    /// rejected outright.
    pub fn check_encodable(&self, sep: char) -> Result<()> {
        if let Scalar::String(s) = self {
            if s.contains(sep) || s.contains('\n') {
                return Err(Error::Unsupported(
                    "string payload contains the reserved separator or a newline",
                ));
            }
        }
        Ok(())
    }

    /// Decodes `text` according to `tag`, substituting `Null` when `text`
    /// equals the configured null sentinel.
    pub fn decode(tag: Tag, text: &str, null_sentinel: &str) -> Result<Scalar> {
        if text == null_sentinel && !matches!(tag, Tag::String) {
            return Ok(Scalar::Null);
        }
        Ok(match tag {
            Tag::Null => Scalar::Null,
            Tag::Bool => Scalar::Bool(text == "true"),
            Tag::Int32 => Scalar::Int32(text.parse().unwrap_or_default()),
            Tag::Int64 => Scalar::Int64(text.parse().unwrap_or_default()),
            Tag::Float64 => Scalar::Float64(text.parse().unwrap_or_default()),
            Tag::String => {
                if text == null_sentinel {
                    Scalar::Null
                } else {
                    Scalar::String(text.to_string())
                }
            }
            Tag::Object | Tag::ObjectArray | Tag::ValueArray => {
                return Err(Error::ShapeMismatch {
                    expected: "scalar",
                    actual: "container",
                })
            }
        })
    }
}
