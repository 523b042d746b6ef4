//! YANG data type definitions and scalar conversions

use std::fmt;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde_json::Value;

use crate::error::{CodecError, Result};

/// One named member of an enumeration type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    pub name: String,
    pub value: i64,
}

/// Represents YANG data types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YangType {
    String,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    /// Fixed-point decimal with 1..=18 fraction digits
    Decimal64 {
        fraction_digits: u8,
    },
    Binary,
    Boolean,
    Empty,
    Identityref,
    /// Enumeration, members sorted by ordinal
    Enumeration(Vec<EnumMember>),
    /// Union of multiple types, tried in declaration order
    Union(Vec<YangType>),
}

impl YangType {
    /// Parse a YANG type from a schema descriptor `type` field
    pub fn from_schema_type(type_value: &Value, fraction_digits: Option<u8>) -> Result<Self> {
        match type_value {
            Value::String(s) => Self::from_name(s, fraction_digits),
            Value::Object(map) => {
                // Enumeration: {"ordinal": "name", ...}
                let mut members = map
                    .iter()
                    .map(|(k, v)| {
                        let value = k.parse::<i64>().map_err(|_| {
                            CodecError::InvalidSchema(format!("enum ordinal '{}' is not an integer", k))
                        })?;
                        let name = v.as_str().ok_or_else(|| {
                            CodecError::InvalidSchema(format!("enum name for ordinal {} must be a string", k))
                        })?;
                        Ok(EnumMember {
                            name: name.to_string(),
                            value,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                members.sort_by_key(|m| m.value);
                Ok(YangType::Enumeration(members))
            }
            Value::Array(arr) => {
                // Union of types
                let types = arr
                    .iter()
                    .map(|v| Self::from_schema_type(v, fraction_digits))
                    .collect::<Result<Vec<_>>>()?;
                if types.is_empty() {
                    return Err(CodecError::InvalidSchema("empty union".into()));
                }
                Ok(YangType::Union(types))
            }
            other => Err(CodecError::InvalidSchema(format!(
                "unsupported type descriptor {}",
                other
            ))),
        }
    }

    fn from_name(s: &str, fraction_digits: Option<u8>) -> Result<Self> {
        let ty = match s {
            "string" => YangType::String,
            "int8" => YangType::Int8,
            "int16" => YangType::Int16,
            "int32" => YangType::Int32,
            "int64" => YangType::Int64,
            "uint8" => YangType::Uint8,
            "uint16" => YangType::Uint16,
            "uint32" => YangType::Uint32,
            "uint64" => YangType::Uint64,
            "decimal64" => {
                let fraction_digits = fraction_digits.ok_or_else(|| {
                    CodecError::InvalidSchema("decimal64 requires fraction-digits".into())
                })?;
                return Self::decimal64(fraction_digits);
            }
            "binary" => YangType::Binary,
            "boolean" => YangType::Boolean,
            "empty" => YangType::Empty,
            "identityref" => YangType::Identityref,
            other => {
                return Err(CodecError::InvalidSchema(format!(
                    "unknown type name '{}'",
                    other
                )));
            }
        };
        Ok(ty)
    }

    /// Decimal64 with the given number of fraction digits (1..=18)
    pub fn decimal64(fraction_digits: u8) -> Result<Self> {
        if !(1..=18).contains(&fraction_digits) {
            return Err(CodecError::InvalidSchema(format!(
                "fraction-digits must be within 1..=18, got {}",
                fraction_digits
            )));
        }
        Ok(YangType::Decimal64 { fraction_digits })
    }

    /// Enumeration whose members get ordinals in declaration order
    pub fn enumeration<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        YangType::Enumeration(
            names
                .into_iter()
                .zip(0..)
                .map(|(name, value)| EnumMember {
                    name: name.into(),
                    value,
                })
                .collect(),
        )
    }

    fn integer_range(&self) -> Option<(i128, i128)> {
        match self {
            YangType::Int8 => Some((i8::MIN.into(), i8::MAX.into())),
            YangType::Int16 => Some((i16::MIN.into(), i16::MAX.into())),
            YangType::Int32 => Some((i32::MIN.into(), i32::MAX.into())),
            YangType::Int64 => Some((i64::MIN.into(), i64::MAX.into())),
            YangType::Uint8 => Some((0, u8::MAX.into())),
            YangType::Uint16 => Some((0, u16::MAX.into())),
            YangType::Uint32 => Some((0, u32::MAX.into())),
            YangType::Uint64 => Some((0, u64::MAX.into())),
            _ => None,
        }
    }

    fn is_unsigned(&self) -> bool {
        matches!(
            self,
            YangType::Uint8 | YangType::Uint16 | YangType::Uint32 | YangType::Uint64
        )
    }

    fn integer(&self, n: i128) -> Option<Scalar> {
        let (min, max) = self.integer_range()?;
        if n < min || n > max {
            return None;
        }
        if self.is_unsigned() {
            u64::try_from(n).ok().map(Scalar::Uint)
        } else {
            i64::try_from(n).ok().map(Scalar::Int)
        }
    }

    fn member(&self, name: &str) -> Option<Scalar> {
        match self {
            YangType::Enumeration(members) => members
                .iter()
                .any(|m| m.name == name)
                .then(|| Scalar::Enum(name.to_string())),
            _ => None,
        }
    }

    /// Check a caller-supplied value against this type.
    ///
    /// Returns the value in canonical form for this type (e.g. integers moved
    /// to the signed/unsigned representation, strings promoted to enum names),
    /// or `None` if the value does not belong to the type.
    pub fn coerce(&self, value: &Scalar) -> Option<Scalar> {
        match (self, value) {
            (YangType::Union(types), _) => types
                .iter()
                .find_map(|t| t.coerce(value))
                .map(|v| self.canonical(v)),
            (YangType::String | YangType::Identityref, Scalar::String(s)) => {
                Some(Scalar::String(s.clone()))
            }
            (t, Scalar::Int(n)) if t.integer_range().is_some() => t.integer(i128::from(*n)),
            (t, Scalar::Uint(n)) if t.integer_range().is_some() => t.integer(i128::from(*n)),
            (YangType::Decimal64 { fraction_digits }, Scalar::Decimal(d)) => {
                d.rescale(*fraction_digits).map(Scalar::Decimal)
            }
            (YangType::Decimal64 { fraction_digits }, Scalar::Int(n)) => {
                Decimal64::from_integer(i128::from(*n), *fraction_digits).map(Scalar::Decimal)
            }
            (YangType::Decimal64 { fraction_digits }, Scalar::Uint(n)) => {
                Decimal64::from_integer(i128::from(*n), *fraction_digits).map(Scalar::Decimal)
            }
            (YangType::Boolean, Scalar::Bool(b)) => Some(Scalar::Bool(*b)),
            (YangType::Empty, Scalar::Empty) => Some(Scalar::Empty),
            (YangType::Binary, Scalar::Binary(bytes)) => Some(Scalar::Binary(bytes.clone())),
            (YangType::Enumeration(_), Scalar::Enum(name) | Scalar::String(name)) => {
                self.member(name)
            }
            _ => None,
        }
    }

    /// A union value is stored as the member its text resolves to, so a
    /// value reads back the same from XML text and from JSON.
    fn canonical(&self, value: Scalar) -> Scalar {
        self.parse_text(&value.to_text()).unwrap_or(value)
    }

    /// Convert XML element text to a scalar of this type
    pub fn parse_text(&self, text: &str) -> Option<Scalar> {
        match self {
            YangType::String | YangType::Identityref => Some(Scalar::String(text.to_string())),
            YangType::Int8
            | YangType::Int16
            | YangType::Int32
            | YangType::Int64
            | YangType::Uint8
            | YangType::Uint16
            | YangType::Uint32
            | YangType::Uint64 => text.parse::<i128>().ok().and_then(|n| self.integer(n)),
            YangType::Decimal64 { fraction_digits } => {
                Decimal64::parse(text, *fraction_digits).map(Scalar::Decimal)
            }
            YangType::Boolean => match text {
                "true" => Some(Scalar::Bool(true)),
                "false" => Some(Scalar::Bool(false)),
                _ => None,
            },
            YangType::Empty => text.is_empty().then_some(Scalar::Empty),
            YangType::Binary => BASE64.decode(text).ok().map(Scalar::Binary),
            YangType::Enumeration(_) => self.member(text),
            YangType::Union(types) => types.iter().find_map(|t| t.parse_text(text)),
        }
    }

    /// Convert a JSON member value to a scalar of this type
    pub fn parse_json(&self, value: &Value) -> Option<Scalar> {
        match (self, value) {
            (YangType::Union(types), _) => types
                .iter()
                .find_map(|t| t.parse_json(value))
                .map(|v| self.canonical(v)),
            (YangType::String | YangType::Identityref, Value::String(s)) => {
                Some(Scalar::String(s.clone()))
            }
            (t, Value::Number(n)) if t.integer_range().is_some() => {
                if let Some(i) = n.as_i64() {
                    t.integer(i128::from(i))
                } else {
                    n.as_u64().and_then(|u| t.integer(i128::from(u)))
                }
            }
            (YangType::Decimal64 { fraction_digits }, Value::Number(n)) => {
                Decimal64::parse(&n.to_string(), *fraction_digits).map(Scalar::Decimal)
            }
            (YangType::Boolean, Value::Bool(b)) => Some(Scalar::Bool(*b)),
            (YangType::Empty, Value::Array(arr)) if arr.len() == 1 && arr[0].is_null() => {
                Some(Scalar::Empty)
            }
            (YangType::Binary, Value::String(s)) => BASE64.decode(s).ok().map(Scalar::Binary),
            (YangType::Enumeration(_), Value::String(s)) => self.member(s),
            _ => None,
        }
    }
}

impl fmt::Display for YangType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YangType::String => f.write_str("string"),
            YangType::Int8 => f.write_str("int8"),
            YangType::Int16 => f.write_str("int16"),
            YangType::Int32 => f.write_str("int32"),
            YangType::Int64 => f.write_str("int64"),
            YangType::Uint8 => f.write_str("uint8"),
            YangType::Uint16 => f.write_str("uint16"),
            YangType::Uint32 => f.write_str("uint32"),
            YangType::Uint64 => f.write_str("uint64"),
            YangType::Decimal64 { fraction_digits } => {
                write!(f, "decimal64(fraction-digits {})", fraction_digits)
            }
            YangType::Binary => f.write_str("binary"),
            YangType::Boolean => f.write_str("boolean"),
            YangType::Empty => f.write_str("empty"),
            YangType::Identityref => f.write_str("identityref"),
            YangType::Enumeration(members) => {
                let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
                write!(f, "enumeration {{{}}}", names.join(", "))
            }
            YangType::Union(types) => {
                let names: Vec<String> = types.iter().map(|t| t.to_string()).collect();
                write!(f, "union [{}]", names.join(", "))
            }
        }
    }
}

/// Fixed-point decimal value: `mantissa / 10^fraction_digits`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal64 {
    mantissa: i64,
    fraction_digits: u8,
}

impl Decimal64 {
    pub fn new(mantissa: i64, fraction_digits: u8) -> Self {
        Self {
            mantissa,
            fraction_digits,
        }
    }

    pub fn mantissa(&self) -> i64 {
        self.mantissa
    }

    pub fn fraction_digits(&self) -> u8 {
        self.fraction_digits
    }

    fn from_integer(n: i128, fraction_digits: u8) -> Option<Self> {
        let scaled = n.checked_mul(10i128.pow(u32::from(fraction_digits)))?;
        i64::try_from(scaled)
            .ok()
            .map(|mantissa| Self::new(mantissa, fraction_digits))
    }

    /// Same value expressed with a different number of fraction digits, if exact
    fn rescale(&self, fraction_digits: u8) -> Option<Self> {
        let from = u32::from(self.fraction_digits);
        let to = u32::from(fraction_digits);
        let mantissa = i128::from(self.mantissa);
        let scaled = if to >= from {
            mantissa.checked_mul(10i128.pow(to - from))?
        } else {
            let divisor = 10i128.pow(from - to);
            if mantissa % divisor != 0 {
                return None;
            }
            mantissa / divisor
        };
        i64::try_from(scaled)
            .ok()
            .map(|mantissa| Self::new(mantissa, fraction_digits))
    }

    /// Parse the YANG lexical form (`-12.5`, `3`) with the given fraction digits.
    ///
    /// Digits beyond `fraction_digits` are accepted only when they are zeros.
    pub fn parse(text: &str, fraction_digits: u8) -> Option<Self> {
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((_, "")) => return None,
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };
        if int_part.is_empty()
            || !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        let width = usize::from(fraction_digits);
        let frac_part = if frac_part.len() > width {
            let (kept, rest) = frac_part.split_at(width);
            if !rest.bytes().all(|b| b == b'0') {
                return None;
            }
            kept
        } else {
            frac_part
        };

        let whole: i128 = int_part.parse().ok()?;
        let frac: i128 = if frac_part.is_empty() {
            0
        } else {
            format!("{:0<width$}", frac_part, width = width).parse().ok()?
        };
        let magnitude = whole
            .checked_mul(10i128.pow(u32::from(fraction_digits)))?
            .checked_add(frac)?;
        let mantissa = i64::try_from(if negative { -magnitude } else { magnitude }).ok()?;
        Some(Self::new(mantissa, fraction_digits))
    }
}

impl fmt::Display for Decimal64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let divisor = 10u64.pow(u32::from(self.fraction_digits));
        let abs = self.mantissa.unsigned_abs();
        let sign = if self.mantissa < 0 { "-" } else { "" };
        if self.fraction_digits == 0 {
            return write!(f, "{}{}", sign, abs);
        }
        write!(
            f,
            "{}{}.{:0width$}",
            sign,
            abs / divisor,
            abs % divisor,
            width = usize::from(self.fraction_digits)
        )
    }
}

/// A typed leaf value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Decimal(Decimal64),
    String(String),
    /// Enumeration member, by symbolic name
    Enum(String),
    Binary(Vec<u8>),
    Empty,
}

impl Scalar {
    /// Short name of the value's representation, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Bool(_) => "boolean",
            Scalar::Int(_) => "integer",
            Scalar::Uint(_) => "unsigned integer",
            Scalar::Decimal(_) => "decimal64",
            Scalar::String(_) => "string",
            Scalar::Enum(_) => "enum",
            Scalar::Binary(_) => "binary",
            Scalar::Empty => "empty",
        }
    }

    /// Canonical text form, as used for XML element content
    pub fn to_text(&self) -> String {
        match self {
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(n) => n.to_string(),
            Scalar::Uint(n) => n.to_string(),
            Scalar::Decimal(d) => d.to_string(),
            Scalar::String(s) | Scalar::Enum(s) => s.clone(),
            Scalar::Binary(bytes) => BASE64.encode(bytes),
            Scalar::Empty => String::new(),
        }
    }

    pub(crate) fn describe(&self) -> String {
        format!("{} '{}'", self.type_name(), self.to_text())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

macro_rules! scalar_from_int {
    ($variant:ident, $target:ty: $($t:ty),*) => {
        $(impl From<$t> for Scalar {
            fn from(value: $t) -> Self {
                Scalar::$variant(<$target>::from(value))
            }
        })*
    };
}

scalar_from_int!(Int, i64: i8, i16, i32, i64);
scalar_from_int!(Uint, u64: u8, u16, u32, u64);

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

impl From<Decimal64> for Scalar {
    fn from(value: Decimal64) -> Self {
        Scalar::Decimal(value)
    }
}

impl From<Vec<u8>> for Scalar {
    fn from(value: Vec<u8>) -> Self {
        Scalar::Binary(value)
    }
}
