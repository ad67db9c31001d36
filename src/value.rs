//! Java type tags and host-side values.
//!
//! [`JavaType`] is the tag set for every slot that crosses the bridge: method
//! returns, fields, array elements and [`ArgumentList`](crate::args::ArgumentList)
//! entries. [`Value`] is what the host side reads and writes.

use std::fmt;

use crate::handle::HandleRef;

/// The Java type system as seen through JNI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JavaType {
    Void,
    Boolean,
    Char,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    Object,
    Array,
    Class,
}

impl JavaType {
    /// Every tag, primitives first.
    pub const ALL: [JavaType; 13] = [
        JavaType::Void,
        JavaType::Boolean,
        JavaType::Char,
        JavaType::Byte,
        JavaType::Short,
        JavaType::Int,
        JavaType::Long,
        JavaType::Float,
        JavaType::Double,
        JavaType::String,
        JavaType::Object,
        JavaType::Array,
        JavaType::Class,
    ];

    /// True for the tags whose slot carries a reference.
    pub fn is_object_kind(self) -> bool {
        matches!(self, JavaType::String | JavaType::Object | JavaType::Array | JavaType::Class)
    }

    /// True for the eight value types (not `Void`, not references).
    pub fn is_primitive(self) -> bool {
        !self.is_object_kind() && self != JavaType::Void
    }

    /// Size in bytes of one element in a primitive array, `None` otherwise.
    pub fn element_size(self) -> Option<usize> {
        match self {
            JavaType::Boolean | JavaType::Byte => Some(1),
            JavaType::Char | JavaType::Short => Some(2),
            JavaType::Int | JavaType::Float => Some(4),
            JavaType::Long | JavaType::Double => Some(8),
            _ => None,
        }
    }

    /// Field descriptor, where one is fixed by the tag alone.
    ///
    /// `Object` and `Array` need a class name and return `None`.
    pub fn descriptor(self) -> Option<&'static str> {
        Some(match self {
            JavaType::Void => "V",
            JavaType::Boolean => "Z",
            JavaType::Char => "C",
            JavaType::Byte => "B",
            JavaType::Short => "S",
            JavaType::Int => "I",
            JavaType::Long => "J",
            JavaType::Float => "F",
            JavaType::Double => "D",
            JavaType::String => "Ljava/lang/String;",
            JavaType::Class => "Ljava/lang/Class;",
            JavaType::Object | JavaType::Array => return None,
        })
    }

    /// Classifies a field descriptor such as `I`, `[J` or `Ljava/lang/String;`.
    pub fn from_descriptor(desc: &str) -> Option<JavaType> {
        let mut chars = desc.chars();
        let ty = match chars.next()? {
            'V' => JavaType::Void,
            'Z' => JavaType::Boolean,
            'C' => JavaType::Char,
            'B' => JavaType::Byte,
            'S' => JavaType::Short,
            'I' => JavaType::Int,
            'J' => JavaType::Long,
            'F' => JavaType::Float,
            'D' => JavaType::Double,
            '[' => return if desc.len() > 1 { Some(JavaType::Array) } else { None },
            'L' if desc.ends_with(';') && desc.len() > 2 => {
                return Some(match desc {
                    "Ljava/lang/String;" => JavaType::String,
                    "Ljava/lang/Class;" => JavaType::Class,
                    _ => JavaType::Object,
                });
            }
            _ => return None,
        };
        if chars.next().is_some() {
            return None;
        }
        Some(ty)
    }

    /// Java source name of the tag.
    pub fn name(self) -> &'static str {
        match self {
            JavaType::Void => "void",
            JavaType::Boolean => "boolean",
            JavaType::Char => "char",
            JavaType::Byte => "byte",
            JavaType::Short => "short",
            JavaType::Int => "int",
            JavaType::Long => "long",
            JavaType::Float => "float",
            JavaType::Double => "double",
            JavaType::String => "java.lang.String",
            JavaType::Object => "java.lang.Object",
            JavaType::Array => "array",
            JavaType::Class => "java.lang.Class",
        }
    }
}

impl fmt::Display for JavaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A host-side value on its way into or out of the JVM.
///
/// Integers of every width travel as `Int`; the encoder range-checks them
/// against the target type. `Char` is a single UTF-16 code unit, exactly as
/// Java stores it.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Char(u16),
    Int(i64),
    Float(f64),
    Str(String),
    Object(HandleRef),
}

impl Value {
    /// Short name of the variant, used in type-mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Char(_) => "char",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<&HandleRef> {
        match self {
            Value::Object(h) => Some(h),
            _ => None,
        }
    }

    /// Consumes the value, returning its handle if it holds one.
    pub fn into_handle(self) -> Option<HandleRef> {
        match self {
            Value::Object(h) => Some(h),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(v as i64)
            }
        })*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u32);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<HandleRef> for Value {
    fn from(v: HandleRef) -> Self {
        Value::Object(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
