//! Conversion between host [`Value`]s and `jvalue` slots.
//!
//! Primitive conversions are pure and never touch the JVM. Object-kind
//! encodings produce a new global reference that the caller owns; the
//! [`ArgumentList`](crate::args::ArgumentList) is the usual owner.

use crate::error::{Error, Result};
use crate::handle::{HandleRef, RefKind};
use crate::registry::names;
use crate::session::Env;
use crate::sys::jni;
use crate::value::{JavaType, Value};

/// Host text as UTF-16 code units. No byte-order mark is added; a leading
/// U+FEFF in `s` is ordinary content and is kept.
pub fn to_utf16(s: &str) -> Vec<jni::jchar> {
    s.encode_utf16().collect()
}

/// Encodes a primitive. `Void` accepts only `Null`.
///
/// Integral targets take `Value::Int` and reject anything outside the
/// target's range. `float`/`double` take `Int` or `Float`; a finite value
/// beyond `f32::MAX` does not fit a `float`. `char` takes a `Char` code unit
/// or a one-character string inside the BMP.
pub fn encode_primitive(ty: JavaType, value: &Value) -> Result<jni::jvalue> {
    let mismatch = || Error::TypeMismatch { expected: ty, found: value.kind() };
    let range = |v: &dyn std::fmt::Display| Error::Range { ty, value: v.to_string() };

    Ok(match ty {
        JavaType::Void => match value {
            Value::Null => jni::jvalue { j: 0 },
            _ => return Err(mismatch()),
        },
        JavaType::Boolean => match value {
            Value::Bool(b) => jni::jvalue { z: if *b { jni::JNI_TRUE } else { jni::JNI_FALSE } },
            _ => return Err(mismatch()),
        },
        JavaType::Char => match value {
            Value::Char(c) => jni::jvalue { c: *c },
            Value::Str(s) => {
                let mut units = s.encode_utf16();
                match (units.next(), units.next(), units.next()) {
                    (Some(c), None, _) => jni::jvalue { c },
                    (Some(_), Some(_), None) if s.chars().count() == 1 => return Err(range(&s)),
                    _ => return Err(mismatch()),
                }
            }
            _ => return Err(mismatch()),
        },
        JavaType::Byte => {
            let v = value.as_i64().ok_or_else(mismatch)?;
            jni::jvalue { b: i8::try_from(v).map_err(|_| range(&v))? }
        }
        JavaType::Short => {
            let v = value.as_i64().ok_or_else(mismatch)?;
            jni::jvalue { s: i16::try_from(v).map_err(|_| range(&v))? }
        }
        JavaType::Int => {
            let v = value.as_i64().ok_or_else(mismatch)?;
            jni::jvalue { i: i32::try_from(v).map_err(|_| range(&v))? }
        }
        JavaType::Long => jni::jvalue { j: value.as_i64().ok_or_else(mismatch)? },
        JavaType::Float => {
            let v = value.as_f64().ok_or_else(mismatch)?;
            if v.is_finite() && v.abs() > f64::from(f32::MAX) {
                return Err(range(&v));
            }
            jni::jvalue { f: v as f32 }
        }
        JavaType::Double => jni::jvalue { d: value.as_f64().ok_or_else(mismatch)? },
        JavaType::String | JavaType::Object | JavaType::Array | JavaType::Class => return Err(mismatch()),
    })
}

/// Reads a primitive slot. `None` for object kinds.
pub fn decode_primitive(ty: JavaType, raw: jni::jvalue) -> Option<Value> {
    // The tag selects the member; callers pass the tag the slot was written with.
    unsafe {
        Some(match ty {
            JavaType::Void => Value::Null,
            JavaType::Boolean => Value::Bool(raw.z != jni::JNI_FALSE),
            JavaType::Char => Value::Char(raw.c),
            JavaType::Byte => Value::Int(raw.b.into()),
            JavaType::Short => Value::Int(raw.s.into()),
            JavaType::Int => Value::Int(raw.i.into()),
            JavaType::Long => Value::Int(raw.j),
            JavaType::Float => Value::Float(raw.f.into()),
            JavaType::Double => Value::Float(raw.d),
            JavaType::String | JavaType::Object | JavaType::Array | JavaType::Class => return None,
        })
    }
}

/// Encodes any value for a slot of type `ty`.
///
/// For object kinds the returned `l` member is a new global reference (or
/// null) that the caller must delete.
pub fn encode(env: &Env, ty: JavaType, value: &Value) -> Result<jni::jvalue> {
    if !ty.is_object_kind() {
        return encode_primitive(ty, value);
    }
    let mismatch = || Error::TypeMismatch { expected: ty, found: value.kind() };

    let global = match (ty, value) {
        (_, Value::Null) => std::ptr::null_mut(),
        (JavaType::String | JavaType::Object, Value::Str(s)) => {
            env.with_frame(1, |env| {
                let local = new_java_string(env, s)?;
                env.jni().new_global_ref(local).ok_or_else(|| env.pending_error("NewGlobalRef"))
            })?
        }
        (_, Value::Object(handle)) => {
            let accepted = match ty {
                JavaType::String => match handle.kind() {
                    RefKind::String => true,
                    RefKind::Object => {
                        let string = env.registry()?.get(names::STRING)?.class();
                        env.jni().is_instance_of(handle.raw(), string)
                    }
                    _ => false,
                },
                JavaType::Class => handle.kind() == RefKind::Class,
                JavaType::Array => handle.kind() == RefKind::Array,
                _ => true,
            };
            if !accepted {
                return Err(Error::TypeMismatch { expected: ty, found: ref_kind_name(handle.kind()) });
            }
            global_copy(env, handle)?
        }
        _ => return Err(mismatch()),
    };
    Ok(jni::jvalue { l: global })
}

/// Decodes a slot of type `ty`.
///
/// Strings are copied out; other references become owned handles. A local
/// reference in `raw` is left for its frame to release.
pub fn decode(env: &Env, ty: JavaType, raw: jni::jvalue) -> Result<Value> {
    if let Some(value) = decode_primitive(ty, raw) {
        return Ok(value);
    }
    let obj = unsafe { raw.l };
    if obj.is_null() {
        return Ok(Value::Null);
    }
    match ty {
        JavaType::String => Ok(Value::Str(string_from_java(env, obj)?)),
        _ => Ok(Value::Object(HandleRef::own(env, obj, ref_kind_of(ty))?)),
    }
}

/// The handle kind an object slot of type `ty` produces.
pub fn ref_kind_of(ty: JavaType) -> RefKind {
    match ty {
        JavaType::String => RefKind::String,
        JavaType::Class => RefKind::Class,
        JavaType::Array => RefKind::Array,
        _ => RefKind::Object,
    }
}

fn ref_kind_name(kind: RefKind) -> &'static str {
    match kind {
        RefKind::Object => "object",
        RefKind::Class => "class",
        RefKind::Array => "array",
        RefKind::String => "string",
        RefKind::Throwable => "throwable",
    }
}

fn global_copy(env: &Env, handle: &HandleRef) -> Result<jni::jobject> {
    if !handle.is_live() {
        return Err(Error::NullObject("handle belongs to a session that has shut down".to_string()));
    }
    env.jni()
        .new_global_ref(handle.raw())
        .ok_or_else(|| env.pending_error("NewGlobalRef"))
}

/// A new local `java.lang.String` in the current frame.
pub fn new_java_string(env: &Env, s: &str) -> Result<jni::jstring> {
    env.jni()
        .new_string(&to_utf16(s))
        .ok_or_else(|| env.pending_error("NewString"))
}

/// A `java.lang.String` as an owned handle.
pub fn java_string(env: &Env, s: &str) -> Result<HandleRef> {
    env.with_frame(1, |env| {
        let local = new_java_string(env, s)?;
        HandleRef::own(env, local, RefKind::String)
    })
}

/// Releases pinned string characters on every exit path.
struct PinnedChars<'e> {
    env: &'e Env,
    string: jni::jstring,
    chars: *const jni::jchar,
}

impl Drop for PinnedChars<'_> {
    fn drop(&mut self) {
        self.env.jni().release_string_chars(self.string, self.chars);
    }
}

/// Copies a Java string into host text.
///
/// Unpaired surrogates, which Java strings may contain, become U+FFFD.
pub fn string_from_java(env: &Env, s: jni::jstring) -> Result<String> {
    if s.is_null() {
        return Err(Error::NullObject("java.lang.String".to_string()));
    }
    let len = env.jni().get_string_length(s);
    let chars = env
        .jni()
        .get_string_chars(s)
        .ok_or_else(|| env.pending_error("GetStringChars"))?;
    let pinned = PinnedChars { env, string: s, chars };

    let units = if len > 0 {
        unsafe { std::slice::from_raw_parts(pinned.chars, len as usize) }
    } else {
        &[]
    };
    Ok(match String::from_utf16(units) {
        Ok(text) => text,
        Err(_) => {
            log::debug!("java string of {len} units has unpaired surrogates");
            String::from_utf16_lossy(units)
        }
    })
}
