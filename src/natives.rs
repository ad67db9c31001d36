//! Registering Rust functions as Java `native` methods.
//!
//! ```rust,ignore
//! extern "system" fn add(_env: *mut jni::JNIEnv, _cls: jni::jclass, a: jni::jint, b: jni::jint) -> jni::jint {
//!     a + b
//! }
//!
//! let natives = [unsafe { NativeMethod::new("add", "(II)I", add as *mut c_void)? }];
//! let class = natives::register_class(&env, "com.example.Calc", Some(CALC_CLASS_BYTES), &natives)?;
//! ```

use std::ffi::{c_void, CString};
use std::fmt;

use crate::classfile::ClassHeader;
use crate::error::{Error, Result};
use crate::handle::{HandleRef, RefKind};
use crate::registry::names;
use crate::session::Env;
use crate::signature;
use crate::sys::jni;
use crate::value::JavaType;

/// One `native` method implementation: name, JNI signature and entry point.
#[derive(Clone)]
pub struct NativeMethod {
    name: CString,
    signature: CString,
    fn_ptr: *mut c_void,
}

impl NativeMethod {
    /// # Safety
    /// `fn_ptr` must be an `extern "system"` function taking `(JNIEnv*,
    /// jobject or jclass, ...)` followed by parameters matching `signature`.
    pub unsafe fn new(name: &str, signature: &str, fn_ptr: *mut c_void) -> Result<Self> {
        if crate::signature::split_method_signature(signature).is_none() {
            return Err(Error::Registry(format!("malformed native signature {name}{signature}")));
        }
        if fn_ptr.is_null() {
            return Err(Error::NullObject(format!("native {name}{signature}")));
        }
        Ok(NativeMethod { name: CString::new(name)?, signature: CString::new(signature)?, fn_ptr })
    }

    pub fn name(&self) -> &str {
        self.name.to_str().unwrap_or_default()
    }

    pub fn signature(&self) -> &str {
        self.signature.to_str().unwrap_or_default()
    }

    fn raw(&self) -> jni::JNINativeMethod {
        jni::JNINativeMethod {
            name: self.name.as_ptr(),
            signature: self.signature.as_ptr(),
            fnPtr: self.fn_ptr,
        }
    }
}

impl fmt::Debug for NativeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeMethod({}{} @ {:p})", self.name(), self.signature(), self.fn_ptr)
    }
}

/// Loads `name` (dotted) and binds `natives` to it.
///
/// If the class cannot be found and `bytecode` is given, the bytecode is
/// checked to define `name` and then defined through the system class
/// loader.
pub fn register_class(env: &Env, name: &str, bytecode: Option<&[u8]>, natives: &[NativeMethod]) -> Result<HandleRef> {
    env.with_frame(2, |env| {
        let jni = env.jni();
        let internal = signature::to_internal_name(name);
        let class = match jni.find_class(&internal) {
            Some(class) => class,
            None => {
                let Some(bytes) = bytecode else {
                    return Err(env.pending_error(name));
                };
                // FindClass leaves a NoClassDefFoundError pending.
                if jni.exception_check() {
                    jni.exception_clear();
                }
                ClassHeader::parse(bytes)?.expect_name(name)?;
                let loader = system_class_loader(env)?;
                let class = jni
                    .define_class(&internal, loader, bytes)
                    .ok_or_else(|| env.pending_error("DefineClass"))?;
                log::debug!("defined {name} from {} bytes", bytes.len());
                class
            }
        };
        let handle = HandleRef::own(env, class, RefKind::Class)?;
        if !natives.is_empty() {
            register_natives(env, &handle, natives)?;
        }
        Ok(handle)
    })
}

fn system_class_loader(env: &Env) -> Result<jni::jobject> {
    let registry = env.registry()?;
    let loader = registry.get(names::CLASS_LOADER)?;
    let mid = loader.static_method("getSystemClassLoader")?;
    let raw = env.jni().call_static_method(loader.class(), mid.raw(), JavaType::Object, &[]);
    env.check_exception()?;
    Ok(unsafe { raw.l })
}

/// Binds `natives` to `class`, replacing earlier bindings of the same methods.
pub fn register_natives(env: &Env, class: &HandleRef, natives: &[NativeMethod]) -> Result<()> {
    let raw: Vec<jni::JNINativeMethod> = natives.iter().map(NativeMethod::raw).collect();
    if let Err(code) = env.jni().register_natives(class.raw(), &raw) {
        env.check_exception()?;
        return Err(env.errors().jni(code, "RegisterNatives"));
    }
    log::debug!("registered {} native method(s)", natives.len());
    Ok(())
}

/// Unbinds every native method of `class`.
pub fn unregister_natives(env: &Env, class: &HandleRef) -> Result<()> {
    if let Err(code) = env.jni().unregister_natives(class.raw()) {
        env.check_exception()?;
        return Err(env.errors().jni(code, "UnregisterNatives"));
    }
    Ok(())
}
