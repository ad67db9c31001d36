//! Method calls, constructors and field access.
//!
//! Every operation runs inside its own local frame, checks for a pending
//! exception immediately after the JNI call, and decodes the result with
//! [`marshal::decode`]. Object results are promoted to owned handles before
//! the frame pops.

use crate::args::ArgumentList;
use crate::error::{Error, Result};
use crate::handle::{HandleRef, RefKind};
use crate::marshal;
use crate::registry::{names, FieldId, MethodId};
use crate::session::Env;
use crate::signature;
use crate::value::{JavaType, Value};

fn require(handle: &HandleRef, what: &str) -> Result<()> {
    if !handle.is_live() {
        return Err(Error::NullObject(format!("{what} belongs to a session that has shut down")));
    }
    Ok(())
}

/// Resolves a class by dotted name, preferring the pinned catalog.
pub fn find_class(env: &Env, name: &str) -> Result<HandleRef> {
    let registry = env.registry()?;
    if let Some(entry) = registry.lookup(name) {
        return HandleRef::own(env, entry.class(), RefKind::Class);
    }
    env.with_frame(1, |env| {
        let cls = env
            .jni()
            .find_class(&signature::to_internal_name(name))
            .ok_or_else(|| env.pending_error(name))?;
        HandleRef::own(env, cls, RefKind::Class)
    })
}

/// The runtime class of `obj`.
pub fn object_class(env: &Env, obj: &HandleRef) -> Result<HandleRef> {
    require(obj, "object")?;
    env.with_frame(1, |env| {
        let cls = env
            .jni()
            .get_object_class(obj.raw())
            .ok_or_else(|| env.pending_error("GetObjectClass"))?;
        HandleRef::own(env, cls, RefKind::Class)
    })
}

/// `Class.getName()` of `class`.
pub fn class_name(env: &Env, class: &HandleRef) -> Result<String> {
    let mid = env.registry()?.get(names::CLASS)?.method("getName")?;
    match call_method(env, class, mid, JavaType::String, &ArgumentList::new(env, 0))? {
        Value::Str(name) => Ok(name),
        _ => Err(Error::NullObject("Class.getName".to_string())),
    }
}

pub fn is_instance_of(env: &Env, obj: &HandleRef, class: &HandleRef) -> bool {
    env.jni().is_instance_of(obj.raw(), class.raw())
}

pub fn method_id(env: &Env, class: &HandleRef, name: &str, sig: &str) -> Result<MethodId> {
    require(class, "class")?;
    let id = env
        .jni()
        .get_method_id(class.raw(), name, sig)
        .ok_or_else(|| env.pending_error(&format!("{name}{sig}")))?;
    Ok(unsafe { MethodId::from_raw(id) })
}

pub fn static_method_id(env: &Env, class: &HandleRef, name: &str, sig: &str) -> Result<MethodId> {
    require(class, "class")?;
    let id = env
        .jni()
        .get_static_method_id(class.raw(), name, sig)
        .ok_or_else(|| env.pending_error(&format!("{name}{sig}")))?;
    Ok(unsafe { MethodId::from_raw(id) })
}

pub fn field_id(env: &Env, class: &HandleRef, name: &str, sig: &str) -> Result<FieldId> {
    require(class, "class")?;
    let id = env
        .jni()
        .get_field_id(class.raw(), name, sig)
        .ok_or_else(|| env.pending_error(&format!("{name}:{sig}")))?;
    Ok(unsafe { FieldId::from_raw(id) })
}

pub fn static_field_id(env: &Env, class: &HandleRef, name: &str, sig: &str) -> Result<FieldId> {
    require(class, "class")?;
    let id = env
        .jni()
        .get_static_field_id(class.raw(), name, sig)
        .ok_or_else(|| env.pending_error(&format!("{name}:{sig}")))?;
    Ok(unsafe { FieldId::from_raw(id) })
}

/// Calls an instance method returning `ret`.
pub fn call_method(env: &Env, obj: &HandleRef, method: MethodId, ret: JavaType, args: &ArgumentList) -> Result<Value> {
    require(obj, "receiver")?;
    env.with_frame(1, |env| {
        let raw = env.jni().call_method(obj.raw(), method.raw(), ret, args.as_jvalues());
        env.check_exception()?;
        marshal::decode(env, ret, raw)
    })
}

/// Calls a static method of `class` returning `ret`.
pub fn call_static_method(
    env: &Env,
    class: &HandleRef,
    method: MethodId,
    ret: JavaType,
    args: &ArgumentList,
) -> Result<Value> {
    require(class, "class")?;
    env.with_frame(1, |env| {
        let raw = env.jni().call_static_method(class.raw(), method.raw(), ret, args.as_jvalues());
        env.check_exception()?;
        marshal::decode(env, ret, raw)
    })
}

/// Looks up `name` with `sig` on the receiver's class and calls it.
///
/// ```rust,ignore
/// let len = call::invoke(&env, &text, "length", "()I", &[])?;
/// ```
pub fn invoke(env: &Env, obj: &HandleRef, name: &str, sig: &str, args: &[Value]) -> Result<Value> {
    let ret = signature::return_type(sig)
        .ok_or_else(|| Error::Registry(format!("malformed method signature {sig}")))?;
    let class = object_class(env, obj)?;
    let method = method_id(env, &class, name, sig)?;
    let args = ArgumentList::for_signature(env, sig, args)?;
    call_method(env, obj, method, ret, &args)
}

/// Static counterpart of [`invoke`].
pub fn invoke_static(env: &Env, class: &HandleRef, name: &str, sig: &str, args: &[Value]) -> Result<Value> {
    let ret = signature::return_type(sig)
        .ok_or_else(|| Error::Registry(format!("malformed method signature {sig}")))?;
    let method = static_method_id(env, class, name, sig)?;
    let args = ArgumentList::for_signature(env, sig, args)?;
    call_static_method(env, class, method, ret, &args)
}

/// Runs constructor `ctor` of `class`.
pub fn new_object(env: &Env, class: &HandleRef, ctor: MethodId, args: &ArgumentList) -> Result<HandleRef> {
    require(class, "class")?;
    env.with_frame(1, |env| {
        let obj = env
            .jni()
            .new_object(class.raw(), ctor.raw(), args.as_jvalues())
            .ok_or_else(|| env.pending_error("NewObject"))?;
        HandleRef::own(env, obj, RefKind::Object)
    })
}

/// Finds the constructor with `sig` and runs it.
pub fn construct(env: &Env, class: &HandleRef, sig: &str, args: &[Value]) -> Result<HandleRef> {
    let ctor = method_id(env, class, "<init>", sig)?;
    let args = ArgumentList::for_signature(env, sig, args)?;
    new_object(env, class, ctor, &args)
}

pub fn get_field(env: &Env, obj: &HandleRef, field: FieldId, ty: JavaType) -> Result<Value> {
    require(obj, "object")?;
    env.with_frame(1, |env| {
        let raw = env.jni().get_field(obj.raw(), field.raw(), ty);
        env.check_exception()?;
        marshal::decode(env, ty, raw)
    })
}

pub fn set_field(env: &Env, obj: &HandleRef, field: FieldId, ty: JavaType, value: &Value) -> Result<()> {
    require(obj, "object")?;
    let mut slot = ArgumentList::new(env, 1);
    slot.set(env, 0, ty, value)?;
    env.jni().set_field(obj.raw(), field.raw(), ty, slot.as_jvalues()[0]);
    env.check_exception()
}

pub fn get_static_field(env: &Env, class: &HandleRef, field: FieldId, ty: JavaType) -> Result<Value> {
    require(class, "class")?;
    env.with_frame(1, |env| {
        let raw = env.jni().get_static_field(class.raw(), field.raw(), ty);
        env.check_exception()?;
        marshal::decode(env, ty, raw)
    })
}

pub fn set_static_field(env: &Env, class: &HandleRef, field: FieldId, ty: JavaType, value: &Value) -> Result<()> {
    require(class, "class")?;
    let mut slot = ArgumentList::new(env, 1);
    slot.set(env, 0, ty, value)?;
    env.jni().set_static_field(class.raw(), field.raw(), ty, slot.as_jvalues()[0]);
    env.check_exception()
}
