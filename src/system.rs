//! `java.lang.System` helpers.

use crate::args::ArgumentList;
use crate::call;
use crate::error::Result;
use crate::handle::HandleRef;
use crate::registry::names;
use crate::session::Env;
use crate::value::{JavaType, Value};

fn call_system(env: &Env, key: &str, ret: JavaType, args: &ArgumentList) -> Result<Value> {
    let registry = env.registry()?;
    let system = registry.get(names::SYSTEM)?;
    let class = system.handle(env)?;
    call::call_static_method(env, &class, system.static_method(key)?, ret, args)
}

/// `System.identityHashCode(obj)`.
pub fn identity_hash_code(env: &Env, obj: &HandleRef) -> Result<i32> {
    let mut args = ArgumentList::new(env, 1);
    args.set(env, 0, JavaType::Object, &Value::Object(obj.clone()))?;
    let hash = call_system(env, "identityHashCode", JavaType::Int, &args)?;
    Ok(hash.as_i64().unwrap_or_default() as i32)
}

/// `System.gc()`. A hint; the JVM may ignore it.
pub fn gc(env: &Env) -> Result<()> {
    call_system(env, "gc", JavaType::Void, &ArgumentList::new(env, 0)).map(drop)
}

/// `System.getProperty(key)`, `None` when unset.
pub fn get_property(env: &Env, key: &str) -> Result<Option<String>> {
    let mut args = ArgumentList::new(env, 1);
    args.set(env, 0, JavaType::String, &Value::from(key))?;
    Ok(match call_system(env, "getProperty", JavaType::String, &args)? {
        Value::Str(value) => Some(value),
        _ => None,
    })
}
