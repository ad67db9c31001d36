//! `java.lang.Thread` for the calling thread.
//!
//! Interruption is Java's advisory flag; nothing here cancels a native call.

use crate::args::ArgumentList;
use crate::call;
use crate::error::{Error, Result};
use crate::handle::HandleRef;
use crate::registry::names;
use crate::session::Env;
use crate::value::{JavaType, Value};

#[derive(Debug, Clone)]
pub struct JThread {
    handle: HandleRef,
}

impl JThread {
    /// `Thread.currentThread()`.
    pub fn current(env: &Env) -> Result<Self> {
        let registry = env.registry()?;
        let thread = registry.get(names::THREAD)?;
        let class = thread.handle(env)?;
        let mid = thread.static_method("currentThread")?;
        match call::call_static_method(env, &class, mid, JavaType::Object, &ArgumentList::new(env, 0))? {
            Value::Object(handle) => Ok(JThread { handle }),
            _ => Err(Error::NullObject("Thread.currentThread".to_string())),
        }
    }

    pub fn handle(&self) -> &HandleRef {
        &self.handle
    }

    fn call(&self, env: &Env, key: &str, ret: JavaType) -> Result<Value> {
        let mid = env.registry()?.get(names::THREAD)?.method(key)?;
        call::call_method(env, &self.handle, mid, ret, &ArgumentList::new(env, 0))
    }

    fn flag(&self, env: &Env, key: &str) -> Result<bool> {
        self.call(env, key, JavaType::Boolean)?
            .as_bool()
            .ok_or_else(|| Error::TypeMismatch { expected: JavaType::Boolean, found: "non-bool" })
    }

    pub fn id(&self, env: &Env) -> Result<i64> {
        self.call(env, "getId", JavaType::Long)?
            .as_i64()
            .ok_or_else(|| Error::TypeMismatch { expected: JavaType::Long, found: "non-int" })
    }

    pub fn name(&self, env: &Env) -> Result<String> {
        match self.call(env, "getName", JavaType::String)? {
            Value::Str(name) => Ok(name),
            _ => Err(Error::NullObject("Thread.getName".to_string())),
        }
    }

    pub fn is_daemon(&self, env: &Env) -> Result<bool> {
        self.flag(env, "isDaemon")
    }

    pub fn is_alive(&self, env: &Env) -> Result<bool> {
        self.flag(env, "isAlive")
    }

    pub fn is_interrupted(&self, env: &Env) -> Result<bool> {
        self.flag(env, "isInterrupted")
    }

    pub fn interrupt(&self, env: &Env) -> Result<()> {
        self.call(env, "interrupt", JavaType::Void).map(drop)
    }
}
