//! Typed, fixed-arity argument buffers for calls into the JVM.
//!
//! Every object-kind slot owns a global reference from the moment it is set
//! until it is overwritten or the list is dropped. Primitive slots own
//! nothing.

use std::fmt;
use std::sync::Weak;

use crate::error::{Error, Result};
use crate::marshal;
use crate::session::{Env, SessionShared};
use crate::signature;
use crate::sys::jni;
use crate::value::{JavaType, Value};

pub struct ArgumentList {
    values: Vec<jni::jvalue>,
    types: Vec<JavaType>,
    session: Weak<SessionShared>,
}

impl ArgumentList {
    /// A list of `size` empty slots. Empty slots are `Void` and hold nothing.
    pub fn new(env: &Env, size: usize) -> Self {
        ArgumentList {
            values: vec![jni::jvalue { j: 0 }; size],
            types: vec![JavaType::Void; size],
            session: env.session_ref(),
        }
    }

    /// Builds a list from `(type, value)` pairs.
    pub fn from_values(env: &Env, values: &[(JavaType, Value)]) -> Result<Self> {
        let mut args = ArgumentList::new(env, values.len());
        for (pos, (ty, value)) in values.iter().enumerate() {
            args.set(env, pos, *ty, value)?;
        }
        Ok(args)
    }

    /// Builds a list typed by a method signature such as `(ILjava/lang/String;)V`.
    pub fn for_signature(env: &Env, sig: &str, values: &[Value]) -> Result<Self> {
        let types = signature::parameter_types(sig)
            .ok_or_else(|| Error::Registry(format!("malformed method signature {sig}")))?;
        if types.len() != values.len() {
            return Err(Error::Arity { expected: types.len(), found: values.len() });
        }
        let mut args = ArgumentList::new(env, values.len());
        for (pos, (ty, value)) in types.into_iter().zip(values).enumerate() {
            args.set(env, pos, ty, value)?;
        }
        Ok(args)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Encodes `value` into slot `pos`.
    ///
    /// On failure the slot keeps its previous contents. On success a
    /// previously held reference is released.
    pub fn set(&mut self, env: &Env, pos: usize, ty: JavaType, value: &Value) -> Result<()> {
        if pos >= self.values.len() {
            return Err(Error::IndexOutOfBounds { index: pos, len: self.values.len() });
        }
        let encoded = marshal::encode(env, ty, value)?;
        release_slot(env.jni(), self.types[pos], self.values[pos]);
        self.values[pos] = encoded;
        self.types[pos] = ty;
        Ok(())
    }

    /// Decodes slot `pos`. Object slots come back as new owned handles.
    pub fn get(&self, env: &Env, pos: usize) -> Result<Value> {
        if pos >= self.values.len() {
            return Err(Error::IndexOutOfBounds { index: pos, len: self.values.len() });
        }
        marshal::decode(env, self.types[pos], self.values[pos])
    }

    pub fn type_at(&self, pos: usize) -> Option<JavaType> {
        self.types.get(pos).copied()
    }

    pub fn types(&self) -> &[JavaType] {
        &self.types
    }

    /// The raw slots, laid out for the `Call*MethodA` family.
    pub fn as_jvalues(&self) -> &[jni::jvalue] {
        &self.values
    }

    fn held_references(&self) -> impl Iterator<Item = jni::jobject> + '_ {
        self.types
            .iter()
            .zip(&self.values)
            .filter(|(ty, _)| ty.is_object_kind())
            .map(|(_, v)| unsafe { v.l })
            .filter(|l| !l.is_null())
    }
}

fn release_slot(env: &crate::jni_wrapper::JniEnv, ty: JavaType, value: jni::jvalue) {
    if ty.is_object_kind() {
        let obj = unsafe { value.l };
        if !obj.is_null() {
            env.delete_global_ref(obj);
        }
    }
}

impl Drop for ArgumentList {
    fn drop(&mut self) {
        let held: Vec<_> = self.held_references().collect();
        if held.is_empty() {
            return;
        }
        let Some(session) = self.session.upgrade() else {
            return;
        };
        let released = session.with_current_env(|env| {
            for obj in &held {
                env.delete_global_ref(*obj);
            }
        });
        if released.is_none() && session.is_alive() {
            log::warn!("argument list dropped without a JNI environment; leaking {} references", held.len());
        }
    }
}

impl fmt::Debug for ArgumentList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentList").field("types", &self.types).finish()
    }
}
