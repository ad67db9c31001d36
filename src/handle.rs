//! Owned and borrowed JVM object handles.
//!
//! An owned [`HandleRef`] holds exactly one JNI global reference, created on
//! construction and deleted when the last clone is dropped. Clones share the
//! reference; they do not create new ones.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::error::{Error, Result};
use crate::session::{Env, SessionShared};
use crate::sys::jni;

/// Who is responsible for releasing the underlying reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// A global reference this handle created and will delete.
    Global,
    /// A reference owned elsewhere (usually a local in the caller's frame).
    Borrowed,
}

/// What the handle points at, as far as the marshaling layer cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Object,
    Class,
    Array,
    String,
    Throwable,
}

struct HandleInner {
    raw: jni::jobject,
    kind: RefKind,
    ownership: Ownership,
    session: Weak<SessionShared>,
}

// Global references are valid on every attached thread. Borrowed handles are
// documented as confined to the frame and thread that produced them.
unsafe impl Send for HandleInner {}
unsafe impl Sync for HandleInner {}

impl Drop for HandleInner {
    fn drop(&mut self) {
        if self.ownership != Ownership::Global {
            return;
        }
        let Some(session) = self.session.upgrade() else {
            log::trace!("session gone, skipping release of {:p}", self.raw);
            return;
        };
        let raw = self.raw;
        let released = session.with_current_env(|env| env.delete_global_ref(raw));
        if released.is_none() {
            if session.is_alive() {
                log::warn!("global reference {raw:p} dropped on a thread with no JNI environment; leaking it");
            } else {
                log::trace!("session shut down, skipping release of {raw:p}");
            }
        }
    }
}

/// A JVM object handle with an explicit ownership tag.
#[derive(Clone)]
pub struct HandleRef {
    inner: Arc<HandleInner>,
}

impl HandleRef {
    /// Takes ownership of `raw` by creating a global reference to it.
    ///
    /// `raw` itself (usually a local reference) is left to its frame.
    pub fn own(env: &Env, raw: jni::jobject, kind: RefKind) -> Result<Self> {
        if raw.is_null() {
            return Err(Error::NullObject(format!("cannot own a null {kind:?} reference")));
        }
        let global = env
            .jni()
            .new_global_ref(raw)
            .ok_or_else(|| env.pending_error("NewGlobalRef"))?;
        Ok(Self::from_global(env, global, kind))
    }

    /// Adopts a global reference that was created elsewhere.
    ///
    /// The handle deletes it when the last clone is dropped.
    pub fn from_global(env: &Env, global: jni::jobject, kind: RefKind) -> Self {
        HandleRef {
            inner: Arc::new(HandleInner {
                raw: global,
                kind,
                ownership: Ownership::Global,
                session: env.session_ref(),
            }),
        }
    }

    /// Wraps `raw` without taking ownership. No JNI call is made.
    ///
    /// The handle is only valid for as long as whatever owns `raw` keeps it
    /// alive, and only on the thread that produced it if it is a local.
    pub fn borrow(env: &Env, raw: jni::jobject, kind: RefKind) -> Result<Self> {
        if raw.is_null() {
            return Err(Error::NullObject(format!("cannot borrow a null {kind:?} reference")));
        }
        Ok(HandleRef {
            inner: Arc::new(HandleInner {
                raw,
                kind,
                ownership: Ownership::Borrowed,
                session: env.session_ref(),
            }),
        })
    }

    pub fn raw(&self) -> jni::jobject {
        self.inner.raw
    }

    pub fn kind(&self) -> RefKind {
        self.inner.kind
    }

    pub fn ownership(&self) -> Ownership {
        self.inner.ownership
    }

    pub fn is_owned(&self) -> bool {
        self.inner.ownership == Ownership::Global
    }

    /// Whether the session this handle came from is still running.
    pub fn is_live(&self) -> bool {
        self.inner.session.upgrade().map_or(false, |s| s.is_alive())
    }

    /// Whether this handle was produced under `env`'s session.
    pub fn belongs_to(&self, env: &Env) -> bool {
        env.owns(&self.inner.session)
    }

    /// Upgrades a borrowed handle to an owned one; owned handles are cloned.
    pub fn to_owned_ref(&self, env: &Env) -> Result<Self> {
        match self.ownership() {
            Ownership::Global => Ok(self.clone()),
            Ownership::Borrowed => Self::own(env, self.raw(), self.kind()),
        }
    }

    /// Same JVM object, as decided by `IsSameObject`.
    pub fn same_object(&self, env: &Env, other: &HandleRef) -> bool {
        env.jni().is_same_object(self.raw(), other.raw())
    }

    /// Number of clones sharing the underlying reference.
    pub fn share_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

/// Handles compare equal when they wrap the same reference value.
impl PartialEq for HandleRef {
    fn eq(&self, other: &Self) -> bool {
        self.raw() == other.raw()
    }
}

impl fmt::Debug for HandleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleRef")
            .field("raw", &self.inner.raw)
            .field("kind", &self.inner.kind)
            .field("ownership", &self.inner.ownership)
            .finish()
    }
}
