//! Scoped local-reference frames.
//!
//! A [`LocalFrame`] pushes a JNI local frame on entry and pops it exactly
//! once, either through [`LocalFrame::exit`] or on drop. Frames must be
//! exited in reverse order of entry; frames held by nested scopes get that
//! from drop order.

use crate::error::Result;
use crate::exception;
use crate::session::Env;
use crate::sys::jni;

/// Loops that create one local reference per iteration recycle their
/// frame this often.
pub const FRAME_RECYCLE_INTERVAL: usize = 256;

pub struct LocalFrame<'e> {
    env: &'e Env,
    capacity: usize,
    active: bool,
}

impl<'e> LocalFrame<'e> {
    /// Pushes a frame with room for at least `capacity` local references.
    ///
    /// A zero capacity pushes nothing and makes `exit`/`drop` no-ops.
    pub fn enter(env: &'e Env, capacity: usize) -> Result<Self> {
        let mut frame = LocalFrame { env, capacity, active: false };
        if capacity > 0 {
            frame.push(capacity)?;
        }
        Ok(frame)
    }

    fn push(&mut self, capacity: usize) -> Result<()> {
        let requested = jni::jint::try_from(capacity).unwrap_or(jni::jint::MAX);
        if let Err(code) = self.env.jni().push_local_frame(requested) {
            // PushLocalFrame raises OutOfMemoryError alongside the status.
            return Err(match exception::capture(self.env) {
                Some(record) => self.env.errors().java(record),
                None => self.env.errors().jni(code, "PushLocalFrame"),
            });
        }
        self.active = true;
        self.capacity = capacity;
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// False for zero-capacity frames and after a failed `reset`.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Pops the frame, promoting `result` into the enclosing frame.
    ///
    /// Returns the promoted reference (null if `result` was null). For an
    /// inactive frame `result` is returned unchanged.
    pub fn exit(mut self, result: jni::jobject) -> jni::jobject {
        if !self.active {
            return result;
        }
        self.active = false;
        self.env.jni().pop_local_frame(result)
    }

    /// Pops the frame and pushes a fresh one, releasing every local created
    /// since the last push. `None` keeps the current capacity.
    pub fn reset(&mut self, new_capacity: Option<usize>) -> Result<()> {
        let capacity = new_capacity.unwrap_or(self.capacity);
        if self.active {
            self.active = false;
            self.env.jni().pop_local_frame(std::ptr::null_mut());
            log::trace!("recycled local frame (capacity {capacity})");
        }
        if capacity == 0 {
            self.capacity = 0;
            return Ok(());
        }
        self.push(capacity)
    }

    /// Calls `reset` every [`FRAME_RECYCLE_INTERVAL`] iterations of a loop.
    pub fn recycle(&mut self, iteration: usize) -> Result<()> {
        if iteration > 0 && iteration % FRAME_RECYCLE_INTERVAL == 0 {
            self.reset(None)?;
        }
        Ok(())
    }
}

impl Drop for LocalFrame<'_> {
    fn drop(&mut self) {
        if self.active {
            self.env.jni().pop_local_frame(std::ptr::null_mut());
        }
    }
}

impl std::fmt::Debug for LocalFrame<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFrame")
            .field("capacity", &self.capacity)
            .field("active", &self.active)
            .finish()
    }
}
