//! Java object monitors held from native code.

use std::fmt;

use crate::error::{Error, Result};
use crate::handle::HandleRef;
use crate::session::Env;

/// An entered monitor. Exits exactly once: through [`exit`](Self::exit) or
/// on drop.
///
/// ```rust,ignore
/// let guard = Monitor::enter(&env, &shared_state)?;
/// // ... critical section shared with Java `synchronized (sharedState)` blocks
/// guard.exit()?;
/// ```
pub struct Monitor<'e> {
    env: &'e Env,
    object: HandleRef,
    held: bool,
}

impl<'e> Monitor<'e> {
    pub fn enter(env: &'e Env, object: &HandleRef) -> Result<Self> {
        if !object.is_live() {
            return Err(Error::NullObject("monitor object belongs to a session that has shut down".to_string()));
        }
        if let Err(code) = env.jni().monitor_enter(object.raw()) {
            env.check_exception()?;
            return Err(env.errors().jni(code, "MonitorEnter"));
        }
        Ok(Monitor { env, object: object.clone(), held: true })
    }

    pub fn object(&self) -> &HandleRef {
        &self.object
    }

    pub fn exit(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if !self.held {
            return Ok(());
        }
        self.held = false;
        if let Err(code) = self.env.jni().monitor_exit(self.object.raw()) {
            self.env.check_exception()?;
            return Err(self.env.errors().jni(code, "MonitorExit"));
        }
        Ok(())
    }
}

impl Drop for Monitor<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            log::error!("failed to exit monitor: {err}");
        }
    }
}

impl fmt::Debug for Monitor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("object", &self.object)
            .field("held", &self.held)
            .finish()
    }
}
