//! Common imports for host code.
//!
//! Small on purpose: the session, the value types, and the operation modules
//! most callers reach for.

pub use crate::array::{BufferView, JArray};
pub use crate::error::{Error, ErrorMap, Result, StatusCode};
pub use crate::exception::ExceptionRecord;
pub use crate::handle::{HandleRef, RefKind};
pub use crate::session::{Env, Session, SessionBuilder};
pub use crate::sys::jni;
pub use crate::value::{JavaType, Value};
pub use crate::{call, marshal, ArgumentList};
