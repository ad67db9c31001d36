//! # jvm-bridge
//!
//! A JNI bridge for embedding a JVM in a Rust host and exchanging objects,
//! values and exceptions with it.
//!
//! The crate takes care of the parts of JNI that are easy to get wrong:
//! - Global references are owned by [`HandleRef`] and released exactly once
//! - Local references are bounded by scoped frames ([`LocalFrame`])
//! - Arguments and results are converted through one tagged type ([`JavaType`])
//!   with range checks
//! - Pending Java exceptions become [`Error::Java`] with class, message, stack
//!   trace and causes already extracted
//! - Java-side reachability is reported back to the host through a
//!   [`ReferenceQueueWorker`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use jvm_bridge::prelude::*;
//!
//! let (session, env) = Session::builder()
//!     .option("-Xmx256m")
//!     .start_from_library("/usr/lib/jvm/default/lib/server/libjvm.so")?;
//!
//! let text = marshal::java_string(&env, "héllo 😀")?;
//! let len = call::invoke(&env, &text, "length", "()I", &[])?;
//! assert_eq!(len, Value::Int(8));
//!
//! let numbers = JArray::from_slice(&env, &[1i32, 2, 3, 4, 5, 6])?;
//! let evens = numbers.get_slice(&env, 1, 6, 2)?; // [2, 4, 6]
//!
//! session.shutdown()?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                        Host code                         │
//! ├─────────────────────────────────────────────────────────┤
//! │   call, array, natives, monitor, thread, system,         │
//! │   refqueue - operations on live objects                  │
//! ├─────────────────────────────────────────────────────────┤
//! │   args::ArgumentList, marshal - typed value conversion   │
//! │   exception - pending exception capture and rethrow      │
//! ├─────────────────────────────────────────────────────────┤
//! │   session::{Session, Env}, handle::HandleRef,            │
//! │   frame::LocalFrame, registry::ClassRegistry             │
//! ├─────────────────────────────────────────────────────────┤
//! │   jni_wrapper::JniEnv - one method per JNI slot          │
//! │   sys::jni - raw types and vtable                        │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`session`] | Create or attach to a JVM; per-thread environments |
//! | [`handle`] | Owned and borrowed object handles |
//! | [`frame`] | Local reference frames |
//! | [`value`] | [`JavaType`] tags and host [`Value`]s |
//! | [`marshal`] | Value encoding and decoding, Java strings |
//! | [`args`] | Argument buffers for calls |
//! | [`call`] | Methods, constructors, fields |
//! | [`array`] | Element access, strided slices, bulk buffers |
//! | [`registry`] | Pinned system classes and member IDs |
//! | [`exception`] | Exception capture and rethrow |
//! | [`refqueue`] | Reachability notifications |
//! | [`natives`] | Native method registration |
//! | [`signature`] | JNI names and type signatures |
//! | [`classfile`] | Class file header reader |
//! | [`jni_wrapper`] | Thin JNI wrapper |
//! | [`sys::jni`] | Raw JNI bindings |
//!
//! ## Threads
//!
//! An [`Env`] belongs to the thread that obtained it. Each thread gets its
//! own from [`Session::env`], which attaches the thread on first use; the
//! thread stays attached until it exits or calls [`Session::detach`].
//! [`HandleRef`]s and [`Session`]s can be shared freely.
//!
//! ## Logging
//!
//! Diagnostics go through the [`log`] facade: lifecycle events at `info`,
//! attach/detach and registry setup at `debug`, leaked references and
//! suppressed failures at `warn`. Install any logger to see them.
//!
//! ## Features
//!
//! - `embed`: [`SessionBuilder::start_from_library`], loading `libjvm` with
//!   `libloading`.

pub mod sys;

pub mod args;
pub mod array;
pub mod call;
pub mod classfile;
pub mod error;
pub mod exception;
pub mod frame;
pub mod handle;
pub mod jni_wrapper;
pub mod marshal;
pub mod monitor;
pub mod natives;
pub mod refqueue;
pub mod registry;
pub mod session;
pub mod signature;
pub mod system;
pub mod thread;
pub mod value;

pub mod prelude;

pub use args::ArgumentList;
pub use array::{BufferView, JArray};
pub use error::{Error, ErrorMap, Result, StatusCode};
pub use exception::ExceptionRecord;
pub use frame::LocalFrame;
pub use handle::{HandleRef, Ownership, RefKind};
pub use monitor::Monitor;
pub use natives::NativeMethod;
pub use refqueue::ReferenceQueueWorker;
pub use registry::ClassRegistry;
pub use session::{Env, Session, SessionBuilder};
pub use thread::JThread;
pub use value::{JavaType, Value};
