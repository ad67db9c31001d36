//! Pending-exception capture and rethrow.
//!
//! A pending Java exception is only observable until the next JNI call
//! clears it, so [`capture`] clears it immediately and extracts everything a
//! caller might want later: class name, message, printed stack trace and the
//! cause chain. The resulting [`ExceptionRecord`] stays readable after any
//! number of further JNI calls, on any thread.

use std::fmt;

use crate::error::{Error, Result};
use crate::handle::{HandleRef, RefKind};
use crate::marshal;
use crate::registry::{names, ClassRegistry};
use crate::session::Env;
use crate::sys::jni;
use crate::value::JavaType;

/// Causes deeper than this are not followed.
pub const MAX_CAUSE_DEPTH: usize = 16;

/// Locals live at once while one throwable is inspected: the class, a
/// string result, and the writer pair for the stack trace.
const CAPTURE_FRAME_CAPACITY: usize = 8;

/// A detached description of a Java exception.
///
/// `live` keeps a global reference to the original throwable so it can be
/// rethrown unchanged while its session is still running.
#[derive(Clone, Default)]
pub struct ExceptionRecord {
    class_name: Option<String>,
    message: Option<String>,
    stack_trace: Option<String>,
    cause: Option<Box<ExceptionRecord>>,
    location: Option<String>,
    live: Option<HandleRef>,
}

impl ExceptionRecord {
    /// A record with no live throwable behind it.
    pub fn detached(class_name: impl Into<String>, message: Option<String>) -> Self {
        ExceptionRecord {
            class_name: Some(class_name.into()),
            message,
            ..Default::default()
        }
    }

    /// Tags the record with where it was raised, e.g. `"Foo.bar"`.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Dotted class name, e.g. `java.lang.IllegalStateException`.
    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Output of `printStackTrace`, including the `Caused by:` sections.
    pub fn stack_trace(&self) -> Option<&str> {
        self.stack_trace.as_deref()
    }

    pub fn cause(&self) -> Option<&ExceptionRecord> {
        self.cause.as_deref()
    }

    /// This record followed by its causes, outermost first.
    pub fn chain(&self) -> impl Iterator<Item = &ExceptionRecord> {
        std::iter::successors(Some(self), |r| r.cause())
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// The original throwable, if it was captured with one.
    pub fn live(&self) -> Option<&HandleRef> {
        self.live.as_ref()
    }

    /// Drops the live throwable, keeping only the extracted text.
    pub fn detach(&mut self) {
        self.live = None;
        if let Some(cause) = self.cause.as_mut() {
            cause.detach();
        }
    }

    /// `Java exception <class> occurred: <message>`, falling back to the
    /// class name when there is no message.
    pub fn description(&self) -> String {
        let class = self.class_name.as_deref().unwrap_or("<unknown>");
        let message = self.message.as_deref().unwrap_or(class);
        format!("Java exception {class} occurred: {message}")
    }

    /// Message used when the exception has to be synthesized.
    fn fallback_message(&self) -> String {
        if self.class_name.is_some() || self.message.is_some() {
            return self.description();
        }
        match &self.location {
            Some(location) => format!("Unknown from: {location}"),
            None => "Unknown".to_string(),
        }
    }
}

impl fmt::Display for ExceptionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

impl fmt::Debug for ExceptionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionRecord")
            .field("class_name", &self.class_name)
            .field("message", &self.message)
            .field("location", &self.location)
            .field("cause", &self.cause)
            .field("live", &self.live.is_some())
            .finish()
    }
}

/// True if an exception is pending on this thread.
pub fn is_pending(env: &Env) -> bool {
    env.jni().exception_check()
}

/// Prints the pending exception to stderr. The JVM clears it in the process.
pub fn describe(env: &Env) {
    env.jni().exception_describe();
}

pub fn clear(env: &Env) {
    env.jni().exception_clear();
}

/// Clears the pending exception, if any, and returns a detached record of it.
///
/// Extraction runs with the exception cleared. Anything that throws while
/// being read is cleared and left empty in the record.
pub fn capture(env: &Env) -> Option<ExceptionRecord> {
    let jni = env.jni();
    let throwable = jni.exception_occurred()?;
    if env.describe_exceptions() {
        jni.exception_describe();
    }
    jni.exception_clear();

    let record = match env.registry() {
        Ok(registry) => inspect(env, &registry, throwable, 0),
        Err(_) => {
            log::debug!("exception captured before the class registry was ready");
            ExceptionRecord {
                live: HandleRef::own(env, throwable, RefKind::Throwable).ok(),
                ..Default::default()
            }
        }
    };
    jni.delete_local_ref(throwable);
    log::debug!("captured {}", record.description());
    Some(record)
}

fn inspect(env: &Env, registry: &ClassRegistry, throwable: jni::jthrowable, depth: usize) -> ExceptionRecord {
    let _frame = match env.frame(CAPTURE_FRAME_CAPACITY) {
        Ok(frame) => Some(frame),
        Err(err) => {
            log::warn!("no local frame for exception capture: {err}");
            None
        }
    };

    let mut record = ExceptionRecord {
        live: HandleRef::own(env, throwable, RefKind::Throwable).ok(),
        class_name: class_name_of(env, registry, throwable),
        ..Default::default()
    };

    let Ok(throwable_class) = registry.get(names::THROWABLE) else {
        return record;
    };
    if let Ok(mid) = throwable_class.method("getMessage") {
        record.message = call_for_string(env, throwable, mid.raw(), &[], "message");
    }
    record.stack_trace = stack_trace_of(env, registry, throwable);

    if depth + 1 >= MAX_CAUSE_DEPTH {
        return record;
    }
    if let Ok(mid) = throwable_class.method("getCause") {
        let cause = env.jni().call_method(throwable, mid.raw(), JavaType::Object, &[]);
        let cause = unsafe { cause.l };
        if cleared(env, "cause") || cause.is_null() {
            return record;
        }
        if !env.jni().is_same_object(cause, throwable) {
            record.cause = Some(Box::new(inspect(env, registry, cause, depth + 1)));
        }
    }
    record
}

fn class_name_of(env: &Env, registry: &ClassRegistry, obj: jni::jobject) -> Option<String> {
    let cls = env.jni().get_object_class(obj)?;
    let mid = registry.get(names::CLASS).ok()?.method("getName").ok()?;
    call_for_string(env, cls, mid.raw(), &[], "class name")
}

fn stack_trace_of(env: &Env, registry: &ClassRegistry, throwable: jni::jthrowable) -> Option<String> {
    let jni = env.jni();
    let string_writer = registry.get(names::STRING_WRITER).ok()?;
    let print_writer = registry.get(names::PRINT_WRITER).ok()?;
    let print_stack_trace = registry.get(names::THROWABLE).ok()?.method("printStackTrace").ok()?;

    let _frame = env.frame(3).ok()?;
    let sw = jni.new_object(string_writer.class(), string_writer.method("new").ok()?.raw(), &[]);
    let Some(sw) = sw else {
        cleared(env, "stack trace");
        return None;
    };
    let pw = jni.new_object(print_writer.class(), print_writer.method("new").ok()?.raw(), &[jni::jvalue { l: sw }]);
    let Some(pw) = pw else {
        cleared(env, "stack trace");
        return None;
    };
    jni.call_method(throwable, print_stack_trace.raw(), JavaType::Void, &[jni::jvalue { l: pw }]);
    if cleared(env, "stack trace") {
        return None;
    }
    jni.call_method(pw, print_writer.method("flush").ok()?.raw(), JavaType::Void, &[]);
    if cleared(env, "stack trace") {
        return None;
    }
    call_for_string(env, sw, string_writer.method("toString").ok()?.raw(), &[], "stack trace")
}

fn call_for_string(
    env: &Env,
    obj: jni::jobject,
    mid: jni::jmethodID,
    args: &[jni::jvalue],
    what: &str,
) -> Option<String> {
    let result = unsafe { env.jni().call_method(obj, mid, JavaType::String, args).l };
    if cleared(env, what) || result.is_null() {
        return None;
    }
    let text = marshal::string_from_java(env, result);
    env.jni().delete_local_ref(result);
    match text {
        Ok(text) => Some(text),
        Err(err) => {
            log::warn!("cannot read exception {what}: {err}");
            None
        }
    }
}

/// Clears an exception raised while inspecting another one.
fn cleared(env: &Env, what: &str) -> bool {
    let jni = env.jni();
    if !jni.exception_check() {
        return false;
    }
    jni.exception_clear();
    log::warn!("exception while reading exception {what}; leaving it empty");
    true
}

/// Makes `record` the pending exception on this thread.
///
/// The original throwable is rethrown when the record still holds it and it
/// came from `env`'s session. Otherwise a `java.lang.RuntimeException`
/// carrying the record's description is thrown in its place.
pub fn throw(env: &Env, record: &ExceptionRecord) -> Result<()> {
    if let Some(live) = record.live() {
        if live.belongs_to(env) && live.is_live() {
            match env.jni().throw(live.raw()) {
                Ok(()) => return Ok(()),
                Err(code) => log::warn!("Throw failed ({code}), synthesizing a RuntimeException"),
            }
        }
    }
    throw_new(env, names::RUNTIME_EXCEPTION, &record.fallback_message())
}

/// Throws a new exception of `class_name` (dotted) with `message`.
pub fn throw_new(env: &Env, class_name: &str, message: &str) -> Result<()> {
    let message = message.replace('\0', "\\0");
    let registry = env.registry()?;
    if let Some(entry) = registry.lookup(class_name) {
        return env
            .jni()
            .throw_new(entry.class(), &message)
            .map_err(|code| env.errors().jni(code, "ThrowNew"));
    }

    env.with_frame(1, |env| {
        let internal = crate::signature::to_internal_name(class_name);
        let cls = env
            .jni()
            .find_class(&internal)
            .ok_or_else(|| env.pending_error(class_name))?;
        env.jni()
            .throw_new(cls, &message)
            .map_err(|code| env.errors().jni(code, "ThrowNew"))
    })
}

/// Leaves `err` pending as a Java exception, for native methods returning
/// into Java with a host failure.
pub fn raise(env: &Env, err: &Error) -> Result<()> {
    match err {
        Error::Java(record) => throw(env, record),
        other => throw_new(env, names::RUNTIME_EXCEPTION, &other.to_string()),
    }
}
