//! Error taxonomy and status-code translation.

use std::collections::HashMap;
use std::ffi::NulError;
use std::fmt;
use std::sync::Arc;

use crate::classfile::ClassFileError;
use crate::exception::ExceptionRecord;
use crate::sys::jni;
use crate::value::JavaType;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong crossing the bridge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A null handle where an object was required.
    #[error("null object: {0}")]
    NullObject(String),

    /// A host value of the wrong kind for the target Java type.
    #[error("cannot encode {found} as {expected}")]
    TypeMismatch { expected: JavaType, found: &'static str },

    /// A host number outside the target type's range.
    #[error("{value} is out of range for {ty}")]
    Range { ty: JavaType, value: String },

    /// Wrong number of values for a signature or slice.
    #[error("expected {expected} values, got {found}")]
    Arity { expected: usize, found: usize },

    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("invalid slice [{start}:{stop}:{step}] for length {len}")]
    InvalidSlice { start: i64, stop: i64, step: i64, len: usize },

    #[error("string contains an interior NUL byte: {0}")]
    Nul(#[from] NulError),

    #[error("invalid class file: {0}")]
    ClassFormat(#[from] ClassFileError),

    /// A class or member the registry could not resolve.
    #[error("class registry: {0}")]
    Registry(String),

    /// The session has no initialized registry (never started, or shut down).
    #[error("session is not ready")]
    NotReady,

    /// A status code returned by a VM lifecycle call.
    #[error("{message} ({code})")]
    Jvm { code: StatusCode, message: String },

    /// A Java exception captured from a pending-exception state.
    #[error("{}", .0.description())]
    Java(Box<ExceptionRecord>),

    /// An error produced by a caller-supplied [`ErrorMap`] entry.
    #[error(transparent)]
    Host(Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to load libjvm: {0}")]
    Load(String),
}

impl Error {
    /// The status code carried by a `Jvm` error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Jvm { code, .. } => Some(*code),
            Error::Java(_) => Some(StatusCode::Exception),
            Error::Host(_) => Some(StatusCode::Host),
            _ => None,
        }
    }

    /// True for the error raised when no environment can be obtained.
    pub fn is_detached(&self) -> bool {
        self.status() == Some(StatusCode::EDetached)
    }

    /// The captured exception, if this error came from Java.
    pub fn exception(&self) -> Option<&ExceptionRecord> {
        match self {
            Error::Java(record) => Some(record),
            _ => None,
        }
    }
}

/// The closed set of status codes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Success,
    Unknown,
    Exception,
    Host,
    Err,
    EDetached,
    EVersion,
    ENoMem,
    EExist,
    EInval,
}

impl StatusCode {
    pub const ALL: [StatusCode; 10] = [
        StatusCode::Success,
        StatusCode::Unknown,
        StatusCode::Exception,
        StatusCode::Host,
        StatusCode::Err,
        StatusCode::EDetached,
        StatusCode::EVersion,
        StatusCode::ENoMem,
        StatusCode::EExist,
        StatusCode::EInval,
    ];

    /// Numeric value. The four bridge codes sit above the JNI range.
    pub fn code(self) -> i32 {
        match self {
            StatusCode::Success => 1000,
            StatusCode::Unknown => 1001,
            StatusCode::Exception => 1002,
            StatusCode::Host => 1003,
            StatusCode::Err => jni::JNI_ERR,
            StatusCode::EDetached => jni::JNI_EDETACHED,
            StatusCode::EVersion => jni::JNI_EVERSION,
            StatusCode::ENoMem => jni::JNI_ENOMEM,
            StatusCode::EExist => jni::JNI_EEXIST,
            StatusCode::EInval => jni::JNI_EINVAL,
        }
    }

    /// Maps a numeric code back. `JNI_OK` is `Success`; anything unrecognized is `Unknown`.
    pub fn from_code(code: i32) -> StatusCode {
        if code == jni::JNI_OK {
            return StatusCode::Success;
        }
        StatusCode::ALL
            .into_iter()
            .find(|s| s.code() == code)
            .unwrap_or(StatusCode::Unknown)
    }

    pub fn description(self) -> &'static str {
        match self {
            StatusCode::Success => "success",
            StatusCode::Unknown => "unknown error",
            StatusCode::Exception => "java exception",
            StatusCode::Host => "host error",
            StatusCode::Err => "unknown JNI error",
            StatusCode::EDetached => "thread detached from the VM",
            StatusCode::EVersion => "JNI version error",
            StatusCode::ENoMem => "not enough memory",
            StatusCode::EExist => "VM already created",
            StatusCode::EInval => "invalid arguments",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}

pub type HostErrorFactory = Arc<dyn Fn(String) -> Error + Send + Sync>;
pub type JavaErrorFactory = Arc<dyn Fn(ExceptionRecord) -> Error + Send + Sync>;

/// Caller-supplied translation from bridge failures to host errors.
///
/// ```rust,ignore
/// let map = ErrorMap::new()
///     .with_code(StatusCode::ENoMem, |msg| Error::Host(Box::new(OutOfMemory(msg))))
///     .with_java_exception(|record| Error::Host(Box::new(MyJavaError::from(record))));
/// ```
#[derive(Clone, Default)]
pub struct ErrorMap {
    codes: HashMap<StatusCode, HostErrorFactory>,
    java: Option<JavaErrorFactory>,
}

impl ErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the host error produced for `code`.
    pub fn with_code<F>(mut self, code: StatusCode, factory: F) -> Self
    where
        F: Fn(String) -> Error + Send + Sync + 'static,
    {
        self.codes.insert(code, Arc::new(factory));
        self
    }

    /// Registers the wrapper for captured Java exceptions.
    pub fn with_java_exception<F>(mut self, factory: F) -> Self
    where
        F: Fn(ExceptionRecord) -> Error + Send + Sync + 'static,
    {
        self.java = Some(Arc::new(factory));
        self
    }

    /// Translates a status code. Falls back to the `Err` entry, then to [`Error::Jvm`].
    pub fn status(&self, code: StatusCode, message: impl Into<String>) -> Error {
        let message = message.into();
        match self.codes.get(&code).or_else(|| self.codes.get(&StatusCode::Err)) {
            Some(factory) => factory(message),
            None => Error::Jvm { code, message },
        }
    }

    /// Translates a raw JNI return value.
    pub fn jni(&self, code: jni::jint, context: &str) -> Error {
        self.status(StatusCode::from_code(code), context)
    }

    /// Translates a captured Java exception. Falls back to [`Error::Java`].
    pub fn java(&self, record: ExceptionRecord) -> Error {
        match &self.java {
            Some(factory) => factory(record),
            None => Error::Java(Box::new(record)),
        }
    }
}

impl fmt::Debug for ErrorMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut codes: Vec<_> = self.codes.keys().collect();
        codes.sort_by_key(|c| c.code());
        f.debug_struct("ErrorMap")
            .field("codes", &codes)
            .field("java", &self.java.is_some())
            .finish()
    }
}
