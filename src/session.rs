//! Session lifecycle: create or attach to a JVM, hand out per-thread
//! environments, and tear everything down exactly once.
//!
//! ```rust,ignore
//! use jvm_bridge::prelude::*;
//!
//! let (session, env) = Session::builder()
//!     .option("-Xmx256m")
//!     .helper_classpath("/opt/app/java")
//!     .start_from_library("/usr/lib/jvm/default/lib/server/libjvm.so")?;
//!
//! // other threads
//! let env = session.env()?;
//!
//! session.shutdown()?;
//! ```
//!
//! Threads attach once and stay attached for the rest of their life. The
//! first call to [`Session::env`] on a thread attaches it; a thread-local
//! guard detaches it when the thread exits, unless the session has closed.
//! Shutdown does not hold any lock while `DestroyJavaVM` runs, so other
//! non-daemon threads can still exit and detach while the VM waits for them.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashSet;
use std::ffi::{c_void, CString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::error::{Error, ErrorMap, Result, StatusCode};
use crate::exception;
use crate::frame::LocalFrame;
use crate::jni_wrapper::JniEnv;
use crate::registry::{ClassRegistry, SYSTEM_CLASSES};
use crate::sys::jni;

/// JNI version requested when none is configured.
pub const DEFAULT_JNI_VERSION: jni::jint = jni::JNI_VERSION_1_8;

const CLASSPATH_OPTION: &str = "-Djava.class.path=";

#[cfg(windows)]
const PATH_SEPARATOR: &str = ";";
#[cfg(not(windows))]
const PATH_SEPARATOR: &str = ":";

/// Merges every `-Djava.class.path=` option with the helper entries.
///
/// The result carries a single classpath option, placed first, with
/// duplicates removed. Other options keep their relative order. No
/// classpath option is emitted when there are no entries at all.
pub fn merge_classpath<S: AsRef<str>, P: AsRef<Path>>(options: &[S], helper: &[P]) -> Vec<String> {
    let mut entries: Vec<String> = Vec::new();
    let mut rest = Vec::new();

    for opt in options {
        let opt = opt.as_ref();
        match opt.strip_prefix(CLASSPATH_OPTION) {
            Some(cp) => entries.extend(
                cp.split(PATH_SEPARATOR)
                    .filter(|e| !e.is_empty())
                    .map(str::to_string),
            ),
            None => rest.push(opt.to_string()),
        }
    }
    entries.extend(helper.iter().map(|p| p.as_ref().to_string_lossy().into_owned()));

    let mut seen = HashSet::new();
    entries.retain(|e| seen.insert(e.clone()));

    if entries.is_empty() {
        return rest;
    }
    let mut merged = Vec::with_capacity(rest.len() + 1);
    merged.push(format!("{CLASSPATH_OPTION}{}", entries.join(PATH_SEPARATOR)));
    merged.extend(rest);
    merged
}

#[derive(Debug, Clone)]
pub(crate) struct SessionConfig {
    pub(crate) version: jni::jint,
    pub(crate) errors: ErrorMap,
    pub(crate) daemon_threads: bool,
    pub(crate) describe_exceptions: bool,
}

/// Builder for a JVM session.
pub struct SessionBuilder {
    version: jni::jint,
    options: Vec<String>,
    ignore_unrecognized: bool,
    helper_classpath: Vec<PathBuf>,
    errors: ErrorMap,
    daemon_threads: bool,
    describe_exceptions: bool,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_JNI_VERSION)
    }
}

impl SessionBuilder {
    /// Create a new builder for the given JNI version (e.g. `jni::JNI_VERSION_1_8`).
    pub fn new(version: jni::jint) -> Self {
        Self {
            version,
            options: Vec::new(),
            ignore_unrecognized: true,
            helper_classpath: Vec::new(),
            errors: ErrorMap::default(),
            daemon_threads: false,
            describe_exceptions: false,
        }
    }

    /// Add a JVM option like `-Xmx1g` or `-Dkey=value`.
    pub fn option(mut self, opt: impl Into<String>) -> Self {
        self.options.push(opt.into());
        self
    }

    /// Add multiple JVM options.
    pub fn options<I, S>(mut self, opts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.extend(opts.into_iter().map(Into::into));
        self
    }

    /// Set whether unrecognized options should be ignored. Defaults to true.
    pub fn ignore_unrecognized(mut self, value: bool) -> Self {
        self.ignore_unrecognized = value;
        self
    }

    /// Add a classpath entry that is always injected into the VM classpath.
    pub fn helper_classpath(mut self, path: impl Into<PathBuf>) -> Self {
        self.helper_classpath.push(path.into());
        self
    }

    /// Set the status-code and Java-exception translation table.
    pub fn error_map(mut self, errors: ErrorMap) -> Self {
        self.errors = errors;
        self
    }

    /// Attach lazily-attached threads as daemons.
    pub fn daemon_threads(mut self, value: bool) -> Self {
        self.daemon_threads = value;
        self
    }

    /// Print pending exceptions to stderr (via `ExceptionDescribe`) before capturing them.
    pub fn describe_exceptions(mut self, value: bool) -> Self {
        self.describe_exceptions = value;
        self
    }

    /// The option list handed to `JNI_CreateJavaVM`.
    pub fn jvm_options(&self) -> Vec<String> {
        merge_classpath(&self.options, &self.helper_classpath)
    }

    fn config(&self) -> SessionConfig {
        SessionConfig {
            version: self.version,
            errors: self.errors.clone(),
            daemon_threads: self.daemon_threads,
            describe_exceptions: self.describe_exceptions,
        }
    }

    /// Create a JVM using a raw `JNI_CreateJavaVM` function pointer.
    ///
    /// # Safety
    /// The caller must ensure the function pointer is valid and the JVM
    /// shared library remains loaded for the lifetime of the returned session.
    pub unsafe fn start_with(self, create: jni::JNI_CreateJavaVM) -> Result<(Session, Env)> {
        self.start_inner(create, None)
    }

    /// Create a JVM by dynamically loading `libjvm` from the given path.
    #[cfg(feature = "embed")]
    pub fn start_from_library<P: AsRef<Path>>(self, path: P) -> Result<(Session, Env)> {
        let lib = unsafe { libloading::Library::new(path.as_ref()).map_err(|e| Error::Load(e.to_string()))? };
        let create: jni::JNI_CreateJavaVM = unsafe {
            let symbol = lib
                .get::<jni::JNI_CreateJavaVM>(b"JNI_CreateJavaVM\0")
                .map_err(|e| Error::Load(e.to_string()))?;
            *symbol
        };
        unsafe { self.start_inner(create, Some(Box::new(lib))) }
    }

    unsafe fn start_inner(
        self,
        create: jni::JNI_CreateJavaVM,
        library: Option<Box<dyn Any + Send + Sync>>,
    ) -> Result<(Session, Env)> {
        let options = self.jvm_options();
        let c_options = options
            .iter()
            .map(|o| CString::new(o.as_str()))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut opt_structs: Vec<jni::JavaVMOption> = c_options
            .iter()
            .map(|s| jni::JavaVMOption {
                optionString: s.as_ptr() as *mut std::os::raw::c_char,
                extraInfo: ptr::null_mut(),
            })
            .collect();

        let mut args = jni::JavaVMInitArgs {
            version: self.version,
            nOptions: opt_structs.len() as jni::jint,
            options: if opt_structs.is_empty() {
                ptr::null_mut()
            } else {
                opt_structs.as_mut_ptr()
            },
            ignoreUnrecognized: if self.ignore_unrecognized { jni::JNI_TRUE } else { jni::JNI_FALSE },
        };

        let mut vm: *mut jni::JavaVM = ptr::null_mut();
        let mut env: *mut c_void = ptr::null_mut();

        let res = create(&mut vm, &mut env, &mut args as *mut jni::JavaVMInitArgs as *mut c_void);
        if res != jni::JNI_OK {
            return Err(self.errors.jni(res, "JNI_CreateJavaVM"));
        }
        if vm.is_null() || env.is_null() {
            return Err(self.errors.status(StatusCode::Err, "JNI_CreateJavaVM returned a null handle"));
        }
        log::info!("created JVM with {} option(s)", options.len());

        let shared = Arc::new(SessionShared::new(vm, self.config(), true, library));
        let env = Env::new(JniEnv::from_raw(env as *mut jni::JNIEnv), Arc::clone(&shared));
        if let Err(err) = shared.init_registry(&env) {
            log::error!("class registry initialization failed, destroying JVM: {err}");
            drop(env);
            if let Err(destroy) = shared.shutdown() {
                log::error!("failed to destroy JVM: {destroy}");
            }
            return Err(err);
        }
        Ok((Session { shared }, env))
    }

    /// Bind to a JVM that is already running in this process.
    ///
    /// The session does not own the VM: `shutdown` disposes the registry but
    /// leaves the VM running.
    ///
    /// # Safety
    /// `vm` must be a valid `JavaVM*` that outlives the session.
    pub unsafe fn attach_existing(self, vm: *mut jni::JavaVM) -> Result<(Session, Env)> {
        if vm.is_null() {
            return Err(Error::NullObject("JavaVM".to_string()));
        }
        let shared = Arc::new(SessionShared::new(vm, self.config(), false, None));
        let env = shared.attach_current(self.daemon_threads)?;
        if let Err(err) = shared.init_registry(&env) {
            drop(env);
            if let Err(e) = shared.shutdown() {
                log::error!("failed to release session: {e}");
            }
            return Err(err);
        }
        log::info!("attached to running JVM");
        Ok((Session { shared }, env))
    }
}

thread_local! {
    static ATTACHMENTS: RefCell<Vec<ThreadAttachment>> = RefCell::new(Vec::new());
}

/// Detaches the owning thread from a VM when the thread exits.
///
/// Holds the [`Lifecycle`] rather than the session, so a thread still detaches
/// after the last `Session` is gone and while the VM is being destroyed.
struct ThreadAttachment {
    life: Arc<Lifecycle>,
}

impl Drop for ThreadAttachment {
    fn drop(&mut self) {
        if let Err(code) = self.life.detach_current() {
            log::error!(
                "failed to detach exiting thread: {} ({code})",
                StatusCode::from_code(code).description()
            );
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VmState {
    Running,
    /// Shutdown has released the registry and is destroying (or leaving) the
    /// VM. Handle releases are skipped; threads may still detach.
    Closing,
    Closed,
}

/// The VM pointer and where the session is in its life.
struct Lifecycle {
    vm: *mut jni::JavaVM,
    version: jni::jint,
    state: RwLock<VmState>,
}

// JavaVM pointers are valid from any thread; the state is behind a lock.
unsafe impl Send for Lifecycle {}
unsafe impl Sync for Lifecycle {}

impl Lifecycle {
    fn state(&self) -> VmState {
        *self.state.read()
    }

    fn get_env(&self) -> std::result::Result<*mut jni::JNIEnv, jni::jint> {
        let mut env: *mut c_void = ptr::null_mut();
        let res = unsafe { crate::jvm_call!(self.vm, GetEnv, &mut env, self.version) };
        if res != jni::JNI_OK || env.is_null() {
            return Err(if res == jni::JNI_OK { jni::JNI_ERR } else { res });
        }
        Ok(env as *mut jni::JNIEnv)
    }

    /// Detaches the calling thread unless the session is closed.
    ///
    /// `Ok(false)` when there was nothing to detach.
    fn detach_current(&self) -> std::result::Result<bool, jni::jint> {
        let state = self.state.read();
        if *state == VmState::Closed {
            return Ok(false);
        }
        match self.get_env() {
            Ok(_) => {}
            Err(jni::JNI_EDETACHED) => return Ok(false),
            Err(code) => return Err(code),
        }
        let res = unsafe { crate::jvm_call!(self.vm, DetachCurrentThread) };
        if res != jni::JNI_OK {
            return Err(res);
        }
        log::debug!("detached current thread");
        Ok(true)
    }
}

pub(crate) struct SessionShared {
    life: Arc<Lifecycle>,
    registry: RwLock<Option<Arc<ClassRegistry>>>,
    config: SessionConfig,
    owns_vm: bool,
    _library: Option<Box<dyn Any + Send + Sync>>,
}

// Everything mutable is behind locks; the library handle is only kept alive.
unsafe impl Send for SessionShared {}
unsafe impl Sync for SessionShared {}

impl SessionShared {
    fn new(
        vm: *mut jni::JavaVM,
        config: SessionConfig,
        owns_vm: bool,
        library: Option<Box<dyn Any + Send + Sync>>,
    ) -> Self {
        Self {
            life: Arc::new(Lifecycle { vm, version: config.version, state: RwLock::new(VmState::Running) }),
            registry: RwLock::new(None),
            config,
            owns_vm,
            _library: library,
        }
    }

    fn init_registry(&self, env: &Env) -> Result<()> {
        let registry = ClassRegistry::initialize(env, SYSTEM_CLASSES)?;
        *self.registry.write() = Some(Arc::new(registry));
        Ok(())
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.life.state() == VmState::Running
    }

    pub(crate) fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn registry(&self) -> Result<Arc<ClassRegistry>> {
        self.registry.read().clone().ok_or(Error::NotReady)
    }

    fn get_env(&self) -> std::result::Result<*mut jni::JNIEnv, jni::jint> {
        self.life.get_env()
    }

    /// Runs `f` with the calling thread's environment, without attaching.
    ///
    /// Returns `None` once shutdown has begun or when the thread is not
    /// attached. Holds the lifecycle lock for the duration so shutdown cannot
    /// start underneath `f`.
    pub(crate) fn with_current_env<R>(&self, f: impl FnOnce(&JniEnv) -> R) -> Option<R> {
        let state = self.life.state.read();
        if *state != VmState::Running {
            return None;
        }
        let env = self.get_env().ok()?;
        let env = unsafe { JniEnv::from_raw(env) };
        Some(f(&env))
    }

    fn attach_current(self: &Arc<Self>, daemon: bool) -> Result<Env> {
        if !self.is_alive() {
            return Err(self.config.errors.status(StatusCode::EDetached, "session is not started"));
        }
        match self.get_env() {
            Ok(env) => return Ok(Env::new(unsafe { JniEnv::from_raw(env) }, Arc::clone(self))),
            Err(jni::JNI_EDETACHED) => {}
            Err(code) => return Err(self.config.errors.jni(code, "GetEnv")),
        }

        let vm = self.life.vm;
        let mut env: *mut c_void = ptr::null_mut();
        let res = unsafe {
            if daemon {
                crate::jvm_call!(vm, AttachCurrentThreadAsDaemon, &mut env, ptr::null_mut())
            } else {
                crate::jvm_call!(vm, AttachCurrentThread, &mut env, ptr::null_mut())
            }
        };
        if res != jni::JNI_OK || env.is_null() {
            return Err(self.config.errors.jni(res, "AttachCurrentThread"));
        }

        let life = Arc::clone(&self.life);
        if let Err(rejected) = ATTACHMENTS.try_with(|a| a.borrow_mut().push(ThreadAttachment { life })) {
            log::warn!("thread-local storage unavailable, thread will stay attached: {rejected}");
        }
        log::debug!(
            "attached thread {:?} (daemon: {daemon})",
            std::thread::current().name().unwrap_or("<unnamed>")
        );
        Ok(Env::new(unsafe { JniEnv::from_raw(env as *mut jni::JNIEnv) }, Arc::clone(self)))
    }

    fn detach_current(&self) -> Result<()> {
        self.life
            .detach_current()
            .map(drop)
            .map_err(|code| self.config.errors.jni(code, "DetachCurrentThread"))
    }

    fn shutdown(&self) -> Result<()> {
        let vm = self.life.vm;
        let attached_here = {
            let mut state = self.life.state.write();
            if *state != VmState::Running {
                return Ok(());
            }

            let mut attached_here = false;
            let env = match self.get_env() {
                Ok(env) => Ok(env),
                Err(jni::JNI_EDETACHED) => {
                    let mut env: *mut c_void = ptr::null_mut();
                    let res = unsafe { crate::jvm_call!(vm, AttachCurrentThread, &mut env, ptr::null_mut()) };
                    if res == jni::JNI_OK && !env.is_null() {
                        attached_here = true;
                        Ok(env as *mut jni::JNIEnv)
                    } else {
                        Err(res)
                    }
                }
                Err(code) => Err(code),
            };

            let registry = self.registry.write().take();
            *state = VmState::Closing;
            let env = match env {
                Ok(env) => unsafe { JniEnv::from_raw(env) },
                Err(code) => {
                    *state = VmState::Closed;
                    log::error!("no environment for shutdown; class registry leaked");
                    return Err(self.config.errors.jni(code, "AttachCurrentThread"));
                }
            };
            if let Some(registry) = registry {
                registry.dispose(&env);
            }
            attached_here
        };

        // Unlocked: DestroyJavaVM waits for the other non-daemon threads, and
        // they take the read lock to detach.
        let result = if self.owns_vm {
            log::info!("destroying JVM");
            let res = unsafe { crate::jvm_call!(vm, DestroyJavaVM) };
            if res == jni::JNI_OK {
                Ok(())
            } else {
                Err(self.config.errors.jni(res, "DestroyJavaVM"))
            }
        } else if attached_here {
            let res = unsafe { crate::jvm_call!(vm, DetachCurrentThread) };
            if res == jni::JNI_OK {
                Ok(())
            } else {
                Err(self.config.errors.jni(res, "DetachCurrentThread"))
            }
        } else {
            Ok(())
        };
        *self.life.state.write() = VmState::Closed;
        result
    }
}

impl Drop for SessionShared {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            log::error!("failed to shut down JVM session: {err}");
        }
    }
}

/// A running JVM session.
///
/// Cheap to clone; every clone refers to the same VM. Dropping the last
/// clone shuts the session down.
#[derive(Clone)]
pub struct Session {
    shared: Arc<SessionShared>,
}

impl Session {
    /// Builder with the default JNI version.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// The calling thread's environment, attaching the thread on first use.
    pub fn env(&self) -> Result<Env> {
        self.shared.attach_current(self.shared.config.daemon_threads)
    }

    /// Attach the calling thread explicitly. A no-op if it is already attached.
    pub fn attach(&self, daemon: bool) -> Result<Env> {
        self.shared.attach_current(daemon)
    }

    /// The calling thread's environment, if it is already attached.
    pub fn current_env(&self) -> Option<Env> {
        if !self.shared.is_alive() {
            return None;
        }
        let env = self.shared.get_env().ok()?;
        Some(Env::new(unsafe { JniEnv::from_raw(env) }, Arc::clone(&self.shared)))
    }

    /// Detach the calling thread. Idempotent.
    pub fn detach(&self) -> Result<()> {
        let life = &self.shared.life;
        let _ = ATTACHMENTS.try_with(|a| {
            a.borrow_mut().retain(|entry| !Arc::ptr_eq(&entry.life, life));
        });
        self.shared.detach_current()
    }

    /// Whether the calling thread currently has an environment for this VM.
    pub fn is_thread_attached(&self) -> bool {
        self.shared.is_alive() && self.shared.get_env().is_ok()
    }

    /// False once [`shutdown`](Self::shutdown) has run.
    pub fn is_alive(&self) -> bool {
        self.shared.is_alive()
    }

    pub fn registry(&self) -> Result<Arc<ClassRegistry>> {
        self.shared.registry()
    }

    pub fn errors(&self) -> &ErrorMap {
        &self.shared.config.errors
    }

    /// Return the raw `JavaVM*` pointer.
    pub fn java_vm_ptr(&self) -> *mut jni::JavaVM {
        self.shared.life.vm
    }

    /// Dispose the class registry, then destroy the VM. Idempotent.
    pub fn shutdown(&self) -> Result<()> {
        self.shared.shutdown()
    }

    pub(crate) fn downgrade(&self) -> Weak<SessionShared> {
        Arc::downgrade(&self.shared)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("vm", &self.shared.life.vm)
            .field("alive", &self.shared.is_alive())
            .field("owns_vm", &self.shared.owns_vm)
            .finish()
    }
}

/// A thread's JNI environment bound to the session it came from.
///
/// Not `Send`: an environment is only valid on the thread that obtained it.
pub struct Env {
    jni: JniEnv,
    shared: Arc<SessionShared>,
}

impl Env {
    pub(crate) fn new(jni: JniEnv, shared: Arc<SessionShared>) -> Self {
        Self { jni, shared }
    }

    /// The raw wrapper, for calls this crate does not cover.
    pub fn jni(&self) -> &JniEnv {
        &self.jni
    }

    pub fn session(&self) -> Session {
        Session { shared: Arc::clone(&self.shared) }
    }

    pub fn registry(&self) -> Result<Arc<ClassRegistry>> {
        self.shared.registry()
    }

    pub fn errors(&self) -> &ErrorMap {
        &self.shared.config.errors
    }

    pub(crate) fn session_ref(&self) -> Weak<SessionShared> {
        Arc::downgrade(&self.shared)
    }

    pub(crate) fn describe_exceptions(&self) -> bool {
        self.shared.config.describe_exceptions
    }

    pub(crate) fn owns(&self, session: &Weak<SessionShared>) -> bool {
        ptr::eq(session.as_ptr(), Arc::as_ptr(&self.shared))
    }

    /// True if a Java exception is pending on this thread.
    pub fn exception_pending(&self) -> bool {
        self.jni.exception_check()
    }

    /// Captures and translates a pending exception, if any.
    pub fn check_exception(&self) -> Result<()> {
        match exception::capture(self) {
            Some(record) => Err(self.errors().java(record)),
            None => Ok(()),
        }
    }

    /// The error for a JNI call that returned null: the pending exception if
    /// there is one, otherwise `NullObject(context)`.
    pub fn pending_error(&self, context: &str) -> Error {
        match exception::capture(self) {
            Some(record) => self.errors().java(record),
            None => Error::NullObject(context.to_string()),
        }
    }

    /// Pushes a local frame; see [`LocalFrame::enter`].
    pub fn frame(&self, capacity: usize) -> Result<LocalFrame<'_>> {
        LocalFrame::enter(self, capacity)
    }

    /// Runs `f` inside a local frame, popping it on every exit path.
    pub fn with_frame<T>(&self, capacity: usize, f: impl FnOnce(&Env) -> Result<T>) -> Result<T> {
        let _frame = LocalFrame::enter(self, capacity)?;
        f(self)
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env").field("env", &self.jni.raw()).finish()
    }
}
