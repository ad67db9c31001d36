//! Java-side reachability notifications for host objects.
//!
//! [`ReferenceQueueWorker::register_reference`] wraps a Java object in a
//! `PhantomReference` on the worker's `ReferenceQueue`, tagged with a host
//! token. Once the JVM collects the object, the worker thread removes the
//! reference from the queue and hands the token to the callback. Each token
//! is delivered at most once.
//!
//! ```rust,ignore
//! let worker = ReferenceQueueWorker::new(&env, Arc::new(|token| shadows.release(token)))?;
//! worker.register_reference(&env, &proxy, shadow_id)?;
//! worker.start()?;
//! // ...
//! worker.stop();
//! session.shutdown()?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use parking_lot::Mutex;

use crate::args::ArgumentList;
use crate::call;
use crate::error::{Error, Result};
use crate::handle::HandleRef;
use crate::registry::names;
use crate::session::{Env, Session};
use crate::system;
use crate::value::{JavaType, Value};

/// How long one `ReferenceQueue.remove` call blocks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

pub type TokenCallback = Arc<dyn Fn(u64) + Send + Sync>;

struct Registration {
    reference: HandleRef,
    token: u64,
}

struct Shared {
    queue: HandleRef,
    // Keyed by the reference's identity hash; collisions are told apart
    // with IsSameObject.
    pending: Mutex<HashMap<i32, Vec<Registration>>>,
    running: AtomicBool,
    callback: TokenCallback,
}

pub struct ReferenceQueueWorker {
    session: Session,
    shared: Arc<Shared>,
    poll_interval: Duration,
    thread: Mutex<Option<JoinHandle<()>>>,
    worker_id: Mutex<Option<ThreadId>>,
}

impl ReferenceQueueWorker {
    /// Creates the Java `ReferenceQueue`. The worker thread is not started.
    pub fn new(env: &Env, callback: TokenCallback) -> Result<Self> {
        let registry = env.registry()?;
        let queue_class = registry.get(names::REFERENCE_QUEUE)?;
        let queue = call::new_object(
            env,
            &queue_class.handle(env)?,
            queue_class.method("new")?,
            &ArgumentList::new(env, 0),
        )?;
        Ok(ReferenceQueueWorker {
            session: env.session(),
            shared: Arc::new(Shared {
                queue,
                pending: Mutex::new(HashMap::new()),
                running: AtomicBool::new(false),
                callback,
            }),
            poll_interval: DEFAULT_POLL_INTERVAL,
            thread: Mutex::new(None),
            worker_id: Mutex::new(None),
        })
    }

    /// Sets the `remove` timeout, which bounds how long `stop` waits.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Delivers `token` once `source` becomes unreachable in Java.
    pub fn register_reference(&self, env: &Env, source: &HandleRef, token: u64) -> Result<()> {
        let registry = env.registry()?;
        let phantom_class = registry.get(names::PHANTOM_REFERENCE)?;

        let mut args = ArgumentList::new(env, 2);
        args.set(env, 0, JavaType::Object, &Value::Object(source.clone()))?;
        args.set(env, 1, JavaType::Object, &Value::Object(self.shared.queue.clone()))?;
        let reference = call::new_object(env, &phantom_class.handle(env)?, phantom_class.method("new")?, &args)?;

        let key = system::identity_hash_code(env, &reference)?;
        self.shared
            .pending
            .lock()
            .entry(key)
            .or_default()
            .push(Registration { reference, token });
        log::trace!("registered reference for token {token}");
        Ok(())
    }

    /// Registrations whose token has not been delivered yet.
    pub fn pending(&self) -> usize {
        self.shared.pending.lock().values().map(Vec::len).sum()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Spawns the worker thread. A no-op if it is already running.
    pub fn start(&self) -> Result<()> {
        let mut thread = self.thread.lock();
        if thread.is_some() {
            return Ok(());
        }
        self.shared.running.store(true, Ordering::Release);

        let session = self.session.clone();
        let shared = Arc::clone(&self.shared);
        let poll = self.poll_interval;
        let handle = thread::Builder::new()
            .name("jvm-refqueue".to_string())
            .spawn(move || drain(session, shared, poll))
            .map_err(|e| {
                self.shared.running.store(false, Ordering::Release);
                Error::Host(Box::new(e))
            })?;
        *self.worker_id.lock() = Some(handle.thread().id());
        *thread = Some(handle);
        log::debug!("reference queue worker started (poll {poll:?})");
        Ok(())
    }

    /// Stops the worker and waits for its thread to exit. Idempotent.
    ///
    /// Called from the callback itself, it only signals the worker.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::Release);
        if *self.worker_id.lock() == Some(thread::current().id()) {
            return;
        }
        let Some(handle) = self.thread.lock().take() else {
            return;
        };
        if handle.join().is_err() {
            log::error!("reference queue worker panicked");
        }
        *self.worker_id.lock() = None;
        log::debug!("reference queue worker stopped");
    }
}

impl Drop for ReferenceQueueWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for ReferenceQueueWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceQueueWorker")
            .field("running", &self.is_running())
            .field("pending", &self.pending())
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

fn drain(session: Session, shared: Arc<Shared>, poll: Duration) {
    let env = match session.attach(true) {
        Ok(env) => env,
        Err(err) => {
            log::error!("reference queue worker cannot attach: {err}");
            shared.running.store(false, Ordering::Release);
            return;
        }
    };
    let timeout = Value::Int(poll.as_millis().min(i64::MAX as u128) as i64);

    while shared.running.load(Ordering::Acquire) && session.is_alive() {
        match remove(&env, &shared, &timeout) {
            Ok(Some(reference)) => deliver(&env, &shared, reference),
            Ok(None) => {}
            Err(err) if err.exception().is_some() => {
                log::warn!("ReferenceQueue.remove threw: {err}");
            }
            Err(err) => {
                log::error!("reference queue worker stopping: {err}");
                break;
            }
        }
    }

    shared.running.store(false, Ordering::Release);
    drop(env);
    if let Err(err) = session.detach() {
        log::warn!("reference queue worker failed to detach: {err}");
    }
}

fn remove(env: &Env, shared: &Shared, timeout: &Value) -> Result<Option<HandleRef>> {
    let registry = env.registry()?;
    let mid = registry.get(names::REFERENCE_QUEUE)?.method("remove")?;
    let mut args = ArgumentList::new(env, 1);
    args.set(env, 0, JavaType::Long, timeout)?;
    Ok(call::call_method(env, &shared.queue, mid, JavaType::Object, &args)?.into_handle())
}

fn deliver(env: &Env, shared: &Shared, reference: HandleRef) {
    let key = match system::identity_hash_code(env, &reference) {
        Ok(key) => key,
        Err(err) => {
            log::warn!("cannot hash dequeued reference: {err}");
            return;
        }
    };

    let registration = {
        let mut pending = shared.pending.lock();
        let Some(bucket) = pending.get_mut(&key) else {
            log::trace!("dequeued unknown reference");
            return;
        };
        let position = bucket.iter().position(|r| r.reference.same_object(env, &reference));
        let registration = position.map(|i| bucket.swap_remove(i));
        if bucket.is_empty() {
            pending.remove(&key);
        }
        registration
    };
    let Some(registration) = registration else {
        log::trace!("dequeued unknown reference");
        return;
    };

    if let Ok(clear) = env.registry().and_then(|r| r.get(names::REFERENCE)?.method("clear")) {
        if let Err(err) = call::call_method(env, &registration.reference, clear, JavaType::Void, &ArgumentList::new(env, 0)) {
            log::warn!("Reference.clear failed: {err}");
        }
    }
    log::trace!("delivering token {}", registration.token);
    (shared.callback)(registration.token);
}
