//! An in-process stand-in for a JVM.
//!
//! Implements the part of the JNI function table and invocation interface
//! the bridge uses, over a small object heap. Every call is counted, and the
//! heap keeps the bookkeeping the tests assert on: global references
//! created and deleted, frames pushed and popped, pinned buffers, and JNI
//! calls made while an exception was pending.
//!
//! Known classes are the bootstrap set below plus anything passed to
//! `DefineClass`. Methods are resolved by name and signature against a
//! fixed behavior table; names starting with `missing` never resolve.

#![allow(non_snake_case, dead_code, clippy::missing_safety_doc)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::ffi::{c_void, CStr};
use std::os::raw::c_char;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::ThreadId;
use std::time::{Duration, Instant};

use jvm_bridge::sys::jni::{self, *};
use parking_lot::{Condvar, Mutex, MutexGuard};

type ObjId = u64;

const OBJECT: &str = "java/lang/Object";
const THROWABLE: &str = "java/lang/Throwable";

const BOOT_CLASSES: &[(&str, Option<&str>)] = &[
    (OBJECT, None),
    ("java/lang/Class", Some(OBJECT)),
    ("java/lang/String", Some(OBJECT)),
    ("java/lang/System", Some(OBJECT)),
    ("java/lang/Thread", Some(OBJECT)),
    ("java/lang/ClassLoader", Some(OBJECT)),
    ("java/lang/Number", Some(OBJECT)),
    ("java/lang/Boolean", Some(OBJECT)),
    ("java/lang/Character", Some(OBJECT)),
    ("java/lang/Byte", Some("java/lang/Number")),
    ("java/lang/Short", Some("java/lang/Number")),
    ("java/lang/Integer", Some("java/lang/Number")),
    ("java/lang/Long", Some("java/lang/Number")),
    ("java/lang/Float", Some("java/lang/Number")),
    ("java/lang/Double", Some("java/lang/Number")),
    (THROWABLE, Some(OBJECT)),
    ("java/lang/Exception", Some(THROWABLE)),
    ("java/lang/Error", Some(THROWABLE)),
    ("java/lang/RuntimeException", Some("java/lang/Exception")),
    ("java/lang/InterruptedException", Some("java/lang/Exception")),
    ("java/lang/ClassNotFoundException", Some("java/lang/Exception")),
    ("java/lang/IllegalStateException", Some("java/lang/RuntimeException")),
    ("java/lang/IllegalArgumentException", Some("java/lang/RuntimeException")),
    ("java/lang/IllegalMonitorStateException", Some("java/lang/RuntimeException")),
    ("java/lang/ArithmeticException", Some("java/lang/RuntimeException")),
    ("java/lang/NullPointerException", Some("java/lang/RuntimeException")),
    ("java/lang/ArrayStoreException", Some("java/lang/RuntimeException")),
    ("java/lang/NegativeArraySizeException", Some("java/lang/RuntimeException")),
    ("java/lang/IndexOutOfBoundsException", Some("java/lang/RuntimeException")),
    ("java/lang/ArrayIndexOutOfBoundsException", Some("java/lang/IndexOutOfBoundsException")),
    ("java/lang/LinkageError", Some("java/lang/Error")),
    ("java/lang/NoClassDefFoundError", Some("java/lang/LinkageError")),
    ("java/lang/NoSuchMethodError", Some("java/lang/LinkageError")),
    ("java/lang/NoSuchFieldError", Some("java/lang/LinkageError")),
    ("java/lang/OutOfMemoryError", Some("java/lang/Error")),
    ("java/io/Writer", Some(OBJECT)),
    ("java/io/StringWriter", Some("java/io/Writer")),
    ("java/io/PrintWriter", Some("java/io/Writer")),
    ("java/lang/ref/Reference", Some(OBJECT)),
    ("java/lang/ref/PhantomReference", Some("java/lang/ref/Reference")),
    ("java/lang/ref/ReferenceQueue", Some(OBJECT)),
    ("com/example/Counter", Some(OBJECT)),
    ("com/example/Thrower", Some(OBJECT)),
];

const PRIMITIVE_CLASSES: [(char, &str); 8] = [
    ('Z', "boolean"),
    ('C', "char"),
    ('B', "byte"),
    ('S', "short"),
    ('I', "int"),
    ('J', "long"),
    ('F', "float"),
    ('D', "double"),
];

/// How the mock behaves, set before the VM is created.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Returned by `JNI_CreateJavaVM` instead of creating a VM.
    pub create_status: Option<jint>,
    /// Internal names `FindClass` reports as missing.
    pub missing_classes: Vec<String>,
    /// Every `System.identityHashCode` returns the same value.
    pub colliding_hashes: bool,
    pub properties: Vec<(String, String)>,
}

/// Counters kept by the mock. Read with [`Mock::stats`].
#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub calls: usize,
    pub calls_with_pending: usize,
    pub invalid_handles: usize,
    pub invalid_deletes: usize,
    pub globals_created: usize,
    pub globals_deleted: usize,
    pub frames_pushed: usize,
    pub frames_popped: usize,
    pub unbalanced_pops: usize,
    pub max_frame_locals: usize,
    pub array_pins: usize,
    pub array_releases: usize,
    pub string_pins: usize,
    pub string_releases: usize,
    pub defines: usize,
    pub attaches: usize,
    pub detaches: usize,
    pub destroys: usize,
    /// `DestroyJavaVM` calls that gave up waiting for non-daemon threads.
    pub destroy_timeouts: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Slot {
    I(i64),
    F(f64),
    L(Option<ObjId>),
}

impl Slot {
    fn int(self) -> i64 {
        match self {
            Slot::I(v) => v,
            Slot::F(v) => v as i64,
            Slot::L(_) => 0,
        }
    }

    fn float(self) -> f64 {
        match self {
            Slot::I(v) => v as f64,
            Slot::F(v) => v,
            Slot::L(_) => 0.0,
        }
    }

    fn obj(self) -> Option<ObjId> {
        match self {
            Slot::L(v) => v,
            _ => None,
        }
    }

    fn zero(descriptor: &str) -> Slot {
        match descriptor.chars().next() {
            Some('F' | 'D') => Slot::F(0.0),
            Some('L' | '[') => Slot::L(None),
            _ => Slot::I(0),
        }
    }
}

struct ClassInfo {
    name: String,
    super_name: Option<String>,
    primitive: bool,
    defined: bool,
    statics: HashMap<String, Slot>,
    natives: HashMap<(String, String), usize>,
}

enum Body {
    Class(ClassInfo),
    Str(Vec<u16>),
    Prim(Vec<u8>),
    Objs(Vec<Option<ObjId>>),
    Plain(HashMap<String, Slot>),
    Throwable { message: Option<String>, cause: Option<ObjId> },
    StringWriter(String),
    PrintWriter(ObjId),
    Thread { id: i64, name: String, daemon: bool, interrupted: bool },
    Queue(VecDeque<ObjId>),
    Phantom { referent: Option<ObjId>, queue: Option<ObjId>, enqueued: bool },
    Loader,
    Boxed(Slot),
}

struct Obj {
    class: String,
    body: Body,
}

#[derive(Clone)]
struct Member {
    class: String,
    name: String,
    sig: String,
    is_static: bool,
    is_field: bool,
}

#[derive(Clone, Copy)]
enum Handle {
    Local { obj: ObjId, thread: ThreadId },
    Global(ObjId),
}

#[derive(Default)]
struct ThreadState {
    daemon: bool,
    frames: Vec<Vec<usize>>,
    pending: Option<ObjId>,
    thread_obj: Option<ObjId>,
}

struct ArrayPin {
    array: ObjId,
    buffer: Vec<u64>,
}

struct Heap {
    next_obj: ObjId,
    next_handle: usize,
    next_thread_id: i64,
    objects: HashMap<ObjId, Obj>,
    handles: HashMap<usize, Handle>,
    classes: HashMap<String, ObjId>,
    members: Vec<Member>,
    threads: HashMap<ThreadId, ThreadState>,
    string_pins: HashMap<usize, Box<[u16]>>,
    array_pins: HashMap<usize, ArrayPin>,
    monitors: HashMap<ObjId, (ThreadId, usize)>,
    loader: ObjId,
    destroyed: bool,
    stats: Stats,
}

/// Reports an exception left pending by a mock method.
struct Thrown;

enum Out {
    Void,
    Int(i64),
    Float(f64),
    Obj(Option<ObjId>),
}

#[repr(C)]
struct EnvCell {
    functions: *const JNINativeInterface_,
    mock: *const Mock,
}

#[repr(C)]
struct VmCell {
    functions: *const JNIInvokeInterface_,
    mock: *const Mock,
}

pub struct Mock {
    env_cell: EnvCell,
    vm_cell: VmCell,
    heap: Mutex<Heap>,
    signal: Condvar,
    config: MockConfig,
    options: Vec<String>,
    fail_next_push: AtomicBool,
}

unsafe impl Send for Mock {}
unsafe impl Sync for Mock {}

thread_local! {
    static NEXT_CONFIG: RefCell<Option<MockConfig>> = RefCell::new(None);
    static LAST_CREATED: Cell<Option<&'static Mock>> = Cell::new(None);
}

/// Configuration for the next `create_java_vm` on this thread.
pub fn set_next_config(config: MockConfig) {
    NEXT_CONFIG.with(|c| *c.borrow_mut() = Some(config));
}

/// The VM most recently created on this thread.
pub fn last_created() -> Option<&'static Mock> {
    LAST_CREATED.with(Cell::get)
}

/// A `JNI_CreateJavaVM` backed by the mock.
pub unsafe extern "system" fn create_java_vm(
    pvm: *mut *mut JavaVM,
    penv: *mut *mut c_void,
    args: *mut c_void,
) -> jint {
    let config = NEXT_CONFIG.with(|c| c.borrow_mut().take()).unwrap_or_default();
    if let Some(status) = config.create_status {
        return status;
    }
    let mut options = Vec::new();
    if !args.is_null() {
        let args = &*(args as *const JavaVMInitArgs);
        for i in 0..args.nOptions.max(0) as usize {
            let opt = &*args.options.add(i);
            options.push(CStr::from_ptr(opt.optionString).to_string_lossy().into_owned());
        }
    }
    let mock = Mock::new(config, options);
    *penv = mock.attach_current(false) as *mut c_void;
    *pvm = mock.vm();
    LAST_CREATED.with(|c| c.set(Some(mock)));
    JNI_OK
}

impl Mock {
    /// A running VM with no thread attached.
    pub fn new(config: MockConfig, options: Vec<String>) -> &'static Mock {
        let mut heap = Heap {
            next_obj: 0,
            next_handle: 0x1000,
            next_thread_id: 1,
            objects: HashMap::new(),
            handles: HashMap::new(),
            classes: HashMap::new(),
            members: Vec::new(),
            threads: HashMap::new(),
            string_pins: HashMap::new(),
            array_pins: HashMap::new(),
            monitors: HashMap::new(),
            loader: 0,
            destroyed: false,
            stats: Stats::default(),
        };
        heap.bootstrap();

        let mock: &'static mut Mock = Box::leak(Box::new(Mock {
            env_cell: EnvCell { functions: Box::leak(Box::new(env_table())), mock: ptr::null() },
            vm_cell: VmCell { functions: Box::leak(Box::new(vm_table())), mock: ptr::null() },
            heap: Mutex::new(heap),
            signal: Condvar::new(),
            config,
            options,
            fail_next_push: AtomicBool::new(false),
        }));
        let this: *const Mock = mock;
        mock.env_cell.mock = this;
        mock.vm_cell.mock = this;
        mock
    }

    pub fn vm(&'static self) -> *mut JavaVM {
        &self.vm_cell as *const VmCell as *mut JavaVM
    }

    fn env(&'static self) -> *mut JNIEnv {
        &self.env_cell as *const EnvCell as *mut JNIEnv
    }

    /// Attaches the calling thread directly, bypassing the bridge.
    pub fn attach_current(&'static self, daemon: bool) -> *mut JNIEnv {
        let tid = std::thread::current().id();
        let mut heap = self.heap.lock();
        heap.attach(tid, daemon);
        self.env()
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn stats(&self) -> Stats {
        self.heap.lock().stats.clone()
    }

    /// Global references currently alive.
    pub fn live_globals(&self) -> usize {
        self.heap.lock().handles.values().filter(|h| matches!(h, Handle::Global(_))).count()
    }

    /// Whether `raw` is a live reference usable on this thread.
    pub fn is_valid(&self, raw: jobject) -> bool {
        let tid = std::thread::current().id();
        let heap = self.heap.lock();
        match heap.handles.get(&(raw as usize)) {
            Some(Handle::Global(_)) => true,
            Some(Handle::Local { thread, .. }) => *thread == tid,
            None => false,
        }
    }

    /// Makes the next `PushLocalFrame` fail with `OutOfMemoryError`.
    pub fn fail_next_push(&self) {
        self.fail_next_push.store(true, Ordering::SeqCst);
    }

    pub fn is_destroyed(&self) -> bool {
        self.heap.lock().destroyed
    }

    pub fn is_attached(&self) -> bool {
        let tid = std::thread::current().id();
        self.heap.lock().threads.contains_key(&tid)
    }

    /// Class and message of the exception pending on this thread.
    pub fn pending(&self) -> Option<(String, Option<String>)> {
        let tid = std::thread::current().id();
        let heap = self.heap.lock();
        let id = heap.threads.get(&tid)?.pending?;
        let obj = heap.objects.get(&id)?;
        let message = match &obj.body {
            Body::Throwable { message, .. } => message.clone(),
            _ => None,
        };
        Some((obj.class.replace('/', "."), message))
    }

    /// Whether the pending exception is the object behind `raw`.
    pub fn pending_is(&self, raw: jobject) -> bool {
        let tid = std::thread::current().id();
        let heap = self.heap.lock();
        let pending = heap.threads.get(&tid).and_then(|t| t.pending);
        pending.is_some() && pending == heap.peek(tid, raw)
    }

    /// How many times the monitor of `raw` is held.
    pub fn monitor_depth(&self, raw: jobject) -> usize {
        let tid = std::thread::current().id();
        let heap = self.heap.lock();
        heap.peek(tid, raw)
            .and_then(|id| heap.monitors.get(&id))
            .map_or(0, |(_, depth)| *depth)
    }

    /// Whether the class `name` (internal form) has been defined.
    pub fn has_class(&self, name: &str) -> bool {
        self.heap.lock().classes.contains_key(name)
    }
}

impl Heap {
    fn bootstrap(&mut self) {
        for (name, super_name) in BOOT_CLASSES {
            self.define(name, super_name.map(str::to_string), false);
        }
        for (_, name) in PRIMITIVE_CLASSES {
            let id = self.define(name, None, false);
            if let Body::Class(info) = &mut self.objects.get_mut(&id).expect("class").body {
                info.primitive = true;
            }
        }
        self.loader = self.alloc("java/lang/ClassLoader", Body::Loader);

        let boxes: [(&str, &str, Option<(Slot, Slot)>); 8] = [
            ("java/lang/Boolean", "boolean", None),
            ("java/lang/Character", "char", None),
            ("java/lang/Byte", "byte", Some((Slot::I(i8::MIN.into()), Slot::I(i8::MAX.into())))),
            ("java/lang/Short", "short", Some((Slot::I(i16::MIN.into()), Slot::I(i16::MAX.into())))),
            ("java/lang/Integer", "int", Some((Slot::I(i32::MIN.into()), Slot::I(i32::MAX.into())))),
            ("java/lang/Long", "long", Some((Slot::I(i64::MIN), Slot::I(i64::MAX)))),
            ("java/lang/Float", "float", Some((Slot::F(f32::from_bits(1).into()), Slot::F(f32::MAX.into())))),
            ("java/lang/Double", "double", Some((Slot::F(f64::from_bits(1)), Slot::F(f64::MAX)))),
        ];
        for (class, primitive, limits) in boxes {
            let type_class = self.classes[primitive];
            let statics = &mut self.class_info_mut(class).statics;
            statics.insert("TYPE".into(), Slot::L(Some(type_class)));
            if let Some((min, max)) = limits {
                statics.insert("MIN_VALUE".into(), min);
                statics.insert("MAX_VALUE".into(), max);
            }
        }
    }

    fn define(&mut self, name: &str, super_name: Option<String>, defined: bool) -> ObjId {
        let info = ClassInfo {
            name: name.to_string(),
            super_name,
            primitive: false,
            defined,
            statics: HashMap::new(),
            natives: HashMap::new(),
        };
        let id = self.alloc("java/lang/Class", Body::Class(info));
        self.classes.insert(name.to_string(), id);
        id
    }

    fn alloc(&mut self, class: &str, body: Body) -> ObjId {
        self.next_obj += 1;
        let id = self.next_obj;
        self.objects.insert(id, Obj { class: class.to_string(), body });
        id
    }

    fn attach(&mut self, tid: ThreadId, daemon: bool) {
        self.stats.attaches += 1;
        self.threads.entry(tid).or_insert_with(|| ThreadState {
            daemon,
            frames: vec![Vec::new()],
            ..Default::default()
        });
    }

    fn detach(&mut self, tid: ThreadId) -> bool {
        let Some(state) = self.threads.remove(&tid) else {
            return false;
        };
        for frame in state.frames {
            for raw in frame {
                self.handles.remove(&raw);
            }
        }
        self.stats.detaches += 1;
        true
    }

    fn class_info(&self, name: &str) -> Option<&ClassInfo> {
        match &self.objects.get(self.classes.get(name)?)?.body {
            Body::Class(info) => Some(info),
            _ => None,
        }
    }

    fn class_info_mut(&mut self, name: &str) -> &mut ClassInfo {
        let id = self.classes[name];
        match &mut self.objects.get_mut(&id).expect("class object").body {
            Body::Class(info) => info,
            _ => unreachable!("class table points at a non-class"),
        }
    }

    /// The class object for `name`, creating array classes on demand.
    fn class_object(&mut self, name: &str) -> Option<ObjId> {
        if let Some(id) = self.classes.get(name) {
            return Some(*id);
        }
        let component = name.strip_prefix('[')?;
        let known = match component.chars().next()? {
            'L' => component
                .strip_prefix('L')
                .and_then(|c| c.strip_suffix(';'))
                .map_or(false, |inner| self.classes.contains_key(inner)),
            '[' => self.class_object(component).is_some(),
            c => component.len() == 1 && PRIMITIVE_CLASSES.iter().any(|(p, _)| *p == c),
        };
        if !known {
            return None;
        }
        Some(self.define(name, Some(OBJECT.to_string()), false))
    }

    fn class_name_of(&self, class_obj: ObjId) -> Option<String> {
        match &self.objects.get(&class_obj)?.body {
            Body::Class(info) => Some(info.name.clone()),
            _ => None,
        }
    }

    fn assignable(&self, sub: &str, sup: &str) -> bool {
        if sub == sup || sup == OBJECT {
            return true;
        }
        if let (Some(a), Some(b)) = (sub.strip_prefix('['), sup.strip_prefix('[')) {
            let reference = |c: &str| c.starts_with('L') || c.starts_with('[');
            if reference(a) && reference(b) {
                let inner = |c: &str| {
                    c.strip_prefix('L')
                        .and_then(|c| c.strip_suffix(';'))
                        .map(str::to_string)
                        .unwrap_or_else(|| c.to_string())
                };
                return self.assignable(&inner(a), &inner(b));
            }
            return false;
        }
        let mut current = self.class_info(sub).and_then(|i| i.super_name.clone());
        while let Some(name) = current {
            if name == sup {
                return true;
            }
            current = self.class_info(&name).and_then(|i| i.super_name.clone());
        }
        false
    }

    fn is_throwable(&self, class: &str) -> bool {
        self.assignable(class, THROWABLE)
    }

    fn new_handle(&mut self, handle: Handle) -> jobject {
        self.next_handle += 8;
        let raw = self.next_handle;
        self.handles.insert(raw, handle);
        raw as jobject
    }

    fn local(&mut self, tid: ThreadId, obj: Option<ObjId>) -> jobject {
        let Some(obj) = obj else {
            return ptr::null_mut();
        };
        let raw = self.new_handle(Handle::Local { obj, thread: tid });
        if let Some(state) = self.threads.get_mut(&tid) {
            let depth = state.frames.len();
            if let Some(frame) = state.frames.last_mut() {
                frame.push(raw as usize);
                if depth > 1 {
                    self.stats.max_frame_locals = self.stats.max_frame_locals.max(frame.len());
                }
            }
        }
        raw
    }

    fn peek(&self, tid: ThreadId, raw: jobject) -> Option<ObjId> {
        match self.handles.get(&(raw as usize))? {
            Handle::Global(obj) => Some(*obj),
            Handle::Local { obj, thread } if *thread == tid => Some(*obj),
            Handle::Local { .. } => None,
        }
    }

    /// The object behind `raw`; a dead or foreign reference counts as invalid.
    fn resolve(&mut self, tid: ThreadId, raw: jobject) -> Option<ObjId> {
        if raw.is_null() {
            return None;
        }
        let found = self.peek(tid, raw);
        if found.is_none() {
            self.stats.invalid_handles += 1;
        }
        found
    }

    fn pending(&self, tid: ThreadId) -> Option<ObjId> {
        self.threads.get(&tid).and_then(|t| t.pending)
    }

    fn set_pending(&mut self, tid: ThreadId, throwable: ObjId) {
        if let Some(state) = self.threads.get_mut(&tid) {
            state.pending = Some(throwable);
        }
    }

    fn new_throwable(&mut self, class: &str, message: Option<String>, cause: Option<ObjId>) -> ObjId {
        self.alloc(class, Body::Throwable { message, cause })
    }

    fn throw(&mut self, tid: ThreadId, class: &str, message: impl Into<String>) -> Thrown {
        let id = self.new_throwable(class, Some(message.into()), None);
        self.set_pending(tid, id);
        Thrown
    }

    fn new_str(&mut self, text: &str) -> ObjId {
        self.alloc("java/lang/String", Body::Str(text.encode_utf16().collect()))
    }

    fn str_of(&self, id: Option<ObjId>) -> Option<String> {
        match &self.objects.get(&id?)?.body {
            Body::Str(units) => Some(String::from_utf16_lossy(units)),
            _ => None,
        }
    }

    fn body(&self, id: ObjId) -> Option<&Body> {
        self.objects.get(&id).map(|o| &o.body)
    }

    fn body_mut(&mut self, id: ObjId) -> Option<&mut Body> {
        self.objects.get_mut(&id).map(|o| &mut o.body)
    }

    fn heading(&self, id: ObjId) -> String {
        let Some(obj) = self.objects.get(&id) else {
            return String::new();
        };
        let class = obj.class.replace('/', ".");
        match &obj.body {
            Body::Throwable { message: Some(m), .. } => format!("{class}: {m}"),
            _ => class,
        }
    }

    fn stack_trace(&self, id: ObjId) -> String {
        let mut out = String::new();
        let mut seen = HashSet::new();
        let mut current = Some(id);
        let mut first = true;
        while let Some(t) = current {
            if !seen.insert(t) {
                out.push_str(&format!("Caused by: [CIRCULAR REFERENCE: {}]\n", self.heading(t)));
                break;
            }
            if !first {
                out.push_str("Caused by: ");
            }
            first = false;
            out.push_str(&self.heading(t));
            out.push_str("\n\tat com.example.Mock.call(Mock.java:1)\n");
            current = match self.body(t) {
                Some(Body::Throwable { cause, .. }) => *cause,
                _ => None,
            };
        }
        out
    }

    fn thread_object(&mut self, tid: ThreadId) -> Option<ObjId> {
        let state = self.threads.get(&tid)?;
        if let Some(id) = state.thread_obj {
            return Some(id);
        }
        let daemon = state.daemon;
        let id = self.next_thread_id;
        self.next_thread_id += 1;
        let name = std::thread::current()
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Thread-{id}"));
        let obj = self.alloc("java/lang/Thread", Body::Thread { id, name, daemon, interrupted: false });
        if let Some(state) = self.threads.get_mut(&tid) {
            state.thread_obj = Some(obj);
        }
        Some(obj)
    }

    fn member(&self, id: *mut c_void) -> Option<Member> {
        let index = (id as usize).checked_sub(1)?;
        self.members.get(index).cloned()
    }

    fn lookup_member(&mut self, class: &str, name: &str, sig: &str, is_static: bool, is_field: bool) -> *mut c_void {
        let found = self.members.iter().position(|m| {
            m.class == class && m.name == name && m.sig == sig && m.is_static == is_static && m.is_field == is_field
        });
        let index = match found {
            Some(index) => index,
            None => {
                self.members.push(Member {
                    class: class.to_string(),
                    name: name.to_string(),
                    sig: sig.to_string(),
                    is_static,
                    is_field,
                });
                self.members.len() - 1
            }
        };
        (index + 1) as *mut c_void
    }

    fn element_size(&self, array: ObjId) -> Option<usize> {
        let class = &self.objects.get(&array)?.class;
        Some(match class.as_str() {
            "[Z" | "[B" => 1,
            "[C" | "[S" => 2,
            "[I" | "[F" => 4,
            "[J" | "[D" => 8,
            _ => return None,
        })
    }

    fn array_length(&self, array: ObjId) -> Option<usize> {
        match self.body(array)? {
            Body::Prim(bytes) => Some(bytes.len() / self.element_size(array)?),
            Body::Objs(items) => Some(items.len()),
            _ => None,
        }
    }

    /// Enqueues phantom references whose referent is no longer reachable.
    fn collect(&mut self) -> usize {
        let mut stack: Vec<ObjId> = self
            .handles
            .values()
            .map(|h| match h {
                Handle::Global(obj) | Handle::Local { obj, .. } => *obj,
            })
            .collect();
        stack.extend(self.classes.values().copied());
        stack.push(self.loader);
        for state in self.threads.values() {
            stack.extend(state.pending);
            stack.extend(state.thread_obj);
        }

        let mut reachable = HashSet::new();
        while let Some(id) = stack.pop() {
            if !reachable.insert(id) {
                continue;
            }
            let Some(body) = self.body(id) else {
                continue;
            };
            match body {
                Body::Class(info) => stack.extend(info.statics.values().filter_map(|s| s.obj())),
                Body::Objs(items) => stack.extend(items.iter().flatten()),
                Body::Plain(fields) => stack.extend(fields.values().filter_map(|s| s.obj())),
                Body::Throwable { cause, .. } => stack.extend(*cause),
                Body::PrintWriter(target) => stack.push(*target),
                Body::Queue(items) => stack.extend(items.iter()),
                Body::Phantom { queue, .. } => stack.extend(*queue),
                Body::Boxed(slot) => stack.extend(slot.obj()),
                _ => {}
            }
        }

        let ready: Vec<(ObjId, ObjId)> = self
            .objects
            .iter()
            .filter_map(|(id, obj)| match obj.body {
                Body::Phantom { referent: Some(r), queue: Some(q), enqueued: false }
                    if reachable.contains(id) && !reachable.contains(&r) =>
                {
                    Some((*id, q))
                }
                _ => None,
            })
            .collect();
        for (reference, queue) in &ready {
            if let Some(Body::Phantom { enqueued, .. }) = self.body_mut(*reference) {
                *enqueued = true;
            }
            if let Some(Body::Queue(items)) = self.body_mut(*queue) {
                items.push_back(*reference);
            }
        }
        ready.len()
    }
}

// ---------------------------------------------------------------------------
// Call plumbing
// ---------------------------------------------------------------------------

unsafe fn enter(env: *mut JNIEnv, allowed_with_pending: bool) -> (&'static Mock, MutexGuard<'static, Heap>, ThreadId) {
    let mock: &'static Mock = &*(*(env as *const EnvCell)).mock;
    let mut heap = mock.heap.lock();
    let tid = std::thread::current().id();
    heap.stats.calls += 1;
    if !allowed_with_pending && heap.pending(tid).is_some() {
        heap.stats.calls_with_pending += 1;
    }
    (mock, heap, tid)
}

unsafe fn vm_mock(vm: *mut JavaVM) -> &'static Mock {
    &*(*(vm as *const VmCell)).mock
}

unsafe fn c_str(s: *const c_char) -> String {
    if s.is_null() {
        return String::new();
    }
    CStr::from_ptr(s).to_string_lossy().into_owned()
}

/// First character of each parameter descriptor.
fn param_types(sig: &str) -> Vec<char> {
    let mut out = Vec::new();
    let params = sig.strip_prefix('(').and_then(|s| s.split(')').next()).unwrap_or("");
    let mut chars = params.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            'L' => {
                for c in chars.by_ref() {
                    if c == ';' {
                        break;
                    }
                }
                out.push('L');
            }
            '[' => {
                while chars.peek() == Some(&'[') {
                    chars.next();
                }
                if chars.next() == Some('L') {
                    for c in chars.by_ref() {
                        if c == ';' {
                            break;
                        }
                    }
                }
                out.push('[');
            }
            c => out.push(c),
        }
    }
    out
}

unsafe fn read_args(heap: &mut Heap, tid: ThreadId, sig: &str, args: *const jvalue) -> Vec<Slot> {
    param_types(sig)
        .into_iter()
        .enumerate()
        .map(|(i, ty)| {
            let v = *args.add(i);
            match ty {
                'Z' => Slot::I(v.z.into()),
                'B' => Slot::I(v.b.into()),
                'C' => Slot::I(v.c.into()),
                'S' => Slot::I(v.s.into()),
                'I' => Slot::I(v.i.into()),
                'J' => Slot::I(v.j),
                'F' => Slot::F(v.f.into()),
                'D' => Slot::F(v.d),
                _ => Slot::L(heap.resolve(tid, v.l)),
            }
        })
        .collect()
}

enum Ret {
    Void,
    Int(i64),
    Float(f64),
    Obj(jobject),
}

impl Ret {
    fn int(&self) -> i64 {
        match self {
            Ret::Int(v) => *v,
            Ret::Float(v) => *v as i64,
            _ => 0,
        }
    }

    fn float(&self) -> f64 {
        match self {
            Ret::Float(v) => *v,
            Ret::Int(v) => *v as f64,
            _ => 0.0,
        }
    }

    fn obj(&self) -> jobject {
        match self {
            Ret::Obj(v) => *v,
            _ => ptr::null_mut(),
        }
    }
}

unsafe fn invoke(env: *mut JNIEnv, target: jobject, mid: jmethodID, args: *const jvalue, is_static: bool) -> Ret {
    let (mock, mut heap, tid) = enter(env, false);
    let Some(member) = heap.member(mid) else {
        heap.stats.invalid_handles += 1;
        return Ret::Void;
    };
    let Some(target_id) = heap.resolve(tid, target) else {
        heap.throw(tid, "java/lang/NullPointerException", format!("{} on null", member.name));
        return Ret::Void;
    };
    let argv = read_args(&mut heap, tid, &member.sig, args);

    let class = if is_static {
        heap.class_name_of(target_id).unwrap_or_default()
    } else {
        heap.objects[&target_id].class.clone()
    };
    if is_static {
        let native = heap
            .class_info(&class)
            .and_then(|info| info.natives.get(&(member.name.clone(), member.sig.clone())).copied());
        if let Some(fn_ptr) = native {
            drop(heap);
            return call_native(env, target, &member, fn_ptr, &argv);
        }
    }

    let this = if is_static { None } else { Some(target_id) };
    match behave(mock, &mut heap, tid, &class, &member, this, &argv) {
        Ok(Out::Void) | Err(Thrown) => Ret::Void,
        Ok(Out::Int(v)) => Ret::Int(v),
        Ok(Out::Float(v)) => Ret::Float(v),
        Ok(Out::Obj(id)) => Ret::Obj(heap.local(tid, id)),
    }
}

unsafe fn call_native(env: *mut JNIEnv, class: jobject, member: &Member, fn_ptr: usize, argv: &[Slot]) -> Ret {
    match member.sig.as_str() {
        "(II)I" => {
            let f: unsafe extern "system" fn(*mut JNIEnv, jclass, jint, jint) -> jint = std::mem::transmute(fn_ptr);
            Ret::Int(f(env, class, argv[0].int() as jint, argv[1].int() as jint).into())
        }
        "()V" => {
            let f: unsafe extern "system" fn(*mut JNIEnv, jclass) = std::mem::transmute(fn_ptr);
            f(env, class);
            Ret::Void
        }
        other => panic!("mock JVM cannot call natives with signature {other}"),
    }
}

fn no_such_method(heap: &mut Heap, tid: ThreadId, class: &str, member: &Member) -> Thrown {
    let message = format!("{}.{}{}", class.replace('/', "."), member.name, member.sig);
    heap.throw(tid, "java/lang/NoSuchMethodError", message)
}

fn behave(
    mock: &Mock,
    heap: &mut MutexGuard<'_, Heap>,
    tid: ThreadId,
    class: &str,
    member: &Member,
    this: Option<ObjId>,
    args: &[Slot],
) -> Result<Out, Thrown> {
    let this_id = this.unwrap_or(0);
    let arg = |i: usize| args.get(i).copied().unwrap_or(Slot::L(None));

    match (member.name.as_str(), member.sig.as_str()) {
        ("getClass", "()Ljava/lang/Class;") => {
            let name = heap.objects[&this_id].class.clone();
            Ok(Out::Obj(heap.class_object(&name)))
        }
        ("hashCode", "()I") => Ok(Out::Int((this_id & 0x7fff_ffff) as i64)),
        ("equals", "(Ljava/lang/Object;)Z") => Ok(Out::Int((arg(0).obj() == this) as i64)),
        ("toString", "()Ljava/lang/String;") => {
            let text = match heap.body(this_id) {
                Some(Body::Str(_)) => return Ok(Out::Obj(this)),
                Some(Body::StringWriter(text)) => text.clone(),
                Some(Body::Throwable { .. }) => heap.heading(this_id),
                _ => format!("{}@{this_id:x}", class.replace('/', ".")),
            };
            Ok(Out::Obj(Some(heap.new_str(&text))))
        }
        ("getName", "()Ljava/lang/String;") => {
            let name = match heap.body(this_id) {
                Some(Body::Class(info)) => info.name.replace('/', "."),
                Some(Body::Thread { name, .. }) => name.clone(),
                _ => return Err(no_such_method(heap, tid, class, member)),
            };
            Ok(Out::Obj(Some(heap.new_str(&name))))
        }
        ("isArray", "()Z") => {
            let name = heap.class_name_of(this_id).unwrap_or_default();
            Ok(Out::Int(name.starts_with('[') as i64))
        }
        ("isPrimitive", "()Z") => {
            let primitive = matches!(heap.body(this_id), Some(Body::Class(info)) if info.primitive);
            Ok(Out::Int(primitive as i64))
        }
        ("getComponentType", "()Ljava/lang/Class;") => {
            let name = heap.class_name_of(this_id).unwrap_or_default();
            let Some(component) = name.strip_prefix('[') else {
                return Ok(Out::Obj(None));
            };
            let component = match component.strip_prefix('L').and_then(|c| c.strip_suffix(';')) {
                Some(inner) => inner.to_string(),
                None => PRIMITIVE_CLASSES
                    .iter()
                    .find(|(c, _)| component.len() == 1 && component.starts_with(*c))
                    .map_or_else(|| component.to_string(), |(_, p)| p.to_string()),
            };
            Ok(Out::Obj(heap.class_object(&component)))
        }
        ("getClassLoader", "()Ljava/lang/ClassLoader;") => {
            let defined = matches!(heap.body(this_id), Some(Body::Class(info)) if info.defined);
            Ok(Out::Obj(defined.then_some(heap.loader)))
        }
        ("length", "()I") => match heap.body(this_id) {
            Some(Body::Str(units)) => Ok(Out::Int(units.len() as i64)),
            _ => Err(no_such_method(heap, tid, class, member)),
        },
        ("isEmpty", "()Z") => match heap.body(this_id) {
            Some(Body::Str(units)) => Ok(Out::Int(units.is_empty() as i64)),
            _ => Err(no_such_method(heap, tid, class, member)),
        },
        ("getMessage" | "getLocalizedMessage", "()Ljava/lang/String;") => {
            let message = match heap.body(this_id) {
                Some(Body::Throwable { message, .. }) => message.clone(),
                _ => None,
            };
            Ok(Out::Obj(message.map(|m| heap.new_str(&m))))
        }
        ("getCause", "()Ljava/lang/Throwable;") => match heap.body(this_id) {
            Some(Body::Throwable { cause, .. }) => Ok(Out::Obj(*cause)),
            _ => Ok(Out::Obj(None)),
        },
        ("printStackTrace", "(Ljava/io/PrintWriter;)V") => {
            let Some(writer) = arg(0).obj() else {
                return Err(heap.throw(tid, "java/lang/NullPointerException", "printStackTrace(null)"));
            };
            let trace = heap.stack_trace(this_id);
            let target = match heap.body(writer) {
                Some(Body::PrintWriter(target)) => *target,
                _ => return Err(heap.throw(tid, "java/lang/IllegalArgumentException", "not a PrintWriter")),
            };
            if let Some(Body::StringWriter(text)) = heap.body_mut(target) {
                text.push_str(&trace);
            }
            Ok(Out::Void)
        }
        ("flush", "()V") => Ok(Out::Void),
        ("identityHashCode", "(Ljava/lang/Object;)I") => Ok(Out::Int(match arg(0).obj() {
            None => 0,
            Some(_) if mock.config.colliding_hashes => 7,
            Some(id) => (id & 0x7fff_ffff) as i64,
        })),
        ("gc", "()V") => {
            if heap.collect() > 0 {
                mock.signal.notify_all();
            }
            Ok(Out::Void)
        }
        ("getProperty", "(Ljava/lang/String;)Ljava/lang/String;") => {
            let Some(key) = heap.str_of(arg(0).obj()) else {
                return Err(heap.throw(tid, "java/lang/NullPointerException", "key can't be null"));
            };
            let value = mock
                .config
                .properties
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone())
                .or_else(|| (key == "java.version").then(|| "17.0.8-mock".to_string()));
            Ok(Out::Obj(value.map(|v| heap.new_str(&v))))
        }
        ("currentThread", "()Ljava/lang/Thread;") => Ok(Out::Obj(heap.thread_object(tid))),
        ("getId", "()J") => match heap.body(this_id) {
            Some(Body::Thread { id, .. }) => Ok(Out::Int(*id)),
            _ => Err(no_such_method(heap, tid, class, member)),
        },
        ("isDaemon", "()Z") => match heap.body(this_id) {
            Some(Body::Thread { daemon, .. }) => Ok(Out::Int(*daemon as i64)),
            _ => Err(no_such_method(heap, tid, class, member)),
        },
        ("isAlive", "()Z") => Ok(Out::Int(1)),
        ("isInterrupted", "()Z") => match heap.body(this_id) {
            Some(Body::Thread { interrupted, .. }) => Ok(Out::Int(*interrupted as i64)),
            _ => Err(no_such_method(heap, tid, class, member)),
        },
        ("interrupt", "()V") => {
            if let Some(Body::Thread { interrupted, .. }) = heap.body_mut(this_id) {
                *interrupted = true;
            }
            Ok(Out::Void)
        }
        ("getSystemClassLoader", "()Ljava/lang/ClassLoader;") => Ok(Out::Obj(Some(heap.loader))),
        ("loadClass", "(Ljava/lang/String;)Ljava/lang/Class;") => {
            let name = heap.str_of(arg(0).obj()).unwrap_or_default();
            match heap.class_object(&name.replace('.', "/")) {
                Some(id) => Ok(Out::Obj(Some(id))),
                None => Err(heap.throw(tid, "java/lang/ClassNotFoundException", name)),
            }
        }
        ("get", "()Ljava/lang/Object;") => Ok(Out::Obj(None)),
        ("clear", "()V") => {
            if let Some(Body::Phantom { referent, .. }) = heap.body_mut(this_id) {
                *referent = None;
            }
            Ok(Out::Void)
        }
        ("remove", "(J)Ljava/lang/ref/Reference;") => {
            let deadline = Instant::now() + Duration::from_millis(arg(0).int().max(0) as u64);
            loop {
                if let Some(Body::Queue(items)) = heap.body_mut(this_id) {
                    if let Some(reference) = items.pop_front() {
                        return Ok(Out::Obj(Some(reference)));
                    }
                }
                let now = Instant::now();
                if now >= deadline {
                    return Ok(Out::Obj(None));
                }
                mock.signal.wait_for(heap, deadline - now);
            }
        }
        ("valueOf", _) => {
            let boxed = heap.alloc(class, Body::Boxed(arg(0)));
            Ok(Out::Obj(Some(boxed)))
        }
        ("booleanValue" | "charValue" | "byteValue" | "shortValue" | "intValue" | "longValue", _) => {
            match heap.body(this_id) {
                Some(Body::Boxed(slot)) => Ok(Out::Int(slot.int())),
                _ => Err(no_such_method(heap, tid, class, member)),
            }
        }
        ("floatValue" | "doubleValue", _) => match heap.body(this_id) {
            Some(Body::Boxed(slot)) => Ok(Out::Float(slot.float())),
            _ => Err(no_such_method(heap, tid, class, member)),
        },

        // com.example.Counter
        ("add", "(I)I") => {
            let Some(Body::Plain(fields)) = heap.body_mut(this_id) else {
                return Err(no_such_method(heap, tid, class, member));
            };
            let count = fields.get("count").copied().unwrap_or(Slot::I(0)).int() + arg(0).int();
            fields.insert("count".into(), Slot::I(count));
            Ok(Out::Int(count))
        }
        ("echo", "(Ljava/lang/Object;)Ljava/lang/Object;") => Ok(Out::Obj(arg(0).obj())),
        ("concat", "(Ljava/lang/String;Ljava/lang/String;)Ljava/lang/String;") => {
            let a = heap.str_of(arg(0).obj()).unwrap_or_else(|| "null".into());
            let b = heap.str_of(arg(1).obj()).unwrap_or_else(|| "null".into());
            Ok(Out::Obj(Some(heap.new_str(&(a + &b)))))
        }
        ("sum", "([I)J") => {
            let Some(array) = arg(0).obj() else {
                return Err(heap.throw(tid, "java/lang/NullPointerException", "sum(null)"));
            };
            let total = match heap.body(array) {
                Some(Body::Prim(bytes)) => bytes
                    .chunks_exact(4)
                    .map(|c| i64::from(i32::from_ne_bytes([c[0], c[1], c[2], c[3]])))
                    .sum(),
                _ => 0,
            };
            Ok(Out::Int(total))
        }
        ("upper", "(C)C") => {
            let c = arg(0).int() as u16;
            let upper = if (b'a' as u16..=b'z' as u16).contains(&c) { c - 32 } else { c };
            Ok(Out::Int(upper.into()))
        }
        ("half", "(D)D") => Ok(Out::Float(arg(0).float() / 2.0)),

        // com.example.Thrower
        ("fail", "(Ljava/lang/String;)V") => {
            let message = heap.str_of(arg(0).obj());
            let cause = heap.new_throwable("java/lang/IllegalArgumentException", Some("root cause".into()), None);
            let top = heap.new_throwable("java/lang/IllegalStateException", message, Some(cause));
            heap.set_pending(tid, top);
            Err(Thrown)
        }
        ("failBare", "()V") => {
            let top = heap.new_throwable("java/lang/IllegalStateException", None, None);
            heap.set_pending(tid, top);
            Err(Thrown)
        }
        ("selfCause", "()V") => {
            let top = heap.new_throwable("java/lang/RuntimeException", Some("loop".into()), None);
            if let Some(Body::Throwable { cause, .. }) = heap.body_mut(top) {
                *cause = Some(top);
            }
            heap.set_pending(tid, top);
            Err(Thrown)
        }
        ("deep", "(I)V") => {
            let levels = arg(0).int().max(1);
            let mut cause = None;
            for level in (0..levels).rev() {
                let t = heap.new_throwable("java/lang/RuntimeException", Some(format!("level {level}")), cause);
                cause = Some(t);
            }
            if let Some(top) = cause {
                heap.set_pending(tid, top);
            }
            Err(Thrown)
        }
        _ => Err(no_such_method(heap, tid, class, member)),
    }
}

fn construct(heap: &mut Heap, tid: ThreadId, class: &str, sig: &str, args: &[Slot]) -> Result<ObjId, Thrown> {
    let arg = |i: usize| args.get(i).copied().unwrap_or(Slot::L(None));
    let body = match class {
        "java/io/StringWriter" => Body::StringWriter(String::new()),
        "java/io/PrintWriter" => match arg(0).obj() {
            Some(target) => Body::PrintWriter(target),
            None => return Err(heap.throw(tid, "java/lang/NullPointerException", "writer")),
        },
        "java/lang/ref/ReferenceQueue" => Body::Queue(VecDeque::new()),
        "java/lang/ref/PhantomReference" => Body::Phantom {
            referent: arg(0).obj(),
            queue: arg(1).obj(),
            enqueued: false,
        },
        "java/lang/String" => Body::Str(Vec::new()),
        c if heap.is_throwable(c) => {
            let message = match sig {
                "(Ljava/lang/String;)V" | "(Ljava/lang/String;Ljava/lang/Throwable;)V" => heap.str_of(arg(0).obj()),
                _ => None,
            };
            let cause = match sig {
                "(Ljava/lang/String;Ljava/lang/Throwable;)V" => arg(1).obj(),
                _ => None,
            };
            Body::Throwable { message, cause }
        }
        _ => {
            let mut fields = HashMap::new();
            if sig == "(I)V" {
                fields.insert("count".to_string(), Slot::I(arg(0).int()));
            }
            Body::Plain(fields)
        }
    };
    Ok(heap.alloc(class, body))
}

// ---------------------------------------------------------------------------
// JNI functions
// ---------------------------------------------------------------------------

unsafe extern "system" fn unsupported() {
    eprintln!("mock JVM: unsupported JNI function called");
    std::process::abort();
}

unsafe extern "system" fn get_version(env: *mut JNIEnv) -> jint {
    let _ = enter(env, false);
    JNI_VERSION_1_8
}

unsafe extern "system" fn get_java_vm(env: *mut JNIEnv, vm: *mut *mut JavaVM) -> jint {
    let (mock, _heap, _) = enter(env, false);
    *vm = mock.vm();
    JNI_OK
}

unsafe extern "system" fn define_class(
    env: *mut JNIEnv,
    name: *const c_char,
    _loader: jobject,
    _buf: *const jbyte,
    _len: jsize,
) -> jclass {
    let (_, mut heap, tid) = enter(env, false);
    let name = c_str(name);
    if heap.classes.contains_key(&name) {
        heap.throw(tid, "java/lang/LinkageError", format!("duplicate class definition: {name}"));
        return ptr::null_mut();
    }
    heap.stats.defines += 1;
    let id = heap.define(&name, Some(OBJECT.to_string()), true);
    heap.local(tid, Some(id))
}

unsafe extern "system" fn find_class(env: *mut JNIEnv, name: *const c_char) -> jclass {
    let (mock, mut heap, tid) = enter(env, false);
    let name = c_str(name);
    if mock.config.missing_classes.contains(&name) {
        heap.throw(tid, "java/lang/NoClassDefFoundError", name);
        return ptr::null_mut();
    }
    match heap.class_object(&name) {
        Some(id) => heap.local(tid, Some(id)),
        None => {
            heap.throw(tid, "java/lang/NoClassDefFoundError", name);
            ptr::null_mut()
        }
    }
}

unsafe extern "system" fn get_object_class(env: *mut JNIEnv, obj: jobject) -> jclass {
    let (_, mut heap, tid) = enter(env, false);
    let Some(id) = heap.resolve(tid, obj) else {
        return ptr::null_mut();
    };
    let class = heap.objects[&id].class.clone();
    let class_id = heap.class_object(&class);
    heap.local(tid, class_id)
}

unsafe extern "system" fn is_instance_of(env: *mut JNIEnv, obj: jobject, clazz: jclass) -> jboolean {
    let (_, mut heap, tid) = enter(env, false);
    let Some(id) = heap.resolve(tid, obj) else {
        return JNI_TRUE;
    };
    let Some(class) = heap.resolve(tid, clazz).and_then(|c| heap.class_name_of(c)) else {
        return JNI_FALSE;
    };
    let obj_class = heap.objects[&id].class.clone();
    heap.assignable(&obj_class, &class) as jboolean
}

unsafe extern "system" fn throw(env: *mut JNIEnv, obj: jthrowable) -> jint {
    let (_, mut heap, tid) = enter(env, false);
    let Some(id) = heap.resolve(tid, obj) else {
        return JNI_ERR;
    };
    let class = heap.objects[&id].class.clone();
    if !heap.is_throwable(&class) {
        return JNI_ERR;
    }
    heap.set_pending(tid, id);
    JNI_OK
}

unsafe extern "system" fn throw_new(env: *mut JNIEnv, clazz: jclass, msg: *const c_char) -> jint {
    let (_, mut heap, tid) = enter(env, false);
    let Some(class) = heap.resolve(tid, clazz).and_then(|c| heap.class_name_of(c)) else {
        return JNI_ERR;
    };
    if !heap.is_throwable(&class) {
        return JNI_ERR;
    }
    let message = (!msg.is_null()).then(|| c_str(msg));
    let id = heap.new_throwable(&class, message, None);
    heap.set_pending(tid, id);
    JNI_OK
}

unsafe extern "system" fn exception_occurred(env: *mut JNIEnv) -> jthrowable {
    let (_, mut heap, tid) = enter(env, true);
    let pending = heap.pending(tid);
    heap.local(tid, pending)
}

unsafe extern "system" fn exception_describe(env: *mut JNIEnv) {
    let (_, mut heap, tid) = enter(env, true);
    if let Some(id) = heap.pending(tid) {
        eprint!("Exception in thread: {}", heap.stack_trace(id));
        if let Some(state) = heap.threads.get_mut(&tid) {
            state.pending = None;
        }
    }
}

unsafe extern "system" fn exception_clear(env: *mut JNIEnv) {
    let (_, mut heap, tid) = enter(env, true);
    if let Some(state) = heap.threads.get_mut(&tid) {
        state.pending = None;
    }
}

unsafe extern "system" fn exception_check(env: *mut JNIEnv) -> jboolean {
    let (_, heap, tid) = enter(env, true);
    heap.pending(tid).is_some() as jboolean
}

unsafe extern "system" fn push_local_frame(env: *mut JNIEnv, capacity: jint) -> jint {
    let (mock, mut heap, tid) = enter(env, true);
    if capacity < 0 {
        return JNI_ERR;
    }
    if mock.fail_next_push.swap(false, Ordering::SeqCst) {
        heap.throw(tid, "java/lang/OutOfMemoryError", "could not allocate local frame");
        return JNI_ENOMEM;
    }
    let Some(state) = heap.threads.get_mut(&tid) else {
        return JNI_EDETACHED;
    };
    state.frames.push(Vec::new());
    heap.stats.frames_pushed += 1;
    JNI_OK
}

unsafe extern "system" fn pop_local_frame(env: *mut JNIEnv, result: jobject) -> jobject {
    let (_, mut heap, tid) = enter(env, true);
    let kept = heap.resolve(tid, result);
    let frame = match heap.threads.get_mut(&tid) {
        Some(state) if state.frames.len() > 1 => state.frames.pop(),
        _ => None,
    };
    let Some(frame) = frame else {
        heap.stats.unbalanced_pops += 1;
        return ptr::null_mut();
    };
    for raw in frame {
        heap.handles.remove(&raw);
    }
    heap.stats.frames_popped += 1;
    heap.local(tid, kept)
}

unsafe extern "system" fn new_global_ref(env: *mut JNIEnv, obj: jobject) -> jobject {
    let (_, mut heap, tid) = enter(env, false);
    let Some(id) = heap.resolve(tid, obj) else {
        return ptr::null_mut();
    };
    heap.stats.globals_created += 1;
    heap.new_handle(Handle::Global(id))
}

unsafe extern "system" fn delete_global_ref(env: *mut JNIEnv, gref: jobject) {
    let (_, mut heap, _) = enter(env, true);
    if gref.is_null() {
        return;
    }
    match heap.handles.get(&(gref as usize)) {
        Some(Handle::Global(_)) => {
            heap.handles.remove(&(gref as usize));
            heap.stats.globals_deleted += 1;
        }
        _ => heap.stats.invalid_deletes += 1,
    }
}

unsafe extern "system" fn delete_local_ref(env: *mut JNIEnv, obj: jobject) {
    let (_, mut heap, tid) = enter(env, true);
    if obj.is_null() {
        return;
    }
    let raw = obj as usize;
    match heap.handles.get(&raw) {
        Some(Handle::Local { thread, .. }) if *thread == tid => {
            heap.handles.remove(&raw);
            if let Some(state) = heap.threads.get_mut(&tid) {
                for frame in &mut state.frames {
                    frame.retain(|h| *h != raw);
                }
            }
        }
        _ => heap.stats.invalid_deletes += 1,
    }
}

unsafe extern "system" fn is_same_object(env: *mut JNIEnv, obj1: jobject, obj2: jobject) -> jboolean {
    let (_, mut heap, tid) = enter(env, false);
    let a = heap.resolve(tid, obj1);
    let b = heap.resolve(tid, obj2);
    (a == b) as jboolean
}

unsafe extern "system" fn new_local_ref(env: *mut JNIEnv, obj: jobject) -> jobject {
    let (_, mut heap, tid) = enter(env, false);
    let id = heap.resolve(tid, obj);
    heap.local(tid, id)
}

unsafe extern "system" fn new_object_a(env: *mut JNIEnv, clazz: jclass, method_id: jmethodID, args: *const jvalue) -> jobject {
    let (_, mut heap, tid) = enter(env, false);
    let Some(class) = heap.resolve(tid, clazz).and_then(|c| heap.class_name_of(c)) else {
        return ptr::null_mut();
    };
    let Some(member) = heap.member(method_id) else {
        heap.stats.invalid_handles += 1;
        return ptr::null_mut();
    };
    let argv = read_args(&mut heap, tid, &member.sig, args);
    match construct(&mut heap, tid, &class, &member.sig, &argv) {
        Ok(id) => heap.local(tid, Some(id)),
        Err(Thrown) => ptr::null_mut(),
    }
}

unsafe fn lookup(env: *mut JNIEnv, clazz: jclass, name: *const c_char, sig: *const c_char, is_static: bool, is_field: bool) -> *mut c_void {
    let (_, mut heap, tid) = enter(env, false);
    let Some(class) = heap.resolve(tid, clazz).and_then(|c| heap.class_name_of(c)) else {
        return ptr::null_mut();
    };
    let name = c_str(name);
    let sig = c_str(sig);
    if name.starts_with("missing") {
        let error = if is_field { "java/lang/NoSuchFieldError" } else { "java/lang/NoSuchMethodError" };
        heap.throw(tid, error, name);
        return ptr::null_mut();
    }
    heap.lookup_member(&class, &name, &sig, is_static, is_field)
}

unsafe extern "system" fn get_method_id(env: *mut JNIEnv, clazz: jclass, name: *const c_char, sig: *const c_char) -> jmethodID {
    lookup(env, clazz, name, sig, false, false)
}

unsafe extern "system" fn get_static_method_id(env: *mut JNIEnv, clazz: jclass, name: *const c_char, sig: *const c_char) -> jmethodID {
    lookup(env, clazz, name, sig, true, false)
}

unsafe extern "system" fn get_field_id(env: *mut JNIEnv, clazz: jclass, name: *const c_char, sig: *const c_char) -> jfieldID {
    lookup(env, clazz, name, sig, false, true)
}

unsafe extern "system" fn get_static_field_id(env: *mut JNIEnv, clazz: jclass, name: *const c_char, sig: *const c_char) -> jfieldID {
    lookup(env, clazz, name, sig, true, true)
}

macro_rules! call_fns {
    ($($instance:ident, $static_:ident, $t:ty, |$r:ident| $convert:expr;)*) => {
        $(
            unsafe extern "system" fn $instance(env: *mut JNIEnv, obj: jobject, method_id: jmethodID, args: *const jvalue) -> $t {
                let $r = invoke(env, obj, method_id, args, false);
                $convert
            }

            unsafe extern "system" fn $static_(env: *mut JNIEnv, clazz: jclass, method_id: jmethodID, args: *const jvalue) -> $t {
                let $r = invoke(env, clazz, method_id, args, true);
                $convert
            }
        )*
    };
}

call_fns! {
    call_object_method_a, call_static_object_method_a, jobject, |r| r.obj();
    call_boolean_method_a, call_static_boolean_method_a, jboolean, |r| (r.int() != 0) as jboolean;
    call_byte_method_a, call_static_byte_method_a, jbyte, |r| r.int() as jbyte;
    call_char_method_a, call_static_char_method_a, jchar, |r| r.int() as jchar;
    call_short_method_a, call_static_short_method_a, jshort, |r| r.int() as jshort;
    call_int_method_a, call_static_int_method_a, jint, |r| r.int() as jint;
    call_long_method_a, call_static_long_method_a, jlong, |r| r.int();
    call_float_method_a, call_static_float_method_a, jfloat, |r| r.float() as jfloat;
    call_double_method_a, call_static_double_method_a, jdouble, |r| r.float();
}

unsafe extern "system" fn call_void_method_a(env: *mut JNIEnv, obj: jobject, method_id: jmethodID, args: *const jvalue) {
    invoke(env, obj, method_id, args, false);
}

unsafe extern "system" fn call_static_void_method_a(env: *mut JNIEnv, clazz: jclass, method_id: jmethodID, args: *const jvalue) {
    invoke(env, clazz, method_id, args, true);
}

/// Reads a field slot. Instance fields live on plain objects, static
/// fields on the class.
unsafe fn read_field(env: *mut JNIEnv, target: jobject, field_id: jfieldID, is_static: bool) -> Ret {
    let (_, mut heap, tid) = enter(env, false);
    let Some(member) = heap.member(field_id) else {
        heap.stats.invalid_handles += 1;
        return Ret::Void;
    };
    let Some(id) = heap.resolve(tid, target) else {
        heap.throw(tid, "java/lang/NullPointerException", member.name);
        return Ret::Void;
    };
    let slot = if is_static {
        heap.class_name_of(id)
            .and_then(|c| heap.class_info(&c).and_then(|i| i.statics.get(&member.name).copied()))
    } else {
        match heap.body(id) {
            Some(Body::Plain(fields)) => fields.get(&member.name).copied(),
            _ => None,
        }
    };
    match slot.unwrap_or_else(|| Slot::zero(&member.sig)) {
        Slot::I(v) => Ret::Int(v),
        Slot::F(v) => Ret::Float(v),
        Slot::L(obj) => Ret::Obj(heap.local(tid, obj)),
    }
}

unsafe fn write_field(env: *mut JNIEnv, target: jobject, field_id: jfieldID, is_static: bool, value: impl FnOnce(&mut Heap, ThreadId) -> Slot) {
    let (_, mut heap, tid) = enter(env, false);
    let Some(member) = heap.member(field_id) else {
        heap.stats.invalid_handles += 1;
        return;
    };
    let Some(id) = heap.resolve(tid, target) else {
        heap.throw(tid, "java/lang/NullPointerException", member.name);
        return;
    };
    let slot = value(&mut *heap, tid);
    if is_static {
        if let Some(class) = heap.class_name_of(id) {
            heap.class_info_mut(&class).statics.insert(member.name, slot);
        }
    } else if let Some(Body::Plain(fields)) = heap.body_mut(id) {
        fields.insert(member.name, slot);
    }
}

macro_rules! field_fns {
    ($($get:ident, $set:ident, $get_static:ident, $set_static:ident, $t:ty, |$r:ident| $read:expr, |$v:ident| $write:expr;)*) => {
        $(
            unsafe extern "system" fn $get(env: *mut JNIEnv, obj: jobject, field_id: jfieldID) -> $t {
                let $r = read_field(env, obj, field_id, false);
                $read
            }

            unsafe extern "system" fn $get_static(env: *mut JNIEnv, clazz: jclass, field_id: jfieldID) -> $t {
                let $r = read_field(env, clazz, field_id, true);
                $read
            }

            unsafe extern "system" fn $set(env: *mut JNIEnv, obj: jobject, field_id: jfieldID, $v: $t) {
                write_field(env, obj, field_id, false, |_heap, _tid| $write);
            }

            unsafe extern "system" fn $set_static(env: *mut JNIEnv, clazz: jclass, field_id: jfieldID, $v: $t) {
                write_field(env, clazz, field_id, true, |_heap, _tid| $write);
            }
        )*
    };
}

field_fns! {
    get_boolean_field, set_boolean_field, get_static_boolean_field, set_static_boolean_field, jboolean,
        |r| (r.int() != 0) as jboolean, |v| Slot::I(v.into());
    get_byte_field, set_byte_field, get_static_byte_field, set_static_byte_field, jbyte,
        |r| r.int() as jbyte, |v| Slot::I(v.into());
    get_char_field, set_char_field, get_static_char_field, set_static_char_field, jchar,
        |r| r.int() as jchar, |v| Slot::I(v.into());
    get_short_field, set_short_field, get_static_short_field, set_static_short_field, jshort,
        |r| r.int() as jshort, |v| Slot::I(v.into());
    get_int_field, set_int_field, get_static_int_field, set_static_int_field, jint,
        |r| r.int() as jint, |v| Slot::I(v.into());
    get_long_field, set_long_field, get_static_long_field, set_static_long_field, jlong,
        |r| r.int(), |v| Slot::I(v);
    get_float_field, set_float_field, get_static_float_field, set_static_float_field, jfloat,
        |r| r.float() as jfloat, |v| Slot::F(v.into());
    get_double_field, set_double_field, get_static_double_field, set_static_double_field, jdouble,
        |r| r.float(), |v| Slot::F(v);
}

unsafe extern "system" fn get_object_field(env: *mut JNIEnv, obj: jobject, field_id: jfieldID) -> jobject {
    read_field(env, obj, field_id, false).obj()
}

unsafe extern "system" fn get_static_object_field(env: *mut JNIEnv, clazz: jclass, field_id: jfieldID) -> jobject {
    read_field(env, clazz, field_id, true).obj()
}

unsafe extern "system" fn set_object_field(env: *mut JNIEnv, obj: jobject, field_id: jfieldID, val: jobject) {
    write_field(env, obj, field_id, false, |heap, tid| Slot::L(heap.resolve(tid, val)));
}

unsafe extern "system" fn set_static_object_field(env: *mut JNIEnv, clazz: jclass, field_id: jfieldID, val: jobject) {
    write_field(env, clazz, field_id, true, |heap, tid| Slot::L(heap.resolve(tid, val)));
}

unsafe extern "system" fn new_string(env: *mut JNIEnv, unicode: *const jchar, len: jsize) -> jstring {
    let (_, mut heap, tid) = enter(env, false);
    let units = if len > 0 {
        std::slice::from_raw_parts(unicode, len as usize).to_vec()
    } else {
        Vec::new()
    };
    let id = heap.alloc("java/lang/String", Body::Str(units));
    heap.local(tid, Some(id))
}

unsafe extern "system" fn get_string_length(env: *mut JNIEnv, s: jstring) -> jsize {
    let (_, mut heap, tid) = enter(env, false);
    match heap.resolve(tid, s).and_then(|id| heap.body(id)) {
        Some(Body::Str(units)) => units.len() as jsize,
        _ => 0,
    }
}

unsafe extern "system" fn get_string_chars(env: *mut JNIEnv, s: jstring, is_copy: *mut jboolean) -> *const jchar {
    let (_, mut heap, tid) = enter(env, false);
    let units = match heap.resolve(tid, s).and_then(|id| heap.body(id)) {
        Some(Body::Str(units)) => units.clone(),
        _ => return ptr::null(),
    };
    let mut buffer = units.into_boxed_slice();
    if buffer.is_empty() {
        buffer = vec![0u16].into_boxed_slice();
    }
    let chars = buffer.as_ptr();
    heap.string_pins.insert(chars as usize, buffer);
    heap.stats.string_pins += 1;
    if !is_copy.is_null() {
        *is_copy = JNI_TRUE;
    }
    chars
}

unsafe extern "system" fn release_string_chars(env: *mut JNIEnv, _s: jstring, chars: *const jchar) {
    let (_, mut heap, _) = enter(env, true);
    if heap.string_pins.remove(&(chars as usize)).is_some() {
        heap.stats.string_releases += 1;
    } else {
        heap.stats.invalid_deletes += 1;
    }
}

unsafe extern "system" fn get_array_length(env: *mut JNIEnv, array: jarray) -> jsize {
    let (_, mut heap, tid) = enter(env, false);
    heap.resolve(tid, array)
        .and_then(|id| heap.array_length(id))
        .map_or(0, |n| n as jsize)
}

unsafe extern "system" fn new_object_array(env: *mut JNIEnv, len: jsize, clazz: jclass, init: jobject) -> jobjectArray {
    let (_, mut heap, tid) = enter(env, false);
    if len < 0 {
        heap.throw(tid, "java/lang/NegativeArraySizeException", len.to_string());
        return ptr::null_mut();
    }
    let Some(elem) = heap.resolve(tid, clazz).and_then(|c| heap.class_name_of(c)) else {
        return ptr::null_mut();
    };
    let array_class = if elem.starts_with('[') { format!("[{elem}") } else { format!("[L{elem};") };
    heap.class_object(&array_class);
    let fill = heap.resolve(tid, init);
    let id = heap.alloc(&array_class, Body::Objs(vec![fill; len as usize]));
    heap.local(tid, Some(id))
}

unsafe extern "system" fn get_object_array_element(env: *mut JNIEnv, array: jobjectArray, index: jsize) -> jobject {
    let (_, mut heap, tid) = enter(env, false);
    let Some(id) = heap.resolve(tid, array) else {
        return ptr::null_mut();
    };
    let (len, item) = match heap.body(id) {
        Some(Body::Objs(items)) => (items.len(), usize::try_from(index).ok().and_then(|i| items.get(i).copied())),
        _ => return ptr::null_mut(),
    };
    match item {
        Some(item) => heap.local(tid, item),
        None => {
            heap.throw(tid, "java/lang/ArrayIndexOutOfBoundsException", format!("Index {index} out of bounds for length {len}"));
            ptr::null_mut()
        }
    }
}

unsafe extern "system" fn set_object_array_element(env: *mut JNIEnv, array: jobjectArray, index: jsize, val: jobject) {
    let (_, mut heap, tid) = enter(env, false);
    let Some(id) = heap.resolve(tid, array) else {
        return;
    };
    let value = heap.resolve(tid, val);
    let elem = heap.objects[&id]
        .class
        .strip_prefix("[L")
        .and_then(|c| c.strip_suffix(';'))
        .map(str::to_string);
    if let (Some(elem), Some(value)) = (&elem, value) {
        let value_class = heap.objects[&value].class.clone();
        if !heap.assignable(&value_class, elem) {
            heap.throw(tid, "java/lang/ArrayStoreException", value_class.replace('/', "."));
            return;
        }
    }
    let len = match heap.body_mut(id) {
        Some(Body::Objs(items)) => {
            if let Some(slot) = usize::try_from(index).ok().and_then(|i| items.get_mut(i)) {
                *slot = value;
                return;
            }
            items.len()
        }
        _ => return,
    };
    heap.throw(tid, "java/lang/ArrayIndexOutOfBoundsException", format!("Index {index} out of bounds for length {len}"));
}

/// Validates a primitive array reference against the element class the
/// JNI function is for.
fn primitive_array(heap: &mut Heap, tid: ThreadId, array: jarray, class: &str) -> Option<ObjId> {
    let id = heap.resolve(tid, array)?;
    if heap.objects[&id].class != class {
        heap.stats.invalid_handles += 1;
        return None;
    }
    Some(id)
}

fn region_bounds(heap: &mut Heap, tid: ThreadId, id: ObjId, start: jsize, len: jsize) -> Option<(usize, usize)> {
    let length = heap.array_length(id)?;
    let end = i64::from(start) + i64::from(len);
    if start < 0 || len < 0 || end > length as i64 {
        heap.throw(
            tid,
            "java/lang/ArrayIndexOutOfBoundsException",
            format!("Array region {start}..{end} out of bounds for length {length}"),
        );
        return None;
    }
    Some((start as usize, len as usize))
}

macro_rules! primitive_array_fns {
    ($($class:literal, $t:ty, $new:ident, $get_elements:ident, $release_elements:ident, $get_region:ident, $set_region:ident;)*) => {
        $(
            unsafe extern "system" fn $new(env: *mut JNIEnv, len: jsize) -> jarray {
                let (_, mut heap, tid) = enter(env, false);
                if len < 0 {
                    heap.throw(tid, "java/lang/NegativeArraySizeException", len.to_string());
                    return ptr::null_mut();
                }
                let id = heap.alloc($class, Body::Prim(vec![0u8; len as usize * std::mem::size_of::<$t>()]));
                heap.local(tid, Some(id))
            }

            unsafe extern "system" fn $get_elements(env: *mut JNIEnv, array: jarray, is_copy: *mut jboolean) -> *mut $t {
                let (_, mut heap, tid) = enter(env, false);
                let Some(id) = primitive_array(&mut heap, tid, array, $class) else {
                    return ptr::null_mut();
                };
                let bytes = match heap.body(id) {
                    Some(Body::Prim(bytes)) => bytes.clone(),
                    _ => return ptr::null_mut(),
                };
                let mut buffer = vec![0u64; bytes.len() / 8 + 1];
                ptr::copy_nonoverlapping(bytes.as_ptr(), buffer.as_mut_ptr() as *mut u8, bytes.len());
                let elems = buffer.as_mut_ptr() as *mut $t;
                heap.array_pins.insert(elems as usize, ArrayPin { array: id, buffer });
                heap.stats.array_pins += 1;
                if !is_copy.is_null() {
                    *is_copy = JNI_TRUE;
                }
                elems
            }

            unsafe extern "system" fn $release_elements(env: *mut JNIEnv, _array: jarray, elems: *mut $t, mode: jint) {
                let (_, mut heap, _) = enter(env, true);
                let key = elems as usize;
                let Some(pin) = heap.array_pins.get(&key) else {
                    heap.stats.invalid_deletes += 1;
                    return;
                };
                let array = pin.array;
                if mode == 0 || mode == JNI_COMMIT {
                    let source = pin.buffer.as_ptr() as *const u8;
                    let copied = match heap.objects.get(&array).map(|o| &o.body) {
                        Some(Body::Prim(bytes)) => std::slice::from_raw_parts(source, bytes.len()).to_vec(),
                        _ => Vec::new(),
                    };
                    if let Some(Body::Prim(bytes)) = heap.body_mut(array) {
                        bytes.copy_from_slice(&copied);
                    }
                }
                if mode == 0 || mode == JNI_ABORT {
                    heap.array_pins.remove(&key);
                    heap.stats.array_releases += 1;
                }
            }

            unsafe extern "system" fn $get_region(env: *mut JNIEnv, array: jarray, start: jsize, len: jsize, buf: *mut $t) {
                let (_, mut heap, tid) = enter(env, false);
                let Some(id) = primitive_array(&mut heap, tid, array, $class) else {
                    return;
                };
                let Some((start, len)) = region_bounds(&mut heap, tid, id, start, len) else {
                    return;
                };
                let size = std::mem::size_of::<$t>();
                if let Some(Body::Prim(bytes)) = heap.body(id) {
                    ptr::copy_nonoverlapping(bytes[start * size..].as_ptr(), buf as *mut u8, len * size);
                }
            }

            unsafe extern "system" fn $set_region(env: *mut JNIEnv, array: jarray, start: jsize, len: jsize, buf: *const $t) {
                let (_, mut heap, tid) = enter(env, false);
                let Some(id) = primitive_array(&mut heap, tid, array, $class) else {
                    return;
                };
                let Some((start, len)) = region_bounds(&mut heap, tid, id, start, len) else {
                    return;
                };
                let size = std::mem::size_of::<$t>();
                if let Some(Body::Prim(bytes)) = heap.body_mut(id) {
                    ptr::copy_nonoverlapping(buf as *const u8, bytes[start * size..].as_mut_ptr(), len * size);
                }
            }
        )*
    };
}

primitive_array_fns! {
    "[Z", jboolean, new_boolean_array, get_boolean_array_elements, release_boolean_array_elements, get_boolean_array_region, set_boolean_array_region;
    "[B", jbyte, new_byte_array, get_byte_array_elements, release_byte_array_elements, get_byte_array_region, set_byte_array_region;
    "[C", jchar, new_char_array, get_char_array_elements, release_char_array_elements, get_char_array_region, set_char_array_region;
    "[S", jshort, new_short_array, get_short_array_elements, release_short_array_elements, get_short_array_region, set_short_array_region;
    "[I", jint, new_int_array, get_int_array_elements, release_int_array_elements, get_int_array_region, set_int_array_region;
    "[J", jlong, new_long_array, get_long_array_elements, release_long_array_elements, get_long_array_region, set_long_array_region;
    "[F", jfloat, new_float_array, get_float_array_elements, release_float_array_elements, get_float_array_region, set_float_array_region;
    "[D", jdouble, new_double_array, get_double_array_elements, release_double_array_elements, get_double_array_region, set_double_array_region;
}

unsafe extern "system" fn register_natives(env: *mut JNIEnv, clazz: jclass, methods: *const JNINativeMethod, n_methods: jint) -> jint {
    let (_, mut heap, tid) = enter(env, false);
    let Some(class) = heap.resolve(tid, clazz).and_then(|c| heap.class_name_of(c)) else {
        return JNI_ERR;
    };
    let mut bound = Vec::new();
    for i in 0..n_methods.max(0) as usize {
        let method = &*methods.add(i);
        let name = c_str(method.name);
        if name.starts_with("missing") {
            heap.throw(tid, "java/lang/NoSuchMethodError", name);
            return JNI_ERR;
        }
        bound.push(((name, c_str(method.signature)), method.fnPtr as usize));
    }
    heap.class_info_mut(&class).natives.extend(bound);
    JNI_OK
}

unsafe extern "system" fn unregister_natives(env: *mut JNIEnv, clazz: jclass) -> jint {
    let (_, mut heap, tid) = enter(env, false);
    let Some(class) = heap.resolve(tid, clazz).and_then(|c| heap.class_name_of(c)) else {
        return JNI_ERR;
    };
    heap.class_info_mut(&class).natives.clear();
    JNI_OK
}

unsafe extern "system" fn monitor_enter(env: *mut JNIEnv, obj: jobject) -> jint {
    let (_, mut heap, tid) = enter(env, false);
    let Some(id) = heap.resolve(tid, obj) else {
        return JNI_ERR;
    };
    let entry = heap.monitors.entry(id).or_insert((tid, 0));
    if entry.0 != tid && entry.1 > 0 {
        return JNI_ERR;
    }
    *entry = (tid, entry.1 + 1);
    JNI_OK
}

unsafe extern "system" fn monitor_exit(env: *mut JNIEnv, obj: jobject) -> jint {
    let (_, mut heap, tid) = enter(env, true);
    let Some(id) = heap.resolve(tid, obj) else {
        return JNI_ERR;
    };
    match heap.monitors.get_mut(&id) {
        Some((owner, depth)) if *owner == tid && *depth > 0 => {
            *depth -= 1;
            JNI_OK
        }
        _ => {
            heap.throw(tid, "java/lang/IllegalMonitorStateException", "current thread is not owner");
            JNI_ERR
        }
    }
}

const SLOTS: usize = std::mem::size_of::<JNINativeInterface_>() / std::mem::size_of::<*mut c_void>();

fn env_table() -> JNINativeInterface_ {
    let stub = unsupported as unsafe extern "system" fn() as *mut c_void;
    let mut t: JNINativeInterface_ = unsafe { std::mem::transmute::<[*mut c_void; SLOTS], JNINativeInterface_>([stub; SLOTS]) };
    t.reserved0 = ptr::null_mut();
    t.reserved1 = ptr::null_mut();
    t.reserved2 = ptr::null_mut();
    t.reserved3 = ptr::null_mut();

    t.GetVersion = get_version;
    t.GetJavaVM = get_java_vm;
    t.DefineClass = define_class;
    t.FindClass = find_class;
    t.GetObjectClass = get_object_class;
    t.IsInstanceOf = is_instance_of;
    t.Throw = throw;
    t.ThrowNew = throw_new;
    t.ExceptionOccurred = exception_occurred;
    t.ExceptionDescribe = exception_describe;
    t.ExceptionClear = exception_clear;
    t.ExceptionCheck = exception_check;
    t.PushLocalFrame = push_local_frame;
    t.PopLocalFrame = pop_local_frame;
    t.NewGlobalRef = new_global_ref;
    t.DeleteGlobalRef = delete_global_ref;
    t.DeleteLocalRef = delete_local_ref;
    t.IsSameObject = is_same_object;
    t.NewLocalRef = new_local_ref;
    t.NewObjectA = new_object_a;
    t.GetMethodID = get_method_id;
    t.GetStaticMethodID = get_static_method_id;
    t.GetFieldID = get_field_id;
    t.GetStaticFieldID = get_static_field_id;

    t.CallObjectMethodA = call_object_method_a;
    t.CallBooleanMethodA = call_boolean_method_a;
    t.CallByteMethodA = call_byte_method_a;
    t.CallCharMethodA = call_char_method_a;
    t.CallShortMethodA = call_short_method_a;
    t.CallIntMethodA = call_int_method_a;
    t.CallLongMethodA = call_long_method_a;
    t.CallFloatMethodA = call_float_method_a;
    t.CallDoubleMethodA = call_double_method_a;
    t.CallVoidMethodA = call_void_method_a;
    t.CallStaticObjectMethodA = call_static_object_method_a;
    t.CallStaticBooleanMethodA = call_static_boolean_method_a;
    t.CallStaticByteMethodA = call_static_byte_method_a;
    t.CallStaticCharMethodA = call_static_char_method_a;
    t.CallStaticShortMethodA = call_static_short_method_a;
    t.CallStaticIntMethodA = call_static_int_method_a;
    t.CallStaticLongMethodA = call_static_long_method_a;
    t.CallStaticFloatMethodA = call_static_float_method_a;
    t.CallStaticDoubleMethodA = call_static_double_method_a;
    t.CallStaticVoidMethodA = call_static_void_method_a;

    t.GetObjectField = get_object_field;
    t.GetBooleanField = get_boolean_field;
    t.GetByteField = get_byte_field;
    t.GetCharField = get_char_field;
    t.GetShortField = get_short_field;
    t.GetIntField = get_int_field;
    t.GetLongField = get_long_field;
    t.GetFloatField = get_float_field;
    t.GetDoubleField = get_double_field;
    t.SetObjectField = set_object_field;
    t.SetBooleanField = set_boolean_field;
    t.SetByteField = set_byte_field;
    t.SetCharField = set_char_field;
    t.SetShortField = set_short_field;
    t.SetIntField = set_int_field;
    t.SetLongField = set_long_field;
    t.SetFloatField = set_float_field;
    t.SetDoubleField = set_double_field;
    t.GetStaticObjectField = get_static_object_field;
    t.GetStaticBooleanField = get_static_boolean_field;
    t.GetStaticByteField = get_static_byte_field;
    t.GetStaticCharField = get_static_char_field;
    t.GetStaticShortField = get_static_short_field;
    t.GetStaticIntField = get_static_int_field;
    t.GetStaticLongField = get_static_long_field;
    t.GetStaticFloatField = get_static_float_field;
    t.GetStaticDoubleField = get_static_double_field;
    t.SetStaticObjectField = set_static_object_field;
    t.SetStaticBooleanField = set_static_boolean_field;
    t.SetStaticByteField = set_static_byte_field;
    t.SetStaticCharField = set_static_char_field;
    t.SetStaticShortField = set_static_short_field;
    t.SetStaticIntField = set_static_int_field;
    t.SetStaticLongField = set_static_long_field;
    t.SetStaticFloatField = set_static_float_field;
    t.SetStaticDoubleField = set_static_double_field;

    t.NewString = new_string;
    t.GetStringLength = get_string_length;
    t.GetStringChars = get_string_chars;
    t.ReleaseStringChars = release_string_chars;

    t.GetArrayLength = get_array_length;
    t.NewObjectArray = new_object_array;
    t.GetObjectArrayElement = get_object_array_element;
    t.SetObjectArrayElement = set_object_array_element;
    t.NewBooleanArray = new_boolean_array;
    t.NewByteArray = new_byte_array;
    t.NewCharArray = new_char_array;
    t.NewShortArray = new_short_array;
    t.NewIntArray = new_int_array;
    t.NewLongArray = new_long_array;
    t.NewFloatArray = new_float_array;
    t.NewDoubleArray = new_double_array;
    t.GetBooleanArrayElements = get_boolean_array_elements;
    t.GetByteArrayElements = get_byte_array_elements;
    t.GetCharArrayElements = get_char_array_elements;
    t.GetShortArrayElements = get_short_array_elements;
    t.GetIntArrayElements = get_int_array_elements;
    t.GetLongArrayElements = get_long_array_elements;
    t.GetFloatArrayElements = get_float_array_elements;
    t.GetDoubleArrayElements = get_double_array_elements;
    t.ReleaseBooleanArrayElements = release_boolean_array_elements;
    t.ReleaseByteArrayElements = release_byte_array_elements;
    t.ReleaseCharArrayElements = release_char_array_elements;
    t.ReleaseShortArrayElements = release_short_array_elements;
    t.ReleaseIntArrayElements = release_int_array_elements;
    t.ReleaseLongArrayElements = release_long_array_elements;
    t.ReleaseFloatArrayElements = release_float_array_elements;
    t.ReleaseDoubleArrayElements = release_double_array_elements;
    t.GetBooleanArrayRegion = get_boolean_array_region;
    t.GetByteArrayRegion = get_byte_array_region;
    t.GetCharArrayRegion = get_char_array_region;
    t.GetShortArrayRegion = get_short_array_region;
    t.GetIntArrayRegion = get_int_array_region;
    t.GetLongArrayRegion = get_long_array_region;
    t.GetFloatArrayRegion = get_float_array_region;
    t.GetDoubleArrayRegion = get_double_array_region;
    t.SetBooleanArrayRegion = set_boolean_array_region;
    t.SetByteArrayRegion = set_byte_array_region;
    t.SetCharArrayRegion = set_char_array_region;
    t.SetShortArrayRegion = set_short_array_region;
    t.SetIntArrayRegion = set_int_array_region;
    t.SetLongArrayRegion = set_long_array_region;
    t.SetFloatArrayRegion = set_float_array_region;
    t.SetDoubleArrayRegion = set_double_array_region;

    t.RegisterNatives = register_natives;
    t.UnregisterNatives = unregister_natives;
    t.MonitorEnter = monitor_enter;
    t.MonitorExit = monitor_exit;
    t
}

// ---------------------------------------------------------------------------
// Invocation interface
// ---------------------------------------------------------------------------

const DESTROY_WAIT: Duration = Duration::from_secs(5);

unsafe extern "system" fn destroy_java_vm(vm: *mut JavaVM) -> jint {
    let mock = vm_mock(vm);
    let mut heap = mock.heap.lock();
    if heap.destroyed {
        return JNI_ERR;
    }
    // Like a JVM, wait for every other non-daemon thread to detach first.
    let tid = std::thread::current().id();
    let deadline = Instant::now() + DESTROY_WAIT;
    while heap.threads.iter().any(|(id, state)| *id != tid && !state.daemon) {
        let now = Instant::now();
        if now >= deadline {
            heap.stats.destroy_timeouts += 1;
            break;
        }
        mock.signal.wait_for(&mut heap, deadline - now);
    }
    heap.destroyed = true;
    heap.stats.destroys += 1;
    let threads: Vec<ThreadId> = heap.threads.keys().copied().collect();
    for tid in threads {
        heap.detach(tid);
    }
    JNI_OK
}

unsafe fn attach(vm: *mut JavaVM, penv: *mut *mut c_void, daemon: bool) -> jint {
    let mock = vm_mock(vm);
    let mut heap = mock.heap.lock();
    if heap.destroyed {
        return JNI_ERR;
    }
    let tid = std::thread::current().id();
    if !heap.threads.contains_key(&tid) {
        heap.attach(tid, daemon);
    }
    *penv = mock.env() as *mut c_void;
    JNI_OK
}

unsafe extern "system" fn attach_current_thread(vm: *mut JavaVM, penv: *mut *mut c_void, _args: *mut c_void) -> jint {
    attach(vm, penv, false)
}

unsafe extern "system" fn attach_current_thread_as_daemon(vm: *mut JavaVM, penv: *mut *mut c_void, _args: *mut c_void) -> jint {
    attach(vm, penv, true)
}

unsafe extern "system" fn detach_current_thread(vm: *mut JavaVM) -> jint {
    let mock = vm_mock(vm);
    let mut heap = mock.heap.lock();
    let tid = std::thread::current().id();
    if heap.detach(tid) {
        mock.signal.notify_all();
        JNI_OK
    } else {
        JNI_EDETACHED
    }
}

unsafe extern "system" fn get_env(vm: *mut JavaVM, penv: *mut *mut c_void, version: jint) -> jint {
    let mock = vm_mock(vm);
    let heap = mock.heap.lock();
    if version > jni::JNI_VERSION_21 {
        return JNI_EVERSION;
    }
    let tid = std::thread::current().id();
    if heap.destroyed || !heap.threads.contains_key(&tid) {
        *penv = ptr::null_mut();
        return JNI_EDETACHED;
    }
    *penv = mock.env() as *mut c_void;
    JNI_OK
}

fn vm_table() -> JNIInvokeInterface_ {
    JNIInvokeInterface_ {
        reserved0: ptr::null_mut(),
        reserved1: ptr::null_mut(),
        reserved2: ptr::null_mut(),
        DestroyJavaVM: destroy_java_vm,
        AttachCurrentThread: attach_current_thread,
        DetachCurrentThread: detach_current_thread,
        GetEnv: get_env,
        AttachCurrentThreadAsDaemon: attach_current_thread_as_daemon,
    }
}
