//! Session-wide cache of system classes and member IDs.
//!
//! [`ClassRegistry::initialize`] resolves a fixed catalog of classes, pins
//! each one with a global reference and looks up every listed member. It
//! either completes or releases everything it pinned and fails; there is no
//! partially initialized registry. After that, lookups are plain map reads.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};
use crate::handle::{HandleRef, RefKind};
use crate::jni_wrapper::JniEnv;
use crate::session::Env;
use crate::signature;
use crate::sys::jni;
use crate::value::JavaType;

/// Bumped whenever [`SYSTEM_CLASSES`] changes shape.
pub const CATALOG_VERSION: u32 = 1;

/// Symbolic names of catalog classes used inside the crate.
pub mod names {
    pub const OBJECT: &str = "java.lang.Object";
    pub const CLASS: &str = "java.lang.Class";
    pub const STRING: &str = "java.lang.String";
    pub const THROWABLE: &str = "java.lang.Throwable";
    pub const RUNTIME_EXCEPTION: &str = "java.lang.RuntimeException";
    pub const STRING_WRITER: &str = "java.io.StringWriter";
    pub const PRINT_WRITER: &str = "java.io.PrintWriter";
    pub const SYSTEM: &str = "java.lang.System";
    pub const THREAD: &str = "java.lang.Thread";
    pub const CLASS_LOADER: &str = "java.lang.ClassLoader";
    pub const REFERENCE: &str = "java.lang.ref.Reference";
    pub const PHANTOM_REFERENCE: &str = "java.lang.ref.PhantomReference";
    pub const REFERENCE_QUEUE: &str = "java.lang.ref.ReferenceQueue";
    pub const STRING_ARRAY: &str = "[Ljava.lang.String;";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Method,
    StaticMethod,
    Field,
    StaticField,
}

/// One member to resolve: `key` is what callers look it up by.
#[derive(Debug, Clone, Copy)]
pub struct MemberSpec {
    pub key: &'static str,
    pub kind: MemberKind,
    pub name: &'static str,
    pub signature: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct ClassSpec {
    /// Dotted binary name, or a descriptor for array classes.
    pub name: &'static str,
    pub members: &'static [MemberSpec],
}

const fn method(name: &'static str, signature: &'static str) -> MemberSpec {
    MemberSpec { key: name, kind: MemberKind::Method, name, signature }
}

const fn static_method(name: &'static str, signature: &'static str) -> MemberSpec {
    MemberSpec { key: name, kind: MemberKind::StaticMethod, name, signature }
}

const fn static_field(name: &'static str, signature: &'static str) -> MemberSpec {
    MemberSpec { key: name, kind: MemberKind::StaticField, name, signature }
}

const fn ctor(key: &'static str, signature: &'static str) -> MemberSpec {
    MemberSpec { key, kind: MemberKind::Method, name: "<init>", signature }
}

const fn class(name: &'static str, members: &'static [MemberSpec]) -> ClassSpec {
    ClassSpec { name, members }
}

/// The classes every session pins at startup.
pub static SYSTEM_CLASSES: &[ClassSpec] = &[
    class(names::OBJECT, &[
        method("getClass", "()Ljava/lang/Class;"),
        method("hashCode", "()I"),
        method("toString", "()Ljava/lang/String;"),
        method("equals", "(Ljava/lang/Object;)Z"),
    ]),
    class(names::CLASS, &[
        method("getName", "()Ljava/lang/String;"),
        method("isArray", "()Z"),
        method("isPrimitive", "()Z"),
        method("getComponentType", "()Ljava/lang/Class;"),
        method("getClassLoader", "()Ljava/lang/ClassLoader;"),
    ]),
    class(names::STRING, &[
        method("length", "()I"),
        method("isEmpty", "()Z"),
    ]),
    class(names::THROWABLE, &[
        method("getMessage", "()Ljava/lang/String;"),
        method("getLocalizedMessage", "()Ljava/lang/String;"),
        method("getCause", "()Ljava/lang/Throwable;"),
        method("printStackTrace", "(Ljava/io/PrintWriter;)V"),
        method("toString", "()Ljava/lang/String;"),
    ]),
    class(names::RUNTIME_EXCEPTION, &[
        ctor("new", "(Ljava/lang/String;)V"),
    ]),
    class(names::STRING_WRITER, &[
        ctor("new", "()V"),
        method("toString", "()Ljava/lang/String;"),
    ]),
    class(names::PRINT_WRITER, &[
        ctor("new", "(Ljava/io/Writer;)V"),
        method("flush", "()V"),
    ]),
    class(names::SYSTEM, &[
        static_method("identityHashCode", "(Ljava/lang/Object;)I"),
        static_method("gc", "()V"),
        static_method("getProperty", "(Ljava/lang/String;)Ljava/lang/String;"),
    ]),
    class(names::THREAD, &[
        static_method("currentThread", "()Ljava/lang/Thread;"),
        method("getId", "()J"),
        method("getName", "()Ljava/lang/String;"),
        method("isDaemon", "()Z"),
        method("isAlive", "()Z"),
        method("isInterrupted", "()Z"),
        method("interrupt", "()V"),
    ]),
    class(names::CLASS_LOADER, &[
        static_method("getSystemClassLoader", "()Ljava/lang/ClassLoader;"),
        method("loadClass", "(Ljava/lang/String;)Ljava/lang/Class;"),
    ]),
    class(names::REFERENCE, &[
        method("get", "()Ljava/lang/Object;"),
        method("clear", "()V"),
    ]),
    class(names::PHANTOM_REFERENCE, &[
        ctor("new", "(Ljava/lang/Object;Ljava/lang/ref/ReferenceQueue;)V"),
    ]),
    class(names::REFERENCE_QUEUE, &[
        ctor("new", "()V"),
        method("remove", "(J)Ljava/lang/ref/Reference;"),
    ]),
    class("java.lang.Boolean", &[
        static_field("TYPE", "Ljava/lang/Class;"),
        static_method("valueOf", "(Z)Ljava/lang/Boolean;"),
        method("booleanValue", "()Z"),
    ]),
    class("java.lang.Character", &[
        static_field("TYPE", "Ljava/lang/Class;"),
        static_method("valueOf", "(C)Ljava/lang/Character;"),
        method("charValue", "()C"),
    ]),
    class("java.lang.Byte", &[
        static_field("TYPE", "Ljava/lang/Class;"),
        static_field("MIN_VALUE", "B"),
        static_field("MAX_VALUE", "B"),
        static_method("valueOf", "(B)Ljava/lang/Byte;"),
        method("byteValue", "()B"),
    ]),
    class("java.lang.Short", &[
        static_field("TYPE", "Ljava/lang/Class;"),
        static_field("MIN_VALUE", "S"),
        static_field("MAX_VALUE", "S"),
        static_method("valueOf", "(S)Ljava/lang/Short;"),
        method("shortValue", "()S"),
    ]),
    class("java.lang.Integer", &[
        static_field("TYPE", "Ljava/lang/Class;"),
        static_field("MIN_VALUE", "I"),
        static_field("MAX_VALUE", "I"),
        static_method("valueOf", "(I)Ljava/lang/Integer;"),
        method("intValue", "()I"),
    ]),
    class("java.lang.Long", &[
        static_field("TYPE", "Ljava/lang/Class;"),
        static_field("MIN_VALUE", "J"),
        static_field("MAX_VALUE", "J"),
        static_method("valueOf", "(J)Ljava/lang/Long;"),
        method("longValue", "()J"),
    ]),
    class("java.lang.Float", &[
        static_field("TYPE", "Ljava/lang/Class;"),
        static_field("MIN_VALUE", "F"),
        static_field("MAX_VALUE", "F"),
        static_method("valueOf", "(F)Ljava/lang/Float;"),
        method("floatValue", "()F"),
    ]),
    class("java.lang.Double", &[
        static_field("TYPE", "Ljava/lang/Class;"),
        static_field("MIN_VALUE", "D"),
        static_field("MAX_VALUE", "D"),
        static_method("valueOf", "(D)Ljava/lang/Double;"),
        method("doubleValue", "()D"),
    ]),
    class("[Z", &[]),
    class("[C", &[]),
    class("[B", &[]),
    class("[S", &[]),
    class("[I", &[]),
    class("[J", &[]),
    class("[F", &[]),
    class("[D", &[]),
    class(names::STRING_ARRAY, &[]),
];

/// Box class holding the `MIN_VALUE`/`MAX_VALUE` of each integral type.
const INTEGRAL_BOXES: [(JavaType, &str); 4] = [
    (JavaType::Byte, "java.lang.Byte"),
    (JavaType::Short, "java.lang.Short"),
    (JavaType::Int, "java.lang.Integer"),
    (JavaType::Long, "java.lang.Long"),
];

/// Array class for each element type that has a dedicated one.
const ARRAY_CLASSES: [(JavaType, &str); 9] = [
    (JavaType::Boolean, "[Z"),
    (JavaType::Char, "[C"),
    (JavaType::Byte, "[B"),
    (JavaType::Short, "[S"),
    (JavaType::Int, "[I"),
    (JavaType::Long, "[J"),
    (JavaType::Float, "[F"),
    (JavaType::Double, "[D"),
    (JavaType::String, names::STRING_ARRAY),
];

/// Some JVM builds report the magnitude of `MIN_VALUE` instead of the
/// negative minimum. Any positive minimum is negated.
pub fn correct_min_value(raw: i64) -> i64 {
    if raw > 0 {
        -raw
    } else {
        raw
    }
}

/// A resolved method ID. Valid for as long as its class stays loaded,
/// which the registry's global class reference guarantees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodId(jni::jmethodID);

unsafe impl Send for MethodId {}
unsafe impl Sync for MethodId {}

impl MethodId {
    /// # Safety
    /// `raw` must be a method ID obtained from the running VM.
    pub unsafe fn from_raw(raw: jni::jmethodID) -> Self {
        MethodId(raw)
    }

    pub fn raw(self) -> jni::jmethodID {
        self.0
    }
}

/// A resolved field ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldId(jni::jfieldID);

unsafe impl Send for FieldId {}
unsafe impl Sync for FieldId {}

impl FieldId {
    /// # Safety
    /// `raw` must be a field ID obtained from the running VM.
    pub unsafe fn from_raw(raw: jni::jfieldID) -> Self {
        FieldId(raw)
    }

    pub fn raw(self) -> jni::jfieldID {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberId {
    Method(MethodId),
    StaticMethod(MethodId),
    Field(FieldId),
    StaticField(FieldId),
}

/// A pinned class and its resolved members.
pub struct ClassEntry {
    name: &'static str,
    class: jni::jclass,
    members: HashMap<&'static str, MemberId>,
}

// `class` is a global reference.
unsafe impl Send for ClassEntry {}
unsafe impl Sync for ClassEntry {}

impl ClassEntry {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The global class reference. Owned by the registry; never delete it.
    pub fn class(&self) -> jni::jclass {
        self.class
    }

    /// The class as a borrowed handle.
    pub fn handle(&self, env: &Env) -> Result<HandleRef> {
        HandleRef::borrow(env, self.class, RefKind::Class)
    }

    pub fn members(&self) -> &HashMap<&'static str, MemberId> {
        &self.members
    }

    pub fn member(&self, key: &str) -> Result<MemberId> {
        self.members
            .get(key)
            .copied()
            .ok_or_else(|| Error::Registry(format!("{} has no member {key}", self.name)))
    }

    pub fn method(&self, key: &str) -> Result<MethodId> {
        match self.member(key)? {
            MemberId::Method(id) => Ok(id),
            other => Err(self.wrong_kind(key, other)),
        }
    }

    pub fn static_method(&self, key: &str) -> Result<MethodId> {
        match self.member(key)? {
            MemberId::StaticMethod(id) => Ok(id),
            other => Err(self.wrong_kind(key, other)),
        }
    }

    pub fn field(&self, key: &str) -> Result<FieldId> {
        match self.member(key)? {
            MemberId::Field(id) => Ok(id),
            other => Err(self.wrong_kind(key, other)),
        }
    }

    pub fn static_field(&self, key: &str) -> Result<FieldId> {
        match self.member(key)? {
            MemberId::StaticField(id) => Ok(id),
            other => Err(self.wrong_kind(key, other)),
        }
    }

    fn wrong_kind(&self, key: &str, found: MemberId) -> Error {
        Error::Registry(format!("{}.{key} is a {found:?}", self.name))
    }
}

impl fmt::Debug for ClassEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassEntry")
            .field("name", &self.name)
            .field("class", &self.class)
            .field("members", &self.members.len())
            .finish()
    }
}

/// `MIN_VALUE`/`MAX_VALUE` of an integral Java type, as reported by the VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegralLimits {
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveLimits {
    pub byte: IntegralLimits,
    pub short: IntegralLimits,
    pub int: IntegralLimits,
    pub long: IntegralLimits,
}

impl Default for PrimitiveLimits {
    fn default() -> Self {
        PrimitiveLimits {
            byte: IntegralLimits { min: i8::MIN.into(), max: i8::MAX.into() },
            short: IntegralLimits { min: i16::MIN.into(), max: i16::MAX.into() },
            int: IntegralLimits { min: i32::MIN.into(), max: i32::MAX.into() },
            long: IntegralLimits { min: i64::MIN, max: i64::MAX },
        }
    }
}

impl PrimitiveLimits {
    pub fn get(&self, ty: JavaType) -> Option<IntegralLimits> {
        match ty {
            JavaType::Byte => Some(self.byte),
            JavaType::Short => Some(self.short),
            JavaType::Int => Some(self.int),
            JavaType::Long => Some(self.long),
            _ => None,
        }
    }

    fn set(&mut self, ty: JavaType, limits: IntegralLimits) {
        match ty {
            JavaType::Byte => self.byte = limits,
            JavaType::Short => self.short = limits,
            JavaType::Int => self.int = limits,
            JavaType::Long => self.long = limits,
            _ => {}
        }
    }
}

/// The pinned catalog for one session.
pub struct ClassRegistry {
    entries: HashMap<&'static str, ClassEntry>,
    limits: PrimitiveLimits,
    disposed: AtomicBool,
}

impl ClassRegistry {
    /// Resolves every class and member in `catalog`.
    ///
    /// On failure, every class pinned so far is released and the pending
    /// exception (if any) is cleared.
    pub fn initialize(env: &Env, catalog: &[ClassSpec]) -> Result<ClassRegistry> {
        let mut registry = ClassRegistry {
            entries: HashMap::with_capacity(catalog.len()),
            limits: PrimitiveLimits::default(),
            disposed: AtomicBool::new(false),
        };

        for spec in catalog {
            match resolve_class(env, spec) {
                Ok(entry) => {
                    registry.entries.insert(spec.name, entry);
                }
                Err(err) => {
                    registry.dispose(env.jni());
                    return Err(err);
                }
            }
        }

        if let Err(err) = registry.read_limits(env) {
            registry.dispose(env.jni());
            return Err(err);
        }

        log::debug!(
            "class registry v{CATALOG_VERSION} ready: {} classes, {} members",
            registry.entries.len(),
            registry.entries.values().map(|e| e.members.len()).sum::<usize>()
        );
        Ok(registry)
    }

    fn read_limits(&mut self, env: &Env) -> Result<()> {
        for (ty, box_class) in INTEGRAL_BOXES {
            let Some(entry) = self.entries.get(box_class) else {
                continue;
            };
            let (Ok(min_id), Ok(max_id)) = (entry.static_field("MIN_VALUE"), entry.static_field("MAX_VALUE")) else {
                continue;
            };
            let jni = env.jni();
            let min = widen(ty, jni.get_static_field(entry.class, min_id.raw(), ty));
            let max = widen(ty, jni.get_static_field(entry.class, max_id.raw(), ty));
            if jni.exception_check() {
                clear_pending(env);
                return Err(Error::Registry(format!("cannot read {box_class} limits")));
            }
            let corrected = correct_min_value(min);
            if corrected != min {
                log::warn!("{box_class}.MIN_VALUE reported as {min}, using {corrected}");
            }
            self.limits.set(ty, IntegralLimits { min: corrected, max });
        }
        Ok(())
    }

    /// Releases every pinned class. Runs once; later calls do nothing.
    pub fn dispose(&self, env: &JniEnv) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        for entry in self.entries.values() {
            if !entry.class.is_null() {
                env.delete_global_ref(entry.class);
            }
        }
        log::debug!("class registry disposed ({} classes)", self.entries.len());
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// O(1), no JNI calls.
    pub fn lookup(&self, name: &str) -> Option<&ClassEntry> {
        self.entries.get(name)
    }

    pub fn get(&self, name: &str) -> Result<&ClassEntry> {
        self.lookup(name)
            .ok_or_else(|| Error::Registry(format!("{name} is not in the class catalog")))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limits(&self) -> &PrimitiveLimits {
        &self.limits
    }

    /// The pinned array class for arrays of `ty`, if the catalog has one.
    pub fn array_class(&self, ty: JavaType) -> Option<&ClassEntry> {
        ARRAY_CLASSES
            .iter()
            .find(|(t, _)| *t == ty)
            .and_then(|(_, name)| self.lookup(name))
    }

    /// Element type of an array object: a primitive, `String`, or `Object`
    /// for every other reference array.
    pub fn element_type_of(&self, env: &Env, array: jni::jobject) -> JavaType {
        for (ty, name) in ARRAY_CLASSES {
            if let Some(entry) = self.lookup(name) {
                if env.jni().is_instance_of(array, entry.class) {
                    return ty;
                }
            }
        }
        JavaType::Object
    }
}

impl Drop for ClassRegistry {
    fn drop(&mut self) {
        if !self.is_disposed() && !self.entries.is_empty() {
            log::warn!("class registry dropped without dispose; {} class references leaked", self.entries.len());
        }
    }
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("classes", &self.entries.len())
            .field("limits", &self.limits)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

fn widen(ty: JavaType, value: jni::jvalue) -> i64 {
    unsafe {
        match ty {
            JavaType::Byte => value.b.into(),
            JavaType::Short => value.s.into(),
            JavaType::Int => value.i.into(),
            _ => value.j,
        }
    }
}

fn clear_pending(env: &Env) {
    let jni = env.jni();
    if jni.exception_check() {
        if env.describe_exceptions() {
            jni.exception_describe();
        }
        jni.exception_clear();
    }
}

fn resolve_class(env: &Env, spec: &ClassSpec) -> Result<ClassEntry> {
    env.with_frame(2, |env| {
        let jni = env.jni();
        let internal = signature::to_internal_name(spec.name);
        let Some(local) = jni.find_class(&internal) else {
            clear_pending(env);
            return Err(Error::Registry(format!("class {} not found", spec.name)));
        };
        let Some(global) = jni.new_global_ref(local) else {
            clear_pending(env);
            return Err(Error::Registry(format!("cannot pin class {}", spec.name)));
        };

        let mut members = HashMap::with_capacity(spec.members.len());
        for member in spec.members {
            let id = match member.kind {
                MemberKind::Method => jni
                    .get_method_id(global, member.name, member.signature)
                    .map(|id| MemberId::Method(MethodId(id))),
                MemberKind::StaticMethod => jni
                    .get_static_method_id(global, member.name, member.signature)
                    .map(|id| MemberId::StaticMethod(MethodId(id))),
                MemberKind::Field => jni
                    .get_field_id(global, member.name, member.signature)
                    .map(|id| MemberId::Field(FieldId(id))),
                MemberKind::StaticField => jni
                    .get_static_field_id(global, member.name, member.signature)
                    .map(|id| MemberId::StaticField(FieldId(id))),
            };
            match id {
                Some(id) => {
                    members.insert(member.key, id);
                }
                None => {
                    clear_pending(env);
                    jni.delete_global_ref(global);
                    return Err(Error::Registry(format!(
                        "{}.{}{} not found",
                        spec.name, member.name, member.signature
                    )));
                }
            }
        }

        Ok(ClassEntry { name: spec.name, class: global, members })
    })
}
