//! Thin wrapper around the JNI environment.
//!
//! One method per JNI slot, returning `Option` for calls that signal failure
//! with a null handle and `Result<(), jint>` for calls that return a status.
//! Nothing here checks for pending exceptions; the higher layers do that.
//!
//! # Example
//!
//! ```rust,ignore
//! use jvm_bridge::jni_wrapper::JniEnv;
//!
//! let env = unsafe { JniEnv::from_raw(raw_env) };
//! let string_class = env.find_class("java/lang/String");
//! if env.exception_check() {
//!     env.exception_clear();
//! }
//! ```

use crate::sys::jni;
use crate::value::JavaType;
use std::ffi::CString;
use std::ptr;

/// Wrapper around a JNI environment pointer.
///
/// # Thread Safety
///
/// A `JniEnv` is tied to a specific thread and cannot be sent across threads.
/// Each JVM thread has its own JNI environment.
pub struct JniEnv {
    env: *mut jni::JNIEnv,
}

impl JniEnv {
    /// Creates a JniEnv wrapper from a raw pointer.
    ///
    /// # Safety
    ///
    /// The caller must ensure the pointer is valid and comes from the current thread.
    pub unsafe fn from_raw(env: *mut jni::JNIEnv) -> Self {
        JniEnv { env }
    }

    /// Returns the raw JNI environment pointer.
    pub fn raw(&self) -> *mut jni::JNIEnv {
        self.env
    }

    // =========================================================================
    // VM
    // =========================================================================

    /// Returns the VM this environment belongs to.
    pub fn get_java_vm(&self) -> Option<*mut jni::JavaVM> {
        let mut vm: *mut jni::JavaVM = ptr::null_mut();
        unsafe {
            let vtable = *self.env;
            let result = ((*vtable).GetJavaVM)(self.env, &mut vm);
            if result != jni::JNI_OK || vm.is_null() { None } else { Some(vm) }
        }
    }

    // =========================================================================
    // Class Operations
    // =========================================================================

    /// Finds a class by its fully qualified name.
    ///
    /// The name should use '/' as package separator (e.g., "java/lang/String").
    pub fn find_class(&self, name: &str) -> Option<jni::jclass> {
        let c_name = CString::new(name).ok()?;
        unsafe {
            let vtable = *self.env;
            let cls = ((*vtable).FindClass)(self.env, c_name.as_ptr());
            if cls.is_null() { None } else { Some(cls) }
        }
    }

    /// Defines a class from raw class-file bytes.
    pub fn define_class(&self, name: &str, loader: jni::jobject, bytes: &[u8]) -> Option<jni::jclass> {
        let c_name = CString::new(name).ok()?;
        unsafe {
            let vtable = *self.env;
            let cls = ((*vtable).DefineClass)(
                self.env,
                c_name.as_ptr(),
                loader,
                bytes.as_ptr() as *const jni::jbyte,
                bytes.len() as jni::jsize,
            );
            if cls.is_null() { None } else { Some(cls) }
        }
    }

    /// Gets the class of an object.
    pub fn get_object_class(&self, obj: jni::jobject) -> Option<jni::jclass> {
        unsafe {
            let vtable = *self.env;
            let cls = ((*vtable).GetObjectClass)(self.env, obj);
            if cls.is_null() { None } else { Some(cls) }
        }
    }

    /// Checks if an object is an instance of a class.
    pub fn is_instance_of(&self, obj: jni::jobject, cls: jni::jclass) -> bool {
        unsafe {
            let vtable = *self.env;
            ((*vtable).IsInstanceOf)(self.env, obj, cls) != 0
        }
    }

    // =========================================================================
    // Exception Handling
    // =========================================================================

    /// Checks if an exception is pending.
    pub fn exception_check(&self) -> bool {
        unsafe {
            let vtable = *self.env;
            ((*vtable).ExceptionCheck)(self.env) != 0
        }
    }

    /// Clears any pending exception.
    pub fn exception_clear(&self) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).ExceptionClear)(self.env);
        }
    }

    /// Prints the pending exception and stack trace to stderr.
    ///
    /// JNI clears the exception as a side effect.
    pub fn exception_describe(&self) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).ExceptionDescribe)(self.env);
        }
    }

    /// Gets the pending exception (if any) as a new local reference.
    pub fn exception_occurred(&self) -> Option<jni::jthrowable> {
        unsafe {
            let vtable = *self.env;
            let exc = ((*vtable).ExceptionOccurred)(self.env);
            if exc.is_null() { None } else { Some(exc) }
        }
    }

    /// Throws an exception.
    pub fn throw(&self, obj: jni::jthrowable) -> Result<(), jni::jint> {
        unsafe {
            let vtable = *self.env;
            let result = ((*vtable).Throw)(self.env, obj);
            if result == 0 { Ok(()) } else { Err(result) }
        }
    }

    /// Throws a new exception of the specified class with the given message.
    pub fn throw_new(&self, cls: jni::jclass, msg: &str) -> Result<(), jni::jint> {
        let c_msg = CString::new(msg).map_err(|_| jni::JNI_EINVAL)?;
        unsafe {
            let vtable = *self.env;
            let result = ((*vtable).ThrowNew)(self.env, cls, c_msg.as_ptr());
            if result == 0 { Ok(()) } else { Err(result) }
        }
    }

    // =========================================================================
    // String Operations
    // =========================================================================

    /// Creates a new Java string from UTF-16 code units.
    pub fn new_string(&self, units: &[jni::jchar]) -> Option<jni::jstring> {
        unsafe {
            let vtable = *self.env;
            let jstr = ((*vtable).NewString)(self.env, units.as_ptr(), units.len() as jni::jsize);
            if jstr.is_null() { None } else { Some(jstr) }
        }
    }

    /// Gets the length of a Java string (in UTF-16 code units).
    pub fn get_string_length(&self, s: jni::jstring) -> jni::jsize {
        unsafe {
            let vtable = *self.env;
            ((*vtable).GetStringLength)(self.env, s)
        }
    }

    /// Pins the UTF-16 characters of a string.
    ///
    /// Every successful call must be paired with [`release_string_chars`](Self::release_string_chars).
    pub fn get_string_chars(&self, s: jni::jstring) -> Option<*const jni::jchar> {
        unsafe {
            let vtable = *self.env;
            let chars = ((*vtable).GetStringChars)(self.env, s, ptr::null_mut());
            if chars.is_null() { None } else { Some(chars) }
        }
    }

    /// Releases characters obtained from [`get_string_chars`](Self::get_string_chars).
    pub fn release_string_chars(&self, s: jni::jstring, chars: *const jni::jchar) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).ReleaseStringChars)(self.env, s, chars);
        }
    }

    // =========================================================================
    // Method IDs
    // =========================================================================

    /// Gets the method ID for an instance method.
    pub fn get_method_id(&self, cls: jni::jclass, name: &str, sig: &str) -> Option<jni::jmethodID> {
        let c_name = CString::new(name).ok()?;
        let c_sig = CString::new(sig).ok()?;
        unsafe {
            let vtable = *self.env;
            let mid = ((*vtable).GetMethodID)(self.env, cls, c_name.as_ptr(), c_sig.as_ptr());
            if mid.is_null() { None } else { Some(mid) }
        }
    }

    /// Gets the method ID for a static method.
    pub fn get_static_method_id(&self, cls: jni::jclass, name: &str, sig: &str) -> Option<jni::jmethodID> {
        let c_name = CString::new(name).ok()?;
        let c_sig = CString::new(sig).ok()?;
        unsafe {
            let vtable = *self.env;
            let mid = ((*vtable).GetStaticMethodID)(self.env, cls, c_name.as_ptr(), c_sig.as_ptr());
            if mid.is_null() { None } else { Some(mid) }
        }
    }

    // =========================================================================
    // Field IDs
    // =========================================================================

    /// Gets the field ID for an instance field.
    pub fn get_field_id(&self, cls: jni::jclass, name: &str, sig: &str) -> Option<jni::jfieldID> {
        let c_name = CString::new(name).ok()?;
        let c_sig = CString::new(sig).ok()?;
        unsafe {
            let vtable = *self.env;
            let fid = ((*vtable).GetFieldID)(self.env, cls, c_name.as_ptr(), c_sig.as_ptr());
            if fid.is_null() { None } else { Some(fid) }
        }
    }

    /// Gets the field ID for a static field.
    pub fn get_static_field_id(&self, cls: jni::jclass, name: &str, sig: &str) -> Option<jni::jfieldID> {
        let c_name = CString::new(name).ok()?;
        let c_sig = CString::new(sig).ok()?;
        unsafe {
            let vtable = *self.env;
            let fid = ((*vtable).GetStaticFieldID)(self.env, cls, c_name.as_ptr(), c_sig.as_ptr());
            if fid.is_null() { None } else { Some(fid) }
        }
    }

    // =========================================================================
    // Object Operations
    // =========================================================================

    /// Creates a new object by calling the specified constructor.
    pub fn new_object(&self, cls: jni::jclass, method_id: jni::jmethodID, args: &[jni::jvalue]) -> Option<jni::jobject> {
        unsafe {
            let vtable = *self.env;
            let obj = ((*vtable).NewObjectA)(self.env, cls, method_id, args.as_ptr());
            if obj.is_null() { None } else { Some(obj) }
        }
    }

    /// Checks if two references refer to the same object.
    pub fn is_same_object(&self, ref1: jni::jobject, ref2: jni::jobject) -> bool {
        unsafe {
            let vtable = *self.env;
            ((*vtable).IsSameObject)(self.env, ref1, ref2) != 0
        }
    }

    // =========================================================================
    // Reference Management
    // =========================================================================

    /// Creates a new global reference to an object.
    ///
    /// Global references must be explicitly deleted with `delete_global_ref`.
    pub fn new_global_ref(&self, obj: jni::jobject) -> Option<jni::jobject> {
        unsafe {
            let vtable = *self.env;
            let global = ((*vtable).NewGlobalRef)(self.env, obj);
            if global.is_null() { None } else { Some(global) }
        }
    }

    /// Deletes a global reference.
    pub fn delete_global_ref(&self, obj: jni::jobject) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).DeleteGlobalRef)(self.env, obj);
        }
    }

    /// Deletes a local reference.
    pub fn delete_local_ref(&self, obj: jni::jobject) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).DeleteLocalRef)(self.env, obj);
        }
    }

    /// Pushes a new local reference frame.
    pub fn push_local_frame(&self, capacity: jni::jint) -> Result<(), jni::jint> {
        unsafe {
            let vtable = *self.env;
            let result = ((*vtable).PushLocalFrame)(self.env, capacity);
            if result == 0 { Ok(()) } else { Err(result) }
        }
    }

    /// Pops the current local reference frame, returning a reference in the previous frame.
    pub fn pop_local_frame(&self, result: jni::jobject) -> jni::jobject {
        unsafe {
            let vtable = *self.env;
            ((*vtable).PopLocalFrame)(self.env, result)
        }
    }

    // =========================================================================
    // Array Operations
    // =========================================================================

    /// Gets the length of an array.
    pub fn get_array_length(&self, array: jni::jarray) -> jni::jsize {
        unsafe {
            let vtable = *self.env;
            ((*vtable).GetArrayLength)(self.env, array)
        }
    }

    /// Creates a new object array.
    pub fn new_object_array(&self, length: jni::jsize, cls: jni::jclass, init: jni::jobject) -> Option<jni::jobjectArray> {
        unsafe {
            let vtable = *self.env;
            let arr = ((*vtable).NewObjectArray)(self.env, length, cls, init);
            if arr.is_null() { None } else { Some(arr) }
        }
    }

    /// Gets an element from an object array.
    pub fn get_object_array_element(&self, array: jni::jobjectArray, index: jni::jsize) -> jni::jobject {
        unsafe {
            let vtable = *self.env;
            ((*vtable).GetObjectArrayElement)(self.env, array, index)
        }
    }

    /// Sets an element in an object array.
    pub fn set_object_array_element(&self, array: jni::jobjectArray, index: jni::jsize, value: jni::jobject) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).SetObjectArrayElement)(self.env, array, index, value);
        }
    }

    /// Creates a new primitive array whose element type is `T`.
    pub fn new_primitive_array<T: JniPrimitive>(&self, length: jni::jsize) -> Option<jni::jarray> {
        unsafe {
            let arr = T::new_array(self.env, length);
            if arr.is_null() { None } else { Some(arr) }
        }
    }

    /// Copies `buf.len()` elements starting at `start` out of a primitive array.
    pub fn get_array_region<T: JniPrimitive>(&self, array: jni::jarray, start: jni::jsize, buf: &mut [T]) {
        unsafe { T::get_region(self.env, array, start, buf.len() as jni::jsize, buf.as_mut_ptr()) }
    }

    /// Copies `buf` into a primitive array starting at `start`.
    pub fn set_array_region<T: JniPrimitive>(&self, array: jni::jarray, start: jni::jsize, buf: &[T]) {
        unsafe { T::set_region(self.env, array, start, buf.len() as jni::jsize, buf.as_ptr()) }
    }

    /// Pins the elements of a primitive array.
    ///
    /// Every successful call must be paired with
    /// [`release_array_elements`](Self::release_array_elements).
    pub fn get_array_elements<T: JniPrimitive>(&self, array: jni::jarray) -> Option<*mut T> {
        unsafe {
            let elems = T::get_elements(self.env, array, ptr::null_mut());
            if elems.is_null() { None } else { Some(elems) }
        }
    }

    /// Releases pinned elements. `mode` is `0`, `JNI_COMMIT` or `JNI_ABORT`.
    pub fn release_array_elements<T: JniPrimitive>(&self, array: jni::jarray, elems: *mut T, mode: jni::jint) {
        unsafe { T::release_elements(self.env, array, elems, mode) }
    }

    // =========================================================================
    // Method Calls
    // =========================================================================

    /// Calls an instance method whose return type is `ret`.
    ///
    /// Object-kind returns are delivered in the `l` member as a local
    /// reference; `Void` yields a zeroed value.
    pub fn call_method(
        &self,
        obj: jni::jobject,
        method_id: jni::jmethodID,
        ret: JavaType,
        args: &[jni::jvalue],
    ) -> jni::jvalue {
        let a = args.as_ptr();
        unsafe {
            let vtable = *self.env;
            let env = self.env;
            match ret {
                JavaType::Void => {
                    ((*vtable).CallVoidMethodA)(env, obj, method_id, a);
                    jni::jvalue { j: 0 }
                }
                JavaType::Boolean => jni::jvalue { z: ((*vtable).CallBooleanMethodA)(env, obj, method_id, a) },
                JavaType::Char => jni::jvalue { c: ((*vtable).CallCharMethodA)(env, obj, method_id, a) },
                JavaType::Byte => jni::jvalue { b: ((*vtable).CallByteMethodA)(env, obj, method_id, a) },
                JavaType::Short => jni::jvalue { s: ((*vtable).CallShortMethodA)(env, obj, method_id, a) },
                JavaType::Int => jni::jvalue { i: ((*vtable).CallIntMethodA)(env, obj, method_id, a) },
                JavaType::Long => jni::jvalue { j: ((*vtable).CallLongMethodA)(env, obj, method_id, a) },
                JavaType::Float => jni::jvalue { f: ((*vtable).CallFloatMethodA)(env, obj, method_id, a) },
                JavaType::Double => jni::jvalue { d: ((*vtable).CallDoubleMethodA)(env, obj, method_id, a) },
                JavaType::String | JavaType::Object | JavaType::Array | JavaType::Class => {
                    jni::jvalue { l: ((*vtable).CallObjectMethodA)(env, obj, method_id, a) }
                }
            }
        }
    }

    /// Calls a static method whose return type is `ret`.
    pub fn call_static_method(
        &self,
        cls: jni::jclass,
        method_id: jni::jmethodID,
        ret: JavaType,
        args: &[jni::jvalue],
    ) -> jni::jvalue {
        let a = args.as_ptr();
        unsafe {
            let vtable = *self.env;
            let env = self.env;
            match ret {
                JavaType::Void => {
                    ((*vtable).CallStaticVoidMethodA)(env, cls, method_id, a);
                    jni::jvalue { j: 0 }
                }
                JavaType::Boolean => jni::jvalue { z: ((*vtable).CallStaticBooleanMethodA)(env, cls, method_id, a) },
                JavaType::Char => jni::jvalue { c: ((*vtable).CallStaticCharMethodA)(env, cls, method_id, a) },
                JavaType::Byte => jni::jvalue { b: ((*vtable).CallStaticByteMethodA)(env, cls, method_id, a) },
                JavaType::Short => jni::jvalue { s: ((*vtable).CallStaticShortMethodA)(env, cls, method_id, a) },
                JavaType::Int => jni::jvalue { i: ((*vtable).CallStaticIntMethodA)(env, cls, method_id, a) },
                JavaType::Long => jni::jvalue { j: ((*vtable).CallStaticLongMethodA)(env, cls, method_id, a) },
                JavaType::Float => jni::jvalue { f: ((*vtable).CallStaticFloatMethodA)(env, cls, method_id, a) },
                JavaType::Double => jni::jvalue { d: ((*vtable).CallStaticDoubleMethodA)(env, cls, method_id, a) },
                JavaType::String | JavaType::Object | JavaType::Array | JavaType::Class => {
                    jni::jvalue { l: ((*vtable).CallStaticObjectMethodA)(env, cls, method_id, a) }
                }
            }
        }
    }

    // =========================================================================
    // Field Access
    // =========================================================================

    /// Reads an instance field of type `ty`.
    pub fn get_field(&self, obj: jni::jobject, field_id: jni::jfieldID, ty: JavaType) -> jni::jvalue {
        unsafe {
            let vtable = *self.env;
            let env = self.env;
            match ty {
                JavaType::Void => jni::jvalue { j: 0 },
                JavaType::Boolean => jni::jvalue { z: ((*vtable).GetBooleanField)(env, obj, field_id) },
                JavaType::Char => jni::jvalue { c: ((*vtable).GetCharField)(env, obj, field_id) },
                JavaType::Byte => jni::jvalue { b: ((*vtable).GetByteField)(env, obj, field_id) },
                JavaType::Short => jni::jvalue { s: ((*vtable).GetShortField)(env, obj, field_id) },
                JavaType::Int => jni::jvalue { i: ((*vtable).GetIntField)(env, obj, field_id) },
                JavaType::Long => jni::jvalue { j: ((*vtable).GetLongField)(env, obj, field_id) },
                JavaType::Float => jni::jvalue { f: ((*vtable).GetFloatField)(env, obj, field_id) },
                JavaType::Double => jni::jvalue { d: ((*vtable).GetDoubleField)(env, obj, field_id) },
                JavaType::String | JavaType::Object | JavaType::Array | JavaType::Class => {
                    jni::jvalue { l: ((*vtable).GetObjectField)(env, obj, field_id) }
                }
            }
        }
    }

    /// Writes an instance field of type `ty`, reading the matching member of `value`.
    pub fn set_field(&self, obj: jni::jobject, field_id: jni::jfieldID, ty: JavaType, value: jni::jvalue) {
        unsafe {
            let vtable = *self.env;
            let env = self.env;
            match ty {
                JavaType::Void => {}
                JavaType::Boolean => ((*vtable).SetBooleanField)(env, obj, field_id, value.z),
                JavaType::Char => ((*vtable).SetCharField)(env, obj, field_id, value.c),
                JavaType::Byte => ((*vtable).SetByteField)(env, obj, field_id, value.b),
                JavaType::Short => ((*vtable).SetShortField)(env, obj, field_id, value.s),
                JavaType::Int => ((*vtable).SetIntField)(env, obj, field_id, value.i),
                JavaType::Long => ((*vtable).SetLongField)(env, obj, field_id, value.j),
                JavaType::Float => ((*vtable).SetFloatField)(env, obj, field_id, value.f),
                JavaType::Double => ((*vtable).SetDoubleField)(env, obj, field_id, value.d),
                JavaType::String | JavaType::Object | JavaType::Array | JavaType::Class => {
                    ((*vtable).SetObjectField)(env, obj, field_id, value.l)
                }
            }
        }
    }

    /// Reads a static field of type `ty`.
    pub fn get_static_field(&self, cls: jni::jclass, field_id: jni::jfieldID, ty: JavaType) -> jni::jvalue {
        unsafe {
            let vtable = *self.env;
            let env = self.env;
            match ty {
                JavaType::Void => jni::jvalue { j: 0 },
                JavaType::Boolean => jni::jvalue { z: ((*vtable).GetStaticBooleanField)(env, cls, field_id) },
                JavaType::Char => jni::jvalue { c: ((*vtable).GetStaticCharField)(env, cls, field_id) },
                JavaType::Byte => jni::jvalue { b: ((*vtable).GetStaticByteField)(env, cls, field_id) },
                JavaType::Short => jni::jvalue { s: ((*vtable).GetStaticShortField)(env, cls, field_id) },
                JavaType::Int => jni::jvalue { i: ((*vtable).GetStaticIntField)(env, cls, field_id) },
                JavaType::Long => jni::jvalue { j: ((*vtable).GetStaticLongField)(env, cls, field_id) },
                JavaType::Float => jni::jvalue { f: ((*vtable).GetStaticFloatField)(env, cls, field_id) },
                JavaType::Double => jni::jvalue { d: ((*vtable).GetStaticDoubleField)(env, cls, field_id) },
                JavaType::String | JavaType::Object | JavaType::Array | JavaType::Class => {
                    jni::jvalue { l: ((*vtable).GetStaticObjectField)(env, cls, field_id) }
                }
            }
        }
    }

    /// Writes a static field of type `ty`.
    pub fn set_static_field(&self, cls: jni::jclass, field_id: jni::jfieldID, ty: JavaType, value: jni::jvalue) {
        unsafe {
            let vtable = *self.env;
            let env = self.env;
            match ty {
                JavaType::Void => {}
                JavaType::Boolean => ((*vtable).SetStaticBooleanField)(env, cls, field_id, value.z),
                JavaType::Char => ((*vtable).SetStaticCharField)(env, cls, field_id, value.c),
                JavaType::Byte => ((*vtable).SetStaticByteField)(env, cls, field_id, value.b),
                JavaType::Short => ((*vtable).SetStaticShortField)(env, cls, field_id, value.s),
                JavaType::Int => ((*vtable).SetStaticIntField)(env, cls, field_id, value.i),
                JavaType::Long => ((*vtable).SetStaticLongField)(env, cls, field_id, value.j),
                JavaType::Float => ((*vtable).SetStaticFloatField)(env, cls, field_id, value.f),
                JavaType::Double => ((*vtable).SetStaticDoubleField)(env, cls, field_id, value.d),
                JavaType::String | JavaType::Object | JavaType::Array | JavaType::Class => {
                    ((*vtable).SetStaticObjectField)(env, cls, field_id, value.l)
                }
            }
        }
    }

    // =========================================================================
    // Monitors
    // =========================================================================

    /// Enters the monitor associated with an object.
    pub fn monitor_enter(&self, obj: jni::jobject) -> Result<(), jni::jint> {
        unsafe {
            let vtable = *self.env;
            let result = ((*vtable).MonitorEnter)(self.env, obj);
            if result == 0 { Ok(()) } else { Err(result) }
        }
    }

    /// Exits the monitor associated with an object.
    pub fn monitor_exit(&self, obj: jni::jobject) -> Result<(), jni::jint> {
        unsafe {
            let vtable = *self.env;
            let result = ((*vtable).MonitorExit)(self.env, obj);
            if result == 0 { Ok(()) } else { Err(result) }
        }
    }

    // =========================================================================
    // Native Method Registration
    // =========================================================================

    /// Registers native methods for a class.
    pub fn register_natives(&self, cls: jni::jclass, methods: &[jni::JNINativeMethod]) -> Result<(), jni::jint> {
        unsafe {
            let vtable = *self.env;
            let result = ((*vtable).RegisterNatives)(self.env, cls, methods.as_ptr(), methods.len() as jni::jint);
            if result == 0 { Ok(()) } else { Err(result) }
        }
    }

    /// Unregisters all native methods for a class.
    pub fn unregister_natives(&self, cls: jni::jclass) -> Result<(), jni::jint> {
        unsafe {
            let vtable = *self.env;
            let result = ((*vtable).UnregisterNatives)(self.env, cls);
            if result == 0 { Ok(()) } else { Err(result) }
        }
    }
}

// =========================================================================
// Primitive element types
// =========================================================================

/// A Java primitive with its own family of array slots in the JNI table.
///
/// Implemented for the eight `j*` primitive aliases. Lets the array helpers
/// above be written once instead of once per type.
pub trait JniPrimitive: Copy + Default + PartialEq + std::fmt::Debug + 'static {
    /// The Java type tag for this primitive.
    const TYPE: JavaType;

    #[doc(hidden)]
    unsafe fn new_array(env: *mut jni::JNIEnv, len: jni::jsize) -> jni::jarray;
    #[doc(hidden)]
    unsafe fn get_region(env: *mut jni::JNIEnv, array: jni::jarray, start: jni::jsize, len: jni::jsize, buf: *mut Self);
    #[doc(hidden)]
    unsafe fn set_region(env: *mut jni::JNIEnv, array: jni::jarray, start: jni::jsize, len: jni::jsize, buf: *const Self);
    #[doc(hidden)]
    unsafe fn get_elements(env: *mut jni::JNIEnv, array: jni::jarray, is_copy: *mut jni::jboolean) -> *mut Self;
    #[doc(hidden)]
    unsafe fn release_elements(env: *mut jni::JNIEnv, array: jni::jarray, elems: *mut Self, mode: jni::jint);

    /// Stores the value in the matching `jvalue` member.
    fn into_jvalue(self) -> jni::jvalue;

    /// Reads the matching `jvalue` member.
    ///
    /// # Safety
    ///
    /// `value` must have been written through the member for this type.
    unsafe fn from_jvalue(value: jni::jvalue) -> Self;
}

macro_rules! impl_jni_primitive {
    ($t:ty, $tag:ident, $member:ident, $new:ident, $get_region:ident, $set_region:ident, $get_elems:ident, $release_elems:ident) => {
        impl JniPrimitive for $t {
            const TYPE: JavaType = JavaType::$tag;

            unsafe fn new_array(env: *mut jni::JNIEnv, len: jni::jsize) -> jni::jarray {
                let vtable = *env;
                ((*vtable).$new)(env, len)
            }

            unsafe fn get_region(env: *mut jni::JNIEnv, array: jni::jarray, start: jni::jsize, len: jni::jsize, buf: *mut Self) {
                let vtable = *env;
                ((*vtable).$get_region)(env, array, start, len, buf)
            }

            unsafe fn set_region(env: *mut jni::JNIEnv, array: jni::jarray, start: jni::jsize, len: jni::jsize, buf: *const Self) {
                let vtable = *env;
                ((*vtable).$set_region)(env, array, start, len, buf)
            }

            unsafe fn get_elements(env: *mut jni::JNIEnv, array: jni::jarray, is_copy: *mut jni::jboolean) -> *mut Self {
                let vtable = *env;
                ((*vtable).$get_elems)(env, array, is_copy)
            }

            unsafe fn release_elements(env: *mut jni::JNIEnv, array: jni::jarray, elems: *mut Self, mode: jni::jint) {
                let vtable = *env;
                ((*vtable).$release_elems)(env, array, elems, mode)
            }

            fn into_jvalue(self) -> jni::jvalue {
                jni::jvalue { $member: self }
            }

            unsafe fn from_jvalue(value: jni::jvalue) -> Self {
                value.$member
            }
        }
    };
}

impl_jni_primitive!(jni::jboolean, Boolean, z, NewBooleanArray, GetBooleanArrayRegion, SetBooleanArrayRegion, GetBooleanArrayElements, ReleaseBooleanArrayElements);
impl_jni_primitive!(jni::jchar, Char, c, NewCharArray, GetCharArrayRegion, SetCharArrayRegion, GetCharArrayElements, ReleaseCharArrayElements);
impl_jni_primitive!(jni::jbyte, Byte, b, NewByteArray, GetByteArrayRegion, SetByteArrayRegion, GetByteArrayElements, ReleaseByteArrayElements);
impl_jni_primitive!(jni::jshort, Short, s, NewShortArray, GetShortArrayRegion, SetShortArrayRegion, GetShortArrayElements, ReleaseShortArrayElements);
impl_jni_primitive!(jni::jint, Int, i, NewIntArray, GetIntArrayRegion, SetIntArrayRegion, GetIntArrayElements, ReleaseIntArrayElements);
impl_jni_primitive!(jni::jlong, Long, j, NewLongArray, GetLongArrayRegion, SetLongArrayRegion, GetLongArrayElements, ReleaseLongArrayElements);
impl_jni_primitive!(jni::jfloat, Float, f, NewFloatArray, GetFloatArrayRegion, SetFloatArrayRegion, GetFloatArrayElements, ReleaseFloatArrayElements);
impl_jni_primitive!(jni::jdouble, Double, d, NewDoubleArray, GetDoubleArrayRegion, SetDoubleArrayRegion, GetDoubleArrayElements, ReleaseDoubleArrayElements);
