//! Java arrays: element access, strided slices and bulk buffer copies.
//!
//! Slices use `start`, `stop` and a non-zero `step`, with the element count
//! `max(0, (stop - start + step - sign(step)) / step)`. Bounds are checked on
//! the host side before any JNI call.
//!
//! Bulk copies take the contiguous region path when the step is 1 and the
//! host items have the array's element type. Everything else goes element by
//! element through a pinned buffer that is released on every path, committed
//! on success and aborted on failure.

use std::fmt;

use crate::error::{Error, Result};
use crate::frame::FRAME_RECYCLE_INTERVAL;
use crate::handle::{HandleRef, RefKind};
use crate::jni_wrapper::JniPrimitive;
use crate::marshal;
use crate::registry::names;
use crate::session::Env;
use crate::sys::jni;
use crate::value::{JavaType, Value};

/// Runs `$body` with `$t` bound to the JNI primitive for `$ty`.
macro_rules! for_primitive {
    ($ty:expr, $t:ident => $body:expr, _ => $other:expr) => {
        match $ty {
            JavaType::Boolean => {
                type $t = jni::jboolean;
                $body
            }
            JavaType::Char => {
                type $t = jni::jchar;
                $body
            }
            JavaType::Byte => {
                type $t = jni::jbyte;
                $body
            }
            JavaType::Short => {
                type $t = jni::jshort;
                $body
            }
            JavaType::Int => {
                type $t = jni::jint;
                $body
            }
            JavaType::Long => {
                type $t = jni::jlong;
                $body
            }
            JavaType::Float => {
                type $t = jni::jfloat;
                $body
            }
            JavaType::Double => {
                type $t = jni::jdouble;
                $body
            }
            _ => $other,
        }
    };
}

/// Number of elements in `start..stop` by `step`. Zero for an empty range.
///
/// Computed in `i128`, so extreme bounds cannot overflow; a count beyond
/// `usize::MAX` saturates.
pub fn slice_len(start: i64, stop: i64, step: i64) -> usize {
    if step == 0 {
        return 0;
    }
    let (start, stop, step) = (i128::from(start), i128::from(stop), i128::from(step));
    let n = (stop - start + step - step.signum()) / step;
    usize::try_from(n.max(0)).unwrap_or(usize::MAX)
}

/// Validates a slice against `len` and returns its element count.
fn check_slice(start: i64, stop: i64, step: i64, len: usize) -> Result<usize> {
    let invalid = || Error::InvalidSlice { start, stop, step, len };
    if step == 0 {
        return Err(invalid());
    }
    let n = slice_len(start, stop, step);
    if n == 0 {
        return Ok(0);
    }
    if n > len {
        return Err(invalid());
    }
    let last = i128::from(start) + (n as i128 - 1) * i128::from(step);
    let in_bounds = |i: i128| i >= 0 && i < len as i128;
    if !in_bounds(i128::from(start)) || !in_bounds(last) {
        return Err(invalid());
    }
    Ok(n)
}

fn slice_index(start: i64, step: i64, i: usize) -> usize {
    (start + i as i64 * step) as usize
}

/// Primitive array elements pinned with `Get<T>ArrayElements`.
///
/// Released with `JNI_ABORT` unless [`commit`](Self::commit) was called.
struct PinnedElements<'e, T: JniPrimitive> {
    env: &'e Env,
    array: jni::jarray,
    ptr: *mut T,
    len: usize,
    mode: jni::jint,
}

impl<'e, T: JniPrimitive> PinnedElements<'e, T> {
    fn pin(env: &'e Env, array: jni::jarray, len: usize) -> Result<Self> {
        let ptr = env
            .jni()
            .get_array_elements::<T>(array)
            .ok_or_else(|| env.pending_error("GetArrayElements"))?;
        Ok(PinnedElements { env, array, ptr, len, mode: jni::JNI_ABORT })
    }

    fn as_slice(&self) -> &[T] {
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
    }

    /// Releases with mode 0: copy back and free.
    fn commit(mut self) {
        self.mode = 0;
    }
}

impl<T: JniPrimitive> Drop for PinnedElements<'_, T> {
    fn drop(&mut self) {
        self.env.jni().release_array_elements::<T>(self.array, self.ptr, self.mode);
    }
}

/// A host byte buffer of primitive items, for bulk array copies.
///
/// `item` is the Java type of each item in the buffer, which may differ from
/// the array's element type; mismatched items are converted one at a time
/// with the usual range checks.
#[derive(Clone, PartialEq)]
pub struct BufferView {
    bytes: Vec<u8>,
    item: JavaType,
    item_size: usize,
}

impl BufferView {
    pub fn new(item: JavaType, bytes: Vec<u8>) -> Result<Self> {
        let item_size = item
            .element_size()
            .ok_or(Error::TypeMismatch { expected: JavaType::Byte, found: "non-primitive buffer item" })?;
        if bytes.len() % item_size != 0 {
            return Err(Error::Range { ty: item, value: format!("{} bytes", bytes.len()) });
        }
        Ok(BufferView { bytes, item, item_size })
    }

    /// A zero-filled buffer of `len` items.
    pub fn zeroed(item: JavaType, len: usize) -> Result<Self> {
        let size = item.element_size().unwrap_or(0);
        Self::new(item, vec![0; len * size])
    }

    pub fn from_slice<T: JniPrimitive>(items: &[T]) -> Self {
        let size = std::mem::size_of::<T>();
        let mut bytes = vec![0u8; items.len() * size];
        unsafe {
            std::ptr::copy_nonoverlapping(items.as_ptr() as *const u8, bytes.as_mut_ptr(), bytes.len());
        }
        BufferView { bytes, item: T::TYPE, item_size: size }
    }

    /// Copies the items out as `T`, which must match the item type.
    pub fn to_vec<T: JniPrimitive>(&self) -> Result<Vec<T>> {
        if T::TYPE != self.item {
            return Err(Error::TypeMismatch { expected: self.item, found: T::TYPE.name() });
        }
        let mut out = vec![T::default(); self.len()];
        unsafe {
            std::ptr::copy_nonoverlapping(self.bytes.as_ptr(), out.as_mut_ptr() as *mut u8, self.bytes.len());
        }
        Ok(out)
    }

    pub fn item(&self) -> JavaType {
        self.item
    }

    pub fn item_size(&self) -> usize {
        self.item_size
    }

    pub fn len(&self) -> usize {
        self.bytes.len() / self.item_size
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    fn read_item(&self, i: usize) -> jni::jvalue {
        let at = i * self.item_size;
        let b = &self.bytes[at..at + self.item_size];
        for_primitive!(self.item, T => {
            let mut v = T::default();
            unsafe { std::ptr::copy_nonoverlapping(b.as_ptr(), &mut v as *mut T as *mut u8, b.len()) };
            v.into_jvalue()
        }, _ => jni::jvalue { j: 0 })
    }

    fn write_item(&mut self, i: usize, value: jni::jvalue) {
        let at = i * self.item_size;
        let size = self.item_size;
        let b = &mut self.bytes[at..at + size];
        for_primitive!(self.item, T => {
            let v = unsafe { T::from_jvalue(value) };
            unsafe { std::ptr::copy_nonoverlapping(&v as *const T as *const u8, b.as_mut_ptr(), size) };
        }, _ => {})
    }
}

impl fmt::Debug for BufferView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferView")
            .field("item", &self.item)
            .field("len", &self.len())
            .finish()
    }
}

/// A Java array with a known element type and length.
#[derive(Clone)]
pub struct JArray {
    handle: HandleRef,
    elem: JavaType,
    len: usize,
}

impl JArray {
    /// A new zero-filled (or null-filled) array.
    ///
    /// `String`, `Class` and `Object` elements create arrays of that class;
    /// use [`new_object_array`](Self::new_object_array) for anything else.
    pub fn new(env: &Env, elem: JavaType, len: usize) -> Result<Self> {
        let jlen = jni::jsize::try_from(len).map_err(|_| Error::Range { ty: JavaType::Int, value: len.to_string() })?;
        if elem.is_object_kind() {
            let class_name = match elem {
                JavaType::String => names::STRING,
                JavaType::Class => names::CLASS,
                _ => names::OBJECT,
            };
            let registry = env.registry()?;
            let class = registry.get(class_name)?;
            return Self::object_array(env, jlen, class.class(), elem);
        }
        let raw = for_primitive!(elem, T => env.jni().new_primitive_array::<T>(jlen),
            _ => return Err(Error::TypeMismatch { expected: JavaType::Array, found: "void element" }));
        let raw = raw.ok_or_else(|| env.pending_error("NewArray"))?;
        let handle = own_local(env, raw)?;
        Ok(JArray { handle, elem, len })
    }

    /// A new array of `class` instances, every element null.
    pub fn new_object_array(env: &Env, class: &HandleRef, len: usize) -> Result<Self> {
        let jlen = jni::jsize::try_from(len).map_err(|_| Error::Range { ty: JavaType::Int, value: len.to_string() })?;
        Self::object_array(env, jlen, class.raw(), JavaType::Object)
    }

    fn object_array(env: &Env, len: jni::jsize, class: jni::jclass, elem: JavaType) -> Result<Self> {
        let raw = env
            .jni()
            .new_object_array(len, class, std::ptr::null_mut())
            .ok_or_else(|| env.pending_error("NewObjectArray"))?;
        let handle = own_local(env, raw)?;
        Ok(JArray { handle, elem, len: len as usize })
    }

    /// A new primitive array holding a copy of `items`.
    pub fn from_slice<T: JniPrimitive>(env: &Env, items: &[T]) -> Result<Self> {
        let array = Self::new(env, T::TYPE, items.len())?;
        array.write_region(env, 0, items)?;
        Ok(array)
    }

    /// Wraps an existing array, classifying its element type.
    pub fn from_handle(env: &Env, handle: HandleRef) -> Result<Self> {
        if !handle.is_live() {
            return Err(Error::NullObject("array belongs to a session that has shut down".to_string()));
        }
        let elem = env.registry()?.element_type_of(env, handle.raw());
        let len = env.jni().get_array_length(handle.raw());
        env.check_exception()?;
        Ok(JArray { handle, elem, len: len.max(0) as usize })
    }

    pub fn handle(&self) -> &HandleRef {
        &self.handle
    }

    /// Element type: a primitive, `String`, or `Object`.
    pub fn elem(&self) -> JavaType {
        self.elem
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn check_index(&self, index: usize) -> Result<jni::jsize> {
        if index >= self.len {
            return Err(Error::IndexOutOfBounds { index, len: self.len });
        }
        Ok(index as jni::jsize)
    }

    fn check_region<T: JniPrimitive>(&self, start: usize, count: usize) -> Result<()> {
        if T::TYPE != self.elem {
            return Err(Error::TypeMismatch { expected: self.elem, found: T::TYPE.name() });
        }
        if start.checked_add(count).map_or(true, |end| end > self.len) {
            return Err(Error::IndexOutOfBounds { index: start.saturating_add(count), len: self.len });
        }
        Ok(())
    }

    pub fn get(&self, env: &Env, index: usize) -> Result<Value> {
        let i = self.check_index(index)?;
        let raw = self.handle.raw();
        if self.elem.is_object_kind() {
            return env.with_frame(1, |env| {
                let local = env.jni().get_object_array_element(raw, i);
                env.check_exception()?;
                marshal::decode(env, self.elem, jni::jvalue { l: local })
            });
        }
        let value = for_primitive!(self.elem, T => {
            let mut one = [T::default()];
            env.jni().get_array_region::<T>(raw, i, &mut one);
            one[0].into_jvalue()
        }, _ => jni::jvalue { j: 0 });
        env.check_exception()?;
        Ok(marshal::decode_primitive(self.elem, value).unwrap_or(Value::Null))
    }

    pub fn set(&self, env: &Env, index: usize, value: &Value) -> Result<()> {
        let i = self.check_index(index)?;
        let raw = self.handle.raw();
        if self.elem.is_object_kind() {
            let encoded = marshal::encode(env, self.elem, value)?;
            let obj = unsafe { encoded.l };
            env.jni().set_object_array_element(raw, i, obj);
            if !obj.is_null() {
                env.jni().delete_global_ref(obj);
            }
            return env.check_exception();
        }
        let encoded = marshal::encode_primitive(self.elem, value)?;
        for_primitive!(self.elem, T => {
            let one = [unsafe { T::from_jvalue(encoded) }];
            env.jni().set_array_region::<T>(raw, i, &one);
        }, _ => {});
        env.check_exception()
    }

    /// Copies `buf.len()` elements starting at `start` into `buf`.
    pub fn read_region<T: JniPrimitive>(&self, env: &Env, start: usize, buf: &mut [T]) -> Result<()> {
        self.check_region::<T>(start, buf.len())?;
        if buf.is_empty() {
            return Ok(());
        }
        env.jni().get_array_region::<T>(self.handle.raw(), start as jni::jsize, buf);
        env.check_exception()
    }

    /// Copies `buf` into the array starting at `start`.
    pub fn write_region<T: JniPrimitive>(&self, env: &Env, start: usize, buf: &[T]) -> Result<()> {
        self.check_region::<T>(start, buf.len())?;
        if buf.is_empty() {
            return Ok(());
        }
        env.jni().set_array_region::<T>(self.handle.raw(), start as jni::jsize, buf);
        env.check_exception()
    }

    /// The whole array as a `Vec<T>`.
    pub fn to_vec<T: JniPrimitive>(&self, env: &Env) -> Result<Vec<T>> {
        let mut out = vec![T::default(); self.len];
        self.read_region(env, 0, &mut out)?;
        Ok(out)
    }

    /// Elements `start..stop` by `step`, decoded.
    pub fn get_slice(&self, env: &Env, start: i64, stop: i64, step: i64) -> Result<Vec<Value>> {
        let n = check_slice(start, stop, step, self.len)?;
        if n == 0 {
            return Ok(Vec::new());
        }
        if self.elem.is_object_kind() {
            return self.get_object_slice(env, start, step, n);
        }
        let view = self.read_buffer(env, start, stop, step, self.elem)?;
        Ok((0..n)
            .filter_map(|i| marshal::decode_primitive(self.elem, view.read_item(i)))
            .collect())
    }

    fn get_object_slice(&self, env: &Env, start: i64, step: i64, n: usize) -> Result<Vec<Value>> {
        let raw = self.handle.raw();
        let mut frame = env.frame(FRAME_RECYCLE_INTERVAL)?;
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            frame.recycle(i)?;
            let local = env.jni().get_object_array_element(raw, slice_index(start, step, i) as jni::jsize);
            env.check_exception()?;
            out.push(marshal::decode(env, self.elem, jni::jvalue { l: local })?);
        }
        Ok(out)
    }

    /// Stores `values` at `start..stop` by `step`.
    ///
    /// Every value is encoded before the array is touched, so a bad value
    /// leaves a primitive array unchanged.
    pub fn set_slice(&self, env: &Env, start: i64, stop: i64, step: i64, values: &[Value]) -> Result<()> {
        let n = check_slice(start, stop, step, self.len)?;
        if values.len() != n {
            return Err(Error::Arity { expected: n, found: values.len() });
        }
        if n == 0 {
            return Ok(());
        }
        if self.elem.is_object_kind() {
            return self.set_object_slice(env, start, step, values);
        }
        let mut view = BufferView::zeroed(self.elem, n)?;
        for (i, value) in values.iter().enumerate() {
            view.write_item(i, marshal::encode_primitive(self.elem, value)?);
        }
        self.write_buffer(env, start, stop, step, &view)
    }

    fn set_object_slice(&self, env: &Env, start: i64, step: i64, values: &[Value]) -> Result<()> {
        let raw = self.handle.raw();
        let mut frame = env.frame(FRAME_RECYCLE_INTERVAL)?;
        for (i, value) in values.iter().enumerate() {
            frame.recycle(i)?;
            let encoded = marshal::encode(env, self.elem, value)?;
            let obj = unsafe { encoded.l };
            env.jni()
                .set_object_array_element(raw, slice_index(start, step, i) as jni::jsize, obj);
            if !obj.is_null() {
                env.jni().delete_global_ref(obj);
            }
            env.check_exception()?;
        }
        Ok(())
    }

    /// Copies `start..stop` by `step` into a new buffer of `item`s.
    pub fn read_buffer(&self, env: &Env, start: i64, stop: i64, step: i64, item: JavaType) -> Result<BufferView> {
        let n = check_slice(start, stop, step, self.len)?;
        let mut view = BufferView::zeroed(item, n)?;
        if n == 0 {
            return Ok(view);
        }
        let raw = self.handle.raw();
        let elem = self.elem;

        if step == 1 && item == elem {
            for_primitive!(elem, T => {
                // Region copies are byte-wise, so the buffer need not be aligned for T.
                let ptr = view.bytes.as_mut_ptr() as *mut T;
                unsafe { T::get_region(env.jni().raw(), raw, start as jni::jsize, n as jni::jsize, ptr) };
            }, _ => return Err(Error::TypeMismatch { expected: JavaType::Array, found: elem.name() }));
            env.check_exception()?;
            return Ok(view);
        }

        for_primitive!(elem, T => {
            let pinned = PinnedElements::<T>::pin(env, raw, self.len)?;
            let items = pinned.as_slice();
            for i in 0..n {
                let value = items[slice_index(start, step, i)].into_jvalue();
                let converted = convert(elem, item, value)?;
                view.write_item(i, converted);
            }
        }, _ => return Err(Error::TypeMismatch { expected: JavaType::Array, found: elem.name() }));
        Ok(view)
    }

    /// Stores the buffer's items at `start..stop` by `step`.
    pub fn write_buffer(&self, env: &Env, start: i64, stop: i64, step: i64, view: &BufferView) -> Result<()> {
        let n = check_slice(start, stop, step, self.len)?;
        if view.len() != n {
            return Err(Error::Arity { expected: n, found: view.len() });
        }
        if n == 0 {
            return Ok(());
        }
        let raw = self.handle.raw();
        let elem = self.elem;

        if step == 1 && view.item == elem {
            for_primitive!(elem, T => {
                let ptr = view.bytes.as_ptr() as *const T;
                unsafe { T::set_region(env.jni().raw(), raw, start as jni::jsize, n as jni::jsize, ptr) };
            }, _ => return Err(Error::TypeMismatch { expected: JavaType::Array, found: elem.name() }));
            return env.check_exception();
        }

        for_primitive!(elem, T => {
            let mut pinned = PinnedElements::<T>::pin(env, raw, self.len)?;
            let items = pinned.as_mut_slice();
            for i in 0..n {
                let value = convert(view.item, elem, view.read_item(i))?;
                items[slice_index(start, step, i)] = unsafe { T::from_jvalue(value) };
            }
            pinned.commit();
        }, _ => return Err(Error::TypeMismatch { expected: JavaType::Array, found: elem.name() }));
        env.check_exception()
    }
}

/// Converts a primitive slot between types through the checked encoder.
fn convert(from: JavaType, to: JavaType, value: jni::jvalue) -> Result<jni::jvalue> {
    if from == to {
        return Ok(value);
    }
    let host = marshal::decode_primitive(from, value).unwrap_or(Value::Null);
    marshal::encode_primitive(to, &host)
}

fn own_local(env: &Env, local: jni::jobject) -> Result<HandleRef> {
    let handle = HandleRef::own(env, local, RefKind::Array);
    env.jni().delete_local_ref(local);
    handle
}

impl fmt::Debug for JArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JArray")
            .field("elem", &self.elem)
            .field("len", &self.len)
            .field("handle", &self.handle)
            .finish()
    }
}
