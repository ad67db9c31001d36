//! Raw FFI surface. Nothing in here is safe to call without reading the JNI
//! documentation for the function in question.

pub mod jni;
