//! JNI name and type-signature helpers.
//!
//! ```
//! use jvm_bridge::signature::{method_signature, type_signature};
//!
//! assert_eq!(type_signature("java.lang.String"), "Ljava/lang/String;");
//! assert_eq!(type_signature("int[][]"), "[[I");
//! assert_eq!(method_signature(&["java.lang.String", "long"], "void"), "(Ljava/lang/String;J)V");
//! ```

use crate::value::JavaType;

const PRIMITIVES: [(&str, char); 9] = [
    ("void", 'V'),
    ("boolean", 'Z'),
    ("char", 'C'),
    ("byte", 'B'),
    ("short", 'S'),
    ("int", 'I'),
    ("long", 'J'),
    ("float", 'F'),
    ("double", 'D'),
];

/// `java.lang.String` -> `java/lang/String`. Array descriptors keep their shape.
pub fn to_internal_name(binary_name: &str) -> String {
    binary_name.replace('.', "/")
}

/// `java/lang/String` -> `java.lang.String`.
pub fn to_binary_name(internal_name: &str) -> String {
    internal_name.replace('/', ".")
}

/// Descriptor for a Java type name.
///
/// Accepts primitive names (`int`), dotted class names, source-style arrays
/// (`java.lang.String[]`) and descriptors that already start with `[`.
pub fn type_signature(name: &str) -> String {
    if name.starts_with('[') {
        return to_internal_name(name);
    }
    let mut base = name;
    let mut dims = 0;
    while let Some(stripped) = base.strip_suffix("[]") {
        base = stripped;
        dims += 1;
    }
    let mut sig = "[".repeat(dims);
    match PRIMITIVES.iter().find(|(n, _)| *n == base) {
        Some((_, code)) => sig.push(*code),
        None => {
            sig.push('L');
            sig.push_str(&to_internal_name(base));
            sig.push(';');
        }
    }
    sig
}

/// `(<params>)<ret>` from Java type names.
pub fn method_signature<S: AsRef<str>>(params: &[S], ret: &str) -> String {
    let mut sig = String::from("(");
    for p in params {
        sig.push_str(&type_signature(p.as_ref()));
    }
    sig.push(')');
    sig.push_str(&type_signature(ret));
    sig
}

/// Splits a method signature into parameter descriptors and the return
/// descriptor. `None` if the signature is malformed.
pub fn split_method_signature(sig: &str) -> Option<(Vec<&str>, &str)> {
    let rest = sig.strip_prefix('(')?;
    let close = rest.find(')')?;
    let (params, ret) = (&rest[..close], &rest[close + 1..]);

    let mut out = Vec::new();
    let mut pos = 0;
    while pos < params.len() {
        let len = descriptor_len(&params[pos..], false)?;
        out.push(&params[pos..pos + len]);
        pos += len;
    }
    if descriptor_len(ret, true)? != ret.len() {
        return None;
    }
    Some((out, ret))
}

/// The tag for a method signature's return type.
pub fn return_type(sig: &str) -> Option<JavaType> {
    let (_, ret) = split_method_signature(sig)?;
    JavaType::from_descriptor(ret)
}

/// Tags for a method signature's parameters.
pub fn parameter_types(sig: &str) -> Option<Vec<JavaType>> {
    let (params, _) = split_method_signature(sig)?;
    params.into_iter().map(JavaType::from_descriptor).collect()
}

/// Length of the first field descriptor in `s`.
fn descriptor_len(s: &str, allow_void: bool) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while bytes.get(i) == Some(&b'[') {
        i += 1;
    }
    match bytes.get(i)? {
        b'Z' | b'C' | b'B' | b'S' | b'I' | b'J' | b'F' | b'D' => Some(i + 1),
        b'V' if i == 0 && allow_void => Some(1),
        b'L' => s[i..].find(';').filter(|&end| end > 1).map(|end| i + end + 1),
        _ => None,
    }
}
