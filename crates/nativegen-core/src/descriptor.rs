//! JNI signature mapping and symbol mangling.
//!
//! ## Descriptor encoding
//!
//! | type       | code              |
//! |------------|-------------------|
//! | `void`     | `V`               |
//! | `boolean`  | `Z`               |
//! | `byte`     | `B`               |
//! | `char`     | `C`               |
//! | `short`    | `S`               |
//! | `int`      | `I`               |
//! | `long`     | `J`               |
//! | `float`    | `F`               |
//! | `double`   | `D`               |
//! | `T[]`      | `[` + code of `T` |
//! | `a.b.C$D`  | `La/b/C$D;`       |
//!
//! Method descriptors are `(` parameter codes `)` return code.

use crate::error::Error;
use crate::model::{MethodDeclaration, PrimitiveKind, TypeRef};
use crate::symbols::{self, SymbolTable};
use std::fmt::Write as _;

const SIG_ARRAY: char = '[';
const SIG_CLASS: char = 'L';
const SIG_CLASS_END: char = ';';

/// A type reference with no native representation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedType {
    /// The offending type as written
    pub type_ref: String,
    /// Why it cannot be mapped
    pub reason: &'static str,
}

impl UnsupportedType {
    fn new(ty: &TypeRef, reason: &'static str) -> Self {
        Self {
            type_ref: ty.to_string(),
            reason,
        }
    }

    /// Attaches the declaring type and member to produce a generator error
    pub fn into_error(self, type_name: &str, member: &str) -> Error {
        Error::unsupported_type(type_name, member, self.type_ref, self.reason)
    }
}

fn primitive_code(kind: PrimitiveKind) -> char {
    match kind {
        PrimitiveKind::Void => 'V',
        PrimitiveKind::Boolean => 'Z',
        PrimitiveKind::Byte => 'B',
        PrimitiveKind::Char => 'C',
        PrimitiveKind::Short => 'S',
        PrimitiveKind::Int => 'I',
        PrimitiveKind::Long => 'J',
        PrimitiveKind::Float => 'F',
        PrimitiveKind::Double => 'D',
    }
}

fn write_descriptor(
    out: &mut String,
    ty: &TypeRef,
    root: &TypeRef,
    in_array: bool,
) -> Result<(), UnsupportedType> {
    match ty {
        TypeRef::Primitive(PrimitiveKind::Void) if in_array => Err(UnsupportedType::new(
            root,
            "void cannot be an array element",
        )),
        TypeRef::Primitive(kind) => {
            out.push(primitive_code(*kind));
            Ok(())
        }
        TypeRef::Object(name) => {
            out.push(SIG_CLASS);
            out.push_str(&name.replace('.', "/"));
            out.push(SIG_CLASS_END);
            Ok(())
        }
        TypeRef::Array(element) => {
            out.push(SIG_ARRAY);
            write_descriptor(out, element, root, true)
        }
        TypeRef::TypeVariable(_) => Err(UnsupportedType::new(
            root,
            "generic type variables have no native descriptor",
        )),
        TypeRef::Wildcard => Err(UnsupportedType::new(
            root,
            "wildcards have no native descriptor",
        )),
    }
}

/// Maps a type reference to its descriptor
///
/// `void` is accepted here; callers that map parameters use
/// [`parameter_descriptor`], which rejects it.
pub fn type_descriptor(ty: &TypeRef) -> Result<String, UnsupportedType> {
    let mut out = String::new();
    write_descriptor(&mut out, ty, ty, false)?;
    Ok(out)
}

/// Concatenated descriptors of a parameter list (no delimiters)
pub fn parameter_descriptor<'a>(
    params: impl IntoIterator<Item = &'a TypeRef>,
) -> Result<String, UnsupportedType> {
    let mut out = String::new();
    for ty in params {
        if ty.is_void() {
            return Err(UnsupportedType::new(ty, "void is only valid as a return type"));
        }
        write_descriptor(&mut out, ty, ty, false)?;
    }
    Ok(out)
}

/// Full method descriptor, e.g. `(ILjava/lang/String;)Z`
pub fn method_descriptor(method: &MethodDeclaration) -> Result<String, UnsupportedType> {
    let params = parameter_descriptor(method.params.iter().map(|p| &p.ty))?;
    let ret = type_descriptor(&method.ret)?;
    Ok(format!("({params}){ret}"))
}

/// Maps a type to the C type used in JNI prototypes
pub fn jni_type(ty: &TypeRef, symbols: &SymbolTable) -> &'static str {
    match ty {
        TypeRef::Primitive(kind) => match kind {
            PrimitiveKind::Void => "void",
            PrimitiveKind::Boolean => "jboolean",
            PrimitiveKind::Byte => "jbyte",
            PrimitiveKind::Char => "jchar",
            PrimitiveKind::Short => "jshort",
            PrimitiveKind::Int => "jint",
            PrimitiveKind::Long => "jlong",
            PrimitiveKind::Float => "jfloat",
            PrimitiveKind::Double => "jdouble",
        },
        TypeRef::Array(element) => match element.as_ref() {
            TypeRef::Primitive(PrimitiveKind::Boolean) => "jbooleanArray",
            TypeRef::Primitive(PrimitiveKind::Byte) => "jbyteArray",
            TypeRef::Primitive(PrimitiveKind::Char) => "jcharArray",
            TypeRef::Primitive(PrimitiveKind::Short) => "jshortArray",
            TypeRef::Primitive(PrimitiveKind::Int) => "jintArray",
            TypeRef::Primitive(PrimitiveKind::Long) => "jlongArray",
            TypeRef::Primitive(PrimitiveKind::Float) => "jfloatArray",
            TypeRef::Primitive(PrimitiveKind::Double) => "jdoubleArray",
            _ => "jobjectArray",
        },
        TypeRef::Object(name) if name == symbols::STRING => "jstring",
        TypeRef::Object(name) if name == symbols::CLASS => "jclass",
        TypeRef::Object(name) if symbols.is_subclass_of(name, symbols::THROWABLE) => "jthrowable",
        TypeRef::Object(_) | TypeRef::TypeVariable(_) | TypeRef::Wildcard => "jobject",
    }
}

/// Name-encoding flavours used in generated C code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// C identifier derived from a class name: `.` and `_` become `_`, `$` becomes `__`
    Class,
    /// JNI short/long name mangling: `_1`, `_2`, `_3`, `_0xxxx`
    Jni,
    /// Field or method stub: `_` kept, everything else non-alphanumeric escaped
    Stub,
}

/// Encodes `name` for use in a C identifier
pub fn encode(name: &str, encoding: Encoding) -> String {
    let mut result = String::with_capacity(name.len() + 8);
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            result.push(ch);
            continue;
        }
        match (encoding, ch) {
            (Encoding::Class, '.' | '_') => result.push('_'),
            (Encoding::Class, '$') => result.push_str("__"),
            (Encoding::Jni, '/' | '.') => result.push('_'),
            (Encoding::Jni, '_') => result.push_str("_1"),
            (Encoding::Jni, ';') => result.push_str("_2"),
            (Encoding::Jni, '[') => result.push_str("_3"),
            (Encoding::Stub, '_') => result.push('_'),
            _ => encode_char(&mut result, ch),
        }
    }
    result
}

/// Writes `_0xxxx` for every UTF-16 unit of `ch`
fn encode_char(out: &mut String, ch: char) {
    let mut units = [0u16; 2];
    for unit in ch.encode_utf16(&mut units).iter() {
        let _ = write!(out, "_0{:04x}", unit);
    }
}

/// Exported JNI function name for a native method
///
/// `overload` carries the parameter descriptor when the method name is
/// shared by several native methods of the type.
pub fn jni_function_name(binary_name: &str, method: &str, overload: Option<&str>) -> String {
    let mut result = String::with_capacity(100);
    result.push_str("Java_");
    result.push_str(&encode(&binary_name.replace('.', "/"), Encoding::Jni));
    result.push('_');
    result.push_str(&encode(method, Encoding::Jni));
    if let Some(params) = overload {
        result.push_str("__");
        result.push_str(&encode(params, Encoding::Jni));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Parameter;

    fn int() -> TypeRef {
        TypeRef::Primitive(PrimitiveKind::Int)
    }

    #[test]
    fn test_primitive_codes() {
        let codes: String = [
            PrimitiveKind::Void,
            PrimitiveKind::Boolean,
            PrimitiveKind::Byte,
            PrimitiveKind::Char,
            PrimitiveKind::Short,
            PrimitiveKind::Int,
            PrimitiveKind::Long,
            PrimitiveKind::Float,
            PrimitiveKind::Double,
        ]
        .into_iter()
        .map(|k| type_descriptor(&TypeRef::Primitive(k)).unwrap())
        .collect();
        assert_eq!(codes, "VZBCSIJFD");
    }

    #[test]
    fn test_object_and_nested_arrays() {
        let ty = TypeRef::array(TypeRef::array(TypeRef::object("com.example.Outer$Inner")));
        assert_eq!(type_descriptor(&ty).unwrap(), "[[Lcom/example/Outer$Inner;");
    }

    #[test]
    fn test_method_descriptor() {
        let method = MethodDeclaration {
            params: vec![
                Parameter { name: "a".into(), ty: int() },
                Parameter { name: "s".into(), ty: TypeRef::object("java.lang.String") },
            ],
            ..MethodDeclaration::native("bar", TypeRef::Primitive(PrimitiveKind::Boolean))
        };
        assert_eq!(method_descriptor(&method).unwrap(), "(ILjava/lang/String;)Z");
    }

    #[test]
    fn test_type_variable_is_unsupported() {
        let err = type_descriptor(&TypeRef::array(TypeRef::TypeVariable("T".into()))).unwrap_err();
        assert_eq!(err.type_ref, "T[]");
        assert!(type_descriptor(&TypeRef::Wildcard).is_err());
    }

    #[test]
    fn test_void_parameter_is_unsupported() {
        let void = TypeRef::Primitive(PrimitiveKind::Void);
        assert!(parameter_descriptor([&void]).is_err());
        assert!(type_descriptor(&TypeRef::array(void)).is_err());
    }

    #[test]
    fn test_jni_types() {
        let mut symbols = SymbolTable::with_java_lang();
        symbols.declare("p.Oops");
        symbols.set_superclass("p.Oops", Some("java.lang.Exception".into()));

        assert_eq!(jni_type(&int(), &symbols), "jint");
        assert_eq!(jni_type(&TypeRef::array(int()), &symbols), "jintArray");
        assert_eq!(
            jni_type(&TypeRef::array(TypeRef::array(int())), &symbols),
            "jobjectArray"
        );
        assert_eq!(jni_type(&TypeRef::object(symbols::STRING), &symbols), "jstring");
        assert_eq!(jni_type(&TypeRef::object(symbols::CLASS), &symbols), "jclass");
        assert_eq!(jni_type(&TypeRef::object("p.Oops"), &symbols), "jthrowable");
        assert_eq!(jni_type(&TypeRef::object("p.Other"), &symbols), "jobject");
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode("com.example.Outer$In_ner", Encoding::Class), "com_example_Outer__In_ner");
        assert_eq!(encode("a/b_c;[", Encoding::Jni), "a_b_1c_2_3");
        assert_eq!(encode("Outer$Inner", Encoding::Jni), "Outer_00024Inner");
        assert_eq!(encode("MAX_SIZE", Encoding::Stub), "MAX_SIZE");
        assert_eq!(encode("é", Encoding::Jni), "_000e9");
    }

    #[test]
    fn test_jni_function_name() {
        assert_eq!(
            jni_function_name("com.example.Foo", "bar", None),
            "Java_com_example_Foo_bar"
        );
        assert_eq!(
            jni_function_name("com.example.Outer$Inner", "do_it", Some("ILjava/lang/String;")),
            "Java_com_example_Outer_00024Inner_do_1it__ILjava_lang_String_2"
        );
    }
}
