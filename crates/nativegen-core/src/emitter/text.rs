//! C preprocessor scaffolding shared by every generated header.

use crate::error::{Error, Result};
use std::fmt::{self, Write};

/// First line of every generated file
pub(crate) const BANNER: &str = "/* DO NOT EDIT THIS FILE - it is machine generated */";

/// Renders into a fresh string
pub(crate) fn render(f: impl FnOnce(&mut String) -> fmt::Result) -> Result<String> {
    let mut out = String::new();
    f(&mut out).map_err(|_| Error::internal("failed to render generated header"))?;
    Ok(out)
}

/// Banner, optional license block and the JNI include
pub(crate) fn file_top(out: &mut String, license: Option<&str>) -> fmt::Result {
    writeln!(out, "{BANNER}")?;
    if let Some(license) = license {
        write_license(out, license)?;
    }
    writeln!(out, "#include <jni.h>")
}

/// Writes `license` as a C block comment, unless it already is one
pub(crate) fn write_license(out: &mut String, license: &str) -> fmt::Result {
    let license = license.trim_end();
    if license.trim_start().starts_with("/*") {
        return writeln!(out, "{license}");
    }
    writeln!(out, "/*")?;
    for line in license.lines() {
        if line.trim().is_empty() {
            writeln!(out, " *")?;
        } else {
            writeln!(out, " *  {}", line.replace("*/", "* /"))?;
        }
    }
    writeln!(out, " */")
}

/// Include guard name, e.g. `_INCLUDED_COM_EXAMPLE_FOO_METHODS`
pub(crate) fn guard_name(cname: &str, kind: &str) -> String {
    format!("_Included_{cname}_{kind}").to_uppercase()
}

pub(crate) fn guard_begin(out: &mut String, guard: &str) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "#ifndef {guard}")?;
    writeln!(out, "#define {guard}")
}

pub(crate) fn guard_end(out: &mut String) -> fmt::Result {
    writeln!(out, "#endif")
}

pub(crate) fn cpp_guard_begin(out: &mut String) -> fmt::Result {
    writeln!(out, "#ifdef __cplusplus")?;
    writeln!(out, "extern \"C\" {{")?;
    writeln!(out, "#endif")
}

pub(crate) fn cpp_guard_end(out: &mut String) -> fmt::Result {
    writeln!(out, "#ifdef __cplusplus")?;
    writeln!(out, "}}")?;
    writeln!(out, "#endif")
}

/// Doc block preceding a prototype or cache slot
pub(crate) fn method_doc(out: &mut String, cname: &str, method: &str, descriptor: &str) -> fmt::Result {
    writeln!(out, "/*")?;
    writeln!(out, " * Class:     {cname}")?;
    writeln!(out, " * Method:    {method}")?;
    writeln!(out, " * Signature: {descriptor}")?;
    writeln!(out, " */")
}

/// Wraps `body` in GCC/clang pragmas silencing `-W<warning>` off Android
///
/// Android's `JNINativeMethod` has `const char *` members, the JDK's does not.
pub(crate) fn without_host_warning(
    out: &mut String,
    warning: &str,
    body: impl FnOnce(&mut String) -> fmt::Result,
) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "#ifndef __ANDROID__")?;
    writeln!(out)?;
    writeln!(out, "#ifdef __GNUC__")?;
    writeln!(out, "#pragma GCC diagnostic push")?;
    writeln!(out, "#pragma GCC diagnostic ignored \"-W{warning}\"")?;
    writeln!(out, "#endif // __GNUC__")?;
    writeln!(out)?;
    writeln!(out, "#ifdef __clang__")?;
    writeln!(out, "#pragma clang diagnostic push")?;
    writeln!(out, "#pragma clang diagnostic ignored \"-W{warning}\"")?;
    writeln!(out, "#endif // __clang__")?;
    writeln!(out)?;
    writeln!(out, "#endif // __ANDROID__")?;
    writeln!(out)?;

    body(out)?;

    writeln!(out)?;
    writeln!(out, "#ifndef __ANDROID__")?;
    writeln!(out)?;
    writeln!(out, "#ifdef __GNUC__")?;
    writeln!(out, "#pragma GCC diagnostic pop")?;
    writeln!(out, "#endif // __GNUC__")?;
    writeln!(out)?;
    writeln!(out, "#ifdef __clang__")?;
    writeln!(out, "#pragma clang diagnostic pop")?;
    writeln!(out, "#endif // __clang__")?;
    writeln!(out)?;
    writeln!(out, "#endif // __ANDROID__")?;
    writeln!(out)
}

/// Escapes a string for a C string literal
pub(crate) fn escape_c_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '?' => result.push_str("\\?"),
            // Octal stops after three digits; a hex escape would swallow what follows.
            _ if c.is_ascii_control() => result.push_str(&format!("\\{:03o}", c as u8)),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_escape_c_string() {
        assert_eq!(escape_c_string("hello"), "hello");
        assert_eq!(escape_c_string("a\\b"), "a\\\\b");
        assert_eq!(escape_c_string("say \"hi\"\n"), "say \\\"hi\\\"\\n");
        assert_eq!(escape_c_string("??="), "\\?\\?=");
        assert_eq!(escape_c_string("a\u{7}b"), "a\\007b");
    }

    #[test]
    fn test_guard_name() {
        assert_eq!(guard_name("com_example_Foo", "METHODS"), "_INCLUDED_COM_EXAMPLE_FOO_METHODS");
    }

    #[test]
    fn test_license_is_wrapped() {
        let text = render(|out| file_top(out, Some("Copyright A\n\nAll rights"))).unwrap();
        assert_eq!(
            text,
            format!("{BANNER}\n/*\n *  Copyright A\n *\n *  All rights\n */\n#include <jni.h>\n")
        );
    }

    #[test]
    fn test_existing_comment_license_kept() {
        let text = render(|out| file_top(out, Some("/* MIT */\n"))).unwrap();
        assert!(text.contains("\n/* MIT */\n#include"));
    }
}
