//! Binding marker resolution.
//!
//! A type is a generation target when it carries the configured marker
//! annotation exactly once, with a non-empty string output-name:
//!
//! ```java
//! @GenerateNativeHeaders("foo")            // shorthand
//! @GenerateNativeHeaders(value = "foo")    // named element
//! ```

use crate::error::{Error, Result};
use crate::model::{Annotation, AnnotationValue, CompilationUnit, TypeId};
use tracing::trace;

/// Marker annotation recognised when none is configured
pub const DEFAULT_MARKER: &str = "GenerateNativeHeaders";

/// Element of the marker carrying the output-name
const OUTPUT_NAME_ELEMENT: &str = "value";

/// Returns true if `annotation` is the configured marker
///
/// A qualified marker must match the resolved annotation name; a simple
/// marker matches by simple name.
pub fn is_marker(annotation: &Annotation, marker: &str) -> bool {
    if marker.contains('.') {
        annotation.resolved == marker
    } else {
        annotation.simple_name() == marker
    }
}

/// Determines whether the type carries the marker and extracts its output-name
pub fn resolve(unit: &CompilationUnit, id: TypeId, marker: &str) -> Result<Option<String>> {
    let decl = unit.get(id);
    let mut markers = decl.annotations.iter().filter(|a| is_marker(a, marker));

    let Some(annotation) = markers.next() else {
        return Ok(None);
    };
    let invalid = |reason: String| Error::missing_annotation_value(unit.path(), &decl.binary_name, reason);

    if markers.next().is_some() {
        return Err(invalid(format!("@{marker} is applied more than once")));
    }

    let name = match annotation.argument(OUTPUT_NAME_ELEMENT) {
        Some(AnnotationValue::Str(name)) if !name.is_empty() => name,
        Some(AnnotationValue::Str(_)) => {
            return Err(invalid(format!("@{marker} has an empty output name")));
        }
        Some(AnnotationValue::Expr(expr)) => {
            return Err(invalid(format!(
                "@{marker} output name must be a string literal, found '{expr}'"
            )));
        }
        None => return Err(invalid(format!("@{marker} is missing its output name"))),
    };

    validate_output_name(name)?;
    trace!("{} is marked with output name '{}'", decl.binary_name, name);
    Ok(Some(name.clone()))
}

/// Checks that an output-name is a single, safe file-name component
pub fn validate_output_name(name: &str) -> Result<()> {
    let safe = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if !safe || name.contains("..") || name.starts_with('.') {
        return Err(Error::path_traversal(name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TypeDeclaration;

    fn marker(resolved: &str, args: Vec<(&str, AnnotationValue)>) -> Annotation {
        Annotation {
            name: resolved.rsplit('.').next().unwrap_or(resolved).to_string(),
            resolved: resolved.to_string(),
            arguments: args.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }

    fn unit_with(annotations: Vec<Annotation>) -> (CompilationUnit, TypeId) {
        let mut unit = CompilationUnit::new("src/Foo.java", Some("p".into()));
        let mut decl = TypeDeclaration::new("Foo", "p.Foo");
        decl.annotations = annotations;
        let id = unit.add_type(None, decl);
        (unit, id)
    }

    fn str_value(s: &str) -> AnnotationValue {
        AnnotationValue::Str(s.to_string())
    }

    #[test]
    fn test_unmarked_type() {
        let (unit, id) = unit_with(vec![marker("java.lang.Deprecated", vec![])]);
        assert_eq!(resolve(&unit, id, DEFAULT_MARKER).unwrap(), None);
    }

    #[test]
    fn test_shorthand_and_named_value() {
        let (unit, id) = unit_with(vec![marker("p.GenerateNativeHeaders", vec![("value", str_value("foo"))])]);
        assert_eq!(resolve(&unit, id, DEFAULT_MARKER).unwrap().as_deref(), Some("foo"));
    }

    #[test]
    fn test_qualified_marker_matches_resolved_name() {
        let (unit, id) = unit_with(vec![marker("a.GenerateNativeHeaders", vec![("value", str_value("foo"))])]);
        assert_eq!(resolve(&unit, id, "b.GenerateNativeHeaders").unwrap(), None);
        assert!(resolve(&unit, id, "a.GenerateNativeHeaders").unwrap().is_some());
    }

    #[test]
    fn test_missing_and_empty_values() {
        for args in [
            vec![],
            vec![("value", str_value(""))],
            vec![("value", AnnotationValue::Expr("NAME".into()))],
        ] {
            let (unit, id) = unit_with(vec![marker("GenerateNativeHeaders", args)]);
            let err = resolve(&unit, id, DEFAULT_MARKER).unwrap_err();
            assert!(matches!(err, Error::MissingAnnotationValue { .. }), "{err}");
        }
    }

    #[test]
    fn test_repeated_marker_is_error() {
        let (unit, id) = unit_with(vec![
            marker("GenerateNativeHeaders", vec![("value", str_value("a"))]),
            marker("GenerateNativeHeaders", vec![("value", str_value("b"))]),
        ]);
        let err = resolve(&unit, id, DEFAULT_MARKER).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_output_name_must_be_single_component() {
        assert!(validate_output_name("foo_bar-1.x").is_ok());
        for name in ["../foo", "a/b", "a\\b", "..", ".hidden", "with space"] {
            assert!(
                matches!(validate_output_name(name), Err(Error::PathTraversal { .. })),
                "{name}"
            );
        }
    }
}
