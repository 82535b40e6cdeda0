//! Name resolution: lowers a [`ParsedUnit`] into a [`CompilationUnit`].

use super::parser::{
    AnnotationSyntax, BaseSyntax, ConstantSyntax, ImportSyntax, Literal, MethodSyntax, ParsedUnit,
    TypeSyntax,
};
use crate::error::{Error, Result};
use crate::model::{
    Annotation, CompilationUnit, ConstantField, ConstantValue, MethodDeclaration, Parameter,
    PrimitiveKind, TypeDeclaration, TypeId, TypeRef,
};
use crate::symbols::SymbolTable;
use std::path::Path;

/// Fully qualified name of the critical-native optimisation annotation
pub const CRITICAL_NATIVE: &str = "dalvik.annotation.optimization.CriticalNative";

/// Converts a dotted qualified name to a binary name by assuming the first
/// capitalised segment is the top-level type
pub(crate) fn binary_from_qualified(qualified: &str) -> String {
    let segments: Vec<&str> = qualified.split('.').collect();
    let top = segments
        .iter()
        .position(|s| s.starts_with(|c: char| c.is_uppercase()))
        .unwrap_or(segments.len().saturating_sub(1));
    let (package, types) = segments.split_at(top);
    let types = types.join("$");
    if package.is_empty() {
        types
    } else {
        format!("{}.{}", package.join("."), types)
    }
}

struct Scope<'a> {
    /// Binary names of the enclosing types, innermost first
    enclosing: Vec<String>,
    /// Type variables visible here, innermost first
    type_vars: Vec<&'a str>,
}

struct Lowerer<'a> {
    path: &'a Path,
    package: Option<&'a str>,
    imports: &'a [ImportSyntax],
    symbols: &'a SymbolTable,
}

impl<'a> Lowerer<'a> {
    fn error(&self, ty: &TypeSyntax, message: impl Into<String>) -> Error {
        Error::compilation(self.path, ty.line, ty.column, message)
    }

    fn qualify(&self, qualified: &str) -> String {
        self.symbols
            .lookup_qualified(qualified)
            .map(str::to_string)
            .unwrap_or_else(|| binary_from_qualified(qualified))
    }

    fn on_demand_imports(&self) -> impl Iterator<Item = &'a ImportSyntax> {
        self.imports.iter().filter(|i| i.on_demand && !i.is_static)
    }

    /// Resolves a simple type name, without the same-package fallback
    fn lookup_simple(&self, name: &str, scope: &Scope<'_>) -> std::result::Result<Option<String>, String> {
        for enclosing in &scope.enclosing {
            let candidate = format!("{enclosing}${name}");
            if self.symbols.contains(&candidate) {
                return Ok(Some(candidate));
            }
            // The enclosing type itself.
            if enclosing.rsplit(['.', '$']).next() == Some(name) {
                return Ok(Some(enclosing.clone()));
            }
        }
        if let Some(import) = self
            .imports
            .iter()
            .find(|i| !i.on_demand && !i.is_static && i.path.rsplit('.').next() == Some(name))
        {
            return Ok(Some(self.qualify(&import.path)));
        }
        if let Some(binary) = self.symbols.package_member(self.package, name) {
            return Ok(Some(binary.to_string()));
        }
        let matches: Vec<&str> = self
            .on_demand_imports()
            .filter_map(|i| self.symbols.lookup_qualified(&format!("{}.{name}", i.path)))
            .collect();
        match matches.as_slice() {
            [one] => return Ok(Some(one.to_string())),
            [first, second, ..] => {
                return Err(format!(
                    "reference to {name} is ambiguous: both {first} and {second} match"
                ))
            }
            [] => {}
        }
        if let Some(binary) = self.symbols.java_lang(name) {
            return Ok(Some(binary.to_string()));
        }
        Ok(None)
    }

    fn resolve_type(&self, ty: &TypeSyntax, scope: &Scope<'_>) -> Result<TypeRef> {
        let base = match &ty.base {
            BaseSyntax::Primitive(kind) => TypeRef::Primitive(*kind),
            BaseSyntax::Wildcard => TypeRef::Wildcard,
            BaseSyntax::Named(segments) => {
                let first = segments[0].as_str();
                if segments.len() == 1 && scope.type_vars.contains(&first) {
                    TypeRef::TypeVariable(first.to_string())
                } else {
                    match self.lookup_simple(first, scope).map_err(|m| self.error(ty, m))? {
                        Some(binary) => {
                            let mut binary = binary;
                            for segment in &segments[1..] {
                                binary.push('$');
                                binary.push_str(segment);
                            }
                            TypeRef::Object(binary)
                        }
                        None if segments.len() > 1 => TypeRef::Object(self.qualify(&segments.join("."))),
                        None if self.on_demand_imports().next().is_none() => {
                            let binary = match self.package {
                                Some(pkg) => format!("{pkg}.{first}"),
                                None => first.to_string(),
                            };
                            TypeRef::Object(binary)
                        }
                        None => {
                            return Err(self.error(ty, format!("cannot find symbol: class {first}")));
                        }
                    }
                }
            }
        };
        Ok((0..ty.dims).fold(base, |acc, _| TypeRef::array(acc)))
    }

    /// Resolution for positions that never reach generated code; failures
    /// fall back to the written name
    fn resolve_type_lenient(&self, ty: &TypeSyntax, scope: &Scope<'_>) -> TypeRef {
        self.resolve_type(ty, scope).unwrap_or_else(|_| {
            let base = match &ty.base {
                BaseSyntax::Named(segments) => TypeRef::Object(binary_from_qualified(&segments.join("."))),
                BaseSyntax::Primitive(kind) => TypeRef::Primitive(*kind),
                BaseSyntax::Wildcard => TypeRef::Wildcard,
            };
            (0..ty.dims).fold(base, |acc, _| TypeRef::array(acc))
        })
    }

    /// Annotation names resolve leniently: unknown names keep their written form
    fn resolve_annotation(&self, annotation: &AnnotationSyntax, scope: &Scope<'_>) -> Annotation {
        let resolved = if annotation.name.contains('.') {
            self.qualify(&annotation.name)
        } else {
            match self.lookup_simple(&annotation.name, scope) {
                Ok(Some(binary)) => binary,
                _ => annotation.name.clone(),
            }
        };
        Annotation {
            name: annotation.name.clone(),
            resolved: resolved.replace('$', "."),
            arguments: annotation.arguments.clone(),
        }
    }

    fn lower_method(&self, method: &MethodSyntax, scope: &Scope<'_>) -> Result<MethodDeclaration> {
        let scope = Scope {
            enclosing: scope.enclosing.clone(),
            type_vars: method
                .type_params
                .iter()
                .map(String::as_str)
                .chain(scope.type_vars.iter().copied())
                .collect(),
        };
        let resolve = |ty: &TypeSyntax| {
            if method.modifiers.is_native {
                self.resolve_type(ty, &scope)
            } else {
                Ok(self.resolve_type_lenient(ty, &scope))
            }
        };
        let params = method
            .params
            .iter()
            .map(|(name, ty)| {
                Ok(Parameter {
                    name: name.clone(),
                    ty: resolve(ty)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let is_critical = method
            .modifiers
            .annotations
            .iter()
            .any(|a| self.resolve_annotation(a, &scope).resolved == CRITICAL_NATIVE);
        Ok(MethodDeclaration {
            name: method.name.clone(),
            params,
            ret: resolve(&method.ret)?,
            is_native: method.modifiers.is_native,
            is_static: method.modifiers.is_static,
            is_critical,
            line: method.line,
        })
    }

    fn lower_constant(&self, constant: &ConstantSyntax, scope: &Scope<'_>) -> Result<Option<ConstantField>> {
        let ty = self.resolve_type(&constant.ty, scope)?;
        let TypeRef::Primitive(kind) = ty else {
            return Ok(None);
        };
        let value = match (&constant.literal, kind) {
            (Literal::Bool(b), PrimitiveKind::Boolean) => ConstantValue::Bool(*b),
            (Literal::Char(c), PrimitiveKind::Char | PrimitiveKind::Int | PrimitiveKind::Long) => {
                ConstantValue::Int(*c as i64)
            }
            (Literal::Number { text, negative }, PrimitiveKind::Float | PrimitiveKind::Double) => {
                ConstantValue::Float(float_text(text, *negative))
            }
            (Literal::Number { text, negative }, _) => match integer_value(text, *negative, kind) {
                Some(v) => ConstantValue::Int(v),
                None => return Ok(None),
            },
            _ => return Ok(None),
        };
        Ok(Some(ConstantField {
            name: constant.name.clone(),
            ty,
            value,
        }))
    }
}

/// Parses an integral literal and narrows it to the declared kind
fn integer_value(text: &str, negative: bool, kind: PrimitiveKind) -> Option<i64> {
    let clean: String = text.chars().filter(|c| *c != '_').collect();
    let clean = clean.trim_end_matches(['l', 'L']);
    let (digits, radix) = if let Some(hex) = clean.strip_prefix("0x").or_else(|| clean.strip_prefix("0X")) {
        (hex, 16)
    } else if let Some(bin) = clean.strip_prefix("0b").or_else(|| clean.strip_prefix("0B")) {
        (bin, 2)
    } else if clean.len() > 1 && clean.starts_with('0') {
        (&clean[1..], 8)
    } else {
        (clean, 10)
    };
    let raw = i128::from(u64::from_str_radix(digits, radix).ok()?);
    // Negate before narrowing so `-128` stays in range for `byte`.
    let signed = if negative { -raw } else { raw };
    let value = match kind {
        PrimitiveKind::Long => signed as i64,
        PrimitiveKind::Int => signed as i32 as i64,
        PrimitiveKind::Short => signed as i16 as i64,
        PrimitiveKind::Byte => signed as i8 as i64,
        PrimitiveKind::Char => signed as u16 as i64,
        _ => return None,
    };
    Some(value)
}

/// Normalises a floating literal: no suffix or underscores, always a decimal
/// point or, for hex literals, a binary exponent
fn float_text(text: &str, negative: bool) -> String {
    let mut clean: String = text.chars().filter(|c| *c != '_').collect();
    let hex = clean.starts_with("0x") || clean.starts_with("0X");
    // In hex literals `f`/`d` are digits unless a binary exponent precedes them.
    if clean.ends_with(['f', 'F', 'd', 'D']) && (!hex || clean.contains(['p', 'P'])) {
        clean.pop();
    }
    if hex {
        if !clean.contains(['p', 'P']) {
            clean.push_str("p0");
        }
    } else if !clean.contains(['.', 'e', 'E']) {
        clean.push_str(".0");
    }
    if negative {
        format!("-{clean}")
    } else {
        clean
    }
}

/// Lowers `parsed` into the declaration model, resolving every type name
pub(crate) fn lower(parsed: &ParsedUnit, symbols: &SymbolTable) -> Result<CompilationUnit> {
    let lowerer = Lowerer {
        path: &parsed.path,
        package: parsed.package.as_deref(),
        imports: &parsed.imports,
        symbols,
    };
    let binary_names = parsed.binary_names();
    let mut unit = CompilationUnit::new(parsed.path.clone(), parsed.package.clone());

    // The arena is ordered parent-before-child, so ids line up with syntax indices.
    for (idx, syntax) in parsed.types.iter().enumerate() {
        let mut enclosing = Vec::new();
        let mut type_vars = Vec::new();
        let mut current = Some(idx);
        while let Some(cur) = current {
            enclosing.push(binary_names[cur].clone());
            type_vars.extend(parsed.types[cur].type_params.iter().map(String::as_str));
            current = parsed.types[cur].parent;
        }
        let scope = Scope {
            enclosing,
            type_vars,
        };

        let mut decl = TypeDeclaration::new(syntax.name.clone(), binary_names[idx].clone());
        decl.kind = syntax.kind;
        decl.line = syntax.line;
        decl.superclass = syntax
            .superclass
            .as_ref()
            .map(|s| lowerer.resolve_type_lenient(s, &scope));
        decl.annotations = syntax
            .annotations
            .iter()
            .map(|a| lowerer.resolve_annotation(a, &scope))
            .collect();
        decl.methods = syntax
            .methods
            .iter()
            .map(|m| lowerer.lower_method(m, &scope))
            .collect::<Result<_>>()?;
        for constant in &syntax.constants {
            if let Some(field) = lowerer.lower_constant(constant, &scope)? {
                decl.constants.push(field);
            }
        }

        let id = unit.add_type(syntax.parent.map(TypeId), decl);
        debug_assert_eq!(id.index(), idx);
    }
    Ok(unit)
}

#[cfg(test)]
mod tests {
    use super::super::parser::parse;
    use super::*;

    fn lower_source(source: &str, symbols: &mut SymbolTable) -> Result<CompilationUnit> {
        let parsed = parse(Path::new("Test.java"), source)?;
        for name in parsed.binary_names() {
            symbols.declare(&name);
        }
        lower(&parsed, symbols)
    }

    #[test]
    fn test_binary_from_qualified() {
        assert_eq!(binary_from_qualified("java.util.Map.Entry"), "java.util.Map$Entry");
        assert_eq!(binary_from_qualified("Foo"), "Foo");
        assert_eq!(binary_from_qualified("a.b.c"), "a.b.c");
    }

    #[test]
    fn test_resolution_order() {
        let mut symbols = SymbolTable::with_java_lang();
        symbols.declare("com.lib.Widget");
        let unit = lower_source(
            r#"
            package com.app;
            import java.util.List;
            import com.lib.*;
            class Host<T> {
                class Node {}
                native void a(Node n, List<String> l, Widget w, String s, T t, Host h, java.io.File f);
                native Map.Entry b();
            }
            class Map { static class Entry {} }
            "#,
            &mut symbols,
        )
        .unwrap();
        let host = unit.get(unit.roots()[0]);
        let types: Vec<String> = host.methods[0].params.iter().map(|p| p.ty.to_string()).collect();
        assert_eq!(
            types,
            vec![
                "com.app.Host$Node",
                "java.util.List",
                "com.lib.Widget",
                "java.lang.String",
                "T",
                "com.app.Host",
                "java.io.File",
            ]
        );
        assert_eq!(host.methods[0].params[4].ty, TypeRef::TypeVariable("T".into()));
        assert_eq!(host.methods[1].ret, TypeRef::object("com.app.Map$Entry"));
    }

    #[test]
    fn test_unknown_name_with_on_demand_import_fails() {
        let mut symbols = SymbolTable::with_java_lang();
        let err = lower_source(
            "package p; import q.*; class A { native Missing m(); }",
            &mut symbols,
        )
        .unwrap_err();
        assert!(err.to_string().contains("cannot find symbol: class Missing"), "{err}");
    }

    #[test]
    fn test_non_native_methods_resolve_leniently() {
        let mut symbols = SymbolTable::with_java_lang();
        let unit = lower_source(
            "package p; import q.*; class A extends Base { Missing m() { return null; } }",
            &mut symbols,
        )
        .unwrap();
        let a = unit.get(unit.roots()[0]);
        assert_eq!(a.methods[0].ret, TypeRef::object("Missing"));
        assert_eq!(a.superclass, Some(TypeRef::object("Base")));
    }

    #[test]
    fn test_unknown_name_without_on_demand_import_is_same_package() {
        let mut symbols = SymbolTable::with_java_lang();
        let unit = lower_source("package p; class A { native Peer m(); }", &mut symbols).unwrap();
        assert_eq!(unit.get(unit.roots()[0]).methods[0].ret, TypeRef::object("p.Peer"));
    }

    #[test]
    fn test_ambiguous_on_demand_import() {
        let mut symbols = SymbolTable::with_java_lang();
        symbols.declare("a.Thing");
        symbols.declare("b.Thing");
        let err = lower_source(
            "import a.*; import b.*; class A { native void m(Thing t); }",
            &mut symbols,
        )
        .unwrap_err();
        assert!(err.to_string().contains("ambiguous"));
    }

    #[test]
    fn test_critical_native_and_annotations() {
        let mut symbols = SymbolTable::with_java_lang();
        let unit = lower_source(
            r#"
            import dalvik.annotation.optimization.CriticalNative;
            @com.example.GenerateNativeHeaders("x")
            class A { @CriticalNative static native int add(int a, int b); }
            "#,
            &mut symbols,
        )
        .unwrap();
        let a = unit.get(unit.roots()[0]);
        assert!(a.methods[0].is_critical);
        assert_eq!(a.annotations[0].resolved, "com.example.GenerateNativeHeaders");
    }

    #[test]
    fn test_minimum_integral_values_keep_their_sign() {
        let mut symbols = SymbolTable::with_java_lang();
        let unit = lower_source(
            r#"
            class Limits {
                static final byte B = -128;
                static final short S = -32768;
                static final int I = -2147483648;
                static final long L = -9223372036854775808L;
                static final int HEX = -0x80000000;
            }
            "#,
            &mut symbols,
        )
        .unwrap();
        let values: Vec<_> = unit.get(unit.roots()[0]).constants.iter().map(|c| c.value.clone()).collect();
        assert_eq!(
            values,
            vec![
                ConstantValue::Int(-128),
                ConstantValue::Int(-32768),
                ConstantValue::Int(-2147483648),
                ConstantValue::Int(i64::MIN),
                ConstantValue::Int(-2147483648),
            ]
        );
    }

    #[test]
    fn test_float_text() {
        assert_eq!(float_text("0x1.8p1f", false), "0x1.8p1");
        assert_eq!(float_text("0x1Fp-2d", true), "-0x1Fp-2");
        assert_eq!(float_text("0xFF", false), "0xFFp0");
        assert_eq!(float_text("1_000d", false), "1000.0");
        assert_eq!(float_text("1e3F", false), "1e3");
    }

    #[test]
    fn test_constant_values() {
        let mut symbols = SymbolTable::with_java_lang();
        let unit = lower_source(
            r#"
            class K {
                static final int ALL = 0xFFFFFFFF;
                static final long BIG = 1_000L;
                static final byte B = -2;
                static final char C = 'A';
                static final double D = 2;
                static final float F = 1.5f;
                static final boolean ON = true;
                static final Object NOPE = null;
            }
            "#,
            &mut symbols,
        )
        .unwrap();
        let values: Vec<_> = unit.get(unit.roots()[0]).constants.iter().map(|c| c.value.clone()).collect();
        assert_eq!(
            values,
            vec![
                ConstantValue::Int(-1),
                ConstantValue::Int(1000),
                ConstantValue::Int(-2),
                ConstantValue::Int(65),
                ConstantValue::Float("2.0".into()),
                ConstantValue::Float("1.5".into()),
                ConstantValue::Bool(true),
            ]
        );
    }
}
