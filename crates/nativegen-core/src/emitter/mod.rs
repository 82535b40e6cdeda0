//! Per-type header generation.
//!
//! Every marked type gets two headers, keyed by its output-name `N`:
//!
//! - `ts_N.h`: constants and one exported JNI prototype per native method
//! - `ts_N_sigs.h`: one cached [`JNINativeMethod`] slot per native method,
//!   the type's method table and registration macros
//!
//! Nested types are never folded into their parent; each marked type is
//! emitted on its own. Output is a pure function of the declaration.
//!
//! ## Symbols
//!
//! Cache slots are named after the nested simple-name chain and the method,
//! e.g. `Outer_Inner_parse`. Overloaded methods append `__<n>`, their index
//! in declaration order among the natives sharing the name.
//!
//! [`JNINativeMethod`]: https://docs.oracle.com/javase/8/docs/technotes/guides/jni/spec/functions.html#RegisterNatives

pub(crate) mod text;

use crate::config::GeneratorConfig;
use crate::descriptor::{self, Encoding};
use crate::error::{Error, Result};
use crate::model::{
    CompilationUnit, ConstantField, ConstantValue, GeneratedArtifact, MethodDeclaration, Parameter,
    PrimitiveKind, RegistrationEntry, TypeDeclaration, TypeRef,
};
use crate::scanner::MarkedType;
use crate::symbols::SymbolTable;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write};
use tracing::debug;

/// Name of the optional registration hook
pub const REGISTER_NATIVES: &str = "registerNatives";

/// `static final` constants of the module's types, by binary name
pub type ModuleConstants = BTreeMap<String, Vec<ConstantField>>;

/// Identifiers a Java parameter may use but a C++ prototype may not: the
/// implicit JNI parameters, JNI type names and C/C++ keywords Java lacks
const RESERVED_PARAMETER_NAMES: &[&str] = &[
    "JNIEnv", "alignas", "alignof", "and", "and_eq", "asm", "auto", "bitand", "bitor", "clazz",
    "co_await", "co_return", "co_yield", "compl", "concept", "consteval", "constexpr", "constinit",
    "const_cast", "decltype", "delete", "dynamic_cast", "env", "explicit", "export", "extern",
    "friend", "inline", "jarray", "jboolean", "jbooleanArray", "jbyte", "jbyteArray", "jchar",
    "jcharArray", "jclass", "jdouble", "jdoubleArray", "jfloat", "jfloatArray", "jint",
    "jintArray", "jlong", "jlongArray", "jobject", "jobjectArray", "jshort", "jshortArray",
    "jsize", "jstring", "jthrowable", "mutable", "namespace", "noexcept", "not", "not_eq",
    "nullptr", "operator", "or", "or_eq", "register", "reinterpret_cast", "requires", "restrict",
    "self", "signed", "sizeof", "static_assert", "static_cast", "struct", "template",
    "thread_local", "typedef", "typeid", "typename", "union", "unsigned", "using", "virtual",
    "wchar_t", "xor", "xor_eq",
];

/// Headers and registration entries generated for one marked type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    /// The marker's output-name
    pub output_name: String,
    /// Binary name of the emitted type
    pub binary_name: String,
    /// `ts_N.h`
    pub declarations: GeneratedArtifact,
    /// `ts_N_sigs.h`
    pub signatures: GeneratedArtifact,
    /// One entry per cached native method, in declaration order
    pub entries: Vec<RegistrationEntry>,
    /// Every C symbol `ts_N_sigs.h` defines
    pub symbols: Vec<String>,
}

/// A native method with everything needed to render it
#[derive(Debug)]
struct NativeMethod<'a> {
    decl: &'a MethodDeclaration,
    descriptor: String,
    function: String,
    /// Cache slot, absent for the registration hook
    slot: Option<String>,
}

/// Symbols shared by a type's cache slots
#[derive(Debug)]
struct TypeSymbols {
    /// C identifier of the binary name (`com_example_Outer__Inner`)
    cname: String,
    /// Nested simple-name chain (`Outer_Inner`)
    prefix: String,
    table: String,
    count: String,
}

/// Generates the two per-type headers
#[derive(Debug, Clone, Copy)]
pub struct HeaderEmitter<'a> {
    config: &'a GeneratorConfig,
    symbols: &'a SymbolTable,
    constants: Option<&'a ModuleConstants>,
}

impl<'a> HeaderEmitter<'a> {
    /// Creates an emitter using `symbols` for JNI type mapping
    pub fn new(config: &'a GeneratorConfig, symbols: &'a SymbolTable) -> Self {
        Self {
            config,
            symbols,
            constants: None,
        }
    }

    /// Makes constants of supertypes declared in the module visible, so
    /// they are emitted under the subclass's name
    pub fn with_module_constants(mut self, constants: &'a ModuleConstants) -> Self {
        self.constants = Some(constants);
        self
    }

    /// Constants to emit for `decl`: inherited ones from the outermost
    /// superclass down, then its own
    fn statics<'d>(&self, decl: &'d TypeDeclaration) -> Vec<&'d ConstantField>
    where
        'a: 'd,
    {
        let mut chain = Vec::new();
        if let Some(constants) = self.constants {
            let mut current = self.symbols.superclass(&decl.binary_name);
            while let Some(name) = current {
                if chain.len() > self.symbols.len() {
                    break;
                }
                chain.push(constants.get(name).map(Vec::as_slice).unwrap_or_default());
                current = self.symbols.superclass(name);
            }
        }
        chain
            .into_iter()
            .rev()
            .flatten()
            .chain(&decl.constants)
            .collect()
    }

    /// Emits the headers of one marked type
    pub fn emit(&self, unit: &CompilationUnit, marked: &MarkedType) -> Result<Emission> {
        let decl = unit.get(marked.id);
        let prefix = unit
            .name_chain(marked.id)
            .iter()
            .map(|name| descriptor::encode(name, Encoding::Stub))
            .collect::<Vec<_>>()
            .join("_");
        let names = TypeSymbols {
            cname: descriptor::encode(&decl.binary_name, Encoding::Class),
            table: format!("{prefix}_METHODS"),
            count: format!("{prefix}_METHOD_COUNT"),
            prefix,
        };

        let methods = prepare_methods(decl, &names.prefix)?;
        let symbols = defined_symbols(decl, &names, &methods)?;
        let class_name = decl.binary_name.replace('.', "/");
        let entries = methods
            .iter()
            .filter_map(|m| {
                m.slot.as_ref().map(|slot| RegistrationEntry {
                    class_name: class_name.clone(),
                    method: m.decl.name.clone(),
                    descriptor: m.descriptor.clone(),
                    symbol: slot.clone(),
                    table: names.table.clone(),
                })
            })
            .collect::<Vec<_>>();

        let declarations = text::render(|out| self.write_declarations(out, decl, &names, &methods))?;
        let signatures = text::render(|out| write_signatures(out, &names, &methods))?;

        debug!(
            "Emitted {} ({} native methods, {} cached) as '{}'",
            decl.binary_name,
            methods.len(),
            entries.len(),
            marked.output_name
        );

        Ok(Emission {
            output_name: marked.output_name.clone(),
            binary_name: decl.binary_name.clone(),
            declarations: GeneratedArtifact::new(
                format!("{}{}.h", self.config.prefix, marked.output_name),
                declarations,
            ),
            signatures: GeneratedArtifact::new(
                format!("{}{}_sigs.h", self.config.prefix, marked.output_name),
                signatures,
            ),
            entries,
            symbols,
        })
    }

    fn write_declarations(
        &self,
        out: &mut String,
        decl: &TypeDeclaration,
        names: &TypeSymbols,
        methods: &[NativeMethod<'_>],
    ) -> fmt::Result {
        text::file_top(out, self.config.license_header.as_deref())?;
        text::guard_begin(out, &text::guard_name(&names.cname, "METHODS"))?;
        text::cpp_guard_begin(out)?;

        for constant in self.statics(decl) {
            write_constant(out, &names.cname, constant)?;
        }

        for method in methods {
            text::method_doc(
                out,
                &names.cname,
                &descriptor::encode(&method.decl.name, Encoding::Stub),
                &method.descriptor,
            )?;
            writeln!(
                out,
                "JNIEXPORT {} JNICALL {}",
                descriptor::jni_type(&method.decl.ret, self.symbols),
                method.function
            )?;

            let mut params = Vec::with_capacity(method.decl.params.len() + 2);
            if !method.decl.is_critical {
                params.push("JNIEnv *env".to_string());
                params.push(if method.decl.is_static { "jclass clazz" } else { "jobject self" }.to_string());
            }
            for (param, name) in method.decl.params.iter().zip(parameter_names(&method.decl.params)) {
                params.push(format!("{} {}", descriptor::jni_type(&param.ty, self.symbols), name));
            }
            if params.is_empty() {
                params.push("void".to_string());
            }
            writeln!(out, "  ({});", params.join(", "))?;
            writeln!(out)?;
        }

        text::cpp_guard_end(out)?;
        text::guard_end(out)
    }
}

/// Validates the type's native methods and assigns their names
fn prepare_methods<'d>(decl: &'d TypeDeclaration, prefix: &str) -> Result<Vec<NativeMethod<'d>>> {
    let mut shared: BTreeMap<&str, usize> = BTreeMap::new();
    for method in decl.native_methods() {
        *shared.entry(method.name.as_str()).or_default() += 1;
    }

    let mut seen = BTreeSet::new();
    let mut overload_index: BTreeMap<&str, usize> = BTreeMap::new();
    let mut methods = Vec::new();

    for method in decl.native_methods() {
        let unsupported = |e: descriptor::UnsupportedType| e.into_error(&decl.binary_name, &method.name);
        let method_descriptor = descriptor::method_descriptor(method).map_err(unsupported)?;

        if !seen.insert((method.name.as_str(), method_descriptor.clone())) {
            return Err(Error::DuplicateNativeMethod {
                type_name: decl.binary_name.clone(),
                method: method.name.clone(),
                descriptor: method_descriptor,
            });
        }

        let overloaded = shared.get(method.name.as_str()).copied().unwrap_or(0) > 1;
        let function = if overloaded {
            let params = descriptor::parameter_descriptor(method.params.iter().map(|p| &p.ty))
                .map_err(unsupported)?;
            descriptor::jni_function_name(&decl.binary_name, &method.name, Some(&params))
        } else {
            descriptor::jni_function_name(&decl.binary_name, &method.name, None)
        };

        let slot = if method.name == REGISTER_NATIVES {
            validate_hook(decl, method)?;
            None
        } else {
            let mut slot = format!("{prefix}_{}", descriptor::encode(&method.name, Encoding::Stub));
            if overloaded {
                let n = overload_index.entry(method.name.as_str()).or_default();
                slot.push_str(&format!("__{n}"));
                *n += 1;
            }
            Some(slot)
        };

        methods.push(NativeMethod {
            decl: method,
            descriptor: method_descriptor,
            function,
            slot,
        });
    }
    Ok(methods)
}

/// The hook must be `static native void registerNatives()`
fn validate_hook(decl: &TypeDeclaration, method: &MethodDeclaration) -> Result<()> {
    let invalid = |reason: String| Error::invalid_registration_hook(&decl.binary_name, reason);
    if !method.is_static {
        return Err(invalid(format!("{REGISTER_NATIVES} must be static")));
    }
    if !method.params.is_empty() {
        return Err(invalid(format!("{REGISTER_NATIVES} must not have any parameters")));
    }
    if !method.ret.is_void() {
        return Err(invalid(format!(
            "{REGISTER_NATIVES} must return 'void', found '{}'",
            method.ret
        )));
    }
    Ok(())
}

/// Lists every symbol the signatures header defines, rejecting duplicates
fn defined_symbols(
    decl: &TypeDeclaration,
    names: &TypeSymbols,
    methods: &[NativeMethod<'_>],
) -> Result<Vec<String>> {
    let mut symbols = vec![
        names.table.clone(),
        names.count.clone(),
        format!("{}_RegisterNatives", names.prefix),
    ];
    for slot in methods.iter().filter_map(|m| m.slot.as_ref()) {
        symbols.push(slot.clone());
        symbols.push(format!("{slot}__ARR_IDX"));
        symbols.push(format!("{slot}__SIG"));
        symbols.push(format!("{slot}__TABLE"));
    }

    let mut unique = BTreeSet::new();
    for symbol in &symbols {
        if !unique.insert(symbol.as_str()) {
            return Err(Error::symbol_collision(&decl.binary_name, symbol));
        }
    }
    Ok(symbols)
}

/// C names for the parameters: reserved names get a `_` suffix, repeated
/// until unique within the list
fn parameter_names(params: &[Parameter]) -> Vec<String> {
    let mut taken: BTreeSet<String> = params.iter().map(|p| p.name.clone()).collect();
    params
        .iter()
        .map(|param| {
            if !RESERVED_PARAMETER_NAMES.contains(&param.name.as_str()) {
                return param.name.clone();
            }
            let mut name = format!("{}_", param.name);
            while taken.contains(&name) {
                name.push('_');
            }
            taken.insert(name.clone());
            name
        })
        .collect()
}

fn write_constant(out: &mut String, cname: &str, constant: &ConstantField) -> fmt::Result {
    let TypeRef::Primitive(kind) = constant.ty else {
        return Ok(());
    };
    let value = match (&constant.value, kind) {
        (ConstantValue::Bool(true), _) => "1L".to_string(),
        (ConstantValue::Bool(false), _) => "0L".to_string(),
        // `-9223372036854775808LL` negates an out-of-range literal.
        (ConstantValue::Int(i64::MIN), PrimitiveKind::Long) => "(-9223372036854775807LL - 1)".to_string(),
        (ConstantValue::Int(v), PrimitiveKind::Long) => format!("{v}LL"),
        (ConstantValue::Int(v), _) => format!("{v}L"),
        (ConstantValue::Float(v), PrimitiveKind::Float) => format!("{v}f"),
        (ConstantValue::Float(v), _) => v.clone(),
    };
    let name = format!("{cname}_{}", descriptor::encode(&constant.name, Encoding::Stub));
    writeln!(out, "#undef {name}")?;
    writeln!(out, "#define {name} {value}")
}

fn write_signatures(out: &mut String, names: &TypeSymbols, methods: &[NativeMethod<'_>]) -> fmt::Result {
    text::file_top(out, None)?;
    text::guard_begin(out, &text::guard_name(&names.cname, "METHOD_SIGNATURES"))?;

    let slots: Vec<(&NativeMethod<'_>, &str)> = methods
        .iter()
        .filter_map(|m| m.slot.as_deref().map(|slot| (m, slot)))
        .collect();

    for (idx, (method, slot)) in slots.iter().enumerate() {
        let name = text::escape_c_string(&method.decl.name);
        let signature = text::escape_c_string(&method.descriptor);

        writeln!(out)?;
        text::method_doc(
            out,
            &names.cname,
            &descriptor::encode(&method.decl.name, Encoding::Stub),
            &method.descriptor,
        )?;
        writeln!(out, "#define {slot}__ARR_IDX {idx}")?;
        writeln!(out, "#define {slot}__SIG \"{signature}\"")?;
        writeln!(out, "#define {slot}__TABLE {}", names.table)?;
        text::without_host_warning(out, "write-strings", |o| {
            writeln!(o, "static JNINativeMethod {slot} = {{")?;
            writeln!(o, "    .name = \"{name}\",")?;
            writeln!(o, "    .signature = {slot}__SIG,")?;
            writeln!(o, "    .fnPtr = nullptr")?;
            writeln!(o, "}};")
        })?;
    }
    writeln!(out)?;

    if slots.is_empty() {
        writeln!(out, "static JNINativeMethod *{} = nullptr;", names.table)?;
    } else {
        writeln!(out, "static JNINativeMethod {}[] = {{", names.table)?;
        for (_, slot) in &slots {
            writeln!(out, "    {slot},")?;
        }
        writeln!(out, "}};")?;
    }
    writeln!(out, "#define {} {}", names.count, slots.len())?;

    writeln!(out)?;
    writeln!(out, "#ifndef SET_JNI_METHOD")?;
    writeln!(
        out,
        "#define SET_JNI_METHOD(_mth, _func) ((_mth).fnPtr = _mth##__TABLE[_mth##__ARR_IDX].fnPtr = reinterpret_cast<void *>(&_func))"
    )?;
    writeln!(out, "#endif")?;

    writeln!(out)?;
    writeln!(
        out,
        "#define {}_RegisterNatives(_env, _class) (*_env).RegisterNatives(_class, {}, {})",
        names.prefix, names.table, names.count
    )?;
    writeln!(out)?;
    text::guard_end(out)
}
