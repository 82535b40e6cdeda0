//! Declaration model produced by a frontend and consumed by the generator.
//!
//! A [`CompilationUnit`] owns an arena of [`TypeDeclaration`] records.
//! Nesting is expressed through [`TypeId`] indices (`parent` / `nested`)
//! instead of an owned recursive graph, so traversal never fights the
//! borrow checker and tests can build trees by hand.

use std::fmt;
use std::path::{Path, PathBuf};

/// Index of a type declaration inside its compilation unit's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) usize);

impl TypeId {
    /// Returns the raw arena index
    pub fn index(self) -> usize {
        self.0
    }
}

/// Primitive type kinds of the managed type system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// `void`, only valid as a return type
    Void,
    /// `boolean`
    Boolean,
    /// `byte`
    Byte,
    /// `char`
    Char,
    /// `short`
    Short,
    /// `int`
    Int,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `double`
    Double,
}

impl PrimitiveKind {
    /// Looks up a primitive by its source keyword
    pub fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "void" => Self::Void,
            "boolean" => Self::Boolean,
            "byte" => Self::Byte,
            "char" => Self::Char,
            "short" => Self::Short,
            "int" => Self::Int,
            "long" => Self::Long,
            "float" => Self::Float,
            "double" => Self::Double,
            _ => return None,
        })
    }

    /// Returns the source keyword
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
        }
    }
}

/// A resolved type reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// A primitive type
    Primitive(PrimitiveKind),
    /// A class or interface, by binary name (`pkg.Outer$Inner`)
    Object(String),
    /// An array of the element type
    Array(Box<TypeRef>),
    /// A generic type variable such as `T`
    TypeVariable(String),
    /// A wildcard such as `? extends Foo`
    Wildcard,
}

impl TypeRef {
    /// Shorthand for an object reference
    pub fn object(binary_name: impl Into<String>) -> Self {
        Self::Object(binary_name.into())
    }

    /// Shorthand for an array of `element`
    pub fn array(element: TypeRef) -> Self {
        Self::Array(Box::new(element))
    }

    /// Returns true for `void`
    pub fn is_void(&self) -> bool {
        matches!(self, Self::Primitive(PrimitiveKind::Void))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(kind) => f.write_str(kind.keyword()),
            Self::Object(name) => f.write_str(name),
            Self::Array(element) => write!(f, "{element}[]"),
            Self::TypeVariable(name) => f.write_str(name),
            Self::Wildcard => f.write_str("?"),
        }
    }
}

/// Kind of a type declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// `class`
    Class,
    /// `interface`
    Interface,
    /// `enum`
    Enum,
    /// `record`
    Record,
    /// `@interface`
    Annotation,
}

/// Value of an annotation element
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    /// A string literal
    Str(String),
    /// Any other expression, kept as source text
    Expr(String),
}

/// An annotation attached to a declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Name as written at the use site
    pub name: String,
    /// Fully qualified name after import resolution
    pub resolved: String,
    /// Element values in source order; the shorthand form is keyed `value`
    pub arguments: Vec<(String, AnnotationValue)>,
}

impl Annotation {
    /// Returns the simple (unqualified) name
    pub fn simple_name(&self) -> &str {
        self.resolved.rsplit('.').next().unwrap_or(&self.resolved)
    }

    /// Returns the value of the named element
    pub fn argument(&self, key: &str) -> Option<&AnnotationValue> {
        self.arguments
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

/// A method parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Parameter type
    pub ty: TypeRef,
}

/// A method declared on a type
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDeclaration {
    /// Method name
    pub name: String,
    /// Parameters in declaration order
    pub params: Vec<Parameter>,
    /// Return type (`void` included)
    pub ret: TypeRef,
    /// Declared `native`
    pub is_native: bool,
    /// Declared `static`
    pub is_static: bool,
    /// Carries the critical-native optimisation annotation
    pub is_critical: bool,
    /// 1-based source line
    pub line: usize,
}

impl MethodDeclaration {
    /// Creates a non-static native method with no parameters
    pub fn native(name: impl Into<String>, ret: TypeRef) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            ret,
            is_native: true,
            is_static: false,
            is_critical: false,
            line: 0,
        }
    }

    /// Appends a parameter
    pub fn param(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.params.push(Parameter {
            name: name.into(),
            ty,
        });
        self
    }

    /// Marks the method static
    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }
}

/// Literal value of a compile-time constant field
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    /// `true` / `false`
    Bool(bool),
    /// Integral literal (byte, short, int, long, char code)
    Int(i64),
    /// Floating literal kept as written (without suffix)
    Float(String),
}

/// A `static final` field with a literal initializer
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantField {
    /// Field name
    pub name: String,
    /// Declared type
    pub ty: TypeRef,
    /// Literal value
    pub value: ConstantValue,
}

/// A class-like declaration
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDeclaration {
    /// Simple name
    pub name: String,
    /// Binary name (`pkg.Outer$Inner`)
    pub binary_name: String,
    /// Declaration kind
    pub kind: TypeKind,
    /// Superclass, if declared
    pub superclass: Option<TypeRef>,
    /// Annotations in source order
    pub annotations: Vec<Annotation>,
    /// Methods in declaration order
    pub methods: Vec<MethodDeclaration>,
    /// Compile-time constants in declaration order
    pub constants: Vec<ConstantField>,
    /// Enclosing type
    pub parent: Option<TypeId>,
    /// Member types in declaration order
    pub nested: Vec<TypeId>,
    /// 1-based source line
    pub line: usize,
}

impl TypeDeclaration {
    /// Creates an empty class declaration
    pub fn new(name: impl Into<String>, binary_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            binary_name: binary_name.into(),
            kind: TypeKind::Class,
            superclass: None,
            annotations: Vec::new(),
            methods: Vec::new(),
            constants: Vec::new(),
            parent: None,
            nested: Vec::new(),
            line: 0,
        }
    }

    /// Iterates over the native methods in declaration order
    pub fn native_methods(&self) -> impl Iterator<Item = &MethodDeclaration> {
        self.methods.iter().filter(|m| m.is_native)
    }

    /// Returns the qualified source name (`pkg.Outer.Inner`)
    pub fn qualified_name(&self) -> String {
        self.binary_name.replace('$', ".")
    }
}

/// One parsed source file
#[derive(Debug, Clone, PartialEq)]
pub struct CompilationUnit {
    path: PathBuf,
    package: Option<String>,
    types: Vec<TypeDeclaration>,
    roots: Vec<TypeId>,
}

impl CompilationUnit {
    /// Creates an empty unit for `path`
    pub fn new(path: impl Into<PathBuf>, package: Option<String>) -> Self {
        Self {
            path: path.into(),
            package,
            types: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Adds a declaration under `parent` (or as a root) and returns its id
    pub fn add_type(&mut self, parent: Option<TypeId>, mut decl: TypeDeclaration) -> TypeId {
        let id = TypeId(self.types.len());
        decl.parent = parent;
        self.types.push(decl);
        match parent {
            Some(p) => self.types[p.0].nested.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Source file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Declared package, if any
    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    /// Top-level declarations in source order
    pub fn roots(&self) -> &[TypeId] {
        &self.roots
    }

    /// Looks up a declaration
    pub fn get(&self, id: TypeId) -> &TypeDeclaration {
        &self.types[id.0]
    }

    /// Mutable access to a declaration
    pub fn get_mut(&mut self, id: TypeId) -> &mut TypeDeclaration {
        &mut self.types[id.0]
    }

    /// Number of declarations, nested ones included
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if the unit declares no types
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Simple names from the outermost type down to `id`
    pub fn name_chain(&self, id: TypeId) -> Vec<&str> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            let decl = self.get(cur);
            chain.push(decl.name.as_str());
            current = decl.parent;
        }
        chain.reverse();
        chain
    }
}

/// A generated file: name relative to the output directory plus its text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    /// File name, a single path component
    pub file_name: String,
    /// Full file contents
    pub contents: String,
}

impl GeneratedArtifact {
    /// Creates a new artifact
    pub fn new(file_name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            contents: contents.into(),
        }
    }

    /// Returns the contents as bytes
    pub fn as_bytes(&self) -> &[u8] {
        self.contents.as_bytes()
    }
}

/// One native method to bind at library load time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationEntry {
    /// Declaring type in internal form (`pkg/Outer$Inner`)
    pub class_name: String,
    /// Method name
    pub method: String,
    /// Method descriptor
    pub descriptor: String,
    /// Cache-slot symbol of the method
    pub symbol: String,
    /// Method table of the declaring type
    pub table: String,
}
