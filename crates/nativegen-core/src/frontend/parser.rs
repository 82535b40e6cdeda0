//! Declaration-level parser for Java compilation units.
//!
//! The parser builds an unresolved syntax arena ([`ParsedUnit`]): names are
//! kept as written and resolved later against the module's symbol table.
//! Method bodies, initializers and field initializers are skipped by
//! balanced-delimiter matching, so local and anonymous classes never show
//! up as declarations.

use super::lexer::{tokenize, Tok, Token};
use crate::error::{Error, Result};
use crate::model::{AnnotationValue, PrimitiveKind, TypeKind};
use std::path::{Path, PathBuf};
use tracing::trace;

/// A type as written in source
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TypeSyntax {
    pub(crate) base: BaseSyntax,
    pub(crate) dims: usize,
    pub(crate) line: usize,
    pub(crate) column: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BaseSyntax {
    Primitive(PrimitiveKind),
    /// Dotted name segments; generic arguments are erased
    Named(Vec<String>),
    Wildcard,
}

impl TypeSyntax {
    pub(crate) fn written(&self) -> String {
        let base = match &self.base {
            BaseSyntax::Primitive(kind) => kind.keyword().to_string(),
            BaseSyntax::Named(segments) => segments.join("."),
            BaseSyntax::Wildcard => "?".to_string(),
        };
        format!("{base}{}", "[]".repeat(self.dims))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AnnotationSyntax {
    pub(crate) name: String,
    pub(crate) arguments: Vec<(String, AnnotationValue)>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ImportSyntax {
    pub(crate) path: String,
    pub(crate) on_demand: bool,
    pub(crate) is_static: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Modifiers {
    pub(crate) annotations: Vec<AnnotationSyntax>,
    pub(crate) is_static: bool,
    pub(crate) is_final: bool,
    pub(crate) is_native: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MethodSyntax {
    pub(crate) name: String,
    pub(crate) type_params: Vec<String>,
    pub(crate) params: Vec<(String, TypeSyntax)>,
    pub(crate) ret: TypeSyntax,
    pub(crate) modifiers: Modifiers,
    pub(crate) line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Literal {
    Bool(bool),
    Number { text: String, negative: bool },
    Char(char),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ConstantSyntax {
    pub(crate) name: String,
    pub(crate) ty: TypeSyntax,
    pub(crate) literal: Literal,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TypeSyntaxDecl {
    pub(crate) name: String,
    pub(crate) kind: TypeKind,
    pub(crate) type_params: Vec<String>,
    pub(crate) superclass: Option<TypeSyntax>,
    pub(crate) annotations: Vec<AnnotationSyntax>,
    pub(crate) methods: Vec<MethodSyntax>,
    pub(crate) constants: Vec<ConstantSyntax>,
    pub(crate) parent: Option<usize>,
    pub(crate) nested: Vec<usize>,
    pub(crate) line: usize,
}

/// Unresolved syntax of one source file
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedUnit {
    pub(crate) path: PathBuf,
    pub(crate) package: Option<String>,
    pub(crate) imports: Vec<ImportSyntax>,
    pub(crate) types: Vec<TypeSyntaxDecl>,
    pub(crate) roots: Vec<usize>,
}

impl ParsedUnit {
    /// Source file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Binary names of every declared type, nested ones included, in arena order
    pub fn binary_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(self.types.len());
        for decl in &self.types {
            let name = match decl.parent {
                Some(p) => format!("{}${}", names[p], decl.name),
                None => match &self.package {
                    Some(pkg) => format!("{pkg}.{}", decl.name),
                    None => decl.name.clone(),
                },
            };
            names.push(name);
        }
        names
    }
}

const MODIFIER_KEYWORDS: &[&str] = &[
    "public",
    "protected",
    "private",
    "abstract",
    "synchronized",
    "transient",
    "volatile",
    "strictfp",
    "default",
    "sealed",
];

pub(crate) fn parse(path: &Path, source: &str) -> Result<ParsedUnit> {
    let tokens = tokenize(path, source)?;
    let mut parser = Parser {
        path,
        tokens,
        pos: 0,
        unit: ParsedUnit {
            path: path.to_path_buf(),
            package: None,
            imports: Vec::new(),
            types: Vec::new(),
            roots: Vec::new(),
        },
    };
    parser.compilation_unit()?;
    trace!(
        "Parsed {}: {} type declaration(s)",
        path.display(),
        parser.unit.types.len()
    );
    Ok(parser.unit)
}

struct Parser<'a> {
    path: &'a Path,
    tokens: Vec<Token>,
    pos: usize,
    unit: ParsedUnit,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Tok {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Tok {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].tok
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn error_here(&self, message: impl Into<String>) -> Error {
        let token = self.current();
        Error::compilation(self.path, token.line, token.column, message)
    }

    fn expected(&self, what: &str) -> Error {
        self.error_here(format!("expected {what}, found {}", self.current().describe()))
    }

    fn is_punct(&self, c: char) -> bool {
        *self.peek() == Tok::Punct(c)
    }

    fn is_ident(&self, word: &str) -> bool {
        matches!(self.peek(), Tok::Ident(s) if s == word)
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.is_punct(c) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, c: char) -> Result<()> {
        if self.eat_punct(c) {
            Ok(())
        } else {
            Err(self.expected(&format!("'{c}'")))
        }
    }

    fn ident(&mut self) -> Result<String> {
        match self.peek() {
            Tok::Ident(s) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            _ => Err(self.expected("identifier")),
        }
    }

    fn qualified_name(&mut self) -> Result<String> {
        let mut name = self.ident()?;
        while self.is_punct('.') && matches!(self.peek_at(1), Tok::Ident(_)) {
            self.advance();
            name.push('.');
            name.push_str(&self.ident()?);
        }
        Ok(name)
    }

    /// Skips a balanced `open ... close` group starting at the current token
    fn skip_balanced(&mut self, open: char, close: char) -> Result<()> {
        let start = self.current().clone();
        self.expect_punct(open)?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.peek() {
                Tok::Punct(c) if *c == open => depth += 1,
                Tok::Punct(c) if *c == close => depth -= 1,
                Tok::Eof => {
                    return Err(Error::compilation(
                        self.path,
                        start.line,
                        start.column,
                        format!("unbalanced '{open}'"),
                    ));
                }
                _ => {}
            }
            self.advance();
        }
        Ok(())
    }

    /// Collects tokens up to (not including) a top-level `,`, `;` or closing delimiter
    fn collect_expression(&mut self) -> Result<Vec<Token>> {
        let mut depth = 0usize;
        let mut collected = Vec::new();
        loop {
            match self.peek() {
                Tok::Punct('(' | '[' | '{') => depth += 1,
                Tok::Punct(')' | ']' | '}') if depth == 0 => return Ok(collected),
                Tok::Punct(')' | ']' | '}') => depth -= 1,
                Tok::Punct(',' | ';') if depth == 0 => return Ok(collected),
                Tok::Punct('<') => {
                    let after_name = matches!(
                        collected.last().map(|t| &t.tok),
                        Some(Tok::Ident(_) | Tok::Punct('.'))
                    );
                    if let Some(len) = self.type_arguments_len().filter(|_| after_name) {
                        for _ in 0..len {
                            collected.push(self.advance());
                        }
                        continue;
                    }
                }
                Tok::Eof => return Err(self.expected("end of expression")),
                _ => {}
            }
            collected.push(self.advance());
        }
    }

    /// Length of a type-argument list starting at the current `<`, if the
    /// tokens up to the matching `>` can only be type arguments
    ///
    /// Tells `new HashMap<K, V>()` and `Collections.<K, V>emptyMap()` apart
    /// from comparisons such as `a < b`.
    fn type_arguments_len(&self) -> Option<usize> {
        let mut depth = 0usize;
        for offset in 0.. {
            match self.peek_at(offset) {
                Tok::Punct('<') => depth += 1,
                Tok::Punct('>') => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(offset + 1);
                    }
                }
                Tok::Ident(_) | Tok::Punct('.' | ',' | '?' | '[' | ']' | '&' | '@') => {}
                _ => return None,
            }
        }
        None
    }

    fn compilation_unit(&mut self) -> Result<()> {
        let start = self.pos;
        // Package annotations (package-info.java) precede the package clause.
        self.modifiers()?;
        if self.is_ident("package") {
            self.advance();
            self.unit.package = Some(self.qualified_name()?);
            self.expect_punct(';')?;
        } else {
            self.pos = start;
        }
        self.type_declarations()
    }

    fn type_declarations(&mut self) -> Result<()> {
        loop {
            while self.is_ident("import") {
                self.import()?;
            }
            if self.eat_punct(';') {
                continue;
            }
            if *self.peek() == Tok::Eof {
                return Ok(());
            }
            let modifiers = self.modifiers()?;
            if *self.peek() == Tok::Eof {
                return Ok(());
            }
            if !self.starts_type_declaration() {
                return Err(self.expected("class, interface, enum or record declaration"));
            }
            let id = self.type_declaration(None, modifiers)?;
            self.unit.roots.push(id);
        }
    }

    fn import(&mut self) -> Result<()> {
        self.advance();
        let is_static = if self.is_ident("static") {
            self.advance();
            true
        } else {
            false
        };
        let path = self.qualified_name()?;
        let on_demand = if self.eat_punct('.') {
            self.expect_punct('*')?;
            true
        } else {
            false
        };
        self.expect_punct(';')?;
        self.unit.imports.push(ImportSyntax {
            path,
            on_demand,
            is_static,
        });
        Ok(())
    }

    fn modifiers(&mut self) -> Result<Modifiers> {
        let mut modifiers = Modifiers::default();
        loop {
            if self.is_punct('@') && !matches!(self.peek_at(1), Tok::Ident(s) if s == "interface") {
                let annotation = self.annotation()?;
                modifiers.annotations.push(annotation);
                continue;
            }
            let word = match self.peek() {
                Tok::Ident(word) => word.clone(),
                _ => return Ok(modifiers),
            };
            match word.as_str() {
                "static" => modifiers.is_static = true,
                "final" => modifiers.is_final = true,
                "native" => modifiers.is_native = true,
                "non" if self.peek_at(1) == &Tok::Punct('-')
                    && matches!(self.peek_at(2), Tok::Ident(s) if s == "sealed") =>
                {
                    self.advance();
                    self.advance();
                }
                w if MODIFIER_KEYWORDS.contains(&w) => {}
                _ => return Ok(modifiers),
            }
            self.advance();
        }
    }

    fn annotation(&mut self) -> Result<AnnotationSyntax> {
        self.expect_punct('@')?;
        let name = self.qualified_name()?;
        let mut arguments = Vec::new();
        if self.eat_punct('(') {
            if !self.is_punct(')') {
                let named = matches!(self.peek(), Tok::Ident(_)) && self.peek_at(1) == &Tok::Punct('=');
                if named {
                    loop {
                        let key = self.ident()?;
                        self.expect_punct('=')?;
                        arguments.push((key, self.element_value()?));
                        if !self.eat_punct(',') {
                            break;
                        }
                    }
                } else {
                    arguments.push(("value".to_string(), self.element_value()?));
                }
            }
            self.expect_punct(')')?;
        }
        Ok(AnnotationSyntax { name, arguments })
    }

    fn element_value(&mut self) -> Result<AnnotationValue> {
        if let Tok::Str(s) = self.peek() {
            if matches!(self.peek_at(1), Tok::Punct(',' | ')')) {
                let s = s.clone();
                self.advance();
                return Ok(AnnotationValue::Str(s));
            }
        }
        let tokens = self.collect_expression()?;
        Ok(AnnotationValue::Expr(render_tokens(&tokens)))
    }

    fn starts_type_declaration(&self) -> bool {
        match self.peek() {
            Tok::Ident(s) if s == "class" || s == "interface" || s == "enum" => true,
            Tok::Ident(s) if s == "record" => {
                matches!(self.peek_at(1), Tok::Ident(_))
                    && matches!(self.peek_at(2), Tok::Punct('(' | '<'))
            }
            Tok::Punct('@') => matches!(self.peek_at(1), Tok::Ident(s) if s == "interface"),
            _ => false,
        }
    }

    fn type_declaration(&mut self, parent: Option<usize>, modifiers: Modifiers) -> Result<usize> {
        let line = self.current().line;
        let kind = match self.advance().tok {
            Tok::Ident(s) if s == "class" => TypeKind::Class,
            Tok::Ident(s) if s == "interface" => TypeKind::Interface,
            Tok::Ident(s) if s == "enum" => TypeKind::Enum,
            Tok::Ident(s) if s == "record" => TypeKind::Record,
            _ => {
                self.advance();
                TypeKind::Annotation
            }
        };
        let name = self.ident()?;
        let id = self.unit.types.len();
        self.unit.types.push(TypeSyntaxDecl {
            name,
            kind,
            type_params: Vec::new(),
            superclass: None,
            annotations: modifiers.annotations,
            methods: Vec::new(),
            constants: Vec::new(),
            parent,
            nested: Vec::new(),
            line,
        });
        if let Some(p) = parent {
            self.unit.types[p].nested.push(id);
        }

        if self.is_punct('<') {
            self.unit.types[id].type_params = self.type_parameters()?;
        }
        if kind == TypeKind::Record {
            self.skip_balanced('(', ')')?;
        }
        loop {
            if self.is_ident("extends") {
                self.advance();
                let first = self.type_ref()?;
                if kind == TypeKind::Class {
                    self.unit.types[id].superclass = Some(first);
                }
                while self.eat_punct(',') {
                    self.type_ref()?;
                }
            } else if self.is_ident("implements") || self.is_ident("permits") {
                self.advance();
                self.type_ref()?;
                while self.eat_punct(',') {
                    self.type_ref()?;
                }
            } else {
                break;
            }
        }
        self.class_body(id)?;
        Ok(id)
    }

    fn type_parameters(&mut self) -> Result<Vec<String>> {
        self.expect_punct('<')?;
        let mut params = Vec::new();
        loop {
            while self.is_punct('@') {
                self.annotation()?;
            }
            params.push(self.ident()?);
            if self.is_ident("extends") {
                self.advance();
                self.type_ref()?;
                while self.eat_punct('&') {
                    self.type_ref()?;
                }
            }
            if !self.eat_punct(',') {
                break;
            }
        }
        self.expect_punct('>')?;
        Ok(params)
    }

    fn type_arguments(&mut self) -> Result<()> {
        self.expect_punct('<')?;
        if self.eat_punct('>') {
            return Ok(());
        }
        loop {
            self.type_ref()?;
            if !self.eat_punct(',') {
                break;
            }
        }
        self.expect_punct('>')
    }

    fn type_ref(&mut self) -> Result<TypeSyntax> {
        while self.is_punct('@') {
            self.annotation()?;
        }
        let start = self.current().clone();
        let base = if self.eat_punct('?') {
            if self.is_ident("extends") || self.is_ident("super") {
                self.advance();
                self.type_ref()?;
            }
            BaseSyntax::Wildcard
        } else {
            let word = self.ident()?;
            match PrimitiveKind::from_keyword(&word) {
                Some(kind) => BaseSyntax::Primitive(kind),
                None => {
                    let mut segments = vec![word];
                    loop {
                        if self.is_punct('<') {
                            self.type_arguments()?;
                        }
                        if self.is_punct('.') && matches!(self.peek_at(1), Tok::Ident(_) | Tok::Punct('@')) {
                            self.advance();
                            while self.is_punct('@') {
                                self.annotation()?;
                            }
                            segments.push(self.ident()?);
                        } else {
                            break;
                        }
                    }
                    BaseSyntax::Named(segments)
                }
            }
        };
        let dims = self.dims()?;
        Ok(TypeSyntax {
            base,
            dims,
            line: start.line,
            column: start.column,
        })
    }

    fn dims(&mut self) -> Result<usize> {
        let mut dims = 0;
        loop {
            let mut lookahead = 0;
            while self.peek_at(lookahead) == &Tok::Punct('@') {
                // Type annotations on array dimensions, e.g. `int @NonNull []`.
                lookahead += 1;
                while matches!(self.peek_at(lookahead), Tok::Ident(_) | Tok::Punct('.')) {
                    lookahead += 1;
                }
            }
            if self.peek_at(lookahead) == &Tok::Punct('[') && self.peek_at(lookahead + 1) == &Tok::Punct(']') {
                while self.is_punct('@') {
                    self.annotation()?;
                }
                self.advance();
                self.advance();
                dims += 1;
            } else {
                return Ok(dims);
            }
        }
    }

    fn class_body(&mut self, id: usize) -> Result<()> {
        self.expect_punct('{')?;
        if self.unit.types[id].kind == TypeKind::Enum {
            self.enum_constants()?;
        }
        loop {
            if self.eat_punct('}') {
                return Ok(());
            }
            if *self.peek() == Tok::Eof {
                return Err(self.expected("'}'"));
            }
            self.member(id)?;
        }
    }

    fn enum_constants(&mut self) -> Result<()> {
        loop {
            while self.is_punct('@') {
                self.annotation()?;
            }
            if matches!(self.peek(), Tok::Ident(_)) {
                self.advance();
                if self.is_punct('(') {
                    self.skip_balanced('(', ')')?;
                }
                if self.is_punct('{') {
                    self.skip_balanced('{', '}')?;
                }
                if self.eat_punct(',') {
                    continue;
                }
            }
            if self.eat_punct(';') || self.is_punct('}') {
                return Ok(());
            }
            return Err(self.expected("enum constant, ',' or ';'"));
        }
    }

    fn member(&mut self, owner: usize) -> Result<()> {
        if self.eat_punct(';') {
            return Ok(());
        }
        if self.is_punct('{') {
            return self.skip_balanced('{', '}');
        }
        if self.is_ident("static") && self.peek_at(1) == &Tok::Punct('{') {
            self.advance();
            return self.skip_balanced('{', '}');
        }

        let modifiers = self.modifiers()?;
        if self.starts_type_declaration() {
            self.type_declaration(Some(owner), modifiers)?;
            return Ok(());
        }

        let line = self.current().line;
        let type_params = if self.is_punct('<') {
            self.type_parameters()?
        } else {
            Vec::new()
        };

        // Constructors and compact record constructors.
        let owner_name = self.unit.types[owner].name.clone();
        if self.is_ident(&owner_name) && matches!(self.peek_at(1), Tok::Punct('(' | '{')) {
            self.advance();
            if self.is_punct('(') {
                self.skip_balanced('(', ')')?;
            }
            self.skip_throws()?;
            return self.skip_balanced('{', '}');
        }

        let ty = self.type_ref()?;
        let name = self.ident()?;
        if self.is_punct('(') {
            let method = self.method_rest(name, type_params, ty, modifiers, line)?;
            self.unit.types[owner].methods.push(method);
            return Ok(());
        }

        let implicit_constant = self.unit.types[owner].kind == TypeKind::Interface
            || self.unit.types[owner].kind == TypeKind::Annotation;
        let is_constant = implicit_constant || (modifiers.is_static && modifiers.is_final);
        let mut name = name;
        loop {
            let mut field_ty = ty.clone();
            field_ty.dims += self.dims()?;
            if self.eat_punct('=') {
                let init = self.collect_expression()?;
                if is_constant {
                    if let Some(literal) = literal_of(&init) {
                        self.unit.types[owner].constants.push(ConstantSyntax {
                            name: name.clone(),
                            ty: field_ty,
                            literal,
                        });
                    }
                }
            }
            if self.eat_punct(',') {
                name = self.ident()?;
                continue;
            }
            return self.expect_punct(';');
        }
    }

    fn skip_throws(&mut self) -> Result<()> {
        if self.is_ident("throws") {
            self.advance();
            self.type_ref()?;
            while self.eat_punct(',') {
                self.type_ref()?;
            }
        }
        Ok(())
    }

    fn method_rest(
        &mut self,
        name: String,
        type_params: Vec<String>,
        mut ret: TypeSyntax,
        modifiers: Modifiers,
        line: usize,
    ) -> Result<MethodSyntax> {
        self.expect_punct('(')?;
        let mut params = Vec::new();
        if !self.is_punct(')') {
            loop {
                self.modifiers()?;
                let mut ty = self.type_ref()?;
                if matches!(self.peek(), Tok::Ellipsis) {
                    self.advance();
                    ty.dims += 1;
                }
                // Receiver parameters (`Outer this`) are not real parameters.
                if self.is_ident("this") {
                    self.advance();
                } else if matches!(self.peek(), Tok::Ident(_)) && self.peek_at(1) == &Tok::Punct('.') {
                    self.qualified_name()?;
                } else {
                    let param_name = self.ident()?;
                    ty.dims += self.dims()?;
                    params.push((param_name, ty));
                }
                if !self.eat_punct(',') {
                    break;
                }
            }
        }
        self.expect_punct(')')?;
        ret.dims += self.dims()?;
        self.skip_throws()?;

        if self.is_ident("default") {
            self.advance();
            self.collect_expression()?;
            self.expect_punct(';')?;
        } else if self.is_punct('{') {
            self.skip_balanced('{', '}')?;
        } else {
            self.expect_punct(';')?;
        }

        Ok(MethodSyntax {
            name,
            type_params,
            params,
            ret,
            modifiers,
            line,
        })
    }
}

/// Recognises a bare literal initializer (optionally negated)
fn literal_of(tokens: &[Token]) -> Option<Literal> {
    let (negative, rest) = match tokens {
        [Token { tok: Tok::Punct('-'), .. }, rest @ ..] => (true, rest),
        rest => (false, rest),
    };
    match rest {
        [Token { tok: Tok::Number(text), .. }] => Some(Literal::Number {
            text: text.clone(),
            negative,
        }),
        [Token { tok: Tok::Ident(word), .. }] if !negative && (word == "true" || word == "false") => {
            Some(Literal::Bool(word == "true"))
        }
        [Token { tok: Tok::Char(c), .. }] if !negative => Some(Literal::Char(*c)),
        _ => None,
    }
}

fn render_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        match &token.tok {
            Tok::Ident(s) | Tok::Number(s) => {
                if out.ends_with(|c: char| c.is_alphanumeric() || c == '_') {
                    out.push(' ');
                }
                out.push_str(s);
            }
            Tok::Str(s) => {
                out.push('"');
                out.push_str(&s.replace('\\', "\\\\").replace('"', "\\\""));
                out.push('"');
            }
            Tok::Char(c) => {
                out.push('\'');
                out.push(*c);
                out.push('\'');
            }
            Tok::Ellipsis => out.push_str("..."),
            Tok::Punct(c) => out.push(*c),
            Tok::Eof => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> ParsedUnit {
        parse(Path::new("Test.java"), source).unwrap()
    }

    #[test]
    fn test_package_imports_and_nesting() {
        let unit = parse_ok(
            r#"
            package com.example;

            import java.util.List;
            import static java.lang.Math.*;
            import com.other.*;

            public class Outer {
                static class Inner {
                    interface Deep {}
                }
                enum Color { RED, GREEN; void x() {} }
            }
            "#,
        );
        assert_eq!(unit.package.as_deref(), Some("com.example"));
        assert_eq!(unit.imports.len(), 3);
        assert!(unit.imports[1].is_static && unit.imports[1].on_demand);
        assert_eq!(
            unit.binary_names(),
            vec![
                "com.example.Outer",
                "com.example.Outer$Inner",
                "com.example.Outer$Inner$Deep",
                "com.example.Outer$Color",
            ]
        );
        assert_eq!(unit.roots, vec![0]);
        assert_eq!(unit.types[0].nested, vec![1, 3]);
    }

    #[test]
    fn test_methods_and_modifiers() {
        let unit = parse_ok(
            r#"
            class Foo<T> {
                private Foo(int x) { this.x = x; }
                public static native boolean bar(int a, String... rest);
                native <U> void generic(U u, java.util.Map<String, List<T>> m);
                int[] plain(final @Nullable int matrix[][]) throws Exception { return null; }
            }
            "#,
        );
        let methods = &unit.types[0].methods;
        assert_eq!(unit.types[0].type_params, vec!["T"]);
        assert_eq!(methods.len(), 3);

        let bar = &methods[0];
        assert!(bar.modifiers.is_native && bar.modifiers.is_static);
        assert_eq!(bar.params[1].1.written(), "String[]");

        assert_eq!(methods[1].type_params, vec!["U"]);
        assert_eq!(methods[1].params[1].1.written(), "java.util.Map");

        assert!(!methods[2].modifiers.is_native);
        assert_eq!(methods[2].ret.written(), "int[]");
        assert_eq!(methods[2].params[0].1.written(), "int[][]");
    }

    #[test]
    fn test_bodies_hide_local_and_anonymous_classes() {
        let unit = parse_ok(
            r#"
            class A {
                Runnable r = new Runnable() { public void run() { class Local {} } };
                void m() { class Local2 { native void hidden(); } String s = "}"; char c = '{'; }
                static { Object o = new Object() {}; }
            }
            "#,
        );
        assert_eq!(unit.types.len(), 1);
        assert_eq!(unit.types[0].methods.len(), 1);
    }

    #[test]
    fn test_annotations() {
        let unit = parse_ok(
            r#"
            @GenerateNativeHeaders("foo")
            @Other(value = "bar", flag = true)
            @Marker
            @Computed(PREFIX + "x")
            class A {}
            "#,
        );
        let annotations = &unit.types[0].annotations;
        assert_eq!(annotations.len(), 4);
        assert_eq!(
            annotations[0].arguments,
            vec![("value".to_string(), AnnotationValue::Str("foo".into()))]
        );
        assert_eq!(annotations[1].arguments[1].1, AnnotationValue::Expr("true".into()));
        assert!(annotations[2].arguments.is_empty());
        assert_eq!(
            annotations[3].arguments[0].1,
            AnnotationValue::Expr("PREFIX+\"x\"".into())
        );
    }

    #[test]
    fn test_constants() {
        let unit = parse_ok(
            r#"
            class K {
                public static final int MAX = 0x7f, MIN = -1;
                static final boolean ON = true;
                static final char LETTER = 'a';
                static final long COMPUTED = 1 << 4;
                final int NOT_STATIC = 3;
                static final String NAME = "n";
            }
            interface I { double RATIO = 1.5; }
            "#,
        );
        let names: Vec<_> = unit.types[0].constants.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["MAX", "MIN", "ON", "LETTER"]);
        assert_eq!(
            unit.types[0].constants[1].literal,
            Literal::Number { text: "1".into(), negative: true }
        );
        assert_eq!(unit.types[1].constants[0].name, "RATIO");
    }

    #[test]
    fn test_generic_initializers_are_single_declarators() {
        let unit = parse_ok(
            r#"
            class Cache {
                private final Map<String, Integer> m = new HashMap<String, Integer>();
                static final Map<String, List<Integer>> EMPTY = Collections.<String, List<Integer>>emptyMap(), OTHER = null;
                static final boolean LESS = 1 < 2, MORE = 3 > 2;
                static final int A = 1, B = 2;
                native void f();
            }
            "#,
        );
        assert_eq!(unit.types[0].methods.len(), 1);
        assert_eq!(unit.types[0].methods[0].name, "f");
        let names: Vec<_> = unit.types[0].constants.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_records_and_annotation_types() {
        let unit = parse_ok(
            r#"
            record Point(int x, int y) implements Comparable<Point> {
                Point { if (x < 0) throw new IllegalArgumentException(); }
                native int norm();
            }
            @interface Tag { String value() default "x"; int[] ids() default {1, 2}; }
            non-sealed class Open extends Base {}
            "#,
        );
        assert_eq!(unit.types[0].kind, TypeKind::Record);
        assert_eq!(unit.types[0].methods[0].name, "norm");
        assert_eq!(unit.types[1].kind, TypeKind::Annotation);
        assert_eq!(unit.types[1].methods.len(), 2);
        assert_eq!(
            unit.types[2].superclass.as_ref().map(TypeSyntax::written),
            Some("Base".to_string())
        );
    }

    #[test]
    fn test_syntax_error_has_location() {
        let err = parse(Path::new("Bad.java"), "class A {\n  int x\n}").unwrap_err();
        match err {
            Error::Compilation { line, message, .. } => {
                assert_eq!(line, 3);
                assert!(message.contains("expected ';'"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unbalanced_body_is_error() {
        assert!(parse(Path::new("Bad.java"), "class A { void m() { ").is_err());
    }
}
