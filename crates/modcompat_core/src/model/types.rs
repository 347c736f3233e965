//! Type and member references carried by instruction operands.
//!
//! # Responsibility
//! - Describe what an instruction points at: a type, a field or a method.
//! - Parse and print textual type signatures such as
//!   ``System.Collections.Generic.IList`1<StardewValley.Item>``.
//!
//! # Invariants
//! - `scope` names the assembly that declares the referenced symbol.
//! - Signature comparisons ignore `scope`; two references with the same
//!   printed signature denote the same shape.
//! - Deserialized type references nest at most [`MAX_GENERIC_DEPTH`]
//!   levels; deeper input is a decode error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::cell::Cell;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Assembly scope used for runtime library types (`System.*`).
pub const CORE_LIBRARY: &str = "mscorlib";

/// Name used for constructors in method references.
pub const CONSTRUCTOR_NAME: &str = ".ctor";

static TYPE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:[.+/][A-Za-z_][A-Za-z0-9_]*)*(?:`[0-9]+)?(?:\[\])*$")
        .expect("valid type name regex")
});

/// Deepest generic nesting accepted when decoding a type reference.
pub const MAX_GENERIC_DEPTH: usize = 32;

thread_local! {
    static DECODE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Tracks decode nesting on the current thread; released on drop.
struct DepthGuard;

impl DepthGuard {
    fn enter() -> Option<Self> {
        DECODE_DEPTH.with(|depth| {
            if depth.get() >= MAX_GENERIC_DEPTH {
                return None;
            }
            depth.set(depth.get() + 1);
            Some(Self)
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DECODE_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Reference to a type, optionally instantiated with generic arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TypeRef {
    /// Declaring assembly name. Empty when parsed from a bare signature.
    #[serde(default)]
    pub scope: String,
    /// Namespace-qualified name, including the generic arity marker.
    pub full_name: String,
    #[serde(default)]
    pub generic_args: Vec<TypeRef>,
}

#[derive(Deserialize)]
#[serde(rename = "TypeRef")]
struct TypeRefFields {
    #[serde(default)]
    scope: String,
    full_name: String,
    #[serde(default)]
    generic_args: Vec<TypeRef>,
}

impl<'de> Deserialize<'de> for TypeRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let _guard = DepthGuard::enter().ok_or_else(|| {
            D::Error::custom(format!(
                "type reference nests deeper than {MAX_GENERIC_DEPTH} generic levels"
            ))
        })?;
        let fields = TypeRefFields::deserialize(deserializer)?;
        Ok(Self {
            scope: fields.scope,
            full_name: fields.full_name,
            generic_args: fields.generic_args,
        })
    }
}

impl TypeRef {
    pub fn new(scope: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            full_name: full_name.into(),
            generic_args: Vec::new(),
        }
    }

    /// Creates a generic instance such as ``List`1<Item>``.
    pub fn generic(
        scope: impl Into<String>,
        full_name: impl Into<String>,
        generic_args: Vec<TypeRef>,
    ) -> Self {
        Self {
            scope: scope.into(),
            full_name: full_name.into(),
            generic_args,
        }
    }

    /// Runtime library type, e.g. `System.Int32`.
    pub fn system(full_name: impl Into<String>) -> Self {
        Self::new(CORE_LIBRARY, full_name)
    }

    pub fn void() -> Self {
        Self::system("System.Void")
    }

    /// Parses a textual signature. The result has an empty scope.
    ///
    /// # Errors
    /// - Returns an error when a name segment is malformed.
    /// - Returns an error when generic brackets are unbalanced or the
    ///   argument count contradicts the arity marker.
    pub fn parse(signature: &str) -> Result<Self, TypeParseError> {
        let mut parser = SignatureParser {
            input: signature,
            pos: 0,
        };
        let parsed = parser.parse_type()?;
        parser.skip_whitespace();
        if parser.pos != signature.len() {
            return Err(TypeParseError::TrailingInput {
                signature: signature.to_string(),
                position: parser.pos,
            });
        }
        Ok(parsed)
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Printed signature without scope.
    pub fn signature(&self) -> String {
        self.to_string()
    }

    /// Name with any array suffix removed.
    pub fn element_name(&self) -> &str {
        self.full_name.trim_end_matches("[]")
    }

    /// Whether this type, or any of its generic arguments, is `full_name`.
    pub fn references(&self, full_name: &str) -> bool {
        self.element_name() == full_name
            || self.generic_args.iter().any(|arg| arg.references(full_name))
    }

    /// Shape equality: same signature regardless of declaring scope.
    pub fn is_same_type(&self, other: &TypeRef) -> bool {
        self.full_name == other.full_name
            && self.generic_args.len() == other.generic_args.len()
            && self
                .generic_args
                .iter()
                .zip(&other.generic_args)
                .all(|(left, right)| left.is_same_type(right))
    }
}

impl Display for TypeRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_name)?;
        if !self.generic_args.is_empty() {
            write!(f, "<")?;
            for (index, arg) in self.generic_args.iter().enumerate() {
                if index > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{arg}")?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

/// Reference to a field declared on `declaring_type`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    pub declaring_type: TypeRef,
    pub name: String,
    pub field_type: TypeRef,
}

impl FieldRef {
    pub fn new(declaring_type: TypeRef, name: impl Into<String>, field_type: TypeRef) -> Self {
        Self {
            declaring_type,
            name: name.into(),
            field_type,
        }
    }

    /// Whether this references `type_name.field_name`.
    pub fn is(&self, type_name: &str, field_name: &str) -> bool {
        self.declaring_type.full_name == type_name && self.name == field_name
    }
}

impl Display for FieldRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}::{}",
            self.field_type, self.declaring_type, self.name
        )
    }
}

/// Reference to a method, constructor or accessor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    pub declaring_type: TypeRef,
    pub name: String,
    pub return_type: TypeRef,
    #[serde(default)]
    pub parameters: Vec<TypeRef>,
    /// Whether the callee receives an instance (`this`) argument.
    #[serde(default)]
    pub has_this: bool,
}

impl MethodRef {
    pub fn new_static(
        declaring_type: TypeRef,
        name: impl Into<String>,
        return_type: TypeRef,
        parameters: Vec<TypeRef>,
    ) -> Self {
        Self {
            declaring_type,
            name: name.into(),
            return_type,
            parameters,
            has_this: false,
        }
    }

    pub fn new_instance(
        declaring_type: TypeRef,
        name: impl Into<String>,
        return_type: TypeRef,
        parameters: Vec<TypeRef>,
    ) -> Self {
        Self {
            has_this: true,
            ..Self::new_static(declaring_type, name, return_type, parameters)
        }
    }

    pub fn constructor(declaring_type: TypeRef, parameters: Vec<TypeRef>) -> Self {
        Self::new_instance(declaring_type, CONSTRUCTOR_NAME, TypeRef::void(), parameters)
    }

    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }

    /// Printed parameter signatures, in declaration order.
    pub fn parameter_signatures(&self) -> Vec<String> {
        self.parameters.iter().map(TypeRef::signature).collect()
    }

    /// Types mentioned anywhere in this reference.
    pub fn referenced_types(&self) -> Vec<&TypeRef> {
        let mut types = vec![&self.declaring_type, &self.return_type];
        types.extend(self.parameters.iter());
        types
    }
}

impl Display for MethodRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}::{}({})",
            self.return_type,
            self.declaring_type,
            self.name,
            self.parameter_signatures().join(",")
        )
    }
}

/// Field reached through a static accessor on its owner type.
///
/// Produced when a static field moved onto a singleton; lowering expands it
/// into `call accessor` followed by a field access.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessorFieldRef {
    pub accessor: MethodRef,
    pub field: FieldRef,
}

impl Display for AccessorFieldRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.accessor, self.field)
    }
}

/// Type signature parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeParseError {
    InvalidName {
        signature: String,
        name: String,
    },
    UnclosedGenerics {
        signature: String,
    },
    ArityMismatch {
        signature: String,
        expected: usize,
        found: usize,
    },
    TrailingInput {
        signature: String,
        position: usize,
    },
}

impl Display for TypeParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName { signature, name } => {
                write!(f, "invalid type name `{name}` in signature `{signature}`")
            }
            Self::UnclosedGenerics { signature } => {
                write!(f, "unclosed generic argument list in `{signature}`")
            }
            Self::ArityMismatch {
                signature,
                expected,
                found,
            } => write!(
                f,
                "signature `{signature}` declares {expected} generic argument(s) but has {found}"
            ),
            Self::TrailingInput {
                signature,
                position,
            } => write!(
                f,
                "unexpected trailing input at offset {position} in `{signature}`"
            ),
        }
    }
}

impl Error for TypeParseError {}

struct SignatureParser<'a> {
    input: &'a str,
    pos: usize,
}

impl SignatureParser<'_> {
    fn parse_type(&mut self) -> Result<TypeRef, TypeParseError> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, '<' | '>' | ',') || c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
        let name = &self.input[start..self.pos];
        if !TYPE_NAME_RE.is_match(name) {
            return Err(TypeParseError::InvalidName {
                signature: self.input.to_string(),
                name: name.to_string(),
            });
        }

        let mut generic_args = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some('<') {
            self.pos += 1;
            loop {
                generic_args.push(self.parse_type()?);
                self.skip_whitespace();
                match self.peek() {
                    Some(',') => self.pos += 1,
                    Some('>') => {
                        self.pos += 1;
                        break;
                    }
                    _ => {
                        return Err(TypeParseError::UnclosedGenerics {
                            signature: self.input.to_string(),
                        })
                    }
                }
            }
            if let Some(expected) = declared_arity(name) {
                if expected != generic_args.len() {
                    return Err(TypeParseError::ArityMismatch {
                        signature: self.input.to_string(),
                        expected,
                        found: generic_args.len(),
                    });
                }
            }
        }

        Ok(TypeRef::generic(String::new(), name, generic_args))
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }
}

fn declared_arity(name: &str) -> Option<usize> {
    let (_, arity) = name.trim_end_matches("[]").rsplit_once('`')?;
    arity.parse().ok()
}
