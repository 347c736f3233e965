//! Facade tables: where calls on a moved or changed host type are redirected.
//!
//! # Responsibility
//! - Map an original member shape to the facade member that replaces it.
//! - Derive those mappings once from a facade type's declarations.
//!
//! # Invariants
//! - Tables are read-only once built; scans never add entries.
//! - Keys compare parameter lists by printed signature, never by scope.

use crate::model::member::MethodDef;
use crate::model::types::{MethodRef, TypeRef, CONSTRUCTOR_NAME};
use crate::symbols::HostType;
use std::collections::BTreeMap;

/// Static facade method name that stands in for a constructor.
pub const FACTORY_METHOD_NAME: &str = "Constructor";

/// Call shape of an original member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MemberKind {
    Static,
    Instance,
    Constructor,
}

/// Original member shape used as a facade table key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemberKey {
    pub name: String,
    pub parameters: Vec<String>,
    pub kind: MemberKind,
}

impl MemberKey {
    pub fn new(name: impl Into<String>, parameters: &[TypeRef], kind: MemberKind) -> Self {
        Self {
            name: name.into(),
            parameters: parameters.iter().map(TypeRef::signature).collect(),
            kind,
        }
    }

    /// Key for a referenced method.
    pub fn of(method: &MethodRef) -> Self {
        let kind = if method.is_constructor() {
            MemberKind::Constructor
        } else if method.has_this {
            MemberKind::Instance
        } else {
            MemberKind::Static
        };
        Self::new(method.name.as_str(), &method.parameters, kind)
    }
}

/// Original type -> facade type member redirection table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacadeTable {
    original_type: String,
    facade_type: TypeRef,
    entries: BTreeMap<MemberKey, MethodRef>,
}

impl FacadeTable {
    pub fn new(original_type: impl Into<String>, facade_type: TypeRef) -> Self {
        Self {
            original_type: original_type.into(),
            facade_type,
            entries: BTreeMap::new(),
        }
    }

    /// Adds or replaces one explicit mapping.
    pub fn with_entry(mut self, key: MemberKey, replacement: MethodRef) -> Self {
        self.entries.insert(key, replacement);
        self
    }

    /// Derives a table from the facade type's declared methods.
    ///
    /// - A static facade method maps the original static method of the same
    ///   name and parameters.
    /// - When its first parameter is the original type, it also maps the
    ///   original instance method taking the remaining parameters.
    /// - A facade constructor maps the original constructor with the same
    ///   parameters; a static `Constructor` method returning the original
    ///   type maps it to a factory call instead.
    pub fn from_declarations(original_type: &str, facade: &HostType, scope: &str) -> Self {
        let facade_ref = TypeRef::new(scope, facade.full_name.as_str());
        let mut table = Self::new(original_type, facade_ref);

        for method in &facade.methods {
            if method.is_constructor() {
                let key = MemberKey::new(
                    CONSTRUCTOR_NAME,
                    &method.parameters,
                    MemberKind::Constructor,
                );
                let replacement =
                    MethodRef::constructor(table.facade_type.clone(), method.parameters.clone());
                table.entries.insert(key, replacement);
                continue;
            }
            if !method.is_static {
                continue;
            }

            let replacement = table.static_replacement(method);
            if method.name == FACTORY_METHOD_NAME
                && method.return_type.element_name() == original_type
            {
                let key = MemberKey::new(
                    CONSTRUCTOR_NAME,
                    &method.parameters,
                    MemberKind::Constructor,
                );
                table.entries.insert(key, replacement);
                continue;
            }

            table.entries.insert(
                MemberKey::new(method.name.as_str(), &method.parameters, MemberKind::Static),
                replacement.clone(),
            );
            if let Some((receiver, rest)) = method.parameters.split_first() {
                if receiver.element_name() == original_type {
                    table.entries.insert(
                        MemberKey::new(method.name.as_str(), rest, MemberKind::Instance),
                        replacement,
                    );
                }
            }
        }
        table
    }

    /// Maps original instance method `original_name` to every static facade
    /// method named `facade_name` that takes the original type first.
    pub fn with_alias(mut self, original_name: &str, facade: &HostType, facade_name: &str) -> Self {
        let aliases: Vec<(MemberKey, MethodRef)> = facade
            .methods
            .iter()
            .filter(|method| method.is_static && method.name == facade_name)
            .filter_map(|method| {
                let (receiver, rest) = method.parameters.split_first()?;
                if receiver.element_name() != self.original_type {
                    return None;
                }
                Some((
                    MemberKey::new(original_name, rest, MemberKind::Instance),
                    self.static_replacement(method),
                ))
            })
            .collect();
        self.entries.extend(aliases);
        self
    }

    fn static_replacement(&self, method: &MethodDef) -> MethodRef {
        MethodRef::new_static(
            self.facade_type.clone(),
            method.name.as_str(),
            method.return_type.clone(),
            method.parameters.clone(),
        )
    }

    pub fn original_type(&self) -> &str {
        &self.original_type
    }

    pub fn facade_type(&self) -> &TypeRef {
        &self.facade_type
    }

    /// Replacement for a method referenced on the original type.
    pub fn lookup(&self, method: &MethodRef) -> Option<&MethodRef> {
        if method.declaring_type.full_name != self.original_type {
            return None;
        }
        self.entries.get(&MemberKey::of(method))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
