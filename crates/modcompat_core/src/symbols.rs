//! Versioned host symbol table.
//!
//! # Responsibility
//! - Describe the API surface of the running host for one compatibility
//!   epoch: assemblies, their types and each type's members.
//! - Resolve type, field and method references from mod code against it.
//!
//! # Invariants
//! - A type full name is declared by at most one assembly.
//! - Member lookup walks the declared base-type chain, bounded by
//!   `MAX_BASE_DEPTH` so malformed cyclic tables cannot hang a scan.
//! - The table is immutable once built and shared read-only by every scan.

use crate::model::member::{EventDef, FieldDef, MethodDef, PropertyDef};
use crate::model::types::{FieldRef, MethodRef, TypeRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

const MAX_BASE_DEPTH: usize = 32;

/// Type declared by a host assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostType {
    pub full_name: String,
    #[serde(default)]
    pub base_type: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub methods: Vec<MethodDef>,
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
    #[serde(default)]
    pub events: Vec<EventDef>,
}

impl HostType {
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            base_type: None,
            fields: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn with_base(mut self, base_type: impl Into<String>) -> Self {
        self.base_type = Some(base_type.into());
        self
    }

    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_event(mut self, event: EventDef) -> Self {
        self.events.push(event);
        self
    }
}

/// Host assembly declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostAssembly {
    pub name: String,
    #[serde(default)]
    pub types: Vec<HostType>,
}

impl HostAssembly {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: Vec::new(),
        }
    }

    pub fn with_type(mut self, ty: HostType) -> Self {
        self.types.push(ty);
        self
    }
}

#[derive(Debug, Deserialize)]
struct SymbolTableDocument {
    #[serde(default)]
    assemblies: Vec<HostAssembly>,
}

/// Symbol table construction errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolTableError {
    EmptyAssemblyName,
    DuplicateAssembly(String),
    DuplicateType { full_name: String, first: String, second: String },
    Json(String),
}

impl Display for SymbolTableError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyAssemblyName => write!(f, "host assembly name must not be empty"),
            Self::DuplicateAssembly(name) => write!(f, "host assembly declared twice: {name}"),
            Self::DuplicateType {
                full_name,
                first,
                second,
            } => write!(
                f,
                "host type {full_name} declared by both {first} and {second}"
            ),
            Self::Json(message) => write!(f, "invalid symbol table document: {message}"),
        }
    }
}

impl Error for SymbolTableError {}

/// Read-only host API surface.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    assemblies: BTreeMap<String, HostAssembly>,
    type_index: BTreeMap<String, (String, usize)>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from a JSON document `{ "assemblies": [...] }`.
    pub fn from_json_str(json: &str) -> Result<Self, SymbolTableError> {
        let document: SymbolTableDocument =
            serde_json::from_str(json).map_err(|err| SymbolTableError::Json(err.to_string()))?;
        let mut table = Self::new();
        for assembly in document.assemblies {
            table.add_assembly(assembly)?;
        }
        Ok(table)
    }

    /// Adds one assembly and indexes its types.
    pub fn add_assembly(&mut self, assembly: HostAssembly) -> Result<(), SymbolTableError> {
        let name = assembly.name.trim().to_string();
        if name.is_empty() {
            return Err(SymbolTableError::EmptyAssemblyName);
        }
        if self.assemblies.contains_key(name.as_str()) {
            return Err(SymbolTableError::DuplicateAssembly(name));
        }

        let mut pending = BTreeMap::new();
        for (index, ty) in assembly.types.iter().enumerate() {
            let existing = self
                .type_index
                .get(ty.full_name.as_str())
                .map(|(owner, _)| owner.clone())
                .or_else(|| pending.get(ty.full_name.as_str()).map(|_| name.clone()));
            if let Some(first) = existing {
                return Err(SymbolTableError::DuplicateType {
                    full_name: ty.full_name.clone(),
                    first,
                    second: name,
                });
            }
            pending.insert(ty.full_name.clone(), index);
        }

        for (full_name, index) in pending {
            self.type_index.insert(full_name, (name.clone(), index));
        }
        self.assemblies.insert(name, assembly);
        Ok(())
    }

    pub fn with_assembly(mut self, assembly: HostAssembly) -> Result<Self, SymbolTableError> {
        self.add_assembly(assembly)?;
        Ok(self)
    }

    pub fn assembly_names(&self) -> Vec<&str> {
        self.assemblies.keys().map(String::as_str).collect()
    }

    pub fn type_count(&self) -> usize {
        self.type_index.len()
    }

    /// Looks up a type by full name; array suffixes are ignored.
    pub fn find_type(&self, full_name: &str) -> Option<&HostType> {
        let (assembly, index) = self.type_index.get(full_name.trim_end_matches("[]"))?;
        self.assemblies.get(assembly)?.types.get(*index)
    }

    /// Assembly that declares `full_name`.
    pub fn type_assembly(&self, full_name: &str) -> Option<&str> {
        self.type_index
            .get(full_name.trim_end_matches("[]"))
            .map(|(assembly, _)| assembly.as_str())
    }

    /// Reference to a declared type, scoped to its declaring assembly.
    pub fn type_ref(&self, full_name: &str) -> Option<TypeRef> {
        let assembly = self.type_assembly(full_name)?;
        Some(TypeRef::new(assembly, full_name))
    }

    pub fn resolve_type(&self, ty: &TypeRef) -> Option<&HostType> {
        self.find_type(ty.element_name())
    }

    /// Field by name on `type_name` or any base type.
    pub fn find_field(&self, type_name: &str, field_name: &str) -> Option<&FieldDef> {
        self.hierarchy(type_name)
            .find_map(|ty| ty.fields.iter().find(|field| field.name == field_name))
    }

    pub fn resolve_field(&self, field: &FieldRef) -> Option<&FieldDef> {
        self.find_field(field.declaring_type.element_name(), &field.name)
    }

    /// Property by name on `type_name` or any base type.
    pub fn find_property(&self, type_name: &str, property_name: &str) -> Option<&PropertyDef> {
        self.hierarchy(type_name).find_map(|ty| {
            ty.properties
                .iter()
                .find(|property| property.name == property_name)
        })
    }

    pub fn find_event(&self, type_name: &str, event_name: &str) -> Option<&EventDef> {
        self.hierarchy(type_name)
            .find_map(|ty| ty.events.iter().find(|event| event.name == event_name))
    }

    /// Method by name and parameter signatures. Return types are not
    /// compared; shape mismatches are a separate check.
    ///
    /// Constructors are never inherited, so they are only looked up on the
    /// declaring type itself.
    pub fn resolve_method(&self, method: &MethodRef) -> Option<&MethodDef> {
        let type_name = method.declaring_type.element_name();
        if method.is_constructor() {
            return self.find_type(type_name)?.methods.iter().find(|candidate| {
                candidate.is_constructor() && candidate.has_parameters(&method.parameters)
            });
        }
        self.hierarchy(type_name).find_map(|ty| {
            ty.methods.iter().find(|candidate| {
                candidate.name == method.name && candidate.has_parameters(&method.parameters)
            })
        })
    }

    /// Whether a referenced method exists, declared directly or as a
    /// property or event accessor.
    pub fn method_exists(&self, method: &MethodRef) -> bool {
        self.resolve_method(method).is_some() || self.resolve_accessor(method)
    }

    fn resolve_accessor(&self, method: &MethodRef) -> bool {
        let type_name = method.declaring_type.element_name();
        if let Some(name) = method.name.strip_prefix("get_") {
            return method.parameters.is_empty()
                && self
                    .find_property(type_name, name)
                    .is_some_and(|property| property.has_getter);
        }
        if let Some(name) = method.name.strip_prefix("set_") {
            return method.parameters.len() == 1
                && self
                    .find_property(type_name, name)
                    .is_some_and(|property| property.has_setter);
        }
        if let Some(name) = method
            .name
            .strip_prefix("add_")
            .or_else(|| method.name.strip_prefix("remove_"))
        {
            return method.parameters.len() == 1 && self.find_event(type_name, name).is_some();
        }
        false
    }

    /// Every method named `name` on the type and its bases.
    pub fn methods_named(&self, type_name: &str, name: &str) -> Vec<&MethodDef> {
        self.hierarchy(type_name)
            .flat_map(|ty| ty.methods.iter().filter(move |method| method.name == name))
            .collect()
    }

    fn hierarchy<'a>(&'a self, type_name: &str) -> impl Iterator<Item = &'a HostType> + 'a {
        let mut next = self.find_type(type_name);
        let mut depth = 0;
        std::iter::from_fn(move || {
            if depth >= MAX_BASE_DEPTH {
                return None;
            }
            let current = next?;
            depth += 1;
            next = current
                .base_type
                .as_deref()
                .and_then(|base| self.find_type(base));
            Some(current)
        })
    }
}
