//! Member declarations shared by host symbol tables and mod modules.

use crate::model::instruction::Constant;
use crate::model::types::{TypeRef, CONSTRUCTOR_NAME};
use serde::{Deserialize, Serialize};

/// Declared field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: TypeRef,
    #[serde(default)]
    pub is_static: bool,
    /// Compile-time value, when the field is a literal constant.
    #[serde(default)]
    pub constant: Option<Constant>,
}

impl FieldDef {
    pub fn instance(name: impl Into<String>, field_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            field_type,
            is_static: false,
            constant: None,
        }
    }

    pub fn new_static(name: impl Into<String>, field_type: TypeRef) -> Self {
        Self {
            is_static: true,
            ..Self::instance(name, field_type)
        }
    }

    pub fn literal(name: impl Into<String>, value: Constant) -> Self {
        let field_type = TypeRef::system(value.type_name());
        Self {
            constant: Some(value),
            ..Self::new_static(name, field_type)
        }
    }
}

/// Declared method or constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDef {
    pub name: String,
    pub return_type: TypeRef,
    #[serde(default)]
    pub parameters: Vec<TypeRef>,
    #[serde(default)]
    pub is_static: bool,
}

impl MethodDef {
    pub fn instance(name: impl Into<String>, return_type: TypeRef, parameters: Vec<TypeRef>) -> Self {
        Self {
            name: name.into(),
            return_type,
            parameters,
            is_static: false,
        }
    }

    pub fn new_static(
        name: impl Into<String>,
        return_type: TypeRef,
        parameters: Vec<TypeRef>,
    ) -> Self {
        Self {
            is_static: true,
            ..Self::instance(name, return_type, parameters)
        }
    }

    pub fn constructor(parameters: Vec<TypeRef>) -> Self {
        Self::instance(CONSTRUCTOR_NAME, TypeRef::void(), parameters)
    }

    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }

    /// Parameter-list equality by printed signature.
    pub fn has_parameters(&self, parameters: &[TypeRef]) -> bool {
        self.parameters.len() == parameters.len()
            && self
                .parameters
                .iter()
                .zip(parameters)
                .all(|(declared, expected)| declared.is_same_type(expected))
    }
}

/// Declared property and which accessors it exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDef {
    pub name: String,
    pub property_type: TypeRef,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default = "default_true")]
    pub has_getter: bool,
    #[serde(default = "default_true")]
    pub has_setter: bool,
}

impl PropertyDef {
    /// Read/write instance property.
    pub fn instance(name: impl Into<String>, property_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            property_type,
            is_static: false,
            has_getter: true,
            has_setter: true,
        }
    }

    /// Read/write static property.
    pub fn new_static(name: impl Into<String>, property_type: TypeRef) -> Self {
        Self {
            is_static: true,
            ..Self::instance(name, property_type)
        }
    }

    pub fn read_only(mut self) -> Self {
        self.has_setter = false;
        self
    }

    pub fn getter_name(&self) -> String {
        format!("get_{}", self.name)
    }

    pub fn setter_name(&self) -> String {
        format!("set_{}", self.name)
    }
}

/// Declared event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDef {
    pub name: String,
    pub event_type: TypeRef,
}

impl EventDef {
    pub fn new(name: impl Into<String>, event_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            event_type,
        }
    }
}

fn default_true() -> bool {
    true
}
