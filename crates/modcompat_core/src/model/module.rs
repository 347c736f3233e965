//! Mod module: the compiled unit being validated.
//!
//! # Responsibility
//! - Own every method body of every type declared by one mod.
//! - Lower accessor-field slots into the physical instruction pair they
//!   stand for when a body is emitted.
//!
//! # Invariants
//! - Method bodies are only ever mutated slot by slot; their length is fixed
//!   for the duration of a scan.

use crate::epoch::Platform;
use crate::model::instruction::{Instruction, OpCode, Operand};
use crate::model::member::FieldDef;
use crate::model::types::TypeRef;
use serde::{Deserialize, Serialize};

/// Ordered instruction sequence of one method.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MethodBody {
    pub instructions: Vec<Instruction>,
}

impl MethodBody {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Instruction> {
        self.instructions.iter_mut()
    }

    /// Emits the physical instruction stream.
    ///
    /// Accessor-field slots expand into `call accessor` followed by the
    /// matching instance field access; every other slot is copied as is.
    pub fn lower(&self) -> Vec<Instruction> {
        let mut lowered = Vec::with_capacity(self.instructions.len());
        for instruction in &self.instructions {
            let Operand::AccessorField(indirect) = &instruction.operand else {
                lowered.push(instruction.clone());
                continue;
            };
            let field_opcode = match instruction.opcode {
                OpCode::LoadStaticField | OpCode::LoadField => OpCode::LoadField,
                OpCode::LoadStaticFieldAddress | OpCode::LoadFieldAddress => {
                    OpCode::LoadFieldAddress
                }
                OpCode::StoreStaticField | OpCode::StoreField => OpCode::StoreField,
                other => other,
            };
            lowered.push(Instruction::method(
                OpCode::Call,
                indirect.accessor.clone(),
            ));
            lowered.push(Instruction::field(field_opcode, indirect.field.clone()));
        }
        lowered
    }
}

/// Method declared by a mod type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleMethod {
    pub name: String,
    /// Abstract and extern methods carry no body.
    #[serde(default)]
    pub body: Option<MethodBody>,
}

impl ModuleMethod {
    pub fn new(name: impl Into<String>, instructions: Vec<Instruction>) -> Self {
        Self {
            name: name.into(),
            body: Some(MethodBody::new(instructions)),
        }
    }

    pub fn without_body(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: None,
        }
    }
}

/// Type declared by a mod.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleType {
    pub full_name: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub methods: Vec<ModuleMethod>,
}

impl ModuleType {
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_method(mut self, method: ModuleMethod) -> Self {
        self.methods.push(method);
        self
    }
}

/// One compiled mod module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDef {
    pub name: String,
    /// Assembly name; scope of references to this module's own types.
    pub assembly: String,
    /// Names of referenced assemblies.
    #[serde(default)]
    pub references: Vec<String>,
    /// Platform the module was compiled for, when known.
    #[serde(default)]
    pub target_platform: Option<Platform>,
    #[serde(default)]
    pub types: Vec<ModuleType>,
}

impl ModuleDef {
    pub fn new(name: impl Into<String>, assembly: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            assembly: assembly.into(),
            references: Vec::new(),
            target_platform: None,
            types: Vec::new(),
        }
    }

    pub fn with_reference(mut self, assembly: impl Into<String>) -> Self {
        self.references.push(assembly.into());
        self
    }

    pub fn with_target_platform(mut self, platform: Platform) -> Self {
        self.target_platform = Some(platform);
        self
    }

    pub fn with_type(mut self, ty: ModuleType) -> Self {
        self.types.push(ty);
        self
    }

    /// Reference to a type declared by this module.
    pub fn type_ref(&self, full_name: &str) -> Option<TypeRef> {
        self.types
            .iter()
            .find(|ty| ty.full_name == full_name)
            .map(|ty| TypeRef::new(self.assembly.as_str(), ty.full_name.as_str()))
    }

    /// Total number of instructions across all bodies.
    pub fn instruction_count(&self) -> usize {
        self.types
            .iter()
            .flat_map(|ty| ty.methods.iter())
            .filter_map(|method| method.body.as_ref())
            .map(MethodBody::len)
            .sum()
    }

    /// Instruction at a positional address.
    pub fn instruction(
        &self,
        type_index: usize,
        method_index: usize,
        offset: usize,
    ) -> Option<&Instruction> {
        self.types
            .get(type_index)?
            .methods
            .get(method_index)?
            .body
            .as_ref()?
            .get(offset)
    }

    /// Copy of this module with every body lowered to physical instructions.
    pub fn lowered(&self) -> ModuleDef {
        let mut lowered = self.clone();
        for method in lowered.types.iter_mut().flat_map(|ty| ty.methods.iter_mut()) {
            if let Some(body) = method.body.as_mut() {
                *body = MethodBody::new(body.lower());
            }
        }
        lowered
    }
}
