//! Normalized instruction model.
//!
//! # Responsibility
//! - Represent one compiled instruction as an operation plus a typed operand.
//! - Classify instructions so rewrites can be checked for shape preservation.
//!
//! # Invariants
//! - An instruction's identity is its position in the owning method body.
//! - Operands are replaced in place; instructions are never inserted or
//!   removed during a scan.

use crate::model::types::{AccessorFieldRef, FieldRef, MethodRef, TypeRef};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Operation codes the pipeline understands.
///
/// Anything the handlers never need to inspect is carried as `Opaque` with
/// its raw code so bodies survive a decode/encode cycle unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpCode {
    Nop,
    LoadConstant,
    LoadArgument,
    LoadLocal,
    StoreLocal,
    LoadField,
    StoreField,
    LoadFieldAddress,
    LoadStaticField,
    StoreStaticField,
    LoadStaticFieldAddress,
    Call,
    CallVirtual,
    NewObject,
    LoadFunction,
    LoadVirtualFunction,
    LoadToken,
    NewArray,
    CastClass,
    IsInstance,
    Box,
    UnboxAny,
    InitObject,
    Pop,
    Duplicate,
    Return,
    Opaque(u16),
}

impl OpCode {
    /// Disassembly mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Nop => "nop",
            Self::LoadConstant => "ldc",
            Self::LoadArgument => "ldarg",
            Self::LoadLocal => "ldloc",
            Self::StoreLocal => "stloc",
            Self::LoadField => "ldfld",
            Self::StoreField => "stfld",
            Self::LoadFieldAddress => "ldflda",
            Self::LoadStaticField => "ldsfld",
            Self::StoreStaticField => "stsfld",
            Self::LoadStaticFieldAddress => "ldsflda",
            Self::Call => "call",
            Self::CallVirtual => "callvirt",
            Self::NewObject => "newobj",
            Self::LoadFunction => "ldftn",
            Self::LoadVirtualFunction => "ldvirtftn",
            Self::LoadToken => "ldtoken",
            Self::NewArray => "newarr",
            Self::CastClass => "castclass",
            Self::IsInstance => "isinst",
            Self::Box => "box",
            Self::UnboxAny => "unbox.any",
            Self::InitObject => "initobj",
            Self::Pop => "pop",
            Self::Duplicate => "dup",
            Self::Return => "ret",
            Self::Opaque(_) => "opaque",
        }
    }

    pub fn is_field_access(self) -> bool {
        matches!(
            self,
            Self::LoadField
                | Self::StoreField
                | Self::LoadFieldAddress
                | Self::LoadStaticField
                | Self::StoreStaticField
                | Self::LoadStaticFieldAddress
        )
    }

    pub fn is_static_field_access(self) -> bool {
        matches!(
            self,
            Self::LoadStaticField | Self::StoreStaticField | Self::LoadStaticFieldAddress
        )
    }

    /// Plain value read (address loads excluded).
    pub fn is_field_read(self) -> bool {
        matches!(self, Self::LoadField | Self::LoadStaticField)
    }

    pub fn is_field_write(self) -> bool {
        matches!(self, Self::StoreField | Self::StoreStaticField)
    }

    /// Call or constructor call.
    pub fn is_call(self) -> bool {
        matches!(self, Self::Call | Self::CallVirtual | Self::NewObject)
    }
}

impl Display for OpCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Opaque(code) => write!(f, "opaque.{code:#06x}"),
            other => write!(f, "{}", other.mnemonic()),
        }
    }
}

/// Literal operand value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constant {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
}

impl Constant {
    /// Runtime type of the literal.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "System.Object",
            Self::Bool(_) => "System.Boolean",
            Self::Int32(_) => "System.Int32",
            Self::Int64(_) => "System.Int64",
            Self::Float32(_) => "System.Single",
            Self::Float64(_) => "System.Double",
            Self::String(_) => "System.String",
        }
    }
}

impl Display for Constant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int32(value) => write!(f, "{value}"),
            Self::Int64(value) => write!(f, "{value}L"),
            Self::Float32(value) => write!(f, "{value}f"),
            Self::Float64(value) => write!(f, "{value}d"),
            Self::String(value) => write!(f, "{value:?}"),
        }
    }
}

/// Typed operand of one instruction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    #[default]
    None,
    Constant(Constant),
    Type(TypeRef),
    Field(FieldRef),
    Method(MethodRef),
    AccessorField(AccessorFieldRef),
}

impl Operand {
    /// Mutable handles to every type mentioned by this operand.
    pub fn type_refs_mut(&mut self) -> Vec<&mut TypeRef> {
        match self {
            Self::None | Self::Constant(_) => Vec::new(),
            Self::Type(ty) => vec![ty],
            Self::Field(field) => vec![&mut field.declaring_type, &mut field.field_type],
            Self::Method(method) => method_type_refs_mut(method),
            Self::AccessorField(indirect) => {
                let AccessorFieldRef { accessor, field } = indirect;
                let mut types = method_type_refs_mut(accessor);
                types.push(&mut field.declaring_type);
                types.push(&mut field.field_type);
                types
            }
        }
    }
}

fn method_type_refs_mut(method: &mut MethodRef) -> Vec<&mut TypeRef> {
    let MethodRef {
        declaring_type,
        return_type,
        parameters,
        ..
    } = method;
    let mut types = vec![declaring_type, return_type];
    types.extend(parameters.iter_mut());
    types
}

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Constant(value) => write!(f, "{value}"),
            Self::Type(ty) => write!(f, "{ty}"),
            Self::Field(field) => write!(f, "{field}"),
            Self::Method(method) => write!(f, "{method}"),
            Self::AccessorField(indirect) => write!(f, "{indirect}"),
        }
    }
}

/// Coarse operation class used to check rewrite shape preservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationClass {
    Call,
    FieldAccess,
    TypeReference,
    Constant,
    Other,
}

/// One instruction in a method body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: OpCode,
    #[serde(default)]
    pub operand: Operand,
}

impl Instruction {
    pub fn new(opcode: OpCode, operand: Operand) -> Self {
        Self { opcode, operand }
    }

    /// Instruction without operand (`ret`, `pop`, ...).
    pub fn simple(opcode: OpCode) -> Self {
        Self::new(opcode, Operand::None)
    }

    pub fn constant(value: Constant) -> Self {
        Self::new(OpCode::LoadConstant, Operand::Constant(value))
    }

    pub fn field(opcode: OpCode, field: FieldRef) -> Self {
        Self::new(opcode, Operand::Field(field))
    }

    pub fn method(opcode: OpCode, method: MethodRef) -> Self {
        Self::new(opcode, Operand::Method(method))
    }

    pub fn type_ref(opcode: OpCode, ty: TypeRef) -> Self {
        Self::new(opcode, Operand::Type(ty))
    }

    pub fn class(&self) -> OperationClass {
        match self.opcode {
            OpCode::Call
            | OpCode::CallVirtual
            | OpCode::NewObject
            | OpCode::LoadFunction
            | OpCode::LoadVirtualFunction => OperationClass::Call,
            op if op.is_field_access() => OperationClass::FieldAccess,
            OpCode::LoadConstant => OperationClass::Constant,
            OpCode::NewArray
            | OpCode::CastClass
            | OpCode::IsInstance
            | OpCode::Box
            | OpCode::UnboxAny
            | OpCode::InitObject => OperationClass::TypeReference,
            OpCode::LoadToken => match self.operand {
                Operand::Type(_) => OperationClass::TypeReference,
                Operand::Field(_) | Operand::AccessorField(_) => OperationClass::FieldAccess,
                Operand::Method(_) => OperationClass::Call,
                Operand::None | Operand::Constant(_) => OperationClass::Other,
            },
            _ => OperationClass::Other,
        }
    }

    /// Field operand, including the target of an accessor-field operand.
    pub fn field_ref(&self) -> Option<&FieldRef> {
        match &self.operand {
            Operand::Field(field) => Some(field),
            Operand::AccessorField(indirect) => Some(&indirect.field),
            _ => None,
        }
    }

    pub fn method_ref(&self) -> Option<&MethodRef> {
        match &self.operand {
            Operand::Method(method) => Some(method),
            Operand::AccessorField(indirect) => Some(&indirect.accessor),
            _ => None,
        }
    }

    /// Every type the operand mentions, including member signatures.
    pub fn referenced_types(&self) -> Vec<&TypeRef> {
        match &self.operand {
            Operand::None | Operand::Constant(_) => Vec::new(),
            Operand::Type(ty) => vec![ty],
            Operand::Field(field) => vec![&field.declaring_type, &field.field_type],
            Operand::Method(method) => method.referenced_types(),
            Operand::AccessorField(indirect) => {
                let mut types = indirect.accessor.referenced_types();
                types.push(&indirect.field.declaring_type);
                types.push(&indirect.field.field_type);
                types
            }
        }
    }

    pub fn references_type(&self, full_name: &str) -> bool {
        self.referenced_types()
            .iter()
            .any(|ty| ty.references(full_name))
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.operand {
            Operand::None => write!(f, "{}", self.opcode),
            _ => write!(f, "{} {}", self.opcode, self.operand),
        }
    }
}
