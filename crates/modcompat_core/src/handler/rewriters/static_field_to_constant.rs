//! Inlines static fields that became compile-time constants.

use crate::handler::{HandlerContext, HandlerPhase, HandlerResult, InstructionHandler};
use crate::model::instruction::{Constant, Instruction, OpCode, Operand};

/// Value that can be pushed with a constant load.
pub trait ConstantValue: Send + Sync {
    fn to_constant(&self) -> Constant;
}

impl ConstantValue for i32 {
    fn to_constant(&self) -> Constant {
        Constant::Int32(*self)
    }
}

impl ConstantValue for i64 {
    fn to_constant(&self) -> Constant {
        Constant::Int64(*self)
    }
}

impl ConstantValue for f32 {
    fn to_constant(&self) -> Constant {
        Constant::Float32(*self)
    }
}

impl ConstantValue for f64 {
    fn to_constant(&self) -> Constant {
        Constant::Float64(*self)
    }
}

impl ConstantValue for bool {
    fn to_constant(&self) -> Constant {
        Constant::Bool(*self)
    }
}

impl ConstantValue for String {
    fn to_constant(&self) -> Constant {
        Constant::String(self.clone())
    }
}

/// Static field whose value is now fixed at `value`.
///
/// Reads become constant loads. Writes and address loads cannot be
/// expressed against a constant and are reported as fatal.
pub struct StaticFieldToConstantRewriter<T: ConstantValue> {
    name: String,
    type_name: String,
    field_name: String,
    value: T,
}

impl<T: ConstantValue> StaticFieldToConstantRewriter<T> {
    pub fn new(type_name: impl Into<String>, field_name: impl Into<String>, value: T) -> Self {
        let type_name = type_name.into();
        let field_name = field_name.into();
        Self {
            name: format!("static_field_to_constant:{type_name}.{field_name}"),
            type_name,
            field_name,
            value,
        }
    }
}

impl<T: ConstantValue> InstructionHandler for StaticFieldToConstantRewriter<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn phase(&self) -> HandlerPhase {
        HandlerPhase::VersionRewrite
    }

    fn handle(&self, instruction: &mut Instruction, _ctx: &HandlerContext<'_>) -> HandlerResult {
        if !instruction.opcode.is_static_field_access() {
            return HandlerResult::None;
        }
        let Operand::Field(field) = &instruction.operand else {
            return HandlerResult::None;
        };
        if !field.is(&self.type_name, &self.field_name) {
            return HandlerResult::None;
        }

        match instruction.opcode {
            OpCode::LoadStaticField => {
                *instruction = Instruction::constant(self.value.to_constant());
                HandlerResult::Rewrote
            }
            _ => HandlerResult::DetectedIncompatibleWrite,
        }
    }

    fn describe(
        &self,
        before: &Instruction,
        after: &Instruction,
        result: HandlerResult,
        _ctx: &HandlerContext<'_>,
    ) -> String {
        match result {
            HandlerResult::DetectedIncompatibleWrite => format!(
                "{}: `{after}` writes {}.{}, which is now the constant {}",
                self.name,
                self.type_name,
                self.field_name,
                self.value.to_constant()
            ),
            _ => format!("{}: `{before}` -> `{after}`", self.name),
        }
    }
}
