//! Renames a field reference within its declaring type.

use crate::handler::{HandlerContext, HandlerPhase, HandlerResult, InstructionHandler};
use crate::model::instruction::{Instruction, Operand};

pub struct FieldReplaceRewriter {
    name: String,
    type_name: String,
    old_field: String,
    new_field: String,
}

impl FieldReplaceRewriter {
    pub fn new(
        type_name: impl Into<String>,
        old_field: impl Into<String>,
        new_field: impl Into<String>,
    ) -> Self {
        let type_name = type_name.into();
        let old_field = old_field.into();
        Self {
            name: format!("field_replace:{type_name}.{old_field}"),
            type_name,
            old_field,
            new_field: new_field.into(),
        }
    }
}

impl InstructionHandler for FieldReplaceRewriter {
    fn name(&self) -> &str {
        &self.name
    }

    fn phase(&self) -> HandlerPhase {
        HandlerPhase::VersionRewrite
    }

    fn handle(&self, instruction: &mut Instruction, ctx: &HandlerContext<'_>) -> HandlerResult {
        if !instruction.opcode.is_field_access() {
            return HandlerResult::None;
        }
        let Operand::Field(field) = &mut instruction.operand else {
            return HandlerResult::None;
        };
        if !field.is(&self.type_name, &self.old_field) {
            return HandlerResult::None;
        }
        let Some(target) = ctx.symbols.find_field(&self.type_name, &self.new_field) else {
            return HandlerResult::None;
        };

        field.name = self.new_field.clone();
        field.field_type = target.field_type.clone();
        HandlerResult::Rewrote
    }
}
