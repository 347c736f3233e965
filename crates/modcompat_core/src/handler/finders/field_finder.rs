//! Detects references to one field.

use super::phase_for;
use crate::handler::{HandlerContext, HandlerPhase, HandlerResult, InstructionHandler};
use crate::model::instruction::Instruction;

pub struct FieldFinder {
    name: String,
    type_name: String,
    field_name: String,
    result: HandlerResult,
}

impl FieldFinder {
    pub fn new(
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        result: HandlerResult,
    ) -> Self {
        let type_name = type_name.into();
        let field_name = field_name.into();
        Self {
            name: format!("field_finder:{type_name}.{field_name}"),
            type_name,
            field_name,
            result,
        }
    }
}

impl InstructionHandler for FieldFinder {
    fn name(&self) -> &str {
        &self.name
    }

    fn phase(&self) -> HandlerPhase {
        phase_for(self.result)
    }

    fn handle(&self, instruction: &mut Instruction, _ctx: &HandlerContext<'_>) -> HandlerResult {
        match instruction.field_ref() {
            Some(field) if field.is(&self.type_name, &self.field_name) => self.result,
            _ => HandlerResult::None,
        }
    }
}
