//! Replaces every occurrence of one type signature with another type.

use crate::handler::{HandlerContext, HandlerPhase, HandlerResult, InstructionHandler};
use crate::model::instruction::Instruction;
use crate::model::types::{TypeParseError, TypeRef};

pub struct TypeReferenceRewriter {
    name: String,
    from: TypeRef,
    substitute: TypeRef,
}

impl TypeReferenceRewriter {
    /// # Errors
    /// - Returns an error when `signature` does not parse.
    pub fn new(signature: &str, substitute: TypeRef) -> Result<Self, TypeParseError> {
        let from = TypeRef::parse(signature)?;
        Ok(Self {
            name: format!("type_reference:{from}"),
            from,
            substitute,
        })
    }

    fn replace_in(&self, ty: &mut TypeRef) -> bool {
        if ty.is_same_type(&self.from) {
            *ty = self.substitute.clone();
            return true;
        }
        let mut changed = false;
        for arg in &mut ty.generic_args {
            changed |= self.replace_in(arg);
        }
        changed
    }
}

impl InstructionHandler for TypeReferenceRewriter {
    fn name(&self) -> &str {
        &self.name
    }

    fn phase(&self) -> HandlerPhase {
        HandlerPhase::VersionRewrite
    }

    fn handle(&self, instruction: &mut Instruction, _ctx: &HandlerContext<'_>) -> HandlerResult {
        let mut changed = false;
        for ty in instruction.operand.type_refs_mut() {
            changed |= self.replace_in(ty);
        }
        if changed {
            HandlerResult::Rewrote
        } else {
            HandlerResult::None
        }
    }
}
