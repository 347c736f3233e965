//! Detects any reference to one type.

use super::phase_for;
use crate::handler::{HandlerContext, HandlerPhase, HandlerResult, InstructionHandler};
use crate::model::instruction::Instruction;

pub struct TypeFinder {
    name: String,
    type_name: String,
    result: HandlerResult,
}

impl TypeFinder {
    pub fn new(type_name: impl Into<String>, result: HandlerResult) -> Self {
        let type_name = type_name.into();
        Self {
            name: format!("type_finder:{type_name}"),
            type_name,
            result,
        }
    }
}

impl InstructionHandler for TypeFinder {
    fn name(&self) -> &str {
        &self.name
    }

    fn phase(&self) -> HandlerPhase {
        phase_for(self.result)
    }

    fn handle(&self, instruction: &mut Instruction, _ctx: &HandlerContext<'_>) -> HandlerResult {
        if instruction.references_type(&self.type_name) {
            self.result
        } else {
            HandlerResult::None
        }
    }

    fn describe(
        &self,
        _before: &Instruction,
        after: &Instruction,
        result: HandlerResult,
        _ctx: &HandlerContext<'_>,
    ) -> String {
        format!(
            "{}: `{after}` references {} ({})",
            self.name,
            self.type_name,
            result.description()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::TypeFinder;
    use crate::handler::testing::{game_type, Fixture};
    use crate::handler::{HandlerPhase, HandlerResult, InstructionHandler};
    use crate::model::instruction::{Constant, Instruction, OpCode};
    use crate::model::types::{MethodRef, TypeRef};

    fn file() -> TypeRef {
        TypeRef::system("System.IO.File")
    }

    #[test]
    fn matches_declaring_types_and_generic_arguments() {
        let fixture = Fixture::new();
        let finder = TypeFinder::new("System.IO.File", HandlerResult::DetectedFilesystemAccess);
        assert_eq!(finder.phase(), HandlerPhase::Heightened);

        let mut call = Instruction::method(
            OpCode::Call,
            MethodRef::new_static(
                file(),
                "ReadAllText",
                TypeRef::system("System.String"),
                vec![TypeRef::system("System.String")],
            ),
        );
        let before = call.clone();
        assert_eq!(
            finder.handle(&mut call, &fixture.ctx(false)),
            HandlerResult::DetectedFilesystemAccess
        );
        assert_eq!(call, before);

        let mut generic = Instruction::type_ref(
            OpCode::NewArray,
            TypeRef::generic("mscorlib", "System.Lazy`1", vec![file()]),
        );
        assert_eq!(
            finder.handle(&mut generic, &fixture.ctx(false)),
            HandlerResult::DetectedFilesystemAccess
        );
    }

    #[test]
    fn ignores_similar_names_and_constants() {
        let fixture = Fixture::new();
        let finder = TypeFinder::new("System.IO.File", HandlerResult::DetectedFilesystemAccess);
        let mut similar = Instruction::type_ref(OpCode::Box, TypeRef::system("System.IO.FileInfo"));
        assert_eq!(finder.handle(&mut similar, &fixture.ctx(false)), HandlerResult::None);
        let mut literal = Instruction::constant(Constant::String("System.IO.File".to_string()));
        assert_eq!(finder.handle(&mut literal, &fixture.ctx(false)), HandlerResult::None);

        let game = TypeFinder::new("StardewValley.Game1", HandlerResult::DetectedDynamic);
        assert_eq!(game.phase(), HandlerPhase::Stability);
        let mut token = Instruction::type_ref(OpCode::LoadToken, game_type("StardewValley.Game1"));
        assert_eq!(
            game.handle(&mut token, &fixture.ctx(false)),
            HandlerResult::DetectedDynamic
        );
    }
}
