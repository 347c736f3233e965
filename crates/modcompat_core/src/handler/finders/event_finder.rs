//! Detects subscriptions to one event.

use super::phase_for;
use crate::handler::{HandlerContext, HandlerPhase, HandlerResult, InstructionHandler};
use crate::model::instruction::Instruction;

pub struct EventFinder {
    name: String,
    type_name: String,
    add_method: String,
    remove_method: String,
    result: HandlerResult,
}

impl EventFinder {
    pub fn new(
        type_name: impl Into<String>,
        event_name: impl Into<String>,
        result: HandlerResult,
    ) -> Self {
        let type_name = type_name.into();
        let event_name = event_name.into();
        Self {
            name: format!("event_finder:{type_name}.{event_name}"),
            type_name,
            add_method: format!("add_{event_name}"),
            remove_method: format!("remove_{event_name}"),
            result,
        }
    }
}

impl InstructionHandler for EventFinder {
    fn name(&self) -> &str {
        &self.name
    }

    fn phase(&self) -> HandlerPhase {
        phase_for(self.result)
    }

    fn handle(&self, instruction: &mut Instruction, _ctx: &HandlerContext<'_>) -> HandlerResult {
        if !instruction.opcode.is_call() {
            return HandlerResult::None;
        }
        match instruction.method_ref() {
            Some(method)
                if method.declaring_type.full_name == self.type_name
                    && (method.name == self.add_method || method.name == self.remove_method) =>
            {
                self.result
            }
            _ => HandlerResult::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EventFinder;
    use crate::handler::testing::Fixture;
    use crate::handler::{HandlerResult, InstructionHandler};
    use crate::model::instruction::{Instruction, OpCode};
    use crate::model::types::{MethodRef, TypeRef};

    fn events() -> TypeRef {
        TypeRef::new("StardewModdingAPI", "StardewModdingAPI.Events.ISpecialisedEvents")
    }

    fn accessor(name: &str) -> Instruction {
        Instruction::method(
            OpCode::CallVirtual,
            MethodRef::new_instance(
                events(),
                name,
                TypeRef::void(),
                vec![TypeRef::system("System.EventHandler")],
            ),
        )
    }

    #[test]
    fn detects_add_and_remove_accessors() {
        let fixture = Fixture::new();
        let finder = EventFinder::new(
            "StardewModdingAPI.Events.ISpecialisedEvents",
            "UnvalidatedUpdateTicked",
            HandlerResult::DetectedUnvalidatedUpdateHook,
        );
        for name in ["add_UnvalidatedUpdateTicked", "remove_UnvalidatedUpdateTicked"] {
            let mut instruction = accessor(name);
            assert_eq!(
                finder.handle(&mut instruction, &fixture.ctx(false)),
                HandlerResult::DetectedUnvalidatedUpdateHook
            );
        }
    }

    #[test]
    fn other_events_and_raw_calls_do_not_match() {
        let fixture = Fixture::new();
        let finder = EventFinder::new(
            "StardewModdingAPI.Events.ISpecialisedEvents",
            "UnvalidatedUpdateTicked",
            HandlerResult::DetectedUnvalidatedUpdateHook,
        );
        let mut other = accessor("add_LoadStageChanged");
        assert_eq!(finder.handle(&mut other, &fixture.ctx(false)), HandlerResult::None);
        let mut prefix = accessor("add_UnvalidatedUpdateTicking");
        assert_eq!(finder.handle(&mut prefix, &fixture.ctx(false)), HandlerResult::None);
    }
}
