//! Converts field reads and writes into property accessor calls.

use crate::handler::{HandlerContext, HandlerPhase, HandlerResult, InstructionHandler};
use crate::model::instruction::{Instruction, OpCode, Operand};
use crate::model::types::{MethodRef, TypeRef};

/// Field that became a property with the same or a different name.
pub struct FieldToPropertyRewriter {
    name: String,
    type_name: String,
    field_name: String,
    property_name: String,
}

impl FieldToPropertyRewriter {
    /// Field and property share a name.
    pub fn new(type_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        let field_name = field_name.into();
        Self::renamed(type_name, field_name.clone(), field_name)
    }

    pub fn renamed(
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        property_name: impl Into<String>,
    ) -> Self {
        let type_name = type_name.into();
        let field_name = field_name.into();
        Self {
            name: format!("field_to_property:{type_name}.{field_name}"),
            type_name,
            field_name,
            property_name: property_name.into(),
        }
    }
}

impl InstructionHandler for FieldToPropertyRewriter {
    fn name(&self) -> &str {
        &self.name
    }

    fn phase(&self) -> HandlerPhase {
        HandlerPhase::VersionRewrite
    }

    fn handle(&self, instruction: &mut Instruction, ctx: &HandlerContext<'_>) -> HandlerResult {
        let opcode = instruction.opcode;
        let is_read = opcode.is_field_read();
        if !is_read && !opcode.is_field_write() {
            return HandlerResult::None;
        }
        let Operand::Field(field) = &instruction.operand else {
            return HandlerResult::None;
        };
        if !field.is(&self.type_name, &self.field_name) {
            return HandlerResult::None;
        }
        let Some(property) = ctx.symbols.find_property(&self.type_name, &self.property_name)
        else {
            return HandlerResult::None;
        };
        if property.is_static != opcode.is_static_field_access() {
            return HandlerResult::None;
        }

        let declaring_type = field.declaring_type.clone();
        let (accessor_name, return_type, parameters) = if is_read {
            if !property.has_getter {
                return HandlerResult::None;
            }
            (property.getter_name(), property.property_type.clone(), vec![])
        } else {
            if !property.has_setter {
                return HandlerResult::None;
            }
            (
                property.setter_name(),
                TypeRef::void(),
                vec![property.property_type.clone()],
            )
        };

        let (call, accessor) = if property.is_static {
            (
                OpCode::Call,
                MethodRef::new_static(declaring_type, accessor_name, return_type, parameters),
            )
        } else {
            (
                OpCode::CallVirtual,
                MethodRef::new_instance(declaring_type, accessor_name, return_type, parameters),
            )
        };
        *instruction = Instruction::method(call, accessor);
        HandlerResult::Rewrote
    }
}

#[cfg(test)]
mod tests {
    use super::FieldToPropertyRewriter;
    use crate::handler::testing::{game_type, Fixture};
    use crate::handler::{HandlerResult, InstructionHandler};
    use crate::model::instruction::{Instruction, OpCode};
    use crate::model::types::FieldRef;

    fn player_field() -> FieldRef {
        FieldRef::new(
            game_type("StardewValley.Game1"),
            "player",
            game_type("StardewValley.Farmer"),
        )
    }

    fn location_field(owner: &str) -> FieldRef {
        FieldRef::new(
            game_type(owner),
            "currentLocation",
            game_type("StardewValley.GameLocation"),
        )
    }

    #[test]
    fn static_read_and_write_use_matching_accessors() {
        let fixture = Fixture::new();
        let rewriter = FieldToPropertyRewriter::new("StardewValley.Game1", "player");

        let mut read = Instruction::field(OpCode::LoadStaticField, player_field());
        assert_eq!(rewriter.handle(&mut read, &fixture.ctx(false)), HandlerResult::Rewrote);
        assert_eq!(read.opcode, OpCode::Call);
        let getter = read.method_ref().expect("getter call");
        assert_eq!(getter.name, "get_player");
        assert!(getter.parameters.is_empty());
        assert_eq!(getter.return_type.full_name, "StardewValley.Farmer");

        let mut write = Instruction::field(OpCode::StoreStaticField, player_field());
        assert_eq!(rewriter.handle(&mut write, &fixture.ctx(false)), HandlerResult::Rewrote);
        let setter = write.method_ref().expect("setter call");
        assert_eq!(setter.name, "set_player");
        assert_eq!(setter.parameters.len(), 1);
        assert!(!setter.has_this);
    }

    #[test]
    fn instance_property_on_base_type_uses_virtual_call() {
        let fixture = Fixture::new();
        let rewriter = FieldToPropertyRewriter::new("StardewValley.Farmer", "currentLocation");
        let mut read = Instruction::field(OpCode::LoadField, location_field("StardewValley.Farmer"));
        assert_eq!(rewriter.handle(&mut read, &fixture.ctx(false)), HandlerResult::Rewrote);
        assert_eq!(read.opcode, OpCode::CallVirtual);
        let getter = read.method_ref().expect("getter call");
        assert!(getter.has_this);
        assert_eq!(getter.declaring_type.full_name, "StardewValley.Farmer");
    }

    #[test]
    fn address_loads_and_static_mismatches_stay_unmatched() {
        let fixture = Fixture::new();
        let rewriter = FieldToPropertyRewriter::new("StardewValley.Game1", "player");
        let mut address = Instruction::field(OpCode::LoadStaticFieldAddress, player_field());
        let before = address.clone();
        assert_eq!(rewriter.handle(&mut address, &fixture.ctx(false)), HandlerResult::None);
        assert_eq!(address, before);

        let mut instance_read = Instruction::field(OpCode::LoadField, player_field());
        assert_eq!(
            rewriter.handle(&mut instance_read, &fixture.ctx(false)),
            HandlerResult::None
        );
    }

    #[test]
    fn fails_closed_without_needed_accessor() {
        let fixture = Fixture::new();
        let stats = FieldRef::new(
            game_type("StardewValley.Game1"),
            "stats",
            game_type("StardewValley.Stats"),
        );
        let rewriter = FieldToPropertyRewriter::new("StardewValley.Game1", "stats");
        let mut write = Instruction::field(OpCode::StoreStaticField, stats.clone());
        assert_eq!(rewriter.handle(&mut write, &fixture.ctx(false)), HandlerResult::None);
        assert_eq!(write.opcode, OpCode::StoreStaticField);

        let mut read = Instruction::field(OpCode::LoadStaticField, stats);
        assert_eq!(rewriter.handle(&mut read, &fixture.ctx(false)), HandlerResult::Rewrote);

        let missing = FieldToPropertyRewriter::new("StardewValley.Game1", "gameMode");
        let mut mode = Instruction::field(
            OpCode::LoadStaticField,
            FieldRef::new(
                game_type("StardewValley.Game1"),
                "gameMode",
                crate::handler::testing::int32(),
            ),
        );
        assert_eq!(missing.handle(&mut mode, &fixture.ctx(false)), HandlerResult::None);
    }
}
