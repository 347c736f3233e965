//! Detects references into trusted host assemblies that no longer resolve.
//!
//! # Invariants
//! - Only references scoped to a trusted assembly are checked; anything else
//!   is the mod's own business.
//! - Fields resolve by name and methods by name plus parameters, walking
//!   base types. Types are compared elsewhere.

use crate::handler::{HandlerContext, HandlerPhase, HandlerResult, InstructionHandler};
use crate::model::instruction::{Instruction, Operand};
use crate::model::types::{FieldRef, MethodRef, TypeRef};
use crate::symbols::SymbolTable;
use std::collections::BTreeSet;

pub struct ReferenceToMissingMemberFinder {
    trusted: BTreeSet<String>,
}

impl ReferenceToMissingMemberFinder {
    pub fn new<I, S>(trusted_assemblies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            trusted: trusted_assemblies.into_iter().map(Into::into).collect(),
        }
    }

    fn is_trusted(&self, ty: &TypeRef) -> bool {
        self.trusted.contains(ty.scope.as_str())
    }

    /// Human-readable description of the first unresolved reference.
    fn missing(&self, instruction: &Instruction, symbols: &SymbolTable) -> Option<String> {
        match &instruction.operand {
            Operand::None | Operand::Constant(_) => None,
            Operand::Type(ty) => self.missing_type(ty, symbols),
            Operand::Field(field) => self.missing_field(field, symbols),
            Operand::Method(method) => self.missing_method(method, symbols),
            Operand::AccessorField(indirect) => self
                .missing_method(&indirect.accessor, symbols)
                .or_else(|| self.missing_field(&indirect.field, symbols)),
        }
    }

    fn missing_type(&self, ty: &TypeRef, symbols: &SymbolTable) -> Option<String> {
        if self.is_trusted(ty) && symbols.resolve_type(ty).is_none() {
            return Some(format!("reference to {} (no such type)", ty.full_name));
        }
        ty.generic_args
            .iter()
            .find_map(|arg| self.missing_type(arg, symbols))
    }

    fn missing_field(&self, field: &FieldRef, symbols: &SymbolTable) -> Option<String> {
        if !self.is_trusted(&field.declaring_type) {
            return None;
        }
        if let Some(missing) = self.missing_type(&field.declaring_type, symbols) {
            return Some(missing);
        }
        if symbols.resolve_field(field).is_some() {
            return None;
        }
        Some(format!(
            "reference to {}.{} (no such field)",
            field.declaring_type.full_name, field.name
        ))
    }

    fn missing_method(&self, method: &MethodRef, symbols: &SymbolTable) -> Option<String> {
        if !self.is_trusted(&method.declaring_type) {
            return None;
        }
        if let Some(missing) = self.missing_type(&method.declaring_type, symbols) {
            return Some(missing);
        }
        if symbols.method_exists(method) {
            return None;
        }

        let owner = &method.declaring_type.full_name;
        let property = method
            .name
            .strip_prefix("get_")
            .or_else(|| method.name.strip_prefix("set_"));
        Some(match property {
            Some(property) => {
                format!("reference to {owner}.{property} (no such property)")
            }
            None if method.is_constructor() => format!(
                "reference to {owner} constructor({}) (no such method)",
                method.parameter_signatures().join(", ")
            ),
            None => format!(
                "reference to {owner}.{}({}) (no such method)",
                method.name,
                method.parameter_signatures().join(", ")
            ),
        })
    }
}

impl InstructionHandler for ReferenceToMissingMemberFinder {
    fn name(&self) -> &str {
        "reference_to_missing_member"
    }

    fn phase(&self) -> HandlerPhase {
        HandlerPhase::BrokenReference
    }

    fn handle(&self, instruction: &mut Instruction, ctx: &HandlerContext<'_>) -> HandlerResult {
        match self.missing(instruction, ctx.symbols) {
            Some(_) => HandlerResult::DetectedBrokenReference,
            None => HandlerResult::None,
        }
    }

    fn describe(
        &self,
        _before: &Instruction,
        after: &Instruction,
        _result: HandlerResult,
        ctx: &HandlerContext<'_>,
    ) -> String {
        let detail = self
            .missing(after, ctx.symbols)
            .unwrap_or_else(|| after.to_string());
        format!("{}: {detail}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::ReferenceToMissingMemberFinder;
    use crate::handler::testing::{game_type, int32, Fixture, GAME};
    use crate::handler::{HandlerResult, InstructionHandler};
    use crate::model::instruction::{Instruction, OpCode};
    use crate::model::types::{FieldRef, MethodRef, TypeRef};

    fn finder() -> ReferenceToMissingMemberFinder {
        ReferenceToMissingMemberFinder::new([GAME, "StardewModdingAPI"])
    }

    #[test]
    fn reports_missing_members_on_trusted_assemblies() {
        let fixture = Fixture::new();
        let finder = finder();
        let mut missing_method = Instruction::method(
            OpCode::Call,
            MethodRef::new_static(
                game_type("StardewValley.Game1"),
                "removed",
                TypeRef::void(),
                vec![],
            ),
        );
        let ctx = fixture.ctx(false);
        let result = finder.handle(&mut missing_method, &ctx);
        assert_eq!(result, HandlerResult::DetectedBrokenReference);
        let message = finder.describe(&missing_method, &missing_method, result, &ctx);
        assert!(message.contains("StardewValley.Game1.removed()"));

        let mut missing_field = Instruction::field(
            OpCode::LoadField,
            FieldRef::new(game_type("StardewValley.Farmer"), "oldStamina", int32()),
        );
        assert_eq!(
            finder.handle(&mut missing_field, &ctx),
            HandlerResult::DetectedBrokenReference
        );

        let mut missing_type = Instruction::type_ref(
            OpCode::CastClass,
            game_type("StardewValley.Menus.RemovedMenu"),
        );
        assert_eq!(
            finder.handle(&mut missing_type, &ctx),
            HandlerResult::DetectedBrokenReference
        );
    }

    #[test]
    fn missing_accessor_is_described_as_property() {
        let fixture = Fixture::new();
        let finder = finder();
        let ctx = fixture.ctx(false);
        let mut getter = Instruction::method(
            OpCode::CallVirtual,
            MethodRef::new_instance(
                game_type("StardewValley.Farmer"),
                "get_mailbox",
                TypeRef::system("System.Object"),
                vec![],
            ),
        );
        let result = finder.handle(&mut getter, &ctx);
        assert_eq!(result, HandlerResult::DetectedBrokenReference);
        assert!(finder
            .describe(&getter, &getter, result, &ctx)
            .contains("StardewValley.Farmer.mailbox (no such property)"));
    }

    #[test]
    fn resolved_and_untrusted_references_pass() {
        let fixture = Fixture::new();
        let finder = finder();
        let ctx = fixture.ctx(false);

        let mut inherited = Instruction::method(
            OpCode::CallVirtual,
            MethodRef::new_instance(game_type("StardewValley.Farmer"), "getTileX", int32(), vec![]),
        );
        assert_eq!(finder.handle(&mut inherited, &ctx), HandlerResult::None);

        let mut property = Instruction::method(
            OpCode::Call,
            MethodRef::new_static(
                game_type("StardewValley.Game1"),
                "get_player",
                game_type("StardewValley.Farmer"),
                vec![],
            ),
        );
        assert_eq!(finder.handle(&mut property, &ctx), HandlerResult::None);

        let mut untrusted = Instruction::method(
            OpCode::Call,
            MethodRef::new_static(
                TypeRef::new("SpaceCore", "SpaceCore.Api"),
                "removed",
                TypeRef::void(),
                vec![],
            ),
        );
        assert_eq!(finder.handle(&mut untrusted, &ctx), HandlerResult::None);

        let mut runtime = Instruction::type_ref(
            OpCode::NewArray,
            TypeRef::system("System.Missing.Anything"),
        );
        assert_eq!(finder.handle(&mut runtime, &ctx), HandlerResult::None);
    }

    #[test]
    fn return_type_changes_are_not_missing_members() {
        let fixture = Fixture::new();
        let mut call = Instruction::method(
            OpCode::CallVirtual,
            MethodRef::new_instance(
                game_type("StardewValley.Farmer"),
                "getTileX",
                TypeRef::system("System.Single"),
                vec![],
            ),
        );
        assert_eq!(
            finder().handle(&mut call, &fixture.ctx(false)),
            HandlerResult::None
        );
    }
}
