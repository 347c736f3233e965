//! Redirects method and constructor calls on a host type to its facade.

use crate::facade::FacadeTable;
use crate::handler::{HandlerContext, HandlerPhase, HandlerResult, InstructionHandler};
use crate::model::instruction::{Instruction, OpCode, Operand};

pub struct MethodParentRewriter {
    name: String,
    facade: FacadeTable,
    only_if_platform_changed: bool,
}

impl MethodParentRewriter {
    /// `only_if_platform_changed` limits the redirect to modules compiled for
    /// another platform family.
    pub fn new(facade: FacadeTable, only_if_platform_changed: bool) -> Self {
        Self {
            name: format!("method_parent:{}", facade.original_type()),
            facade,
            only_if_platform_changed,
        }
    }

    pub fn facade(&self) -> &FacadeTable {
        &self.facade
    }
}

impl InstructionHandler for MethodParentRewriter {
    fn name(&self) -> &str {
        &self.name
    }

    fn phase(&self) -> HandlerPhase {
        if self.only_if_platform_changed {
            HandlerPhase::PlatformRewrite
        } else {
            HandlerPhase::VersionRewrite
        }
    }

    fn handle(&self, instruction: &mut Instruction, ctx: &HandlerContext<'_>) -> HandlerResult {
        if !instruction.opcode.is_call() {
            return HandlerResult::None;
        }
        if self.only_if_platform_changed && !ctx.platform_changed {
            return HandlerResult::None;
        }
        let Operand::Method(method) = &instruction.operand else {
            return HandlerResult::None;
        };
        let Some(replacement) = self.facade.lookup(method) else {
            return HandlerResult::None;
        };

        // Base constructor chaining uses `call .ctor`, so constructor
        // replacements keep whichever opcode the mod used.
        let opcode = if replacement.is_constructor() {
            instruction.opcode
        } else {
            OpCode::Call
        };
        *instruction = Instruction::method(opcode, replacement.clone());
        HandlerResult::Rewrote
    }
}

#[cfg(test)]
mod tests {
    use super::MethodParentRewriter;
    use crate::facade::FacadeTable;
    use crate::handler::testing::{game_type, Fixture};
    use crate::handler::{HandlerPhase, HandlerResult, InstructionHandler};
    use crate::model::instruction::{Instruction, OpCode, OperationClass};
    use crate::model::member::MethodDef;
    use crate::model::types::{MethodRef, TypeRef};
    use crate::symbols::HostType;

    fn sprite_batch() -> TypeRef {
        TypeRef::new("Microsoft.Xna.Framework.Graphics", "Microsoft.Xna.Framework.Graphics.SpriteBatch")
    }

    fn rewriter(guarded: bool) -> MethodParentRewriter {
        let facade = HostType::new("StardewModdingAPI.Framework.RewriteFacades.SpriteBatchMethods")
            .with_method(MethodDef::constructor(vec![TypeRef::system("System.Object")]))
            .with_method(MethodDef::new_static(
                "Begin",
                TypeRef::void(),
                vec![sprite_batch(), TypeRef::system("System.Int32")],
            ))
            .with_method(MethodDef::new_static("Foo", TypeRef::void(), vec![]));
        MethodParentRewriter::new(
            FacadeTable::from_declarations(
                "Microsoft.Xna.Framework.Graphics.SpriteBatch",
                &facade,
                "StardewModdingAPI",
            ),
            guarded,
        )
    }

    #[test]
    fn guarded_rewriter_waits_for_platform_change() {
        let fixture = Fixture::new();
        let rewriter = rewriter(true);
        assert_eq!(rewriter.phase(), HandlerPhase::PlatformRewrite);

        let call = Instruction::method(
            OpCode::Call,
            MethodRef::new_static(sprite_batch(), "Foo", TypeRef::void(), vec![]),
        );
        let mut unchanged = call.clone();
        assert_eq!(
            rewriter.handle(&mut unchanged, &fixture.ctx(false)),
            HandlerResult::None
        );
        assert_eq!(unchanged, call);

        let mut redirected = call;
        assert_eq!(
            rewriter.handle(&mut redirected, &fixture.ctx(true)),
            HandlerResult::Rewrote
        );
        let target = redirected.method_ref().expect("method operand");
        assert_eq!(
            target.declaring_type.full_name,
            "StardewModdingAPI.Framework.RewriteFacades.SpriteBatchMethods"
        );
        assert_eq!(target.name, "Foo");
    }

    #[test]
    fn instance_calls_become_static_facade_calls() {
        let fixture = Fixture::new();
        let rewriter = rewriter(false);
        assert_eq!(rewriter.phase(), HandlerPhase::VersionRewrite);

        let mut call = Instruction::method(
            OpCode::CallVirtual,
            MethodRef::new_instance(
                sprite_batch(),
                "Begin",
                TypeRef::void(),
                vec![TypeRef::system("System.Int32")],
            ),
        );
        assert_eq!(rewriter.handle(&mut call, &fixture.ctx(false)), HandlerResult::Rewrote);
        assert_eq!(call.opcode, OpCode::Call);
        assert_eq!(call.class(), OperationClass::Call);
        let target = call.method_ref().expect("method operand");
        assert!(!target.has_this);
        assert_eq!(target.parameters.len(), 2);
    }

    #[test]
    fn constructors_keep_their_opcode() {
        let fixture = Fixture::new();
        let rewriter = rewriter(false);
        let ctor = MethodRef::constructor(sprite_batch(), vec![TypeRef::system("System.Object")]);

        let mut new_object = Instruction::method(OpCode::NewObject, ctor.clone());
        assert_eq!(rewriter.handle(&mut new_object, &fixture.ctx(false)), HandlerResult::Rewrote);
        assert_eq!(new_object.opcode, OpCode::NewObject);

        let mut base_call = Instruction::method(OpCode::Call, ctor);
        assert_eq!(rewriter.handle(&mut base_call, &fixture.ctx(false)), HandlerResult::Rewrote);
        assert_eq!(base_call.opcode, OpCode::Call);
    }

    #[test]
    fn leaves_unmapped_members_alone() {
        let fixture = Fixture::new();
        let rewriter = rewriter(false);
        let mut other = Instruction::method(
            OpCode::Call,
            MethodRef::new_static(game_type("StardewValley.Game1"), "Foo", TypeRef::void(), vec![]),
        );
        let before = other.clone();
        assert_eq!(rewriter.handle(&mut other, &fixture.ctx(true)), HandlerResult::None);
        assert_eq!(other, before);

        let mut missing = Instruction::method(
            OpCode::Call,
            MethodRef::new_static(sprite_batch(), "End", TypeRef::void(), vec![]),
        );
        assert_eq!(rewriter.handle(&mut missing, &fixture.ctx(true)), HandlerResult::None);
    }
}
