//! Redirects a static field read to a field on another type's singleton.

use crate::handler::{HandlerContext, HandlerPhase, HandlerResult, InstructionHandler};
use crate::model::instruction::{Instruction, OpCode, Operand};
use crate::model::types::{AccessorFieldRef, FieldRef, MethodRef};
use crate::monitor::LogLevel;

/// `Old.field` (static) moved to `New.accessor.field` (instance).
///
/// Only reads are redirected; writes keep pointing at the old field and are
/// left to the broken-reference finders.
pub struct TypeFieldToAnotherTypeFieldRewriter {
    name: String,
    old_type: String,
    new_type: String,
    field_name: String,
    accessor: String,
}

impl TypeFieldToAnotherTypeFieldRewriter {
    pub fn new(
        old_type: impl Into<String>,
        new_type: impl Into<String>,
        field_name: impl Into<String>,
        accessor: impl Into<String>,
    ) -> Self {
        let old_type = old_type.into();
        let field_name = field_name.into();
        Self {
            name: format!("type_field_to_another_type_field:{old_type}.{field_name}"),
            old_type,
            new_type: new_type.into(),
            field_name,
            accessor: accessor.into(),
        }
    }

    fn redirect(&self, ctx: &HandlerContext<'_>) -> Option<AccessorFieldRef> {
        let owner = ctx.symbols.type_ref(&self.new_type)?;
        let property = ctx.symbols.find_property(&self.new_type, &self.accessor)?;
        if !property.is_static || !property.has_getter {
            return None;
        }
        let field = ctx.symbols.find_field(&self.new_type, &self.field_name)?;
        if field.is_static {
            return None;
        }

        Some(AccessorFieldRef {
            accessor: MethodRef::new_static(
                owner.clone(),
                property.getter_name(),
                property.property_type.clone(),
                vec![],
            ),
            field: FieldRef::new(owner, self.field_name.as_str(), field.field_type.clone()),
        })
    }
}

impl InstructionHandler for TypeFieldToAnotherTypeFieldRewriter {
    fn name(&self) -> &str {
        &self.name
    }

    fn phase(&self) -> HandlerPhase {
        HandlerPhase::VersionRewrite
    }

    fn handle(&self, instruction: &mut Instruction, ctx: &HandlerContext<'_>) -> HandlerResult {
        if instruction.opcode != OpCode::LoadStaticField {
            return HandlerResult::None;
        }
        let Operand::Field(field) = &instruction.operand else {
            return HandlerResult::None;
        };
        if !field.is(&self.old_type, &self.field_name) {
            return HandlerResult::None;
        }
        let Some(redirect) = self.redirect(ctx) else {
            return HandlerResult::None;
        };

        instruction.operand = Operand::AccessorField(redirect);
        ctx.monitor.log(
            &format!(
                "{}.{} in {}::{} now reads {}.{}.{}; the mod may behave slightly differently.",
                self.old_type,
                self.field_name,
                ctx.type_name,
                ctx.method_name,
                self.new_type,
                self.accessor,
                self.field_name
            ),
            LogLevel::Warn,
        );
        HandlerResult::RewroteWithNotice
    }
}
