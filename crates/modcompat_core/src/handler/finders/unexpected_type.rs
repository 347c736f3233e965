//! Detects references to trusted members whose type changed.

use crate::handler::{HandlerContext, HandlerPhase, HandlerResult, InstructionHandler};
use crate::model::instruction::{Instruction, Operand};
use crate::model::types::{FieldRef, MethodRef};
use crate::symbols::SymbolTable;
use std::collections::BTreeSet;

pub struct ReferenceToMemberWithUnexpectedTypeFinder {
    trusted: BTreeSet<String>,
}

impl ReferenceToMemberWithUnexpectedTypeFinder {
    pub fn new<I, S>(trusted_assemblies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            trusted: trusted_assemblies.into_iter().map(Into::into).collect(),
        }
    }

    fn mismatch(&self, instruction: &Instruction, symbols: &SymbolTable) -> Option<String> {
        match &instruction.operand {
            Operand::Field(field) => self.field_mismatch(field, symbols),
            Operand::Method(method) => self.method_mismatch(method, symbols),
            Operand::AccessorField(indirect) => self
                .method_mismatch(&indirect.accessor, symbols)
                .or_else(|| self.field_mismatch(&indirect.field, symbols)),
            Operand::None | Operand::Constant(_) | Operand::Type(_) => None,
        }
    }

    fn field_mismatch(&self, field: &FieldRef, symbols: &SymbolTable) -> Option<String> {
        if !self.trusted.contains(field.declaring_type.scope.as_str()) {
            return None;
        }
        let declared = symbols.resolve_field(field)?;
        if declared.field_type.is_same_type(&field.field_type) {
            return None;
        }
        Some(format!(
            "field {}.{} is now {}, not {}",
            field.declaring_type.full_name, field.name, declared.field_type, field.field_type
        ))
    }

    fn method_mismatch(&self, method: &MethodRef, symbols: &SymbolTable) -> Option<String> {
        if method.is_constructor() || !self.trusted.contains(method.declaring_type.scope.as_str())
        {
            return None;
        }
        let owner = method.declaring_type.element_name();

        if !symbols.methods_named(owner, &method.name).is_empty() {
            // Parameter drift leaves no overload to compare; that is a
            // missing member, not a type mismatch.
            let declared = symbols.resolve_method(method)?;
            if declared.return_type.is_same_type(&method.return_type) {
                return None;
            }
            return Some(format!(
                "method {owner}.{} returns {}, not {}",
                method.name, declared.return_type, method.return_type
            ));
        }

        let property_name = method.name.strip_prefix("get_")?;
        let property = symbols.find_property(owner, property_name)?;
        if property.property_type.is_same_type(&method.return_type) {
            return None;
        }
        Some(format!(
            "property {owner}.{property_name} is now {}, not {}",
            property.property_type, method.return_type
        ))
    }
}

impl InstructionHandler for ReferenceToMemberWithUnexpectedTypeFinder {
    fn name(&self) -> &str {
        "reference_to_member_with_unexpected_type"
    }

    fn phase(&self) -> HandlerPhase {
        HandlerPhase::BrokenReference
    }

    fn handle(&self, instruction: &mut Instruction, ctx: &HandlerContext<'_>) -> HandlerResult {
        match self.mismatch(instruction, ctx.symbols) {
            Some(_) => HandlerResult::DetectedReferenceTypeMismatch,
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
            .mismatch(after, ctx.symbols)
            .unwrap_or_else(|| after.to_string());
        format!("{}: {detail}", self.name())
    }
}
