//! Instruction handler contract.
//!
//! # Responsibility
//! - Define the one capability every rewriter and finder implements.
//! - Define the read-only context a handler sees for one instruction.
//!
//! # Invariants
//! - A handler returns exactly one `HandlerResult` per invocation.
//! - A handler that returns `HandlerResult::None` leaves the instruction
//!   untouched.
//! - Mutation is limited to replacing the operand and, for the documented
//!   conversions, the opcode.
//!
//! # See also
//! - `crate::registry` for phase ordering.

pub mod finders;
pub mod result;
pub mod rewriters;

#[cfg(test)]
pub(crate) mod testing;

use crate::model::instruction::Instruction;
use crate::model::module::ModuleDef;
use crate::monitor::Monitor;
use crate::symbols::SymbolTable;
use std::fmt::{Display, Formatter};

pub use result::{HandlerResult, Severity};

/// Registry phase a handler belongs to. Phases run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HandlerPhase {
    PlatformRewrite,
    VersionRewrite,
    BrokenReference,
    Stability,
    Heightened,
}

impl HandlerPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PlatformRewrite => "platform_rewrite",
            Self::VersionRewrite => "version_rewrite",
            Self::BrokenReference => "broken_reference",
            Self::Stability => "stability",
            Self::Heightened => "heightened",
        }
    }

    pub fn is_rewrite(self) -> bool {
        matches!(self, Self::PlatformRewrite | Self::VersionRewrite)
    }
}

impl Display for HandlerPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a handler may read while looking at one instruction.
pub struct HandlerContext<'a> {
    /// Module declarations. The body being scanned is detached while its
    /// instructions are visited.
    pub module: &'a ModuleDef,
    pub type_name: &'a str,
    pub method_name: &'a str,
    pub symbols: &'a SymbolTable,
    pub monitor: &'a dyn Monitor,
    /// Whether the module was compiled for another platform family.
    pub platform_changed: bool,
}

/// One pluggable instruction inspector.
pub trait InstructionHandler: Send + Sync {
    /// Stable handler name, unique within a registry.
    fn name(&self) -> &str;

    fn phase(&self) -> HandlerPhase;

    /// Inspects one instruction and may rewrite it in place.
    fn handle(&self, instruction: &mut Instruction, ctx: &HandlerContext<'_>) -> HandlerResult;

    /// Finding message for a non-`None` result.
    fn describe(
        &self,
        before: &Instruction,
        after: &Instruction,
        result: HandlerResult,
        _ctx: &HandlerContext<'_>,
    ) -> String {
        if result.is_rewrite() {
            format!("{}: `{before}` -> `{after}`", self.name())
        } else {
            format!("{}: `{after}`", self.name())
        }
    }
}
