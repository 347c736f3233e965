//! Instruction-level model of a mod module.
//!
//! # Responsibility
//! - Define instructions, operands and the references they carry.
//! - Define the module/type/method ownership tree scanned by the loader.
//!
//! # Invariants
//! - A module owns all of its method bodies; nothing in the model outlives
//!   the load of that one module.

mod codec;
pub mod instruction;
pub mod member;
pub mod module;
pub mod types;

pub use codec::ModuleDecodeError;
