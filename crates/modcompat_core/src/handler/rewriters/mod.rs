//! Handlers that rewrite references to symbols which moved between host
//! versions.

mod field_replace;
mod field_to_property;
mod method_parent;
mod static_field_to_constant;
mod type_field_to_another_type_field;
mod type_reference;

pub use field_replace::FieldReplaceRewriter;
pub use field_to_property::FieldToPropertyRewriter;
pub use method_parent::MethodParentRewriter;
pub use static_field_to_constant::{ConstantValue, StaticFieldToConstantRewriter};
pub use type_field_to_another_type_field::TypeFieldToAnotherTypeFieldRewriter;
pub use type_reference::TypeReferenceRewriter;
