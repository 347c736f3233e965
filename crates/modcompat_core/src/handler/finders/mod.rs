//! Handlers that detect references to unsafe, monitored or missing symbols.
//!
//! Finders never mutate the instruction they inspect.

mod event_finder;
mod field_finder;
mod missing_member;
mod type_finder;
mod unexpected_type;

pub use event_finder::EventFinder;
pub use field_finder::FieldFinder;
pub use missing_member::ReferenceToMissingMemberFinder;
pub use type_finder::TypeFinder;
pub use unexpected_type::ReferenceToMemberWithUnexpectedTypeFinder;

use crate::handler::{HandlerPhase, HandlerResult};

/// Filesystem and shell findings only run when heightened scanning is on.
fn phase_for(result: HandlerResult) -> HandlerPhase {
    match result {
        HandlerResult::DetectedFilesystemAccess | HandlerResult::DetectedShellAccess => {
            HandlerPhase::Heightened
        }
        _ => HandlerPhase::Stability,
    }
}
