//! Core mod compatibility pipeline.
//! Rewrites and validates mod modules against the running host before load.

pub mod config;
pub mod epoch;
pub mod facade;
pub mod handler;
pub mod loader;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod patching;
pub mod registry;
pub mod report;
pub mod symbols;

pub use config::{ConfigError, ScanConfig, ScanMode, DEFAULT_TRUSTED_ASSEMBLIES};
pub use epoch::{HostEpoch, HostVersion, HostVersionError, Platform};
pub use facade::FacadeTable;
pub use handler::{
    HandlerContext, HandlerPhase, HandlerResult, InstructionHandler, Severity,
};
pub use loader::{LoadError, LoadOutcome, ModLoader, ModSource};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::module::ModuleDef;
pub use model::ModuleDecodeError;
pub use monitor::{LogLevel, LogMonitor, Monitor, RecordingMonitor};
pub use patching::{GamePatcher, PatchDescriptor, PatchError, PatchFacade, PatchState};
pub use registry::{InstructionRegistry, RegistryError};
pub use report::{Finding, InstructionSite, LoadDecision, Report};
pub use symbols::{HostAssembly, HostType, SymbolTable, SymbolTableError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
