//! Assembly loader driver.
//!
//! # Responsibility
//! - Decode mod modules and run every registered handler over every
//!   instruction of every method body.
//! - Turn the resulting report into a load decision and log it once per mod.
//!
//! # Invariants
//! - Handlers see each instruction in registry order, and each handler sees
//!   the result of every earlier rewrite.
//! - A mod that fails to decode is rejected on its own; other mods in the
//!   same batch are unaffected.
//! - Scans share only read-only state, so batches run in parallel.

use crate::config::ScanConfig;
use crate::handler::{HandlerContext, HandlerResult, Severity};
use crate::model::module::{MethodBody, ModuleDef};
use crate::model::ModuleDecodeError;
use crate::monitor::{LogLevel, Monitor};
use crate::patching::PatchState;
use crate::registry::InstructionRegistry;
use crate::report::{Finding, InstructionSite, LoadDecision, Report};
use crate::symbols::SymbolTable;
use log::{error, info};
use rayon::prelude::*;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Load errors for one mod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    Io { path: PathBuf, message: String },
    Decode { mod_id: String, source: ModuleDecodeError },
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, message } => {
                write!(f, "failed to read module `{}`: {message}", path.display())
            }
            Self::Decode { mod_id, source } => {
                write!(f, "failed to decode module for {mod_id}: {source}")
            }
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { .. } => None,
            Self::Decode { source, .. } => Some(source),
        }
    }
}

pub type LoadResult<T> = Result<T, LoadError>;

/// Raw module image of one mod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModSource {
    pub mod_id: String,
    pub bytes: Vec<u8>,
}

impl ModSource {
    pub fn new(mod_id: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mod_id: mod_id.into(),
            bytes,
        }
    }

    /// Reads a module file; the mod id is the file stem.
    pub fn read(path: &Path) -> LoadResult<Self> {
        let bytes = std::fs::read(path).map_err(|err| LoadError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let mod_id = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(mod_id, bytes))
    }
}

/// Result of loading one mod.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub mod_id: String,
    pub decision: LoadDecision,
    /// `None` when the module could not be decoded.
    pub report: Option<Report>,
    /// Rewritten module, kept only for loaded mods.
    pub module: Option<ModuleDef>,
    pub error: Option<LoadError>,
}

/// Runs the handler pipeline over mod modules.
pub struct ModLoader<'a> {
    registry: &'a InstructionRegistry,
    symbols: &'a SymbolTable,
    config: &'a ScanConfig,
    monitor: &'a dyn Monitor,
    patch_state: Option<PatchState>,
}

impl<'a> ModLoader<'a> {
    pub fn new(
        registry: &'a InstructionRegistry,
        symbols: &'a SymbolTable,
        config: &'a ScanConfig,
        monitor: &'a dyn Monitor,
    ) -> Self {
        Self {
            registry,
            symbols,
            config,
            monitor,
            patch_state: None,
        }
    }

    /// Lets the loader warn about mods whose patches will be ignored.
    pub fn with_patch_state(mut self, state: PatchState) -> Self {
        self.patch_state = Some(state);
        self
    }

    /// Runs every handler over every instruction, rewriting `module` in place.
    pub fn scan(&self, module: &mut ModuleDef) -> Report {
        let mut report = Report::new(module.name.as_str());
        let platform_changed = self
            .config
            .epoch
            .platform_changed_for(module.target_platform);

        for type_index in 0..module.types.len() {
            for method_index in 0..module.types[type_index].methods.len() {
                let Some(mut body) = module.types[type_index].methods[method_index].body.take()
                else {
                    continue;
                };
                {
                    let owner = &module.types[type_index];
                    let ctx = HandlerContext {
                        module: &*module,
                        type_name: &owner.full_name,
                        method_name: &owner.methods[method_index].name,
                        symbols: self.symbols,
                        monitor: self.monitor,
                        platform_changed,
                    };
                    self.scan_body(&mut body, &ctx, method_index, &mut report);
                }
                module.types[type_index].methods[method_index].body = Some(body);
            }
        }
        report
    }

    fn scan_body(
        &self,
        body: &mut MethodBody,
        ctx: &HandlerContext<'_>,
        method_index: usize,
        report: &mut Report,
    ) {
        for (offset, instruction) in body.iter_mut().enumerate() {
            let mut before = instruction.clone();
            for handler in self.registry.handlers() {
                let result = handler.handle(instruction, ctx);
                if result.is_none() {
                    continue;
                }
                let message = handler.describe(&before, instruction, result, ctx);
                report.push(Finding {
                    site: InstructionSite {
                        type_name: ctx.type_name.to_string(),
                        method_name: ctx.method_name.to_string(),
                        method_index,
                        offset,
                    },
                    handler: handler.name().to_string(),
                    result,
                    message,
                });
                if result.is_rewrite() {
                    before = instruction.clone();
                }
            }
        }
    }

    /// Decodes, scans and decides on one mod.
    pub fn load(&self, mod_id: &str, bytes: &[u8]) -> LoadOutcome {
        let mut module = match ModuleDef::decode(bytes) {
            Ok(module) => module,
            Err(source) => {
                let err = LoadError::Decode {
                    mod_id: mod_id.to_string(),
                    source,
                };
                error!(
                    "event=mod_load module=loader status=error mod_id={} error={}",
                    mod_id, err
                );
                self.monitor.log(
                    &format!("Couldn't load {mod_id}: {err}"),
                    LogLevel::Error,
                );
                return LoadOutcome {
                    mod_id: mod_id.to_string(),
                    decision: LoadDecision::Reject,
                    report: None,
                    module: None,
                    error: Some(err),
                };
            }
        };

        let report = self.scan(&mut module);
        let decision = report.decision();
        self.log_report(mod_id, &report, module.instruction_count());

        LoadOutcome {
            mod_id: mod_id.to_string(),
            decision,
            report: Some(report),
            module: decision.is_loaded().then_some(module),
            error: None,
        }
    }

    /// Loads independent mods in parallel; outcomes keep input order.
    pub fn load_all(&self, sources: &[ModSource]) -> Vec<LoadOutcome> {
        sources
            .par_iter()
            .map(|source| self.load(&source.mod_id, &source.bytes))
            .collect()
    }

    fn log_report(&self, mod_id: &str, report: &Report, instruction_count: usize) {
        let results: std::collections::BTreeSet<HandlerResult> =
            report.findings.iter().map(|finding| finding.result).collect();
        for result in results {
            let level = match result.severity() {
                Some(Severity::FatalIncompatibility) => LogLevel::Error,
                Some(Severity::StabilityRisk) => LogLevel::Warn,
                Some(Severity::CompatibilityNotice) => LogLevel::Debug,
                Some(Severity::RewriteApplied) | None => LogLevel::Trace,
            };
            self.monitor.log(
                &format!(
                    "{mod_id}: {} ({} site(s))",
                    result.description(),
                    report.count(result)
                ),
                level,
            );
        }

        let patching_disabled = self
            .patch_state
            .as_ref()
            .is_some_and(|state| !state.is_enabled());
        if patching_disabled && report.count(HandlerResult::DetectedGamePatch) > 0 {
            self.monitor.log(
                &format!(
                    "{mod_id} patches the game, but runtime patching is disabled; its patches will be ignored."
                ),
                LogLevel::Warn,
            );
        }

        if report.decision() == LoadDecision::Reject {
            self.monitor.log(
                &format!(
                    "Skipped {mod_id}: it's no longer compatible with this host version. Please check for a newer version of the mod."
                ),
                LogLevel::Error,
            );
        }

        info!(
            "event=mod_scan module=loader status={} mod_id={} scan_id={} instructions={} findings={} rewrites={}",
            report.decision(),
            mod_id,
            report.scan_id,
            instruction_count,
            report.len(),
            report.rewrite_count()
        );
    }
}
