//! Runtime patch orchestration.
//!
//! # Responsibility
//! - Describe runtime patches handed to the interception layer.
//! - Apply the loader's own patches and switch patching off on the first
//!   failure.
//! - Gate mods' patch requests on the same switch.
//!
//! # Invariants
//! - Once `PatchState` is disabled it stays disabled for the process run.
//! - After a failure no further descriptor reaches the installer.

use crate::monitor::{LogLevel, Monitor};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One runtime patch: a target method plus the hooks installed around it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchDescriptor {
    pub name: String,
    /// Printed signature of the patched method.
    pub target: String,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub postfix: Option<String>,
    #[serde(default)]
    pub transpiler: Option<String>,
    #[serde(default)]
    pub finalizer: Option<String>,
    /// Assembly that declared the patch, when it came from a mod.
    #[serde(default)]
    pub declared_in: Option<String>,
}

impl PatchDescriptor {
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            prefix: None,
            postfix: None,
            transpiler: None,
            finalizer: None,
            declared_in: None,
        }
    }

    pub fn with_prefix(mut self, hook: impl Into<String>) -> Self {
        self.prefix = Some(hook.into());
        self
    }

    pub fn with_postfix(mut self, hook: impl Into<String>) -> Self {
        self.postfix = Some(hook.into());
        self
    }

    pub fn with_transpiler(mut self, hook: impl Into<String>) -> Self {
        self.transpiler = Some(hook.into());
        self
    }

    pub fn with_finalizer(mut self, hook: impl Into<String>) -> Self {
        self.finalizer = Some(hook.into());
        self
    }

    pub fn declared_in(mut self, assembly: impl Into<String>) -> Self {
        self.declared_in = Some(assembly.into());
        self
    }

    pub fn validate(&self) -> Result<(), PatchError> {
        if self.target.trim().is_empty() {
            return Err(PatchError::EmptyTarget(self.name.clone()));
        }
        if self.prefix.is_none()
            && self.postfix.is_none()
            && self.transpiler.is_none()
            && self.finalizer.is_none()
        {
            return Err(PatchError::NoHooks(self.name.clone()));
        }
        Ok(())
    }
}

/// Patch install errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    EmptyTarget(String),
    NoHooks(String),
    TargetNotFound { patch: String, target: String },
    Installer { patch: String, message: String },
}

impl Display for PatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTarget(patch) => write!(f, "patch {patch} has no target method"),
            Self::NoHooks(patch) => write!(f, "patch {patch} declares no hooks"),
            Self::TargetNotFound { patch, target } => {
                write!(f, "patch {patch} targets missing method {target}")
            }
            Self::Installer { patch, message } => {
                write!(f, "patch {patch} could not be installed: {message}")
            }
        }
    }
}

impl Error for PatchError {}

/// Function-interception layer that installs patches.
pub trait PatchInstaller {
    fn install(&mut self, patch: &PatchDescriptor) -> Result<(), PatchError>;
}

/// Process-wide "patching enabled" switch. Clones share the same switch.
#[derive(Debug, Clone)]
pub struct PatchState(Arc<AtomicBool>);

impl PatchState {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn disable(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for PatchState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchOutcome {
    Applied,
    Failed,
    /// Not attempted because patching was already disabled.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRecord {
    pub name: String,
    pub outcome: PatchOutcome,
}

/// Per-descriptor outcomes of one `GamePatcher::apply` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchSummary {
    pub records: Vec<PatchRecord>,
}

impl PatchSummary {
    pub fn count(&self, outcome: PatchOutcome) -> usize {
        self.records
            .iter()
            .filter(|record| record.outcome == outcome)
            .count()
    }

    pub fn outcome_of(&self, name: &str) -> Option<PatchOutcome> {
        self.records
            .iter()
            .find(|record| record.name == name)
            .map(|record| record.outcome)
    }
}

/// Applies the loader's own runtime patches.
pub struct GamePatcher<'a> {
    monitor: &'a dyn Monitor,
    state: PatchState,
}

impl<'a> GamePatcher<'a> {
    pub fn new(monitor: &'a dyn Monitor, state: PatchState) -> Self {
        Self { monitor, state }
    }

    pub fn state(&self) -> &PatchState {
        &self.state
    }

    /// Installs `patches` in order while patching stays enabled.
    ///
    /// The first failure disables patching: it is reported at error level
    /// with its detail at trace level, and every later patch is skipped.
    pub fn apply(
        &self,
        installer: &mut dyn PatchInstaller,
        patches: &[PatchDescriptor],
    ) -> PatchSummary {
        let mut summary = PatchSummary::default();
        for patch in patches {
            let outcome = if !self.state.is_enabled() {
                PatchOutcome::Skipped
            } else {
                match patch.validate().and_then(|()| installer.install(patch)) {
                    Ok(()) => {
                        debug!(
                            "event=patch_apply module=patching status=ok patch={}",
                            patch.name
                        );
                        PatchOutcome::Applied
                    }
                    Err(err) => {
                        self.state.disable();
                        error!(
                            "event=patch_apply module=patching status=error patch={} patching=disabled",
                            patch.name
                        );
                        self.monitor.log(
                            &format!(
                                "Couldn't apply runtime patch '{}' to the game. Some loader features may not work correctly. See log file for details.",
                                patch.name
                            ),
                            LogLevel::Error,
                        );
                        self.monitor.log(&err.to_string(), LogLevel::Trace);
                        PatchOutcome::Failed
                    }
                }
            };
            summary.records.push(PatchRecord {
                name: patch.name.clone(),
                outcome,
            });
        }
        summary
    }
}

/// Redirect target for mods' own patch calls.
///
/// Every method forwards to the installer only while patching is enabled
/// and returns `None` otherwise.
#[derive(Debug, Clone)]
pub struct PatchFacade {
    state: PatchState,
}

impl PatchFacade {
    pub fn new(state: PatchState) -> Self {
        Self { state }
    }

    pub fn patch(
        &self,
        installer: &mut dyn PatchInstaller,
        patch: &PatchDescriptor,
    ) -> Option<Result<(), PatchError>> {
        if !self.state.is_enabled() {
            return None;
        }
        Some(patch.validate().and_then(|()| installer.install(patch)))
    }

    pub fn patch_all(
        &self,
        installer: &mut dyn PatchInstaller,
        patches: &[PatchDescriptor],
    ) -> Option<Vec<Result<(), PatchError>>> {
        if !self.state.is_enabled() {
            return None;
        }
        Some(
            patches
                .iter()
                .map(|patch| patch.validate().and_then(|()| installer.install(patch)))
                .collect(),
        )
    }

    /// Like `patch_all`, limited to patches declared in `assembly`.
    pub fn patch_all_in_assembly(
        &self,
        installer: &mut dyn PatchInstaller,
        patches: &[PatchDescriptor],
        assembly: &str,
    ) -> Option<Vec<Result<(), PatchError>>> {
        let declared: Vec<PatchDescriptor> = patches
            .iter()
            .filter(|patch| patch.declared_in.as_deref() == Some(assembly))
            .cloned()
            .collect();
        self.patch_all(installer, &declared)
    }
}
