//! Handler outcomes and their severities.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Outcome of one handler over one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerResult {
    None,
    Rewrote,
    RewroteWithNotice,
    DetectedGamePatch,
    DetectedDynamic,
    DetectedSaveSerializer,
    DetectedUnvalidatedUpdateHook,
    DetectedFilesystemAccess,
    DetectedShellAccess,
    DetectedBrokenReference,
    DetectedReferenceTypeMismatch,
    DetectedIncompatibleWrite,
}

/// Ordered severity of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    RewriteApplied,
    CompatibilityNotice,
    StabilityRisk,
    FatalIncompatibility,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RewriteApplied => "rewrite_applied",
            Self::CompatibilityNotice => "compatibility_notice",
            Self::StabilityRisk => "stability_risk",
            Self::FatalIncompatibility => "fatal_incompatibility",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl HandlerResult {
    /// Every result that carries a finding.
    pub const ALL_FINDINGS: [HandlerResult; 11] = [
        Self::Rewrote,
        Self::RewroteWithNotice,
        Self::DetectedGamePatch,
        Self::DetectedDynamic,
        Self::DetectedSaveSerializer,
        Self::DetectedUnvalidatedUpdateHook,
        Self::DetectedFilesystemAccess,
        Self::DetectedShellAccess,
        Self::DetectedBrokenReference,
        Self::DetectedReferenceTypeMismatch,
        Self::DetectedIncompatibleWrite,
    ];

    /// Stable string id used in reports and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Rewrote => "rewrote",
            Self::RewroteWithNotice => "rewrote_with_notice",
            Self::DetectedGamePatch => "detected_game_patch",
            Self::DetectedDynamic => "detected_dynamic",
            Self::DetectedSaveSerializer => "detected_save_serializer",
            Self::DetectedUnvalidatedUpdateHook => "detected_unvalidated_update_hook",
            Self::DetectedFilesystemAccess => "detected_filesystem_access",
            Self::DetectedShellAccess => "detected_shell_access",
            Self::DetectedBrokenReference => "detected_broken_reference",
            Self::DetectedReferenceTypeMismatch => "detected_reference_type_mismatch",
            Self::DetectedIncompatibleWrite => "detected_incompatible_write",
        }
    }

    /// User-facing short description.
    pub fn description(self) -> &'static str {
        match self {
            Self::None => "No match.",
            Self::Rewrote => "Rewrote code for compatibility with this host version.",
            Self::RewroteWithNotice => {
                "Rewrote code for compatibility; the mod may behave slightly differently."
            }
            Self::DetectedGamePatch => {
                "Patches the game code directly; this may cause errors or crashes."
            }
            Self::DetectedDynamic => {
                "Uses the dynamic keyword; this won't work on Linux or macOS."
            }
            Self::DetectedSaveSerializer => {
                "Accesses the save serializer; this may corrupt or break save files."
            }
            Self::DetectedUnvalidatedUpdateHook => {
                "Bypasses state validation during updates; this may cause crashes."
            }
            Self::DetectedFilesystemAccess => "Directly accesses the filesystem.",
            Self::DetectedShellAccess => "Starts external processes or shell commands.",
            Self::DetectedBrokenReference => {
                "References code that no longer exists in this host version."
            }
            Self::DetectedReferenceTypeMismatch => {
                "References code whose type changed in this host version."
            }
            Self::DetectedIncompatibleWrite => {
                "Writes to a value that is now a constant in this host version."
            }
        }
    }

    /// `None` for `HandlerResult::None`.
    pub fn severity(self) -> Option<Severity> {
        match self {
            Self::None => None,
            Self::Rewrote => Some(Severity::RewriteApplied),
            Self::RewroteWithNotice => Some(Severity::CompatibilityNotice),
            Self::DetectedGamePatch
            | Self::DetectedDynamic
            | Self::DetectedSaveSerializer
            | Self::DetectedUnvalidatedUpdateHook
            | Self::DetectedFilesystemAccess
            | Self::DetectedShellAccess => Some(Severity::StabilityRisk),
            Self::DetectedBrokenReference
            | Self::DetectedReferenceTypeMismatch
            | Self::DetectedIncompatibleWrite => Some(Severity::FatalIncompatibility),
        }
    }

    pub fn is_none(self) -> bool {
        self == Self::None
    }

    pub fn is_rewrite(self) -> bool {
        matches!(self, Self::Rewrote | Self::RewroteWithNotice)
    }
}

impl Display for HandlerResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{HandlerResult, Severity};
    use std::collections::BTreeSet;

    #[test]
    fn every_finding_has_unique_id_and_severity() {
        let ids: BTreeSet<_> = HandlerResult::ALL_FINDINGS
            .iter()
            .map(|result| result.as_str())
            .collect();
        assert_eq!(ids.len(), HandlerResult::ALL_FINDINGS.len());
        assert!(HandlerResult::ALL_FINDINGS
            .iter()
            .all(|result| result.severity().is_some() && !result.description().is_empty()));
        assert_eq!(HandlerResult::None.severity(), None);
    }

    #[test]
    fn severities_are_ordered() {
        assert!(Severity::RewriteApplied < Severity::CompatibilityNotice);
        assert!(Severity::CompatibilityNotice < Severity::StabilityRisk);
        assert!(Severity::StabilityRisk < Severity::FatalIncompatibility);
        assert_eq!(
            HandlerResult::DetectedIncompatibleWrite.severity(),
            Some(Severity::FatalIncompatibility)
        );
        assert_eq!(
            HandlerResult::DetectedShellAccess.severity(),
            Some(Severity::StabilityRisk)
        );
    }

    #[test]
    fn serializes_as_stable_id() {
        let json = serde_json::to_string(&HandlerResult::DetectedGamePatch)
            .expect("result should serialize");
        assert_eq!(json, "\"detected_game_patch\"");
    }
}
