//! Scan report and load decision.
//!
//! # Responsibility
//! - Record every non-`None` handler result with its instruction site.
//! - Derive the load decision from the most severe finding.
//!
//! # Invariants
//! - Findings keep scan order: by type, method, offset, then handler order.
//! - `scan_id` is unique per scan and used to correlate log lines.

use crate::handler::{HandlerResult, Severity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Positional address of one instruction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstructionSite {
    pub type_name: String,
    pub method_name: String,
    /// Method position within its type; disambiguates overloads.
    pub method_index: usize,
    pub offset: usize,
}

impl Display for InstructionSite {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}::{}#{} IL_{:04x}",
            self.type_name, self.method_name, self.method_index, self.offset
        )
    }
}

/// One handler result at one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub site: InstructionSite,
    pub handler: String,
    pub result: HandlerResult,
    pub message: String,
}

impl Finding {
    pub fn severity(&self) -> Severity {
        // Reports never hold `None` results.
        self.result.severity().unwrap_or(Severity::RewriteApplied)
    }
}

/// What the loader does with a scanned mod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadDecision {
    Accept,
    AcceptWithWarnings,
    /// Loaded, but flagged to the user as bypassing host safety.
    AcceptUntrusted,
    Reject,
}

impl LoadDecision {
    pub fn from_severity(severity: Option<Severity>) -> Self {
        match severity {
            None | Some(Severity::RewriteApplied) => Self::Accept,
            Some(Severity::CompatibilityNotice) => Self::AcceptWithWarnings,
            Some(Severity::StabilityRisk) => Self::AcceptUntrusted,
            Some(Severity::FatalIncompatibility) => Self::Reject,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::AcceptWithWarnings => "accept_with_warnings",
            Self::AcceptUntrusted => "accept_untrusted",
            Self::Reject => "reject",
        }
    }

    pub fn is_loaded(self) -> bool {
        self != Self::Reject
    }
}

impl Display for LoadDecision {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Findings of one module scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub scan_id: Uuid,
    pub module: String,
    pub findings: Vec<Finding>,
}

impl Report {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            scan_id: Uuid::new_v4(),
            module: module.into(),
            findings: Vec::new(),
        }
    }

    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    /// Site -> set of results at that site.
    pub fn by_site(&self) -> BTreeMap<&InstructionSite, BTreeSet<HandlerResult>> {
        let mut sites: BTreeMap<&InstructionSite, BTreeSet<HandlerResult>> = BTreeMap::new();
        for finding in &self.findings {
            sites.entry(&finding.site).or_default().insert(finding.result);
        }
        sites
    }

    pub fn results_at(&self, site: &InstructionSite) -> BTreeSet<HandlerResult> {
        self.findings
            .iter()
            .filter(|finding| &finding.site == site)
            .map(|finding| finding.result)
            .collect()
    }

    pub fn with_severity(&self, severity: Severity) -> Vec<&Finding> {
        self.findings
            .iter()
            .filter(|finding| finding.severity() == severity)
            .collect()
    }

    /// Findings grouped by severity, most severe first.
    pub fn by_severity(&self) -> BTreeMap<std::cmp::Reverse<Severity>, Vec<&Finding>> {
        let mut groups: BTreeMap<std::cmp::Reverse<Severity>, Vec<&Finding>> = BTreeMap::new();
        for finding in &self.findings {
            groups
                .entry(std::cmp::Reverse(finding.severity()))
                .or_default()
                .push(finding);
        }
        groups
    }

    pub fn max_severity(&self) -> Option<Severity> {
        self.findings.iter().map(Finding::severity).max()
    }

    pub fn decision(&self) -> LoadDecision {
        LoadDecision::from_severity(self.max_severity())
    }

    pub fn count(&self, result: HandlerResult) -> usize {
        self.findings
            .iter()
            .filter(|finding| finding.result == result)
            .count()
    }

    pub fn rewrite_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|finding| finding.result.is_rewrite())
            .count()
    }

    /// Distinct detection results, in severity order.
    pub fn detections(&self) -> BTreeSet<HandlerResult> {
        self.findings
            .iter()
            .map(|finding| finding.result)
            .filter(|result| !result.is_rewrite())
            .collect()
    }
}
