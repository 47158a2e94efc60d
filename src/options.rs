use serde::{Deserialize, Serialize};

/// What to do with a billing period that has no supporting evidence attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidencePolicy {
    /// Reject the period outright
    Require,
    /// Accept the period but record a warning against it
    Warn,
    /// Don't check for evidence at all
    Ignore,
}

impl Default for EvidencePolicy {
    fn default() -> Self {
        EvidencePolicy::Require
    }
}

/// Knobs for hosts that don't share the default validation rules.
///
/// The defaults match a workflow where every bill must be uploaded before its usage
/// counts towards the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    pub evidence: EvidencePolicy,
    pub reject_duplicate_ids: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            evidence: EvidencePolicy::default(),
            reject_duplicate_ids: true,
        }
    }
}

impl EngineOptions {
    pub fn with_evidence(&mut self, policy: EvidencePolicy) -> &mut Self {
        self.evidence = policy;
        self
    }

    pub fn with_duplicate_ids(&mut self, allowed: bool) -> &mut Self {
        self.reject_duplicate_ids = !allowed;
        self
    }
}
