//! Per-record coverage classification.

use crate::evidence::EvidenceIndex;
use crate::patterns::{milestone_major, milestone_tokens};
use crate::records::{ChildIndex, Record};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Title prefix of program meta beads.
pub const PROGRAM_PREFIX: &str = "PROGRAM:";
/// Title prefix of track meta beads.
pub const TRACK_PREFIX: &str = "TRACK-";

/// How urgently a classification needs attention.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Info,
    Action,
}

/// The five coverage tags. Exactly one applies to every closed record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    CoveredExact,
    CoveredMilestoneAlias,
    CoveredParentRollup,
    ExemptProgramMeta,
    GapRequiresEntry,
}

impl Classification {
    pub const ALL: [Classification; 5] = [
        Self::CoveredExact,
        Self::CoveredMilestoneAlias,
        Self::CoveredParentRollup,
        Self::ExemptProgramMeta,
        Self::GapRequiresEntry,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::CoveredExact => "covered_exact",
            Self::CoveredMilestoneAlias => "covered_milestone_alias",
            Self::CoveredParentRollup => "covered_parent_rollup",
            Self::ExemptProgramMeta => "exempt_program_meta",
            Self::GapRequiresEntry => "gap_requires_entry",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            Self::CoveredExact | Self::CoveredMilestoneAlias | Self::CoveredParentRollup => {
                Severity::Ok
            }
            Self::ExemptProgramMeta => Severity::Info,
            Self::GapRequiresEntry => Severity::Action,
        }
    }

    pub fn rationale(self) -> &'static str {
        match self {
            Self::CoveredExact => "Exact bead heading found in risk register.",
            Self::CoveredMilestoneAlias => {
                "No exact bead heading, but milestone heading exists (legacy style). \
                 Counts as covered for transitional compatibility."
            }
            Self::CoveredParentRollup => {
                "Feature/program parent has child beads and all children are covered; \
                 parent bead may remain rollup-only."
            }
            Self::ExemptProgramMeta => {
                "Program/track meta bead intentionally exempt from per-bead risk entry."
            }
            Self::GapRequiresEntry => {
                "Closed bead lacks acceptable evidence mapping and needs risk-register action."
            }
        }
    }

    /// Everything except a gap counts as covered.
    pub fn is_covered(self) -> bool {
        !matches!(self, Self::GapRequiresEntry)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A classification plus the identifiers that justified it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub classification: Classification,
    /// Matched milestone tokens or rollup child ids, sorted and deduplicated.
    pub evidence_refs: Vec<String>,
}

impl Outcome {
    fn bare(classification: Classification) -> Self {
        Self {
            classification,
            evidence_refs: Vec::new(),
        }
    }

    pub fn is_covered(&self) -> bool {
        self.classification.is_covered()
    }
}

/// Frozen record id -> direct coverage map produced by the first pass.
///
/// Only built through [`FromIterator`]; there is no way to mutate it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoverageLookup {
    covered: BTreeMap<String, bool>,
}

impl CoverageLookup {
    /// Coverage of `id`; `None` when the id was never classified.
    pub fn get(&self, id: &str) -> Option<bool> {
        self.covered.get(id).copied()
    }

    /// A lookup miss counts as uncovered.
    pub fn is_covered(&self, id: &str) -> bool {
        self.get(id).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.covered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.covered.is_empty()
    }

    pub fn covered_count(&self) -> usize {
        self.covered.values().filter(|c| **c).count()
    }
}

impl FromIterator<(String, bool)> for CoverageLookup {
    fn from_iter<I: IntoIterator<Item = (String, bool)>>(iter: I) -> Self {
        Self {
            covered: iter.into_iter().collect(),
        }
    }
}

/// Milestone tokens in `title` that have a heading, by full token first and
/// then by major component.
pub fn milestone_hits(title: &str, evidence: &EvidenceIndex) -> Vec<String> {
    let mut hits = BTreeSet::new();
    for token in milestone_tokens(title) {
        if evidence.has_milestone(&token) {
            hits.insert(token);
        } else {
            let major = milestone_major(&token);
            if evidence.has_milestone(major) {
                hits.insert(major.to_string());
            }
        }
    }
    hits.into_iter().collect()
}

pub fn is_meta_title(title: &str) -> bool {
    title.starts_with(PROGRAM_PREFIX) || title.starts_with(TRACK_PREFIX)
}

/// Classify one closed record. Rules are tried in order and the first match
/// wins: exact heading, milestone alias, program/track meta, parent rollup,
/// gap.
///
/// `coverage` is `None` during the first pass, which disables rollup.
pub fn classify(
    record: &Record,
    evidence: &EvidenceIndex,
    children: &ChildIndex,
    coverage: Option<&CoverageLookup>,
) -> Outcome {
    if evidence.has_exact(&record.id) {
        return Outcome::bare(Classification::CoveredExact);
    }

    let hits = milestone_hits(&record.title, evidence);
    if !hits.is_empty() {
        return Outcome {
            classification: Classification::CoveredMilestoneAlias,
            evidence_refs: hits,
        };
    }

    if is_meta_title(&record.title) {
        return Outcome::bare(Classification::ExemptProgramMeta);
    }

    if let Some(lookup) = coverage {
        let kids = children.children_of(&record.id);
        if record.kind.is_aggregating()
            && !kids.is_empty()
            && kids.iter().all(|kid| lookup.is_covered(kid))
        {
            return Outcome {
                classification: Classification::CoveredParentRollup,
                evidence_refs: kids.to_vec(),
            };
        }
    }

    Outcome::bare(Classification::GapRequiresEntry)
}
