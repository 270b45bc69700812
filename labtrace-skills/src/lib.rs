//! Skill proficiency for labtrace.
//!
//! Projects completed-step evidence from `labtrace-core` onto skills via a
//! Q-matrix, aggregates it across sessions with exponential time decay, and
//! resolves a proficiency level per student and skill.
//!
//! Every function here takes an explicit `as_of` instant; nothing reads the
//! wall clock, so the same evidence always resolves to the same state.

mod config;
mod decay;
mod error;
mod gaps;
mod level;
mod mapping;
mod qmatrix;
mod state;
mod types;

// Error types
pub use error::{ProficiencyError, Result};

// Configuration
pub use config::ProficiencyConfig;
pub use decay::{DecayConfig, NEGLIGIBLE_WEIGHT};

// Level and ID types
pub use types::{MasteryLevel, ProficiencyLevel, SkillId, StudentId};

// Q-matrix and evidence mapping
pub use mapping::{EvidenceSourceType, SkillEvidence, map_skill_evidence};
pub use qmatrix::{LabRequirements, QMatrix, QMatrixEntry, SkillRequirement};

// Aggregation and resolution
pub use decay::{
    LevelAggregates, age_in_days, aggregate_level, aggregate_levels, decay_factor,
    decayed_contribution,
};
pub use gaps::{GapAnalysis, SkillGap, analyze_gaps};
pub use level::{ProficiencyThresholds, resolve_level};
pub use state::{SkillState, SkillStateResolver, group_by_student};
