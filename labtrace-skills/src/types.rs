//! Skill identifiers and proficiency levels.

use serde::{Deserialize, Serialize};

labtrace_core::string_id!(
    /// Identifier of a skill in the catalog.
    SkillId
);

labtrace_core::string_id!(
    /// Identifier of a student.
    StudentId
);

/// Depth of demonstrated skill, ordered `knows < understands < applies`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProficiencyLevel {
    Knows,
    Understands,
    Applies,
}

impl ProficiencyLevel {
    /// All levels, lowest first.
    pub const ALL: [ProficiencyLevel; 3] = [Self::Knows, Self::Understands, Self::Applies];

    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Knows => "knows",
            Self::Understands => "understands",
            Self::Applies => "applies",
        }
    }

    /// Parse from string representation
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "knows" => Some(Self::Knows),
            "understands" => Some(Self::Understands),
            "applies" => Some(Self::Applies),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProficiencyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved level for a skill, including "no level reached".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MasteryLevel {
    #[default]
    Unassessed,
    Knows,
    Understands,
    Applies,
}

impl MasteryLevel {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unassessed => "unassessed",
            Self::Knows => "knows",
            Self::Understands => "understands",
            Self::Applies => "applies",
        }
    }

    /// The proficiency level reached, if any.
    #[must_use]
    pub fn level(&self) -> Option<ProficiencyLevel> {
        match self {
            Self::Unassessed => None,
            Self::Knows => Some(ProficiencyLevel::Knows),
            Self::Understands => Some(ProficiencyLevel::Understands),
            Self::Applies => Some(ProficiencyLevel::Applies),
        }
    }

    /// Whether this level is at least `required`.
    #[must_use]
    pub fn meets(&self, required: ProficiencyLevel) -> bool {
        *self >= MasteryLevel::from(required)
    }
}

impl From<ProficiencyLevel> for MasteryLevel {
    fn from(level: ProficiencyLevel) -> Self {
        match level {
            ProficiencyLevel::Knows => Self::Knows,
            ProficiencyLevel::Understands => Self::Understands,
            ProficiencyLevel::Applies => Self::Applies,
        }
    }
}

impl std::fmt::Display for MasteryLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
