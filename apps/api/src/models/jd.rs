use serde::{Deserialize, Serialize};

use super::InputError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    Important,
    #[default]
    Nice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JdSkill {
    pub skill: String,
    #[serde(default)]
    pub priority: Priority,
}

impl JdSkill {
    pub fn new(skill: impl Into<String>, priority: Priority) -> Self {
        Self {
            skill: skill.into(),
            priority,
        }
    }
}

/// The parts of a parsed job description the scoring core reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedJd {
    #[serde(default)]
    pub hard_skills_required: Vec<JdSkill>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
}

impl ParsedJd {
    pub fn validate(&self) -> Result<(), InputError> {
        if let Some(index) = self
            .hard_skills_required
            .iter()
            .position(|s| s.skill.trim().is_empty())
        {
            return Err(InputError::BlankJdSkill { index });
        }
        if let Some(index) = self
            .responsibilities
            .iter()
            .position(|r| r.trim().is_empty())
        {
            return Err(InputError::BlankResponsibility { index });
        }
        Ok(())
    }
}
