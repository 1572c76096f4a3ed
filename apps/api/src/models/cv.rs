use serde::{Deserialize, Serialize};

use super::InputError;

/// The parts of a parsed résumé the scoring core reads. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedCv {
    #[serde(default)]
    pub technical_skills: Vec<String>,
    /// Most recent entry first.
    #[serde(default)]
    pub work_experience: Vec<WorkEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkEntry {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub achievements: Achievements,
}

/// Achievements arrive either as one paragraph or as a bullet list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Achievements {
    One(String),
    Many(Vec<String>),
}

impl Default for Achievements {
    fn default() -> Self {
        Achievements::Many(Vec::new())
    }
}

impl Achievements {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let items: &[String] = match self {
            Achievements::One(text) => std::slice::from_ref(text),
            Achievements::Many(items) => items,
        };
        items.iter().map(String::as_str)
    }
}

impl WorkEntry {
    /// `role` followed by every achievement, space-joined. Blank parts are skipped.
    pub fn description(&self) -> String {
        std::iter::once(self.role.as_str())
            .chain(self.achievements.iter())
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl ParsedCv {
    pub fn validate(&self) -> Result<(), InputError> {
        if let Some(index) = self.technical_skills.iter().position(|s| s.trim().is_empty()) {
            return Err(InputError::BlankCvSkill { index });
        }
        if let Some(index) = self
            .work_experience
            .iter()
            .position(|entry| entry.description().is_empty())
        {
            return Err(InputError::EmptyWorkEntry { index });
        }
        Ok(())
    }
}
