//! Typed records for the scoring core's inputs. Malformed shapes are rejected
//! here, at ingress, so the matchers never probe optional keys.

pub mod cv;
pub mod jd;

use thiserror::Error;

pub use cv::{Achievements, ParsedCv, WorkEntry};
pub use jd::{JdSkill, ParsedJd, Priority};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("technical_skills[{index}] is blank")]
    BlankCvSkill { index: usize },

    #[error("work_experience[{index}] has neither a role nor achievements")]
    EmptyWorkEntry { index: usize },

    #[error("hard_skills_required[{index}].skill is blank")]
    BlankJdSkill { index: usize },

    #[error("responsibilities[{index}] is blank")]
    BlankResponsibility { index: usize },
}
