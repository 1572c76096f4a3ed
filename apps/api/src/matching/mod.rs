pub mod compatibility;
pub mod experience;
pub mod similarity;
pub mod skills;
pub mod weights;

pub use compatibility::{compute_compatibility, CompatibilityReport};
pub use experience::{ExperienceMatch, JobScore};
pub use skills::SkillMatch;
pub use weights::ScoringWeights;
