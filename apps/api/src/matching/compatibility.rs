//! Compatibility Aggregator — combines skill and experience matches into one report.
//!
//! Total by contract: provider or cache outages lower the semantic components
//! but never turn into an error.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::experience::{compute_experience_match, ExperienceMatch, JobScore};
use super::skills::{compute_skill_match, SkillMatch};
use crate::cache::CacheStats;
use crate::context::CoreContext;
use crate::models::{ParsedCv, ParsedJd};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityReport {
    pub overall_embedding_similarity: f64,
    pub skills_cosine_similarity: f64,
    pub experience_cosine_similarity: f64,
    pub experience_weighted_similarity: f64,
    pub critical_skills_match: f64,
    pub important_skills_match: f64,
    pub exact_keyword_match: f64,
    pub fuzzy_keyword_match: f64,
    pub semantic_skills_match: f64,
    pub missing_critical_skills: Vec<String>,
    pub missing_important_skills: Vec<String>,
    pub matched_skills: Vec<String>,
    pub experience_per_job: Vec<JobScore>,
    pub cache_stats: CacheStats,
}

pub async fn compute_compatibility(
    ctx: &CoreContext,
    cv: &ParsedCv,
    jd: &ParsedJd,
) -> CompatibilityReport {
    let weights = &ctx.config().scoring;

    let skills = compute_skill_match(
        ctx.batch(),
        &cv.technical_skills,
        &jd.hard_skills_required,
        weights,
    )
    .await;
    let experience = compute_experience_match(
        ctx.batch(),
        &cv.work_experience,
        &jd.responsibilities,
        weights,
    )
    .await;

    let a = &weights.aggregate;
    let overall = a.skills * skills.overall_similarity
        + a.experience_weighted * experience.weighted_similarity
        + a.critical * skills.critical_skills_match
        + a.exact * skills.exact_match_score;

    let report = build_report(overall, skills, experience, ctx.cache().stats());
    info!(
        "Compatibility scored: overall={} exact={} semantic={}",
        report.overall_embedding_similarity,
        report.exact_keyword_match,
        report.semantic_skills_match
    );
    report
}

fn build_report(
    overall: f64,
    skills: SkillMatch,
    experience: ExperienceMatch,
    cache_stats: CacheStats,
) -> CompatibilityReport {
    CompatibilityReport {
        overall_embedding_similarity: ratio(overall),
        skills_cosine_similarity: ratio(skills.overall_similarity),
        experience_cosine_similarity: ratio(experience.overall_similarity),
        experience_weighted_similarity: ratio(experience.weighted_similarity),
        critical_skills_match: ratio(skills.critical_skills_match),
        important_skills_match: ratio(skills.important_skills_match),
        exact_keyword_match: ratio(skills.exact_match_score),
        fuzzy_keyword_match: ratio(skills.fuzzy_match_score),
        semantic_skills_match: ratio(skills.semantic_match_score),
        missing_critical_skills: skills.missing_critical,
        missing_important_skills: skills.missing_important,
        matched_skills: skills.matched_skills,
        experience_per_job: experience
            .per_job_scores
            .into_iter()
            .map(|job| JobScore {
                similarity: ratio(job.similarity),
                weighted_score: ratio(job.weighted_score),
                ..job
            })
            .collect(),
        cache_stats,
    }
}

/// Clamps to [0, 1] (non-finite → 0) and rounds to 3 decimals.
fn ratio(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    round3(value.clamp(0.0, 1.0))
}

pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
