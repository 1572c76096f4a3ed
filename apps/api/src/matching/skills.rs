//! Hybrid Skill Matcher — exact + fuzzy keyword matching blended with embedding similarity.
//!
//! CV skills and JD skill names are embedded once; the critical / important
//! scores and the missing-skill lists all read column subsets of that single
//! CV × JD matrix.

use std::collections::BTreeSet;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::similarity::{column_best, cosine_matrix, mean_column_max};
use super::weights::ScoringWeights;
use crate::embedding::BatchEmbedder;
use crate::models::{JdSkill, Priority};

/// Skill scores at full precision. Rounding happens in the report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillMatch {
    pub overall_similarity: f64,
    pub critical_skills_match: f64,
    pub important_skills_match: f64,
    pub exact_match_score: f64,
    pub fuzzy_match_score: f64,
    pub semantic_match_score: f64,
    /// Case-folded exact matches, sorted.
    pub matched_skills: Vec<String>,
    pub missing_critical: Vec<String>,
    pub missing_important: Vec<String>,
}

/// Case fold used by every keyword comparison.
pub fn fold(skill: &str) -> String {
    skill.trim().to_lowercase()
}

// ────────────────────────────────────────────────────────────────────────────
// Keyword matchers
// ────────────────────────────────────────────────────────────────────────────

/// `|cv ∩ jd| / |jd|` over case-folded sets. Returns the intersection, sorted.
pub fn exact_keyword_match(cv_skills: &[String], jd_skills: &[String]) -> (f64, Vec<String>) {
    if cv_skills.is_empty() || jd_skills.is_empty() {
        return (0.0, Vec::new());
    }

    let cv: BTreeSet<String> = cv_skills.iter().map(|s| fold(s)).collect();
    let jd: BTreeSet<String> = jd_skills.iter().map(|s| fold(s)).collect();
    let matched: Vec<String> = cv.intersection(&jd).cloned().collect();

    (matched.len() as f64 / jd.len() as f64, matched)
}

/// Substring matches in either direction, excluding exact equality.
/// At most one CV skill is credited per JD skill. Returns `(cv, jd)` pairs.
pub fn fuzzy_keyword_match(
    cv_skills: &[String],
    jd_skills: &[String],
) -> (f64, Vec<(String, String)>) {
    if cv_skills.is_empty() || jd_skills.is_empty() {
        return (0.0, Vec::new());
    }

    let cv: Vec<String> = cv_skills
        .iter()
        .map(|s| fold(s))
        .filter(|s| !s.is_empty())
        .collect();

    let mut partial = Vec::new();
    for jd in jd_skills.iter().map(|s| fold(s)) {
        let hit = cv
            .iter()
            .find(|c| **c != jd && (c.contains(jd.as_str()) || jd.contains(c.as_str())));
        if let Some(c) = hit {
            partial.push((c.clone(), jd));
        }
    }

    (partial.len() as f64 / jd_skills.len() as f64, partial)
}

// ────────────────────────────────────────────────────────────────────────────
// Hybrid match
// ────────────────────────────────────────────────────────────────────────────

/// Embeds both skill lists through the batch embedder and scores them.
/// Empty inputs score zero without touching the embedder.
pub async fn compute_skill_match(
    batch: &BatchEmbedder,
    cv_skills: &[String],
    jd_skills: &[JdSkill],
    weights: &ScoringWeights,
) -> SkillMatch {
    if cv_skills.is_empty() || jd_skills.is_empty() {
        return SkillMatch::default();
    }

    let jd_names = skill_names(jd_skills);
    let cv_vectors = batch.embed_batch(cv_skills, true, None).await;
    let jd_vectors = batch.embed_batch(&jd_names, true, None).await;
    let matrix = cosine_matrix(&cv_vectors, &jd_vectors);

    score_skills(cv_skills, jd_skills, &matrix, weights)
}

/// Scores against a precomputed `|cv| × |jd|` similarity matrix.
pub fn score_skills(
    cv_skills: &[String],
    jd_skills: &[JdSkill],
    matrix: &Array2<f64>,
    weights: &ScoringWeights,
) -> SkillMatch {
    if cv_skills.is_empty() || jd_skills.is_empty() {
        return SkillMatch::default();
    }

    let jd_names = skill_names(jd_skills);
    let (exact, matched_skills) = exact_keyword_match(cv_skills, &jd_names);
    let (fuzzy, _) = fuzzy_keyword_match(cv_skills, &jd_names);
    let all_columns: Vec<usize> = (0..jd_skills.len()).collect();
    let semantic = mean_column_max(matrix, &all_columns);

    let missing = MissingSkills {
        cv_skills,
        jd_skills,
        matrix,
        weights,
    };

    SkillMatch {
        overall_similarity: weights.hybrid.blend(exact, fuzzy, semantic),
        critical_skills_match: bucket_score(
            cv_skills,
            jd_skills,
            matrix,
            Priority::Critical,
            weights,
        ),
        important_skills_match: bucket_score(
            cv_skills,
            jd_skills,
            matrix,
            Priority::Important,
            weights,
        ),
        exact_match_score: exact,
        fuzzy_match_score: fuzzy,
        semantic_match_score: semantic,
        matched_skills,
        missing_critical: missing.for_priority(Priority::Critical),
        missing_important: missing.for_priority(Priority::Important),
    }
}

fn skill_names(jd_skills: &[JdSkill]) -> Vec<String> {
    jd_skills.iter().map(|s| s.skill.clone()).collect()
}

fn columns_with(jd_skills: &[JdSkill], priority: Priority) -> Vec<usize> {
    jd_skills
        .iter()
        .enumerate()
        .filter(|(_, s)| s.priority == priority)
        .map(|(j, _)| j)
        .collect()
}

/// Exact / fuzzy / semantic blend restricted to one priority bucket.
fn bucket_score(
    cv_skills: &[String],
    jd_skills: &[JdSkill],
    matrix: &Array2<f64>,
    priority: Priority,
    weights: &ScoringWeights,
) -> f64 {
    let columns = columns_with(jd_skills, priority);
    if columns.is_empty() {
        return 0.0;
    }

    let names: Vec<String> = columns.iter().map(|&j| jd_skills[j].skill.clone()).collect();
    let (exact, _) = exact_keyword_match(cv_skills, &names);
    let (fuzzy, _) = fuzzy_keyword_match(cv_skills, &names);
    let semantic = mean_column_max(matrix, &columns);

    weights.priority.blend(exact, fuzzy, semantic)
}

struct MissingSkills<'a> {
    cv_skills: &'a [String],
    jd_skills: &'a [JdSkill],
    matrix: &'a Array2<f64>,
    weights: &'a ScoringWeights,
}

impl MissingSkills<'_> {
    /// JD skills of `priority` with no exact, substring, or above-threshold semantic match.
    fn for_priority(&self, priority: Priority) -> Vec<String> {
        let cv_folded: Vec<String> = self
            .cv_skills
            .iter()
            .map(|s| fold(s))
            .filter(|s| !s.is_empty())
            .collect();

        columns_with(self.jd_skills, priority)
            .into_iter()
            .filter(|&j| self.is_missing(&cv_folded, j))
            .map(|j| self.jd_skills[j].skill.clone())
            .collect()
    }

    fn is_missing(&self, cv_folded: &[String], column: usize) -> bool {
        let skill = &self.jd_skills[column].skill;
        let folded = fold(skill);

        if cv_folded.contains(&folded) {
            return false;
        }
        if cv_folded
            .iter()
            .any(|c| c.contains(folded.as_str()) || folded.contains(c.as_str()))
        {
            return false;
        }

        let (best, row) = column_best(self.matrix, column);
        let best_cv = self.cv_skills.get(row).map(String::as_str).unwrap_or("");
        let avg_len = (skill.chars().count() + best_cv.chars().count()) as f64 / 2.0;

        best < self.weights.thresholds.for_average_len(avg_len)
    }
}
