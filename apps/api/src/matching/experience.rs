//! Recency-Weighted Experience Matcher.
//!
//! Each scored work entry is reduced to its best-matching responsibility and
//! multiplied by its positional recency weight. Only as many entries as the
//! recency table has weights are embedded.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::similarity::{cosine_matrix, row_max};
use super::weights::ScoringWeights;
use crate::embedding::BatchEmbedder;
use crate::models::WorkEntry;

/// Max characters of a work entry sent for embedding.
pub const MAX_ENTRY_CHARS: usize = 512;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobScore {
    pub job_index: usize,
    pub similarity: f64,
    pub recency_weight: f64,
    pub weighted_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceMatch {
    pub overall_similarity: f64,
    pub weighted_similarity: f64,
    pub per_job_scores: Vec<JobScore>,
}

pub async fn compute_experience_match(
    batch: &BatchEmbedder,
    experience: &[WorkEntry],
    responsibilities: &[String],
    weights: &ScoringWeights,
) -> ExperienceMatch {
    let texts = entry_texts(experience, weights.recency.len());
    if texts.is_empty() || responsibilities.is_empty() {
        return ExperienceMatch::default();
    }

    let entry_vectors = batch.embed_batch(&texts, true, None).await;
    let responsibility_vectors = batch.embed_batch(responsibilities, true, None).await;
    let matrix = cosine_matrix(&entry_vectors, &responsibility_vectors);

    score_experience(&matrix, texts.len(), weights)
}

/// Texts for the first `limit` entries, each truncated to `MAX_ENTRY_CHARS`.
pub fn entry_texts(experience: &[WorkEntry], limit: usize) -> Vec<String> {
    experience
        .iter()
        .take(limit)
        .map(|entry| entry.description().chars().take(MAX_ENTRY_CHARS).collect())
        .collect()
}

/// Scores the first `jobs` rows of an entries × responsibilities matrix.
pub fn score_experience(
    matrix: &Array2<f64>,
    jobs: usize,
    weights: &ScoringWeights,
) -> ExperienceMatch {
    let jobs = jobs.min(matrix.nrows());
    if jobs == 0 {
        return ExperienceMatch::default();
    }

    let per_job_scores: Vec<JobScore> = (0..jobs)
        .map(|i| {
            let similarity = row_max(matrix, i);
            let recency_weight = weights.recency_weight(i);
            JobScore {
                job_index: i,
                similarity,
                recency_weight,
                weighted_score: similarity * recency_weight,
            }
        })
        .collect();

    let n = per_job_scores.len() as f64;
    let overall = per_job_scores.iter().map(|s| s.similarity).sum::<f64>() / n;
    let weighted = per_job_scores.iter().map(|s| s.weighted_score).sum::<f64>() / n;

    ExperienceMatch {
        overall_similarity: overall.clamp(0.0, 1.0),
        weighted_similarity: weighted.clamp(0.0, 1.0),
        per_job_scores,
    }
}
