use serde::{Deserialize, Serialize};

/// Tunable scoring constants. `Default` carries the production values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Hybrid skill score over all JD skills.
    pub hybrid: BlendWeights,
    /// Critical / important bucket scores.
    pub priority: BlendWeights,
    pub aggregate: AggregateWeights,
    pub thresholds: AdaptiveThresholds,
    /// Per-position multiplier for work entries, most recent first.
    pub recency: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendWeights {
    pub exact: f64,
    pub fuzzy: f64,
    pub semantic: f64,
}

impl BlendWeights {
    pub fn blend(&self, exact: f64, fuzzy: f64, semantic: f64) -> f64 {
        self.exact * exact + self.fuzzy * fuzzy + self.semantic * semantic
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateWeights {
    pub skills: f64,
    pub experience_weighted: f64,
    pub critical: f64,
    pub exact: f64,
}

/// Semantic cutoffs keyed on the average character length of the two skills compared.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveThresholds {
    pub short_len: f64,
    pub short: f64,
    pub medium_len: f64,
    pub medium: f64,
    pub long: f64,
}

impl AdaptiveThresholds {
    pub fn for_average_len(&self, avg_len: f64) -> f64 {
        if avg_len < self.short_len {
            self.short
        } else if avg_len < self.medium_len {
            self.medium
        } else {
            self.long
        }
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            hybrid: BlendWeights {
                exact: 0.25,
                fuzzy: 0.20,
                semantic: 0.55,
            },
            priority: BlendWeights {
                exact: 0.40,
                fuzzy: 0.20,
                semantic: 0.40,
            },
            aggregate: AggregateWeights {
                skills: 0.40,
                experience_weighted: 0.25,
                critical: 0.20,
                exact: 0.15,
            },
            thresholds: AdaptiveThresholds {
                short_len: 15.0,
                short: 0.45,
                medium_len: 50.0,
                medium: 0.50,
                long: 0.55,
            },
            recency: vec![1.0, 0.75, 0.5, 0.35, 0.25, 0.2, 0.15, 0.1],
        }
    }
}

impl ScoringWeights {
    /// Weight for the work entry at `index`; positions past the table share its last value.
    pub fn recency_weight(&self, index: usize) -> f64 {
        self.recency
            .get(index)
            .or_else(|| self.recency.last())
            .copied()
            .unwrap_or(0.0)
    }
}
