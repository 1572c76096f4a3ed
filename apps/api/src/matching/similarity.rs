//! Similarity Kernel — cosine similarity over embedding rows.
//!
//! `cosine_matrix` row-normalises both inputs (a zero-norm row keeps norm 1, so it
//! scores 0 against everything) and returns `A_norm · B_normᵀ`. Non-finite inputs
//! are read as 0 and the result never contains NaN or infinity.

use ndarray::{Array2, ArrayView1, Axis};

/// Cosine similarity of two vectors, clamped to [0, 1].
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    raw_cosine(a, b).clamp(0.0, 1.0)
}

/// Pairwise cosine similarity: `M[i, j] = cos(a[i], b[j])`.
///
/// Empty `a` or `b` yields a `max(1, n) × max(1, m)` zero matrix. Rows of unequal
/// width fall back to a pairwise scalar computation.
pub fn cosine_matrix<E: AsRef<[f32]>>(a: &[E], b: &[E]) -> Array2<f64> {
    if a.is_empty() || b.is_empty() {
        return Array2::zeros((a.len().max(1), b.len().max(1)));
    }

    match (to_normalized(a), to_normalized(b)) {
        (Some(a_norm), Some(b_norm)) if a_norm.ncols() == b_norm.ncols() => {
            let mut matrix = a_norm.dot(&b_norm.t());
            matrix.mapv_inplace(finite_or_zero);
            matrix
        }
        _ => Array2::from_shape_fn((a.len(), b.len()), |(i, j)| {
            raw_cosine(a[i].as_ref(), b[j].as_ref())
        }),
    }
}

/// Best score in column `j` and the row it came from. Ties keep the first row.
pub fn column_best(matrix: &Array2<f64>, j: usize) -> (f64, usize) {
    best_of(matrix.column(j))
}

/// Best score in row `i`, clamped to [0, 1].
pub fn row_max(matrix: &Array2<f64>, i: usize) -> f64 {
    best_of(matrix.row(i)).0.clamp(0.0, 1.0)
}

/// Mean over `columns` of each column's maximum, with maxima clamped to [0, 1].
/// An empty column set scores 0.
pub fn mean_column_max(matrix: &Array2<f64>, columns: &[usize]) -> f64 {
    if columns.is_empty() {
        return 0.0;
    }
    let total: f64 = columns
        .iter()
        .map(|&j| column_best(matrix, j).0.clamp(0.0, 1.0))
        .sum();
    total / columns.len() as f64
}

fn best_of(column: ArrayView1<'_, f64>) -> (f64, usize) {
    let mut best = (f64::NEG_INFINITY, 0);
    for (i, &value) in column.iter().enumerate() {
        if value > best.0 {
            best = (value, i);
        }
    }
    if best.0.is_finite() {
        best
    } else {
        (0.0, 0)
    }
}

/// Stacks rows into a matrix and L2-normalises each row. `None` when rows are ragged.
fn to_normalized<E: AsRef<[f32]>>(rows: &[E]) -> Option<Array2<f64>> {
    let dim = rows.first()?.as_ref().len();
    if rows.iter().any(|r| r.as_ref().len() != dim) {
        return None;
    }
    let flat: Vec<f64> = rows
        .iter()
        .flat_map(|r| r.as_ref().iter().map(|&v| finite_or_zero(f64::from(v))))
        .collect();
    let mut matrix = Array2::from_shape_vec((rows.len(), dim), flat).ok()?;

    for mut row in matrix.axis_iter_mut(Axis(0)) {
        let norm = row.dot(&row).sqrt();
        let norm = if norm > 0.0 && norm.is_finite() { norm } else { 1.0 };
        row.mapv_inplace(|v| v / norm);
    }
    Some(matrix)
}

fn raw_cosine(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (&x, &y) in a.iter().zip(b) {
        let x = finite_or_zero(f64::from(x));
        let y = finite_or_zero(f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    finite_or_zero(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Vec<f32>> {
        vec![
            vec![1.0, 0.0, 0.0],
            vec![1.0, 1.0, 0.0],
            vec![0.2, -0.5, 3.0],
        ]
    }

    #[test]
    fn test_self_similarity_has_unit_diagonal() {
        let a = rows();
        let m = cosine_matrix(&a, &a);
        for i in 0..a.len() {
            assert!((m[[i, i]] - 1.0).abs() < 1e-9, "diag {i} = {}", m[[i, i]]);
        }
    }

    #[test]
    fn test_matrix_is_transpose_symmetric() {
        let a = rows();
        let b = vec![vec![0.0, 1.0, 0.0], vec![3.0, 2.0, 1.0]];
        let ab = cosine_matrix(&a, &b);
        let ba = cosine_matrix(&b, &a);
        assert_eq!(ab.dim(), (3, 2));
        for i in 0..3 {
            for j in 0..2 {
                assert!((ab[[i, j]] - ba[[j, i]]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_empty_inputs_yield_padded_zero_matrix() {
        let empty: Vec<Vec<f32>> = Vec::new();
        let a = rows();
        assert_eq!(cosine_matrix(&empty, &a).dim(), (1, 3));
        assert_eq!(cosine_matrix(&a, &empty).dim(), (3, 1));
        let m = cosine_matrix(&empty, &empty);
        assert_eq!(m.dim(), (1, 1));
        assert_eq!(m[[0, 0]], 0.0);
    }

    #[test]
    fn test_zero_rows_score_zero_without_nan() {
        let a = vec![vec![0.0_f32; 3], vec![1.0, 2.0, 3.0]];
        let m = cosine_matrix(&a, &a);
        assert_eq!(m[[0, 0]], 0.0);
        assert_eq!(m[[0, 1]], 0.0);
        assert!(m.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_non_finite_inputs_produce_finite_output() {
        let a = vec![vec![f32::NAN, 1.0, 0.0], vec![f32::INFINITY, 0.0, 1.0]];
        let b = vec![vec![0.0, 1.0, 0.0]];
        let m = cosine_matrix(&a, &b);
        assert!(m.iter().all(|v| v.is_finite()));
        assert!((m[[0, 0]] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ragged_rows_fall_back_to_pairwise() {
        let a = vec![vec![1.0_f32, 0.0], vec![1.0, 0.0, 0.0]];
        let b = vec![vec![1.0_f32, 0.0, 0.0]];
        let m = cosine_matrix(&a, &b);
        assert_eq!(m.dim(), (2, 1));
        assert!((m[[1, 0]] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_scalar_cosine_is_clamped() {
        assert_eq!(cosine(&[1.0, 0.0], &[-1.0, 0.0]), 0.0);
        assert!((cosine(&[2.0, 0.0], &[5.0, 0.0]) - 1.0).abs() < 1e-12);
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_column_helpers() {
        let m = Array2::from_shape_vec((2, 3), vec![0.2, 0.9, -0.4, 0.7, 0.9, -0.1]).unwrap();
        assert_eq!(column_best(&m, 0), (0.7, 1));
        // ties keep the first row
        assert_eq!(column_best(&m, 1), (0.9, 0));
        // negative maxima clamp to zero: (0.7 + 0.9 + 0.0) / 3
        assert!((mean_column_max(&m, &[0, 1, 2]) - 1.6 / 3.0).abs() < 1e-12);
        assert_eq!(mean_column_max(&m, &[]), 0.0);
        assert_eq!(row_max(&m, 0), 0.9);
        assert_eq!(row_max(&m, 1), 0.9);
    }
}
