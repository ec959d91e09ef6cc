//! Cosine similarity between embedding vectors.

use catalog::vector_norm;

/// Dot product of two equally sized vectors
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Cosine similarity of `a` and `b`, in [-1, 1].
///
/// Returns 0.0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    cosine_with_norms(a, vector_norm(a), b, vector_norm(b))
}

/// Cosine similarity with precomputed norms
#[inline]
pub fn cosine_with_norms(a: &[f32], norm_a: f32, b: &[f32], norm_b: f32) -> f32 {
    let denominator = norm_a * norm_b;
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    // Adding 0.0 folds -0.0 into 0.0 so equal scores sort as equal
    (dot(a, b) / denominator).clamp(-1.0, 1.0) + 0.0
}
