//! Cosine similarity over encoder outputs.

use ndarray::{Array1, ArrayView1};

/// Cosine similarity in [-1, 1]. Mismatched lengths and zero vectors score 0.
pub fn cosine_similarity(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();
    if norm_a < 1e-12 || norm_b < 1e-12 {
        return 0.0;
    }
    (a.dot(&b) / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Cosine distance (`1 - similarity`), the score RediSearch reports for
/// `DISTANCE_METRIC COSINE`.
pub fn cosine_distance(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Scale a vector to unit length in place; zero vectors are left alone.
pub fn l2_normalize(v: &mut Array1<f32>) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-12 {
        v.mapv_inplace(|x| x / norm);
    }
}

/// Round to three decimal places.
pub fn round3(x: f32) -> f64 {
    (f64::from(x) * 1000.0).round() / 1000.0
}
