/// Keeps the denominator nonzero for degenerate all-zero vectors.
const NORM_EPSILON: f32 = 1e-10;

/// Cosine similarity over equal-length vectors. Total: mismatched lengths,
/// empty input and zero vectors all map to 0.0 rather than an error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (dot, na, nb) = a
        .iter()
        .zip(b.iter())
        .fold((0.0f32, 0.0f32, 0.0f32), |(d, aa, bb), (x, y)| {
            (d + x * y, aa + x * x, bb + y * y)
        });

    dot / (na.sqrt() * nb.sqrt() + NORM_EPSILON)
}
