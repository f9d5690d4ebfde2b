#[cfg(test)]
mod tests;

use tracing::debug;

use super::Embedder;

pub const DEFAULT_EMBEDDING_DIMENSION: usize = 300;

/// Hashed bag-of-words embedder.
///
/// Every lowercased word is hashed into one of `dimension` buckets and the
/// bucket counts are L2-normalized. Bucket collisions are accepted in exchange
/// for a fixed vector size and no external model. Text without any words maps
/// to the zero vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl Default for HashingEmbedder {
    #[inline]
    fn default() -> Self {
        Self {
            dimension: DEFAULT_EMBEDDING_DIMENSION,
        }
    }
}

impl HashingEmbedder {
    /// Create an embedder producing vectors of `dimension` components.
    /// A zero dimension is bumped to one so bucket selection stays defined.
    #[inline]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn bucket(&self, token: &str) -> usize {
        let hash = i64::from(string_hash(token));
        // Dimension is at most a few thousand, so both casts are lossless
        (hash.abs() % self.dimension as i64) as usize
    }
}

impl Embedder for HashingEmbedder {
    #[inline]
    fn embed(&self, text: &str) -> Vec<f32> {
        let mut counts = vec![0.0_f64; self.dimension];
        let mut token_count = 0;

        for token in tokenize(text) {
            counts[self.bucket(&token)] += 1.0;
            token_count += 1;
        }

        let magnitude = counts.iter().map(|v| v * v).sum::<f64>().sqrt();

        debug!(
            "Embedded {} tokens into {} dimensions",
            token_count, self.dimension
        );

        if magnitude > 0.0 {
            counts.iter().map(|v| (v / magnitude) as f32).collect()
        } else {
            vec![0.0; self.dimension]
        }
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    fn name(&self) -> &str {
        "feature-hashing"
    }
}

/// Lowercase `text` and split it into runs of alphanumerics and underscores
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// 32-bit polynomial string hash (`h * 31 + unit`) over UTF-16 code units
pub(crate) fn string_hash(token: &str) -> i32 {
    token.encode_utf16().fold(0_i32, |hash, unit| {
        hash.wrapping_mul(31).wrapping_add(i32::from(unit))
    })
}

/// Cosine similarity between two vectors.
///
/// Returns exactly `0.0` when either vector has zero magnitude. Vectors of
/// different lengths are compared over their common prefix.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (dot, norm_a, norm_b) = a.iter().zip(b.iter()).fold(
        (0.0_f64, 0.0_f64, 0.0_f64),
        |(dot, norm_a, norm_b), (&x, &y)| {
            let (x, y) = (f64::from(x), f64::from(y));
            (
                x.mul_add(y, dot),
                x.mul_add(x, norm_a),
                y.mul_add(y, norm_b),
            )
        },
    );

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}
