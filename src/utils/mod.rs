// Shared numeric helpers for feature extraction and scoring.

/// Min-max normalize a value into [0, 1] against a per-request range.
/// Degenerate ranges map everything to 0.5 so a uniform pool stays neutral.
pub fn normalize_score(value: f32, min: f32, max: f32) -> f32 {
    if max - min < f32::EPSILON {
        0.5
    } else {
        ((value - min) / (max - min)).clamp(0.0, 1.0)
    }
}

/// Linear recency decay: 1.0 at age zero, 0.0 at and beyond the horizon.
pub fn linear_decay(age_secs: f32, horizon_secs: f32) -> f32 {
    if horizon_secs <= 0.0 {
        return 0.0;
    }
    (1.0 - age_secs / horizon_secs).clamp(0.0, 1.0)
}

/// Cosine similarity between two dense vectors. Returns 0.0 when either side
/// is empty, when dimensions disagree, or when either norm vanishes.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// Jaccard-style overlap between two label sets, 0.0 when either is empty.
pub fn set_overlap(a: &[String], b: &[String]) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let matches = b.iter().filter(|label| a.contains(label)).count();
    let denom = a.len().max(b.len()) as f32;
    (matches as f32 / denom).clamp(0.0, 1.0)
}

/// FNV-1a over a byte string. Used for sticky variant selection so the same
/// viewer keeps hitting the same config without any coordination.
pub fn fnv1a_hash(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}
