//! Relevance score: a fixed weight per distinct boost keyword present.
//!
//! Repeated occurrences of one keyword count once. The score only ranks; it never
//! filters.

/// `combined_lower` is the lowercased `title + "\n" + body`.
pub fn relevance_score(combined_lower: &str, boost: &[String], weight: u32) -> u32 {
    let hits = boost
        .iter()
        .filter(|k| !k.is_empty() && combined_lower.contains(k.as_str()))
        .count() as u32;
    hits.saturating_mul(weight)
}
