// src/analyze/context.rs
//! Snippet extraction around the triggering keyword.
//!
//! Works on `char`s so a window never splits a UTF-8 code point. Case folding is
//! one char → one char, which keeps match offsets aligned with the original text.

use html_escape::encode_text;

use crate::config::ContextConfig;

pub const TRUNCATION_MARKER: &str = "…";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextMatch {
    /// The must-have keyword that triggered (first in declared order).
    pub keyword: String,
    /// HTML-safe snippet with the keyword wrapped in `<b>`.
    pub snippet: String,
    /// The same window as plain text.
    pub window: String,
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn find_chars(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Locate the first must-have keyword in `body` (declared order wins) and cut a
/// window of `cfg.radius` chars on each side, capped at `cfg.max_len`. Falls back
/// to the title, returning `cfg.title_fallback` as snippet. `None` when nothing matches.
pub fn extract_context(
    body: &str,
    title: &str,
    must_have: &[String],
    cfg: &ContextConfig,
) -> Option<ContextMatch> {
    let chars: Vec<char> = body.chars().collect();
    let folded: Vec<char> = chars.iter().copied().map(fold).collect();

    for kw in must_have {
        let needle: Vec<char> = kw.chars().map(fold).collect();
        let Some(idx) = find_chars(&folded, &needle) else {
            continue;
        };

        let start = idx.saturating_sub(cfg.radius);
        let end = (idx + needle.len() + cfg.radius).min(chars.len());
        let truncated = end - start > cfg.max_len;
        let win_end = if truncated { start + cfg.max_len } else { end };

        let hit_start = idx.min(win_end);
        let hit_end = (idx + needle.len()).min(win_end);

        let before: String = chars[start..hit_start].iter().collect();
        let hit: String = chars[hit_start..hit_end].iter().collect();
        let after: String = chars[hit_end..win_end].iter().collect();

        let mut snippet = String::with_capacity(cfg.max_len + 16);
        snippet.push_str(&encode_text(&before));
        if !hit.is_empty() {
            snippet.push_str("<b>");
            snippet.push_str(&encode_text(&hit));
            snippet.push_str("</b>");
        }
        snippet.push_str(&encode_text(&after));

        let mut window = format!("{before}{hit}{after}");
        if truncated {
            snippet.push_str(TRUNCATION_MARKER);
            window.push_str(TRUNCATION_MARKER);
        }

        return Some(ContextMatch {
            keyword: kw.clone(),
            snippet,
            window,
        });
    }

    let title_folded: String = title.chars().map(fold).collect();
    must_have
        .iter()
        .find(|kw| {
            let k: String = kw.chars().map(fold).collect();
            !k.is_empty() && title_folded.contains(&k)
        })
        .map(|kw| ContextMatch {
            keyword: kw.clone(),
            snippet: encode_text(&cfg.title_fallback).to_string(),
            window: cfg.title_fallback.clone(),
        })
}

/// Snippet for unfiltered sources: the head of the body, escaped and capped.
pub fn lead_snippet(body: &str, max_len: usize) -> String {
    let count = body.chars().count();
    if count <= max_len {
        return encode_text(body).to_string();
    }
    let head: String = body.chars().take(max_len).collect();
    format!("{}{}", encode_text(&head), TRUNCATION_MARKER)
}
