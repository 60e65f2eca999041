// src/notify/render.rs
//! Fixed-format Telegram message (HTML parse mode).

use chrono::FixedOffset;
use html_escape::encode_text;

use crate::ingest::types::Item;

/// Title, source and keyword are escaped here. The snippet arrives already
/// escaped (with `<b>` emphasis) and the link is passed through raw.
pub fn render_message(item: &Item, offset: FixedOffset) -> String {
    let when = item
        .published_at
        .map(|p| p.with_timezone(&offset).format("%d/%m %H:%M").to_string());

    let mut meta = encode_text(&item.source_name).to_string();
    if let Some(w) = when {
        meta.push_str(" • ");
        meta.push_str(&w);
    }

    let mut out = format!("📰 <b>{}</b>\n🏷 <i>{}</i>\n", encode_text(&item.title), meta);
    if !item.matched_keyword.is_empty() {
        out.push_str(&format!(
            "🔎 <b>Gatilho:</b> <code>{}</code>\n",
            encode_text(&item.matched_keyword)
        ));
    }
    if !item.context_snippet.is_empty() {
        out.push_str(&format!("🧾 <i>{}</i>\n", item.context_snippet));
    }
    out.push_str(&format!("🔗 {}", item.link));
    out
}
