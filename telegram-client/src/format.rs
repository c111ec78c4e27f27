use crate::{Button, OutboundMessage};
use radar_core::Candidate;
use std::collections::HashSet;
use url::Url;

pub const CAPTION_LIMIT: usize = 1024;
pub const MESSAGE_LIMIT: usize = 4096;
pub const DESCRIPTION_LIMIT: usize = 300;
pub const MAX_BUTTONS: usize = 4;

const PRODUCT_HUNT_POST_URL: &str = "https://www.producthunt.com/posts/";

/// Escape the characters Telegram's HTML parse mode treats as markup.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Cut `text` to at most `max` characters, ending with an ellipsis when cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut cut: String = text.chars().take(max - 1).collect();
    cut.truncate(cut.trim_end().len());
    cut.push('…');
    cut
}

/// Cut Telegram HTML to at most `max` characters without splitting a tag or
/// an entity. Tags left open by the cut are closed after the ellipsis.
pub fn truncate_html(html: &str, max: usize) -> String {
    if html.chars().count() <= max {
        return html.to_string();
    }

    let mut out = String::new();
    let mut used = 0;
    let mut open: Vec<String> = Vec::new();
    let mut rest = html;

    while let Some(first) = rest.chars().next() {
        let token_len = match first {
            '<' => rest.find('>').map_or(rest.len(), |end| end + 1),
            '&' => match rest.find(';') {
                Some(end) if end <= 10 => end + 1,
                _ => first.len_utf8(),
            },
            _ => first.len_utf8(),
        };
        let token = &rest[..token_len];

        let mut after = open.clone();
        if let Some(name) = token.strip_prefix("</") {
            let name = name.trim_end_matches('>').trim();
            if let Some(pos) = after.iter().rposition(|t| t == name) {
                after.remove(pos);
            }
        } else if first == '<' {
            let name: String = token[1..]
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric())
                .collect();
            if !name.is_empty() && !token.ends_with("/>") {
                after.push(name);
            }
        }

        let closing: usize = after.iter().map(|t| t.chars().count() + 3).sum();
        let token_chars = token.chars().count();
        if used + token_chars + 1 + closing > max {
            break;
        }

        out.push_str(token);
        used += token_chars;
        open = after;
        rest = &rest[token_len..];
    }

    out.truncate(out.trim_end().len());
    out.push('…');
    for tag in open.iter().rev() {
        out.push_str(&format!("</{}>", tag));
    }
    out
}

/// HTML body for a launch: name, tagline, description, topics, engagement
/// and makers. Empty parts are left out.
pub fn format_candidate(candidate: &Candidate) -> String {
    let mut lines = vec![format!("<b>{}</b>", escape_html(candidate.display_name()))];

    let tagline = candidate.tagline.trim();
    if !tagline.is_empty() {
        lines.push(format!("<i>{}</i>", escape_html(tagline)));
    }

    let description = candidate.description.trim();
    if !description.is_empty() {
        lines.push(String::new());
        lines.push(escape_html(&truncate_chars(description, DESCRIPTION_LIMIT)));
    }

    lines.push(String::new());

    let mut seen = HashSet::new();
    let topics: Vec<String> = candidate
        .topics
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
        .map(escape_html)
        .collect();
    if !topics.is_empty() {
        lines.push(format!("🏷 {}", topics.join(", ")));
    }

    lines.push(format!(
        "▲ {} upvotes · 💬 {} comments",
        candidate.votes_count, candidate.comments_count
    ));

    if !candidate.makers.is_empty() {
        let makers: Vec<String> = candidate.makers.iter().map(|m| escape_html(m)).collect();
        lines.push(format!("👥 Makers: {}", makers.join(", ")));
    }

    lines.join("\n")
}

fn is_http_url(raw: &str) -> bool {
    Url::parse(raw.trim())
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
        .unwrap_or(false)
}

/// Link buttons: the Product Hunt page, the website when it differs, then
/// the launch's product links. Invalid and repeated URLs are dropped.
pub fn build_buttons(candidate: &Candidate) -> Vec<Button> {
    let product_hunt = candidate
        .url
        .clone()
        .filter(|u| !u.trim().is_empty())
        .or_else(|| {
            candidate
                .slug
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(|slug| format!("{}{}", PRODUCT_HUNT_POST_URL, slug.trim()))
        });

    let mut proposed: Vec<(String, String)> = Vec::new();
    if let Some(url) = product_hunt {
        proposed.push(("🔗 Product Hunt".to_string(), url));
    }
    if let Some(website) = candidate.website.as_deref() {
        proposed.push(("🌐 Website".to_string(), website.to_string()));
    }
    for link in &candidate.product_links {
        let label = if link.kind.trim().is_empty() {
            "Link".to_string()
        } else {
            link.kind.trim().to_string()
        };
        proposed.push((label, link.url.clone()));
    }

    let mut seen = HashSet::new();
    proposed
        .into_iter()
        .map(|(label, url)| (label, url.trim().to_string()))
        .filter(|(_, url)| is_http_url(url))
        .filter(|(_, url)| seen.insert(url.trim_end_matches('/').to_lowercase()))
        .take(MAX_BUTTONS)
        .map(|(label, url)| Button { label, url })
        .collect()
}

/// Everything needed to deliver one launch.
pub fn outbound_for(candidate: &Candidate) -> OutboundMessage {
    OutboundMessage {
        text: format_candidate(candidate),
        photo_url: candidate.photo_url().map(str::to_string),
        buttons: build_buttons(candidate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radar_core::ProductLink;

    fn ledgerly() -> Candidate {
        Candidate {
            id: Some("421337".to_string()),
            name: "Ledgerly".to_string(),
            tagline: "Invoicing for <small> business & freelancers".to_string(),
            description: "Send invoices, chase payments.".to_string(),
            slug: Some("ledgerly".to_string()),
            topics: vec![
                "Invoicing tools".to_string(),
                "SaaS".to_string(),
                "saas".to_string(),
            ],
            votes_count: 212,
            comments_count: 18,
            website: Some("https://ledgerly.example".to_string()),
            url: Some("https://www.producthunt.com/posts/ledgerly".to_string()),
            makers: vec!["Ada".to_string()],
            product_links: vec![
                ProductLink {
                    kind: "Website".to_string(),
                    url: "https://ledgerly.example/".to_string(),
                },
                ProductLink {
                    kind: "App Store".to_string(),
                    url: "https://apps.apple.com/app/ledgerly".to_string(),
                },
                ProductLink {
                    kind: "Broken".to_string(),
                    url: "not a url".to_string(),
                },
                ProductLink {
                    kind: "Play Store".to_string(),
                    url: "https://play.google.com/store/apps/ledgerly".to_string(),
                },
                ProductLink {
                    kind: "GitHub".to_string(),
                    url: "https://github.com/ledgerly".to_string(),
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_message_layout_and_escaping() {
        let text = format_candidate(&ledgerly());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "<b>Ledgerly</b>");
        assert_eq!(
            lines[1],
            "<i>Invoicing for &lt;small&gt; business &amp; freelancers</i>"
        );
        assert!(text.contains("🏷 Invoicing tools, SaaS\n"));
        assert!(text.contains("▲ 212 upvotes · 💬 18 comments"));
        assert!(text.ends_with("👥 Makers: Ada"));
    }

    #[test]
    fn test_long_description_is_truncated() {
        let candidate = Candidate {
            name: "Verbose".to_string(),
            description: "x".repeat(1000),
            ..Default::default()
        };
        let text = format_candidate(&candidate);
        let body = text.lines().nth(2).unwrap();
        assert_eq!(body.chars().count(), DESCRIPTION_LIMIT);
        assert!(body.ends_with('…'));
    }

    #[test]
    fn test_truncate_keeps_short_text() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdef", 4), "abc…");
        assert_eq!(truncate_chars("ééééé", 3), "éé…");
    }

    #[test]
    fn test_buttons_dedup_validate_and_cap() {
        let buttons = build_buttons(&ledgerly());
        let labels: Vec<&str> = buttons.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["🔗 Product Hunt", "🌐 Website", "App Store", "Play Store"]
        );
    }

    #[test]
    fn test_product_hunt_button_falls_back_to_slug() {
        let candidate = Candidate {
            slug: Some("ledgerly".to_string()),
            ..Default::default()
        };
        let buttons = build_buttons(&candidate);
        assert_eq!(buttons.len(), 1);
        assert_eq!(buttons[0].url, "https://www.producthunt.com/posts/ledgerly");
    }

    #[test]
    fn test_website_equal_to_post_url_is_not_repeated() {
        let candidate = Candidate {
            url: Some("https://ledgerly.example".to_string()),
            website: Some("https://ledgerly.example/".to_string()),
            ..Default::default()
        };
        assert_eq!(build_buttons(&candidate).len(), 1);
    }

    #[test]
    fn test_outbound_carries_photo() {
        let mut candidate = ledgerly();
        candidate.thumbnail_url = Some("https://ph-files.example/thumb.png".to_string());
        let message = outbound_for(&candidate);
        assert_eq!(
            message.photo_url.as_deref(),
            Some("https://ph-files.example/thumb.png")
        );
        assert_eq!(message.buttons.len(), MAX_BUTTONS);
    }
}
