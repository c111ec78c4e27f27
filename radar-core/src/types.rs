use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lowercase `text` and strip diacritics, so "Pokémon" reads as "pokemon".
pub fn fold_text(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// A launch record flattened out of the source's nested response shape.
///
/// Every text field defaults to an empty string and every count to zero, so
/// downstream scoring never has to deal with missing data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: Option<String>,
    pub name: String,
    pub tagline: String,
    pub description: String,
    pub slug: Option<String>,
    pub topics: Vec<String>,
    pub votes_count: u64,
    pub comments_count: u64,
    pub created_at: Option<String>,
    pub website: Option<String>,
    pub url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub media: Vec<MediaItem>,
    pub makers: Vec<String>,
    pub product_links: Vec<ProductLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub video_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductLink {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

impl Candidate {
    /// The id if it is present and non-blank.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }

    /// Display name, falling back to the slug and then to a placeholder.
    pub fn display_name(&self) -> &str {
        if !self.name.trim().is_empty() {
            &self.name
        } else {
            self.slug.as_deref().unwrap_or("(untitled)")
        }
    }

    /// The single image to attach when delivering this candidate.
    ///
    /// Thumbnail wins; otherwise the first media entry that is an image (or
    /// carries no type at all) and has a URL.
    pub fn photo_url(&self) -> Option<&str> {
        if let Some(thumb) = non_blank(self.thumbnail_url.as_deref()) {
            return Some(thumb);
        }

        self.media
            .iter()
            .filter(|m| {
                m.kind
                    .as_deref()
                    .map_or(true, |kind| kind.eq_ignore_ascii_case("image"))
            })
            .find_map(|m| non_blank(m.url.as_deref()))
    }

    /// Folded `name tagline description`, the text the scorer searches.
    pub fn search_text(&self) -> String {
        fold_text(&format!("{} {} {}", self.name, self.tagline, self.description))
    }

    /// Folded topic labels.
    pub fn topic_set(&self) -> HashSet<String> {
        self.topics.iter().map(|t| fold_text(t)).collect()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Drop repeated ids from a single fetch, keeping the first occurrence.
///
/// Records without an id are kept as-is; they can never be posted, but they
/// still show up in debug output.
pub fn dedup_by_id(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| match c.id() {
            Some(id) => seen.insert(id.to_string()),
            None => true,
        })
        .collect()
}
