use crate::types::{Connection, RawPost};
use radar_core::{Candidate, MediaItem, ProductLink};

impl From<RawPost> for Candidate {
    fn from(post: RawPost) -> Self {
        Self {
            id: post.id,
            name: post.name.unwrap_or_default(),
            tagline: post.tagline.unwrap_or_default(),
            description: post.description.unwrap_or_default(),
            slug: post.slug,
            topics: post.topics.map(topic_names).unwrap_or_default(),
            votes_count: non_negative(post.votes_count),
            comments_count: non_negative(post.comments_count),
            created_at: post.created_at,
            website: post.website,
            url: post.url,
            thumbnail_url: post.thumbnail.and_then(|t| t.url),
            media: post
                .media
                .unwrap_or_default()
                .into_iter()
                .flatten()
                .map(|m| MediaItem {
                    url: m.url,
                    kind: m.kind,
                    video_url: m.video_url,
                })
                .collect(),
            makers: post
                .makers
                .unwrap_or_default()
                .into_iter()
                .flatten()
                .filter_map(|m| m.name)
                .filter(|name| !name.trim().is_empty())
                .collect(),
            product_links: post
                .product_links
                .unwrap_or_default()
                .into_iter()
                .flatten()
                .filter_map(|link| match (link.kind, link.url) {
                    (kind, Some(url)) if !url.trim().is_empty() => Some(ProductLink {
                        kind: kind.unwrap_or_else(|| "Link".to_string()),
                        url,
                    }),
                    _ => None,
                })
                .collect(),
        }
    }
}

/// Flatten a post connection's nodes, in source order.
pub fn normalize_posts(connection: Connection<RawPost>) -> Vec<Candidate> {
    connection
        .edges
        .unwrap_or_default()
        .into_iter()
        .filter_map(|edge| edge.node)
        .map(Candidate::from)
        .collect()
}

fn topic_names(connection: Connection<crate::types::RawTopic>) -> Vec<String> {
    connection
        .edges
        .unwrap_or_default()
        .into_iter()
        .filter_map(|edge| edge.node.and_then(|topic| topic.name))
        .filter(|name| !name.trim().is_empty())
        .collect()
}

fn non_negative(count: Option<i64>) -> u64 {
    count.unwrap_or(0).max(0) as u64
}
