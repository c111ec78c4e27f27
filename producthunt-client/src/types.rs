//! Wire shapes of the Product Hunt GraphQL v2 API.
//!
//! Every field is optional: the API omits fields that were not selected and
//! returns `null` for empty ones, and both must deserialize cleanly.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphQlRequest<'a, V: Serialize> {
    pub query: &'a str,
    pub variables: V,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct Connection<T> {
    pub edges: Option<Vec<Edge<T>>>,
    pub page_info: Option<PageInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Edge<T> {
    pub node: Option<T>,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: Option<bool>,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawPost {
    pub id: Option<String>,
    pub name: Option<String>,
    pub tagline: Option<String>,
    pub description: Option<String>,
    pub votes_count: Option<i64>,
    pub comments_count: Option<i64>,
    pub slug: Option<String>,
    pub website: Option<String>,
    pub url: Option<String>,
    pub created_at: Option<String>,
    pub topics: Option<Connection<RawTopic>>,
    pub thumbnail: Option<RawThumbnail>,
    pub media: Option<Vec<Option<RawMedia>>>,
    pub makers: Option<Vec<Option<RawMaker>>>,
    pub product_links: Option<Vec<Option<RawProductLink>>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTopic {
    pub name: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawThumbnail {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawMedia {
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub video_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawMaker {
    pub name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawProductLink {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PostData {
    pub post: Option<RawPost>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PostsData {
    pub posts: Option<Connection<RawPost>>,
}
