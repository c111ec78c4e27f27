use crate::types::{Connection, GraphQlRequest, GraphQlResponse, PostData, PostsData, RawPost};
use chrono::{DateTime, SecondsFormat, Utc};
use radar_core::{CoreError, ProductHuntError};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const PRODUCTHUNT_GRAPHQL_URL: &str = "https://api.producthunt.com/v2/api/graphql";

const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

const POST_FIELDS: &str = r#"
    id
    name
    tagline
    description
    votesCount
    commentsCount
    slug
    website
    url
    createdAt
    topics(first: 10) { edges { node { name slug } } }
    thumbnail { url }
    media { url type videoUrl }
    makers { name username }
    productLinks { type url }
"#;

fn post_by_slug_query() -> String {
    format!(
        "query PostBySlug($slug: String!) {{ post(slug: $slug) {{ {} }} }}",
        POST_FIELDS
    )
}

fn posts_page_query() -> String {
    format!(
        "query PostsSince($after: DateTime!, $first: Int!, $cursor: String) {{ \
         posts(postedAfter: $after, first: $first, after: $cursor) {{ \
         edges {{ node {{ {} }} cursor }} \
         pageInfo {{ hasNextPage endCursor }} }} }}",
        POST_FIELDS
    )
}

/// Map a non-success HTTP status to the matching error, `None` for 2xx.
pub fn status_error(status: StatusCode, headers: &HeaderMap) -> Option<ProductHuntError> {
    if status.is_success() {
        return None;
    }

    let error = match status.as_u16() {
        401 => ProductHuntError::InvalidToken,
        403 => ProductHuntError::Forbidden,
        429 => ProductHuntError::RateLimitExceeded {
            retry_after: headers
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        code if status.is_server_error() => ProductHuntError::ServerError { status_code: code },
        code => ProductHuntError::UnexpectedStatus { status_code: code },
    };
    Some(error)
}

/// Unwrap a GraphQL envelope, turning an `errors` array into an error.
pub fn into_data<T>(response: GraphQlResponse<T>) -> Result<T, ProductHuntError> {
    if let Some(errors) = response.errors.filter(|errors| !errors.is_empty()) {
        let messages = errors
            .into_iter()
            .map(|e| e.message.unwrap_or_else(|| "Unknown error".to_string()))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ProductHuntError::GraphQl { messages });
    }

    response.data.ok_or_else(|| ProductHuntError::InvalidResponse {
        details: "response carried neither data nor errors".to_string(),
    })
}

pub struct ProductHuntApiClient {
    http_client: Client,
    token: String,
    endpoint: String,
}

impl std::fmt::Debug for ProductHuntApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductHuntApiClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl ProductHuntApiClient {
    pub fn new(token: impl Into<String>, timeout: Duration) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(concat!("fintech-radar/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            token: token.into(),
            endpoint: PRODUCTHUNT_GRAPHQL_URL.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn graphql<V, T>(&self, operation: &str, query: &str, variables: V) -> Result<T, CoreError>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        debug!("Making Product Hunt GraphQL request: {}", operation);

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&GraphQlRequest { query, variables })
            .send()
            .await
            .map_err(|e| {
                error!("Network error for {}: {}", operation, e);
                if e.is_timeout() {
                    CoreError::ProductHunt(ProductHuntError::RequestTimeout)
                } else {
                    CoreError::Network(e)
                }
            })?;

        if let Some(api_error) = status_error(response.status(), response.headers()) {
            error!(
                "Request failed with status: {} for {}",
                response.status(),
                operation
            );
            if let ProductHuntError::RateLimitExceeded { retry_after } = api_error {
                warn!("Rate limited, retry after {} seconds", retry_after);
            }
            return Err(api_error.into());
        }

        let envelope: GraphQlResponse<T> = response.json().await.map_err(|e| {
            error!("Failed to parse {} response: {}", operation, e);
            CoreError::ProductHunt(ProductHuntError::InvalidResponse {
                details: format!("Failed to parse {} response", operation),
            })
        })?;

        into_data(envelope).map_err(|e| {
            warn!("{} returned GraphQL errors: {}", operation, e);
            CoreError::ProductHunt(e)
        })
    }

    pub async fn post_by_slug(&self, slug: &str) -> Result<RawPost, CoreError> {
        let data: PostData = self
            .graphql("post_by_slug", &post_by_slug_query(), json!({ "slug": slug }))
            .await?;

        match data.post {
            Some(post) => {
                debug!("Retrieved post for slug: {}", slug);
                Ok(post)
            }
            None => Err(CoreError::ProductHunt(ProductHuntError::PostNotFound {
                slug: slug.to_string(),
            })),
        }
    }

    pub async fn posts_page(
        &self,
        posted_after: DateTime<Utc>,
        first: u32,
        cursor: Option<&str>,
    ) -> Result<Connection<RawPost>, CoreError> {
        let variables = json!({
            "after": posted_after.to_rfc3339_opts(SecondsFormat::Secs, true),
            "first": first,
            "cursor": cursor,
        });

        let data: PostsData = self
            .graphql("posts_page", &posts_page_query(), variables)
            .await?;
        let connection = data.posts.unwrap_or_default();

        info!(
            "Retrieved {} posts posted after {}",
            connection.edges.as_ref().map_or(0, Vec::len),
            posted_after
        );
        Ok(connection)
    }
}
