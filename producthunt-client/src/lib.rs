pub mod api;
pub mod normalize;
pub mod retry;
pub mod types;

pub use api::ProductHuntApiClient;
pub use normalize::normalize_posts;
pub use retry::{classify, BreakerState, RetryExecutor, RetryPolicy, RetryStats, Verdict};

use chrono::{DateTime, Utc};
use radar_core::{Candidate, CoreError, ErrorExt, HttpConfig, ProductHuntError};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};
use types::{Connection, RawPost};

/// Where candidates come from.
///
/// Implementations never fail the caller: transport and auth problems are
/// logged and surface as an empty (or partial) result.
// Futures are awaited on the caller's task; no `Send` bound.
#[allow(async_fn_in_trait)]
pub trait CandidateSource {
    /// Launches posted after `since`, at most `max_count`, in source order.
    async fn fetch_since(&self, since: DateTime<Utc>, max_count: usize) -> Vec<Candidate>;

    async fn fetch_by_slug(&self, slug: &str) -> Option<Candidate>;
}

pub struct ProductHuntClient {
    api: ProductHuntApiClient,
    retry: RetryExecutor,
    page_size: u32,
}

impl ProductHuntClient {
    pub fn new(token: &str, http: &HttpConfig) -> Result<Self, CoreError> {
        let api = ProductHuntApiClient::new(token, Duration::from_secs(http.timeout_secs))?;
        Ok(Self::from_parts(api, RetryExecutor::new(RetryPolicy::producthunt()), http.page_size))
    }

    pub fn from_parts(api: ProductHuntApiClient, retry: RetryExecutor, page_size: u32) -> Self {
        Self {
            api,
            retry,
            page_size: page_size.max(1),
        }
    }
}

impl CandidateSource for ProductHuntClient {
    async fn fetch_since(&self, since: DateTime<Utc>, max_count: usize) -> Vec<Candidate> {
        paginate(max_count, self.page_size, move |first, cursor| async move {
            self.retry
                .execute("posts_page", || {
                    self.api.posts_page(since, first, cursor.as_deref())
                })
                .await
        })
        .await
    }

    async fn fetch_by_slug(&self, slug: &str) -> Option<Candidate> {
        match self
            .retry
            .execute("post_by_slug", || self.api.post_by_slug(slug))
            .await
        {
            Ok(post) => Some(Candidate::from(post)),
            Err(CoreError::ProductHunt(ProductHuntError::PostNotFound { slug })) => {
                info!("No Product Hunt launch found for slug '{}'", slug);
                None
            }
            Err(e) => {
                e.log_warn();
                None
            }
        }
    }
}

/// Accumulate pages until `limit` records, the last page, an empty page or
/// a missing cursor. A failing page ends the walk with what was collected.
pub async fn paginate<F, Fut>(limit: usize, page_size: u32, mut fetch_page: F) -> Vec<Candidate>
where
    F: FnMut(u32, Option<String>) -> Fut,
    Fut: Future<Output = Result<Connection<RawPost>, CoreError>>,
{
    let mut collected = Vec::new();
    let mut cursor: Option<String> = None;

    while collected.len() < limit {
        let remaining = limit - collected.len();
        let first = page_size.min(u32::try_from(remaining).unwrap_or(u32::MAX));

        let page = match fetch_page(first, cursor.take()).await {
            Ok(page) => page,
            Err(e) => {
                e.log_warn();
                break;
            }
        };

        let page_info = page.page_info.clone().unwrap_or_default();
        let batch = normalize_posts(page);
        debug!(
            "Fetched page of {} posts ({} collected so far)",
            batch.len(),
            collected.len()
        );
        if batch.is_empty() {
            break;
        }
        collected.extend(batch);

        if !page_info.has_next_page.unwrap_or(false) {
            break;
        }
        match page_info.end_cursor.filter(|c| !c.is_empty()) {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    collected.truncate(limit);
    info!(count = collected.len(), "Collected candidates from Product Hunt");
    collected
}

/// Turn free text into a Product Hunt slug: lowercase ASCII alphanumerics
/// joined by single hyphens.
pub fn slugify(query: &str) -> String {
    let mut slug = String::with_capacity(query.len());
    for ch in query.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests;
