#[cfg(test)]
mod tests {
    use crate::types::{Connection, Edge, PageInfo, RawPost};
    use crate::{paginate, slugify, ProductHuntClient};
    use radar_core::{CoreError, HttpConfig, ProductHuntError};
    use std::sync::{Arc, Mutex};

    fn raw(id: usize) -> RawPost {
        RawPost {
            id: Some(id.to_string()),
            name: Some(format!("Launch {}", id)),
            ..Default::default()
        }
    }

    fn page(ids: std::ops::Range<usize>, next: Option<&str>) -> Connection<RawPost> {
        Connection {
            edges: Some(
                ids.map(|id| Edge {
                    node: Some(raw(id)),
                    cursor: Some(format!("c{}", id)),
                })
                .collect(),
            ),
            page_info: Some(PageInfo {
                has_next_page: Some(next.is_some()),
                end_cursor: next.map(String::from),
            }),
        }
    }

    fn ids(candidates: &[radar_core::Candidate]) -> Vec<String> {
        candidates.iter().filter_map(|c| c.id.clone()).collect()
    }

    #[tokio::test]
    async fn test_pagination_follows_cursor_until_last_page() {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();

        let collected = paginate(60, 2, move |first, cursor| {
            seen.lock().unwrap().push((first, cursor.clone()));
            let result = match cursor.as_deref() {
                None => Ok(page(0..2, Some("p1"))),
                Some("p1") => Ok(page(2..4, Some("p2"))),
                _ => Ok(page(4..5, None)),
            };
            async move { result }
        })
        .await;

        assert_eq!(ids(&collected), vec!["0", "1", "2", "3", "4"]);
        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0], (2, None));
        assert_eq!(requests[1], (2, Some("p1".to_string())));
    }

    #[tokio::test]
    async fn test_pagination_stops_at_limit() {
        let collected = paginate(5, 20, |first, _cursor| async move {
            assert_eq!(first, 5);
            Ok(page(0..8, Some("more")))
        })
        .await;

        assert_eq!(collected.len(), 5);
    }

    #[tokio::test]
    async fn test_pagination_last_page_is_sized_to_remainder() {
        let sizes = Arc::new(Mutex::new(Vec::new()));
        let seen = sizes.clone();

        let collected = paginate(5, 2, move |first, _cursor| {
            seen.lock().unwrap().push(first);
            async move { Ok(page(0..first as usize, Some("next"))) }
        })
        .await;

        assert_eq!(collected.len(), 5);
        assert_eq!(*sizes.lock().unwrap(), vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_pagination_error_keeps_collected_pages() {
        let collected = paginate(60, 2, |_first, cursor| async move {
            match cursor {
                None => Ok(page(0..2, Some("p1"))),
                Some(_) => Err(CoreError::ProductHunt(ProductHuntError::ServerError {
                    status_code: 502,
                })),
            }
        })
        .await;

        assert_eq!(ids(&collected), vec!["0", "1"]);
    }

    #[tokio::test]
    async fn test_pagination_auth_failure_degrades_to_empty() {
        let collected = paginate(60, 20, |_first, _cursor| async {
            Err(CoreError::ProductHunt(ProductHuntError::InvalidToken))
        })
        .await;

        assert!(collected.is_empty());
    }

    #[tokio::test]
    async fn test_pagination_stops_without_end_cursor() {
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();

        let collected = paginate(60, 2, move |_first, _cursor| {
            *counter.lock().unwrap() += 1;
            async {
                let mut p = page(0..2, None);
                p.page_info = Some(PageInfo {
                    has_next_page: Some(true),
                    end_cursor: None,
                });
                Ok(p)
            }
        })
        .await;

        assert_eq!(collected.len(), 2);
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_pagination_stops_on_empty_page() {
        let collected = paginate(60, 20, |_first, _cursor| async {
            Ok(Connection {
                edges: Some(Vec::new()),
                page_info: Some(PageInfo {
                    has_next_page: Some(true),
                    end_cursor: Some("loop".to_string()),
                }),
            })
        })
        .await;

        assert!(collected.is_empty());
    }

    #[test]
    fn test_zero_limit_makes_no_requests() {
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();

        let collected = tokio_test::block_on(paginate(0, 20, move |_first, _cursor| {
            *counter.lock().unwrap() += 1;
            async { Ok(Connection::default()) }
        }));

        assert!(collected.is_empty());
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Gusto"), "gusto");
        assert_eq!(slugify("  Ramp Bill Pay! "), "ramp-bill-pay");
        assert_eq!(slugify("mercury--treasury"), "mercury-treasury");
        assert_eq!(slugify("???"), "");
    }

    #[test]
    fn test_client_creation() {
        let http = HttpConfig {
            timeout_secs: 30,
            page_size: 0,
        };
        let client = ProductHuntClient::new("token", &http);
        assert!(client.is_ok());
        assert_eq!(client.unwrap().page_size, 1);
    }
}
