#[cfg(test)]
mod tests {
    use crate::{Pipeline, RotateStrategy, RunMode, RunOptions, StatePaths};
    use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
    use producthunt_client::CandidateSource;
    use radar_core::{Candidate, CoreError, StateError, TelegramError};
    use state_store::PostedStore;
    use std::env;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use telegram_client::{MessageChannel, OutboundMessage};

    #[derive(Default)]
    struct FakeSource {
        launches: Vec<Candidate>,
        windows: Mutex<Vec<(DateTime<Utc>, usize)>>,
        slugs: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn with(launches: Vec<Candidate>) -> Self {
            Self {
                launches,
                ..Default::default()
            }
        }
    }

    impl CandidateSource for FakeSource {
        async fn fetch_since(&self, since: DateTime<Utc>, max_count: usize) -> Vec<Candidate> {
            self.windows.lock().unwrap().push((since, max_count));
            self.launches.iter().take(max_count).cloned().collect()
        }

        async fn fetch_by_slug(&self, slug: &str) -> Option<Candidate> {
            self.slugs.lock().unwrap().push(slug.to_string());
            self.launches
                .iter()
                .find(|c| c.slug.as_deref() == Some(slug))
                .cloned()
        }
    }

    #[derive(Default)]
    struct FakeChannel {
        delivered: Mutex<Vec<OutboundMessage>>,
        /// Deliveries whose text contains this fail.
        reject: Option<&'static str>,
    }

    impl FakeChannel {
        fn rejecting(marker: &'static str) -> Self {
            Self {
                reject: Some(marker),
                ..Default::default()
            }
        }

        fn delivered_names(&self) -> Vec<String> {
            self.delivered
                .lock()
                .unwrap()
                .iter()
                .map(|m| m.text.lines().next().unwrap_or_default().to_string())
                .collect()
        }
    }

    impl MessageChannel for FakeChannel {
        async fn deliver(&self, message: &OutboundMessage) -> Result<(), CoreError> {
            if let Some(marker) = self.reject {
                if message.text.contains(marker) {
                    return Err(CoreError::Telegram(TelegramError::Api {
                        code: 400,
                        description: "Bad Request: message is too long".to_string(),
                    }));
                }
            }
            self.delivered.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    fn temp_state_dir() -> PathBuf {
        env::temp_dir().join(format!("test_radar_pipeline_{}", uuid::Uuid::new_v4()))
    }

    fn launch(id: &str, name: &str, tagline: &str, votes: u64, topics: &[&str]) -> Candidate {
        Candidate {
            id: Some(id.to_string()),
            name: name.to_string(),
            tagline: tagline.to_string(),
            slug: Some(name.to_lowercase().replace(' ', "-")),
            votes_count: votes,
            topics: topics.iter().map(|t| t.to_string()).collect(),
            created_at: Some(now().to_rfc3339_opts(SecondsFormat::Secs, true)),
            url: Some(format!("https://www.producthunt.com/posts/{}", id)),
            ..Default::default()
        }
    }

    fn acme() -> Candidate {
        Candidate {
            comments_count: 5,
            ..launch("1", "Acme Payroll", "Payroll for small business", 50, &["Payroll software"])
        }
    }

    fn ledgerly() -> Candidate {
        launch(
            "2",
            "Ledgerly",
            "Fintech invoicing for small business",
            10,
            &["Invoicing tools", "SaaS"],
        )
    }

    fn noise() -> Candidate {
        launch("3", "Catlist", "A to-do list for your cat", 5000, &["Productivity"])
    }

    fn cards() -> Candidate {
        launch("4", "Cardvault", "Pokemon cards for b2b payments", 900, &["Gaming"])
    }

    fn launches() -> Vec<Candidate> {
        vec![acme(), noise(), ledgerly(), cards()]
    }

    fn pipeline(
        dir: &Path,
        launches: Vec<Candidate>,
        channel: Option<FakeChannel>,
    ) -> Pipeline<FakeSource, FakeChannel> {
        Pipeline::new(FakeSource::with(launches), channel, StatePaths::in_dir(dir))
    }

    fn live() -> RunOptions {
        RunOptions::default()
    }

    fn dry() -> RunOptions {
        RunOptions {
            dry_run: true,
            ..Default::default()
        }
    }

    fn rotate() -> RunMode {
        RunMode::Rotate {
            strategy: RotateStrategy::RoundRobin,
        }
    }

    #[tokio::test]
    async fn test_discover_sends_ranked_and_records() {
        let dir = temp_state_dir();
        let pipeline = pipeline(&dir, launches(), Some(FakeChannel::default()));

        let report = pipeline.run_at(&RunMode::Discover, &live(), now()).await.unwrap();

        assert_eq!(report.fetched, 4);
        assert_eq!(report.eligible, 2);
        assert_eq!(report.sent, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(report.exit_code(), 0);

        let ids: Vec<_> = report.selected.iter().map(|s| s.id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["2", "1"]);
        assert!((report.selected[1].score.unwrap() - 32.4).abs() < 1e-9);

        let channel = pipeline.channel().unwrap();
        assert_eq!(
            channel.delivered_names(),
            vec!["<b>Ledgerly</b>", "<b>Acme Payroll</b>"]
        );

        let store = PostedStore::load(&pipeline.state_paths().posted_ids);
        assert_eq!(store.ids(), vec!["1", "2"]);

        let windows = pipeline.source().windows.lock().unwrap().clone();
        assert_eq!(windows, vec![(now() - Duration::hours(48), 60)]);

        fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_posted_ids_are_never_sent_again() {
        let dir = temp_state_dir();
        let pipeline = pipeline(&dir, launches(), Some(FakeChannel::default()));

        pipeline.run_at(&RunMode::Discover, &live(), now()).await.unwrap();
        let second = pipeline.run_at(&RunMode::Discover, &live(), now()).await.unwrap();

        assert_eq!(second.already_posted, 2);
        assert!(second.found_nothing());
        assert_eq!(second.sent, 0);
        assert_eq!(second.exit_code(), 0);
        assert_eq!(pipeline.channel().unwrap().delivered_names().len(), 2);

        fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_best_picks_one_in_a_day_window() {
        let dir = temp_state_dir();
        let pipeline = pipeline(&dir, launches(), Some(FakeChannel::default()));
        let options = RunOptions {
            limit: 10,
            ..Default::default()
        };

        let report = pipeline.run_at(&RunMode::Best, &options, now()).await.unwrap();

        assert_eq!(report.selected.len(), 1);
        assert_eq!(report.selected[0].name, "Ledgerly");
        assert_eq!(
            pipeline.source().windows.lock().unwrap()[0],
            (now() - Duration::hours(24), 10)
        );

        fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_hours_and_top_overrides() {
        let dir = temp_state_dir();
        let pipeline = pipeline(&dir, launches(), Some(FakeChannel::default()));
        let options = RunOptions {
            hours: Some(6),
            top: Some(1),
            ..Default::default()
        };

        let report = pipeline.run_at(&RunMode::Discover, &options, now()).await.unwrap();

        assert_eq!(report.sent, 1);
        assert_eq!(
            pipeline.source().windows.lock().unwrap()[0].0,
            now() - Duration::hours(6)
        );

        fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_dry_run_needs_no_channel_and_writes_nothing() {
        let dir = temp_state_dir();
        let pipeline = pipeline(&dir, launches(), None);

        let report = pipeline.run_at(&RunMode::Discover, &dry(), now()).await.unwrap();

        assert!(report.dry_run);
        assert_eq!(report.selected.len(), 2);
        assert_eq!(report.previews.len(), 2);
        assert!(report.previews[0].starts_with("<b>Ledgerly</b>"));
        assert_eq!(report.sent, 0);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_live_run_without_channel_is_an_error() {
        let dir = temp_state_dir();
        let pipeline = pipeline(&dir, launches(), None);

        let result = pipeline.run_at(&RunMode::Discover, &live(), now()).await;
        assert!(matches!(result, Err(CoreError::InvalidInput { .. })));
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_failed_delivery_is_not_recorded() {
        let dir = temp_state_dir();
        let pipeline = pipeline(&dir, launches(), Some(FakeChannel::rejecting("Ledgerly")));

        let report = pipeline.run_at(&RunMode::Discover, &live(), now()).await.unwrap();

        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.exit_code(), 0);

        let store = PostedStore::load(&pipeline.state_paths().posted_ids);
        assert!(store.contains("1"));
        assert!(!store.contains("2"));

        fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_every_delivery_failing_exits_non_zero() {
        let dir = temp_state_dir();
        let pipeline = pipeline(&dir, launches(), Some(FakeChannel::rejecting("<b>")));

        let report = pipeline.run_at(&RunMode::Discover, &live(), now()).await.unwrap();

        assert_eq!(report.sent, 0);
        assert_eq!(report.failed, 2);
        assert_eq!(report.exit_code(), 1);
        assert!(PostedStore::load(&pipeline.state_paths().posted_ids).is_empty());

        fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_unwritable_state_surfaces_error() {
        let dir = temp_state_dir();
        let paths = StatePaths::in_dir(&dir);
        fs::create_dir_all(paths.posted_ids.join("occupied")).unwrap();
        let pipeline = pipeline(&dir, vec![acme()], Some(FakeChannel::default()));

        let result = pipeline.run_at(&RunMode::Discover, &live(), now()).await;

        assert!(matches!(
            result,
            Err(CoreError::State(StateError::WriteFailed { .. }))
        ));
        assert_eq!(pipeline.channel().unwrap().delivered_names().len(), 1);

        fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_candidate_without_id_is_skipped() {
        let dir = temp_state_dir();
        let mut anonymous = ledgerly();
        anonymous.id = Some("   ".to_string());
        let pipeline = pipeline(&dir, vec![anonymous, acme()], Some(FakeChannel::default()));

        let report = pipeline.run_at(&RunMode::Discover, &live(), now()).await.unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.sent, 1);
        assert_eq!(
            pipeline.channel().unwrap().delivered_names(),
            vec!["<b>Acme Payroll</b>"]
        );
        assert_eq!(
            PostedStore::load(&pipeline.state_paths().posted_ids).ids(),
            vec!["1"]
        );

        fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_repeated_ids_within_a_fetch_are_collapsed() {
        let dir = temp_state_dir();
        let pipeline = pipeline(&dir, vec![acme(), acme(), acme()], Some(FakeChannel::default()));

        let report = pipeline.run_at(&RunMode::Discover, &live(), now()).await.unwrap();

        assert_eq!(report.fetched, 3);
        assert_eq!(report.eligible, 1);
        assert_eq!(report.sent, 1);

        fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_round_robin_rotation_advances_cursor() {
        let dir = temp_state_dir();
        let pipeline = pipeline(&dir, launches(), Some(FakeChannel::default()));

        let first = pipeline.run_at(&rotate(), &live(), now()).await.unwrap();
        assert_eq!(first.eligible, 2);
        assert_eq!(first.selected[0].name, "Ledgerly");
        assert_eq!(first.selected[0].matched_subcats, vec!["Invoicing tools"]);
        assert_eq!(first.selected[0].score, None);
        assert_eq!(
            fs::read_to_string(&pipeline.state_paths().rotation).unwrap(),
            "Invoicing tools\n"
        );

        let second = pipeline.run_at(&rotate(), &live(), now()).await.unwrap();
        assert_eq!(second.selected[0].name, "Acme Payroll");
        assert_eq!(
            fs::read_to_string(&pipeline.state_paths().rotation).unwrap(),
            "Payroll software\n"
        );

        let third = pipeline.run_at(&rotate(), &live(), now()).await.unwrap();
        assert!(third.found_nothing());
        assert_eq!(
            fs::read_to_string(&pipeline.state_paths().rotation).unwrap(),
            "Payroll software\n"
        );

        fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_round_robin_dry_run_leaves_cursor_alone() {
        let dir = temp_state_dir();
        fs::create_dir_all(&dir).unwrap();
        let pipeline = pipeline(&dir, launches(), None);
        let rotation = pipeline.state_paths().rotation.clone();
        fs::write(&rotation, "Invoicing tools\n").unwrap();

        let report = pipeline.run_at(&rotate(), &dry(), now()).await.unwrap();

        assert_eq!(report.selected[0].name, "Acme Payroll");
        assert_eq!(fs::read_to_string(&rotation).unwrap(), "Invoicing tools\n");
        assert!(!pipeline.state_paths().posted_ids.exists());

        fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_custom_rotation_order() {
        let dir = temp_state_dir();
        let pipeline = pipeline(&dir, launches(), None)
            .with_subcategories(vec!["Payroll software".to_string(), "Invoicing tools".to_string()]);

        let report = pipeline.run_at(&rotate(), &dry(), now()).await.unwrap();
        assert_eq!(report.selected[0].name, "Acme Payroll");
    }

    #[tokio::test]
    async fn test_random_rotation_picks_a_match() {
        let dir = temp_state_dir();
        let pipeline = pipeline(&dir, launches(), None);
        let mode = RunMode::Rotate {
            strategy: RotateStrategy::Random,
        };

        let report = pipeline.run_at(&mode, &dry(), now()).await.unwrap();

        assert_eq!(report.selected.len(), 1);
        assert!(["Acme Payroll", "Ledgerly"].contains(&report.selected[0].name.as_str()));
        assert!(!pipeline.state_paths().rotation.exists());
    }

    #[tokio::test]
    async fn test_post_and_search_resolve_slugs() {
        let dir = temp_state_dir();
        let pipeline = pipeline(&dir, launches(), Some(FakeChannel::default()));

        let post = RunMode::Post {
            slug: " ledgerly ".to_string(),
        };
        let report = pipeline.run_at(&post, &live(), now()).await.unwrap();
        assert_eq!(report.sent, 1);

        let search = RunMode::Search {
            query: "Acme Payroll!".to_string(),
        };
        let report = pipeline.run_at(&search, &live(), now()).await.unwrap();
        assert_eq!(report.sent, 1);

        assert_eq!(
            *pipeline.source().slugs.lock().unwrap(),
            vec!["ledgerly", "acme-payroll"]
        );
        assert!(pipeline.source().windows.lock().unwrap().is_empty());

        fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_unknown_slug_is_a_normal_empty_outcome() {
        let dir = temp_state_dir();
        let pipeline = pipeline(&dir, launches(), Some(FakeChannel::default()));

        let post = RunMode::Post {
            slug: "does-not-exist".to_string(),
        };
        let report = pipeline.run_at(&post, &live(), now()).await.unwrap();

        assert!(report.found_nothing());
        assert_eq!(report.exit_code(), 0);
    }

    #[tokio::test]
    async fn test_debug_explains_every_fresh_candidate() {
        let dir = temp_state_dir();
        let pipeline = pipeline(&dir, launches(), None);
        let options = RunOptions {
            debug: true,
            ..dry()
        };

        let report = pipeline.run_at(&RunMode::Discover, &options, now()).await.unwrap();

        assert_eq!(report.rationale.len(), 4);
        let cards = report
            .rationale
            .iter()
            .find(|r| r.name == "Cardvault")
            .unwrap();
        assert_eq!(cards.breakdown.score, 0.0);
        assert!(cards.breakdown.excluded.is_some());
    }
}
