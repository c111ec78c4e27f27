use crate::report::{Rationale, RunReport, Selection};
use chrono::{DateTime, Duration, Utc};
use producthunt_client::{slugify, CandidateSource};
use radar_core::{dedup_by_id, AppConfig, Candidate, CoreError, ErrorExt};
use relevance_engine::{
    default_subcategories, filter_finance_subcats, pick_random, pick_round_robin, rank,
    RelevanceScorer, SubcatMatch,
};
use state_store::{DryRunCursor, FileRotationCursor, PostedStore};
use std::fmt;
use std::path::{Path, PathBuf};
use telegram_client::{outbound_for, MessageChannel};
use tracing::{debug, error, info, warn};

pub const DEFAULT_FETCH_LIMIT: usize = 60;
pub const DEFAULT_DISCOVER_TOP: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotateStrategy {
    #[default]
    RoundRobin,
    Random,
}

impl fmt::Display for RotateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoundRobin => f.write_str("round-robin"),
            Self::Random => f.write_str("random"),
        }
    }
}

/// What a single run fetches and how it picks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// One launch by its slug.
    Post { slug: String },
    /// A free-text query resolved as a slug.
    Search { query: String },
    /// Single best pick in the window.
    Best,
    /// Top-K under the strict gate, each sent in turn.
    Discover,
    /// Finance-subcategory filter, then one pick.
    Rotate { strategy: RotateStrategy },
}

impl RunMode {
    /// Fetch window used when no `--hours` override is given.
    pub fn default_hours(&self) -> u32 {
        match self {
            Self::Best => 24,
            Self::Discover | Self::Rotate { .. } => 48,
            Self::Post { .. } | Self::Search { .. } => 0,
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Post { .. } => "post".to_string(),
            Self::Search { .. } => "search".to_string(),
            Self::Best => "best".to_string(),
            Self::Discover => "discover".to_string(),
            Self::Rotate { strategy } => format!("rotate ({})", strategy),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Format messages but never deliver or touch state.
    pub dry_run: bool,
    pub hours: Option<u32>,
    pub limit: usize,
    pub top: Option<usize>,
    pub debug: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            hours: None,
            limit: DEFAULT_FETCH_LIMIT,
            top: None,
            debug: false,
        }
    }
}

/// Where the run's durable state lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    pub posted_ids: PathBuf,
    pub rotation: PathBuf,
}

impl StatePaths {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            posted_ids: config.posted_ids_path(),
            rotation: config.rotation_path(),
        }
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            posted_ids: dir.join(radar_core::POSTED_IDS_FILE),
            rotation: dir.join(radar_core::ROTATION_FILE),
        }
    }
}

/// A candidate chosen for delivery.
struct Pick {
    candidate: Candidate,
    score: Option<f64>,
    matched_subcats: Vec<String>,
}

impl Pick {
    fn scored(candidate: Candidate, score: f64) -> Self {
        Self {
            candidate,
            score: Some(score),
            matched_subcats: Vec::new(),
        }
    }

    fn matched(hit: &SubcatMatch) -> Self {
        Self {
            candidate: hit.candidate.clone(),
            score: None,
            matched_subcats: hit.matched_subcats.clone(),
        }
    }
}

/// fetch → dedup → score/select → check → deliver → record.
///
/// The channel is optional so dry runs work without delivery credentials.
pub struct Pipeline<S, M> {
    source: S,
    channel: Option<M>,
    scorer: RelevanceScorer,
    subcategories: Vec<String>,
    state: StatePaths,
}

impl<S, M> Pipeline<S, M>
where
    S: CandidateSource,
    M: MessageChannel,
{
    pub fn new(source: S, channel: Option<M>, state: StatePaths) -> Self {
        Self {
            source,
            channel,
            scorer: RelevanceScorer::default(),
            subcategories: default_subcategories(),
            state,
        }
    }

    pub fn with_scorer(mut self, scorer: RelevanceScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Replace the subcategory rotation order. An empty list is ignored.
    pub fn with_subcategories(mut self, subcategories: Vec<String>) -> Self {
        if !subcategories.is_empty() {
            self.subcategories = subcategories;
        }
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn channel(&self) -> Option<&M> {
        self.channel.as_ref()
    }

    pub fn state_paths(&self) -> &StatePaths {
        &self.state
    }

    pub async fn run(&self, mode: &RunMode, options: &RunOptions) -> Result<RunReport, CoreError> {
        self.run_at(mode, options, Utc::now()).await
    }

    /// Run once with an explicit reference time for windows and decay.
    pub async fn run_at(
        &self,
        mode: &RunMode,
        options: &RunOptions,
        now: DateTime<Utc>,
    ) -> Result<RunReport, CoreError> {
        info!(mode = %mode.name(), dry_run = options.dry_run, "Starting run");
        let channel = match (&self.channel, options.dry_run) {
            (_, true) => None,
            (Some(channel), false) => Some(channel),
            (None, false) => {
                return Err(CoreError::InvalidInput {
                    message: "no delivery channel configured for a live run".to_string(),
                })
            }
        };
        let mut report = RunReport::new(mode.name(), options.dry_run);
        let mut posted = PostedStore::load(&self.state.posted_ids);

        let fetched = self.fetch(mode, options, now).await;
        report.fetched = fetched.len();

        let (fresh, already): (Vec<Candidate>, Vec<Candidate>) = dedup_by_id(fetched)
            .into_iter()
            .partition(|c| c.id().map_or(true, |id| !posted.contains(id)));
        report.already_posted = already.len();
        if !already.is_empty() {
            debug!(count = already.len(), "Dropped launches that were already posted");
        }

        if options.debug {
            report.rationale = fresh
                .iter()
                .map(|c| Rationale {
                    name: c.display_name().to_string(),
                    breakdown: self.scorer.explain_at(c, now),
                })
                .collect();
        }

        let picks = self.select(mode, options, fresh, now, &mut report)?;
        if picks.is_empty() {
            info!("No relevant launch found");
            return Ok(report);
        }

        for pick in picks {
            report.selected.push(Selection {
                id: pick.candidate.id().map(str::to_string),
                name: pick.candidate.display_name().to_string(),
                score: pick.score,
                votes: pick.candidate.votes_count,
                matched_subcats: pick.matched_subcats.clone(),
            });

            let Some(id) = pick.candidate.id() else {
                warn!(
                    "Skipping '{}': launch has no id",
                    pick.candidate.display_name()
                );
                report.skipped += 1;
                continue;
            };

            if posted.contains(id) {
                debug!(id = %id, "Already posted, skipping");
                report.already_posted += 1;
                continue;
            }

            let message = outbound_for(&pick.candidate);
            let Some(channel) = channel else {
                info!(id = %id, "Dry run, not delivering '{}'", pick.candidate.display_name());
                report.previews.push(message.text);
                continue;
            };

            match channel.deliver(&message).await {
                Ok(()) => {
                    if let Err(e) = posted.record(id) {
                        error!(id = %id, "Delivered but could not record as posted: {}", e);
                        return Err(e.into());
                    }
                    report.sent += 1;
                }
                Err(e) => {
                    e.log_error();
                    report.failed += 1;
                }
            }
        }

        info!(
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            "Run finished"
        );
        Ok(report)
    }

    async fn fetch(&self, mode: &RunMode, options: &RunOptions, now: DateTime<Utc>) -> Vec<Candidate> {
        match mode {
            RunMode::Post { slug } => self.fetch_slug(slug.trim()).await,
            RunMode::Search { query } => {
                let slug = slugify(query);
                debug!("Resolved query '{}' to slug '{}'", query, slug);
                self.fetch_slug(&slug).await
            }
            _ => {
                let hours = options.hours.unwrap_or_else(|| mode.default_hours());
                let since = now - Duration::hours(i64::from(hours));
                info!("Fetching launches from the last {}h (limit {})", hours, options.limit);
                self.source.fetch_since(since, options.limit).await
            }
        }
    }

    async fn fetch_slug(&self, slug: &str) -> Vec<Candidate> {
        if slug.is_empty() {
            warn!("Empty slug, nothing to fetch");
            return Vec::new();
        }
        self.source.fetch_by_slug(slug).await.into_iter().collect()
    }

    fn select(
        &self,
        mode: &RunMode,
        options: &RunOptions,
        fresh: Vec<Candidate>,
        now: DateTime<Utc>,
        report: &mut RunReport,
    ) -> Result<Vec<Pick>, CoreError> {
        match mode {
            RunMode::Post { .. } | RunMode::Search { .. } => {
                report.eligible = fresh.len();
                Ok(fresh
                    .into_iter()
                    .map(|c| {
                        let score = self.scorer.score_at(&c, now);
                        Pick::scored(c, score)
                    })
                    .collect())
            }
            RunMode::Best | RunMode::Discover => {
                let k = match mode {
                    RunMode::Best => 1,
                    _ => options.top.unwrap_or(DEFAULT_DISCOVER_TOP),
                };
                let mut ranked = rank(&self.scorer, fresh, now);
                report.eligible = ranked.len();
                ranked.truncate(k);

                Ok(ranked
                    .into_iter()
                    .map(|s| Pick::scored(s.candidate, s.score))
                    .collect())
            }
            RunMode::Rotate { strategy } => {
                let matches = filter_finance_subcats(fresh, &self.subcategories);
                report.eligible = matches.len();

                let hit = match strategy {
                    RotateStrategy::Random => pick_random(&matches),
                    RotateStrategy::RoundRobin if options.dry_run => {
                        let file = FileRotationCursor::new(&self.state.rotation);
                        let mut cursor = DryRunCursor::seeded_from(&file);
                        pick_round_robin(&matches, &self.subcategories, &mut cursor)?
                    }
                    RotateStrategy::RoundRobin => {
                        let mut cursor = FileRotationCursor::new(&self.state.rotation);
                        pick_round_robin(&matches, &self.subcategories, &mut cursor)?
                    }
                };
                Ok(hit.map(Pick::matched).into_iter().collect())
            }
        }
    }
}
