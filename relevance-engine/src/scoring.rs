use crate::vocabulary::{first_term, Family, Vocabulary};
use chrono::{DateTime, Utc};
use radar_core::Candidate;
use serde::Serialize;
use std::fmt;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Why a candidate was excluded before scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Exclusion {
    Keyword(String),
    Topic(String),
}

/// Which branch of the finance gate let a candidate through.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatePath {
    CorePhrase { phrase: String },
    BusinessSize { marker: String, family: Family, term: String },
}

/// The full rationale behind a score, for debug output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub excluded: Option<Exclusion>,
    pub gate: Option<GatePath>,
    pub families: Vec<Family>,
    pub base_points: f64,
    pub engagement_bonus: f64,
    pub age_days: f64,
    pub decay: f64,
    pub score: f64,
}

impl ScoreBreakdown {
    fn rejected(excluded: Option<Exclusion>) -> Self {
        Self {
            excluded,
            gate: None,
            families: Vec::new(),
            base_points: 0.0,
            engagement_bonus: 0.0,
            age_days: 0.0,
            decay: 1.0,
            score: 0.0,
        }
    }
}

impl fmt::Display for ScoreBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.excluded, &self.gate) {
            (Some(Exclusion::Keyword(k)), _) => write!(f, "excluded by keyword '{}'", k),
            (Some(Exclusion::Topic(t)), _) => write!(f, "excluded by topic '{}'", t),
            (None, None) => f.write_str("failed finance gate"),
            (None, Some(gate)) => {
                match gate {
                    GatePath::CorePhrase { phrase } => write!(f, "gate: '{}'", phrase)?,
                    GatePath::BusinessSize { marker, family, term } => {
                        write!(f, "gate: '{}' + {} '{}'", marker, family, term)?
                    }
                }
                let families: Vec<&str> = self.families.iter().map(Family::as_str).collect();
                write!(
                    f,
                    "; families [{}] = {:.0} pts, engagement +{:.2}, age {:.1}d x{:.3} -> {:.2}",
                    families.join(", "),
                    self.base_points,
                    self.engagement_bonus,
                    self.age_days,
                    self.decay,
                    self.score
                )
            }
        }
    }
}

/// Strict-gate relevance scorer for the fintech/B2B/SMB niche.
#[derive(Debug, Clone, Default)]
pub struct RelevanceScorer {
    vocabulary: Vocabulary,
}

impl RelevanceScorer {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn score(&self, candidate: &Candidate) -> f64 {
        self.score_at(candidate, Utc::now())
    }

    pub fn score_at(&self, candidate: &Candidate, now: DateTime<Utc>) -> f64 {
        self.explain_at(candidate, now).score
    }

    pub fn explain_at(&self, candidate: &Candidate, now: DateTime<Utc>) -> ScoreBreakdown {
        let vocab = &self.vocabulary;
        let text = candidate.search_text();
        let topics = candidate.topic_set();

        if let Some(keyword) = first_term(&text, &vocab.exclusion_keywords) {
            return ScoreBreakdown::rejected(Some(Exclusion::Keyword(keyword.to_string())));
        }
        if let Some(topic) = vocab
            .exclusion_topics
            .iter()
            .find(|t| topics.contains(t.as_str()))
        {
            return ScoreBreakdown::rejected(Some(Exclusion::Topic(topic.clone())));
        }

        let Some(gate) = self.finance_gate(&text) else {
            return ScoreBreakdown::rejected(None);
        };

        let families: Vec<Family> = Family::ALL
            .into_iter()
            .filter(|family| {
                let terms = vocab.family(*family);
                terms.text_hit(&text).is_some() || terms.topic_hit(&topics).is_some()
            })
            .collect();
        let base_points: f64 = families.iter().map(|f| vocab.family(*f).points).sum();
        if base_points <= 0.0 {
            return ScoreBreakdown {
                gate: Some(gate),
                families,
                ..ScoreBreakdown::rejected(None)
            };
        }

        let engagement_bonus = vocab.vote_weight * candidate.votes_count as f64
            + vocab.comment_weight * candidate.comments_count as f64;
        let age_days = age_days(candidate.created_at.as_deref(), now);
        let decay = (-age_days / vocab.decay_days).exp();
        let score = ((base_points + engagement_bonus) * decay).max(f64::MIN_POSITIVE);

        ScoreBreakdown {
            excluded: None,
            gate: Some(gate),
            families,
            base_points,
            engagement_bonus,
            age_days,
            decay,
            score,
        }
    }

    /// Text-only co-occurrence gate: a core finance phrase, or a
    /// business-size marker together with a lending, payroll or accounting hit.
    fn finance_gate(&self, text: &str) -> Option<GatePath> {
        let vocab = &self.vocabulary;
        if let Some(phrase) = vocab.core_finance.text_hit(text) {
            return Some(GatePath::CorePhrase {
                phrase: phrase.to_string(),
            });
        }

        let marker = vocab.business_size.text_hit(text)?;
        [Family::Lending, Family::Payroll, Family::Accounting]
            .into_iter()
            .find_map(|family| {
                vocab
                    .family(family)
                    .text_hit(text)
                    .map(|term| GatePath::BusinessSize {
                        marker: marker.to_string(),
                        family,
                        term: term.to_string(),
                    })
            })
    }
}

/// Days elapsed since `created_at`; missing, malformed or future timestamps
/// count as zero.
pub fn age_days(created_at: Option<&str>, now: DateTime<Utc>) -> f64 {
    created_at
        .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
        .map(|created| {
            let elapsed = now.signed_duration_since(created.with_timezone(&Utc));
            (elapsed.num_milliseconds() as f64 / 1000.0 / SECONDS_PER_DAY).max(0.0)
        })
        .unwrap_or(0.0)
}
