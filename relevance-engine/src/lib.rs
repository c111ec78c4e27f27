pub mod scoring;
pub mod selection;
pub mod subcats;
pub mod vocabulary;

pub use scoring::{age_days, Exclusion, GatePath, RelevanceScorer, ScoreBreakdown};
pub use selection::{
    pick_random, pick_random_with, pick_round_robin, rank, top_k, RotationCursor, ScoredCandidate,
};
pub use subcats::{
    default_subcategories, filter_finance_subcats, matched_subcats, SubcatMatch,
    FINANCE_SUBCATEGORIES,
};
pub use vocabulary::{contains_term, Family, TermFamily, Vocabulary};
