pub mod pipeline;
pub mod report;
pub mod scheduler;

pub use pipeline::{
    Pipeline, RotateStrategy, RunMode, RunOptions, StatePaths, DEFAULT_DISCOVER_TOP,
    DEFAULT_FETCH_LIMIT,
};
pub use report::{Rationale, RunReport, Selection};
pub use scheduler::{next_run, run_daily, startup_notice, DailySchedule};

#[cfg(test)]
mod tests;
