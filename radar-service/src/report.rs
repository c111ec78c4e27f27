use relevance_engine::ScoreBreakdown;
use serde::Serialize;
use std::fmt;

/// One candidate the run chose, with the numbers that got it chosen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub id: Option<String>,
    pub name: String,
    /// Relevance score; absent for picks made without scoring.
    pub score: Option<f64>,
    pub votes: u64,
    pub matched_subcats: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Rationale {
    pub name: String,
    pub breakdown: ScoreBreakdown,
}

/// Outcome of a single pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub mode: String,
    pub dry_run: bool,
    pub fetched: usize,
    pub eligible: usize,
    pub already_posted: usize,
    pub selected: Vec<Selection>,
    pub sent: usize,
    pub failed: usize,
    /// Selected candidates dropped for lacking an id.
    pub skipped: usize,
    /// Formatted messages a dry run would have delivered.
    pub previews: Vec<String>,
    /// Per-candidate score rationale, filled in debug runs.
    pub rationale: Vec<Rationale>,
}

impl RunReport {
    pub fn new(mode: impl Into<String>, dry_run: bool) -> Self {
        Self {
            mode: mode.into(),
            dry_run,
            ..Default::default()
        }
    }

    /// 1 when every attempted delivery failed, otherwise 0.
    pub fn exit_code(&self) -> i32 {
        if self.failed > 0 && self.sent == 0 {
            1
        } else {
            0
        }
    }

    pub fn found_nothing(&self) -> bool {
        self.selected.is_empty()
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(id) = &self.id {
            write!(f, " [{}]", id)?;
        }
        match self.score {
            Some(score) => write!(f, " score {:.2}", score)?,
            None => write!(f, " unscored")?,
        }
        write!(f, ", {} votes", self.votes)?;
        if !self.matched_subcats.is_empty() {
            write!(f, ", subcategories: {}", self.matched_subcats.join(", "))?;
        }
        Ok(())
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = if self.dry_run { " (dry run)" } else { "" };
        writeln!(f, "Mode: {}{}", self.mode, suffix)?;
        writeln!(
            f,
            "Fetched {} launches, {} eligible, {} already posted",
            self.fetched, self.eligible, self.already_posted
        )?;

        if self.found_nothing() {
            return write!(f, "No relevant launch found, nothing to post");
        }

        writeln!(f, "Selected:")?;
        for (i, selection) in self.selected.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, selection)?;
        }

        if self.dry_run {
            write!(f, "Outcome: {} message(s) previewed, nothing sent", self.previews.len())?;
        } else {
            write!(f, "Outcome: sent {}, failed {}", self.sent, self.failed)?;
        }
        if self.skipped > 0 {
            write!(f, ", {} skipped without an id", self.skipped)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection() -> Selection {
        Selection {
            id: Some("421337".to_string()),
            name: "Ledgerly".to_string(),
            score: Some(32.4),
            votes: 212,
            matched_subcats: vec!["Invoicing tools".to_string()],
        }
    }

    #[test]
    fn test_exit_code() {
        let mut report = RunReport::new("discover", false);
        assert_eq!(report.exit_code(), 0);

        report.failed = 2;
        assert_eq!(report.exit_code(), 1);

        report.sent = 1;
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_nothing_found_trace() {
        let mut report = RunReport::new("best", false);
        report.fetched = 12;
        let trace = report.to_string();
        assert!(trace.contains("Fetched 12 launches, 0 eligible, 0 already posted"));
        assert!(trace.ends_with("No relevant launch found, nothing to post"));
    }

    #[test]
    fn test_selection_trace() {
        let mut report = RunReport::new("rotate", true);
        report.selected.push(selection());
        report.previews.push("<b>Ledgerly</b>".to_string());

        let trace = report.to_string();
        assert!(trace.starts_with("Mode: rotate (dry run)\n"));
        assert!(trace.contains(
            "  1. Ledgerly [421337] score 32.40, 212 votes, subcategories: Invoicing tools"
        ));
        assert!(trace.ends_with("Outcome: 1 message(s) previewed, nothing sent"));
    }

    #[test]
    fn test_unscored_selection() {
        let pick = Selection {
            score: None,
            matched_subcats: Vec::new(),
            ..selection()
        };
        assert_eq!(pick.to_string(), "Ledgerly [421337] unscored, 212 votes");
    }
}
