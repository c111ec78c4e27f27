use radar_core::{fold_text, Candidate};

/// Whitelisted finance subcategories, in rotation order.
pub const FINANCE_SUBCATEGORIES: [&str; 19] = [
    "Accounting software",
    "Budgeting apps",
    "Credit score tools",
    "Financial planning",
    "Fundraising resources",
    "Investing",
    "Invoicing tools",
    "Money transfer",
    "Neobanks",
    "Online banking",
    "Payroll software",
    "Remote workforce tools",
    "Retirement planning",
    "Savings apps",
    "Startup financial planning",
    "Startup incorporation",
    "Stock trading platforms",
    "Tax preparation",
    "Treasury management platforms",
];

pub fn default_subcategories() -> Vec<String> {
    FINANCE_SUBCATEGORIES.iter().map(|s| s.to_string()).collect()
}

/// A candidate together with the whitelist labels its topics matched.
#[derive(Debug, Clone, PartialEq)]
pub struct SubcatMatch {
    pub candidate: Candidate,
    pub matched_subcats: Vec<String>,
}

/// Labels from `order` that appear among `topics`, compared case-insensitively
/// as whole labels. Returned in `order`'s spelling and sequence.
pub fn matched_subcats(topics: &[String], order: &[String]) -> Vec<String> {
    let topics: Vec<String> = topics.iter().map(|t| fold_text(t.trim())).collect();
    order
        .iter()
        .filter(|subcat| topics.contains(&fold_text(subcat)))
        .cloned()
        .collect()
}

/// Keep the candidates whose topics hit at least one subcategory, in input order.
pub fn filter_finance_subcats(candidates: Vec<Candidate>, order: &[String]) -> Vec<SubcatMatch> {
    candidates
        .into_iter()
        .filter_map(|candidate| {
            let matched = matched_subcats(&candidate.topics, order);
            (!matched.is_empty()).then_some(SubcatMatch {
                candidate,
                matched_subcats: matched,
            })
        })
        .collect()
}
