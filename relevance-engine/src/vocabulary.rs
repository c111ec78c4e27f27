use radar_core::fold_text;
use serde::Serialize;
use std::fmt;

/// The five keyword families a candidate can collect points from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    CoreFinance,
    Lending,
    Payroll,
    Accounting,
    BusinessSize,
}

impl Family {
    pub const ALL: [Family; 5] = [
        Family::CoreFinance,
        Family::Lending,
        Family::Payroll,
        Family::Accounting,
        Family::BusinessSize,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Family::CoreFinance => "core-finance",
            Family::Lending => "lending",
            Family::Payroll => "payroll",
            Family::Accounting => "accounting",
            Family::BusinessSize => "business-size",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TermFamily {
    /// Lowercase phrases searched in the candidate text.
    pub terms: Vec<String>,
    /// Lowercase topic labels matched exactly.
    pub topics: Vec<String>,
    pub points: f64,
}

impl TermFamily {
    fn new(terms: &[&str], topics: &[&str], points: f64) -> Self {
        Self {
            terms: folded(terms),
            topics: folded(topics),
            points,
        }
    }

    /// First term found in `text`, if any.
    pub fn text_hit(&self, text: &str) -> Option<&str> {
        first_term(text, &self.terms)
    }

    /// First topic label (in vocabulary order) present in `topics`.
    pub fn topic_hit<'a>(&'a self, topics: &std::collections::HashSet<String>) -> Option<&'a str> {
        self.topics
            .iter()
            .find(|t| topics.contains(t.as_str()))
            .map(String::as_str)
    }
}

/// Everything the relevance scorer knows about the domain.
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    pub exclusion_keywords: Vec<String>,
    pub exclusion_topics: Vec<String>,
    pub core_finance: TermFamily,
    pub lending: TermFamily,
    pub payroll: TermFamily,
    pub accounting: TermFamily,
    pub business_size: TermFamily,
    pub vote_weight: f64,
    pub comment_weight: f64,
    /// Freshness decay time constant, in days.
    pub decay_days: f64,
}

impl Vocabulary {
    pub fn family(&self, family: Family) -> &TermFamily {
        match family {
            Family::CoreFinance => &self.core_finance,
            Family::Lending => &self.lending,
            Family::Payroll => &self.payroll,
            Family::Accounting => &self.accounting,
            Family::BusinessSize => &self.business_size,
        }
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            exclusion_keywords: folded(&[
                "pokemon",
                "trading cards",
                "trading card",
                "collectible",
                "collectibles",
                "nft",
                "nfts",
                "memecoin",
                "memecoins",
                "casino",
                "gambling",
                "sports betting",
                "betting",
                "lottery",
                "fantasy football",
                "video game",
                "video games",
                "dating",
                "horoscope",
                "astrology",
            ]),
            exclusion_topics: folded(&[
                "gaming",
                "games",
                "video games",
                "entertainment",
                "movies",
                "music",
                "anime",
                "collectibles",
                "nft",
                "dating",
                "sports",
                "fashion",
                "beauty",
            ]),
            core_finance: TermFamily::new(
                &[
                    "fintech",
                    "b2b payments",
                    "b2b payment",
                    "payment processing",
                    "payments infrastructure",
                    "payment infrastructure",
                    "cross-border payments",
                    "accounts payable",
                    "accounts receivable",
                    "expense management",
                    "spend management",
                    "corporate card",
                    "corporate cards",
                    "business banking",
                    "business bank account",
                    "treasury management",
                    "embedded finance",
                    "banking as a service",
                    "open banking",
                    "card issuing",
                    "neobank",
                    "cash flow",
                    "kyc",
                    "aml",
                    "reconciliation",
                ],
                &["fintech", "payments", "banking", "finance", "neobanks"],
                30.0,
            ),
            lending: TermFamily::new(
                &[
                    "lending",
                    "loan",
                    "loans",
                    "line of credit",
                    "credit line",
                    "working capital",
                    "invoice financing",
                    "revenue-based financing",
                    "merchant cash advance",
                    "bnpl",
                    "buy now pay later",
                    "business credit",
                ],
                &["lending", "credit"],
                20.0,
            ),
            payroll: TermFamily::new(
                &[
                    "payroll",
                    "payslip",
                    "payslips",
                    "contractor payments",
                    "employee benefits",
                    "benefits administration",
                    "hris",
                    "hr",
                ],
                &["payroll", "payroll software", "hr"],
                20.0,
            ),
            accounting: TermFamily::new(
                &[
                    "accounting",
                    "bookkeeping",
                    "invoice",
                    "invoices",
                    "invoicing",
                    "billing",
                    "erp",
                    "tax",
                    "taxes",
                    "vat",
                    "sales tax",
                    "general ledger",
                    "expense report",
                    "expense reports",
                    "receipts",
                ],
                &["accounting", "accounting software", "invoicing tools", "tax preparation"],
                18.0,
            ),
            business_size: TermFamily::new(
                &[
                    "b2b",
                    "smb",
                    "smbs",
                    "sme",
                    "smes",
                    "small business",
                    "small businesses",
                    "startup",
                    "startups",
                    "mid-market",
                    "enterprise",
                    "enterprises",
                    "merchants",
                    "freelancers",
                ],
                &["b2b", "small business", "smb"],
                10.0,
            ),
            vote_weight: 0.04,
            comment_weight: 0.08,
            decay_days: 5.0,
        }
    }
}

fn folded(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| fold_text(s)).collect()
}

/// First of `terms` that occurs in `text` as a whole token sequence.
pub fn first_term<'a>(text: &str, terms: &'a [String]) -> Option<&'a str> {
    terms
        .iter()
        .find(|term| contains_term(text, term))
        .map(String::as_str)
}

/// True when `term` occurs in `text` with no alphanumeric character directly
/// before or after it. Both sides are expected folded (see [`fold_text`]).
pub fn contains_term(text: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }

    text.match_indices(term).any(|(start, matched)| {
        let before = text[..start].chars().next_back();
        let after = text[start + matched.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
