use serde::{Deserialize, Serialize};

/// Queries asking for help with something illegitimate. Highest precedence:
/// an unsafe match short-circuits everything else.
pub const UNSAFE_KEYWORDS: &[&str] = &[
    "hack",
    "steal",
    "fraud",
    "launder",
    "illegal",
    "exploit",
    "bypass",
    "cheat",
    "fake id",
    "forge",
    "counterfeit",
];

/// Topics the assistant does not cover.
pub const OUT_OF_DOMAIN_KEYWORDS: &[&str] = &[
    "recipe",
    "weather",
    "movie",
    "sports",
    "cricket",
    "football",
    "game",
    "song",
    "joke",
    "travel",
    "vacation",
    "dating",
    "politics",
    "election",
    "religion",
];

pub const UNSAFE_RESPONSE: &str = "I'm sorry, but I cannot assist with that request. \
    This assistant is designed to help with legitimate banking, financial services, \
    and insurance queries only. If you have a genuine banking concern, \
    please rephrase your question.";

pub const OUT_OF_DOMAIN_RESPONSE: &str = "I appreciate your query, but I'm specifically designed \
    to assist with Banking, Financial Services, and Insurance (BFSI) topics only. \
    I can help you with:\n\
    - Loan eligibility & applications\n\
    - EMI calculations & schedules\n\
    - Interest rates & charges\n\
    - Credit card & debit card services\n\
    - Transactions (UPI, NEFT, RTGS, IMPS)\n\
    - Insurance policies & claims\n\
    - Account services & KYC\n\
    - Grievance redressal\n\n\
    Please ask a BFSI-related question and I'll be happy to help!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Unsafe,
    OutOfDomain,
    Pass,
}

/// Case-insensitive substring containment against the static keyword sets,
/// unsafe first. Total over any input; the empty string passes.
pub fn classify(query: &str) -> Verdict {
    let q = query.to_lowercase();

    if UNSAFE_KEYWORDS.iter().any(|kw| q.contains(kw)) {
        return Verdict::Unsafe;
    }
    if OUT_OF_DOMAIN_KEYWORDS.iter().any(|kw| q.contains(kw)) {
        return Verdict::OutOfDomain;
    }
    Verdict::Pass
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsafe_keywords_block() {
        assert_eq!(classify("how to hack a bank account"), Verdict::Unsafe);
        assert_eq!(classify("can I get a FAKE ID for kyc"), Verdict::Unsafe);
    }

    #[test]
    fn unsafe_takes_precedence_over_out_of_domain() {
        assert_eq!(
            classify("tell me a joke about how to launder money"),
            Verdict::Unsafe
        );
    }

    #[test]
    fn off_topic_queries_are_out_of_domain() {
        assert_eq!(classify("Tell me a joke"), Verdict::OutOfDomain);
        assert_eq!(classify("what's the WEATHER today"), Verdict::OutOfDomain);
    }

    #[test]
    fn banking_queries_and_empty_input_pass() {
        assert_eq!(classify("what is my emi schedule"), Verdict::Pass);
        assert_eq!(classify(""), Verdict::Pass);
    }
}
