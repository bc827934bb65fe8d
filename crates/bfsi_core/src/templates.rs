/// One pre-authored response category. Catalog declaration order is part of
/// the contract: keyword-score ties resolve to the earlier entry.
#[derive(Debug, Clone, Copy)]
pub struct CategoryTemplate {
    pub category_id: &'static str,
    pub keywords: &'static [&'static str],
    pub response: &'static str,
}

/// The reference BFSI catalog. Fifteen categories today, but nothing may
/// assume that count.
pub const CATALOG: &[CategoryTemplate] = &[
    CategoryTemplate {
        category_id: "loan_eligibility",
        keywords: &[
            "eligibility",
            "eligible",
            "qualify",
            "criteria",
            "apply",
            "application",
            "loan status",
            "approval",
        ],
        response: "Loan eligibility depends on several factors including age (21-60 years), \
            income stability, credit score (typically 700+), existing obligations, and \
            employment type. Salaried applicants need a minimum of 2 years' work experience, \
            while self-employed individuals require 3 years of business continuity. \
            For a detailed assessment, please provide your income and loan type.",
    },
    CategoryTemplate {
        category_id: "emi",
        keywords: &["emi", "installment", "monthly payment", "repayment", "schedule"],
        response: "EMI (Equated Monthly Installment) is calculated using the formula: \
            EMI = [P x R x (1+R)^N] / [(1+R)^N - 1], where P = principal, \
            R = monthly interest rate, and N = tenure in months. \
            Each installment includes both principal and interest components. \
            You can use our official EMI calculator for exact figures.",
    },
    CategoryTemplate {
        category_id: "interest_rate",
        keywords: &[
            "interest rate",
            "rate of interest",
            "roi",
            "charges",
            "processing fee",
            "fee",
        ],
        response: "Interest rates vary based on your credit profile, loan type, and tenure. \
            Home loans are typically linked to the repo rate (8.50%-9.25% p.a.). \
            Processing fees range between 1%-2% of the loan amount plus applicable taxes. \
            All charges are disclosed in the sanction letter and loan agreement.",
    },
    CategoryTemplate {
        category_id: "credit_score",
        keywords: &[
            "credit score",
            "cibil",
            "credit rating",
            "credit history",
            "credit report",
        ],
        response: "Credit score is a key indicator of repayment behavior and financial discipline. \
            A score above 750 is considered excellent and may qualify you for better terms. \
            Scores below 650 may impact eligibility or attract higher interest rates. \
            Final approval depends on overall risk evaluation.",
    },
    CategoryTemplate {
        category_id: "documents",
        keywords: &[
            "document",
            "documents",
            "kyc",
            "proof",
            "papers",
            "paperwork",
            "required documents",
        ],
        response: "Standard documents required include: 1) Identity Proof (Aadhaar/PAN), \
            2) Address Proof (Utility Bill/Passport), 3) Income Proof (Salary Slips/ITR), \
            4) Bank Statements for the last 6 months. Home loans also require property papers. \
            Processing typically takes 24 hours to 5 working days.",
    },
    CategoryTemplate {
        category_id: "card",
        keywords: &[
            "card",
            "debit card",
            "credit card",
            "block",
            "lost",
            "atm",
            "pin",
            "cvv",
        ],
        response: "For debit/credit card services: You can block a lost card immediately via \
            Mobile Banking -> Card Management, by SMS ('BLOCK <last 4 digits>'), or by \
            calling our 24x7 toll-free helpline. For international transactions, \
            enable them via Net Banking -> Manage Cards -> Usage Settings.",
    },
    CategoryTemplate {
        category_id: "transaction",
        keywords: &[
            "neft",
            "rtgs",
            "imps",
            "upi",
            "transfer",
            "transaction",
            "payment",
            "fund transfer",
            "send money",
        ],
        response: "Transaction limits vary by mode: UPI - Rs. 1 Lakh/day (10 txns), \
            IMPS - Rs. 5 Lakhs/day, NEFT/RTGS - no limit online (subject to cooling period \
            for new beneficiaries). UPI and IMPS are 24x7 instant payment systems. \
            NEFT operates in half-hourly batches; RTGS is real-time for amounts >= Rs. 2 Lakhs.",
    },
    CategoryTemplate {
        category_id: "complaint",
        keywords: &[
            "complaint",
            "grievance",
            "issue",
            "problem",
            "escalat",
            "ombudsman",
            "redressal",
            "not resolved",
            "unhappy",
        ],
        response: "Our grievance redressal mechanism: Level 1 - Branch Manager or Customer Care \
            (response in 7 days). Level 2 - Nodal Officer (response in 10 days). \
            Level 3 - Principal Nodal Officer. If unresolved for 30 days, \
            you may approach the RBI Banking Ombudsman.",
    },
    CategoryTemplate {
        category_id: "account",
        keywords: &[
            "account",
            "savings",
            "current",
            "balance",
            "open account",
            "close account",
            "statement",
            "passbook",
            "mini statement",
        ],
        response: "We offer Savings, Current, and Fixed Deposit accounts. \
            Savings account interest rates range from 3.0%-4.0% p.a. \
            You can open an account online or at any branch with your KYC documents. \
            For balance inquiries, use Mobile Banking, Net Banking, or SMS Banking.",
    },
    CategoryTemplate {
        category_id: "branch",
        keywords: &["branch", "working hours", "timing", "office", "visit", "nearest"],
        response: "Our branches are open from 10:00 AM to 4:00 PM, Monday to Saturday \
            (except 2nd and 4th Saturdays and public holidays). \
            Many services are also available 24x7 through our Mobile Banking app \
            and Net Banking portal.",
    },
    CategoryTemplate {
        category_id: "prepayment",
        keywords: &[
            "prepay",
            "pre-pay",
            "foreclose",
            "close loan",
            "penalty",
            "early",
            "part payment",
        ],
        response: "Prepayment and foreclosure options are available for most loan types. \
            Floating rate loans: No prepayment penalty. \
            Fixed rate loans: Up to 2% penalty if paid within the lock-in period. \
            Partial prepayments can help reduce your tenure or EMI. \
            Please check your loan agreement for specific terms.",
    },
    CategoryTemplate {
        category_id: "insurance_policy",
        keywords: &[
            "insurance",
            "policy",
            "life insurance",
            "health insurance",
            "term plan",
            "premium",
            "sum assured",
            "coverage",
        ],
        response: "We offer a range of insurance products including Term Life Insurance, \
            Health Insurance, Motor Insurance, and Unit-Linked Plans (ULIPs). \
            Term plans start from Rs. 500/month for Rs. 1 Crore coverage. \
            Health insurance covers hospitalization, day-care procedures, and pre/post \
            hospitalization expenses. Please specify which product you'd like details on.",
    },
    CategoryTemplate {
        category_id: "insurance_claim",
        keywords: &[
            "claim",
            "claim status",
            "file claim",
            "claim process",
            "claim settlement",
            "nominee",
            "maturity",
        ],
        response: "To file an insurance claim: 1) Intimate the claim via our toll-free number \
            or Mobile Banking app within 24 hours. 2) Submit required documents - \
            Policy document, ID proof, medical reports (for health), FIR (for motor). \
            3) Claims are typically processed within 30 days of document submission. \
            Track your claim status online via the 'My Claims' section.",
    },
    CategoryTemplate {
        category_id: "fd_rd",
        keywords: &[
            "fixed deposit",
            "fd",
            "recurring deposit",
            "rd",
            "deposit",
            "maturity",
            "premature withdrawal",
        ],
        response: "Fixed Deposit (FD) interest rates range from 5.5%-7.5% p.a. based on tenure. \
            Senior citizens get an additional 0.5%. Minimum FD amount is Rs. 10,000. \
            Recurring Deposits (RD) start from Rs. 500/month. \
            Premature withdrawal may attract a penalty of 0.5%-1% on the applicable rate.",
    },
    CategoryTemplate {
        category_id: "mobile_net_banking",
        keywords: &[
            "mobile banking",
            "net banking",
            "online banking",
            "internet banking",
            "login",
            "password",
            "register",
            "otp",
        ],
        response: "To register for Mobile/Net Banking: 1) Download our Mobile Banking app \
            from App Store or Play Store. 2) Register using your account number and \
            registered mobile number. 3) Set your login PIN/password. \
            For password reset, use the 'Forgot Password' option or visit your branch. \
            OTP will be sent to your registered mobile number for verification.",
    },
];

/// Returned when no category keyword matches at all.
pub const DEFAULT_GUIDANCE: &str = "Thank you for your query. I can help with loan eligibility, \
    EMI calculations, interest rates, credit scores, documentation, card services, transactions, \
    insurance, account services, and grievance redressal. Could you please provide \
    more details about what you'd like to know?";

/// Outcome of keyword scoring. `category` is `None` when the default
/// guidance was used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackReply {
    pub response: String,
    pub category: Option<&'static str>,
    pub score: usize,
}

/// The capability the router depends on for its final tier. Template-based
/// today; a generative variant can be slotted in without router changes.
pub trait FallbackResponder {
    fn respond(&self, query: &str) -> FallbackReply;
}

/// Tier 2: scores every catalog entry by keyword containment and answers
/// from the best one.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateResponder;

impl FallbackResponder for TemplateResponder {
    fn respond(&self, query: &str) -> FallbackReply {
        let q = query.to_lowercase();

        let mut best: Option<(usize, usize)> = None;
        for (i, template) in CATALOG.iter().enumerate() {
            let score = template
                .keywords
                .iter()
                .filter(|keyword| q.contains(*keyword))
                .count();
            match best {
                // `<=` keeps the earlier declaration on equal scores.
                Some((_, top)) if score <= top => {}
                _ if score > 0 => best = Some((i, score)),
                _ => {}
            }
        }

        match best {
            Some((i, score)) => FallbackReply {
                response: CATALOG[i].response.to_string(),
                category: Some(CATALOG[i].category_id),
                score,
            },
            None => FallbackReply {
                response: DEFAULT_GUIDANCE.to_string(),
                category: None,
                score: 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_scoring_category_wins() {
        let reply = TemplateResponder.respond("Which KYC documents and proof do I need?");
        assert_eq!(reply.category, Some("documents"));
        assert!(reply.score >= 3);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let reply = TemplateResponder.respond("WHAT IS MY EMI?");
        assert_eq!(reply.category, Some("emi"));
    }

    #[test]
    fn ties_resolve_to_the_earlier_declaration() {
        // "emi" and "card" each match exactly one keyword of their category.
        let reply = TemplateResponder.respond("emi card");
        assert_eq!(reply.category, Some("emi"));

        // "insurance" (insurance_policy) ties with "claim" (insurance_claim);
        // insurance_policy is declared first.
        let reply = TemplateResponder.respond("insurance claim");
        assert_eq!(reply.category, Some("insurance_policy"));

        // Repeat runs stay stable.
        for _ in 0..10 {
            assert_eq!(TemplateResponder.respond("emi card").category, Some("emi"));
        }
    }

    #[test]
    fn zero_matches_yield_default_guidance_without_category() {
        let reply = TemplateResponder.respond("asdkjaslkdj");
        assert_eq!(reply.category, None);
        assert_eq!(reply.score, 0);
        assert_eq!(reply.response, DEFAULT_GUIDANCE);
    }
}
