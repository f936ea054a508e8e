//! Deterministic rule-based lead scoring.
//!
//! Pure functions over (lead, offer); same inputs always yield the same
//! score. Three independent sub-scores, each with its own cap, and the
//! total clamped to [`RULE_SCORE_CAP`].

use shared::dto::{Lead, Offer};

pub const RULE_SCORE_CAP: i32 = 50;

const DECISION_MAKERS: &[&str] = &[
    "ceo",
    "cto",
    "cfo",
    "coo",
    "president",
    "founder",
    "owner",
    "director",
    "vp",
    "vice president",
    "head of",
    "chief",
    "general manager",
    "gm",
];

const INFLUENCERS: &[&str] = &[
    "manager",
    "lead",
    "senior",
    "principal",
    "architect",
    "specialist",
    "coordinator",
];

/// Role relevance: decision makers 20, influencers 10, everyone else 0.
/// Case-insensitive substring match; the decision-maker vocabulary is
/// checked first.
pub fn score_role(role: &str) -> i32 {
    let role = role.to_lowercase();
    if DECISION_MAKERS.iter().any(|t| role.contains(t)) {
        return 20;
    }
    if INFLUENCERS.iter().any(|t| role.contains(t)) {
        return 10;
    }
    0
}

/// Industry match against the offer's ideal use cases, evaluated in list
/// order: exact lowercase equality scores 20, whitespace-token substring
/// overlap (either direction) scores 10. The first matching use case wins.
pub fn score_industry(industry: &str, ideal_use_cases: &[String]) -> i32 {
    let industry = industry.to_lowercase();
    let industry_words: Vec<&str> = industry.split_whitespace().collect();

    for use_case in ideal_use_cases {
        let use_case = use_case.to_lowercase();
        if industry == use_case {
            return 20;
        }
        let overlap = use_case.split_whitespace().any(|word| {
            industry_words
                .iter()
                .any(|iw| iw.contains(word) || word.contains(iw))
        });
        if overlap {
            return 10;
        }
    }
    0
}

/// Data completeness is all-or-nothing: 10 only when all six canonical
/// fields are non-empty after trimming.
pub fn score_completeness(lead: &Lead) -> i32 {
    let fields = [
        &lead.name,
        &lead.role,
        &lead.company,
        &lead.industry,
        &lead.location,
        &lead.linkedin_bio,
    ];
    if fields.iter().all(|f| !f.trim().is_empty()) {
        10
    } else {
        0
    }
}

/// Combined rule score, clamped to 50 as a defensive ceiling.
pub fn rule_score(lead: &Lead, offer: &Offer) -> i32 {
    let total = score_role(&lead.role)
        + score_industry(&lead.industry, &offer.ideal_use_cases)
        + score_completeness(lead);
    total.min(RULE_SCORE_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn offer() -> Offer {
        Offer {
            id: Uuid::new_v4(),
            name: "AI Outreach Automation".into(),
            value_props: vec!["24/7 outreach".into(), "6x more meetings".into()],
            ideal_use_cases: vec!["B2B SaaS mid-market".into()],
            owner_id: "test-user".into(),
            created_at: Utc::now(),
        }
    }

    fn lead(name: &str, role: &str, industry: &str, bio: &str) -> Lead {
        Lead {
            name: name.into(),
            role: role.into(),
            company: "Acme Inc".into(),
            industry: industry.into(),
            location: "San Francisco".into(),
            linkedin_bio: bio.into(),
        }
    }

    #[test]
    fn decision_maker_roles_score_20() {
        assert_eq!(score_role("CEO"), 20);
        assert_eq!(score_role("CTO"), 20);
        assert_eq!(score_role("VP of Engineering"), 20);
        assert_eq!(score_role("Head of Sales"), 20);
        assert_eq!(score_role("Founder"), 20);
    }

    #[test]
    fn influencer_roles_score_10() {
        assert_eq!(score_role("Engineering Manager"), 10);
        assert_eq!(score_role("Senior Developer"), 10);
        assert_eq!(score_role("Lead Designer"), 10);
        assert_eq!(score_role("Product Manager"), 10);
    }

    #[test]
    fn other_roles_score_0() {
        assert_eq!(score_role("Junior Developer"), 0);
        assert_eq!(score_role("Intern"), 0);
        assert_eq!(score_role("Associate"), 0);
    }

    #[test]
    fn role_match_is_case_insensitive() {
        assert_eq!(score_role("ceo"), 20);
        assert_eq!(score_role("CEO"), 20);
        assert_eq!(score_role("Chief Executive Officer"), 20);
    }

    #[test]
    fn industry_exact_match_scores_20() {
        let cases = vec!["B2B SaaS mid-market".to_string(), "Enterprise Software".to_string()];
        assert_eq!(score_industry("B2B SaaS mid-market", &cases), 20);
    }

    #[test]
    fn industry_partial_match_scores_10() {
        let cases = vec!["B2B SaaS mid-market".to_string(), "Enterprise Software".to_string()];
        assert_eq!(score_industry("B2B SaaS", &cases), 10);
        assert_eq!(score_industry("SaaS Company", &cases), 10);
        assert_eq!(score_industry("Enterprise", &cases), 10);
    }

    #[test]
    fn industry_no_match_scores_0() {
        let cases = vec!["B2B SaaS mid-market".to_string(), "Enterprise Software".to_string()];
        assert_eq!(score_industry("Healthcare", &cases), 0);
        assert_eq!(score_industry("Retail", &cases), 0);
    }

    #[test]
    fn completeness_is_all_or_nothing() {
        let complete = lead("John Doe", "CEO", "SaaS", "Experienced CEO");
        assert_eq!(score_completeness(&complete), 10);

        let mut incomplete = complete.clone();
        incomplete.linkedin_bio = "".into();
        assert_eq!(score_completeness(&incomplete), 0);
    }

    #[test]
    fn high_quality_lead_scores_50() {
        let l = lead(
            "Jane Smith",
            "VP of Sales",
            "B2B SaaS mid-market",
            "Sales leader with 10 years experience",
        );
        assert_eq!(rule_score(&l, &offer()), 50);
    }

    #[test]
    fn medium_quality_lead_scores_30() {
        let l = lead("Bob Johnson", "Sales Manager", "SaaS", "Sales professional");
        assert_eq!(rule_score(&l, &offer()), 30);
    }

    #[test]
    fn rule_score_never_exceeds_cap() {
        let l = lead("Test", "CEO", "B2B SaaS mid-market", "Bio");
        assert!(rule_score(&l, &offer()) <= RULE_SCORE_CAP);
    }
}
