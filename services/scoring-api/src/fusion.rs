//! Fusion of the deterministic rule score with the AI classification.
//!
//! The AI contributes a numeric weight, not the final verdict: its label is
//! mapped to a fixed band and the final intent is recomputed from the total,
//! so the two labels can legitimately diverge.

use shared::dto::{AiClassification, Intent, Lead, ScoringResult};

/// Numeric band for the AI's qualitative label.
pub fn ai_score(intent: Intent) -> i32 {
    match intent {
        Intent::High => 50,
        Intent::Medium => 30,
        Intent::Low => 10,
    }
}

/// Final label from the combined total: >= 70 High, >= 40 Medium, else Low.
pub fn final_intent(total: i32) -> Intent {
    if total >= 70 {
        Intent::High
    } else if total >= 40 {
        Intent::Medium
    } else {
        Intent::Low
    }
}

/// Combine rule score and classification into the final scoring result.
pub fn fuse(lead: Lead, rule_score: i32, ai: AiClassification) -> ScoringResult {
    let ai_points = ai_score(ai.intent);
    let total = rule_score + ai_points;
    ScoringResult {
        lead,
        intent: final_intent(total),
        score: total,
        reasoning: ai.reasoning,
        rule_score,
        ai_score: ai_points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classification(intent: Intent) -> AiClassification {
        AiClassification {
            intent,
            reasoning: "because".into(),
        }
    }

    #[test]
    fn ai_bands() {
        assert_eq!(ai_score(Intent::High), 50);
        assert_eq!(ai_score(Intent::Medium), 30);
        assert_eq!(ai_score(Intent::Low), 10);
    }

    #[test]
    fn final_intent_boundaries() {
        assert_eq!(final_intent(39), Intent::Low);
        assert_eq!(final_intent(40), Intent::Medium);
        assert_eq!(final_intent(69), Intent::Medium);
        assert_eq!(final_intent(70), Intent::High);
    }

    #[test]
    fn score_is_sum_of_components() {
        for rule in [0, 10, 30, 50] {
            for intent in [Intent::High, Intent::Medium, Intent::Low] {
                let r = fuse(Lead::default(), rule, classification(intent));
                assert_eq!(r.score, r.rule_score + r.ai_score);
                assert!([10, 30, 50].contains(&r.ai_score));
            }
        }
    }

    #[test]
    fn ai_label_does_not_decide_final_intent() {
        // rule 50 + Medium(30) = 80 -> final High despite the AI saying Medium
        let r = fuse(Lead::default(), 50, classification(Intent::Medium));
        assert_eq!(r.score, 80);
        assert_eq!(r.intent, Intent::High);

        // rule 0 + High(50) = 50 -> final Medium despite the AI saying High
        let r = fuse(Lead::default(), 0, classification(Intent::High));
        assert_eq!(r.intent, Intent::Medium);
    }
}
