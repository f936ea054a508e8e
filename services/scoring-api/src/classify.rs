//! AI classifier adapter: prompt construction, response parsing and the
//! fallback policy.
//!
//! The adapter never surfaces an error to its caller. A dead classifier
//! degrades to Low intent, an unreadable answer to Medium: a garbled
//! response is treated as neutral, a total failure pessimistically.

use futures::future::join_all;
use shared::dto::{AiClassification, Intent, Lead, Offer};
use shared::llm::TextGenerator;
use shared::llm_json::parse_relaxed;
use tracing::{error, warn};

/// Upper bound on concurrent classifier calls.
pub const AI_CHUNK_SIZE: usize = 10;

const CALL_FAILURE_REASONING: &str = "AI classification unavailable, defaulted to Low intent.";
const PARSE_FAILURE_REASONING: &str = "Unable to parse AI response, defaulted to Medium intent.";
const DEFAULT_REASONING: &str = "AI analysis completed.";

/// Build the classification prompt for one (lead, offer) pair.
pub fn build_prompt(lead: &Lead, offer: &Offer) -> String {
    let bio = if lead.linkedin_bio.is_empty() {
        "Not provided"
    } else {
        &lead.linkedin_bio
    };
    format!(
        "You are an AI assistant specialized in B2B lead qualification and sales \
         intelligence. Your task is to analyze leads and determine their buying \
         intent for specific products or services.\n\n\
         Analyze this lead's buying intent for our product/offer:\n\n\
         PRODUCT/OFFER:\n\
         - Name: {}\n\
         - Value Propositions: {}\n\
         - Ideal Use Cases: {}\n\n\
         LEAD INFORMATION:\n\
         - Name: {}\n\
         - Role: {}\n\
         - Company: {}\n\
         - Industry: {}\n\
         - Location: {}\n\
         - LinkedIn Bio: {}\n\n\
         TASK:\n\
         Classify this lead's buying intent as High, Medium, or Low based on:\n\
         1. Role relevance to decision-making\n\
         2. Industry alignment with ideal use cases\n\
         3. Potential pain points this offer could solve\n\
         4. Likelihood of having budget authority\n\n\
         Respond ONLY in this exact JSON format (no additional text):\n\
         {{\n  \"intent\": \"High|Medium|Low\",\n  \"reasoning\": \"One concise sentence explaining the classification\"\n}}",
        offer.name,
        offer.value_props.join(", "),
        offer.ideal_use_cases.join(", "),
        lead.name,
        lead.role,
        lead.company,
        lead.industry,
        lead.location,
        bio,
    )
}

/// Turn raw model text into a classification, substituting the Medium
/// fallback when the text is unparseable or carries an unknown intent.
pub fn parse_classification(text: &str) -> AiClassification {
    let value = match parse_relaxed(text) {
        Ok(v) => v,
        Err(e) => {
            warn!(%e, "unparseable classifier response");
            return AiClassification {
                intent: Intent::Medium,
                reasoning: PARSE_FAILURE_REASONING.into(),
            };
        }
    };
    let intent = value
        .get("intent")
        .and_then(|v| v.as_str())
        .and_then(Intent::parse)
        .unwrap_or(Intent::Medium);
    let reasoning = value
        .get("reasoning")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_REASONING)
        .to_string();
    AiClassification { intent, reasoning }
}

/// Classify one lead against the offer. Always returns a valid
/// classification; see the module docs for the fallback policy.
pub async fn classify(
    generator: &dyn TextGenerator,
    lead: &Lead,
    offer: &Offer,
) -> AiClassification {
    let prompt = build_prompt(lead, offer);
    match generator.generate(&prompt).await {
        Ok(text) => parse_classification(&text),
        Err(e) => {
            error!(lead = %lead.name, %e, "AI classification failed");
            AiClassification {
                intent: Intent::Low,
                reasoning: CALL_FAILURE_REASONING.into(),
            }
        }
    }
}

/// Classify many leads: fixed-size chunks processed sequentially, full
/// parallelism within a chunk, output order equal to input order.
pub async fn classify_batch(
    generator: &dyn TextGenerator,
    leads: &[Lead],
    offer: &Offer,
) -> Vec<AiClassification> {
    let mut results = Vec::with_capacity(leads.len());
    for chunk in leads.chunks(AI_CHUNK_SIZE) {
        let futs = chunk.iter().map(|lead| classify(generator, lead, offer));
        results.extend(join_all(futs).await);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use shared::llm::LlmError;
    use std::time::Duration;
    use uuid::Uuid;

    struct Scripted(String);

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    #[async_trait]
    impl TextGenerator for Failing {
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            Err(LlmError::Network("connection refused".into()))
        }
    }

    /// Answers with the lead name embedded in the reasoning, after a delay
    /// that reverses completion order within a chunk.
    struct Jittered;

    #[async_trait]
    impl TextGenerator for Jittered {
        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            let name = prompt
                .lines()
                .find_map(|l| l.strip_prefix("- Name: lead-"))
                .and_then(|n| n.parse::<u64>().ok())
                .unwrap_or(0);
            tokio::time::sleep(Duration::from_millis((20 - name % 10) * 3)).await;
            Ok(format!(
                "{{\"intent\":\"High\",\"reasoning\":\"lead-{name}\"}}"
            ))
        }
    }

    fn offer() -> Offer {
        Offer {
            id: Uuid::new_v4(),
            name: "AI Outreach Automation".into(),
            value_props: vec!["24/7 outreach".into()],
            ideal_use_cases: vec!["B2B SaaS mid-market".into()],
            owner_id: "test-user".into(),
            created_at: Utc::now(),
        }
    }

    fn lead(name: &str) -> Lead {
        Lead {
            name: name.into(),
            role: "CEO".into(),
            company: "Acme".into(),
            industry: "SaaS".into(),
            location: "SF".into(),
            linkedin_bio: "bio".into(),
        }
    }

    #[test]
    fn prompt_embeds_offer_and_lead() {
        let p = build_prompt(&lead("Jane"), &offer());
        assert!(p.contains("AI Outreach Automation"));
        assert!(p.contains("24/7 outreach"));
        assert!(p.contains("B2B SaaS mid-market"));
        assert!(p.contains("- Name: Jane"));
        assert!(p.contains("\"intent\": \"High|Medium|Low\""));
    }

    #[test]
    fn empty_bio_renders_placeholder() {
        let mut l = lead("Jane");
        l.linkedin_bio = "".into();
        assert!(build_prompt(&l, &offer()).contains("LinkedIn Bio: Not provided"));
    }

    #[test]
    fn parses_fenced_response() {
        let c =
            parse_classification("```json\n{\"intent\":\"High\",\"reasoning\":\"strong fit\"}\n```");
        assert_eq!(c.intent, Intent::High);
        assert_eq!(c.reasoning, "strong fit");
    }

    #[test]
    fn unknown_intent_falls_back_to_medium_keeping_reasoning() {
        let c = parse_classification("{\"intent\":\"Extreme\",\"reasoning\":\"huh\"}");
        assert_eq!(c.intent, Intent::Medium);
        assert_eq!(c.reasoning, "huh");
    }

    #[test]
    fn missing_reasoning_gets_filler() {
        let c = parse_classification("{\"intent\":\"Low\"}");
        assert_eq!(c.intent, Intent::Low);
        assert_eq!(c.reasoning, DEFAULT_REASONING);
    }

    #[test]
    fn garbage_falls_back_to_medium() {
        let c = parse_classification("I think this lead looks great!");
        assert_eq!(c.intent, Intent::Medium);
        assert_eq!(c.reasoning, PARSE_FAILURE_REASONING);
    }

    #[tokio::test]
    async fn call_failure_degrades_to_low() {
        let c = classify(&Failing, &lead("Jane"), &offer()).await;
        assert_eq!(c.intent, Intent::Low);
        assert_eq!(c.reasoning, CALL_FAILURE_REASONING);
    }

    #[tokio::test]
    async fn malformed_output_never_raises() {
        for text in ["", "null", "[1,2]", "{\"intent\":7}", "```\nnope\n```"] {
            let c = classify(&Scripted(text.to_string()), &lead("X"), &offer()).await;
            assert!(matches!(c.intent, Intent::High | Intent::Medium | Intent::Low));
            assert!(!c.reasoning.is_empty());
        }
    }

    #[tokio::test]
    async fn batch_preserves_input_order_under_jitter() {
        let leads: Vec<Lead> = (0..25).map(|i| lead(&format!("lead-{i}"))).collect();
        let results = classify_batch(&Jittered, &leads, &offer()).await;
        assert_eq!(results.len(), 25);
        for (i, c) in results.iter().enumerate() {
            assert_eq!(c.reasoning, format!("lead-{i}"));
        }
    }
}
