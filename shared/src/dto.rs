use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tri-state buying-likelihood label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    High,
    Medium,
    Low,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::High => "High",
            Intent::Medium => "Medium",
            Intent::Low => "Low",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "High" => Some(Intent::High),
            "Medium" => Some(Intent::Medium),
            "Low" => Some(Intent::Low),
            _ => None,
        }
    }
}

/// Canonical sanitized prospect record. All fields are trimmed strings;
/// absent input values become "".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub linkedin_bio: String,
}

/// Product/service description the scoring is framed against.
/// Both list fields must hold at least one entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: Uuid,
    pub name: String,
    pub value_props: Vec<String>,
    pub ideal_use_cases: Vec<String>,
    #[serde(rename = "ownerId")]
    pub owner_id: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Ephemeral classifier verdict for one (lead, offer) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiClassification {
    pub intent: Intent,
    pub reasoning: String,
}

/// Fused score for one lead. Invariants: `score == rule_score + ai_score`,
/// `rule_score <= 50`, `ai_score` is one of 10/30/50.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringResult {
    #[serde(flatten)]
    pub lead: Lead,
    pub intent: Intent,
    pub score: i32,
    pub reasoning: String,
    #[serde(rename = "ruleScore")]
    pub rule_score: i32,
    #[serde(rename = "aiScore")]
    pub ai_score: i32,
}

/// Persisted scoring result, tagged with its owner, offer and batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredLeadRecord {
    #[serde(flatten)]
    pub result: ScoringResult,
    #[serde(rename = "ownerId")]
    pub owner_id: String,
    #[serde(rename = "offerId")]
    pub offer_id: Uuid,
    #[serde(rename = "batchId")]
    pub batch_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchState {
    Processing,
    Completed,
    Failed,
}

impl BatchState {
    pub fn as_str(self) -> &'static str {
        match self {
            BatchState::Processing => "processing",
            BatchState::Completed => "completed",
            BatchState::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(BatchState::Processing),
            "completed" => Some(BatchState::Completed),
            "failed" => Some(BatchState::Failed),
            _ => None,
        }
    }
}

/// Orchestrator-maintained lifecycle state of one scoring batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStatus {
    pub state: BatchState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchStatus {
    pub fn processing() -> Self {
        Self {
            state: BatchState::Processing,
            error: None,
        }
    }

    pub fn completed() -> Self {
        Self {
            state: BatchState::Completed,
            error: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            state: BatchState::Failed,
            error: Some(reason.into()),
        }
    }
}
