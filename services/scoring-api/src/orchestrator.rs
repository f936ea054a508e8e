//! Background batch scoring.
//!
//! A batch is accepted immediately and scored on a spawned task. Progress
//! is tracked in the batches table so callers can poll for completion.

use crate::classify;
use crate::fusion;
use crate::rules;
use crate::store::LeadStore;
use shared::dto::{BatchStatus, Lead, Offer, ScoredLeadRecord, ScoringResult};
use shared::llm::TextGenerator;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Leads scored concurrently per group.
pub const SCORING_GROUP_SIZE: usize = 5;

/// Score one lead end to end: rule score, AI classification, fusion.
pub async fn score_lead(
    generator: &dyn TextGenerator,
    lead: Lead,
    offer: &Offer,
) -> ScoringResult {
    let rule = rules::rule_score(&lead, offer);
    let ai = classify::classify(generator, &lead, offer).await;
    fusion::fuse(lead, rule, ai)
}

/// Score a whole batch in fixed-size groups. Groups run sequentially,
/// leads within a group in parallel; output order equals input order.
pub async fn score_batch(
    generator: &dyn TextGenerator,
    leads: Vec<Lead>,
    offer: &Offer,
) -> Vec<ScoringResult> {
    let total = leads.len();
    let mut results = Vec::with_capacity(total);
    for group in leads.chunks(SCORING_GROUP_SIZE) {
        let futs = group
            .iter()
            .map(|lead| score_lead(generator, lead.clone(), offer));
        results.extend(futures::future::join_all(futs).await);
        info!(scored = results.len(), total, "batch scoring progress");
    }
    results
}

/// Kick off scoring for a batch and return its id without waiting.
/// The spawned task records processing/completed/failed in the store.
pub fn run_batch(
    store: Arc<dyn LeadStore>,
    generator: Arc<dyn TextGenerator>,
    owner_id: String,
    offer: Offer,
    leads: Vec<Lead>,
) -> Uuid {
    let batch_id = Uuid::new_v4();
    tokio::spawn(async move {
        if let Err(e) = store
            .set_batch_status(&owner_id, batch_id, &BatchStatus::processing())
            .await
        {
            error!(%batch_id, %e, "failed to mark batch as processing");
        }

        info!(%batch_id, leads = leads.len(), offer = %offer.name, "batch scoring started");
        let results = score_batch(generator.as_ref(), leads, &offer).await;
        let records: Vec<ScoredLeadRecord> = results
            .into_iter()
            .map(|result| ScoredLeadRecord {
                result,
                owner_id: owner_id.clone(),
                offer_id: offer.id,
                batch_id,
            })
            .collect();

        match store.insert_scored_leads(&records).await {
            Ok(n) => {
                info!(%batch_id, inserted = n, "batch scoring completed");
                if let Err(e) = store
                    .set_batch_status(&owner_id, batch_id, &BatchStatus::completed())
                    .await
                {
                    error!(%batch_id, %e, "failed to mark batch as completed");
                }
            }
            Err(e) => {
                error!(%batch_id, %e, "failed to persist scored leads");
                let status = BatchStatus::failed(e.to_string());
                if let Err(e) = store.set_batch_status(&owner_id, batch_id, &status).await {
                    error!(%batch_id, %e, "failed to mark batch as failed");
                }
            }
        }
    });
    batch_id
}
