//! Persistence for offers, scored leads and batch status.

use async_trait::async_trait;
use shared::dto::{BatchStatus, Intent, Lead, Offer, ScoredLeadRecord, ScoringResult};
use shared::error::{AppError, Result};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use uuid::Uuid;

/// Filter for result queries. The owner always binds; everything else is
/// optional narrowing.
#[derive(Debug, Clone, Default)]
pub struct ResultFilter {
    pub owner_id: String,
    pub batch_id: Option<Uuid>,
    pub offer_id: Option<Uuid>,
    pub intent: Option<Intent>,
}

/// Store contract used by the handlers and the batch orchestrator.
#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn create_offer(&self, offer: &Offer) -> Result<()>;
    async fn find_offer(&self, owner_id: &str, offer_id: Uuid) -> Result<Option<Offer>>;
    async fn list_offers(&self, owner_id: &str) -> Result<Vec<Offer>>;

    async fn insert_scored_leads(&self, records: &[ScoredLeadRecord]) -> Result<u64>;
    async fn count_scored_leads(&self, owner_id: &str, batch_id: Uuid) -> Result<i64>;
    /// Matching records, sorted by score descending.
    async fn find_scored_leads(&self, filter: &ResultFilter) -> Result<Vec<ScoredLeadRecord>>;

    async fn set_batch_status(
        &self,
        owner_id: &str,
        batch_id: Uuid,
        status: &BatchStatus,
    ) -> Result<()>;
    async fn get_batch_status(&self, owner_id: &str, batch_id: Uuid)
        -> Result<Option<BatchStatus>>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .map_err(AppError::db)?;
        Ok(Self { pool })
    }

    /// Idempotent schema bootstrap.
    pub async fn ensure_schema(&self) -> Result<()> {
        for ddl in [
            r#"
            CREATE TABLE IF NOT EXISTS offers (
                id              uuid PRIMARY KEY,
                owner_id        text NOT NULL,
                name            text NOT NULL,
                value_props     jsonb NOT NULL,
                ideal_use_cases jsonb NOT NULL,
                created_at      timestamptz NOT NULL DEFAULT now()
            )
            "#,
            "CREATE INDEX IF NOT EXISTS offers_owner_idx ON offers (owner_id)",
            r#"
            CREATE TABLE IF NOT EXISTS scored_leads (
                id           bigserial PRIMARY KEY,
                owner_id     text NOT NULL,
                offer_id     uuid NOT NULL,
                batch_id     uuid NOT NULL,
                name         text NOT NULL,
                role         text NOT NULL,
                company      text NOT NULL,
                industry     text NOT NULL,
                location     text NOT NULL,
                linkedin_bio text NOT NULL DEFAULT '',
                intent       text NOT NULL,
                score        int  NOT NULL,
                reasoning    text NOT NULL,
                rule_score   int  NOT NULL,
                ai_score     int  NOT NULL,
                created_at   timestamptz NOT NULL DEFAULT now()
            )
            "#,
            "CREATE INDEX IF NOT EXISTS scored_leads_owner_batch_idx ON scored_leads (owner_id, batch_id)",
            "CREATE INDEX IF NOT EXISTS scored_leads_owner_offer_idx ON scored_leads (owner_id, offer_id)",
            r#"
            CREATE TABLE IF NOT EXISTS batches (
                batch_id   uuid PRIMARY KEY,
                owner_id   text NOT NULL,
                state      text NOT NULL,
                error      text,
                updated_at timestamptz NOT NULL DEFAULT now()
            )
            "#,
        ] {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(AppError::db)?;
        }
        Ok(())
    }
}

fn offer_from_row(row: &PgRow) -> Result<Offer> {
    let value_props: serde_json::Value = row.try_get("value_props").map_err(AppError::db)?;
    let ideal_use_cases: serde_json::Value =
        row.try_get("ideal_use_cases").map_err(AppError::db)?;
    Ok(Offer {
        id: row.try_get("id").map_err(AppError::db)?,
        owner_id: row.try_get("owner_id").map_err(AppError::db)?,
        name: row.try_get("name").map_err(AppError::db)?,
        value_props: serde_json::from_value(value_props).map_err(AppError::db)?,
        ideal_use_cases: serde_json::from_value(ideal_use_cases).map_err(AppError::db)?,
        created_at: row.try_get("created_at").map_err(AppError::db)?,
    })
}

fn record_from_row(row: &PgRow) -> Result<ScoredLeadRecord> {
    let intent_text: String = row.try_get("intent").map_err(AppError::db)?;
    let intent = Intent::parse(&intent_text)
        .ok_or_else(|| AppError::Database(format!("unknown intent '{intent_text}'")))?;
    Ok(ScoredLeadRecord {
        result: ScoringResult {
            lead: Lead {
                name: row.try_get("name").map_err(AppError::db)?,
                role: row.try_get("role").map_err(AppError::db)?,
                company: row.try_get("company").map_err(AppError::db)?,
                industry: row.try_get("industry").map_err(AppError::db)?,
                location: row.try_get("location").map_err(AppError::db)?,
                linkedin_bio: row.try_get("linkedin_bio").map_err(AppError::db)?,
            },
            intent,
            score: row.try_get("score").map_err(AppError::db)?,
            reasoning: row.try_get("reasoning").map_err(AppError::db)?,
            rule_score: row.try_get("rule_score").map_err(AppError::db)?,
            ai_score: row.try_get("ai_score").map_err(AppError::db)?,
        },
        owner_id: row.try_get("owner_id").map_err(AppError::db)?,
        offer_id: row.try_get("offer_id").map_err(AppError::db)?,
        batch_id: row.try_get("batch_id").map_err(AppError::db)?,
    })
}

#[async_trait]
impl LeadStore for PgStore {
    async fn create_offer(&self, offer: &Offer) -> Result<()> {
        sqlx::query(
            "INSERT INTO offers (id, owner_id, name, value_props, ideal_use_cases, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(offer.id)
        .bind(&offer.owner_id)
        .bind(&offer.name)
        .bind(serde_json::json!(offer.value_props))
        .bind(serde_json::json!(offer.ideal_use_cases))
        .bind(offer.created_at)
        .execute(&self.pool)
        .await
        .map_err(AppError::db)?;
        Ok(())
    }

    async fn find_offer(&self, owner_id: &str, offer_id: Uuid) -> Result<Option<Offer>> {
        let row = sqlx::query("SELECT * FROM offers WHERE id = $1 AND owner_id = $2")
            .bind(offer_id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::db)?;
        row.as_ref().map(offer_from_row).transpose()
    }

    async fn list_offers(&self, owner_id: &str) -> Result<Vec<Offer>> {
        let rows =
            sqlx::query("SELECT * FROM offers WHERE owner_id = $1 ORDER BY created_at DESC")
                .bind(owner_id)
                .fetch_all(&self.pool)
                .await
                .map_err(AppError::db)?;
        rows.iter().map(offer_from_row).collect()
    }

    async fn insert_scored_leads(&self, records: &[ScoredLeadRecord]) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(AppError::db)?;
        for r in records {
            sqlx::query(
                "INSERT INTO scored_leads \
                 (owner_id, offer_id, batch_id, name, role, company, industry, location, \
                  linkedin_bio, intent, score, reasoning, rule_score, ai_score) \
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14)",
            )
            .bind(&r.owner_id)
            .bind(r.offer_id)
            .bind(r.batch_id)
            .bind(&r.result.lead.name)
            .bind(&r.result.lead.role)
            .bind(&r.result.lead.company)
            .bind(&r.result.lead.industry)
            .bind(&r.result.lead.location)
            .bind(&r.result.lead.linkedin_bio)
            .bind(r.result.intent.as_str())
            .bind(r.result.score)
            .bind(&r.result.reasoning)
            .bind(r.result.rule_score)
            .bind(r.result.ai_score)
            .execute(&mut *tx)
            .await
            .map_err(AppError::db)?;
        }
        tx.commit().await.map_err(AppError::db)?;
        Ok(records.len() as u64)
    }

    async fn count_scored_leads(&self, owner_id: &str, batch_id: Uuid) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM scored_leads WHERE owner_id = $1 AND batch_id = $2",
        )
        .bind(owner_id)
        .bind(batch_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::db)?;
        row.try_get("n").map_err(AppError::db)
    }

    async fn find_scored_leads(&self, filter: &ResultFilter) -> Result<Vec<ScoredLeadRecord>> {
        let mut qb =
            sqlx::QueryBuilder::new("SELECT * FROM scored_leads WHERE owner_id = ");
        qb.push_bind(&filter.owner_id);
        if let Some(batch_id) = filter.batch_id {
            qb.push(" AND batch_id = ").push_bind(batch_id);
        }
        if let Some(offer_id) = filter.offer_id {
            qb.push(" AND offer_id = ").push_bind(offer_id);
        }
        if let Some(intent) = filter.intent {
            qb.push(" AND intent = ").push_bind(intent.as_str());
        }
        qb.push(" ORDER BY score DESC");

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::db)?;
        rows.iter().map(record_from_row).collect()
    }

    async fn set_batch_status(
        &self,
        owner_id: &str,
        batch_id: Uuid,
        status: &BatchStatus,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO batches (batch_id, owner_id, state, error) VALUES ($1,$2,$3,$4) \
             ON CONFLICT (batch_id) \
             DO UPDATE SET state = EXCLUDED.state, error = EXCLUDED.error, updated_at = now()",
        )
        .bind(batch_id)
        .bind(owner_id)
        .bind(status.state.as_str())
        .bind(&status.error)
        .execute(&self.pool)
        .await
        .map_err(AppError::db)?;
        Ok(())
    }

    async fn get_batch_status(
        &self,
        owner_id: &str,
        batch_id: Uuid,
    ) -> Result<Option<BatchStatus>> {
        let row = sqlx::query(
            "SELECT state, error FROM batches WHERE batch_id = $1 AND owner_id = $2",
        )
        .bind(batch_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::db)?;
        let Some(row) = row else { return Ok(None) };
        let state_text: String = row.try_get("state").map_err(AppError::db)?;
        let state = shared::dto::BatchState::parse(&state_text)
            .ok_or_else(|| AppError::Database(format!("unknown batch state '{state_text}'")))?;
        Ok(Some(BatchStatus {
            state,
            error: row.try_get("error").map_err(AppError::db)?,
        }))
    }
}
