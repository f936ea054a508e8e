//! HTTP service for offer management and background lead scoring.

mod auth;
mod classify;
mod export;
mod fusion;
mod orchestrator;
mod rules;
mod sanitize;
mod store;

use actix_cors::Cors;
use actix_multipart::Multipart;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use auth::AuthUser;
use chrono::Utc;
use futures_util::StreamExt as _;
use serde::Deserialize;
use serde_json::json;
use shared::config::Settings;
use shared::dto::{BatchState, Intent, Lead, Offer, ScoredLeadRecord};
use shared::error::{AppError, Result};
use shared::llm::{ChatGenerator, TextGenerator};
use std::sync::Arc;
use store::{LeadStore, PgStore, ResultFilter};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Clone)]
struct AppState {
    store: Arc<dyn LeadStore>,
    generator: Arc<dyn TextGenerator>,
    settings: Settings,
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "timestamp": Utc::now(),
    }))
}

#[derive(Debug, Deserialize)]
struct CreateOffer {
    name: String,
    #[serde(default)]
    value_props: Vec<String>,
    #[serde(default)]
    ideal_use_cases: Vec<String>,
}

async fn create_offer(
    user: AuthUser,
    state: web::Data<AppState>,
    body: web::Json<CreateOffer>,
) -> Result<HttpResponse> {
    let body = body.into_inner();
    if body.name.trim().is_empty() {
        return Err(AppError::Validation(
            "name is required and must be a non-empty string".into(),
        ));
    }
    if body.value_props.is_empty() || body.value_props.iter().any(|v| v.trim().is_empty()) {
        return Err(AppError::Validation(
            "value_props must be a non-empty array of strings".into(),
        ));
    }
    if body.ideal_use_cases.is_empty()
        || body.ideal_use_cases.iter().any(|v| v.trim().is_empty())
    {
        return Err(AppError::Validation(
            "ideal_use_cases must be a non-empty array of strings".into(),
        ));
    }

    let offer = Offer {
        id: Uuid::new_v4(),
        name: body.name.trim().to_string(),
        value_props: body.value_props,
        ideal_use_cases: body.ideal_use_cases,
        owner_id: user.user_id,
        created_at: Utc::now(),
    };
    state.store.create_offer(&offer).await?;
    info!(offer = %offer.id, name = %offer.name, "offer created");
    Ok(HttpResponse::Created().json(json!({ "success": true, "data": offer })))
}

async fn list_offers(user: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse> {
    let offers = state.store.list_offers(&user.user_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": offers })))
}

async fn get_offer(
    user: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let offer = state
        .store
        .find_offer(&user.user_id, path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Offer not found".into()))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": offer })))
}

/// Drain one multipart field into memory, enforcing the upload size cap.
async fn read_field_bytes(
    field: &mut actix_multipart::Field,
    max_bytes: usize,
) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk =
            chunk.map_err(|e| AppError::CsvParse(format!("Failed to read upload: {e}")))?;
        if bytes.len() + chunk.len() > max_bytes {
            return Err(AppError::Validation(
                "File exceeds the maximum upload size".into(),
            ));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Pull the CSV payload (field "file") and any text fields out of a
/// multipart body.
async fn read_multipart(
    mut payload: Multipart,
    max_bytes: usize,
) -> Result<(Option<Vec<u8>>, std::collections::HashMap<String, String>)> {
    let mut file = None;
    let mut fields = std::collections::HashMap::new();
    while let Some(field_res) = payload.next().await {
        let mut field =
            field_res.map_err(|e| AppError::CsvParse(format!("Invalid multipart body: {e}")))?;
        let name = field.name().to_string();
        let bytes = read_field_bytes(&mut field, max_bytes).await?;
        if name == "file" {
            file = Some(bytes);
        } else {
            let text = String::from_utf8(bytes)
                .map_err(|_| AppError::Validation(format!("field '{name}' is not valid text")))?;
            fields.insert(name, text);
        }
    }
    Ok((file, fields))
}

async fn upload_leads(
    _user: AuthUser,
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse> {
    let (file, _) = read_multipart(payload, state.settings.max_upload_bytes).await?;
    let bytes = file.ok_or_else(|| AppError::Validation("CSV file is required".into()))?;

    let leads = sanitize::parse_csv(&bytes)?;
    if leads.is_empty() {
        return Err(AppError::Validation("No valid leads found in CSV".into()));
    }
    if leads.len() > state.settings.max_leads_per_upload {
        return Err(AppError::Validation(format!(
            "Maximum {} leads allowed per upload",
            state.settings.max_leads_per_upload
        )));
    }

    let preview: Vec<&Lead> = leads.iter().take(5).collect();
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "leadsCount": leads.len(),
            "preview": preview,
        }
    })))
}

#[derive(Debug, Deserialize)]
struct ScoreRequest {
    #[serde(rename = "offerId")]
    offer_id: Uuid,
    #[serde(default)]
    leads: Vec<serde_json::Map<String, serde_json::Value>>,
}

/// Accepts either a JSON body or a multipart form with `offerId` + `file`.
async fn score_leads(
    user: AuthUser,
    state: web::Data<AppState>,
    req: HttpRequest,
    mut payload: web::Payload,
) -> Result<HttpResponse> {
    let content_type = req
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let (offer_id, leads) = if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::new(req.headers(), payload);
        let (file, fields) = read_multipart(multipart, state.settings.max_upload_bytes).await?;
        let offer_id = fields
            .get("offerId")
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or_else(|| AppError::Validation("offerId is required".into()))?;
        let bytes = file.ok_or_else(|| AppError::Validation("CSV file is required".into()))?;
        (offer_id, sanitize::parse_csv(&bytes)?)
    } else {
        let mut body = web::BytesMut::new();
        while let Some(chunk) = payload.next().await {
            let chunk =
                chunk.map_err(|e| AppError::Validation(format!("Failed to read body: {e}")))?;
            if body.len() + chunk.len() > state.settings.max_upload_bytes {
                return Err(AppError::Validation(
                    "Request body exceeds the maximum size".into(),
                ));
            }
            body.extend_from_slice(&chunk);
        }
        let request: ScoreRequest = serde_json::from_slice(&body)
            .map_err(|e| AppError::Validation(format!("Invalid request body: {e}")))?;
        (request.offer_id, sanitize::sanitize_rows(&request.leads))
    };

    let offer = state
        .store
        .find_offer(&user.user_id, offer_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Offer not found".into()))?;
    if leads.is_empty() {
        return Err(AppError::Validation("No leads provided".into()));
    }
    if leads.len() > state.settings.max_leads_per_upload {
        return Err(AppError::Validation(format!(
            "Maximum {} leads allowed per upload",
            state.settings.max_leads_per_upload
        )));
    }

    let leads_count = leads.len();
    let batch_id = orchestrator::run_batch(
        state.store.clone(),
        state.generator.clone(),
        user.user_id,
        offer,
        leads,
    );
    Ok(HttpResponse::Accepted().json(json!({
        "success": true,
        "message": "Scoring initiated. Use batchId to retrieve results.",
        "batchId": batch_id,
        "leadsCount": leads_count,
    })))
}

async fn score_status(
    user: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let batch_id = path.into_inner();
    let status = state.store.get_batch_status(&user.user_id, batch_id).await?;
    let count = state
        .store
        .count_scored_leads(&user.user_id, batch_id)
        .await?;

    // Batches recorded before the status table existed only have results.
    let status = match status {
        Some(s) => s,
        None if count > 0 => shared::dto::BatchStatus::completed(),
        None => return Err(AppError::NotFound("Batch not found".into())),
    };

    let mut data = json!({
        "batchId": batch_id,
        "state": status.state,
        "resultsCount": count,
    });
    if let Some(reason) = status.error {
        data["error"] = json!(reason);
    }
    if status.state == BatchState::Processing {
        data["message"] = json!("Scoring in progress, check back shortly.");
    }
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data })))
}

#[derive(Debug, Deserialize)]
struct ResultsQuery {
    #[serde(rename = "batchId")]
    batch_id: Option<Uuid>,
    #[serde(rename = "offerId")]
    offer_id: Option<Uuid>,
    intent: Option<String>,
}

fn intent_filter(raw: Option<&str>) -> Result<Option<Intent>> {
    match raw {
        None => Ok(None),
        Some(s) => Intent::parse(s)
            .map(Some)
            .ok_or_else(|| AppError::Validation("intent must be High, Medium or Low".into())),
    }
}

/// The owner id never leaves the service.
fn public_record(record: &ScoredLeadRecord) -> serde_json::Value {
    let mut value = json!(record);
    if let Some(obj) = value.as_object_mut() {
        obj.remove("ownerId");
    }
    value
}

async fn get_results(
    user: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<ResultsQuery>,
) -> Result<HttpResponse> {
    let filter = ResultFilter {
        owner_id: user.user_id,
        batch_id: query.batch_id,
        offer_id: query.offer_id,
        intent: intent_filter(query.intent.as_deref())?,
    };
    let records = state.store.find_scored_leads(&filter).await?;
    let data: Vec<serde_json::Value> = records.iter().map(public_record).collect();
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": data.len(),
        "data": data,
    })))
}

#[derive(Debug, Deserialize)]
struct ExportQuery {
    #[serde(rename = "batchId")]
    batch_id: Uuid,
}

async fn export_results(
    user: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<ExportQuery>,
) -> Result<HttpResponse> {
    let filter = ResultFilter {
        owner_id: user.user_id,
        batch_id: Some(query.batch_id),
        ..Default::default()
    };
    let records = state.store.find_scored_leads(&filter).await?;
    if records.is_empty() {
        return Err(AppError::NotFound("No results found for this batch".into()));
    }
    let csv = export::to_csv(&records)?;
    Ok(HttpResponse::Ok()
        .insert_header(("Content-Type", "text/csv"))
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=lead-scores-{}.csv", query.batch_id),
        ))
        .body(csv))
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health))
            .route("/offer", web::post().to(create_offer))
            .route("/offers", web::get().to(list_offers))
            .route("/offer/{id}", web::get().to(get_offer))
            .route("/leads/upload", web::post().to(upload_leads))
            .route("/score", web::post().to(score_leads))
            .route("/score/{batchId}/status", web::get().to(score_status))
            .route("/results", web::get().to(get_results))
            .route("/results/export", web::get().to(export_results)),
    );
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let settings = match Settings::new() {
        Ok(s) => s,
        Err(e) => {
            error!(%e, "failed to load configuration");
            std::process::exit(1);
        }
    };
    if settings.openai_api_key.is_empty() {
        warn!("OPENAI_API_KEY is not set; AI classification will fall back to Low intent");
    }
    if settings.jwt_secret == "secret-key" {
        warn!("JWT_SECRET is not set; using the built-in development secret");
        match auth::issue_token(&settings.jwt_secret, "dev-user") {
            Ok(token) => info!(%token, "development bearer token"),
            Err(e) => warn!(%e, "failed to issue development token"),
        }
    }

    let store = match PgStore::connect(&settings.database_url).await {
        Ok(s) => s,
        Err(e) => {
            error!(%e, "failed to connect to database");
            std::process::exit(1);
        }
    };
    if let Err(e) = store.ensure_schema().await {
        error!(%e, "failed to ensure database schema");
        std::process::exit(1);
    }

    let generator = match ChatGenerator::new(
        &settings.openai_api_base,
        &settings.openai_api_key,
        &settings.openai_model,
    ) {
        Ok(g) => g,
        Err(e) => {
            error!(%e, "failed to build chat client");
            std::process::exit(1);
        }
    };

    let state = AppState {
        store: Arc::new(store),
        generator: Arc::new(generator),
        settings: settings.clone(),
    };

    info!(addr = %settings.bind_addr, "scoring-api listening");
    let bind_addr = settings.bind_addr.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(settings.clone()))
            .configure(routes)
    })
    .bind(bind_addr)?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn health_reports_ok() {
        let resp = health().await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["status"], "ok");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn intent_filter_accepts_known_labels_only() {
        assert_eq!(intent_filter(None).unwrap(), None);
        assert_eq!(intent_filter(Some("High")).unwrap(), Some(Intent::High));
        assert!(intent_filter(Some("extreme")).is_err());
    }
}
