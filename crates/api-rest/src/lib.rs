//! # API REST
//!
//! REST API for consultation records.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - Bearer token authentication on everything except `/health`
//! - Multipart attachment uploads and downloads
//! - OpenAPI/Swagger documentation
//!
//! Uses `api-shared` for route paths, DTOs and token checking, and `consult-core` for
//! persistence.

#![warn(rust_2018_idioms)]

mod error;

pub use error::ApiError;

use api_shared::{routes, ApiToken, ErrorRes, HealthRes, HealthService, MarkReviewedReq};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path as AxumPath, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use consult_core::{
    repositories::FsConsultationStore, ConsultError, ConsultationPayload, ConsultationRecord,
    CoreConfig, ReviewField, StoredName, UuidService,
};
use consult_files::{Attachment, FilesService, UploadFile};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Multipart framing allowance on top of the largest accepted file.
const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

/// Application state shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    cfg: Arc<CoreConfig>,
    store: FsConsultationStore,
    files: FilesService,
    token: ApiToken,
}

impl AppState {
    /// Builds the state over an existing data directory.
    ///
    /// # Errors
    /// Returns an error if the data directory does not exist.
    pub fn new(cfg: Arc<CoreConfig>, token: ApiToken) -> Result<Self, ConsultError> {
        let files = FilesService::new(cfg.data_dir())?;
        Ok(Self {
            store: FsConsultationStore::new(cfg.clone()),
            cfg,
            files,
            token,
        })
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_consultations,
        create_consultation,
        update_consultation,
        delete_consultation,
        mark_reviewed,
        upload_attachment,
        download_attachment,
    ),
    components(schemas(HealthRes, ErrorRes, MarkReviewedReq))
)]
struct ApiDoc;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let upload_limit = (state.cfg.attachment_policy().max_file_bytes + MULTIPART_OVERHEAD_BYTES)
        .try_into()
        .unwrap_or(usize::MAX);

    let protected = Router::new()
        .route(
            routes::CONSULTATIONS,
            get(list_consultations).post(create_consultation),
        )
        .route(
            routes::CONSULTATION,
            put(update_consultation).delete(delete_consultation),
        )
        .route(routes::CONSULTATION_REVIEWED, put(mark_reviewed))
        .route(
            routes::ATTACHMENTS,
            post(upload_attachment).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(routes::ATTACHMENT, get(download_attachment))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route(routes::HEALTH, get(health))
        .merge(protected)
        .merge(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn require_bearer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if let Err(e) = state.token.validate_header(header) {
        tracing::warn!(path = %req.uri().path(), "rejected request: {}", e);
        return Err(ApiError::Unauthorized(e));
    }
    Ok(next.run(req).await)
}

/// Decodes a payload body so that malformed JSON and a blank reason both answer 400.
fn decode_payload(body: &Bytes) -> Result<ConsultationPayload, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(e.to_string()))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint; does not require a token.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/patients/{patient_id}/consultations",
    params(("patient_id" = String, Path, description = "Patient identifier")),
    responses(
        (status = 200, description = "Consultations, newest visit first"),
        (status = 400, description = "Invalid patient identifier", body = ErrorRes),
        (status = 401, description = "Missing or invalid token", body = ErrorRes)
    )
)]
/// Lists a patient's consultations.
///
/// Documents that cannot be parsed are skipped rather than failing the whole list.
#[axum::debug_handler]
async fn list_consultations(
    State(state): State<AppState>,
    AxumPath(patient_id): AxumPath<String>,
) -> Result<Json<Vec<ConsultationRecord>>, ApiError> {
    let patient_id = UuidService::parse(&patient_id)?;
    Ok(Json(state.store.list_records(&patient_id)?))
}

#[utoipa::path(
    post,
    path = "/patients/{patient_id}/consultations",
    params(("patient_id" = String, Path, description = "Patient identifier")),
    responses(
        (status = 201, description = "Consultation created"),
        (status = 400, description = "Invalid payload", body = ErrorRes),
        (status = 401, description = "Missing or invalid token", body = ErrorRes)
    )
)]
/// Creates a consultation from a composed payload.
///
/// # Errors
/// Returns `400 Bad Request` if the body is not a valid payload, including a blank reason.
#[axum::debug_handler]
async fn create_consultation(
    State(state): State<AppState>,
    AxumPath(patient_id): AxumPath<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<ConsultationRecord>), ApiError> {
    let patient_id = UuidService::parse(&patient_id)?;
    let payload = decode_payload(&body)?;
    let record = state.store.create_record(&patient_id, &payload)?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    put,
    path = "/patients/{patient_id}/consultations/{id}",
    params(
        ("patient_id" = String, Path, description = "Patient identifier"),
        ("id" = String, Path, description = "Consultation identifier")
    ),
    responses(
        (status = 200, description = "Consultation replaced"),
        (status = 400, description = "Invalid payload", body = ErrorRes),
        (status = 404, description = "No such consultation", body = ErrorRes)
    )
)]
/// Replaces a consultation. Reviewed flags already set are kept.
#[axum::debug_handler]
async fn update_consultation(
    State(state): State<AppState>,
    AxumPath((patient_id, id)): AxumPath<(String, String)>,
    body: Bytes,
) -> Result<Json<ConsultationRecord>, ApiError> {
    let patient_id = UuidService::parse(&patient_id)?;
    let id = UuidService::parse(&id)?;
    let payload = decode_payload(&body)?;
    Ok(Json(state.store.update_record(&patient_id, &id, &payload)?))
}

#[utoipa::path(
    delete,
    path = "/patients/{patient_id}/consultations/{id}",
    params(
        ("patient_id" = String, Path, description = "Patient identifier"),
        ("id" = String, Path, description = "Consultation identifier")
    ),
    responses(
        (status = 204, description = "Consultation deleted"),
        (status = 404, description = "No such consultation", body = ErrorRes)
    )
)]
/// Deletes a consultation. Its attachments stay in storage.
#[axum::debug_handler]
async fn delete_consultation(
    State(state): State<AppState>,
    AxumPath((patient_id, id)): AxumPath<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let patient_id = UuidService::parse(&patient_id)?;
    let id = UuidService::parse(&id)?;
    state.store.delete_record(&patient_id, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/patients/{patient_id}/consultations/{id}/reviewed",
    params(
        ("patient_id" = String, Path, description = "Patient identifier"),
        ("id" = String, Path, description = "Consultation identifier")
    ),
    request_body = MarkReviewedReq,
    responses(
        (status = 204, description = "Field marked reviewed"),
        (status = 400, description = "Unknown field", body = ErrorRes),
        (status = 404, description = "No such consultation", body = ErrorRes)
    )
)]
/// Marks the prescription or order of a consultation as reviewed.
///
/// Marking a field that is already reviewed succeeds without change.
#[axum::debug_handler]
async fn mark_reviewed(
    State(state): State<AppState>,
    AxumPath((patient_id, id)): AxumPath<(String, String)>,
    Json(req): Json<MarkReviewedReq>,
) -> Result<StatusCode, ApiError> {
    let patient_id = UuidService::parse(&patient_id)?;
    let id = UuidService::parse(&id)?;
    let field: ReviewField = req.field.parse()?;
    state.store.mark_record_reviewed(&patient_id, &id, field)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/attachments",
    responses(
        (status = 201, description = "Attachment stored; body is its metadata"),
        (status = 400, description = "Rejected file or missing field", body = ErrorRes),
        (status = 413, description = "Request body too large")
    )
)]
/// Stores one file sent in the `file` field of a multipart body.
#[axum::debug_handler]
async fn upload_attachment(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Attachment>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some(routes::UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        let file = UploadFile::new(&file_name, bytes.to_vec())?;
        let attachment = state.files.store(state.cfg.attachment_policy(), &file)?;
        return Ok((StatusCode::CREATED, Json(attachment)));
    }

    Err(ApiError::BadRequest(format!(
        "missing multipart field '{}'",
        routes::UPLOAD_FIELD
    )))
}

#[utoipa::path(
    get,
    path = "/attachments/{stored_name}",
    params(("stored_name" = String, Path, description = "Stored name, `<uuid>.<ext>`")),
    responses(
        (status = 200, description = "Attachment bytes"),
        (status = 400, description = "Malformed stored name", body = ErrorRes),
        (status = 404, description = "No such attachment", body = ErrorRes)
    )
)]
/// Returns the bytes of a stored attachment with its MIME type.
#[axum::debug_handler]
async fn download_attachment(
    State(state): State<AppState>,
    AxumPath(stored_name): AxumPath<String>,
) -> Result<Response, ApiError> {
    let stored_name = StoredName::parse(&stored_name)?;
    let (bytes, content_type) = state.files.read(&stored_name)?;
    let disposition = format!("inline; filename=\"{}\"", stored_name);
    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
