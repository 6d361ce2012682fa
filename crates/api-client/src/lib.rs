//! # API Client
//!
//! HTTP implementations of the consultation collaborators.
//!
//! [`HttpCollaborator`] implements both [`ConsultationStore`] and [`AttachmentStorage`] against
//! the `api-rest` server, so a [`ConsultationClient`](consult_core::ConsultationClient) can run
//! its submit, list and review flows over the network exactly as it does locally.
//!
//! Status handling:
//! - `401` becomes [`ConsultError::AuthExpired`], which the client turns into a session
//!   invalidation
//! - `404` becomes [`ConsultError::NotFound`]
//! - any other non-2xx, and transport failures, become [`ConsultError::Collaborator`] carrying
//!   the server's `message`

#![warn(rust_2018_idioms)]

pub mod session;

pub use session::TokenFileSession;

use api_shared::{routes, ErrorRes, MarkReviewedReq};
use consult_core::repositories::{AttachmentStorage, ConsultationStore};
use consult_core::session::CredentialsProvider;
use consult_core::{
    Attachment, ConsultError, ConsultResult, ConsultationPayload, ConsultationRecord,
    ReviewField, StoredName, UploadFile, UuidService, ValidationError,
};
use consult_files::GENERIC_BINARY_TYPE;
use reqwest::{multipart, RequestBuilder, Response, StatusCode};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Status reported when the server could not be reached at all.
const UNREACHABLE_STATUS: u16 = 503;

/// Talks to the consultation REST API with the bearer token supplied by `C`.
#[derive(Debug, Clone)]
pub struct HttpCollaborator<C> {
    http: reqwest::Client,
    base_url: String,
    credentials: C,
}

impl<C: CredentialsProvider> HttpCollaborator<C> {
    /// # Errors
    /// Returns a validation error if `base_url` is not an http(s) URL.
    pub fn new(base_url: &str, credentials: C) -> ConsultResult<Self> {
        let cleaned = base_url.trim().trim_end_matches('/');
        if !(cleaned.starts_with("http://") || cleaned.starts_with("https://")) {
            return Err(ValidationError::InvalidIdentifier(format!(
                "API URL must use http or https: '{}'",
                base_url
            ))
            .into());
        }

        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(transport_error)?;

        Ok(Self {
            http,
            base_url: cleaned.to_owned(),
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends `request` with the current bearer token and checks the status.
    ///
    /// Without a token nothing is sent and the call fails as unauthorised.
    async fn send(&self, request: RequestBuilder) -> ConsultResult<Response> {
        let token = self
            .credentials
            .bearer_token()
            .ok_or(ConsultError::AuthExpired)?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await
    }
}

async fn check_status(response: Response) -> ConsultResult<Response> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED => Err(ConsultError::AuthExpired),
        StatusCode::NOT_FOUND => {
            let body = response.text().await.unwrap_or_default();
            Err(ConsultError::NotFound(error_message(&body)))
        }
        status => {
            let body = response.text().await.unwrap_or_default();
            Err(ConsultError::Collaborator {
                status: status.as_u16(),
                detail: error_message(&body),
            })
        }
    }
}

/// The `message` of an [`ErrorRes`] body, or the raw body when it is something else.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorRes>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.trim().to_owned())
}

fn transport_error(err: reqwest::Error) -> ConsultError {
    ConsultError::Collaborator {
        status: err.status().map_or(UNREACHABLE_STATUS, |s| s.as_u16()),
        detail: err.to_string(),
    }
}

impl<C: CredentialsProvider> ConsultationStore for HttpCollaborator<C> {
    async fn create(
        &self,
        patient_id: &UuidService,
        payload: &ConsultationPayload,
    ) -> ConsultResult<ConsultationRecord> {
        let url = self.url(&routes::consultations(&patient_id.to_string()));
        let response = self.send(self.http.post(url).json(payload)).await?;
        response.json().await.map_err(transport_error)
    }

    async fn update(
        &self,
        patient_id: &UuidService,
        id: &UuidService,
        payload: &ConsultationPayload,
    ) -> ConsultResult<ConsultationRecord> {
        let url = self.url(&routes::consultation(&patient_id.to_string(), &id.to_string()));
        let response = self.send(self.http.put(url).json(payload)).await?;
        response.json().await.map_err(transport_error)
    }

    async fn delete(&self, patient_id: &UuidService, id: &UuidService) -> ConsultResult<()> {
        let url = self.url(&routes::consultation(&patient_id.to_string(), &id.to_string()));
        self.send(self.http.delete(url)).await?;
        Ok(())
    }

    /// Records are decoded one by one; an entry that does not decode is logged and skipped.
    async fn list(&self, patient_id: &UuidService) -> ConsultResult<Vec<ConsultationRecord>> {
        let url = self.url(&routes::consultations(&patient_id.to_string()));
        let response = self.send(self.http.get(url)).await?;
        let entries: Vec<serde_json::Value> = response.json().await.map_err(transport_error)?;

        Ok(entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(patient_id = %patient_id, "skipping undecodable consultation: {}", e);
                    None
                }
            })
            .collect())
    }

    async fn mark_reviewed(
        &self,
        patient_id: &UuidService,
        id: &UuidService,
        field: ReviewField,
    ) -> ConsultResult<()> {
        let url = self.url(&routes::consultation_reviewed(
            &patient_id.to_string(),
            &id.to_string(),
        ));
        let body = MarkReviewedReq {
            field: field.as_str().to_owned(),
        };
        self.send(self.http.put(url).json(&body)).await?;
        Ok(())
    }
}

impl<C: CredentialsProvider> AttachmentStorage for HttpCollaborator<C> {
    async fn upload(&self, file: &UploadFile) -> ConsultResult<Attachment> {
        let part = multipart::Part::bytes(file.bytes().to_vec())
            .file_name(file.original_name().as_str().to_owned());
        let form = multipart::Form::new().part(routes::UPLOAD_FIELD, part);

        let response = self
            .send(self.http.post(self.url(routes::ATTACHMENTS)).multipart(form))
            .await?;
        response.json().await.map_err(transport_error)
    }

    async fn download(&self, stored_name: &StoredName) -> ConsultResult<(Vec<u8>, String)> {
        let url = self.url(&routes::attachment(&stored_name.to_string()));
        let response = self.send(self.http.get(url)).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(GENERIC_BINARY_TYPE)
            .to_owned();
        let bytes = response.bytes().await.map_err(transport_error)?;
        Ok((bytes.to_vec(), content_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_rest::AppState;
    use api_shared::ApiToken;
    use chrono::NaiveDate;
    use consult_core::composer::FormData;
    use consult_core::highlight::{apply_highlighted, LabScope};
    use consult_core::session::InMemorySession;
    use consult_core::{AttachmentPolicy, ConsultationClient, CoreConfig, ReviewState};
    use std::sync::Arc;
    use tempfile::TempDir;

    const TOKEN: &str = "client-test-token";

    type Http = HttpCollaborator<Arc<InMemorySession>>;

    async fn spawn_server(tmp: &TempDir) -> String {
        let cfg = Arc::new(CoreConfig::with_data_dir(tmp.path().to_path_buf()));
        let state = AppState::new(cfg, ApiToken::new(TOKEN).unwrap()).unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, api_rest::router(state)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn session(token: &str) -> Arc<InMemorySession> {
        Arc::new(InMemorySession::new(Some(token.to_owned())))
    }

    fn client(
        base_url: &str,
        session: Arc<InMemorySession>,
    ) -> ConsultationClient<Http, Http, Arc<InMemorySession>> {
        let http = HttpCollaborator::new(base_url, session.clone()).unwrap();
        ConsultationClient::new(http.clone(), http, session, AttachmentPolicy::default())
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()
    }

    fn pdf(name: &str) -> UploadFile {
        UploadFile::new(name, b"%PDF-1.7".to_vec()).unwrap()
    }

    #[test]
    fn test_rejects_non_http_url() {
        let err = HttpCollaborator::new("ftp://example.org", session(TOKEN)).unwrap_err();
        assert!(err.is_validation());

        let ok = HttpCollaborator::new(" http://localhost:3000/ ", session(TOKEN)).unwrap();
        assert_eq!(ok.base_url(), "http://localhost:3000");
    }

    #[test]
    fn test_error_message_prefers_error_body() {
        assert_eq!(error_message(r#"{"message":"nope"}"#), "nope");
        assert_eq!(error_message("plain failure\n"), "plain failure");
    }

    #[tokio::test]
    async fn test_submit_list_review_delete_over_http() {
        let tmp = TempDir::new().unwrap();
        let base = spawn_server(&tmp).await;
        let client = client(&base, session(TOKEN));
        let patient = UuidService::new();

        let mut scope = LabScope::for_vocabulary();
        apply_highlighted(vec!["gluc"], &mut scope);
        let form = FormData::new()
            .with("visit_date", "2024-05-01")
            .with("reason", "Control de diabetes")
            .with("prescription", "Metformina")
            .with("GLUC", "126,5");

        let record = client
            .submit_new(&patient, &form, &scope, &[pdf("lab.pdf")], today())
            .await
            .unwrap();
        assert_eq!(record.attachments.len(), 1);

        let (bytes, mime) = client
            .download(&record.attachments[0].stored_name)
            .await
            .unwrap();
        assert_eq!(bytes, b"%PDF-1.7");
        assert_eq!(mime, "application/pdf");

        let views = client.list(&patient).await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].reason, "Control de diabetes");
        assert!(views[0].lab.rows().iter().any(|row| row.highlighted));

        let state = client.mark_reviewed(&record, "prescription").await.unwrap();
        assert_eq!(state, ReviewState::Reviewed);

        client.delete(&patient, &record.id).await.unwrap();
        assert!(client.list(&patient).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refused_token_invalidates_session() {
        let tmp = TempDir::new().unwrap();
        let base = spawn_server(&tmp).await;
        let session = session("stale-token");
        let client = client(&base, session.clone());

        let err = client.list(&UuidService::new()).await.unwrap_err();
        assert!(matches!(err, ConsultError::AuthExpired));
        assert!(!session.is_signed_in());
    }

    #[tokio::test]
    async fn test_missing_attachment_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let base = spawn_server(&tmp).await;
        let http = HttpCollaborator::new(&base, session(TOKEN)).unwrap();

        let err = http
            .download(&StoredName::generate("pdf").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ConsultError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_collaborator_error() {
        let http = HttpCollaborator::new("http://127.0.0.1:9", session(TOKEN)).unwrap();
        let err = http.list(&UuidService::new()).await.unwrap_err();
        assert!(matches!(err, ConsultError::Collaborator { .. }));
    }
}
