//! Client-side orchestration of consultation flows.
//!
//! [`ConsultationClient`] ties the composer, the review overlay and the two collaborators
//! together:
//!
//! - input is validated (reason, attachment batch) before any collaborator call
//! - attachments are uploaded one at a time, then the payload referencing them is submitted
//! - a second save from the same control while one is in flight is refused
//! - an unauthorised answer from any collaborator invalidates the session and is returned as
//!   [`ConsultError::AuthExpired`], whatever operation triggered it
//! - through [`ScopedClient`], a response that arrives after its UI scope is torn down is
//!   dropped instead of being handed back

use crate::composer::{compose, decompose, ConsultationView, FormData};
use crate::error::{ConsultError, ConsultResult, ValidationError};
use crate::highlight::LabScope;
use crate::record::{ConsultationPayload, ConsultationRecord};
use crate::repositories::{AttachmentStorage, ConsultationStore};
use crate::review::{review_status, BeginReview, ReviewField, ReviewOverlay, ReviewState};
use crate::session::{CredentialsProvider, ScopeToken, SubmitGuard};
use chrono::NaiveDate;
use consult_files::{Attachment, AttachmentPolicy, UploadFile};
use consult_uuid::{StoredName, UuidService};

pub struct ConsultationClient<S, A, C> {
    store: S,
    storage: A,
    credentials: C,
    policy: AttachmentPolicy,
    save_control: SubmitGuard,
    reviews: ReviewOverlay,
}

impl<S, A, C> ConsultationClient<S, A, C>
where
    S: ConsultationStore,
    A: AttachmentStorage,
    C: CredentialsProvider,
{
    pub fn new(store: S, storage: A, credentials: C, policy: AttachmentPolicy) -> Self {
        Self {
            store,
            storage,
            credentials,
            policy,
            save_control: SubmitGuard::new(),
            reviews: ReviewOverlay::new(),
        }
    }

    pub fn credentials(&self) -> &C {
        &self.credentials
    }

    /// Requests made through the returned handle answer `Ok(None)` once `scope` is dead.
    pub fn scoped(&self, scope: ScopeToken) -> ScopedClient<'_, S, A, C> {
        ScopedClient {
            client: self,
            scope,
        }
    }

    /// True while a create or edit submitted through this client is in flight.
    pub fn is_saving(&self) -> bool {
        self.save_control.is_busy()
    }

    /// Composes and creates a new consultation, uploading `pending` first.
    pub async fn submit_new(
        &self,
        patient_id: &UuidService,
        form: &FormData,
        scope: &LabScope,
        pending: &[UploadFile],
        today: NaiveDate,
    ) -> ConsultResult<ConsultationRecord> {
        let _permit = self
            .save_control
            .try_begin()
            .ok_or(ConsultError::SubmissionInProgress)?;

        let payload = self.prepare(form, scope, pending, today).await?;
        self.intercept(self.store.create(patient_id, &payload).await)
    }

    /// Composes and replaces an existing consultation.
    ///
    /// With no pending files the stored attachments are kept.
    pub async fn submit_edit(
        &self,
        patient_id: &UuidService,
        id: &UuidService,
        form: &FormData,
        scope: &LabScope,
        pending: &[UploadFile],
        today: NaiveDate,
    ) -> ConsultResult<ConsultationRecord> {
        let _permit = self
            .save_control
            .try_begin()
            .ok_or(ConsultError::SubmissionInProgress)?;

        let payload = self.prepare(form, scope, pending, today).await?;
        let record = self.intercept(self.store.update(patient_id, id, &payload).await)?;
        self.reviews.forget(id);
        Ok(record)
    }

    /// Validates and uploads a batch, one file at a time.
    ///
    /// A failed upload stops the batch; files already uploaded stay in storage unreferenced.
    pub async fn upload_batch(&self, files: &[UploadFile]) -> ConsultResult<Vec<Attachment>> {
        self.policy
            .validate_batch(files)
            .map_err(ValidationError::Attachment)?;

        let mut uploaded = Vec::with_capacity(files.len());
        for file in files {
            let attachment = self.intercept(self.storage.upload(file).await)?;
            tracing::debug!(stored_name = %attachment.stored_name, "uploaded attachment");
            uploaded.push(attachment);
        }
        Ok(uploaded)
    }

    /// Lists a patient's consultations, newest first, ready for display.
    pub async fn list(&self, patient_id: &UuidService) -> ConsultResult<Vec<ConsultationView>> {
        let records = self.intercept(self.store.list(patient_id).await)?;
        Ok(records.iter().map(|record| self.view(record)).collect())
    }

    /// Fetches one stored record, for flows that act on it such as [`Self::mark_reviewed`].
    pub async fn find(
        &self,
        patient_id: &UuidService,
        id: &UuidService,
    ) -> ConsultResult<ConsultationRecord> {
        let records = self.intercept(self.store.list(patient_id).await)?;
        records
            .into_iter()
            .find(|record| &record.id == id)
            .ok_or_else(|| ConsultError::NotFound(format!("consultation {}", id)))
    }

    /// Display form of one record, with review states taken from the local overlay.
    pub fn view(&self, record: &ConsultationRecord) -> ConsultationView {
        let mut view = decompose(record);
        for field in ReviewField::ALL {
            if let Some(action) = view.action_mut(field) {
                action.review = self
                    .reviews
                    .state(&record.id, field, record.is_reviewed(field));
            }
        }
        view
    }

    pub async fn delete(&self, patient_id: &UuidService, id: &UuidService) -> ConsultResult<()> {
        self.intercept(self.store.delete(patient_id, id).await)?;
        self.reviews.forget(id);
        Ok(())
    }

    /// Marks the named action field of `record` as reviewed.
    ///
    /// `field` must be `prescription` or `order` (any case). Marking a field that is already
    /// reviewed, or already being saved, returns its state without calling the collaborator.
    /// A failed save leaves the field in `SaveFailed` and returns the error.
    pub async fn mark_reviewed(
        &self,
        record: &ConsultationRecord,
        field: &str,
    ) -> ConsultResult<ReviewState> {
        let field: ReviewField = field.parse()?;
        if record.action_text(field).is_none() {
            return Err(ValidationError::NothingToReview(field).into());
        }

        match self
            .reviews
            .begin(&record.id, field, record.is_reviewed(field))
        {
            BeginReview::AlreadyDone(state) => return Ok(state),
            BeginReview::Started => {}
        }

        let result = self
            .store
            .mark_reviewed(&record.patient_id, &record.id, field)
            .await;
        match self.intercept(result) {
            Ok(()) => Ok(self.reviews.confirm(&record.id, field)),
            Err(e) => {
                self.reviews.fail(&record.id, field);
                Err(e)
            }
        }
    }

    /// Review state of a field as the user should see it; `None` when its text is blank.
    pub fn review_state(&self, record: &ConsultationRecord, field: ReviewField) -> Option<ReviewState> {
        review_status(record.action_text(field), record.is_reviewed(field))
            .map(|_| self.reviews.state(&record.id, field, record.is_reviewed(field)))
    }

    pub async fn download(&self, stored_name: &StoredName) -> ConsultResult<(Vec<u8>, String)> {
        self.intercept(self.storage.download(stored_name).await)
    }

    async fn prepare(
        &self,
        form: &FormData,
        scope: &LabScope,
        pending: &[UploadFile],
        today: NaiveDate,
    ) -> ConsultResult<ConsultationPayload> {
        let draft = compose(form, scope, Vec::new(), today)?;
        let attachments = self.upload_batch(pending).await?;
        Ok(ConsultationPayload {
            attachments,
            ..draft
        })
    }

    fn intercept<T>(&self, result: ConsultResult<T>) -> ConsultResult<T> {
        match &result {
            Err(ConsultError::AuthExpired) => {
                tracing::warn!("collaborator refused credentials; invalidating session");
                self.credentials.invalidate();
            }
            Err(ConsultError::Collaborator { status, detail }) => {
                tracing::error!(status, detail = %detail, "collaborator request failed");
            }
            _ => {}
        }
        result
    }
}

/// A [`ConsultationClient`] bound to the lifetime of one UI scope.
///
/// Session invalidation and the review overlay are updated as usual; only the answer to the
/// caller is withheld when the scope has gone.
pub struct ScopedClient<'c, S, A, C> {
    client: &'c ConsultationClient<S, A, C>,
    scope: ScopeToken,
}

impl<S, A, C> ScopedClient<'_, S, A, C>
where
    S: ConsultationStore,
    A: AttachmentStorage,
    C: CredentialsProvider,
{
    pub async fn list(
        &self,
        patient_id: &UuidService,
    ) -> ConsultResult<Option<Vec<ConsultationView>>> {
        self.settle(self.client.list(patient_id).await)
    }

    pub async fn submit_new(
        &self,
        patient_id: &UuidService,
        form: &FormData,
        scope: &LabScope,
        pending: &[UploadFile],
        today: NaiveDate,
    ) -> ConsultResult<Option<ConsultationRecord>> {
        let result = self
            .client
            .submit_new(patient_id, form, scope, pending, today)
            .await;
        self.settle(result)
    }

    pub async fn submit_edit(
        &self,
        patient_id: &UuidService,
        id: &UuidService,
        form: &FormData,
        scope: &LabScope,
        pending: &[UploadFile],
        today: NaiveDate,
    ) -> ConsultResult<Option<ConsultationRecord>> {
        let result = self
            .client
            .submit_edit(patient_id, id, form, scope, pending, today)
            .await;
        self.settle(result)
    }

    pub async fn mark_reviewed(
        &self,
        record: &ConsultationRecord,
        field: &str,
    ) -> ConsultResult<Option<ReviewState>> {
        self.settle(self.client.mark_reviewed(record, field).await)
    }

    fn settle<T>(&self, result: ConsultResult<T>) -> ConsultResult<Option<T>> {
        let mut delivered = None;
        self.scope.deliver(result, |r| delivered = Some(r));
        delivered.transpose()
    }
}
