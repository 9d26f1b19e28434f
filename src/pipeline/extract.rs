//! Extraction client: send one unit of work to the AI extraction service.
//!
//! This module is intentionally thin — it owns the HTTP exchange and the
//! mapping of transport failures onto [`FailureReason`], nothing else. All
//! interpretation of the response body lives in
//! [`crate::pipeline::normalize`], because the service's output is advisory:
//! an LLM sits behind the endpoint and nothing upstream enforces the schema.
//!
//! ## Failure semantics
//!
//! HTTP 429 is the one distinguished signal: the service's quota is gone and
//! further calls in this job are pointless, so it maps to the fatal
//! [`FailureReason::QuotaExhausted`]. Every other failure — network, non-2xx,
//! unparseable body — is scoped to the one unit and maps to a recoverable
//! reason. The client never retries; a caller wanting a retry resubmits the
//! unit as part of a new job.

use crate::error::{ExtractError, FailureReason};
use crate::pipeline::batch::{UnitPayload, WorkUnit};
use crate::record::RecordKind;
use futures::future::BoxFuture;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// The seam between the pipeline and the remote extraction service.
///
/// The orchestrator only ever talks to this trait, so tests inject scripted
/// fakes and the HTTP implementation stays the single place that knows about
/// transport details.
pub trait ExtractionBackend: Send + Sync {
    /// Extract candidate records from one unit of work.
    ///
    /// Returns the raw response JSON (expected, but not guaranteed, to be
    /// `{"questions": [...]}` or `{"jurors": [...]}`).
    fn extract<'a>(
        &'a self,
        unit: &'a WorkUnit,
        kind: RecordKind,
    ) -> BoxFuture<'a, Result<Value, FailureReason>>;
}

/// Build the JSON request body for one unit.
///
/// Image units send `imageBase64` + `pageNumber`; text units send
/// `textBatch` + `pageRange`. `recordKind` tells the service which schema
/// to target.
pub fn request_body(unit: &WorkUnit, kind: RecordKind) -> Value {
    let kind_name = match kind {
        RecordKind::Question => "question",
        RecordKind::Juror => "juror",
    };
    match &unit.payload {
        UnitPayload::Image(b64) => json!({
            "imageBase64": b64,
            "pageNumber": unit.first_page,
            "recordKind": kind_name,
        }),
        UnitPayload::Text(text) => json!({
            "textBatch": text,
            "pageRange": [unit.first_page, unit.last_page],
            "recordKind": kind_name,
        }),
    }
}

/// Production backend: POSTs units to the extraction endpoint over HTTPS.
pub struct HttpExtractionBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpExtractionBackend {
    /// Build a backend with a per-call timeout.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, ExtractError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExtractError::Internal(format!("HTTP client build failed: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    async fn call(&self, unit: &WorkUnit, kind: RecordKind) -> Result<Value, FailureReason> {
        let body = request_body(unit, kind);
        debug!(
            "Extracting pages {}-{} ({:?})",
            unit.first_page, unit.last_page, kind
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| FailureReason::RequestFailed(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            warn!("Extraction service returned 429 — quota exhausted");
            return Err(FailureReason::QuotaExhausted);
        }
        if !status.is_success() {
            return Err(FailureReason::ServiceError(status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FailureReason::MalformedResponse(e.to_string()))
    }
}

impl ExtractionBackend for HttpExtractionBackend {
    fn extract<'a>(
        &'a self,
        unit: &'a WorkUnit,
        kind: RecordKind,
    ) -> BoxFuture<'a, Result<Value, FailureReason>> {
        Box::pin(self.call(unit, kind))
    }
}
