// Form Service endpoints
//
// `GET <form>` returns server-rendered markup wrapped as `{html}`;
// `POST <form>` takes the multipart form body and answers with the
// success/errors envelope interpreted in `envelope.rs`.

use tracing::debug;

use crate::client::FormClient;
use crate::envelope::{FormEnvelope, SubmissionResult, failure_message, interpret_submission};
use crate::error::Error;
use crate::payload::FormPayload;

impl FormClient {
    /// Fetch a form fragment.
    ///
    /// Any failure (network, non-2xx, body without `html`) is reported as
    /// [`Error::FormLoad`]; there is no retry.
    pub async fn fetch_form(&self, path: &str) -> Result<String, Error> {
        let url = self.resolve(path)?;
        debug!("GET {}", url);

        let form_load = |reason: String| Error::FormLoad {
            url: url.to_string(),
            reason,
        };

        let resp = Self::background(self.http().get(url.clone()))
            .send()
            .await
            .map_err(|e| form_load(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| form_load(e.to_string()))?;

        if !status.is_success() {
            let json = serde_json::from_str(&body).ok();
            return Err(form_load(failure_message(status, json.as_ref())));
        }

        let envelope: FormEnvelope = serde_json::from_str(&body)
            .map_err(|e| form_load(format!("malformed form response: {e}")))?;

        envelope
            .html
            .ok_or_else(|| form_load("response has no html field".into()))
    }

    /// Submit a form as multipart, attaching the CSRF token if known.
    ///
    /// Never fails: network errors become
    /// [`SubmissionResult::TransportError`] so the caller handles a single
    /// result type.
    pub async fn submit_form(
        &self,
        path: &str,
        payload: &FormPayload,
        csrf: Option<&str>,
    ) -> SubmissionResult {
        let url = match self.resolve(path) {
            Ok(url) => url,
            Err(e) => {
                return SubmissionResult::TransportError {
                    message: e.to_string(),
                };
            }
        };
        debug!(fields = payload.len(), "POST {}", url);

        let builder = Self::background(self.http().post(url)).multipart(payload.to_multipart());
        let resp = match Self::apply_csrf(builder, csrf).send().await {
            Ok(resp) => resp,
            Err(e) => {
                return SubmissionResult::TransportError {
                    message: e.to_string(),
                };
            }
        };

        let status = resp.status();
        match resp.text().await {
            Ok(body) => interpret_submission(status, &body),
            Err(e) => SubmissionResult::TransportError {
                message: e.to_string(),
            },
        }
    }
}
