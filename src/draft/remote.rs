//! HTTP client for the jobs API: draft store and inspection submission.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode, Url};
use serde::Deserialize;

use super::DraftStore;
use crate::error::{HandoverError, HandoverResult};
use crate::inspection::InspectionRecord;
use crate::session::Submitter;

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] header::InvalidHeaderValue),
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

impl From<ClientError> for HandoverError {
    fn from(err: ClientError) -> Self {
        HandoverError::storage(err.to_string())
    }
}

/// Response of the submission endpoint.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    /// Job status after the handover, e.g. "collected".
    #[serde(default)]
    pub status: Option<String>,
}

/// API client for inspection drafts and submissions
pub struct RemoteClient {
    client: Client,
    base_url: Url,
}

impl RemoteClient {
    /// Create a new client with the given base URL and auth token
    pub fn new(base_url: &str, token: &str) -> Result<Self, ClientError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", token))?,
        );

        let base_url = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self { client, base_url })
    }

    /// `{base}/api/v1/jobs/{job_id}/inspection[/draft]`, with the job id
    /// percent-encoded as a single path segment.
    fn inspection_url(&self, job_id: &str, draft: bool) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| ClientError::InvalidUrl(self.base_url.to_string()))?;
            segments
                .pop_if_empty()
                .extend(["api", "v1", "jobs", job_id, "inspection"]);
            if draft {
                segments.push("draft");
            }
        }
        Ok(url)
    }

    fn draft_url(&self, job_id: &str) -> Result<Url, ClientError> {
        self.inspection_url(job_id, true)
    }

    /// GET /api/v1/jobs/{id}/inspection/draft - Download draft bytes
    pub async fn get_draft(&self, job_id: &str) -> Result<Option<Vec<u8>>, ClientError> {
        let resp = self.client.get(self.draft_url(job_id)?).send().await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = check(resp).await?;
        Ok(Some(resp.bytes().await?.to_vec()))
    }

    /// PUT /api/v1/jobs/{id}/inspection/draft - Upload draft bytes
    pub async fn put_draft(&self, job_id: &str, data: Vec<u8>) -> Result<(), ClientError> {
        let resp = self
            .client
            .put(self.draft_url(job_id)?)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(data)
            .send()
            .await?;

        check(resp).await?;
        Ok(())
    }

    /// DELETE /api/v1/jobs/{id}/inspection/draft
    pub async fn delete_draft(&self, job_id: &str) -> Result<(), ClientError> {
        let resp = self.client.delete(self.draft_url(job_id)?).send().await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        check(resp).await?;
        Ok(())
    }

    /// POST /api/v1/jobs/{id}/inspection - Submit the finished record
    pub async fn submit_record(
        &self,
        job_id: &str,
        record: &InspectionRecord,
    ) -> Result<SubmitResponse, ClientError> {
        let url = self.inspection_url(job_id, false)?;
        let resp = self.client.post(url).json(record).send().await?;

        let resp = check(resp).await?;
        if resp.status() == StatusCode::NO_CONTENT {
            return Ok(SubmitResponse { status: None });
        }
        resp.json().await.map_err(Into::into)
    }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let message = resp.text().await.unwrap_or_default();
    Err(ClientError::Api { status, message })
}

#[async_trait]
impl DraftStore for RemoteClient {
    fn name(&self) -> &str {
        "remote"
    }

    async fn save(&self, job_id: &str, draft: &[u8]) -> HandoverResult<()> {
        Ok(self.put_draft(job_id, draft.to_vec()).await?)
    }

    async fn load(&self, job_id: &str) -> HandoverResult<Option<Vec<u8>>> {
        Ok(self.get_draft(job_id).await?)
    }

    async fn delete(&self, job_id: &str) -> HandoverResult<()> {
        Ok(self.delete_draft(job_id).await?)
    }
}

#[async_trait]
impl Submitter for RemoteClient {
    async fn submit(&self, job_id: &str, record: &InspectionRecord) -> HandoverResult<()> {
        let response = self
            .submit_record(job_id, record)
            .await
            .map_err(|e| HandoverError::submission(e.to_string()))?;
        tracing::info!(job_id, status = ?response.status, "inspection submitted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trimmed() {
        let client = RemoteClient::new("https://api.example.com/", "token").unwrap();
        assert_eq!(
            client.draft_url("job-1").unwrap().as_str(),
            "https://api.example.com/api/v1/jobs/job-1/inspection/draft"
        );
    }

    #[test]
    fn test_base_path_kept() {
        let client = RemoteClient::new("https://example.com/fleet", "token").unwrap();
        assert_eq!(
            client.inspection_url("job-1", false).unwrap().as_str(),
            "https://example.com/fleet/api/v1/jobs/job-1/inspection"
        );
    }

    #[test]
    fn test_job_id_encoded_as_one_segment() {
        let client = RemoteClient::new("https://api.example.com", "token").unwrap();
        let url = client.draft_url("JOB/2024/7?x#y").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/api/v1/jobs/JOB%2F2024%2F7%3Fx%23y/inspection/draft"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);

        let url = client.inspection_url("../admin", false).unwrap();
        assert_eq!(url.path(), "/api/v1/jobs/..%2Fadmin/inspection");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(matches!(
            RemoteClient::new("not a url", "token"),
            Err(ClientError::InvalidUrl(_))
        ));
        assert!(matches!(
            RemoteClient::new("mailto:ops@example.com", "token"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_invalid_token_rejected() {
        assert!(matches!(
            RemoteClient::new("https://api.example.com", "bad\ntoken"),
            Err(ClientError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_client_error_maps_to_storage() {
        let err: HandoverError = ClientError::Api {
            status: 503,
            message: "maintenance".into(),
        }
        .into();
        assert!(matches!(err, HandoverError::Storage(msg) if msg.contains("503")));
    }
}
