//! Wire protocol of the cloud OCR service.
//!
//! Every call is plain HTTP with Basic authentication (application id and
//! secret). Responses are small XML documents:
//!
//! ```xml
//! <response>
//!   <task id="..." status="Completed" resultUrl="https://..."/>
//! </response>
//! ```
//!
//! | Call                | Request                                            |
//! |---------------------|----------------------------------------------------|
//! | submit              | `POST /processImage?language=..&exportFormat=..`   |
//! | job status          | `GET  /getTaskStatus?taskId=..`                    |
//! | finished job list   | `GET  /listFinishedTasks`                          |
//! | download            | `GET  <resultUrl>` (no credentials)                |
//!
//! [`OcrTransport`] is the seam the client talks through; tests replace
//! [`HttpTransport`] with a scripted fake.

use crate::config::{CloudOcrConfig, ExportFormat};
use crate::error::AuditError;
use crate::output::{JobStatus, OcrJob};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Network operations the cloud OCR client needs.
#[async_trait]
pub trait OcrTransport: Send + Sync {
    /// Upload one page image and register a recognition job.
    async fn submit(
        &self,
        png: &[u8],
        language: &str,
        format: ExportFormat,
    ) -> Result<OcrJob, AuditError>;

    /// Current status of a single job.
    async fn job_status(&self, job_id: &str) -> Result<OcrJob, AuditError>;

    /// Every finished job on the account that has not been deleted yet.
    async fn list_finished(&self) -> Result<Vec<OcrJob>, AuditError>;

    /// Fetch the recognised result from a job's result URL.
    async fn download(&self, url: &str) -> Result<String, AuditError>;
}

/// [`OcrTransport`] over `reqwest`.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    application_id: String,
    secret: String,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .field("application_id", &self.application_id)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Build a transport from a validated configuration.
    pub fn new(config: &CloudOcrConfig) -> Result<Self, AuditError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AuditError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            application_id: config.application_id.clone().unwrap_or_default(),
            secret: config.secret.clone().unwrap_or_default(),
        })
    }

    fn url(&self, call: &str) -> String {
        format!("{}/{}", self.endpoint, call)
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &str) -> Result<String, AuditError> {
        let response = request
            .basic_auth(&self.application_id, Some(&self.secret))
            .send()
            .await
            .map_err(|e| AuditError::network(url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuditError::network(url, e))?;

        if !status.is_success() {
            return Err(AuditError::Network {
                url: url.to_string(),
                reason: format!("HTTP {}: {}", status, error_message(&body)),
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl OcrTransport for HttpTransport {
    async fn submit(
        &self,
        png: &[u8],
        language: &str,
        format: ExportFormat,
    ) -> Result<OcrJob, AuditError> {
        let url = self.url("processImage");
        debug!("Uploading {} bytes to {}", png.len(), url);
        let request = self
            .client
            .post(&url)
            .query(&[("language", language), ("exportFormat", format.as_param())])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(png.to_vec());
        let body = self.send(request, &url).await?;
        single_task(&body, &url)
    }

    async fn job_status(&self, job_id: &str) -> Result<OcrJob, AuditError> {
        let url = self.url("getTaskStatus");
        let request = self.client.get(&url).query(&[("taskId", job_id)]);
        let body = self.send(request, &url).await?;
        single_task(&body, &url)
    }

    async fn list_finished(&self) -> Result<Vec<OcrJob>, AuditError> {
        let url = self.url("listFinishedTasks");
        let body = self.send(self.client.get(&url), &url).await?;
        parse_tasks(&body, &url)
    }

    async fn download(&self, url: &str) -> Result<String, AuditError> {
        // Result URLs are pre-signed storage links; credentials are not sent.
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AuditError::network(url, e))?;
        let text = response
            .text()
            .await
            .map_err(|e| AuditError::network(url, e))?;
        Ok(text.trim_start_matches('\u{FEFF}').to_string())
    }
}

// ── Response XML ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ResponseXml {
    #[serde(rename = "task", default)]
    tasks: Vec<TaskXml>,
}

#[derive(Debug, Deserialize)]
struct TaskXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@status")]
    status: String,
    #[serde(rename = "@resultUrl", default)]
    result_url: Option<String>,
    #[serde(rename = "@error", default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorXml {
    #[serde(default)]
    message: Option<MessageXml>,
}

#[derive(Debug, Deserialize)]
struct MessageXml {
    #[serde(rename = "$text", default)]
    text: String,
}

/// Parse every `<task>` element of a service response.
pub fn parse_tasks(xml: &str, url: &str) -> Result<Vec<OcrJob>, AuditError> {
    let response: ResponseXml = quick_xml::de::from_str(xml).map_err(|e| AuditError::Parse {
        url: url.to_string(),
        detail: format!("malformed task XML: {e}"),
    })?;

    response
        .tasks
        .into_iter()
        .map(|task| {
            let status = map_status(&task.status).ok_or_else(|| AuditError::Parse {
                url: url.to_string(),
                detail: format!("unknown task status '{}'", task.status),
            })?;
            let mut job = OcrJob::new(task.id, status);
            job.result_url = task.result_url.filter(|u| !u.is_empty());
            job.failure_reason = match status {
                JobStatus::Failed => Some(task.error.unwrap_or(task.status)),
                _ => None,
            };
            Ok(job)
        })
        .collect()
}

/// Parse a response that must describe exactly one task.
fn single_task(xml: &str, url: &str) -> Result<OcrJob, AuditError> {
    let mut tasks = parse_tasks(xml, url)?;
    if tasks.len() != 1 {
        return Err(AuditError::Parse {
            url: url.to_string(),
            detail: format!("expected one task, found {}", tasks.len()),
        });
    }
    Ok(tasks.remove(0))
}

/// Map the service's task status vocabulary onto [`JobStatus`].
pub fn map_status(raw: &str) -> Option<JobStatus> {
    match raw {
        "Submitted" => Some(JobStatus::Submitted),
        "Queued" | "InProgress" => Some(JobStatus::Pending),
        "Completed" => Some(JobStatus::Finished),
        "ProcessingFailed" | "NotEnoughCredits" | "Deleted" => Some(JobStatus::Failed),
        _ => None,
    }
}

fn error_message(body: &str) -> String {
    quick_xml::de::from_str::<ErrorXml>(body)
        .ok()
        .and_then(|e| e.message)
        .map(|m| m.text)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://ocr.test/getTaskStatus";

    #[test]
    fn parses_completed_task() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<response>
  <task id="a1b2" registrationTime="2024-01-01T00:00:00Z" status="Completed"
        filesCount="1" credits="1" resultUrl="https://blob.test/a1b2.txt"/>
</response>"#;
        let job = single_task(xml, URL).unwrap();
        assert_eq!(job.id, "a1b2");
        assert_eq!(job.status, JobStatus::Finished);
        assert_eq!(job.result_url.as_deref(), Some("https://blob.test/a1b2.txt"));
        assert!(job.failure_reason.is_none());
    }

    #[test]
    fn failed_task_keeps_error_or_status() {
        let xml = r#"<response>
  <task id="x" status="ProcessingFailed" error="Image is too small"/>
  <task id="y" status="NotEnoughCredits"/>
</response>"#;
        let jobs = parse_tasks(xml, URL).unwrap();
        assert_eq!(jobs[0].failure_reason.as_deref(), Some("Image is too small"));
        assert_eq!(jobs[1].status, JobStatus::Failed);
        assert_eq!(jobs[1].failure_reason.as_deref(), Some("NotEnoughCredits"));
    }

    #[test]
    fn empty_list_parses() {
        assert!(parse_tasks("<response></response>", URL).unwrap().is_empty());
    }

    #[test]
    fn unknown_status_and_garbage_are_parse_errors() {
        let unknown = r#"<response><task id="x" status="Sleeping"/></response>"#;
        assert!(matches!(parse_tasks(unknown, URL), Err(AuditError::Parse { .. })));
        assert!(matches!(
            single_task("not xml at all <", URL),
            Err(AuditError::Parse { .. })
        ));
        assert!(matches!(
            single_task("<response></response>", URL),
            Err(AuditError::Parse { .. })
        ));
    }

    #[test]
    fn status_vocabulary() {
        assert_eq!(map_status("Queued"), Some(JobStatus::Pending));
        assert_eq!(map_status("InProgress"), Some(JobStatus::Pending));
        assert_eq!(map_status("Deleted"), Some(JobStatus::Failed));
        assert_eq!(map_status("completed"), None);
    }

    #[test]
    fn error_body_message_extracted() {
        let body = r#"<error><message language="english">Invalid application id</message></error>"#;
        assert_eq!(error_message(body), "Invalid application id");
        assert_eq!(error_message("plain failure"), "plain failure");
    }

    #[test]
    fn new_rejects_missing_credentials() {
        let config = CloudOcrConfig::default();
        assert!(matches!(
            HttpTransport::new(&config),
            Err(AuditError::Configuration(_))
        ));
    }
}
