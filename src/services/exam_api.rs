use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use time::OffsetDateTime;

use crate::core::config::Settings;
use crate::exam::descriptor::ExamDescriptor;
use crate::schemas::exam::ExamDescriptorResponse;
use crate::schemas::submission::{
    SaveProgressRequest, StartExamResponse, SubmitAck, SubmitRequest,
};

#[async_trait]
pub trait ExamApi: Send + Sync {
    async fn fetch_descriptor(&self, exam_id: &str) -> Result<ExamDescriptor>;

    // The server owns the anytime start timestamp; a reload reconstructs
    // the same deadline instead of restarting the clock.
    async fn start_exam(&self, exam_id: &str) -> Result<OffsetDateTime>;

    async fn submit_answers(&self, request: SubmitRequest) -> Result<SubmitAck>;

    async fn save_progress(&self, request: SaveProgressRequest) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct HttpExamApi {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpExamApi {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api = settings.api();
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(api.connect_timeout_seconds))
            .timeout(Duration::from_secs(api.timeout_seconds))
            .build()
            .context("Failed to build exam API HTTP client")?;

        Ok(Self {
            client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            bearer_token: api.bearer_token.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self.client.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn read_json(response: reqwest::Response, what: &str) -> Result<Value> {
        let status = response.status();
        let raw_body =
            response.text().await.with_context(|| format!("Failed to read {what} response"))?;

        let parsed = serde_json::from_str::<Value>(&raw_body).map_err(|err| {
            anyhow::anyhow!("{what} returned non-JSON body (status {status}): {err}: {raw_body}")
        })?;

        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "{what} failed (status {status}): {}",
                extract_error_detail(&parsed)
            ));
        }

        Ok(parsed)
    }
}

#[async_trait]
impl ExamApi for HttpExamApi {
    async fn fetch_descriptor(&self, exam_id: &str) -> Result<ExamDescriptor> {
        let response = self
            .request(Method::GET, &format!("/exams/{exam_id}"))
            .send()
            .await
            .context("Failed to call exam descriptor endpoint")?;

        let payload = Self::read_json(response, "Descriptor fetch").await?;
        let dto: ExamDescriptorResponse =
            serde_json::from_value(payload).context("Failed to decode exam descriptor")?;

        Ok(dto.into_domain()?)
    }

    async fn start_exam(&self, exam_id: &str) -> Result<OffsetDateTime> {
        let response = self
            .request(Method::POST, &format!("/exams/{exam_id}/start"))
            .send()
            .await
            .context("Failed to call exam start endpoint")?;

        let payload = Self::read_json(response, "Exam start").await?;
        let dto: StartExamResponse =
            serde_json::from_value(payload).context("Failed to decode exam start response")?;

        Ok(dto.effective_start)
    }

    async fn submit_answers(&self, request: SubmitRequest) -> Result<SubmitAck> {
        let path = format!("/exams/{}/submissions", request.exam_id);

        let response = if request.attachments.is_empty() {
            self.request(Method::POST, &path).json(&request).send().await
        } else {
            let mut form = Form::new().text(
                "payload",
                serde_json::to_string(&request).context("Failed to encode submission payload")?,
            );
            for attachment in &request.attachments {
                let part = Part::bytes(attachment.bytes.clone())
                    .file_name(attachment.filename.clone())
                    .mime_str(&attachment.content_type)
                    .context("Invalid attachment content type")?;
                form = form.part("attachments", part);
            }
            self.request(Method::POST, &path).multipart(form).send().await
        }
        .context("Failed to call submission endpoint")?;

        let payload = Self::read_json(response, "Submission").await?;
        serde_json::from_value(payload).context("Failed to decode submission acknowledgment")
    }

    async fn save_progress(&self, request: SaveProgressRequest) -> Result<()> {
        let response = self
            .request(Method::POST, &format!("/exams/{}/progress", request.exam_id))
            .json(&request)
            .send()
            .await
            .context("Failed to call progress endpoint")?;

        Self::read_json(response, "Progress save").await?;
        Ok(())
    }
}

fn extract_error_detail(payload: &Value) -> String {
    if let Some(detail) = payload.get("detail") {
        if let Some(text) = detail.as_str() {
            return text.to_string();
        }
        if let Some(items) = detail.as_array() {
            let joined = items
                .iter()
                .filter_map(|item| {
                    item.get("msg")
                        .and_then(Value::as_str)
                        .or_else(|| item.get("message").and_then(Value::as_str))
                })
                .collect::<Vec<_>>()
                .join("; ");
            if !joined.is_empty() {
                return joined;
            }
        }
    }

    payload
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| payload.get("error").and_then(Value::as_str))
        .unwrap_or("unknown_error")
        .to_string()
}
