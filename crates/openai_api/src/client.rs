use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::debug;

use crate::config::OpenAiApiConfig;
use crate::error::{parse_error_message, OpenAiApiError};
use crate::headers::build_headers;
use crate::payload::{ResponsesRequest, TranscriptionRequest};
use crate::response::{ResponseReply, ResponseStatus, TranscriptionReply};
use crate::url::{responses_endpoint, transcription_endpoint};

#[derive(Debug)]
pub struct OpenAiApiClient {
    http: Client,
    config: OpenAiApiConfig,
}

impl OpenAiApiClient {
    pub fn new(config: OpenAiApiConfig) -> Result<Self, OpenAiApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(OpenAiApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &OpenAiApiConfig {
        &self.config
    }

    pub fn responses_endpoint(&self) -> String {
        responses_endpoint(&self.config.base_url)
    }

    pub fn transcription_endpoint(&self) -> String {
        transcription_endpoint(&self.config.base_url)
    }

    pub fn build_headers(&self, user_agent: Option<&str>) -> Result<HeaderMap, OpenAiApiError> {
        let headers = build_headers(&self.config, user_agent)?;
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
                    OpenAiApiError::InvalidHeader(format!("invalid header key: {key}"))
                })?,
                HeaderValue::from_str(&value).map_err(|_| {
                    OpenAiApiError::InvalidHeader(format!("invalid header value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    pub fn build_response_request(
        &self,
        request: &ResponsesRequest,
    ) -> Result<reqwest::RequestBuilder, OpenAiApiError> {
        validate_request_payload_shape(request)?;

        let headers = self.build_headers(self.config.user_agent.as_deref())?;
        Ok(self
            .http
            .post(self.responses_endpoint())
            .headers(headers)
            .json(request))
    }

    pub fn build_transcription_request(
        &self,
        request: &TranscriptionRequest,
    ) -> Result<reqwest::RequestBuilder, OpenAiApiError> {
        if request.bytes.is_empty() {
            return Err(OpenAiApiError::InvalidRequestPayload(
                "audio payload is empty".to_string(),
            ));
        }

        let headers = self.build_headers(self.config.user_agent.as_deref())?;
        let mut part = Part::bytes(request.bytes.clone()).file_name(request.filename.clone());
        if let Some(mime_type) = request.mime_type.as_deref() {
            part = part.mime_str(mime_type).map_err(|_| {
                OpenAiApiError::InvalidRequestPayload(format!(
                    "invalid audio MIME type: {mime_type}"
                ))
            })?;
        }
        let form = Form::new()
            .text("model", request.model.clone())
            .part("file", part);

        Ok(self
            .http
            .post(self.transcription_endpoint())
            .headers(headers)
            .multipart(form))
    }

    /// Sends one non-streaming Responses request and resolves the assistant text.
    ///
    /// Any terminal status other than `completed`, or a reply without output
    /// text, is reported as an error.
    pub async fn create_response(
        &self,
        request: &ResponsesRequest,
    ) -> Result<ResponseReply, OpenAiApiError> {
        debug!(
            model = %request.model,
            items = request.input.as_array().map_or(0, Vec::len),
            "sending responses request"
        );
        let response = self.build_response_request(request)?.send().await?;
        let body: Value = ensure_success(response).await?.json().await?;
        let reply = ResponseReply::from_value(&body);

        match reply.status {
            None | Some(ResponseStatus::Completed) => {}
            Some(status) => {
                return Err(OpenAiApiError::ResponseNotCompleted {
                    status,
                    message: reply.error_message,
                })
            }
        }

        if reply.output_text.is_empty() {
            return Err(OpenAiApiError::EmptyReply);
        }

        debug!(
            response_id = reply.id.as_deref().unwrap_or("-"),
            chars = reply.output_text.len(),
            "responses request completed"
        );
        Ok(reply)
    }

    /// Uploads audio bytes to the transcription endpoint and returns the transcript.
    pub async fn transcribe(
        &self,
        request: &TranscriptionRequest,
    ) -> Result<String, OpenAiApiError> {
        debug!(
            model = %request.model,
            filename = %request.filename,
            bytes = request.bytes.len(),
            "sending transcription request"
        );
        let response = self.build_transcription_request(request)?.send().await?;
        let reply: TranscriptionReply = ensure_success(response).await?.json().await?;
        Ok(reply.text)
    }
}

async fn ensure_success(response: Response) -> Result<Response, OpenAiApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_else(|_| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });
    Err(OpenAiApiError::Status(status, parse_error_message(status, &body)))
}

fn validate_request_payload_shape(request: &ResponsesRequest) -> Result<(), OpenAiApiError> {
    if request.input.is_array() {
        return Ok(());
    }

    Err(OpenAiApiError::InvalidRequestPayload(format!(
        "'input' must be a JSON array/list, got {}",
        value_type_name(&request.input)
    )))
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
