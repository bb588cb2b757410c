use futures::future::BoxFuture;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use snafu::ResultExt;

use super::backend::{
    AssistantBackend, BackendConfig, CHAT_PATH, CLASSIFY_PATH, ChatReply, ChatRequest,
    Classification, HEALTH_PATH, HealthReport,
};
use super::error::{
    BackendResult, BuildClientSnafu, DecodeSnafu, InvalidMediaTypeSnafu, StatusSnafu,
    TransportSnafu,
};
use super::image::ImageFile;

/// Multipart field name the classification endpoint reads the upload from.
const CLASSIFY_FIELD_NAME: &str = "file";

/// [`AssistantBackend`] over plain HTTP.
///
/// No request timeout is configured: an in-flight call always runs to completion.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    config: BackendConfig,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> BackendResult<Self> {
        let client = reqwest::Client::builder().build().context(BuildClientSnafu {
            stage: "http-backend-new",
        })?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    async fn post_chat(&self, message: &str) -> BackendResult<ChatReply> {
        let url = self.config.endpoint(CHAT_PATH);
        tracing::debug!(url = %url, message_len = message.len(), "sending chat request");

        let response = self
            .client
            .post(&url)
            .header(ACCEPT, "application/json")
            .json(&ChatRequest { message })
            .send()
            .await
            .context(TransportSnafu {
                stage: "send-chat-request",
                url: url.as_str(),
            })?;

        Self::read_json(response, &url).await
    }

    async fn post_classify(&self, file: &ImageFile) -> BackendResult<Classification> {
        let url = self.config.endpoint(CLASSIFY_PATH);
        tracing::debug!(
            url = %url,
            file_name = %file.file_name,
            media_type = %file.media_type,
            size_bytes = file.size(),
            "sending classification request"
        );

        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(&file.media_type)
            .context(InvalidMediaTypeSnafu {
                stage: "build-classify-part",
                media_type: file.media_type.as_str(),
            })?;
        let form = Form::new().part(CLASSIFY_FIELD_NAME, part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .context(TransportSnafu {
                stage: "send-classify-request",
                url: url.as_str(),
            })?;

        Self::read_json(response, &url).await
    }

    async fn get_health(&self) -> BackendResult<HealthReport> {
        let url = self.config.endpoint(HEALTH_PATH);
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .context(TransportSnafu {
                stage: "send-health-request",
                url: url.as_str(),
            })?;

        Self::read_json(response, &url).await
    }

    async fn read_json<T>(response: reqwest::Response, url: &str) -> BackendResult<T>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        let payload = response.text().await.context(TransportSnafu {
            stage: "read-response-body",
            url,
        })?;

        if !status.is_success() {
            return StatusSnafu {
                stage: "check-response-status",
                url,
                status: status.as_u16(),
                body: payload,
            }
            .fail();
        }

        serde_json::from_str(&payload).context(DecodeSnafu {
            stage: "decode-response-json",
            url,
        })
    }
}

impl AssistantBackend for HttpBackend {
    fn chat<'a>(&'a self, message: &'a str) -> BoxFuture<'a, BackendResult<ChatReply>> {
        Box::pin(async move {
            self.post_chat(message).await.inspect_err(|error| {
                tracing::warn!(stage = error.stage(), error = %error, "chat request failed");
            })
        })
    }

    fn classify<'a>(&'a self, file: &'a ImageFile) -> BoxFuture<'a, BackendResult<Classification>> {
        Box::pin(async move {
            self.post_classify(file).await.inspect_err(|error| {
                tracing::warn!(
                    stage = error.stage(),
                    file_name = %file.file_name,
                    error = %error,
                    "classification request failed"
                );
            })
        })
    }

    fn health(&self) -> BoxFuture<'_, BackendResult<HealthReport>> {
        Box::pin(async move {
            self.get_health().await.inspect_err(|error| {
                tracing::warn!(stage = error.stage(), error = %error, "health probe failed");
            })
        })
    }
}
