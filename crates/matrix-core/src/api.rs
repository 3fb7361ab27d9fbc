use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ApiError;

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

/// Body of a `/api/chat` response. Only `status` carries meaning; the
/// assistant's reply arrives later over the push channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub status: String,
}

impl ChatReply {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// The remote chat/voice service as seen by the chat widget.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Submit a message for processing.
    async fn chat(&self, message: &str) -> Result<ChatReply, ApiError>;

    async fn voice_start(&self) -> Result<(), ApiError>;

    async fn voice_stop(&self) -> Result<(), ApiError>;

    /// Diagnostic status blob, shape defined by the server.
    async fn status(&self) -> Result<serde_json::Value, ApiError>;
}

/// HTTP implementation of [`Backend`].
#[derive(Clone)]
pub struct MatrixClient {
    client: Client,
    base_url: Url,
}

impl MatrixClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Ok(Self {
            client: Client::new(),
            base_url: Url::parse(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    async fn post_empty(&self, path: &str) -> Result<(), ApiError> {
        let url = self.endpoint(path)?;
        let response = self.client.post(url).send().await?;

        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for MatrixClient {
    async fn chat(&self, message: &str) -> Result<ChatReply, ApiError> {
        let url = self.endpoint("/api/chat")?;

        let response = self
            .client
            .post(url)
            .json(&ChatRequest { message })
            .send()
            .await?;

        // The body decides success, even on a non-2xx status.
        let reply: ChatReply = response.json().await?;
        Ok(reply)
    }

    async fn voice_start(&self) -> Result<(), ApiError> {
        self.post_empty("/api/voice/start").await
    }

    async fn voice_stop(&self) -> Result<(), ApiError> {
        self.post_empty("/api/voice/stop").await
    }

    async fn status(&self) -> Result<serde_json::Value, ApiError> {
        let url = self.endpoint("/api/status")?;
        let response = self.client.get(url).send().await?;
        Ok(response.json().await?)
    }
}
