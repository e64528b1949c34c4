use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::{ChatMessage, ChatRequest};
use crate::core::config::Config;
use crate::stream::{forward, format_api_error, SessionId, SourceEvent, SseChunkSource, StreamError};
use crate::utils::url::{construct_api_url, validate_base_url};

/// Opens streaming chat completions against an OpenAI-compatible endpoint.
#[derive(Clone, Debug)]
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
}

impl ChatClient {
    /// `timeout` bounds connecting and waiting for the response headers; the
    /// body may stream for as long as the server keeps sending.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StreamError> {
        validate_base_url(base_url).map_err(StreamError::Transport)?;
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|err| StreamError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key,
            model: model.into(),
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, StreamError> {
        Self::new(
            config.base_url(),
            config.api_key(),
            config.model(),
            config.request_timeout(),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> String {
        construct_api_url(&self.base_url, "chat/completions")
    }

    /// Send the request and hand back the response body as a chunk source.
    /// Non-2xx answers become [`StreamError::Api`] with the formatted body.
    pub async fn open(&self, messages: Vec<ChatMessage>) -> Result<SseChunkSource, StreamError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            stream: true,
        };

        let mut http_request = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(key) = &self.api_key {
            http_request = http_request.bearer_auth(key);
        }

        let response = match tokio::time::timeout(self.timeout, http_request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return Err(StreamError::Transport(err.to_string())),
            Err(_) => {
                return Err(StreamError::Transport(format!(
                    "no response within {}s",
                    self.timeout.as_secs()
                )))
            }
        };

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            debug!(status = %status, "Chat request rejected");
            return Err(StreamError::Api(format_api_error(&error_text)));
        }

        debug!(model = %self.model, "Chat stream opened");
        Ok(SseChunkSource::new(response.bytes_stream()))
    }
}

/// Runs chat requests on background tasks and delivers their raw events,
/// tagged with the session they belong to, over one channel.
#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<(SourceEvent, SessionId)>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(SourceEvent, SessionId)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_stream(
        &self,
        client: ChatClient,
        messages: Vec<ChatMessage>,
        session: SessionId,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let opened = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                opened = client.open(messages) => opened,
            };
            match opened {
                Ok(mut source) => forward(&mut source, session, &cancel, &tx).await,
                Err(error) => {
                    let _ = tx.send((SourceEvent::Error(error), session));
                }
            }
        })
    }

    #[cfg(test)]
    pub fn send_for_test(&self, event: SourceEvent, session: SessionId) {
        let _ = self.tx.send((event, session));
    }
}
