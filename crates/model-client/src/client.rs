//! gRPC client for the inference sidecar.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tonic::transport::{Channel, Endpoint};
use tonic::Streaming;
use tracing::{debug, error, info};

use crate::inference::{
    inference_client::InferenceClient as GrpcInferenceClient, ChatMessage, EmbedRequest,
    GenerateChunk, GenerateRequest,
};
use crate::{
    EmbeddingBackend, GenerationBackend, GenerationRequest, ModelClientError, TextSender,
    TextStream,
};

/// Tunables for [`InferenceClient`]
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub connect_timeout: Duration,
    /// Upper bound on a single embedding call
    pub embed_timeout: Duration,
    /// Upper bound on waiting for a generation stream to start
    pub generate_timeout: Duration,
    /// Model name sent with every embedding request
    pub embedding_model: String,
    /// Chunks buffered between the gRPC stream and the consumer
    pub stream_buffer: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            embed_timeout: Duration::from_secs(10),
            generate_timeout: Duration::from_secs(60),
            embedding_model: "text-embedding-ada-002".to_string(),
            stream_buffer: 32,
        }
    }
}

/// Client for the inference service.
///
/// This wraps the auto-generated gRPC client and implements both
/// [`EmbeddingBackend`] and [`GenerationBackend`]. Cloning is cheap: clones
/// share the underlying HTTP/2 channel.
#[derive(Clone)]
pub struct InferenceClient {
    client: GrpcInferenceClient<Channel>,
    service_addr: String,
    options: ClientOptions,
}

impl InferenceClient {
    /// Connect to the inference service.
    ///
    /// # Arguments
    /// * `addr` - Address of the gRPC service (e.g., "http://localhost:50051")
    /// * `options` - Timeouts and model selection
    pub async fn connect(addr: impl Into<String>, options: ClientOptions) -> Result<Self> {
        let addr = addr.into();
        info!("Connecting to inference service at {}", addr);

        let channel = Endpoint::from_shared(addr.clone())
            .context("Creating endpoint from address")?
            .connect_timeout(options.connect_timeout)
            .connect()
            .await
            .context("Connecting to inference service")?;

        Ok(Self {
            client: GrpcInferenceClient::new(channel),
            service_addr: addr,
            options,
        })
    }

    /// Create a client that connects on first use.
    ///
    /// Useful for tools that may never call the service; a bad address
    /// still fails here, an unreachable one fails on the first call.
    pub fn connect_lazy(addr: impl Into<String>, options: ClientOptions) -> Result<Self> {
        let addr = addr.into();
        let channel = Endpoint::from_shared(addr.clone())
            .context("Creating endpoint from address")?
            .connect_timeout(options.connect_timeout)
            .connect_lazy();

        Ok(Self {
            client: GrpcInferenceClient::new(channel),
            service_addr: addr,
            options,
        })
    }

    /// Get the address of the inference service this client is connected to.
    pub fn service_address(&self) -> &str {
        &self.service_addr
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }
}

#[async_trait]
impl EmbeddingBackend for InferenceClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelClientError> {
        debug!(chars = text.chars().count(), "Requesting embedding");
        let mut client = self.client.clone();
        let request = tonic::Request::new(EmbedRequest {
            text: text.to_string(),
            model: self.options.embedding_model.clone(),
        });

        let response = tokio::time::timeout(self.options.embed_timeout, client.embed(request))
            .await
            .map_err(|_| ModelClientError::Timeout(self.options.embed_timeout))?
            .map_err(|status| {
                error!("gRPC error while embedding: {}", status);
                ModelClientError::Embedding(status.to_string())
            })?;

        let embedding = response.into_inner().embedding;
        if embedding.is_empty() {
            return Err(ModelClientError::InvalidResponse(
                "Empty embedding returned".into(),
            ));
        }
        Ok(embedding)
    }
}

#[async_trait]
impl GenerationBackend for InferenceClient {
    async fn generate(&self, request: GenerationRequest) -> Result<TextStream, ModelClientError> {
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Starting generation stream"
        );
        let mut client = self.client.clone();
        let request = tonic::Request::new(GenerateRequest {
            messages: request
                .messages
                .into_iter()
                .map(|m| ChatMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content,
                })
                .collect(),
            model: request.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens.unwrap_or(0),
        });

        let response =
            tokio::time::timeout(self.options.generate_timeout, client.generate(request))
                .await
                .map_err(|_| ModelClientError::Timeout(self.options.generate_timeout))?
                .map_err(|status| {
                    error!("gRPC error while starting generation: {}", status);
                    ModelClientError::Generation(status.to_string())
                })?;

        let (sender, stream) = TextStream::channel(self.options.stream_buffer);
        tokio::spawn(pump_generation(response.into_inner(), sender));
        Ok(stream)
    }
}

/// Forward chunks from the gRPC stream until it ends, fails, or the
/// consumer goes away. Returning drops `upstream`, which cancels the RPC.
async fn pump_generation(mut upstream: Streaming<GenerateChunk>, sender: TextSender) {
    loop {
        tokio::select! {
            _ = sender.closed() => {
                debug!("Generation consumer dropped, cancelling upstream stream");
                return;
            }
            message = upstream.message() => match message {
                Ok(Some(chunk)) => {
                    if chunk.text.is_empty() {
                        continue;
                    }
                    if !sender.send_chunk(chunk.text).await {
                        debug!("Generation consumer dropped, cancelling upstream stream");
                        return;
                    }
                }
                Ok(None) => return,
                Err(status) => {
                    error!("Generation stream failed: {}", status);
                    sender
                        .fail(ModelClientError::Generation(status.to_string()))
                        .await;
                    return;
                }
            },
        }
    }
}
