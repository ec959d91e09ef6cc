//! Turns a validated query into the vector the ranker scores against.
//!
//! Exactly one call to the embedding capability is made per query. With
//! [`QueryExpansion::IdealCourse`] the text that gets embedded is a
//! generated description of the course that would best answer the query.

use std::sync::Arc;

use model_client::{EmbeddingBackend, GenerationBackend, GenerationRequest, Message};
use tracing::{debug, warn};

use crate::config::QueryExpansion;
use crate::error::{EngineError, Result};
use crate::query::Query;

const IDEAL_COURSE_MAX_TOKENS: u32 = 300;

/// Generation settings used for query expansion
#[derive(Clone)]
struct Expansion {
    backend: Arc<dyn GenerationBackend>,
    model: String,
}

#[derive(Clone)]
pub struct QueryEmbedder {
    backend: Arc<dyn EmbeddingBackend>,
    dimension: usize,
    expansion: Option<Expansion>,
}

impl QueryEmbedder {
    /// Embed raw query text, expecting vectors of `dimension`
    pub fn new(backend: Arc<dyn EmbeddingBackend>, dimension: usize) -> Self {
        Self {
            backend,
            dimension,
            expansion: None,
        }
    }

    /// Expand queries into an ideal course description before embedding
    pub fn with_ideal_course(
        mut self,
        generator: Arc<dyn GenerationBackend>,
        model: impl Into<String>,
    ) -> Self {
        self.expansion = Some(Expansion {
            backend: generator,
            model: model.into(),
        });
        self
    }

    pub fn expansion(&self) -> QueryExpansion {
        match self.expansion {
            Some(_) => QueryExpansion::IdealCourse,
            None => QueryExpansion::Raw,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub async fn embed(&self, query: &Query) -> Result<Vec<f32>> {
        let text = match &self.expansion {
            Some(expansion) => self.ideal_course_description(expansion, query).await?,
            None => query.text().to_string(),
        };

        let vector = self.backend.embed(&text).await.map_err(|e| {
            warn!("Query embedding failed: {}", e);
            EngineError::EmbeddingUnavailable(e.to_string())
        })?;

        if vector.len() != self.dimension {
            return Err(EngineError::Configuration(format!(
                "embedding service returned dimension {}, catalog uses {}",
                vector.len(),
                self.dimension
            )));
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(EngineError::EmbeddingUnavailable(
                "embedding contains non-finite values".into(),
            ));
        }

        debug!(dimension = vector.len(), "Embedded query");
        Ok(vector)
    }

    async fn ideal_course_description(&self, expansion: &Expansion, query: &Query) -> Result<String> {
        let request = GenerationRequest {
            messages: vec![
                Message::system(ideal_course_prompt(query)),
                Message::user(query.text()),
            ],
            model: expansion.model.clone(),
            temperature: 0.0,
            max_tokens: Some(IDEAL_COURSE_MAX_TOKENS),
        };

        let description = expansion.backend.complete(request).await.map_err(|e| {
            warn!("Query expansion failed: {}", e);
            EngineError::GenerationUnavailable(e.to_string())
        })?;

        let description = description.trim();
        if description.is_empty() {
            return Err(EngineError::GenerationUnavailable(
                "query expansion returned no text".into(),
            ));
        }
        debug!(chars = description.len(), "Expanded query into course description");
        Ok(description.to_string())
    }
}

fn ideal_course_prompt(query: &Query) -> String {
    let mut prompt = String::from(
        "A university student describes what they want to study next. \
         Write the catalog description of the single course that would serve \
         them best: a short overview followed by a list of topics. \
         Keep it under 200 words.",
    );
    if !query.levels().is_empty() {
        let levels: Vec<String> = query.levels().iter().map(|l| l.to_string()).collect();
        prompt.push_str(&format!(
            " The course must be at one of these levels: {}.",
            levels.join(", ")
        ));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use model_client::{ModelClientError, TextStream};
    use std::sync::Mutex;

    struct StaticEmbedder {
        vector: Vec<f32>,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EmbeddingBackend for StaticEmbedder {
        async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ModelClientError> {
            self.seen.lock().unwrap().push(text.to_string());
            Ok(self.vector.clone())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingBackend for FailingEmbedder {
        async fn embed(&self, _text: &str) -> std::result::Result<Vec<f32>, ModelClientError> {
            Err(ModelClientError::Timeout(std::time::Duration::from_secs(10)))
        }
    }

    struct CannedGenerator {
        prompts: Mutex<Vec<GenerationRequest>>,
    }

    #[async_trait]
    impl GenerationBackend for CannedGenerator {
        async fn generate(
            &self,
            request: GenerationRequest,
        ) -> std::result::Result<TextStream, ModelClientError> {
            self.prompts.lock().unwrap().push(request);
            Ok(TextStream::from_chunks(["Topics: ", "compilers, ", "type systems"]))
        }
    }

    fn embedder(vector: Vec<f32>) -> Arc<StaticEmbedder> {
        Arc::new(StaticEmbedder {
            vector,
            seen: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_raw_query_is_embedded_as_is() {
        let backend = embedder(vec![0.1, 0.2, 0.3]);
        let embedder = QueryEmbedder::new(backend.clone(), 3);
        let query = Query::new("programming languages", [], 100).unwrap();

        let vector = embedder.embed(&query).await.unwrap();

        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
        assert_eq!(*backend.seen.lock().unwrap(), vec!["programming languages"]);
        assert_eq!(embedder.expansion(), QueryExpansion::Raw);
    }

    #[tokio::test]
    async fn test_backend_failure_is_embedding_unavailable() {
        let embedder = QueryEmbedder::new(Arc::new(FailingEmbedder), 3);
        let query = Query::new("anything", [], 100).unwrap();

        assert!(matches!(
            embedder.embed(&query).await,
            Err(EngineError::EmbeddingUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_configuration_error() {
        let embedder = QueryEmbedder::new(embedder(vec![1.0, 0.0]), 1536);
        let query = Query::new("anything", [], 100).unwrap();

        assert!(matches!(
            embedder.embed(&query).await,
            Err(EngineError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_non_finite_vector_rejected() {
        let embedder = QueryEmbedder::new(embedder(vec![f32::NAN, 0.0]), 2);
        let query = Query::new("anything", [], 100).unwrap();

        assert!(matches!(
            embedder.embed(&query).await,
            Err(EngineError::EmbeddingUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_ideal_course_expansion_embeds_generated_text() {
        let backend = embedder(vec![1.0, 0.0]);
        let generator = Arc::new(CannedGenerator {
            prompts: Mutex::new(Vec::new()),
        });
        let embedder =
            QueryEmbedder::new(backend.clone(), 2).with_ideal_course(generator.clone(), "gen-model");
        let query = Query::new("I want to build compilers", [400, 500], 100).unwrap();

        embedder.embed(&query).await.unwrap();

        let seen = backend.seen.lock().unwrap();
        assert_eq!(*seen, vec!["Topics: compilers, type systems"]);

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].model, "gen-model");
        assert!(prompts[0].messages[0].content.contains("400, 500"));
        assert_eq!(prompts[0].messages[1].content, "I want to build compilers");
    }
}
