//! Mock inference backend for deterministic testing.
//!
//! Implements both [`EmbeddingBackend`] and [`GenerationBackend`] without a
//! network. Embeddings are derived from the text so equal inputs give equal
//! vectors; generation replies and retrieval decisions are scripted.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quire_inference::mock::MockBackend;
//!
//! let backend = MockBackend::new()
//!     .with_dimension(8)
//!     .with_reply("Paris")
//!     .with_answer_directly(false);
//!
//! let v = backend.embed("capital of France", EmbeddingTask::RetrievalQuery).await?;
//! assert_eq!(v.as_slice().len(), 8);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use quire_core::{
    ChatTurn, EmbeddingBackend, EmbeddingTask, Error, GenerationBackend, Result, Vector,
};

/// One recorded backend call.
#[derive(Debug, Clone)]
pub enum MockCall {
    Embed { text: String, task: EmbeddingTask },
    Generate { history: Vec<ChatTurn> },
    AnswerDirectly { history: Vec<ChatTurn> },
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<MockCall>,
    replies: VecDeque<String>,
    decisions: VecDeque<bool>,
}

#[derive(Debug, Clone)]
struct MockConfig {
    dimension: usize,
    default_reply: String,
    default_answer_directly: bool,
    fail_embed: bool,
    fail_generate: bool,
    fail_decision: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            dimension: 16,
            default_reply: "Mock response".to_string(),
            default_answer_directly: true,
            fail_embed: false,
            fail_generate: false,
            fail_decision: false,
        }
    }
}

/// Mock inference backend for testing.
#[derive(Clone, Default)]
pub struct MockBackend {
    config: MockConfig,
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the embedding dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.config.dimension = dimension.max(1);
        self
    }

    /// Reply used once the scripted replies run out.
    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.config.default_reply = reply.into();
        self
    }

    /// Queue a reply for the next `generate` call.
    pub fn push_reply(self, reply: impl Into<String>) -> Self {
        self.lock().replies.push_back(reply.into());
        self
    }

    /// Decision used once the scripted decisions run out.
    pub fn with_answer_directly(mut self, answer_directly: bool) -> Self {
        self.config.default_answer_directly = answer_directly;
        self
    }

    /// Queue a decision for the next `answer_directly` call.
    pub fn push_answer_directly(self, answer_directly: bool) -> Self {
        self.lock().decisions.push_back(answer_directly);
        self
    }

    pub fn failing_embed(mut self) -> Self {
        self.config.fail_embed = true;
        self
    }

    pub fn failing_generate(mut self) -> Self {
        self.config.fail_generate = true;
        self
    }

    pub fn failing_decision(mut self) -> Self {
        self.config.fail_decision = true;
        self
    }

    /// All calls so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    pub fn embed_calls(&self) -> Vec<(String, EmbeddingTask)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Embed { text, task } => Some((text, task)),
                _ => None,
            })
            .collect()
    }

    pub fn generate_calls(&self) -> Vec<Vec<ChatTurn>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Generate { history } => Some(history),
                _ => None,
            })
            .collect()
    }

    pub fn decision_calls(&self) -> Vec<Vec<ChatTurn>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::AnswerDirectly { history } => Some(history),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Deterministic unit vector derived from the characters of `text`.
    pub fn embedding_for(text: &str, dimension: usize) -> Vec<f32> {
        let mut vec = vec![0.0f32; dimension];
        for (i, c) in text.chars().enumerate() {
            let idx = (c as usize + i) % dimension;
            vec[idx] += 0.1;
        }
        let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in vec.iter_mut() {
                *x /= norm;
            }
        }
        vec
    }
}

#[async_trait]
impl EmbeddingBackend for MockBackend {
    async fn embed(&self, text: &str, task: EmbeddingTask) -> Result<Vector> {
        self.lock().calls.push(MockCall::Embed {
            text: text.to_string(),
            task,
        });
        if self.config.fail_embed {
            return Err(Error::Embedding("mock embedding failure".to_string()));
        }
        Ok(Vector::from(Self::embedding_for(text, self.config.dimension)))
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn generate(&self, history: &[ChatTurn]) -> Result<String> {
        let mut state = self.lock();
        state.calls.push(MockCall::Generate {
            history: history.to_vec(),
        });
        if self.config.fail_generate {
            return Err(Error::Inference("mock generation failure".to_string()));
        }
        Ok(state
            .replies
            .pop_front()
            .unwrap_or_else(|| self.config.default_reply.clone()))
    }

    async fn answer_directly(&self, history: &[ChatTurn]) -> Result<bool> {
        let mut state = self.lock();
        state.calls.push(MockCall::AnswerDirectly {
            history: history.to_vec(),
        });
        if self.config.fail_decision {
            return Err(Error::Inference("mock decision failure".to_string()));
        }
        Ok(state
            .decisions
            .pop_front()
            .unwrap_or(self.config.default_answer_directly))
    }
}
