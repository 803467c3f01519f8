//! RAG chat orchestrator.
//!
//! Every session keeps two transcripts. The clean track is what the user
//! sees. The raw track is exactly what the generation service receives: it
//! opens with a fixed instruction/acknowledgment pair and its user turns
//! carry the reference blocks retrieved for them.
//!
//! A turn asks the model whether it can answer without new references,
//! retrieves the top chunks when it cannot, generates a reply from the full
//! raw history and records both halves on both tracks in one transaction.
//! Nothing is written unless a reply was produced.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use chrono::{Duration, Utc};
use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, error, info};
use uuid::Uuid;

use quire_core::{
    defaults, ChatMessage, ChatRepository, ChatRole, ChatSession, ChatTrack, ChatTurn,
    ChunkMatch, ChunkRepository, EmbeddingBackend, EmbeddingTask, Error, GenerationBackend,
    Result, TurnRecord,
};

/// Title of a session until its first turn.
pub const SESSION_PLACEHOLDER_TITLE: &str = "Unnamed session";

/// Opening clean-track message.
pub const GREETING: &str = "Hi, how can I help you?";

/// First raw-track message of every session.
pub const RAW_SEED_INSTRUCTION: &str = "You are a chatbot assistant that will answer your user question based on references provided. You must answer based on user next chat language even the reference is in different language. There reference I provide will have reference number, never recall the reference using number since the number is only for raw chat session. This chat session is raw session that will be formatted again later. I'll give you reference before you answering, you can mention again the reference if you need to. You must answer don't know if you don't have enough reference.";

/// Second raw-track message of every session.
pub const RAW_SEED_ACK: &str = "Understood. I will answer your questions based solely on the provided references, and I will indicate if I do not have enough information to answer. I will also adapt my responses to the language you use in your subsequent turns. I will not refer to the references by their numbers.";

/// Opens the conversation sent to the retrieval classifier.
pub const CLASSIFIER_INSTRUCTION: &str = "You decide whether the assistant in the following conversation needs new references from the user's notes before answering the user's last message. Set answer_directly to true only when the conversation already holds everything needed to answer it, for example greetings, thanks, or follow-ups fully covered by references given earlier. Set answer_directly to false whenever the answer depends on facts from the user's notes that do not appear in the conversation yet.";

/// Result of one chat turn.
#[derive(Debug, Clone, Serialize)]
pub struct SendChatResponse {
    pub session_id: Uuid,
    /// Session title after the turn.
    pub title: String,
    /// The user's message as stored on the clean track.
    pub send: ChatMessage,
    /// The model's reply as stored on the clean track.
    pub reply: ChatMessage,
}

/// Conversation sent to the retrieval classifier.
///
/// The classifier instruction and the seed acknowledgment are placed ahead
/// of the raw history, and the pending question closes it.
pub fn build_classifier_history(raw: &[ChatMessage], question: &str) -> Vec<ChatTurn> {
    let mut turns = Vec::with_capacity(raw.len() + 3);
    turns.push(ChatTurn::user(CLASSIFIER_INSTRUCTION));
    turns.push(ChatTurn::model(RAW_SEED_ACK));
    turns.extend(raw.iter().map(ChatTurn::from));
    turns.push(ChatTurn::user(question));
    turns
}

/// Numbered reference block, one entry per chunk in rank order.
pub fn render_references(matches: &[ChunkMatch]) -> String {
    matches
        .iter()
        .enumerate()
        .map(|(i, m)| format!("Reference {}\n{}\n\n", i + 1, m.content))
        .collect()
}

/// Raw-track text of a user turn.
pub fn compose_raw_user_message(references: &str, chat: &str) -> String {
    format!("{}User Next Question: {}\n\nYour Answer", references, chat)
}

/// Async lock per session so turns on one session never interleave.
#[derive(Default)]
struct SessionLocks {
    inner: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl SessionLocks {
    async fn acquire(&self, session_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries held only by the map belong to no running turn.
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            locks.entry(session_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    fn forget(&self, session_id: Uuid) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&session_id);
    }
}

/// Drives chat sessions on top of the chat repository, the vector store
/// and the two remote services.
pub struct ChatService {
    chat: Arc<dyn ChatRepository>,
    chunks: Arc<dyn ChunkRepository>,
    embedder: Arc<dyn EmbeddingBackend>,
    generator: Arc<dyn GenerationBackend>,
    locks: SessionLocks,
}

impl ChatService {
    pub fn new(
        chat: Arc<dyn ChatRepository>,
        chunks: Arc<dyn ChunkRepository>,
        embedder: Arc<dyn EmbeddingBackend>,
        generator: Arc<dyn GenerationBackend>,
    ) -> Self {
        Self {
            chat,
            chunks,
            embedder,
            generator,
            locks: SessionLocks::default(),
        }
    }

    /// Open a session seeded with the greeting and the raw instruction pair.
    pub async fn create_session(&self) -> Result<ChatSession> {
        let now = Utc::now();
        let session = ChatSession {
            id: Uuid::new_v4(),
            title: SESSION_PLACEHOLDER_TITLE.to_string(),
            created_at: now,
            updated_at: None,
        };
        let clean_seed = [ChatMessage::new(session.id, ChatRole::Model, GREETING, now)];
        let raw_seed = [
            ChatMessage::new(session.id, ChatRole::User, RAW_SEED_INSTRUCTION, now),
            ChatMessage::new(session.id, ChatRole::Model, RAW_SEED_ACK, now),
        ];

        self.chat
            .create_session(&session, &clean_seed, &raw_seed)
            .await?;
        info!(
            subsystem = "chat",
            component = "orchestrator",
            op = "create_session",
            session_id = %session.id,
            "Chat session created"
        );
        Ok(session)
    }

    /// Live sessions, newest first.
    pub async fn list_sessions(&self) -> Result<Vec<ChatSession>> {
        self.chat.list_sessions().await
    }

    /// Clean transcript of a live session, oldest first.
    pub async fn get_chat_history(&self, session_id: Uuid) -> Result<Vec<ChatMessage>> {
        self.chat.fetch_session(session_id).await?;
        self.chat.messages(session_id, ChatTrack::Clean).await
    }

    /// Soft-delete a session and both of its transcripts.
    pub async fn delete_session(&self, session_id: Uuid) -> Result<()> {
        {
            let _turn = self.locks.acquire(session_id).await;
            self.chat.fetch_session(session_id).await?;
            self.chat.delete_session(session_id).await?;
        }
        self.locks.forget(session_id);
        info!(
            subsystem = "chat",
            component = "orchestrator",
            op = "delete_session",
            session_id = %session_id,
            "Chat session deleted"
        );
        Ok(())
    }

    /// Run one user turn on a session.
    pub async fn send_chat(&self, session_id: Uuid, chat: &str) -> Result<SendChatResponse> {
        if chat.trim().is_empty() {
            return Err(Error::InvalidInput("chat must not be empty".to_string()));
        }

        let start = Instant::now();
        let _turn = self.locks.acquire(session_id).await;
        let result = self.run_turn(session_id, chat).await;

        match &result {
            Ok(_) => info!(
                subsystem = "chat",
                component = "orchestrator",
                op = "send_chat",
                session_id = %session_id,
                duration_ms = start.elapsed().as_millis() as u64,
                "Chat turn recorded"
            ),
            Err(e) => error!(
                subsystem = "chat",
                component = "orchestrator",
                op = "send_chat",
                session_id = %session_id,
                error = %e,
                duration_ms = start.elapsed().as_millis() as u64,
                "Chat turn failed"
            ),
        }
        result
    }

    async fn run_turn(&self, session_id: Uuid, chat: &str) -> Result<SendChatResponse> {
        let session = self.chat.fetch_session(session_id).await?;
        let raw = self.chat.messages(session_id, ChatTrack::Raw).await?;
        let first_turn = raw.len() == 2;
        let now = Utc::now();

        let query = self
            .embedder
            .embed(chat, EmbeddingTask::RetrievalQuery)
            .await?;

        let answer_directly = self
            .generator
            .answer_directly(&build_classifier_history(&raw, chat))
            .await?;
        let use_rag = !answer_directly;

        let references = if use_rag {
            self.chunks
                .find_similar(&query, defaults::SIMILARITY_LIMIT)
                .await?
        } else {
            Vec::new()
        };
        debug!(
            subsystem = "chat",
            component = "orchestrator",
            op = "decide_rag",
            session_id = %session_id,
            use_rag,
            result_count = references.len(),
            "Retrieval decided"
        );

        let raw_user_text = compose_raw_user_message(&render_references(&references), chat);
        let mut history: Vec<ChatTurn> = raw.iter().map(ChatTurn::from).collect();
        history.push(ChatTurn::user(raw_user_text.as_str()));
        let reply = self.generator.generate(&history).await?;

        let reply_at = now + Duration::milliseconds(1);
        let title = if first_turn {
            chat.to_string()
        } else {
            session.title
        };
        let turn = TurnRecord {
            session_id,
            clean_user: ChatMessage::new(session_id, ChatRole::User, chat, now),
            clean_model: ChatMessage::new(session_id, ChatRole::Model, reply.as_str(), reply_at),
            raw_user: ChatMessage::new(session_id, ChatRole::User, raw_user_text, now),
            raw_model: ChatMessage::new(session_id, ChatRole::Model, reply, reply_at),
            new_title: first_turn.then(|| title.clone()),
            at: now,
        };
        self.chat.record_turn(&turn).await?;

        Ok(SendChatResponse {
            session_id,
            title,
            send: turn.clean_user,
            reply: turn.clean_model,
        })
    }
}
