//! # repo-chat
//!
//! A conversational retrieval service over code-repository metadata. A
//! user asks about repositories in natural language; the service extracts
//! search keywords, embeds them, queries a vector store, reduces the raw
//! neighbor batches into a ranked result set, and replies with a summary
//! plus the formatted results. Every record shown is also accumulated in a
//! per-session export table that can be downloaded as TSV.
//!
//! ## Pipeline
//!
//! ```text
//!  user message
//!      │ sanitize, tool-select (LLM)
//!      ▼
//!  keywords ──embed──► one nearest-neighbor query per keyword
//!      │                        │
//!      │                        ▼  ResultBatch per keyword
//!      │            merge + dedupe (by id, keep lowest distance)
//!      │                        │
//!      │            distance threshold → stable sort → top-k
//!      │                        │
//!      ▼                        ▼
//!  meta summary (LLM) ◄── rendered result blocks ──► export table rows
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, data dir, and LLM settings
//! - [`models`] - Data model: `ResultRecord`, `ResultBatch`, `ResultSet`, request/response types
//! - [`error`] - Typed retrieval errors
//! - [`retrieval`] - The filter reduction and the per-turn pipeline orchestration
//! - [`format`] - Record rendering and export-row flattening
//! - [`session`] - Per-session chat history and the append-only export table
//! - [`store`] - In-memory vector store with cosine distance and vintage-named collections
//! - [`llm`] - Embedding, chat completion, and tool selection via Ollama or OpenAI APIs
//! - [`sanitize`] - Prompt input hygiene
//! - [`prompts`] - Prompt text and canned notices
//! - [`api`] - Axum HTTP handlers for chat, export, reset, and metadata
//! - [`state`] - Shared application state and the session registry

pub mod api;
pub mod config;
pub mod error;
pub mod format;
pub mod llm;
pub mod models;
pub mod prompts;
pub mod retrieval;
pub mod sanitize;
pub mod session;
pub mod state;
pub mod store;
