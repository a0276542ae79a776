//! # Savoir Core
//!
//! Client-side retrieval-augmented generation pipeline: data models, text
//! chunking, embedding cache, store abstraction, similarity search with
//! re-ranking, adaptive query analysis, prompt assembly, and citation
//! analysis.
//!
//! External collaborators — the embedding runtime, the generation engine,
//! and persistent storage — sit behind traits; concrete implementations
//! live in the `savoir` app crate. This crate contains no tokio, sqlx,
//! filesystem I/O, or other native-only dependencies.

pub mod capability;
pub mod chunk;
pub mod citation;
pub mod embedding;
pub mod error;
pub mod models;
pub mod process;
pub mod prompt;
pub mod query;
pub mod rerank;
pub mod search;
pub mod store;
