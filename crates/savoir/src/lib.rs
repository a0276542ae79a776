//! # Savoir
//!
//! **A local-first retrieval-augmented generation engine for chat
//! applications.**
//!
//! Savoir turns user documents into named knowledge bases — chunked,
//! embedded, and persisted — then retrieves the most relevant chunks for a
//! query, assembles a context-window-aware prompt for the generation
//! engine, and verifies after the fact which chunks the answer actually
//! used.
//!
//! ## Data Flow
//!
//! 1. A document source supplies `{name, content}` pairs.
//! 2. The **document processor** ([`savoir_core::process`]) chunks each
//!    document ([`savoir_core::chunk`]), embeds every chunk through the
//!    memoizing **embedding service** ([`savoir_core::embedding`]), and
//!    persists the result.
//! 3. At query time the **engine** ([`savoir_core::search`]) embeds the
//!    query, scans the knowledge base by cosine similarity, and re-ranks
//!    with keyword/recency/length heuristics ([`savoir_core::rerank`]).
//! 4. The **query analyzer** ([`savoir_core::query`]) and the static
//!    **capability table** ([`savoir_core::capability`]) pick the
//!    retrieval parameters and prompt mode for the target model.
//! 5. The **prompt builder** ([`savoir_core::prompt`]) assembles the
//!    bounded context block and the message list for the generation
//!    engine.
//! 6. The **citation analyzer** ([`savoir_core::citation`]) annotates the
//!    results once the answer is generated.
//!
//! This crate supplies the native collaborators: the SQLite store
//! ([`sqlite_store`]), the embedding providers ([`embedder`]), and TOML
//! configuration ([`config`]).
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing with per-section defaults |
//! | [`db`] | SQLite connection pool (WAL) and schema setup |
//! | [`sqlite_store`] | `KnowledgeStore` over SQLite, vectors as BLOBs |
//! | [`embedder`] | Local (fastembed) and OpenAI-compatible HTTP providers |

pub mod config;
pub mod db;
pub mod embedder;
pub mod sqlite_store;

pub use savoir_core::store;
pub use sqlite_store::SqliteStore;
