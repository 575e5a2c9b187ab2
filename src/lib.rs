//! # Repo RAG
//!
//! Question answering over Git repositories with retrieval-augmented
//! generation.
//!
//! A repository is cloned, its source files are cut into fixed line windows,
//! each window is embedded and stored in a per-repository collection. Asking
//! a question embeds it, retrieves the nearest windows, and hands them to a
//! chat model as the only context it may answer from.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌───────────┐   ┌───────────────┐   ┌──────────────┐
//! │ git clone  │──▶│ Collector │──▶│ Chunk + Embed │──▶│ Vector store │
//! └────────────┘   └───────────┘   └───────────────┘   └──────┬───────┘
//!                                                             │
//!            ┌──────────┐     ┌──────────────┐                │
//!            │ Sessions │◀────│ RepoAssistant│◀───────────────┘
//!            └──────────┘     └──────┬───────┘   retrieve → prompt → generate
//!                                    │
//!                          ┌─────────┴─────────┐
//!                          ▼                   ▼
//!                     ┌──────────┐       ┌──────────┐
//!                     │   CLI    │       │   HTTP   │
//!                     │  (rrag)  │       │  (axum)  │
//!                     └──────────┘       └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`repo_source`] | Repository ids and shallow clones |
//! | [`collector`] | File listing and directory tree |
//! | [`chunk`] | Line-window chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`generation`] | Chat model providers |
//! | [`store`] | Named-collection vector store |
//! | [`index`] | Index build |
//! | [`query`] | Retrieval and grounded answers |
//! | [`summarize`] | Structure summary |
//! | [`session`] | Per-repository session state and history export |
//! | [`assistant`] | Analyze / ask workflow |
//! | [`server`] | HTTP API |
//! | [`migrate`] | Schema migrations |

pub mod assistant;
pub mod chunk;
pub mod collector;
pub mod config;
pub mod embedding;
pub mod generation;
pub mod index;
pub mod migrate;
pub mod models;
pub mod query;
pub mod repo_source;
pub mod server;
pub mod session;
pub mod store;
pub mod summarize;
