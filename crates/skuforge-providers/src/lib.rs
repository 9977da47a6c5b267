//! Skuforge-Providers: external collaborator traits and implementations.
//!
//! The pipeline talks to three kinds of collaborators, each behind a trait
//! so tests and offline runs can swap in local implementations:
//!
//! - [`EmbeddingProvider`]: multimodal embeddings plus text generation.
//!   [`RemoteEmbeddingClient`] calls a Vertex-style REST endpoint;
//!   [`StubEmbedder`] derives deterministic vectors locally.
//! - [`ObjectStore`]: upload/download of re-hosted product images.
//!   [`FsObjectStore`] writes under a directory; [`MemoryObjectStore`]
//!   keeps everything in a map.
//! - [`Warehouse`]: schema-ensure plus batch row insert with per-row
//!   errors. [`SqliteWarehouse`] is the shipped sink; [`MemoryWarehouse`]
//!   is primable for tests.
//!
//! Handles are built once at startup and shared as `Arc<dyn ...>`; nothing
//! in this crate is a process-wide singleton.

pub mod embedding;
pub mod remote;
pub mod store;
pub mod stub;
pub mod warehouse;

pub use embedding::{EmbeddingPair, EmbeddingProvider, GenerationParams};
pub use remote::RemoteEmbeddingClient;
pub use store::{FsObjectStore, MemoryObjectStore, ObjectStore};
pub use stub::StubEmbedder;
pub use warehouse::{MemoryWarehouse, ProductRow, RowError, SqliteWarehouse, Warehouse};
