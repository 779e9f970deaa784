// src/storage/mod.rs

// Durable score storage.
//
// One backend is selected at startup (relational > document > object > file)
// and reached through `ScoreRepository`, which adds the read degradation rules.

pub mod backend;
pub mod document;
pub mod file;
pub mod object;
pub mod relational;
pub mod repository;
pub mod selector;
pub mod snapshot;

pub use backend::{BackendKind, ScoreBackend, StorageError};
pub use document::DocumentBackend;
pub use file::FileBackend;
pub use object::ObjectBackend;
pub use relational::RelationalBackend;
pub use repository::ScoreRepository;
pub use selector::BackendSelector;
