// src/lib.rs

pub mod completion;
pub mod config;
pub mod error;
pub mod handlers;
pub mod live;
pub mod models;
pub mod routes;
pub mod service;
pub mod state;
pub mod storage;
pub mod utils;

pub use routes::create_router;

use std::sync::Arc;

use crate::{
    completion::CompletionIndex, config::Config, live::ObserverRegistry, service::ScoreService,
    state::AppState, storage::ScoreRepository,
};

/// Wires the owned completion index and observer registry around a repository.
pub fn build_state(repository: ScoreRepository, config: Config) -> AppState {
    let completion = Arc::new(CompletionIndex::new(repository.clone()));
    let observers = Arc::new(ObserverRegistry::new());

    AppState {
        service: ScoreService::new(repository, completion, observers),
        config,
    }
}
