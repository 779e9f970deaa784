// src/state.rs

use crate::config::Config;
use crate::service::ScoreService;
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub service: ScoreService,
    pub config: Config,
}

impl FromRef<AppState> for ScoreService {
    fn from_ref(state: &AppState) -> Self {
        state.service.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
