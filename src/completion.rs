// src/completion.rs

use dashmap::DashSet;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::storage::ScoreRepository;

/// Answers "has this user already completed the quiz".
///
/// Names seen during this process lifetime are kept in memory and answered
/// without touching the backend. Anything else is looked up in the active
/// backend. The set starts empty after a restart, so a user whose score only
/// lived in a wiped local file reads as not completed.
///
/// `generation` is bumped by every reset. A backend answer is only cached, and
/// only reported, if no reset happened while the lookup was in flight.
pub struct CompletionIndex {
    completed: DashSet<String>,
    generation: Mutex<u64>,
    repository: ScoreRepository,
}

impl CompletionIndex {
    pub fn new(repository: ScoreRepository) -> Self {
        Self {
            completed: DashSet::new(),
            generation: Mutex::new(0),
            repository,
        }
    }

    pub async fn has_completed(&self, name: &str) -> bool {
        if self.completed.contains(name) {
            return true;
        }

        let started = *self.generation();
        if !self.repository.contains_name(name).await {
            return false;
        }

        let generation = self.generation();
        if *generation != started {
            debug!("Scores were cleared during lookup of '{}'", name);
            return false;
        }
        debug!("Completion for '{}' found in backend, caching", name);
        self.completed.insert(name.to_string());
        true
    }

    pub fn mark_completed(&self, name: &str) {
        self.completed.insert(name.to_string());
    }

    pub fn reset(&self) {
        let mut generation = self.generation();
        *generation += 1;
        self.completed.clear();
    }

    fn generation(&self) -> MutexGuard<'_, u64> {
        // The guarded value is a plain counter; a poisoned lock still holds a valid one.
        self.generation.lock().unwrap_or_else(|e| e.into_inner())
    }
}
