// src/handlers/mod.rs

pub mod live;
pub mod scores;
pub mod status;
