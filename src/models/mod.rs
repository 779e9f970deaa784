// src/models/mod.rs

pub mod live;
pub mod score;
