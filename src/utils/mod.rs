// src/utils/mod.rs

pub mod admin;
pub mod csv;
