// src/handlers/mod.rs

pub mod admin;
pub mod analysis;
pub mod answer_key;
pub mod audit;
pub mod auth;
pub mod exams;
pub mod sheets;
pub mod students;
