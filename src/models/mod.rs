// src/models/mod.rs

pub mod answer_key;
pub mod audit;
pub mod exam;
pub mod sheet;
pub mod student;
pub mod user;
