// src/models/mod.rs

pub mod attempt;
pub mod profile;
pub mod quiz;
pub mod statistics;
pub mod user;
