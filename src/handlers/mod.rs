// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod instructor;
pub mod profile;
pub mod quiz;
pub mod student;
