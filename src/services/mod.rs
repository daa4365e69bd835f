// src/services/mod.rs

//! Core quiz logic. Every function takes the caller and the current time
//! as arguments; nothing here reads request state or the clock.

pub mod admission;
pub mod quiz_service;
pub mod scoring;
pub mod statistics;
