//! # medbot-core
//!
//! Core types, traits, configuration, and error handling for the MedBot agent.

pub mod config;
pub mod error;
pub mod message;
pub mod sink;
pub mod traits;
