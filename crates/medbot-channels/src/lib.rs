//! # medbot-channels
//!
//! Chat transport integrations for MedBot.

pub mod console;
pub mod roster;
pub mod telegram;
