#![doc = "release-bot-core: core logic library for release-bot."]

//! This crate contains the release pipeline: turning merged pull requests into
//! release notes, a version bump and chat notifications.
//! Network access lives behind the traits in [`contract`]; the binary crate
//! supplies the GitHub and Slack implementations.
//!
//! # Usage
//! Add this as a dependency for all shared parsing, rendering, config and pipeline code.

pub mod aggregate;
pub mod chat;
pub mod classify;
pub mod config;
pub mod contract;
pub mod document;
pub mod error;
pub mod event;
pub mod normalize;
pub mod pipeline;
pub mod section;
pub mod version;
