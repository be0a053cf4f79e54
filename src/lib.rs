//! Humbler: tails a game server log and counts player deaths.
//!
//! The [`tailer`] follows an append-only, externally rotated log file,
//! classifies each complete line with the [`matcher`], counts accepted
//! events in the SQLite-backed [`store`], and announces them through a
//! [`notifier`]. The [`telegram`] bot answers count queries from the same
//! store.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;

pub mod cursor;
pub mod dedup;
pub mod matcher;
pub mod patterns;
pub mod provider;
pub mod transform;

pub mod notifier;
pub mod store;
pub mod tailer;
pub mod telegram;
