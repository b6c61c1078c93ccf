//! StarSteps · lesson scoring and progression backend for a children's learning app.
//!
//! The engine (`engine`) turns a learner's interactions into step progress,
//! a star rating and a completion record; the rest hosts it behind an Axum
//! HTTP + WebSocket API with in-memory learner profiles and progress ledgers.

pub mod config;
pub mod content;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod logic;
pub mod protocol;
pub mod routes;
pub mod seeds;
pub mod state;
pub mod telemetry;
pub mod util;
