//! Core library for the mealtrace food and symptom tracker.
//!
//! The tracking session engine: multi-day tracking periods, the meal entries
//! logged within them, catalog and custom food associations per meal, and the
//! per-meal symptom ledger, backed by SQLite. The HTTP layer on top consumes
//! [`TrackerService`]; nothing here knows about requests or users beyond
//! their numeric ids.

pub mod db;
pub mod error;
pub mod models;
pub mod service;

pub use db::Database;
pub use error::{CoreError, Result};
pub use service::TrackerService;
