//! Bargaining equilibria among actors with weighted preferences over discrete options.
//!
//! A [`model::Scenario`] holds the actors, their weights and their utilities.
//! The [`engine::Engine`] evolves the actors' positions with one of the
//! [`dynamics::StepRule`]s until the [`convergence::Detector`] finds a
//! repeated state, and [`fit::fit`] estimates weights from observed outcomes.

pub mod analysis;
pub mod config;
pub mod convergence;
pub mod data;
pub mod dynamics;
pub mod engine;
pub mod fit;
pub mod generate;
pub mod manager;
pub mod model;
pub mod pce;
pub mod stats;
pub mod utils;
