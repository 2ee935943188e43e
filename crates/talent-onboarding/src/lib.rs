//! Talent onboarding: applicant accounts, the model/hostess registration pipeline, and the
//! moderation queue behind an axum API.

pub mod accounts;
pub mod auth;
pub mod config;
pub mod error;
pub mod store;
pub mod telemetry;
pub mod workflows;
