//! Visit telemetry pipeline.
//!
//! Triggers from the host page flow through [`components::bindings`], which
//! builds one record per trigger with [`components::aggregator`] and posts it
//! with [`adapter::endpoint::Dispatcher`]. Location and media sources are
//! reached through the [`platform`] traits so the pipeline runs without a
//! browser.

pub mod adapter;
pub mod common;
pub mod components;
pub mod platform;
