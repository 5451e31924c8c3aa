//! # Mill JIT
//!
//! Short-horizon yard stock forecasting for a sugarcane mill.
//!
//! The crate keeps a time series of operational snapshots of the cane yard,
//! projects the yard stock 1..N hours ahead by blending historical hourly
//! patterns with the recent trend, flags horizons that leave the operating
//! band and attributes each breach to a root cause.
//!
//! ## Architecture
//!
//! - [`models`]: snapshots, patterns, limits, forecast runs and events
//! - [`algorithms`]: pure projection, confidence, trend and attribution functions
//! - [`db`]: repository traits with in-memory and PostgreSQL backends
//! - [`services`]: the forecast engine, pattern fallback chain and scheduler
//! - [`config`]: `mill-jit.toml` loading and environment overrides
//! - [`http`]: axum REST API and SSE stream (feature `http-server`)

// RepositoryError carries its context inline
#![allow(clippy::result_large_err)]

pub mod algorithms;
pub mod config;
pub mod db;
pub mod models;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
