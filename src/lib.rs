//! ohlc-collector: periodic OHLC candle collector
//!
//! This library provides the core components for:
//! - Candle fetching from the Cryptowatch REST API
//! - Per-market resume checkpoints persisted as JSON
//! - Normalized event emission to stdout or a file
//! - A periodic scheduler that fans out per exchange and never overlaps cycles
//! - Structured logging and Prometheus metrics

pub mod checkpoint;
pub mod cli;
pub mod collector;
pub mod config;
pub mod emitter;
pub mod fetcher;
pub mod telemetry;
