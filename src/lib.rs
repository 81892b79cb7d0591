//! Pixbatch: batch sprite generation against remote image services
//!
//! Reads a session of grouped generation requests, drives each one through a
//! synchronous or submit-and-poll strategy with retries, writes the resulting images
//! and records the outcome of every item in a session record.

pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod input;
pub mod logging;
pub mod processor;
pub mod record;
pub mod request;
pub mod service;
pub mod session;
pub mod store;
pub mod timing;
