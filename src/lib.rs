//! Thermolink firmware library.
//!
//! Exposes the controller core, sensor driver and adapters for the
//! firmware binary and for host-side integration tests.  ESP-IDF code is
//! gated behind the `espidf` feature; without it every adapter falls back
//! to a host simulation backend.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod pins;
pub mod sensors;
