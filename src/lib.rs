//! Healthwatch -- Dead Man's Switch
//!
//! External jobs send heartbeat pings over HTTP; a periodic sweep
//! declares silent monitors dead and queues one alert per failure into
//! a durable outbox, which independent pollers drain destructively.

pub mod config;
pub mod poller;
pub mod state;
pub mod sweep;
pub mod types;
pub mod web;
