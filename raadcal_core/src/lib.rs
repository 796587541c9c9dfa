//! This crate fetches the meeting calendar of the Leiden municipal council and keeps an
//! in-memory snapshot of it which can be rendered as an iCalendar feed.
//!
//! The meetings are read month by month from <https://leiden.notubiz.nl>. Every refresh
//! fetches all months concurrently and only publishes a new snapshot when every month
//! could be fetched.

pub use ical;

pub mod collector;
pub mod config;
pub mod enricher;
pub mod error;
pub mod event;
pub mod fetcher;
pub mod parser;
pub mod refresh;
pub mod render;
pub mod source;
pub mod store;
pub mod window;

pub use error::{Error, Result};
