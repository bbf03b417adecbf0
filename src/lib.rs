#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub(crate) mod api;
pub mod app;
pub mod clients;
pub mod config;
pub mod notify;
pub mod observability;
pub mod pipeline;
pub mod scheduler;
pub mod scoring;
pub mod spike;
pub mod store;
pub(crate) mod util;
