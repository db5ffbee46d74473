pub mod app;
pub mod artifacts;
pub mod catalog;
pub mod config;
pub mod launcher;
pub mod logging;
pub mod pipeline;
pub mod provision;
pub mod workdir;
