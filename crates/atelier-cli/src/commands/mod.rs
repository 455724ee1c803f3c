pub mod chunk;
pub mod config;
pub mod project;
pub mod schedule;
pub mod timer;
