pub mod classify;
pub mod config;
pub mod daemon;
pub mod helpers;
