// Main library entry point for Lictor.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;
