//! Command handlers.
//!
//! Handlers are thin: they take already-composed dependencies, call into the
//! runtime, and format output for the terminal.

pub mod run;
pub mod segment;
pub mod voices;
