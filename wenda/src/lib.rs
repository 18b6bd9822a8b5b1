//! `wenda`: weekly agenda client with optimistic task sync.

pub mod agenda;
pub mod config;
pub mod drag;
pub mod gateway;
pub mod shell;
pub mod store;
pub mod sync;
