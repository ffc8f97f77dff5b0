//! # NKO Assistant Core
//!
//! Transport-free logic for NKO Assistant: data models, the directory
//! abstraction over the NKO backend, the declarative filter predicates used
//! by the in-memory directory, completion-reply parsing, and the fallback
//! query cascade.
//!
//! This crate performs no network or filesystem I/O of its own. HTTP
//! clients, servers, and the completion provider live in the
//! `nko-assistant` crate.

pub mod directory;
pub mod extract;
pub mod fallback;
pub mod models;
