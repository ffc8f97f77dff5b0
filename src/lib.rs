//! # NKO Assistant
//!
//! A natural-language assistant over a directory of Russian non-profit
//! organizations (NKO).
//!
//! A free-text query goes through a language model that extracts a city
//! and categories, a fallback cascade that searches the NKO backend with
//! progressively weaker filters, and a second model call that composes a
//! recommendation from the records found. The same backend is exposed to
//! agents as three read-only tools over MCP and REST.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌────────────┐   ┌──────────────┐
//!  POST /query ──▶│ Extractor  │──▶│   Fallback   │──▶ NKO backend
//!  nko ask        │ (2 × LLM)  │   │   cascade    │    (GET /nko)
//!                 └────────────┘   └──────┬───────┘
//!                                         ▼
//!                                  ┌──────────────┐
//!                                  │   Composer   │──▶ response
//!                                  │   (LLM)      │
//!                                  └──────────────┘
//!
//!  MCP stdio / /mcp / /tools ──▶ get_nko_list, get_nko_by_id, get_cities
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export OPENROUTER_API_KEY=...
//! nko serve backend --fixture demos/fixture.json --bind 127.0.0.1:8001 &
//! BACKEND_URL=http://127.0.0.1:8001 nko ask --query "приюты для животных в Казани"
//! BACKEND_URL=http://127.0.0.1:8001 nko serve http
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`backend`] | HTTP client for the NKO backend |
//! | [`completion`] | Completion-model abstraction and OpenRouter client |
//! | [`extract`] | City and category extraction |
//! | [`compose`] | Recommendation composition |
//! | [`orchestrator`] | The per-query cycle |
//! | [`tools`] | Directory tools |
//! | [`mcp`] | MCP bridge (stdio and Streamable HTTP) |
//! | [`server`] | HTTP server |
//! | [`fixture`] | Fixture backend |
//! | [`console`] | Interactive console |
//!
//! Domain types, the directory trait, the predicate builder and the
//! fallback cascade live in the `nko-assistant-core` crate.

pub mod app;
pub mod backend;
pub mod completion;
pub mod compose;
pub mod config;
pub mod console;
pub mod extract;
pub mod fixture;
pub mod mcp;
pub mod orchestrator;
pub mod server;
pub mod tools;

#[cfg(test)]
mod testing;
