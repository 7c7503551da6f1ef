//! # Core Application Logic
//!
//! Palaver's chat logic. It knows nothing about any specific UI technology.
//!
//! ```text
//!                    ┌──────────────────────────┐
//!                    │          CORE            │
//!                    │                          │
//!                    │  • ChatController        │
//!                    │  • Avatar / backdrop     │
//!                    │    resolvers             │
//!                    │  • App + update()        │
//!                    │                          │
//!                    │  No terminal. No HTTP.   │
//!                    └────────────┬─────────────┘
//!                                 │ Effects
//!                 ┌───────────────┴───────────────┐
//!                 ▼                               ▼
//!          ┌────────────┐                  ┌────────────┐
//!          │    TUI     │                  │  Endpoint  │
//!          │  Adapter   │                  │ relay +    │
//!          │ (ratatui)  │                  │ uploads    │
//!          └────────────┘                  └────────────┘
//! ```
//!
//! The one exception is [`environment`], which holds the production
//! [`environment::EnvironmentProbe`] so the resolvers can be exercised
//! against the real filesystem in tests.
//!
//! ## Modules
//!
//! - [`transcript`]: entries and the revision counter
//! - [`attachment`]: per-image composition pipeline
//! - [`avatar`], [`background`]: asset resolvers
//! - [`controller`]: keyboard, submission and scroll logic
//! - [`gallery`]: image load bookkeeping
//! - [`state`]: the `App` struct and `update()`
//! - [`action`]: `Action` in, `Effect` out
//! - [`config`]: layered settings

pub mod action;
pub mod attachment;
pub mod avatar;
pub mod background;
pub mod config;
pub mod controller;
pub mod environment;
pub mod gallery;
pub mod state;
pub mod transcript;
