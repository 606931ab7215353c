//! Pipeline stages for scrape → convert → translate.
//!
//! Each submodule implements exactly one step.
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ transform ──▶ write ──▶ chunk ──▶ translate ──▶ write
//! (#main)   (HTML→MD)    (original)  (headings) (per chunk)  (<lang>)
//! ```
//!
//! 1. [`fetch`]     — URL list parsing, page download, main-element extraction
//! 2. [`transform`] — one remote chat-completion call; failures degrade to passthrough
//! 3. [`postprocess`] — deterministic cleanup of successful responses
//! 4. [`chunk`]     — heading-aware splitting under a character budget
//! 5. [`translate`] — sequential per-chunk translation and reassembly
//! 6. [`write`]     — output paths and atomic file writes

pub mod chunk;
pub mod fetch;
pub mod postprocess;
pub mod transform;
pub mod translate;
pub mod write;
