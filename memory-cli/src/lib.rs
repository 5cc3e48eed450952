#![allow(clippy::empty_line_after_doc_comments)]
#![allow(dead_code)]
#![allow(clippy::ifs_same_cond)]
#![allow(clippy::nonminimal_bool)]
#![allow(clippy::needless_borrow)]
#![allow(clippy::manual_clamp)]
#![allow(clippy::derivable_impls)]
#![allow(clippy::excessive_nesting)]
#![allow(clippy::if_same_then_else)]

//! # Memory CLI Library
//!
//! Operator surface over `do-memory-core`: ingesting messages into the
//! batch pipeline, running decay and lifecycle passes, inspecting the
//! connection graph, and checking configuration — all against the
//! in-process reference storage adapter (`do-memory-storage-memory`).

pub mod commands;
pub mod config;
pub mod errors;
pub mod output;
