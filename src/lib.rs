//! DocBuddy - question answering over your own documents
//!
//! Upload PDF, Word, Excel and email files; ask questions in plain language
//! and get answers grounded in the uploaded text, generated by a local
//! Ollama model.
//!
//! # Architecture
//!
//! - **extract**: per-format text extraction
//! - **rag**: chunking, keyword ranking, context assembly and the answer pipeline
//! - **store**: SQLite persistence and uploaded file storage
//! - **synthesis**: the language model seam and its Ollama client
//! - **service**: the operations shared by the HTTP server and the CLI
//! - **server**: JSON API over axum

pub mod errors;

// Re-export commonly used types
pub use errors::{DocError, Result};

pub mod cli;
pub mod doctor;
pub mod extract;
pub mod logging;
pub mod rag;
pub mod server;
pub mod service;
pub mod store;
pub mod synthesis;
