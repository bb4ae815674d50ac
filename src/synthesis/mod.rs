//! Answer synthesis through a language model
//!
//! The retrieval pipeline only depends on the [`Synthesizer`] trait. The
//! production implementation talks to a local Ollama server; tests plug in
//! scripted doubles.
//!
//! Two failure classes are kept apart:
//! - [`SynthesisError::Unavailable`]: the endpoint cannot be used at all.
//!   Surfaced to the caller as a service error.
//! - [`SynthesisError::Generation`]: one call failed. The pipeline turns it
//!   into a readable answer string and keeps the provenance.

pub mod client;
pub mod prompt;
pub mod types;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub use client::OllamaSynthesizer;
pub use prompt::{build_user_prompt, SYSTEM_PROMPT};

/// System + user instruction pair sent to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub system: String,
    pub user: String,
}

/// Synthesizer failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    /// Endpoint unreachable or misconfigured
    #[error("Synthesizer unavailable: {0}")]
    Unavailable(String),

    /// A single generation call failed; message is user-facing
    #[error("{0}")]
    Generation(String),
}

/// Turns a question plus excerpts into an answer
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Model identifier, for logs and diagnostics
    fn name(&self) -> &str;

    /// Generate an answer for one request
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<String, SynthesisError>;
}

/// Synthesizer state resolved once at startup
#[derive(Clone)]
pub enum SynthesizerHandle {
    Ready(Arc<dyn Synthesizer>),
    Unavailable(String),
}

impl SynthesizerHandle {
    /// Wrap a connected synthesizer
    pub fn ready<S: Synthesizer + 'static>(synthesizer: S) -> Self {
        SynthesizerHandle::Ready(Arc::new(synthesizer))
    }

    /// Whether questions can be answered
    pub fn is_ready(&self) -> bool {
        matches!(self, SynthesizerHandle::Ready(_))
    }

    /// Human-readable availability for health output
    pub fn status(&self) -> String {
        match self {
            SynthesizerHandle::Ready(s) => format!("ready ({})", s.name()),
            SynthesizerHandle::Unavailable(reason) => format!("unavailable: {}", reason),
        }
    }
}

impl fmt::Debug for SynthesizerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthesizerHandle::Ready(s) => f.debug_tuple("Ready").field(&s.name()).finish(),
            SynthesizerHandle::Unavailable(reason) => {
                f.debug_tuple("Unavailable").field(reason).finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Synthesizer for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn synthesize(&self, request: &SynthesisRequest) -> Result<String, SynthesisError> {
            Ok(request.user.clone())
        }
    }

    #[test]
    fn test_handle_status() {
        let ready = SynthesizerHandle::ready(Echo);
        assert!(ready.is_ready());
        assert_eq!(ready.status(), "ready (echo)");

        let down = SynthesizerHandle::Unavailable("connection refused".to_string());
        assert!(!down.is_ready());
        assert!(down.status().contains("connection refused"));
    }

    #[test]
    fn test_generation_error_display_is_verbatim() {
        let err = SynthesisError::Generation("Error generating answer: timeout".to_string());
        assert_eq!(err.to_string(), "Error generating answer: timeout");
    }

    #[test]
    fn test_unavailable_error_converts_to_anyhow() {
        let err = SynthesisError::Unavailable("connection refused".to_string());
        assert_eq!(err.to_string(), "Synthesizer unavailable: connection refused");

        let wrapped: anyhow::Error = err.clone().into();
        assert_eq!(wrapped.downcast_ref::<SynthesisError>(), Some(&err));
    }

    #[tokio::test]
    async fn test_trait_object_dispatch() {
        let handle = SynthesizerHandle::ready(Echo);
        if let SynthesizerHandle::Ready(s) = handle {
            let out = s
                .synthesize(&SynthesisRequest {
                    system: "sys".to_string(),
                    user: "hello".to_string(),
                })
                .await
                .unwrap();
            assert_eq!(out, "hello");
        }
    }
}
