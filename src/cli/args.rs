//! Command-line argument parsing for DocBuddy
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::config::Config;

/// DocBuddy - ask questions about your documents with a local Ollama model
#[derive(Parser, Debug)]
#[command(name = "docbuddy")]
#[command(author = "Jerome (Kubashen) Naidoo")]
#[command(version)]
#[command(about = "Upload office documents and ask questions answered from their content", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Ollama host (overrides config)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Ollama port (overrides config)
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Ollama model (overrides config)
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Verbosity level: -v (debug), -vv (trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        bind: Option<String>,

        /// HTTP port (overrides config)
        #[arg(long = "http-port")]
        http_port: Option<u16>,
    },

    /// Upload one or more documents
    Upload {
        /// Files to upload (.pdf, .docx, .xlsx, .xls, .eml, .msg)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Ask a question about the uploaded documents
    Ask {
        /// The question
        #[arg(value_name = "QUESTION")]
        question: String,

        /// Continue an existing conversation
        #[arg(long)]
        conversation: Option<i64>,

        /// Restrict the search to these documents (repeatable)
        #[arg(long = "document", value_name = "ID")]
        documents: Vec<i64>,
    },

    /// List uploaded documents
    Documents,

    /// Show a document and its chunks
    Show {
        /// Document id
        id: i64,
    },

    /// Delete a document with its chunks and stored file
    Delete {
        /// Document id
        id: i64,
    },

    /// List conversations
    Conversations,

    /// Show the questions and answers of a conversation
    Conversation {
        /// Conversation id
        id: i64,
    },

    /// Run system diagnostics and health checks
    Doctor,

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.ollama.host = host.clone();
        }
        if let Some(port) = self.port {
            config.ollama.port = port;
        }
        if let Some(model) = &self.model {
            config.ollama.model = model.clone();
        }
        if let Commands::Serve { bind, http_port } = &self.command {
            if let Some(bind) = bind {
                config.server.bind = bind.clone();
            }
            if let Some(port) = http_port {
                config.server.port = *port;
            }
        }
    }
}

impl Verbosity {
    /// Check if should show progress spinners
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should show chunk previews and scores
    pub fn show_details(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}
