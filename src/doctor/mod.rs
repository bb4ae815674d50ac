//! Doctor command for system diagnostics
//!
//! Checks everything DocBuddy needs before serving questions: a reachable
//! Ollama, the configured model, a writable data directory and a database
//! that opens with the current schema.

use colored::Colorize;
use std::path::Path;

use crate::cli::config::Config;
use crate::store::Database;
use crate::synthesis::OllamaSynthesizer;

/// Health check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Pass,
    Warn(String),
    Fail(String),
}

/// Individual health check
#[derive(Debug)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
}

impl HealthCheck {
    fn pass(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: HealthStatus::Pass,
        }
    }

    fn warn(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: HealthStatus::Warn(message.into()),
        }
    }

    fn fail(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: HealthStatus::Fail(message.into()),
        }
    }
}

/// Doctor diagnostics system
pub struct Doctor {
    config: Config,
}

impl Doctor {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run all health checks
    pub async fn run_diagnostics(&self) -> Vec<HealthCheck> {
        let mut checks = vec![self.check_config()];
        checks.extend(self.check_ollama().await);
        checks.push(self.check_data_dir());
        checks.push(self.check_database());
        checks
    }

    fn check_config(&self) -> HealthCheck {
        match self.config.validate() {
            Ok(()) => HealthCheck::pass("Configuration"),
            Err(e) => HealthCheck::fail("Configuration", e.to_string()),
        }
    }

    /// Ollama API reachable, then configured model installed
    async fn check_ollama(&self) -> Vec<HealthCheck> {
        let client = match OllamaSynthesizer::new(&self.config.ollama_url(), &self.config.ollama) {
            Ok(client) => client,
            Err(e) => {
                return vec![
                    HealthCheck::fail("Ollama API", e.to_string()),
                    HealthCheck::fail("Model", "Cannot check models"),
                ]
            }
        };

        match client.list_models().await {
            Ok(models) => {
                let model_check = if client.has_model(&models) {
                    HealthCheck::pass("Model")
                } else if models.is_empty() {
                    HealthCheck::warn(
                        "Model",
                        format!("No models installed; run `ollama pull {}`", client.model()),
                    )
                } else {
                    HealthCheck::warn(
                        "Model",
                        format!(
                            "'{}' not installed (available: {}); run `ollama pull {}`",
                            client.model(),
                            models.join(", "),
                            client.model()
                        ),
                    )
                };
                vec![HealthCheck::pass("Ollama API"), model_check]
            }
            Err(e) => vec![
                HealthCheck::fail(
                    "Ollama API",
                    format!("{} at {}", e, client.base_url()),
                ),
                HealthCheck::fail("Model", "Cannot check models"),
            ],
        }
    }

    fn check_data_dir(&self) -> HealthCheck {
        let dir = self.config.documents_dir();
        check_writable(&dir)
    }

    fn check_database(&self) -> HealthCheck {
        let path = self.config.database_path();
        match Database::open(&path) {
            Ok(db) => match db.list_documents() {
                Ok(documents) if documents.is_empty() => {
                    HealthCheck::warn("Database", "No documents uploaded yet")
                }
                Ok(_) => HealthCheck::pass("Database"),
                Err(e) => HealthCheck::fail("Database", e.to_string()),
            },
            Err(e) => HealthCheck::fail("Database", format!("{}: {}", path.display(), e)),
        }
    }

    /// Display diagnostics results
    pub fn display_results(checks: &[HealthCheck]) {
        println!("\n{}\n", "DocBuddy Diagnostics".bold());
        println!("{:<16} Status", "Check");
        println!("{}", "=".repeat(50));

        for check in checks {
            let status = match &check.status {
                HealthStatus::Pass => "PASS".green().to_string(),
                HealthStatus::Warn(msg) => format!("{} {}", "WARN".yellow(), msg),
                HealthStatus::Fail(msg) => format!("{} {}", "FAIL".red(), msg),
            };
            println!("{:<16} {}", check.name, status);
        }

        println!();
    }

    /// Get overall health status
    pub fn overall_status(checks: &[HealthCheck]) -> bool {
        !checks.iter().any(|c| matches!(c.status, HealthStatus::Fail(_)))
    }
}

/// Create the directory if needed and prove a file can be written there
fn check_writable(dir: &Path) -> HealthCheck {
    const NAME: &str = "Data Directory";

    if let Err(e) = std::fs::create_dir_all(dir) {
        return HealthCheck::fail(NAME, format!("Cannot create {}: {}", dir.display(), e));
    }

    let probe = dir.join(".docbuddy_write_test");
    match std::fs::write(&probe, b"ok") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            HealthCheck::pass(NAME)
        }
        Err(e) => HealthCheck::fail(NAME, format!("No write permission in {}: {}", dir.display(), e)),
    }
}
