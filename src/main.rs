//! DocBuddy - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use docbuddy::{
    cli::{Args, Commands, Config, Verbosity},
    doctor::Doctor,
    logging,
    server,
    service::{connect_synthesizer, AskRequest, DocumentAnalyzer},
    store::{Database, FileStore},
    synthesis::SynthesizerHandle,
    DocError,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.clone()).context("Failed to load configuration")?;
    args.apply_overrides(&mut config);
    config.validate().context("Invalid configuration")?;

    logging::init(args.verbose, args.quiet, &config.logging.level);
    let verbosity = args.verbosity();

    match &args.command {
        Commands::Serve { .. } => server::serve(&config).await?,
        Commands::Upload { files } => upload_files(&config, files, verbosity).await?,
        Commands::Ask {
            question,
            conversation,
            documents,
        } => {
            let request = AskRequest {
                question: question.clone(),
                conversation_id: *conversation,
                document_ids: documents.clone(),
            };
            ask_question(&config, request, verbosity).await?;
        }
        Commands::Documents => list_documents(&config).await?,
        Commands::Show { id } => show_document(&config, *id, verbosity).await?,
        Commands::Delete { id } => delete_document(&config, *id).await?,
        Commands::Conversations => list_conversations(&config).await?,
        Commands::Conversation { id } => show_conversation(&config, *id).await?,
        Commands::Doctor => run_doctor(&config).await?,
        Commands::Config => show_config(&config, &args)?,
    }

    Ok(())
}

/// Open storage; only `ask` needs a live language model
async fn open_analyzer(config: &Config, connect: bool) -> Result<DocumentAnalyzer> {
    let database = Arc::new(
        Database::open(&config.database_path()).context("Failed to open database")?,
    );
    let files = FileStore::new(config.documents_dir());
    let synthesizer = if connect {
        connect_synthesizer(config).await
    } else {
        SynthesizerHandle::Unavailable("not connected".to_string())
    };
    Ok(DocumentAnalyzer::new(database, files, config, synthesizer)?)
}

fn spinner(message: &str, verbosity: Verbosity) -> ProgressBar {
    if !verbosity.show_progress() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

async fn upload_files(config: &Config, files: &[std::path::PathBuf], verbosity: Verbosity) -> Result<()> {
    let analyzer = open_analyzer(config, false).await?;
    let mut failures = 0;

    for path in files {
        let filename = display_name(path);
        let pb = spinner(&format!("Uploading {}", filename), verbosity);

        let result = match tokio::fs::read(path).await {
            Ok(bytes) => analyzer.upload(&filename, bytes).await.map_err(anyhow::Error::from),
            Err(e) => Err(anyhow::Error::from(e).context(format!("Cannot read {}", path.display()))),
        };
        pb.finish_and_clear();

        match result {
            Ok(outcome) if !outcome.created => println!(
                "{} {} already exists (document {})",
                "=".yellow(),
                filename,
                outcome.document.id
            ),
            Ok(outcome) if outcome.parse_failed => println!(
                "{} {} stored as document {} but could not be parsed: {}",
                "!".yellow(),
                filename,
                outcome.document.id,
                outcome.document.parsed_content
            ),
            Ok(outcome) => println!(
                "{} {} → document {} ({} chunks)",
                "✓".green(),
                filename,
                outcome.document.id,
                outcome.chunk_count
            ),
            Err(e) => {
                failures += 1;
                eprintln!("{} {}: {:#}", "✗".red(), filename, e);
            }
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

async fn ask_question(config: &Config, request: AskRequest, verbosity: Verbosity) -> Result<()> {
    let analyzer = open_analyzer(config, true).await?;
    let pb = spinner("Thinking...", verbosity);
    let result = analyzer.ask(request).await;
    pb.finish_and_clear();

    match result {
        Ok(response) => {
            println!("\n{}\n", response.answer);
            println!(
                "{}",
                format!(
                    "conversation {} · answer {} · {} source chunks",
                    response.conversation_id,
                    response.qa_id,
                    response.source_chunks.len()
                )
                .dimmed()
            );
            if verbosity.show_details() {
                for source in &response.source_chunks {
                    println!(
                        "\n{} {}",
                        format!("[{}, Chunk {}]", source.document_name, source.chunk_index + 1).cyan(),
                        source.preview
                    );
                }
            }
            Ok(())
        }
        Err(DocError::SynthesizerUnavailable(reason)) => {
            eprintln!("{} Ollama is not running or not reachable: {}", "✗".red(), reason);
            eprintln!("\nStart Ollama with: ollama serve");
            std::process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}

async fn list_documents(config: &Config) -> Result<()> {
    let analyzer = open_analyzer(config, false).await?;
    let documents = analyzer.documents()?;

    if documents.is_empty() {
        println!("No documents uploaded yet. Add some with: docbuddy upload <FILE>");
        return Ok(());
    }

    println!("{:>5}  {:<6} {:>8} {:>7}  {:<20} Filename", "ID", "Type", "Bytes", "Chunks", "Uploaded");
    for doc in documents {
        println!(
            "{:>5}  {:<6} {:>8} {:>7}  {:<20} {}",
            doc.id,
            doc.file_type.as_str(),
            doc.file_size,
            doc.chunk_count,
            doc.uploaded_at.format("%Y-%m-%d %H:%M"),
            doc.filename
        );
    }
    Ok(())
}

async fn show_document(config: &Config, id: i64, verbosity: Verbosity) -> Result<()> {
    let analyzer = open_analyzer(config, false).await?;
    let detail = analyzer.document(id)?;
    let doc = &detail.document;

    println!("{}", doc.filename.bold());
    println!("  Type:     {}", doc.file_type);
    println!("  Size:     {} bytes", doc.file_size);
    println!("  Uploaded: {}", doc.uploaded_at.to_rfc3339());
    println!("  Stored:   {}", doc.file_path);
    println!("  Chunks:   {}", detail.chunks.len());

    for chunk in &detail.chunks {
        let body = if verbosity.show_details() {
            chunk.content.clone()
        } else {
            chunk.preview()
        };
        println!(
            "\n{} {}",
            format!("#{} [{}..{})", chunk.chunk_index + 1, chunk.start_char, chunk.end_char).cyan(),
            body
        );
    }
    Ok(())
}

async fn delete_document(config: &Config, id: i64) -> Result<()> {
    let analyzer = open_analyzer(config, false).await?;
    let document = analyzer.delete_document(id).await?;
    println!("{} Deleted {} (document {})", "✓".green(), document.filename, document.id);
    Ok(())
}

async fn list_conversations(config: &Config) -> Result<()> {
    let analyzer = open_analyzer(config, false).await?;
    let conversations = analyzer.conversations()?;

    if conversations.is_empty() {
        println!("No conversations yet.");
        return Ok(());
    }

    for conversation in conversations {
        println!(
            "{:>5}  {:>3} questions  updated {}  {}",
            conversation.id,
            conversation.question_count,
            conversation.updated_at.format("%Y-%m-%d %H:%M"),
            conversation.last_question.unwrap_or_default().dimmed()
        );
    }
    Ok(())
}

async fn show_conversation(config: &Config, id: i64) -> Result<()> {
    let analyzer = open_analyzer(config, false).await?;
    let detail = analyzer.conversation(id)?;

    println!(
        "{} (started {})",
        format!("Conversation {}", detail.conversation.id).bold(),
        detail.conversation.created_at.format("%Y-%m-%d %H:%M")
    );
    for qa in &detail.qa_pairs {
        println!("\n{} {}", "Q:".cyan().bold(), qa.question);
        println!("{} {}", "A:".green().bold(), qa.answer);
        for source in &qa.source_chunks {
            println!(
                "   {}",
                format!("{} · chunk {}", source.document_name, source.chunk_index + 1).dimmed()
            );
        }
    }
    Ok(())
}

async fn run_doctor(config: &Config) -> Result<()> {
    let doctor = Doctor::new(config.clone());
    let checks = doctor.run_diagnostics().await;
    Doctor::display_results(&checks);

    std::process::exit(if Doctor::overall_status(&checks) { 0 } else { 1 });
}

fn show_config(config: &Config, args: &Args) -> Result<()> {
    let source = args
        .config
        .clone()
        .or_else(Config::default_path)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(built-in defaults)".to_string());

    println!("{}", "DocBuddy Configuration".bold());
    println!("{}\n", format!("# {}", source).dimmed());
    println!("{}", toml::to_string_pretty(config).context("Failed to render configuration")?);
    println!("Verbosity: {:?}", args.verbosity());
    Ok(())
}
