// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 The HieroScribe contributors

//! HieroScribe CLI: AI-assisted Ancient Egyptian artifact toolkit

use clap::{Parser, Subcommand};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use hieroscribe::config::AppConfig;
use hieroscribe::engine::GenAiClient;
use hieroscribe::history::{HistoryStore, JsonFileHistory};
use hieroscribe::media::MediaPayload;
use hieroscribe::orchestrator::{AnalysisOutput, OperationKind, Orchestrator};
use hieroscribe::Result;

/// HieroScribe CLI - hieroglyph translation and artifact analysis
#[derive(Parser, Debug)]
#[command(name = "hieroscribe")]
#[command(version = "1.0.0")]
#[command(about = "AI-assisted Ancient Egyptian artifact toolkit", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate the hieroglyphs on an artifact image
    Translate {
        /// Image file to analyze
        image: PathBuf,

        /// Free-text guidance for the analysis
        #[arg(short, long)]
        prompt: Option<String>,
    },

    /// Identify an artifact: era, function, symbolism
    Analyze {
        /// Image file to analyze
        image: PathBuf,

        /// Free-text guidance for the analysis
        #[arg(short, long)]
        prompt: Option<String>,
    },

    /// Render a photorealistic restoration of an artifact
    Render {
        /// Image file to re-render
        image: PathBuf,

        /// Where to write the generated image (extension follows the
        /// returned MIME type when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the rendering instruction
        #[arg(long)]
        prompt: Option<String>,
    },

    /// Chat with Thoth, the Egyptology assistant
    Chat,

    /// Evaluate a quiz answer about ancient Egypt
    Quiz {
        /// The quiz question
        question: String,

        /// The answer to judge
        answer: String,
    },

    /// Generate a blog post on an Ancient Egypt topic
    Blog {
        /// Topic of the post
        topic: String,

        /// Write the Markdown to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Synthesize speech for a text
    Speak {
        /// Text to speak
        text: String,

        /// Language code used to pick the voice
        #[arg(long, default_value = "en")]
        lang: String,

        /// Output file for the raw PCM audio (24 kHz, 16-bit, mono)
        #[arg(short, long, default_value = "speech.pcm")]
        output: PathBuf,
    },

    /// Analysis history operations
    History {
        #[command(subcommand)]
        action: HistoryCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Show generation service status
    Status,
}

#[derive(Subcommand, Debug)]
enum HistoryCommands {
    /// List recent analyses, newest first
    List {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "20")]
        count: usize,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load configuration
    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Some(Commands::Translate { image, prompt }) => {
            run_operation(config, OperationKind::Translate, image, prompt, None, &cli.format).await
        }
        Some(Commands::Analyze { image, prompt }) => {
            run_operation(config, OperationKind::Analyze, image, prompt, None, &cli.format).await
        }
        Some(Commands::Render { image, output, prompt }) => {
            run_operation(config, OperationKind::Render, image, prompt, output, &cli.format).await
        }
        Some(Commands::Chat) => run_chat(config).await,
        Some(Commands::Quiz { question, answer }) => {
            run_quiz(config, &question, &answer, &cli.format).await
        }
        Some(Commands::Blog { topic, output }) => run_blog(config, &topic, output).await,
        Some(Commands::Speak { text, lang, output }) => {
            run_speak(config, &text, &lang, &output).await
        }
        Some(Commands::History { action }) => run_history_command(config, action, &cli.format).await,
        Some(Commands::Config { action }) => run_config_command(config, action, &cli.config).await,
        Some(Commands::Status) | None => run_status(config).await,
    }
}

/// Build the orchestrator from configuration
fn build_orchestrator(config: AppConfig) -> Result<Orchestrator> {
    let client = GenAiClient::from_config(&config.engine)?;
    let store = JsonFileHistory::new(PathBuf::from(&config.history.path));
    Ok(Orchestrator::new(Arc::new(client), Arc::new(store), config))
}

/// Run a single analysis operation
async fn run_operation(
    config: AppConfig,
    kind: OperationKind,
    image: PathBuf,
    prompt: Option<String>,
    output: Option<PathBuf>,
    format: &str,
) -> Result<()> {
    let media = MediaPayload::from_path(&image)?;
    info!("Analyzing: {:?}", image);

    let orchestrator = build_orchestrator(config)?;
    let outcome = orchestrator.perform(kind, media, prompt.as_deref()).await?;

    if let Some(ref record) = outcome.record {
        info!("Recorded in history: {}", record.id);
    }

    match outcome.output {
        AnalysisOutput::Report(report) => {
            if format == "json" {
                let mut value = serde_json::to_value(&report)?;
                if let Some(ref record) = outcome.record {
                    value["record_id"] = serde_json::Value::String(record.id.clone());
                }
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("Translation:\n  {}\n", report.translation);
                println!("Context:\n  {}\n", report.context);
                println!("Symbolism:\n  {}\n", report.symbolism);
                println!("Artifact type:\n  {}", report.artifact_type);
            }
        }
        AnalysisOutput::Rendered(rendered) => {
            let path = output.unwrap_or_else(|| {
                let stem = image
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("artifact");
                PathBuf::from(format!(
                    "{}_restored.{}",
                    stem,
                    extension_for_mime(&rendered.mime_type)
                ))
            });
            std::fs::write(&path, &rendered.data)?;

            if format == "json" {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "output": path.to_string_lossy(),
                        "mime_type": rendered.mime_type,
                        "caption": rendered.caption,
                        "record_id": outcome.record.as_ref().map(|r| r.id.clone()),
                    }))?
                );
            } else {
                println!("Rendered image written to {:?}", path);
                if let Some(caption) = rendered.caption {
                    println!("Caption: {}", caption);
                }
            }
        }
    }

    Ok(())
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "jpg",
    }
}

/// Interactive chat loop
async fn run_chat(config: AppConfig) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;
    let mut chat = orchestrator.start_chat();

    println!("Chatting with Thoth. Type 'exit' to quit.");

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        match chat.send(line).await {
            Ok(reply) => println!("{}\n", reply),
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    Ok(())
}

/// Judge a quiz answer
async fn run_quiz(config: AppConfig, question: &str, answer: &str, format: &str) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;
    let verdict = orchestrator.evaluate_quiz(question, answer).await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    } else {
        if verdict.is_correct {
            println!("Correct!");
        } else {
            println!("Not quite.");
        }
        println!("{}", verdict.explanation);
    }

    Ok(())
}

/// Generate a blog post
async fn run_blog(config: AppConfig, topic: &str, output: Option<PathBuf>) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;
    let post = orchestrator.generate_blog_post(topic).await?;

    match output {
        Some(path) => {
            std::fs::write(&path, &post)?;
            println!("Blog post written to {:?}", path);
        }
        None => println!("{}", post),
    }

    Ok(())
}

/// Synthesize speech to a PCM file
async fn run_speak(config: AppConfig, text: &str, lang: &str, output: &Path) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;
    let audio = orchestrator.synthesize_speech(text, lang).await?;

    std::fs::write(output, &audio)?;
    println!(
        "Wrote {} bytes of 24 kHz 16-bit mono PCM to {:?}",
        audio.len(),
        output
    );

    Ok(())
}

/// Run history commands
async fn run_history_command(
    config: AppConfig,
    action: HistoryCommands,
    format: &str,
) -> Result<()> {
    let store = JsonFileHistory::new(PathBuf::from(&config.history.path));

    match action {
        HistoryCommands::List { count } => {
            let mut records = store.list().await?;
            records.truncate(count);

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }

            if records.is_empty() {
                println!("No analyses recorded yet");
                return Ok(());
            }

            println!("Recent analyses ({} entries):", records.len());
            for record in records {
                let mut prompt = record.prompt.clone();
                if prompt.len() > 60 {
                    prompt.truncate(60);
                    prompt.push_str("...");
                }
                println!(
                    "  {} [{:?}] {}",
                    record.created_at.format("%Y-%m-%d %H:%M"),
                    record.kind,
                    prompt
                );
            }
        }
    }

    Ok(())
}

/// Run config commands
async fn run_config_command(
    config: AppConfig,
    action: ConfigCommands,
    config_path: &Path,
) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            let default_config = AppConfig::default();
            default_config.save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            println!("Configuration at {:?} is valid", config_path);
            println!("  Engine URL: {}", config.engine.url);
            println!("  Vision model: {}", config.engine.models.vision);
            println!("  History file: {}", config.history.path);
        }
    }

    Ok(())
}

/// Run status check
async fn run_status(config: AppConfig) -> Result<()> {
    println!("HieroScribe v1.0.0 Status");
    println!("=========================");

    match GenAiClient::from_config(&config.engine) {
        Ok(client) => {
            match client.health_check().await {
                Ok(()) => println!("Generation API: reachable"),
                Err(e) => println!("Generation API: error - {}", e),
            }

            match client.list_models().await {
                Ok(models) => {
                    println!("\nAvailable models:");
                    for m in &models {
                        let marker = if m.ends_with(&config.engine.models.vision)
                            || m.ends_with(&config.engine.models.text)
                        {
                            "→"
                        } else {
                            " "
                        };
                        println!("  {} {}", marker, m);
                    }
                }
                Err(e) => println!("  Error listing models: {}", e),
            }
        }
        Err(e) => println!("Generation API: not configured - {}", e),
    }

    let store = JsonFileHistory::new(PathBuf::from(&config.history.path));
    let records = store.list().await?;
    println!("\nHistory ({}):", config.history.path);
    println!("  Recorded analyses: {}", records.len());

    println!("\nConfiguration:");
    println!("  Vision model: {}", config.engine.models.vision);
    println!("  Text model: {}", config.engine.models.text);
    println!("  Image model: {}", config.engine.models.image);
    println!("  Speech model: {}", config.engine.models.speech);

    Ok(())
}
