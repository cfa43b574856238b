use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use quill::core::config::{CliOverrides, QuillConfig, load_config, resolve};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

#[derive(Parser)]
#[command(name = "quill", about = "Terminal chat with attachments and voice notes")]
struct Args {
    /// Model to request (overrides config)
    #[arg(short, long)]
    model: Option<String>,

    /// OpenAI-compatible endpoint, e.g. http://localhost:1234/v1
    #[arg(long)]
    base_url: Option<String>,

    /// File to attach before the first message
    #[arg(short, long)]
    attach: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to quill.log in current directory
    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();

    if let Ok(log_file) = File::create("quill.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    let file_config = load_config().unwrap_or_else(|e| {
        log::warn!("{e}; using defaults");
        QuillConfig::default()
    });
    let config = resolve(
        &file_config,
        &CliOverrides {
            model: args.model,
            base_url: args.base_url,
        },
    );

    log::info!(
        "Quill starting up with model {} at {}",
        config.model_name,
        config.base_url
    );

    quill::tui::run(config, args.attach)
}
