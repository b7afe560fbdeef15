use anyhow::Result;
use clap::Parser;
use clap::builder::NonEmptyStringValueParser;
use std::path::PathBuf;
use webaisum::config::Config;
use webaisum::run::{self, RunRequest};

#[derive(Parser)]
#[command(name = "webaisum", about = "Summarize a web page using an AI model")]
struct Cli {
    /// The URL of the web page to summarize
    #[arg(value_parser = NonEmptyStringValueParser::new())]
    url: String,

    /// The AI model to use (default: llama3 or gpt-4-turbo)
    #[arg(long)]
    model: Option<String>,

    /// Base URL of the remote AI server to use (ignored with --use-openai)
    #[arg(long)]
    server: Option<String>,

    /// Enable debug mode to print verbose output
    #[arg(long)]
    debug: bool,

    /// Use OpenAI instead of Ollama for summarization
    #[arg(long)]
    use_openai: bool,

    /// Path to config file
    #[arg(short, long, default_value = "webaisum.toml")]
    config: PathBuf,
}

impl From<Cli> for RunRequest {
    fn from(cli: Cli) -> Self {
        Self {
            url: cli.url,
            model_override: cli.model,
            server_url: cli.server,
            debug: cli.debug,
            use_openai: cli.use_openai,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug {
        "webaisum=debug"
    } else {
        "webaisum=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();

    let config = Config::load_or_default(&cli.config)?.with_env_overrides();
    let request = RunRequest::from(cli);

    let mut stdout = std::io::stdout().lock();
    let outcome = run::execute(&request, &config, &mut stdout).await?;
    tracing::debug!(?outcome, "done");
    Ok(())
}
