use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use futures::StreamExt;
use ollama_bridge::adk::model::{Content, GenerateContentParameters, GenerationConfig};
use ollama_bridge::adk::error::Result;
use ollama_bridge::adk::{ContentGenerator, ContentGeneratorConfig, OllamaContentGenerator};
use std::io::Write;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML config file; defaults to OLLAMA_* environment variables
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the model
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Override the Ollama base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a response to a prompt
    Generate {
        /// The prompt to send
        #[arg(short, long)]
        prompt: String,

        /// System instruction
        #[arg(short, long)]
        system: Option<String>,

        /// Print the response as it streams in
        #[arg(long)]
        stream: bool,
    },
    /// Estimate the token count of a prompt
    CountTokens {
        #[arg(short, long)]
        prompt: String,
    },
    /// Embed a prompt
    Embed {
        #[arg(short, long)]
        prompt: String,
    },
}

fn load_config(args: &Args) -> anyhow::Result<ContentGeneratorConfig> {
    let mut config = match &args.config {
        Some(path) => ContentGeneratorConfig::load_yaml(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ContentGeneratorConfig::from_env().context("Invalid OLLAMA_* environment")?,
    };

    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    if let Some(base_url) = &args.base_url {
        config.base_url = Some(base_url.clone());
    }
    Ok(config)
}

async fn run(generator: &OllamaContentGenerator, command: Commands) -> Result<()> {
    match command {
        Commands::Generate {
            prompt,
            system,
            stream,
        } => {
            let mut request = GenerateContentParameters::new(vec![Content::user(prompt)]);
            if let Some(system) = system {
                request = request.with_config(GenerationConfig {
                    system_instruction: Some(Content::user(system)),
                    ..Default::default()
                });
            }
            let prompt_id = Uuid::new_v4().to_string();

            if stream {
                let mut responses = generator
                    .generate_content_stream(&request, &prompt_id)
                    .await?;
                let mut stdout = std::io::stdout();
                while let Some(response) = responses.next().await {
                    let response = response?;
                    write!(stdout, "{}", response.text())?;
                    stdout.flush()?;
                    for call in response.function_calls() {
                        writeln!(stdout, "\n[call] {} {}", call.name, call.args)?;
                    }
                }
                writeln!(stdout)?;
            } else {
                let response = generator.generate_content(&request, &prompt_id).await?;
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
        }
        Commands::CountTokens { prompt } => {
            let request = GenerateContentParameters::new(vec![Content::user(prompt)]);
            let count = generator.count_tokens(&request).await?;
            println!("{}", serde_json::to_string_pretty(&count)?);
        }
        Commands::Embed { prompt } => {
            let request = GenerateContentParameters::new(vec![Content::user(prompt)]);
            let embedding = generator.embed_content(&request).await?;
            println!("{}", serde_json::to_string_pretty(&embedding)?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let config = load_config(&args)?;

    log::info!(
        "Using Ollama at {} with model: {}",
        config.base_url(),
        config.model
    );

    let generator = OllamaContentGenerator::new(config)?;

    if let Err(e) = run(&generator, args.command).await {
        if e.is_transport() {
            log::error!(
                "Request to {} failed; is Ollama running and is model {} pulled?",
                generator.config().base_url(),
                generator.config().model
            );
        }
        return Err(e.into());
    }

    Ok(())
}
