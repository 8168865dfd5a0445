use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use storm_wiki_pipeline::cli::Args;
use storm_wiki_pipeline::engine::ProcessRunnerFactory;
use storm_wiki_pipeline::llm::LLMClient;
use storm_wiki_pipeline::pipeline::{ChatMessage, ChatPipeline, StormResearcher};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // 日志写到 stderr，stdout 只输出文章
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let topic = args.topic.clone();
    let output = args.output.clone();
    let extract_topic = args.extract_topic;
    let config = args.into_config()?;

    let factory = Arc::new(ProcessRunnerFactory::new(config.engine.command.clone()));
    let researcher = StormResearcher::new(config.clone(), factory);

    let text = if extract_topic {
        let client = LLMClient::new(config.llm.clone(), &config.openai_api_key)?;
        let pipeline = ChatPipeline::new(researcher, Arc::new(client));
        pipeline.on_startup().await;
        let result = pipeline
            .pipe(
                &topic,
                "storm-wiki-researcher",
                &[ChatMessage::user(topic.as_str())],
                &serde_json::Value::Null,
            )
            .await;
        pipeline.on_shutdown().await;
        result?
    } else {
        researcher.research(&topic).await?
    };

    match output {
        Some(path) => {
            std::fs::write(&path, text)
                .with_context(|| format!("Failed to write output file: {:?}", path))?;
            info!("💾 已保存文章: {}", path.display());
        }
        None => println!("{}", text),
    }

    Ok(())
}
