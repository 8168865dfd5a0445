pub mod citations;
pub mod cli;
pub mod config;
pub mod engine;
pub mod llm;
pub mod pipeline;
pub mod retriever;

// Re-export commonly used types
pub use config::Config;
pub use pipeline::{ChatPipeline, StormResearcher};
