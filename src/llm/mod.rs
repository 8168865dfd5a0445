pub mod client;

pub use client::{ChatCompletion, LLMClient};
