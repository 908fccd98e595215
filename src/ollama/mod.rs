//! Client for the Ollama inference server's HTTP API.

mod client;
mod stream;
mod types;

pub use client::{OllamaClient, ResponseStream};
pub use stream::NdjsonDecoder;
pub use types::{GenerateOptions, GenerateRequest, GenerateResponse, ModelInfo, OllamaError};
