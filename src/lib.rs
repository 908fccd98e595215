//! Run a local GGUF model behind Ollama and a web chat UI via Docker Compose,
//! and talk to it from the terminal.

pub mod chat;
pub mod config;
pub mod models;
pub mod ollama;
pub mod stack;
