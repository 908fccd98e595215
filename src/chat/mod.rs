//! Terminal front-end: the interactive chat loop, the one-shot task
//! commands and their output formatting.

mod chat;
mod command_handlers;
mod display;
mod prompts;

pub use chat::chat_loop;
pub use command_handlers::{
    handle_chat_once, handle_code, handle_explain, handle_list_models, handle_review,
    handle_summarize, handle_translate, ChatContext,
};
