use std::io::{stdout, Write};

use anyhow::Result;
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{info, warn};

use super::command_handlers::{handle_list_models, ChatContext};
use super::display::{print_header, print_interactive_help};

/// What the interactive loop should do with one line of input.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum ChatInput<'a> {
    Quit,
    Help,
    Clear,
    Models,
    Reset,
    Empty,
    Message(&'a str),
}

pub(super) fn parse_input(line: &str) -> ChatInput<'_> {
    let trimmed = line.trim();
    match trimmed.to_lowercase().as_str() {
        "/quit" | "/exit" | "/q" => ChatInput::Quit,
        "/help" => ChatInput::Help,
        "/clear" => ChatInput::Clear,
        "/models" => ChatInput::Models,
        "/reset" => ChatInput::Reset,
        "" => ChatInput::Empty,
        _ => ChatInput::Message(trimmed),
    }
}

// --- Main Chat Loop ---

/// Interactive chat. The server's context is carried between turns so the
/// model sees the conversation so far.
pub async fn chat_loop(context: &ChatContext) -> Result<()> {
    context.ensure_connected().await?;
    info!("Starting interactive chat with {}", context.model);

    print_header(&format!("Interactive Chat with {}", context.model));
    println!("{}\n", "Type /quit to exit, /help for commands".yellow());

    let mut rl = DefaultEditor::new()?;
    let mut conversation: Option<Vec<i64>> = None;

    loop {
        let readline = rl.readline("[you] > ");

        match readline {
            Ok(line) => {
                let input = parse_input(&line);
                if let ChatInput::Message(message) = input {
                    let _ = rl.add_history_entry(message);
                }

                match input {
                    ChatInput::Quit => {
                        println!("{}", "👋 Goodbye!".yellow());
                        break;
                    }
                    ChatInput::Help => print_interactive_help(),
                    ChatInput::Clear => {
                        print!("\x1B[2J\x1B[1;1H");
                        stdout().flush().ok();
                    }
                    ChatInput::Models => {
                        if let Err(e) = handle_list_models(context).await {
                            println!("{} {}", "❌ Error:".red(), e);
                        }
                    }
                    ChatInput::Reset => {
                        conversation = None;
                        println!("{}", "Conversation cleared".yellow());
                    }
                    ChatInput::Empty => continue,
                    ChatInput::Message(message) => {
                        print!("{} ", "🤖 AI:".blue());
                        stdout().flush().ok();

                        let mut out = stdout();
                        match context.respond(&mut out, message, None, conversation.take()).await {
                            Ok(next) => conversation = next,
                            Err(e) => {
                                warn!("Generation failed: {}", e);
                                println!("\n{} {}", "❌ Error:".red(), e);
                            }
                        }
                        println!();
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("\n{}", "👋 Goodbye!".yellow());
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quit_aliases() {
        for line in ["/quit", "/exit", "/q", "  /QUIT  "] {
            assert_eq!(parse_input(line), ChatInput::Quit);
        }
    }

    #[test]
    fn test_commands_and_messages() {
        assert_eq!(parse_input("/help"), ChatInput::Help);
        assert_eq!(parse_input("/clear"), ChatInput::Clear);
        assert_eq!(parse_input("/models"), ChatInput::Models);
        assert_eq!(parse_input("/reset"), ChatInput::Reset);
        assert_eq!(parse_input("   "), ChatInput::Empty);
        assert_eq!(parse_input("  Hello there "), ChatInput::Message("Hello there"));
        assert_eq!(parse_input("/unknown"), ChatInput::Message("/unknown"));
    }
}
