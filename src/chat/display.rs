use chrono::DateTime;
use colored::*;
use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};

use crate::ollama::ModelInfo;

/// Prints the banner shown before each command's output.
pub fn print_header(text: &str) {
    println!("\n{}", "═".repeat(60).blue());
    println!("{}", format!("🤖 llamabox - {}", text).bold());
    println!("{}\n", "═".repeat(60).blue());
}

/// Formats bytes with one decimal, in B/KB/MB/GB/TB.
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{:.1}{}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1}TB", size)
}

/// `2024-05-01T10:20:30.123+02:00` -> `2024-05-01 10:20:30`.
///
/// Timestamps that do not parse keep their first 19 characters.
pub fn format_modified(timestamp: &str) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        Err(_) if timestamp.is_empty() => "Unknown".to_string(),
        Err(_) => timestamp.chars().take(19).collect::<String>().replace('T', " "),
    }
}

/// Builds the table printed by `models`.
pub fn models_table(models: &[ModelInfo]) -> Table {
    let mut table = Table::new();
    table
        .set_header(vec![
            Cell::new("Model Name").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Size").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Modified").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
        ])
        .load_preset(comfy_table::presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    for model in models {
        table.add_row(vec![
            Cell::new(&model.name).fg(comfy_table::Color::Green),
            Cell::new(format_size(model.size)).fg(comfy_table::Color::Blue).set_alignment(CellAlignment::Right),
            Cell::new(format_modified(&model.modified_at)).fg(comfy_table::Color::DarkGrey),
        ]);
    }
    table
}

/// Prints the models table, or a notice when there are none.
pub fn display_models(models: &[ModelInfo]) {
    print_header("Available Models");
    if models.is_empty() {
        println!("{}", "No models found".yellow());
        return;
    }
    println!("{}", models_table(models));
    println!("{}", format!("Total models: {}", models.len()).bright_green());
}

pub fn print_interactive_help() {
    println!("\n{}", "📋 Interactive Commands:".yellow());
    println!("{:<20} - Exit the chat", "/quit, /exit, /q".green());
    println!("{:<20} - Show this help", "/help".green());
    println!("{:<20} - Clear screen", "/clear".green());
    println!("{:<20} - List available models", "/models".green());
    println!("{:<20} - Forget the conversation so far", "/reset".green());
    println!();
}
