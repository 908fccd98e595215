use std::fs;
use std::io;
use std::path::Path;

pub const CODE_SYSTEM: &str = "You are an expert programmer. Provide clean, well-commented code solutions. \
Always include explanations of how the code works. Format code blocks properly with language markers.";

pub const EXPLAIN_SYSTEM: &str = "You are a helpful teacher. Explain concepts clearly and thoroughly. \
Use examples when helpful. Break down complex topics into understandable parts.";

pub const SUMMARIZE_SYSTEM: &str = "You are an expert at creating concise, informative summaries. \
Capture the key points and main ideas while being clear and comprehensive.";

pub const REVIEW_SYSTEM: &str = "You are an experienced code reviewer. Analyze code for:
- Bugs and potential issues
- Performance improvements
- Best practices
- Security concerns
- Code style and readability
Provide constructive feedback with specific suggestions.";

pub fn translate_system(language: &str) -> String {
    format!(
        "You are a professional translator. Translate the given text to {} accurately, \
maintaining the original meaning and context. Provide only the translation unless asked otherwise.",
        language
    )
}

pub fn translate_prompt(text: &str, language: &str) -> String {
    format!("Translate this to {}: {}", language, text)
}

/// Prompt for `explain`; a path to an existing file explains its contents.
pub fn explain_prompt(topic: &str) -> io::Result<String> {
    let path = Path::new(topic);
    if path.is_file() {
        let content = fs::read_to_string(path)?;
        Ok(format!("Please explain this code:\n\n```\n{}\n```", content))
    } else {
        Ok(format!("Please explain: {}", topic))
    }
}

/// Prompt for `summarize` plus a short description of what was summarised.
pub fn summarize_prompt(input: &str) -> io::Result<(String, String)> {
    let path = Path::new(input);
    if path.is_file() {
        let content = fs::read_to_string(path)?;
        Ok((
            format!("Please summarize this content:\n\n{}", content),
            format!("File: {}", input),
        ))
    } else {
        Ok((format!("Please summarize: {}", input), "Text input".to_string()))
    }
}

/// Prompt for `review`; the file must exist.
pub fn review_prompt(file: &Path) -> io::Result<String> {
    if !file.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("File not found: {}", file.display()),
        ));
    }
    let content = fs::read_to_string(file)?;
    Ok(format!("Please review this code and provide feedback:\n\n```\n{}\n```", content))
}
