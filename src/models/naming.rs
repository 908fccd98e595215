use once_cell::sync::Lazy;
use regex::Regex;

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// Name given to a model whose file name has no usable characters.
pub const FALLBACK_NAME: &str = "model";

/// Derives the registered model name from a file stem.
///
/// Lowercases, turns each run of characters outside `[a-z0-9]` into one
/// hyphen and trims hyphens from both ends.
pub fn normalize_model_name(stem: &str) -> String {
    let lower = stem.to_lowercase();
    let hyphenated = SEPARATORS.replace_all(&lower, "-");
    let trimmed = hyphenated.trim_matches('-');

    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uppercase_and_underscores() {
        assert_eq!(normalize_model_name("Llama3-Small_Q3_K_S"), "llama3-small-q3-k-s");
    }

    #[test]
    fn test_dots_spaces_and_runs_collapse() {
        assert_eq!(normalize_model_name("Meta Llama 3.1 -- 8B (Instruct)"), "meta-llama-3-1-8b-instruct");
    }

    #[test]
    fn test_edges_are_trimmed() {
        assert_eq!(normalize_model_name("__Mistral__"), "mistral");
    }

    #[test]
    fn test_already_normal_is_unchanged() {
        assert_eq!(normalize_model_name("phi3-mini"), "phi3-mini");
    }

    #[test]
    fn test_nothing_usable_falls_back() {
        assert_eq!(normalize_model_name("__!!__"), FALLBACK_NAME);
    }
}
