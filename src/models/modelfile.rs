/// Llama 3 chat template wrapped around every imported model.
const TEMPLATE: &str = r#"TEMPLATE """{{ if .System }}<|start_header_id|>system<|end_header_id|>

{{ .System }}<|eot_id|>{{ end }}{{ if .Prompt }}<|start_header_id|>user<|end_header_id|>

{{ .Prompt }}<|eot_id|>{{ end }}<|start_header_id|>assistant<|end_header_id|>

{{ .Response }}<|eot_id|>""""#;

/// Tokens that end a model turn.
pub const STOP_TOKENS: [&str; 3] = ["<|start_header_id|>", "<|end_header_id|>", "<|eot_id|>"];

/// Renders the Modelfile that registers `source` (as written after `FROM`).
pub fn render_modelfile(source: &str) -> String {
    let mut out = format!("FROM {}\n\n{}\n\n", source, TEMPLATE);
    for token in STOP_TOKENS {
        out.push_str(&format!("PARAMETER stop \"{}\"\n", token));
    }
    out
}
