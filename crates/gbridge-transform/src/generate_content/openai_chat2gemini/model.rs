/// Used when the inbound model name is not a Gemini model.
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro-latest";

/// Map an OpenAI-side model name onto a Gemini model id.
///
/// `models/<x>` is stripped to `<x>`, `gemini-*` and `learnlm-*` are used as
/// is, anything else (including `gpt-4`) falls back to `default_model`.
pub fn resolve_model(requested: Option<&str>, default_model: &str) -> String {
    match requested {
        Some(name) if name.starts_with("models/") => name["models/".len()..].to_string(),
        Some(name) if name.starts_with("gemini-") || name.starts_with("learnlm-") => {
            name.to_string()
        }
        _ => default_model.to_string(),
    }
}
