use clap::Parser;
use thiserror::Error;

use gbridge_provider_impl::AistudioSettings;
use gbridge_provider_impl::provider::aistudio::DEFAULT_BASE_URL;
use gbridge_transform::generate_content::openai_chat2gemini::DEFAULT_MODEL;

#[derive(Debug, Clone, Parser)]
#[command(name = "gbridge", version, about = "OpenAI chat completions on top of the Gemini API")]
pub struct Cli {
    #[arg(long, env = "GBRIDGE_HOST", default_value = "0.0.0.0")]
    pub host: String,
    #[arg(long, env = "GBRIDGE_PORT", default_value_t = 8080)]
    pub port: u16,
    /// Gemini API root, without the version segment.
    #[arg(long, env = "GBRIDGE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,
    /// Upstream model for requests that do not name a Gemini model.
    #[arg(long, env = "GBRIDGE_DEFAULT_MODEL", default_value = DEFAULT_MODEL)]
    pub default_model: String,
    /// Sent upstream when a request has no `Authorization` header.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
    /// Outbound proxy (http, https or socks5 URL).
    #[arg(long, env = "GBRIDGE_PROXY")]
    pub proxy: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("base url must start with http:// or https://: {0}")]
    InvalidBaseUrl(String),
    #[error("default model must not be empty")]
    EmptyDefaultModel,
}

impl Cli {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn aistudio_settings(&self) -> Result<AistudioSettings, ConfigError> {
        let base_url = self.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(base_url.to_string()));
        }
        let default_model = self.default_model.trim();
        if default_model.is_empty() {
            return Err(ConfigError::EmptyDefaultModel);
        }
        Ok(AistudioSettings {
            base_url: base_url.to_string(),
            default_model: default_model.to_string(),
        })
    }

    pub fn fallback_api_key(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("gbridge").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_override_defaults() {
        let cli = parse(&[
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
            "--base-url",
            "http://localhost:1234/",
            "--default-model",
            "gemini-2.0-flash",
            "--api-key",
            " k ",
        ]);
        assert_eq!(cli.bind_addr(), "127.0.0.1:9000");
        let settings = cli.aistudio_settings().unwrap();
        assert_eq!(settings.base_url, "http://localhost:1234/");
        assert_eq!(settings.default_model, "gemini-2.0-flash");
        assert_eq!(cli.fallback_api_key().as_deref(), Some("k"));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let cli = parse(&["--base-url", "ftp://x", "--default-model", "m"]);
        assert!(matches!(
            cli.aistudio_settings(),
            Err(ConfigError::InvalidBaseUrl(_))
        ));

        let cli = parse(&["--base-url", "https://x", "--default-model", " "]);
        assert_eq!(cli.aistudio_settings(), Err(ConfigError::EmptyDefaultModel));
    }
}
