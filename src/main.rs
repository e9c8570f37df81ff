use anyhow::{Context, Result};
use clap::Parser;
use image_proxy::app::App;
use image_proxy::models::{AiProvider, Config};
use std::net::SocketAddr;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "image-proxy")]
#[command(about = "Serve the prompt-to-image generation endpoint")]
struct CliArgs {
    /// Port to listen on (overrides PORT).
    #[arg(long)]
    port: Option<u16>,

    /// Always answer with the placeholder image (overrides USE_MOCK_IMAGE).
    #[arg(long)]
    mock: bool,

    /// Image provider: stability, huggingface or openai (overrides IMAGE_PROVIDER).
    #[arg(long, value_name = "PROVIDER", value_parser = parse_provider_arg)]
    provider: Option<AiProvider>,
}

fn parse_provider_arg(input: &str) -> std::result::Result<AiProvider, String> {
    input.parse()
}

/// Resolve configuration with CLI flags taking precedence over the environment.
///
/// The provider flag is fed into the lookup so keys and retry defaults are
/// resolved for the chosen provider in one pass.
fn load_config<F>(args: &CliArgs, lookup: F) -> image_proxy::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let provider = args.provider.map(|p| p.to_string());
    let mut config = Config::from_lookup(|key| match (key, &provider) {
        ("IMAGE_PROVIDER", Some(provider)) => Some(provider.clone()),
        _ => lookup(key),
    })?;

    if let Some(port) = args.port {
        config.port = port;
    }
    if args.mock {
        config.use_mock = true;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "image_proxy=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting image-proxy");

    let args = CliArgs::parse();
    dotenvy::dotenv().ok();
    let config = load_config(&args, |key| std::env::var(key).ok())
        .context("Failed to load configuration")?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let app = match App::new(config) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    app.serve(addr).await.context("HTTP server failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image_proxy::ai::{Backoff, RetryPolicy};
    use std::collections::HashMap;
    use std::time::Duration;

    #[test]
    fn test_parse_provider_arg_valid() {
        assert_eq!(parse_provider_arg("openai").unwrap(), AiProvider::OpenAi);
        assert_eq!(parse_provider_arg("HF").unwrap(), AiProvider::HuggingFace);
    }

    #[test]
    fn test_parse_provider_arg_invalid() {
        let err = parse_provider_arg("dalle").unwrap_err();
        assert!(err.contains("stability, huggingface, openai"));
    }

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_args_override_config() {
        let args = CliArgs::parse_from(["image-proxy", "--port", "9001", "--mock"]);
        let config = load_config(&args, lookup(&[("PORT", "3000")])).unwrap();
        assert_eq!(config.port, 9001);
        assert!(config.use_mock);
        assert_eq!(config.provider, AiProvider::Stability);
    }

    #[test]
    fn test_provider_flag_matches_provider_env() {
        let env = [
            ("RETRY_MAX_ATTEMPTS", "5"),
            ("HF_API_KEY", "hf_test"),
            ("STABILITY_API_KEY", "sk-test"),
        ];
        let from_flag = load_config(
            &CliArgs::parse_from(["image-proxy", "--provider", "huggingface"]),
            lookup(&env),
        )
        .unwrap();

        let mut with_provider = env.to_vec();
        with_provider.push(("IMAGE_PROVIDER", "huggingface"));
        let from_env =
            load_config(&CliArgs::parse_from(["image-proxy"]), lookup(&with_provider)).unwrap();

        assert_eq!(from_flag, from_env);
        assert_eq!(from_flag.api_key.as_deref(), Some("hf_test"));
        assert_eq!(
            from_flag.retry_policy(),
            RetryPolicy::new(5, Duration::from_millis(2000), Backoff::Linear)
        );
    }

    #[test]
    fn test_provider_flag_beats_provider_env() {
        let args = CliArgs::parse_from(["image-proxy", "--provider", "openai"]);
        let config = load_config(
            &args,
            lookup(&[("IMAGE_PROVIDER", "stability"), ("OPENAI_API_KEY", "sk-openai")]),
        )
        .unwrap();
        assert_eq!(config.provider, AiProvider::OpenAi);
        assert_eq!(config.api_key.as_deref(), Some("sk-openai"));
    }
}
