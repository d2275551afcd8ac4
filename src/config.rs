use anyhow::Result;
use clap::Parser;

/// Scaffold Gateway - workflow execution and generation service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Server host address
    #[arg(short = 'H', long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Server port
    #[arg(short, long, env = "SERVER_PORT", default_value = "3000")]
    pub port: u16,

    /// Optional API key protecting the /api routes
    #[arg(short = 'k', long, env = "GATEWAY_API_KEY")]
    pub api_key: Option<String>,

    /// Paradigm API key (workflow execution)
    #[arg(long, env = "PARADIGM_API_KEY", hide_env_values = true)]
    pub paradigm_api_key: Option<String>,

    /// Paradigm API base URL
    #[arg(
        long,
        env = "PARADIGM_BASE_URL",
        default_value = "https://paradigm.lighton.ai/api/v2"
    )]
    pub paradigm_base_url: String,

    /// OpenAI API key (workflow generation)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// OpenAI API base URL
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com")]
    pub openai_base_url: String,

    /// Anthropic API key (connectivity probe)
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    /// Anthropic API base URL
    #[arg(
        long,
        env = "ANTHROPIC_BASE_URL",
        default_value = "https://api.anthropic.com"
    )]
    pub anthropic_base_url: String,

    /// Public URL of this gateway, advertised in generated tool configs
    #[arg(
        long,
        env = "PUBLIC_BASE_URL",
        default_value = "https://scaffold-ai-test1.vercel.app"
    )]
    pub public_base_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Debug mode (off, errors, all)
    #[arg(long, env = "DEBUG_MODE", default_value = "off")]
    pub debug_mode: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "120")]
    pub http_timeout: u64,

    /// Interval between document analysis status polls, in milliseconds
    #[arg(long, env = "ANALYSIS_POLL_INTERVAL_MS", default_value = "2000")]
    pub poll_interval_ms: u64,

    /// Maximum number of document analysis status polls
    #[arg(long, env = "ANALYSIS_POLL_MAX_ATTEMPTS", default_value = "30")]
    pub poll_max_attempts: u32,
}

#[derive(Clone, Debug)]
pub struct Config {
    // Server settings
    pub server_host: String,
    pub server_port: u16,

    // Authentication
    pub gateway_api_key: Option<String>,

    // Upstream credentials
    pub paradigm_api_key: Option<String>,
    pub paradigm_base_url: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub anthropic_api_key: Option<String>,
    pub anthropic_base_url: String,
    pub public_base_url: String,

    // HTTP client
    pub http_max_connections: usize,
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    // Document analysis polling
    pub analysis_poll_interval_ms: u64,
    pub analysis_poll_max_attempts: u32,

    // Debug
    pub debug_mode: DebugMode,
    pub log_level: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DebugMode {
    Off,
    Errors,
    All,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();

        let config = Config {
            server_host: args.host,
            server_port: args.port,

            gateway_api_key: non_empty(args.api_key),

            paradigm_api_key: non_empty(args.paradigm_api_key),
            paradigm_base_url: trim_base_url(&args.paradigm_base_url),
            openai_api_key: non_empty(args.openai_api_key),
            openai_base_url: trim_base_url(&args.openai_base_url),
            anthropic_api_key: non_empty(args.anthropic_api_key),
            anthropic_base_url: trim_base_url(&args.anthropic_base_url),
            public_base_url: trim_base_url(&args.public_base_url),

            http_max_connections: std::env::var("HTTP_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20),

            http_connect_timeout: std::env::var("HTTP_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),

            http_request_timeout: args.http_timeout,

            analysis_poll_interval_ms: args.poll_interval_ms,
            analysis_poll_max_attempts: args.poll_max_attempts,

            debug_mode: parse_debug_mode(&args.debug_mode),
            log_level: args.log_level,
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.analysis_poll_max_attempts == 0 {
            anyhow::bail!("ANALYSIS_POLL_MAX_ATTEMPTS must be at least 1");
        }

        for (name, url) in [
            ("PARADIGM_BASE_URL", &self.paradigm_base_url),
            ("OPENAI_BASE_URL", &self.openai_base_url),
            ("ANTHROPIC_BASE_URL", &self.anthropic_base_url),
        ] {
            if url.is_empty() {
                anyhow::bail!("{} cannot be empty", name);
            }
        }

        Ok(())
    }
}

/// Treat empty strings from the environment as unset
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Strip trailing slashes so endpoint paths can be appended verbatim
fn trim_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Parse debug mode from string
fn parse_debug_mode(s: &str) -> DebugMode {
    match s.to_lowercase().as_str() {
        "errors" => DebugMode::Errors,
        "all" => DebugMode::All,
        _ => DebugMode::Off,
    }
}

/// Shorten a secret for log output
pub fn key_prefix(key: &str) -> String {
    let prefix: String = key.chars().take(10).collect();
    format!("{}...", prefix)
}
