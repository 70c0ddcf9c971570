use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;

const DEFAULT_LAYOUT: &str = "./templates/layouts/index.html";
const DEFAULT_PARTIALS: &str = "./templates/partials";
const DEFAULT_WATCH_PATHS: &str = "./templates";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Controller name. Injected into every mount as `app_name` and used to
    /// name the user identity cookie.
    #[arg(long, env, default_value = "liveview")]
    app_name: String,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,

    /// Layout template every page is rendered into.
    #[arg(long, env, default_value = DEFAULT_LAYOUT)]
    pub layout: String,

    /// Name under which the page template is made available to the layout.
    #[arg(long, env, default_value = "content")]
    pub layout_content_name: String,

    /// Files or directories of partial templates shared by every view.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = DEFAULT_PARTIALS
    )]
    pub partials: Vec<String>,

    /// File extensions recognised as templates.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = ".html,.tmpl"
    )]
    pub extensions: Vec<String>,

    /// Directory served under `/static`.
    #[arg(long, env, default_value = "./static")]
    pub static_dir: String,

    /// Turns on debug logging, template watching, HTML formatting and disables the template cache.
    #[arg(long, env)]
    pub development_mode: bool,

    /// Log received events and rendered fragments.
    #[arg(long, env)]
    debug_log: bool,

    /// Pretty-print rendered fragments before sending them.
    #[arg(long, env)]
    enable_html_formatting: bool,

    /// Re-parse templates before every render.
    #[arg(long, env)]
    disable_template_cache: bool,

    /// Watch template directories and reload connected pages on change.
    #[arg(long, env)]
    enable_watch: bool,

    /// Directories watched when watching is enabled.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = DEFAULT_WATCH_PATHS
    )]
    pub watch_paths: Vec<String>,

    /// Give every socket its own topic instead of sharing one per page path.
    #[arg(long, env)]
    pub per_connection_topics: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn app_name(&self) -> &str {
        self.app_name.trim()
    }

    pub fn debug_log(&self) -> bool {
        self.debug_log || self.development_mode
    }

    pub fn enable_html_formatting(&self) -> bool {
        self.enable_html_formatting || self.development_mode
    }

    pub fn disable_template_cache(&self) -> bool {
        self.disable_template_cache || self.development_mode
    }

    pub fn enable_watch(&self) -> bool {
        self.enable_watch || self.development_mode
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}
