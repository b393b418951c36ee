use clap::Parser;
use std::env;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Serve a to-do list over a small JSON REST API",
    long_about = "A REST service exposing create/read/update/delete operations over to-do items stored in a local SQLite database."
)]
pub struct Cli {
    #[arg(
        long,
        env = "TODOS_DATA_DIR",
        default_value = ".todos/",
        value_name = "DIR",
        help = "Directory holding the SQLite database"
    )]
    pub data_dir: String,

    #[arg(
        long,
        default_value_t = false,
        help = "Reset all persisted state (delete the SQLite database) before starting"
    )]
    pub reset: bool,

    #[arg(
        long = "log-file",
        env = "TODOS_LOG_FILE",
        value_name = "PATH",
        help = "Write logs to PATH (in addition to stderr)"
    )]
    pub log_file: Option<String>,

    #[arg(
        long = "api-listen",
        env = "TODOS_API_LISTEN",
        value_name = "ADDR",
        default_value = "127.0.0.1:8000",
        help = "REST API listen address (host:port)"
    )]
    pub api_listen: std::net::SocketAddr,
}

pub fn parse() -> Cli {
    let dotenv_path = env::var("DOTENV_PATH").unwrap_or(".env".into());
    if dotenvy::from_filename(&dotenv_path).is_ok() {
        log::info!("Loaded env from {}", dotenv_path);
    }
    Cli::parse()
}
