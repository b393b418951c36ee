use std::{net::SocketAddr, path::PathBuf};

pub const DB_FILE_NAME: &str = "todos.sqlite";

/// Runtime settings, decoupled from how they were supplied.
#[derive(Clone, Debug)]
pub struct Context {
    pub data_dir: PathBuf,
    pub reset: bool,
    pub log_file: Option<PathBuf>,
    pub api_listen: SocketAddr,
}

impl Context {
    pub fn from_cli(cli: &crate::cli::Cli) -> Self {
        Self {
            data_dir: PathBuf::from(&cli.data_dir),
            reset: cli.reset,
            log_file: cli.log_file.as_ref().map(PathBuf::from),
            api_listen: cli.api_listen,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }
}
