use std::env;
use std::time::Duration;

use url::Url;

use crate::error::{ProbeError, Result};

pub const DEFAULT_SERVER: &str = "http://localhost:8080";
pub const DEFAULT_RETRY_SECS: u64 = 5;

/// Which server to talk to and how long to keep retrying when it is down.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: Url,
    pub retry_window: Duration,
}

impl Config {
    pub fn new(server: &str, retry_window: Duration) -> Result<Self> {
        Ok(Self {
            server: parse_server(server)?,
            retry_window,
        })
    }

    /// Reads `.env` first, then `NINETYNINE_SERVER` and `NINETYNINE_RETRY_SECS`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let server = env::var("NINETYNINE_SERVER").unwrap_or_else(|_| DEFAULT_SERVER.to_string());
        let retry_secs = match env::var("NINETYNINE_RETRY_SECS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
                ProbeError::Config(format!("NINETYNINE_RETRY_SECS is not a number: {raw}"))
            })?,
            Err(_) => DEFAULT_RETRY_SECS,
        };

        Self::new(&server, Duration::from_secs(retry_secs))
    }

    pub fn with_server(mut self, server: &str) -> Result<Self> {
        self.server = parse_server(server)?;
        Ok(self)
    }

    /// Paths are relative to the base, so `http://host/api/` + `/login` is
    /// `http://host/api/login`.
    pub fn http_url(&self, path: &str) -> Result<Url> {
        Ok(self.server.join(path.trim_start_matches('/'))?)
    }

    /// `http://host:8080` becomes `ws://host:8080/ws/<room_id>`, keeping any
    /// base path.
    pub fn room_socket_url(&self, room_id: &str) -> Result<Url> {
        let room_id = room_id.trim();
        if room_id.is_empty() || room_id.contains('/') {
            return Err(ProbeError::Input(format!("bad room id: {room_id:?}")));
        }

        let mut url = self.server.join(&format!("ws/{room_id}"))?;
        let scheme = match url.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => return Err(ProbeError::Config(format!("unsupported scheme: {other}"))),
        };
        url.set_scheme(scheme)
            .map_err(|_| ProbeError::Config(format!("cannot switch {url} to {scheme}")))?;
        Ok(url)
    }
}

/// The base always ends in `/` so joins append to its path instead of replacing
/// the last segment.
fn parse_server(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ProbeError::Config(format!(
                "server URL must be http or https, got {other}"
            )))
        }
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
