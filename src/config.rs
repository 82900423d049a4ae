use std::path::PathBuf;

/// Process settings, read once from `SEATD_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    /// WAL directory. `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    pub metrics_port: Option<u16>,
    /// JSON floor plan. `None` uses the built-in layout.
    pub layout: Option<PathBuf>,
    /// Static floor-view assets served for any non-API path.
    pub static_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparseable numbers fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            bind: lookup("SEATD_BIND").unwrap_or_else(|| "0.0.0.0".into()),
            port: lookup("SEATD_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
            data_dir: lookup("SEATD_DATA_DIR").map(PathBuf::from),
            metrics_port: lookup("SEATD_METRICS_PORT").and_then(|s| s.parse().ok()),
            layout: lookup("SEATD_LAYOUT").map(PathBuf::from),
            static_dir: lookup("SEATD_STATIC_DIR").map(PathBuf::from),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    pub fn wal_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join("seatd.wal"))
    }
}
