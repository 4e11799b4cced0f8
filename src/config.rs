use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "warcserver")]
#[command(about = "Serve byte ranges of WARC files held locally or in HDFS")]
pub struct Config {
    /// Host address to bind to
    #[arg(long, env = "WARCSERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "WARCSERVER_PORT", default_value = "8000")]
    pub port: u16,

    /// Comma-separated list of local directories to scan for WARC files
    #[arg(long, env = "WARC_PATHS", default_value = ".")]
    pub warc_paths: String,

    /// Base URL of the tracking database (Solr core)
    #[arg(
        long,
        env = "TRACKDB_URL",
        default_value = "http://solr8.api.wa.bl.uk/solr/tracking"
    )]
    pub trackdb_url: String,

    /// Do not poll the tracking database; serve local files only
    #[arg(long, env = "WARCSERVER_DISABLE_TRACKDB")]
    pub disable_trackdb: bool,

    /// Maximum number of rows to request from the tracking database
    #[arg(long, env = "TRACKDB_MAX_ROWS", default_value = "100000000")]
    pub trackdb_max_rows: u64,

    /// WebHDFS URL prefix used for files without their own access URL
    #[arg(
        long,
        env = "WEBHDFS_PREFIX",
        default_value = "http://hdfs.api.wa.bl.uk/webhdfs/v1"
    )]
    pub webhdfs_prefix: String,

    /// User name sent to WebHDFS
    #[arg(long, env = "WEBHDFS_USER", default_value = "access")]
    pub webhdfs_user: String,

    /// Seconds between filesystem scans
    #[arg(long, env = "WARCSERVER_SCAN_INTERVAL", default_value = "5")]
    pub scan_interval_secs: u64,

    /// Seconds between tracking database refreshes
    #[arg(long, env = "WARCSERVER_TRACKDB_INTERVAL", default_value = "300")]
    pub trackdb_interval_secs: u64,

    /// Connect timeout for tracking database and WebHDFS requests
    #[arg(long, env = "WARCSERVER_CONNECT_TIMEOUT", default_value = "10")]
    pub upstream_connect_timeout_secs: u64,

    /// Answer explicit range requests with 206 Partial Content instead of 200
    #[arg(long, env = "WARCSERVER_PARTIAL_CONTENT")]
    pub partial_content: bool,

    /// Enable CORS for all origins
    #[arg(long, env = "WARCSERVER_CORS", default_value = "true")]
    pub cors: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn search_roots(&self) -> Vec<PathBuf> {
        self.warc_paths
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .collect()
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn trackdb_interval(&self) -> Duration {
        Duration::from_secs(self.trackdb_interval_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_connect_timeout_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["warcserver"]);
        assert_eq!(config.port, 8000);
        assert_eq!(config.search_roots(), vec![PathBuf::from(".")]);
        assert_eq!(config.scan_interval(), Duration::from_secs(5));
        assert_eq!(config.trackdb_interval(), Duration::from_secs(300));
        assert_eq!(config.webhdfs_user, "access");
        assert!(!config.partial_content);
    }

    #[test]
    fn test_search_roots_split() {
        let config = Config::parse_from([
            "warcserver",
            "--warc-paths",
            "/heritrix/output, /data/warcs,,",
        ]);
        assert_eq!(
            config.search_roots(),
            vec![PathBuf::from("/heritrix/output"), PathBuf::from("/data/warcs")]
        );
    }

    #[test]
    fn test_bind_addr() {
        let config = Config::parse_from(["warcserver", "--host", "localhost", "--port", "3000"]);
        assert_eq!(config.bind_addr(), "localhost:3000");
    }
}
