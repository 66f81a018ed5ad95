//! Access log formats
//!
//! Supported formats: `combined` (Apache/Nginx combined), `common` (CLF) and
//! `json`. Unknown format names fall back to `common`.

use chrono::Local;
use serde_json::json;

/// One access log line's worth of request/response information
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub remote_addr: String,
    pub time: chrono::DateTime<Local>,
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub http_version: String,
    pub status: u16,
    pub body_bytes: usize,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    /// Request processing time in microseconds
    pub duration_us: u64,
}

impl AccessLogEntry {
    /// New entry stamped with the current local time
    #[must_use]
    pub fn new(remote_addr: String, method: String, path: String) -> Self {
        Self {
            remote_addr,
            time: Local::now(),
            method,
            path,
            query: None,
            http_version: "1.1".to_string(),
            status: 200,
            body_bytes: 0,
            referer: None,
            user_agent: None,
            duration_us: 0,
        }
    }

    /// Render the entry in the named format
    #[must_use]
    pub fn format(&self, format: &str) -> String {
        match format {
            "combined" => self.format_combined(),
            "json" => self.format_json(),
            _ => self.format_common(),
        }
    }

    fn request_line(&self) -> String {
        let uri = match &self.query {
            Some(q) => format!("{}?{}", self.path, q),
            None => self.path.clone(),
        };
        format!("{} {} HTTP/{}", self.method, uri, self.http_version)
    }

    /// Common Log Format:
    /// `$remote_addr - - [$time_local] "$request" $status $body_bytes_sent`
    fn format_common(&self) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {}",
            self.remote_addr,
            self.time.format("%d/%b/%Y:%H:%M:%S %z"),
            self.request_line(),
            self.status,
            self.body_bytes,
        )
    }

    /// Combined format: CLF plus referer and user-agent
    fn format_combined(&self) -> String {
        format!(
            "{} \"{}\" \"{}\"",
            self.format_common(),
            self.referer.as_deref().unwrap_or("-"),
            self.user_agent.as_deref().unwrap_or("-"),
        )
    }

    /// JSON structured log line
    fn format_json(&self) -> String {
        json!({
            "remote_addr": self.remote_addr,
            "time": self.time.to_rfc3339(),
            "method": self.method,
            "path": self.path,
            "query": self.query,
            "http_version": self.http_version,
            "status": self.status,
            "body_bytes": self.body_bytes,
            "referer": self.referer,
            "user_agent": self.user_agent,
            "duration_us": self.duration_us,
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> AccessLogEntry {
        let mut entry = AccessLogEntry::new(
            "10.0.0.5".to_string(),
            "GET".to_string(),
            "/users/42".to_string(),
        );
        entry.query = Some("expand=posts".to_string());
        entry.status = 200;
        entry.body_bytes = 512;
        entry.referer = Some("https://example.com".to_string());
        entry.user_agent = Some("curl/8.0".to_string());
        entry.duration_us = 850;
        entry
    }

    #[test]
    fn test_common_format() {
        let log = entry().format("common");
        assert!(log.contains("10.0.0.5"));
        assert!(log.contains("\"GET /users/42?expand=posts HTTP/1.1\""));
        assert!(log.contains("200 512"));
        assert!(!log.contains("curl/8.0"));
    }

    #[test]
    fn test_combined_format_appends_referer_and_agent() {
        let log = entry().format("combined");
        assert!(log.contains("\"https://example.com\""));
        assert!(log.contains("\"curl/8.0\""));
    }

    #[test]
    fn test_json_format() {
        let log = entry().format("json");
        let value: serde_json::Value = serde_json::from_str(&log).unwrap();
        assert_eq!(value["remote_addr"], "10.0.0.5");
        assert_eq!(value["status"], 200);
        assert_eq!(value["query"], "expand=posts");
        assert_eq!(value["duration_us"], 850);
    }

    #[test]
    fn test_unknown_format_falls_back_to_common() {
        let log = entry().format("fancy");
        assert!(log.contains("\"GET /users/42?expand=posts HTTP/1.1\""));
    }
}
