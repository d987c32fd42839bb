use crate::models::{Attempt, AuthLog};
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// Errors that can occur while loading an auth log
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Leading date of a syslog line: "Jan  1 12:00:00 ..." or "2024-01-01T12:00:00+00:00 ..."
static RE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?P<month>[A-Z][a-z]{2})\s+(?P<day>\d{1,2})\b|(?P<iso>\d{4}-\d{2}-\d{2})T)")
        .expect("regex")
});

/// "Failed password for [invalid user ]<user> from <ip> port <port> ssh2"
static RE_FAILED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Failed \S+ for\s+(?:invalid user\s+)?(?:(?P<user>\S+)\s+)?from\s+(?P<ip>\S+)")
        .expect("regex")
});

/// "Accepted password|publickey for <user> from <ip> port <port> ssh2"
static RE_ACCEPTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Accepted \S+ for\s+(?:(?P<user>\S+)\s+)?from\s+(?P<ip>\S+)").expect("regex")
});

/// "Invalid user <user> from <ip> [port <port>]"
static RE_INVALID_USER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Invalid user\s+(?:(?P<user>\S+)\s+)?from\s+(?P<ip>\S+)").expect("regex")
});

/// Parse a single log line into an authentication attempt.
///
/// Returns `None` for anything that is not a recognized login attempt. The
/// attempt patterns are tried in order and the first match wins, so a line
/// is never counted twice.
pub fn parse_line(line: &str) -> Option<Attempt> {
    let date = parse_date(line)?;

    let caps = [&*RE_FAILED, &*RE_ACCEPTED, &*RE_INVALID_USER]
        .iter()
        .find_map(|re| re.captures(line))?;

    let ip = caps.name("ip")?.as_str().to_string();
    let user = caps
        .name("user")
        .map(|m| m.as_str().to_string())
        .filter(|u| !u.is_empty());

    Some(Attempt { date, ip, user })
}

/// Date token with syslog padding collapsed ("Jan  1" -> "Jan 1")
fn parse_date(line: &str) -> Option<String> {
    let caps: Captures = RE_DATE.captures(line)?;
    if let Some(iso) = caps.name("iso") {
        return Some(iso.as_str().to_string());
    }
    let month = caps.name("month")?.as_str();
    let day = caps.name("day")?.as_str().trim_start_matches('0');
    Some(format!("{} {}", month, day))
}

/// Build the aggregated store from the full text of an auth log
pub fn parse_auth_log(text: &str) -> AuthLog {
    let mut log = AuthLog::new();
    for attempt in text.lines().filter_map(parse_line) {
        log.record_attempt(&attempt);
    }
    log
}

/// Reads a complete auth log file from disk
pub struct AuthLogReader {
    file_path: PathBuf,
}

impl AuthLogReader {
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        AuthLogReader {
            file_path: file_path.as_ref().to_path_buf(),
        }
    }

    /// Read the whole file and parse it.
    ///
    /// Invalid UTF-8 is replaced rather than rejected so that one odd line
    /// cannot fail the whole log.
    pub fn read(&self) -> Result<AuthLog, InputError> {
        let bytes = std::fs::read(&self.file_path).map_err(|source| InputError::Read {
            path: self.file_path.display().to_string(),
            source,
        })?;
        log::debug!("auth file loaded: {}", self.file_path.display());

        let text = String::from_utf8_lossy(&bytes);
        let parsed = parse_auth_log(&text);
        log::debug!(
            "finished parsing log file: {} date(s), {} entr(ies)",
            parsed.days().len(),
            parsed.entry_count()
        );
        Ok(parsed)
    }
}

/// Convenience wrapper around [`AuthLogReader`]
pub fn read_auth_log<P: AsRef<Path>>(path: P) -> Result<AuthLog, InputError> {
    AuthLogReader::new(path).read()
}
