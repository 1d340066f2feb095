// web-server/src/access_log.rs
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;

pub const ACCESS_LOG_HEADER: &str = "email,access_time,ip_address\n";

/// Append-only CSV audit of authenticated page loads.
///
/// Best effort: failures are logged and reported as `false`, never raised.
pub struct AccessRecorder {
    path: PathBuf,
    timezone: Tz,
    initialized: OnceCell<()>,
}

impl AccessRecorder {
    pub fn new(path: impl Into<PathBuf>, timezone: Tz) -> Self {
        Self {
            path: path.into(),
            timezone,
            initialized: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the directory and header line if needed.
    ///
    /// Runs at most once per recorder; concurrent callers wait on the same
    /// in-flight attempt. A failed attempt is retried by the next caller.
    pub async fn init_file(&self) -> std::io::Result<()> {
        self.initialized
            .get_or_try_init(|| create_with_header(&self.path))
            .await
            .map(|_| ())
    }

    pub async fn record(&self, email: &str, ip_address: &str) -> bool {
        self.record_at(email, ip_address, Utc::now()).await
    }

    pub async fn record_at(&self, email: &str, ip_address: &str, at: DateTime<Utc>) -> bool {
        if let Err(e) = self.init_file().await {
            tracing::error!("Failed to initialize access log file {}: {}", self.path.display(), e);
            return false;
        }

        let local_time = at
            .with_timezone(&self.timezone)
            .format("%Y/%m/%d %H:%M:%S")
            .to_string();
        let line = format!(
            "{},{},{}\n",
            csv_field(email),
            csv_field(&local_time),
            csv_field(ip_address)
        );

        match append(&self.path, &line).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to write access log: {}", e);
                false
            }
        }
    }
}

async fn create_with_header(path: &Path) -> std::io::Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).await?;
    }

    match OpenOptions::new().write(true).create_new(true).open(path).await {
        Ok(mut file) => {
            file.write_all(ACCESS_LOG_HEADER.as_bytes()).await?;
            file.flush().await
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

async fn append(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().append(true).create(true).open(path).await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}

/// Quote a field, doubling embedded quotes and flattening line breaks
fn csv_field(value: &str) -> String {
    let flattened = value.replace("\r\n", " ").replace('\n', " ");
    format!("\"{}\"", flattened.replace('"', "\"\""))
}
