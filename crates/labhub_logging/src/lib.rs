//! Shared logging utilities for LabHub binaries.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "labhub=info";
const MAX_LOG_FILES: usize = 5;
const MAX_LOG_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Logging configuration shared by LabHub binaries.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbose: bool,
}

/// Initialize tracing with a rolling file writer and stderr output.
///
/// When the log directory cannot be prepared the file layer is dropped and
/// only stderr logging is installed; the returned error is informational.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let file_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let console_filter = if config.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("labhub=debug"))
    } else {
        EnvFilter::new("warn")
    };

    let file_writer = ensure_logs_dir().and_then(|dir| {
        RotatingLog::open(dir, config.app_name, MAX_LOG_FILES, MAX_LOG_FILE_SIZE)
            .with_context(|| format!("Failed to open log file for {}", config.app_name))
    });
    let (file_layer, file_error) = match file_writer {
        Ok(writer) => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(writer))
                    .with_ansi(false)
                    .with_filter(file_filter),
            ),
            None,
        ),
        Err(err) => (None, Some(err)),
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    match file_error {
        Some(err) => Err(err.context("File logging disabled")),
        None => Ok(()),
    }
}

/// Get the LabHub home directory: ~/.labhub
///
/// Priority:
/// 1) LABHUB_HOME
/// 2) the user's home directory
/// 3) ./.labhub
pub fn labhub_home() -> PathBuf {
    resolve_home(std::env::var_os("LABHUB_HOME").map(PathBuf::from), dirs::home_dir())
}

fn resolve_home(override_path: Option<PathBuf>, home_dir: Option<PathBuf>) -> PathBuf {
    if let Some(path) = override_path {
        return path;
    }
    home_dir
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".labhub")
}

/// Get the logs directory: ~/.labhub/logs
pub fn logs_dir() -> PathBuf {
    labhub_home().join("logs")
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir();
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

/// Size-capped log file: `<name>.log`, then `<name>.log.1` up to
/// `<name>.log.{keep - 1}` for older generations.
struct RotatingLog {
    dir: PathBuf,
    name: String,
    keep: usize,
    max_size: u64,
    file: File,
    written: u64,
}

impl RotatingLog {
    fn open(dir: PathBuf, name: &str, keep: usize, max_size: u64) -> io::Result<Self> {
        fs::create_dir_all(&dir)?;
        let name = sanitize_name(name);
        let (file, written) = open_append(&dir.join(format!("{}.log", name)))?;
        let mut log = Self {
            dir,
            name,
            keep: keep.max(1),
            max_size,
            file,
            written,
        };
        if log.written > log.max_size {
            log.rotate()?;
        }
        Ok(log)
    }

    fn path(&self, generation: usize) -> PathBuf {
        match generation {
            0 => self.dir.join(format!("{}.log", self.name)),
            n => self.dir.join(format!("{}.log.{}", self.name, n)),
        }
    }

    /// Shift every generation up by one, dropping the oldest.
    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        let oldest = self.keep - 1;
        let dropped = self.path(oldest);
        if dropped.exists() {
            fs::remove_file(&dropped)?;
        }
        for generation in (0..oldest).rev() {
            let from = self.path(generation);
            if from.exists() {
                fs::rename(&from, self.path(generation + 1))?;
            }
        }
        let (file, written) = open_append(&self.path(0))?;
        self.file = file;
        self.written = written;
        Ok(())
    }
}

impl Write for RotatingLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_size {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn open_append(path: &Path) -> io::Result<(File, u64)> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let len = file.metadata()?.len();
    Ok((file, len))
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect()
}
