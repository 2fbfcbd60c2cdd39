//! FTP transport backed by `suppaftp`.
//!
//! `suppaftp`'s synchronous [`FtpStream`] does the protocol work; every call
//! is moved onto the blocking thread pool with [`tokio::task::spawn_blocking`]
//! so the async runtime never stalls on socket IO. The stream is taken out of
//! the transport for the duration of a call and put back afterwards, which is
//! sound because the port is `&mut self` and used by one traversal only.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use suppaftp::list::File as ListedFile;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream, Status};
use tracing::{debug, instrument, warn};

use super::path::{join, segments};
use super::{RemoteEntry, RemoteTransport, TransferError};

/// Default FTP control port.
pub const DEFAULT_FTP_PORT: u16 = 21;

/// Connection settings for an FTP asset repository.
#[derive(Clone)]
pub struct FtpConfig {
    /// Server host name or address.
    pub host: String,
    /// Control port.
    pub port: u16,
    /// Login user.
    pub username: String,
    /// Login password.
    pub password: String,
}

impl FtpConfig {
    /// Creates settings for `host` on the default port with anonymous login.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_FTP_PORT,
            username: "anonymous".to_string(),
            password: String::new(),
        }
    }

    /// Sets the control port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets login credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Returns `host:port`.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Password stays out of logs and `?args` dumps.
impl fmt::Debug for FtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// [`RemoteTransport`] over an FTP control connection.
pub struct FtpTransport {
    config: FtpConfig,
    stream: Option<FtpStream>,
    /// Login directory reported by `PWD`; relative paths resolve against it.
    home: String,
}

impl fmt::Debug for FtpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FtpTransport")
            .field("config", &self.config)
            .field("connected", &self.stream.is_some())
            .field("home", &self.home)
            .finish()
    }
}

impl FtpTransport {
    /// Creates an unconnected transport.
    #[must_use]
    pub fn new(config: FtpConfig) -> Self {
        Self {
            config,
            stream: None,
            home: "/".to_string(),
        }
    }

    /// Returns true while a control connection is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn absolute(&self, path: &str) -> String {
        if path.starts_with('/') {
            join("/", path)
        } else {
            join(&self.home, path)
        }
    }

    /// Runs `op` against the stream on the blocking pool.
    async fn with_stream<R, F>(&mut self, operation: &'static str, op: F) -> Result<R, TransferError>
    where
        F: FnOnce(&mut FtpStream) -> Result<R, TransferError> + Send + 'static,
        R: Send + 'static,
    {
        let mut stream = self.stream.take().ok_or(TransferError::NotConnected)?;
        let (stream, result) = tokio::task::spawn_blocking(move || {
            let result = op(&mut stream);
            (stream, result)
        })
        .await
        .map_err(|source| TransferError::Task { operation, source })?;
        self.stream = Some(stream);
        result
    }
}

/// True only for a 550 reply: the file or directory is unavailable.
///
/// Transient replies (421, 425, 426, 450, 451) and connection errors must not
/// be read as "absent", or a failed manifest fetch would look like an empty
/// manifest.
fn is_unavailable(error: &FtpError) -> bool {
    matches!(error, FtpError::UnexpectedResponse(response) if response.status == Status::FileUnavailable)
}

/// Maps a failed call on `path` to [`TransferError::NotFound`] for a 550
/// reply and [`TransferError::Protocol`] for everything else.
fn classify(operation: &'static str, path: String, error: FtpError) -> TransferError {
    if is_unavailable(&error) {
        TransferError::not_found(path)
    } else {
        TransferError::protocol(operation, path, error)
    }
}

fn parse_listing(lines: &[String]) -> Vec<RemoteEntry> {
    lines
        .iter()
        .filter_map(|line| match line.parse::<ListedFile>() {
            Ok(file) => Some(file),
            Err(e) => {
                // "total N" headers and vendor-specific lines land here
                debug!(line = %line, error = %e, "skipping unparseable listing line");
                None
            }
        })
        .filter(|file| file.name() != "." && file.name() != "..")
        .map(|file| RemoteEntry {
            name: file.name().to_string(),
            is_directory: file.is_directory(),
            is_file: file.is_file(),
            last_modified: Some(file.modified()),
        })
        .collect()
}

#[async_trait]
impl RemoteTransport for FtpTransport {
    #[instrument(level = "debug", skip(self), fields(endpoint = %self.config.endpoint()))]
    async fn connect(&mut self) -> Result<(), TransferError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let config = self.config.clone();
        let endpoint = config.endpoint();
        let (stream, home) = tokio::task::spawn_blocking(move || {
            let mut stream = FtpStream::connect(config.endpoint())
                .map_err(|e| TransferError::connect(config.endpoint(), e))?;
            stream
                .login(config.username.as_str(), config.password.as_str())
                .map_err(|e| TransferError::connect(config.endpoint(), e))?;
            stream
                .transfer_type(FileType::Binary)
                .map_err(|e| TransferError::connect(config.endpoint(), e))?;
            let home = stream.pwd().unwrap_or_else(|_| "/".to_string());
            Ok::<_, TransferError>((stream, home))
        })
        .await
        .map_err(|source| TransferError::Task {
            operation: "connect",
            source,
        })??;

        debug!(%endpoint, %home, "ftp session established");
        self.stream = Some(stream);
        self.home = home;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransferError> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        let endpoint = self.config.endpoint();
        tokio::task::spawn_blocking(move || stream.quit())
            .await
            .map_err(|source| TransferError::Task {
                operation: "quit",
                source,
            })?
            .map_err(|e| TransferError::protocol("quit", endpoint, e))
    }

    async fn change_directory(&mut self, path: &str) -> Result<bool, TransferError> {
        let target = self.absolute(path);
        self.with_stream("cwd", move |stream| match stream.cwd(&target) {
            Ok(()) => Ok(true),
            Err(e) if is_unavailable(&e) => {
                debug!(path = %target, error = %e, "remote directory unavailable");
                Ok(false)
            }
            Err(e) => Err(TransferError::protocol("cwd", target, e)),
        })
        .await
    }

    async fn ensure_directory(&mut self, path: &str) -> Result<(), TransferError> {
        let target = self.absolute(path);
        self.with_stream("mkdir", move |stream| {
            let mut current = String::new();
            for segment in segments(&target) {
                current.push('/');
                current.push_str(segment);
                match stream.cwd(&current) {
                    Ok(()) => continue,
                    Err(e) if is_unavailable(&e) => {}
                    Err(e) => return Err(TransferError::protocol("mkdir", current, e)),
                }
                stream
                    .mkdir(&current)
                    .map_err(|e| TransferError::protocol("mkdir", current.clone(), e))?;
                debug!(path = %current, "created remote directory");
            }
            stream
                .cwd(&target)
                .map_err(|e| TransferError::protocol("mkdir", target.clone(), e))
        })
        .await
    }

    async fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>, TransferError> {
        let target = self.absolute(path);
        let lines = self
            .with_stream("list", move |stream| {
                stream
                    .list(Some(target.as_str()))
                    .map_err(|e| TransferError::protocol("list", target, e))
            })
            .await?;
        Ok(parse_listing(&lines))
    }

    async fn upload(&mut self, local: &Path, remote: &str) -> Result<(), TransferError> {
        let target = self.absolute(remote);
        let local: PathBuf = local.to_path_buf();
        self.with_stream("upload", move |stream| {
            let mut file =
                std::fs::File::open(&local).map_err(|source| TransferError::io(&local, source))?;
            let bytes = stream
                .put_file(&target, &mut file)
                .map_err(|e| TransferError::protocol("upload", target.clone(), e))?;
            debug!(path = %target, bytes, "uploaded file");
            Ok(())
        })
        .await
    }

    async fn download(&mut self, remote: &str, local: &Path) -> Result<(), TransferError> {
        let target = self.absolute(remote);
        let local: PathBuf = local.to_path_buf();
        self.with_stream("download", move |stream| {
            let mut file = std::fs::File::create(&local)
                .map_err(|source| TransferError::io(&local, source))?;
            let copied = stream.retr(&target, |reader| {
                std::io::copy(reader, &mut file).map_err(FtpError::ConnectionError)
            });
            match copied {
                Ok(bytes) => {
                    debug!(path = %target, bytes, "downloaded file");
                    Ok(())
                }
                Err(e) => Err(classify("download", target, e)),
            }
        })
        .await
    }

    async fn remove(&mut self, remote: &str) -> Result<(), TransferError> {
        let target = self.absolute(remote);
        self.with_stream("delete", move |stream| {
            stream
                .rm(&target)
                .map_err(|e| classify("delete", target, e))
        })
        .await
    }

    async fn remove_directory(&mut self, remote: &str) -> Result<(), TransferError> {
        let target = self.absolute(remote);
        self.with_stream("rmdir", move |stream| {
            stream
                .rmdir(&target)
                .map_err(|e| classify("rmdir", target, e))
        })
        .await
    }

    async fn last_modified(&mut self, remote: &str) -> Option<SystemTime> {
        let target = self.absolute(remote);
        let result = self
            .with_stream("mdtm", move |stream| {
                stream
                    .mdtm(&target)
                    .map_err(|e| TransferError::protocol("mdtm", target, e))
            })
            .await;

        match result {
            Ok(modified) => {
                let at: DateTime<Utc> = modified.and_utc();
                Some(SystemTime::from(at))
            }
            Err(e) => {
                warn!(path = %remote, error = %e, "modification time unavailable");
                None
            }
        }
    }
}
