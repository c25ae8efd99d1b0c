//! Named-pipe message channel.
//!
//! Each message is written whole while holding the endpoint lock, so messages
//! never interleave even past `PIPE_BUF`. Interrupted and partial writes are
//! resumed; a frame that cannot be finished disables the channel so no later
//! message is glued onto the fragment. Writes block: a stalled reader stalls
//! the host thread inside `close`.

use nix::errno::Errno;
use nix::sys::stat::Mode;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use mkvshim_config::{
    log_channel_debug, log_channel_info, log_channel_warn, SENTINEL_ATTACH, SENTINEL_DETACH,
};

use super::{frame, Notify};
use crate::error::{Result, ShimError};

pub struct FifoChannel {
    path: PathBuf,
    /// `None` once disabled or closed.
    endpoint: Mutex<Option<File>>,
}

impl FifoChannel {
    /// Create the endpoint if absent, open it and announce the attach.
    ///
    /// Opening a FIFO for writing blocks until a reader shows up. An existing
    /// regular file is appended to instead.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        ensure_endpoint(&path)?;

        let file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|source| ShimError::EndpointOpen {
                path: path.clone(),
                source,
            })?;

        let channel = Self {
            path,
            endpoint: Mutex::new(Some(file)),
        };
        channel.send(SENTINEL_ATTACH.as_bytes())?;
        log_channel_info!("Message channel attached", path = %channel.path.display());
        Ok(channel)
    }

    /// A channel that drops every message.
    pub fn disabled(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            endpoint: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().is_some()
    }

    /// Write one framed message and flush.
    pub fn send(&self, payload: &[u8]) -> Result<()> {
        let message = frame::encode(payload)?;
        let mut guard = self.lock();
        let file = guard.as_mut().ok_or(ShimError::ChannelDisabled)?;

        let mut written = 0;
        if let Err(e) = write_frame(file, &message, &mut written) {
            if written > 0 {
                log_channel_warn!(
                    "Partial message, disabling channel",
                    path = %self.path.display(),
                    written = written,
                    expected = message.len()
                );
                guard.take();
            }
            return Err(e);
        }
        // EINVAL on a FIFO; only meaningful for a regular-file endpoint.
        let _ = file.sync_data();
        Ok(())
    }

    /// Announce the detach and release the endpoint. Later sends are dropped.
    pub fn close(&self) {
        if let Err(e) = self.send(SENTINEL_DETACH.as_bytes()) {
            log_channel_debug!("Detach sentinel not delivered", error = %e);
        }
        self.lock().take();
    }

    fn lock(&self) -> MutexGuard<'_, Option<File>> {
        self.endpoint.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Notify for FifoChannel {
    fn notify(&self, path: &Path) -> Result<()> {
        use std::os::unix::ffi::OsStrExt;
        self.send(path.as_os_str().as_bytes())
    }
}

impl std::fmt::Debug for FifoChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FifoChannel")
            .field("path", &self.path)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Write all of `message`, resuming after `EINTR` and short counts.
/// `written` tracks progress so the caller can tell a torn frame from an
/// untouched stream.
fn write_frame<W: Write>(out: &mut W, message: &[u8], written: &mut usize) -> Result<()> {
    while *written < message.len() {
        match out.write(&message[*written..]) {
            Ok(0) => {
                return Err(ShimError::ShortWrite {
                    written: *written,
                    expected: message.len(),
                })
            }
            Ok(n) => *written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn ensure_endpoint(path: &Path) -> Result<()> {
    let mode = Mode::from_bits_truncate(mkvshim_config::FIFO_MODE as libc::mode_t);
    match nix::unistd::mkfifo(path, mode) {
        Ok(()) => {
            log_channel_debug!("Created endpoint", path = %path.display());
            Ok(())
        }
        Err(Errno::EEXIST) => {
            let kind = std::fs::metadata(path).map(|m| m.file_type());
            if let Ok(ft) = kind {
                if !ft.is_fifo() && !ft.is_file() {
                    return Err(ShimError::EndpointCreate {
                        path: path.to_path_buf(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::InvalidInput,
                            "endpoint exists and is neither a FIFO nor a regular file",
                        ),
                    });
                }
            }
            Ok(())
        }
        Err(errno) => Err(ShimError::EndpointCreate {
            path: path.to_path_buf(),
            source: std::io::Error::from(errno),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::frame::FrameDecoder;
    use std::io::Read;
    use std::os::unix::fs::PermissionsExt;

    fn read_messages(path: &Path) -> Vec<String> {
        let bytes = std::fs::read(path).unwrap();
        FrameDecoder::new()
            .push(&bytes)
            .into_iter()
            .map(|m| String::from_utf8(m).unwrap())
            .collect()
    }

    #[test]
    fn test_regular_file_endpoint_gets_sentinels_and_paths() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = dir.path().join("titles_done");
        std::fs::write(&endpoint, b"").unwrap();

        let channel = FifoChannel::open(&endpoint).unwrap();
        assert!(channel.is_enabled());
        channel.notify(Path::new("/output/title07.mkv")).unwrap();
        channel.close();
        assert!(!channel.is_enabled());

        assert_eq!(
            read_messages(&endpoint),
            vec!["init", "/output/title07.mkv", "fini"]
        );
    }

    #[test]
    fn test_existing_endpoint_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = dir.path().join("titles_done");
        std::fs::write(&endpoint, b"earlier\0").unwrap();

        let channel = FifoChannel::open(&endpoint).unwrap();
        channel.close();

        assert_eq!(read_messages(&endpoint), vec!["earlier", "init", "fini"]);
    }

    #[test]
    fn test_creates_fifo_with_owner_only_mode() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = dir.path().join("titles_done");

        let reader_path = endpoint.clone();
        let reader = std::thread::spawn(move || {
            // Wait for the writer side to create the FIFO.
            for _ in 0..500 {
                if reader_path.exists() {
                    break;
                }
                std::thread::sleep(std::time::Duration::from_millis(10));
            }
            let mut buf = Vec::new();
            File::open(&reader_path).unwrap().read_to_end(&mut buf).unwrap();
            buf
        });

        let channel = FifoChannel::open(&endpoint).unwrap();
        let meta = std::fs::metadata(&endpoint).unwrap();
        assert!(meta.file_type().is_fifo());
        assert_eq!(meta.permissions().mode() & 0o077, 0);

        channel.notify(Path::new("/output/title01.mkv")).unwrap();
        channel.close();

        let bytes = reader.join().unwrap();
        assert_eq!(bytes, b"init\0/output/title01.mkv\0fini\0");
    }

    #[test]
    fn test_missing_directory_fails_setup() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = dir.path().join("no/such/dir/titles_done");
        assert!(matches!(
            FifoChannel::open(&endpoint),
            Err(ShimError::EndpointCreate { .. })
        ));
    }

    #[test]
    fn test_directory_endpoint_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            FifoChannel::open(dir.path()),
            Err(ShimError::EndpointCreate { .. })
        ));
    }

    /// Accepts at most `chunk` bytes per call, fails every other call with
    /// `EINTR`, and breaks for good once `limit` bytes are in.
    struct Choppy {
        out: Vec<u8>,
        chunk: usize,
        limit: usize,
        interrupt: bool,
    }

    impl Write for Choppy {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(ErrorKind::Interrupted.into());
            }
            if self.out.len() >= self.limit {
                return Err(ErrorKind::BrokenPipe.into());
            }
            let n = buf.len().min(self.chunk);
            self.out.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_interrupted_and_short_writes_resumed() {
        let mut out = Choppy {
            out: Vec::new(),
            chunk: 3,
            limit: usize::MAX,
            interrupt: false,
        };
        let message = frame::encode(b"/output/title07.mkv").unwrap();
        let mut written = 0;
        write_frame(&mut out, &message, &mut written).unwrap();
        assert_eq!(written, message.len());
        assert_eq!(out.out, message);
    }

    #[test]
    fn test_torn_frame_reports_progress() {
        let mut out = Choppy {
            out: Vec::new(),
            chunk: 4,
            limit: 8,
            interrupt: false,
        };
        let message = frame::encode(b"/output/title07.mkv").unwrap();
        let mut written = 0;
        assert!(matches!(
            write_frame(&mut out, &message, &mut written),
            Err(ShimError::Write(_))
        ));
        assert_eq!(written, 8);
    }

    #[test]
    fn test_disabled_channel_drops_messages() {
        let channel = FifoChannel::disabled("/nonexistent/titles_done");
        assert!(!channel.is_enabled());
        assert!(matches!(
            channel.notify(Path::new("/output/title00.mkv")),
            Err(ShimError::ChannelDisabled)
        ));
        channel.close();
    }
}
