// ABOUTME: StreamPort (C1) — owns the duplex device fd, serializes all I/O through one mutex
// ABOUTME: Readiness is polled via poll(2) on a non-blocking fd; read_exact/write_all then run to completion

use nix::fcntl::OFlag;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

/// I/O failures on the device, distinguished so the capture loop can tell a
/// write failure (recoverable: fall back to IDLE) from everything else
/// (fatal).
#[derive(Debug, Error)]
pub enum PortError {
    #[error("failed to open device {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("short or failed read: {0}")]
    Read(#[source] io::Error),

    #[error("short or failed write: {0}")]
    Write(#[source] io::Error),
}

/// The duplex byte device, opened once per process.
///
/// Every outbound message (Format, Data, Cursor, or a Capabilities reply)
/// must be written atomically with respect to the other writers sharing this
/// port; every inbound message is read by the single control-reader task.
/// Both sides serialize through the same `Mutex<File>` — see the module
/// doc-comment for why that's the right granularity here, not a separate
/// read/write lock pair.
pub struct StreamPort {
    file: Mutex<File>,
    raw_fd: RawFd,
}

impl StreamPort {
    /// Open the device at `path` for non-blocking readiness polling with
    /// blocking-style reads/writes layered on top. Failure is always fatal —
    /// the spec defines no reconnection logic.
    pub fn open(path: &str) -> Result<Self, PortError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc_o_nonblock())
            .open(path)
            .map_err(|source| PortError::Open {
                path: path.to_string(),
                source,
            })?;

        let raw_fd = file.as_raw_fd();
        Ok(StreamPort {
            file: Mutex::new(file),
            raw_fd,
        })
    }

    /// Build a `StreamPort` around an already-open file, used by tests that
    /// substitute a `UnixStream`-backed pipe for the real device.
    ///
    /// Not gated behind `#[cfg(test)]` so integration tests under `tests/`
    /// (which link the non-test rlib) can use it too; it's `doc(hidden)`
    /// rather than feature-gated to keep the test-pipe setup simple.
    #[doc(hidden)]
    pub fn from_file(file: File) -> Self {
        let raw_fd = file.as_raw_fd();
        StreamPort {
            file: Mutex::new(file),
            raw_fd,
        }
    }

    /// Block (or, with `blocking = false`, return immediately) until at least
    /// one byte is ready to read, or `timeout` elapses.
    ///
    /// Returns `Ok(true)` if readable, `Ok(false)` on timeout or on
    /// interruption by a signal — the caller (the control reader, in
    /// blocking mode) treats a signal interruption as "not ready yet" and
    /// rechecks `quit_requested` rather than treating it as an error.
    pub fn poll_readable(&self, timeout: Option<Duration>) -> io::Result<bool> {
        let borrowed: BorrowedFd = unsafe { BorrowedFd::borrow_raw(self.raw_fd) };
        let mut fds = [PollFd::new(borrowed, PollFlags::POLLIN)];
        let poll_timeout = match timeout {
            Some(d) => {
                let millis = d.as_millis().min(u16::MAX as u128) as u16;
                PollTimeout::try_from(millis).unwrap_or(PollTimeout::MAX)
            }
            None => PollTimeout::NONE,
        };

        match poll(&mut fds, poll_timeout) {
            Ok(n) => Ok(n > 0),
            Err(nix::errno::Errno::EINTR) => Ok(false),
            Err(e) => Err(io::Error::from(e)),
        }
    }

    /// Read exactly `buf.len()` bytes. A short read (peer closed mid-message)
    /// or any underlying I/O failure is a fatal `PortError::Read` — the
    /// protocol has no resync mechanism, so partial frames cannot be
    /// recovered from.
    pub fn read_exact(&self, buf: &mut [u8]) -> Result<(), PortError> {
        let mut file = self.file.lock().expect("stream port poisoned");
        read_exact_blocking(&mut *file, self.raw_fd, buf).map_err(PortError::Read)
    }

    /// Write the full buffer as one logical message, holding the port's
    /// mutex for the entire call so no other writer's bytes can interleave.
    pub fn write_all(&self, buf: &[u8]) -> Result<(), PortError> {
        let mut file = self.file.lock().expect("stream port poisoned");
        file.write_all(buf).map_err(PortError::Write)
    }

    /// Write a header and body as a single atomic message: acquires the
    /// mutex once for both pieces so a concurrent writer can never land
    /// bytes between header and body.
    pub fn write_message(&self, header: &[u8], body: &[u8]) -> Result<(), PortError> {
        let mut file = self.file.lock().expect("stream port poisoned");
        file.write_all(header).map_err(PortError::Write)?;
        file.write_all(body).map_err(PortError::Write)
    }

    /// Write one capture-loop iteration's full output atomically: an
    /// optional Format message (present only when the frame's `stream_start`
    /// flag is set) immediately followed by the Data header and body, all
    /// under a single mutex acquisition.
    ///
    /// This is what guarantees §5's ordering rule — Format must precede the
    /// Data message of the frame whose `stream_start` is true, with nothing
    /// from another writer (e.g. the cursor updater) landing in between.
    /// Calling `write_all`/`write_message` twice in a row for this would
    /// release the mutex between the two calls and let another writer
    /// interleave.
    pub fn write_frame(
        &self,
        format: Option<&[u8]>,
        data_header: &[u8],
        data_body: &[u8],
    ) -> Result<(), PortError> {
        let mut file = self.file.lock().expect("stream port poisoned");
        if let Some(format) = format {
            file.write_all(format).map_err(PortError::Write)?;
        }
        file.write_all(data_header).map_err(PortError::Write)?;
        file.write_all(data_body).map_err(PortError::Write)
    }
}

impl AsFd for StreamPort {
    fn as_fd(&self) -> BorrowedFd<'_> {
        unsafe { BorrowedFd::borrow_raw(self.raw_fd) }
    }
}

/// Read `buf.len()` bytes from a non-blocking fd, polling for readiness
/// between `read()` calls that would otherwise return `EWOULDBLOCK`. From
/// the caller's point of view this behaves like a blocking read.
fn read_exact_blocking(file: &mut File, raw_fd: RawFd, buf: &mut [u8]) -> io::Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "peer closed mid-message",
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                let borrowed: BorrowedFd = unsafe { BorrowedFd::borrow_raw(raw_fd) };
                let mut fds = [PollFd::new(borrowed, PollFlags::POLLIN)];
                poll(&mut fds, PollTimeout::NONE).map_err(io::Error::from)?;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(unix)]
fn libc_o_nonblock() -> i32 {
    OFlag::O_NONBLOCK.bits()
}
