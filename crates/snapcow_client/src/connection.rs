//! Scoped daemon connection and reply classification.

use crate::error::{ClientError, ClientResult};
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

/// A classified daemon reply.
///
/// Classification is an exact match on the first comma-separated token
/// of the trimmed first line. A daemon echoing command text or emitting
/// anything unrecognized is a protocol error, never a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// The daemon is the active instance.
    Active,
    /// The daemon has been marked passive during a handoff.
    Passive,
    /// The command was accepted.
    Success,
    /// The command was rejected.
    Fail,
}

impl Reply {
    /// Classifies a raw reply string.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Protocol`] for anything but the four
    /// literal reply tokens.
    pub fn classify(raw: &str) -> ClientResult<Self> {
        let first_line = raw.lines().next().unwrap_or("");
        let token = first_line.split(',').next().unwrap_or("").trim();

        match token {
            "active" => Ok(Self::Active),
            "passive" => Ok(Self::Passive),
            "success" => Ok(Self::Success),
            "fail" => Ok(Self::Fail),
            _ => Err(ClientError::protocol(format!(
                "unrecognized daemon reply: {raw:?}"
            ))),
        }
    }
}

/// One connection to a daemon socket, scoped to a single command.
///
/// The stream is owned by the connection and closed on drop, so every
/// exit path - success, daemon failure, timeout - releases the socket.
pub struct DaemonConnection {
    stream: UnixStream,
    packet_size: usize,
}

impl DaemonConnection {
    /// Connects to a daemon socket and arms the receive deadline.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] if the connect fails.
    pub fn open(socket: &Path, recv_timeout: Duration, packet_size: usize) -> ClientResult<Self> {
        let stream = UnixStream::connect(socket)?;
        stream.set_read_timeout(Some(recv_timeout))?;
        Ok(Self {
            stream,
            packet_size,
        })
    }

    /// Sends one control message.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Protocol`] if the message exceeds the
    /// packet size, or [`ClientError::Io`] if the send fails.
    pub fn send(&mut self, msg: &str) -> ClientResult<()> {
        if msg.len() > self.packet_size {
            return Err(ClientError::protocol(format!(
                "message of {} bytes exceeds packet size {}",
                msg.len(),
                self.packet_size
            )));
        }
        self.stream.write_all(msg.as_bytes())?;
        Ok(())
    }

    /// Receives one reply within the deadline.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Timeout`] if the deadline elapses,
    /// [`ClientError::Protocol`] if the daemon hangs up without
    /// replying, or [`ClientError::Io`] on any other receive failure.
    pub fn recv(&mut self) -> ClientResult<String> {
        let mut buf = vec![0u8; self.packet_size];
        let n = match self.stream.read(&mut buf) {
            Ok(0) => return Err(ClientError::protocol("daemon closed the connection")),
            Ok(n) => n,
            Err(e) if matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            ) =>
            {
                return Err(ClientError::Timeout);
            }
            Err(e) => return Err(e.into()),
        };
        Ok(String::from_utf8_lossy(&buf[..n]).into_owned())
    }

    /// Sends one message and classifies the reply.
    pub fn request(&mut self, msg: &str) -> ClientResult<Reply> {
        self.send(msg)?;
        let reply = self.recv()?;
        Reply::classify(&reply)
    }
}
