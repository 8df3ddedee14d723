//! Daemon control client and the two-stage handoff.

use crate::config::ClientConfig;
use crate::connection::{DaemonConnection, Reply};
use crate::error::{ClientError, ClientResult};
use std::path::Path;
use std::process::Command;
use std::thread;
use tracing::{debug, info};

/// The devices bound to a daemon for one merge target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTriple {
    /// COW container device.
    pub cow_device: String,
    /// Base image device the deltas apply against.
    pub base_device: String,
    /// Kernel control device the daemon serves.
    pub control_device: String,
}

impl DeviceTriple {
    /// Creates a device triple.
    pub fn new(
        cow_device: impl Into<String>,
        base_device: impl Into<String>,
        control_device: impl Into<String>,
    ) -> Self {
        Self {
            cow_device: cow_device.into(),
            base_device: base_device.into(),
            control_device: control_device.into(),
        }
    }
}

/// Control client for the snapshot merge daemon.
///
/// Each command opens a fresh connection, performs a single
/// send/receive, and closes it; there is no long-lived socket. The
/// client is single-caller by contract.
pub struct DaemonClient {
    config: ClientConfig,
}

impl DaemonClient {
    /// Creates a client over the given configuration.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Connects to the active daemon.
    ///
    /// Tries the first-stage socket, then the second-stage socket. A
    /// daemon answering `passive` (mid-handoff), a rejected probe, or a
    /// connect failure closes that socket and falls through to the next.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Unreachable`] if no socket yields an
    /// `active` daemon.
    pub fn connect(&self) -> ClientResult<DaemonConnection> {
        for socket in [
            &self.config.first_stage_socket,
            &self.config.second_stage_socket,
        ] {
            match self.probe(socket) {
                Ok(conn) => return Ok(conn),
                Err(e) => debug!("daemon probe on {:?} failed: {}", socket, e),
            }
        }
        Err(ClientError::Unreachable)
    }

    /// Opens a connection and performs the `query` liveness handshake.
    fn probe(&self, socket: &Path) -> ClientResult<DaemonConnection> {
        let mut conn =
            DaemonConnection::open(socket, self.config.recv_timeout, self.config.packet_size)?;
        match conn.request("query")? {
            Reply::Active => Ok(conn),
            Reply::Passive => Err(ClientError::DaemonPassive),
            Reply::Fail => Err(ClientError::DaemonFailure {
                command: "query".to_string(),
            }),
            Reply::Success => Err(ClientError::protocol("unexpected success reply to query")),
        }
    }

    /// Spawns the first-stage daemon and waits for it to come up.
    ///
    /// # Errors
    ///
    /// See [`DaemonClient::start_daemon_at`].
    pub fn start_daemon(&self) -> ClientResult<()> {
        self.start_daemon_at(&self.config.first_stage_socket)
    }

    /// Spawns the daemon binary bound to `socket` and polls until it
    /// answers as active.
    ///
    /// The daemon is long-lived; the child is never waited on. Polling
    /// is a bounded retry with linear backoff: attempt `n` sleeps
    /// `n * poll_interval` before reconnecting.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Spawn`] if the binary cannot be spawned,
    /// or [`ClientError::Unreachable`] if the retry budget is exhausted
    /// before any connect succeeds.
    pub fn start_daemon_at(&self, socket: &Path) -> ClientResult<()> {
        let child = Command::new(&self.config.daemon_binary)
            .arg(socket)
            .spawn()
            .map_err(ClientError::Spawn)?;
        info!(
            "spawned daemon {:?} (pid {}) on {:?}",
            self.config.daemon_binary,
            child.id(),
            socket
        );
        drop(child);

        for attempt in 1..=self.config.max_connect_retries {
            match self.connect() {
                Ok(_conn) => return Ok(()),
                Err(e) => {
                    debug!("daemon not up yet (attempt {}): {}", attempt, e);
                    thread::sleep(self.config.poll_interval * attempt);
                }
            }
        }
        Err(ClientError::Unreachable)
    }

    /// Binds a device triple to the active daemon for merging.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::DaemonFailure`] if the daemon rejects the
    /// binding, or any connect/receive error.
    pub fn initialize(&self, triple: &DeviceTriple) -> ClientResult<()> {
        let mut conn = self.connect()?;
        let msg = format!(
            "start,{},{},{}",
            triple.cow_device, triple.base_device, triple.control_device
        );
        match conn.request(&msg)? {
            Reply::Success => {
                debug!("daemon initialized with {}", msg);
                Ok(())
            }
            Reply::Fail => Err(ClientError::DaemonFailure { command: msg }),
            other => Err(ClientError::protocol(format!(
                "unexpected reply {other:?} to {msg}"
            ))),
        }
    }

    /// Terminates a daemon.
    ///
    /// With `first_stage_daemon` the client connects straight to the
    /// first-stage socket without the `query` handshake - the daemon may
    /// already be passive and would refuse the probe. No reply is
    /// expected; the connection closes immediately after the send.
    ///
    /// # Errors
    ///
    /// Returns any connect or send error.
    pub fn stop(&self, first_stage_daemon: bool) -> ClientResult<()> {
        let mut conn = if first_stage_daemon {
            DaemonConnection::open(
                &self.config.first_stage_socket,
                self.config.recv_timeout,
                self.config.packet_size,
            )?
        } else {
            self.connect()?
        };
        conn.send("stop")
    }

    /// Drives the first-stage → second-stage daemon transition.
    ///
    /// 1. Sends `terminate-request` to the active (first-stage) daemon,
    ///    which marks it passive without exiting; it keeps serving I/O
    ///    until the caller swaps the snapshot tables.
    /// 2. Spawns the second-stage daemon and polls until it is active.
    ///    With the first stage passive, [`DaemonClient::connect`] now
    ///    falls through to the second-stage socket.
    /// 3. Binds each device triple to the second-stage daemon.
    ///
    /// There is no rollback: on the first unrecoverable error the
    /// transition stops and cleanup is the caller's responsibility.
    ///
    /// # Errors
    ///
    /// Returns the first error of any step.
    pub fn restart(&self, triples: &[DeviceTriple]) -> ClientResult<()> {
        {
            let mut conn = self.connect()?;
            match conn.request("terminate-request")? {
                Reply::Success => {}
                Reply::Fail => {
                    return Err(ClientError::DaemonFailure {
                        command: "terminate-request".to_string(),
                    });
                }
                other => {
                    return Err(ClientError::protocol(format!(
                        "unexpected reply {other:?} to terminate-request"
                    )));
                }
            }
        }

        self.start_daemon_at(&self.config.second_stage_socket)?;
        info!("second-stage daemon is active");

        for triple in triples {
            self.initialize(triple)?;
        }
        Ok(())
    }
}
