//! Configuration for the daemon control client.

use std::path::PathBuf;
use std::time::Duration;

/// Maximum control message and reply size in bytes.
pub const PACKET_SIZE: usize = 512;

/// Default daemon binary exec'd by `start_daemon`.
const DEFAULT_DAEMON_BINARY: &str = "/system/bin/snapuserd";

/// Configuration for [`crate::DaemonClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Socket the first-stage (early boot) daemon listens on.
    pub first_stage_socket: PathBuf,
    /// Socket the second-stage daemon listens on.
    pub second_stage_socket: PathBuf,
    /// Daemon binary exec'd by `start_daemon`; the socket path is passed
    /// as its single argument.
    pub daemon_binary: PathBuf,
    /// Maximum control message and reply size.
    pub packet_size: usize,
    /// Deadline applied to every reply receive.
    pub recv_timeout: Duration,
    /// How many times start-up polling retries a connect.
    pub max_connect_retries: u32,
    /// Base interval between start-up polls; backoff is linear in the
    /// attempt number.
    pub poll_interval: Duration,
}

impl ClientConfig {
    /// Creates a configuration for the two daemon sockets.
    pub fn new(first_stage_socket: impl Into<PathBuf>, second_stage_socket: impl Into<PathBuf>) -> Self {
        Self {
            first_stage_socket: first_stage_socket.into(),
            second_stage_socket: second_stage_socket.into(),
            daemon_binary: PathBuf::from(DEFAULT_DAEMON_BINARY),
            packet_size: PACKET_SIZE,
            recv_timeout: Duration::from_secs(2),
            max_connect_retries: 10,
            poll_interval: Duration::from_millis(500),
        }
    }

    /// Sets the daemon binary to exec.
    #[must_use]
    pub fn with_daemon_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.daemon_binary = binary.into();
        self
    }

    /// Sets the reply receive deadline.
    #[must_use]
    pub fn with_recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout;
        self
    }

    /// Sets the start-up polling retry budget.
    #[must_use]
    pub fn with_max_connect_retries(mut self, retries: u32) -> Self {
        self.max_connect_retries = retries;
        self
    }

    /// Sets the base start-up polling interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}
