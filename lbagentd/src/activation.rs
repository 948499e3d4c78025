//! Socket activation (systemd `LISTEN_FDS` protocol).
//!
//! The supervisor binds the agent-check port and passes the listening socket
//! as file descriptor 3, announcing it through `LISTEN_PID` and `LISTEN_FDS`.
//! Exactly one socket is accepted.

use nix::sys::socket::{SockType, getsockopt, sockopt};
use std::io;
use std::os::fd::{FromRawFd, RawFd};
use thiserror::Error;
use tokio::net::TcpListener;

/// First descriptor passed by the supervisor.
pub const LISTEN_FDS_START: RawFd = 3;

const LISTEN_PID_ENV: &str = "LISTEN_PID";
const LISTEN_FDS_ENV: &str = "LISTEN_FDS";

/// Errors while taking over the activated socket. All of them are fatal.
#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("no listening socket passed; start this program through socket activation")]
    NotActivated,

    #[error("{var} has invalid value '{value}'")]
    InvalidVariable { var: &'static str, value: String },

    #[error("sockets were passed to process {expected}, not to this process ({actual})")]
    PidMismatch { expected: u32, actual: u32 },

    #[error("expected exactly one listening socket, got {0}")]
    SocketCount(usize),

    #[error("passed descriptor is not a TCP listener: {0}")]
    NotListener(&'static str),

    #[error("passed descriptor is not a usable TCP listener: {0}")]
    Adopt(#[source] io::Error),
}

/// Number of sockets the supervisor passed to `own_pid`.
///
/// Mirrors `sd_listen_fds`: without `LISTEN_PID` and `LISTEN_FDS` nothing was
/// passed.
pub fn listen_fds(
    listen_pid: Option<&str>,
    listen_fds: Option<&str>,
    own_pid: u32,
) -> Result<usize, ActivationError> {
    let (Some(pid), Some(fds)) = (listen_pid, listen_fds) else {
        return Err(ActivationError::NotActivated);
    };

    let expected: u32 = pid.trim().parse().map_err(|_| ActivationError::InvalidVariable {
        var: LISTEN_PID_ENV,
        value: pid.to_string(),
    })?;
    if expected != own_pid {
        return Err(ActivationError::PidMismatch {
            expected,
            actual: own_pid,
        });
    }

    fds.trim()
        .parse()
        .map_err(|_| ActivationError::InvalidVariable {
            var: LISTEN_FDS_ENV,
            value: fds.to_string(),
        })
}

/// Require exactly one passed socket.
pub fn single_socket(count: usize) -> Result<RawFd, ActivationError> {
    match count {
        0 => Err(ActivationError::NotActivated),
        1 => Ok(LISTEN_FDS_START),
        n => Err(ActivationError::SocketCount(n)),
    }
}

/// Take over the socket passed by the supervisor.
///
/// Must run inside a tokio runtime.
#[allow(unsafe_code)]
pub fn take_listener() -> Result<TcpListener, ActivationError> {
    let pid = std::env::var(LISTEN_PID_ENV).ok();
    let fds = std::env::var(LISTEN_FDS_ENV).ok();
    let count = listen_fds(pid.as_deref(), fds.as_deref(), std::process::id())?;
    let fd = single_socket(count)?;

    // SAFETY: the supervisor handed this descriptor to this very process
    // (LISTEN_PID matched) and nothing else in the process refers to it.
    unsafe { adopt_listener(fd) }
}

/// Wrap a listening socket descriptor into a tokio listener.
///
/// # Safety
///
/// `fd` must be an open descriptor owned by nobody else; ownership moves to
/// the returned listener (or is closed on error).
#[allow(unsafe_code)]
pub unsafe fn adopt_listener(fd: RawFd) -> Result<TcpListener, ActivationError> {
    // SAFETY: upheld by the caller.
    let std_listener = unsafe { std::net::TcpListener::from_raw_fd(fd) };

    let kind = getsockopt(&std_listener, sockopt::SockType)
        .map_err(|e| ActivationError::Adopt(e.into()))?;
    if kind != SockType::Stream {
        return Err(ActivationError::NotListener("not a stream socket"));
    }
    let listening = getsockopt(&std_listener, sockopt::AcceptConn)
        .map_err(|e| ActivationError::Adopt(e.into()))?;
    if !listening {
        return Err(ActivationError::NotListener("socket is not listening"));
    }

    // Fails for stream sockets outside the inet families.
    std_listener.local_addr().map_err(ActivationError::Adopt)?;
    std_listener
        .set_nonblocking(true)
        .map_err(ActivationError::Adopt)?;
    TcpListener::from_std(std_listener).map_err(ActivationError::Adopt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::fd::IntoRawFd;

    #[test]
    fn test_not_activated_without_variables() {
        assert!(matches!(
            listen_fds(None, None, 42),
            Err(ActivationError::NotActivated)
        ));
        assert!(matches!(
            listen_fds(Some("42"), None, 42),
            Err(ActivationError::NotActivated)
        ));
        assert!(matches!(
            listen_fds(None, Some("1"), 42),
            Err(ActivationError::NotActivated)
        ));
    }

    #[test]
    fn test_pid_mismatch() {
        match listen_fds(Some("41"), Some("1"), 42) {
            Err(ActivationError::PidMismatch { expected, actual }) => {
                assert_eq!(expected, 41);
                assert_eq!(actual, 42);
            }
            other => panic!("expected pid mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            listen_fds(Some("abc"), Some("1"), 42),
            Err(ActivationError::InvalidVariable { var: "LISTEN_PID", .. })
        ));
        assert!(matches!(
            listen_fds(Some("42"), Some("-1"), 42),
            Err(ActivationError::InvalidVariable { var: "LISTEN_FDS", .. })
        ));
    }

    #[test]
    fn test_socket_count() {
        assert_eq!(listen_fds(Some("42"), Some("1"), 42).unwrap(), 1);
        assert_eq!(listen_fds(Some("42"), Some("3"), 42).unwrap(), 3);

        assert!(matches!(single_socket(0), Err(ActivationError::NotActivated)));
        assert_eq!(single_socket(1).unwrap(), LISTEN_FDS_START);
        assert!(matches!(single_socket(2), Err(ActivationError::SocketCount(2))));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ActivationError::SocketCount(2).to_string(),
            "expected exactly one listening socket, got 2"
        );
        assert!(
            ActivationError::NotActivated
                .to_string()
                .contains("socket activation")
        );
    }

    #[tokio::test]
    #[allow(unsafe_code)]
    async fn test_adopt_bound_listener() {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = std_listener.local_addr().unwrap();
        let fd = std_listener.into_raw_fd();

        // SAFETY: `into_raw_fd` released ownership of `fd`.
        let listener = unsafe { adopt_listener(fd) }.unwrap();
        assert_eq!(listener.local_addr().unwrap(), addr);

        let client = tokio::net::TcpStream::connect(addr);
        let (accepted, client) = tokio::join!(listener.accept(), client);
        assert!(accepted.is_ok());
        assert!(client.is_ok());
    }

    #[tokio::test]
    #[allow(unsafe_code)]
    async fn test_adopt_rejects_non_tcp_descriptor() {
        let dir = tempfile::TempDir::new().unwrap();
        let unix = std::os::unix::net::UnixListener::bind(dir.path().join("sock")).unwrap();
        let fd = unix.into_raw_fd();

        // SAFETY: `into_raw_fd` released ownership of `fd`.
        let result = unsafe { adopt_listener(fd) };
        assert!(matches!(result, Err(ActivationError::Adopt(_))));
    }

    #[tokio::test]
    #[allow(unsafe_code)]
    async fn test_adopt_rejects_datagram_socket() {
        let udp = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let fd = udp.into_raw_fd();

        // SAFETY: `into_raw_fd` released ownership of `fd`.
        let result = unsafe { adopt_listener(fd) };
        assert!(matches!(
            result,
            Err(ActivationError::NotListener("not a stream socket"))
        ));
    }

    #[tokio::test]
    #[allow(unsafe_code)]
    async fn test_adopt_rejects_connected_stream() {
        let server = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let stream = std::net::TcpStream::connect(server.local_addr().unwrap()).unwrap();
        let fd = stream.into_raw_fd();

        // SAFETY: `into_raw_fd` released ownership of `fd`.
        let result = unsafe { adopt_listener(fd) };
        assert!(matches!(
            result,
            Err(ActivationError::NotListener("socket is not listening"))
        ));
    }
}
