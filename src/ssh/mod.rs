//! Remote session provider built on the OpenSSH client binary.
//!
//! Gerrit exposes no RPC API for administration or event streaming; both go
//! through its SSH daemon. This module hides the transport behind the
//! [`SessionProvider`] and [`Session`] traits so the watcher and the
//! administrative commands can be driven by any implementation.

mod error;
mod openssh;
mod process;
mod session;

pub use error::{SpawnError, TransportError};
pub use openssh::{OpenSshProvider, OpenSshSession, DEFAULT_OPEN_TIMEOUT};
pub use process::{SshCommandBuilder, SshProcess, DEFAULT_TERMINATE_TIMEOUT};
pub use session::{close_quietly, BoxedReader, RemoteCommand, Session, SessionProvider, SshTarget};

/// Default port of the Gerrit SSH daemon.
pub const DEFAULT_PORT: u16 = 29418;
