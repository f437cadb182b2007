//! Error kinds (spec §7). Wire-visible protocol events are handled
//! inside the state machine and turn into responses on the wire, never
//! into an `Error`; this enum only carries what the application-facing
//! API can synchronously fail with, plus setup/transport failures.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Peer sent RST on an established or half-open connection.
    /// Surfaced through `on_disconnect` with reason "connection reset",
    /// not by returning this from a user call.
    #[error("connection reset by peer")]
    PeerReset,

    /// RST received in SYN-SENT, or in SYN-RECEIVED for a connection
    /// that originated from SYN-SENT. Surfaced via `on_error` then
    /// `on_disconnect`.
    #[error("connection refused")]
    Refused,

    /// A user operation (`send`/`receive`/`close`/`open`) was attempted
    /// on a connection that is closing or already closed.
    #[error("connection closing")]
    Closing,

    /// Active open attempted with no remote address set.
    #[error("no remote host set")]
    NoRemote,

    /// A local or remote port the caller tried to bind/connect on is
    /// already in use by another `Listener`/`Connection`.
    #[error("port {0} already in use")]
    PortInUse(u16),

    /// `Engine::accept`/table lookup found no matching connection; the
    /// handle outlived the connection it referred to.
    #[error("connection no longer exists")]
    NoSuchConnection,

    /// The global buffer-store capacity is exhausted; no more
    /// connections can be admitted until one frees its lease.
    #[error("buffer store exhausted")]
    BufferStoreExhausted,

    #[error("tun device error: {0}")]
    Tun(#[from] tidy_tuntap::error::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
