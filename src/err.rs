#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("tun error: {0}")]
    Io(#[from] tidy_tuntap::error::Error),

    #[error("invalid parameter")]
    InvalidParameter,

    #[error("invalid key length")]
    InvalidKeyLength,

    #[error("out of memory")]
    OutOfMemory,

    #[error("operation timed out")]
    Timeout,

    #[error("socket is already connected")]
    AlreadyConnected,

    #[error("socket is not connected")]
    NotConnected,

    #[error("connection attempt failed")]
    ConnectionFailed,

    #[error("connection reset by peer")]
    ConnectionReset,

    #[error("connection is closing")]
    ConnectionClosing,

    #[error("end of stream")]
    EndOfStream,

    #[error("operation failed")]
    Failure,

    #[error("port {0} has been unexpectedly closed")]
    PortClosed(u16),

    #[error("port {0} already in use")]
    PortInUse(u16),
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        use std::io::ErrorKind;

        let kind = match err {
            Error::ConnectionReset => ErrorKind::ConnectionReset,
            Error::NotConnected => ErrorKind::NotConnected,
            Error::Timeout => ErrorKind::TimedOut,
            Error::InvalidParameter | Error::InvalidKeyLength => ErrorKind::InvalidInput,
            Error::AlreadyConnected => ErrorKind::AlreadyExists,
            _ => ErrorKind::Other,
        };

        std::io::Error::new(kind, err)
    }
}
