use thiserror::Error;

/// Errors that can occur anywhere in the ILA control plane core.
#[derive(Error, Debug)]
pub enum IlaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store transport error: {0}")]
    StoreTransport(String),
    #[error("store protocol error: {0}")]
    StoreProtocol(String),
    #[error("route install error: {0}")]
    Route(String),
    #[error("netlink error: {0}")]
    Netlink(String),
    #[error("AMFP protocol error: {0}")]
    AmfpProtocol(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("TLV codec error: {0}")]
    Tlv(#[from] crate::tlv::TlvError),
}

pub type IlaResult<T> = std::result::Result<T, IlaError>;
