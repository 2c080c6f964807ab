use thiserror::Error;

/// Failure of the read path.
///
/// Once any structural check fails, the whole file is presumed
/// untrustworthy: there is no partial or degraded success, and nothing of
/// the partially-built profile is handed back. The collection path, by
/// contrast, never fails.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("not a profile stats file (bad magic)")]
    BadMagic,

    #[error("unsupported stats file version {0:#010x}")]
    BadVersion(u32),

    #[error("inconsistent stats file header")]
    BadHeader,

    #[error("truncated stats file")]
    Truncated,

    #[error("malformed XML: {0}")]
    Xml(#[from] xml_rs::reader::Error),

    #[error("unexpected element <{0}>")]
    UnexpectedElement(String),

    #[error("missing element <{0}>")]
    MissingElement(&'static str),

    #[error("missing required attribute `{0}`")]
    MissingAttribute(&'static str),

    #[error("malformed numeric attribute `{0}`")]
    BadNumber(&'static str),

    #[error("id 0 is reserved")]
    ZeroId,

    #[error("call references unknown function id {0}")]
    UnknownFunction(u32),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ReadError {
    /// Folds short reads into [`ReadError::Truncated`]; a record cut off
    /// mid-way is a malformed file, not an I/O accident.
    pub(crate) fn from_read(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            ReadError::Truncated
        } else {
            ReadError::Io(err)
        }
    }
}
