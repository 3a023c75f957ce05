/// Errors surfaced by the outbound client.
///
/// Filter failures never appear here: propagation and capture are
/// best-effort and are logged instead of failing the call.
pub enum ClientError {
    /// The underlying transport failed (connect, TLS, timeout, invalid
    /// request).
    Request(reqwest::Error),
    /// The response body could not be read into memory.
    BodyBuffer(String),
    /// The buffered body could not be decoded as the requested type.
    Decode(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Request(e) => write!(f, "request failed: {e}"),
            ClientError::BodyBuffer(msg) => write!(f, "body buffering failed: {msg}"),
            ClientError::Decode(msg) => write!(f, "response decoding failed: {msg}"),
        }
    }
}

impl std::fmt::Debug for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Request(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Request(err)
    }
}
