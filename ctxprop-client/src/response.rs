//! The response handed back to callers after the filters ran.

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;

use crate::error::ClientError;

/// A downstream response, possibly re-backed by an in-memory buffer.
///
/// When the capture filter had to read the body (a BODY field is
/// configured), the original stream is replaced by the buffered bytes and
/// the caller reads those; otherwise the untouched streaming response is
/// passed through. Either way the status, headers and body the caller sees
/// are exactly what the downstream service sent.
pub struct CapturedResponse {
    status: StatusCode,
    headers: HeaderMap,
    url: reqwest::Url,
    body: ResponseBody,
}

enum ResponseBody {
    Streaming(Box<reqwest::Response>),
    Buffered(Bytes),
}

impl CapturedResponse {
    pub(crate) fn streaming(response: reqwest::Response) -> Self {
        CapturedResponse {
            status: response.status(),
            headers: response.headers().clone(),
            url: response.url().clone(),
            body: ResponseBody::Streaming(Box::new(response)),
        }
    }

    pub(crate) fn buffered(
        status: StatusCode,
        headers: HeaderMap,
        url: reqwest::Url,
        bytes: Bytes,
    ) -> Self {
        CapturedResponse {
            status,
            headers,
            url,
            body: ResponseBody::Buffered(bytes),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn url(&self) -> &reqwest::Url {
        &self.url
    }

    /// Read the full body.
    pub async fn bytes(self) -> Result<Bytes, ClientError> {
        match self.body {
            ResponseBody::Streaming(response) => {
                response.bytes().await.map_err(ClientError::from)
            }
            ResponseBody::Buffered(bytes) => Ok(bytes),
        }
    }

    /// Read the body as UTF-8 text.
    pub async fn text(self) -> Result<String, ClientError> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Deserialize the body as JSON.
    pub async fn json<T: serde::de::DeserializeOwned>(self) -> Result<T, ClientError> {
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }
}
