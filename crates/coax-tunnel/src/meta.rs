use std::time::Duration;

use crate::error::{Result, TunnelError};

/// Header carrying the body length.
pub const CONTENT_LENGTH: &str = "content-length";

/// Header carrying the transaction deadline in milliseconds.
pub const TIMEOUT_HEADER: &str = "x-3270-timeout";

/// Header carrying the destination station address.
pub const STATION_ADDRESS_HEADER: &str = "x-station-address";

pub use coax_engine::DEFAULT_TIMEOUT;

/// Recognised metadata of one tunnel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestMeta {
    pub content_length: Option<usize>,
    pub timeout: Option<Duration>,
    pub station_address: Option<u8>,
}

impl RequestMeta {
    /// Extract recognised headers. Names match case-insensitively; unknown
    /// headers are ignored, malformed values of known ones are rejected.
    pub fn from_headers<I, K, V>(headers: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut meta = RequestMeta::default();
        for (name, value) in headers {
            let name = name.as_ref();
            let value = value.as_ref().trim();
            if name.eq_ignore_ascii_case(CONTENT_LENGTH) {
                meta.content_length = Some(parse(CONTENT_LENGTH, value)?);
            } else if name.eq_ignore_ascii_case(TIMEOUT_HEADER) {
                let millis: u64 = parse(TIMEOUT_HEADER, value)?;
                meta.timeout = Some(Duration::from_millis(millis));
            } else if name.eq_ignore_ascii_case(STATION_ADDRESS_HEADER) {
                meta.station_address = Some(parse(STATION_ADDRESS_HEADER, value)?);
            }
        }
        Ok(meta)
    }

    /// The deadline to apply, falling back to `default`.
    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.timeout.unwrap_or(default)
    }

    /// Headers describing this request, as a client sends them.
    ///
    /// Content length is left to the HTTP layer.
    pub fn to_headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::new();
        if let Some(address) = self.station_address {
            headers.push((STATION_ADDRESS_HEADER.to_string(), address.to_string()));
        }
        if let Some(timeout) = self.timeout {
            headers.push((TIMEOUT_HEADER.to_string(), timeout.as_millis().to_string()));
        }
        headers
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T> {
    value.parse().map_err(|_| TunnelError::InvalidHeader {
        name,
        value: value.to_string(),
    })
}
