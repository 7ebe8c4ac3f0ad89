use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error calling {endpoint}: {message}")]
    Network { endpoint: String, message: String },
    #[error("server answered {status} for {endpoint}: {body}")]
    Server {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("malformed response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Network { endpoint, .. }
            | Self::Server { endpoint, .. }
            | Self::Decode { endpoint, .. } => endpoint,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}
