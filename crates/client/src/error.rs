use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BackendError {
    #[snafu(display("failed to build http client on `{stage}`: {source}"))]
    BuildClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("media type '{media_type}' is not usable for a multipart part: {source}"))]
    InvalidMediaType {
        stage: &'static str,
        media_type: String,
        source: reqwest::Error,
    },
    #[snafu(display("request to {url} failed on `{stage}`: {source}"))]
    Transport {
        stage: &'static str,
        url: String,
        source: reqwest::Error,
    },
    #[snafu(display("{url} returned status {status}: {body}"))]
    Status {
        stage: &'static str,
        url: String,
        status: u16,
        body: String,
    },
    #[snafu(display("failed to decode response from {url} on `{stage}`: {source}"))]
    Decode {
        stage: &'static str,
        url: String,
        source: serde_json::Error,
    },
}

impl BackendError {
    /// HTTP status carried by the error, if the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::BuildClient { .. }
            | Self::InvalidMediaType { .. }
            | Self::Transport { .. }
            | Self::Decode { .. } => None,
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            Self::BuildClient { stage, .. }
            | Self::InvalidMediaType { stage, .. }
            | Self::Transport { stage, .. }
            | Self::Status { stage, .. }
            | Self::Decode { stage, .. } => stage,
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;
