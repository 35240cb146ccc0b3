use thiserror::Error as ThisError;

/// Custom error type for aix operations
/// Implements Clone so a streamed reply can carry its failure
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum Error
{   /// Missing credentials or a client that could not be built
    #[error("configuration error: {0}")]
    Configuration(String)
  , /// Source name is not one of the supported providers
    #[error("unknown provider: {0}")]
    UnknownProvider(String)
  , /// Request rejected before anything was sent
    #[error("validation error: {0}")]
    Validation(String)
  , /// Network, status or decode failure from the vendor
    #[error("provider error: {0}")]
    Provider(String)
  , /// Vendor answered but with no usable choice or candidate
    #[error("empty response: {0}")]
    EmptyResponse(String)
}

impl Error
{   pub(crate) fn http(e: reqwest::Error) -> Self
    {   if e.is_decode()
        {   Error::Provider(format!("parse error: {}", e))
        } else
        {   Error::Provider(format!("HTTP error: {}", e))
        }
    }
}

impl From<serde_json::Error> for Error
{   fn from(e: serde_json::Error) -> Self
    {   Error::Provider(format!("parse error: {}", e))
    }
}
