//! Per-provider configuration and HTTP client construction

use std::time::Duration;

use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const OPENAI_API_BASE_ENV: &str = "OPENAI_API_BASE";
pub const GEMINI_API_KEY_ENV: &[&str] = &["Gemini_API_KEY", "GEMINI_API_KEY"];
pub const GEMINI_PROXY_ENV: &[&str] = &["Gemini_PROXY", "GEMINI_PROXY"];

/// Provider configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig
{   /// Vendor credential
    #[serde(skip_serializing)]
    pub api_key: Option<String>
  , /// API base URL (if custom)
    pub api_base: Option<String>
  , /// Route every request through this proxy. Certificate
    /// verification is turned off for the proxied client.
    pub proxy: Option<String>
  , /// Request timeout in seconds
    pub timeout_secs: Option<u64>
}

impl ProviderConfig
{   /// OpenAI settings from the process environment
    pub fn openai_from_env() -> Self
    {   Self::openai_from_lookup(|name| std::env::var(name).ok())
    }

    /// Gemini settings from the process environment
    pub fn gemini_from_env() -> Self
    {   Self::gemini_from_lookup(|name| std::env::var(name).ok())
    }

    pub fn openai_from_lookup<F>(lookup: F) -> Self
    where F: Fn(&str) -> Option<String>
    {   ProviderConfig
        {   api_key: non_empty(lookup(OPENAI_API_KEY_ENV))
          , api_base: non_empty(lookup(OPENAI_API_BASE_ENV))
          , proxy: None
          , timeout_secs: None
        }
    }

    pub fn gemini_from_lookup<F>(lookup: F) -> Self
    where F: Fn(&str) -> Option<String>
    {   let first = |names: &[&str]| names
          .iter()
          .find_map(|name| non_empty(lookup(*name)));
        ProviderConfig
        {   api_key: first(GEMINI_API_KEY_ENV)
          , api_base: None
          , proxy: first(GEMINI_PROXY_ENV)
          , timeout_secs: None
        }
    }

    /// Credential or a configuration error naming the provider
    pub fn require_api_key(&self, provider: &str)
      -> Result<String, Error>
    {   self.api_key.clone().ok_or_else(|| {
          error!("No API key for: {}", provider);
          Error::Configuration(
            format!("{} API key is not configured / provided", provider)
          )
        })
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self, default: &str) -> String
    {   self.api_base
          .as_deref()
          .unwrap_or(default)
          .trim_end_matches('/')
          .to_string()
    }

    /// Build the reqwest client for this provider
    pub fn http_client(&self) -> Result<reqwest::Client, Error>
    {   let mut builder = reqwest::Client::builder();
        if let Some(secs) = self.timeout_secs
        {   debug!("Using request timeout of {}s", secs);
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(proxy_url) = &self.proxy
        {   warn!(
              "Routing through proxy {} with certificate \
               verification disabled",
              proxy_url
            );
            let proxy = reqwest::Proxy::all(proxy_url.as_str())
              .map_err(|e| {
                error!("Invalid proxy: {}", e);
                Error::Configuration(
                  format!("invalid proxy '{}': {}", proxy_url, e)
                )
              })?;
            builder = builder
              .proxy(proxy)
              .danger_accept_invalid_certs(true);
        }
        builder.build().map_err(|e| {
          error!("Failed to build HTTP client: {}", e);
          Error::Configuration(e.to_string())
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String>
{   value.filter(|v| !v.trim().is_empty())
}
