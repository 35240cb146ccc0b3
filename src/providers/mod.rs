//! LLM provider implementations

use async_trait::async_trait;
use log::{error, trace};

use crate::error::Error;
use crate::reply::Reply;

pub mod gemini;
pub mod openai;
mod sse;

// Re-export for convenience
pub use gemini::{GeminiClient, GeminiSource};
pub use openai::{OpenAiClient, OpenAiSource};

/// What every provider can do. The runner only ever talks to this.
#[async_trait]
pub trait Source: Send + Sync
{   /// Provider name for logs
    fn name(&self) -> &'static str;

    /// The provider's model catalog, one name per line
    async fn list_models(&self) -> Result<Reply, Error>;

    /// One request, one complete answer
    async fn chat_generate(&self) -> Result<Reply, Error>;

    /// Returns at once; a background task fills the reply's channel
    async fn stream_chat_generate(&self) -> Result<Reply, Error>;
}

/// Model names, each terminated by a newline
pub(crate) fn model_listing<I>(names: I) -> String
where I: IntoIterator<Item = String>
{   names
      .into_iter()
      .map(|name| format!("{}\n", name))
      .collect()
}

/// Wrap a finished listing in a reply. A streaming caller still gets
/// it through the channel, as a single chunk.
pub(crate) fn listing_reply(
  model: &str
, prompt: &str
, listing: String
, stream: bool
) -> Reply
{   if stream
    {   let (reply, writer) = Reply::streaming(model, prompt);
        writer.write(listing);
        writer.finish();
        reply
    } else
    {   Reply::new(model, prompt).with_completion(listing)
    }
}

/// Turn a non-2xx response into a provider error carrying the body
pub(crate) async fn ensure_success(
  vendor: &str
, response: reqwest::Response
) -> Result<reqwest::Response, Error>
{   let status = response.status();
    trace!("{} response status: {}", vendor, status);
    if status.is_success()
    {   return Ok(response);
    }
    let error_text = response.text().await
      .unwrap_or_else(|_| "Unknown error".to_string());
    error!("{} API error ({}): {}", vendor, status, error_text);
    Err(Error::Provider(
      format!("{} error ({}): {}", vendor, status, error_text)
    ))
}
