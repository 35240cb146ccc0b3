use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use log::{debug, error, trace};
use serde::{Deserialize, Serialize};

use crate::config::ProviderConfig;
use crate::error::Error;
use crate::reply::{Reply, ReplyWriter};
use crate::request::Options;

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const GPT3_DOT_5_TURBO: &str = "gpt-3.5-turbo";
pub const GPT4_TURBO_PREVIEW: &str = "gpt-4-turbo-preview";
/// Model used when no name or shorthand is given
pub const DEFAULT_MODEL: &str = GPT3_DOT_5_TURBO;

pub const ROLE_SYSTEM: &str = "system";
pub const ROLE_USER: &str = "user";

// ===== Message Types =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: String
  , pub content: String
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest
{   pub model: String
  , pub messages: Vec<ChatMessage>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>
  , #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatCompletionResponse
{   #[serde(default)]
    pub choices: Vec<Choice>
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Choice
{   #[serde(default)]
    pub message: ResponseMessage
  , #[serde(default)]
    pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMessage
{   #[serde(default)]
    pub role: Option<String>
  , #[serde(default)]
    pub content: Option<String>
}

/// One `data:` event of a streamed completion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatCompletionChunk
{   #[serde(default)]
    pub choices: Vec<ChunkChoice>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkChoice
{   #[serde(default)]
    pub delta: Delta
  , #[serde(default)]
    pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Delta
{   #[serde(default)]
    pub content: Option<String>
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiError
{   #[serde(default)]
    pub message: String
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelsResponse
{   #[serde(default)]
    pub data: Vec<ModelData>
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelData
{   pub id: String
  , #[serde(default)]
    pub owned_by: Option<String>
}

pub type ChunkStream
  = BoxStream<'static, Result<ChatCompletionChunk, Error>>;

// ===== Vendor Service =====

/// The OpenAI endpoints this crate calls
#[async_trait]
pub trait OpenAiApi: Send + Sync
{   async fn list_models(&self) -> Result<ModelsResponse, Error>;

    async fn create_chat_completion(
      &self
    , request: &ChatCompletionRequest
    ) -> Result<ChatCompletionResponse, Error>;

    async fn create_chat_completion_stream(
      &self
    , request: &ChatCompletionRequest
    ) -> Result<ChunkStream, Error>;
}

/// reqwest implementation of `OpenAiApi`
#[derive(Debug, Clone)]
pub struct OpenAiClient
{   http_client: reqwest::Client
  , api_base: String
  , api_key: String
}

impl OpenAiClient
{   pub fn new(config: &ProviderConfig) -> Result<Self, Error>
    {   debug!("Creating OpenAiClient");
        Ok(OpenAiClient
        {   api_key: config.require_api_key("OpenAI")?
          , api_base: config.base_url(OPENAI_API_BASE)
          , http_client: config.http_client()?
        })
    }

    async fn post_chat(
      &self
    , request: &ChatCompletionRequest
    ) -> Result<reqwest::Response, Error>
    {   trace!("OpenAI request: {:?}", request);
        let response = self.http_client
          .post(format!("{}/chat/completions", self.api_base))
          .bearer_auth(&self.api_key)
          .json(request)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            Error::http(e)
          })?;
        super::ensure_success("OpenAI", response).await
    }
}

#[async_trait]
impl OpenAiApi for OpenAiClient
{   async fn list_models(&self) -> Result<ModelsResponse, Error>
    {   debug!("Fetching OpenAI models");
        let response = self.http_client
          .get(format!("{}/models", self.api_base))
          .bearer_auth(&self.api_key)
          .send()
          .await
          .map_err(|e| {
            error!("Failed to fetch models: {}", e);
            Error::http(e)
          })?;
        let response = super::ensure_success("OpenAI", response).await?;
        response.json().await.map_err(Error::http)
    }

    async fn create_chat_completion(
      &self
    , request: &ChatCompletionRequest
    ) -> Result<ChatCompletionResponse, Error>
    {   let response = self.post_chat(request).await?;
        response.json().await.map_err(|e| {
          error!("Parse error: {}", e);
          Error::http(e)
        })
    }

    async fn create_chat_completion_stream(
      &self
    , request: &ChatCompletionRequest
    ) -> Result<ChunkStream, Error>
    {   let response = self.post_chat(request).await?;
        Ok(super::sse::json_events(response))
    }
}

// ===== Source =====

/// OpenAI chat completions behind the `Source` capability set
pub struct OpenAiSource
{   api: Arc<dyn OpenAiApi>
  , options: Options
  , model: String
  , chat_request: ChatCompletionRequest
}

impl OpenAiSource
{   /// Build the HTTP client from `options.openai`
    pub fn new(options: &Options) -> Result<Self, Error>
    {   let client = OpenAiClient::new(&options.openai)?;
        Ok(Self::with_api(options, Arc::new(client)))
    }

    /// Use any implementation of the vendor service
    pub fn with_api(options: &Options, api: Arc<dyn OpenAiApi>) -> Self
    {   let model = resolve_model(options);
        debug!("OpenAI source using model: {}", model);

        let mut messages = Vec::new();
        if let Some(system) = options.system_message()
        {   messages.push(ChatMessage
            {   role: ROLE_SYSTEM.to_string()
              , content: system
            });
        }
        if !options.prompt.is_empty()
        {   messages.push(ChatMessage
            {   role: ROLE_USER.to_string()
              , content: options.prompt.clone()
            });
        }

        let chat_request = ChatCompletionRequest
        {   model: model.clone()
          , messages
          , temperature: options.temperature()
          , top_p: options.top_p()
          , stream: false
        };

        OpenAiSource
        {   api
          , options: options.clone()
          , model
          , chat_request
        }
    }

    pub fn model(&self) -> &str
    {   &self.model
    }

    /// The request every chat call starts from
    pub fn chat_request(&self) -> &ChatCompletionRequest
    {   &self.chat_request
    }
}

/// Explicit model wins, then the GPT-4 and GPT-3 shorthands
fn resolve_model(options: &Options) -> String
{   if !options.model.is_empty()
    {   options.model.clone()
    } else if options.gpt4
    {   GPT4_TURBO_PREVIEW.to_string()
    } else if options.gpt3
    {   GPT3_DOT_5_TURBO.to_string()
    } else
    {   DEFAULT_MODEL.to_string()
    }
}

#[async_trait]
impl super::Source for OpenAiSource
{   fn name(&self) -> &'static str
    {   "openai"
    }

    async fn list_models(&self) -> Result<Reply, Error>
    {   let models = self.api.list_models().await?;
        debug!("Retrieved {} models", models.data.len());
        let listing = super::model_listing(
          models.data.into_iter().map(|m| m.id)
        );
        Ok(super::listing_reply(
          &self.model,
          &self.options.prompt,
          listing,
          self.options.stream
        ))
    }

    async fn chat_generate(&self) -> Result<Reply, Error>
    {   let prompt = self.options.require_prompt()?;
        debug!("OpenAI chat with model: {}", self.model);

        let response = self.api
          .create_chat_completion(&self.chat_request)
          .await?;
        let choice = response.choices
          .into_iter()
          .next()
          .ok_or_else(|| {
            error!("No choices in response");
            Error::EmptyResponse("no data on response".to_string())
          })?;

        Ok(Reply::new(&self.model, prompt)
          .with_completion(choice.message.content.unwrap_or_default()))
    }

    async fn stream_chat_generate(&self) -> Result<Reply, Error>
    {   let prompt = self.options.require_prompt()?;
        debug!("OpenAI stream with model: {}", self.model);

        let (reply, writer) = Reply::streaming(&self.model, prompt);
        let mut request = self.chat_request.clone();
        request.stream = true;
        tokio::spawn(produce_stream(Arc::clone(&self.api), request, writer));
        Ok(reply)
    }
}

/// Background producer for one streaming reply
async fn produce_stream(
  api: Arc<dyn OpenAiApi>
, request: ChatCompletionRequest
, writer: ReplyWriter
)
{   let mut stream = match api.create_chat_completion_stream(&request).await
    {   Ok(stream) => stream
      , Err(e) => return writer.fail(e)
    };

    while let Some(item) = stream.next().await
    {   let chunk = match item
        {   Ok(chunk) => chunk
          , Err(e) => return writer.fail(e)
        };
        if let Some(api_error) = chunk.error
        {   return writer.fail(Error::Provider(api_error.message));
        }
        let Some(choice) = chunk.choices.into_iter().next() else {
          return writer.fail(
            Error::EmptyResponse("got empty response".to_string())
          );
        };
        let content = choice.delta.content.unwrap_or_default();
        if content.is_empty()
        {   continue;
        }
        if !writer.write(content)
        {   debug!("Reply dropped by reader, stopping stream");
            break;
        }
    }
    writer.finish();
}
