use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use log::{debug, error, trace};
use serde::{Deserialize, Serialize};

use crate::config::ProviderConfig;
use crate::error::Error;
use crate::reply::{Reply, ReplyWriter};
use crate::request::Options;

pub const GEMINI_API_BASE: &str
  = "https://generativelanguage.googleapis.com";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-1.5-flash";

pub const ROLE_USER: &str = "user";

// ===== Message Types =====

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part
{   #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>
}

impl Part
{   pub fn text(text: impl Into<String>) -> Self
    {   Part { text: Some(text.into()) }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content
{   #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>
  , #[serde(default)]
    pub parts: Vec<Part>
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig
{   #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest
{   pub contents: Vec<Content>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse
{   #[serde(default)]
    pub candidates: Vec<Candidate>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>
}

/// Error body the API sends in place of candidates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiError
{   #[serde(default)]
    pub code: Option<u16>
  , #[serde(default)]
    pub message: String
  , #[serde(default)]
    pub status: Option<String>
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate
{   #[serde(default)]
    pub content: Option<Content>
  , #[serde(default)]
    pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListModelsResponse
{   #[serde(default)]
    pub models: Vec<ModelInfo>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo
{   pub name: String
  , #[serde(default)]
    pub display_name: Option<String>
}

pub type ResponseStream
  = BoxStream<'static, Result<GenerateContentResponse, Error>>;

// ===== Vendor Service =====

/// The Generative Language endpoints this crate calls
#[async_trait]
pub trait GeminiApi: Send + Sync
{   /// One page of the model catalog
    async fn list_models(
      &self
    , page_token: Option<&str>
    ) -> Result<ListModelsResponse, Error>;

    async fn generate_content(
      &self
    , model: &str
    , request: &GenerateContentRequest
    ) -> Result<GenerateContentResponse, Error>;

    async fn stream_generate_content(
      &self
    , model: &str
    , request: &GenerateContentRequest
    ) -> Result<ResponseStream, Error>;
}

/// reqwest implementation of `GeminiApi`. The key travels as the
/// `key` query parameter on every request, proxied or not.
#[derive(Debug, Clone)]
pub struct GeminiClient
{   http_client: reqwest::Client
  , api_base: String
  , api_key: String
}

impl GeminiClient
{   pub fn new(config: &ProviderConfig) -> Result<Self, Error>
    {   debug!("Creating GeminiClient");
        Ok(GeminiClient
        {   api_key: config.require_api_key("Gemini")?
          , api_base: config.base_url(GEMINI_API_BASE)
          , http_client: config.http_client()?
        })
    }

    fn model_url(&self, model: &str, method: &str) -> String
    {   format!(
          "{}/v1beta/models/{}:{}",
          self.api_base,
          model.trim_start_matches("models/"),
          method
        )
    }

    async fn post(
      &self
    , url: String
    , query: &[(&str, &str)]
    , request: &GenerateContentRequest
    ) -> Result<reqwest::Response, Error>
    {   trace!("Gemini request to {}: {:?}", url, request);
        let response = self.http_client
          .post(url)
          .query(&[("key", self.api_key.as_str())])
          .query(query)
          .json(request)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            Error::http(e)
          })?;
        super::ensure_success("Gemini", response).await
    }
}

#[async_trait]
impl GeminiApi for GeminiClient
{   async fn list_models(
      &self
    , page_token: Option<&str>
    ) -> Result<ListModelsResponse, Error>
    {   debug!("Fetching Gemini models, page token: {:?}", page_token);
        let mut request = self.http_client
          .get(format!("{}/v1beta/models", self.api_base))
          .query(&[("key", self.api_key.as_str())]);
        if let Some(token) = page_token
        {   request = request.query(&[("pageToken", token)]);
        }
        let response = request.send().await.map_err(|e| {
          error!("Failed to fetch models: {}", e);
          Error::http(e)
        })?;
        let response = super::ensure_success("Gemini", response).await?;
        response.json().await.map_err(Error::http)
    }

    async fn generate_content(
      &self
    , model: &str
    , request: &GenerateContentRequest
    ) -> Result<GenerateContentResponse, Error>
    {   let url = self.model_url(model, "generateContent");
        let response = self.post(url, &[], request).await?;
        response.json().await.map_err(|e| {
          error!("Parse error: {}", e);
          Error::http(e)
        })
    }

    async fn stream_generate_content(
      &self
    , model: &str
    , request: &GenerateContentRequest
    ) -> Result<ResponseStream, Error>
    {   let url = self.model_url(model, "streamGenerateContent");
        let response = self.post(url, &[("alt", "sse")], request).await?;
        Ok(super::sse::json_events(response))
    }
}

// ===== Source =====

/// Gemini generateContent behind the `Source` capability set
pub struct GeminiSource
{   api: Arc<dyn GeminiApi>
  , options: Options
  , model: String
  , template: GenerateContentRequest
}

impl GeminiSource
{   /// Build the HTTP client from `options.gemini`
    pub fn new(options: &Options) -> Result<Self, Error>
    {   let client = GeminiClient::new(&options.gemini)?;
        Ok(Self::with_api(options, Arc::new(client)))
    }

    /// Use any implementation of the vendor service
    pub fn with_api(options: &Options, api: Arc<dyn GeminiApi>) -> Self
    {   let model = if options.model.is_empty()
        {   GEMINI_DEFAULT_MODEL.to_string()
        } else
        {   options.model.clone()
        };
        debug!("Gemini source using model: {}", model);

        let system_instruction = options.system_message().map(|system| {
          Content
          {   role: None
            , parts: vec![Part::text(system)]
          }
        });

        let generation_config = match (options.temperature(), options.top_p())
        {   (None, None) => None
          , (temperature, top_p) => Some(GenerationConfig
            {   temperature
              , top_p
            })
        };

        GeminiSource
        {   api
          , options: options.clone()
          , model
          , template: GenerateContentRequest
            {   contents: Vec::new()
              , system_instruction
              , generation_config
            }
        }
    }

    pub fn model(&self) -> &str
    {   &self.model
    }

    /// The template with the live prompt appended as user content
    pub fn request_for(&self, prompt: &str) -> GenerateContentRequest
    {   let mut request = self.template.clone();
        request.contents.push(Content
        {   role: Some(ROLE_USER.to_string())
          , parts: vec![Part::text(prompt)]
        });
        request
    }
}

/// Content of the first candidate. A vendor error body is a provider
/// error; no candidate or no content is an empty response.
fn first_content(response: GenerateContentResponse)
  -> Result<Content, Error>
{   if let Some(api_error) = response.error
    {   error!("Gemini API error: {:?}", api_error);
        return Err(Error::Provider(api_error.message));
    }
    response.candidates
      .into_iter()
      .next()
      .and_then(|candidate| candidate.content)
      .ok_or_else(|| {
        error!("No candidate content in response");
        Error::EmptyResponse("no data on response".to_string())
      })
}

/// Text of the first part of the first candidate
fn candidate_text(response: GenerateContentResponse)
  -> Result<String, Error>
{   first_content(response)?
      .parts
      .into_iter()
      .next()
      .map(|part| part.text.unwrap_or_default())
      .ok_or_else(|| {
        error!("No parts in candidate content");
        Error::EmptyResponse("no data on response".to_string())
      })
}

/// Text carried by one stream chunk. The closing chunk may hold a
/// content without parts; that is an empty piece.
fn chunk_text(response: GenerateContentResponse)
  -> Result<String, Error>
{   Ok(first_content(response)?
      .parts
      .into_iter()
      .next()
      .and_then(|part| part.text)
      .unwrap_or_default())
}

#[async_trait]
impl super::Source for GeminiSource
{   fn name(&self) -> &'static str
    {   "gemini"
    }

    async fn list_models(&self) -> Result<Reply, Error>
    {   let mut names = Vec::new();
        let mut page_token: Option<String> = None;
        loop
        {   let page = self.api.list_models(page_token.as_deref()).await?;
            names.extend(
              page.models.into_iter().map(|m| m.name.trim().to_string())
            );
            match page.next_page_token.filter(|t| !t.is_empty())
            {   Some(token) => page_token = Some(token)
              , None => break
            }
        }
        debug!("Retrieved {} models", names.len());
        Ok(super::listing_reply(
          &self.model,
          &self.options.prompt,
          super::model_listing(names),
          self.options.stream
        ))
    }

    async fn chat_generate(&self) -> Result<Reply, Error>
    {   let prompt = self.options.require_prompt()?;
        debug!("Gemini chat with model: {}", self.model);

        let response = self.api
          .generate_content(&self.model, &self.request_for(prompt))
          .await?;
        Ok(Reply::new(&self.model, prompt)
          .with_completion(candidate_text(response)?))
    }

    async fn stream_chat_generate(&self) -> Result<Reply, Error>
    {   let prompt = self.options.require_prompt()?;
        debug!("Gemini stream with model: {}", self.model);

        let (reply, writer) = Reply::streaming(&self.model, prompt);
        tokio::spawn(produce_stream(
          Arc::clone(&self.api),
          self.model.clone(),
          self.request_for(prompt),
          writer
        ));
        Ok(reply)
    }
}

/// Background producer for one streaming reply
async fn produce_stream(
  api: Arc<dyn GeminiApi>
, model: String
, request: GenerateContentRequest
, writer: ReplyWriter
)
{   let mut stream = match api.stream_generate_content(&model, &request).await
    {   Ok(stream) => stream
      , Err(e) => return writer.fail(e)
    };

    while let Some(item) = stream.next().await
    {   let text = match item.and_then(chunk_text)
        {   Ok(text) => text
          , Err(Error::EmptyResponse(_)) => {
              return writer.fail(
                Error::EmptyResponse("got empty response".to_string())
              );
            }
          , Err(e) => return writer.fail(e)
        };
        if text.is_empty()
        {   continue;
        }
        if !writer.write(text)
        {   debug!("Reply dropped by reader, stopping stream");
            break;
        }
    }
    writer.finish();
}
