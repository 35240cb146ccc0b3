#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use aix::error::Error;
use aix::providers::gemini::{
  Candidate, Content, GeminiApi, GenerateContentRequest,
  GenerateContentResponse, ListModelsResponse, ModelInfo, Part,
  ResponseStream
};
use aix::providers::openai::{
  ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse,
  Choice, ChunkChoice, ChunkStream, Delta, ModelData, ModelsResponse,
  OpenAiApi, ResponseMessage
};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};

// ===== OpenAI stub =====

/// Canned OpenAI service that counts every call it receives
#[derive(Default)]
pub struct StubOpenAi
{   pub models: Vec<String>
  , pub choices: Vec<String>
  , pub chunks: Vec<Result<ChatCompletionChunk, Error>>
  , pub open_error: Option<Error>
  , pub calls: AtomicUsize
  , pub requests: Mutex<Vec<ChatCompletionRequest>>
}

impl StubOpenAi
{   /// Sync answer is the concatenation of the streamed pieces
    pub fn with_text(pieces: &[&str]) -> Self
    {   StubOpenAi
        {   choices: vec![pieces.concat()]
          , chunks: pieces.iter().map(|p| Ok(openai_chunk(p))).collect()
          , ..Default::default()
        }
    }

    pub fn with_models(models: &[&str]) -> Self
    {   StubOpenAi
        {   models: models.iter().map(|m| m.to_string()).collect()
          , ..Default::default()
        }
    }

    pub fn calls(&self) -> usize
    {   self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ChatCompletionRequest>
    {   self.requests.lock().unwrap().last().cloned()
    }

    fn record(&self, request: Option<&ChatCompletionRequest>)
    {   self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(request) = request
        {   self.requests.lock().unwrap().push(request.clone());
        }
    }
}

pub fn openai_chunk(text: &str) -> ChatCompletionChunk
{   ChatCompletionChunk
    {   choices: vec![ChunkChoice
        {   delta: Delta { content: Some(text.to_string()) }
          , finish_reason: None
        }]
      , error: None
    }
}

#[async_trait]
impl OpenAiApi for StubOpenAi
{   async fn list_models(&self) -> Result<ModelsResponse, Error>
    {   self.record(None);
        Ok(ModelsResponse
        {   data: self.models
              .iter()
              .map(|id| ModelData { id: id.clone(), owned_by: None })
              .collect()
        })
    }

    async fn create_chat_completion(
      &self
    , request: &ChatCompletionRequest
    ) -> Result<ChatCompletionResponse, Error>
    {   self.record(Some(request));
        Ok(ChatCompletionResponse
        {   choices: self.choices
              .iter()
              .map(|text| Choice
              {   message: ResponseMessage
                  {   role: Some("assistant".to_string())
                    , content: Some(text.clone())
                  }
                , finish_reason: Some("stop".to_string())
              })
              .collect()
        })
    }

    async fn create_chat_completion_stream(
      &self
    , request: &ChatCompletionRequest
    ) -> Result<ChunkStream, Error>
    {   self.record(Some(request));
        if let Some(e) = &self.open_error
        {   return Err(e.clone());
        }
        Ok(stream::iter(self.chunks.clone()).boxed())
    }
}

// ===== Gemini stub =====

/// Canned Gemini service; catalog pages are addressed by index,
/// with the page token being the index as a string
#[derive(Default)]
pub struct StubGemini
{   pub pages: Vec<Vec<String>>
  , pub responses: Vec<GenerateContentResponse>
  , pub chunks: Vec<Result<GenerateContentResponse, Error>>
  , pub calls: AtomicUsize
  , pub requests: Mutex<Vec<(String, GenerateContentRequest)>>
}

impl StubGemini
{   pub fn with_text(pieces: &[&str]) -> Self
    {   StubGemini
        {   responses: vec![gemini_response(&pieces.concat())]
          , chunks: pieces.iter().map(|p| Ok(gemini_response(p))).collect()
          , ..Default::default()
        }
    }

    pub fn with_pages(pages: &[&[&str]]) -> Self
    {   StubGemini
        {   pages: pages
              .iter()
              .map(|page| page.iter().map(|m| m.to_string()).collect())
              .collect()
          , ..Default::default()
        }
    }

    pub fn calls(&self) -> usize
    {   self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<(String, GenerateContentRequest)>
    {   self.requests.lock().unwrap().last().cloned()
    }

    fn record(&self, model: &str, request: &GenerateContentRequest)
    {   self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
          .lock()
          .unwrap()
          .push((model.to_string(), request.clone()));
    }
}

pub fn gemini_response(text: &str) -> GenerateContentResponse
{   GenerateContentResponse
    {   candidates: vec![Candidate
        {   content: Some(Content
            {   role: Some("model".to_string())
              , parts: vec![Part::text(text)]
            })
          , finish_reason: None
        }]
      , ..Default::default()
    }
}

#[async_trait]
impl GeminiApi for StubGemini
{   async fn list_models(
      &self
    , page_token: Option<&str>
    ) -> Result<ListModelsResponse, Error>
    {   self.calls.fetch_add(1, Ordering::SeqCst);
        let index: usize = page_token
          .map(|t| t.parse().expect("numeric page token"))
          .unwrap_or(0);
        let models = self.pages
          .get(index)
          .cloned()
          .unwrap_or_default()
          .into_iter()
          .map(|name| ModelInfo { name, display_name: None })
          .collect();
        let next_page_token = if index + 1 < self.pages.len()
        {   Some((index + 1).to_string())
        } else
        {   None
        };
        Ok(ListModelsResponse { models, next_page_token })
    }

    async fn generate_content(
      &self
    , model: &str
    , request: &GenerateContentRequest
    ) -> Result<GenerateContentResponse, Error>
    {   self.record(model, request);
        Ok(self.responses.first().cloned().unwrap_or_default())
    }

    async fn stream_generate_content(
      &self
    , model: &str
    , request: &GenerateContentRequest
    ) -> Result<ResponseStream, Error>
    {   self.record(model, request);
        Ok(stream::iter(self.chunks.clone()).boxed())
    }
}
