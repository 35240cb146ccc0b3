use log::{debug, error, info};

use crate::error::Error;
use crate::providers::{GeminiSource, OpenAiSource, Source};
use crate::reply::Reply;
use crate::request::Options;
use crate::Provider;

/// Picks the provider named in the options and runs one request on it
pub struct Runner
{   options: Options
}

impl Runner
{   pub fn new(options: Options) -> Self
    {   Runner { options }
    }

    pub fn options(&self) -> &Options
    {   &self.options
    }

    /// The provider named by `llm_source`
    pub fn provider(&self) -> Result<Provider, Error>
    {   self.options.llm_source.parse().map_err(|e| {
          error!("Unsupported LLM source: {}", self.options.llm_source);
          e
        })
    }

    /// Construct the source for the configured provider
    pub fn source(&self) -> Result<Box<dyn Source>, Error>
    {   let source: Box<dyn Source> = match self.provider()?
        {   Provider::OpenAI => Box::new(OpenAiSource::new(&self.options)?)
          , Provider::Gemini => Box::new(GeminiSource::new(&self.options)?)
        };
        debug!("Constructed {} source", source.name());
        Ok(source)
    }

    /// Run the instance
    pub async fn run(&self) -> Result<Reply, Error>
    {   let source = self.source()?;
        dispatch(source.as_ref(), &self.options).await
    }
}

/// Route to the operation the options ask for
pub async fn dispatch(source: &dyn Source, options: &Options)
  -> Result<Reply, Error>
{   if options.list_models
    {   info!("Listing {} models", source.name());
        source.list_models().await
    } else if options.stream
    {   debug!("Streaming from {}", source.name());
        source.stream_chat_generate().await
    } else
    {   debug!("Generating with {}", source.name());
        source.chat_generate().await
    }
}
