//! Invocation options shared by every provider

use serde::{Deserialize, Serialize};

use crate::config::ProviderConfig;
use crate::error::Error;

/// Everything one invocation needs. Built once by the caller and
/// only ever borrowed by the sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Options
{   /// Provider name, "openai" or "gemini"
    pub llm_source: String
  , /// Model name; empty lets the provider pick its default
    pub model: String
  , /// Shorthand for GPT-3.5 Turbo, loses to `gpt4` and `model`
    pub gpt3: bool
  , /// Shorthand for the GPT-4 default model
    pub gpt4: bool
  , /// The prompt text
    pub prompt: String
  , /// System lines, joined into a single system message
    pub system: Vec<String>
  , /// Sampling temperature, 0 means vendor default
    pub temperature: f32
  , /// Nucleus sampling, 0 means vendor default
    pub top_p: f32
  , /// Deliver the completion chunk by chunk
    pub stream: bool
  , /// List the provider's models instead of chatting
    pub list_models: bool
  , pub openai: ProviderConfig
  , pub gemini: ProviderConfig
}

impl Options
{   /// System lines joined with newlines, if any were given
    pub fn system_message(&self) -> Option<String>
    {   if self.system.is_empty()
        {   None
        } else
        {   Some(self.system.join("\n"))
        }
    }

    /// Zero is indistinguishable from "not provided"
    pub fn temperature(&self) -> Option<f32>
    {   non_zero(self.temperature)
    }

    /// Zero is indistinguishable from "not provided"
    pub fn top_p(&self) -> Option<f32>
    {   non_zero(self.top_p)
    }

    /// The prompt for a chat call, or a validation error when empty
    pub fn require_prompt(&self) -> Result<&str, Error>
    {   if self.prompt.is_empty()
        {   Err(Error::Validation("no prompt provided".to_string()))
        } else
        {   Ok(&self.prompt)
        }
    }
}

fn non_zero(value: f32) -> Option<f32>
{   if value == 0.0
    {   None
    } else
    {   Some(value)
    }
}
