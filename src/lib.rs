pub mod cli;
pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod reply;
pub mod runner;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/*

aix sends one prompt to one LLM provider and hands back either the
whole answer or a live stream of chunks. Every provider sits behind
the same `Source` capability set, and every answer comes back as the
same `Reply`, however the vendor delivered it.

aix/
├── Cargo.toml
├── src/
│   ├── lib.rs          # Re-exports and the Provider enum
│   ├── main.rs         # Command-line entry point
│   ├── cli.rs          # Argument parsing and output
│   ├── error.rs        # Error taxonomy
│   ├── config.rs       # Per-provider credentials and transport
│   ├── request.rs      # Invocation options
│   ├── reply.rs        # Unified reply and its chunk channel
│   ├── runner.rs       # Provider selection and dispatch
│   └── providers/
│       ├── mod.rs      # The Source trait
│       ├── openai.rs
│       ├── gemini.rs
│       └── sse.rs      # Server-sent event decoding
└── tests/

*/

pub use error::Error;
pub use providers::Source;
pub use reply::{Reply, ReplyWriter};
pub use request::Options;
pub use runner::{dispatch, Runner};

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Provider
{   /// OpenAI chat completions (GPT models)
    OpenAI
  , /// Google Generative Language API (Gemini models)
    Gemini
}

impl Provider
{   pub fn as_str(&self) -> &'static str
    {   match self
        {   Provider::OpenAI => "openai"
          , Provider::Gemini => "gemini"
        }
    }
}

impl fmt::Display for Provider
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.write_str(self.as_str())
    }
}

impl FromStr for Provider
{   type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {   match s.trim().to_ascii_lowercase().as_str()
        {   "openai" => Ok(Provider::OpenAI)
          , "gemini" => Ok(Provider::Gemini)
          , _ => Err(Error::UnknownProvider(s.to_string()))
        }
    }
}
