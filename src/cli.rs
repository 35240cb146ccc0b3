//! Command line arguments and output rendering

use std::fs;
use std::io::{self, IsTerminal, Read, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::debug;

use crate::config::ProviderConfig;
use crate::reply::Reply;
use crate::request::Options;

#[derive(Debug, Clone, Parser)]
#[command(name = "aix")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Send a prompt to an LLM provider from the command line")]
pub struct Args
{   /// Prompt to send (read from stdin when omitted and piped)
    #[arg(short = 'p', long = "prompt")]
    pub prompt: Option<String>
  , /// Model to use (provider default when omitted)
    #[arg(short = 'm', long = "model", default_value = "")]
    pub model: String
  , /// Use the GPT-3.5 default model
    #[arg(long = "gpt3", alias = "g3")]
    pub gpt3: bool
  , /// Use the GPT-4 default model
    #[arg(long = "gpt4", alias = "g4")]
    pub gpt4: bool
  , /// System message line (repeatable)
    #[arg(short = 's', long = "system")]
    pub system: Vec<String>
  , /// Sampling temperature, 0 keeps the provider default
    #[arg(short = 't', long = "temperature", default_value_t = 0.0)]
    pub temperature: f32
  , /// Nucleus sampling, 0 keeps the provider default
    #[arg(long = "top-p", default_value_t = 0.0)]
    pub top_p: f32
  , /// Stream the response as it is generated
    #[arg(long = "stream")]
    pub stream: bool
  , /// List the provider's models
    #[arg(long = "list-models", alias = "lm")]
    pub list_models: bool
  , /// Provider to use: openai or gemini
    #[arg(long = "source", default_value = "openai")]
    pub source: String
  , /// Write the completion to this file
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>
  , /// Print the reply as one JSON line
    #[arg(short = 'j', long = "jsonl")]
    pub jsonl: bool
  , /// Verbose logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool
  , /// OpenAI API key (overrides OPENAI_API_KEY)
    #[arg(long = "openai-api-key")]
    pub openai_api_key: Option<String>
  , /// Gemini API key (overrides Gemini_API_KEY)
    #[arg(long = "gemini-api-key")]
    pub gemini_api_key: Option<String>
  , /// Route Gemini requests through this proxy; disables TLS
    /// certificate verification for those requests
    #[arg(long = "gemini-proxy")]
    pub gemini_proxy: Option<String>
  , /// Request timeout in seconds
    #[arg(long = "timeout")]
    pub timeout_secs: Option<u64>
}

impl Args
{   /// Merge flags over the environment-derived provider settings
    pub fn into_options(
      self
    , mut openai: ProviderConfig
    , mut gemini: ProviderConfig
    ) -> Options
    {   if self.openai_api_key.is_some()
        {   openai.api_key = self.openai_api_key;
        }
        if self.gemini_api_key.is_some()
        {   gemini.api_key = self.gemini_api_key;
        }
        if self.gemini_proxy.is_some()
        {   gemini.proxy = self.gemini_proxy;
        }
        if self.timeout_secs.is_some()
        {   openai.timeout_secs = self.timeout_secs;
            gemini.timeout_secs = self.timeout_secs;
        }

        Options
        {   llm_source: self.source
          , model: self.model
          , gpt3: self.gpt3
          , gpt4: self.gpt4
          , prompt: self.prompt.unwrap_or_default()
          , system: self.system
          , temperature: self.temperature
          , top_p: self.top_p
          , stream: self.stream
          , list_models: self.list_models
          , openai
          , gemini
        }
    }

    /// Fill a missing prompt from piped stdin
    pub fn read_prompt_from_stdin(&mut self) -> anyhow::Result<()>
    {   if self.prompt.is_some() || self.list_models
        {   return Ok(());
        }
        let stdin = io::stdin();
        if stdin.is_terminal()
        {   return Ok(());
        }
        let mut buf = String::new();
        stdin.lock().read_to_string(&mut buf)
          .context("failed to read prompt from stdin")?;
        let prompt = buf.trim();
        if !prompt.is_empty()
        {   debug!("Read {} bytes of prompt from stdin", prompt.len());
            self.prompt = Some(prompt.to_string());
        }
        Ok(())
    }
}

/// Print or save a reply. Streamed chunks are written as they arrive
/// unless the whole reply is needed first (JSON or file output).
pub async fn render<W: Write>(
  reply: &mut Reply
, args: &Args
, out: &mut W
) -> anyhow::Result<()>
{   if args.jsonl || args.output.is_some()
    {   if reply.is_streaming()
        {   while reply.next_chunk().await.is_some() {}
        }
    } else if reply.is_streaming()
    {   while let Some(chunk) = reply.next_chunk().await
        {   out.write_all(chunk.as_bytes())?;
            out.flush()?;
        }
        writeln!(out)?;
    } else
    {   writeln!(out, "{}", reply.completion)?;
    }

    if let Some(e) = &reply.error
    {   return Err(e.clone().into());
    }

    if args.jsonl
    {   writeln!(out, "{}", serde_json::to_string(&*reply)?)?;
    }
    if let Some(path) = &args.output
    {   fs::write(path, &reply.completion)
          .with_context(|| format!("failed to write {}", path.display()))?;
        debug!("Wrote completion to {}", path.display());
    }
    Ok(())
}
