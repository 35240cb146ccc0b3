//! Live API checks. Ignored by default; they need real keys in the
//! environment and network access.

use aix::config::ProviderConfig;
use aix::{Options, Runner};

fn live_options(source: &str) -> Option<Options>
{   let openai = ProviderConfig::openai_from_env();
    let gemini = ProviderConfig::gemini_from_env();
    let configured = match source
    {   "openai" => openai.api_key.is_some()
      , _ => gemini.api_key.is_some()
    };
    if !configured
    {   println!("Skipping: no API key for {} in environment", source);
        return None;
    }
    Some(Options
    {   llm_source: source.to_string()
      , openai
      , gemini
      , ..Default::default()
    })
}

#[tokio::test]
#[ignore]
async fn test_openai_list_models()
{   let Some(options) = live_options("openai") else { return };
    let options = Options { list_models: true, ..options };

    match Runner::new(options).run().await
    {   Ok(reply) => {
          println!("Available OpenAI models:\n{}", reply.completion);
          assert!(!reply.completion.is_empty());
        }
      , Err(e) => panic!("Failed to get models: {}", e)
    }
}

#[tokio::test]
#[ignore]
async fn test_openai_send_prompt()
{   let Some(options) = live_options("openai") else { return };
    let options = Options
    {   prompt: "Say hello".to_string()
      , ..options
    };

    let reply = Runner::new(options).run().await.expect("chat reply");
    println!("Response from {}: {}", reply.model, reply.completion);
    assert!(!reply.completion.is_empty(), "Response should not be empty");
}

#[tokio::test]
#[ignore]
async fn test_openai_stream_prompt()
{   let Some(options) = live_options("openai") else { return };
    let options = Options
    {   prompt: "Count from one to five".to_string()
      , stream: true
      , ..options
    };

    let mut reply = Runner::new(options).run().await.expect("stream reply");
    let mut chunks = 0;
    while let Some(chunk) = reply.next_chunk().await
    {   print!("{}", chunk);
        chunks += 1;
    }
    println!();
    assert_eq!(reply.error, None);
    assert!(chunks > 0);
}

#[tokio::test]
#[ignore]
async fn test_gemini_list_models()
{   let Some(options) = live_options("gemini") else { return };
    let options = Options { list_models: true, ..options };

    let reply = Runner::new(options).run().await.expect("model list");
    println!("Available Gemini models:\n{}", reply.completion);
    assert!(reply.completion.lines().any(|m| m.starts_with("models/")));
}

#[tokio::test]
#[ignore]
async fn test_gemini_stream_prompt()
{   let Some(options) = live_options("gemini") else { return };
    let options = Options
    {   prompt: "What is 2+2?".to_string()
      , stream: true
      , ..options
    };

    let mut reply = Runner::new(options).run().await.expect("stream reply");
    match tokio::time::timeout(
      std::time::Duration::from_secs(30),
      reply.read_to_string()
    ).await
    {   Ok(Ok(text)) => {
          println!("Response: {}", text);
          assert!(!text.is_empty());
        }
      , Ok(Err(e)) => panic!("API Error: {}", e)
      , Err(_) => panic!("Timeout waiting for response")
    }
}
