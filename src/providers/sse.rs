//! Server-sent event decoding shared by the streaming endpoints

use eventsource_stream::Eventsource;
use futures::future;
use futures::stream::{BoxStream, StreamExt};
use log::trace;
use serde::de::DeserializeOwned;

use crate::error::Error;

const DONE: &str = "[DONE]";

/// Decode each `data:` payload of an SSE body as JSON. Ends at the
/// body's end or at a `[DONE]` sentinel, whichever comes first.
pub(crate) fn json_events<T>(response: reqwest::Response)
  -> BoxStream<'static, Result<T, Error>>
where T: DeserializeOwned + Send + 'static
{   response
      .bytes_stream()
      .eventsource()
      .take_while(|event| future::ready(
        !matches!(event, Ok(e) if e.data.trim() == DONE)
      ))
      .filter_map(|event| future::ready(match event
      {   Ok(e) if e.data.trim().is_empty() => None
        , Ok(e) => {
            trace!("SSE data: {}", e.data);
            Some(serde_json::from_str::<T>(&e.data).map_err(Error::from))
          }
        , Err(e) => Some(Err(Error::Provider(
            format!("stream error: {}", e)
          )))
      }))
      .boxed()
}
