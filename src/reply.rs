//! The provider-agnostic outcome of one request.
//!
//! A `Reply` is either complete when returned (`completion` holds the
//! text) or streaming. A streaming reply owns the reading half of a
//! single-producer/single-consumer chunk channel; the background
//! producer owns the matching `ReplyWriter` and closes it exactly once,
//! reporting success or the error that stopped it.

use chrono::Local;
use log::{debug, error, trace};
use serde::{Serialize, Serializer};
use tokio::sync::{mpsc, oneshot};

use crate::error::Error;

const PRODUCER_GONE: &str = "stream producer exited before completion";

#[derive(Debug, Serialize)]
pub struct Reply
{   /// Creation time
    pub timestamp: String
  , /// Model that produced the reply
    pub model: String
  , /// Prompt echoed back
    pub prompt: String
  , /// Final text; for a streaming reply, everything drained so far
    pub completion: String
  , /// Set at most once; for a streaming reply only after the
    /// channel has been observed closed
    #[serde(
      skip_serializing_if = "Option::is_none",
      serialize_with = "serialize_error"
    )]
    pub error: Option<Error>
  , #[serde(skip)]
    stream: Option<ReplyStream>
}

#[derive(Debug)]
struct ReplyStream
{   chunks: mpsc::UnboundedReceiver<String>
  , outcome: oneshot::Receiver<Option<Error>>
}

impl Reply
{   /// A reply whose completion is filled in directly
    pub fn new(
      model: impl Into<String>
    , prompt: impl Into<String>
    ) -> Self
    {   Reply
        {   timestamp: Local::now().to_string()
          , model: model.into()
          , prompt: prompt.into()
          , completion: String::new()
          , error: None
          , stream: None
        }
    }

    /// A reply with an open chunk channel, plus the writer for it
    pub fn streaming(
      model: impl Into<String>
    , prompt: impl Into<String>
    ) -> (Self, ReplyWriter)
    {   let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let mut reply = Reply::new(model, prompt);
        reply.stream = Some(ReplyStream
        {   chunks: chunk_rx
          , outcome: outcome_rx
        });
        let writer = ReplyWriter
        {   chunks: Some(chunk_tx)
          , outcome: Some(outcome_tx)
        };
        (reply, writer)
    }

    pub fn with_completion(mut self, completion: String) -> Self
    {   self.completion = completion;
        self
    }

    /// True while chunks may still arrive
    pub fn is_streaming(&self) -> bool
    {   self.stream.is_some()
    }

    /// True once nothing more will arrive: either a plain reply, or
    /// a streaming one whose channel was observed closed
    pub fn is_finished(&self) -> bool
    {   self.stream.is_none()
    }

    /// Wait for the next chunk. `None` means the channel is closed and
    /// `error` now holds the outcome; every later call returns `None`.
    /// Drained chunks are also appended to `completion`.
    pub async fn next_chunk(&mut self) -> Option<String>
    {   let stream = self.stream.as_mut()?;
        if let Some(chunk) = stream.chunks.recv().await
        {   self.completion.push_str(&chunk);
            return Some(chunk);
        }
        let ReplyStream { outcome, .. } = self.stream.take()?;
        self.settle(outcome.await);
        None
    }

    /// Blocking variant of `next_chunk` for synchronous callers.
    /// Panics if called from within an async execution context.
    pub fn blocking_next_chunk(&mut self) -> Option<String>
    {   let stream = self.stream.as_mut()?;
        if let Some(chunk) = stream.chunks.blocking_recv()
        {   self.completion.push_str(&chunk);
            return Some(chunk);
        }
        let ReplyStream { outcome, .. } = self.stream.take()?;
        self.settle(outcome.blocking_recv());
        None
    }

    /// Drain a streaming reply and return the whole text, or the
    /// error that ended it
    pub async fn read_to_string(&mut self) -> Result<String, Error>
    {   while self.next_chunk().await.is_some() {}
        match &self.error
        {   Some(e) => Err(e.clone())
          , None => Ok(self.completion.clone())
        }
    }

    fn settle(
      &mut self
    , outcome: Result<Option<Error>, oneshot::error::RecvError>
    )
    {   match outcome
        {   Ok(None) => {
              debug!("Stream closed cleanly");
            }
          , Ok(Some(e)) => {
              debug!("Stream closed with error: {}", e);
              self.error = Some(e);
            }
          , Err(_) => {
              error!("Stream outcome lost");
              self.error = Some(Error::Provider(PRODUCER_GONE.to_string()));
            }
        }
    }
}

/// Writing half of a streaming reply. Closing happens exactly once:
/// through `finish`, `fail`, or on drop if the producer exits early.
#[derive(Debug)]
pub struct ReplyWriter
{   chunks: Option<mpsc::UnboundedSender<String>>
  , outcome: Option<oneshot::Sender<Option<Error>>>
}

impl ReplyWriter
{   /// Send one chunk. Returns false once the reader has gone away.
    pub fn write(&self, chunk: impl Into<String>) -> bool
    {   let chunk = chunk.into();
        trace!("Stream chunk: {:?}", chunk);
        match &self.chunks
        {   Some(tx) => tx.send(chunk).is_ok()
          , None => false
        }
    }

    /// Close the channel cleanly
    pub fn finish(mut self)
    {   self.close(None);
    }

    /// Record the error and close the channel
    pub fn fail(mut self, error: Error)
    {   error!("Stream failed: {}", error);
        self.close(Some(error));
    }

    fn close(&mut self, outcome: Option<Error>)
    {   // Dropping the sender first means the reader sees the channel
        // end before it looks at the outcome.
        self.chunks.take();
        if let Some(tx) = self.outcome.take()
        {   let _ = tx.send(outcome);
        }
    }
}

impl Drop for ReplyWriter
{   fn drop(&mut self)
    {   if self.outcome.is_some()
        {   error!("{}", PRODUCER_GONE);
            self.close(Some(Error::Provider(PRODUCER_GONE.to_string())));
        }
    }
}

fn serialize_error<S>(error: &Option<Error>, serializer: S)
  -> Result<S::Ok, S::Error>
where S: Serializer
{   match error
    {   Some(e) => serializer.serialize_some(&e.to_string())
      , None => serializer.serialize_none()
    }
}
