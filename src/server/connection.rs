// src/server/connection.rs
// One Wyoming connection: reads frames, answers the handshake, dispatches
// final transcripts and writes exactly one reply per transcript.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, trace, warn};

use super::dispatcher::Dispatcher;
use crate::error::ProtocolError;
use crate::protocol::messages::{self, Inbound};
use crate::protocol::{Event, read_event, write_event};
use crate::utils::truncate_for_log;

/// Streamed partial text kept per connection; later chunks are dropped.
const MAX_PARTIAL_BYTES: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for the next frame.
    Idle,
    /// A frame arrived; handshake kinds are answered here.
    AwaitingTranscript,
    /// A final transcript is with the classifier or a backend.
    Dispatching,
    /// The reply is being written.
    Emitting,
    Closed,
}

pub struct Connection<R, W> {
    reader: BufReader<R>,
    writer: W,
    dispatcher: Arc<Dispatcher>,
    peer: String,
    state: ConnectionState,
    /// Streamed transcript text, kept for logging only.
    partial: String,
}

impl<R, W> Connection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, dispatcher: Arc<Dispatcher>, peer: impl Into<String>) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
            dispatcher,
            peer: peer.into(),
            state: ConnectionState::Idle,
            partial: String::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Serve until the peer hangs up or the stream turns bad.
    pub async fn run(mut self) -> Result<(), ProtocolError> {
        let result = self.serve().await;
        self.transition(ConnectionState::Closed);

        if let Err(e) = self.writer.shutdown().await {
            trace!("Shutdown of {} failed: {}", self.peer, e);
        }
        result
    }

    async fn serve(&mut self) -> Result<(), ProtocolError> {
        loop {
            self.transition(ConnectionState::Idle);

            let Some(event) = read_event(&mut self.reader).await? else {
                debug!("Client {} disconnected", self.peer);
                return Ok(());
            };

            self.transition(ConnectionState::AwaitingTranscript);
            self.handle_event(event).await?;
        }
    }

    async fn handle_event(&mut self, event: Event) -> Result<(), ProtocolError> {
        debug!("Received event type: {}", event.kind);

        match Inbound::from_event(&event) {
            Inbound::Describe => {
                write_event(&mut self.writer, &messages::info()).await?;
                debug!("Sent info response");
            }
            Inbound::Ping { text } => {
                write_event(&mut self.writer, &messages::pong(text.as_deref())).await?;
            }
            Inbound::TranscriptChunk { text } => {
                if self.partial.len() + text.len() <= MAX_PARTIAL_BYTES {
                    self.partial.push_str(&text);
                }
                debug!("Partial transcript: {}", truncate_for_log(&self.partial, 200));
            }
            Inbound::Transcript { text, language } => {
                self.partial.clear();
                info!(
                    "Received transcript from {} ({}): {}",
                    self.peer,
                    language.as_deref().unwrap_or("unknown language"),
                    text
                );

                self.transition(ConnectionState::Dispatching);
                let reply = self.dispatcher.respond(&text).await;

                self.transition(ConnectionState::Emitting);
                let event = messages::reply(self.dispatcher.reply_kind(), &reply);
                write_event(&mut self.writer, &event).await?;
                debug!("Sent {} with text: {}", event.kind, truncate_for_log(&reply, 100));
            }
            Inbound::Ignored(kind) => match kind.as_str() {
                messages::TRANSCRIPT_START => {
                    self.partial.clear();
                    debug!("Ignoring {}", kind);
                }
                messages::TRANSCRIBE | messages::TRANSCRIPT_STOP => {
                    debug!("Ignoring {}", kind);
                }
                audio if audio.starts_with("audio-") => {
                    trace!("Ignoring {} ({} bytes)", audio, event.payload_len());
                }
                other => warn!("Unexpected event type: {}", other),
            },
        }

        Ok(())
    }

    fn transition(&mut self, next: ConnectionState) {
        trace!("{}: {:?} -> {:?}", self.peer, self.state, next);
        self.state = next;
    }
}
