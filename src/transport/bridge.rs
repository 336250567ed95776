//! The production transport: a sidecar bridge process that owns the actual
//! chat session and speaks newline-delimited JSON over its stdio.
//!
//! Events arrive on the child's stdout; commands go out on its stdin. Lookup
//! commands carry a numeric request id and are answered by a matching
//! `*_result` event; the reader task routes those answers to their waiting
//! callers and forwards everything else to the host event loop.

use crate::transport::{ChatInfo, MessageEvent, Transport};
use crate::Result;
use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, warn};

/// Lifecycle and message events surfaced to the host event loop.
#[derive(Debug)]
pub enum Event {
    /// A new pairing code was issued by the chat session.
    PairingCode(String),
    /// The chat session is connected and listening.
    Ready,
    Message(MessageEvent),
}

/// Everything the bridge process can push to us. Unknown or malformed lines
/// are logged and skipped at the read loop, never a crash.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum BridgeEvent {
    Qr {
        code: String,
    },
    Ready,
    Message(MessageEvent),
    ChatResult {
        request_id: u64,
        #[serde(default)]
        ok: bool,
        #[serde(default)]
        is_group: bool,
        #[serde(default)]
        name: String,
    },
    ContactResult {
        request_id: u64,
        #[serde(default)]
        ok: bool,
        #[serde(default)]
        number: String,
    },
}

/// Commands we send to the bridge process.
#[derive(Debug, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
enum BridgeCommand<'a> {
    Chat {
        request_id: u64,
        chat_id: &'a str,
    },
    Contact {
        request_id: u64,
        sender_id: &'a str,
    },
    Reply {
        message_id: &'a str,
        text: &'a str,
    },
    React {
        message_id: &'a str,
        emoji: &'a str,
    },
}

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<BridgeEvent>>>>;

/// Owns the child process and the inbound event stream.
pub struct Bridge {
    _child: Child,
    events: mpsc::Receiver<Event>,
    handle: BridgeHandle,
}

/// A cloneable `Transport` backed by the bridge's stdin writer.
#[derive(Clone)]
pub struct BridgeHandle {
    commands: mpsc::Sender<String>,
    pending: Pending,
    next_request: Arc<AtomicU64>,
}

impl Bridge {
    /// Spawns the bridge executable and starts its reader and writer tasks.
    pub fn spawn(program: &Path) -> Result<Self> {
        let mut child = Command::new(program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn chat bridge at {}", program.display()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("Bridge child has no stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("Bridge child has no stdout"))?;

        let (event_tx, event_rx) = mpsc::channel(64);
        let (command_tx, command_rx) = mpsc::channel(64);
        let pending: Pending = Arc::default();

        tokio::spawn(write_loop(stdin, command_rx));
        tokio::spawn(read_loop(stdout, event_tx, Arc::clone(&pending)));

        Ok(Self {
            _child: child,
            events: event_rx,
            handle: BridgeHandle {
                commands: command_tx,
                pending,
                next_request: Arc::new(AtomicU64::new(1)),
            },
        })
    }

    /// A transport handle for the dispatcher.
    pub fn handle(&self) -> BridgeHandle {
        self.handle.clone()
    }

    /// The next inbound event, or `None` once the bridge closes its stdout.
    pub async fn next_event(&mut self) -> Option<Event> {
        self.events.recv().await
    }
}

impl BridgeHandle {
    async fn send(&self, command: &BridgeCommand<'_>) -> Result<()> {
        let line = serde_json::to_string(command).context("Failed to serialize bridge command")?;
        self.commands
            .send(line)
            .await
            .map_err(|_| anyhow!("Bridge writer is gone"))
    }

    /// Sends a lookup command and waits for its correlated answer.
    async fn request(&self, command: BridgeCommand<'_>, request_id: u64) -> Result<BridgeEvent> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(request_id, tx);
        if let Err(e) = self.send(&command).await {
            self.pending.lock().await.remove(&request_id);
            return Err(e);
        }
        match rx.await {
            Ok(event) => Ok(event),
            Err(_) => bail!("Bridge closed before answering request {request_id}"),
        }
    }

    fn next_request_id(&self) -> u64 {
        self.next_request.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl Transport for BridgeHandle {
    async fn chat(&self, chat_id: &str) -> Result<ChatInfo> {
        let request_id = self.next_request_id();
        let answer = self
            .request(
                BridgeCommand::Chat {
                    request_id,
                    chat_id,
                },
                request_id,
            )
            .await?;
        match answer {
            BridgeEvent::ChatResult {
                ok: true,
                is_group,
                name,
                ..
            } => Ok(ChatInfo { is_group, name }),
            _ => bail!("Chat lookup failed for {chat_id}"),
        }
    }

    async fn contact_number(&self, sender_id: &str) -> Result<String> {
        let request_id = self.next_request_id();
        let answer = self
            .request(
                BridgeCommand::Contact {
                    request_id,
                    sender_id,
                },
                request_id,
            )
            .await?;
        match answer {
            BridgeEvent::ContactResult {
                ok: true, number, ..
            } => Ok(number),
            _ => bail!("Contact lookup failed for {sender_id}"),
        }
    }

    async fn reply(&self, message_id: &str, text: &str) -> Result<()> {
        self.send(&BridgeCommand::Reply { message_id, text }).await
    }

    async fn react(&self, message_id: &str, emoji: &str) -> Result<()> {
        self.send(&BridgeCommand::React { message_id, emoji }).await
    }
}

async fn write_loop(mut stdin: ChildStdin, mut commands: mpsc::Receiver<String>) {
    while let Some(mut line) = commands.recv().await {
        line.push('\n');
        if let Err(e) = stdin.write_all(line.as_bytes()).await {
            warn!("Failed to write to the bridge, dropping command: {e}");
            break;
        }
    }
}

async fn read_loop(
    stdout: tokio::process::ChildStdout,
    events: mpsc::Sender<Event>,
    pending: Pending,
) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read from the bridge: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let event = match serde_json::from_str::<BridgeEvent>(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!("Skipping malformed bridge line: {e}");
                continue;
            }
        };
        match event {
            BridgeEvent::Qr { code } => forward(&events, Event::PairingCode(code)).await,
            BridgeEvent::Ready => forward(&events, Event::Ready).await,
            BridgeEvent::Message(message) => forward(&events, Event::Message(message)).await,
            BridgeEvent::ChatResult { request_id, .. }
            | BridgeEvent::ContactResult { request_id, .. } => {
                match pending.lock().await.remove(&request_id) {
                    Some(waiter) => {
                        // The waiter may have given up; nothing to do then.
                        let _ = waiter.send(event);
                    }
                    None => debug!("Answer for unknown request {request_id}, dropping"),
                }
            }
        }
    }
    debug!("Bridge stdout closed, ending read loop");
}

async fn forward(events: &mpsc::Sender<Event>, event: Event) {
    if events.send(event).await.is_err() {
        debug!("Event receiver is gone, dropping bridge event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_serialize_as_tagged_ndjson() {
        let line = serde_json::to_string(&BridgeCommand::React {
            message_id: "m1",
            emoji: "👍",
        })
        .unwrap();
        assert_eq!(line, r#"{"cmd":"react","message_id":"m1","emoji":"👍"}"#);
    }

    #[test]
    fn test_events_deserialize_from_tagged_lines() {
        let event: BridgeEvent =
            serde_json::from_str(r#"{"event":"qr","code":"pair-me"}"#).unwrap();
        assert!(matches!(event, BridgeEvent::Qr { code } if code == "pair-me"));

        let event: BridgeEvent = serde_json::from_str(
            r#"{"event":"message","id":"m1","chat_id":"c1@g.us","sender_id":"s1","body":"120 dinner","is_group_hint":true}"#,
        )
        .unwrap();
        match event {
            BridgeEvent::Message(message) => {
                assert_eq!(message.id, "m1");
                assert_eq!(message.body.as_deref(), Some("120 dinner"));
                assert!(message.is_group_hint);
            }
            other => panic!("expected a message event, got {other:?}"),
        }
    }

    #[test]
    fn test_message_event_tolerates_missing_fields() {
        let event: BridgeEvent =
            serde_json::from_str(r#"{"event":"message","id":"m1","chat_id":"c1"}"#).unwrap();
        match event {
            BridgeEvent::Message(message) => {
                assert!(message.sender_id.is_none());
                assert!(message.body.is_none());
            }
            other => panic!("expected a message event, got {other:?}"),
        }
    }

    #[test]
    fn test_chat_result_routes_by_request_id() {
        let event: BridgeEvent = serde_json::from_str(
            r#"{"event":"chat_result","request_id":7,"ok":true,"is_group":true,"name":"Trip"}"#,
        )
        .unwrap();
        assert!(matches!(
            event,
            BridgeEvent::ChatResult {
                request_id: 7,
                ok: true,
                is_group: true,
                ..
            }
        ));
    }
}
