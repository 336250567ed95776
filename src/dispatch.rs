//! Gatekeeps inbound chat events and runs each message line through the
//! parse → classify → resolve → record pipeline, answering with a single
//! reaction or reply per message.

use crate::category;
use crate::error::ParseError;
use crate::ledger::Ledger;
use crate::parse;
use crate::sender;
use crate::transport::{GroupIdentity, MessageEvent, Transport};
use crate::Result;
use anyhow::Context;
use tracing::{debug, warn};

/// Prefix of a per-line success outcome.
pub const REGISTERED_PREFIX: &str = "Registered:";
/// Prefix of a per-line parse rejection.
pub const INVALID_PREFIX: &str = "Invalid format:";
/// Prefix of a per-line ledger failure.
pub const FAILED_PREFIX: &str = "Failed to record:";

/// Reaction attached when every line of a message registered cleanly.
const ACK_REACTION: &str = "👍";

/// Chat-id suffix convention for group chats, used only when the transport
/// lookup fails.
const GROUP_ID_SUFFIX: &str = "@g.us";

/// What the dispatcher decided to do with one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// The event was filtered out; nothing visible happened.
    Ignored,
    /// Every line registered; a reaction was attached to the message.
    Reacted,
    /// At least one line failed; a reply enumerating every line was sent.
    Replied(String),
}

pub struct Dispatcher<T: Transport> {
    group_name: String,
    ledger: Ledger,
    transport: T,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(group_name: impl Into<String>, ledger: Ledger, transport: T) -> Self {
        Self {
            group_name: group_name.into(),
            ledger,
            transport,
        }
    }

    /// Runs one inbound event through the gate and the per-line pipeline.
    ///
    /// Lines are processed strictly in order and each outcome is kept in
    /// input order, so a partially successful batch is fully auditable from
    /// the single reply. Nothing is retried; a failed line has to be
    /// re-submitted as a new message.
    pub async fn handle(&mut self, event: &MessageEvent) -> Result<Disposition> {
        // Our own acknowledgments come back through the transport; drop them
        // before they are mistaken for expense lines.
        if event.body.as_deref().is_some_and(is_own_acknowledgment) {
            debug!("Ignoring our own acknowledgment echo");
            return Ok(Disposition::Ignored);
        }

        let (sender_id, body) = match (event.sender_id.as_deref(), event.body.as_deref()) {
            (Some(sender_id), Some(body)) if !sender_id.is_empty() && !body.is_empty() => {
                (sender_id, body)
            }
            _ => {
                debug!("Ignoring event without sender or body");
                return Ok(Disposition::Ignored);
            }
        };

        match self.group_identity(event).await {
            Some(GroupIdentity::Resolved(name)) if name == self.group_name => {}
            Some(GroupIdentity::Resolved(name)) => {
                debug!("Ignoring message from group {name:?}");
                return Ok(Disposition::Ignored);
            }
            Some(GroupIdentity::Unresolved) => {
                debug!("Group identity unconfirmed, discarding for safety");
                return Ok(Disposition::Ignored);
            }
            None => {
                debug!("Not a group chat, ignoring");
                return Ok(Disposition::Ignored);
            }
        }

        // One contact lookup per event; every line shares the sender.
        let number = match self.transport.contact_number(sender_id).await {
            Ok(number) => number,
            Err(e) => {
                warn!("Contact lookup failed, using the raw sender id: {e:#}");
                sender_id.to_string()
            }
        };
        let display_name = sender::resolve(&number);

        let mut outcomes = Vec::new();
        let mut all_registered = true;
        for line in body.lines().map(str::trim).filter(|line| !line.is_empty()) {
            match self.process_line(&display_name, line).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(outcome) => {
                    all_registered = false;
                    outcomes.push(outcome);
                }
            }
        }
        if outcomes.is_empty() {
            debug!("Message had no usable lines, ignoring");
            return Ok(Disposition::Ignored);
        }

        if all_registered {
            self.transport
                .react(&event.id, ACK_REACTION)
                .await
                .context("Failed to send reaction")?;
            Ok(Disposition::Reacted)
        } else {
            let text = outcomes.join("\n");
            self.transport
                .reply(&event.id, &text)
                .await
                .context("Failed to send reply")?;
            Ok(Disposition::Replied(text))
        }
    }

    /// One line through parse → classify → record. `Ok` is a success
    /// outcome, `Err` a failure outcome; both are user-facing strings.
    async fn process_line(&mut self, display_name: &str, line: &str) -> std::result::Result<String, String> {
        let expense = match parse::parse_line(line) {
            Ok(expense) => expense,
            Err(ParseError::MalformedLine(original)) => {
                return Err(format!("{INVALID_PREFIX} \"{original}\""));
            }
        };
        let category = category::classify(&expense.description);
        match self
            .ledger
            .record(display_name, &expense.description, expense.amount, category)
            .await
        {
            Ok(entry) => Ok(format!(
                "{REGISTERED_PREFIX} {} - ${} - {}",
                entry.description, entry.amount, entry.category
            )),
            Err(e) => {
                warn!("Failed to record {line:?}: {e}");
                Err(format!("{FAILED_PREFIX} \"{line}\""))
            }
        }
    }

    /// Resolves whether the event came from the one group we serve.
    ///
    /// `None` means "confirmed not a group". A failed lookup falls back to
    /// the id-suffix heuristic for group-ness, but the name then stays
    /// unresolved, and unresolved always ends in a discard.
    async fn group_identity(&self, event: &MessageEvent) -> Option<GroupIdentity> {
        match self.transport.chat(&event.chat_id).await {
            Ok(chat) if chat.is_group => Some(GroupIdentity::Resolved(chat.name)),
            Ok(_) => None,
            Err(e) => {
                warn!("Chat lookup failed, falling back to the id suffix: {e:#}");
                if event.chat_id.ends_with(GROUP_ID_SUFFIX) || event.is_group_hint {
                    Some(GroupIdentity::Unresolved)
                } else {
                    None
                }
            }
        }
    }
}

/// True for message bodies that look like one of our own acknowledgments.
fn is_own_acknowledgment(body: &str) -> bool {
    body.starts_with(REGISTERED_PREFIX)
        || body.starts_with(INVALID_PREFIX)
        || body.starts_with(FAILED_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::transport::ChatInfo;
    use anyhow::anyhow;
    use chrono::Local;
    use std::sync::{Arc, Mutex};

    const GROUP: &str = "Trip Expenses";

    fn month_label() -> String {
        Local::now().format("%B").to_string()
    }

    /// A scripted transport that records outbound traffic.
    #[derive(Default)]
    struct ScriptedTransport {
        /// `None` scripts a chat lookup failure.
        chat: Option<ChatInfo>,
        sent: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl ScriptedTransport {
        fn in_group(name: &str) -> Self {
            Self {
                chat: Some(ChatInfo {
                    is_group: true,
                    name: name.to_string(),
                }),
                ..Default::default()
            }
        }

        fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }

        fn outbox(&self) -> Arc<Mutex<Vec<(String, String)>>> {
            Arc::clone(&self.sent)
        }
    }

    #[async_trait::async_trait]
    impl Transport for ScriptedTransport {
        async fn chat(&self, _chat_id: &str) -> crate::Result<ChatInfo> {
            self.chat.clone().ok_or_else(|| anyhow!("lookup failed"))
        }

        async fn contact_number(&self, sender_id: &str) -> crate::Result<String> {
            Ok(sender_id.to_string())
        }

        async fn reply(&self, _message_id: &str, text: &str) -> crate::Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push(("reply".to_string(), text.to_string()));
            Ok(())
        }

        async fn react(&self, _message_id: &str, emoji: &str) -> crate::Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push(("react".to_string(), emoji.to_string()));
            Ok(())
        }
    }

    fn event(body: &str) -> MessageEvent {
        MessageEvent {
            id: "m1".to_string(),
            chat_id: "12036304@g.us".to_string(),
            sender_id: Some("972500000001".to_string()),
            body: Some(body.to_string()),
            is_group_hint: true,
        }
    }

    fn dispatcher(
        transport: ScriptedTransport,
        store: &MemoryStore,
    ) -> Dispatcher<ScriptedTransport> {
        Dispatcher::new(GROUP, Ledger::new(Box::new(store.clone())), transport)
    }

    #[tokio::test]
    async fn test_single_good_line_reacts_and_persists() {
        let store = MemoryStore::default();
        let transport = ScriptedTransport::in_group(GROUP);
        let outbox = transport.outbox();
        let mut dispatcher = dispatcher(transport, &store);

        let disposition = dispatcher.handle(&event("120 dinner")).await.unwrap();
        assert_eq!(disposition, Disposition::Reacted);
        assert_eq!(
            outbox.lock().unwrap().as_slice(),
            &[("react".to_string(), "👍".to_string())]
        );

        let rows = store.rows(&month_label()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][1], "Noa");
        assert_eq!(rows[1][2], "Dinner");
        assert_eq!(rows[1][3], "120");
        assert_eq!(rows[1][4], "Dining");
        assert_eq!(rows[1][5], "120");
    }

    #[tokio::test]
    async fn test_description_first_form() {
        let store = MemoryStore::default();
        let transport = ScriptedTransport::in_group(GROUP);
        let mut dispatcher = dispatcher(transport, &store);

        dispatcher.handle(&event("gym 45")).await.unwrap();

        let rows = store.rows(&month_label()).unwrap();
        assert_eq!(rows[1][2], "Gym");
        assert_eq!(rows[1][3], "45");
        assert_eq!(rows[1][4], "Fitness");
    }

    #[tokio::test]
    async fn test_mixed_batch_replies_in_input_order_without_reaction() {
        let store = MemoryStore::default();
        let transport = ScriptedTransport::in_group(GROUP);
        let mut dispatcher = dispatcher(transport, &store);

        let disposition = dispatcher.handle(&event("120 dinner\nabc")).await.unwrap();
        let expected = "Registered: Dinner - $120 - Dining\nInvalid format: \"abc\"";
        assert_eq!(disposition, Disposition::Replied(expected.to_string()));

        // The good line was still persisted.
        assert_eq!(store.rows(&month_label()).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_reply_not_reaction_when_any_line_fails() {
        let store = MemoryStore::default();
        let transport = ScriptedTransport::in_group(GROUP);
        let outbox = transport.outbox();
        let mut dispatcher = dispatcher(transport, &store);

        dispatcher.handle(&event("120 dinner\nabc")).await.unwrap();
        let sent = outbox.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "reply");
    }

    #[tokio::test]
    async fn test_wrong_group_is_silently_ignored() {
        let store = MemoryStore::default();
        let transport = ScriptedTransport::in_group("Some Other Group");
        let outbox = transport.outbox();
        let mut dispatcher = dispatcher(transport, &store);

        let disposition = dispatcher.handle(&event("120 dinner")).await.unwrap();
        assert_eq!(disposition, Disposition::Ignored);
        assert!(outbox.lock().unwrap().is_empty());
        assert!(store.rows(&month_label()).is_none());
    }

    #[tokio::test]
    async fn test_direct_chat_is_ignored() {
        let store = MemoryStore::default();
        let transport = ScriptedTransport {
            chat: Some(ChatInfo {
                is_group: false,
                name: GROUP.to_string(),
            }),
            ..Default::default()
        };
        let mut dispatcher = dispatcher(transport, &store);

        let mut direct = event("120 dinner");
        direct.chat_id = "972500000001@c.us".to_string();
        direct.is_group_hint = false;
        assert_eq!(
            dispatcher.handle(&direct).await.unwrap(),
            Disposition::Ignored
        );
    }

    #[tokio::test]
    async fn test_failed_lookup_with_group_suffix_discards_for_safety() {
        let store = MemoryStore::default();
        // No scripted chat: the lookup fails, the @g.us suffix says "group",
        // but the name stays unresolved, so nothing may be processed.
        let transport = ScriptedTransport::default();
        let outbox = transport.outbox();
        let mut dispatcher = dispatcher(transport, &store);

        let disposition = dispatcher.handle(&event("120 dinner")).await.unwrap();
        assert_eq!(disposition, Disposition::Ignored);
        assert!(outbox.lock().unwrap().is_empty());
        assert!(store.rows(&month_label()).is_none());
    }

    #[tokio::test]
    async fn test_own_acknowledgment_echo_is_ignored() {
        let store = MemoryStore::default();
        let transport = ScriptedTransport::in_group(GROUP);
        let mut dispatcher = dispatcher(transport, &store);

        for body in [
            "Registered: Dinner - $120 - Dining",
            "Invalid format: \"abc\"",
            "Failed to record: \"dinner 120\"",
        ] {
            assert_eq!(
                dispatcher.handle(&event(body)).await.unwrap(),
                Disposition::Ignored
            );
        }
        assert!(store.rows(&month_label()).is_none());
    }

    #[tokio::test]
    async fn test_event_without_sender_or_body_is_ignored() {
        let store = MemoryStore::default();
        let transport = ScriptedTransport::in_group(GROUP);
        let mut dispatcher = dispatcher(transport, &store);

        let mut no_sender = event("120 dinner");
        no_sender.sender_id = None;
        assert_eq!(
            dispatcher.handle(&no_sender).await.unwrap(),
            Disposition::Ignored
        );

        let mut no_body = event("");
        no_body.body = None;
        assert_eq!(
            dispatcher.handle(&no_body).await.unwrap(),
            Disposition::Ignored
        );
    }

    #[tokio::test]
    async fn test_blank_lines_are_dropped() {
        let store = MemoryStore::default();
        let transport = ScriptedTransport::in_group(GROUP);
        let outbox = transport.outbox();
        let mut dispatcher = dispatcher(transport, &store);

        let disposition = dispatcher
            .handle(&event("\n  120 dinner  \n\n  gym 45\n"))
            .await
            .unwrap();
        assert_eq!(disposition, Disposition::Reacted);
        assert_eq!(outbox.lock().unwrap().len(), 1);
        // Header plus two entries.
        assert_eq!(store.rows(&month_label()).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_whitespace_only_body_is_ignored() {
        let store = MemoryStore::default();
        let transport = ScriptedTransport::in_group(GROUP);
        let mut dispatcher = dispatcher(transport, &store);

        assert_eq!(
            dispatcher.handle(&event("\n \n")).await.unwrap(),
            Disposition::Ignored
        );
    }

    #[tokio::test]
    async fn test_running_sum_carries_across_messages() {
        let store = MemoryStore::default();
        let transport = ScriptedTransport::in_group(GROUP);
        let mut dispatcher = dispatcher(transport, &store);

        dispatcher.handle(&event("120 dinner")).await.unwrap();
        dispatcher.handle(&event("120 dinner")).await.unwrap();

        let rows = store.rows(&month_label()).unwrap();
        assert_eq!(rows[1][5], "120");
        assert_eq!(rows[2][5], "240");
    }

    #[tokio::test]
    async fn test_ledger_failure_line_reports_but_batch_continues() {
        let store = MemoryStore::default();
        let transport = ScriptedTransport::in_group(GROUP);
        let mut dispatcher = dispatcher(transport, &store);

        // First message creates the partition; then appends start failing.
        dispatcher.handle(&event("10 coffee")).await.unwrap();
        store.fail_appends();

        let disposition = dispatcher.handle(&event("120 dinner\ngym 45")).await.unwrap();
        let expected =
            "Failed to record: \"120 dinner\"\nFailed to record: \"gym 45\"".to_string();
        assert_eq!(disposition, Disposition::Replied(expected));
    }
}
