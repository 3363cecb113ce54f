//! The session state machine.
//!
//! A [`Session`] is the single conversation context the client holds. It is
//! created empty, becomes active exactly once through [`Session::begin`],
//! grows through [`Session::append`], and returns to a keyed-but-empty state
//! through [`Session::reset`]. Messages are never removed or reordered.
//!
//! [`ExchangeState`] is the companion guard that keeps at most one exchange
//! outstanding per conversation. It lives next to the session rather than in
//! it because it is never persisted.

use crate::classify::FormField;
use crate::error::{Error, Result};
use crate::types::{Delivery, Message, Origin};

/////////////////////////////////////////// SessionState ///////////////////////////////////////////

/// The coarse state of a session.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No passphrase, no conversation.
    Empty,
    /// A passphrase is known but no conversation is active.
    Keyed,
    /// A conversation is active.
    Active,
}

///////////////////////////////////////////// Identity /////////////////////////////////////////////

/// Host and server token of an active conversation.
///
/// Holding both in one value makes a half-active session unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// The site the conversation is about.
    pub host: String,
    /// Opaque token issued by the agent backend.
    pub session_id: String,
}

///////////////////////////////////////////// Session //////////////////////////////////////////////

/// The canonical session record and its message history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    passphrase: Option<String>,
    identity: Option<Identity>,
    messages: Vec<Message>,
}

impl Session {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a session from persisted parts, checking its invariants.
    ///
    /// An active conversation needs a passphrase, and only human turns carry
    /// a delivery status. Any message still marked pending is marked failed, since no exchange
    /// survives a restart, and option sets with a later human turn are
    /// marked answered.
    pub(crate) fn restore(
        passphrase: Option<String>,
        identity: Option<Identity>,
        mut messages: Vec<Message>,
    ) -> Result<Self> {
        match (&identity, messages.first()) {
            (None, None) => {}
            (Some(_), Some(first)) if first.origin.is_agent() => {}
            (Some(_), Some(_)) => {
                return Err(Error::invalid_transition(
                    "persisted conversation does not open with an agent message",
                ));
            }
            (Some(_), None) => {
                return Err(Error::invalid_transition(
                    "persisted conversation has no messages",
                ));
            }
            (None, Some(_)) => {
                return Err(Error::invalid_transition(
                    "persisted messages belong to no conversation",
                ));
            }
        }
        if identity.is_some() && passphrase.is_none() {
            return Err(Error::invalid_transition(
                "persisted conversation has no passphrase",
            ));
        }
        if messages
            .iter()
            .any(|m| m.origin.is_agent() && !m.status.is_delivered())
        {
            return Err(Error::invalid_transition(
                "persisted agent message carries a delivery status",
            ));
        }
        let mut human_after = false;
        for message in messages.iter_mut().rev() {
            if message.status.is_pending() {
                message.status = Delivery::Failed;
            }
            message.answered =
                message.origin.is_agent() && message.choices().is_some() && human_after;
            human_after |= message.origin.is_human();
        }
        Ok(Self {
            passphrase,
            identity,
            messages,
        })
    }

    /// Returns the coarse state of this session.
    pub fn state(&self) -> SessionState {
        match (&self.identity, &self.passphrase) {
            (Some(_), _) => SessionState::Active,
            (None, Some(_)) => SessionState::Keyed,
            (None, None) => SessionState::Empty,
        }
    }

    /// Returns true while a conversation is active.
    pub fn is_active(&self) -> bool {
        self.identity.is_some()
    }

    /// The passphrase the session was started with; survives a reset.
    pub fn passphrase(&self) -> Option<&str> {
        self.passphrase.as_deref()
    }

    /// The host and server token, present iff the session is active.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// The host of the active conversation.
    pub fn host(&self) -> Option<&str> {
        self.identity.as_ref().map(|id| id.host.as_str())
    }

    /// The server token of the active conversation.
    pub fn session_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|id| id.session_id.as_str())
    }

    /// The conversation so far, in order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Starts a conversation.
    ///
    /// Legal only while no conversation is active; the caller must reset
    /// first. `first` must be the agent's greeting and becomes the only
    /// message.
    pub fn begin(
        &mut self,
        passphrase: impl Into<String>,
        host: impl Into<String>,
        session_id: impl Into<String>,
        first: Message,
    ) -> Result<()> {
        if self.is_active() {
            return Err(Error::invalid_transition(
                "a session is already active; reset it first",
            ));
        }
        if !first.origin.is_agent() {
            return Err(Error::invalid_transition(
                "a session must open with an agent message",
            ));
        }
        self.passphrase = Some(passphrase.into());
        self.identity = Some(Identity {
            host: host.into(),
            session_id: session_id.into(),
        });
        self.messages = vec![first];
        Ok(())
    }

    /// Appends a message, returning its index.
    ///
    /// A human message closes every option set before it.
    pub fn append(&mut self, message: Message) -> Result<usize> {
        if !self.is_active() {
            return Err(Error::invalid_transition("no active session to append to"));
        }
        if message.origin == Origin::Human {
            for earlier in self.messages.iter_mut() {
                if earlier.has_open_choice() {
                    earlier.answered = true;
                }
            }
        }
        self.messages.push(message);
        Ok(self.messages.len() - 1)
    }

    /// Clears the conversation but keeps the passphrase.
    pub fn reset(&mut self) {
        self.identity = None;
        self.messages.clear();
    }

    /// The latest message's option set, if it is still open.
    pub fn open_choice(&self) -> Option<(usize, &[String])> {
        let index = self.messages.len().checked_sub(1)?;
        let message = &self.messages[index];
        if message.has_open_choice() {
            message.choices().map(|choices| (index, choices))
        } else {
            None
        }
    }

    /// Picks an option from the message at `message_index`.
    ///
    /// The option set is latched closed and the chosen text returned. Only
    /// the open option set of the latest message can be answered.
    pub(crate) fn select_option(
        &mut self,
        message_index: usize,
        option_index: usize,
    ) -> Result<String> {
        if !self.is_active() {
            return Err(Error::invalid_transition("no active session"));
        }
        let latest = self.messages.len().saturating_sub(1);
        let Some(message) = self.messages.get_mut(message_index) else {
            return Err(Error::validation(
                format!("there is no message {message_index}"),
                None,
            ));
        };
        let Some(choices) = message.choices() else {
            return Err(Error::validation(
                format!("message {message_index} offers no options"),
                None,
            ));
        };
        if message.answered {
            return Err(Error::invalid_transition(
                "that option set has already been answered",
            ));
        }
        if message_index != latest {
            return Err(Error::invalid_transition(
                "only the latest message's options can be answered",
            ));
        }
        let Some(content) = choices.get(option_index).cloned() else {
            return Err(Error::validation(
                format!(
                    "option {} is out of range (1-{})",
                    option_index + 1,
                    choices.len()
                ),
                Some(FormField::Message),
            ));
        };
        message.answered = true;
        Ok(content)
    }

    /// Records how the exchange carrying the human message at `index` ended.
    pub(crate) fn settle(&mut self, index: usize, delivery: Delivery) -> Result<()> {
        match self.messages.get_mut(index) {
            Some(message) if message.origin.is_human() => {
                message.status = delivery;
                Ok(())
            }
            _ => Err(Error::invalid_transition(format!(
                "message {index} is not a human turn"
            ))),
        }
    }
}

////////////////////////////////////////// ExchangeState ///////////////////////////////////////////

/// Whether an exchange is outstanding on a conversation.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum ExchangeState {
    /// Nothing is in flight.
    #[default]
    Idle,
    /// A human turn has been sent and its reply has not been applied.
    AwaitingReply,
}

impl ExchangeState {
    /// Claims the conversation for one exchange.
    pub fn start(&mut self) -> Result<()> {
        match self {
            ExchangeState::Idle => {
                *self = ExchangeState::AwaitingReply;
                Ok(())
            }
            ExchangeState::AwaitingReply => Err(Error::already_in_flight()),
        }
    }

    /// Releases the conversation.
    pub fn finish(&mut self) {
        *self = ExchangeState::Idle;
    }

    /// Returns true while an exchange is outstanding.
    pub fn is_awaiting_reply(&self) -> bool {
        matches!(self, ExchangeState::AwaitingReply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn greeting() -> Message {
        Message::agent("Hi, how can I help?", None)
    }

    fn sizes() -> Message {
        Message::agent(
            "Size?",
            Some(vec!["8".to_string(), "9".to_string(), "10".to_string()]),
        )
    }

    fn active() -> Session {
        let mut session = Session::new();
        session.begin("secret1", "a.example", "t1", greeting()).unwrap();
        session
    }

    #[test]
    fn new_session_is_empty() {
        let session = Session::new();
        assert_eq!(session.state(), SessionState::Empty);
        assert!(session.messages().is_empty());
        assert!(session.host().is_none());
    }

    #[test]
    fn begin_activates() {
        let session = active();
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.passphrase(), Some("secret1"));
        assert_eq!(session.host(), Some("a.example"));
        assert_eq!(session.session_id(), Some("t1"));
        assert_eq!(session.messages(), &[greeting()]);
    }

    #[test]
    fn begin_twice_fails_and_changes_nothing() {
        let mut session = active();
        let before = session.clone();
        let err = session
            .begin("other", "b.example", "t2", greeting())
            .unwrap_err();
        assert!(err.is_invalid_transition());
        assert_eq!(session, before);
    }

    #[test]
    fn begin_requires_agent_greeting() {
        let mut session = Session::new();
        let err = session
            .begin("secret1", "a.example", "t1", Message::human("hello"))
            .unwrap_err();
        assert!(err.is_invalid_transition());
        assert_eq!(session.state(), SessionState::Empty);
    }

    #[test]
    fn append_requires_active_session() {
        let mut session = Session::new();
        assert!(session.append(Message::human("hi")).unwrap_err().is_invalid_transition());
    }

    #[test]
    fn reset_keeps_passphrase() {
        let mut session = active();
        session.append(Message::human("I want shoes")).unwrap();
        session.reset();
        assert_eq!(session.state(), SessionState::Keyed);
        assert_eq!(session.passphrase(), Some("secret1"));
        assert!(session.identity().is_none());
        assert!(session.messages().is_empty());

        session.reset();
        assert_eq!(session.state(), SessionState::Keyed);

        session.begin("secret1", "b.example", "t2", greeting()).unwrap();
        assert_eq!(session.host(), Some("b.example"));
    }

    #[test]
    fn reset_on_empty_is_a_no_op() {
        let mut session = Session::new();
        session.reset();
        assert_eq!(session, Session::new());
    }

    #[test]
    fn select_option_latches() {
        let mut session = active();
        session.append(Message::human("I want shoes")).unwrap();
        let index = session.append(sizes()).unwrap();
        assert_eq!(session.open_choice().unwrap().0, index);

        assert_eq!(session.select_option(index, 1).unwrap(), "9");
        assert!(session.messages()[index].answered);
        assert!(session.open_choice().is_none());
        assert!(session.select_option(index, 0).unwrap_err().is_invalid_transition());
    }

    #[test]
    fn select_option_bounds() {
        let mut session = active();
        let index = session.append(sizes()).unwrap();
        assert!(session.select_option(index, 3).unwrap_err().is_validation());
        assert!(session.select_option(0, 0).unwrap_err().is_validation());
        assert!(session.select_option(9, 0).unwrap_err().is_validation());
        assert!(!session.messages()[index].answered);
    }

    #[test]
    fn free_text_closes_open_choice() {
        let mut session = active();
        let index = session.append(sizes()).unwrap();
        session.append(Message::human("size 9 please")).unwrap();
        assert!(session.messages()[index].answered);
        assert!(session.select_option(index, 1).is_err());
    }

    #[test]
    fn settle_marks_human_turns_only() {
        let mut session = active();
        let index = session.append(Message::pending("I want shoes")).unwrap();
        session.settle(index, Delivery::Failed).unwrap();
        assert_eq!(session.messages()[index].status, Delivery::Failed);
        assert!(session.settle(0, Delivery::Failed).is_err());
    }

    #[test]
    fn restore_checks_invariants() {
        let identity = Identity {
            host: "a.example".to_string(),
            session_id: "t1".to_string(),
        };
        assert!(Session::restore(None, Some(identity.clone()), Vec::new()).is_err());
        assert!(Session::restore(None, None, vec![greeting()]).is_err());
        assert!(Session::restore(None, Some(identity.clone()), vec![Message::human("x")]).is_err());

        let session = Session::restore(
            Some("secret1".to_string()),
            Some(identity),
            vec![greeting(), Message::pending("hi")],
        )
        .unwrap();
        assert_eq!(session.messages()[1].status, Delivery::Failed);
    }

    #[test]
    fn restore_requires_passphrase_when_active() {
        let identity = Identity {
            host: "a.example".to_string(),
            session_id: "t1".to_string(),
        };
        let err = Session::restore(None, Some(identity), vec![greeting()]).unwrap_err();
        assert!(err.is_invalid_transition());
    }

    #[test]
    fn restore_rejects_agent_delivery_status() {
        let identity = Identity {
            host: "a.example".to_string(),
            session_id: "t1".to_string(),
        };
        for status in [Delivery::Pending, Delivery::Failed] {
            let mut reply = Message::agent("Size?", None);
            reply.status = status;
            let restored = Session::restore(
                Some("secret1".to_string()),
                Some(identity.clone()),
                vec![greeting(), Message::human("shoes"), reply],
            );
            assert!(restored.is_err(), "status: {status:?}");
        }
    }

    #[test]
    fn exchange_state_guards() {
        let mut state = ExchangeState::default();
        state.start().unwrap();
        assert!(state.is_awaiting_reply());
        assert!(state.start().unwrap_err().is_already_in_flight());
        state.finish();
        state.start().unwrap();
    }

    fn arb_message() -> impl Strategy<Value = Message> {
        prop_oneof![
            "[a-z ]{1,12}".prop_map(Message::human),
            ("[a-z ]{1,12}", proptest::option::of(proptest::collection::vec("[0-9]{1,2}", 0..4)))
                .prop_map(|(content, options)| Message::agent(content, options)),
        ]
    }

    proptest! {
        #[test]
        fn append_preserves_order(messages in proptest::collection::vec(arb_message(), 0..32)) {
            let mut session = active();
            for (offset, message) in messages.iter().enumerate() {
                prop_assert_eq!(session.append(message.clone()).unwrap(), offset + 1);
            }
            let contents: Vec<&str> = session.messages()[1..]
                .iter()
                .map(|m| m.content.as_str())
                .collect();
            let expected: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
            prop_assert_eq!(contents, expected);
        }

        #[test]
        fn reset_always_keeps_passphrase(
            begin in any::<bool>(),
            messages in proptest::collection::vec(arb_message(), 0..8),
        ) {
            let mut session = Session::new();
            if begin {
                session.begin("secret1", "a.example", "t1", greeting()).unwrap();
                for message in messages {
                    session.append(message).unwrap();
                }
            }
            let passphrase = session.passphrase().map(String::from);
            session.reset();
            prop_assert_eq!(session.passphrase().map(String::from), passphrase);
            prop_assert!(session.identity().is_none());
            prop_assert!(session.messages().is_empty());
        }
    }
}
