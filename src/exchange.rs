//! The exchange orchestrator.
//!
//! A [`Conversation`] owns the session, the in-flight guard and the two error
//! slots, and is the only writer of all of them. Every exchange follows the
//! same shape: claim, send, then on resumption either commit the reply or
//! attach a classified error. Transport failures never escape as `Err`; they
//! come back as [`Outcome::Failed`] with the error attached to the state.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::classify::{AttachedError, Exchange, FormField};
use crate::error::{Error, Result};
use crate::observability::{
    EXCHANGE_DURATION, EXCHANGE_VALIDATION_ERRORS, EXCHANGES_ABANDONED, EXCHANGES_BEGUN,
    EXCHANGES_COMMITTED, EXCHANGES_FAILED, EXCHANGES_IN_FLIGHT_REJECTED, SNAPSHOT_SAVE_ERRORS,
};
use crate::persist::SessionStore;
use crate::session::{ExchangeState, Session};
use crate::transport::Transport;
use crate::types::{AddChatMessageRequest, Delivery, Heartbeat, Message, StartChatRequest};
use crate::validate::{validate_message, validate_passphrase, validate_url};

////////////////////////////////////////////// Outcome /////////////////////////////////////////////

/// How an exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The reply was applied to the session.
    Committed,
    /// The exchange failed; the error is also attached to the conversation state.
    Failed(AttachedError),
    /// Another exchange was outstanding; nothing happened.
    AlreadyInFlight,
    /// The caller lost interest or the conversation was reset; the reply was discarded.
    Abandoned,
}

impl Outcome {
    /// Returns true if the exchange's reply was applied.
    pub fn is_committed(&self) -> bool {
        matches!(self, Outcome::Committed)
    }

    /// The attached error, if the exchange failed.
    pub fn error(&self) -> Option<&AttachedError> {
        match self {
            Outcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/////////////////////////////////////////// Conversation ///////////////////////////////////////////

#[derive(Debug, Default)]
struct State {
    session: Session,
    exchange: ExchangeState,
    // Bumped whenever the conversation an exchange was started against goes away.
    epoch: u64,
    form_error: Option<AttachedError>,
    conversation_error: Option<AttachedError>,
}

/// The single writer of a session.
pub struct Conversation<T: Transport> {
    transport: T,
    store: SessionStore,
    state: Mutex<State>,
}

impl<T: Transport> Conversation<T> {
    /// Creates a conversation, restoring whatever session `store` holds.
    pub fn new(transport: T, store: SessionStore) -> Self {
        let session = store.load();
        Self {
            transport,
            store,
            state: Mutex::new(State {
                session,
                ..State::default()
            }),
        }
    }

    /// The transport this conversation talks through.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// A copy of the current session.
    pub fn session(&self) -> Session {
        self.lock().session.clone()
    }

    /// The error attached to the begin-session form, if any.
    pub fn form_error(&self) -> Option<AttachedError> {
        self.lock().form_error.clone()
    }

    /// The error attached to the active conversation, if any.
    pub fn conversation_error(&self) -> Option<AttachedError> {
        self.lock().conversation_error.clone()
    }

    /// Returns true while a send-message exchange is outstanding.
    pub fn is_awaiting_reply(&self) -> bool {
        self.lock().exchange.is_awaiting_reply()
    }

    /// Returns true if the options of the message at `message_index` can be picked now.
    pub fn can_select(&self, message_index: usize) -> bool {
        let state = self.lock();
        !state.exchange.is_awaiting_reply()
            && state
                .session
                .open_choice()
                .is_some_and(|(index, _)| index == message_index)
    }

    /// Starts a conversation about the site at `url`.
    ///
    /// Input is validated locally first; a rejected input attaches to its
    /// field and never reaches the transport. Calling this while a session
    /// is active is a caller error.
    pub async fn begin_session(
        &self,
        url: &str,
        passphrase: &str,
        cancel: &CancellationToken,
    ) -> Result<Outcome> {
        if cancel.is_cancelled() {
            EXCHANGES_ABANDONED.click();
            return Ok(Outcome::Abandoned);
        }
        let (request, host, epoch) = {
            let mut state = self.lock();
            if state.session.is_active() {
                return Err(Error::invalid_transition(
                    "a session is already active; reset it first",
                ));
            }
            state.form_error = None;
            let site = match validate_passphrase(passphrase).and_then(|()| validate_url(url)) {
                Ok(site) => site,
                Err(err) => {
                    let attached = field_error(err)?;
                    EXCHANGE_VALIDATION_ERRORS.click();
                    state.form_error = Some(attached.clone());
                    return Ok(Outcome::Failed(attached));
                }
            };
            (
                StartChatRequest::new(site.url, passphrase),
                site.host,
                state.epoch,
            )
        };

        EXCHANGES_BEGUN.click();
        let start = Instant::now();
        let result = self.transport.begin_session(&request).await;
        EXCHANGE_DURATION.add(start.elapsed().as_secs_f64());

        let mut state = self.lock();
        if cancel.is_cancelled() || state.epoch != epoch || state.session.is_active() {
            EXCHANGES_ABANDONED.click();
            tracing::debug!(host = %host, "discarding begin-session reply");
            return Ok(Outcome::Abandoned);
        }
        match result {
            Ok(response) => {
                state.session.begin(
                    passphrase,
                    host.as_str(),
                    response.thread_id,
                    Message::from(response.message),
                )?;
                state.epoch += 1;
                state.form_error = None;
                state.conversation_error = None;
                self.save(&state.session);
                EXCHANGES_COMMITTED.click();
                tracing::info!(host = %host, "session begun");
                Ok(Outcome::Committed)
            }
            Err(err) => {
                let attached = AttachedError::classified(Exchange::BeginSession, &err);
                EXCHANGES_FAILED.click();
                tracing::warn!(host = %host, error = %err, kind = ?attached.kind(), "begin-session failed");
                state.form_error = Some(attached.clone());
                Ok(Outcome::Failed(attached))
            }
        }
    }

    /// Sends a free-text human turn.
    pub async fn send_message(&self, content: &str, cancel: &CancellationToken) -> Result<Outcome> {
        if cancel.is_cancelled() {
            EXCHANGES_ABANDONED.click();
            return Ok(Outcome::Abandoned);
        }
        let claimed = {
            let mut state = self.lock();
            require_active(&state)?;
            if state.exchange.is_awaiting_reply() {
                EXCHANGES_IN_FLIGHT_REJECTED.click();
                return Ok(Outcome::AlreadyInFlight);
            }
            let content = match validate_message(content) {
                Ok(content) => content,
                Err(err) => {
                    let attached = field_error(err)?;
                    EXCHANGE_VALIDATION_ERRORS.click();
                    state.conversation_error = Some(attached.clone());
                    return Ok(Outcome::Failed(attached));
                }
            };
            self.claim(&mut state, content)?
        };
        self.complete(claimed, cancel).await
    }

    /// Answers the open option set of the message at `message_index`.
    ///
    /// `option_index` is zero-based. The option's text is sent exactly as a
    /// free-text turn would be, and the option set is closed for good.
    pub async fn select_option(
        &self,
        message_index: usize,
        option_index: usize,
        cancel: &CancellationToken,
    ) -> Result<Outcome> {
        if cancel.is_cancelled() {
            EXCHANGES_ABANDONED.click();
            return Ok(Outcome::Abandoned);
        }
        let claimed = {
            let mut state = self.lock();
            require_active(&state)?;
            if state.exchange.is_awaiting_reply() {
                EXCHANGES_IN_FLIGHT_REJECTED.click();
                return Ok(Outcome::AlreadyInFlight);
            }
            let content = state.session.select_option(message_index, option_index)?;
            self.claim(&mut state, content)?
        };
        self.complete(claimed, cancel).await
    }

    /// Discards the conversation, keeping the passphrase.
    ///
    /// The snapshot is purged before anything else; if that fails nothing
    /// changes and the error is returned. An outstanding exchange is
    /// abandoned when it resumes.
    pub fn reset(&self) -> Result<()> {
        let mut state = self.lock();
        self.store.purge()?;
        state.session.reset();
        state.exchange.finish();
        state.epoch += 1;
        state.form_error = None;
        state.conversation_error = None;
        self.save(&state.session);
        tracing::info!("session reset");
        Ok(())
    }

    /// Asks the backend for its clock; touches no conversation state.
    pub async fn heartbeat(&self) -> Result<Heartbeat> {
        self.transport.heartbeat().await
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn save(&self, session: &Session) {
        if let Err(err) = self.store.save(session) {
            SNAPSHOT_SAVE_ERRORS.click();
            tracing::error!(error = %err, "could not persist session snapshot");
        }
    }

    fn claim(&self, state: &mut State, content: String) -> Result<Claimed> {
        let (passphrase, hostname, thread_id) = match (
            state.session.passphrase(),
            state.session.identity(),
        ) {
            (Some(passphrase), Some(identity)) => (
                passphrase.to_string(),
                identity.host.clone(),
                identity.session_id.clone(),
            ),
            _ => return Err(Error::invalid_transition("no active session")),
        };
        state.exchange.start()?;
        state.conversation_error = None;
        let index = match state.session.append(Message::pending(content.as_str())) {
            Ok(index) => index,
            Err(err) => {
                state.exchange.finish();
                return Err(err);
            }
        };
        self.save(&state.session);
        EXCHANGES_BEGUN.click();
        Ok(Claimed {
            request: AddChatMessageRequest {
                passphrase,
                hostname,
                thread_id,
                message: content,
            },
            index,
            epoch: state.epoch,
        })
    }

    async fn complete(&self, claimed: Claimed, cancel: &CancellationToken) -> Result<Outcome> {
        let start = Instant::now();
        let result = self.transport.send_message(&claimed.request).await;
        EXCHANGE_DURATION.add(start.elapsed().as_secs_f64());

        let mut state = self.lock();
        if state.epoch != claimed.epoch {
            EXCHANGES_ABANDONED.click();
            tracing::debug!("conversation reset while exchange was outstanding");
            return Ok(Outcome::Abandoned);
        }
        state.exchange.finish();
        if cancel.is_cancelled() {
            EXCHANGES_ABANDONED.click();
            tracing::debug!("exchange cancelled; discarding reply");
            return Ok(Outcome::Abandoned);
        }
        match result {
            Ok(response) => {
                state.session.settle(claimed.index, Delivery::Delivered)?;
                state.session.append(Message::from(response.message))?;
                self.save(&state.session);
                EXCHANGES_COMMITTED.click();
                Ok(Outcome::Committed)
            }
            Err(err) => {
                state.session.settle(claimed.index, Delivery::Failed)?;
                let attached = AttachedError::classified(Exchange::SendMessage, &err);
                state.conversation_error = Some(attached.clone());
                self.save(&state.session);
                EXCHANGES_FAILED.click();
                tracing::warn!(error = %err, kind = ?attached.kind(), "send-message failed");
                Ok(Outcome::Failed(attached))
            }
        }
    }
}

impl<T: Transport> std::fmt::Debug for Conversation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Conversation")
            .field("state", &state.session.state())
            .field("messages", &state.session.messages().len())
            .field("exchange", &state.exchange)
            .finish()
    }
}

struct Claimed {
    request: AddChatMessageRequest,
    index: usize,
    epoch: u64,
}

fn require_active(state: &State) -> Result<()> {
    if state.session.is_active() {
        Ok(())
    } else {
        Err(Error::invalid_transition("no active session"))
    }
}

fn field_error(err: Error) -> Result<AttachedError> {
    match err {
        Error::Validation {
            message,
            field: Some(field),
        } => Ok(AttachedError::validation(field, message)),
        Error::Validation {
            message,
            field: None,
        } => Ok(AttachedError::validation(FormField::Message, message)),
        err => Err(err),
    }
}
