//! A scripted [`Transport`] for exercising the orchestrator without a backend.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::error::{Error, Result};
use crate::transport::Transport;
use crate::types::{
    AddChatMessageRequest, AddChatMessageResponse, AgentReply, Heartbeat, StartChatRequest,
    StartChatResponse,
};

/// A transport that answers from queues and records what it was sent.
///
/// An empty queue answers with a connection error. When held, every
/// `send_message` call signals [`ScriptedTransport::started`] and then waits
/// for [`ScriptedTransport::release`] before answering.
#[derive(Default)]
pub struct ScriptedTransport {
    begins: Mutex<VecDeque<Result<StartChatResponse>>>,
    sends: Mutex<VecDeque<Result<AddChatMessageResponse>>>,
    begin_requests: Mutex<Vec<StartChatRequest>>,
    send_requests: Mutex<Vec<AddChatMessageRequest>>,
    held: bool,
    started: Arc<Notify>,
    release: Arc<Notify>,
}

impl ScriptedTransport {
    /// Creates a transport with empty queues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport whose `send_message` calls wait for a release.
    pub fn held() -> Self {
        Self {
            held: true,
            ..Self::default()
        }
    }

    /// Queues a successful begin-session reply.
    pub fn queue_begin(&self, thread_id: &str, greeting: AgentReply) {
        lock(&self.begins).push_back(Ok(StartChatResponse {
            thread_id: thread_id.to_string(),
            message: greeting,
        }));
    }

    /// Queues a successful send-message reply.
    pub fn queue_reply(&self, reply: AgentReply) {
        lock(&self.sends).push_back(Ok(AddChatMessageResponse { message: reply }));
    }

    /// Queues a begin-session failure.
    pub fn queue_begin_error(&self, error: Error) {
        lock(&self.begins).push_back(Err(error));
    }

    /// Queues a send-message failure.
    pub fn queue_send_error(&self, error: Error) {
        lock(&self.sends).push_back(Err(error));
    }

    /// Every begin-session request received so far.
    pub fn begin_requests(&self) -> Vec<StartChatRequest> {
        lock(&self.begin_requests).clone()
    }

    /// Every send-message request received so far.
    pub fn send_requests(&self) -> Vec<AddChatMessageRequest> {
        lock(&self.send_requests).clone()
    }

    /// Resolves once a held `send_message` call has been received.
    pub async fn started(&self) {
        self.started.notified().await;
    }

    /// Lets one held `send_message` call answer.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn unscripted(call: &str) -> Error {
    Error::connection(format!("no scripted response for {call}"), None)
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn begin_session(&self, request: &StartChatRequest) -> Result<StartChatResponse> {
        lock(&self.begin_requests).push(request.clone());
        lock(&self.begins)
            .pop_front()
            .unwrap_or_else(|| Err(unscripted("start_chat")))
    }

    async fn send_message(
        &self,
        request: &AddChatMessageRequest,
    ) -> Result<AddChatMessageResponse> {
        lock(&self.send_requests).push(request.clone());
        if self.held {
            self.started.notify_one();
            self.release.notified().await;
        }
        lock(&self.sends)
            .pop_front()
            .unwrap_or_else(|| Err(unscripted("add_chat_message")))
    }

    async fn heartbeat(&self) -> Result<Heartbeat> {
        Ok(Heartbeat {
            server_time: "scripted".to_string(),
        })
    }
}
