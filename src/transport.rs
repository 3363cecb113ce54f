//! The contract the orchestrator needs from the agent backend.
//!
//! [`crate::AgentClient`] implements it over HTTP; [`crate::testing`] has a
//! scripted implementation for tests.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    AddChatMessageRequest, AddChatMessageResponse, Heartbeat, StartChatRequest,
    StartChatResponse,
};

/// Request/response access to the agent backend.
///
/// A failed call returns the error unclassified; HTTP failures must surface
/// as [`crate::Error::Api`] so that the status and body type reach the
/// classifier.
#[async_trait]
pub trait Transport: Send + Sync {
    /// `POST /api/start_chat`
    async fn begin_session(&self, request: &StartChatRequest) -> Result<StartChatResponse>;

    /// `POST /api/add_chat_message`
    async fn send_message(&self, request: &AddChatMessageRequest)
    -> Result<AddChatMessageResponse>;

    /// `GET /api/heartbeat`
    async fn heartbeat(&self) -> Result<Heartbeat>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn begin_session(&self, request: &StartChatRequest) -> Result<StartChatResponse> {
        (**self).begin_session(request).await
    }

    async fn send_message(
        &self,
        request: &AddChatMessageRequest,
    ) -> Result<AddChatMessageResponse> {
        (**self).send_message(request).await
    }

    async fn heartbeat(&self) -> Result<Heartbeat> {
        (**self).heartbeat().await
    }
}
