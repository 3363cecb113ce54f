//! Integration tests for the clerk library.
//! The scripted tests run offline; the live test needs CLERK_BACKEND_URL.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use clerk::testing::ScriptedTransport;
    use clerk::{
        AgentClient, AgentReply, Conversation, Delivery, Error, ErrorKind, ErrorTarget, FileStore,
        Origin, Outcome, SessionState, SessionStore, Transport,
    };
    use tokio_util::sync::CancellationToken;
    use utf8path::Path;

    fn state_dir(dir: &tempfile::TempDir) -> Path<'static> {
        Path::try_from(dir.path().to_path_buf())
            .expect("temp dir should be UTF-8")
            .into_owned()
    }

    fn open(dir: &tempfile::TempDir, transport: ScriptedTransport) -> Conversation<ScriptedTransport> {
        let store = FileStore::open(state_dir(dir)).expect("state dir should open");
        Conversation::new(transport, SessionStore::new(store))
    }

    #[tokio::test]
    async fn test_shoe_shopping_conversation() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new();
        transport.queue_begin("t1", AgentReply::new("Hi, how can I help?"));
        transport.queue_reply(AgentReply::with_options("Size?", ["8", "9", "10"]));
        transport.queue_send_error(Error::api(
            429,
            Some("insufficient_quota".to_string()),
            "You exceeded your current quota",
        ));
        let chat = open(&dir, transport);
        let cancel = CancellationToken::new();

        let outcome = chat
            .begin_session("https://a.example/shop", "secret1", &cancel)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Committed);
        let session = chat.session();
        assert_eq!(session.passphrase(), Some("secret1"));
        assert_eq!(session.host(), Some("a.example"));
        assert_eq!(session.session_id(), Some("t1"));

        let outcome = chat.send_message("I want shoes", &cancel).await.unwrap();
        assert_eq!(outcome, Outcome::Committed);

        let outcome = chat.select_option(2, 1, &cancel).await.unwrap();
        let err = outcome.error().expect("selection should fail");
        assert_eq!(err.kind(), Some(ErrorKind::QuotaExceeded));
        assert_eq!(err.target, ErrorTarget::Conversation);

        let session = chat.session();
        let turns: Vec<(Origin, &str)> = session
            .messages()
            .iter()
            .map(|m| (m.origin, m.content.as_str()))
            .collect();
        assert_eq!(
            turns,
            vec![
                (Origin::Agent, "Hi, how can I help?"),
                (Origin::Human, "I want shoes"),
                (Origin::Agent, "Size?"),
                (Origin::Human, "9"),
            ]
        );
        assert_eq!(session.messages()[3].status, Delivery::Failed);

        let requests = chat.transport().send_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].message, "9");
        assert_eq!(requests[1].hostname, "a.example");
        assert_eq!(requests[1].thread_id, "t1");
    }

    #[tokio::test]
    async fn test_conversation_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new();
        transport.queue_begin("t1", AgentReply::new("Hi, how can I help?"));
        transport.queue_reply(AgentReply::with_options("Size?", ["8", "9", "10"]));
        let chat = open(&dir, transport);
        let cancel = CancellationToken::new();
        chat.begin_session("https://a.example/shop", "secret1", &cancel)
            .await
            .unwrap();
        chat.send_message("I want shoes", &cancel).await.unwrap();
        let before = chat.session();
        drop(chat);

        let transport = ScriptedTransport::new();
        transport.queue_reply(AgentReply::new("Size 9 it is."));
        let chat = open(&dir, transport);
        assert_eq!(chat.session(), before);
        assert!(chat.can_select(2));

        let outcome = chat.select_option(2, 1, &cancel).await.unwrap();
        assert_eq!(outcome, Outcome::Committed);
        assert_eq!(chat.session().messages().len(), 5);
    }

    #[tokio::test]
    async fn test_new_conversation_keeps_passphrase_only() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new();
        transport.queue_begin("t1", AgentReply::new("Hi"));
        transport.queue_begin("t2", AgentReply::new("Hello again"));
        let chat = open(&dir, transport);
        let cancel = CancellationToken::new();
        chat.begin_session("https://a.example", "secret1", &cancel)
            .await
            .unwrap();

        chat.reset().unwrap();
        assert_eq!(chat.session().state(), SessionState::Keyed);
        drop(chat);

        let chat = open(&dir, ScriptedTransport::new());
        let session = chat.session();
        assert_eq!(session.state(), SessionState::Keyed);
        assert_eq!(session.passphrase(), Some("secret1"));
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_state_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("persist_root.json"), "{\"threadId\": 7").unwrap();
        let chat = open(&dir, ScriptedTransport::new());
        assert_eq!(chat.session().state(), SessionState::Empty);
    }

    #[tokio::test]
    async fn test_overlapping_sends_append_one_turn() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(ScriptedTransport::held());
        transport.queue_begin("t1", AgentReply::new("Hi"));
        transport.queue_reply(AgentReply::new("Noted"));
        let store = FileStore::open(state_dir(&dir)).unwrap();
        let chat = Arc::new(Conversation::new(transport.clone(), SessionStore::new(store)));
        let cancel = CancellationToken::new();
        chat.begin_session("https://a.example", "secret1", &cancel)
            .await
            .unwrap();

        let first = {
            let chat = chat.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { chat.send_message("hello", &cancel).await })
        };
        transport.started().await;
        let second = chat.send_message("hello", &cancel).await.unwrap();
        assert_eq!(second, Outcome::AlreadyInFlight);
        transport.release();
        assert_eq!(first.await.unwrap().unwrap(), Outcome::Committed);

        let humans = chat
            .session()
            .messages()
            .iter()
            .filter(|m| m.origin.is_human())
            .count();
        assert_eq!(humans, 1);
    }

    #[tokio::test]
    #[ignore] // Requires a running agent backend in CLERK_BACKEND_URL
    async fn test_live_backend_heartbeat() {
        let Ok(base_url) = std::env::var("CLERK_BACKEND_URL") else {
            eprintln!("Skipping test: CLERK_BACKEND_URL not set");
            return;
        };
        let client = AgentClient::new(Some(base_url)).expect("Failed to create client");
        let heartbeat = client.heartbeat().await;
        assert!(heartbeat.is_ok(), "Heartbeat should succeed: {heartbeat:?}");
    }
}
