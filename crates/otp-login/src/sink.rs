use std::sync::Mutex;

use crate::session::AuthenticatedSession;

/// Receives the authenticated session once verification succeeds. How it is persisted (cookie,
/// storage, application context) is up to the implementation.
pub trait SessionSink: Send + Sync {
    /// Called exactly once per flow, after the controller has reached `Verified`.
    fn accept(&self, session: AuthenticatedSession);
}

/// Keeps every accepted session in memory, in the order they were handed over.
#[derive(Debug, Default)]
pub struct MemorySessionSink {
    sessions: Mutex<Vec<AuthenticatedSession>>,
}

impl MemorySessionSink {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    /// The last session handed over, if any.
    pub fn latest(&self) -> Option<AuthenticatedSession> {
        self.sessions
            .lock()
            .expect("Mutex is not poisoned")
            .last()
            .cloned()
    }

    /// Number of sessions handed over so far.
    pub fn count(&self) -> usize {
        self.sessions
            .lock()
            .expect("Mutex is not poisoned")
            .len()
    }
}

impl SessionSink for MemorySessionSink {
    fn accept(&self, session: AuthenticatedSession) {
        self.sessions
            .lock()
            .expect("Mutex is not poisoned")
            .push(session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::LoginIdentifier;

    fn session(token: &str) -> AuthenticatedSession {
        AuthenticatedSession {
            identifier: LoginIdentifier::Email("user@example.com".into()),
            token: token.into(),
            user: serde_json::Value::Null,
        }
    }

    #[test]
    fn keeps_every_session_in_order() {
        let sink = MemorySessionSink::new();
        assert_eq!(sink.latest(), None);

        sink.accept(session("t1"));
        sink.accept(session("t2"));

        assert_eq!(sink.count(), 2);
        assert_eq!(sink.latest().map(|s| s.token), Some("t2".to_owned()));
    }
}
