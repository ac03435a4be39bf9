//! Session state
//!
//! Owned by the runner task alone. Survives transport reconnects so the next
//! handshake can resume.

use crate::protocol::ResumePayload;

/// Resumable session context
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    session_id: Option<String>,
    sequence: Option<u64>,
    resume_url: Option<String>,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Last sequence seen
    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    /// Where a resume should connect, if the server told us
    pub fn resume_url(&self) -> Option<&str> {
        self.resume_url.as_deref()
    }

    /// Record a dispatch sequence. Older values are ignored.
    pub fn observe(&mut self, sequence: u64) -> bool {
        match self.sequence {
            Some(current) if sequence < current => false,
            _ => {
                self.sequence = Some(sequence);
                true
            }
        }
    }

    /// Start a session from Ready
    pub fn establish(&mut self, session_id: impl Into<String>, resume_url: Option<String>) {
        self.session_id = Some(session_id.into());
        self.resume_url = resume_url.filter(|url| !url.is_empty());
    }

    /// Forget the session; the next handshake identifies
    pub fn invalidate(&mut self) {
        self.session_id = None;
        self.sequence = None;
        self.resume_url = None;
    }

    pub fn can_resume(&self) -> bool {
        self.session_id.is_some()
    }

    /// Resume payload for the current session
    pub fn resume_payload(&self, token: &str) -> Option<ResumePayload> {
        let session_id = self.session_id.clone()?;
        Some(ResumePayload {
            token: token.to_string(),
            session_id,
            seq: self.sequence.unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_non_decreasing() {
        let mut session = SessionState::new();
        assert!(session.observe(3));
        assert!(!session.observe(2));
        assert!(session.observe(3));
        assert_eq!(session.sequence(), Some(3));
    }

    #[test]
    fn test_resume_payload_carries_session() {
        let mut session = SessionState::new();
        assert!(session.resume_payload("t").is_none());

        session.establish("abc", Some("wss://resume.test".into()));
        session.observe(7);
        let payload = session.resume_payload("t").unwrap();
        assert_eq!(payload.session_id, "abc");
        assert_eq!(payload.seq, 7);
        assert_eq!(session.resume_url(), Some("wss://resume.test"));
    }

    #[test]
    fn test_invalidate() {
        let mut session = SessionState::new();
        session.establish("abc", Some(String::new()));
        assert_eq!(session.resume_url(), None);
        session.observe(1);
        session.invalidate();
        assert!(!session.can_resume());
        assert_eq!(session.sequence(), None);
    }
}
