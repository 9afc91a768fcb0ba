use std::fmt;

/// Identifies one issued request within a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(u64);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues monotonically increasing tokens and remembers the one still awaited.
///
/// A completion is applied only when its token is the pending one; anything
/// else is a stale response.
#[derive(Debug, Default, Clone)]
pub struct RequestSequencer {
    last_issued: u64,
    pending: Option<RequestToken>,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new token, superseding any request still in flight
    pub fn issue(&mut self) -> RequestToken {
        self.last_issued += 1;
        let token = RequestToken(self.last_issued);
        self.pending = Some(token);
        token
    }

    /// Consume the pending token if `token` matches it
    pub fn complete(&mut self, token: RequestToken) -> bool {
        if self.pending == Some(token) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Forget the pending request so its completion is discarded
    pub fn abandon(&mut self) -> Option<RequestToken> {
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_token_completes() {
        let mut seq = RequestSequencer::new();
        let token = seq.issue();
        assert!(seq.is_pending());
        assert!(seq.complete(token));
        assert!(!seq.is_pending());
    }

    #[test]
    fn test_superseded_token_is_stale() {
        let mut seq = RequestSequencer::new();
        let first = seq.issue();
        let second = seq.issue();
        assert!(!seq.complete(first));
        assert!(seq.complete(second));
    }

    #[test]
    fn test_abandoned_token_is_stale() {
        let mut seq = RequestSequencer::new();
        let token = seq.issue();
        assert_eq!(seq.abandon(), Some(token));
        assert!(!seq.complete(token));
    }

    #[test]
    fn test_token_completes_once() {
        let mut seq = RequestSequencer::new();
        let token = seq.issue();
        assert!(seq.complete(token));
        assert!(!seq.complete(token));
    }
}
