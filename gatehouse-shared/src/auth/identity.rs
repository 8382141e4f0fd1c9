/// The requester's identity
///
/// Every request resolves to exactly one [`Identity`]. Operations receive it
/// explicitly; there is no ambient "current user".

use uuid::Uuid;

/// An authenticated requester
///
/// Only the session authority constructs principals, after resolving a live
/// session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    account_id: Uuid,
    session_id: Uuid,
    fresh: bool,
}

impl Principal {
    pub(crate) fn new(account_id: Uuid, session_id: Uuid, fresh: bool) -> Self {
        Self {
            account_id,
            session_id,
            fresh,
        }
    }

    /// Account the session is bound to
    pub fn account_id(&self) -> Uuid {
        self.account_id
    }

    /// Session backing this principal
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Whether the credential was checked within the re-auth window
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }
}

/// Who is making a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Identity {
    /// No session, or a session that no longer resolves
    #[default]
    Anonymous,

    /// A live session
    Authenticated(Principal),
}

/// Observable session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,

    /// Authenticated, but sensitive operations require re-authentication
    NeedsReauth,
}

impl Identity {
    /// The principal, if authenticated
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Identity::Anonymous => None,
            Identity::Authenticated(principal) => Some(principal),
        }
    }

    /// Account ID of the requester, if authenticated
    pub fn account_id(&self) -> Option<Uuid> {
        self.principal().map(Principal::account_id)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated(_))
    }

    pub fn state(&self) -> SessionState {
        match self {
            Identity::Anonymous => SessionState::Anonymous,
            Identity::Authenticated(principal) if principal.is_fresh() => SessionState::Authenticated,
            Identity::Authenticated(_) => SessionState::NeedsReauth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states() {
        assert_eq!(Identity::Anonymous.state(), SessionState::Anonymous);
        assert_eq!(Identity::default(), Identity::Anonymous);

        let fresh = Identity::Authenticated(Principal::new(Uuid::new_v4(), Uuid::new_v4(), true));
        assert_eq!(fresh.state(), SessionState::Authenticated);
        assert!(fresh.is_authenticated());

        let stale = Identity::Authenticated(Principal::new(Uuid::new_v4(), Uuid::new_v4(), false));
        assert_eq!(stale.state(), SessionState::NeedsReauth);
        assert!(stale.is_authenticated());
    }

    #[test]
    fn test_account_id() {
        let account_id = Uuid::new_v4();
        let identity = Identity::Authenticated(Principal::new(account_id, Uuid::new_v4(), true));

        assert_eq!(identity.account_id(), Some(account_id));
        assert_eq!(Identity::Anonymous.account_id(), None);
    }
}
