use uuid::Uuid;

/// The authenticated caller of a request. Session issuance happens
/// upstream; the proxy in front of this service verifies the session and
/// injects `x-user-id` and `x-user-admin` headers on every request it
/// forwards.
#[derive(Clone, Copy, Debug)]
pub struct Identity {
    /// The user's ID.
    pub user_id: Uuid,

    /// Whether the user may manage the catalog.
    pub admin: bool,
}

impl Identity {
    pub fn new(user_id: Uuid, admin: bool) -> Self {
        Self { user_id, admin }
    }
}
