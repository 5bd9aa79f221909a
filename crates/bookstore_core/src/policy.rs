//! Access policy
//!
//! Mutating a book (update or delete) is allowed only for the book's owner or
//! for staff identities. Creation is open to any authenticated identity and is
//! therefore not checked here.

/// The authenticated requester, as resolved by the hosting transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub is_staff: bool,
}

impl Identity {
    #[must_use]
    #[inline]
    pub const fn new(user_id: i64, is_staff: bool) -> Self {
        Self { user_id, is_staff }
    }
}

/// Whether `identity` may mutate a book with the given `owner`. An unowned
/// book can only be mutated by staff.
#[must_use]
pub fn can_modify(identity: &Identity, owner: Option<i64>) -> bool {
    identity.is_staff || owner == Some(identity.user_id)
}
