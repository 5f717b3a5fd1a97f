use crate::protocol::UserName;
use crate::store::StoreError;

/// Store-internal account id. Never sent on the wire.
pub type UserId = u64;

/// Trait for pluggable persistence backends.
///
/// Every mutating call is all-or-nothing: on `Err` no state has changed.
pub trait Store: Send + Sync {
    /// Create an account with a freshly salted password hash.
    fn register_account(&self, username: &str, password: &str) -> Result<UserId, StoreError>;

    /// Check credentials; `UnknownUser` or `InvalidPassword` on failure.
    fn authenticate(&self, username: &str, password: &str) -> Result<UserId, StoreError>;

    fn add_contact(&self, owner: UserId, contact: &str) -> Result<(), StoreError>;

    fn remove_contact(&self, owner: UserId, contact: &str) -> Result<(), StoreError>;

    /// Contact usernames of `owner`, sorted ascending.
    fn list_contacts(&self, owner: UserId) -> Result<Vec<UserName>, StoreError>;

    /// Case-insensitive substring search, sorted ascending, at most `limit`.
    fn search_users(
        &self,
        query: &str,
        exclude: UserId,
        limit: usize,
    ) -> Result<Vec<UserName>, StoreError>;

    /// Replace the avatar of `owner`; an empty blob clears it.
    fn set_avatar(&self, owner: UserId, data: &[u8]) -> Result<(), StoreError>;

    fn get_avatar(&self, username: &str) -> Result<Option<Vec<u8>>, StoreError>;
}
