//! Concrete adapters for the task source and the calendar store.

pub mod google;
pub mod http;
pub mod oauth;
pub mod todoist;
pub mod traits;

pub use google::{GoogleAuth, GoogleCalendarStore};
pub use todoist::{TodoistAuth, TodoistSource};
pub use traits::Integration;

/// Thin wrapper around the OS keyring for credential storage.
pub mod keyring_store {
    use crate::error::SyncError;

    const SERVICE: &str = "workblock";

    fn entry(key: &str) -> Result<keyring::Entry, SyncError> {
        keyring::Entry::new(SERVICE, key).map_err(|e| SyncError::Credentials(e.to_string()))
    }

    pub fn get(key: &str) -> Result<Option<String>, SyncError> {
        match entry(key)?.get_password() {
            Ok(pw) => Ok(Some(pw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(SyncError::Credentials(e.to_string())),
        }
    }

    pub fn set(key: &str, value: &str) -> Result<(), SyncError> {
        entry(key)?
            .set_password(value)
            .map_err(|e| SyncError::Credentials(e.to_string()))
    }

    pub fn delete(key: &str) -> Result<(), SyncError> {
        match entry(key)?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(SyncError::Credentials(e.to_string())),
        }
    }
}
