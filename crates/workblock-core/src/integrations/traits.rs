use crate::error::SyncError;

/// Credential management for an external service.
/// Credentials live in the OS keyring, looked up by `name()`.
pub trait Integration {
    /// Unique identifier ("todoist", "google").
    fn name(&self) -> &str;

    /// Human-readable display name.
    fn display_name(&self) -> &str;

    /// Whether credentials for this service are available.
    fn is_authenticated(&self) -> bool;

    /// Store credentials, running the OAuth flow if the service needs one.
    fn authenticate(&mut self) -> Result<(), SyncError>;

    /// Remove stored credentials.
    fn disconnect(&mut self) -> Result<(), SyncError>;
}
