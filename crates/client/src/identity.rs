//! Debug identity context.
//!
//! [`IdentityContext`] is the single owner of the current identity. It loads
//! the persisted value once at construction, writes every change back through
//! an [`IdentityStore`], and broadcasts changes on a watch channel so that
//! dependent components re-evaluate.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use sidequest_core::Identity;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Errors raised by an [`IdentityStore`].
#[derive(Debug, Error)]
pub enum IdentityStoreError {
    #[error("failed to access identity file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Durable key-value storage for the identity.
pub trait IdentityStore: Send + Sync {
    /// Read the stored value, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the backing storage cannot be read.
    fn load(&self) -> Result<Option<String>, IdentityStoreError>;

    /// Replace the stored value.
    ///
    /// # Errors
    ///
    /// Returns error if the backing storage cannot be written.
    fn save(&self, value: &str) -> Result<(), IdentityStoreError>;

    /// Remove the stored value. Removing a missing entry is not an error.
    ///
    /// # Errors
    ///
    /// Returns error if the backing storage cannot be written.
    fn clear(&self) -> Result<(), IdentityStoreError>;
}

/// Stores the identity in a single text file.
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> IdentityStoreError {
        IdentityStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl IdentityStore for FileIdentityStore {
    fn load(&self) -> Result<Option<String>, IdentityStoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn save(&self, value: &str) -> Result<(), IdentityStoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        std::fs::write(&self.path, value).map_err(|e| self.io_error(e))
    }

    fn clear(&self) -> Result<(), IdentityStoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

/// Keeps the identity in memory only.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    value: Mutex<Option<String>>,
}

impl MemoryIdentityStore {
    #[must_use]
    pub fn new(initial: Option<&str>) -> Self {
        Self {
            value: Mutex::new(initial.map(str::to_string)),
        }
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn load(&self) -> Result<Option<String>, IdentityStoreError> {
        Ok(self
            .value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, value: &str) -> Result<(), IdentityStoreError> {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), IdentityStoreError> {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Holds the current debug identity and notifies subscribers of changes.
pub struct IdentityContext {
    store: Box<dyn IdentityStore>,
    current: watch::Sender<Option<Identity>>,
}

impl std::fmt::Debug for IdentityContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityContext")
            .field("current", &*self.current.borrow())
            .finish_non_exhaustive()
    }
}

impl IdentityContext {
    /// Create a context, loading the initial identity from `store`.
    ///
    /// A blank or unreadable stored value starts the context without an
    /// identity.
    pub fn load(store: impl IdentityStore + 'static) -> Self {
        let initial = match store.load() {
            Ok(Some(raw)) => Identity::parse(&raw).ok(),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to load stored identity");
                None
            }
        };
        debug!(identity = initial.as_ref().map(Identity::as_str), "Identity context loaded");

        let (current, _) = watch::channel(initial);
        Self {
            store: Box::new(store),
            current,
        }
    }

    /// Current identity, if one is set.
    #[must_use]
    pub fn get(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    /// Set the identity from user input.
    ///
    /// The value is trimmed. A non-empty value is persisted and becomes
    /// current; an empty value clears both memory and storage. Subscribers
    /// are notified only when the identity actually changes. Storage failures
    /// are logged and do not block the in-memory change.
    pub fn set(&self, value: &str) -> Option<Identity> {
        let next = Identity::parse(value).ok();

        let persisted = match &next {
            Some(identity) => self.store.save(identity.as_str()),
            None => self.store.clear(),
        };
        if let Err(e) = persisted {
            warn!(error = %e, "Failed to persist identity");
        }

        let changed = self.current.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            current.clone_from(&next);
            true
        });
        if changed {
            info!(identity = next.as_ref().map(Identity::as_str), "Identity changed");
        }
        next
    }

    /// Remove the identity.
    pub fn clear(&self) {
        self.set("");
    }

    /// Subscribe to identity changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_loads_persisted_identity() {
        let context = IdentityContext::load(MemoryIdentityStore::new(Some(" explorer \n")));
        assert_eq!(context.get().unwrap().as_str(), "explorer");
    }

    #[test]
    fn test_blank_persisted_identity_is_ignored() {
        let context = IdentityContext::load(MemoryIdentityStore::new(Some("   ")));
        assert!(context.get().is_none());
    }

    #[test]
    fn test_set_trims_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("identity");
        let context = IdentityContext::load(FileIdentityStore::new(&path));

        let identity = context.set("  walker ").unwrap();
        assert_eq!(identity.as_str(), "walker");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "walker");

        let reloaded = IdentityContext::load(FileIdentityStore::new(&path));
        assert_eq!(reloaded.get(), Some(identity));
    }

    #[test]
    fn test_empty_value_removes_storage_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity");
        let context = IdentityContext::load(FileIdentityStore::new(&path));

        context.set("walker");
        assert!(path.exists());

        assert!(context.set("   ").is_none());
        assert!(context.get().is_none());
        assert!(!path.exists());

        // Clearing twice is fine.
        context.clear();
    }

    #[test]
    fn test_subscribers_see_changes_only() {
        let context = IdentityContext::load(MemoryIdentityStore::default());
        let mut receiver = context.subscribe();

        context.set("walker");
        assert!(receiver.has_changed().unwrap());
        assert_eq!(receiver.borrow_and_update().as_ref().unwrap().as_str(), "walker");

        context.set("walker ");
        assert!(!receiver.has_changed().unwrap());

        context.clear();
        assert!(receiver.has_changed().unwrap());
        assert!(receiver.borrow_and_update().is_none());
    }

    #[test]
    fn test_missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileIdentityStore::new(dir.path().join("absent"));
        assert!(store.load().unwrap().is_none());
        assert!(store.clear().is_ok());
    }
}
