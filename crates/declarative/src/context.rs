//! Apply context and callback traits
//!
//! These traits allow the declarative crate to be used without
//! depending on a specific terminal UI or prompt implementation.

use crate::types::{ApplyResult, TrackedState};
use anyhow::Result;
use flowkit::{ApiClient, CancelToken};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Progress callback for execution operations
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback: Send {
    /// Called when starting to apply a single resource
    fn on_resource_start(&mut self, name: &str, description: &str);

    /// Called when a resource application completes
    fn on_resource_complete(&mut self, name: &str, result: &ApplyResult);

    /// Called after every step that changed the tracked state
    ///
    /// Hosts persist the state here so an interrupted run loses at most
    /// the step in flight.
    fn on_checkpoint(&mut self, state: &TrackedState) -> Result<()>;
}

/// Confirmation callback for user interaction
///
/// Implement this trait to handle user confirmations.
pub trait ConfirmCallback: Send {
    /// Ask the user to confirm an action
    ///
    /// # Returns
    /// `true` if the user confirmed, `false` otherwise
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_resource_start(&mut self, _name: &str, _description: &str) {}
    fn on_resource_complete(&mut self, _name: &str, _result: &ApplyResult) {}
    fn on_checkpoint(&mut self, _state: &TrackedState) -> Result<()> {
        Ok(())
    }
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Context passed to every lifecycle operation
///
/// Carries the API client and the cancellation signal for the call, plus
/// the dry-run flag. Resource kinds never see a dry-run context for writes:
/// the reconciler answers those itself.
#[derive(Clone)]
pub struct ApplyContext {
    /// Whether this is a dry run (no remote writes)
    pub dry_run: bool,
    /// Whether to output verbose information
    pub verbose: bool,
    /// API client
    pub client: ApiClient,
    /// Cancellation for every call made through this context
    pub cancel: CancelToken,
}

impl ApplyContext {
    /// Create a new apply context
    pub fn new(client: ApiClient, dry_run: bool) -> Self {
        Self {
            dry_run,
            verbose: false,
            client,
            cancel: CancelToken::new(),
        }
    }

    /// Use a specific cancellation token
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Set verbose output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// GET and decode
    pub fn get<T: DeserializeOwned>(&self, path: &str) -> flowkit::Result<T> {
        self.client.get(path, &self.cancel)
    }

    /// POST and decode
    pub fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> flowkit::Result<T> {
        self.client.post(path, body, &self.cancel)
    }

    /// PUT and decode
    pub fn put<T: DeserializeOwned>(&self, path: &str, body: Value) -> flowkit::Result<T> {
        self.client.put(path, body, &self.cancel)
    }

    /// PATCH and decode
    pub fn patch<T: DeserializeOwned>(&self, path: &str, body: Value) -> flowkit::Result<T> {
        self.client.patch(path, body, &self.cancel)
    }

    /// DELETE (404 counts as success)
    pub fn delete(&self, path: &str) -> flowkit::Result<()> {
        self.client.delete(path, &self.cancel)
    }
}
