//! Async data binder.
//!
//! Runs an async producer and exposes its result as a `{data, error, loading}`
//! snapshot. The producer re-runs when the dependency key list changes or when
//! [`AsyncBinder::execute`] is called. There is no fencing between overlapping
//! runs; callers that need last-request-wins semantics carry their own
//! generation counter.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type Producer<T, E> = Arc<dyn Fn() -> BoxFuture<Result<T, E>> + Send + Sync>;

/// Options for [`AsyncBinder::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinderOptions {
    /// Run the producer on mount and on every dependency change.
    pub immediate: bool,
}

impl Default for BinderOptions {
    fn default() -> Self {
        Self { immediate: true }
    }
}

/// Observable state of a binder.
#[derive(Debug)]
pub struct BinderSnapshot<T, E> {
    pub data: Option<T>,
    pub error: Option<Arc<E>>,
    pub loading: bool,
}

impl<T: Clone, E> Clone for BinderSnapshot<T, E> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            error: self.error.clone(),
            loading: self.loading,
        }
    }
}

impl<T, E> Default for BinderSnapshot<T, E> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            loading: false,
        }
    }
}

/// Binds the result of an async producer to observable state.
pub struct AsyncBinder<T, E> {
    producer: Producer<T, E>,
    options: BinderOptions,
    deps: Mutex<Option<Vec<String>>>,
    state: watch::Sender<BinderSnapshot<T, E>>,
}

impl<T, E> std::fmt::Debug for AsyncBinder<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncBinder")
            .field("options", &self.options)
            .field("loading", &self.state.borrow().loading)
            .finish_non_exhaustive()
    }
}

impl<T, E> AsyncBinder<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    pub fn new<F, Fut>(producer: F, options: BinderOptions) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (state, _) = watch::channel(BinderSnapshot::default());
        Self {
            producer: Arc::new(move || -> BoxFuture<Result<T, E>> { Box::pin(producer()) }),
            options,
            deps: Mutex::new(None),
            state,
        }
    }

    /// First render: record `deps` and run the producer if `immediate`.
    ///
    /// Returns the producer's result when it ran.
    pub async fn mount(&self, deps: Vec<String>) -> Option<Result<T, Arc<E>>> {
        *self.deps.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.set_deps(deps).await
    }

    /// Record a new dependency list, re-running the producer if it differs
    /// from the previous one and the binder is `immediate`.
    pub async fn set_deps(&self, deps: Vec<String>) -> Option<Result<T, Arc<E>>> {
        if !self.replace_deps(deps) || !self.options.immediate {
            return None;
        }
        Some(self.execute().await)
    }

    /// [`set_deps`](Self::set_deps) whose run is abandoned if `token` is
    /// cancelled first.
    pub async fn set_deps_until(
        &self,
        deps: Vec<String>,
        token: &CancellationToken,
    ) -> Option<Result<T, Arc<E>>> {
        if !self.replace_deps(deps) || !self.options.immediate {
            return None;
        }
        self.execute_until(token).await
    }

    /// Forget dependencies, data and error.
    pub fn reset(&self) {
        *self.deps.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.state.send_replace(BinderSnapshot::default());
    }

    /// Run the producer now.
    ///
    /// Success replaces data and clears the error. Failure records the error
    /// and keeps whatever data was there.
    ///
    /// # Errors
    ///
    /// Returns the producer's error.
    pub async fn execute(&self) -> Result<T, Arc<E>> {
        self.begin();
        let result = (self.producer)().await;
        self.finish(result)
    }

    /// Like [`execute`](Self::execute), but abandons the run if `token` is
    /// cancelled first. An abandoned run leaves data and error untouched and
    /// returns `None`.
    pub async fn execute_until(&self, token: &CancellationToken) -> Option<Result<T, Arc<E>>> {
        if token.is_cancelled() {
            return None;
        }
        self.begin();
        tokio::select! {
            biased;
            () = token.cancelled() => {
                debug!("Binder run abandoned");
                self.state.send_modify(|state| state.loading = false);
                None
            }
            result = (self.producer)() => Some(self.finish(result)),
        }
    }

    /// Replace the data without running the producer.
    pub fn set_data(&self, data: Option<T>) {
        self.state.send_modify(|state| state.data = data);
    }

    #[must_use]
    pub fn snapshot(&self) -> BinderSnapshot<T, E> {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<BinderSnapshot<T, E>> {
        self.state.subscribe()
    }

    fn replace_deps(&self, deps: Vec<String>) -> bool {
        let mut current = self.deps.lock().unwrap_or_else(PoisonError::into_inner);
        if current.as_ref() == Some(&deps) {
            return false;
        }
        *current = Some(deps);
        true
    }

    fn begin(&self) {
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
    }

    fn finish(&self, result: Result<T, E>) -> Result<T, Arc<E>> {
        match result {
            Ok(data) => {
                self.state.send_modify(|state| {
                    state.data = Some(data.clone());
                    state.loading = false;
                });
                Ok(data)
            }
            Err(e) => {
                let e = Arc::new(e);
                self.state.send_modify(|state| {
                    state.error = Some(e.clone());
                    state.loading = false;
                });
                Err(e)
            }
        }
    }
}
