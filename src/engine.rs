use crate::model::{GenerationError, GenerationRequest, GenerativeModel};
use crate::notify::{NotificationSink, NotifyError};
use futures::StreamExt;
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
    thread::JoinHandle,
};
use thiserror::Error;

/// Lifecycle of one streaming request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Launched, no connection opened yet.
    Idle,
    /// Fragments are being received and displayed.
    Streaming,
    /// The fragment sequence ended normally.
    Completed,
    /// The service or the display failed; the error has been shown.
    Failed,
}

impl SessionState {
    /// Returns the state as a string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Streaming => "streaming",
            SessionState::Completed => "completed",
            SessionState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Failed)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to start the async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("could not display the error notification: {0}")]
    Notify(#[from] NotifyError),

    #[error("streaming thread panicked")]
    Panicked,
}

/// Anything that ends a stream early.
#[derive(Debug, Error)]
enum StreamFailure {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

/// Per-request display state: the text accumulated so far and the icon
/// shown next to it.
#[derive(Debug)]
pub struct ResponseContext {
    thumbnail: PathBuf,
    accumulated: String,
}

impl ResponseContext {
    pub fn new(thumbnail: PathBuf) -> Self {
        Self {
            thumbnail,
            accumulated: String::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.accumulated
    }

    pub fn thumbnail(&self) -> &Path {
        &self.thumbnail
    }

    fn append(&mut self, fragment: &str) {
        self.accumulated.push_str(fragment);
    }

    fn fail(&mut self, error: &impl std::fmt::Display) {
        self.accumulated = format!("Error: {error}");
    }

    fn show(&self, sink: &impl NotificationSink) -> Result<(), NotifyError> {
        sink.notify(&self.accumulated, &self.thumbnail)
    }
}

type SharedState = Arc<Mutex<SessionState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn set_state(state: &SharedState, next: SessionState) {
    *lock(state) = next;
}

/// Streams one request into the sink, updating the display after every
/// fragment.
///
/// Any failure, whether from the model or from the display, replaces the
/// accumulated text with an error message that is shown once more as the
/// final update. Only a failure of that last update is returned.
pub async fn run_session<M, S>(
    model: &mut M,
    sink: &S,
    request: GenerationRequest,
    context: &mut ResponseContext,
    state: &Arc<Mutex<SessionState>>,
) -> Result<SessionState, SessionError>
where
    M: GenerativeModel,
    S: NotificationSink,
{
    set_state(state, SessionState::Streaming);

    let outcome = async {
        let mut fragments = model.stream(request);
        while let Some(fragment) = fragments.next().await {
            let fragment = fragment?;
            log::debug!("Received fragment of {} bytes", fragment.len());
            context.append(&fragment);
            context.show(sink)?;
        }
        Ok::<(), StreamFailure>(())
    }
    .await;

    match outcome {
        Ok(()) => {
            log::info!("Response completed ({} bytes)", context.text().len());
            set_state(state, SessionState::Completed);
            Ok(SessionState::Completed)
        }
        Err(error) => {
            log::warn!("Response failed: {}", error);
            context.fail(&error);
            set_state(state, SessionState::Failed);
            context.show(sink)?;
            Ok(SessionState::Failed)
        }
    }
}

/// Handle to a streaming session running on its own thread.
///
/// Dropping the handle waits for the session to finish, so a process
/// that launched one stays alive until the answer has been displayed.
pub struct SessionHandle {
    state: SharedState,
    thumbnail: PathBuf,
    handle: Option<JoinHandle<Result<SessionState, SessionError>>>,
}

impl SessionHandle {
    /// Starts streaming `request` on a background thread.
    ///
    /// The thread drives its own single-threaded async runtime; the model
    /// and sink move onto it.
    pub fn spawn<M, S>(
        mut model: M,
        sink: S,
        request: GenerationRequest,
        thumbnail: PathBuf,
    ) -> std::io::Result<Self>
    where
        M: GenerativeModel + Send + 'static,
        S: NotificationSink + Send + 'static,
    {
        let state = Arc::new(Mutex::new(SessionState::Idle));
        let mut context = ResponseContext::new(thumbnail.clone());

        let handle = std::thread::Builder::new()
            .name("kuasimi-stream".to_string())
            .spawn({
                let state = state.clone();
                move || -> Result<SessionState, SessionError> {
                    log::debug!("Starting a new streaming session");
                    let runtime = tokio::runtime::Builder::new_current_thread()
                        .enable_all()
                        .build()
                        .map_err(SessionError::Runtime)?;

                    runtime.block_on(run_session(
                        &mut model,
                        &sink,
                        request,
                        &mut context,
                        &state,
                    ))
                }
            })?;

        Ok(Self {
            state,
            thumbnail,
            handle: Some(handle),
        })
    }

    /// Returns the current state of the session.
    pub fn state(&self) -> SessionState {
        *lock(&self.state)
    }

    /// Path of the icon used for every update of this session.
    pub fn thumbnail(&self) -> &Path {
        &self.thumbnail
    }

    /// Blocks until the session ends and returns its final state.
    pub fn wait(mut self) -> Result<SessionState, SessionError> {
        self.join()
    }

    fn join(&mut self) -> Result<SessionState, SessionError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| SessionError::Panicked)?,
            None => Ok(self.state()),
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if let Err(e) = self.join() {
            log::error!("Streaming session ended with an error: {}", e);
        }
    }
}
