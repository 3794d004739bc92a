//! Ask a multimodal model about an image and stream its answer into a
//! desktop notification, one growing update per received fragment.

pub mod app;
pub mod cli;
pub mod config;
pub mod engine;
pub mod gemini;
pub mod model;
pub mod notify;
pub mod sse;
pub mod thumbnail;

pub use app::{Invocation, LaunchError, launch};
pub use config::{Config, ConfigError};
pub use engine::{ResponseContext, SessionError, SessionHandle, SessionState, run_session};
pub use gemini::GeminiModel;
pub use model::{FragmentStream, GenerationError, GenerationRequest, GenerativeModel};
pub use notify::{DesktopNotifier, NotificationSink, NotifyError};
