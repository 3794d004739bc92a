#![allow(dead_code)]

use futures::stream;
use image::RgbImage;
use kuasimi::{FragmentStream, GenerationError, GenerationRequest, GenerativeModel};
use kuasimi::{NotificationSink, NotifyError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// One notification as the daemon would have received it.
#[derive(Clone, Debug, PartialEq)]
pub struct Shown {
    pub body: String,
    pub icon: PathBuf,
}

/// Records every notification instead of displaying it.
#[derive(Clone, Default)]
pub struct RecordingSink {
    shown: Arc<Mutex<Vec<Shown>>>,
}

impl RecordingSink {
    pub fn shown(&self) -> Vec<Shown> {
        self.shown.lock().unwrap().clone()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.shown().into_iter().map(|s| s.body).collect()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, body: &str, icon: &Path) -> Result<(), NotifyError> {
        self.shown.lock().unwrap().push(Shown {
            body: body.to_string(),
            icon: icon.to_path_buf(),
        });
        Ok(())
    }
}

/// A sink whose daemon is never there.
pub struct MissingDaemon;

impl NotificationSink for MissingDaemon {
    fn notify(&self, _body: &str, _icon: &Path) -> Result<(), NotifyError> {
        Err(NotifyError::Show("no notification daemon running".to_string()))
    }
}

/// Fails the first update, then records like [`RecordingSink`].
#[derive(Clone, Default)]
pub struct FlakySink {
    calls: Arc<Mutex<usize>>,
    inner: RecordingSink,
}

impl FlakySink {
    pub fn bodies(&self) -> Vec<String> {
        self.inner.bodies()
    }
}

impl NotificationSink for FlakySink {
    fn notify(&self, body: &str, icon: &Path) -> Result<(), NotifyError> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        if *calls == 1 {
            return Err(NotifyError::Show("daemon restarting".to_string()));
        }
        self.inner.notify(body, icon)
    }
}

/// Replays fixed fragments, optionally ending with a service error.
#[derive(Clone, Default)]
pub struct ScriptedModel {
    fragments: Vec<&'static str>,
    failure: Option<&'static str>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl ScriptedModel {
    pub fn new(fragments: &[&'static str]) -> Self {
        Self {
            fragments: fragments.to_vec(),
            ..Self::default()
        }
    }

    pub fn failing_after(fragments: &[&'static str], message: &'static str) -> Self {
        Self {
            fragments: fragments.to_vec(),
            failure: Some(message),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl GenerativeModel for ScriptedModel {
    fn stream(&mut self, request: GenerationRequest) -> FragmentStream {
        self.requests.lock().unwrap().push(request);

        let mut items: Vec<Result<String, GenerationError>> =
            self.fragments.iter().map(|f| Ok(f.to_string())).collect();
        if let Some(message) = self.failure {
            items.push(Err(GenerationError::Api {
                status: 429,
                message: message.to_string(),
            }));
        }
        Box::pin(stream::iter(items))
    }
}

pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    RgbImage::new(width, height).save(&path).unwrap();
    path
}
