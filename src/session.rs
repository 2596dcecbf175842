// src/session.rs
//! Upload → detect pipeline for a single image.
//!
//! Remote calls are split into a `begin_run` / `finish_upload` /
//! `finish_detect` sequence so the session can be shared behind a lock that
//! is released while a request is in flight. Every step carries the id of the
//! session that issued it; results arriving after a reset are dropped.
//! A run whose driving future is dropped mid-flight ends in `Failed` with the
//! file kept, so it can be retried.

use crate::errors::{Result, SeawatchError};
use crate::lock;
use crate::models::{ClassBadge, ClassLabel, DetectResponse, DetectionResult};
use crate::services::{DetectionApi, ImageFile, ImageLocator};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    FileSelected,
    Uploading,
    Detecting,
    Ready,
    Failed,
}

impl SessionStatus {
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, next),
            (_, Idle)
                | (Idle | FileSelected | Ready | Failed, FileSelected)
                | (FileSelected | Failed, Uploading)
                | (Uploading, Detecting | Failed)
                | (Detecting, Ready | Failed)
        )
    }

    pub fn is_running(self) -> bool {
        matches!(self, SessionStatus::Uploading | SessionStatus::Detecting)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::FileSelected => "file_selected",
            SessionStatus::Uploading => "uploading",
            SessionStatus::Detecting => "detecting",
            SessionStatus::Ready => "ready",
            SessionStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Upload request handed out by [`DetectionSession::begin_run`].
#[derive(Debug, Clone)]
pub struct UploadStep {
    session_id: Uuid,
    pub file: ImageFile,
    pub classes: Vec<ClassLabel>,
}

/// Detect request handed out once the upload succeeded.
#[derive(Debug, Clone)]
pub struct DetectStep {
    session_id: Uuid,
    pub image_key: String,
    pub classes: Vec<ClassLabel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub status: SessionStatus,
    pub file_name: Option<String>,
    pub uploaded_key: Option<String>,
    pub result: Option<DetectionResult>,
    pub badges: Vec<ClassBadge>,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct DetectionSession {
    id: Uuid,
    status: SessionStatus,
    file: Option<ImageFile>,
    uploaded_key: Option<String>,
    result: Option<DetectionResult>,
    error: Option<String>,
    locator: ImageLocator,
}

impl DetectionSession {
    pub fn new(locator: ImageLocator) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: SessionStatus::Idle,
            file: None,
            uploaded_key: None,
            result: None,
            error: None,
            locator,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn file(&self) -> Option<&ImageFile> {
        self.file.as_ref()
    }

    pub fn uploaded_key(&self) -> Option<&str> {
        self.uploaded_key.as_deref()
    }

    pub fn result(&self) -> Option<&DetectionResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            status: self.status,
            file_name: self.file.as_ref().map(|f| f.name.clone()),
            uploaded_key: self.uploaded_key.clone(),
            result: self.result.clone(),
            badges: self.result.as_ref().map(|r| r.badges()).unwrap_or_default(),
            error: self.error.clone(),
        }
    }

    fn transition(&mut self, next: SessionStatus, action: &'static str) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(SeawatchError::InvalidTransition {
                from: self.status.to_string(),
                action,
            });
        }
        debug!("Session {}: {} -> {}", self.id, self.status, next);
        self.status = next;
        Ok(())
    }

    fn is_current(&self, session_id: Uuid, expected: SessionStatus) -> bool {
        if session_id != self.id || self.status != expected {
            debug!(
                "Session {}: dropping result for session {} (now {})",
                self.id, session_id, self.status
            );
            return false;
        }
        true
    }

    pub fn select_file(&mut self, file: ImageFile) -> Result<()> {
        self.transition(SessionStatus::FileSelected, "select a file")?;
        info!("Session {}: selected {}", self.id, file.name);
        self.file = Some(file);
        self.uploaded_key = None;
        self.result = None;
        self.error = None;
        Ok(())
    }

    /// Discards the file and any result. The replacement session gets a new id.
    pub fn reset(&mut self) {
        info!("Session {}: reset", self.id);
        *self = Self::new(self.locator.clone());
    }

    pub fn begin_run(&mut self, classes: &BTreeSet<ClassLabel>) -> Result<UploadStep> {
        if self.status.is_running() {
            return Err(SeawatchError::AlreadyRunning);
        }
        let file = self.file.clone().ok_or(SeawatchError::NoFileSelected)?;
        self.transition(SessionStatus::Uploading, "run detection")?;
        self.uploaded_key = None;
        self.error = None;

        info!("Session {}: uploading {}", self.id, file.name);
        Ok(UploadStep {
            session_id: self.id,
            file,
            classes: classes.iter().copied().collect(),
        })
    }

    /// Applies the upload outcome. Returns the detect request to issue next,
    /// or `None` when the upload failed or the session moved on.
    pub fn finish_upload(
        &mut self,
        step: UploadStep,
        outcome: Result<String>,
    ) -> Result<Option<DetectStep>> {
        if !self.is_current(step.session_id, SessionStatus::Uploading) {
            return Ok(None);
        }

        match outcome {
            Ok(image_key) => {
                self.transition(SessionStatus::Detecting, "start detection")?;
                self.uploaded_key = Some(image_key.clone());
                Ok(Some(DetectStep {
                    session_id: step.session_id,
                    image_key,
                    classes: step.classes,
                }))
            }
            Err(e) => {
                self.fail(e)?;
                Ok(None)
            }
        }
    }

    /// Applies the detect outcome. Returns whether it was applied.
    pub fn finish_detect(
        &mut self,
        step: DetectStep,
        outcome: Result<DetectResponse>,
    ) -> Result<bool> {
        if !self.is_current(step.session_id, SessionStatus::Detecting) {
            return Ok(false);
        }

        match outcome {
            Ok(response) => {
                self.transition(SessionStatus::Ready, "finish detection")?;
                info!(
                    "Session {}: detection {} found {} objects",
                    self.id, response.detection_id, response.object_count
                );
                self.result = Some(DetectionResult {
                    original_image_url: self.locator.url(&step.image_key),
                    processed_image_url: self.locator.url(&response.processed_image_key),
                    detection_id: response.detection_id,
                    object_count: response.object_count,
                    object_classes: response.object_classes,
                    image_key: step.image_key,
                    processed_image_key: response.processed_image_key,
                });
            }
            Err(e) => self.fail(e)?,
        }
        Ok(true)
    }

    fn fail(&mut self, error: SeawatchError) -> Result<()> {
        warn!("Session {}: {}", self.id, error);
        self.transition(SessionStatus::Failed, "record a failure")?;
        self.error = Some(error.to_string());
        Ok(())
    }

    /// Fails a run that will never see its remote result. No-op unless
    /// `session_id` is current and a step is outstanding.
    pub fn interrupt(&mut self, session_id: Uuid) {
        if session_id != self.id || !self.status.is_running() {
            return;
        }
        let error = match self.status {
            SessionStatus::Uploading => SeawatchError::Upload("interrupted".to_string()),
            _ => SeawatchError::Detect("interrupted".to_string()),
        };
        if let Err(e) = self.fail(error) {
            warn!("Session {}: {}", self.id, e);
        }
    }

    /// Runs the whole pipeline on an exclusively borrowed session.
    ///
    /// Remote failures end in [`SessionStatus::Failed`] and are not returned as
    /// errors; only rejected invocations are.
    pub async fn run(
        &mut self,
        api: &dyn DetectionApi,
        classes: &BTreeSet<ClassLabel>,
    ) -> Result<SessionStatus> {
        let upload = self.begin_run(classes)?;
        let mut guard = InterruptOnDrop {
            session_id: upload.session_id,
            session: self,
            armed: true,
        };

        let outcome = api.upload_image(&upload.file).await;
        if let Some(detect) = guard.session.finish_upload(upload, outcome)? {
            let outcome = api.detect_image(&detect.image_key, &detect.classes).await;
            guard.session.finish_detect(detect, outcome)?;
        }
        guard.armed = false;
        Ok(guard.session.status)
    }
}

struct InterruptOnDrop<'a> {
    session: &'a mut DetectionSession,
    session_id: Uuid,
    armed: bool,
}

impl Drop for InterruptOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.session.interrupt(self.session_id);
        }
    }
}

struct SharedInterruptOnDrop<'a> {
    session: &'a Mutex<DetectionSession>,
    session_id: Uuid,
    armed: bool,
}

impl Drop for SharedInterruptOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            lock(self.session).interrupt(self.session_id);
        }
    }
}

/// Runs the pipeline on a shared session without holding the lock across
/// remote calls. Returns the status the session ended in.
pub async fn run_pipeline(
    session: &Mutex<DetectionSession>,
    api: &dyn DetectionApi,
    classes: &BTreeSet<ClassLabel>,
) -> Result<SessionStatus> {
    let upload = lock(session).begin_run(classes)?;
    let mut guard = SharedInterruptOnDrop {
        session,
        session_id: upload.session_id,
        armed: true,
    };
    let outcome = api.upload_image(&upload.file).await;

    let detect = lock(session).finish_upload(upload, outcome)?;
    if let Some(detect) = detect {
        let outcome = api.detect_image(&detect.image_key, &detect.classes).await;
        lock(session).finish_detect(detect, outcome)?;
    }
    guard.armed = false;

    Ok(lock(session).status())
}
