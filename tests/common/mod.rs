//! Shared fixtures: a scripted [`DetectionApi`] and sample data.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use seawatch::errors::SeawatchError;
use seawatch::models::{ClassLabel, DetectResponse, DetectionRecord};
use seawatch::query::QueryParams;
use seawatch::services::{DetectionApi, ImageFile, ImageLocator};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::sync::oneshot;

pub const STORAGE_URL: &str = "http://localhost:9000";

pub type Outcome<T> = Result<T, SeawatchError>;

/// A scripted reply: available immediately or held until the test releases it.
pub enum Reply<T> {
    Ready(Outcome<T>),
    Gated(oneshot::Receiver<Outcome<T>>),
}

impl<T> Reply<T> {
    async fn resolve(self, missing: fn(String) -> SeawatchError) -> Outcome<T> {
        match self {
            Reply::Ready(outcome) => outcome,
            Reply::Gated(rx) => rx
                .await
                .unwrap_or_else(|_| Err(missing("gate dropped".to_string()))),
        }
    }
}

#[derive(Default)]
pub struct FakeApi {
    uploads: Mutex<VecDeque<Reply<String>>>,
    detects: Mutex<VecDeque<Reply<DetectResponse>>>,
    histories: Mutex<VecDeque<Reply<Vec<DetectionRecord>>>>,
    images: Mutex<HashMap<String, Bytes>>,
    pub uploaded: Mutex<Vec<String>>,
    pub detect_calls: Mutex<Vec<(String, Vec<ClassLabel>)>>,
    pub history_calls: Mutex<Vec<QueryParams>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_upload(&self, outcome: Outcome<String>) {
        self.uploads.lock().unwrap().push_back(Reply::Ready(outcome));
    }

    pub fn gate_upload(&self) -> oneshot::Sender<Outcome<String>> {
        let (tx, rx) = oneshot::channel();
        self.uploads.lock().unwrap().push_back(Reply::Gated(rx));
        tx
    }

    pub fn push_detect(&self, outcome: Outcome<DetectResponse>) {
        self.detects.lock().unwrap().push_back(Reply::Ready(outcome));
    }

    pub fn gate_detect(&self) -> oneshot::Sender<Outcome<DetectResponse>> {
        let (tx, rx) = oneshot::channel();
        self.detects.lock().unwrap().push_back(Reply::Gated(rx));
        tx
    }

    pub fn push_history(&self, outcome: Outcome<Vec<DetectionRecord>>) {
        self.histories.lock().unwrap().push_back(Reply::Ready(outcome));
    }

    pub fn gate_history(&self) -> oneshot::Sender<Outcome<Vec<DetectionRecord>>> {
        let (tx, rx) = oneshot::channel();
        self.histories.lock().unwrap().push_back(Reply::Gated(rx));
        tx
    }

    pub fn put_image(&self, url: &str, data: &'static [u8]) {
        self.images
            .lock()
            .unwrap()
            .insert(url.to_string(), Bytes::from_static(data));
    }

    pub fn upload_count(&self) -> usize {
        self.uploaded.lock().unwrap().len()
    }

    pub fn detect_count(&self) -> usize {
        self.detect_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl DetectionApi for FakeApi {
    async fn upload_image(&self, file: &ImageFile) -> Outcome<String> {
        self.uploaded.lock().unwrap().push(file.name.clone());
        let reply = self.uploads.lock().unwrap().pop_front();
        match reply {
            Some(reply) => reply.resolve(SeawatchError::Upload).await,
            None => Err(SeawatchError::Upload("no scripted upload".to_string())),
        }
    }

    async fn detect_image(&self, image_key: &str, classes: &[ClassLabel]) -> Outcome<DetectResponse> {
        self.detect_calls
            .lock()
            .unwrap()
            .push((image_key.to_string(), classes.to_vec()));
        let reply = self.detects.lock().unwrap().pop_front();
        match reply {
            Some(reply) => reply.resolve(SeawatchError::Detect).await,
            None => Err(SeawatchError::Detect("no scripted detection".to_string())),
        }
    }

    async fn list_detections(&self, params: &QueryParams) -> Outcome<Vec<DetectionRecord>> {
        self.history_calls.lock().unwrap().push(params.clone());
        let reply = self.histories.lock().unwrap().pop_front();
        match reply {
            Some(reply) => reply.resolve(SeawatchError::History).await,
            None => Err(SeawatchError::History("no scripted history".to_string())),
        }
    }

    async fn download_image(&self, url: &str) -> Outcome<Bytes> {
        self.images
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| SeawatchError::Export(format!("404 for {url}")))
    }
}

pub fn locator() -> ImageLocator {
    ImageLocator::new(STORAGE_URL)
}

/// Minimal PNG header; enough for format sniffing.
pub fn png_file(name: &str) -> ImageFile {
    ImageFile {
        name: name.to_string(),
        content_type: "image/png".to_string(),
        data: Bytes::from_static(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"),
    }
}

pub fn detect_response(id: &str, processed_key: &str, classes: &[ClassLabel]) -> DetectResponse {
    DetectResponse {
        detection_id: id.to_string(),
        object_count: classes.len() as u32,
        object_classes: classes.to_vec(),
        processed_image_key: processed_key.to_string(),
    }
}

pub fn record(id: usize) -> DetectionRecord {
    DetectionRecord {
        id: id.to_string(),
        detection_time: "2024-05-01T10:00:00".to_string(),
        input_image_key: format!("in-{id}.png"),
        output_image_key: format!("out-{id}.png"),
        object_count: 2,
        object_classes: vec![ClassLabel::Yacht, ClassLabel::Yacht],
        settings_classes: ClassLabel::ALL.to_vec(),
    }
}

pub fn records(ids: std::ops::RangeInclusive<usize>) -> Vec<DetectionRecord> {
    ids.map(record).collect()
}

/// Yields to other tasks until `cond` holds.
pub async fn wait_until<F: Fn() -> bool>(cond: F) {
    for _ in 0..10_000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}
