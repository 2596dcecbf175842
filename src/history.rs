// src/history.rs
use crate::errors::{Result, SeawatchError};
use crate::lock;
use crate::models::{ClassBadge, DetectionRecord, FilterState};
use crate::pagination::{PageToken, page_window, total_pages};
use crate::query::{QueryParams, build_query};
use crate::services::DetectionApi;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Which response survives when several history fetches overlap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOrdering {
    /// Every completed fetch is applied, so the response that arrives last
    /// wins even when it answers an older request.
    #[default]
    LastResponseWins,
    /// Responses to anything but the most recently issued fetch are dropped.
    LatestRequestWins,
}

/// A history fetch issued by the controller and not yet completed.
#[derive(Debug, Clone)]
pub struct PendingFetch {
    seq: u64,
    params: QueryParams,
}

impl PendingFetch {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn params(&self) -> &QueryParams {
        &self.params
    }
}

/// A history row as the console renders it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordView<'a> {
    #[serde(flatten)]
    pub record: &'a DetectionRecord,
    pub detected_at: Option<DateTime<Utc>>,
    pub badges: Vec<ClassBadge>,
}

impl<'a> From<&'a DetectionRecord> for RecordView<'a> {
    fn from(record: &'a DetectionRecord) -> Self {
        Self {
            record,
            detected_at: record.detected_at(),
            badges: record.badges(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum HistoryView<'a> {
    Loading,
    Error { message: &'a str },
    Rows {
        rows: Vec<RecordView<'a>>,
        page: usize,
        total_pages: usize,
        pages: Vec<PageToken>,
    },
}

#[derive(Debug)]
pub struct HistoryController {
    draft: FilterState,
    applied: FilterState,
    dataset: Vec<DetectionRecord>,
    current_page: usize,
    page_size: usize,
    error: Option<String>,
    ordering: FetchOrdering,
    issued: u64,
    // highest sequence number that completed or was abandoned
    settled: u64,
}

impl Default for HistoryController {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, FetchOrdering::default())
    }
}

impl HistoryController {
    pub fn new(page_size: usize, ordering: FetchOrdering) -> Self {
        Self {
            draft: FilterState::default(),
            applied: FilterState::default(),
            dataset: Vec::new(),
            current_page: 1,
            page_size: page_size.max(1),
            error: None,
            ordering,
            issued: 0,
            settled: 0,
        }
    }

    pub fn draft(&self) -> &FilterState {
        &self.draft
    }

    pub fn applied(&self) -> &FilterState {
        &self.applied
    }

    pub fn dataset(&self) -> &[DetectionRecord] {
        &self.dataset
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// True until the most recently issued fetch has settled.
    pub fn is_loading(&self) -> bool {
        self.settled < self.issued
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.dataset.len(), self.page_size)
    }

    /// Changes the draft only; nothing is fetched until it is applied.
    pub fn edit_draft<F>(&mut self, patch: F)
    where
        F: FnOnce(&mut FilterState),
    {
        patch(&mut self.draft);
    }

    /// Commits a copy of the draft and issues a fetch for it.
    pub fn apply_draft(&mut self) -> PendingFetch {
        self.applied = self.draft.clone();
        self.issue()
    }

    /// Restores both filters to their defaults and issues a fetch.
    pub fn reset_filters(&mut self) -> PendingFetch {
        self.draft = FilterState::default();
        self.applied = FilterState::default();
        self.issue()
    }

    /// Issues a fetch for the applied filter without touching the draft.
    pub fn refresh(&mut self) -> PendingFetch {
        self.issue()
    }

    fn issue(&mut self) -> PendingFetch {
        self.issued += 1;
        self.error = None;
        debug!("Issuing history fetch #{}", self.issued);
        PendingFetch {
            seq: self.issued,
            params: build_query(&self.applied),
        }
    }

    /// Applies the outcome of a fetch. Returns false when the response was dropped.
    pub fn complete(
        &mut self,
        fetch: PendingFetch,
        outcome: Result<Vec<DetectionRecord>>,
    ) -> bool {
        self.settled = self.settled.max(fetch.seq);

        if self.ordering == FetchOrdering::LatestRequestWins && fetch.seq != self.issued {
            debug!(
                "Dropping history fetch #{} (latest is #{})",
                fetch.seq, self.issued
            );
            return false;
        }

        match outcome {
            Ok(records) => {
                info!("History fetch #{} returned {} records", fetch.seq, records.len());
                self.dataset = records;
                self.current_page = 1;
                self.error = None;
            }
            Err(e) => {
                warn!("History fetch #{} failed: {}", fetch.seq, e);
                self.error = Some(e.to_string());
            }
        }
        true
    }

    /// Settles a fetch that will never complete, leaving the data untouched.
    pub fn abandon(&mut self, seq: u64) {
        debug!("History fetch #{} abandoned", seq);
        self.settled = self.settled.max(seq);
    }

    /// Moves to page `n`, clamped into the valid range.
    pub fn set_page(&mut self, n: usize) {
        self.current_page = n.clamp(1, self.total_pages());
    }

    pub fn next_page(&mut self) {
        self.set_page(self.current_page + 1);
    }

    pub fn prev_page(&mut self) {
        self.set_page(self.current_page.saturating_sub(1));
    }

    pub fn page_rows(&self) -> &[DetectionRecord] {
        let start = (self.current_page - 1) * self.page_size;
        let end = (start + self.page_size).min(self.dataset.len());
        self.dataset.get(start..end).unwrap_or(&[])
    }

    pub fn pagination(&self) -> Vec<PageToken> {
        page_window(self.total_pages(), self.current_page)
    }

    /// What the results area shows. The dataset is kept but hidden while an
    /// error is active.
    pub fn view(&self) -> HistoryView<'_> {
        if self.is_loading() {
            return HistoryView::Loading;
        }
        if let Some(message) = self.error.as_deref() {
            return HistoryView::Error { message };
        }
        HistoryView::Rows {
            rows: self.page_rows().iter().map(RecordView::from).collect(),
            page: self.current_page,
            total_pages: self.total_pages(),
            pages: self.pagination(),
        }
    }
}

// Abandons the fetch if the driving future is dropped before completion.
struct SettleOnDrop<'a> {
    controller: &'a Mutex<HistoryController>,
    seq: u64,
    armed: bool,
}

impl Drop for SettleOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            lock(self.controller).abandon(self.seq);
        }
    }
}

/// Performs `fetch` against the history endpoint and hands the outcome back
/// to the controller. The lock is not held while the request is in flight.
pub async fn run_fetch(
    controller: &Mutex<HistoryController>,
    api: &dyn DetectionApi,
    fetch: PendingFetch,
) -> bool {
    let mut guard = SettleOnDrop {
        controller,
        seq: fetch.seq,
        armed: true,
    };
    let outcome = api
        .list_detections(fetch.params())
        .await
        .map_err(|e| match e {
            SeawatchError::History(_) => e,
            other => SeawatchError::History(other.to_string()),
        });
    guard.armed = false;
    lock(controller).complete(fetch, outcome)
}
