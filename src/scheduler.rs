//! Page job scheduling.
//!
//! One page job = rasterize → encode → write for a single page index. The
//! [`PageJobScheduler`] runs one job per page either strictly in order or
//! fanned out over a bounded pool, and always hands back one
//! [`PageJobResult`] per page, sorted by index.
//!
//! ## Blocking work
//!
//! Every job body is CPU- or FFI-bound, so each one runs in
//! `tokio::task::spawn_blocking`. In parallel mode the job futures are driven
//! through `buffer_unordered(workers)`, which caps how many are in flight and
//! awaits every handle; nothing is detached. A job that panics surfaces as a
//! `JoinError` and is reported as [`PageError::JobPanicked`] for its page only.

use crate::config::{ExecutionMode, SplitConfig};
use crate::document::Document;
use crate::error::PageError;
use crate::output::PageJobResult;
use crate::pipeline::encode::encode_png;
use crate::pipeline::raster::PageRasterizer;
use crate::pipeline::write::{output_path, write_image};
use crate::progress::ProgressCallback;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

/// Lifecycle of a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running(ExecutionMode),
    Completed,
}

/// Runs one page job per page of a document.
pub struct PageJobScheduler {
    mode: ExecutionMode,
    workers: usize,
    rasterizer: PageRasterizer,
    progress: Option<ProgressCallback>,
    state: SchedulerState,
}

impl PageJobScheduler {
    pub fn new(config: &SplitConfig) -> Self {
        Self {
            mode: config.mode,
            workers: config.effective_workers(),
            rasterizer: PageRasterizer::new(config.scale, config.pixel_format)
                .with_max_dimension(config.max_dimension),
            progress: config.progress_callback.clone(),
            state: SchedulerState::Idle,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Jobs allowed in flight at once (1 in sequential mode).
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Process every page of `document` into `output_dir`.
    ///
    /// `output_dir` must already exist; it is never created here. Page
    /// failures are recorded in the returned results and never abort the run.
    pub async fn run(&mut self, document: Arc<dyn Document>, output_dir: &Path) -> Vec<PageJobResult> {
        let total = document.page_count();
        self.state = SchedulerState::Running(self.mode);
        info!(
            "Splitting {} pages into {} ({}, {} worker(s))",
            total,
            output_dir.display(),
            self.mode,
            self.workers
        );
        if let Some(ref cb) = self.progress {
            cb.on_run_start(total);
        }

        let job = PageJob {
            document,
            output_dir: output_dir.to_path_buf(),
            rasterizer: self.rasterizer,
            progress: self.progress.clone(),
            total,
        };

        let mut results = match self.mode {
            ExecutionMode::Sequential => {
                let mut results = Vec::with_capacity(total);
                for page_index in 0..total {
                    results.push(spawn_job(job.clone(), page_index).await);
                }
                results
            }
            ExecutionMode::Parallel => {
                stream::iter(0..total)
                    .map(|page_index| spawn_job(job.clone(), page_index))
                    .buffer_unordered(self.workers)
                    .collect::<Vec<_>>()
                    .await
            }
        };
        results.sort_by_key(|r| r.page_index);

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        if let Some(ref cb) = self.progress {
            cb.on_run_complete(total, succeeded);
        }
        debug!("Scheduler done: {}/{} pages written", succeeded, total);

        self.state = SchedulerState::Completed;
        results
    }
}

impl std::fmt::Debug for PageJobScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageJobScheduler")
            .field("mode", &self.mode)
            .field("workers", &self.workers)
            .field("rasterizer", &self.rasterizer)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Everything a job needs, cloned into each blocking task.
#[derive(Clone)]
struct PageJob {
    document: Arc<dyn Document>,
    output_dir: PathBuf,
    rasterizer: PageRasterizer,
    progress: Option<ProgressCallback>,
    total: usize,
}

impl PageJob {
    fn process(&self, page_index: usize) -> PageJobResult {
        let page_num = page_index + 1;
        if let Some(ref cb) = self.progress {
            cb.on_page_start(page_num, self.total);
        }

        let path = output_path(&self.output_dir, page_index);
        let written = self
            .rasterizer
            .rasterize(self.document.as_ref(), page_index)
            .and_then(|buffer| encode_png(&buffer, page_num))
            .and_then(|image| {
                let bytes = image.bytes.len();
                write_image(image, &path, page_num).map(|path| (path, bytes))
            });

        match written {
            Ok((path, bytes)) => {
                debug!("Page {} → {} ({} bytes)", page_num, path.display(), bytes);
                if let Some(ref cb) = self.progress {
                    cb.on_page_complete(page_num, self.total, bytes);
                }
                PageJobResult::success(page_index, path)
            }
            Err(e) => self.fail(page_index, e),
        }
    }

    fn fail(&self, page_index: usize, error: PageError) -> PageJobResult {
        warn!("{}", error);
        if let Some(ref cb) = self.progress {
            cb.on_page_error(page_index + 1, self.total, &error.to_string());
        }
        PageJobResult::failure(page_index, error)
    }
}

async fn spawn_job(job: PageJob, page_index: usize) -> PageJobResult {
    let runner = job.clone();
    match tokio::task::spawn_blocking(move || runner.process(page_index)).await {
        Ok(result) => result,
        Err(e) => job.fail(
            page_index,
            PageError::JobPanicked {
                page: page_index + 1,
                detail: panic_detail(e),
            },
        ),
    }
}

fn panic_detail(e: JoinError) -> String {
    if !e.is_panic() {
        return e.to_string();
    }
    let payload = e.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
