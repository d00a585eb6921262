//! Export controller: runs the snapshot, normalize, rasterize, paginate,
//! encode and save stages in order and reports progress.

use super::normalize::{normalize, NormalizeReport};
use super::options::ExportOptions;
use super::result::{ExportPlan, ExportReport};
use super::sink::{DirectorySink, FileSink};
use super::snapshot::{remove_stale_snapshots, Snapshot};
use crate::error::{Error, ErrorKind, Result};
use crate::model::{NodeId, VirtualDocument};
use crate::paginate::paginate;
use crate::pdf::PdfEncoder;
use crate::raster::{BoxRasterizer, RasterImage, RasterOptions, Rasterizer};
use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Observable state of a controller.
///
/// Transitions: `Idle -> Generating -> Done | Failed`, and from `Done` or
/// `Failed` back to `Generating` on the next export.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExportState {
    /// Nothing has run yet
    Idle,
    /// An export is in progress
    Generating {
        /// File being produced
        file_name: String,
    },
    /// The last export succeeded
    Done {
        /// Saved file name
        file_name: String,
        /// Where the sink stored it
        location: String,
        /// Pages written
        page_count: usize,
    },
    /// The last export failed
    Failed {
        /// Failure category
        kind: ErrorKind,
        /// Message for display
        message: String,
    },
}

impl ExportState {
    /// Check if an export is running.
    pub fn is_generating(&self) -> bool {
        matches!(self, ExportState::Generating { .. })
    }

    /// Check if this is `Done` or `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportState::Done { .. } | ExportState::Failed { .. })
    }
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStage {
    /// Copying the source subtree offscreen
    Snapshot,
    /// Rewriting lists into marker/content rows
    Normalize,
    /// Capturing the snapshot as a bitmap
    Rasterize,
    /// Computing page offsets
    Paginate,
    /// Assembling the PDF
    Encode,
    /// Handing the PDF to the sink
    Save,
}

/// Events emitted while an export runs.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExportEvent {
    /// An export began
    Started {
        /// File being produced
        file_name: String,
    },
    /// A stage is about to run
    Stage {
        /// The stage
        stage: ExportStage,
    },
    /// The export succeeded
    Finished {
        /// Summary of the export
        report: ExportReport,
    },
    /// The export failed
    Failed {
        /// Failure category
        kind: ErrorKind,
        /// Message for display
        message: String,
    },
}

impl ExportEvent {
    /// The terminal state this event leaves the controller in, if any.
    pub fn terminal_state(&self) -> Option<ExportState> {
        match self {
            ExportEvent::Finished { report } => Some(ExportState::Done {
                file_name: report.file_name.clone(),
                location: report.location.clone(),
                page_count: report.page_count,
            }),
            ExportEvent::Failed { kind, message } => Some(ExportState::Failed {
                kind: *kind,
                message: message.clone(),
            }),
            _ => None,
        }
    }
}

/// Receives export events synchronously, on the exporting thread.
pub trait ExportObserver: Send + Sync {
    /// Called for every event.
    fn on_event(&self, event: &ExportEvent);
}

impl<F> ExportObserver for F
where
    F: Fn(&ExportEvent) + Send + Sync,
{
    fn on_event(&self, event: &ExportEvent) {
        self(event)
    }
}

/// Runs exports of one document view, one at a time.
///
/// # Example
///
/// ```
/// use resume_export::export::{ExportController, ExportOptions, MemorySink};
/// use resume_export::load::parse_html;
/// use std::sync::Arc;
///
/// let mut doc = parse_html(r#"<div id="resume"><h1>Jane Doe</h1></div>"#).unwrap();
/// let source = doc.find_by_id("resume");
///
/// let sink = MemorySink::new();
/// let controller = ExportController::new(ExportOptions::default())
///     .with_sink(Arc::new(sink.clone()));
/// let report = controller.export(&mut doc, source, Some("jane")).unwrap();
///
/// assert_eq!(report.file_name, "jane.pdf");
/// assert_eq!(report.page_count, 1);
/// assert_eq!(sink.len(), 1);
/// ```
pub struct ExportController {
    options: ExportOptions,
    rasterizer: Arc<dyn Rasterizer>,
    sink: Arc<dyn FileSink>,
    observers: Vec<Arc<dyn ExportObserver>>,
    subscribers: Mutex<Vec<Sender<ExportEvent>>>,
    state: Mutex<ExportState>,
    busy: AtomicBool,
}

impl ExportController {
    /// Controller with the built-in rasterizer, saving into the current
    /// directory.
    pub fn new(options: ExportOptions) -> Self {
        Self {
            options,
            rasterizer: Arc::new(BoxRasterizer::new()),
            sink: Arc::new(DirectorySink::new(".")),
            observers: Vec::new(),
            subscribers: Mutex::new(Vec::new()),
            state: Mutex::new(ExportState::Idle),
            busy: AtomicBool::new(false),
        }
    }

    /// Use a different capture backend.
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    /// Use a different destination.
    pub fn with_sink(mut self, sink: Arc<dyn FileSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Register an observer.
    pub fn with_observer(mut self, observer: Arc<dyn ExportObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Call `hook` whenever an export starts.
    pub fn on_generate_start<F>(self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.with_observer(Arc::new(move |event: &ExportEvent| {
            if let ExportEvent::Started { file_name } = event {
                hook(file_name);
            }
        }))
    }

    /// Call `hook` with the terminal state whenever an export ends.
    pub fn on_generate_end<F>(self, hook: F) -> Self
    where
        F: Fn(&ExportState) + Send + Sync + 'static,
    {
        self.with_observer(Arc::new(move |event: &ExportEvent| {
            if let Some(state) = event.terminal_state() {
                hook(&state);
            }
        }))
    }

    /// Channel receiving every subsequent event.
    pub fn subscribe(&self) -> Receiver<ExportEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }
        rx
    }

    /// Export options in effect.
    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Name of the capture backend.
    pub fn rasterizer_name(&self) -> &str {
        self.rasterizer.name()
    }

    /// Current state.
    pub fn state(&self) -> ExportState {
        self.state
            .lock()
            .map(|s| s.clone())
            .unwrap_or(ExportState::Idle)
    }

    /// Check if an export, preview or plan is running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Export `source` as a paginated PDF and save it as `file_name`.
    ///
    /// A missing or empty name falls back to the configured default. While
    /// another call is running on this controller the request is rejected
    /// with [`Error::Busy`] and the state is left untouched. Any other
    /// failure moves the state to `Failed`; the snapshot is removed from
    /// `doc` and nothing is saved.
    pub fn export(
        &self,
        doc: &mut VirtualDocument,
        source: Option<NodeId>,
        file_name: Option<&str>,
    ) -> Result<ExportReport> {
        let _guard = self.acquire()?;
        let file_name = self.options.resolve_file_name(file_name);
        let started = Instant::now();

        self.set_state(ExportState::Generating {
            file_name: file_name.clone(),
        });
        self.emit(ExportEvent::Started {
            file_name: file_name.clone(),
        });
        log::debug!("Export of {} started", file_name);

        let outcome = contain(|| self.run(doc, source, &file_name, started));
        let leaked = remove_stale_snapshots(doc);
        if leaked > 0 {
            log::warn!("{} snapshot host(s) were still attached after export", leaked);
        }

        match outcome {
            Ok(report) => {
                log::info!(
                    "Exported {} ({} page(s), {} bytes) in {} ms",
                    report.file_name,
                    report.page_count,
                    report.byte_size,
                    report.elapsed_ms()
                );
                let event = ExportEvent::Finished {
                    report: report.clone(),
                };
                if let Some(state) = event.terminal_state() {
                    self.set_state(state);
                }
                self.emit(event);
                Ok(report)
            }
            Err(e) => {
                log::warn!("Export of {} failed: {}", file_name, e);
                let event = ExportEvent::Failed {
                    kind: e.kind(),
                    message: e.user_message(),
                };
                if let Some(state) = event.terminal_state() {
                    self.set_state(state);
                }
                self.emit(event);
                Err(e)
            }
        }
    }

    /// Render `source` the way an export would, without paginating.
    pub fn preview(&self, doc: &mut VirtualDocument, source: Option<NodeId>) -> Result<RasterImage> {
        let _guard = self.acquire()?;
        let outcome = contain(|| self.render(doc, source).map(|(image, _)| image));
        remove_stale_snapshots(doc);
        outcome
    }

    /// Compute the page plan of `source` without encoding a PDF.
    pub fn plan(&self, doc: &mut VirtualDocument, source: Option<NodeId>) -> Result<ExportPlan> {
        let _guard = self.acquire()?;
        let outcome = contain(|| {
            let (image, normalize) = self.render(doc, source)?;
            let layout = paginate(image.width(), image.height(), self.options.geometry())?;
            Ok(ExportPlan {
                layout,
                normalize,
                skipped_images: image.skipped_images(),
            })
        });
        remove_stale_snapshots(doc);
        outcome
    }

    fn run(
        &self,
        doc: &mut VirtualDocument,
        source: Option<NodeId>,
        file_name: &str,
        started: Instant,
    ) -> Result<ExportReport> {
        let (image, normalize) = self.render(doc, source)?;

        self.stage(ExportStage::Paginate);
        let geometry = self.options.geometry();
        let layout = paginate(image.width(), image.height(), geometry)?;

        self.stage(ExportStage::Encode);
        let mut metadata = self.options.metadata.clone();
        metadata.merge_missing(&doc.metadata);
        let bytes = PdfEncoder::from_options(&self.options)
            .with_metadata(metadata)
            .encode(&image, &layout)?;

        self.stage(ExportStage::Save);
        let location = self.sink.save(file_name, &bytes)?;

        Ok(ExportReport {
            file_name: file_name.to_string(),
            location,
            page_count: layout.page_count(),
            bitmap_width: image.width(),
            bitmap_height: image.height(),
            scale: image.scale(),
            image_height_mm: layout.image_height_mm,
            pages: layout.pages,
            normalize,
            skipped_images: image.skipped_images(),
            byte_size: bytes.len(),
            elapsed: started.elapsed(),
        })
    }

    /// Snapshot, normalize and rasterize. The snapshot is gone on return.
    fn render(
        &self,
        doc: &mut VirtualDocument,
        source: Option<NodeId>,
    ) -> Result<(RasterImage, NormalizeReport)> {
        self.stage(ExportStage::Snapshot);
        let mut snapshot = Snapshot::capture(doc, source, self.options.geometry())?;
        let root = snapshot.root();

        self.stage(ExportStage::Normalize);
        let report = normalize(snapshot.document_mut(), root, &self.options.normalize);

        self.stage(ExportStage::Rasterize);
        let raster_options = RasterOptions::from(&self.options);
        let image = self
            .rasterizer
            .rasterize(snapshot.document(), root, &raster_options)?;
        Ok((image, report))
    }

    fn acquire(&self) -> Result<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::Busy)?;
        Ok(BusyGuard(&self.busy))
    }

    fn set_state(&self, state: ExportState) {
        if let Ok(mut current) = self.state.lock() {
            *current = state;
        }
    }

    fn stage(&self, stage: ExportStage) {
        log::debug!("Export stage: {:?}", stage);
        self.emit(ExportEvent::Stage { stage });
    }

    /// Deliver `event`; a panicking observer is logged and skipped.
    fn emit(&self, event: ExportEvent) {
        for observer in &self.observers {
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| observer.on_event(&event)));
            if let Err(payload) = delivered {
                log::warn!(
                    "Export observer panicked: {}",
                    panic_message(payload.as_ref(), "observer panicked")
                );
            }
        }
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }
}

impl std::fmt::Debug for ExportController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportController")
            .field("options", &self.options)
            .field("rasterizer", &self.rasterizer.name())
            .field("observers", &self.observers.len())
            .field("state", &self.state())
            .field("busy", &self.is_busy())
            .finish()
    }
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Run `f`, turning a panic into [`Error::Unknown`].
fn contain<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        Err(Error::Unknown(panic_message(
            payload.as_ref(),
            "export stage panicked",
        )))
    })
}

fn panic_message(payload: &(dyn Any + Send), fallback: &str) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| fallback.to_string())
}
