//! pdfium backend.
//!
//! ## Why an owner thread?
//!
//! `pdfium-render` wraps the pdfium C++ library, whose document handles borrow
//! the library bindings and are not `Send`. pdfium itself keeps global state
//! and is not safe for concurrent calls. Rather than hope the scheduler never
//! touches a document from two workers, [`PdfiumDocument`] confines the library
//! to a single owner thread: the thread binds pdfium, opens the file, reports
//! every page's geometry, then serves draw requests one at a time over a
//! channel. Workers block on the reply and composite the returned pixels into
//! their own buffer, so rasterisation of different pages is serialized while
//! encoding and writing still run in parallel.
//!
//! Dropping the document closes the request channel; the owner thread then
//! releases pdfium and is joined.

use crate::document::{Document, DocumentProvider, DrawError, PageBounds, PageGeometry, Rotation};
use crate::error::SplitError;
use crate::pipeline::buffer::PixelBuffer;
use crate::pipeline::geometry::{page_to_raster, Affine};
use image::RgbaImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Env var pointing at an existing pdfium library (file or directory).
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Opens PDFs with pdfium.
///
/// Binding order: explicit library path, then `PDFIUM_LIB_PATH`, then a
/// library in the current directory, then the system library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumProvider {
    library_path: Option<PathBuf>,
    password: Option<String>,
}

impl PdfiumProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

impl DocumentProvider for PdfiumProvider {
    fn open(&self, source: &Path) -> Result<Arc<dyn Document>, SplitError> {
        Ok(Arc::new(PdfiumDocument::open(
            source,
            self.library_path.clone(),
            self.password.clone(),
        )?))
    }
}

struct DrawRequest {
    index: usize,
    width: u32,
    height: u32,
    reply: mpsc::SyncSender<Result<RgbaImage, DrawError>>,
}

type OpenReply = Result<Vec<PageGeometry>, SplitError>;

/// A PDF opened by the pdfium owner thread.
pub struct PdfiumDocument {
    pages: Vec<PageGeometry>,
    requests: Option<mpsc::Sender<DrawRequest>>,
    owner: Option<JoinHandle<()>>,
}

impl PdfiumDocument {
    /// Start the owner thread and open `path` on it.
    ///
    /// Blocks until the document is loaded (or fails to load).
    pub fn open(
        path: &Path,
        library_path: Option<PathBuf>,
        password: Option<String>,
    ) -> Result<Self, SplitError> {
        let (request_tx, request_rx) = mpsc::channel::<DrawRequest>();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<OpenReply>(1);
        let source = path.to_path_buf();

        let owner = thread::Builder::new()
            .name("pdfium-owner".into())
            .spawn(move || {
                owner_loop(&source, library_path.as_deref(), password.as_deref(), ready_tx, request_rx)
            })
            .map_err(|e| SplitError::Internal(format!("failed to spawn pdfium thread: {e}")))?;

        let opened = ready_rx.recv().map_err(|_| {
            SplitError::Internal("pdfium owner thread exited before opening the document".into())
        });

        match opened.and_then(|r| r) {
            Ok(pages) => {
                info!("PDF loaded: {} pages", pages.len());
                Ok(Self {
                    pages,
                    requests: Some(request_tx),
                    owner: Some(owner),
                })
            }
            Err(e) => {
                drop(request_tx);
                if owner.join().is_err() {
                    warn!("pdfium owner thread panicked while opening {}", path.display());
                }
                Err(e)
            }
        }
    }
}

impl Document for PdfiumDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_geometry(&self, index: usize) -> Option<PageGeometry> {
        self.pages.get(index).copied()
    }

    fn draw_page(
        &self,
        index: usize,
        target: &mut PixelBuffer,
        transform: &Affine,
    ) -> Result<(), DrawError> {
        let geometry = self
            .page_geometry(index)
            .ok_or_else(|| DrawError::new(format!("no page at index {index}")))?;
        let scale = pdfium_scale(&geometry, transform)?;
        debug!("pdfium draws page {} at scale {}", index + 1, scale);

        let requests = self
            .requests
            .as_ref()
            .ok_or_else(|| DrawError::new("pdfium document is closed"))?;
        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        requests
            .send(DrawRequest {
                index,
                width: target.width(),
                height: target.height(),
                reply: reply_tx,
            })
            .map_err(|_| DrawError::new("pdfium owner thread has stopped"))?;
        let rendered = reply_rx
            .recv()
            .map_err(|_| DrawError::new("pdfium owner thread dropped the request"))??;

        if rendered.dimensions() != (target.width(), target.height()) {
            debug!(
                "pdfium rendered page {} at {}x{} for a {}x{} target",
                index + 1,
                rendered.width(),
                rendered.height(),
                target.width(),
                target.height()
            );
        }
        let (w, h) = (
            rendered.width().min(target.width()),
            rendered.height().min(target.height()),
        );
        for y in 0..h {
            for x in 0..w {
                target.blend_pixel(x, y, rendered.get_pixel(x, y).0);
            }
        }
        Ok(())
    }
}

/// The uniform scale `transform` applies on top of pdfium's own page
/// mapping (rotation and y-flip). pdfium can only be told a target size, so
/// any other transform is rejected.
fn pdfium_scale(geometry: &PageGeometry, transform: &Affine) -> Result<f64, DrawError> {
    // A quarter turn plus a flip: determinant is always −1, so never singular.
    let native = page_to_raster(geometry.bounds, geometry.rotation, 1.0);
    let [a, b, c, d, e, f] = (*transform * native.inverse()).as_coeffs();
    let tolerance = 1e-6 * a.abs().max(1.0);
    let uniform = [b, c, d - a, e, f].iter().all(|v| v.abs() <= tolerance);
    if !(a > 0.0) || !uniform {
        return Err(DrawError::new(format!(
            "transform {transform:?} is not pdfium's page mapping followed by a uniform scale"
        )));
    }
    Ok(a)
}

impl Drop for PdfiumDocument {
    fn drop(&mut self) {
        self.requests.take();
        if let Some(owner) = self.owner.take() {
            if owner.join().is_err() {
                warn!("pdfium owner thread panicked");
            }
        }
    }
}

fn bind(library_path: Option<&Path>) -> Result<Pdfium, SplitError> {
    let explicit = library_path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(PDFIUM_LIB_PATH_ENV).map(PathBuf::from));

    let bindings = match explicit {
        Some(path) if path.is_dir() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&path))
        }
        Some(path) => Pdfium::bind_to_library(&path),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| SplitError::PdfiumBindingFailed(format!("{e:?}")))?;

    Ok(Pdfium::new(bindings))
}

fn owner_loop(
    path: &Path,
    library_path: Option<&Path>,
    password: Option<&str>,
    ready: mpsc::SyncSender<OpenReply>,
    requests: mpsc::Receiver<DrawRequest>,
) {
    let pdfium = match bind(library_path) {
        Ok(p) => p,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    let document = match pdfium.load_pdf_from_file(path, password) {
        Ok(d) => d,
        Err(e) => {
            let _ = ready.send(Err(classify_load_error(path, password, e)));
            return;
        }
    };

    let pages = document.pages();
    let mut geometry = Vec::with_capacity(pages.len() as usize);
    for (index, page) in pages.iter().enumerate() {
        match page_geometry(&page) {
            Ok(g) => geometry.push(g),
            Err(e) => {
                let _ = ready.send(Err(SplitError::Decode {
                    path: path.to_path_buf(),
                    detail: format!("page {}: {e:?}", index + 1),
                }));
                return;
            }
        }
    }

    if ready.send(Ok(geometry)).is_err() {
        return;
    }

    while let Ok(request) = requests.recv() {
        let result = render(&pages, &request);
        // The worker may have gone away; nothing to report then.
        let _ = request.reply.send(result);
    }
    debug!("pdfium owner thread for {} shutting down", path.display());
}

fn classify_load_error(path: &Path, password: Option<&str>, e: PdfiumError) -> SplitError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if password.is_some() {
            SplitError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            SplitError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        SplitError::Decode {
            path: path.to_path_buf(),
            detail: err_str,
        }
    }
}

fn page_geometry(page: &PdfPage) -> Result<PageGeometry, PdfiumError> {
    let rotation = match page.rotation()? {
        PdfPageRenderRotation::None => Rotation::Deg0,
        PdfPageRenderRotation::Degrees90 => Rotation::Deg90,
        PdfPageRenderRotation::Degrees180 => Rotation::Deg180,
        PdfPageRenderRotation::Degrees270 => Rotation::Deg270,
    };
    let (w, h) = (f64::from(page.width().value), f64::from(page.height().value));
    // pdfium reports the displayed (post-rotation) size.
    let bounds = if rotation.swaps_axes() {
        PageBounds::new(h, w)
    } else {
        PageBounds::new(w, h)
    };
    Ok(PageGeometry { bounds, rotation })
}

fn render(pages: &PdfPages, request: &DrawRequest) -> Result<RgbaImage, DrawError> {
    let page = pages
        .get(request.index as u16)
        .map_err(|e| DrawError::new(format!("{e:?}")))?;

    let render_config = PdfRenderConfig::new()
        .set_target_width(request.width as i32)
        .set_target_height(request.height as i32);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| DrawError::new(format!("{e:?}")))?;

    Ok(bitmap.as_image().to_rgba8())
}
