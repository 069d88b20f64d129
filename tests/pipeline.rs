//! Integration tests for the full split pipeline.
//!
//! Every test runs against the in-memory scene backend, so no native pdfium
//! library is needed. Output goes to per-test temporary directories.
//!
//! Run with:
//!   cargo test --test pipeline

use splitpdf::backend::{FilledRect, ScenePage};
use splitpdf::document::{DrawError, PageGeometry};
use splitpdf::pipeline::buffer::PixelBuffer;
use splitpdf::pipeline::geometry::Affine;
use splitpdf::{
    split, split_document, split_sync, split_with_provider, Document, ErrorKind, ExecutionMode,
    PageBounds, PixelFormat, Rotation, SceneDocument, SceneFileProvider, SplitConfig, SplitError,
    SplitProgressCallback,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

const RED: [u8; 4] = [255, 0, 0, 255];
const LETTER: (f64, f64) = (612.0, 792.0);

fn letter() -> ScenePage {
    ScenePage::new(LETTER.0, LETTER.1)
}

fn letters(n: usize) -> Arc<dyn Document> {
    Arc::new(SceneDocument::new(
        (0..n)
            .map(|i| letter().with_rect(FilledRect::new(10.0 * i as f64, 0.0, 50.0, 50.0, RED)))
            .collect(),
    ))
}

/// Route library logs through the test harness (`RUST_LOG=splitpdf=debug`).
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config(mode: ExecutionMode) -> SplitConfig {
    init_tracing();
    SplitConfig::builder()
        .mode(mode)
        .workers(4)
        .build()
        .expect("valid config")
}

fn png_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read_dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn dimensions(path: &Path) -> (u32, u32) {
    let img = image::open(path).expect("decode png");
    (img.width(), img.height())
}

/// Panics while drawing one page; every other page is blank.
struct Exploding {
    pages: usize,
    bad_index: usize,
}

impl Document for Exploding {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn page_geometry(&self, index: usize) -> Option<PageGeometry> {
        (index < self.pages).then(|| PageGeometry {
            bounds: PageBounds::new(40.0, 30.0),
            rotation: Rotation::Deg0,
        })
    }

    fn draw_page(&self, index: usize, _: &mut PixelBuffer, _: &Affine) -> Result<(), DrawError> {
        if index == self.bad_index {
            panic!("draw exploded on page index {index}");
        }
        Ok(())
    }
}

/// Later pages draw faster, so parallel jobs finish in reverse order.
struct ReverseFinish {
    pages: usize,
}

impl Document for ReverseFinish {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn page_geometry(&self, index: usize) -> Option<PageGeometry> {
        (index < self.pages).then(|| PageGeometry {
            bounds: PageBounds::new(8.0, 8.0),
            rotation: Rotation::Deg0,
        })
    }

    fn draw_page(&self, index: usize, _: &mut PixelBuffer, _: &Affine) -> Result<(), DrawError> {
        std::thread::sleep(Duration::from_millis(5 * (self.pages - index) as u64));
        Ok(())
    }
}

#[derive(Default)]
struct Counting {
    started: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    finished_ok: AtomicUsize,
}

impl SplitProgressCallback for Counting {
    fn on_page_start(&self, _: usize, _: usize) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }
    fn on_page_complete(&self, _: usize, _: usize, png_bytes: usize) {
        assert!(png_bytes > 0);
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
    fn on_page_error(&self, _: usize, _: usize, _: &str) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }
    fn on_run_complete(&self, _: usize, success_count: usize) {
        self.finished_ok.store(success_count, Ordering::SeqCst);
    }
}

// ── Output layout ────────────────────────────────────────────────────────────

#[tokio::test]
async fn one_png_per_page_and_nothing_else() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = split_document(letters(3), dir.path(), &config(ExecutionMode::Parallel))
        .await
        .expect("split");

    assert!(output.all_succeeded());
    assert_eq!(output.stats.total_pages, 3);
    assert_eq!(png_names(dir.path()), vec!["page_1.png", "page_2.png", "page_3.png"]);
    for (i, r) in output.results.iter().enumerate() {
        assert_eq!(r.path(), Some(&dir.path().join(format!("page_{}.png", i + 1))));
    }
}

#[tokio::test]
async fn letter_page_pixel_size_follows_scale() {
    for (scale, expected) in [(1.0, (612, 792)), (2.0, (1224, 1584)), (0.5, (306, 396))] {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = SplitConfig::builder().scale(scale).build().expect("valid");
        split_document(letters(1), dir.path(), &cfg).await.expect("split");
        assert_eq!(dimensions(&dir.path().join("page_1.png")), expected, "scale {scale}");
    }
}

#[tokio::test]
async fn fractional_sizes_round_up() {
    let dir = tempfile::tempdir().expect("tempdir");
    let doc: Arc<dyn Document> = Arc::new(SceneDocument::new(vec![ScenePage::new(100.2, 50.0)]));
    let cfg = SplitConfig::builder().scale(1.5).build().expect("valid");
    split_document(doc, dir.path(), &cfg).await.expect("split");
    assert_eq!(dimensions(&dir.path().join("page_1.png")), (151, 75));
}

#[tokio::test]
async fn quarter_turn_pages_swap_dimensions() {
    let dir = tempfile::tempdir().expect("tempdir");
    let doc: Arc<dyn Document> = Arc::new(SceneDocument::new(vec![
        letter().rotated(Rotation::Deg90),
        letter().rotated(Rotation::Deg180),
        letter().rotated(Rotation::Deg270),
    ]));
    split_document(doc, dir.path(), &config(ExecutionMode::Sequential))
        .await
        .expect("split");
    assert_eq!(dimensions(&dir.path().join("page_1.png")), (792, 612));
    assert_eq!(dimensions(&dir.path().join("page_2.png")), (612, 792));
    assert_eq!(dimensions(&dir.path().join("page_3.png")), (792, 612));
}

#[tokio::test]
async fn rendered_page_has_white_background_and_upright_content() {
    let dir = tempfile::tempdir().expect("tempdir");
    let doc: Arc<dyn Document> = Arc::new(SceneDocument::new(vec![
        ScenePage::new(100.0, 50.0).with_rect(FilledRect::new(0.0, 0.0, 10.0, 10.0, RED)),
    ]));
    split_document(doc, dir.path(), &config(ExecutionMode::Sequential))
        .await
        .expect("split");

    let img = image::open(dir.path().join("page_1.png")).expect("decode").to_rgba8();
    assert_eq!(img.dimensions(), (100, 50));
    // Page origin is bottom-left; raster origin is top-left.
    assert_eq!(img.get_pixel(0, 49).0, RED);
    assert_eq!(img.get_pixel(9, 40).0, RED);
    assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255, 255]);
    assert_eq!(img.get_pixel(99, 49).0, [255, 255, 255, 255]);
}

#[tokio::test]
async fn rgb_format_writes_rgb_png() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = SplitConfig::builder()
        .pixel_format(PixelFormat::Rgb8)
        .build()
        .expect("valid");
    split_document(letters(1), dir.path(), &cfg).await.expect("split");
    let img = image::open(dir.path().join("page_1.png")).expect("decode");
    assert_eq!(img.color(), image::ColorType::Rgb8);
}

#[tokio::test]
async fn existing_page_files_are_replaced() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("page_1.png"), b"stale").expect("write");
    split_document(letters(1), dir.path(), &config(ExecutionMode::Parallel))
        .await
        .expect("split");
    assert_eq!(dimensions(&dir.path().join("page_1.png")), (612, 792));
    assert_eq!(png_names(dir.path()), vec!["page_1.png"]);
}

// ── Scheduling ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn sequential_and_parallel_output_is_identical() {
    let seq = tempfile::tempdir().expect("tempdir");
    let par = tempfile::tempdir().expect("tempdir");
    split_document(letters(6), seq.path(), &config(ExecutionMode::Sequential))
        .await
        .expect("sequential");
    split_document(letters(6), par.path(), &config(ExecutionMode::Parallel))
        .await
        .expect("parallel");

    assert_eq!(png_names(seq.path()), png_names(par.path()));
    for name in png_names(seq.path()) {
        let a = std::fs::read(seq.path().join(&name)).expect("read");
        let b = std::fs::read(par.path().join(&name)).expect("read");
        assert_eq!(a, b, "{name} differs between modes");
    }
}

#[tokio::test]
async fn results_are_ordered_by_page_index() {
    let dir = tempfile::tempdir().expect("tempdir");
    let doc: Arc<dyn Document> = Arc::new(ReverseFinish { pages: 8 });
    let output = split_document(doc, dir.path(), &config(ExecutionMode::Parallel))
        .await
        .expect("split");
    let indices: Vec<usize> = output.results.iter().map(|r| r.page_index).collect();
    assert_eq!(indices, (0..8).collect::<Vec<_>>());
}

#[tokio::test]
async fn empty_document_yields_empty_results() {
    let dir = tempfile::tempdir().expect("tempdir");
    let doc: Arc<dyn Document> = Arc::new(SceneDocument::default());
    let output = split_document(doc, dir.path(), &config(ExecutionMode::Parallel))
        .await
        .expect("split");
    assert!(output.results.is_empty());
    assert_eq!(output.stats.total_pages, 0);
    assert!(output.all_succeeded());
    assert!(png_names(dir.path()).is_empty());
}

#[tokio::test]
async fn progress_callback_sees_every_page() {
    let dir = tempfile::tempdir().expect("tempdir");
    let counter = Arc::new(Counting::default());
    let cfg = SplitConfig::builder()
        .progress_callback(counter.clone() as Arc<dyn SplitProgressCallback>)
        .build()
        .expect("valid");
    split_document(letters(5), dir.path(), &cfg).await.expect("split");
    assert_eq!(counter.started.load(Ordering::SeqCst), 5);
    assert_eq!(counter.completed.load(Ordering::SeqCst), 5);
    assert_eq!(counter.failed.load(Ordering::SeqCst), 0);
    assert_eq!(counter.finished_ok.load(Ordering::SeqCst), 5);
}

// ── Failure isolation ────────────────────────────────────────────────────────

#[tokio::test]
async fn zero_area_page_fails_alone() {
    for mode in [ExecutionMode::Sequential, ExecutionMode::Parallel] {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut pages: Vec<ScenePage> = (0..5).map(|_| letter()).collect();
        pages[2] = ScenePage::new(0.0, 792.0);
        let doc: Arc<dyn Document> = Arc::new(SceneDocument::new(pages));

        let output = split_document(doc, dir.path(), &config(mode))
            .await
            .expect("page failures are not fatal");

        assert_eq!(output.stats.failed_pages, 1, "{mode}");
        assert_eq!(output.stats.succeeded_pages, 4, "{mode}");
        let error = output.results[2].error().expect("page 3 failed");
        assert_eq!(error.kind(), ErrorKind::InvalidGeometry);
        assert_eq!(error.page(), 3);
        assert_eq!(
            png_names(dir.path()),
            vec!["page_1.png", "page_2.png", "page_4.png", "page_5.png"]
        );
        assert!(matches!(
            output.into_result(),
            Err(SplitError::PartialFailure { failed: 1, total: 5, .. })
        ));
    }
}

#[tokio::test]
async fn panicking_draw_is_contained_to_its_page() {
    for mode in [ExecutionMode::Sequential, ExecutionMode::Parallel] {
        let dir = tempfile::tempdir().expect("tempdir");
        let doc: Arc<dyn Document> = Arc::new(Exploding {
            pages: 4,
            bad_index: 1,
        });
        let output = split_document(doc, dir.path(), &config(mode))
            .await
            .expect("panic is not fatal");

        assert_eq!(output.results.len(), 4);
        let error = output.results[1].error().expect("page 2 failed");
        assert_eq!(error.kind(), ErrorKind::JobPanicked);
        assert!(error.to_string().contains("exploded"), "{error}");
        assert_eq!(
            png_names(dir.path()),
            vec!["page_1.png", "page_3.png", "page_4.png"]
        );
    }
}

#[tokio::test]
async fn oversized_page_is_invalid_geometry() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = SplitConfig::builder()
        .scale(10.0)
        .max_dimension(5000)
        .build()
        .expect("valid");
    let output = split_document(letters(1), dir.path(), &cfg).await.expect("split");
    let error = output.results[0].error().expect("too large");
    assert_eq!(error.kind(), ErrorKind::InvalidGeometry);
}

// ── Fatal errors ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_input_creates_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("out");

    let err = split(dir.path().join("missing.pdf"), &out, &SplitConfig::default())
        .await
        .expect_err("missing input");
    assert!(err.is_setup_error(), "{err}");
    assert!(matches!(err, SplitError::FileNotFound { .. }));
    assert!(!out.exists());

    let err = split_with_provider(
        dir.path().join("missing.json"),
        &out,
        Arc::new(SceneFileProvider),
        &SplitConfig::default(),
    )
    .await
    .expect_err("missing input");
    assert!(err.is_setup_error());
    assert!(!out.exists());
}

#[tokio::test]
async fn non_pdf_input_is_rejected_before_decoding() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("photo.pdf");
    std::fs::write(&input, b"\x89PNG\r\n").expect("write");
    let out = dir.path().join("out");
    let err = split(&input, &out, &SplitConfig::default())
        .await
        .expect_err("not a pdf");
    assert!(matches!(err, SplitError::NotAPdf { .. }));
    assert!(!out.exists());
}

#[tokio::test]
async fn undecodable_document_creates_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("scene.json");
    std::fs::write(&input, b"{ truncated").expect("write");
    let out = dir.path().join("out");

    let err = split_with_provider(&input, &out, Arc::new(SceneFileProvider), &SplitConfig::default())
        .await
        .expect_err("decode error");
    assert!(err.is_decode_error(), "{err}");
    assert!(!out.exists());
}

#[tokio::test]
async fn split_document_requires_existing_output_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("not-there");
    let err = split_document(letters(1), &out, &SplitConfig::default())
        .await
        .expect_err("missing dir");
    assert!(matches!(err, SplitError::OutputDirMissing { .. }));
    assert!(!out.exists());
}

// ── Scene files ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn scene_file_is_split_into_nested_output_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("scene.json");
    let scene = SceneDocument::new(vec![
        ScenePage::new(20.0, 10.0),
        ScenePage::new(20.0, 10.0).rotated(Rotation::Deg90),
    ]);
    std::fs::write(&input, serde_json::to_vec(&scene).expect("json")).expect("write");
    let out = dir.path().join("a/b/pages");

    let output = split_with_provider(&input, &out, Arc::new(SceneFileProvider), &SplitConfig::default())
        .await
        .expect("split");
    assert!(output.all_succeeded());
    assert_eq!(dimensions(&out.join("page_1.png")), (20, 10));
    assert_eq!(dimensions(&out.join("page_2.png")), (10, 20));
}

// ── Blocking entry points ────────────────────────────────────────────────────

#[test]
fn split_sync_reports_missing_input() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("out");
    let err = split_sync(dir.path().join("nope.pdf"), &out, &SplitConfig::default())
        .expect_err("missing");
    assert!(err.is_setup_error());
    assert!(!out.exists());
}

#[test]
fn block_on_drives_split_document() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = config(ExecutionMode::Sequential);
    let output = tokio_test::block_on(split_document(letters(2), dir.path(), &cfg)).expect("split");
    assert_eq!(output.results.len(), 2);
}
