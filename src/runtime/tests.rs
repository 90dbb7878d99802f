use std::io::Write;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ndarray::{ArrayD, Dimension, IxDyn};
use serde_json::{Value, json};

use crate::formats::MemoryLoader;
use crate::model::{Affine, FileMeta, ImageState, ModelError, ViewMode};
use crate::transforms::{
    self, ApplyPolicy, Transform, TransformError, TransformKind, TransformOutput,
    TransformRegistry, TransformSchema,
};

use super::{
    JobEvent, SessionConfig, SessionError, SessionEvent, SessionState, Submission, ViewerSession,
    load_config,
};

fn image(shape: &[usize]) -> ImageState {
    let voxels = ArrayD::from_shape_fn(IxDyn(shape), |index| {
        index.slice().iter().sum::<usize>() as f32
    });
    ImageState::with_identity(voxels).expect("state")
}

fn session_with(loader: MemoryLoader) -> ViewerSession {
    ViewerSession::with_loader(SessionConfig::default(), Arc::new(loader))
}

fn opened(shape: &[usize]) -> ViewerSession {
    let mut session = session_with(MemoryLoader::new().with_image("scan.nii", image(shape)));
    session.open_file("scan.nii").expect("open");
    session
}

/// Holds its job open until the test releases it.
struct GatedTransform {
    kind: TransformKind,
    gate: Mutex<Receiver<()>>,
}

impl Transform for GatedTransform {
    fn kind(&self) -> TransformKind {
        self.kind
    }

    fn schema(&self) -> TransformSchema {
        TransformSchema {
            kind: self.kind,
            name: "test.gated".to_string(),
            description: String::new(),
            policy: ApplyPolicy::Preview,
            params: Vec::new(),
        }
    }

    fn validate(&self, _params: &Value) -> transforms::Result<()> {
        Ok(())
    }

    fn apply(&self, input: &ImageState, _params: &Value) -> transforms::Result<TransformOutput> {
        if let Ok(gate) = self.gate.lock() {
            let _ = gate.recv();
        }
        Ok(TransformOutput::state_only(input.clone()))
    }
}

struct PanickingTransform {
    kind: TransformKind,
    policy: ApplyPolicy,
}

impl Transform for PanickingTransform {
    fn kind(&self) -> TransformKind {
        self.kind
    }

    fn schema(&self) -> TransformSchema {
        TransformSchema {
            kind: self.kind,
            name: "test.panic".to_string(),
            description: String::new(),
            policy: self.policy,
            params: Vec::new(),
        }
    }

    fn policy(&self) -> ApplyPolicy {
        self.policy
    }

    fn validate(&self, _params: &Value) -> transforms::Result<()> {
        Ok(())
    }

    fn apply(&self, _input: &ImageState, _params: &Value) -> transforms::Result<TransformOutput> {
        panic!("kernel exploded");
    }
}

/// Drops the time axis, keeping the first frame.
struct FirstFrameTransform;

impl Transform for FirstFrameTransform {
    fn kind(&self) -> TransformKind {
        TransformKind::Resample
    }

    fn schema(&self) -> TransformSchema {
        TransformSchema {
            kind: self.kind(),
            name: "test.first_frame".to_string(),
            description: String::new(),
            policy: ApplyPolicy::Preview,
            params: Vec::new(),
        }
    }

    fn validate(&self, _params: &Value) -> transforms::Result<()> {
        Ok(())
    }

    fn apply(&self, input: &ImageState, _params: &Value) -> transforms::Result<TransformOutput> {
        let frame = input
            .voxels()
            .index_axis(ndarray::Axis(3), 0)
            .to_owned();
        Ok(TransformOutput::state_only(ImageState::new(
            frame,
            *input.affine(),
        )?))
    }
}

fn gated_session(shape: &[usize]) -> (ViewerSession, Sender<()>) {
    let loader: Arc<MemoryLoader> =
        Arc::new(MemoryLoader::new().with_image("scan.nii", image(shape)));
    let (release, gate) = channel();
    let mut registry = TransformRegistry::new(loader.clone());
    registry.register(GatedTransform {
        kind: TransformKind::GaussianFilter,
        gate: Mutex::new(gate),
    });
    let mut session = ViewerSession::with_registry(SessionConfig::default(), loader, registry);
    session.open_file("scan.nii").expect("open");
    (session, release)
}

#[test]
fn back_to_back_submits_yield_one_job_and_busy() {
    let (mut session, release) = gated_session(&[4, 4, 4]);
    let first = session
        .submit_modification(TransformKind::GaussianFilter, json!({}))
        .expect("first submit");
    assert!(matches!(first, Submission::Queued(_)));
    assert_eq!(session.state(), SessionState::JobInFlight);

    let second = session
        .submit_modification(TransformKind::GaussianFilter, json!({}))
        .expect_err("second submit");
    assert!(matches!(second, SessionError::Busy));

    let error = session.undo().expect_err("undo while busy");
    assert!(matches!(error, SessionError::OperationNotPermitted(_)));
    // Cursor updates are allowed in any state.
    session.set_slice(0).expect("cursor while busy");

    release.send(()).expect("release");
    let event = session.wait_for_job().expect("wait").expect("event");
    assert!(matches!(event, JobEvent::PreviewReady { .. }));
    assert_eq!(session.state(), SessionState::PreviewPending);
}

#[test]
fn submitting_with_pending_preview_is_not_permitted() {
    let mut session = opened(&[8, 8, 4]);
    session
        .submit_modification(TransformKind::Resample, json!({"factor": 2.0}))
        .expect("submit");
    session.wait_for_job().expect("wait");
    assert_eq!(session.state(), SessionState::PreviewPending);

    let error = session
        .submit_modification(TransformKind::Resample, json!({"factor": 2.0}))
        .expect_err("pending preview");
    assert!(matches!(error, SessionError::OperationNotPermitted(_)));
    let error = session.select_file(session.active_file().expect("active")).expect_err("switch");
    assert!(matches!(error, SessionError::OperationNotPermitted(_)));
}

#[test]
fn accept_and_reject_without_pending_change_nothing() {
    let mut session = opened(&[4, 4, 2]);
    let before = session.current().expect("current").clone();
    assert!(matches!(
        session.accept().expect_err("accept"),
        SessionError::NoPendingPreview
    ));
    assert!(matches!(
        session.reject().expect_err("reject"),
        SessionError::NoPendingPreview
    ));
    assert!(session.current().expect("current").is_same_snapshot(&before));
    assert!(!session.can_undo());
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn invalid_params_fail_synchronously() {
    let mut session = opened(&[4, 4, 2]);
    let error = session
        .submit_modification(TransformKind::Resample, json!({"factor": -1.0}))
        .expect_err("validation");
    assert!(matches!(error, SessionError::Validation(_)));
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.poll().expect("poll").is_none());
}

#[test]
fn accept_commits_candidate_and_undo_redo_round_trip() {
    let mut session = opened(&[8, 8, 4]);
    let original = session.current().expect("current").clone();
    session
        .submit_modification(TransformKind::Resample, json!({"factor": 2.0}))
        .expect("submit");
    session.wait_for_job().expect("wait");
    let preview = session.preview_slice().expect("preview").expect("pending");
    assert_eq!(preview.dim(), (16, 16));

    session.accept().expect("accept");
    assert_eq!(session.state(), SessionState::Idle);
    let resampled = session.current().expect("current").clone();
    assert_eq!(resampled.shape(), &[16, 16, 8]);
    assert_eq!(resampled.spacing(), [0.5, 0.5, 0.5]);
    assert_eq!(session.document().expect("doc").history().undo_len(), 1);

    assert!(session.undo().expect("undo"));
    assert!(session.current().expect("current").is_same_snapshot(&original));
    assert!(session.redo().expect("redo"));
    assert!(session.current().expect("current").is_same_snapshot(&resampled));
    assert!(!session.redo().expect("nothing to redo"));
}

#[test]
fn reject_discards_candidate() {
    let mut session = opened(&[4, 4, 2]);
    let before = session.current().expect("current").clone();
    session
        .submit_modification(TransformKind::GaussianFilter, json!({"sigma": 1.0}))
        .expect("submit");
    session.wait_for_job().expect("wait");
    session.reject().expect("reject");
    assert!(session.current().expect("current").is_same_snapshot(&before));
    assert!(!session.can_undo());
    assert!(session.pending_preview().is_none());
}

#[test]
fn normalize_applies_directly() {
    let mut session = opened(&[4, 4, 2]);
    let submission = session
        .submit_modification(TransformKind::Normalize, json!({"min": 0.0, "max": 1.0}))
        .expect("normalize");
    assert_eq!(submission, Submission::Applied(TransformKind::Normalize));
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.can_undo());
    let (low, high) = session.current().expect("current").min_max().expect("range");
    assert_eq!((low, high), (0.0, 1.0));
}

#[test]
fn direct_transform_failure_leaves_document() {
    let loader = MemoryLoader::new().with_image("flat.nii", {
        ImageState::with_identity(ArrayD::from_elem(IxDyn(&[3, 3, 3]), 2.0)).expect("flat")
    });
    let mut session = session_with(loader);
    session.open_file("flat.nii").expect("open");
    let error = session
        .submit_modification(TransformKind::Normalize, json!({"min": 0.0, "max": 1.0}))
        .expect_err("zero range");
    assert!(matches!(error, SessionError::Transform(TransformError::Numerical(_))));
    assert!(!session.can_undo());
}

#[test]
fn panicking_transform_becomes_failed_job() {
    let loader = Arc::new(MemoryLoader::new().with_image("scan.nii", image(&[4, 4, 2])));
    let mut registry = TransformRegistry::new(loader.clone());
    registry.register(PanickingTransform {
        kind: TransformKind::MedianFilter,
        policy: ApplyPolicy::Preview,
    });
    let mut session = ViewerSession::with_registry(SessionConfig::default(), loader, registry);
    session.open_file("scan.nii").expect("open");
    let before = session.current().expect("current").clone();

    session
        .submit_modification(TransformKind::MedianFilter, json!({}))
        .expect("submit");
    match session.wait_for_job().expect("wait").expect("event") {
        JobEvent::Failed { error, .. } => {
            assert!(matches!(error, TransformError::Panicked(message) if message.contains("exploded")));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.current().expect("current").is_same_snapshot(&before));
}

#[test]
fn panicking_direct_transform_is_contained() {
    let loader = Arc::new(MemoryLoader::new().with_image("scan.nii", image(&[4, 4, 2])));
    let mut registry = TransformRegistry::new(loader.clone());
    registry.register(PanickingTransform {
        kind: TransformKind::Normalize,
        policy: ApplyPolicy::Direct,
    });
    let mut session = ViewerSession::with_registry(SessionConfig::default(), loader, registry);
    session.open_file("scan.nii").expect("open");
    let before = session.current().expect("current").clone();
    let events = session.subscribe();

    let error = session
        .submit_modification(TransformKind::Normalize, json!({}))
        .expect_err("panic surfaces as an error");
    assert!(matches!(
        error,
        SessionError::Transform(TransformError::Panicked(ref message)) if message.contains("exploded")
    ));
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.current().expect("current").is_same_snapshot(&before));
    assert!(!session.can_undo());
    assert!(events.try_iter().next().is_none());

    session
        .submit_modification(TransformKind::Resample, json!({"factor": 2.0}))
        .expect("session still usable");
    assert!(matches!(
        session.wait_for_job().expect("wait"),
        Some(JobEvent::PreviewReady { .. })
    ));
}

#[test]
fn oversized_kernel_params_never_reach_a_worker() {
    let mut session = opened(&[4, 4, 4]);
    for (kind, params) in [
        (TransformKind::MedianFilter, json!({"size": 4001})),
        (TransformKind::NonLocalMeans, json!({"patch_size": 4001})),
        (TransformKind::NonLocalMeans, json!({"patch_distance": 100_000})),
    ] {
        let error = session
            .submit_modification(kind, params)
            .expect_err("oversized window");
        assert!(matches!(error, SessionError::Validation(_)), "{kind}");
        assert_eq!(session.state(), SessionState::Idle);
    }
}

#[test]
fn oversized_outputs_fail_the_job() {
    let mut session = opened(&[4, 4, 4]);
    let before = session.current().expect("current").clone();
    session
        .submit_modification(TransformKind::Resample, json!({"factor": 1.0e6}))
        .expect("submit");
    match session.wait_for_job().expect("wait").expect("event") {
        JobEvent::Failed { error, .. } => {
            assert!(matches!(error, TransformError::UnsupportedLayout(_)));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(session.current().expect("current").is_same_snapshot(&before));

    session
        .submit_modification(TransformKind::GaussianFilter, json!({"sigma": 1.0e30}))
        .expect("submit");
    assert!(matches!(
        session.wait_for_job().expect("wait"),
        Some(JobEvent::PreviewReady { .. })
    ));
    session.accept().expect("accept");
    let (low, high) = session.current().expect("current").min_max().expect("range");
    assert!(low.is_finite() && high.is_finite());
}

#[test]
fn missing_reference_fails_job_and_keeps_document() {
    let mut session = opened(&[6, 6, 3]);
    let before = session.current().expect("current").clone();
    session
        .submit_modification(
            TransformKind::AffineRegister,
            json!({"reference": "atlas.nii"}),
        )
        .expect("submit");
    let event = session.wait_for_job().expect("wait").expect("event");
    assert!(matches!(
        event,
        JobEvent::Failed {
            error: TransformError::Reference { .. },
            ..
        }
    ));
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.current().expect("current").is_same_snapshot(&before));
    assert!(session.wait_for_job().expect("idle wait").is_none());
}

#[test]
fn registration_result_takes_reference_affine() {
    let reference = image(&[6, 6, 3]).with_affine(Affine::from_spacing([2.0, 2.0, 2.0]));
    let loader = MemoryLoader::new()
        .with_image("scan.nii", image(&[6, 6, 3]))
        .with_image("atlas.nii", reference.clone());
    let mut session = session_with(loader);
    session.open_file("scan.nii").expect("open");
    session
        .submit_modification(
            TransformKind::AffineRegister,
            json!({"reference": "atlas.nii"}),
        )
        .expect("submit");
    session.wait_for_job().expect("wait");
    let pending = session.pending_preview().expect("pending");
    assert_eq!(pending.new_affine, Some(*reference.affine()));
    session.accept().expect("accept");
    assert_eq!(session.current().expect("current").affine(), reference.affine());
}

#[test]
fn cursor_starts_centred_and_validates_bounds() {
    let mut session = opened(&[4, 4, 9]);
    let cursor = session.cursor().expect("cursor");
    assert_eq!(cursor.slice_index, 4);
    assert_eq!(cursor.mode, ViewMode::Static3D);

    let error = session.set_slice(9).expect_err("out of range");
    assert!(matches!(
        error,
        SessionError::Shape(ModelError::IndexOutOfRange { index: 9, len: 9, .. })
    ));
    assert!(session.set_time(1).is_err());
    assert_eq!(session.scroll(10).expect("scroll").slice_index, 8);
    assert_eq!(session.scroll(-20).expect("scroll").slice_index, 0);
    assert_eq!(session.current_slice().expect("slice").dim(), (4, 4));
}

#[test]
fn cine_scroll_wraps_and_playback_ticks() {
    let mut session = opened(&[3, 3, 2, 4]);
    assert_eq!(session.cursor().expect("cursor").mode, ViewMode::Cine4D);
    assert_eq!(session.scroll(-1).expect("scroll").time_index, 3);
    assert_eq!(session.scroll(1).expect("scroll").time_index, 0);

    assert!(!session.tick().expect("tick"));
    assert!(session.play().expect("play"));
    assert!(session.tick().expect("tick"));
    assert_eq!(session.cursor().expect("cursor").time_index, 1);
    session.stop().expect("stop");
    assert!(!session.tick().expect("tick"));
}

#[test]
fn disguised_volume_is_static() {
    let mut session = opened(&[3, 3, 5, 1]);
    let cursor = session.cursor().expect("cursor");
    assert_eq!(cursor.mode, ViewMode::Static3D);
    assert!(!session.play().expect("play"));
    assert_eq!(session.scroll(1).expect("scroll").slice_index, 3);
}

#[test]
fn playback_interval_follows_temporal_spacing() {
    let mut session = session_with(MemoryLoader::new());
    let meta = FileMeta {
        temporal_spacing: Some(0.04),
        ..FileMeta::default()
    };
    session.open_state(image(&[2, 2, 1, 3]), meta).expect("open");
    assert_eq!(
        session.playback_interval().expect("interval"),
        Duration::from_millis(40)
    );
    assert_eq!(
        session
            .set_playback_interval(Duration::from_millis(1))
            .expect("set"),
        Duration::from_millis(10)
    );

    session
        .open_state(image(&[2, 2, 1, 3]), FileMeta::default())
        .expect("open");
    assert_eq!(
        session.playback_interval().expect("interval"),
        Duration::from_millis(100)
    );
}

#[test]
fn playback_stops_when_image_becomes_static() {
    let loader = Arc::new(MemoryLoader::new().with_image("cine.nii", image(&[3, 3, 2, 4])));
    let mut registry = TransformRegistry::new(loader.clone());
    registry.register(FirstFrameTransform);
    let mut session = ViewerSession::with_registry(SessionConfig::default(), loader, registry);
    session.open_file("cine.nii").expect("open");
    session.set_time(3).expect("time");
    assert!(session.play().expect("play"));

    session
        .submit_modification(TransformKind::Resample, json!({}))
        .expect("submit");
    session.wait_for_job().expect("wait");
    session.accept().expect("accept");

    let document = session.document().expect("doc");
    assert!(!document.is_playing());
    assert_eq!(document.cursor().mode, ViewMode::Static3D);
    assert_eq!(document.cursor().time_index, 0);
}

#[test]
fn cursor_is_clamped_when_image_shrinks() {
    let mut session = opened(&[4, 4, 8]);
    session.set_slice(7).expect("slice");
    session
        .submit_modification(TransformKind::Resample, json!({"factor": 0.5}))
        .expect("submit");
    session.wait_for_job().expect("wait");
    session.accept().expect("accept");
    assert_eq!(session.cursor().expect("cursor").slice_index, 3);
}

#[test]
fn workspace_tracks_active_file() {
    let loader = MemoryLoader::new()
        .with_image("a.nii", image(&[2, 2, 2]))
        .with_image("b.nii", image(&[3, 3, 3]));
    let mut session = session_with(loader);
    let a = session.open_file("a.nii").expect("a");
    let b = session.open_file("b.nii").expect("b");
    assert_eq!(session.active_file(), Some(b));
    assert_eq!(session.files().len(), 2);

    session.select_file(a).expect("select");
    assert_eq!(session.current().expect("current").shape(), &[2, 2, 2]);

    session.close_file(a).expect("close");
    assert_eq!(session.active_file(), None);
    assert!(matches!(
        session.cursor().expect_err("no file"),
        SessionError::NoActiveFile
    ));
    assert!(matches!(
        session.select_file(a).expect_err("closed"),
        SessionError::UnknownFile(_)
    ));

    let reopened = session.open_file("b.nii").expect("reopen");
    assert_eq!(reopened, b);
    assert_eq!(session.files().len(), 1);
}

#[test]
fn history_is_per_file_and_bounded_by_config() {
    let config = SessionConfig {
        history_capacity: 2,
        ..SessionConfig::default()
    };
    let loader = MemoryLoader::new()
        .with_image("a.nii", image(&[3, 3, 2]))
        .with_image("b.nii", image(&[3, 3, 2]));
    let mut session = ViewerSession::with_loader(config, Arc::new(loader));
    let a = session.open_file("a.nii").expect("a");
    for max in [1.0, 2.0, 3.0] {
        session
            .submit_modification(TransformKind::Normalize, json!({"min": 0.0, "max": max}))
            .expect("normalize");
    }
    assert_eq!(session.file_info().expect("info").undo_depth, 2);

    session.open_file("b.nii").expect("b");
    assert!(!session.can_undo());
    session.select_file(a).expect("select");
    assert!(session.can_undo());
}

#[test]
fn observers_receive_state_changes() {
    let mut session = opened(&[4, 4, 2]);
    let events = session.subscribe();
    session
        .submit_modification(TransformKind::Normalize, json!({"min": 0.0, "max": 1.0}))
        .expect("normalize");
    session.set_slice(0).expect("slice");
    let received = events.try_iter().collect::<Vec<_>>();
    assert!(matches!(received[0], SessionEvent::StateChanged { .. }));
    assert!(matches!(received[1], SessionEvent::CursorChanged { .. }));
    assert!(matches!(received[2], SessionEvent::StateChanged { .. }));
}

#[test]
fn clamped_cursor_and_file_switches_are_announced() {
    let mut session = opened(&[4, 4, 6]);
    let first = session.active_file().expect("active");
    session.set_slice(5).expect("slice");
    session
        .submit_modification(TransformKind::Resample, json!({"factor": 0.5}))
        .expect("submit");
    session.wait_for_job().expect("wait");
    let events = session.subscribe();
    session.accept().expect("accept");
    let received = events.try_iter().collect::<Vec<_>>();
    let clamped = session.cursor().expect("cursor");
    assert_eq!(clamped.slice_index, 2);
    assert!(received.contains(&SessionEvent::CursorChanged { file: first, cursor: clamped }));
    assert_eq!(received.last(), Some(&SessionEvent::StateChanged { file: first }));

    let second = session
        .open_state(image(&[4, 4, 2]), FileMeta::default())
        .expect("open");
    session.select_file(first).expect("select");
    let received = events.try_iter().collect::<Vec<_>>();
    assert!(received.contains(&SessionEvent::StateChanged { file: second }));
    assert_eq!(
        received[received.len() - 2..],
        [
            SessionEvent::ActiveFileChanged { file: Some(first) },
            SessionEvent::StateChanged { file: first },
        ]
    );
}

#[test]
fn config_loads_from_json_and_yaml() {
    let mut json_file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("json");
    write!(json_file, r#"{{"history_capacity": 5}}"#).expect("write");
    let config = load_config(json_file.path()).expect("json config");
    assert_eq!(config.history_capacity, 5);
    assert_eq!(config.default_cine_interval_ms, 100);

    let mut yaml_file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("yaml");
    writeln!(yaml_file, "min_cine_interval_ms: 20").expect("write");
    let config = load_config(yaml_file.path()).expect("yaml config");
    assert_eq!(config.min_cine_interval_ms, 20);
    assert_eq!(config.history_capacity, 20);

    let mut bad = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("bad");
    write!(bad, r#"{{"history_capacity": 0}}"#).expect("write");
    assert!(matches!(
        load_config(bad.path()).expect_err("zero capacity"),
        SessionError::Config(_)
    ));
}
