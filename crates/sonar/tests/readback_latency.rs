// Delivery timing of display and raw readbacks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use compute::{BufferView, ComputeBackend, ComputeError, CpuBackend, Kernel, SampleFormat};
use glam::Vec3;
use scene::{Material, Scene};
use sonar::{DataChannel, Fls, FlsConfig, RangeWindow, SonarContext, SonarPipeline};

/// CPU backend whose first `failures` map requests report an unfinished copy.
struct FlakyBackend {
    inner: CpuBackend,
    failures: AtomicUsize,
}

impl FlakyBackend {
    fn new(failures: usize) -> Self {
        Self {
            inner: CpuBackend::new(),
            failures: AtomicUsize::new(failures),
        }
    }
}

impl ComputeBackend for FlakyBackend {
    fn dispatch(
        &self,
        shader: &Kernel,
        binds: &[BufferView],
        workgroups: [u32; 3],
    ) -> Result<Vec<Vec<u8>>, ComputeError> {
        self.inner.dispatch(shader, binds, workgroups)
    }

    fn map_read(&self, staging: &BufferView) -> Result<Vec<u8>, ComputeError> {
        let left = self.failures.load(Ordering::SeqCst);
        if left > 0 {
            self.failures.store(left - 1, Ordering::SeqCst);
            return Err(ComputeError::MapFailed("copy still in flight"));
        }
        self.inner.map_read(staging)
    }
}

fn config() -> FlsConfig {
    FlsConfig {
        horizontal_fov_deg: 20.0,
        vertical_fov_deg: 10.0,
        beams: 16,
        bins: 32,
        range: RangeWindow::new(1.0, 20.0),
        format: SampleFormat::U16,
        seed: Some(1),
        ..FlsConfig::default()
    }
}

fn fls(backend: Arc<dyn ComputeBackend>) -> Fls {
    Fls::new(&config(), SonarContext::new(backend)).unwrap()
}

#[test]
fn frame_arrives_one_commit_later() {
    let mut sonar = fls(Arc::new(CpuBackend::new()));
    let scene = Scene::new();

    sonar.base_mut().mark_for_update();
    sonar.tick(&scene).unwrap();
    assert!(sonar.base().has_pending_readback());
    assert!(!sonar.base().mailbox().has_frame());

    sonar.commit_transform();
    let frame = sonar.base().mailbox().take().unwrap();
    assert_eq!(frame.tick, 0);
    assert_eq!(frame.format, SampleFormat::U16);
    assert_eq!(frame.channel(DataChannel::Raw).len(), 16 * 32 * 2);
    let (w, h) = frame.display_size;
    assert_eq!(frame.channel(DataChannel::Display).len(), (w * h * 3) as usize);
    assert!(!sonar.base().has_pending_readback());

    // nothing new without another update
    sonar.tick(&scene).unwrap();
    assert!(!sonar.base().mailbox().has_frame());
}

#[test]
fn delivered_frame_holds_the_scene_of_its_own_tick() {
    let mut sonar = fls(Arc::new(CpuBackend::new()));
    let empty = Scene::new();
    let mut walled = Scene::new();
    walled.add_plane(Vec3::Z, -10.0, Material::STEEL).unwrap();

    sonar.base_mut().mark_for_update();
    sonar.tick(&empty).unwrap();

    // the wall appears before the next tick, whose commit delivers tick 0
    sonar.base_mut().mark_for_update();
    sonar.tick(&walled).unwrap();
    let first = sonar.base().mailbox().take().unwrap();
    assert_eq!(first.tick, 0);
    assert!(first.output_strengths().iter().all(|&s| s == 0.0));

    sonar.commit_transform();
    let second = sonar.base().mailbox().take().unwrap();
    assert_eq!(second.tick, 1);
    // range 10 m in 32 bins over (1, 20) m starts at bin 15
    let strengths = second.output_strengths();
    let bin_energy = |bin: usize| -> f32 { strengths[bin * 16..(bin + 1) * 16].iter().sum() };
    assert!(bin_energy(15) > 0.0);
    assert!((0..15).all(|bin| bin_energy(bin) == 0.0));
}

#[test]
fn every_tick_delivers_the_previous_one() {
    let mut sonar = fls(Arc::new(CpuBackend::new()));
    let scene = Scene::new();
    let mut delivered = Vec::new();
    for _ in 0..4 {
        sonar.base_mut().mark_for_update();
        sonar.tick(&scene).unwrap();
        if let Some(frame) = sonar.base().mailbox().take() {
            delivered.push(frame.tick);
        }
    }
    assert_eq!(delivered, vec![0, 1, 2]);
}

#[test]
fn failed_map_is_retried_at_the_next_commit() {
    let mut sonar = fls(Arc::new(FlakyBackend::new(1)));
    let scene = Scene::new();

    sonar.base_mut().mark_for_update();
    sonar.tick(&scene).unwrap();
    let outcome = sonar.commit_transform();
    assert!(!outcome.delivered);
    assert!(!sonar.base().mailbox().has_frame());
    assert!(sonar.base().has_pending_readback());

    assert!(sonar.commit_transform().delivered);
    assert_eq!(sonar.base().mailbox().take().map(|f| f.tick), Some(0));
}

#[test]
fn newer_request_replaces_an_unmapped_copy() {
    let mut sonar = fls(Arc::new(FlakyBackend::new(1)));
    let scene = Scene::new();
    for _ in 0..2 {
        sonar.base_mut().mark_for_update();
        sonar.tick(&scene).unwrap();
    }
    assert!(sonar.commit_transform().delivered);
    assert_eq!(sonar.base().mailbox().take().map(|f| f.tick), Some(1));
}

#[test]
fn disabled_sonar_stays_silent() {
    let mut sonar = fls(Arc::new(CpuBackend::new()));
    let scene = Scene::new();
    sonar.base_mut().set_enabled(false);
    sonar.base_mut().mark_for_update();
    assert!(!sonar.tick(&scene).unwrap());
    sonar.commit_transform();
    assert!(!sonar.base().mailbox().has_frame());
    assert_eq!(sonar.base().tick(), 0);
}
