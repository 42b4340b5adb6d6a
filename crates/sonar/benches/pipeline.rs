use criterion::{criterion_group, criterion_main, Criterion};
use glam::{Quat, Vec3};
use scene::{Material, Scene};
use sonar::{FlsConfig, MsisConfig, Sonar, SonarConfig, SonarContext, SonarPipeline, SssConfig};

fn harbour() -> Scene {
    let mut scene = Scene::new();
    scene.add_plane(Vec3::Y, -8.0, Material::SAND).unwrap();
    scene.add_sphere(Vec3::new(2.0, -6.0, -12.0), 1.5, Material::ROCK).unwrap();
    scene
        .add_box(
            Vec3::new(-4.0, -6.0, -20.0),
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_y(0.4),
            Material::STEEL,
        )
        .unwrap();
    scene
}

fn bench_variant(c: &mut Criterion, name: &str, config: SonarConfig) {
    let scene = harbour();
    let mut sonar = Sonar::from_config(&config, SonarContext::with_default_backend()).unwrap();
    c.bench_function(name, |b| {
        b.iter(|| {
            sonar.base_mut().mark_for_update();
            sonar.tick(&scene).unwrap();
        })
    });
}

fn bench_fls(c: &mut Criterion) {
    let config = FlsConfig {
        horizontal_fov_deg: 60.0,
        vertical_fov_deg: 10.0,
        beams: 128,
        bins: 128,
        ..FlsConfig::default()
    };
    bench_variant(c, "fls_tick", SonarConfig::Fls(config));
}

fn bench_msis(c: &mut Criterion) {
    let config = MsisConfig {
        bins: 128,
        ..MsisConfig::default()
    };
    bench_variant(c, "msis_tick", SonarConfig::Msis(config));
}

fn bench_sss(c: &mut Criterion) {
    let config = SssConfig {
        bins: 128,
        lines: 64,
        ..SssConfig::default()
    };
    bench_variant(c, "sss_tick", SonarConfig::Sss(config));
}

criterion_group!(benches, bench_fls, bench_msis, bench_sss);
criterion_main!(benches);
