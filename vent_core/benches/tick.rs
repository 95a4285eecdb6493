use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use vent_core::mocks::{FixedPressure, NoopIndicator, NullActuator};
use vent_core::{
    ControllerCfg, DriveWaveform, ManualGate, ParameterKind, ParameterStore, SpontaneousCfg,
    TriggerSource, VentContext, VentilationMode, WaveformProfile, build_controller,
};
use vent_core::parameters::ParameterTable;

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("controller_tick");

    for (name, source) in [("raw", TriggerSource::Raw), ("smoothed", TriggerSource::Smoothed)] {
        group.bench_function(name, |b| {
            b.iter_batched(
                || {
                    let store =
                        ParameterStore::new(ParameterTable::default(), VentilationMode::Spontaneous)
                            .unwrap();
                    let cfg = ControllerCfg {
                        spontaneous: SpontaneousCfg {
                            source,
                            ..SpontaneousCfg::default()
                        },
                        ..ControllerCfg::default()
                    };
                    build_controller(
                        NullActuator,
                        FixedPressure(1000),
                        NoopIndicator,
                        DriveWaveform::builtin(WaveformProfile::Pwm),
                        VentContext::new(store),
                        cfg,
                        None,
                    )
                    .unwrap()
                },
                |mut ctrl| {
                    // one full breath
                    for _ in 0..300 {
                        black_box(ctrl.tick());
                    }
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.bench_function("pickup_every_breath", |b| {
        let ctx = VentContext::new(ParameterStore::default());
        let mut ctrl = build_controller(
            NullActuator,
            FixedPressure(1000),
            NoopIndicator,
            DriveWaveform::builtin(WaveformProfile::Servo),
            std::sync::Arc::clone(&ctx),
            ControllerCfg::default(),
            None,
        )
        .unwrap();
        let gate = ManualGate::new();
        let mut set = ctx.handoff.committed();
        let mut rate = 20;
        b.iter(|| {
            rate = if rate == 20 { 21 } else { 20 };
            set.set(ParameterKind::RespiratoryRate, rate);
            ctx.handoff.publish(&set, &gate);
            let ticks = ctrl.timing().ticks_per_breath();
            for _ in 0..ticks {
                black_box(ctrl.tick());
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
