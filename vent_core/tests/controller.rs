mod common;

use std::sync::{Arc, Mutex};

use common::{HIGH_PRESSURE, LOW_PRESSURE, RecordingActuator, SharedPressure};
use rstest::rstest;
use vent_core::mocks::NoopIndicator;
use vent_core::{
    BreathController, BreathEvent, ControllerCfg, DriveWaveform, ManualGate, ParameterKind,
    ParameterStore, ParameterTable, SpontaneousCfg, TriggerSource, VentContext, VentilationMode,
    WaveformProfile, build_controller,
};
use vent_traits::BreathPhase;

type TestController = BreathController<RecordingActuator, SharedPressure, NoopIndicator>;

struct Rig {
    ctrl: TestController,
    pressure: SharedPressure,
    outputs: Arc<Mutex<Vec<u32>>>,
    ctx: Arc<VentContext>,
}

fn rig(mode: VentilationMode, cfg: ControllerCfg) -> Rig {
    let store = ParameterStore::new(ParameterTable::default(), mode).unwrap();
    let ctx = VentContext::new(store);
    let actuator = RecordingActuator::default();
    let outputs = Arc::clone(&actuator.outputs);
    let pressure = SharedPressure::new(HIGH_PRESSURE);
    let ctrl = build_controller(
        actuator,
        pressure.clone(),
        NoopIndicator,
        DriveWaveform::builtin(WaveformProfile::Pwm),
        Arc::clone(&ctx),
        cfg,
        None,
    )
    .unwrap();
    Rig {
        ctrl,
        pressure,
        outputs,
        ctx,
    }
}

fn run(c: &mut TestController, ticks: u32) {
    for _ in 0..ticks {
        c.tick();
    }
}

#[test]
fn starts_in_inhale_with_default_timing() {
    let r = rig(VentilationMode::Ippv, ControllerCfg::default());
    assert_eq!(r.ctrl.phase(), BreathPhase::Inhale);
    assert_eq!(r.ctrl.timing().ticks_per_inhale, 150);
    assert_eq!(r.ctrl.timing().ticks_per_exhale, 150);
    assert_eq!(r.ctrl.breaths(), 1);
}

#[test]
fn phases_alternate_on_schedule() {
    let mut r = rig(VentilationMode::Ippv, ControllerCfg::default());
    run(&mut r.ctrl, 149);
    assert_eq!(r.ctrl.phase(), BreathPhase::Inhale);
    let rep = r.ctrl.tick();
    assert_eq!(rep.phase, BreathPhase::Exhale);
    assert_eq!(rep.tick, 0);

    run(&mut r.ctrl, 149);
    assert_eq!(r.ctrl.phase(), BreathPhase::Exhale);
    r.ctrl.tick();
    assert_eq!(r.ctrl.phase(), BreathPhase::Inhale);
    assert_eq!(r.ctrl.breaths(), 2);
    assert_eq!(r.ctx.telemetry.snapshot().breaths, 2);
}

#[test]
fn inhale_drive_rises_then_exhale_holds_scaled_park() {
    let mut r = rig(VentilationMode::Ippv, ControllerCfg::default());
    run(&mut r.ctrl, 160);

    let out = r.outputs.lock().unwrap().clone();
    assert_eq!(out.len(), 160);
    let inhale = &out[..150];
    assert!(inhale.windows(2).all(|w| w[0] <= w[1]));

    let w = DriveWaveform::builtin(WaveformProfile::Pwm);
    assert!(inhale[149] <= w.full_scale() * 250 / 700);
    let park = w.exhale_drive(250, 700);
    assert!(out[150..].iter().all(|&d| d == park));
}

#[test]
fn ippv_ignores_low_pressure() {
    let mut r = rig(VentilationMode::Ippv, ControllerCfg::default());
    r.pressure.set(LOW_PRESSURE);
    run(&mut r.ctrl, 151);
    assert_eq!(r.ctrl.phase(), BreathPhase::Exhale);
    for _ in 0..100 {
        assert!(!r.ctrl.tick().patient_triggered);
    }
}

#[test]
fn low_pressure_during_inhale_does_not_trigger() {
    let mut r = rig(VentilationMode::Spontaneous, ControllerCfg::default());
    r.pressure.set(LOW_PRESSURE);
    for _ in 0..149 {
        let rep = r.ctrl.tick();
        assert!(!rep.patient_triggered);
        assert_eq!(rep.phase, BreathPhase::Inhale);
    }
}

#[rstest]
#[case(0)]
#[case(20)]
#[case(149)]
fn low_pressure_during_exhale_starts_inhale_at_once(#[case] into_exhale: u32) {
    let mut r = rig(VentilationMode::Spontaneous, ControllerCfg::default());
    run(&mut r.ctrl, 150);
    assert_eq!(r.ctrl.phase(), BreathPhase::Exhale);
    run(&mut r.ctrl, into_exhale);
    assert_eq!(r.ctrl.phase(), BreathPhase::Exhale);
    assert_eq!(r.ctrl.tick_in_phase(), into_exhale);

    r.pressure.set(LOW_PRESSURE);
    let rep = r.ctrl.tick();
    assert!(rep.patient_triggered);
    assert_eq!(rep.phase, BreathPhase::Inhale);
    assert_eq!(rep.tick, 0);
    assert_eq!(r.ctrl.tick_in_phase(), 0);
    assert_eq!(r.ctrl.breaths(), 2);
    assert_eq!(r.ctx.telemetry.snapshot().triggered_breaths, 1);
}

#[test]
fn smoothed_trigger_waits_for_the_average_to_fall() {
    let cfg = ControllerCfg {
        spontaneous: SpontaneousCfg {
            source: TriggerSource::Smoothed,
            smoothing_window: 10,
            ..SpontaneousCfg::default()
        },
        ..ControllerCfg::default()
    };
    let mut r = rig(VentilationMode::Spontaneous, cfg);
    run(&mut r.ctrl, 150);
    r.pressure.set(LOW_PRESSURE);
    // one low sample among nine high ones keeps the mean far above threshold
    assert!(!r.ctrl.tick().patient_triggered);
    let triggered = (0..20).any(|_| r.ctrl.tick().patient_triggered);
    assert!(triggered);
}

#[rstest]
#[case(10)]
#[case(75)]
#[case(149)]
fn commit_mid_inhale_waits_for_next_inhale(#[case] publish_at: u32) {
    let mut r = rig(VentilationMode::Ippv, ControllerCfg::default());
    run(&mut r.ctrl, publish_at);

    let mut set = r.ctx.handoff.committed();
    set.set(ParameterKind::RespiratoryRate, 30);
    r.ctx.handoff.publish(&set, &ManualGate::new());

    // rest of this inhale and the whole exhale keep the old timing
    for _ in publish_at..299 {
        let rep = r.ctrl.tick();
        assert!(rep.applied.is_none());
        assert_eq!(r.ctrl.working_set().respiratory_rate(), 20);
    }
    assert!(r.ctx.handoff.is_pending());

    let rep = r.ctrl.tick();
    assert_eq!(rep.phase, BreathPhase::Inhale);
    let applied = rep.applied.unwrap();
    assert_eq!(applied.ticks_per_inhale, 100);
    assert_eq!(applied.ticks_per_exhale, 100);
    assert_eq!(r.ctrl.working_set().respiratory_rate(), 30);
    assert!(!r.ctx.handoff.is_pending());
}

#[test]
fn patient_triggered_inhale_also_picks_up_commit() {
    let mut r = rig(VentilationMode::Spontaneous, ControllerCfg::default());
    run(&mut r.ctrl, 160);
    let mut set = r.ctx.handoff.committed();
    set.set(ParameterKind::TidalVolume, 500);
    r.ctx.handoff.publish(&set, &ManualGate::new());

    r.pressure.set(LOW_PRESSURE);
    let rep = r.ctrl.tick();
    assert!(rep.patient_triggered);
    assert!(rep.applied.is_some());
    assert_eq!(r.ctrl.working_set().tidal_volume(), 500);
}

#[test]
fn same_values_twice_is_harmless() {
    let mut r = rig(VentilationMode::Ippv, ControllerCfg::default());
    let set = r.ctx.handoff.committed();
    let gate = ManualGate::new();
    r.ctx.handoff.publish(&set, &gate);
    run(&mut r.ctrl, 300);
    let first = r.ctrl.timing();
    r.ctx.handoff.publish(&set, &gate);
    run(&mut r.ctrl, 300);
    assert_eq!(r.ctrl.timing(), first);
    assert_eq!(r.ctx.handoff.pickups(), 2);
}

#[test]
fn events_report_phase_changes_and_commits() {
    let store = ParameterStore::default();
    let ctx = VentContext::new(store);
    let (tx, rx) = vent_core::events::channel();
    let mut c = build_controller(
        RecordingActuator::default(),
        SharedPressure::new(HIGH_PRESSURE),
        NoopIndicator,
        DriveWaveform::builtin(WaveformProfile::Servo),
        Arc::clone(&ctx),
        ControllerCfg::default(),
        Some(tx),
    )
    .unwrap();

    let mut set = ctx.handoff.committed();
    set.set(ParameterKind::InspiratoryExpiratoryRatio, 300);
    ctx.handoff.publish(&set, &ManualGate::new());
    run(&mut c, 300);

    let events: Vec<BreathEvent> = rx.try_iter().collect();
    assert!(events.contains(&BreathEvent::PhaseStarted {
        phase: BreathPhase::Exhale,
        breath: 1
    }));
    assert!(events.iter().any(|e| matches!(
        e,
        BreathEvent::ParametersApplied { timing, .. } if timing.ticks_per_inhale == 75
    )));
    assert!(events.contains(&BreathEvent::PhaseStarted {
        phase: BreathPhase::Inhale,
        breath: 2
    }));
}
