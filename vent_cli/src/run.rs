//! Command implementations: `run`, `timing` and `self-check`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eyre::{Result, WrapErr};
use serde_json::json;
use vent_config::Config;
use vent_core::builder::{BoxedActuator, BoxedIndicator, BoxedPressure};
use vent_core::util::{ticks_per_minute, ticks_to_duration};
use vent_core::{
    ButtonPolarity, ControllerCfg, CycleTiming, DriveWaveform, EditorCfg, Foreground,
    ForegroundCfg, ParameterKind, ParameterSet, ParameterStore, ParameterTable, RunSummary,
    VentContext, VentilationMode, build_controller,
};
use vent_hardware::{LogDisplay, SimActuator, SimIndicator, SimInputs, SimOperator, SimPressure};
use vent_traits::{InputPin, InputSource, MonotonicClock};

use crate::cli::RtLock;

#[derive(Debug)]
pub struct RunArgs {
    pub duration_ms: Option<u64>,
    pub spontaneous: bool,
    pub stats: bool,
    pub sim_set_rate: Option<u32>,
    pub rt: bool,
    pub rt_prio: Option<i32>,
    pub rt_lock: Option<RtLock>,
    pub rt_cpu: Option<usize>,
    pub json: bool,
}

/// Collaborators for one run. `sim_inputs` is set only for the simulation
/// backend, where a scripted operator can drive it.
struct Parts {
    actuator: BoxedActuator,
    pressure: BoxedPressure,
    indicator: BoxedIndicator,
    inputs: Box<dyn InputSource>,
    sim_inputs: Option<SimInputs>,
}

pub fn run(cfg: &Config, args: &RunArgs) -> Result<()> {
    let table = ParameterTable::from(&cfg.parameters);
    let mode = if args.spontaneous {
        VentilationMode::Spontaneous
    } else {
        VentilationMode::from(&cfg.spontaneous)
    };
    let store = ParameterStore::new(table, mode)?;
    let ctx = VentContext::new(store);
    let waveform = DriveWaveform::try_from(&cfg.actuator)?;
    let (tx, rx) = vent_core::events::channel();

    let parts = collaborators(cfg)?;
    let sim_inputs = parts.sim_inputs.clone();
    let controller = build_controller(
        parts.actuator,
        parts.pressure,
        parts.indicator,
        waveform,
        Arc::clone(&ctx),
        ControllerCfg::from(cfg),
        Some(tx),
    )?;
    let mut foreground = Foreground::new(
        parts.inputs,
        LogDisplay::new(),
        MonotonicClock::new(),
        Arc::clone(&ctx),
        ButtonPolarity::from(&cfg.buttons),
        &EditorCfg::from(&cfg.editor),
        ForegroundCfg::from(cfg),
    )
    .with_events(rx);

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&shutdown);
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Release)) {
            tracing::warn!(error = %e, "failed to install Ctrl-C handler");
        }
    }
    if let Some(ms) = args.duration_ms {
        let flag = Arc::clone(&shutdown);
        std::thread::Builder::new()
            .name("vent-timer".into())
            .spawn(move || {
                std::thread::sleep(Duration::from_millis(ms));
                flag.store(true, Ordering::Release);
            })
            .wrap_err("spawn duration timer")?;
    }

    if let Some(rate) = args.sim_set_rate {
        match sim_inputs {
            Some(inputs) => spawn_operator(
                inputs,
                cfg,
                ctx.handoff.committed(),
                table,
                rate,
                Arc::clone(&shutdown),
            )?,
            None => tracing::warn!("--sim-set-rate ignored: inputs are not simulated"),
        }
    }

    let summary = vent_core::run(
        controller,
        &mut foreground,
        MonotonicClock::new(),
        rt_hook(args),
        &shutdown,
    )?;
    let committed = ctx.handoff.committed();
    print_summary(&summary, &committed, args.json);
    if args.stats {
        print_stats(&summary);
    }
    Ok(())
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn collaborators(cfg: &Config) -> Result<Parts> {
    use vent_hardware::sim::PatientEffort;

    let inputs = SimInputs::new();
    let pressure = SimPressure::new(sim_raw_for(cfg, cfg.spontaneous.threshold_cm_h2o + 10.0))
        .with_effort(PatientEffort {
            period: sim_effort_period(cfg),
            width: 5,
            raw: sim_raw_for(cfg, cfg.spontaneous.threshold_cm_h2o - 1.0),
        });
    tracing::info!("using simulated actuator, pressure sensor and inputs");
    Ok(Parts {
        actuator: Box::new(SimActuator::new()),
        pressure: Box::new(pressure),
        indicator: Box::new(SimIndicator::new()),
        inputs: Box::new(inputs.clone()),
        sim_inputs: Some(inputs),
    })
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn collaborators(cfg: &Config) -> Result<Parts> {
    use vent_hardware::hardware::{
        GpioIndicator, GpioInputs, InputPins, Mcp3008Pressure, PwmActuator,
    };

    let p = &cfg.pins;
    let inputs = GpioInputs::new(InputPins {
        rotary_clk: p.rotary_clk,
        rotary_dt: p.rotary_dt,
        select: p.select,
        confirm: p.confirm,
        cancel: p.cancel,
    })
    .wrap_err("open input pins")?;
    let indicator =
        GpioIndicator::new(p.inhale_led, p.exhale_led).wrap_err("open indicator pins")?;
    let actuator =
        PwmActuator::new(cfg.actuator.pwm_frequency_hz).wrap_err("open PWM actuator")?;
    let pressure =
        Mcp3008Pressure::new(p.pressure_adc_channel).wrap_err("open MCP3008 pressure ADC")?;
    tracing::info!(
        inhale_led = p.inhale_led,
        exhale_led = p.exhale_led,
        adc_channel = p.pressure_adc_channel,
        "hardware collaborators ready"
    );
    Ok(Parts {
        actuator: Box::new(actuator),
        pressure: Box::new(pressure),
        indicator: Box::new(indicator),
        inputs: Box::new(inputs),
        sim_inputs: None,
    })
}

/// Raw reading that converts to `cm_h2o` under the configured scale.
#[cfg(not(all(feature = "hardware", target_os = "linux")))]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn sim_raw_for(cfg: &Config, cm_h2o: f32) -> u32 {
    let raw = (cm_h2o - cfg.pressure.constant) / cfg.pressure.multiplier;
    raw.max(0.0).round() as u32
}

/// One simulated inspiratory effort every two seconds of ticks.
#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn sim_effort_period(cfg: &Config) -> u32 {
    let period = Duration::from_micros(cfg.timing.tick_period_us);
    ticks_per_minute(period) / 30
}

/// Play the gestures that set the respiratory rate to `target` through the
/// settings editor: hold Confirm to enter, turn the knob on the rate, click
/// Select past every parameter.
fn spawn_operator(
    inputs: SimInputs,
    cfg: &Config,
    current: ParameterSet,
    table: ParameterTable,
    target: u32,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    let poll = Duration::from_millis(cfg.editor.poll_interval_ms);
    let pace = (poll * 10).max(Duration::from_millis(20));
    let entry_hold = Duration::from_millis(cfg.editor.entry_hold_ms) + pace * 4;
    let edit_mode = cfg.editor.edit_mode;

    let spec = table.get(ParameterKind::RespiratoryRate);
    let target = spec.clamp(i64::from(target));
    let detents = (i64::from(target) - i64::from(current.respiratory_rate()))
        / i64::from(spec.step.max(1));
    let detents = i32::try_from(detents).unwrap_or(0);

    std::thread::Builder::new()
        .name("vent-operator".into())
        .spawn(move || {
            let mut op = SimOperator::new(inputs, pace);
            op.pause(10);
            op.hold(InputPin::Confirm, entry_hold);
            op.pause(2);
            if edit_mode {
                op.click(InputPin::Select);
            }
            for kind in ParameterKind::ALL {
                if shutdown.load(Ordering::Acquire) {
                    return;
                }
                op.pause(2);
                if kind == ParameterKind::RespiratoryRate {
                    op.turn(detents);
                }
                op.click(InputPin::Select);
            }
            tracing::info!(rate = target, "operator finished editing");
        })
        .wrap_err("spawn simulated operator")?;
    Ok(())
}

#[cfg(all(feature = "rt", target_os = "linux"))]
fn rt_hook(args: &RunArgs) -> Box<dyn FnOnce() + Send> {
    use vent_hardware::rt::{MemLock, RtOptions};

    if !args.rt {
        return Box::new(|| {});
    }
    let opts = RtOptions {
        priority: args.rt_prio,
        cpu: args.rt_cpu,
        lock: match args.rt_lock.unwrap_or(RtLock::None) {
            RtLock::None => MemLock::None,
            RtLock::Current => MemLock::Current,
            RtLock::All => MemLock::All,
        },
    };
    Box::new(move || {
        let _ = vent_hardware::rt::apply(&opts);
    })
}

#[cfg(not(all(feature = "rt", target_os = "linux")))]
fn rt_hook(args: &RunArgs) -> Box<dyn FnOnce() + Send> {
    if args.rt {
        tracing::warn!(
            prio = ?args.rt_prio,
            cpu = ?args.rt_cpu,
            lock = ?args.rt_lock,
            "--rt needs the `rt` feature on Linux; running without real-time settings"
        );
    }
    Box::new(|| {})
}

fn print_summary(s: &RunSummary, committed: &ParameterSet, json: bool) {
    let t = &s.telemetry;
    if json {
        let obj = json!({
            "breaths": t.breaths,
            "triggered_breaths": t.triggered_breaths,
            "commits": s.foreground.commits,
            "pickups": s.pickups,
            "missed_deadlines": s.overruns,
            "ticks": s.ticks,
            "elapsed_ms": u64::try_from(s.elapsed.as_millis()).unwrap_or(u64::MAX),
            "mode": t.mode.label(),
            "respiratory_rate": committed.respiratory_rate(),
            "ie_ratio_x100": committed.ie_ratio_x100(),
            "tidal_volume": committed.tidal_volume(),
        });
        println!("{obj}");
        return;
    }
    println!(
        "Ventilation stopped after {:.1} s: {} breaths ({} patient-triggered), {} commits picked up, {} missed deadlines",
        s.elapsed.as_secs_f64(),
        t.breaths,
        t.triggered_breaths,
        s.pickups,
        s.overruns
    );
    println!(
        "Settings: {} {} bpm, I:E {}.{:02}, {} ml",
        t.mode.label(),
        committed.respiratory_rate(),
        committed.ie_ratio_x100() / 100,
        committed.ie_ratio_x100() % 100,
        committed.tidal_volume()
    );
}

fn print_stats(s: &RunSummary) {
    let fg = &s.foreground;
    eprintln!(
        "stats: ticks={} overruns={} publishes={} pickups={} fg_iterations={} commits={} cancels={} rejected_entries={} ticks_per_inhale={} ticks_per_exhale={}",
        s.ticks,
        s.overruns,
        s.publishes,
        s.pickups,
        fg.iterations,
        fg.commits,
        fg.cancels,
        fg.rejected_entries,
        s.telemetry.timing.ticks_per_inhale,
        s.telemetry.timing.ticks_per_exhale
    );
}

pub fn timing(cfg: &Config, rate: Option<u32>, ie: Option<u32>, json: bool) -> Result<()> {
    let table = ParameterTable::from(&cfg.parameters);
    let rate_spec = table.get(ParameterKind::RespiratoryRate);
    let ie_spec = table.get(ParameterKind::InspiratoryExpiratoryRatio);
    let rate = rate.unwrap_or(rate_spec.default);
    let ie = ie.unwrap_or(ie_spec.default);
    if rate == 0 || ie == 0 {
        eyre::bail!("rate and I:E ratio must both be >= 1 (got rate={rate}, ie={ie})");
    }
    if rate_spec.clamp(i64::from(rate)) != rate || ie_spec.clamp(i64::from(ie)) != ie {
        tracing::warn!(rate, ie, "values are outside the configured parameter bounds");
    }

    let period = Duration::from_micros(cfg.timing.tick_period_us);
    let t = CycleTiming::compute(rate, ie, ticks_per_minute(period));
    let inhale_ms = ticks_to_duration(t.ticks_per_inhale, period).as_millis();
    let exhale_ms = ticks_to_duration(t.ticks_per_exhale, period).as_millis();

    if json {
        let obj = json!({
            "rate": rate,
            "ie_ratio_x100": ie,
            "tick_period_us": cfg.timing.tick_period_us,
            "ticks_per_inhale": t.ticks_per_inhale,
            "ticks_per_exhale": t.ticks_per_exhale,
            "inhale_ms": u64::try_from(inhale_ms).unwrap_or(u64::MAX),
            "exhale_ms": u64::try_from(exhale_ms).unwrap_or(u64::MAX),
        });
        println!("{obj}");
    } else {
        println!(
            "rate {rate} bpm, I:E {}.{:02}: inhale {} ticks ({inhale_ms} ms), exhale {} ticks ({exhale_ms} ms)",
            ie / 100,
            ie % 100,
            t.ticks_per_inhale,
            t.ticks_per_exhale
        );
    }
    Ok(())
}

/// Build every runtime piece from the config without starting the tick thread.
pub fn self_check(cfg: &Config) -> Result<()> {
    let table = ParameterTable::from(&cfg.parameters);
    let store = ParameterStore::new(table, VentilationMode::from(&cfg.spontaneous))?;
    let waveform = DriveWaveform::try_from(&cfg.actuator)?;
    let samples = waveform.len();
    let controller = build_controller(
        SimActuator::new(),
        SimPressure::new(0),
        SimIndicator::new(),
        waveform,
        VentContext::new(store),
        ControllerCfg::from(cfg),
        None,
    )?;
    let timing = controller.timing();
    tracing::info!(
        waveform_samples = samples,
        ticks_per_inhale = timing.ticks_per_inhale,
        ticks_per_exhale = timing.ticks_per_exhale,
        "self-check passed"
    );
    println!("self-check ok");
    Ok(())
}
