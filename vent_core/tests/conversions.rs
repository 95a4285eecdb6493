use std::time::Duration;

use vent_core::{
    ButtonPolarity, ControllerCfg, DriveWaveform, EditorCfg, ForegroundCfg, ParameterKind,
    ParameterTable, TriggerSource, VentilationMode, WaveformProfile,
};

#[test]
fn default_config_maps_to_runtime_defaults() {
    let cfg = vent_config::Config::default();
    assert_eq!(ControllerCfg::from(&cfg), ControllerCfg::default());
    assert_eq!(EditorCfg::from(&cfg.editor), EditorCfg::default());
    assert_eq!(ForegroundCfg::from(&cfg), ForegroundCfg::default());
    assert_eq!(ParameterTable::from(&cfg.parameters), ParameterTable::default());
    assert_eq!(ButtonPolarity::from(&cfg.buttons), ButtonPolarity::ActiveLow);
    assert_eq!(VentilationMode::from(&cfg.spontaneous), VentilationMode::Ippv);
}

#[test]
fn overrides_flow_through() {
    let cfg = vent_config::load_toml(
        r#"
        [timing]
        tick_period_us = 5000

        [parameters.respiratory_rate]
        max = 40

        [spontaneous]
        enabled = true
        trigger_source = "smoothed"
        smoothing_window = 8

        [editor]
        entry_hold_ms = 250
        edit_mode = true

        [buttons]
        active_low = false

        [actuator]
        profile = "servo"
        "#,
    )
    .unwrap();

    let ctrl = ControllerCfg::from(&cfg);
    assert_eq!(ctrl.tick_period, Duration::from_millis(5));
    assert_eq!(ctrl.spontaneous.source, TriggerSource::Smoothed);
    assert_eq!(ctrl.spontaneous.smoothing_window, 8);

    let table = ParameterTable::from(&cfg.parameters);
    assert_eq!(table.get(ParameterKind::RespiratoryRate).max, 40);
    assert_eq!(table.get(ParameterKind::RespiratoryRate).min, 10);

    let ed = EditorCfg::from(&cfg.editor);
    assert_eq!(ed.entry_hold, Duration::from_millis(250));
    assert!(ed.edit_mode);

    assert_eq!(ButtonPolarity::from(&cfg.buttons), ButtonPolarity::ActiveHigh);
    assert_eq!(VentilationMode::from(&cfg.spontaneous), VentilationMode::Spontaneous);

    let w = DriveWaveform::try_from(&cfg.actuator).unwrap();
    assert_eq!(w.full_scale(), 2400);
    assert_eq!(
        w.full_scale(),
        DriveWaveform::builtin(WaveformProfile::Servo).full_scale()
    );
}
