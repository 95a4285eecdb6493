use std::time::Duration;

use rstest::rstest;
use vent_core::error::BuildError;
use vent_core::mocks::{FixedPressure, NullActuator};
use vent_core::{ControllerCfg, DriveWaveform, DynController, SpontaneousCfg};

#[rstest]
fn builder_missing_actuator_yields_typed_build_error() {
    let err = DynController::builder()
        .with_pressure_sensor(FixedPressure(0))
        .try_build()
        .expect_err("should fail with MissingActuator");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingActuator) => {}
        other => panic!("expected MissingActuator, got: {other:?}"),
    }
}

#[rstest]
fn builder_missing_pressure_sensor_yields_typed_build_error() {
    let err = DynController::builder()
        .with_actuator(NullActuator)
        .try_build()
        .expect_err("should fail with MissingPressureSensor");

    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::MissingPressureSensor)
    ));
}

#[rstest]
fn builder_with_defaults_builds() {
    let c = DynController::builder()
        .with_actuator(NullActuator)
        .with_pressure_sensor(FixedPressure(500))
        .build()
        .unwrap();
    assert_eq!(c.timing().ticks_per_breath(), 300);
}

#[rstest]
#[case::zero_tick(ControllerCfg { tick_period: Duration::ZERO, ..ControllerCfg::default() })]
#[case::coarse_tick(ControllerCfg { tick_period: Duration::from_secs(1), ..ControllerCfg::default() })]
#[case::nan_threshold(ControllerCfg {
    spontaneous: SpontaneousCfg { threshold_cm_h2o: f32::NAN, ..SpontaneousCfg::default() },
    ..ControllerCfg::default()
})]
#[case::zero_window(ControllerCfg {
    spontaneous: SpontaneousCfg { smoothing_window: 0, ..SpontaneousCfg::default() },
    ..ControllerCfg::default()
})]
fn invalid_config_is_rejected(#[case] cfg: ControllerCfg) {
    let err = DynController::builder()
        .with_actuator(NullActuator)
        .with_pressure_sensor(FixedPressure(500))
        .with_config(cfg)
        .build()
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::InvalidConfig(_))
    ));
}

#[rstest]
fn waveform_above_full_scale_is_rejected() {
    assert!(DriveWaveform::from_samples(&[0, 10, 2000], 1023).is_err());
    assert!(DriveWaveform::from_samples(&[5], 1023).is_err());
}
