//! Human-readable error descriptions and structured JSON error formatting.

use vent_core::error::{BuildError, VentError};
use vent_hardware::HwError;

fn find<E: std::error::Error + 'static>(err: &eyre::Report) -> Option<&E> {
    err.chain().find_map(|e| e.downcast_ref::<E>())
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = find::<BuildError>(err) {
        return match be {
            BuildError::MissingActuator => {
                "What happened: No actuator was provided to the controller.\nLikely causes: The actuator driver failed to initialize or was not wired into the builder.\nHow to fix: Ensure the actuator is created successfully and passed via with_actuator(...).".to_string()
            }
            BuildError::MissingPressureSensor => {
                "What happened: No pressure sensor was provided to the controller.\nLikely causes: The ADC failed to initialize or was not wired into the builder.\nHow to fix: Ensure the pressure sensor is created successfully and passed via with_pressure_sensor(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: The controller rejected its configuration ({msg}).\nLikely causes: Parameter bounds, tick period or waveform values that cannot work together.\nHow to fix: Edit the [parameters], [timing] or [actuator] sections of the config, then rerun `vent_cli self-check`."
            ),
        };
    }

    if let Some(VentError::Config(msg)) = find::<VentError>(err) {
        return format!(
            "What happened: The configuration could not be used ({msg}).\nLikely causes: Missing file, TOML syntax error, or out-of-range values.\nHow to fix: Pass --config with a valid file (see etc/vent_config.toml) and fix the named key."
        );
    }

    if let Some(hw) = find::<HwError>(err) {
        return match hw {
            HwError::AdcChannel(ch) => format!(
                "What happened: MCP3008 channel {ch} does not exist.\nLikely causes: pins.pressure_adc_channel out of range.\nHow to fix: Use a channel in 0..=7."
            ),
            HwError::Rt(msg) => format!(
                "What happened: Real-time setup failed ({msg}).\nLikely causes: Missing CAP_SYS_NICE or CAP_IPC_LOCK, or a low 'ulimit -l'.\nHow to fix: Run with the needed capabilities or drop --rt."
            ),
            other => format!(
                "What happened: Hardware initialization failed ({other}).\nLikely causes: Incorrect pin numbers, SPI or PWM not enabled, or insufficient GPIO permissions.\nHow to fix: Check the [pins] section, enable SPI and PWM overlays, and make sure the process can access /dev/gpiomem."
            ),
        };
    }

    if let Some(de) = find::<VentError>(err) {
        return format!(
            "What happened: {de}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
        );
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("waveform csv") {
        return format!(
            "What happened: The custom waveform could not be loaded ({msg}).\nLikely causes: Wrong path, missing 'drive' header, or fewer than two samples.\nHow to fix: Fix actuator.waveform_csv or remove it to use the built-in profile."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 2 config, 3 hardware, 4 build, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if find::<BuildError>(err).is_some() {
        return 4;
    }
    if matches!(find::<VentError>(err), Some(VentError::Config(_))) {
        return 2;
    }
    if find::<HwError>(err).is_some() {
        return 3;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    match exit_code_for_error(err) {
        2 => "Config",
        3 => "Hardware",
        4 => "Build",
        _ => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}
