//! Tunable settings: bounds, defaults, the staged copy and the committed store.

use crate::error::{BuildError, Result};
use crate::fixed_point::clamp_i64_to_u32;

/// The clinician-set quantities, in edit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    InspiratoryPressure,
    RespiratoryRate,
    TidalVolume,
    /// I:E ratio scaled by 100 (150 means 1:1.50).
    InspiratoryExpiratoryRatio,
}

impl ParameterKind {
    pub const COUNT: usize = 4;
    pub const ALL: [Self; Self::COUNT] = [
        Self::InspiratoryPressure,
        Self::RespiratoryRate,
        Self::TidalVolume,
        Self::InspiratoryExpiratoryRatio,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::InspiratoryPressure => 0,
            Self::RespiratoryRate => 1,
            Self::TidalVolume => 2,
            Self::InspiratoryExpiratoryRatio => 3,
        }
    }

    /// Short label sized for a 16-character display line.
    pub const fn label(self) -> &'static str {
        match self {
            Self::InspiratoryPressure => "Insp press",
            Self::RespiratoryRate => "Resp rate",
            Self::TidalVolume => "Tidal",
            Self::InspiratoryExpiratoryRatio => "I:E ratio",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::InspiratoryPressure => "inspiratory_pressure",
            Self::RespiratoryRate => "respiratory_rate",
            Self::TidalVolume => "tidal_volume",
            Self::InspiratoryExpiratoryRatio => "ie_ratio",
        }
    }

    pub const fn unit(self) -> &'static str {
        match self {
            Self::InspiratoryPressure => "cmH2O",
            Self::RespiratoryRate => "bpm",
            Self::TidalVolume => "ml",
            Self::InspiratoryExpiratoryRatio => "x100",
        }
    }
}

/// IPPV delivers every breath on the clock; Spontaneous also lets a pressure
/// drop during exhale start the next breath early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VentilationMode {
    #[default]
    Ippv,
    Spontaneous,
}

impl VentilationMode {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ippv => "IPPV",
            Self::Spontaneous => "Spontaneous",
        }
    }

    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Ippv => Self::Spontaneous,
            Self::Spontaneous => Self::Ippv,
        }
    }

    pub const fn is_spontaneous(self) -> bool {
        matches!(self, Self::Spontaneous)
    }
}

/// Bounds and nudge size for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterSpec {
    pub min: u32,
    pub max: u32,
    pub default: u32,
    pub step: u32,
}

impl ParameterSpec {
    pub const fn new(min: u32, max: u32, default: u32, step: u32) -> Self {
        Self {
            min,
            max,
            default,
            step,
        }
    }

    #[inline]
    pub fn clamp(&self, candidate: i64) -> u32 {
        clamp_i64_to_u32(candidate, self.min, self.max)
    }

    fn validate(&self, kind: ParameterKind) -> Result<()> {
        if self.step == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "parameter step must be > 0",
            )));
        }
        if self.min > self.max {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "parameter min must be <= max",
            )));
        }
        if !(self.min..=self.max).contains(&self.default) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "parameter default must lie within [min, max]",
            )));
        }
        // both are divisors in the cycle-timing arithmetic
        match kind {
            ParameterKind::RespiratoryRate if self.min == 0 => Err(eyre::Report::new(
                BuildError::InvalidConfig("respiratory rate min must be >= 1"),
            )),
            ParameterKind::InspiratoryExpiratoryRatio if self.min == 0 => {
                Err(eyre::Report::new(BuildError::InvalidConfig(
                    "I:E ratio min must be >= 1",
                )))
            }
            _ => Ok(()),
        }
    }
}

/// One spec per kind, indexed by `ParameterKind::index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterTable {
    specs: [ParameterSpec; ParameterKind::COUNT],
}

impl Default for ParameterTable {
    fn default() -> Self {
        Self {
            specs: [
                ParameterSpec::new(5, 20, 15, 1),
                ParameterSpec::new(10, 30, 20, 1),
                ParameterSpec::new(200, 700, 250, 10),
                ParameterSpec::new(20, 300, 100, 20),
            ],
        }
    }
}

impl ParameterTable {
    #[inline]
    pub fn get(&self, kind: ParameterKind) -> ParameterSpec {
        self.specs[kind.index()]
    }

    pub fn with(mut self, kind: ParameterKind, spec: ParameterSpec) -> Self {
        self.specs[kind.index()] = spec;
        self
    }

    pub fn validate(&self) -> Result<()> {
        ParameterKind::ALL
            .iter()
            .try_for_each(|&k| self.get(k).validate(k))
    }

    fn defaults(&self) -> ParameterSet {
        let mut set = ParameterSet::default();
        for kind in ParameterKind::ALL {
            set.set(kind, self.get(kind).default);
        }
        set
    }
}

/// A full copy of every parameter value plus the ventilation mode.
///
/// Used both as the editor's staged copy and as the hand-off payload. Values
/// are not range-checked here; the store clamps on commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParameterSet {
    values: [u32; ParameterKind::COUNT],
    pub mode: VentilationMode,
}

impl ParameterSet {
    #[inline]
    pub fn get(&self, kind: ParameterKind) -> u32 {
        self.values[kind.index()]
    }

    #[inline]
    pub fn set(&mut self, kind: ParameterKind, value: u32) {
        self.values[kind.index()] = value;
    }

    #[inline]
    pub fn respiratory_rate(&self) -> u32 {
        self.get(ParameterKind::RespiratoryRate)
    }

    #[inline]
    pub fn ie_ratio_x100(&self) -> u32 {
        self.get(ParameterKind::InspiratoryExpiratoryRatio)
    }

    #[inline]
    pub fn tidal_volume(&self) -> u32 {
        self.get(ParameterKind::TidalVolume)
    }
}

/// Authoritative parameter values. Every value stays within its bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterStore {
    table: ParameterTable,
    current: ParameterSet,
}

impl Default for ParameterStore {
    fn default() -> Self {
        let table = ParameterTable::default();
        Self {
            current: table.defaults(),
            table,
        }
    }
}

impl ParameterStore {
    /// Validate the bounds table and start every parameter at its default.
    pub fn new(table: ParameterTable, mode: VentilationMode) -> Result<Self> {
        table.validate()?;
        let mut current = table.defaults();
        current.mode = mode;
        Ok(Self { table, current })
    }

    #[inline]
    pub fn table(&self) -> &ParameterTable {
        &self.table
    }

    #[inline]
    pub fn spec(&self, kind: ParameterKind) -> ParameterSpec {
        self.table.get(kind)
    }

    #[inline]
    pub fn get(&self, kind: ParameterKind) -> u32 {
        self.current.get(kind)
    }

    #[inline]
    pub fn mode(&self) -> VentilationMode {
        self.current.mode
    }

    /// Clamp a candidate value into the bounds of `kind`.
    #[inline]
    pub fn clamp(&self, kind: ParameterKind, candidate: i64) -> u32 {
        self.spec(kind).clamp(candidate)
    }

    /// Store a candidate after clamping; returns the stored value.
    pub fn set_clamped(&mut self, kind: ParameterKind, candidate: i64) -> u32 {
        let v = self.clamp(kind, candidate);
        self.current.set(kind, v);
        v
    }

    #[inline]
    pub fn snapshot(&self) -> ParameterSet {
        self.current
    }

    /// Replace every value at once, clamping each into bounds.
    pub fn commit(&mut self, set: &ParameterSet) {
        for kind in ParameterKind::ALL {
            self.set_clamped(kind, i64::from(set.get(kind)));
        }
        self.current.mode = set.mode;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_reference_table() {
        let store = ParameterStore::default();
        assert_eq!(store.get(ParameterKind::InspiratoryPressure), 15);
        assert_eq!(store.get(ParameterKind::RespiratoryRate), 20);
        assert_eq!(store.get(ParameterKind::TidalVolume), 250);
        assert_eq!(store.get(ParameterKind::InspiratoryExpiratoryRatio), 100);
        assert_eq!(store.mode(), VentilationMode::Ippv);
    }

    #[test]
    fn zero_rate_minimum_is_rejected() {
        let table = ParameterTable::default().with(
            ParameterKind::RespiratoryRate,
            ParameterSpec::new(0, 30, 20, 1),
        );
        let err = ParameterStore::new(table, VentilationMode::Ippv).unwrap_err();
        assert!(err.to_string().contains("respiratory rate"));
    }

    #[test]
    fn commit_clamps_out_of_range_values() {
        let mut store = ParameterStore::default();
        let mut set = store.snapshot();
        set.set(ParameterKind::TidalVolume, 10_000);
        set.set(ParameterKind::RespiratoryRate, 0);
        set.mode = VentilationMode::Spontaneous;
        store.commit(&set);
        assert_eq!(store.get(ParameterKind::TidalVolume), 700);
        assert_eq!(store.get(ParameterKind::RespiratoryRate), 10);
        assert_eq!(store.mode(), VentilationMode::Spontaneous);
    }

    #[test]
    fn index_matches_all_order() {
        for (i, k) in ParameterKind::ALL.iter().enumerate() {
            assert_eq!(k.index(), i);
        }
    }
}
