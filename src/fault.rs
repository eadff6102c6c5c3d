//! Fault codes and the in-memory fault table.

use strum::EnumCount;

/// Everything the payload knows how to report. The numeric values are shared
/// with the ground segment and with the persisted record layout, so codes
/// must only ever be appended.
#[derive(strum::FromRepr, strum::Display, strum::EnumCount, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FaultCode {
    UnexpectedRestart = 0,
    FaultLogOverflow,

    // Temperature
    AnalogTooHot,
    AnalogTooCold,
    DigitalTooHot,
    DigitalTooCold,
    OpticsTooHot,
    OpticsTooCold,

    // Persistence
    EepromCorrupted,
}

impl FaultCode {
    /// Number of defined codes, which is also the persisted table length.
    pub const COUNT: usize = <Self as EnumCount>::COUNT;

    pub(crate) fn all() -> impl Iterator<Item = FaultCode> {
        (0..Self::COUNT as u8).filter_map(FaultCode::from_repr)
    }
}

/// Lifetime record of one fault code. Lives in the table for the whole
/// mission; it is reset, never destroyed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaultReport {
    /// Times this code has been logged, saturating at 255.
    pub occurrences: u8,
    /// Boot count at the most recent occurrence.
    pub start_num: u16,
    /// Millisecond clock reading at the most recent occurrence.
    pub timestamp: u32,
    /// Set when a corrective action is due. Transient, never persisted.
    pub pending_action: bool,
}

/// Fixed-size table, one report per fault code.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FaultTable {
    reports: [FaultReport; FaultCode::COUNT],
}

impl FaultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, code: FaultCode) -> &FaultReport {
        &self.reports[code as usize]
    }

    pub(crate) fn report_mut(&mut self, code: FaultCode) -> &mut FaultReport {
        &mut self.reports[code as usize]
    }

    /// Reports in ascending code order, the order the record layout uses.
    pub fn iter(&self) -> impl Iterator<Item = (FaultCode, &FaultReport)> {
        FaultCode::all().map(|code| (code, &self.reports[code as usize]))
    }

    pub fn reset(&mut self) {
        self.reports = Default::default();
    }
}
