use thiserror::Error;

/// Errors that can surface from the persistence subsystem. Marked
/// non-exhaustive so variants can be added without breaking callers.
///
/// Note that stored-data corruption is deliberately absent here: scrub
/// results and fault-log entries carry it instead, and the subsystem keeps
/// running on defaults. Only device-level failures become `Err`.
#[derive(Error, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// The EEPROM primitive reported a read or write failure. The device
    /// error itself is not preserved.
    #[error("eeprom device error")]
    Eeprom,

    /// The device is too small to hold even one encoded record slot.
    #[error("eeprom capacity below one record slot")]
    CapacityTooSmall,
}
