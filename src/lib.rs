#![doc = include_str!("../README.md")]
#![cfg_attr(not(target_arch = "x86_64"), no_std)]

pub mod bits;
pub mod error;
pub mod fault;
pub mod file;
pub mod hamming;
pub mod platform;
pub mod store;

pub use crate::fault::FaultCode;
pub use crate::platform::Actuator;
pub use crate::store::LoadOutcome;

extern crate alloc;

use crate::error::Error;
use crate::fault::{FaultReport, FaultTable};
use crate::platform::{ModeControl, Platform};
use crate::store::{PayloadData, PersistentStore};
#[cfg(feature = "defmt")]
use defmt::{info, warn};

/// Owner of the fault table and the persistent store, and the only entry
/// point the rest of the flight software talks to.
///
/// Fault *detection* (counters, timestamps) always happens. Fault *messaging*
/// and fault *correction* are suppressed independently through
/// [`Self::set_fault_reporting`] and [`Self::set_fault_actions`], so the
/// payload can run observe-only during commissioning.
pub struct FaultManager<P: Platform> {
    store: PersistentStore<P>,
    table: FaultTable,
    save_required: bool,
    reporting_enabled: bool,
    actions_enabled: bool,
}

impl<P: Platform> FaultManager<P> {
    /// Corrective action starts disabled and is switched on by ground
    /// command once commissioning is done.
    pub fn new(hal: P) -> Result<Self, Error> {
        Ok(Self {
            store: PersistentStore::new(hal)?,
            table: FaultTable::new(),
            save_required: false,
            reporting_enabled: true,
            actions_enabled: false,
        })
    }

    /// Boot-time recovery. Loads the freshest valid record; on a corrupted
    /// device the defaults stand and [`FaultCode::EepromCorrupted`] is
    /// logged. A successfully decoded record pushes the recovered science
    /// mode back to the mode accessor.
    pub fn restore(&mut self) -> Result<LoadOutcome, Error> {
        let outcome = self.store.load(&mut self.table)?;

        match outcome {
            LoadOutcome::Restored(_) => {
                let mode = self.store.payload.recovered_mode;
                self.store.hal.set_mode(mode);
            }
            LoadOutcome::Corrupted => {
                #[cfg(feature = "defmt")]
                warn!("restore: no recoverable slot, defaults applied");
                self.log_fault(FaultCode::EepromCorrupted);
            }
            LoadOutcome::FreshDevice => {}
        }

        Ok(outcome)
    }

    /// Counts this boot and classifies it. A reset without a preceding
    /// [`Self::prepare_for_restart`] is unplanned: it logs
    /// [`FaultCode::UnexpectedRestart`] and bumps the consecutive-bad-restart
    /// counter. Saves either way so the verdict survives the next reset.
    pub fn record_new_start(&mut self) -> Result<usize, Error> {
        let unplanned = self.store.record_new_start();
        if unplanned {
            self.log_fault(FaultCode::UnexpectedRestart);
        }

        let rewritten = self.store.save(&self.table)?;
        self.save_required = false;
        Ok(rewritten)
    }

    /// Arms the expecting-restart sentinel and captures the current science
    /// mode, then saves. Call only right before a commanded restart.
    pub fn prepare_for_restart(&mut self) -> Result<usize, Error> {
        let rewritten = self.store.prepare_for_restart(&self.table)?;
        self.save_required = false;
        Ok(rewritten)
    }

    /// Records one occurrence of `code`. Start number and timestamp are
    /// refreshed on every call; the occurrence counter saturates at 255.
    /// A corrective action goes pending only on the first occurrence and on
    /// saturation, so chronic faults do not retrigger on every repeat.
    pub fn log_fault(&mut self, code: FaultCode) {
        let start_num = self.store.payload().start_count;
        let timestamp = self.store.now_ms();

        let report = self.table.report_mut(code);
        report.start_num = start_num;
        report.timestamp = timestamp;

        if report.occurrences < u8::MAX {
            report.occurrences += 1;
            if report.occurrences == 1 || report.occurrences == u8::MAX {
                report.pending_action = true;
            }
        }
        self.save_required = true;

        if self.reporting_enabled {
            #[cfg(feature = "defmt")]
            info!("fault: {} x{}", code, report.occurrences);

            #[cfg(feature = "debug-logs")]
            println!("  faults: {} x{}", code, report.occurrences);
        }
    }

    /// Range-checked entry point for raw code bytes from the command link.
    /// An unknown code is warned about and ignored, nothing is mutated.
    pub fn log_fault_raw(&mut self, raw: u8) {
        match FaultCode::from_repr(raw) {
            Some(code) => self.log_fault(code),
            None => {
                #[cfg(feature = "defmt")]
                warn!("rejected fault log with invalid code {}", raw);

                #[cfg(feature = "debug-logs")]
                println!("  faults: rejected invalid code {raw}");
            }
        }
    }

    /// Persists any accumulated fault state, then dispatches pending
    /// corrective actions. Persisting first means an action that restarts
    /// the payload cannot lose the fault that caused it; a device error
    /// aborts before any pending flag is cleared so the next pass retries.
    ///
    /// With the action switch off, pending flags are still consumed but no
    /// actuator is touched.
    pub fn handle_faults(&mut self, actions: &mut impl Actuator) -> Result<(), Error> {
        if self.save_required {
            self.store.save(&self.table)?;
            self.save_required = false;
        }

        for code in FaultCode::all() {
            let report = self.table.report_mut(code);
            if !report.pending_action {
                continue;
            }
            report.pending_action = false;

            if !self.actions_enabled {
                continue;
            }
            Self::dispatch_action(code, actions);
        }
        Ok(())
    }

    fn dispatch_action(code: FaultCode, actions: &mut impl Actuator) {
        match code {
            FaultCode::UnexpectedRestart | FaultCode::EepromCorrupted => {
                actions.enter_safe_mode();
            }
            FaultCode::AnalogTooHot
            | FaultCode::AnalogTooCold
            | FaultCode::DigitalTooHot
            | FaultCode::DigitalTooCold
            | FaultCode::OpticsTooHot
            | FaultCode::OpticsTooCold => {
                actions.set_heater_override(false);
            }
            FaultCode::FaultLogOverflow => {
                #[cfg(feature = "defmt")]
                info!("no corrective action for {}", code);

                #[cfg(feature = "debug-logs")]
                println!("  faults: no corrective action for {code}");
            }
        }
    }

    /// Zeroes every occurrence counter and saves.
    pub fn reset_fault_counts(&mut self) -> Result<usize, Error> {
        self.table.reset();
        let rewritten = self.store.save(&self.table)?;
        self.save_required = false;
        Ok(rewritten)
    }

    /// Resets counters, flags and the fault table to defaults and saves.
    /// The write counter is kept so version ordering in the ring stays
    /// intact; use [`Self::erase_device`] to also restart the counter.
    pub fn reset_persistent_data(&mut self) -> Result<usize, Error> {
        let write_counter = self.store.payload.write_counter;
        self.store.payload = PayloadData {
            write_counter,
            ..PayloadData::default()
        };
        self.table.reset();

        let rewritten = self.store.save(&self.table)?;
        self.save_required = false;
        Ok(rewritten)
    }

    /// Wipes the whole device to the erased pattern, resets everything to
    /// defaults and writes a fresh first record.
    pub fn erase_device(&mut self) -> Result<usize, Error> {
        self.store.erase_device()?;
        self.store.payload = PayloadData::default();
        self.table.reset();

        let rewritten = self.store.save(&self.table)?;
        self.save_required = false;
        Ok(rewritten)
    }

    pub fn report(&self, code: FaultCode) -> &FaultReport {
        self.table.report(code)
    }

    pub fn table(&self) -> &FaultTable {
        &self.table
    }

    pub fn payload(&self) -> &PayloadData {
        self.store.payload()
    }

    /// Suppress or allow fault messages. Detection is not affected.
    pub fn set_fault_reporting(&mut self, enabled: bool) {
        self.reporting_enabled = enabled;
    }

    /// Suppress or allow corrective action. Detection is not affected.
    pub fn set_fault_actions(&mut self, enabled: bool) {
        self.actions_enabled = enabled;
    }

    /// True when fault state has changed since the last save.
    pub fn save_pending(&self) -> bool {
        self.save_required
    }
}
