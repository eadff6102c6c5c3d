//! Versioned, wear-leveled record log on a byte-addressed EEPROM.
//!
//! Each save serializes the payload header plus the full fault table,
//! Hamming-encodes the record and writes it to the slot selected by the
//! write counter. Slots form a circular, append-only version log: a fresh
//! save never overwrites the previous record, and boot-time recovery picks
//! the valid slot with the freshest counter. Writes are differential, only
//! bytes that changed are rewritten.

use crate::error::Error;
use crate::fault::{FaultCode, FaultTable};
use crate::file::{EncodedFile, ScrubReport};
use crate::hamming::MSG_SIZE;
use crate::platform::{Clock, ModeControl, Platform};
use alloc::vec;
use alloc::vec::Vec;
#[cfg(feature = "defmt")]
use defmt::trace;
use embedded_storage::{ReadStorage, Storage};

/// Schema version of the persisted record. Bump when the layout changes so
/// old images are rejected instead of misread.
pub const RECORD_VERSION: u8 = 1;

/// Value of the expecting-restart byte written only by a commanded restart.
/// Any other value at boot means the reset was unplanned.
pub(crate) const RESTART_SENTINEL: u8 = 0xAA;

const HEADER_BYTES: usize = 11;
const FAULT_ENTRY_BYTES: usize = 7;

/// Decoded record size: header plus one entry per fault code.
pub const RECORD_BYTES: usize = HEADER_BYTES + FaultCode::COUNT * FAULT_ENTRY_BYTES;
/// Hamming blocks needed to cover one record.
pub const RECORD_BLOCKS: usize = RECORD_BYTES.div_ceil(MSG_SIZE);
/// Physical bytes one slot occupies on the device.
pub const SLOT_BYTES: usize = RecordFile::ENCODED_BYTES;

type RecordFile = EncodedFile<RECORD_BLOCKS>;

/// Persistent counters and flags, decoded form of the record header.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PayloadData {
    /// Total saves over the mission. Selects the slot and orders versions.
    pub write_counter: u32,
    /// Total boots over the mission.
    pub start_count: u16,
    /// Boots in a row that were not preceded by a commanded restart.
    pub consecutive_bad_restarts: u16,
    /// Science mode captured by the last commanded restart.
    pub recovered_mode: u8,
    pub(crate) expecting_restart: u8,
}

/// What `load` found on the device.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadOutcome {
    /// A valid slot was decoded. Carries the scrub result of that slot.
    Restored(ScrubReport),
    /// No valid slot and every rejected slot was blank. Defaults applied.
    FreshDevice,
    /// No slot could be recovered but the device holds data, or the chosen
    /// slot failed its scrub. Defaults applied, the caller should log
    /// [`FaultCode::EepromCorrupted`].
    Corrupted,
}

/// Result of scanning the ring for the freshest slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SeekReport {
    /// Address and write counter of the freshest valid slot.
    pub latest: Option<(u32, u32)>,
    /// A rejected slot contained something other than blank 0xFF/0x00.
    pub rejected_data: bool,
}

/// EEPROM-backed store for [`PayloadData`] and the fault table.
pub struct PersistentStore<P: Platform> {
    pub(crate) hal: P,
    slot_count: u32,
    pub(crate) payload: PayloadData,
}

impl<P: Platform> PersistentStore<P> {
    /// Sizes the ring from the device capacity. Fails if the device cannot
    /// hold a single encoded slot.
    pub fn new(hal: P) -> Result<Self, Error> {
        let slot_count = (hal.capacity() / SLOT_BYTES) as u32;
        if slot_count == 0 {
            return Err(Error::CapacityTooSmall);
        }

        Ok(Self {
            hal,
            slot_count,
            payload: PayloadData::default(),
        })
    }

    pub fn payload(&self) -> &PayloadData {
        &self.payload
    }

    /// Usable slots in the ring.
    pub fn slot_count(&self) -> u32 {
        self.slot_count
    }

    pub(crate) fn now_ms(&mut self) -> u32 {
        self.hal.now_ms()
    }

    fn slot_addr(&self, counter: u32) -> u32 {
        // Same address as (counter * SLOT_BYTES) mod max_usable, computed
        // without overflowing the intermediate product.
        (counter % self.slot_count) * SLOT_BYTES as u32
    }

    fn read_slot(&mut self, addr: u32) -> Result<Vec<u8>, Error> {
        let mut buf = vec![0u8; SLOT_BYTES];
        self.hal.read(addr, &mut buf).map_err(|_| Error::Eeprom)?;
        Ok(buf)
    }

    /// Serializes, encodes and writes the current record to the next slot.
    /// Returns the number of bytes that actually changed on the device.
    pub fn save(&mut self, table: &FaultTable) -> Result<usize, Error> {
        self.payload.write_counter = self.payload.write_counter.wrapping_add(1);

        let record = encode_record(&self.payload, table);
        let mut file = RecordFile::new();
        file.encode(&record);
        let image = file.to_bytes();

        let addr = self.slot_addr(self.payload.write_counter);
        let current = self.read_slot(addr)?;

        let mut rewritten = 0;
        for (offset, (new, old)) in image.iter().zip(current.iter()).enumerate() {
            if new != old {
                self.hal
                    .write(addr + offset as u32, &[*new])
                    .map_err(|_| Error::Eeprom)?;
                rewritten += 1;
            }
        }

        #[cfg(feature = "defmt")]
        trace!(
            "save: counter {} @{:#06x} rewrote {}",
            self.payload.write_counter,
            addr,
            rewritten
        );

        #[cfg(feature = "debug-logs")]
        println!(
            "  store: save counter {} @{:#06x} rewrote {}",
            self.payload.write_counter, addr, rewritten
        );

        Ok(rewritten)
    }

    /// Scans every slot and returns the freshest valid one.
    ///
    /// A slot is rejected when its scrub reports uncorrectable damage or its
    /// schema version is foreign. The version check also screens blank
    /// devices, whose all-ones and all-zeros images scan clean. Counters are
    /// ordered by modular distance so the comparison survives wraparound.
    pub fn seek_latest(&mut self) -> Result<SeekReport, Error> {
        let mut latest: Option<(u32, u32)> = None;
        let mut rejected_data = false;

        for slot in 0..self.slot_count {
            let addr = slot * SLOT_BYTES as u32;
            let image = self.read_slot(addr)?;

            let mut file = RecordFile::new();
            file.fill(&image);
            let scrub = file.scrub();

            if scrub.uncorrected != 0 {
                rejected_data |= !is_blank(&image);
                continue;
            }

            let record = file.decode();
            if record[0] != RECORD_VERSION {
                rejected_data |= !is_blank(&image);
                continue;
            }

            let counter = read_u32(&record, 1);
            let newer = match latest {
                None => true,
                Some((_, best)) => counter_newer(counter, best),
            };
            if newer {
                latest = Some((addr, counter));
            }
        }

        #[cfg(feature = "defmt")]
        trace!("seek: latest {}", latest);

        Ok(SeekReport {
            latest,
            rejected_data,
        })
    }

    /// Restores payload data and the fault table from the freshest valid
    /// slot. With nothing recoverable both are reset to defaults; the
    /// outcome tells the caller whether that is a blank device or damage.
    pub fn load(&mut self, table: &mut FaultTable) -> Result<LoadOutcome, Error> {
        let seek = self.seek_latest()?;

        let Some((addr, _)) = seek.latest else {
            self.payload = PayloadData::default();
            table.reset();
            return Ok(if seek.rejected_data {
                LoadOutcome::Corrupted
            } else {
                LoadOutcome::FreshDevice
            });
        };

        let image = self.read_slot(addr)?;
        let mut file = RecordFile::new();
        file.fill(&image);
        let scrub = file.scrub();

        if scrub.uncorrected != 0 {
            self.payload = PayloadData::default();
            table.reset();
            return Ok(LoadOutcome::Corrupted);
        }

        let record = file.decode();
        self.payload = decode_payload(&record);
        decode_table(&record, table);

        Ok(LoadOutcome::Restored(scrub))
    }

    /// Boot bookkeeping. Bumps the start counter, checks the sentinel left
    /// by [`Self::prepare_for_restart`] and clears it. Returns true when the
    /// reset was unplanned; the caller logs the fault and saves.
    pub fn record_new_start(&mut self) -> bool {
        self.payload.start_count = self.payload.start_count.wrapping_add(1);

        let planned = self.payload.expecting_restart == RESTART_SENTINEL;
        if planned {
            self.payload.consecutive_bad_restarts = 0;
        } else {
            self.payload.consecutive_bad_restarts =
                self.payload.consecutive_bad_restarts.saturating_add(1);
        }
        self.payload.expecting_restart = 0;

        !planned
    }

    /// Arms the sentinel and captures the current science mode, then saves.
    /// Call only right before a deliberate, commanded restart.
    pub fn prepare_for_restart(&mut self, table: &FaultTable) -> Result<usize, Error> {
        self.payload.expecting_restart = RESTART_SENTINEL;
        self.payload.recovered_mode = self.hal.mode();
        self.save(table)
    }

    /// Overwrites the entire device with the erased pattern.
    pub fn erase_device(&mut self) -> Result<(), Error> {
        let capacity = self.hal.capacity();
        let blank = [0xFFu8; 32];

        let mut addr = 0;
        while addr < capacity {
            let len = blank.len().min(capacity - addr);
            self.hal
                .write(addr as u32, &blank[..len])
                .map_err(|_| Error::Eeprom)?;
            addr += len;
        }
        Ok(())
    }
}

/// Modular-distance ordering of write counters. Survives wraparound, unlike
/// a plain numeric comparison: anything within half the u32 range ahead of
/// `best` counts as newer.
fn counter_newer(candidate: u32, best: u32) -> bool {
    candidate.wrapping_sub(best).cast_signed() > 0
}

fn is_blank(image: &[u8]) -> bool {
    image.iter().all(|&b| b == 0xFF) || image.iter().all(|&b| b == 0x00)
}

fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

fn encode_record(payload: &PayloadData, table: &FaultTable) -> [u8; RECORD_BYTES] {
    let mut buf = [0u8; RECORD_BYTES];
    buf[0] = RECORD_VERSION;
    buf[1..5].copy_from_slice(&payload.write_counter.to_le_bytes());
    buf[5..7].copy_from_slice(&payload.start_count.to_le_bytes());
    buf[7..9].copy_from_slice(&payload.consecutive_bad_restarts.to_le_bytes());
    buf[9] = payload.recovered_mode;
    buf[10] = payload.expecting_restart;

    let mut offset = HEADER_BYTES;
    for (_, report) in table.iter() {
        buf[offset] = report.occurrences;
        buf[offset + 1..offset + 3].copy_from_slice(&report.start_num.to_le_bytes());
        buf[offset + 3..offset + 7].copy_from_slice(&report.timestamp.to_le_bytes());
        offset += FAULT_ENTRY_BYTES;
    }
    buf
}

fn decode_payload(record: &[u8]) -> PayloadData {
    PayloadData {
        write_counter: read_u32(record, 1),
        start_count: read_u16(record, 5),
        consecutive_bad_restarts: read_u16(record, 7),
        recovered_mode: record[9],
        expecting_restart: record[10],
    }
}

fn decode_table(record: &[u8], table: &mut FaultTable) {
    let mut offset = HEADER_BYTES;
    for code in FaultCode::all() {
        let report = table.report_mut(code);
        report.occurrences = record[offset];
        report.start_num = read_u16(record, offset + 1);
        report.timestamp = read_u32(record, offset + 3);
        // pending_action is transient and always comes up clear
        report.pending_action = false;
        offset += FAULT_ENTRY_BYTES;
    }
}
