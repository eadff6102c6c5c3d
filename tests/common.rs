#![allow(dead_code)]

// filename according to https://doc.rust-lang.org/book/ch11-03-test-organization.html
use edac_store::platform::{Actuator, Clock, ModeControl};
use embedded_storage::{ReadStorage, Storage};

/// Teensy-class EEPROM size used by the flight configuration.
pub const EEPROM_SIZE: usize = 1080;

#[derive(Default)]
pub struct Eeprom {
    pub buf: Vec<u8>,
    pub fail_after_operation: usize,
    pub operations: Vec<Operation>,
    pub clock_ms: u32,
    pub current_mode: u8,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    Read { offset: u32, len: usize },
    Write { offset: u32, len: usize },
}

impl Eeprom {
    pub fn new() -> Self {
        Self::with_size(EEPROM_SIZE)
    }

    pub fn with_size(size: usize) -> Self {
        Self {
            buf: vec![0xFFu8; size],
            fail_after_operation: usize::MAX,
            ..Default::default()
        }
    }

    pub fn new_with_fault(fail_after_operation: usize) -> Self {
        Self {
            fail_after_operation,
            ..Self::new()
        }
    }

    pub fn disable_faults(&mut self) {
        self.fail_after_operation = usize::MAX;
    }

    pub fn writes(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Write { .. }))
            .count()
    }

    /// Flips one bit of the stored image, the way an upset would.
    pub fn flip_bit(&mut self, byte: usize, bit: u8) {
        self.buf[byte] ^= 1 << bit;
    }

    pub fn dump_operations(&self) {
        println!("Operations:");
        for op in &self.operations {
            println!("  {:?}", op);
        }
    }
}

#[derive(Debug)]
pub struct EepromError;

impl ReadStorage for Eeprom {
    type Error = EepromError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        if self.operations.len() >= self.fail_after_operation {
            return Err(EepromError);
        }
        self.operations.push(Operation::Read {
            offset,
            len: bytes.len(),
        });

        let offset = offset as usize;
        bytes.copy_from_slice(&self.buf[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl Storage for Eeprom {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        if self.operations.len() >= self.fail_after_operation {
            return Err(EepromError);
        }
        self.operations.push(Operation::Write {
            offset,
            len: bytes.len(),
        });

        let offset = offset as usize;
        self.buf[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

// embedded-storage has no &mut forwarding for ReadStorage/Storage, so the
// tests provide their own to keep the device inspectable after the
// subsystem is constructed over it.
impl ReadStorage for &mut Eeprom {
    type Error = EepromError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        (**self).read(offset, bytes)
    }

    fn capacity(&self) -> usize {
        (**self).capacity()
    }
}

impl Storage for &mut Eeprom {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        (**self).write(offset, bytes)
    }
}

impl Clock for Eeprom {
    fn now_ms(&mut self) -> u32 {
        self.clock_ms += 1000;
        self.clock_ms
    }
}

impl ModeControl for Eeprom {
    fn mode(&mut self) -> u8 {
        self.current_mode
    }

    fn set_mode(&mut self, mode: u8) {
        self.current_mode = mode;
    }
}

/// Records every corrective action instead of driving hardware.
#[derive(Debug, Default, PartialEq)]
pub struct CommandLog {
    pub safe_mode_entries: usize,
    pub heater_override: Vec<bool>,
}

impl Actuator for CommandLog {
    fn enter_safe_mode(&mut self) {
        self.safe_mode_entries += 1;
    }

    fn set_heater_override(&mut self, enabled: bool) {
        self.heater_override.push(enabled);
    }
}
