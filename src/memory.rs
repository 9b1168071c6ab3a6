use serde::Serialize;
use tracing::{debug, trace};

use crate::error::MachineError;

pub const PAGE_SIZE: usize = 0x4000;

/// Smallest RAM store that can back both fixed banks and leave a page for
/// bank 3 to select.
pub const MIN_RAM_SIZE: usize = 2 * PAGE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Bank {
    Bank1,
    Bank2,
    Bank3,
}

/// Three 16KB windows into one contiguous RAM store. Banks 1 and 2 are fixed
/// to pages 0 and 1; bank 3 is repointed by [`BankedMemory::select_bank3`].
#[derive(Debug, Clone, PartialEq)]
pub struct BankedMemory {
    data: Vec<u8>,
    num_banks: usize,
    bank3: usize,
}

impl BankedMemory {
    /// Creates a zero-filled RAM store. Any remainder past the last whole
    /// page is kept in the store but never mapped.
    pub fn new(size: usize) -> Result<Self, MachineError> {
        if size < MIN_RAM_SIZE {
            return Err(MachineError::RamTooSmall {
                size,
                minimum: MIN_RAM_SIZE,
            });
        }

        let num_banks = size / PAGE_SIZE;
        debug!("[MEM] {} bytes of RAM, {} pages", size, num_banks);

        Ok(Self {
            data: vec![0; size],
            num_banks,
            bank3: 0,
        })
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn num_banks(&self) -> usize {
        self.num_banks
    }

    pub fn bank3_page(&self) -> usize {
        self.bank3
    }

    pub fn select_bank3(&mut self, page: u8) {
        let page = page as usize % self.num_banks;
        if page != self.bank3 {
            debug!("[MEM] Bank 3 -> page {}", page);
        }
        self.bank3 = page;
    }

    fn base(&self, bank: Bank) -> usize {
        match bank {
            Bank::Bank1 => 0,
            Bank::Bank2 => PAGE_SIZE,
            Bank::Bank3 => self.bank3 * PAGE_SIZE,
        }
    }

    pub fn read(&self, bank: Bank, offset: u16) -> u8 {
        let offset = offset as usize & (PAGE_SIZE - 1);
        self.data[self.base(bank) + offset]
    }

    pub fn write(&mut self, bank: Bank, offset: u16, value: u8) {
        let offset = offset as usize & (PAGE_SIZE - 1);
        let address = self.base(bank) + offset;
        trace!("[MEM] {:?} [{:06X}] = {:02X}", bank, address, value);
        self.data[address] = value;
    }

    /// Copies `bytes` into the backing store at a physical offset, failing
    /// without touching RAM when they do not fit.
    pub fn load(&mut self, offset: usize, bytes: &[u8]) -> Result<(), MachineError> {
        let capacity = self.data.len().saturating_sub(offset);
        if bytes.len() > capacity {
            return Err(MachineError::CartridgeTooLarge {
                len: bytes.len(),
                capacity,
            });
        }

        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn page(&self, page: usize) -> &[u8] {
        let start = page * PAGE_SIZE;
        &self.data[start..start + PAGE_SIZE]
    }
}
