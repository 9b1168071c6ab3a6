// +---------------+------------------------------------------------+
// | Range         | Description                                    |
// +---------------+------------------------------------------------+
// | 0x0000-0x3FFF | RAM bank 1 (fixed to page 0)                   |
// | 0x4000-0x7FFF | RAM bank 2 (fixed to page 1)                   |
// | 0x8000-0xBFFF | RAM bank 3 (page selected by VIA port A)       |
// | 0xC000-0xC3FF | VIA 6522                                       |
// | 0xC400-0xC7FF | UART 16550                                     |
// | 0xCC00        | TMS9918A VRAM data                             |
// | 0xCC01        | TMS9918A register/status                       |
// | 0xCC02        | YM2149 address latch (write) / data (read)     |
// | 0xCC03        | YM2149 data (write only)                       |
// | 0xCC06        | Controller select flip-flop clear (read)       |
// | 0xCC0E        | Controller select flip-flop set (read)         |
// | 0xCD00-0xCD01 | Diagnostic hex byte sink (write)               |
// | 0xE000-0xFFFF | ROM                                            |
// +---------------+------------------------------------------------+

use std::ops::RangeInclusive;

use serde::Serialize;

use crate::error::MachineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Region {
    Bank1,
    Bank2,
    Bank3,
    Via,
    Uart,
    VdpVram,
    VdpRegister,
    PsgAddress,
    PsgData,
    ControllerSelectClear,
    ControllerSelectSet,
    Diagnostic,
    Rom,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub range: RangeInclusive<u16>,
    pub region: Region,
}

impl MapEntry {
    pub const fn new(start: u16, end: u16, region: Region) -> Self {
        Self {
            range: start..=end,
            region,
        }
    }
}

pub fn ultim809_map() -> Vec<MapEntry> {
    vec![
        MapEntry::new(0x0000, 0x3FFF, Region::Bank1),
        MapEntry::new(0x4000, 0x7FFF, Region::Bank2),
        MapEntry::new(0x8000, 0xBFFF, Region::Bank3),
        MapEntry::new(0xC000, 0xC3FF, Region::Via),
        MapEntry::new(0xC400, 0xC7FF, Region::Uart),
        MapEntry::new(0xCC00, 0xCC00, Region::VdpVram),
        MapEntry::new(0xCC01, 0xCC01, Region::VdpRegister),
        MapEntry::new(0xCC02, 0xCC02, Region::PsgAddress),
        MapEntry::new(0xCC03, 0xCC03, Region::PsgData),
        MapEntry::new(0xCC06, 0xCC06, Region::ControllerSelectClear),
        MapEntry::new(0xCC0E, 0xCC0E, Region::ControllerSelectSet),
        MapEntry::new(0xCD00, 0xCD01, Region::Diagnostic),
        MapEntry::new(0xE000, 0xFFFF, Region::Rom),
    ]
}

/// Result of decoding an address: the region that claims it and the offset
/// of the address from the start of that region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub region: Region,
    pub offset: u16,
}

/// Fixed CPU address map. Entries are validated for overlap once, when the
/// map is built; decoding afterwards never fails, unclaimed addresses decode
/// to `None` (open bus).
#[derive(Debug, Clone)]
pub struct AddressMap {
    entries: Vec<MapEntry>,
}

impl AddressMap {
    pub fn new(mut entries: Vec<MapEntry>) -> Result<Self, MachineError> {
        entries.sort_by_key(|e| *e.range.start());

        for pair in entries.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if b.range.start() <= a.range.end() {
                return Err(MachineError::OverlappingRegions {
                    first: a.region,
                    second: b.region,
                    address: *b.range.start(),
                });
            }
        }

        Ok(Self { entries })
    }

    pub fn decode(&self, address: u16) -> Option<Decoded> {
        self.entries
            .iter()
            .find(|e| e.range.contains(&address))
            .map(|e| Decoded {
                region: e.region,
                offset: address - e.range.start(),
            })
    }

    pub fn entries(&self) -> &[MapEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ultim809_map_is_valid() {
        let map = AddressMap::new(ultim809_map()).unwrap();
        assert_eq!(map.entries().len(), 13);
    }

    #[test]
    fn test_decode() {
        let map = AddressMap::new(ultim809_map()).unwrap();

        assert_eq!(
            map.decode(0x0000),
            Some(Decoded {
                region: Region::Bank1,
                offset: 0
            })
        );
        assert_eq!(
            map.decode(0x9234),
            Some(Decoded {
                region: Region::Bank3,
                offset: 0x1234
            })
        );
        assert_eq!(
            map.decode(0xC40F),
            Some(Decoded {
                region: Region::Uart,
                offset: 0x0F
            })
        );
        assert_eq!(
            map.decode(0xCD01),
            Some(Decoded {
                region: Region::Diagnostic,
                offset: 1
            })
        );
        assert_eq!(map.decode(0xFFFF).map(|d| d.region), Some(Region::Rom));
    }

    #[test]
    fn test_unclaimed_addresses() {
        let map = AddressMap::new(ultim809_map()).unwrap();
        for address in [0xC800, 0xCBFF, 0xCC04, 0xCC05, 0xCC07, 0xCC0F, 0xCD02, 0xD000, 0xDFFF] {
            assert_eq!(map.decode(address), None, "{:#06X}", address);
        }
    }

    #[test]
    fn test_overlap_is_rejected() {
        let mut entries = ultim809_map();
        entries.push(MapEntry::new(0xCC00, 0xCC07, Region::Diagnostic));

        let err = AddressMap::new(entries).unwrap_err();
        assert!(matches!(err, MachineError::OverlappingRegions { .. }));
    }
}
