//! Guest memory model.
//!
//! Memory is a small set of explicitly mapped regions: the PT_LOAD segments
//! of the binary plus one stack region. There is no implicit growth and no
//! page table; any access outside a mapped region is a [`Fault`], which is
//! exactly the behavior a translated bare-metal guest should see.

use crate::Fault;
use thiserror::Error;
use tracing::trace;

/// Upper bound on a single region, to keep a hostile `p_memsz` from
/// allocating the host to death.
pub const MAX_REGION: u64 = 0x1000_0000;

/// Errors from mapping a new region.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("region at {base:#x} is empty")]
    Empty { base: u64 },

    #[error("region at {base:#x} with size {size:#x} wraps the address space")]
    AddressOverflow { base: u64, size: u64 },

    #[error("region at {base:#x} overlaps an existing region at {existing:#x}")]
    Overlap { base: u64, existing: u64 },

    #[error("region at {base:#x} with size {size:#x} exceeds the {limit:#x} byte limit")]
    TooLarge { base: u64, size: u64, limit: u64 },
}

#[derive(Debug, Clone)]
struct Region {
    base: u64,
    bytes: Vec<u8>,
}

impl Region {
    fn end(&self) -> u64 {
        self.base + self.bytes.len() as u64
    }

    fn contains(&self, address: u64, width: u64) -> bool {
        address >= self.base && address.checked_add(width).is_some_and(|end| end <= self.end())
    }
}

/// Byte-addressed little-endian guest memory.
#[derive(Debug, Clone, Default)]
pub struct GuestMemory {
    regions: Vec<Region>,
}

impl GuestMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a new region at `base`, zero-extended to `size` bytes if `data`
    /// is shorter. Regions may not overlap.
    pub fn map(&mut self, base: u64, size: u64, data: &[u8]) -> Result<(), MapError> {
        if size == 0 {
            return Err(MapError::Empty { base });
        }
        if size > MAX_REGION {
            return Err(MapError::TooLarge {
                base,
                size,
                limit: MAX_REGION,
            });
        }
        let end = base
            .checked_add(size)
            .ok_or(MapError::AddressOverflow { base, size })?;
        for region in &self.regions {
            if base < region.end() && region.base < end {
                return Err(MapError::Overlap {
                    base,
                    existing: region.base,
                });
            }
        }

        let mut bytes = vec![0u8; size as usize];
        let copy = data.len().min(bytes.len());
        bytes[..copy].copy_from_slice(&data[..copy]);

        trace!(base = format_args!("{base:#x}"), size, "mapped guest region");
        self.regions.push(Region { base, bytes });
        Ok(())
    }

    /// Whether `address` falls inside a mapped region.
    pub fn is_mapped(&self, address: u64) -> bool {
        self.region_for(address, 1).is_some()
    }

    fn region_for(&self, address: u64, width: u64) -> Option<&Region> {
        self.regions.iter().find(|r| r.contains(address, width))
    }

    fn region_for_mut(&mut self, address: u64, width: u64) -> Option<&mut Region> {
        self.regions.iter_mut().find(|r| r.contains(address, width))
    }

    /// Read `buf.len()` bytes starting at `address`. The whole range must
    /// lie inside one region.
    pub fn read_bytes(&self, address: u64, buf: &mut [u8]) -> Result<(), Fault> {
        let width = buf.len() as u64;
        let region = self
            .region_for(address, width)
            .ok_or(Fault::OutOfBounds { address, width })?;
        let offset = (address - region.base) as usize;
        buf.copy_from_slice(&region.bytes[offset..offset + buf.len()]);
        Ok(())
    }

    /// Write `data` starting at `address`. The whole range must lie inside
    /// one region.
    pub fn write_bytes(&mut self, address: u64, data: &[u8]) -> Result<(), Fault> {
        let width = data.len() as u64;
        let region = self
            .region_for_mut(address, width)
            .ok_or(Fault::OutOfBounds { address, width })?;
        let offset = (address - region.base) as usize;
        region.bytes[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    pub fn read_u8(&self, address: u64) -> Result<u8, Fault> {
        let mut buf = [0u8; 1];
        self.read_bytes(address, &mut buf)?;
        Ok(buf[0])
    }

    pub fn read_u16(&self, address: u64) -> Result<u16, Fault> {
        let mut buf = [0u8; 2];
        self.read_bytes(address, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    pub fn read_u32(&self, address: u64) -> Result<u32, Fault> {
        let mut buf = [0u8; 4];
        self.read_bytes(address, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_u64(&self, address: u64) -> Result<u64, Fault> {
        let mut buf = [0u8; 8];
        self.read_bytes(address, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    pub fn write_u8(&mut self, address: u64, value: u8) -> Result<(), Fault> {
        self.write_bytes(address, &[value])
    }

    pub fn write_u16(&mut self, address: u64, value: u16) -> Result<(), Fault> {
        self.write_bytes(address, &value.to_le_bytes())
    }

    pub fn write_u32(&mut self, address: u64, value: u32) -> Result<(), Fault> {
        self.write_bytes(address, &value.to_le_bytes())
    }

    pub fn write_u64(&mut self, address: u64, value: u64) -> Result<(), Fault> {
        self.write_bytes(address, &value.to_le_bytes())
    }
}
