use thiserror::Error;

/// Reference memory capacity: 2 MiB.
pub const MEMORY_SIZE: usize = 1 << 21;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("{size}-byte access at {addr:#x} exceeds capacity {capacity:#x}")]
    OutOfBounds { addr: u64, size: u64, capacity: u64 },
    #[error("image of {len} bytes does not fit in {capacity} bytes of memory")]
    ImageTooLarge { len: usize, capacity: usize },
}

pub trait Bus {
    fn read_u8(&mut self, addr: u64) -> Result<u8, MemoryError>;
    fn read_u32(&mut self, addr: u64) -> Result<u32, MemoryError>;
    fn read_u64(&mut self, addr: u64) -> Result<u64, MemoryError>;
    fn write_u8(&mut self, addr: u64, val: u8) -> Result<(), MemoryError>;
    fn write_u32(&mut self, addr: u64, val: u32) -> Result<(), MemoryError>;
    fn write_u64(&mut self, addr: u64, val: u64) -> Result<(), MemoryError>;
}

/// Zero-initialised, byte-addressable, little-endian backing store.
#[derive(Clone)]
pub struct LinearMemory {
    pub mem: Vec<u8>,
}

impl LinearMemory {
    pub fn new(size: usize) -> Self {
        Self { mem: vec![0; size] }
    }

    pub fn capacity(&self) -> usize {
        self.mem.len()
    }

    /// Copy a flat binary image to address 0.
    pub fn load_image(&mut self, bytes: &[u8]) -> Result<(), MemoryError> {
        if bytes.len() > self.mem.len() {
            return Err(MemoryError::ImageTooLarge {
                len: bytes.len(),
                capacity: self.mem.len(),
            });
        }
        self.mem[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Every non-zero aligned 32-bit word, in ascending address order.
    pub fn non_zero_words(&self) -> impl Iterator<Item = (u64, u32)> + '_ {
        self.mem
            .chunks_exact(4)
            .enumerate()
            .filter_map(|(i, c)| {
                let word = u32::from_le_bytes([c[0], c[1], c[2], c[3]]);
                (word != 0).then_some((i as u64 * 4, word))
            })
    }
}

impl LinearMemory {
    fn range(&self, addr: u64, size: u64) -> Result<std::ops::Range<usize>, MemoryError> {
        let capacity = self.mem.len() as u64;
        match addr.checked_add(size) {
            Some(end) if end <= capacity => Ok(addr as usize..end as usize),
            _ => Err(MemoryError::OutOfBounds {
                addr,
                size,
                capacity,
            }),
        }
    }

    fn load<const N: usize>(&self, addr: u64) -> Result<[u8; N], MemoryError> {
        let r = self.range(addr, N as u64)?;
        let mut buf = [0u8; N];
        buf.copy_from_slice(&self.mem[r]);
        Ok(buf)
    }

    fn store(&mut self, addr: u64, bytes: &[u8]) -> Result<(), MemoryError> {
        let r = self.range(addr, bytes.len() as u64)?;
        self.mem[r].copy_from_slice(bytes);
        Ok(())
    }
}

impl Bus for LinearMemory {
    fn read_u8(&mut self, addr: u64) -> Result<u8, MemoryError> {
        Ok(self.load::<1>(addr)?[0])
    }
    fn read_u32(&mut self, addr: u64) -> Result<u32, MemoryError> {
        self.load(addr).map(u32::from_le_bytes)
    }
    fn read_u64(&mut self, addr: u64) -> Result<u64, MemoryError> {
        self.load(addr).map(u64::from_le_bytes)
    }
    fn write_u8(&mut self, addr: u64, val: u8) -> Result<(), MemoryError> {
        self.store(addr, &[val])
    }
    fn write_u32(&mut self, addr: u64, val: u32) -> Result<(), MemoryError> {
        self.store(addr, &val.to_le_bytes())
    }
    fn write_u64(&mut self, addr: u64, val: u64) -> Result<(), MemoryError> {
        self.store(addr, &val.to_le_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_round_trip() {
        let mut mem = LinearMemory::new(16);
        mem.write_u64(0, 0x0102_0304_0506_0708).unwrap();
        assert_eq!(mem.mem[0], 0x08);
        assert_eq!(mem.read_u32(0).unwrap(), 0x0506_0708);
        assert_eq!(mem.read_u32(4).unwrap(), 0x0102_0304);
        assert_eq!(mem.read_u8(7).unwrap(), 0x01);
    }

    #[test]
    fn accesses_past_capacity_fail() {
        let mut mem = LinearMemory::new(8);
        assert!(mem.read_u32(4).is_ok());
        assert_eq!(
            mem.read_u32(5),
            Err(MemoryError::OutOfBounds {
                addr: 5,
                size: 4,
                capacity: 8
            })
        );
        assert!(mem.write_u64(1, 0).is_err());
        assert!(mem.read_u8(u64::MAX).is_err());
    }

    #[test]
    fn image_loading_and_scan() {
        let mut mem = LinearMemory::new(16);
        mem.load_image(&[0, 0, 0, 0, 0xEF, 0xBE, 0xAD, 0xDE]).unwrap();
        let words: Vec<_> = mem.non_zero_words().collect();
        assert_eq!(words, vec![(4, 0xDEAD_BEEF)]);
        assert!(mem.load_image(&[0; 17]).is_err());
    }
}
