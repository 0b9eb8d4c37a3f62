// Mon Oct 19 2026 - Alex

use crate::memory::{Address, MemoryError, MemoryRegion, ModuleInfo};

const STRING_CHUNK: usize = 64;

/// Read access to one attached target and the module being analyzed.
///
/// Only `read_into` touches the target; everything else is built on it.
pub trait TargetMemory: Send + Sync {
    fn module(&self) -> &ModuleInfo;

    /// Committed regions of the whole address space, used for block scans.
    fn regions(&self) -> Vec<MemoryRegion>;

    fn read_into(&self, addr: Address, buf: &mut [u8]) -> Result<(), MemoryError>;

    fn read_bytes(&self, addr: Address, len: usize) -> Result<Vec<u8>, MemoryError> {
        let mut buf = vec![0u8; len];
        self.read_into(addr, &mut buf)?;
        Ok(buf)
    }

    fn read_u32(&self, addr: Address) -> Result<u32, MemoryError> {
        let mut buf = [0u8; 4];
        self.read_into(addr, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_pointer(&self, addr: Address) -> Result<Address, MemoryError> {
        let width = self.module().width;
        let mut buf = [0u8; 8];
        self.read_into(addr, &mut buf[..width.size()])?;
        width
            .read_pointer(&buf)
            .map(Address::new)
            .ok_or(MemoryError::ReadFailed { address: addr.as_u64(), size: width.size() })
    }

    /// Reads a NUL-terminated string of at most `max_len` bytes. Stops early at
    /// the first unreadable byte; fails only when nothing at all was readable.
    fn read_c_string(&self, addr: Address, max_len: usize) -> Result<Vec<u8>, MemoryError> {
        let mut out = Vec::new();
        let mut chunk = [0u8; STRING_CHUNK];

        while out.len() < max_len {
            let want = (max_len - out.len()).min(STRING_CHUNK);
            let at = addr + out.len() as u64;

            if self.read_into(at, &mut chunk[..want]).is_ok() {
                if let Some(nul) = chunk[..want].iter().position(|&b| b == 0) {
                    out.extend_from_slice(&chunk[..nul]);
                    return Ok(out);
                }
                out.extend_from_slice(&chunk[..want]);
                continue;
            }

            // chunk straddles the end of a readable range
            for i in 0..want {
                let mut byte = [0u8; 1];
                if self.read_into(at + i as u64, &mut byte).is_err() {
                    if out.is_empty() {
                        return Err(MemoryError::ReadFailed { address: addr.as_u64(), size: max_len });
                    }
                    return Ok(out);
                }
                if byte[0] == 0 {
                    return Ok(out);
                }
                out.push(byte[0]);
            }
        }

        Ok(out)
    }
}
