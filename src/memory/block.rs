// Mon Oct 19 2026 - Alex

use crate::memory::{Address, MemoryRegion, TargetMemory};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A copy of one region of target memory, keeping track of where it came from.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlock {
    address: Address,
    bytes: Vec<u8>,
}

impl MemoryBlock {
    pub fn new(address: Address, bytes: Vec<u8>) -> Self {
        Self { address, bytes }
    }

    pub fn empty(address: Address) -> Self {
        Self { address, bytes: Vec::new() }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Address in the target of the byte at `offset` in the copy.
    pub fn real_address(&self, offset: usize) -> Address {
        self.address + offset as u64
    }
}

enum PendingState {
    Running(JoinHandle<MemoryBlock>),
    Ready(MemoryBlock),
}

/// A block read that was started in the background.
pub struct PendingBlock {
    region: MemoryRegion,
    state: PendingState,
}

impl PendingBlock {
    pub fn spawn(target: Arc<dyn TargetMemory>, region: MemoryRegion) -> Self {
        let worker_region = region.clone();
        let spawned = thread::Builder::new()
            .name(format!("block-read-{:x}", region.start()))
            .spawn(move || read_block(target.as_ref(), &worker_region));

        let state = match spawned {
            Ok(handle) => PendingState::Running(handle),
            Err(e) => {
                log::debug!("Could not spawn reader for {}: {}", region, e);
                PendingState::Ready(MemoryBlock::empty(region.start()))
            }
        };

        Self { region, state }
    }

    pub fn ready(region: MemoryRegion, block: MemoryBlock) -> Self {
        Self { region, state: PendingState::Ready(block) }
    }

    pub fn region(&self) -> &MemoryRegion {
        &self.region
    }

    /// Blocks until the read finished. A failed read yields an empty block.
    pub fn wait(self) -> MemoryBlock {
        match self.state {
            PendingState::Ready(block) => block,
            PendingState::Running(handle) => handle.join().unwrap_or_else(|_| {
                log::warn!("Reader thread for {} panicked", self.region);
                MemoryBlock::empty(self.region.start())
            }),
        }
    }
}

fn read_block(target: &dyn TargetMemory, region: &MemoryRegion) -> MemoryBlock {
    let size = region.size() as usize;
    let mut bytes = Vec::new();

    if bytes.try_reserve_exact(size).is_err() {
        log::warn!("Out of memory copying {} ({} bytes)", region, size);
        return MemoryBlock::empty(region.start());
    }
    bytes.resize(size, 0);

    match target.read_into(region.start(), &mut bytes) {
        Ok(()) => MemoryBlock::new(region.start(), bytes),
        Err(e) => {
            log::debug!("Skipping unreadable block {}: {}", region, e);
            MemoryBlock::empty(region.start())
        }
    }
}

/// Batched background reads of the target's memory map.
pub trait AsyncBlockReader {
    fn blocks_async<F>(&self, filter: F) -> Vec<PendingBlock>
    where
        F: Fn(&MemoryRegion) -> bool;

    /// Regions that are readable and not executable.
    fn readable_blocks_async(&self) -> Vec<PendingBlock> {
        self.blocks_async(|r| r.is_readable() && !r.is_executable())
    }

    fn executable_blocks_async(&self) -> Vec<PendingBlock> {
        self.blocks_async(|r| r.is_executable())
    }
}

impl AsyncBlockReader for Arc<dyn TargetMemory> {
    fn blocks_async<F>(&self, filter: F) -> Vec<PendingBlock>
    where
        F: Fn(&MemoryRegion) -> bool,
    {
        self.regions()
            .into_iter()
            .filter(|r| filter(r))
            .map(|r| PendingBlock::spawn(Arc::clone(self), r))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::PointerWidth;
    use crate::rtti::fixture::{FailingReads, RttiImageBuilder};

    fn image() -> crate::rtti::fixture::RttiImage {
        RttiImageBuilder::new(PointerWidth::Bits64).class(".?AVPlayer@@", 2).build()
    }

    fn names(blocks: &[PendingBlock]) -> Vec<&str> {
        blocks.iter().map(|b| b.region().name()).collect()
    }

    #[test]
    fn test_region_filters() {
        let target: Arc<dyn TargetMemory> = Arc::new(image().memory);

        assert_eq!(names(&target.executable_blocks_async()), vec![".text"]);
        assert_eq!(names(&target.readable_blocks_async()), vec![".rdata", ".data"]);
        assert!(target.blocks_async(|_| false).is_empty());
    }

    #[test]
    fn test_blocks_copy_their_region() {
        let image = image();
        let vtable = image.class(".?AVPlayer@@").vtable;
        let target: Arc<dyn TargetMemory> = Arc::new(image.memory);

        for pending in target.readable_blocks_async() {
            let region = pending.region().clone();
            let block = pending.wait();
            assert_eq!(block.address(), region.start());
            assert_eq!(block.size() as u64, region.size());
            if region.contains(vtable) {
                let offset = (vtable - region.start()) as usize;
                assert_eq!(block.real_address(offset), vtable);
            }
        }
    }

    #[test]
    fn test_failed_read_yields_empty_block() {
        let target: Arc<dyn TargetMemory> = Arc::new(FailingReads::new(image().memory).fail_section(".text"));

        let text: Vec<MemoryBlock> = target.executable_blocks_async().into_iter().map(PendingBlock::wait).collect();
        assert_eq!(text.len(), 1);
        assert!(text[0].is_empty());
        assert_eq!(text[0].address(), target.module().sections[0].start());

        let others: Vec<MemoryBlock> = target.readable_blocks_async().into_iter().map(PendingBlock::wait).collect();
        assert_eq!(others.len(), 2);
        assert!(others.iter().all(|b| !b.is_empty()));
    }

    #[test]
    fn test_panicking_reader_yields_empty_block() {
        let target: Arc<dyn TargetMemory> = Arc::new(FailingReads::new(image().memory).panic_in_section(".data"));

        let blocks: Vec<MemoryBlock> = target.readable_blocks_async().into_iter().map(PendingBlock::wait).collect();
        assert_eq!(blocks.len(), 2);
        assert!(!blocks[0].is_empty());
        assert!(blocks[1].is_empty());
    }

    #[test]
    fn test_ready_block_is_returned_as_is() {
        let target: Arc<dyn TargetMemory> = Arc::new(image().memory);
        let region = target.regions().remove(0);
        let block = MemoryBlock::new(region.start(), vec![1, 2, 3]);

        let waited = PendingBlock::ready(region, block).wait();
        assert_eq!(waited.bytes(), &[1, 2, 3]);
    }
}
