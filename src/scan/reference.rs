// Mon Oct 19 2026 - Alex

use crate::engine::CancellationToken;
use crate::memory::{Address, AsyncBlockReader, MemoryBlock, PendingBlock, TargetMemory};
use crate::rtti::{ClassId, RttiError};
use crate::scan::ScanKind;
use ahash::AHashMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Hits of one scan, grouped by class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResults {
    pub code_references: AHashMap<ClassId, Vec<Address>>,
    pub instances: AHashMap<ClassId, Vec<Address>>,
}

impl ScanResults {
    pub fn hits(&self, kind: ScanKind) -> &AHashMap<ClassId, Vec<Address>> {
        match kind {
            ScanKind::CodeReference => &self.code_references,
            ScanKind::Instance => &self.instances,
        }
    }

    fn hits_mut(&mut self, kind: ScanKind) -> &mut AHashMap<ClassId, Vec<Address>> {
        match kind {
            ScanKind::CodeReference => &mut self.code_references,
            ScanKind::Instance => &mut self.instances,
        }
    }

    pub fn get(&self, kind: ScanKind, id: ClassId) -> &[Address] {
        self.hits(kind).get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn total(&self) -> usize {
        self.code_references.values().chain(self.instances.values()).map(|v| v.len()).sum()
    }

    fn normalize(&mut self) {
        for hits in self.code_references.values_mut().chain(self.instances.values_mut()) {
            hits.sort_unstable();
            hits.dedup();
        }
    }
}

/// Scans process memory for code references to, and instances of, vtables.
pub struct ReferenceScanner {
    target: Arc<dyn TargetMemory>,
    worker_threads: usize,
}

impl ReferenceScanner {
    pub fn new(target: Arc<dyn TargetMemory>, worker_threads: usize) -> Self {
        Self { target, worker_threads: worker_threads.max(1) }
    }

    fn matches(kind: ScanKind, target: &dyn TargetMemory, block: &MemoryBlock, vtable: Address) -> Vec<Address> {
        kind.candidates(target.module().width, block.address(), block.bytes())
            .filter(|&(_, candidate)| candidate == vtable)
            .map(|(location, _)| location)
            .collect()
    }

    /// Every hit of one vtable. Blocks are read in the background up front
    /// and scanned one after another.
    pub fn scan_class(&self, kind: ScanKind, vtable: Address, token: &CancellationToken) -> Result<Vec<Address>, RttiError> {
        let pending = self.target.blocks_async(|r| kind.wants(r));
        let mut hits = Vec::new();

        for block in pending {
            token.check()?;
            let block = block.wait();
            if block.is_empty() {
                continue;
            }
            hits.extend(Self::matches(kind, self.target.as_ref(), &block, vtable));
        }

        hits.sort_unstable();
        hits.dedup();
        log::info!("Found {} {} to {}", hits.len(), kind, vtable);
        Ok(hits)
    }

    /// One pass over all memory, matching every candidate against the
    /// vtable index. One pool task per block; hits merge under one lock.
    pub fn scan_all(
        &self,
        index: &AHashMap<Address, ClassId>,
        token: &CancellationToken,
    ) -> Result<ScanResults, RttiError> {
        let pending: Vec<(ScanKind, PendingBlock)> = ScanKind::ALL
            .iter()
            .flat_map(|&kind| {
                self.target
                    .blocks_async(|r| kind.wants(r))
                    .into_iter()
                    .map(move |block| (kind, block))
            })
            .collect();
        log::debug!("Bulk scan over {} blocks with {} workers", pending.len(), self.worker_threads);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.worker_threads)
            .thread_name(|i| format!("rtti-scan-{}", i))
            .build()
            .map_err(|e| RttiError::WorkerPool(e.to_string()))?;

        let results = Mutex::new(ScanResults::default());
        let target = self.target.as_ref();
        let width = target.module().width;

        pool.scope(|scope| {
            for (kind, block) in pending {
                let results = &results;
                scope.spawn(move |_| {
                    if token.is_cancelled() {
                        return;
                    }
                    let block = block.wait();
                    if block.is_empty() {
                        return;
                    }

                    let found: Vec<(ClassId, Address)> = kind
                        .candidates(width, block.address(), block.bytes())
                        .filter_map(|(location, candidate)| index.get(&candidate).map(|&id| (id, location)))
                        .collect();
                    if found.is_empty() {
                        return;
                    }

                    let mut results = results.lock();
                    let hits = results.hits_mut(kind);
                    for (id, location) in found {
                        hits.entry(id).or_default().push(location);
                    }
                });
            }
        });

        token.check()?;
        let mut results = results.into_inner();
        results.normalize();
        log::info!(
            "Bulk scan found {} code references and {} instances",
            results.code_references.values().map(|v| v.len()).sum::<usize>(),
            results.instances.values().map(|v| v.len()).sum::<usize>()
        );
        Ok(results)
    }
}
