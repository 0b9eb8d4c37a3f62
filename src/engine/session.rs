// Mon Oct 19 2026 - Alex

use crate::config::Config;
use crate::engine::gate::{Gate, GateGuard};
use crate::engine::stage::{self, StageState, StageTracker};
use crate::engine::task::{CancellationToken, TaskHandle};
use crate::memory::{Address, ModuleInfo, TargetMemory};
use crate::rtti::{
    policy_for, CandidateScanner, ClassGraph, ClassGraphBuilder, ClassMetadata, InterfacePolicy, RttiError,
    RttiValidator, SectionSet,
};
use crate::scan::{ReferenceScanner, ScanKind};
use crate::utils::logging::ScopedTimer;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

struct SessionInner {
    target: Arc<dyn TargetMemory>,
    config: Config,
    policy: Box<dyn InterfacePolicy>,
    graph: RwLock<Arc<ClassGraph>>,
    stage: StageTracker,
    processing: Gate,
    scanning: Gate,
    processing_token: Mutex<CancellationToken>,
    scanning_token: Mutex<CancellationToken>,
}

/// RTTI analysis of one module in one target.
///
/// A rebuild and a scan may run at the same time; a second rebuild or a
/// second scan started while one is running is ignored. Readers always see a
/// complete graph: rebuilds swap the whole graph in at the end.
#[derive(Clone)]
pub struct RttiSession {
    inner: Arc<SessionInner>,
}

impl RttiSession {
    pub fn new(target: Arc<dyn TargetMemory>, config: Config) -> Self {
        let policy = policy_for(config.interface_policy);
        log::debug!("New session for {} using {} interface policy", target.module().name, policy.name());

        Self {
            inner: Arc::new(SessionInner {
                target,
                config,
                policy,
                graph: RwLock::new(Arc::new(ClassGraph::new())),
                stage: StageTracker::new(),
                processing: Gate::new(),
                scanning: Gate::new(),
                processing_token: Mutex::new(CancellationToken::new()),
                scanning_token: Mutex::new(CancellationToken::new()),
            }),
        }
    }

    pub fn module(&self) -> &ModuleInfo {
        self.inner.target.module()
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    // Rebuild

    /// Rebuilds the class graph. `Ok(None)` when a rebuild is already running.
    pub fn process_rtti(&self) -> Result<Option<usize>, RttiError> {
        let Some((guard, token)) = self.begin(&self.inner.processing, &self.inner.processing_token) else {
            return Ok(None);
        };
        let result = self.inner.rebuild(&token);
        drop(guard);
        result.map(Some)
    }

    pub fn process_rtti_async(&self) -> Option<TaskHandle<usize>> {
        let (guard, token) = self.begin(&self.inner.processing, &self.inner.processing_token)?;
        let inner = Arc::clone(&self.inner);
        let worker_token = token.clone();

        self.spawn("rtti-rebuild", token, move || {
            let _guard = guard;
            inner.rebuild(&worker_token)
        })
    }

    pub fn is_processing(&self) -> bool {
        self.inner.processing.is_active()
    }

    pub fn processing_stage(&self) -> String {
        self.inner.stage.message()
    }

    pub fn processing_state(&self) -> StageState {
        self.inner.stage.state()
    }

    pub fn cancel_processing(&self) {
        self.inner.processing_token.lock().cancel();
    }

    // Queries

    /// The current graph. Stays valid while later rebuilds replace it.
    pub fn graph(&self) -> Arc<ClassGraph> {
        Arc::clone(&self.inner.graph.read())
    }

    /// Top-level classes in name order.
    pub fn get_classes(&self) -> Vec<ClassMetadata> {
        self.graph().classes().cloned().collect()
    }

    /// Top-level classes and interface vtables.
    pub fn all_classes(&self) -> Vec<ClassMetadata> {
        self.graph().all().to_vec()
    }

    pub fn find(&self, vtable: Address) -> Option<ClassMetadata> {
        self.graph().find(vtable).cloned()
    }

    pub fn find_first(&self, name: &str) -> Option<ClassMetadata> {
        self.graph().find_first(name).cloned()
    }

    pub fn find_all(&self, needle: &str) -> Vec<ClassMetadata> {
        self.graph().find_all(needle).into_iter().cloned().collect()
    }

    pub fn find_child_classes(&self, vtable: Address) -> Vec<ClassMetadata> {
        let graph = self.graph();
        graph
            .id_for_vtable(vtable)
            .map(|id| graph.find_child_classes(id).into_iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn rename_function(&self, vtable: Address, function: Address, label: &str) -> Result<(), RttiError> {
        let mut graph = self.inner.graph.write();
        Arc::make_mut(&mut graph).rename_function(vtable, function, label)
    }

    // Scans

    /// `Ok(None)` when a scan is already running.
    pub fn scan_code_references(&self, vtable: Address) -> Result<Option<Vec<Address>>, RttiError> {
        self.scan_class(ScanKind::CodeReference, vtable)
    }

    pub fn scan_instances(&self, vtable: Address) -> Result<Option<Vec<Address>>, RttiError> {
        self.scan_class(ScanKind::Instance, vtable)
    }

    /// Scans for every class at once. Returns the number of hits.
    pub fn scan_all(&self) -> Result<Option<usize>, RttiError> {
        let Some((guard, token)) = self.begin(&self.inner.scanning, &self.inner.scanning_token) else {
            return Ok(None);
        };
        let result = self.inner.scan_all(&token);
        drop(guard);
        result.map(Some)
    }

    pub fn scan_code_references_async(&self, vtable: Address) -> Option<TaskHandle<Vec<Address>>> {
        self.scan_class_async(ScanKind::CodeReference, vtable)
    }

    pub fn scan_instances_async(&self, vtable: Address) -> Option<TaskHandle<Vec<Address>>> {
        self.scan_class_async(ScanKind::Instance, vtable)
    }

    pub fn scan_all_async(&self) -> Option<TaskHandle<usize>> {
        let (guard, token) = self.begin(&self.inner.scanning, &self.inner.scanning_token)?;
        let inner = Arc::clone(&self.inner);
        let worker_token = token.clone();

        self.spawn("rtti-scan-all", token, move || {
            let _guard = guard;
            inner.scan_all(&worker_token)
        })
    }

    pub fn is_scanning(&self) -> bool {
        self.inner.scanning.is_active()
    }

    pub fn cancel_scanning(&self) {
        self.inner.scanning_token.lock().cancel();
    }

    fn scan_class(&self, kind: ScanKind, vtable: Address) -> Result<Option<Vec<Address>>, RttiError> {
        let Some((guard, token)) = self.begin(&self.inner.scanning, &self.inner.scanning_token) else {
            return Ok(None);
        };
        let result = self.inner.scan_class(kind, vtable, &token);
        drop(guard);
        result.map(Some)
    }

    fn scan_class_async(&self, kind: ScanKind, vtable: Address) -> Option<TaskHandle<Vec<Address>>> {
        let (guard, token) = self.begin(&self.inner.scanning, &self.inner.scanning_token)?;
        let inner = Arc::clone(&self.inner);
        let worker_token = token.clone();

        self.spawn("rtti-scan", token, move || {
            let _guard = guard;
            inner.scan_class(kind, vtable, &worker_token)
        })
    }

    /// Takes a gate and hands out a fresh token for the work behind it.
    fn begin(&self, gate: &Gate, slot: &Mutex<CancellationToken>) -> Option<(GateGuard, CancellationToken)> {
        let Some(guard) = gate.try_acquire() else {
            log::debug!("Ignoring request, previous run still active");
            return None;
        };
        let token = CancellationToken::new();
        *slot.lock() = token.clone();
        Some((guard, token))
    }

    fn spawn<T, F>(&self, name: &str, token: CancellationToken, work: F) -> Option<TaskHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, RttiError> + Send + 'static,
    {
        match TaskHandle::spawn(name, token, work) {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("{}", e);
                None
            }
        }
    }
}

impl SessionInner {
    fn rebuild(&self, token: &CancellationToken) -> Result<usize, RttiError> {
        let _timer = ScopedTimer::new("rtti rebuild");
        self.stage.start();

        match self.run_rebuild(token) {
            Ok(count) => {
                if self.stage.state() == StageState::Running {
                    self.stage.complete();
                }
                Ok(count)
            }
            Err(RttiError::Cancelled) => {
                log::info!("Rebuild cancelled");
                self.stage.cancel();
                Err(RttiError::Cancelled)
            }
            Err(e) => {
                log::error!("Rebuild failed: {}", e);
                self.stage.fail(&e.to_string());
                Err(e)
            }
        }
    }

    fn run_rebuild(&self, token: &CancellationToken) -> Result<usize, RttiError> {
        let target = self.target.as_ref();

        self.stage.set(stage::FINDING_SECTIONS);
        let sections = SectionSet::classify(&target.module().sections);
        if !sections.is_usable() {
            log::warn!("Failed to find valid sections for RTTI scan in {}", target.module().name);
            self.install(ClassGraph::new());
            self.stage.fail("Failed to find valid sections for RTTI scan");
            return Ok(0);
        }

        self.stage.set(stage::SCANNING_CANDIDATES);
        let candidates = CandidateScanner::new(target, &sections).scan(token)?;

        self.stage.set(stage::VALIDATING);
        let valid = RttiValidator::new(target, &sections, &self.config).validate(candidates, token)?;

        let graph = ClassGraphBuilder::new(target, &sections, &self.config, self.policy.as_ref(), &self.stage)
            .build(valid, token)?;
        token.check()?;

        let count = graph.classes().count();
        self.install(graph);
        Ok(count)
    }

    fn install(&self, mut graph: ClassGraph) {
        let mut slot = self.graph.write();
        graph.set_generation(slot.generation() + 1);
        *slot = Arc::new(graph);
    }

    fn scanner(&self) -> ReferenceScanner {
        ReferenceScanner::new(Arc::clone(&self.target), self.config.worker_threads)
    }

    fn scan_class(&self, kind: ScanKind, vtable: Address, token: &CancellationToken) -> Result<Vec<Address>, RttiError> {
        let generation = {
            let graph = self.graph.read();
            if graph.find(vtable).is_none() {
                return Err(RttiError::ClassNotFound(vtable.as_u64()));
            }
            graph.generation()
        };

        let hits = self.scanner().scan_class(kind, vtable, token)?;

        let mut slot = self.graph.write();
        if slot.generation() != generation {
            log::info!("Class graph was rebuilt during the scan, dropping results");
            return Ok(hits);
        }
        let graph = Arc::make_mut(&mut slot);
        if let Some(class) = graph.id_for_vtable(vtable).and_then(|id| graph.get_mut(id)) {
            match kind {
                ScanKind::CodeReference => class.code_references = hits.clone(),
                ScanKind::Instance => class.instances = hits.clone(),
            }
        }
        Ok(hits)
    }

    fn scan_all(&self, token: &CancellationToken) -> Result<usize, RttiError> {
        let _timer = ScopedTimer::new("bulk reference scan");

        let snapshot = {
            let mut slot = self.graph.write();
            Arc::make_mut(&mut slot).clear_scan_results();
            Arc::clone(&slot)
        };
        let generation = snapshot.generation();

        let results = self.scanner().scan_all(snapshot.vtable_index(), token)?;
        drop(snapshot);

        let mut slot = self.graph.write();
        if slot.generation() != generation {
            log::info!("Class graph was rebuilt during the scan, dropping results");
            return Ok(0);
        }
        let graph = Arc::make_mut(&mut slot);
        for kind in ScanKind::ALL {
            for (&id, hits) in results.hits(kind) {
                if let Some(class) = graph.get_mut(id) {
                    match kind {
                        ScanKind::CodeReference => class.code_references = hits.clone(),
                        ScanKind::Instance => class.instances = hits.clone(),
                    }
                }
            }
        }
        Ok(results.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{PointerWidth, SnapshotMemory};
    use crate::rtti::fixture::{ClassDef, RttiImage, RttiImageBuilder};

    fn session(image: RttiImage) -> RttiSession {
        let _ = env_logger::builder().is_test(true).try_init();
        RttiSession::new(Arc::new(image.memory), Config::default().with_worker_threads(2))
    }

    fn base_derived(width: PointerWidth) -> RttiImage {
        RttiImageBuilder::new(width)
            .define(ClassDef::new(".?AVBase@@", 2).code_references(2).instances(1))
            .define(ClassDef::new(".?AVDerived@@", 3).base(".?AVBase@@", 0).code_references(1).instances(3))
            .build()
    }

    #[test]
    fn test_end_to_end_base_and_derived() {
        for width in [PointerWidth::Bits32, PointerWidth::Bits64] {
            let session = session(base_derived(width));

            assert_eq!(session.process_rtti().unwrap(), Some(2));
            assert_eq!(session.processing_stage(), stage::DONE);
            assert_eq!(session.get_classes().len(), 2);

            let derived = session.find_first("Derived").unwrap();
            assert_eq!(derived.parents.len(), 1);
            assert_eq!(derived.parents[0].name, "Base");

            let base = session.find_first("Base").unwrap();
            let children = session.find_child_classes(base.vtable);
            assert_eq!(children.len(), 1);
            assert_eq!(children[0].vtable, derived.vtable);
        }
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let session = session(base_derived(PointerWidth::Bits64));
        session.process_rtti().unwrap();
        let first: Vec<(String, Address)> = session.get_classes().into_iter().map(|c| (c.name, c.vtable)).collect();
        let generation = session.graph().generation();

        session.process_rtti().unwrap();
        let second: Vec<(String, Address)> = session.get_classes().into_iter().map(|c| (c.name, c.vtable)).collect();

        assert_eq!(first, second);
        assert_eq!(session.graph().generation(), generation + 1);
    }

    #[test]
    fn test_rename_survives_queries() {
        let session = session(base_derived(PointerWidth::Bits64));
        session.process_rtti().unwrap();
        let base = session.find_first("Base").unwrap();
        let second = base.functions[1];

        session.rename_function(base.vtable, second, "Base::tick").unwrap();

        let renamed = session.get_classes().into_iter().find(|c| c.vtable == base.vtable).unwrap();
        assert_eq!(renamed.function_name(second), Some("Base::tick"));
        assert_eq!(renamed.functions, base.functions);
    }

    #[test]
    fn test_missing_sections_yield_no_classes() {
        let memory = SnapshotMemory::builder("code.exe", Address::new(0x400000), PointerWidth::Bits32)
            .section(".text", Address::new(0x401000), vec![0xCC; 0x100], true, true)
            .unwrap()
            .build();
        let session = RttiSession::new(Arc::new(memory), Config::default());

        assert_eq!(session.process_rtti().unwrap(), Some(0));
        assert!(session.processing_stage().starts_with("Error:"));
        assert_eq!(session.processing_state(), StageState::Failed);
        assert!(session.get_classes().is_empty());
    }

    #[test]
    fn test_busy_gates_are_ignored() {
        let session = session(base_derived(PointerWidth::Bits32));

        let held = session.inner.processing.try_acquire().unwrap();
        assert!(session.is_processing());
        assert_eq!(session.process_rtti().unwrap(), None);
        assert!(session.process_rtti_async().is_none());
        drop(held);

        let held = session.inner.scanning.try_acquire().unwrap();
        assert!(session.is_scanning());
        assert_eq!(session.scan_all().unwrap(), None);
        assert_eq!(session.scan_instances(Address::new(0x403000)).unwrap(), None);
        drop(held);
        assert!(!session.is_scanning());
    }

    #[test]
    fn test_async_rebuild_and_scan() {
        let image = base_derived(PointerWidth::Bits64);
        let fixture = image.class(".?AVDerived@@").clone();
        let session = session(image);

        let handle = session.process_rtti_async().unwrap();
        assert_eq!(handle.join().unwrap(), 2);
        assert!(!session.is_processing());

        let handle = session.scan_instances_async(fixture.vtable).unwrap();
        assert_eq!(handle.join().unwrap(), fixture.instances);
        assert_eq!(session.find(fixture.vtable).unwrap().instances, fixture.instances);
    }

    #[test]
    fn test_bulk_scan_matches_single_scans() {
        for width in [PointerWidth::Bits32, PointerWidth::Bits64] {
            let session = session(base_derived(width));
            session.process_rtti().unwrap();

            assert_eq!(session.scan_all().unwrap(), Some(7));
            let bulk = session.get_classes();

            for class in &bulk {
                let code = session.scan_code_references(class.vtable).unwrap().unwrap();
                let instances = session.scan_instances(class.vtable).unwrap().unwrap();
                assert_eq!(class.code_references, code);
                assert_eq!(class.instances, instances);
                assert!(instances.iter().all(|a| a.is_aligned(width.size())));
            }
        }
    }

    #[test]
    fn test_cancelled_rebuild_keeps_previous_graph() {
        let session = session(base_derived(PointerWidth::Bits64));
        session.process_rtti().unwrap();
        let generation = session.graph().generation();

        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(session.inner.rebuild(&token), Err(RttiError::Cancelled)));

        assert_eq!(session.processing_stage(), stage::CANCELLED);
        assert_eq!(session.graph().generation(), generation);
        assert_eq!(session.get_classes().len(), 2);
    }

    #[test]
    fn test_scan_of_unknown_class() {
        let session = session(base_derived(PointerWidth::Bits64));
        session.process_rtti().unwrap();
        assert!(matches!(
            session.scan_code_references(Address::new(0x10)),
            Err(RttiError::ClassNotFound(0x10))
        ));
        assert!(!session.is_scanning());
    }
}
