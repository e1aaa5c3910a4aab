//! Replay backend: the inspector traits over a portable JSON capture.
//!
//! The production dump reader needs the native minidump format and runtime
//! data structures; it lives out of tree. This backend implements the same
//! capability surface over a serde-described fixture, which serves two
//! audiences:
//!
//! - the CLI, which can triage a previously captured `.json` dump the way a
//!   profiler replays a recorded trace file;
//! - the test suite, which scripts whole dumps, including per-item read
//!   failures, without touching a real process.
//!
//! Fixture fields default aggressively so hand-written captures stay short:
//! a thread is alive unless said otherwise, a heap is walkable, reads
//! succeed.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{
    DumpReader, DumpSession, ExceptionInfo, HeapView, ModuleRecord, ObjectView, RuntimeBanner,
    RuntimeView, SegmentKind, SegmentRecord, SyncBlockRecord, ThreadView,
};

// =============================================================================
// FIXTURE MODEL (serde)
// =============================================================================

fn yes() -> bool {
    true
}

/// A whole captured dump.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DumpFixture {
    #[serde(default)]
    pub runtimes: Vec<RuntimeFixture>,
}

impl DumpFixture {
    /// Load a fixture from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dump capture {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Malformed dump capture {}", path.display()))
    }

    /// Convenience for a single-runtime capture.
    #[must_use]
    pub fn with_runtime(runtime: RuntimeFixture) -> Self {
        Self { runtimes: vec![runtime] }
    }

    /// Open an in-memory session over this fixture, bypassing the filesystem.
    /// Used by embedders and tests that assemble captures programmatically.
    #[must_use]
    pub fn into_session(self) -> impl DumpSession {
        ReplaySession { fixture: self }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeFixture {
    pub flavor: String,
    pub version: String,
    #[serde(default)]
    pub threads: Vec<ThreadFixture>,
    #[serde(default)]
    pub heap: Option<HeapFixture>,
    #[serde(default)]
    pub modules: Vec<ModuleFixture>,
}

impl Default for RuntimeFixture {
    fn default() -> Self {
        Self {
            flavor: "CoreCLR".to_string(),
            version: "8.0.0".to_string(),
            threads: Vec::new(),
            heap: None,
            modules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadFixture {
    pub managed_id: u32,
    #[serde(default)]
    pub address: u64,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub lock_count: u32,
    #[serde(default)]
    pub exception: Option<ExceptionFixture>,
    #[serde(default)]
    pub is_finalizer: bool,
    #[serde(default)]
    pub is_gc: bool,
    #[serde(default = "yes")]
    pub is_alive: bool,
    #[serde(default)]
    pub cpu_time_ms: Option<f64>,
    /// Simulate a torn CPU-time property.
    #[serde(default)]
    pub cpu_time_fails: bool,
    #[serde(default)]
    pub stack_roots: Vec<u64>,
    #[serde(default)]
    pub frames: Vec<String>,
    /// Simulate a stack that will not unwind.
    #[serde(default)]
    pub frames_fail: bool,
}

impl Default for ThreadFixture {
    fn default() -> Self {
        Self {
            managed_id: 0,
            address: 0,
            state: "Running".to_string(),
            lock_count: 0,
            exception: None,
            is_finalizer: false,
            is_gc: false,
            is_alive: true,
            cpu_time_ms: None,
            cpu_time_fails: false,
            stack_roots: Vec::new(),
            frames: Vec::new(),
            frames_fail: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionFixture {
    pub type_name: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeapFixture {
    #[serde(default = "yes")]
    pub can_walk: bool,
    #[serde(default)]
    pub is_server: bool,
    #[serde(default)]
    pub segments: Vec<SegmentFixture>,
    #[serde(default)]
    pub objects: Vec<ObjectFixture>,
    #[serde(default)]
    pub sync_blocks: Vec<SyncBlockFixture>,
}

impl Default for HeapFixture {
    fn default() -> Self {
        Self {
            can_walk: true,
            is_server: false,
            segments: Vec::new(),
            objects: Vec::new(),
            sync_blocks: Vec::new(),
        }
    }
}

impl HeapFixture {
    /// A [`HeapView`] borrowing this fixture. Used by unit tests of the
    /// heap-walk machinery.
    #[must_use]
    pub fn view(&self) -> impl HeapView + '_ {
        ReplayHeap { fixture: self }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SegmentFixture {
    pub kind: SegmentKindFixture,
    pub length: u64,
}

/// Serde-friendly mirror of [`SegmentKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentKindFixture {
    Gen0,
    Gen1,
    Gen2,
    Large,
    Pinned,
}

impl From<SegmentKindFixture> for SegmentKind {
    fn from(kind: SegmentKindFixture) -> Self {
        match kind {
            SegmentKindFixture::Gen0 => SegmentKind::Gen0,
            SegmentKindFixture::Gen1 => SegmentKind::Gen1,
            SegmentKindFixture::Gen2 => SegmentKind::Gen2,
            SegmentKindFixture::Large => SegmentKind::Large,
            SegmentKindFixture::Pinned => SegmentKind::Pinned,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SyncBlockFixture {
    #[serde(default)]
    pub waiting_thread_count: u32,
    #[serde(default)]
    pub is_monitor_held: bool,
    #[serde(default)]
    pub holding_thread_address: Option<u64>,
    pub object_address: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectFixture {
    pub address: u64,
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub size: u64,
    /// `Some` makes the object a string with this content.
    #[serde(default)]
    pub string_value: Option<String>,
    #[serde(default = "yes")]
    pub valid: bool,
    /// Simulate a torn string read.
    #[serde(default)]
    pub read_fails: bool,
}

impl Default for ObjectFixture {
    fn default() -> Self {
        Self {
            address: 0,
            type_name: None,
            size: 0,
            string_value: None,
            valid: true,
            read_fails: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleFixture {
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

// =============================================================================
// TRAIT IMPLEMENTATIONS
// =============================================================================

/// Reader that loads a [`DumpFixture`] from the path it is given.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayReader;

impl DumpReader for ReplayReader {
    fn open(&self, path: &Path) -> Result<Box<dyn DumpSession + '_>> {
        let fixture = DumpFixture::from_file(path)?;
        log::debug!(
            "Opened replay capture {} ({} runtime(s))",
            path.display(),
            fixture.runtimes.len()
        );
        Ok(Box::new(ReplaySession { fixture }))
    }
}

struct ReplaySession {
    fixture: DumpFixture,
}

impl DumpSession for ReplaySession {
    fn runtimes(&self) -> Vec<RuntimeBanner> {
        self.fixture
            .runtimes
            .iter()
            .map(|r| RuntimeBanner { flavor: r.flavor.clone(), version: r.version.clone() })
            .collect()
    }

    fn create_runtime(&self, index: usize) -> Result<Box<dyn RuntimeView + '_>> {
        let fixture = self
            .fixture
            .runtimes
            .get(index)
            .with_context(|| format!("No runtime at index {index}"))?;
        Ok(Box::new(ReplayRuntime { fixture }))
    }
}

struct ReplayRuntime<'a> {
    fixture: &'a RuntimeFixture,
}

impl RuntimeView for ReplayRuntime<'_> {
    fn threads(&self) -> Vec<Box<dyn ThreadView + '_>> {
        self.fixture
            .threads
            .iter()
            .map(|t| Box::new(ReplayThread { fixture: t }) as Box<dyn ThreadView>)
            .collect()
    }

    fn heap(&self) -> Option<Box<dyn HeapView + '_>> {
        self.fixture
            .heap
            .as_ref()
            .map(|h| Box::new(ReplayHeap { fixture: h }) as Box<dyn HeapView>)
    }

    fn modules(&self) -> Vec<ModuleRecord> {
        self.fixture
            .modules
            .iter()
            .map(|m| ModuleRecord { name: m.name.clone(), size: m.size })
            .collect()
    }
}

struct ReplayThread<'a> {
    fixture: &'a ThreadFixture,
}

impl ThreadView for ReplayThread<'_> {
    fn managed_id(&self) -> u32 {
        self.fixture.managed_id
    }

    fn address(&self) -> u64 {
        self.fixture.address
    }

    fn is_alive(&self) -> bool {
        self.fixture.is_alive
    }

    fn state_text(&self) -> String {
        self.fixture.state.clone()
    }

    fn lock_count(&self) -> u32 {
        self.fixture.lock_count
    }

    fn current_exception(&self) -> Option<ExceptionInfo> {
        self.fixture.exception.as_ref().map(|e| ExceptionInfo {
            type_name: e.type_name.clone(),
            message: e.message.clone(),
        })
    }

    fn is_finalizer(&self) -> bool {
        self.fixture.is_finalizer
    }

    fn is_gc(&self) -> bool {
        self.fixture.is_gc
    }

    fn cpu_time_ms(&self) -> Result<Option<f64>> {
        if self.fixture.cpu_time_fails {
            anyhow::bail!("CPU time unavailable for thread {}", self.fixture.managed_id);
        }
        Ok(self.fixture.cpu_time_ms)
    }

    fn stack_roots(&self) -> Result<Vec<u64>> {
        Ok(self.fixture.stack_roots.clone())
    }

    fn stack_frames(&self) -> Result<Vec<String>> {
        if self.fixture.frames_fail {
            anyhow::bail!("Stack unwind failed for thread {}", self.fixture.managed_id);
        }
        Ok(self.fixture.frames.clone())
    }
}

struct ReplayHeap<'a> {
    fixture: &'a HeapFixture,
}

impl HeapView for ReplayHeap<'_> {
    fn can_walk(&self) -> bool {
        self.fixture.can_walk
    }

    fn is_server(&self) -> bool {
        self.fixture.is_server
    }

    fn segments(&self) -> Vec<SegmentRecord> {
        self.fixture
            .segments
            .iter()
            .map(|s| SegmentRecord { kind: s.kind.into(), length: s.length })
            .collect()
    }

    fn objects(&self) -> Box<dyn Iterator<Item = Box<dyn ObjectView + '_>> + '_> {
        Box::new(
            self.fixture
                .objects
                .iter()
                .map(|o| Box::new(ReplayObject { fixture: o }) as Box<dyn ObjectView>),
        )
    }

    fn object_at(&self, address: u64) -> Option<Box<dyn ObjectView + '_>> {
        self.fixture
            .objects
            .iter()
            .find(|o| o.address == address)
            .map(|o| Box::new(ReplayObject { fixture: o }) as Box<dyn ObjectView>)
    }

    fn sync_blocks(&self) -> Vec<SyncBlockRecord> {
        self.fixture
            .sync_blocks
            .iter()
            .map(|b| SyncBlockRecord {
                waiting_thread_count: b.waiting_thread_count,
                is_monitor_held: b.is_monitor_held,
                holding_thread_address: b.holding_thread_address,
                object_address: b.object_address,
            })
            .collect()
    }
}

struct ReplayObject<'a> {
    fixture: &'a ObjectFixture,
}

impl ObjectView for ReplayObject<'_> {
    fn address(&self) -> u64 {
        self.fixture.address
    }

    fn is_valid(&self) -> bool {
        self.fixture.valid
    }

    fn type_name(&self) -> Option<String> {
        self.fixture.type_name.clone()
    }

    fn is_string(&self) -> bool {
        self.fixture.string_value.is_some()
    }

    fn size(&self) -> u64 {
        self.fixture.size
    }

    fn read_string(&self, max_chars: usize) -> Result<String> {
        if self.fixture.read_fails {
            anyhow::bail!("String read failed at 0x{:x}", self.fixture.address);
        }
        let value = self
            .fixture
            .string_value
            .as_deref()
            .with_context(|| format!("Object at 0x{:x} is not a string", self.fixture.address))?;
        Ok(value.chars().take(max_chars).collect())
    }
}
