//! # Dumpscope - Offline Triage for Managed-Runtime Process Dumps
//!
//! Dumpscope takes one crash dump of a managed-runtime process (a stalled
//! web-server worker, an OOM-killed service) and turns it into a ranked list
//! of findings with evidence and remediation text. It never attaches to a
//! live process, never modifies the dump, and never touches the network.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Dump File (.dmp)                         │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ opened by a reader backend
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │               Inspector Traits (capability set)                 │
//! │  threads · stack roots · heap objects · segments · sync blocks  │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ bounded, deterministic walk
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Dumpscope (This Crate)                      │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │   Snapshot   │──▶│   Reasoner   │──▶│   Reports    │         │
//! │  │   Builder    │   │ (rule groups)│   │ (console/JSON)│        │
//! │  └──────────────┘   └──────────────┘   └──────────────┘         │
//! │         │                                                       │
//! │         ▼                                                       │
//! │  ┌──────────────┐                                               │
//! │  │ DataWarnings │  every enforced limit is observable           │
//! │  └──────────────┘                                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! ### Core Pipeline Modules
//!
//! - [`snapshot`]: the extraction pipeline and its data model
//!   - `builder`: eleven deterministic phases from open to warning sort
//!   - `threads`: interest scoring and bounded thread selection
//!   - `strings`: head+tail truncation and value deduplication
//!   - `heap`: object walk feeding the type histogram and heap strings
//!
//! - [`analysis`]: the pure reasoner, sixteen independent rule groups over
//!   the snapshot's quantitative and textual signals, in a fixed order
//!
//! - [`inspector`]: the capability traits the dump reader implements, plus
//!   the in-tree replay backend (JSON captures, used by the CLI and tests)
//!
//! ### Supporting Modules
//!
//! - [`export`]: the pretty-printed `{snapshot, findings}` JSON report
//! - [`cli`]: command-line argument parsing and clamping
//! - [`domain`]: newtype ids, core errors, cooperative cancellation
//!
//! ## Design Rules
//!
//! - **Every limit is observable.** Thread caps, string caps, histogram
//!   truncation, module display caps: each enforcement lands a
//!   [`snapshot::DataWarning`] on the snapshot, and the reasoner rolls them
//!   into a finding so truncation is never mistaken for absence.
//! - **Partial dumps still triage.** Per-item reader failures (one stack,
//!   one string, one property) degrade to skips or warnings; only a missing
//!   file, a runtime-less dump, or a broken session abort the build.
//! - **The reasoner is pure.** Rule groups read the snapshot and nothing
//!   else; two runs over the same snapshot produce identical findings.
//!
//! ## Typical Usage
//!
//! ```bash
//! # Triage a captured dump
//! dumpscope worker-pool.dmp.json
//!
//! # Widen the heap histogram and keep a machine-readable report
//! dumpscope worker-pool.dmp.json --heap-histogram 50 --json report.json
//! ```

pub mod analysis;
pub mod cli;
pub mod domain;
pub mod export;
pub mod inspector;
pub mod snapshot;
