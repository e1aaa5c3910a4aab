//! Blocking rules: monitor contention and deadlock candidates.

use crate::analysis::findings::{Finding, Severity};
use crate::snapshot::model::Snapshot;

/// Contention is critical past either of these.
const SYNC_BLOCK_CRITICAL: usize = 10;
const WAITERS_CRITICAL: u64 = 5;

/// Sync-block volume and held locks.
pub(crate) fn blocking_signals(snapshot: &Snapshot, findings: &mut Vec<Finding>) {
    let locks_held = snapshot.threads.iter().filter(|t| t.lock_count > 0).count();
    let blocking = &snapshot.blocking;

    if blocking.sync_block_count > 0 {
        let severity = if blocking.sync_block_count > SYNC_BLOCK_CRITICAL
            || blocking.waiting_thread_count > WAITERS_CRITICAL
        {
            Severity::Critical
        } else {
            Severity::Warning
        };
        findings.push(Finding::new(
            severity,
            "Synchronization contention",
            format!(
                "{} active sync blocks, {} waiting threads, {} captured \
                 threads holding locks",
                blocking.sync_block_count, blocking.waiting_thread_count, locks_held
            ),
            "Threads are serializing on monitors; find the contended objects \
             in the deadlock candidates and shorten or shard the critical \
             sections.",
        ));
    } else if locks_held > 0 {
        findings.push(Finding::new(
            Severity::Warning,
            "Locks held by managed threads",
            format!("{locks_held} captured threads hold at least one lock"),
            "Locks are held without visible contention; harmless now, but \
             verify they are released promptly on all paths.",
        ));
    }
}

/// Monitors with live waiters.
pub(crate) fn deadlock_signals(snapshot: &Snapshot, findings: &mut Vec<Finding>) {
    let contended: Vec<String> = snapshot
        .deadlocks
        .iter()
        .filter(|c| c.waiting_threads > 0)
        .map(|c| {
            let owner = match c.owner_thread_id {
                Some(id) => id.to_string(),
                None => "unknown owner".to_string(),
            };
            format!(
                "Monitor at {} held by {}, {} thread(s) waiting",
                c.object_address, owner, c.waiting_threads
            )
        })
        .collect();

    if !contended.is_empty() {
        findings.push(Finding::new(
            Severity::Critical,
            "Potential deadlock/monitor contention",
            contended.join("\n"),
            "Threads are queued on held monitors; cross-reference the owner \
             threads' stacks to see whether they can ever release.",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testkit::{base_snapshot, thread};
    use crate::domain::{ObjectAddress, ThreadId};
    use crate::snapshot::model::DeadlockCandidate;

    #[test]
    fn test_contention_critical_on_many_waiters() {
        let mut snapshot = base_snapshot();
        snapshot.blocking.sync_block_count = 6;
        snapshot.blocking.waiting_thread_count = 12;
        let mut findings = Vec::new();
        blocking_signals(&snapshot, &mut findings);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].title, "Synchronization contention");
        assert_eq!(findings[0].severity, Severity::Critical);
    }

    #[test]
    fn test_contention_warning_when_mild() {
        let mut snapshot = base_snapshot();
        snapshot.blocking.sync_block_count = 3;
        snapshot.blocking.waiting_thread_count = 2;
        let mut findings = Vec::new();
        blocking_signals(&snapshot, &mut findings);
        assert_eq!(findings[0].severity, Severity::Warning);
    }

    #[test]
    fn test_held_locks_without_sync_blocks() {
        let mut snapshot = base_snapshot();
        let mut holder = thread(1, "Running");
        holder.lock_count = 2;
        snapshot.threads = vec![holder];
        let mut findings = Vec::new();
        blocking_signals(&snapshot, &mut findings);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].title, "Locks held by managed threads");
    }

    #[test]
    fn test_quiet_when_no_locks_anywhere() {
        let mut snapshot = base_snapshot();
        snapshot.threads = vec![thread(1, "Running")];
        let mut findings = Vec::new();
        blocking_signals(&snapshot, &mut findings);
        assert!(findings.is_empty());
    }

    #[test]
    fn test_deadlock_lists_owner_and_unknown() {
        let mut snapshot = base_snapshot();
        snapshot.deadlocks = vec![
            DeadlockCandidate {
                owner_thread_id: Some(ThreadId(3)),
                waiting_threads: 2,
                object_address: ObjectAddress(0xabc0),
            },
            DeadlockCandidate {
                owner_thread_id: None,
                waiting_threads: 1,
                object_address: ObjectAddress(0xdef0),
            },
            // Held but uncontended: not listed
            DeadlockCandidate {
                owner_thread_id: Some(ThreadId(4)),
                waiting_threads: 0,
                object_address: ObjectAddress(0x1230),
            },
        ];

        let mut findings = Vec::new();
        deadlock_signals(&snapshot, &mut findings);
        assert_eq!(findings.len(), 1);
        let evidence = &findings[0].evidence;
        assert!(evidence.contains("0xabc0"));
        assert!(evidence.contains("Thread 3"));
        assert!(evidence.contains("0xdef0"));
        assert!(evidence.contains("unknown owner"));
        assert!(!evidence.contains("0x1230"));
    }

    #[test]
    fn test_no_deadlock_finding_without_waiters() {
        let mut snapshot = base_snapshot();
        snapshot.deadlocks = vec![DeadlockCandidate {
            owner_thread_id: Some(ThreadId(1)),
            waiting_threads: 0,
            object_address: ObjectAddress(0x10),
        }];
        let mut findings = Vec::new();
        deadlock_signals(&snapshot, &mut findings);
        assert!(findings.is_empty());
    }
}
