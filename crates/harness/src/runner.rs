//! Phase runner
//!
//! Drives one run through every [`Phase`] in order. Each phase is a full
//! batch over the objects: all N are created before any reference is
//! captured, all N references are captured before any object is unlinked.
//! Interleaving would let the filesystem reuse freed inodes from cache and
//! hide the bug under test.
//!
//! # Error handling
//!
//! Setup errors abort the run immediately and are returned as
//! [`SetupError`]. Classification failures are recorded in the
//! [`RunReport`] and evaluation continues through the remaining references.
//! No operation is retried.

use crate::classify::{classify, run_hint};
use crate::config::{ConfigError, HarnessConfig};
use crate::report::{EvictionStatus, PhaseTiming, RunReport};
use stalefh_core::{
    FilesystemToken, ObjectIndex, ObjectReference, OutcomeRecord, Phase, SetupError, SetupResult,
};
use stalefh_platform::Collaborators;
use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Stale file-handle harness.
///
/// Owns its configuration and collaborators; a single harness can run
/// against the same directory repeatedly, and every run starts from scratch.
#[derive(Debug)]
pub struct Harness {
    config: HarnessConfig,
    collaborators: Collaborators,
}

impl Harness {
    /// Create a harness after validating `config`.
    pub fn new(config: HarnessConfig, collaborators: Collaborators) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Harness {
            config,
            collaborators,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run the full protocol against `target`.
    ///
    /// Returns a report whenever setup succeeded; the report's verdict says
    /// whether every reference was correctly rejected.
    ///
    /// # Errors
    ///
    /// Returns a [`SetupError`] if the environment is broken: missing target,
    /// resolver failure, or a create, flush, capture or unlink failure.
    pub fn run(&self, target: &Path) -> SetupResult<RunReport> {
        info!(
            target: "stalefh::harness",
            path = %target.display(),
            objects = self.config.object_count,
            flush_passes = self.config.flush_passes,
            "Starting stale handle run"
        );

        let mut timings = Vec::with_capacity(Phase::ALL.len());

        timed(&mut timings, Phase::ValidateTarget, 1, || {
            validate_target(target)
        })?;

        let fs = timed(&mut timings, Phase::ResolveFilesystem, 1, || {
            self.collaborators
                .resolver
                .resolve_filesystem(target)
                .map_err(|source| SetupError::ResolveFilesystem {
                    path: target.to_path_buf(),
                    source,
                })
        })?;

        let mut batch = Batch::new(target);
        let references = match self.populate(&fs, &mut batch, &mut timings) {
            Ok(references) => references,
            Err(e) => {
                warn!(
                    target: "stalefh::harness",
                    phase = %e.phase(),
                    error = %e,
                    "Setup failed, aborting run"
                );
                if self.cleans_up_after(&e) {
                    batch.cleanup();
                }
                return Err(e);
            }
        };

        let passes = self.config.flush_passes;
        timed(&mut timings, Phase::PostDeleteBarrier, passes as usize, || {
            for _ in 0..passes {
                self.flush(&fs, Phase::PostDeleteBarrier)?;
            }
            Ok(())
        })?;

        let eviction = self.evict(&mut timings);
        let captured = references.len();
        let outcomes = self.validate(&fs, references, &mut timings);

        let report = RunReport {
            target: target.to_path_buf(),
            config: self.config.clone(),
            captured,
            eviction,
            phases: timings,
            outcomes,
        };
        info!(target: "stalefh::harness", "{}", report.summary());
        Ok(report)
    }

    /// Create, flush, capture and delete: the phases that leave objects on
    /// disk if they fail.
    fn populate(
        &self,
        fs: &FilesystemToken,
        batch: &mut Batch,
        timings: &mut Vec<PhaseTiming>,
    ) -> SetupResult<Vec<ObjectReference>> {
        let count = self.config.object_count;

        timed(timings, Phase::Create, count, || {
            for index in ObjectIndex::range(count) {
                batch.create(index, self.config.file_mode)?;
            }
            Ok(())
        })?;

        timed(timings, Phase::PreCaptureBarrier, 1, || {
            self.flush(fs, Phase::PreCaptureBarrier)
        })?;

        let references = timed(timings, Phase::Capture, count, || self.capture(fs, batch))?;

        timed(timings, Phase::Delete, count, || {
            for index in ObjectIndex::range(count) {
                batch.unlink(index)?;
            }
            Ok(())
        })?;

        Ok(references)
    }

    /// Whether an abort with `err` should unlink the objects created so far.
    fn cleans_up_after(&self, err: &SetupError) -> bool {
        self.config.cleanup_on_abort && err.phase().objects_may_exist()
    }

    fn capture(&self, fs: &FilesystemToken, batch: &Batch) -> SetupResult<Vec<ObjectReference>> {
        let mut references = Vec::with_capacity(self.config.object_count);
        for index in ObjectIndex::range(self.config.object_count) {
            let path = batch.path(index);
            let reference = self
                .collaborators
                .resolver
                .resolve_object(index, &path)
                .map_err(|source| SetupError::Capture {
                    index,
                    path: path.clone(),
                    source,
                })?;
            if reference.mount_id() != fs.mount_id() {
                return Err(SetupError::MountMismatch {
                    index,
                    expected: fs.mount_id(),
                    actual: reference.mount_id(),
                });
            }
            references.push(reference);
        }
        Ok(references)
    }

    fn flush(&self, fs: &FilesystemToken, phase: Phase) -> SetupResult<()> {
        self.collaborators
            .barrier
            .flush(fs)
            .map_err(|source| SetupError::Barrier { phase, source })
    }

    /// Fire-and-forget: an eviction error is logged, never fatal.
    fn evict(&self, timings: &mut Vec<PhaseTiming>) -> EvictionStatus {
        let start = Instant::now();
        let status = match self.collaborators.evictor.evict_all() {
            Ok(()) => EvictionStatus::Completed,
            Err(e) => {
                warn!(
                    target: "stalefh::harness",
                    error = %e,
                    "Cache eviction failed; references may resolve from cache"
                );
                EvictionStatus::Failed {
                    message: e.to_string(),
                }
            }
        };
        timings.push(PhaseTiming::new(Phase::Evict, 1, start.elapsed()));
        status
    }

    /// Reopen every reference and classify the result. Each reference is
    /// consumed, releasing its handle bytes, once its record is produced.
    fn validate(
        &self,
        fs: &FilesystemToken,
        references: Vec<ObjectReference>,
        timings: &mut Vec<PhaseTiming>,
    ) -> Vec<OutcomeRecord> {
        let start = Instant::now();
        let total = references.len();
        let mut outcomes = Vec::with_capacity(total);

        for reference in references {
            let index = reference.index();
            let result = self.collaborators.opener.open_by_reference(
                fs,
                &reference,
                self.config.reopen_access,
            );
            let record = classify(index, result);
            if let Some(reason) = record.failure() {
                warn!(
                    target: "stalefh::harness",
                    index = index.get(),
                    handle_len = reference.len(),
                    "open_by_handle({}) {}",
                    index,
                    reason
                );
            }
            outcomes.push(record);
        }

        if let Some(hint) = run_hint(&outcomes) {
            warn!(target: "stalefh::harness", "{}", hint);
        }
        timings.push(PhaseTiming::new(Phase::Validate, total, start.elapsed()));
        outcomes
    }
}

/// Run `f` as `phase`, recording its timing if it succeeds.
fn timed<T>(
    timings: &mut Vec<PhaseTiming>,
    phase: Phase,
    operations: usize,
    f: impl FnOnce() -> SetupResult<T>,
) -> SetupResult<T> {
    debug!(target: "stalefh::harness", phase = %phase, operations, "Phase started");
    let start = Instant::now();
    let value = f()?;
    let timing = PhaseTiming::new(phase, operations, start.elapsed());
    debug!(
        target: "stalefh::harness",
        phase = %phase,
        operations,
        duration_us = timing.duration_us,
        "Phase complete"
    );
    timings.push(timing);
    Ok(value)
}

fn validate_target(target: &Path) -> SetupResult<()> {
    let metadata = std::fs::metadata(target).map_err(|source| SetupError::TargetMissing {
        path: target.to_path_buf(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(SetupError::NotADirectory {
            path: target.to_path_buf(),
        });
    }
    Ok(())
}

/// Objects of one run that may still exist on disk.
///
/// Objects are created and unlinked in index order, so the live set is
/// always the range `deleted..created`.
#[derive(Debug)]
struct Batch {
    dir: PathBuf,
    created: usize,
    deleted: usize,
}

impl Batch {
    fn new(dir: &Path) -> Self {
        Batch {
            dir: dir.to_path_buf(),
            created: 0,
            deleted: 0,
        }
    }

    fn path(&self, index: ObjectIndex) -> PathBuf {
        index.path_in(&self.dir)
    }

    fn create(&mut self, index: ObjectIndex, mode: u32) -> SetupResult<()> {
        let path = self.path(index);
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .mode(mode)
            .open(&path)
            .map_err(|source| SetupError::Create {
                index,
                path,
                source,
            })?;
        self.created = index.get() + 1;
        Ok(())
    }

    fn unlink(&mut self, index: ObjectIndex) -> SetupResult<()> {
        let path = self.path(index);
        std::fs::remove_file(&path).map_err(|source| SetupError::Unlink {
            index,
            path,
            source,
        })?;
        self.deleted = index.get() + 1;
        Ok(())
    }

    /// Best-effort unlink of every object still live. Errors are ignored.
    fn cleanup(&mut self) {
        let mut removed = 0usize;
        for index in (self.deleted..self.created).map(ObjectIndex::new) {
            if std::fs::remove_file(self.path(index)).is_ok() {
                removed += 1;
            }
        }
        info!(
            target: "stalefh::harness",
            removed,
            "Removed leftover test objects"
        );
        self.deleted = self.created;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCollaborators, FakeEvent, FakeResponse};
    use stalefh_core::{FailureReason, Verdict};
    use tempfile::TempDir;

    fn harness(fakes: FakeCollaborators) -> Harness {
        Harness::new(HarnessConfig::for_testing(), fakes.into_collaborators()).unwrap()
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = HarnessConfig::for_testing().with_flush_passes(0);
        let err = Harness::new(config, FakeCollaborators::new().into_collaborators()).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroFlushPasses));
    }

    #[test]
    fn test_clean_run_passes() {
        let dir = TempDir::new().unwrap();
        let report = harness(FakeCollaborators::new()).run(dir.path()).unwrap();

        assert_eq!(report.verdict(), Verdict::Pass);
        assert_eq!(report.captured, 16);
        assert_eq!(report.outcomes.len(), 16);
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_every_phase_is_timed_in_order() {
        let dir = TempDir::new().unwrap();
        let report = harness(FakeCollaborators::new()).run(dir.path()).unwrap();

        let phases: Vec<Phase> = report.phases.iter().map(|t| t.phase).collect();
        assert_eq!(phases, Phase::ALL.to_vec());
        assert_eq!(report.timing(Phase::PostDeleteBarrier).unwrap().operations, 2);
    }

    #[test]
    fn test_collaborator_call_order() {
        let dir = TempDir::new().unwrap();
        let fakes = FakeCollaborators::new();
        let probe = fakes.probe();
        harness(fakes).run(dir.path()).unwrap();

        let log = &probe.log;
        let is_flush = |e: &FakeEvent| *e == FakeEvent::Flush;
        let is_resolve = |e: &FakeEvent| matches!(e, FakeEvent::Resolve(_));
        let is_open = |e: &FakeEvent| matches!(e, FakeEvent::Open(_));

        assert_eq!(log.position(|e| *e == FakeEvent::ResolveFilesystem), Some(0));
        assert_eq!(log.count(is_flush), 3);
        // one flush before the first capture, the other two after the last
        assert!(log.position(is_flush).unwrap() < log.position(is_resolve).unwrap());
        let evict = log.position(|e| *e == FakeEvent::Evict).unwrap();
        assert!(log.rposition(is_flush).unwrap() < evict);
        assert!(log.rposition(is_resolve).unwrap() < evict);
        assert!(evict < log.position(is_open).unwrap());
        assert_eq!(log.count(is_open), 16);
    }

    #[test]
    fn test_references_reopened_in_index_order() {
        let dir = TempDir::new().unwrap();
        let fakes = FakeCollaborators::new();
        let probe = fakes.probe();
        harness(fakes).run(dir.path()).unwrap();

        let opened: Vec<usize> = probe
            .log
            .events()
            .into_iter()
            .filter_map(|e| match e {
                FakeEvent::Open(index) => Some(index.get()),
                _ => None,
            })
            .collect();
        assert_eq!(opened, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn test_flush_passes_is_tunable() {
        let dir = TempDir::new().unwrap();
        let fakes = FakeCollaborators::new();
        let probe = fakes.probe();
        let config = HarnessConfig::for_testing().with_flush_passes(5);
        let harness = Harness::new(config, fakes.into_collaborators()).unwrap();

        let report = harness.run(dir.path()).unwrap();
        assert_eq!(report.config.flush_passes, 5);
        assert_eq!(probe.log.count(|e| *e == FakeEvent::Flush), 6);
    }

    #[test]
    fn test_spurious_open_is_reported_and_closed() {
        let dir = TempDir::new().unwrap();
        let fakes = FakeCollaborators::new().with_response(ObjectIndex::new(5), FakeResponse::Open);
        let probe = fakes.probe();

        let report = harness(fakes).run(dir.path()).unwrap();

        assert_eq!(report.verdict(), Verdict::Fail);
        let failing: Vec<_> = report.failures().map(|r| r.index.get()).collect();
        assert_eq!(failing, vec![5]);
        assert_eq!(probe.opened(), 1);
        assert_eq!(probe.closed(), 1);
    }

    #[test]
    fn test_unexpected_errno_fails_but_run_continues() {
        let dir = TempDir::new().unwrap();
        let fakes = FakeCollaborators::new()
            .with_response(ObjectIndex::new(0), FakeResponse::Errno(5))
            .with_response(ObjectIndex::new(15), FakeResponse::Errno(1));

        let report = harness(fakes).run(dir.path()).unwrap();

        assert_eq!(report.outcomes.len(), 16);
        assert_eq!(report.failure_count(), 2);
        assert!(matches!(
            report.outcomes[15].failure(),
            Some(FailureReason::UnexpectedError { code: Some(1), .. })
        ));
    }

    #[test]
    fn test_stale_counts_as_pass() {
        let dir = TempDir::new().unwrap();
        let fakes = FakeCollaborators::new().with_default_response(FakeResponse::Stale);
        assert!(harness(fakes).run(dir.path()).unwrap().passed());
    }

    #[test]
    fn test_eviction_failure_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let fakes = FakeCollaborators::new().failing_eviction();

        let report = harness(fakes).run(dir.path()).unwrap();

        assert!(report.passed());
        assert!(matches!(report.eviction, EvictionStatus::Failed { .. }));
    }

    #[test]
    fn test_missing_target_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent");
        let fakes = FakeCollaborators::new();
        let probe = fakes.probe();

        let err = harness(fakes).run(&missing).unwrap_err();

        assert!(matches!(err, SetupError::TargetMissing { .. }));
        assert!(probe.log.events().is_empty());
        assert!(!missing.exists());
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_file_target_is_rejected() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain");
        std::fs::write(&file, b"x").unwrap();

        let err = harness(FakeCollaborators::new()).run(&file).unwrap_err();
        assert!(matches!(err, SetupError::NotADirectory { .. }));
    }

    #[test]
    fn test_filesystem_resolve_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let fakes = FakeCollaborators::new().failing_filesystem_resolve();

        let err = harness(fakes).run(dir.path()).unwrap_err();

        assert_eq!(err.phase(), Phase::ResolveFilesystem);
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_capture_failure_cleans_up() {
        let dir = TempDir::new().unwrap();
        let fakes = FakeCollaborators::new().failing_capture_at(ObjectIndex::new(7));
        let probe = fakes.probe();

        let err = harness(fakes).run(dir.path()).unwrap_err();

        assert!(matches!(err, SetupError::Capture { index, .. } if index.get() == 7));
        assert_eq!(entries(dir.path()), 0);
        assert_eq!(probe.log.count(|e| matches!(e, FakeEvent::Open(_))), 0);
    }

    #[test]
    fn test_capture_failure_without_cleanup_leaves_objects() {
        let dir = TempDir::new().unwrap();
        let fakes = FakeCollaborators::new().failing_capture_at(ObjectIndex::new(0));
        let config = HarnessConfig::for_testing().with_cleanup_on_abort(false);
        let harness = Harness::new(config, fakes.into_collaborators()).unwrap();

        assert!(harness.run(dir.path()).is_err());
        assert_eq!(entries(dir.path()), 16);
    }

    #[test]
    fn test_cleanup_only_follows_phases_that_leave_objects() {
        let barrier_error = |phase| SetupError::Barrier {
            phase,
            source: std::io::Error::new(std::io::ErrorKind::Other, "flush failed"),
        };
        let harness = harness(FakeCollaborators::new());

        assert!(harness.cleans_up_after(&barrier_error(Phase::PreCaptureBarrier)));
        assert!(!harness.cleans_up_after(&barrier_error(Phase::PostDeleteBarrier)));
        assert!(!harness.cleans_up_after(&SetupError::NotADirectory {
            path: PathBuf::from("/etc/hosts"),
        }));
        assert!(harness.cleans_up_after(&SetupError::MountMismatch {
            index: ObjectIndex::new(0),
            expected: 1,
            actual: 2,
        }));

        let keep = Harness::new(
            HarnessConfig::for_testing().with_cleanup_on_abort(false),
            FakeCollaborators::new().into_collaborators(),
        )
        .unwrap();
        assert!(!keep.cleans_up_after(&barrier_error(Phase::PreCaptureBarrier)));
    }

    #[test]
    fn test_filesystem_resolve_failure_leaves_existing_objects() {
        let dir = TempDir::new().unwrap();
        let leftover = ObjectIndex::new(0).path_in(dir.path());
        std::fs::write(&leftover, b"from an earlier run").unwrap();
        let fakes = FakeCollaborators::new().failing_filesystem_resolve();

        assert!(harness(fakes).run(dir.path()).is_err());
        assert!(leftover.exists());
    }

    #[test]
    fn test_mount_mismatch_is_fatal() {
        let dir = TempDir::new().unwrap();
        let fakes = FakeCollaborators::new().with_mount_override(ObjectIndex::new(3), 1234);

        let err = harness(fakes).run(dir.path()).unwrap_err();

        assert!(matches!(
            err,
            SetupError::MountMismatch { actual: 1234, .. }
        ));
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_pre_capture_flush_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let fakes = FakeCollaborators::new().failing_flush(1);

        let err = harness(fakes).run(dir.path()).unwrap_err();

        assert_eq!(err.phase(), Phase::PreCaptureBarrier);
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_post_delete_flush_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let fakes = FakeCollaborators::new().failing_flush(3);
        let probe = fakes.probe();

        let err = harness(fakes).run(dir.path()).unwrap_err();

        assert_eq!(err.phase(), Phase::PostDeleteBarrier);
        assert_eq!(probe.log.count(|e| *e == FakeEvent::Evict), 0);
    }

    #[test]
    fn test_existing_objects_are_truncated() {
        let dir = TempDir::new().unwrap();
        let first = ObjectIndex::new(0).path_in(dir.path());
        std::fs::write(&first, b"left over from a crashed run").unwrap();

        let report = harness(FakeCollaborators::new()).run(dir.path()).unwrap();

        assert!(report.passed());
        assert!(!first.exists());
    }

    #[test]
    fn test_unrelated_files_are_untouched() {
        let dir = TempDir::new().unwrap();
        let keep = dir.path().join("keep.me");
        std::fs::write(&keep, b"data").unwrap();

        harness(FakeCollaborators::new()).run(dir.path()).unwrap();

        assert_eq!(std::fs::read(&keep).unwrap(), b"data");
        assert_eq!(entries(dir.path()), 1);
    }

    #[test]
    fn test_created_objects_use_configured_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let mut batch = Batch::new(dir.path());
        batch.create(ObjectIndex::new(0), 0o600).unwrap();

        let mode = std::fs::metadata(batch.path(ObjectIndex::new(0)))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o077, 0);
    }

    #[test]
    fn test_batch_cleanup_removes_only_live_range() {
        let dir = TempDir::new().unwrap();
        let mut batch = Batch::new(dir.path());
        for index in ObjectIndex::range(4) {
            batch.create(index, 0o644).unwrap();
        }
        batch.unlink(ObjectIndex::new(0)).unwrap();
        batch.unlink(ObjectIndex::new(1)).unwrap();

        batch.cleanup();

        assert_eq!(entries(dir.path()), 0);
        assert_eq!(batch.deleted, batch.created);
    }
}
