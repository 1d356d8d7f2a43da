//! Common test utilities and fixtures
//!
//! Shared setup for the orchestrator, server and CLI tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use backrooms::ledger::{LedgerStore, ManualClock, UsageLedger};
use backrooms::orchestrator::{ChatEvent, Orchestrator, SessionId, Trigger};
use backrooms::persona::{Persona, PersonaRotation};
use backrooms::provider::MockProvider;
use chrono::NaiveDate;
use tempfile::TempDir;

/// Get the path to the test fixtures directory
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Get a path to a specific fixture file
pub fn fixture_path(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

/// Fixed "today" for every ledger built here
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

/// Two personas, A then B
pub fn rotation_ab() -> PersonaRotation {
    PersonaRotation::new(vec![
        Persona::new("A", "model-a", "You are A."),
        Persona::new("B", "model-b", "You are B."),
    ])
    .unwrap()
}

/// Everything a turn needs, backed by a temp directory
pub struct Harness {
    pub dir: TempDir,
    pub clock: Arc<ManualClock>,
    pub ledger: Arc<UsageLedger>,
    pub provider: Arc<MockProvider>,
    pub orchestrator: Arc<Orchestrator>,
}

impl Harness {
    /// Fresh ledger at zero
    pub fn new(limit: u32, provider: MockProvider) -> Self {
        Self::with_count(limit, 0, provider)
    }

    /// Ledger that has already spent `count` calls today
    pub fn with_count(limit: u32, count: u32, provider: MockProvider) -> Self {
        let dir = TempDir::new().unwrap();
        let path = ledger_path(dir.path());
        if count > 0 {
            LedgerStore::new(&path).write(count, today()).unwrap();
        }
        Self::build(dir, path, limit, provider)
    }

    /// Ledger whose parent "directory" is a regular file, so every write fails
    pub fn unwritable(limit: u32, provider: MockProvider) -> Self {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let path = blocker.join("api_usage.json");
        Self::build(dir, path, limit, provider)
    }

    fn build(dir: TempDir, path: PathBuf, limit: u32, provider: MockProvider) -> Self {
        let clock = Arc::new(ManualClock::new(today()));
        let ledger = Arc::new(UsageLedger::new(LedgerStore::new(&path), limit, clock.clone()));
        let provider = Arc::new(provider);
        let orchestrator = Arc::new(Orchestrator::new(
            ledger.clone(),
            rotation_ab(),
            provider.clone(),
        ));

        Self {
            dir,
            clock,
            ledger,
            provider,
            orchestrator,
        }
    }

    pub fn ledger_path(&self) -> PathBuf {
        ledger_path(self.dir.path())
    }

    pub fn count(&self) -> u32 {
        self.ledger.read().count
    }

    /// Run one turn on `id`, creating the session if needed
    pub async fn trigger(&self, id: SessionId, trigger: Trigger) -> ChatEvent {
        let session = self.orchestrator.session(id);
        self.orchestrator
            .trigger(&session, trigger)
            .await
            .expect("session is open")
    }
}

fn ledger_path(dir: &Path) -> PathBuf {
    dir.join("api_usage.json")
}
