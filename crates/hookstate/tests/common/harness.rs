//! Test harness with temp manifest and state files and a fake API.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use hookstate::{load_manifests, Client, Manifest, Plan, StateFile};

use super::builders::manifests_yaml;
use super::fake_api::FakeStripe;

pub struct TestHarness {
    temp_dir: TempDir,
    pub manifest_path: PathBuf,
    pub state_path: PathBuf,
    pub stripe: FakeStripe,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let manifest_path = temp_dir.path().join("hookstate.yaml");
        let state_path = temp_dir.path().join("hookstate.state.json");
        Self {
            temp_dir,
            manifest_path,
            state_path,
            stripe: FakeStripe::new(),
        }
    }

    /// A client backed by this harness's fake.
    pub fn client(&self) -> Client {
        Client::with_webhook_endpoints(self.stripe.clone())
    }

    pub fn write_manifests(&self, manifests: &[Manifest]) {
        fs::write(&self.manifest_path, manifests_yaml(manifests))
            .expect("Failed to write manifest");
    }

    pub fn state(&self) -> StateFile {
        StateFile::load(&self.state_path).expect("Failed to load state")
    }

    pub fn plan(&self) -> Plan {
        let manifests = load_manifests(&self.manifest_path).expect("Failed to load manifests");
        hookstate::plan(&manifests, &self.state()).expect("Failed to plan")
    }

    /// Plans from the manifest file and applies against the fake.
    pub fn apply(&self) -> hookstate::Result<hookstate::ApplySummary> {
        let plan = self.plan();
        let mut state = self.state();
        hookstate::apply(&self.client(), &plan, &mut state, &self.state_path)
    }
}
