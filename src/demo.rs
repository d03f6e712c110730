//! Dados e portal simulados para `captura demo` e `captura plan`.
//!
//! Um [`Fixture`] descreve advogados, credenciais, processos e a requisição
//! a executar. O [`FixtureDirectory`] responde às consultas do orquestrador a
//! partir dele, e o [`SimulatedPortal`] faz o papel do PJE: login por
//! tribunal/grau e captura com contagens determinísticas.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::domain::{
    CaptureOutput, Credential, Grau, GroupKey, PartyCounts, Requester, TribunalConfig, WorkItem,
};
use crate::error::{AuthenticationError, DirectoryError, WorkerError};
use crate::ports::{CaptureContext, CaptureDirectory, CaptureWorker, SessionProvider};
use crate::request::{CaptureRequest, ItemFilter};

/// Fixture usada quando nenhum arquivo é informado.
pub const EMBEDDED_FIXTURE: &str = r#"{
  "requesters": [
    { "id": 1, "name": "Dra. Helena Prado", "document": "39053344705" }
  ],
  "credentials": [
    { "id": 1, "tribunal": "TRT1", "grau": "primeiro_grau", "login": "39053344705", "password": "demo" },
    { "id": 2, "tribunal": "TRT3", "grau": "segundo_grau", "login": "39053344705", "password": "demo" },
    { "id": 3, "tribunal": "TRT2", "grau": "primeiro_grau", "login": "39053344705", "password": "demo" }
  ],
  "items": [
    { "id": 101, "process_number": "0001234-56.2023.5.01.0001", "remote_id": 88101, "tribunal": "TRT1", "grau": "primeiro_grau" },
    { "id": 102, "process_number": "0004321-11.2022.5.01.0012", "remote_id": 88102, "tribunal": "TRT1", "grau": "primeiro_grau" },
    { "id": 103, "process_number": "0100200-30.2021.5.01.0040", "remote_id": 88103, "tribunal": "TRT1", "grau": "primeiro_grau" },
    { "id": 201, "process_number": "0010555-70.2020.5.03.0008", "remote_id": 77201, "tribunal": "TRT3", "grau": "segundo_grau" },
    { "id": 202, "process_number": "0010666-01.2020.5.03.0139", "remote_id": 77202, "tribunal": "TRT3", "grau": "segundo_grau" },
    { "id": 301, "process_number": "1000123-45.2023.5.02.0701", "remote_id": 66301, "tribunal": "TRT2", "grau": "primeiro_grau" },
    { "id": 401, "process_number": "0011999-22.2019.5.15.0001", "remote_id": 55401, "tribunal": "TRT15", "grau": "primeiro_grau" }
  ],
  "request": {
    "requester_id": 1,
    "credential_ids": [1, 2, 3],
    "tribunals": ["TRT1", "TRT2", "TRT3", "TRT15"]
  },
  "portal": {
    "failing_logins": [{ "tribunal": "TRT2", "grau": "primeiro_grau" }],
    "failing_processes": ["0010666-01.2020.5.03.0139"],
    "latency_ms": 150
  }
}"#;

/// How the simulated portal misbehaves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalBehaviour {
    /// Scopes whose login is rejected.
    #[serde(default)]
    pub failing_logins: Vec<GroupKey>,
    /// Process numbers whose capture times out.
    #[serde(default)]
    pub failing_processes: Vec<String>,
    /// Artificial latency for logins and captures.
    #[serde(default)]
    pub latency_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub requesters: Vec<Requester>,
    pub credentials: Vec<Credential>,
    pub items: Vec<WorkItem>,
    /// Explicit endpoints; scopes not listed get the default PJE layout.
    #[serde(default)]
    pub tribunals: Vec<TribunalConfig>,
    pub request: CaptureRequest,
    #[serde(default)]
    pub portal: PortalBehaviour,
}

impl Fixture {
    pub fn embedded() -> Result<Self> {
        serde_json::from_str(EMBEDDED_FIXTURE).context("Failed to parse embedded fixture")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse fixture {}", path.display()))
    }
}

/// Default endpoints of a PJE instance, e.g. `https://pje.trt1.jus.br/primeirograu/login.seam`.
pub fn default_tribunal_config(key: GroupKey) -> TribunalConfig {
    let base = format!("https://pje.trt{}.jus.br", key.tribunal.region());
    let instance = match key.grau {
        Grau::PrimeiroGrau => "primeirograu",
        Grau::SegundoGrau => "segundograu",
        Grau::TribunalSuperior => "tst",
    };
    TribunalConfig {
        key,
        login_url: format!("{base}/{instance}/login.seam"),
        api_base_url: format!("{base}/pje-comum-api/api"),
        login_timeout_ms: None,
    }
}

/// Read-only directory backed by a [`Fixture`].
#[derive(Debug, Clone)]
pub struct FixtureDirectory {
    requesters: Vec<Requester>,
    credentials: Vec<Credential>,
    items: Vec<WorkItem>,
    tribunals: Vec<TribunalConfig>,
}

impl FixtureDirectory {
    pub fn new(fixture: &Fixture) -> Self {
        Self {
            requesters: fixture.requesters.clone(),
            credentials: fixture.credentials.clone(),
            items: fixture.items.clone(),
            tribunals: fixture.tribunals.clone(),
        }
    }
}

impl CaptureDirectory for FixtureDirectory {
    async fn find_requester(&self, id: i64) -> Result<Option<Requester>, DirectoryError> {
        Ok(self.requesters.iter().find(|r| r.id == id).cloned())
    }

    async fn find_credential(&self, id: i64) -> Result<Option<Credential>, DirectoryError> {
        Ok(self.credentials.iter().find(|c| c.id == id).cloned())
    }

    async fn find_items(&self, filter: &ItemFilter) -> Result<Vec<WorkItem>, DirectoryError> {
        Ok(self
            .items
            .iter()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect())
    }

    async fn tribunal_config(&self, key: GroupKey) -> Result<TribunalConfig, DirectoryError> {
        Ok(self
            .tribunals
            .iter()
            .find(|t| t.key == key)
            .cloned()
            .unwrap_or_else(|| default_tribunal_config(key)))
    }
}

#[derive(Debug)]
pub struct SimulatedSession {
    pub key: GroupKey,
    pub token: Uuid,
    pub api_base_url: String,
}

/// In-process stand-in for a court portal.
#[derive(Debug, Default)]
pub struct SimulatedPortal {
    behaviour: PortalBehaviour,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl SimulatedPortal {
    pub fn new(behaviour: PortalBehaviour) -> Self {
        Self {
            behaviour,
            ..Default::default()
        }
    }

    /// Sessions opened and not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.opened.load(Ordering::SeqCst) - self.closed.load(Ordering::SeqCst)
    }

    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if self.behaviour.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.behaviour.latency_ms)).await;
        }
    }
}

/// Deterministic party counts for a process, derived from its remote id.
pub fn simulated_counts(remote_id: i64) -> PartyCounts {
    let extra = remote_id.unsigned_abs() % 3;
    let total = 2 + extra;
    PartyCounts {
        total_parties: total,
        clients: 1,
        opposing_parties: 1,
        third_parties: extra,
        representatives: total + 1,
        links: total,
    }
}

impl SessionProvider for SimulatedPortal {
    type Session = SimulatedSession;

    async fn authenticate(
        &self,
        credential: &Credential,
        config: &TribunalConfig,
    ) -> Result<SimulatedSession, AuthenticationError> {
        self.pause().await;
        let key = credential.group_key();
        if self.behaviour.failing_logins.contains(&key) {
            return Err(AuthenticationError(format!(
                "login rejected by {}",
                config.login_url
            )));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        debug!(group = %key, login = %credential.login, "Simulated login");
        Ok(SimulatedSession {
            key,
            token: Uuid::new_v4(),
            api_base_url: config.api_base_url.clone(),
        })
    }

    async fn close(&self, session: SimulatedSession) {
        self.closed.fetch_add(1, Ordering::SeqCst);
        debug!(group = %session.key, token = %session.token, "Simulated logout");
    }
}

impl CaptureWorker<SimulatedSession> for SimulatedPortal {
    async fn execute(
        &self,
        session: &SimulatedSession,
        item: &WorkItem,
        ctx: &CaptureContext,
    ) -> Result<CaptureOutput, WorkerError> {
        self.pause().await;
        if self
            .behaviour
            .failing_processes
            .contains(&item.process_number)
        {
            return Err(WorkerError(format!(
                "timeout fetching parties of {}",
                item.process_number
            )));
        }
        let counts = simulated_counts(item.remote_id);
        Ok(CaptureOutput {
            counts,
            errors: Vec::new(),
            raw_payload: Some(serde_json::json!({
                "endpoint": format!("{}/processos/id/{}/partes", session.api_base_url, item.remote_id),
                "requester_document": ctx.requester.document,
                "partes": counts.total_parties,
            })),
        })
    }
}
