//! Connectivity and CRUD smoke tests against a live backend.
//!
//! [`run_diagnostics`] runs a fixed sequence of checks. The first failing
//! check stops the run; every check after it is reported as failed with the
//! same message.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tabularium_core::library::{ItemType, LibraryItemDraft};
use uuid::Uuid;

use crate::api::ApiClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub status: CheckStatus,
    pub detail: String,
}

/// Outcome of one diagnostic run.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub base_url: String,
    pub checks: Vec<CheckResult>,
}

impl DiagnosticReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.status == CheckStatus::Success)
    }
}

#[derive(Debug, Clone, Copy)]
enum Check {
    Health,
    LibraryList,
    CharacterSheet,
    LibraryCrud,
    DatabasePing,
}

impl Check {
    const ALL: [Check; 5] = [
        Check::Health,
        Check::LibraryList,
        Check::CharacterSheet,
        Check::LibraryCrud,
        Check::DatabasePing,
    ];

    fn name(self) -> &'static str {
        match self {
            Check::Health => "GET /health",
            Check::LibraryList => "GET /library",
            Check::CharacterSheet => "GET /akin",
            Check::LibraryCrud => "Library CRUD cycle",
            Check::DatabasePing => "GET /_debug/ping-db",
        }
    }
}

/// Run every check against the client's current base URL.
pub async fn run_diagnostics(api: &ApiClient) -> DiagnosticReport {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let base_url = api.core().base_url().await;

    tracing::info!(%run_id, %base_url, "Running API diagnostics");

    let mut checks = Vec::with_capacity(Check::ALL.len());
    let mut failure: Option<String> = None;

    for check in Check::ALL {
        if let Some(message) = &failure {
            checks.push(CheckResult {
                name: check.name(),
                status: CheckStatus::Failure,
                detail: message.clone(),
            });
            continue;
        }

        match run_check(api, check, run_id).await {
            Ok(detail) => {
                tracing::info!(check = check.name(), %detail, "Diagnostic check passed");
                checks.push(CheckResult {
                    name: check.name(),
                    status: CheckStatus::Success,
                    detail,
                });
            }
            Err(message) => {
                tracing::error!(check = check.name(), error = %message, "Diagnostic check failed");
                checks.push(CheckResult {
                    name: check.name(),
                    status: CheckStatus::Failure,
                    detail: message.clone(),
                });
                failure = Some(message);
            }
        }
    }

    DiagnosticReport {
        run_id,
        started_at,
        base_url,
        checks,
    }
}

async fn run_check(api: &ApiClient, check: Check, run_id: Uuid) -> Result<String, String> {
    match check {
        Check::Health => {
            let body = api.health().await.map_err(|e| e.to_string())?;
            Ok(match &body {
                Value::Object(map) => match map.get("status") {
                    Some(Value::String(status)) => format!("status: {status}"),
                    _ => body.to_string(),
                },
                Value::Null => "no body".to_string(),
                other => other.to_string(),
            })
        }
        Check::LibraryList => {
            let items = api.list_library().await.map_err(|e| e.to_string())?;
            Ok(format!("{} items", items.len()))
        }
        Check::CharacterSheet => {
            let sheet = api.get_akin().await.map_err(|e| e.to_string())?;
            let profile = match &sheet.profile {
                Some(p) if !p.name.is_empty() => p.name.as_str(),
                Some(_) => "unnamed profile",
                None => "no profile",
            };
            Ok(format!(
                "{profile}, {} abilities, {} virtues, {} flaws",
                sheet.abilities.len(),
                sheet.virtues.len(),
                sheet.flaws.len()
            ))
        }
        Check::LibraryCrud => crud_cycle(api, run_id).await,
        Check::DatabasePing => {
            let ping = api.ping_db().await.map_err(|e| e.to_string())?;
            if ping.ok {
                Ok("database reachable".to_string())
            } else {
                Err(format!(
                    "Database ping returned ok=false: {}",
                    Value::Object(ping.extra)
                ))
            }
        }
    }
}

/// Create, read, update and delete a throwaway Tractatus.
async fn crud_cycle(api: &ApiClient, run_id: Uuid) -> Result<String, String> {
    let mut draft = LibraryItemDraft::new(ItemType::Tractatus);
    draft.title = Some(format!("Diagnostic {run_id}"));
    draft.subject = Some("Vim".to_string());
    draft.quality = Some(5);

    let created = api
        .create_library_item(&draft)
        .await
        .map_err(|e| format!("create failed: {e}"))?;
    let id = created
        .id()
        .map(str::to_string)
        .ok_or_else(|| "create returned an item without an id".to_string())?;

    let result = read_update_delete(api, &id, &draft).await;
    if result.is_err() {
        if let Err(e) = api.delete_library_item(&id).await {
            tracing::warn!(%id, error = %e, "Could not remove diagnostic library item");
        }
    }
    result.map(|()| format!("created, read, updated and deleted item {id}"))
}

async fn read_update_delete(
    api: &ApiClient,
    id: &str,
    draft: &LibraryItemDraft,
) -> Result<(), String> {
    let fetched = api
        .get_library_item(id)
        .await
        .map_err(|e| format!("read failed: {e}"))?;
    if Some(fetched.title()) != draft.title.as_deref() {
        return Err(format!(
            "read returned title {:?}, expected {:?}",
            fetched.title(),
            draft.title
        ));
    }

    let mut changed = draft.clone();
    changed.quality = Some(6);
    api.update_library_item(id, &changed)
        .await
        .map_err(|e| format!("update failed: {e}"))?;

    api.delete_library_item(id)
        .await
        .map_err(|e| format!("delete failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_passes_only_when_every_check_succeeds() {
        let mut report = DiagnosticReport {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            base_url: "http://localhost:3000/api".into(),
            checks: Check::ALL
                .iter()
                .map(|c| CheckResult {
                    name: c.name(),
                    status: CheckStatus::Success,
                    detail: String::new(),
                })
                .collect(),
        };
        assert!(report.passed());

        report.checks[3].status = CheckStatus::Failure;
        assert!(!report.passed());
    }

    #[test]
    fn check_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(CheckStatus::Failure).unwrap(),
            serde_json::json!("failure")
        );
    }
}
