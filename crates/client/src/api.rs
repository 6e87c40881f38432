//! Typed facade over the Tabularium REST API.
//!
//! One method per backend operation. Library items cross the wire through
//! [`tabularium_core::normalize`]; the character sheet and its sub-resources
//! are sent as-is. Every method propagates the [`ApiError`] from the request
//! core unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tabularium_core::character::{
    Ability, AbilityInput, AkinSheet, CharacterProfile, VirtueFlaw, VirtueFlawInput,
    VirtueFlawKind,
};
use tabularium_core::error::CoreError;
use tabularium_core::library::{LibraryItem, LibraryItemDraft};
use tabularium_core::normalize::{
    from_backend_item, from_backend_list, from_backend_value, to_backend_payload,
};
use tabularium_core::types::EntityId;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::request::{ApiResponse, RequestCore, RequestOptions, ResponseBody};

const LIBRARY: &str = "library";
const AKIN: &str = "akin";
const ABILITIES: &str = "abilities";

/// Result of `GET /_debug/ping-db`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbPing {
    #[serde(default)]
    pub ok: bool,
    /// Whatever else the backend reports (driver, latency, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Client for every Tabularium endpoint.
pub struct ApiClient {
    core: RequestCore,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Self {
        Self::from_core(RequestCore::new(config))
    }

    pub fn from_core(core: RequestCore) -> Self {
        Self { core }
    }

    /// The underlying request core, for runtime reconfiguration.
    pub fn core(&self) -> &RequestCore {
        &self.core
    }

    /* ----------------------------------------------------------------------
    Library
    ---------------------------------------------------------------------- */

    /// All library items, in server order.
    pub async fn list_library(&self) -> Result<Vec<LibraryItem>, ApiError> {
        self.core
            .get(&[LIBRARY])
            .await?
            .decode_with(from_backend_list)
    }

    pub async fn get_library_item(&self, id: &str) -> Result<LibraryItem, ApiError> {
        self.core
            .get(&[LIBRARY, id])
            .await?
            .decode_with(from_backend_value)
    }

    /// Create an item. The returned item carries the server-assigned id.
    pub async fn create_library_item(
        &self,
        draft: &LibraryItemDraft,
    ) -> Result<LibraryItem, ApiError> {
        let body = library_payload(draft);
        self.core
            .post(&[LIBRARY], &body)
            .await?
            .decode_with(from_backend_value)
    }

    /// Replace an item. A body-less success echoes the sent fields.
    pub async fn update_library_item(
        &self,
        id: &str,
        draft: &LibraryItemDraft,
    ) -> Result<LibraryItem, ApiError> {
        let body = library_payload(draft);
        let response = self.core.put(&[LIBRARY, id], &body).await?;

        if !returns_record(&response) {
            let mut row = to_backend_payload(draft);
            row.id = Some(id.to_string());
            return Ok(from_backend_item(row));
        }
        response.decode_with(from_backend_value)
    }

    pub async fn delete_library_item(&self, id: &str) -> Result<(), ApiError> {
        self.core.delete(&[LIBRARY, id]).await?;
        Ok(())
    }

    /* ----------------------------------------------------------------------
    Character sheet
    ---------------------------------------------------------------------- */

    /// The AKIN profile together with its abilities, virtues and flaws.
    pub async fn get_akin(&self) -> Result<AkinSheet, ApiError> {
        self.core.get(&[AKIN]).await?.decode("character sheet")
    }

    /// Create or replace the AKIN profile in one write.
    ///
    /// Uses the configured verb first and retries once with the other verb
    /// when the backend answers 404 or 405. Returns the stored profile, or
    /// `profile` itself when the backend does not echo it.
    pub async fn upsert_akin(
        &self,
        profile: &CharacterProfile,
    ) -> Result<CharacterProfile, ApiError> {
        let body = serde_json::to_value(profile).expect("profile is always serialisable");
        let primary = self.core.config().upsert_method;

        let response = match self
            .core
            .request(primary.method(), &[AKIN], Some(&body), RequestOptions::default())
            .await
        {
            Err(e) if matches!(e.status(), Some(404 | 405)) => {
                let fallback = primary.fallback();
                tracing::info!(
                    rejected = %primary.method(),
                    fallback = %fallback.method(),
                    status = ?e.status(),
                    "AKIN upsert verb rejected, trying fallback",
                );
                self.core
                    .request(fallback.method(), &[AKIN], Some(&body), RequestOptions::default())
                    .await?
            }
            other => other?,
        };

        let stored = match response.body {
            ResponseBody::Json(Value::Object(mut map)) => match map.remove("profile") {
                Some(inner @ Value::Object(_)) => Some(inner),
                _ if map.contains_key("name") => Some(Value::Object(map)),
                _ => None,
            },
            _ => None,
        };

        match stored {
            Some(value) => serde_json::from_value(value).map_err(|source| ApiError::Decode {
                url: response.url,
                source: CoreError::Decode {
                    what: "character profile",
                    source,
                },
            }),
            None => Ok(profile.clone()),
        }
    }

    /* ----------------------------------------------------------------------
    Abilities
    ---------------------------------------------------------------------- */

    pub async fn create_ability(&self, input: &AbilityInput) -> Result<Ability, ApiError> {
        let body = serde_json::to_value(input).expect("ability is always serialisable");
        self.core
            .post(&[AKIN, ABILITIES], &body)
            .await?
            .decode("ability")
    }

    /// Replace an ability. A body-less success echoes `input` under `id`.
    pub async fn update_ability(
        &self,
        id: &str,
        input: &AbilityInput,
    ) -> Result<Ability, ApiError> {
        let body = serde_json::to_value(input).expect("ability is always serialisable");
        let response = self.core.put(&[AKIN, ABILITIES, id], &body).await?;

        if !returns_record(&response) {
            return Ok(Ability {
                id: EntityId::from(id),
                name: input.name.clone(),
                value: input.value,
                specialty: input.specialty.clone(),
            });
        }
        response.decode("ability")
    }

    pub async fn delete_ability(&self, id: &str) -> Result<(), ApiError> {
        self.core.delete(&[AKIN, ABILITIES, id]).await?;
        Ok(())
    }

    /* ----------------------------------------------------------------------
    Virtues and flaws
    ---------------------------------------------------------------------- */

    pub async fn create_virtue_flaw(
        &self,
        kind: VirtueFlawKind,
        input: &VirtueFlawInput,
    ) -> Result<VirtueFlaw, ApiError> {
        let body = serde_json::to_value(input).expect("virtue/flaw is always serialisable");
        self.core
            .post(&[AKIN, kind.collection()], &body)
            .await?
            .decode("virtue or flaw")
    }

    /// Replace a virtue or flaw. A body-less success echoes `input` under `id`.
    pub async fn update_virtue_flaw(
        &self,
        kind: VirtueFlawKind,
        id: &str,
        input: &VirtueFlawInput,
    ) -> Result<VirtueFlaw, ApiError> {
        let body = serde_json::to_value(input).expect("virtue/flaw is always serialisable");
        let response = self
            .core
            .put(&[AKIN, kind.collection(), id], &body)
            .await?;

        if !returns_record(&response) {
            return Ok(VirtueFlaw {
                id: EntityId::from(id),
                name: input.name.clone(),
                description: input.description.clone(),
                is_major: input.is_major,
                page: input.page,
            });
        }
        response.decode("virtue or flaw")
    }

    pub async fn delete_virtue_flaw(&self, kind: VirtueFlawKind, id: &str) -> Result<(), ApiError> {
        self.core.delete(&[AKIN, kind.collection(), id]).await?;
        Ok(())
    }

    /* ----------------------------------------------------------------------
    Diagnostics
    ---------------------------------------------------------------------- */

    /// `GET /health`, returned verbatim.
    pub async fn health(&self) -> Result<Value, ApiError> {
        Ok(self.core.get(&["health"]).await?.into_value())
    }

    pub async fn ping_db(&self) -> Result<DbPing, ApiError> {
        self.core
            .get(&["_debug", "ping-db"])
            .await?
            .decode("database ping")
    }
}

fn library_payload(draft: &LibraryItemDraft) -> Value {
    serde_json::to_value(to_backend_payload(draft)).expect("library item is always serialisable")
}

/// Whether a write response carries the stored record (an object with an id).
fn returns_record(response: &ApiResponse) -> bool {
    matches!(&response.body, ResponseBody::Json(Value::Object(map)) if map.contains_key("id"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn response(body: ResponseBody) -> ApiResponse {
        ApiResponse {
            url: "http://localhost:3000/api/akin/abilities/1".into(),
            body,
        }
    }

    #[test]
    fn only_objects_with_an_id_count_as_records() {
        assert!(returns_record(&response(ResponseBody::Json(
            json!({ "id": "1", "name": "Latim" })
        ))));
        assert!(!returns_record(&response(ResponseBody::Empty)));
        assert!(!returns_record(&response(ResponseBody::Json(
            json!({ "ok": true })
        ))));
        assert!(!returns_record(&response(ResponseBody::Text("OK".into()))));
    }

    #[test]
    fn db_ping_keeps_extra_fields() {
        let ping: DbPing =
            serde_json::from_value(json!({ "ok": true, "latencyMs": 12 })).unwrap();
        assert!(ping.ok);
        assert_eq!(ping.extra["latencyMs"], 12);
    }
}
