//! Mission listing and lookup handlers

use serde::Serialize;
use std::collections::HashMap;

use super::{ApiResponse, MissionApi};
use crate::cursor;
use crate::error::ApiError;
use crate::kv::{KvError, ResumeKey};
use crate::model::MissionRecord;

/// One page of `GET /missions`
#[derive(Debug, Serialize)]
struct MissionPage {
    missions: Vec<MissionRecord>,
    #[serde(rename = "nextToken", skip_serializing_if = "Option::is_none")]
    next_token: Option<String>,
}

/// Resolve the page size from `count`.
///
/// Absent or empty → `default`; non-integer or non-positive → error;
/// anything above `max` is clamped.
pub fn page_size(raw: Option<&str>, default: u32, max: u32) -> Result<u32, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(default.min(max));
    };
    let count: i64 = raw
        .parse()
        .map_err(|_| ApiError::validation("invalid count", format!("count is not an integer: {}", raw)))?;
    if count <= 0 {
        return Err(ApiError::validation(
            "invalid count",
            format!("count must be positive, got {}", count),
        ));
    }
    Ok(count.min(i64::from(max)) as u32)
}

impl MissionApi {
    pub(super) async fn list_missions(
        &self,
        query: &HashMap<String, String>,
    ) -> Result<ApiResponse, ApiError> {
        let pagination = &self.ctx.config.pagination;
        let store = &self.ctx.config.store;

        let limit = page_size(
            query.get("count").map(String::as_str),
            pagination.default_count,
            pagination.max_count,
        )?;
        let resume = match query.get("nextToken").map(String::as_str) {
            None | Some("") => None,
            Some(token) => Some(self.decode_token(token, &store.partition_key)?),
        };

        let page = self
            .ctx
            .kv
            .scan(&store.table, limit, resume)
            .await
            .map_err(|err| self.kv_failed(err, "failed to retrieve missions"))?;

        let missions = page
            .items
            .iter()
            .map(MissionRecord::from_item)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| {
                tracing::error!(table = %store.table, error = %err, "Unreadable mission item");
                ApiError::upstream("failed to retrieve missions", err.to_string())
            })?;

        let next_token = page
            .resume
            .as_ref()
            .map(cursor::encode)
            .transpose()
            .map_err(|err| {
                tracing::error!(table = %store.table, error = %err, "Unencodable resume key");
                ApiError::upstream("failed to retrieve missions", err.to_string())
            })?;
        let body = MissionPage {
            missions,
            next_token,
        };
        let json = serde_json::to_value(&body).map_err(|err| {
            ApiError::upstream("failed to retrieve missions", err.to_string())
        })?;
        Ok(ApiResponse::json(200, &json))
    }

    pub(super) async fn get_mission(&self, id: &str) -> Result<ApiResponse, ApiError> {
        if id.is_empty() {
            return Err(ApiError::validation("missing id", "empty mission id"));
        }
        let store = &self.ctx.config.store;
        let key = ResumeKey::string(store.partition_key.as_str(), id);

        let item = self
            .ctx
            .kv
            .get_item(&store.table, &key)
            .await
            .map_err(|err| self.kv_failed(err, "failed to retrieve mission"))?
            .ok_or_else(|| ApiError::not_found("mission not found"))?;

        let record = MissionRecord::from_item(&item).map_err(|err| {
            tracing::error!(table = %store.table, mission_id = %id, error = %err, "Unreadable mission item");
            ApiError::upstream("failed to retrieve mission", err.to_string())
        })?;
        let json = serde_json::to_value(&record)
            .map_err(|err| ApiError::upstream("failed to retrieve mission", err.to_string()))?;
        Ok(ApiResponse::json(200, &json))
    }

    /// Decode a client token; it must name the table's partition key
    fn decode_token(&self, token: &str, partition_key: &str) -> Result<ResumeKey, ApiError> {
        let key = cursor::decode(token).map_err(|err| {
            self.ctx.metrics.increment_invalid_tokens();
            ApiError::InvalidToken(err.to_string())
        })?;
        if key.get(partition_key).is_none() {
            self.ctx.metrics.increment_invalid_tokens();
            return Err(ApiError::InvalidToken(format!(
                "token does not carry key attribute '{}'",
                partition_key
            )));
        }
        Ok(key)
    }

    fn kv_failed(&self, err: KvError, message: &'static str) -> ApiError {
        self.ctx.metrics.increment_store_error("kv");
        tracing::warn!(error = %err, "Key-value store call failed");
        ApiError::upstream(message, err.to_string())
    }
}
