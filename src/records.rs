use crate::classifier::{classify, compute_bmi, round_one_decimal};
use crate::errors::AppError;
use crate::models::{ChildInput, ChildRecord, DeleteOutcome, UNKNOWN_BARANGAY};
use crate::storage::RecordStore;
use chrono::{DateTime, SubsecRound, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::{sync::Mutex, task};
use tracing::{error, info};
use uuid::Uuid;

/// Creates, edits and removes child records. Every operation re-reads the
/// slot and writes the whole list back; mutations hold `writes` from the
/// read until the write lands.
#[derive(Clone)]
pub struct RecordService {
    store: RecordStore,
    writes: Arc<Mutex<()>>,
}

impl RecordService {
    pub fn new(store: RecordStore) -> Self {
        Self {
            store,
            writes: Arc::new(Mutex::new(())),
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub async fn read_all(&self) -> Vec<ChildRecord> {
        let store = self.store.clone();
        task::spawn_blocking(move || store.load())
            .await
            .unwrap_or_else(|err| {
                error!("record load task failed: {err}");
                Vec::new()
            })
    }

    async fn persist(&self, records: Vec<ChildRecord>) -> Result<(), AppError> {
        let store = self.store.clone();
        task::spawn_blocking(move || store.save(&records))
            .await
            .map_err(AppError::internal)?
    }

    /// Replaces the whole list. Each record goes through the same
    /// normalization as a new one, keeping its id and timestamps.
    pub async fn write_all(&self, records: Vec<ChildRecord>) -> Result<Vec<ChildRecord>, AppError> {
        let records = records
            .into_iter()
            .map(normalize_record)
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::new();
        if let Some(duplicate) = records.iter().find(|record| !seen.insert(record.id.as_str())) {
            return Err(AppError::conflict(format!("duplicate record id {}", duplicate.id)));
        }

        let _guard = self.writes.lock().await;
        self.persist(records.clone()).await?;
        info!(count = records.len(), "child records replaced");
        Ok(records)
    }

    pub async fn create_record(&self, input: &ChildInput) -> Result<ChildRecord, AppError> {
        let record = build_record(input, now_millis());

        let _guard = self.writes.lock().await;
        let mut records = self.read_all().await;
        if records.iter().any(|existing| existing.id == record.id) {
            return Err(AppError::conflict(format!("record {} already exists", record.id)));
        }

        records.push(record.clone());
        self.persist(records).await?;
        info!(id = %record.id, status = record.status_key.key(), "child record created");
        Ok(record)
    }

    /// Re-derives every field from `input` but keeps the record's identity
    /// and creation time.
    pub async fn update_record(&self, id: &str, input: &ChildInput) -> Result<ChildRecord, AppError> {
        let _guard = self.writes.lock().await;
        let mut records = self.read_all().await;
        let Some(existing) = records.iter_mut().find(|record| record.id == id.trim()) else {
            return Err(AppError::not_found("Record not found"));
        };

        let now = now_millis();
        let mut updated = build_record(input, now);
        updated.id = existing.id.clone();
        updated.created_at = existing.created_at;
        updated.updated_at = Some(now);
        *existing = updated.clone();

        self.persist(records).await?;
        info!(id = %updated.id, status = updated.status_key.key(), "child record updated");
        Ok(updated)
    }

    /// Removal only happens once the user has confirmed it; an unknown id is
    /// reported before any confirmation is considered.
    pub async fn delete_record(&self, id: &str, confirmed: bool) -> Result<DeleteOutcome, AppError> {
        let _guard = self.writes.lock().await;
        let mut records = self.read_all().await;
        let Some(index) = records.iter().position(|record| record.id == id.trim()) else {
            return Err(AppError::not_found("Record not found"));
        };
        if !confirmed {
            return Ok(DeleteOutcome::Cancelled);
        }

        let removed = records.remove(index);
        self.persist(records).await?;
        info!(id = %removed.id, "child record deleted");
        Ok(DeleteOutcome::Deleted)
    }

    pub async fn clear_all(&self, confirmed: bool) -> Result<bool, AppError> {
        if !confirmed {
            return Ok(false);
        }

        let _guard = self.writes.lock().await;
        let store = self.store.clone();
        task::spawn_blocking(move || store.clear())
            .await
            .map_err(AppError::internal)??;
        info!("all child records cleared");
        Ok(true)
    }
}

/// Builds the canonical record from free-form input. A missing id gets a
/// fresh UUID.
pub fn build_record(input: &ChildInput, now: DateTime<Utc>) -> ChildRecord {
    let mut record = ChildRecord {
        id: input
            .id
            .as_ref()
            .and_then(coerce_id)
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        name: input.name.as_ref().map(coerce_text).unwrap_or_default(),
        barangay: input.barangay.as_ref().map(coerce_text).unwrap_or_default(),
        age: input.age.as_ref().and_then(coerce_number),
        weight_kg: input.weight_kg.as_ref().and_then(coerce_number),
        height_cm: input.height_cm.as_ref().and_then(coerce_number),
        bmi: None,
        status_key: Default::default(),
        status_label: String::new(),
        created_at: now,
        updated_at: None,
    };
    derive_fields(&mut record);
    record
}

/// Brings an already-typed record back in line: trimmed text, defaulted
/// barangay, measurements and status recomputed. Blank ids are rejected.
pub fn normalize_record(mut record: ChildRecord) -> Result<ChildRecord, AppError> {
    record.id = record.id.trim().to_string();
    if record.id.is_empty() {
        return Err(AppError::bad_request("every record needs a non-empty id"));
    }
    record.name = record.name.trim().to_string();
    record.age = record.age.filter(|value| usable_number(*value));
    record.weight_kg = record.weight_kg.filter(|value| usable_number(*value));
    record.height_cm = record.height_cm.filter(|value| usable_number(*value));
    derive_fields(&mut record);
    Ok(record)
}

fn derive_fields(record: &mut ChildRecord) {
    let barangay = record.barangay.trim();
    record.barangay = if barangay.is_empty() {
        UNKNOWN_BARANGAY.to_string()
    } else {
        barangay.to_string()
    };

    let bmi = compute_bmi(record.weight_kg, record.height_cm);
    let status = classify(bmi);
    record.bmi = bmi.map(round_one_decimal);
    record.status_key = status;
    record.status_label = status.label().to_string();
}

fn usable_number(value: f64) -> bool {
    value.is_finite() && value != 0.0
}

/// Numbers and numeric strings become numbers; zero, blanks and anything
/// non-numeric become `None`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(raw) => {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            raw.parse::<f64>().ok()?
        }
        _ => return None,
    };
    usable_number(number).then_some(number)
}

fn coerce_text(value: &Value) -> String {
    match value {
        Value::String(raw) => raw.trim().to_string(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => String::new(),
    }
}

fn coerce_id(value: &Value) -> Option<String> {
    let id = coerce_text(value);
    (!id.is_empty()).then_some(id)
}

fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
