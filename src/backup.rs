//! Tenant backup and restore as JSON files.
//!
//! Dumps every tenant-scoped collection to a single JSON document on
//! disk and restores by replacing the tenant's documents from such a
//! file. Restore forces the tenant key onto every document, so a dump
//! can never write into another store.

use anyhow::Context;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::db::{Db, TENANT_COLLECTIONS};
use crate::error::ApiError;

/// Dump the tenant's collections to a new file under `backup_dir`.
/// Returns the file name (not the full path).
pub async fn dump_store(
    db: &Db,
    backup_dir: &Path,
    store_id: ObjectId,
) -> Result<String, ApiError> {
    let mut dump = serde_json::Map::new();
    let mut total_docs = 0usize;

    for name in TENANT_COLLECTIONS {
        let docs: Vec<Document> = db
            .raw_collection(name)
            .find(doc! { "store_id": store_id })
            .await?
            .try_collect()
            .await?;
        total_docs += docs.len();
        let values: Vec<Value> = docs
            .into_iter()
            .map(|document| Bson::Document(document).into_relaxed_extjson())
            .collect();
        dump.insert(name.to_string(), Value::Array(values));
    }

    tokio::fs::create_dir_all(backup_dir)
        .await
        .with_context(|| format!("creating backup dir {}", backup_dir.display()))?;
    let file_name = format!("store-{}-{}.json", store_id.to_hex(), Uuid::new_v4());
    let path = backup_dir.join(&file_name);
    tokio::fs::write(&path, serde_json::to_vec_pretty(&Value::Object(dump))?)
        .await
        .with_context(|| format!("writing backup {}", path.display()))?;

    info!(store = %store_id, file = %file_name, docs = total_docs, "Wrote tenant backup");
    Ok(file_name)
}

/// Resolve a client-supplied backup file name inside `backup_dir`,
/// rejecting anything that could escape the directory.
pub fn resolve_backup_file(backup_dir: &Path, name: &str) -> Result<PathBuf, ApiError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed.contains('/')
        || trimmed.contains('\\')
        || trimmed.contains("..")
    {
        return Err(ApiError::validation("invalid backup file name"));
    }
    Ok(backup_dir.join(trimmed))
}

/// Replace the tenant's documents from a dump file. Returns how many
/// documents were restored.
pub async fn restore_store(db: &Db, path: &Path, store_id: ObjectId) -> Result<u64, ApiError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|_| ApiError::not_found("backup file not found"))?;
    let value: Value =
        serde_json::from_str(&raw).map_err(|_| ApiError::validation("invalid backup file"))?;
    let map = value
        .as_object()
        .ok_or_else(|| ApiError::validation("invalid backup file"))?;

    let mut restored = 0u64;
    for name in TENANT_COLLECTIONS {
        let Some(items) = map.get(*name).and_then(Value::as_array) else {
            continue;
        };

        let mut documents = Vec::with_capacity(items.len());
        for item in items {
            let bson = Bson::try_from(item.clone())
                .map_err(|_| ApiError::validation("invalid backup document"))?;
            let Bson::Document(mut document) = bson else {
                return Err(ApiError::validation("invalid backup document"));
            };
            // Force the tenant key; a dump can never cross stores.
            document.insert("store_id", store_id);
            documents.push(document);
        }

        let collection = db.raw_collection(name);
        collection.delete_many(doc! { "store_id": store_id }).await?;
        if !documents.is_empty() {
            restored += documents.len() as u64;
            collection.insert_many(documents).await?;
        }
    }

    info!(store = %store_id, docs = restored, "Restored tenant backup");
    Ok(restored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_file_names_cannot_escape_the_directory() {
        let dir = Path::new("/var/backups");
        assert!(resolve_backup_file(dir, "store-abc.json").is_ok());
        assert!(resolve_backup_file(dir, "").is_err());
        assert!(resolve_backup_file(dir, "../etc/passwd").is_err());
        assert!(resolve_backup_file(dir, "nested/file.json").is_err());
        assert!(resolve_backup_file(dir, "windows\\style").is_err());
    }

    #[test]
    fn resolved_path_stays_under_backup_dir() {
        let dir = Path::new("/var/backups");
        let path = resolve_backup_file(dir, "store-abc.json").expect("valid name");
        assert_eq!(path, dir.join("store-abc.json"));
    }
}
