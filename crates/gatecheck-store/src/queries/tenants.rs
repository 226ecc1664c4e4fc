// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant record operations.
//!
//! Tenant CRUD itself is an external concern; the engine only needs
//! lookup, schedule mutation, and the session-id column the session
//! manager owns. `create_tenant` exists for provisioning tools and tests.

use gatecheck_core::GatecheckError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::Tenant;

const TENANT_COLUMNS: &str = "id, name, token, folder_path, session_id, schedule_enabled, \
     schedule_frequency_minutes, created_at, updated_at";

fn tenant_from_row(row: &rusqlite::Row<'_>) -> Result<Tenant, rusqlite::Error> {
    Ok(Tenant {
        id: row.get(0)?,
        name: row.get(1)?,
        token: row.get(2)?,
        folder_path: row.get(3)?,
        session_id: row.get(4)?,
        schedule_enabled: row.get(5)?,
        schedule_frequency_minutes: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Create a tenant. The folder path is derived from the assigned row id:
/// `{storage_root}/users/{id}`.
pub async fn create_tenant(
    db: &Database,
    name: &str,
    token: &str,
    storage_root: &str,
) -> Result<Tenant, GatecheckError> {
    let name = name.to_string();
    let token = token.to_string();
    let storage_root = storage_root.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO tenants (name, token, folder_path) VALUES (?1, ?2, '')",
                params![name, token],
            )?;
            let id = tx.last_insert_rowid();
            let folder_path = format!("{storage_root}/users/{id}");
            tx.execute(
                "UPDATE tenants SET folder_path = ?1 WHERE id = ?2",
                params![folder_path, id],
            )?;
            let tenant = tx.query_row(
                &format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE id = ?1"),
                params![id],
                tenant_from_row,
            )?;
            tx.commit()?;
            Ok(tenant)
        })
        .await
        .map_err(map_tr_err)
}

/// Get a tenant by id.
pub async fn get_tenant(db: &Database, id: i64) -> Result<Option<Tenant>, GatecheckError> {
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE id = ?1"),
                params![id],
                tenant_from_row,
            );
            match result {
                Ok(tenant) => Ok(Some(tenant)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Resolve a tenant from its bearer token.
pub async fn get_tenant_by_token(
    db: &Database,
    token: &str,
) -> Result<Option<Tenant>, GatecheckError> {
    let token = token.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE token = ?1"),
                params![token],
                tenant_from_row,
            );
            match result {
                Ok(tenant) => Ok(Some(tenant)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List all tenants, oldest first.
pub async fn list_tenants(db: &Database) -> Result<Vec<Tenant>, GatecheckError> {
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {TENANT_COLUMNS} FROM tenants ORDER BY id ASC"))?;
            let rows = stmt.query_map([], tenant_from_row)?;
            let mut tenants = Vec::new();
            for row in rows {
                tenants.push(row?);
            }
            Ok(tenants)
        })
        .await
        .map_err(map_tr_err)
}

/// List tenants with scheduling enabled.
pub async fn list_scheduled_tenants(db: &Database) -> Result<Vec<Tenant>, GatecheckError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TENANT_COLUMNS} FROM tenants WHERE schedule_enabled = 1 ORDER BY id ASC"
            ))?;
            let rows = stmt.query_map([], tenant_from_row)?;
            let mut tenants = Vec::new();
            for row in rows {
                tenants.push(row?);
            }
            Ok(tenants)
        })
        .await
        .map_err(map_tr_err)
}

/// Update the tenant's known upstream session. `None` drops it.
///
/// Only the session manager calls this; the tenant-row update serializes
/// concurrent observers.
pub async fn set_session_id(
    db: &Database,
    tenant_id: i64,
    session_id: Option<&str>,
) -> Result<(), GatecheckError> {
    let session_id = session_id.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE tenants SET session_id = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![session_id, tenant_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Update a tenant's schedule settings.
pub async fn set_schedule(
    db: &Database,
    tenant_id: i64,
    enabled: bool,
    frequency_minutes: i64,
) -> Result<(), GatecheckError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE tenants SET schedule_enabled = ?1, schedule_frequency_minutes = ?2,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?3",
                params![enabled, frequency_minutes, tenant_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn create_and_get_tenant_roundtrips() {
        let (db, _dir) = setup_db().await;

        let tenant = create_tenant(&db, "Acme Drayage", "tok-1", "storage").await.unwrap();
        assert_eq!(tenant.name, "Acme Drayage");
        assert_eq!(tenant.folder_path, format!("storage/users/{}", tenant.id));
        assert!(tenant.session_id.is_none());
        assert!(tenant.schedule_enabled);
        assert_eq!(tenant.schedule_frequency_minutes, 60);

        let by_id = get_tenant(&db, tenant.id).await.unwrap().unwrap();
        assert_eq!(by_id.token, "tok-1");

        let by_token = get_tenant_by_token(&db, "tok-1").await.unwrap().unwrap();
        assert_eq!(by_token.id, tenant.id);

        assert!(get_tenant_by_token(&db, "nope").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn session_id_can_be_set_and_dropped() {
        let (db, _dir) = setup_db().await;
        let tenant = create_tenant(&db, "t", "tok-2", "storage").await.unwrap();

        set_session_id(&db, tenant.id, Some("sess-1")).await.unwrap();
        let t = get_tenant(&db, tenant.id).await.unwrap().unwrap();
        assert_eq!(t.session_id.as_deref(), Some("sess-1"));

        set_session_id(&db, tenant.id, None).await.unwrap();
        let t = get_tenant(&db, tenant.id).await.unwrap().unwrap();
        assert!(t.session_id.is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn schedule_updates_are_visible_to_scheduled_listing() {
        let (db, _dir) = setup_db().await;
        let a = create_tenant(&db, "a", "tok-a", "storage").await.unwrap();
        let _b = create_tenant(&db, "b", "tok-b", "storage").await.unwrap();

        set_schedule(&db, a.id, false, 30).await.unwrap();

        let scheduled = list_scheduled_tenants(&db).await.unwrap();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].name, "b");

        let a = get_tenant(&db, a.id).await.unwrap().unwrap();
        assert!(!a.schedule_enabled);
        assert_eq!(a.schedule_frequency_minutes, 30);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_token_is_rejected() {
        let (db, _dir) = setup_db().await;
        create_tenant(&db, "a", "same", "storage").await.unwrap();
        let err = create_tenant(&db, "b", "same", "storage").await;
        assert!(err.is_err());
        db.close().await.unwrap();
    }
}
