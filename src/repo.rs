//! sqlx-backed implementation of the engine's persistence collaborator.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;
use tracing::warn;

use crate::engine::geo::GeofenceAnchor;
use crate::engine::matching::{embedding_from_bytes, embedding_to_bytes};
use crate::engine::state::EventKind;
use crate::engine::{AppendResult, NewAttendanceEvent, NewEmployee, RosterEntry, ScanStore};

pub struct SqlScanStore {
    pool: MySqlPool,
    /// Restricts the roster to one location's employees; `None` sees all.
    scope: Option<u64>,
}

impl SqlScanStore {
    pub fn new(pool: MySqlPool, scope: Option<u64>) -> Self {
        Self { pool, scope }
    }
}

#[async_trait]
impl ScanStore for SqlScanStore {
    async fn roster(&self) -> anyhow::Result<Vec<RosterEntry>> {
        let rows: Vec<(u64, String, Vec<u8>)> = match self.scope {
            Some(location_id) => {
                sqlx::query_as(
                    "SELECT id, name, face_encoding FROM employees WHERE location_id = ?",
                )
                .bind(location_id)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as("SELECT id, name, face_encoding FROM employees")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .context("failed to load employee roster")?;

        Ok(rows
            .into_iter()
            .filter_map(|(employee_id, name, blob)| match embedding_from_bytes(&blob) {
                Some(embedding) => Some(RosterEntry {
                    employee_id,
                    name,
                    embedding,
                }),
                None => {
                    warn!(employee_id, "skipping employee with corrupt face template");
                    None
                }
            })
            .collect())
    }

    async fn events_between(
        &self,
        employee_id: u64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<EventKind>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT kind
            FROM attendance_log
            WHERE employee_id = ? AND timestamp >= ? AND timestamp < ?
            "#,
        )
        .bind(employee_id)
        .bind(from.naive_utc())
        .bind(to.naive_utc())
        .fetch_all(&self.pool)
        .await
        .context("failed to load today's attendance events")?;

        Ok(rows
            .into_iter()
            .filter_map(|(kind,)| match kind.parse::<EventKind>() {
                Ok(kind) => Some(kind),
                Err(_) => {
                    warn!(employee_id, kind = %kind, "skipping attendance row with unknown kind");
                    None
                }
            })
            .collect())
    }

    async fn geofence_anchors(&self, employee_id: u64) -> anyhow::Result<Vec<GeofenceAnchor>> {
        let location: Option<(Option<u64>,)> =
            sqlx::query_as("SELECT location_id FROM employees WHERE id = ?")
                .bind(employee_id)
                .fetch_optional(&self.pool)
                .await
                .context("failed to load employee location")?;

        let location_id = location.and_then(|(id,)| id);

        // The employee's own location first, then its sites, so a site tied
        // with its parent location resolves to the location.
        let locations: Vec<(u64, String, Option<f64>, Option<f64>)> = match location_id {
            Some(id) => {
                sqlx::query_as(
                    r#"
                    SELECT id, name, latitude, longitude
                    FROM locations
                    WHERE id = ? AND is_deleted = FALSE
                    "#,
                )
                .bind(id)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT id, name, latitude, longitude
                    FROM locations
                    WHERE is_deleted = FALSE
                    ORDER BY id
                    "#,
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .context("failed to load geofence locations")?;

        let sites: Vec<(u64, u64, String, Option<f64>, Option<f64>)> = match location_id {
            Some(id) => {
                sqlx::query_as(
                    r#"
                    SELECT id, location_id, name, latitude, longitude
                    FROM sites
                    WHERE location_id = ? AND is_deleted = FALSE
                    ORDER BY id
                    "#,
                )
                .bind(id)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT s.id, s.location_id, s.name, s.latitude, s.longitude
                    FROM sites s
                    JOIN locations l ON l.id = s.location_id
                    WHERE s.is_deleted = FALSE AND l.is_deleted = FALSE
                    ORDER BY s.id
                    "#,
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .context("failed to load geofence sites")?;

        let mut anchors: Vec<GeofenceAnchor> = locations
            .into_iter()
            .map(|(id, name, latitude, longitude)| GeofenceAnchor {
                location_id: Some(id),
                site_id: None,
                name,
                latitude,
                longitude,
            })
            .collect();

        anchors.extend(sites.into_iter().map(
            |(id, location_id, name, latitude, longitude)| GeofenceAnchor {
                location_id: Some(location_id),
                site_id: Some(id),
                name,
                latitude,
                longitude,
            },
        ));

        Ok(anchors)
    }

    async fn append_event(&self, event: &NewAttendanceEvent) -> anyhow::Result<AppendResult> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance_log
            (employee_id, kind, timestamp, day, location_id, site_id, latitude, longitude, distance_km)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.employee_id)
        .bind(event.kind.to_string())
        .bind(event.timestamp.naive_utc())
        .bind(event.day)
        .bind(event.geofence.as_ref().and_then(|g| g.location_id))
        .bind(event.geofence.as_ref().and_then(|g| g.site_id))
        .bind(event.latitude)
        .bind(event.longitude)
        .bind(event.geofence.as_ref().map(|g| g.distance_km))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(AppendResult::Recorded),
            Err(e) => {
                // Duplicate (employee, day, kind): a concurrent scan won.
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.code().as_deref() == Some("23000") {
                        return Ok(AppendResult::Duplicate);
                    }
                }
                Err(anyhow::Error::new(e).context("failed to append attendance event"))
            }
        }
    }

    async fn insert_employee(&self, employee: &NewEmployee) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO employees
            (name, face_encoding, photo, location_id, base_salary, deduction_per_day)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&employee.name)
        .bind(embedding_to_bytes(&employee.embedding))
        .bind(&employee.photo)
        .bind(employee.location_id)
        .bind(employee.base_salary)
        .bind(employee.deduction_per_day)
        .execute(&self.pool)
        .await
        .context("failed to insert employee")?;

        Ok(result.last_insert_id())
    }
}
