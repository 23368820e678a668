use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, NotSet, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::engine::lifecycle::CandidateAlert;
use crate::entity::{alerts, enums::AlertStatus, processed_readings, readings};
use crate::error::AppResult;

use super::{EngineStore, InsertOutcome, LatestReading, ProcessedRow};

/// Production [`EngineStore`] over any sea-orm connection. Ingestion hands
/// it an open transaction so processed rows and the alert batch of one
/// pass commit or abort as a unit.
pub struct DbStore<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> DbStore<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }
}

impl<C: ConnectionTrait> EngineStore for DbStore<'_, C> {
    async fn latest_reading(&self, sensor_id: &str) -> AppResult<Option<LatestReading>> {
        let row = readings::Entity::find()
            .filter(readings::Column::SensorId.eq(sensor_id))
            .order_by_desc(readings::Column::Time)
            .order_by_desc(readings::Column::Id)
            .one(self.conn)
            .await?;

        Ok(row.map(|r| LatestReading {
            flow_rate: r.flow_rate,
            battery_level: f64::from(r.battery_level),
            time: r.time.to_utc(),
        }))
    }

    async fn recent_smoothed(&self, sensor_id: &str, window: usize) -> AppResult<Vec<f64>> {
        let rows = processed_readings::Entity::find()
            .filter(processed_readings::Column::SensorId.eq(sensor_id))
            .order_by_desc(processed_readings::Column::Time)
            .order_by_desc(processed_readings::Column::Id)
            .limit(window as u64)
            .all(self.conn)
            .await?;

        Ok(rows.into_iter().map(|r| r.smoothed_flow).collect())
    }

    async fn append_processed(&mut self, row: ProcessedRow) -> AppResult<()> {
        processed_readings::ActiveModel {
            id: NotSet,
            sensor_id: Set(row.sensor_id),
            time: Set(row.time.into()),
            smoothed_flow: Set(row.smoothed_flow),
            flow_delta: Set(row.flow_delta),
        }
        .insert(self.conn)
        .await?;
        Ok(())
    }

    async fn insert_alert(&mut self, candidate: &CandidateAlert) -> AppResult<InsertOutcome> {
        let model = alerts::ActiveModel {
            id: NotSet,
            sensor_from: Set(candidate.sensor_from.clone()),
            sensor_to: Set(candidate.sensor_to.clone()),
            alert_type: Set(candidate.alert_type),
            severity: Set(candidate.severity),
            probability: Set(candidate.probability),
            time: Set(candidate.time.into()),
            status: Set(AlertStatus::Active),
        };

        // The partial unique index on active rows enforces the dedup key.
        // DO NOTHING keeps a conflict from aborting the surrounding pass
        // transaction; sea-orm reports the skipped insert as
        // RecordNotInserted.
        let result = alerts::Entity::insert(model)
            .on_conflict(OnConflict::new().do_nothing().to_owned())
            .exec(self.conn)
            .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(DbErr::RecordNotInserted) => Ok(InsertOutcome::AlreadyActive),
            Err(e) => Err(e.into()),
        }
    }

    async fn resolve_alerts(&mut self, ids: &[i64]) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = alerts::Entity::update_many()
            .col_expr(alerts::Column::Status, Expr::value(AlertStatus::Resolved))
            .filter(alerts::Column::Id.is_in(ids.iter().copied()))
            .filter(alerts::Column::Status.eq(AlertStatus::Active))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected)
    }
}
