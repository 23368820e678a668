use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ========== SENSORS ==========
        manager
            .create_table(
                Table::create()
                    .table(Sensors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Sensors::Id)
                            .string_len(50)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Sensors::Location).string_len(100))
                    .col(ColumnDef::new(Sensors::PipeDiameterMm).integer())
                    .col(ColumnDef::new(Sensors::InstallDate).date())
                    .col(
                        ColumnDef::new(Sensors::Status)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Sensors::CreatedAt)
                            .timestamp_with_time_zone()
                            .extra("DEFAULT NOW()"),
                    )
                    .col(ColumnDef::new(Sensors::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // ========== READINGS ==========
        manager
            .create_table(
                Table::create()
                    .table(Readings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Readings::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Readings::SensorId).string_len(50).not_null())
                    .col(
                        ColumnDef::new(Readings::Time)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Readings::FlowRate).double().not_null())
                    .col(
                        ColumnDef::new(Readings::BatteryLevel)
                            .small_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_readings_sensor")
                            .from(Readings::Table, Readings::SensorId)
                            .to(Sensors::Table, Sensors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("readings_sensor_time_idx")
                    .table(Readings::Table)
                    .col(Readings::SensorId)
                    .col((Readings::Time, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        // ========== PROCESSED READINGS ==========
        manager
            .create_table(
                Table::create()
                    .table(ProcessedReadings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProcessedReadings::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProcessedReadings::SensorId)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProcessedReadings::Time)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProcessedReadings::SmoothedFlow)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProcessedReadings::FlowDelta)
                            .double()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_processed_readings_sensor")
                            .from(ProcessedReadings::Table, ProcessedReadings::SensorId)
                            .to(Sensors::Table, Sensors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("processed_readings_sensor_time_idx")
                    .table(ProcessedReadings::Table)
                    .col(ProcessedReadings::SensorId)
                    .col((ProcessedReadings::Time, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        // ========== TOPOLOGY EDGES ==========
        manager
            .create_table(
                Table::create()
                    .table(TopologyEdges::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TopologyEdges::ParentId)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TopologyEdges::ChildId)
                            .string_len(50)
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(TopologyEdges::ParentId)
                            .col(TopologyEdges::ChildId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_topology_edges_parent")
                            .from(TopologyEdges::Table, TopologyEdges::ParentId)
                            .to(Sensors::Table, Sensors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_topology_edges_child")
                            .from(TopologyEdges::Table, TopologyEdges::ChildId)
                            .to(Sensors::Table, Sensors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // A node may have at most one parent (forest invariant)
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX topology_edges_child_idx ON topology_edges (child_id)",
            )
            .await?;

        // ========== ALERTS ==========
        manager
            .create_table(
                Table::create()
                    .table(Alerts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alerts::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alerts::SensorFrom).string_len(50).not_null())
                    .col(ColumnDef::new(Alerts::SensorTo).string_len(50).not_null())
                    .col(ColumnDef::new(Alerts::AlertType).string_len(16).not_null())
                    .col(ColumnDef::new(Alerts::Severity).string_len(8).not_null())
                    .col(ColumnDef::new(Alerts::Probability).double().not_null())
                    .col(
                        ColumnDef::new(Alerts::Time)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alerts::Status)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_alerts_sensor_from")
                            .from(Alerts::Table, Alerts::SensorFrom)
                            .to(Sensors::Table, Sensors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_alerts_sensor_to")
                            .from(Alerts::Table, Alerts::SensorTo)
                            .to(Sensors::Table, Sensors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Dedup key: at most one active alert per (from, to, type)
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX alerts_active_dedup_idx \
                 ON alerts (sensor_from, sensor_to, alert_type) \
                 WHERE status = 'active'",
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("alerts_time_idx")
                    .table(Alerts::Table)
                    .col((Alerts::Time, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("alerts_status_idx")
                    .table(Alerts::Table)
                    .col(Alerts::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alerts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TopologyEdges::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProcessedReadings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Readings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sensors::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Sensors {
    Table,
    Id,
    Location,
    PipeDiameterMm,
    InstallDate,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Readings {
    Table,
    Id,
    SensorId,
    Time,
    FlowRate,
    BatteryLevel,
}

#[derive(DeriveIden)]
enum ProcessedReadings {
    Table,
    Id,
    SensorId,
    Time,
    SmoothedFlow,
    FlowDelta,
}

#[derive(DeriveIden)]
enum TopologyEdges {
    Table,
    ParentId,
    ChildId,
}

#[derive(DeriveIden)]
enum Alerts {
    Table,
    Id,
    SensorFrom,
    SensorTo,
    AlertType,
    Severity,
    Probability,
    Time,
    Status,
}
