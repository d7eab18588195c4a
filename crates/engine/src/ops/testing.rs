//! Fixtures for unit tests that need a migrated database.

use chrono::{DateTime, Duration, TimeZone, Utc};
use migration::MigratorTrait;
use sea_orm::{ConnectionTrait, Database, DatabaseTransaction, DbBackend, Statement};
use uuid::Uuid;

use crate::{
    GenerateObligationsCmd, Money, NewDeliveryCmd, NewWeighbillCmd, RecordReceiptCmd, Weight,
};

use super::Engine;

pub(super) fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap() + Duration::minutes(minutes)
}

pub(super) async fn engine() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder().database(db).build().await.unwrap()
}

/// One-ton weighbill priced at `payable`, confirmed and turned into an
/// obligation owed to 张三.
pub(super) async fn obligation(engine: &Engine, payable: Money) -> Uuid {
    let delivery_id = engine
        .record_delivery(NewDeliveryCmd::new("张三", at(0)).driver_phone("13800000001"))
        .await
        .unwrap();
    let weighbill_id = engine
        .record_weighbill(
            NewWeighbillCmd::new(Weight::from_milli(1000), payable, at(0))
                .delivery_id(delivery_id),
        )
        .await
        .unwrap();
    engine.confirm_weighbill(weighbill_id).await.unwrap();
    engine
        .generate_obligations(GenerateObligationsCmd::new(at(0)).weighbill_id(weighbill_id))
        .await
        .unwrap()[0]
        .obligation_id
}

pub(super) async fn receipt(engine: &Engine, amount: Money, manual: bool) -> Uuid {
    engine
        .record_receipt(
            RecordReceiptCmd::new("张三", amount, at(0).date_naive(), at(1)).manual(manual),
        )
        .await
        .unwrap()
}

/// Runs a raw statement inside `tx`, standing in for a concurrent writer
/// that committed between a read and a guarded write.
pub(super) async fn interfere(tx: &DatabaseTransaction, sql: &str, id: Uuid) {
    tx.execute(Statement::from_sql_and_values(
        DbBackend::Sqlite,
        sql,
        [id.to_string().into()],
    ))
    .await
    .unwrap();
}
