#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use sea_orm::{Database, DatabaseConnection};

use engine::{
    Engine, GenerateObligationsCmd, Money, NewDeliveryCmd, NewWeighbillCmd, RecordReceiptCmd,
    Weight,
};
use migration::MigratorTrait;
use uuid::Uuid;

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    engine_with_options(false).await
}

pub async fn engine_with_options(require_confirmed: bool) -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .require_confirmed_receipts(require_confirmed)
        .build()
        .await
        .unwrap();
    (engine, db)
}

/// 2026-10-01 08:00 UTC plus `minutes`.
pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap() + Duration::minutes(minutes)
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
}

pub fn money(s: &str) -> Money {
    s.parse().unwrap()
}

pub struct Payee<'a> {
    pub name: &'a str,
    pub phone: Option<&'a str>,
    pub contract: &'a str,
    pub vehicle: &'a str,
}

pub const ZHANG: Payee<'static> = Payee {
    name: "张三",
    phone: Some("13800000001"),
    contract: "HT-2026-001",
    vehicle: "京A12345",
};

pub const LI: Payee<'static> = Payee {
    name: "李四",
    phone: Some("13900000002"),
    contract: "HT-2026-002",
    vehicle: "京B67890",
};

/// Delivery, confirmed one-ton weighbill and generated obligation worth
/// exactly `payable`, created at `created_at`.
pub async fn seed_obligation(
    engine: &Engine,
    payee: &Payee<'_>,
    payable: &str,
    created_at: DateTime<Utc>,
) -> Uuid {
    let mut delivery = NewDeliveryCmd::new(payee.name, created_at)
        .vehicle_no(payee.vehicle)
        .contract_no(payee.contract);
    if let Some(phone) = payee.phone {
        delivery = delivery.driver_phone(phone);
    }
    let delivery_id = engine.record_delivery(delivery).await.unwrap();

    let weighbill_id = engine
        .record_weighbill(
            NewWeighbillCmd::new(Weight::from_milli(1000), money(payable), created_at)
                .delivery_id(delivery_id)
                .product_name("铁矿石"),
        )
        .await
        .unwrap();
    engine.confirm_weighbill(weighbill_id).await.unwrap();

    let created = engine
        .generate_obligations(GenerateObligationsCmd::new(created_at).weighbill_id(weighbill_id))
        .await
        .unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].payable, money(payable));
    created[0].obligation_id
}

pub async fn seed_receipt(engine: &Engine, payee: &str, amount: &str, minutes: i64) -> Uuid {
    engine
        .record_receipt(
            RecordReceiptCmd::new(payee, money(amount), day(2), at(minutes)).manual(true),
        )
        .await
        .unwrap()
}

/// Checks `0 <= paid <= payable`, `paid == sum(links)` and that the stored
/// balance and status agree with the amounts.
pub async fn assert_obligation_consistent(engine: &Engine, obligation_id: Uuid) {
    let detail = engine.obligation(obligation_id).await.unwrap();
    let o = &detail.obligation;
    assert!(!o.paid.is_negative(), "paid below zero: {}", o.paid);
    assert!(o.paid <= o.payable, "paid {} above payable {}", o.paid, o.payable);
    assert_eq!(detail.balance, o.payable - o.paid);
    let linked: Money = detail.links.iter().map(|l| l.settled).sum();
    assert_eq!(linked, o.paid, "links do not add up to paid");

    let reconciled = engine
        .reconcile_obligation(obligation_id, at(10_000))
        .await
        .unwrap();
    assert!(!reconciled.changed, "stored row drifted: {reconciled:?}");
}
