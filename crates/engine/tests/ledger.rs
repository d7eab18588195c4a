mod common;

use sea_orm::{ConnectionTrait, Statement};

use engine::{
    EngineError, GenerateObligationsCmd, MatchQuery, Money, NewDeliveryCmd, NewWeighbillCmd,
    ObligationListFilter, ObligationStatus, PayeeSummaryFilter, ReceiptListFilter, ReceiptStatus,
    RecordReceiptCmd, SettleExplicitCmd, Weight,
};
use uuid::Uuid;

use common::{
    LI, ZHANG, assert_obligation_consistent, at, day, engine_with_db, money, seed_obligation,
    seed_receipt,
};

#[tokio::test]
async fn generation_covers_confirmed_weighbills_once() {
    let (engine, _db) = engine_with_db().await;
    let delivery_id = engine
        .record_delivery(
            NewDeliveryCmd::new("张三", at(0))
                .driver_phone("13800000001")
                .vehicle_no("京A12345")
                .contract_no("HT-2026-001"),
        )
        .await
        .unwrap();

    let confirmed = engine
        .record_weighbill(
            NewWeighbillCmd::new("32.480".parse().unwrap(), money("512.35"), at(1))
                .delivery_id(delivery_id)
                .weigh_date(day(1)),
        )
        .await
        .unwrap();
    let unconfirmed = engine
        .record_weighbill(
            NewWeighbillCmd::new(Weight::from_milli(5000), money("100.00"), at(2))
                .delivery_id(delivery_id),
        )
        .await
        .unwrap();
    engine.confirm_weighbill(confirmed).await.unwrap();
    engine.confirm_weighbill(confirmed).await.unwrap();

    let created = engine
        .generate_obligations(GenerateObligationsCmd::new(at(3)))
        .await
        .unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].weighbill_id, confirmed);
    // 32.480 t * 512.35 = 16641.128, rounded half up to the cent.
    assert_eq!(created[0].payable, money("16641.13"));

    let detail = engine.obligation(created[0].obligation_id).await.unwrap();
    assert_eq!(detail.obligation.driver_name.as_deref(), Some("张三"));
    assert_eq!(detail.obligation.driver_phone.as_deref(), Some("13800000001"));
    assert_eq!(detail.obligation.vehicle_no.as_deref(), Some("京A12345"));
    assert_eq!(detail.obligation.contract_no.as_deref(), Some("HT-2026-001"));
    assert_eq!(detail.obligation.paid, Money::ZERO);
    assert_eq!(detail.balance, money("16641.13"));
    assert_eq!(detail.status, ObligationStatus::Pending);

    let again = engine
        .generate_obligations(GenerateObligationsCmd::new(at(4)))
        .await
        .unwrap();
    assert!(again.is_empty());

    engine.confirm_weighbill(unconfirmed).await.unwrap();
    let later = engine
        .generate_obligations(GenerateObligationsCmd::new(at(5)))
        .await
        .unwrap();
    assert_eq!(later.len(), 1);
    assert_eq!(later[0].weighbill_id, unconfirmed);
    assert_eq!(later[0].payable, money("500.00"));
    assert!(engine.weighbill(unconfirmed).await.unwrap().confirmed);
}

#[tokio::test]
async fn generation_respects_filters() {
    let (engine, _db) = engine_with_db().await;
    let mut weighbills = Vec::new();
    for contract in ["HT-A", "HT-B"] {
        let id = engine
            .record_weighbill(
                NewWeighbillCmd::new(Weight::from_milli(1000), money("10.00"), at(0))
                    .contract_no(contract),
            )
            .await
            .unwrap();
        engine.confirm_weighbill(id).await.unwrap();
        weighbills.push(id);
    }

    let created = engine
        .generate_obligations(GenerateObligationsCmd::new(at(1)).contract_no("HT-B"))
        .await
        .unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].weighbill_id, weighbills[1]);

    let none = engine
        .generate_obligations(GenerateObligationsCmd::new(at(1)).delivery_id(Uuid::new_v4()))
        .await
        .unwrap();
    assert!(none.is_empty());

    let rest = engine
        .generate_obligations(GenerateObligationsCmd::new(at(2)))
        .await
        .unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].weighbill_id, weighbills[0]);
}

#[tokio::test]
async fn weighbill_intake_validates_input() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .record_weighbill(NewWeighbillCmd::new(Weight::ZERO, money("10.00"), at(0)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidWeight(_)));

    let err = engine
        .record_weighbill(NewWeighbillCmd::new(
            Weight::from_milli(1000),
            money("-1.00"),
            at(0),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = engine
        .record_weighbill(
            NewWeighbillCmd::new(Weight::from_milli(1000), money("1.00"), at(0))
                .delivery_id(Uuid::new_v4()),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::KeyNotFound("delivery not exists".to_string())
    );

    let err = engine
        .record_delivery(NewDeliveryCmd::new("   ", at(0)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidName(_)));

    let err = engine.confirm_weighbill(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn receipt_intake_sets_status_and_total() {
    let (engine, _db) = engine_with_db().await;

    let manual = engine
        .record_receipt(
            RecordReceiptCmd::new("张三", money("3000.00"), day(2), at(0))
                .fee(money("5.50"))
                .manual(true)
                .payer("某某贸易有限公司", Some("6222000011112222".to_string()), None)
                .receipt_no("BK20261002001"),
        )
        .await
        .unwrap();
    let manual = engine.receipt(manual).await.unwrap().receipt;
    assert_eq!(manual.status, ReceiptStatus::Confirmed);
    assert_eq!(manual.total, money("3005.50"));
    assert_eq!(manual.payer_bank, None);

    let scanned = engine
        .record_receipt(
            RecordReceiptCmd::new("李四", money("100.00"), day(3), at(1)).total(money("100.00")),
        )
        .await
        .unwrap();
    let scanned = engine.receipt(scanned).await.unwrap().receipt;
    assert_eq!(scanned.status, ReceiptStatus::PendingConfirmation);
    assert_eq!(scanned.total, money("100.00"));
    assert!(!scanned.is_manual);

    let err = engine
        .record_receipt(RecordReceiptCmd::new("张三", Money::ZERO, day(2), at(2)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = engine
        .record_receipt(RecordReceiptCmd::new(" ", money("1.00"), day(2), at(2)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidName(_)));
}

#[tokio::test]
async fn confirm_receipt_moves_forward_only() {
    let (engine, _db) = engine_with_db().await;
    let obligation_id = seed_obligation(&engine, &ZHANG, "100.00", at(0)).await;
    let receipt_id = engine
        .record_receipt(RecordReceiptCmd::new("张三", money("100.00"), day(2), at(1)))
        .await
        .unwrap();

    assert_eq!(
        engine.confirm_receipt(receipt_id).await.unwrap(),
        ReceiptStatus::Confirmed
    );
    assert_eq!(
        engine.confirm_receipt(receipt_id).await.unwrap(),
        ReceiptStatus::Confirmed
    );

    engine
        .settle_explicit(
            SettleExplicitCmd::new(receipt_id, at(2)).item(obligation_id, money("100.00")),
        )
        .await
        .unwrap();
    let err = engine.confirm_receipt(receipt_id).await.unwrap_err();
    assert_eq!(err, EngineError::ReceiptAlreadySettled(receipt_id.to_string()));
}

#[tokio::test]
async fn matching_uses_tolerance_window_and_order() {
    let (engine, _db) = engine_with_db().await;
    let exact = seed_obligation(&engine, &ZHANG, "1000.00", at(0)).await;
    let cent_above = seed_obligation(&engine, &ZHANG, "1000.01", at(10)).await;
    let _too_far = seed_obligation(&engine, &ZHANG, "1000.02", at(20)).await;
    let _other_payee = seed_obligation(&engine, &LI, "1000.00", at(30)).await;
    let partial = seed_obligation(&engine, &ZHANG, "999.99", at(40)).await;
    let settled = seed_obligation(&engine, &ZHANG, "1000.00", at(50)).await;

    let receipt_id = seed_receipt(&engine, ZHANG.name, "2000.00", 60).await;
    engine
        .settle_explicit(
            SettleExplicitCmd::new(receipt_id, at(61))
                .item(partial, money("300.00"))
                .item(settled, money("1000.00")),
        )
        .await
        .unwrap();

    let query = MatchQuery::new("张", money("1000.00"), at(24 * 60)).lookback_days(7);
    let found: Vec<Uuid> = engine
        .find_candidate_matches(&query)
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.id)
        .collect();
    // Balance descending, then creation time ascending.
    assert_eq!(found, vec![cent_above, exact, partial]);

    // A one-day window ending 24h after `at(40)` starts at `at(40)`.
    let query = MatchQuery::new("张三", money("1000.00"), at(24 * 60 + 40)).lookback_days(1);
    let found: Vec<Uuid> = engine
        .find_candidate_matches(&query)
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.id)
        .collect();
    assert_eq!(found, vec![partial]);
}

#[tokio::test]
async fn matching_returns_at_most_ten() {
    let (engine, _db) = engine_with_db().await;
    for i in 0..12 {
        seed_obligation(&engine, &ZHANG, "88.00", at(i)).await;
    }
    let found = engine
        .find_candidate_matches(&MatchQuery::new("张三", money("88.00"), at(100)))
        .await
        .unwrap();
    assert_eq!(found.len(), 10);
    assert!(found.windows(2).all(|w| w[0].created_at <= w[1].created_at));
}

#[tokio::test]
async fn matching_treats_like_wildcards_literally() {
    let (engine, _db) = engine_with_db().await;
    let zhang = seed_obligation(&engine, &ZHANG, "50.00", at(0)).await;
    let odd = common::Payee {
        name: "王_五%",
        ..LI
    };
    let wang = seed_obligation(&engine, &odd, "50.00", at(1)).await;

    for pattern in ["%", "_", "张%", "王%五"] {
        let found = engine
            .find_candidate_matches(&MatchQuery::new(pattern, money("50.00"), at(10)))
            .await
            .unwrap();
        let ids: Vec<Uuid> = found.into_iter().map(|o| o.id).collect();
        let expected = if pattern == "%" || pattern == "_" {
            vec![wang]
        } else {
            Vec::new()
        };
        assert_eq!(ids, expected, "pattern {pattern:?}");
    }

    let found = engine
        .find_candidate_matches(&MatchQuery::new("_五%", money("50.00"), at(10)))
        .await
        .unwrap();
    assert_eq!(found.into_iter().map(|o| o.id).collect::<Vec<_>>(), vec![wang]);
    let found = engine
        .find_candidate_matches(&MatchQuery::new("张", money("50.00"), at(10)))
        .await
        .unwrap();
    assert_eq!(found.into_iter().map(|o| o.id).collect::<Vec<_>>(), vec![zhang]);
}

#[tokio::test]
async fn list_obligations_filters_and_pages() {
    let (engine, _db) = engine_with_db().await;
    let z1 = seed_obligation(&engine, &ZHANG, "100.00", at(0)).await;
    let z2 = seed_obligation(&engine, &ZHANG, "200.00", at(1)).await;
    let l1 = seed_obligation(&engine, &LI, "300.00", at(2)).await;
    let r1 = seed_receipt(&engine, ZHANG.name, "50.00", 3).await;
    let r2 = seed_receipt(&engine, ZHANG.name, "50.00", 4).await;
    for receipt_id in [r1, r2] {
        engine
            .settle_explicit(SettleExplicitCmd::new(receipt_id, at(5)).item(z1, money("50.00")))
            .await
            .unwrap();
    }

    let page = engine
        .list_obligations(&ObligationListFilter::default())
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    let ids: Vec<Uuid> = page.items.iter().map(|row| row.obligation.id).collect();
    assert_eq!(ids, vec![l1, z2, z1]);
    assert_eq!(page.items[2].receipt_count, 2);
    assert_eq!(page.items[2].status, ObligationStatus::Settled);

    let page = engine
        .list_obligations(&ObligationListFilter {
            driver_name: Some("张三".to_string()),
            status: Some(ObligationStatus::Pending),
            ..ObligationListFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].obligation.id, z2);

    let page = engine
        .list_obligations(&ObligationListFilter {
            keywords: Some("京B 不存在".to_string()),
            ..ObligationListFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].obligation.id, l1);

    let page = engine
        .list_obligations(&ObligationListFilter {
            page: 2,
            page_size: 2,
            ..ObligationListFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].obligation.id, z1);

    let err = engine
        .list_obligations(&ObligationListFilter {
            page_size: 101,
            ..ObligationListFilter::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidFilter(_)));
}

#[tokio::test]
async fn list_receipts_filters_by_payee_date_and_keywords() {
    let (engine, _db) = engine_with_db().await;
    for (payee, d, remark) in [
        ("张三", 1, "十月第一批"),
        ("张三", 5, "十月第二批"),
        ("李四", 3, "运费"),
    ] {
        engine
            .record_receipt(
                RecordReceiptCmd::new(payee, money("10.00"), day(d), at(i64::from(d)))
                    .remark(remark)
                    .manual(true),
            )
            .await
            .unwrap();
    }

    let page = engine
        .list_receipts(&ReceiptListFilter::default())
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    let dates: Vec<_> = page.items.iter().map(|r| r.payment_date).collect();
    assert_eq!(dates, vec![day(5), day(3), day(1)]);

    let page = engine
        .list_receipts(&ReceiptListFilter {
            payee_name: Some("张三".to_string()),
            from: Some(day(2)),
            to: Some(day(5)),
            ..ReceiptListFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].payment_date, day(5));

    let page = engine
        .list_receipts(&ReceiptListFilter {
            keywords: Some("运费".to_string()),
            status: Some(ReceiptStatus::Confirmed),
            ..ReceiptListFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].payee_name, "李四");

    let err = engine
        .list_receipts(&ReceiptListFilter {
            from: Some(day(5)),
            to: Some(day(1)),
            ..ReceiptListFilter::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidFilter(_)));
}

#[tokio::test]
async fn payee_summaries_group_by_name_and_phone() {
    let (engine, _db) = engine_with_db().await;
    let z1 = seed_obligation(&engine, &ZHANG, "1000.00", at(0)).await;
    seed_obligation(&engine, &ZHANG, "2000.00", at(10)).await;
    let l1 = seed_obligation(&engine, &LI, "500.00", at(20)).await;
    let receipt_id = seed_receipt(&engine, ZHANG.name, "1500.00", 30).await;
    engine
        .settle_explicit(
            SettleExplicitCmd::new(receipt_id, at(31))
                .item(z1, money("400.00"))
                .item(l1, money("500.00")),
        )
        .await
        .unwrap();

    let page = engine
        .payee_summaries(&PayeeSummaryFilter::default())
        .await
        .unwrap();
    // 李四 is fully paid and drops out under the default minimum balance.
    assert_eq!(page.total_payees, 1);
    assert_eq!(page.total_balance, money("2600.00"));
    let zhang = &page.items[0];
    assert_eq!(zhang.payee_name, "张三");
    assert_eq!(zhang.driver_phone.as_deref(), Some("13800000001"));
    assert_eq!(zhang.bill_count, 2);
    assert_eq!(zhang.total_payable, money("3000.00"));
    assert_eq!(zhang.total_paid, money("400.00"));
    assert_eq!(zhang.total_balance, money("2600.00"));
    assert_eq!(zhang.pending_count, 1);
    assert_eq!(zhang.partial_count, 1);
    assert_eq!(zhang.contracts, vec!["HT-2026-001".to_string()]);
    assert_eq!(zhang.vehicles, vec!["京A12345".to_string()]);
    assert_eq!(zhang.first_bill_at, at(0));
    assert_eq!(zhang.last_bill_at, at(10));

    let page = engine
        .payee_summaries(&PayeeSummaryFilter {
            min_balance: Money::ZERO,
            ..PayeeSummaryFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total_payees, 2);
    assert_eq!(page.items[1].payee_name, "李四");
    assert_eq!(page.items[1].total_balance, Money::ZERO);
}

#[tokio::test]
async fn reconcile_repairs_drifted_rows() {
    let (engine, db) = engine_with_db().await;
    let obligation_id = seed_obligation(&engine, &ZHANG, "1000.00", at(0)).await;
    let receipt_id = seed_receipt(&engine, ZHANG.name, "600.00", 1).await;
    engine
        .settle_explicit(
            SettleExplicitCmd::new(receipt_id, at(2)).item(obligation_id, money("600.00")),
        )
        .await
        .unwrap();

    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "UPDATE obligations SET paid_minor = ?, balance_minor = ?, status = ? WHERE id = ?",
        vec![
            100_000i64.into(),
            0i64.into(),
            "settled".into(),
            obligation_id.to_string().into(),
        ],
    ))
    .await
    .unwrap();

    let outcome = engine
        .reconcile_obligation(obligation_id, at(3))
        .await
        .unwrap();
    assert!(outcome.changed);
    assert_eq!(outcome.previous_paid, money("1000.00"));
    assert_eq!(outcome.paid, money("600.00"));
    assert_eq!(outcome.balance, money("400.00"));
    assert_eq!(outcome.status, ObligationStatus::Partial);

    assert_obligation_consistent(&engine, obligation_id).await;

    let err = engine
        .reconcile_obligation(Uuid::new_v4(), at(4))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}
