//! Applying receipt money to obligations.
//!
//! Every settlement call is one unit of work:
//!
//! 1. the receipt row is claimed first (version compare-and-swap), which also
//!    takes the store's write lock;
//! 2. the obligations involved are loaded and locked in ascending id order;
//! 3. new shares are computed in memory;
//! 4. obligations, links and the receipt are written back, each obligation
//!    guarded by the version it was read with.
//!
//! A lost compare-and-swap surfaces as [`EngineError::Conflict`] and rolls the
//! whole call back.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, Select,
    TransactionTrait,
    prelude::*,
    sea_query::{Expr, OnConflict},
};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    EngineError, Money, Obligation, ObligationStatus, Receipt, ReceiptStatus, ResultEngine,
    SettleByPayeeCmd, SettleExplicitCmd, obligations, receipts, settlement_links,
    util::{normalize_optional_text, normalize_required_name, parse_uuid},
};

use super::{Engine, with_tx};

/// What one obligation received from the receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SettledItem {
    pub obligation_id: Uuid,
    /// Share of the receipt now recorded against this obligation.
    pub settled: Money,
    /// How much `settled` moved in this call. Negative when a share was
    /// corrected downwards.
    pub applied: Money,
    pub balance: Money,
    pub status: ObligationStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SettlementOutcome {
    pub receipt_id: Uuid,
    /// One item per obligation touched, in request (or FIFO) order.
    pub items: Vec<SettledItem>,
    /// Net amount this call moved onto obligations.
    pub total_settled: Money,
    /// Part of the receipt's face value not linked to any obligation.
    pub unused_remainder: Money,
    pub receipt_status: ReceiptStatus,
}

/// In-memory view of everything a settlement call touches.
struct SettlementBook {
    receipt: Receipt,
    obligations: BTreeMap<Uuid, Obligation>,
    /// Links of this receipt, by obligation id.
    links: HashMap<Uuid, Money>,
    /// `links` as loaded, before this call.
    loaded_links: HashMap<Uuid, Money>,
    /// Pairs whose link amount changed in this call.
    dirty_links: BTreeMap<Uuid, Money>,
}

impl SettlementBook {
    fn new(
        receipt: Receipt,
        obligations: BTreeMap<Uuid, Obligation>,
        links: HashMap<Uuid, Money>,
    ) -> Self {
        Self {
            receipt,
            obligations,
            loaded_links: links.clone(),
            links,
            dirty_links: BTreeMap::new(),
        }
    }

    fn applied(&self) -> Money {
        self.links.values().copied().sum()
    }

    fn unused(&self) -> Money {
        (self.receipt.amount - self.applied()).max(Money::ZERO)
    }

    /// Sets the receipt's share of `obligation_id` to `requested` (clamped)
    /// and returns the item as it stands afterwards.
    fn reshare(&mut self, obligation_id: Uuid, requested: Money) -> Option<SettledItem> {
        let obligation = self.obligations.get_mut(&obligation_id)?;
        let current = self
            .links
            .get(&obligation_id)
            .copied()
            .unwrap_or(Money::ZERO);
        let share = obligation.reshare(current, requested);
        debug!(
            %obligation_id,
            requested = %requested,
            previous = %current,
            settled = %share,
            "obligation share computed"
        );
        if share != current {
            self.links.insert(obligation_id, share);
            self.dirty_links.insert(obligation_id, share);
        }
        let before_call = self
            .loaded_links
            .get(&obligation_id)
            .copied()
            .unwrap_or(Money::ZERO);
        Some(SettledItem {
            obligation_id,
            settled: share,
            applied: share - before_call,
            balance: obligation.balance(),
            status: obligation.status(),
        })
    }
}

impl Engine {
    /// Applies a receipt to caller-chosen obligations.
    ///
    /// Pairs are processed in the given order. Each pair sets the receipt's
    /// share of that obligation to the requested amount, capped at what the
    /// obligation can still take; repeating a pair replaces the earlier
    /// share instead of adding to it. Unknown obligation ids are skipped.
    ///
    /// The receipt becomes `Settled` once its links cover its face value,
    /// otherwise it is left `Confirmed`.
    pub async fn settle_explicit(&self, cmd: SettleExplicitCmd) -> ResultEngine<SettlementOutcome> {
        if cmd.items.is_empty() {
            return Err(EngineError::KeyNotFound(
                "no obligations to settle".to_string(),
            ));
        }
        if let Some(item) = cmd.items.iter().find(|item| !item.amount.is_positive()) {
            return Err(EngineError::InvalidAmount(format!(
                "settlement amount must be > 0, got {} for obligation {}",
                item.amount, item.obligation_id
            )));
        }

        with_tx!(self, |db_tx| {
            let receipt = self
                .claim_receipt(&db_tx, cmd.receipt_id, cmd.settled_at)
                .await?;

            let mut ids: Vec<Uuid> = cmd.items.iter().map(|item| item.obligation_id).collect();
            ids.sort_unstable();
            ids.dedup();
            let obligations = load_obligations_locked(
                &db_tx,
                obligations::Entity::find()
                    .filter(obligations::Column::Id.is_in(ids.iter().map(Uuid::to_string))),
            )
            .await?;
            for id in ids.iter().filter(|id| !obligations.contains_key(id)) {
                warn!(obligation_id = %id, receipt_id = %cmd.receipt_id, "unknown obligation skipped");
            }
            if obligations.is_empty() {
                return Err(EngineError::KeyNotFound("obligation not exists".to_string()));
            }

            let links = load_receipt_links(&db_tx, receipt.id).await?;
            let mut book = SettlementBook::new(receipt, obligations, links);

            // A repeated obligation id keeps its first position and its last
            // requested amount.
            let mut items: Vec<SettledItem> = Vec::with_capacity(cmd.items.len());
            for item in &cmd.items {
                let Some(settled) = book.reshare(item.obligation_id, item.amount) else {
                    continue;
                };
                match items
                    .iter_mut()
                    .find(|existing| existing.obligation_id == settled.obligation_id)
                {
                    Some(existing) => *existing = settled,
                    None => items.push(settled),
                }
            }

            self.persist_settlement(&db_tx, book, items, cmd.settled_at)
                .await
        })
    }

    /// Spreads a receipt over a payee's outstanding obligations, oldest
    /// first, until either the receipt or the obligations run out.
    pub async fn settle_by_payee(&self, cmd: SettleByPayeeCmd) -> ResultEngine<SettlementOutcome> {
        let payee = normalize_required_name(&cmd.payee_name, "payee")?;
        let phone = normalize_optional_text(cmd.driver_phone.as_deref());

        with_tx!(self, |db_tx| {
            let receipt = self
                .claim_receipt(&db_tx, cmd.receipt_id, cmd.settled_at)
                .await?;

            let mut query = obligations::Entity::find()
                .filter(obligations::Column::DriverName.eq(payee.as_str()))
                .filter(obligations::Column::BalanceMinor.gt(0))
                .filter(obligations::Column::Status.is_in([
                    ObligationStatus::Pending.as_str(),
                    ObligationStatus::Partial.as_str(),
                ]));
            if let Some(phone) = &phone {
                query = query.filter(obligations::Column::DriverPhone.eq(phone.as_str()));
            }
            let obligations = load_obligations_locked(&db_tx, query).await?;
            if obligations.is_empty() {
                return Err(EngineError::NoOutstandingBalance(payee));
            }

            let mut queue: Vec<(DateTime<Utc>, i64, Uuid)> = obligations
                .values()
                .map(|o| (o.created_at, o.seq, o.id))
                .collect();
            queue.sort_unstable();

            let links = load_receipt_links(&db_tx, receipt.id).await?;
            let mut book = SettlementBook::new(receipt, obligations, links);

            let mut remaining = book.unused();
            let mut items = Vec::new();
            for (_, _, obligation_id) in queue {
                if !remaining.is_positive() {
                    break;
                }
                let Some(balance) = book.obligations.get(&obligation_id).map(Obligation::balance)
                else {
                    continue;
                };
                let current = book
                    .links
                    .get(&obligation_id)
                    .copied()
                    .unwrap_or(Money::ZERO);
                let take = balance.min(remaining);
                if let Some(item) = book.reshare(obligation_id, current + take) {
                    remaining -= item.settled - current;
                    items.push(item);
                }
            }

            self.persist_settlement(&db_tx, book, items, cmd.settled_at)
                .await
        })
    }

    /// Locks the receipt for this call and rejects it when it cannot be
    /// settled.
    ///
    /// The version bump is the receipt's compare-and-swap: a concurrent call
    /// that read the same version finds nothing to update and fails with
    /// `Conflict`.
    async fn claim_receipt(
        &self,
        db: &DatabaseTransaction,
        receipt_id: Uuid,
        now: DateTime<Utc>,
    ) -> ResultEngine<Receipt> {
        let model = receipts::Entity::find_by_id(receipt_id.to_string())
            .lock_exclusive()
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("receipt not exists".to_string()))?;
        let mut receipt = Receipt::try_from(model)?;

        match receipt.status {
            ReceiptStatus::Settled => {
                return Err(EngineError::ReceiptAlreadySettled(receipt_id.to_string()));
            }
            ReceiptStatus::PendingConfirmation if self.require_confirmed_receipts => {
                return Err(EngineError::ReceiptNotConfirmed(receipt_id.to_string()));
            }
            ReceiptStatus::PendingConfirmation => {
                warn!(%receipt_id, "settling a receipt that was never confirmed");
            }
            ReceiptStatus::Confirmed => {}
        }

        receipt.version = bump_receipt_version(db, receipt_id, receipt.version, now).await?;
        Ok(receipt)
    }

    async fn persist_settlement(
        &self,
        db: &DatabaseTransaction,
        book: SettlementBook,
        items: Vec<SettledItem>,
        now: DateTime<Utc>,
    ) -> ResultEngine<SettlementOutcome> {
        for obligation_id in book.dirty_links.keys() {
            if let Some(obligation) = book.obligations.get(obligation_id) {
                write_obligation(db, obligation, now).await?;
            }
        }
        for (obligation_id, share) in &book.dirty_links {
            upsert_link(db, book.receipt.id, *obligation_id, *share, now).await?;
        }

        let applied = book.applied();
        let receipt_status = ReceiptStatus::after_settlement(book.receipt.amount, applied);
        let written = receipts::Entity::update_many()
            .col_expr(
                receipts::Column::Status,
                Expr::value(receipt_status.as_str()),
            )
            .filter(receipts::Column::Id.eq(book.receipt.id.to_string()))
            .filter(receipts::Column::Version.eq(book.receipt.version))
            .exec(db)
            .await?;
        if written.rows_affected == 0 {
            return Err(EngineError::Conflict(format!("receipt {}", book.receipt.id)));
        }

        let total_settled: Money = items.iter().map(|item| item.applied).sum();
        let unused_remainder = book.unused();
        info!(
            receipt_id = %book.receipt.id,
            obligations = items.len(),
            total_settled = %total_settled,
            unused_remainder = %unused_remainder,
            status = receipt_status.as_str(),
            "receipt settled"
        );

        Ok(SettlementOutcome {
            receipt_id: book.receipt.id,
            items,
            total_settled,
            unused_remainder,
            receipt_status,
        })
    }
}

/// Moves the receipt from `read_version` to the next version and returns it.
async fn bump_receipt_version(
    db: &DatabaseTransaction,
    receipt_id: Uuid,
    read_version: i64,
    now: DateTime<Utc>,
) -> ResultEngine<i64> {
    let claimed = receipts::Entity::update_many()
        .col_expr(receipts::Column::Version, Expr::value(read_version + 1))
        .col_expr(receipts::Column::UpdatedAt, Expr::value(now))
        .filter(receipts::Column::Id.eq(receipt_id.to_string()))
        .filter(receipts::Column::Version.eq(read_version))
        .exec(db)
        .await?;
    if claimed.rows_affected == 0 {
        return Err(EngineError::Conflict(format!("receipt {receipt_id}")));
    }
    Ok(read_version + 1)
}

/// Loads obligations ordered (and therefore locked) by ascending id.
async fn load_obligations_locked(
    db: &DatabaseTransaction,
    query: Select<obligations::Entity>,
) -> ResultEngine<BTreeMap<Uuid, Obligation>> {
    let models = query
        .order_by_asc(obligations::Column::Id)
        .lock_exclusive()
        .all(db)
        .await?;
    let mut out = BTreeMap::new();
    for model in models {
        let obligation = Obligation::try_from(model)?;
        out.insert(obligation.id, obligation);
    }
    Ok(out)
}

async fn load_receipt_links(
    db: &DatabaseTransaction,
    receipt_id: Uuid,
) -> ResultEngine<HashMap<Uuid, Money>> {
    let models = settlement_links::Entity::find()
        .filter(settlement_links::Column::ReceiptId.eq(receipt_id.to_string()))
        .all(db)
        .await?;
    let mut out = HashMap::with_capacity(models.len());
    for model in models {
        out.insert(
            parse_uuid(&model.obligation_id, "obligation")?,
            Money::new(model.settled_minor),
        );
    }
    Ok(out)
}

/// Writes `paid`, `balance` and `status`, guarded by the version the
/// obligation was read with.
pub(super) async fn write_obligation(
    db: &DatabaseTransaction,
    obligation: &Obligation,
    now: DateTime<Utc>,
) -> ResultEngine<()> {
    let result = obligations::Entity::update_many()
        .col_expr(
            obligations::Column::PaidMinor,
            Expr::value(obligation.paid.minor()),
        )
        .col_expr(
            obligations::Column::BalanceMinor,
            Expr::value(obligation.balance().minor()),
        )
        .col_expr(
            obligations::Column::Status,
            Expr::value(obligation.status().as_str()),
        )
        .col_expr(
            obligations::Column::Version,
            Expr::value(obligation.version + 1),
        )
        .col_expr(obligations::Column::UpdatedAt, Expr::value(now))
        .filter(obligations::Column::Id.eq(obligation.id.to_string()))
        .filter(obligations::Column::Version.eq(obligation.version))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(EngineError::Conflict(format!("obligation {}", obligation.id)));
    }
    Ok(())
}

/// Inserts the `(receipt, obligation)` link or replaces its amount.
async fn upsert_link(
    db: &DatabaseTransaction,
    receipt_id: Uuid,
    obligation_id: Uuid,
    share: Money,
    now: DateTime<Utc>,
) -> ResultEngine<()> {
    let link = settlement_links::ActiveModel {
        receipt_id: ActiveValue::Set(receipt_id.to_string()),
        obligation_id: ActiveValue::Set(obligation_id.to_string()),
        settled_minor: ActiveValue::Set(share.minor()),
        created_at: ActiveValue::Set(now),
        updated_at: ActiveValue::Set(now),
    };
    settlement_links::Entity::insert(link)
        .on_conflict(
            OnConflict::columns([
                settlement_links::Column::ReceiptId,
                settlement_links::Column::ObligationId,
            ])
            .update_columns([
                settlement_links::Column::SettledMinor,
                settlement_links::Column::UpdatedAt,
            ])
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::testing::{at, engine, interfere, obligation, receipt};

    #[tokio::test]
    async fn stale_obligation_write_is_a_conflict() {
        let engine = engine().await;
        let obligation_id = obligation(&engine, Money::new(100_00)).await;

        let tx = engine.database.begin().await.unwrap();
        let model = obligations::Entity::find_by_id(obligation_id.to_string())
            .one(&tx)
            .await
            .unwrap()
            .unwrap();
        let mut stale = Obligation::try_from(model).unwrap();
        interfere(
            &tx,
            "UPDATE obligations SET version = version + 1 WHERE id = ?",
            obligation_id,
        )
        .await;

        stale.reshare(Money::ZERO, Money::new(60_00));
        let err = write_obligation(&tx, &stale, at(5)).await.unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)), "{err:?}");

        let row = obligations::Entity::find_by_id(obligation_id.to_string())
            .one(&tx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.paid_minor, 0);
        assert_eq!(row.balance_minor, 100_00);
        assert_eq!(row.version, 1);
    }

    #[tokio::test]
    async fn receipt_changed_after_claim_rolls_the_call_back() {
        let engine = engine().await;
        let obligation_id = obligation(&engine, Money::new(100_00)).await;
        let receipt_id = receipt(&engine, Money::new(100_00), true).await;

        {
            let tx = engine.database.begin().await.unwrap();
            let claimed = engine.claim_receipt(&tx, receipt_id, at(5)).await.unwrap();
            assert_eq!(claimed.version, 1);
            let obligations = load_obligations_locked(
                &tx,
                obligations::Entity::find()
                    .filter(obligations::Column::Id.eq(obligation_id.to_string())),
            )
            .await
            .unwrap();
            let links = load_receipt_links(&tx, receipt_id).await.unwrap();
            let mut book = SettlementBook::new(claimed, obligations, links);
            let item = book.reshare(obligation_id, Money::new(100_00)).unwrap();

            interfere(
                &tx,
                "UPDATE receipts SET version = version + 1 WHERE id = ?",
                receipt_id,
            )
            .await;
            let err = engine
                .persist_settlement(&tx, book, vec![item], at(5))
                .await
                .unwrap_err();
            assert!(matches!(err, EngineError::Conflict(_)), "{err:?}");
            // Dropped without commit.
        }

        let detail = engine.receipt(receipt_id).await.unwrap();
        assert_eq!(detail.receipt.status, ReceiptStatus::Confirmed);
        assert_eq!(detail.receipt.version, 0);
        assert!(detail.links.is_empty());
        let obligation = engine.obligation(obligation_id).await.unwrap();
        assert_eq!(obligation.obligation.paid, Money::ZERO);
        assert_eq!(obligation.obligation.version, 0);
    }

    #[tokio::test]
    async fn second_claim_on_a_claimed_version_is_a_conflict() {
        let engine = engine().await;
        let receipt_id = receipt(&engine, Money::new(100_00), true).await;

        let tx = engine.database.begin().await.unwrap();
        let claimed = engine.claim_receipt(&tx, receipt_id, at(5)).await.unwrap();
        assert_eq!(claimed.version, 1);

        // A caller that read the receipt before the claim still holds version 0.
        let err = bump_receipt_version(&tx, receipt_id, 0, at(6))
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::Conflict(format!("receipt {receipt_id}")));

        let row = receipts::Entity::find_by_id(receipt_id.to_string())
            .one(&tx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.version, 1);
        assert_eq!(row.updated_at, at(5));
    }
}
