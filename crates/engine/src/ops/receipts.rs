use chrono::NaiveDate;
use sea_orm::{
    DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*, sea_query::Expr,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    EngineError, Money, Receipt, ReceiptStatus, RecordReceiptCmd, ResultEngine, obligations,
    receipts, settlement_links,
    util::{
        keyword_condition, normalize_optional_text, normalize_required_name, parse_uuid,
        validate_page,
    },
};

use super::{Engine, with_tx};

/// An obligation a receipt was applied to, as seen from the receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReceiptLink {
    pub obligation_id: Uuid,
    pub driver_name: Option<String>,
    pub vehicle_no: Option<String>,
    pub payable: Money,
    pub settled: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReceiptDetail {
    #[serde(flatten)]
    pub receipt: Receipt,
    /// Sum of `links[].settled`.
    pub applied: Money,
    pub links: Vec<ReceiptLink>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReceiptPage {
    pub items: Vec<Receipt>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

/// Filters for [`Engine::list_receipts`]. All set filters must match.
#[derive(Clone, Debug)]
pub struct ReceiptListFilter {
    /// Exact payee name.
    pub payee_name: Option<String>,
    pub status: Option<ReceiptStatus>,
    /// Inclusive lower bound on the payment date.
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on the payment date.
    pub to: Option<NaiveDate>,
    /// Whitespace-separated; matched against receipt number, payer, payee
    /// and remark.
    pub keywords: Option<String>,
    pub page: u64,
    pub page_size: u64,
}

impl Default for ReceiptListFilter {
    fn default() -> Self {
        Self {
            payee_name: None,
            status: None,
            from: None,
            to: None,
            keywords: None,
            page: 1,
            page_size: 20,
        }
    }
}

fn validate_list_filter(filter: &ReceiptListFilter) -> ResultEngine<u64> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from > to
    {
        return Err(EngineError::InvalidFilter(
            "invalid range: from must be <= to".to_string(),
        ));
    }
    validate_page(filter.page, filter.page_size)
}

impl Engine {
    /// Records a receipt and returns its id.
    ///
    /// Manual entries start `Confirmed`; everything else waits in
    /// `PendingConfirmation` for [`Engine::confirm_receipt`].
    pub async fn record_receipt(&self, cmd: RecordReceiptCmd) -> ResultEngine<Uuid> {
        if !cmd.amount.is_positive() {
            return Err(EngineError::InvalidAmount(format!(
                "receipt amount must be > 0, got {}",
                cmd.amount
            )));
        }
        if cmd.fee.is_negative() {
            return Err(EngineError::InvalidAmount(format!(
                "receipt fee must be >= 0, got {}",
                cmd.fee
            )));
        }
        let total = match cmd.total {
            Some(total) => total,
            None => cmd.amount.checked_add(cmd.fee).ok_or_else(|| {
                EngineError::InvalidAmount("receipt total overflows".to_string())
            })?,
        };
        if total.is_negative() {
            return Err(EngineError::InvalidAmount(format!(
                "receipt total must be >= 0, got {total}"
            )));
        }

        let receipt = Receipt {
            id: Uuid::new_v4(),
            receipt_no: normalize_optional_text(cmd.receipt_no.as_deref()),
            payment_date: cmd.payment_date,
            payment_time: cmd.payment_time,
            payer_name: normalize_optional_text(cmd.payer_name.as_deref()),
            payer_account: normalize_optional_text(cmd.payer_account.as_deref()),
            payer_bank: normalize_optional_text(cmd.payer_bank.as_deref()),
            payee_name: normalize_required_name(&cmd.payee_name, "payee")?,
            payee_account: normalize_optional_text(cmd.payee_account.as_deref()),
            payee_bank: normalize_optional_text(cmd.payee_bank.as_deref()),
            amount: cmd.amount,
            fee: cmd.fee,
            total,
            remark: normalize_optional_text(cmd.remark.as_deref()),
            status: ReceiptStatus::initial(cmd.is_manual),
            is_manual: cmd.is_manual,
            version: 0,
            created_at: cmd.recorded_at,
            updated_at: cmd.recorded_at,
        };

        with_tx!(self, |db_tx| {
            receipts::ActiveModel::from(&receipt).insert(&db_tx).await?;
            info!(
                receipt_id = %receipt.id,
                payee = %receipt.payee_name,
                amount = %receipt.amount,
                status = receipt.status.as_str(),
                "receipt recorded"
            );
            Ok(receipt.id)
        })
    }

    /// Marks a receipt's fields as reviewed.
    ///
    /// A confirmed receipt stays confirmed; a settled one is rejected.
    pub async fn confirm_receipt(&self, receipt_id: Uuid) -> ResultEngine<ReceiptStatus> {
        with_tx!(self, |db_tx| {
            let model = self.require_receipt(&db_tx, receipt_id).await?;
            match ReceiptStatus::try_from(model.status.as_str())? {
                ReceiptStatus::Settled => {
                    Err(EngineError::ReceiptAlreadySettled(receipt_id.to_string()))
                }
                ReceiptStatus::Confirmed => Ok(ReceiptStatus::Confirmed),
                ReceiptStatus::PendingConfirmation => {
                    mark_confirmed(&db_tx, receipt_id, model.version).await?;
                    info!(%receipt_id, "receipt confirmed");
                    Ok(ReceiptStatus::Confirmed)
                }
            }
        })
    }

    /// Returns a receipt with the obligations it was applied to.
    pub async fn receipt(&self, receipt_id: Uuid) -> ResultEngine<ReceiptDetail> {
        with_tx!(self, |db_tx| {
            let receipt = Receipt::try_from(self.require_receipt(&db_tx, receipt_id).await?)?;
            let rows = settlement_links::Entity::find()
                .filter(settlement_links::Column::ReceiptId.eq(receipt_id.to_string()))
                .find_also_related(obligations::Entity)
                .order_by_asc(settlement_links::Column::CreatedAt)
                .order_by_asc(settlement_links::Column::ObligationId)
                .all(&db_tx)
                .await?;

            let mut links = Vec::with_capacity(rows.len());
            for (link, obligation) in rows {
                let Some(obligation) = obligation else {
                    continue;
                };
                links.push(ReceiptLink {
                    obligation_id: parse_uuid(&link.obligation_id, "obligation")?,
                    driver_name: obligation.driver_name,
                    vehicle_no: obligation.vehicle_no,
                    payable: Money::new(obligation.payable_minor),
                    settled: Money::new(link.settled_minor),
                });
            }

            Ok(ReceiptDetail {
                applied: links.iter().map(|link| link.settled).sum(),
                receipt,
                links,
            })
        })
    }

    /// Lists receipts newest payment first, one page at a time.
    pub async fn list_receipts(&self, filter: &ReceiptListFilter) -> ResultEngine<ReceiptPage> {
        let offset = validate_list_filter(filter)?;

        with_tx!(self, |db_tx| {
            let mut query = receipts::Entity::find();
            if let Some(payee) = normalize_optional_text(filter.payee_name.as_deref()) {
                query = query.filter(receipts::Column::PayeeName.eq(payee));
            }
            if let Some(status) = filter.status {
                query = query.filter(receipts::Column::Status.eq(status.as_str()));
            }
            if let Some(from) = filter.from {
                query = query.filter(receipts::Column::PaymentDate.gte(from));
            }
            if let Some(to) = filter.to {
                query = query.filter(receipts::Column::PaymentDate.lte(to));
            }
            if let Some(condition) = keyword_condition(
                filter.keywords.as_deref(),
                &[
                    receipts::Column::ReceiptNo,
                    receipts::Column::PayerName,
                    receipts::Column::PayeeName,
                    receipts::Column::Remark,
                ],
            ) {
                query = query.filter(condition);
            }

            let total = query.clone().count(&db_tx).await?;
            let items = query
                .order_by_desc(receipts::Column::PaymentDate)
                .order_by_desc(receipts::Column::CreatedAt)
                .order_by_desc(receipts::Column::Id)
                .offset(offset)
                .limit(filter.page_size)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Receipt::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;

            Ok(ReceiptPage {
                items,
                total,
                page: filter.page,
                page_size: filter.page_size,
            })
        })
    }
}

/// Moves a pending receipt to `confirmed`, guarded by the version it was
/// read with. A settlement that claimed the receipt in between wins.
async fn mark_confirmed(
    db: &DatabaseTransaction,
    receipt_id: Uuid,
    read_version: i64,
) -> ResultEngine<()> {
    let result = receipts::Entity::update_many()
        .col_expr(
            receipts::Column::Status,
            Expr::value(ReceiptStatus::Confirmed.as_str()),
        )
        .col_expr(receipts::Column::Version, Expr::value(read_version + 1))
        .filter(receipts::Column::Id.eq(receipt_id.to_string()))
        .filter(receipts::Column::Version.eq(read_version))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(EngineError::Conflict(format!("receipt {receipt_id}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::testing::{engine, interfere, receipt};

    #[tokio::test]
    async fn confirm_loses_to_a_settlement_that_claimed_first() {
        let engine = engine().await;
        let receipt_id = receipt(&engine, Money::new(100_00), false).await;

        let tx = engine.database.begin().await.unwrap();
        let read = engine.require_receipt(&tx, receipt_id).await.unwrap();
        assert_eq!(read.status, ReceiptStatus::PendingConfirmation.as_str());
        interfere(
            &tx,
            "UPDATE receipts SET status = 'settled', version = version + 1 WHERE id = ?",
            receipt_id,
        )
        .await;

        let err = mark_confirmed(&tx, receipt_id, read.version)
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::Conflict(format!("receipt {receipt_id}")));

        let row = engine.require_receipt(&tx, receipt_id).await.unwrap();
        assert_eq!(row.status, ReceiptStatus::Settled.as_str());
        assert_eq!(row.version, 1);
    }
}
