use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*,
    sea_query::OnConflict,
};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    EngineError, GenerateObligationsCmd, Money, Obligation, ObligationStatus, ResultEngine,
    Weighbill, deliveries, obligations, payable_amount, receipts, settlement_links,
    util::{keyword_condition, normalize_optional_text, parse_uuid, validate_page},
    weighbills,
};

use super::{Engine, settlement::write_obligation, with_tx};

/// One obligation created by [`Engine::generate_obligations`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GeneratedObligation {
    pub obligation_id: Uuid,
    pub weighbill_id: Uuid,
    pub payable: Money,
}

/// A receipt applied to an obligation, as seen from the obligation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ObligationLink {
    pub receipt_id: Uuid,
    pub payee_name: String,
    pub receipt_amount: Money,
    pub payment_date: NaiveDate,
    pub settled: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ObligationDetail {
    #[serde(flatten)]
    pub obligation: Obligation,
    pub balance: Money,
    pub status: ObligationStatus,
    /// Newest link first.
    pub links: Vec<ObligationLink>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ObligationRow {
    #[serde(flatten)]
    pub obligation: Obligation,
    pub balance: Money,
    pub status: ObligationStatus,
    /// Number of receipts linked to the obligation.
    pub receipt_count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ObligationPage {
    pub items: Vec<ObligationRow>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

/// Result of [`Engine::reconcile_obligation`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub obligation_id: Uuid,
    pub previous_paid: Money,
    pub paid: Money,
    pub balance: Money,
    pub status: ObligationStatus,
    /// False when the stored row already agreed with its links.
    pub changed: bool,
}

/// Filters for [`Engine::list_obligations`]. All set filters must match.
#[derive(Clone, Debug)]
pub struct ObligationListFilter {
    /// Exact contract reference.
    pub contract_no: Option<String>,
    /// Exact payee name.
    pub driver_name: Option<String>,
    pub status: Option<ObligationStatus>,
    /// Whitespace-separated; any token matching contract, payee, phone or
    /// vehicle selects the row.
    pub keywords: Option<String>,
    pub page: u64,
    pub page_size: u64,
}

impl Default for ObligationListFilter {
    fn default() -> Self {
        Self {
            contract_no: None,
            driver_name: None,
            status: None,
            keywords: None,
            page: 1,
            page_size: 20,
        }
    }
}

impl Engine {
    /// Creates one obligation per confirmed weighbill that has none yet.
    ///
    /// The optional filters in `cmd` narrow the weighbills considered.
    /// Running it again creates nothing new: a weighbill that already has an
    /// obligation is excluded by the query, and the unique index on
    /// `weighbill_id` drops a concurrent duplicate.
    pub async fn generate_obligations(
        &self,
        cmd: GenerateObligationsCmd,
    ) -> ResultEngine<Vec<GeneratedObligation>> {
        with_tx!(self, |db_tx| {
            let mut query = weighbills::Entity::find()
                .left_join(obligations::Entity)
                .filter(weighbills::Column::Confirmed.eq(true))
                .filter(obligations::Column::Id.is_null())
                .order_by_asc(weighbills::Column::CreatedAt)
                .order_by_asc(weighbills::Column::Id);
            if let Some(contract_no) = normalize_optional_text(cmd.contract_no.as_deref()) {
                query = query.filter(weighbills::Column::ContractNo.eq(contract_no));
            }
            if let Some(delivery_id) = cmd.delivery_id {
                query = query.filter(weighbills::Column::DeliveryId.eq(delivery_id.to_string()));
            }
            if let Some(weighbill_id) = cmd.weighbill_id {
                query = query.filter(weighbills::Column::Id.eq(weighbill_id.to_string()));
            }
            let candidates: Vec<Weighbill> = query
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Weighbill::try_from)
                .collect::<ResultEngine<_>>()?;

            let delivery_ids: Vec<String> = candidates
                .iter()
                .filter_map(|w| w.delivery_id.map(|id| id.to_string()))
                .collect();
            let deliveries: HashMap<String, deliveries::Model> = if delivery_ids.is_empty() {
                HashMap::new()
            } else {
                deliveries::Entity::find()
                    .filter(deliveries::Column::Id.is_in(delivery_ids))
                    .all(&db_tx)
                    .await?
                    .into_iter()
                    .map(|d| (d.id.clone(), d))
                    .collect()
            };

            let mut next_seq = obligations::Entity::find()
                .order_by_desc(obligations::Column::Seq)
                .one(&db_tx)
                .await?
                .map_or(1, |last| last.seq + 1);

            let mut created = Vec::with_capacity(candidates.len());
            for weighbill in candidates {
                let payable = payable_amount(weighbill.unit_price, weighbill.net_weight)?;
                let delivery = weighbill
                    .delivery_id
                    .and_then(|id| deliveries.get(&id.to_string()));
                let obligation = Obligation {
                    id: Uuid::new_v4(),
                    weighbill_id: weighbill.id,
                    contract_no: weighbill
                        .contract_no
                        .clone()
                        .or_else(|| delivery.and_then(|d| d.contract_no.clone())),
                    delivery_id: weighbill.delivery_id,
                    driver_name: delivery.map(|d| d.driver_name.clone()),
                    driver_phone: delivery.and_then(|d| d.driver_phone.clone()),
                    vehicle_no: weighbill
                        .vehicle_no
                        .clone()
                        .or_else(|| delivery.and_then(|d| d.vehicle_no.clone())),
                    payable,
                    paid: Money::ZERO,
                    version: 0,
                    seq: next_seq,
                    created_at: cmd.created_at,
                    updated_at: cmd.created_at,
                };

                let inserted = obligations::Entity::insert(obligations::ActiveModel::from(
                    &obligation,
                ))
                .on_conflict(
                    OnConflict::column(obligations::Column::WeighbillId)
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(&db_tx)
                .await?;
                if inserted == 0 {
                    debug!(weighbill_id = %weighbill.id, "obligation already exists");
                    continue;
                }
                next_seq += 1;

                info!(
                    obligation_id = %obligation.id,
                    weighbill_id = %weighbill.id,
                    payable = %payable,
                    "obligation created"
                );
                created.push(GeneratedObligation {
                    obligation_id: obligation.id,
                    weighbill_id: weighbill.id,
                    payable,
                });
            }
            Ok(created)
        })
    }

    /// Returns an obligation with the receipts applied to it.
    pub async fn obligation(&self, obligation_id: Uuid) -> ResultEngine<ObligationDetail> {
        with_tx!(self, |db_tx| {
            let obligation = Obligation::try_from(
                self.require_obligation(&db_tx, obligation_id).await?,
            )?;
            let rows = settlement_links::Entity::find()
                .filter(settlement_links::Column::ObligationId.eq(obligation_id.to_string()))
                .find_also_related(receipts::Entity)
                .order_by_desc(settlement_links::Column::CreatedAt)
                .order_by_desc(settlement_links::Column::ReceiptId)
                .all(&db_tx)
                .await?;

            let mut links = Vec::with_capacity(rows.len());
            for (link, receipt) in rows {
                let Some(receipt) = receipt else {
                    continue;
                };
                links.push(ObligationLink {
                    receipt_id: parse_uuid(&link.receipt_id, "receipt")?,
                    payee_name: receipt.payee_name,
                    receipt_amount: Money::new(receipt.amount_minor),
                    payment_date: receipt.payment_date,
                    settled: Money::new(link.settled_minor),
                });
            }

            Ok(ObligationDetail {
                balance: obligation.balance(),
                status: obligation.status(),
                obligation,
                links,
            })
        })
    }

    /// Lists obligations newest first, one page at a time.
    pub async fn list_obligations(
        &self,
        filter: &ObligationListFilter,
    ) -> ResultEngine<ObligationPage> {
        let offset = validate_page(filter.page, filter.page_size)?;

        with_tx!(self, |db_tx| {
            let mut query = obligations::Entity::find();
            if let Some(contract_no) = normalize_optional_text(filter.contract_no.as_deref()) {
                query = query.filter(obligations::Column::ContractNo.eq(contract_no));
            }
            if let Some(driver_name) = normalize_optional_text(filter.driver_name.as_deref()) {
                query = query.filter(obligations::Column::DriverName.eq(driver_name));
            }
            if let Some(status) = filter.status {
                query = query.filter(obligations::Column::Status.eq(status.as_str()));
            }
            if let Some(condition) = keyword_condition(
                filter.keywords.as_deref(),
                &[
                    obligations::Column::ContractNo,
                    obligations::Column::DriverName,
                    obligations::Column::DriverPhone,
                    obligations::Column::VehicleNo,
                ],
            ) {
                query = query.filter(condition);
            }

            let total = query.clone().count(&db_tx).await?;
            let models = query
                .order_by_desc(obligations::Column::CreatedAt)
                .order_by_desc(obligations::Column::Seq)
                .offset(offset)
                .limit(filter.page_size)
                .all(&db_tx)
                .await?;

            let ids: Vec<String> = models.iter().map(|m| m.id.clone()).collect();
            let mut receipt_counts: HashMap<String, u64> = HashMap::new();
            if !ids.is_empty() {
                let links = settlement_links::Entity::find()
                    .filter(settlement_links::Column::ObligationId.is_in(ids))
                    .all(&db_tx)
                    .await?;
                for link in links {
                    *receipt_counts.entry(link.obligation_id).or_default() += 1;
                }
            }

            let mut items = Vec::with_capacity(models.len());
            for model in models {
                let receipt_count = receipt_counts.get(&model.id).copied().unwrap_or(0);
                let obligation = Obligation::try_from(model)?;
                items.push(ObligationRow {
                    balance: obligation.balance(),
                    status: obligation.status(),
                    obligation,
                    receipt_count,
                });
            }

            Ok(ObligationPage {
                items,
                total,
                page: filter.page,
                page_size: filter.page_size,
            })
        })
    }

    /// Recomputes `paid` from the obligation's settlement links and rewrites
    /// the stored balance and status.
    ///
    /// Fails with `InvalidAmount` when the links add up to more than the
    /// obligation is worth; that needs a manual correction of the links.
    pub async fn reconcile_obligation(
        &self,
        obligation_id: Uuid,
        now: DateTime<Utc>,
    ) -> ResultEngine<ReconcileOutcome> {
        with_tx!(self, |db_tx| {
            let model = obligations::Entity::find_by_id(obligation_id.to_string())
                .lock_exclusive()
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("obligation not exists".to_string()))?;
            let stored_balance = Money::new(model.balance_minor);
            let stored_status = model.status.clone();
            let mut obligation = Obligation::try_from(model)?;

            let linked: Money = settlement_links::Entity::find()
                .filter(settlement_links::Column::ObligationId.eq(obligation_id.to_string()))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|link| Money::new(link.settled_minor))
                .sum();
            if linked.is_negative() || linked > obligation.payable {
                return Err(EngineError::InvalidAmount(format!(
                    "links of obligation {obligation_id} add up to {linked}, payable is {}",
                    obligation.payable
                )));
            }

            let previous_paid = obligation.paid;
            obligation.paid = linked;
            let changed = previous_paid != linked
                || stored_balance != obligation.balance()
                || stored_status != obligation.status().as_str();
            if changed {
                write_obligation(&db_tx, &obligation, now).await?;
                info!(
                    %obligation_id,
                    previous_paid = %previous_paid,
                    paid = %linked,
                    "obligation reconciled"
                );
            }

            Ok(ReconcileOutcome {
                obligation_id,
                previous_paid,
                paid: obligation.paid,
                balance: obligation.balance(),
                status: obligation.status(),
                changed,
            })
        })
    }
}
