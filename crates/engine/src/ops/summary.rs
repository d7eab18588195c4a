use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use sea_orm::{QueryFilter, TransactionTrait, prelude::*};
use serde::Serialize;

use crate::{
    EngineError, Money, Obligation, ObligationStatus, ResultEngine, obligations,
    util::{keyword_condition, normalize_optional_text, validate_page},
};

use super::{Engine, with_tx};

/// Outstanding position of one payee, keyed by name and phone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PayeeSummary {
    pub payee_name: String,
    pub driver_phone: Option<String>,
    pub bill_count: u64,
    pub total_payable: Money,
    pub total_paid: Money,
    pub total_balance: Money,
    pub contracts: Vec<String>,
    pub vehicles: Vec<String>,
    pub first_bill_at: DateTime<Utc>,
    pub last_bill_at: DateTime<Utc>,
    pub pending_count: u64,
    pub partial_count: u64,
}

impl PayeeSummary {
    fn start(name: String, phone: Option<String>, first: &Obligation) -> Self {
        Self {
            payee_name: name,
            driver_phone: phone,
            bill_count: 0,
            total_payable: Money::ZERO,
            total_paid: Money::ZERO,
            total_balance: Money::ZERO,
            contracts: Vec::new(),
            vehicles: Vec::new(),
            first_bill_at: first.created_at,
            last_bill_at: first.created_at,
            pending_count: 0,
            partial_count: 0,
        }
    }

    fn add(&mut self, obligation: &Obligation) {
        self.bill_count += 1;
        self.total_payable += obligation.payable;
        self.total_paid += obligation.paid;
        self.total_balance += obligation.balance();
        self.first_bill_at = self.first_bill_at.min(obligation.created_at);
        self.last_bill_at = self.last_bill_at.max(obligation.created_at);
        match obligation.status() {
            ObligationStatus::Pending => self.pending_count += 1,
            ObligationStatus::Partial => self.partial_count += 1,
            ObligationStatus::Settled => {}
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PayeeSummaryPage {
    pub items: Vec<PayeeSummary>,
    /// Payees passing the filter, across all pages.
    pub total_payees: u64,
    /// Outstanding balance of those payees, across all pages.
    pub total_balance: Money,
    pub page: u64,
    pub page_size: u64,
}

/// Filters for [`Engine::payee_summaries`].
#[derive(Clone, Debug)]
pub struct PayeeSummaryFilter {
    /// Exact payee name.
    pub payee_name: Option<String>,
    /// Exact phone.
    pub driver_phone: Option<String>,
    /// Matched against payee, phone, contract and vehicle.
    pub keywords: Option<String>,
    /// Payees owed less than this are left out.
    pub min_balance: Money,
    /// Only count obligations in this status.
    pub status: Option<ObligationStatus>,
    pub page: u64,
    pub page_size: u64,
}

impl Default for PayeeSummaryFilter {
    fn default() -> Self {
        Self {
            payee_name: None,
            driver_phone: None,
            keywords: None,
            min_balance: Money::new(1),
            status: None,
            page: 1,
            page_size: 20,
        }
    }
}

impl Engine {
    /// Groups obligations by payee and reports what each one is owed,
    /// largest balance first.
    pub async fn payee_summaries(
        &self,
        filter: &PayeeSummaryFilter,
    ) -> ResultEngine<PayeeSummaryPage> {
        let offset = validate_page(filter.page, filter.page_size)?;

        let models: Vec<obligations::Model> = with_tx!(self, |db_tx| {
            let mut query =
                obligations::Entity::find().filter(obligations::Column::DriverName.is_not_null());
            if let Some(name) = normalize_optional_text(filter.payee_name.as_deref()) {
                query = query.filter(obligations::Column::DriverName.eq(name));
            }
            if let Some(phone) = normalize_optional_text(filter.driver_phone.as_deref()) {
                query = query.filter(obligations::Column::DriverPhone.eq(phone));
            }
            if let Some(status) = filter.status {
                query = query.filter(obligations::Column::Status.eq(status.as_str()));
            }
            if let Some(condition) = keyword_condition(
                filter.keywords.as_deref(),
                &[
                    obligations::Column::DriverName,
                    obligations::Column::DriverPhone,
                    obligations::Column::ContractNo,
                    obligations::Column::VehicleNo,
                ],
            ) {
                query = query.filter(condition);
            }
            let models = query.all(&db_tx).await?;
            Ok::<_, EngineError>(models)
        })?;

        let mut groups: BTreeMap<(String, Option<String>), PayeeSummary> = BTreeMap::new();
        let mut contracts: BTreeMap<(String, Option<String>), BTreeSet<String>> = BTreeMap::new();
        let mut vehicles: BTreeMap<(String, Option<String>), BTreeSet<String>> = BTreeMap::new();
        for model in models {
            let obligation = Obligation::try_from(model)?;
            let Some(name) = obligation.driver_name.clone() else {
                continue;
            };
            let key = (name, obligation.driver_phone.clone());
            groups
                .entry(key.clone())
                .or_insert_with(|| PayeeSummary::start(key.0.clone(), key.1.clone(), &obligation))
                .add(&obligation);
            if let Some(contract) = &obligation.contract_no {
                contracts
                    .entry(key.clone())
                    .or_default()
                    .insert(contract.clone());
            }
            if let Some(vehicle) = &obligation.vehicle_no {
                vehicles.entry(key).or_default().insert(vehicle.clone());
            }
        }

        let mut summaries: Vec<PayeeSummary> = groups
            .into_iter()
            .filter(|(_, summary)| summary.total_balance >= filter.min_balance)
            .map(|(key, mut summary)| {
                summary.contracts = contracts.remove(&key).unwrap_or_default().into_iter().collect();
                summary.vehicles = vehicles.remove(&key).unwrap_or_default().into_iter().collect();
                summary
            })
            .collect();
        summaries.sort_by(|a, b| {
            b.total_balance
                .cmp(&a.total_balance)
                .then_with(|| a.payee_name.cmp(&b.payee_name))
                .then_with(|| a.driver_phone.cmp(&b.driver_phone))
        });

        let total_payees = summaries.len() as u64;
        let total_balance: Money = summaries.iter().map(|s| s.total_balance).sum();
        let items = summaries
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(filter.page_size).unwrap_or(usize::MAX))
            .collect();

        Ok(PayeeSummaryPage {
            items,
            total_payees,
            total_balance,
            page: filter.page,
            page_size: filter.page_size,
        })
    }
}
