//! Command structs for engine operations.
//!
//! These types group parameters for write operations (intake, generation,
//! settlement), keeping call sites readable and avoiding long argument
//! lists.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Money, Weight};

/// Register a shipment batch (driver + vehicle).
#[derive(Clone, Debug)]
pub struct NewDeliveryCmd {
    pub driver_name: String,
    pub driver_phone: Option<String>,
    pub vehicle_no: Option<String>,
    pub contract_no: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl NewDeliveryCmd {
    #[must_use]
    pub fn new(driver_name: impl Into<String>, recorded_at: DateTime<Utc>) -> Self {
        Self {
            driver_name: driver_name.into(),
            driver_phone: None,
            vehicle_no: None,
            contract_no: None,
            recorded_at,
        }
    }

    #[must_use]
    pub fn driver_phone(mut self, phone: impl Into<String>) -> Self {
        self.driver_phone = Some(phone.into());
        self
    }

    #[must_use]
    pub fn vehicle_no(mut self, vehicle_no: impl Into<String>) -> Self {
        self.vehicle_no = Some(vehicle_no.into());
        self
    }

    #[must_use]
    pub fn contract_no(mut self, contract_no: impl Into<String>) -> Self {
        self.contract_no = Some(contract_no.into());
        self
    }
}

/// Register a weighbridge ticket (unconfirmed).
#[derive(Clone, Debug)]
pub struct NewWeighbillCmd {
    pub net_weight: Weight,
    pub unit_price: Money,
    pub contract_no: Option<String>,
    pub delivery_id: Option<Uuid>,
    pub vehicle_no: Option<String>,
    pub product_name: Option<String>,
    pub weigh_date: Option<NaiveDate>,
    pub recorded_at: DateTime<Utc>,
}

impl NewWeighbillCmd {
    #[must_use]
    pub fn new(net_weight: Weight, unit_price: Money, recorded_at: DateTime<Utc>) -> Self {
        Self {
            net_weight,
            unit_price,
            contract_no: None,
            delivery_id: None,
            vehicle_no: None,
            product_name: None,
            weigh_date: None,
            recorded_at,
        }
    }

    #[must_use]
    pub fn contract_no(mut self, contract_no: impl Into<String>) -> Self {
        self.contract_no = Some(contract_no.into());
        self
    }

    #[must_use]
    pub fn delivery_id(mut self, delivery_id: Uuid) -> Self {
        self.delivery_id = Some(delivery_id);
        self
    }

    #[must_use]
    pub fn vehicle_no(mut self, vehicle_no: impl Into<String>) -> Self {
        self.vehicle_no = Some(vehicle_no.into());
        self
    }

    #[must_use]
    pub fn product_name(mut self, product_name: impl Into<String>) -> Self {
        self.product_name = Some(product_name.into());
        self
    }

    #[must_use]
    pub fn weigh_date(mut self, weigh_date: NaiveDate) -> Self {
        self.weigh_date = Some(weigh_date);
        self
    }
}

/// Which confirmed weighbills to turn into obligations.
///
/// Filters combine with AND; with none set every confirmed weighbill
/// without an obligation is picked up.
#[derive(Clone, Debug)]
pub struct GenerateObligationsCmd {
    pub contract_no: Option<String>,
    pub delivery_id: Option<Uuid>,
    pub weighbill_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl GenerateObligationsCmd {
    #[must_use]
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            contract_no: None,
            delivery_id: None,
            weighbill_id: None,
            created_at,
        }
    }

    #[must_use]
    pub fn contract_no(mut self, contract_no: impl Into<String>) -> Self {
        self.contract_no = Some(contract_no.into());
        self
    }

    #[must_use]
    pub fn delivery_id(mut self, delivery_id: Uuid) -> Self {
        self.delivery_id = Some(delivery_id);
        self
    }

    #[must_use]
    pub fn weighbill_id(mut self, weighbill_id: Uuid) -> Self {
        self.weighbill_id = Some(weighbill_id);
        self
    }
}

/// Record an incoming payment receipt.
///
/// `total` defaults to `amount + fee` when not supplied.
#[derive(Clone, Debug)]
pub struct RecordReceiptCmd {
    pub payee_name: String,
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub fee: Money,
    pub total: Option<Money>,
    pub payment_time: Option<NaiveTime>,
    pub receipt_no: Option<String>,
    pub payer_name: Option<String>,
    pub payer_account: Option<String>,
    pub payer_bank: Option<String>,
    pub payee_account: Option<String>,
    pub payee_bank: Option<String>,
    pub remark: Option<String>,
    /// Typed in by an operator rather than extracted from a scan.
    pub is_manual: bool,
    pub recorded_at: DateTime<Utc>,
}

impl RecordReceiptCmd {
    #[must_use]
    pub fn new(
        payee_name: impl Into<String>,
        amount: Money,
        payment_date: NaiveDate,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            payee_name: payee_name.into(),
            amount,
            payment_date,
            fee: Money::ZERO,
            total: None,
            payment_time: None,
            receipt_no: None,
            payer_name: None,
            payer_account: None,
            payer_bank: None,
            payee_account: None,
            payee_bank: None,
            remark: None,
            is_manual: false,
            recorded_at,
        }
    }

    #[must_use]
    pub fn manual(mut self, is_manual: bool) -> Self {
        self.is_manual = is_manual;
        self
    }

    #[must_use]
    pub fn fee(mut self, fee: Money) -> Self {
        self.fee = fee;
        self
    }

    #[must_use]
    pub fn total(mut self, total: Money) -> Self {
        self.total = Some(total);
        self
    }

    #[must_use]
    pub fn payment_time(mut self, payment_time: NaiveTime) -> Self {
        self.payment_time = Some(payment_time);
        self
    }

    #[must_use]
    pub fn receipt_no(mut self, receipt_no: impl Into<String>) -> Self {
        self.receipt_no = Some(receipt_no.into());
        self
    }

    #[must_use]
    pub fn payer(
        mut self,
        name: impl Into<String>,
        account: Option<String>,
        bank: Option<String>,
    ) -> Self {
        self.payer_name = Some(name.into());
        self.payer_account = account;
        self.payer_bank = bank;
        self
    }

    #[must_use]
    pub fn payee_account(mut self, account: Option<String>, bank: Option<String>) -> Self {
        self.payee_account = account;
        self.payee_bank = bank;
        self
    }

    #[must_use]
    pub fn remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = Some(remark.into());
        self
    }
}

/// One `(obligation, amount)` pair of an explicit settlement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementItem {
    pub obligation_id: Uuid,
    pub amount: Money,
}

impl SettlementItem {
    #[must_use]
    pub fn new(obligation_id: Uuid, amount: Money) -> Self {
        Self {
            obligation_id,
            amount,
        }
    }
}

/// Apply a receipt to caller-chosen obligations, in the given order.
#[derive(Clone, Debug)]
pub struct SettleExplicitCmd {
    pub receipt_id: Uuid,
    pub items: Vec<SettlementItem>,
    pub settled_at: DateTime<Utc>,
}

impl SettleExplicitCmd {
    #[must_use]
    pub fn new(receipt_id: Uuid, settled_at: DateTime<Utc>) -> Self {
        Self {
            receipt_id,
            items: Vec::new(),
            settled_at,
        }
    }

    #[must_use]
    pub fn item(mut self, obligation_id: Uuid, amount: Money) -> Self {
        self.items.push(SettlementItem::new(obligation_id, amount));
        self
    }

    #[must_use]
    pub fn items(mut self, items: impl IntoIterator<Item = SettlementItem>) -> Self {
        self.items.extend(items);
        self
    }
}

/// Spread a receipt over a payee's outstanding obligations, oldest first.
#[derive(Clone, Debug)]
pub struct SettleByPayeeCmd {
    /// Exact payee (driver) name.
    pub payee_name: String,
    pub receipt_id: Uuid,
    /// Disambiguates same-named payees.
    pub driver_phone: Option<String>,
    pub settled_at: DateTime<Utc>,
}

impl SettleByPayeeCmd {
    #[must_use]
    pub fn new(
        payee_name: impl Into<String>,
        receipt_id: Uuid,
        settled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            payee_name: payee_name.into(),
            receipt_id,
            driver_phone: None,
            settled_at,
        }
    }

    #[must_use]
    pub fn driver_phone(mut self, phone: impl Into<String>) -> Self {
        self.driver_phone = Some(phone.into());
        self
    }
}
