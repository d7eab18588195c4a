//! Payment receipts (bank transfer slips).
//!
//! A receipt records money that went out to a payee. It is created
//! independently of the obligations it will pay; only settlement links the
//! two.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ReceiptStatus, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: Uuid,
    /// Bank serial number printed on the slip.
    pub receipt_no: Option<String>,
    pub payment_date: NaiveDate,
    pub payment_time: Option<NaiveTime>,
    pub payer_name: Option<String>,
    pub payer_account: Option<String>,
    pub payer_bank: Option<String>,
    pub payee_name: String,
    pub payee_account: Option<String>,
    pub payee_bank: Option<String>,
    /// Face value of the transfer; this is what settlement consumes.
    pub amount: Money,
    pub fee: Money,
    pub total: Money,
    pub remark: Option<String>,
    pub status: ReceiptStatus,
    pub is_manual: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "receipts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub receipt_no: Option<String>,
    pub payment_date: Date,
    pub payment_time: Option<Time>,
    pub payer_name: Option<String>,
    pub payer_account: Option<String>,
    pub payer_bank: Option<String>,
    pub payee_name: String,
    pub payee_account: Option<String>,
    pub payee_bank: Option<String>,
    pub amount_minor: i64,
    pub fee_minor: i64,
    pub total_minor: i64,
    pub remark: Option<String>,
    pub status: String,
    pub is_manual: bool,
    pub version: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::settlement_links::Entity")]
    SettlementLinks,
}

impl Related<super::settlement_links::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SettlementLinks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Receipt {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "receipt")?,
            receipt_no: model.receipt_no,
            payment_date: model.payment_date,
            payment_time: model.payment_time,
            payer_name: model.payer_name,
            payer_account: model.payer_account,
            payer_bank: model.payer_bank,
            payee_name: model.payee_name,
            payee_account: model.payee_account,
            payee_bank: model.payee_bank,
            amount: Money::new(model.amount_minor),
            fee: Money::new(model.fee_minor),
            total: Money::new(model.total_minor),
            remark: model.remark,
            status: ReceiptStatus::try_from(model.status.as_str())?,
            is_manual: model.is_manual,
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl From<&Receipt> for ActiveModel {
    fn from(value: &Receipt) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            receipt_no: ActiveValue::Set(value.receipt_no.clone()),
            payment_date: ActiveValue::Set(value.payment_date),
            payment_time: ActiveValue::Set(value.payment_time),
            payer_name: ActiveValue::Set(value.payer_name.clone()),
            payer_account: ActiveValue::Set(value.payer_account.clone()),
            payer_bank: ActiveValue::Set(value.payer_bank.clone()),
            payee_name: ActiveValue::Set(value.payee_name.clone()),
            payee_account: ActiveValue::Set(value.payee_account.clone()),
            payee_bank: ActiveValue::Set(value.payee_bank.clone()),
            amount_minor: ActiveValue::Set(value.amount.minor()),
            fee_minor: ActiveValue::Set(value.fee.minor()),
            total_minor: ActiveValue::Set(value.total.minor()),
            remark: ActiveValue::Set(value.remark.clone()),
            status: ActiveValue::Set(value.status.as_str().to_string()),
            is_manual: ActiveValue::Set(value.is_manual),
            version: ActiveValue::Set(value.version),
            created_at: ActiveValue::Set(value.created_at),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}
