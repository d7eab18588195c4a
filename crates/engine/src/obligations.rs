//! The module contains `Obligation` struct and its implementation.
//!
//! An obligation is the money owed to a driver/supplier for one confirmed
//! weighbill. Its `payable` is fixed at creation; only settlement moves
//! `paid`, and `balance`/`status` are always derived from the two.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ObligationStatus, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obligation {
    pub id: Uuid,
    pub weighbill_id: Uuid,
    pub contract_no: Option<String>,
    pub delivery_id: Option<Uuid>,
    /// Payee (driver/supplier) the money is owed to.
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
    pub vehicle_no: Option<String>,
    pub payable: Money,
    pub paid: Money,
    /// Optimistic concurrency token, bumped on every write.
    pub version: i64,
    /// Generation order. Increases with every generated obligation and
    /// breaks ties between obligations sharing a `created_at`.
    pub seq: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Obligation {
    /// Remaining amount owed: `payable - paid`.
    #[must_use]
    pub fn balance(&self) -> Money {
        self.payable - self.paid
    }

    #[must_use]
    pub fn status(&self) -> ObligationStatus {
        ObligationStatus::derive(self.payable, self.paid)
    }

    /// Replaces one receipt's share of this obligation.
    ///
    /// `current_share` is what the receipt already covers, `requested` the
    /// share the caller asks for. The new share is capped so that `paid`
    /// never exceeds `payable`, and `paid` moves by the difference between
    /// the old and the new share. Returns the share actually recorded.
    pub fn reshare(&mut self, current_share: Money, requested: Money) -> Money {
        let headroom = self.balance() + current_share;
        let share = requested.min(headroom).max(Money::ZERO);
        self.paid = self.paid - current_share + share;
        share
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "obligations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub weighbill_id: String,
    pub contract_no: Option<String>,
    pub delivery_id: Option<String>,
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
    pub vehicle_no: Option<String>,
    pub payable_minor: i64,
    pub paid_minor: i64,
    pub balance_minor: i64,
    pub status: String,
    pub version: i64,
    #[sea_orm(unique)]
    pub seq: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::weighbills::Entity",
        from = "Column::WeighbillId",
        to = "super::weighbills::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Weighbills,
    #[sea_orm(has_many = "super::settlement_links::Entity")]
    SettlementLinks,
}

impl Related<super::weighbills::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Weighbills.def()
    }
}

impl Related<super::settlement_links::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SettlementLinks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Obligation {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "obligation")?,
            weighbill_id: parse_uuid(&model.weighbill_id, "weighbill")?,
            contract_no: model.contract_no,
            delivery_id: model
                .delivery_id
                .as_deref()
                .map(|id| parse_uuid(id, "delivery"))
                .transpose()?,
            driver_name: model.driver_name,
            driver_phone: model.driver_phone,
            vehicle_no: model.vehicle_no,
            payable: Money::new(model.payable_minor),
            paid: Money::new(model.paid_minor),
            version: model.version,
            seq: model.seq,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl From<&Obligation> for ActiveModel {
    fn from(value: &Obligation) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            weighbill_id: ActiveValue::Set(value.weighbill_id.to_string()),
            contract_no: ActiveValue::Set(value.contract_no.clone()),
            delivery_id: ActiveValue::Set(value.delivery_id.map(|id| id.to_string())),
            driver_name: ActiveValue::Set(value.driver_name.clone()),
            driver_phone: ActiveValue::Set(value.driver_phone.clone()),
            vehicle_no: ActiveValue::Set(value.vehicle_no.clone()),
            payable_minor: ActiveValue::Set(value.payable.minor()),
            paid_minor: ActiveValue::Set(value.paid.minor()),
            balance_minor: ActiveValue::Set(value.balance().minor()),
            status: ActiveValue::Set(value.status().as_str().to_string()),
            version: ActiveValue::Set(value.version),
            seq: ActiveValue::Set(value.seq),
            created_at: ActiveValue::Set(value.created_at),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}
