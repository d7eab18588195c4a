//! Weighbridge tickets.
//!
//! A weighbill becomes payable once a human confirms the extracted fields;
//! the obligation generator only looks at confirmed tickets.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, Weight, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weighbill {
    pub id: Uuid,
    pub contract_no: Option<String>,
    /// Shipment batch the ticket belongs to, when one was matched.
    pub delivery_id: Option<Uuid>,
    pub vehicle_no: Option<String>,
    pub product_name: Option<String>,
    pub net_weight: Weight,
    /// Contract price per ton.
    pub unit_price: Money,
    pub weigh_date: Option<NaiveDate>,
    pub confirmed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "weighbills")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub contract_no: Option<String>,
    pub delivery_id: Option<String>,
    pub vehicle_no: Option<String>,
    pub product_name: Option<String>,
    pub net_weight_milli: i64,
    pub unit_price_minor: i64,
    pub weigh_date: Option<Date>,
    pub confirmed: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::deliveries::Entity",
        from = "Column::DeliveryId",
        to = "super::deliveries::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Deliveries,
    #[sea_orm(has_one = "super::obligations::Entity")]
    Obligations,
}

impl Related<super::deliveries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deliveries.def()
    }
}

impl Related<super::obligations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Obligations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Weighbill {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "weighbill")?,
            contract_no: model.contract_no,
            delivery_id: model
                .delivery_id
                .as_deref()
                .map(|id| parse_uuid(id, "delivery"))
                .transpose()?,
            vehicle_no: model.vehicle_no,
            product_name: model.product_name,
            net_weight: Weight::from_milli(model.net_weight_milli),
            unit_price: Money::new(model.unit_price_minor),
            weigh_date: model.weigh_date,
            confirmed: model.confirmed,
            created_at: model.created_at,
        })
    }
}

impl From<&Weighbill> for ActiveModel {
    fn from(value: &Weighbill) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            contract_no: ActiveValue::Set(value.contract_no.clone()),
            delivery_id: ActiveValue::Set(value.delivery_id.map(|id| id.to_string())),
            vehicle_no: ActiveValue::Set(value.vehicle_no.clone()),
            product_name: ActiveValue::Set(value.product_name.clone()),
            net_weight_milli: ActiveValue::Set(value.net_weight.milli()),
            unit_price_minor: ActiveValue::Set(value.unit_price.minor()),
            weigh_date: ActiveValue::Set(value.weigh_date),
            confirmed: ActiveValue::Set(value.confirmed),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}
