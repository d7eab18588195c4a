//! Shipment batches: who drove which truck for which contract.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: Uuid,
    pub contract_no: Option<String>,
    pub driver_name: String,
    pub driver_phone: Option<String>,
    pub vehicle_no: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "deliveries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub contract_no: Option<String>,
    pub driver_name: String,
    pub driver_phone: Option<String>,
    pub vehicle_no: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::weighbills::Entity")]
    Weighbills,
}

impl Related<super::weighbills::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Weighbills.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Delivery {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "delivery")?,
            contract_no: model.contract_no,
            driver_name: model.driver_name,
            driver_phone: model.driver_phone,
            vehicle_no: model.vehicle_no,
            created_at: model.created_at,
        })
    }
}

impl From<&Delivery> for ActiveModel {
    fn from(value: &Delivery) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            contract_no: ActiveValue::Set(value.contract_no.clone()),
            driver_name: ActiveValue::Set(value.driver_name.clone()),
            driver_phone: ActiveValue::Set(value.driver_phone.clone()),
            vehicle_no: ActiveValue::Set(value.vehicle_no.clone()),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}
