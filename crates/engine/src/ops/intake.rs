use sea_orm::{ActiveValue, TransactionTrait, prelude::*};
use tracing::info;
use uuid::Uuid;

use crate::{
    Delivery, EngineError, NewDeliveryCmd, NewWeighbillCmd, ResultEngine, Weighbill, deliveries,
    weighbills,
    util::{normalize_optional_text, normalize_required_name},
};

use super::{Engine, with_tx};

impl Engine {
    /// Registers a shipment batch and returns its id.
    pub async fn record_delivery(&self, cmd: NewDeliveryCmd) -> ResultEngine<Uuid> {
        let delivery = Delivery {
            id: Uuid::new_v4(),
            contract_no: normalize_optional_text(cmd.contract_no.as_deref()),
            driver_name: normalize_required_name(&cmd.driver_name, "driver")?,
            driver_phone: normalize_optional_text(cmd.driver_phone.as_deref()),
            vehicle_no: normalize_optional_text(cmd.vehicle_no.as_deref()),
            created_at: cmd.recorded_at,
        };

        with_tx!(self, |db_tx| {
            deliveries::ActiveModel::from(&delivery)
                .insert(&db_tx)
                .await?;
            info!(delivery_id = %delivery.id, driver = %delivery.driver_name, "delivery recorded");
            Ok(delivery.id)
        })
    }

    /// Registers an unconfirmed weighbill and returns its id.
    ///
    /// When the weighbill points at a delivery, missing contract and vehicle
    /// fields are taken from it.
    pub async fn record_weighbill(&self, cmd: NewWeighbillCmd) -> ResultEngine<Uuid> {
        if cmd.net_weight.is_negative() || cmd.net_weight.milli() == 0 {
            return Err(EngineError::InvalidWeight(format!(
                "net weight must be > 0, got {}",
                cmd.net_weight
            )));
        }
        if cmd.unit_price.is_negative() {
            return Err(EngineError::InvalidAmount(format!(
                "unit price must be >= 0, got {}",
                cmd.unit_price
            )));
        }

        with_tx!(self, |db_tx| {
            let mut contract_no = normalize_optional_text(cmd.contract_no.as_deref());
            let mut vehicle_no = normalize_optional_text(cmd.vehicle_no.as_deref());
            if let Some(delivery_id) = cmd.delivery_id {
                let delivery = self.require_delivery(&db_tx, delivery_id).await?;
                contract_no = contract_no.or(delivery.contract_no);
                vehicle_no = vehicle_no.or(delivery.vehicle_no);
            }

            let weighbill = Weighbill {
                id: Uuid::new_v4(),
                contract_no,
                delivery_id: cmd.delivery_id,
                vehicle_no,
                product_name: normalize_optional_text(cmd.product_name.as_deref()),
                net_weight: cmd.net_weight,
                unit_price: cmd.unit_price,
                weigh_date: cmd.weigh_date,
                confirmed: false,
                created_at: cmd.recorded_at,
            };
            weighbills::ActiveModel::from(&weighbill)
                .insert(&db_tx)
                .await?;
            info!(
                weighbill_id = %weighbill.id,
                net_weight = %weighbill.net_weight,
                unit_price = %weighbill.unit_price,
                "weighbill recorded"
            );
            Ok(weighbill.id)
        })
    }

    /// Marks a weighbill as reviewed so the obligation generator picks it
    /// up. Confirming twice is a no-op.
    pub async fn confirm_weighbill(&self, weighbill_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self.require_weighbill(&db_tx, weighbill_id).await?;
            if model.confirmed {
                return Ok(());
            }
            let mut active: weighbills::ActiveModel = model.into();
            active.confirmed = ActiveValue::Set(true);
            active.update(&db_tx).await?;
            info!(%weighbill_id, "weighbill confirmed");
            Ok(())
        })
    }

    /// Returns one weighbill.
    pub async fn weighbill(&self, weighbill_id: Uuid) -> ResultEngine<Weighbill> {
        with_tx!(self, |db_tx| {
            let model = self.require_weighbill(&db_tx, weighbill_id).await?;
            Weighbill::try_from(model)
        })
    }
}
