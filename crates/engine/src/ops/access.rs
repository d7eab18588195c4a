use sea_orm::{DatabaseTransaction, prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, deliveries, obligations, receipts, weighbills};

use super::Engine;

/// Generates a `require_*` lookup that maps a missing row to `KeyNotFound`.
macro_rules! impl_require_by_id {
    ($require_fn:ident, $entity:path, $model:path, $err_msg:literal) => {
        pub(super) async fn $require_fn(
            &self,
            db: &DatabaseTransaction,
            id: Uuid,
        ) -> ResultEngine<$model> {
            <$entity>::find_by_id(id.to_string())
                .one(db)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound($err_msg.to_string()))
        }
    };
}

impl Engine {
    impl_require_by_id!(
        require_delivery,
        deliveries::Entity,
        deliveries::Model,
        "delivery not exists"
    );

    impl_require_by_id!(
        require_weighbill,
        weighbills::Entity,
        weighbills::Model,
        "weighbill not exists"
    );

    impl_require_by_id!(
        require_obligation,
        obligations::Entity,
        obligations::Model,
        "obligation not exists"
    );

    impl_require_by_id!(
        require_receipt,
        receipts::Entity,
        receipts::Model,
        "receipt not exists"
    );
}
