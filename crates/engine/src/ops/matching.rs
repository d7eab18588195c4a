use chrono::{DateTime, Duration, Utc};
use sea_orm::{QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*};
use tracing::debug;

use crate::{
    EngineError, Money, Obligation, ObligationStatus, ResultEngine, obligations,
    util::{contains_literal, normalize_required_name},
};

use super::{Engine, with_tx};

/// Most candidates a match returns.
const MAX_CANDIDATES: u64 = 10;

/// How far `payable` may be from the target amount and still match.
const AMOUNT_TOLERANCE: Money = Money::new(1);

/// Which obligations a receipt probably pays for.
#[derive(Clone, Debug)]
pub struct MatchQuery {
    /// Substring of the payee name.
    pub payee: String,
    pub amount: Money,
    pub lookback_days: u32,
    /// End of the lookback window.
    pub as_of: DateTime<Utc>,
}

impl MatchQuery {
    #[must_use]
    pub fn new(payee: impl Into<String>, amount: Money, as_of: DateTime<Utc>) -> Self {
        Self {
            payee: payee.into(),
            amount,
            lookback_days: 30,
            as_of,
        }
    }

    #[must_use]
    pub fn lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = days;
        self
    }
}

impl Engine {
    /// Finds outstanding obligations whose payable is within one cent of
    /// the target amount, created in the lookback window.
    ///
    /// Largest balance first, then oldest; at most ten.
    pub async fn find_candidate_matches(&self, query: &MatchQuery) -> ResultEngine<Vec<Obligation>> {
        let payee = normalize_required_name(&query.payee, "payee")?;
        if query.amount.is_negative() {
            return Err(EngineError::InvalidAmount(format!(
                "target amount must be >= 0, got {}",
                query.amount
            )));
        }
        let since = query.as_of - Duration::days(i64::from(query.lookback_days));
        let low = query.amount - AMOUNT_TOLERANCE;
        let high = query.amount + AMOUNT_TOLERANCE;

        with_tx!(self, |db_tx| {
            let models = obligations::Entity::find()
                .filter(contains_literal(&obligations::Column::DriverName, &payee))
                .filter(obligations::Column::Status.is_in([
                    ObligationStatus::Pending.as_str(),
                    ObligationStatus::Partial.as_str(),
                ]))
                .filter(obligations::Column::PayableMinor.between(low.minor(), high.minor()))
                .filter(obligations::Column::CreatedAt.gte(since))
                .order_by_desc(obligations::Column::BalanceMinor)
                .order_by_asc(obligations::Column::CreatedAt)
                .order_by_asc(obligations::Column::Seq)
                .limit(MAX_CANDIDATES)
                .all(&db_tx)
                .await?;
            debug!(%payee, target = %query.amount, found = models.len(), "candidate matches");
            models
                .into_iter()
                .map(Obligation::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }
}
