//! The persisted extraction watermark.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::period::BillingPeriod;

/// Latest fully-processed timestamp for one (provider, year, month) key.
///
/// Once written, the stored timestamp is the inclusive upper bound of
/// everything already exported for that key. It is created lazily on the
/// first successful run, only ever moved forward by
/// [`WatermarkStore::advance`](crate::traits::WatermarkStore::advance),
/// and never deleted by this subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    pub provider_id: Uuid,
    pub period: BillingPeriod,
    pub latest_processed_time: DateTime<Utc>,
}

impl Watermark {
    pub fn new(
        provider_id: Uuid,
        period: BillingPeriod,
        latest_processed_time: DateTime<Utc>,
    ) -> Self {
        Self {
            provider_id,
            period,
            latest_processed_time,
        }
    }
}
