//! Provider analytics definitions.

use common::{Money, YearMonth};
use juniper::{graphql_object, GraphQLObject};
use service::read;

use crate::{api, Context};

/// Converts the provided counter into a GraphQL `Int`, saturating.
fn int(n: u32) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// Performance summary of a provider.
#[derive(Clone, Debug, derive_more::From)]
pub struct ProviderAnalytics(read::analytics::ProviderAnalytics);

/// Performance summary of a provider `User`.
#[graphql_object(context = Context)]
impl ProviderAnalytics {
    /// Role the provider holds.
    #[must_use]
    pub fn provider_kind(&self) -> api::service_request::ProviderKind {
        self.0.provider_kind.into()
    }

    /// Number of `Deal`s the provider is assigned to.
    #[must_use]
    pub fn total_deals(&self) -> i32 {
        int(self.0.total_deals)
    }

    /// Number of non-finished `Deal`s the provider is assigned to.
    #[must_use]
    pub fn active_deals(&self) -> i32 {
        int(self.0.active_deals)
    }

    /// Number of completed `Deal`s the provider is assigned to.
    #[must_use]
    pub fn completed_deals(&self) -> i32 {
        int(self.0.completed_deals)
    }

    /// Number of `ServiceRequest`s the provider received.
    #[must_use]
    pub fn total_requests(&self) -> i32 {
        int(self.0.total_requests)
    }

    /// Number of `ServiceRequest`s the provider accepted.
    #[must_use]
    pub fn accepted_requests(&self) -> i32 {
        int(self.0.accepted_requests)
    }

    /// Number of `ServiceRequest`s still waiting for the provider.
    #[must_use]
    pub fn pending_requests(&self) -> i32 {
        int(self.0.pending_requests)
    }

    /// Share of `ServiceRequest`s the provider accepted among the ones left
    /// to the provider, ignoring those decided by admin assignments.
    #[must_use]
    pub fn conversion_rate(&self) -> f64 {
        self.0.conversion_rate
    }

    /// Mean time the provider takes to respond, in hours, ignoring
    /// `ServiceRequest`s decided by admin assignments.
    #[must_use]
    pub fn avg_response_time_hours(&self) -> f64 {
        self.0.avg_response_time_hours
    }

    /// Per-month activity, oldest month first.
    #[must_use]
    pub fn monthly_trends(&self) -> Vec<MonthlyTrend> {
        self.0
            .monthly_trends
            .iter()
            .map(|t| MonthlyTrend {
                month: t.month,
                deals: int(t.deals),
                requests: int(t.requests),
            })
            .collect()
    }

    /// Number of assigned `Deal`s per stage, omitting empty stages.
    #[must_use]
    pub fn stage_breakdown(&self) -> Vec<StageCount> {
        self.0
            .stage_breakdown
            .iter()
            .map(|s| StageCount {
                stage: s.stage.into(),
                count: int(s.count),
            })
            .collect()
    }

    /// Offer prices of the completed `Deal`s summed per currency.
    #[must_use]
    pub fn revenue(&self) -> Vec<Money> {
        self.0.revenue.clone()
    }
}

/// Activity of a provider within a calendar month.
#[derive(Clone, Copy, Debug, GraphQLObject)]
pub struct MonthlyTrend {
    /// Calendar month.
    pub month: YearMonth,

    /// Number of `Deal`s created within the month.
    pub deals: i32,

    /// Number of `ServiceRequest`s received within the month.
    pub requests: i32,
}

/// Number of `Deal`s in a stage.
#[derive(Clone, Copy, Debug, GraphQLObject)]
pub struct StageCount {
    /// Stage of the `Deal`s.
    pub stage: api::deal::Stage,

    /// Number of `Deal`s in the stage.
    pub count: i32,
}
