//! Provider analytics read model definition.

use std::collections::BTreeMap;

use common::{Money, YearMonth};
use tracing as log;

use crate::domain::{deal, provider, service_request, Deal, ServiceRequest};

/// Rollup of a provider's [`Deal`]s and [`ServiceRequest`]s.
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderAnalytics {
    /// Role the provider plays on [`Deal`]s.
    pub provider_kind: provider::Kind,

    /// Number of [`Deal`]s the provider is assigned to.
    pub total_deals: u32,

    /// Number of [`Deal`]s the provider is assigned to, which are not in a
    /// terminal [`deal::Stage`].
    pub active_deals: u32,

    /// Number of [`deal::Stage::Completed`] [`Deal`]s the provider is
    /// assigned to.
    pub completed_deals: u32,

    /// Number of [`ServiceRequest`]s addressed to the provider.
    pub total_requests: u32,

    /// Number of [`ServiceRequest`]s the provider accepted.
    pub accepted_requests: u32,

    /// Number of [`ServiceRequest`]s still waiting for the provider.
    pub pending_requests: u32,

    /// Share of [`ServiceRequest`]s the provider accepted among the ones
    /// left to the provider.
    ///
    /// [`ServiceRequest`]s decided by an admin assignment are not counted.
    /// Zero if there are no [`ServiceRequest`]s left to the provider.
    pub conversion_rate: f64,

    /// Mean time the provider takes to respond a [`ServiceRequest`].
    ///
    /// [`ServiceRequest`]s decided by an admin assignment are not counted.
    /// Zero if nothing was responded yet.
    pub avg_response_time_hours: f64,

    /// [`MonthlyTrend`]s in chronological order.
    ///
    /// Months without activity are absent.
    pub monthly_trends: Vec<MonthlyTrend>,

    /// Number of [`Deal`]s per [`deal::Stage`], in [`deal::Stage`] order.
    ///
    /// [`deal::Stage`]s without [`Deal`]s are absent.
    pub stage_breakdown: Vec<StageCount>,

    /// Sum of offered prices of completed [`Deal`]s, one per currency.
    pub revenue: Vec<Money>,
}

/// Activity of a provider during a calendar month.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MonthlyTrend {
    /// Calendar month.
    pub month: YearMonth,

    /// Number of [`Deal`]s created during the month.
    pub deals: u32,

    /// Number of [`ServiceRequest`]s received during the month.
    pub requests: u32,
}

impl MonthlyTrend {
    /// Creates a [`MonthlyTrend`] without any activity.
    fn idle(month: YearMonth) -> Self {
        Self {
            month,
            deals: 0,
            requests: 0,
        }
    }
}

/// Number of [`Deal`]s in a [`deal::Stage`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StageCount {
    /// [`deal::Stage`] the [`Deal`]s are in.
    pub stage: deal::Stage,

    /// Number of [`Deal`]s.
    pub count: u32,
}

impl ProviderAnalytics {
    /// Computes [`ProviderAnalytics`] out of the provider's [`Deal`]s and
    /// [`ServiceRequest`]s.
    #[must_use]
    pub fn compute(
        provider_kind: provider::Kind,
        deals: &[Deal],
        requests: &[ServiceRequest],
    ) -> Self {
        use service_request::Status;

        let count = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);

        let total_requests = count(requests.len());
        let accepted_requests = count(
            requests.iter().filter(|r| r.status == Status::Accepted).count(),
        );
        let pending_requests = count(
            requests.iter().filter(|r| r.status == Status::Pending).count(),
        );
        let (decided, converted) = requests
            .iter()
            .filter(|r| !r.overruled)
            .fold((0_u32, 0_u32), |(n, accepted), r| {
                (n + 1, accepted + u32::from(r.status == Status::Accepted))
            });
        let conversion_rate = if decided == 0 {
            0.0
        } else {
            f64::from(converted) / f64::from(decided)
        };

        let (responded, secs) = requests
            .iter()
            .filter_map(ServiceRequest::response_time)
            .fold((0_u32, 0.0), |(n, total), dur| {
                (n + 1, total + dur.as_seconds_f64())
            });
        let avg_response_time_hours = if responded == 0 {
            0.0
        } else {
            secs / f64::from(responded) / 3600.0
        };

        let mut months = BTreeMap::<YearMonth, MonthlyTrend>::new();
        for d in deals {
            let ym = d.created_at.year_month();
            months
                .entry(ym)
                .or_insert_with(|| MonthlyTrend::idle(ym))
                .deals += 1;
        }
        for r in requests {
            let ym = r.created_at.year_month();
            months
                .entry(ym)
                .or_insert_with(|| MonthlyTrend::idle(ym))
                .requests += 1;
        }

        let stage_breakdown = deal::Stage::ALL
            .iter()
            .filter_map(|&stage| {
                let n = deals.iter().filter(|d| d.stage() == stage).count();
                (n > 0).then(|| StageCount {
                    stage,
                    count: count(n),
                })
            })
            .collect();

        let completed = deals
            .iter()
            .filter(|d| d.stage() == deal::Stage::Completed)
            .collect::<Vec<_>>();

        Self {
            provider_kind,
            total_deals: count(deals.len()),
            active_deals: count(
                deals.iter().filter(|d| !d.stage().is_terminal()).count(),
            ),
            completed_deals: count(completed.len()),
            total_requests,
            accepted_requests,
            pending_requests,
            conversion_rate,
            avg_response_time_hours,
            monthly_trends: months.into_values().collect(),
            stage_breakdown,
            revenue: revenue(completed.iter().filter_map(|d| d.offer_price)),
        }
    }
}

/// Sums the provided prices per currency.
fn revenue(prices: impl IntoIterator<Item = Money>) -> Vec<Money> {
    let mut sums = BTreeMap::<u8, Money>::new();
    for price in prices {
        let currency = price.currency;
        if let Some(sum) = sums.get_mut(&currency.u8()) {
            if let Some(total) = sum.checked_add(price) {
                *sum = total;
            } else {
                log::warn!(
                    "revenue in `{currency}` overflows, skipping {price}",
                );
            }
        } else {
            _ = sums.insert(currency.u8(), price);
        }
    }
    sums.into_values().collect()
}

#[cfg(test)]
mod spec {
    use common::{money::Currency, Money};

    use crate::domain::{
        deal, property, provider,
        service_request::{Decision, Status},
        user, Deal, ServiceRequest,
    };

    use super::{ProviderAnalytics, StageCount};

    fn deal(provider_id: user::Id, offer: Option<&str>) -> Deal {
        let mut deal = Deal::new(
            property::Id::new(),
            user::Id::new(),
            offer.map(|o| o.parse::<Money>().unwrap()),
        );
        deal.assign(provider::Kind::Broker, provider_id).unwrap();
        deal
    }

    fn request(provider_id: user::Id) -> ServiceRequest {
        ServiceRequest::new(
            deal::Id::new(),
            user::Id::new(),
            provider_id,
            provider::Kind::Broker,
            None,
        )
    }

    #[test]
    fn guards_against_zero_requests() {
        let analytics =
            ProviderAnalytics::compute(provider::Kind::Lawyer, &[], &[]);

        assert_eq!(analytics.total_deals, 0);
        assert_eq!(analytics.total_requests, 0);
        assert!(analytics.conversion_rate.abs() < f64::EPSILON);
        assert!(analytics.avg_response_time_hours.abs() < f64::EPSILON);
        assert!(analytics.monthly_trends.is_empty());
        assert!(analytics.stage_breakdown.is_empty());
        assert!(analytics.revenue.is_empty());
    }

    #[test]
    fn computes_conversion_rate() {
        let provider_id = user::Id::new();
        let mut accepted = request(provider_id);
        accepted.respond(Decision::Accept, None).unwrap();
        let mut declined = request(provider_id);
        declined.respond(Decision::Decline, None).unwrap();
        let requests = [
            accepted,
            declined,
            request(provider_id),
            request(provider_id),
        ];

        let analytics = ProviderAnalytics::compute(
            provider::Kind::Broker,
            &[],
            &requests,
        );

        assert_eq!(analytics.total_requests, 4);
        assert_eq!(analytics.accepted_requests, 1);
        assert_eq!(analytics.pending_requests, 2);
        assert!((analytics.conversion_rate - 0.25).abs() < f64::EPSILON);
        assert!(analytics.avg_response_time_hours >= 0.0);
        assert_eq!(analytics.monthly_trends.len(), 1);
        assert_eq!(analytics.monthly_trends[0].requests, 4);
        assert_eq!(analytics.monthly_trends[0].deals, 0);
    }

    #[test]
    fn breaks_down_stages_and_revenue() {
        let provider_id = user::Id::new();
        let mut completed = [
            deal(provider_id, Some("100000USD")),
            deal(provider_id, Some("50000.5USD")),
            deal(provider_id, Some("70000EUR")),
        ];
        for d in &mut completed {
            for stage in [
                deal::Stage::BrokerAssigned,
                deal::Stage::Mortgage,
                deal::Stage::Legal,
                deal::Stage::Closing,
                deal::Stage::Completed,
            ] {
                _ = d.transition(stage, None).unwrap();
            }
        }
        let mut cancelled = deal(provider_id, Some("1GBP"));
        _ = cancelled.transition(deal::Stage::Cancelled, None).unwrap();
        let fresh = deal(provider_id, None);

        let mut deals = completed.to_vec();
        deals.extend([cancelled, fresh]);
        let analytics =
            ProviderAnalytics::compute(provider::Kind::Broker, &deals, &[]);

        assert_eq!(analytics.total_deals, 5);
        assert_eq!(analytics.active_deals, 1);
        assert_eq!(analytics.completed_deals, 3);
        assert_eq!(
            analytics.stage_breakdown,
            [
                StageCount {
                    stage: deal::Stage::Interest,
                    count: 1,
                },
                StageCount {
                    stage: deal::Stage::Completed,
                    count: 3,
                },
                StageCount {
                    stage: deal::Stage::Cancelled,
                    count: 1,
                },
            ],
        );
        assert_eq!(
            analytics
                .revenue
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            ["150000.5USD", "70000EUR"],
        );
        assert!(analytics.revenue.iter().all(|m| m.currency != Currency::Gbp));
    }

    #[test]
    fn ignores_overruled_requests_in_rates() {
        let provider_id = user::Id::new();
        let mut declined = request(provider_id);
        declined.respond(Decision::Decline, None).unwrap();
        let mut assigned = request(provider_id);
        assigned.overrule(Status::Accepted);
        let mut superseded = request(provider_id);
        superseded.overrule(Status::Declined);

        let analytics = ProviderAnalytics::compute(
            provider::Kind::Broker,
            &[],
            &[declined, assigned, superseded, request(provider_id)],
        );

        assert_eq!(analytics.total_requests, 4);
        assert_eq!(analytics.accepted_requests, 1);
        assert_eq!(analytics.pending_requests, 1);
        assert!(analytics.conversion_rate.abs() < f64::EPSILON);
        assert!(analytics.avg_response_time_hours >= 0.0);
        assert_eq!(analytics.monthly_trends[0].requests, 4);
    }

    #[test]
    fn converts_only_provider_decisions() {
        let provider_id = user::Id::new();
        let mut accepted = request(provider_id);
        accepted.respond(Decision::Accept, None).unwrap();
        let mut superseded = request(provider_id);
        superseded.overrule(Status::Declined);

        let analytics = ProviderAnalytics::compute(
            provider::Kind::Broker,
            &[],
            &[accepted, superseded],
        );

        assert!((analytics.conversion_rate - 1.0).abs() < f64::EPSILON);
    }
}
