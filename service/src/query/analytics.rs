//! [`Query`] for provider analytics.

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    domain::{provider, user, Deal, ServiceRequest},
    infra::{database, Database},
    read, Query, Service,
};
#[cfg(doc)]
use crate::domain::User;

/// [`Query`] computing [`read::analytics::ProviderAnalytics`] of a provider
/// [`User`].
///
/// Yields [`None`] if the [`User`] holds no [`provider::Profile`].
#[derive(Clone, Copy, Debug)]
pub struct ProviderAnalytics {
    /// ID of the provider [`User`].
    pub provider_id: user::Id,
}

impl<Db> Query<ProviderAnalytics> for Service<Db>
where
    Db: Database<
            Select<By<Option<provider::Profile>, user::Id>>,
            Ok = Option<provider::Profile>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Deal>, read::deal::list::Filter>>,
            Ok = Vec<Deal>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<ServiceRequest>, read::service_request::list::Filter>>,
            Ok = Vec<ServiceRequest>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Option<read::analytics::ProviderAnalytics>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        ProviderAnalytics { provider_id }: ProviderAnalytics,
    ) -> Result<Self::Ok, Self::Err> {
        let Some(profile) = self
            .database()
            .execute(Select(By::<Option<provider::Profile>, _>::new(
                provider_id,
            )))
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };

        let deals = self
            .database()
            .execute(Select(By::<Vec<Deal>, _>::new(
                read::deal::list::Filter::Provider(provider_id),
            )))
            .await
            .map_err(tracerr::wrap!())?;
        let requests = self
            .database()
            .execute(Select(By::<Vec<ServiceRequest>, _>::new(
                read::service_request::list::Filter::Provider(provider_id),
            )))
            .await
            .map_err(tracerr::wrap!())?;

        Ok(Some(read::analytics::ProviderAnalytics::compute(
            profile.kind,
            &deals,
            &requests,
        )))
    }
}
