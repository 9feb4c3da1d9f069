//! Demo data seeding.

use common::{
    money::Currency,
    operations::{By, Insert, Select},
    Money,
};
use derive_more::{Display, Error as StdError, From};
use rust_decimal::Decimal;
use tracerr::Traced;
use tracing as log;
use uuid::Uuid;

use crate::{
    command::{
        assign_provider, create_deal, create_service_request,
        respond_to_service_request, transition_deal, AssignProvider,
        CreateDeal, CreateServiceRequest, RespondToServiceRequest,
        TransitionDeal,
    },
    domain::{
        deal, notification, property, provider,
        service_request::{self, Decision},
        user, Deal, Notification, Property, ServiceRequest, User,
    },
    infra::{database, Database},
    Command, Service,
};

/// Seeds the [`Database`] of the provided [`Service`] with demo [`User`]s,
/// [`Property`]s and [`Deal`]s in various [`deal::Stage`]s.
///
/// [`Deal`]s are driven through the regular [`Command`]s, so their
/// activities and notifications are produced as well.
///
/// A welcome [`Notification`] with a stable ID is stored last and marks the
/// demo data as complete: if it's there, nothing is done. A seeding
/// interrupted halfway is run again from the start, and the demo [`User`]s
/// and [`Property`]s are overwritten in place.
///
/// # Errors
///
/// If any of the demo [`Command`]s fails.
pub async fn seed<Db>(service: &Service<Db>) -> Result<(), Traced<Error>>
where
    Db: Database<
            Select<By<Option<Notification>, notification::Id>>,
            Ok = Option<Notification>,
            Err = Traced<database::Error>,
        > + Database<Insert<Notification>, Err = Traced<database::Error>>
        + Database<Insert<User>, Err = Traced<database::Error>>
        + Database<Insert<Property>, Err = Traced<database::Error>>
        + Database<Insert<provider::Profile>, Err = Traced<database::Error>>,
    Service<Db>: Command<
            CreateDeal,
            Ok = Deal,
            Err = Traced<create_deal::ExecutionError>,
        > + Command<
            CreateServiceRequest,
            Ok = ServiceRequest,
            Err = Traced<create_service_request::ExecutionError>,
        > + Command<
            RespondToServiceRequest,
            Ok = ServiceRequest,
            Err = Traced<respond_to_service_request::ExecutionError>,
        > + Command<
            TransitionDeal,
            Ok = Deal,
            Err = Traced<transition_deal::ExecutionError>,
        > + Command<
            AssignProvider,
            Ok = Deal,
            Err = Traced<assign_provider::ExecutionError>,
        >,
{
    use deal::Stage;
    use provider::Kind;
    use user::Role;

    let seeded = service
        .database()
        .execute(Select(By::<Option<Notification>, _>::new(welcome_id())))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> Error))?;
    if seeded.is_some() {
        log::info!("demo data is already seeded, skipping");
        return Ok(());
    }

    let users = [
        (Seed::Alice, "Alice Investor", Role::Investor),
        (Seed::Bob, "Bob Investor", Role::Investor),
        (Seed::Carol, "Carol Broker", Role::Provider),
        (Seed::Dan, "Dan Mortgage", Role::Provider),
        (Seed::Eve, "Eve Lawyer", Role::Provider),
        (Seed::Admin, "Platform Admin", Role::Admin),
    ];
    for (seed, name, role) in users {
        let user = User {
            id: id(seed),
            name: fixture(user::Name::new(name), name)?,
            role,
        };
        service
            .database()
            .execute(Insert(user))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> Error))
            .map(drop)?;
    }
    for (seed, kind) in [
        (Seed::Carol, Kind::Broker),
        (Seed::Dan, Kind::MortgageAdvisor),
        (Seed::Eve, Kind::Lawyer),
    ] {
        service
            .database()
            .execute(Insert(provider::Profile {
                user_id: id(seed),
                kind,
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> Error))
            .map(drop)?;
    }

    let mut properties = vec![];
    for (n, title, city, price) in [
        (1, "Sunny loft", "Lisbon", 450_000),
        (2, "Harbour villa", "Porto", 1_250_000),
    ] {
        let property = Property {
            id: Uuid::from_u128(0xbeef_0000_0000_0000_0000_0000_0000_0000 | n)
                .into(),
            title: fixture(property::Title::new(title), title)?,
            city: fixture(property::City::new(city), city)?,
            price: usd(price),
        };
        service
            .database()
            .execute(Insert(property.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> Error))
            .map(drop)?;
        properties.push(property);
    }
    let [loft, villa] = [&properties[0], &properties[1]];

    // Completed deal, walking every stage.
    let completed = service
        .execute(CreateDeal {
            property_id: loft.id,
            investor_id: id(Seed::Alice),
            offer_price: Some(usd(440_000)),
        })
        .await
        .map_err(tracerr::map_from_and_wrap!(=> Error))?;
    for (provider_id, kind) in [
        (id(Seed::Carol), Kind::Broker),
        (id(Seed::Dan), Kind::MortgageAdvisor),
    ] {
        let req = service
            .execute(CreateServiceRequest {
                deal_id: completed.id,
                investor_id: id(Seed::Alice),
                provider_id,
                provider_kind: kind,
                message: service_request::Message::new(
                    "Could you help with this one?",
                ),
            })
            .await
            .map_err(tracerr::map_from_and_wrap!(=> Error))?;
        _ = service
            .execute(RespondToServiceRequest {
                request_id: req.id,
                provider_id,
                decision: Decision::Accept,
                response: service_request::Message::new("Happy to help."),
            })
            .await
            .map_err(tracerr::map_from_and_wrap!(=> Error))?;
        if kind == Kind::Broker {
            transition(service, completed.id, Stage::BrokerAssigned).await?;
        }
    }
    transition(service, completed.id, Stage::Mortgage).await?;
    _ = service
        .execute(AssignProvider {
            deal_id: completed.id,
            kind: Kind::Lawyer,
            provider_id: id(Seed::Eve),
            actor_id: id(Seed::Admin),
        })
        .await
        .map_err(tracerr::map_from_and_wrap!(=> Error))?;
    for stage in [Stage::Legal, Stage::Closing, Stage::Completed] {
        transition(service, completed.id, stage).await?;
    }

    // Cancelled deal with a declined request.
    let cancelled = service
        .execute(CreateDeal {
            property_id: villa.id,
            investor_id: id(Seed::Bob),
            offer_price: Some(usd(1_100_000)),
        })
        .await
        .map_err(tracerr::map_from_and_wrap!(=> Error))?;
    let req = service
        .execute(CreateServiceRequest {
            deal_id: cancelled.id,
            investor_id: id(Seed::Bob),
            provider_id: id(Seed::Carol),
            provider_kind: Kind::Broker,
            message: None,
        })
        .await
        .map_err(tracerr::map_from_and_wrap!(=> Error))?;
    _ = service
        .execute(RespondToServiceRequest {
            request_id: req.id,
            provider_id: id(Seed::Carol),
            decision: Decision::Decline,
            response: service_request::Message::new("Fully booked, sorry."),
        })
        .await
        .map_err(tracerr::map_from_and_wrap!(=> Error))?;
    _ = service
        .execute(TransitionDeal {
            deal_id: cancelled.id,
            target: Stage::Cancelled,
            actor_id: id(Seed::Bob),
            note: deal::Note::new("Found another property"),
        })
        .await
        .map_err(tracerr::map_from_and_wrap!(=> Error))?;

    // Fresh deal waiting for a broker.
    let fresh = service
        .execute(CreateDeal {
            property_id: villa.id,
            investor_id: id(Seed::Alice),
            offer_price: None,
        })
        .await
        .map_err(tracerr::map_from_and_wrap!(=> Error))?;
    _ = service
        .execute(CreateServiceRequest {
            deal_id: fresh.id,
            investor_id: id(Seed::Alice),
            provider_id: id(Seed::Carol),
            provider_kind: Kind::Broker,
            message: None,
        })
        .await
        .map_err(tracerr::map_from_and_wrap!(=> Error))?;

    // The welcome `Notification` goes last, marking the seeding complete.
    for (kind, title, message, link, metadata) in [
        (
            notification::Kind::FileUploaded,
            "Documents uploaded",
            "The signed purchase agreement is ready for review.",
            Some(notification::Link::deal(completed.id)),
            notification::Metadata::deal(completed.id),
        ),
        (
            notification::Kind::NewMessage,
            "Welcome aboard",
            "Your demo deals are ready to explore.",
            None,
            notification::Metadata::default(),
        ),
    ] {
        let mut notification = Notification::new(
            id(Seed::Alice),
            kind,
            fixture(notification::Title::new(title), title)?,
            fixture(notification::Message::new(message), message)?,
            link,
            metadata,
        );
        if kind == notification::Kind::NewMessage {
            notification.id = welcome_id();
        }
        service
            .database()
            .execute(Insert(notification))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> Error))
            .map(drop)?;
    }

    log::info!("demo data seeded");

    Ok(())
}

/// Demo [`User`]s.
#[derive(Clone, Copy, Debug)]
enum Seed {
    Alice = 1,
    Bob,
    Carol,
    Dan,
    Eve,
    Admin,
}

/// Returns the [`user::Id`] of the demo admin [`User`].
#[must_use]
pub fn admin_id() -> user::Id {
    id(Seed::Admin)
}

/// Returns the [`user::Id`]s of all the demo [`User`]s.
#[must_use]
pub fn user_ids() -> [user::Id; 6] {
    [
        Seed::Alice,
        Seed::Bob,
        Seed::Carol,
        Seed::Dan,
        Seed::Eve,
        Seed::Admin,
    ]
    .map(id)
}

/// Returns the ID of the welcome [`Notification`] stored last.
fn welcome_id() -> notification::Id {
    Uuid::from_u128(0xdead_beef_0000_0000_0000_0000_0000_0001).into()
}

/// Returns the stable [`user::Id`] of the demo [`User`].
fn id(seed: Seed) -> user::Id {
    Uuid::from_u128(0xdead_0000_0000_0000_0000_0000_0000_0000 | seed as u128)
        .into()
}

/// Returns the provided amount of US dollars.
fn usd(amount: i64) -> Money {
    Money {
        amount: Decimal::from(amount),
        currency: Currency::Usd,
    }
}

/// Unwraps a demo value, failing with [`Error::InvalidFixture`] if it's not
/// valid.
fn fixture<T>(value: Option<T>, raw: &'static str) -> Result<T, Traced<Error>> {
    value.ok_or_else(|| tracerr::new!(Error::InvalidFixture(raw)))
}

/// Moves the demo [`Deal`] into the provided [`deal::Stage`] on behalf of
/// the demo admin.
async fn transition<Db>(
    service: &Service<Db>,
    deal_id: deal::Id,
    target: deal::Stage,
) -> Result<(), Traced<Error>>
where
    Service<Db>: Command<
        TransitionDeal,
        Ok = Deal,
        Err = Traced<transition_deal::ExecutionError>,
    >,
{
    service
        .execute(TransitionDeal {
            deal_id,
            target,
            actor_id: id(Seed::Admin),
            note: None,
        })
        .await
        .map_err(tracerr::map_from_and_wrap!(=> Error))
        .map(drop)
}

/// Error of demo data seeding.
#[derive(Debug, Display, StdError, From)]
pub enum Error {
    /// Assigning a provider failed.
    #[display("Failed to assign a provider: {_0}")]
    AssignProvider(assign_provider::ExecutionError),

    /// Creating a [`Deal`] failed.
    #[display("Failed to create a `Deal`: {_0}")]
    CreateDeal(create_deal::ExecutionError),

    /// Creating a [`ServiceRequest`] failed.
    #[display("Failed to create a `ServiceRequest`: {_0}")]
    CreateServiceRequest(create_service_request::ExecutionError),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Demo value doesn't pass validation.
    #[display("Invalid demo value: `{_0}`")]
    #[from(ignore)]
    InvalidFixture(#[error(not(source))] &'static str),

    /// Responding to a [`ServiceRequest`] failed.
    #[display("Failed to respond to a `ServiceRequest`: {_0}")]
    RespondToServiceRequest(respond_to_service_request::ExecutionError),

    /// Transitioning a [`Deal`] failed.
    #[display("Failed to transition a `Deal`: {_0}")]
    TransitionDeal(transition_deal::ExecutionError),
}
