//! [`Deal`] definitions.

use common::{define_kind, unit, DateTime, DateTimeOf, Money};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use tracing as log;
use uuid::Uuid;

use crate::domain::{property, provider, user};
#[cfg(doc)]
use crate::domain::{Property, User};

/// Property transaction tracked from an investor's interest till its
/// completion or cancellation.
#[derive(Clone, Debug)]
pub struct Deal {
    /// ID of this [`Deal`].
    pub id: Id,

    /// ID of the [`Property`] this [`Deal`] is made upon.
    pub property_id: property::Id,

    /// ID of the investing [`User`] owning this [`Deal`].
    pub investor_id: user::Id,

    /// ID of the assigned broker, if any.
    pub broker_id: Option<user::Id>,

    /// ID of the assigned mortgage advisor, if any.
    pub mortgage_advisor_id: Option<user::Id>,

    /// ID of the assigned lawyer, if any.
    pub lawyer_id: Option<user::Id>,

    /// Price offered by the investor, if any.
    pub offer_price: Option<Money>,

    /// [`History`] of [`Stage`]s this [`Deal`] went through.
    pub history: History,

    /// [`DateTime`] when this [`Deal`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Deal`] was modified last time.
    pub updated_at: ModificationDateTime,
}

impl Deal {
    /// Creates a new [`Deal`] in the [`Stage::Interest`].
    #[must_use]
    pub fn new(
        property_id: property::Id,
        investor_id: user::Id,
        offer_price: Option<Money>,
    ) -> Self {
        let now = DateTime::now();
        Self {
            id: Id::new(),
            property_id,
            investor_id,
            broker_id: None,
            mortgage_advisor_id: None,
            lawyer_id: None,
            offer_price,
            history: History(vec![Entry {
                stage: Stage::Interest,
                at: now.coerce(),
                note: None,
            }]),
            created_at: now.coerce(),
            updated_at: now.coerce(),
        }
    }

    /// Returns the current [`Stage`] of this [`Deal`].
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.history.current().stage
    }

    /// Returns ID of the provider assigned to the provided role, if any.
    #[must_use]
    pub fn assignment(&self, kind: provider::Kind) -> Option<user::Id> {
        match kind {
            provider::Kind::Broker => self.broker_id,
            provider::Kind::MortgageAdvisor => self.mortgage_advisor_id,
            provider::Kind::Lawyer => self.lawyer_id,
        }
    }

    /// Returns all the assigned providers along with their roles.
    pub fn assignments(
        &self,
    ) -> impl Iterator<Item = (provider::Kind, user::Id)> + '_ {
        provider::Kind::ALL
            .iter()
            .filter_map(move |&kind| Some((kind, self.assignment(kind)?)))
    }

    /// Returns IDs of every [`User`] taking part in this [`Deal`]: the
    /// investor first, then the assigned providers.
    pub fn participants(&self) -> impl Iterator<Item = user::Id> + '_ {
        std::iter::once(self.investor_id)
            .chain(self.assignments().map(|(_, id)| id))
    }

    /// Indicates whether the provided [`User`] takes part in this [`Deal`].
    #[must_use]
    pub fn is_participant(&self, user_id: user::Id) -> bool {
        self.participants().any(|id| id == user_id)
    }

    /// Assigns the provider to the provided role.
    ///
    /// # Errors
    ///
    /// With the currently assigned provider's ID, if the role is taken
    /// already. Assignments are never replaced.
    pub fn assign(
        &mut self,
        kind: provider::Kind,
        provider_id: user::Id,
    ) -> Result<(), user::Id> {
        let slot = match kind {
            provider::Kind::Broker => &mut self.broker_id,
            provider::Kind::MortgageAdvisor => &mut self.mortgage_advisor_id,
            provider::Kind::Lawyer => &mut self.lawyer_id,
        };
        if let Some(assigned) = *slot {
            return Err(assigned);
        }
        *slot = Some(provider_id);
        self.updated_at = DateTime::now().coerce();
        Ok(())
    }

    /// Moves this [`Deal`] to the `target` [`Stage`], returning the [`Stage`]
    /// it was moved from.
    ///
    /// Only the next [`Stage`] in order or [`Stage::Cancelled`] is reachable,
    /// and only from a non-terminal [`Stage`].
    ///
    /// # Errors
    ///
    /// See [`TransitionError`] for details.
    pub fn transition(
        &mut self,
        target: Stage,
        note: Option<Note>,
    ) -> Result<Stage, TransitionError> {
        self.transition_at(target, note, DateTime::now())
    }

    /// Same as [`Deal::transition()`], but at the provided moment.
    ///
    /// # Errors
    ///
    /// See [`TransitionError`] for details.
    pub fn transition_at(
        &mut self,
        target: Stage,
        note: Option<Note>,
        at: DateTime,
    ) -> Result<Stage, TransitionError> {
        use TransitionError as E;

        let current = self.stage();
        if current.is_terminal() {
            return Err(E::Terminal { current });
        }
        if target != Stage::Cancelled && current.next() != Some(target) {
            return Err(E::Unreachable { current, target });
        }
        if let Some(kind) = target.required_assignment() {
            if self.assignment(kind).is_none() {
                return Err(E::AssignmentRequired { kind, target });
            }
        }

        self.history.push(Entry {
            stage: target,
            at: at.coerce(),
            note,
        })?;
        self.updated_at = at.coerce();

        Ok(current)
    }
}

/// ID of a [`Deal`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

define_kind! {
    /// Phase of a [`Deal`] in its lifecycle.
    ///
    /// Non-terminal stages follow each other in declaration order.
    enum Stage {
        /// Investor expressed interest in a [`Property`].
        Interest = 1,

        /// Broker is engaged.
        BrokerAssigned = 2,

        /// Mortgage is being arranged.
        Mortgage = 3,

        /// Legal review is in progress.
        Legal = 4,

        /// Deal is being closed.
        Closing = 5,

        /// Deal is completed.
        Completed = 6,

        /// Deal is abandoned.
        Cancelled = 7,
    }
}

impl Stage {
    /// Indicates whether no transition is possible out of this [`Stage`].
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Returns the [`Stage`] following this one in the forward order.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        Some(match self {
            Self::Interest => Self::BrokerAssigned,
            Self::BrokerAssigned => Self::Mortgage,
            Self::Mortgage => Self::Legal,
            Self::Legal => Self::Closing,
            Self::Closing => Self::Completed,
            Self::Completed | Self::Cancelled => return None,
        })
    }

    /// Returns the provider role which must be assigned before entering this
    /// [`Stage`], if any.
    #[must_use]
    pub const fn required_assignment(self) -> Option<provider::Kind> {
        match self {
            Self::BrokerAssigned => Some(provider::Kind::Broker),
            Self::Interest
            | Self::Mortgage
            | Self::Legal
            | Self::Closing
            | Self::Completed
            | Self::Cancelled => None,
        }
    }

    /// Returns the human-readable name of this [`Stage`].
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Interest => "Interest",
            Self::BrokerAssigned => "Broker assigned",
            Self::Mortgage => "Mortgage",
            Self::Legal => "Legal review",
            Self::Closing => "Closing",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }
}

/// Append-only sequence of [`Stage`]s a [`Deal`] went through.
///
/// Never empty. Its last [`Entry`] is the current [`Stage`] of the [`Deal`],
/// and its moments never decrease.
#[derive(Clone, Debug)]
pub struct History(Vec<Entry>);

impl History {
    /// Restores a [`History`] from the provided `entries`.
    ///
    /// [`None`] is returned if the `entries` are empty, don't start with
    /// [`Stage::Interest`], go backwards in time or don't follow the
    /// [`Stage`] order.
    #[must_use]
    pub fn new(entries: Vec<Entry>) -> Option<Self> {
        let first = entries.first()?;
        if first.stage != Stage::Interest {
            return None;
        }
        let valid = entries.windows(2).all(|pair| {
            let (prev, next) = (&pair[0], &pair[1]);
            prev.at <= next.at
                && !prev.stage.is_terminal()
                && (next.stage == Stage::Cancelled
                    || prev.stage.next() == Some(next.stage))
        });
        valid.then_some(Self(entries))
    }

    /// Returns the latest [`Entry`].
    #[must_use]
    pub fn current(&self) -> &Entry {
        // Never empty by construction.
        &self.0[self.0.len() - 1]
    }

    /// Returns all the [`Entry`]s in chronological order.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.0
    }

    /// Appends the provided [`Entry`].
    fn push(&mut self, entry: Entry) -> Result<(), TransitionError> {
        let last = self.current().at;
        if entry.at < last {
            log::error!(
                "`Entry(stage: {}, at: {})` precedes the last one at {last}",
                entry.stage,
                entry.at,
            );
            if cfg!(debug_assertions) {
                panic!("stage history must not go back in time");
            }
            return Err(TransitionError::OutOfOrder {
                at: entry.at.coerce(),
                last: last.coerce(),
            });
        }
        self.0.push(entry);
        Ok(())
    }
}

/// Single record of a [`History`].
#[derive(Clone, Debug)]
pub struct Entry {
    /// [`Stage`] the [`Deal`] entered.
    pub stage: Stage,

    /// [`DateTime`] when the [`Stage`] was entered.
    pub at: TransitionDateTime,

    /// Optional [`Note`] left by the actor.
    pub note: Option<Note>,
}

/// Note attached to a [`Deal`] transition.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Note(String);

impl Note {
    /// Creates a new [`Note`] if the given `text` is valid.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        let trimmed = text.trim();
        (!trimmed.is_empty() && trimmed.chars().count() <= 1024)
            .then(|| Self(trimmed.to_owned()))
    }
}

impl FromStr for Note {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Note`")
    }
}

/// Error of a [`Deal`] transition.
#[derive(Clone, Copy, Debug, Display, Error)]
pub enum TransitionError {
    /// Current [`Stage`] is terminal.
    #[display("`{current}` stage is terminal")]
    Terminal {
        /// Current [`Stage`] of the [`Deal`].
        current: Stage,
    },

    /// Target [`Stage`] is not the next one, nor [`Stage::Cancelled`].
    #[display("`{target}` stage is not reachable from `{current}` stage")]
    Unreachable {
        /// Current [`Stage`] of the [`Deal`].
        current: Stage,

        /// Requested [`Stage`].
        target: Stage,
    },

    /// Target [`Stage`] requires a provider to be assigned first.
    #[display("`{target}` stage requires an assigned `{kind}`")]
    AssignmentRequired {
        /// Role to be assigned.
        kind: provider::Kind,

        /// Requested [`Stage`].
        target: Stage,
    },

    /// [`History`] would go back in time.
    #[display("transition at `{at}` precedes the last one at `{last}`")]
    OutOfOrder {
        /// Moment of the rejected transition.
        at: DateTime,

        /// Moment of the last recorded transition.
        last: DateTime,
    },
}

/// [`DateTime`] when a [`Deal`] was created.
pub type CreationDateTime = DateTimeOf<(Deal, unit::Creation)>;

/// [`DateTime`] when a [`Deal`] was modified.
pub type ModificationDateTime = DateTimeOf<(Deal, unit::Modification)>;

/// [`DateTime`] when a [`Deal`] entered a [`Stage`].
pub type TransitionDateTime = DateTimeOf<(Deal, Stage)>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;

    use crate::domain::{property, provider, user};

    use super::{Deal, Note, Stage, TransitionError};

    fn deal() -> Deal {
        Deal::new(property::Id::new(), user::Id::new(), None)
    }

    fn deal_with_broker() -> Deal {
        let mut deal = deal();
        deal.assign(provider::Kind::Broker, user::Id::new()).unwrap();
        deal
    }

    fn stages(deal: &Deal) -> Vec<Stage> {
        deal.history.entries().iter().map(|e| e.stage).collect()
    }

    #[test]
    fn starts_with_interest() {
        let deal = deal();

        assert_eq!(deal.stage(), Stage::Interest);
        assert_eq!(stages(&deal), [Stage::Interest]);
    }

    #[test]
    fn moves_forward_one_stage_at_a_time() {
        let mut deal = deal_with_broker();

        for target in [
            Stage::BrokerAssigned,
            Stage::Mortgage,
            Stage::Legal,
            Stage::Closing,
            Stage::Completed,
        ] {
            let from = deal.stage();
            assert_eq!(deal.transition(target, None).unwrap(), from);
            assert_eq!(deal.stage(), target);
        }

        assert_eq!(deal.history.entries().len(), 6);
    }

    #[test]
    fn rejects_same_backward_and_skipping_stages() {
        let mut deal = deal_with_broker();
        deal.transition(Stage::BrokerAssigned, None).unwrap();
        deal.transition(Stage::Mortgage, None).unwrap();

        for target in [
            Stage::Mortgage,
            Stage::Interest,
            Stage::BrokerAssigned,
            Stage::Closing,
            Stage::Completed,
        ] {
            assert!(
                matches!(
                    deal.transition(target, None),
                    Err(TransitionError::Unreachable {
                        current: Stage::Mortgage,
                        ..
                    }),
                ),
                "`{target}` must be unreachable from `mortgage`",
            );
        }
        assert_eq!(deal.stage(), Stage::Mortgage);
        assert_eq!(deal.history.entries().len(), 3);
    }

    #[test]
    fn cancels_from_any_non_terminal_stage() {
        let path = [
            Stage::Interest,
            Stage::BrokerAssigned,
            Stage::Mortgage,
            Stage::Legal,
            Stage::Closing,
        ];
        for (n, _) in path.iter().enumerate() {
            let mut deal = deal_with_broker();
            for &stage in &path[1..=n] {
                deal.transition(stage, None).unwrap();
            }

            let from = deal.transition(Stage::Cancelled, None).unwrap();
            assert_eq!(from, path[n]);
            assert_eq!(deal.stage(), Stage::Cancelled);
        }
    }

    #[test]
    fn locks_terminal_stages() {
        let mut cancelled = deal();
        cancelled.transition(Stage::Cancelled, None).unwrap();

        for target in Stage::ALL {
            assert!(matches!(
                cancelled.transition(*target, None),
                Err(TransitionError::Terminal {
                    current: Stage::Cancelled,
                }),
            ));
        }
        assert_eq!(stages(&cancelled), [Stage::Interest, Stage::Cancelled]);
    }

    #[test]
    fn requires_broker_before_broker_assigned() {
        let mut deal = deal();

        assert!(matches!(
            deal.transition(Stage::BrokerAssigned, None),
            Err(TransitionError::AssignmentRequired {
                kind: provider::Kind::Broker,
                target: Stage::BrokerAssigned,
            }),
        ));
        assert_eq!(deal.stage(), Stage::Interest);
    }

    #[test]
    fn keeps_notes_in_history() {
        let mut deal = deal();
        let note = Note::new("  changed my mind ").unwrap();

        _ = deal.transition(Stage::Cancelled, Some(note)).unwrap();

        assert_eq!(
            deal.history
                .current()
                .note
                .as_ref()
                .map(ToString::to_string)
                .as_deref(),
            Some("changed my mind"),
        );
        assert!(Note::new("   ").is_none());
    }

    #[test]
    fn assigns_each_role_once() {
        let mut deal = deal();
        let (first, second) = (user::Id::new(), user::Id::new());

        deal.assign(provider::Kind::Lawyer, first).unwrap();

        assert_eq!(deal.assign(provider::Kind::Lawyer, second), Err(first));
        assert_eq!(deal.assignment(provider::Kind::Lawyer), Some(first));
        assert_eq!(deal.assignment(provider::Kind::Broker), None);
        assert_eq!(
            deal.participants().collect::<Vec<_>>(),
            [deal.investor_id, first],
        );
    }

    #[test]
    #[cfg_attr(
        debug_assertions,
        should_panic(expected = "stage history must not go back in time")
    )]
    fn rejects_out_of_order_history() {
        let mut deal = deal();
        let past = DateTime::now() - Duration::from_secs(3600);

        assert!(matches!(
            deal.transition_at(Stage::Cancelled, None, past),
            Err(TransitionError::OutOfOrder { .. }),
        ));
        assert_eq!(deal.stage(), Stage::Interest);
    }

    #[test]
    fn validates_restored_history() {
        let deal = deal_with_broker();
        let mut entries = deal.history.entries().to_vec();

        assert!(super::History::new(entries.clone()).is_some());
        assert!(super::History::new(vec![]).is_none());

        let mut skipped = entries.clone();
        skipped.push(super::Entry {
            stage: Stage::Legal,
            at: DateTime::now().coerce(),
            note: None,
        });
        assert!(super::History::new(skipped).is_none());

        entries.push(super::Entry {
            stage: Stage::Cancelled,
            at: DateTime::now().coerce(),
            note: None,
        });
        assert!(super::History::new(entries).is_some());
    }
}
