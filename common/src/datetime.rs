//! Date and time primitives.

#[cfg(feature = "postgres")]
use std::error::Error as StdError;
use std::{cmp::Ordering, fmt, marker::PhantomData, ops, time::Duration};

use derive_more::{Debug, Display, Error};
#[cfg(feature = "postgres")]
use postgres_types::{
    accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql, Type,
};
use time::{format_description::well_known::Rfc3339, UtcOffset};

/// Date and time not bound to any particular entity.
pub type DateTime = DateTimeOf;

/// UTC date and time with microsecond precision.
///
/// The `Of` parameter tags what the moment describes (for example, the
/// creation of a deal), so moments of different meaning are not mixed up
/// accidentally. Use [`DateTimeOf::coerce()`] to convert between them
/// explicitly.
#[derive(Debug)]
pub struct DateTimeOf<Of: ?Sized = ()> {
    /// UTC moment itself.
    inner: time::OffsetDateTime,

    /// Tag of this moment.
    #[debug(skip)]
    _of: PhantomData<Of>,
}

impl<Of: ?Sized> DateTimeOf<Of> {
    /// Moment of the Unix epoch.
    pub const UNIX_EPOCH: Self = Self {
        inner: time::OffsetDateTime::UNIX_EPOCH,
        _of: PhantomData,
    };

    /// Returns the current moment truncated to microseconds, which is the
    /// precision the storage keeps.
    #[must_use]
    pub fn now() -> Self {
        Self::truncated(time::OffsetDateTime::now_utc())
    }

    /// Drops the sub-microsecond part of the provided moment.
    fn truncated(dt: time::OffsetDateTime) -> Self {
        let nanos = dt.nanosecond() - dt.nanosecond() % 1_000;
        Self {
            inner: dt.replace_nanosecond(nanos).unwrap_or(dt),
            _of: PhantomData,
        }
    }

    /// Creates a new [`DateTime`] from the provided number of seconds since
    /// the Unix epoch.
    ///
    /// [`None`] is returned if the timestamp is out of range.
    #[must_use]
    pub fn from_unix_timestamp(timestamp: i64) -> Option<Self> {
        time::OffsetDateTime::from_unix_timestamp(timestamp)
            .ok()
            .map(Self::truncated)
    }

    /// Returns the number of seconds since the Unix epoch.
    #[must_use]
    pub fn unix_timestamp(&self) -> i64 {
        self.inner.unix_timestamp()
    }

    /// Parses a [`DateTime`] from the provided [RFC 3339] string.
    ///
    /// # Errors
    ///
    /// If the string is not a valid [RFC 3339] date and time.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    pub fn from_rfc3339(input: &str) -> Result<Self, ParseError> {
        time::OffsetDateTime::parse(input, &Rfc3339)
            .map_err(ParseError)
            .map(|dt| Self::truncated(dt.to_offset(UtcOffset::UTC)))
    }

    /// Formats this [`DateTime`] as an [RFC 3339] string.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.inner.format(&Rfc3339).unwrap_or_else(|e| {
            unreachable!("UTC `DateTime` is always RFC 3339 compatible: {e}")
        })
    }

    /// Returns the calendar [`YearMonth`] this moment falls into.
    #[must_use]
    pub fn year_month(&self) -> YearMonth {
        YearMonth {
            year: self.inner.year(),
            month: u8::from(self.inner.month()),
        }
    }

    /// Retags this moment.
    #[must_use]
    pub fn coerce<NewOf: ?Sized>(self) -> DateTimeOf<NewOf> {
        DateTimeOf {
            inner: self.inner,
            _of: PhantomData,
        }
    }
}

/// Error of parsing a [`DateTime`] from a string.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("invalid RFC 3339 date and time: {_0}")]
pub struct ParseError(time::error::Parse);

impl<Of: ?Sized> Copy for DateTimeOf<Of> {}
impl<Of: ?Sized> Clone for DateTimeOf<Of> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Of: ?Sized> Eq for DateTimeOf<Of> {}
impl<Of: ?Sized> PartialEq for DateTimeOf<Of> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<Of: ?Sized> Ord for DateTimeOf<Of> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}
impl<Of: ?Sized> PartialOrd for DateTimeOf<Of> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<Of: ?Sized> fmt::Display for DateTimeOf<Of> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl<Of: ?Sized> From<DateTimeOf<Of>> for time::OffsetDateTime {
    fn from(dt: DateTimeOf<Of>) -> Self {
        dt.inner
    }
}

impl<Of: ?Sized> ops::Add<Duration> for DateTimeOf<Of> {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self::truncated(self.inner + rhs)
    }
}

impl<Of: ?Sized> ops::Sub<Duration> for DateTimeOf<Of> {
    type Output = Self;

    fn sub(self, rhs: Duration) -> Self::Output {
        Self::truncated(self.inner - rhs)
    }
}

/// Signed distance between two moments.
impl<Of: ?Sized> ops::Sub for DateTimeOf<Of> {
    type Output = time::Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        self.inner - rhs.inner
    }
}

/// Calendar month of a particular year.
///
/// Orders chronologically and displays as `YYYY-MM`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct YearMonth {
    /// Year of this [`YearMonth`].
    pub year: i32,

    /// Month number in `1..=12` range.
    pub month: u8,
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(feature = "postgres")]
impl<Of: ?Sized> FromSql<'_> for DateTimeOf<Of> {
    accepts!(TIMESTAMPTZ);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        time::OffsetDateTime::from_sql(ty, raw)
            .map(|dt| Self::truncated(dt.to_offset(UtcOffset::UTC)))
    }
}

#[cfg(feature = "postgres")]
impl<Of: ?Sized> ToSql for DateTimeOf<Of> {
    accepts!(TIMESTAMPTZ);
    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        w: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.inner.to_sql(ty, w)
    }
}

#[cfg(feature = "serde")]
pub mod serde {
    //! [`serde`] integration.

    pub mod unix_timestamp {
        //! (De)serialization of a [`DateTimeOf`] as seconds since the Unix
        //! epoch, as JWT claims expect.

        use serde::{de::Error as _, Deserialize as _, Deserializer, Serializer};

        use crate::DateTimeOf;

        /// Serializes the [`DateTimeOf`] as a Unix timestamp.
        ///
        /// # Errors
        ///
        /// If the `serializer` fails.
        pub fn serialize<Of, S>(
            dt: &DateTimeOf<Of>,
            serializer: S,
        ) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
            Of: ?Sized,
        {
            serializer.serialize_i64(dt.unix_timestamp())
        }

        /// Deserializes a [`DateTimeOf`] from a Unix timestamp.
        ///
        /// # Errors
        ///
        /// If the timestamp is missing or out of range.
        pub fn deserialize<'de, D, Of>(
            deserializer: D,
        ) -> Result<DateTimeOf<Of>, D::Error>
        where
            D: Deserializer<'de>,
            Of: ?Sized,
        {
            let ts = i64::deserialize(deserializer)?;
            DateTimeOf::from_unix_timestamp(ts).ok_or_else(|| {
                D::Error::custom(format!("timestamp `{ts}` is out of range"))
            })
        }
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! [`juniper`] integration.

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};

    /// Date and time in [RFC 3339] format with microsecond precision.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    #[graphql_scalar(with = Self, parse_token(String))]
    type DateTime = crate::DateTime;

    impl DateTime {
        fn to_output<S: ScalarValue>(dt: &DateTime) -> Value<S> {
            Value::scalar(dt.to_rfc3339())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            let s = input.as_string_value().ok_or_else(|| {
                format!("`DateTime` must be a string, found: {input}")
            })?;
            Self::from_rfc3339(s).map_err(|e| format!("`DateTime`: {e}"))
        }
    }

    /// Calendar month in `YYYY-MM` format.
    #[graphql_scalar(with = Self, parse_token(String))]
    type YearMonth = crate::YearMonth;

    impl YearMonth {
        fn to_output<S: ScalarValue>(ym: &YearMonth) -> Value<S> {
            Value::scalar(ym.to_string())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            let s = input.as_string_value().ok_or_else(|| {
                format!("`YearMonth` must be a string, found: {input}")
            })?;
            let (year, month) = s
                .split_once('-')
                .ok_or_else(|| format!("`YearMonth` is not `YYYY-MM`: {s}"))?;
            let year = year.parse().map_err(|_| format!("bad year: {year}"))?;
            let month = month
                .parse()
                .ok()
                .filter(|m| (1..=12).contains(m))
                .ok_or_else(|| format!("bad month: {month}"))?;
            Ok(Self { year, month })
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use super::{DateTime, YearMonth};

    #[test]
    fn formats_year_month() {
        let dt = DateTime::from_rfc3339("2024-03-09T10:00:00Z").unwrap();
        assert_eq!(dt.year_month().to_string(), "2024-03");

        let ym = YearMonth {
            year: 987,
            month: 11,
        };
        assert_eq!(ym.to_string(), "0987-11");
    }

    #[test]
    fn orders_year_months_chronologically() {
        let mut months = vec![
            YearMonth {
                year: 2024,
                month: 2,
            },
            YearMonth {
                year: 2023,
                month: 12,
            },
            YearMonth {
                year: 2024,
                month: 1,
            },
        ];
        months.sort();

        assert_eq!(
            months.iter().map(ToString::to_string).collect::<Vec<_>>(),
            ["2023-12", "2024-01", "2024-02"],
        );
    }

    #[test]
    fn subtraction_is_signed() {
        let earlier = DateTime::from_rfc3339("2024-01-01T00:00:00Z").unwrap();
        let later = earlier + Duration::from_secs(90 * 60);

        assert_eq!((later - earlier).whole_minutes(), 90);
        assert_eq!((earlier - later).whole_minutes(), -90);
    }

    #[test]
    fn converts_offsets_to_utc() {
        let dt = DateTime::from_rfc3339("2024-05-31T23:30:00-02:00").unwrap();

        assert_eq!(dt.to_rfc3339(), "2024-06-01T01:30:00Z");
        assert_eq!(dt.year_month().to_string(), "2024-06");
    }
}
