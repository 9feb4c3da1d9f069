//! [`Money`] definitions.

use std::{fmt, str::FromStr};

use rust_decimal::Decimal;

use crate::define_kind;

/// Amount of money in some [`Currency`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Money {
    /// Amount of this [`Money`].
    pub amount: Decimal,

    /// [`Currency`] of the amount.
    pub currency: Currency,
}

impl Money {
    /// Adds the provided [`Money`] to this one.
    ///
    /// [`None`] is returned if the currencies differ or the sum overflows.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        (self.currency == other.currency).then_some(())?;
        Some(Self {
            amount: self.amount.checked_add(other.amount)?,
            currency: self.currency,
        })
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { amount, currency } = self;
        let code = currency.as_str().to_ascii_uppercase();
        write!(f, "{}{code}", amount.normalize())
    }
}

impl FromStr for Money {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let split = s
            .len()
            .checked_sub(3)
            .filter(|at| *at > 0 && s.is_char_boundary(*at))
            .ok_or("too short")?;
        let (amount, code) = s.split_at(split);

        let amount = Decimal::from_str(amount).map_err(|_| "invalid amount")?;
        if amount.is_sign_negative() {
            return Err("negative amount");
        }
        let currency = Currency::from_str(&code.to_ascii_lowercase())
            .map_err(|_| "unknown currency")?;

        Ok(Self { amount, currency })
    }
}

define_kind! {
    /// Currency of a [`Money`] amount.
    enum Currency {
        /// US Dollar.
        Usd = 1,

        /// Euro.
        Eur = 2,

        /// Pound Sterling.
        Gbp = 3,
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! [`juniper`] integration.

    use std::str::FromStr as _;

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};

    /// Money in `{amount}{currency}` format, where `amount` is a
    /// non-negative decimal and `currency` is a three-letter ISO 4217 code,
    /// e.g. `250000USD` or `99.5EUR`.
    #[graphql_scalar(with = Self, parse_token(String))]
    type Money = super::Money;

    impl Money {
        fn to_output<S: ScalarValue>(m: &Money) -> Value<S> {
            Value::scalar(m.to_string())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            let s = input.as_string_value().ok_or_else(|| {
                format!("`Money` must be a string, found: {input}")
            })?;
            Self::from_str(s).map_err(|e| format!("`Money`: {e}"))
        }
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use rust_decimal::Decimal;

    use super::{Currency, Money};

    fn money(amount: &str, currency: Currency) -> Money {
        Money {
            amount: amount.parse().unwrap(),
            currency,
        }
    }

    #[test]
    fn parses_amount_and_currency() {
        assert_eq!(
            Money::from_str("450000USD").unwrap(),
            money("450000", Currency::Usd),
        );
        assert_eq!(
            Money::from_str("99.50eur").unwrap(),
            money("99.50", Currency::Eur),
        );

        assert!(Money::from_str("USD").is_err());
        assert!(Money::from_str("100").is_err());
        assert!(Money::from_str("100XYZ").is_err());
        assert!(Money::from_str("-5GBP").is_err());
    }

    #[test]
    fn displays_normalized_amount() {
        assert_eq!(money("450000.00", Currency::Usd).to_string(), "450000USD");
        assert_eq!(money("12.50", Currency::Gbp).to_string(), "12.5GBP");
    }

    #[test]
    fn adds_same_currency_only() {
        let sum = money("10", Currency::Usd)
            .checked_add(money("2.5", Currency::Usd))
            .unwrap();
        assert_eq!(sum.amount, Decimal::new(125, 1));

        assert!(money("10", Currency::Usd)
            .checked_add(money("1", Currency::Eur))
            .is_none());
    }
}
