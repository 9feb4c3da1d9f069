//! [`define_kind!`] macro.

/// Defines a field-less enum stored as a small integer.
///
/// The generated enum:
/// - displays and parses as its `snake_case` variant name;
/// - lists all its variants in declaration order in `ALL`;
/// - converts to/from its `u8` discriminant;
/// - maps to Postgres `INT2` (with the `postgres` feature);
/// - (de)serializes as `snake_case` (with the `serde` feature).
///
/// # Example
///
/// ```rust
/// use common::define_kind;
///
/// define_kind! {
///     /// Shape kind.
///     enum Shape {
///         /// A cube.
///         Cube = 1,
///
///         /// A sphere.
///         Sphere = 2,
///     }
/// }
///
/// assert_eq!(Shape::Sphere.to_string(), "sphere");
/// assert_eq!(Shape::from_u8(1), Some(Shape::Cube));
/// ```
#[macro_export]
macro_rules! define_kind {
    (
        $(#[$meta:meta])*
        enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident = $value:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Clone,
            Copy,
            Debug,
            $crate::private::strum::Display,
            $crate::private::strum::EnumString,
            $crate::private::strum::IntoStaticStr,
            Eq,
            Hash,
            PartialEq,
        )]
        #[cfg_attr(
            feature = "serde",
            derive(
                $crate::private::serde::Deserialize,
                $crate::private::serde::Serialize,
            ),
            serde(rename_all = "snake_case"),
        )]
        #[repr(u8)]
        #[strum(serialize_all = "snake_case")]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                $variant = $value,
            )*
        }

        impl $name {
            /// All the variants in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),*];

            /// Returns the `u8` discriminant of this variant.
            #[must_use]
            pub const fn u8(self) -> u8 {
                self as u8
            }

            /// Returns the variant with the provided `u8` discriminant, if
            /// any.
            #[must_use]
            pub const fn from_u8(value: u8) -> Option<Self> {
                match value {
                    $( $value => Some(Self::$variant), )*
                    _ => None,
                }
            }

            /// Returns the `snake_case` name of this variant.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                self.into()
            }
        }

        #[cfg(feature = "postgres")]
        impl<'a> $crate::private::postgres_types::FromSql<'a> for $name {
            $crate::private::postgres_types::accepts!(INT2);

            fn from_sql(
                ty: &$crate::private::postgres_types::Type,
                raw: &[u8],
            ) -> ::std::result::Result<
                Self,
                ::std::boxed::Box<
                    dyn ::std::error::Error
                        + ::core::marker::Sync
                        + ::core::marker::Send,
                >,
            > {
                let raw = u8::try_from(
                    <i16 as $crate::private::postgres_types::FromSql<'_>>::from_sql(
                        ty, raw,
                    )?,
                )?;
                Self::from_u8(raw).ok_or_else(|| {
                    ::std::format!(
                        "`{raw}` is not a `{}` discriminant",
                        ::core::stringify!($name),
                    )
                    .into()
                })
            }
        }

        #[cfg(feature = "postgres")]
        impl $crate::private::postgres_types::ToSql for $name {
            $crate::private::postgres_types::accepts!(INT2);
            $crate::private::postgres_types::to_sql_checked!();

            fn to_sql(
                &self,
                ty: &$crate::private::postgres_types::Type,
                w: &mut $crate::private::postgres_types::private::BytesMut,
            ) -> ::std::result::Result<
                $crate::private::postgres_types::IsNull,
                ::std::boxed::Box<
                    dyn ::std::error::Error
                        + ::core::marker::Sync
                        + ::core::marker::Send,
                >,
            > {
                $crate::private::postgres_types::ToSql::to_sql(
                    &i16::from(self.u8()),
                    ty,
                    w,
                )
            }
        }
    };
}
