//! The `define_id!` macro.

/// Declares a ULID-backed identifier rendered as `{prefix}_{ulid}`.
///
/// The generated type is `Copy`, ordered by its ULID (so by creation time),
/// parses strictly through `FromStr`/`TryFrom<&str>` and travels through
/// serde as its prefixed string.
///
/// ```ignore
/// define_id!(PilotId, "plt");
///
/// let fresh = PilotId::new();
/// let known: PilotId = "plt_01HV4Z2WQXKJNM8GPQY6VBKC3D".parse()?;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[doc = concat!("Identifier with the `", $prefix, "_` prefix.")]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name($crate::Ulid);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// A fresh identifier stamped with the current time.
            #[must_use]
            pub fn new() -> Self {
                Self($crate::Ulid::new())
            }

            #[must_use]
            pub const fn from_ulid(ulid: $crate::Ulid) -> Self {
                Self(ulid)
            }

            #[must_use]
            pub const fn as_ulid(&self) -> $crate::Ulid {
                self.0
            }

            /// Parses `{prefix}_{ulid}`, rejecting any other prefix.
            pub fn parse(raw: &str) -> Result<Self, $crate::IdError> {
                $crate::split_prefixed(raw, Self::PREFIX).map(Self)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}_{}", Self::PREFIX, self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::IdError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                Self::parse(raw)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = $crate::IdError;

            fn try_from(raw: &str) -> Result<Self, Self::Error> {
                Self::parse(raw)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                struct IdVisitor;

                impl serde::de::Visitor<'_> for IdVisitor {
                    type Value = $name;

                    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                        write!(f, "an identifier of the form {}_<ulid>", $prefix)
                    }

                    fn visit_str<E: serde::de::Error>(self, raw: &str) -> Result<$name, E> {
                        $name::parse(raw).map_err(E::custom)
                    }
                }

                deserializer.deserialize_str(IdVisitor)
            }
        }
    };
}
