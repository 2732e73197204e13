//! Closed enums persisted and exchanged as the literal labels users see
//! (`"APROVAR SOLICITAÇÃO"`, `"EM_ANDAMENTO"`, ...).
//!
//! Parsing is forgiving (case, accents, `_` vs space) and accepts aliases found
//! in legacy rows; serialization always writes the canonical label.

macro_rules! labeled_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $label:literal $(| $alias:literal)*
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant
            ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Canonical label.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl core::str::FromStr for $name {
            type Err = remanejamento_core::DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = crate::texto::normalizar(s);
                $(
                    if wanted == crate::texto::normalizar($label)
                        $(|| wanted == crate::texto::normalizar($alias))*
                    {
                        return Ok($name::$variant);
                    }
                )+
                Err(remanejamento_core::DomainError::validation(format!(
                    "{} inválido: '{}'",
                    stringify!($name),
                    s
                )))
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}
