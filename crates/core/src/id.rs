//! Strongly-typed identifiers used across the domain.
//!
//! Records born inside the engine (per-employee records, tasks, audit rows)
//! use UUIDs; records owned by collaborators (employees, contracts, catalog
//! entries, users) and the request itself use the relational store's numeric
//! keys.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $t:ident, $name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(Uuid);

        impl $t {
            /// Create a new identifier (UUIDv7, time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $t:ident, $name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(pub i64);

        impl $t {
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let n = s
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(n))
            }
        }
    };
}

uuid_id!(
    /// Per-employee reassignment record.
    RemanejamentoFuncionarioId,
    "RemanejamentoFuncionarioId"
);
uuid_id!(
    /// Checklist task.
    TarefaId,
    "TarefaId"
);
uuid_id!(CapacitacaoId, "CapacitacaoId");
uuid_id!(HistoricoId, "HistoricoId");
uuid_id!(EventoId, "EventoId");
uuid_id!(ObservacaoId, "ObservacaoId");

numeric_id!(
    /// Reassignment request.
    SolicitacaoId,
    "SolicitacaoId"
);
numeric_id!(FuncionarioId, "FuncionarioId");
numeric_id!(ContratoId, "ContratoId");
numeric_id!(TarefaPadraoId, "TarefaPadraoId");
numeric_id!(TreinamentoId, "TreinamentoId");
numeric_id!(
    /// Authenticated user (actor identity supplied by the auth collaborator).
    UserId,
    "UserId"
);
