//! Shared building blocks for the reassignment engine.
//!
//! Identifiers, the domain error taxonomy and the small traits every domain
//! record implements. No IO lives here.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult, ErrorKind};
pub use id::{
    CapacitacaoId, ContratoId, EventoId, FuncionarioId, HistoricoId, ObservacaoId,
    RemanejamentoFuncionarioId, SolicitacaoId, TarefaId, TarefaPadraoId, TreinamentoId, UserId,
};
pub use value_object::ValueObject;
