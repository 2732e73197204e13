//! Persistence boundary for the reassignment workflow.
//!
//! The relational store is the single shared mutable resource. Every
//! operation re-reads what it needs; nothing is cached between operations.
//!
//! ## Traits
//!
//! - `WorkflowStore`: requests, per-employee records, tasks and notes
//! - `CatalogStore`: collaborator-owned reference data (employees, contracts,
//!   standard tasks, trainings, training matrix). Only the employee row is
//!   ever written, on request creation/rejection and on approval
//! - `CapacitacaoStore`: derived qualification records
//! - `AuditStore`: append-only history rows
//!
//! Requests and employee records are written with an `ExpectedVersion`; the
//! store bumps `version` on every successful write and reports a stale write
//! as `StoreError::Conflict`.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use remanejamento_core::{
    ContratoId, ExpectedVersion, FuncionarioId, RemanejamentoFuncionarioId, SolicitacaoId, TarefaId,
    TarefaPadraoId, TreinamentoId,
};
use remanejamento_workflow::{
    ChaveCapacitacao, Contrato, Funcionario, FuncionarioCapacitacao, HistoricoRemanejamento,
    MatrizTreinamento, ObservacaoRemanejamentoFuncionario, RemanejamentoFuncionario, Setor,
    SolicitacaoRemanejamento, TarefaPadrao, TarefaRemanejamento, TarefaStatusEvento, Treinamento,
};

/// Store operation error.
///
/// These are infrastructure errors, as opposed to domain errors. A `Conflict`
/// is retried by the services; everything else is surfaced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Conflict(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("store backend failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Reserve the next request id.
    async fn proximo_id_solicitacao(&self) -> StoreResult<SolicitacaoId>;

    /// Insert a request together with its member records, atomically.
    async fn inserir_solicitacao(
        &self,
        solicitacao: &SolicitacaoRemanejamento,
        registros: &[RemanejamentoFuncionario],
    ) -> StoreResult<()>;

    async fn solicitacao(&self, id: SolicitacaoId) -> StoreResult<Option<SolicitacaoRemanejamento>>;

    /// Returns the new version.
    async fn salvar_solicitacao(
        &self,
        solicitacao: &SolicitacaoRemanejamento,
        expected: ExpectedVersion,
    ) -> StoreResult<u64>;

    async fn registro(
        &self,
        id: RemanejamentoFuncionarioId,
    ) -> StoreResult<Option<RemanejamentoFuncionario>>;

    async fn registros_da_solicitacao(
        &self,
        id: SolicitacaoId,
    ) -> StoreResult<Vec<RemanejamentoFuncionario>>;

    /// Stable paging over every record (oldest first), for batch jobs.
    async fn registros_pagina(
        &self,
        offset: u64,
        limite: u32,
    ) -> StoreResult<Vec<RemanejamentoFuncionario>>;

    /// Returns the new version.
    async fn salvar_registro(
        &self,
        registro: &RemanejamentoFuncionario,
        expected: ExpectedVersion,
    ) -> StoreResult<u64>;

    async fn inserir_tarefas(&self, tarefas: &[TarefaRemanejamento]) -> StoreResult<()>;

    async fn tarefa(&self, id: TarefaId) -> StoreResult<Option<TarefaRemanejamento>>;

    async fn tarefas_do_registro(
        &self,
        id: RemanejamentoFuncionarioId,
    ) -> StoreResult<Vec<TarefaRemanejamento>>;

    /// Overwrite an existing task (`NotFound` if it is gone).
    async fn salvar_tarefa(&self, tarefa: &TarefaRemanejamento) -> StoreResult<()>;

    /// Returns whether a row was deleted.
    async fn excluir_tarefa(&self, id: TarefaId) -> StoreResult<bool>;

    /// Open tasks whose deadline is before `agora`.
    async fn tarefas_vencidas(&self, agora: DateTime<Utc>) -> StoreResult<Vec<TarefaRemanejamento>>;

    async fn inserir_observacao(
        &self,
        observacao: &ObservacaoRemanejamentoFuncionario,
    ) -> StoreResult<()>;

    async fn observacoes(
        &self,
        registro: RemanejamentoFuncionarioId,
    ) -> StoreResult<Vec<ObservacaoRemanejamentoFuncionario>>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn funcionario(&self, id: FuncionarioId) -> StoreResult<Option<Funcionario>>;

    async fn salvar_funcionario(&self, funcionario: &Funcionario) -> StoreResult<()>;

    async fn contrato(&self, id: ContratoId) -> StoreResult<Option<Contrato>>;

    async fn tarefas_padrao_ativas(&self, setor: Setor) -> StoreResult<Vec<TarefaPadrao>>;

    async fn tarefa_padrao(&self, id: TarefaPadraoId) -> StoreResult<Option<TarefaPadrao>>;

    async fn treinamento(&self, id: TreinamentoId) -> StoreResult<Option<Treinamento>>;

    /// Case-insensitive exact name match.
    async fn treinamento_por_nome(&self, nome: &str) -> StoreResult<Option<Treinamento>>;

    async fn matriz_do_contrato(&self, contrato: ContratoId) -> StoreResult<Vec<MatrizTreinamento>>;
}

#[async_trait]
pub trait CapacitacaoStore: Send + Sync {
    async fn capacitacao_por_chave(
        &self,
        chave: &ChaveCapacitacao,
    ) -> StoreResult<Option<FuncionarioCapacitacao>>;

    /// Insert or overwrite by id.
    async fn salvar_capacitacao(&self, capacitacao: &FuncionarioCapacitacao) -> StoreResult<()>;

    async fn capacitacoes_do_funcionario(
        &self,
        funcionario: FuncionarioId,
    ) -> StoreResult<Vec<FuncionarioCapacitacao>>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn inserir_historico(&self, historico: &HistoricoRemanejamento) -> StoreResult<()>;

    async fn inserir_evento_tarefa(&self, evento: &TarefaStatusEvento) -> StoreResult<()>;

    /// Oldest first.
    async fn historico_da_solicitacao(
        &self,
        id: SolicitacaoId,
    ) -> StoreResult<Vec<HistoricoRemanejamento>>;

    /// Oldest first.
    async fn eventos_da_tarefa(&self, id: TarefaId) -> StoreResult<Vec<TarefaStatusEvento>>;
}
