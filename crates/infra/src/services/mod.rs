//! Orchestration of the workflow stages over the store traits.
//!
//! Each service loads what it needs, asks the pure domain model for a
//! decision, persists it, records the audit trail and returns the events the
//! mutation caused. Cascading (recompute, approval side effects, conclusion,
//! archiving) is left to the pipeline.

pub mod capacitacao;
pub mod conclusao;
pub mod consultas;
pub mod prestserv;
pub mod progresso;
pub mod solicitacoes;
pub mod tarefas;

pub use capacitacao::{CapacitacaoArchiver, RelatorioBackfill};
pub use conclusao::CompletionSupervisor;
pub use consultas::{Consultas, ResumoProgresso};
pub use prestserv::ApprovalGate;
pub use progresso::ProgressAggregator;
pub use solicitacoes::SolicitacaoService;
pub use tarefas::TaskLedger;

use std::future::Future;
use std::sync::Arc;

use tracing::warn;

use remanejamento_core::{
    DomainError, FuncionarioId, RemanejamentoFuncionarioId, SolicitacaoId, TarefaId,
};
use remanejamento_workflow::{
    Funcionario, RemanejamentoFuncionario, SolicitacaoRemanejamento, TarefaRemanejamento,
    WorkflowEvent,
};

use crate::audit::AuditTrailRecorder;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::store::{CapacitacaoStore, CatalogStore, WorkflowStore};

/// A committed operation's result and the events it emitted.
#[derive(Debug, Clone)]
pub struct Resultado<T> {
    pub valor: T,
    pub eventos: Vec<WorkflowEvent>,
}

impl<T> Resultado<T> {
    pub fn new(valor: T, eventos: Vec<WorkflowEvent>) -> Self {
        Self { valor, eventos }
    }
}

/// Shared handles every service works through.
#[derive(Clone)]
pub struct Contexto {
    pub workflow: Arc<dyn WorkflowStore>,
    pub catalogo: Arc<dyn CatalogStore>,
    pub capacitacoes: Arc<dyn CapacitacaoStore>,
    pub auditoria: Arc<AuditTrailRecorder>,
    pub config: Arc<EngineConfig>,
}

impl core::fmt::Debug for Contexto {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Contexto")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Contexto {
    pub(crate) async fn solicitacao(&self, id: SolicitacaoId) -> EngineResult<SolicitacaoRemanejamento> {
        self.workflow
            .solicitacao(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("solicitação {id}")).into())
    }

    pub(crate) async fn registro(
        &self,
        id: RemanejamentoFuncionarioId,
    ) -> EngineResult<RemanejamentoFuncionario> {
        self.workflow
            .registro(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("remanejamento de funcionário {id}")).into())
    }

    pub(crate) async fn tarefa(&self, id: TarefaId) -> EngineResult<TarefaRemanejamento> {
        self.workflow
            .tarefa(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("tarefa {id}")).into())
    }

    pub(crate) async fn funcionario(&self, id: FuncionarioId) -> EngineResult<Funcionario> {
        self.catalogo
            .funcionario(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("funcionário {id}")).into())
    }

    /// Employee lookup for audit descriptions; a failure only degrades the text.
    pub(crate) async fn funcionario_para_auditoria(&self, id: FuncionarioId) -> Option<Funcionario> {
        match self.catalogo.funcionario(id).await {
            Ok(f) => f,
            Err(error) => {
                warn!(%error, funcionario_id = %id, "employee lookup for audit failed");
                None
            }
        }
    }

    pub(crate) fn max_tentativas(&self) -> u32 {
        self.config.max_tentativas_conflito.max(1)
    }
}

/// Re-run a read-modify-write step while it loses optimistic-concurrency races.
pub(crate) async fn com_retentativas<T, F, Fut>(
    tentativas: u32,
    operacao: &'static str,
    mut passo: F,
) -> EngineResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EngineResult<T>>,
{
    let mut tentativa = 1;
    loop {
        match passo().await {
            Err(e) if e.is_conflict() && tentativa < tentativas => {
                warn!(operacao, tentativa, error = %e, "write conflict, retrying");
                tentativa += 1;
            }
            outcome => return outcome,
        }
    }
}
