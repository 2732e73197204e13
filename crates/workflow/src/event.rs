//! Facts emitted after a workflow mutation is committed.
//!
//! Services return these; the infra pipeline routes them to the stages that
//! cascade (progress, approval side effects, completion, archiving).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use remanejamento_core::{
    ContratoId, FuncionarioId, RemanejamentoFuncionarioId, SolicitacaoId, TarefaId,
};
use remanejamento_events::Event;

use crate::actor::Actor;
use crate::remanejamento::{StatusPrestserv, StatusTarefas};
use crate::solicitacao::StatusSolicitacao;
use crate::tarefa::StatusTarefa;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "evento", rename_all = "snake_case")]
pub enum WorkflowEvent {
    SolicitacaoCriada {
        solicitacao_id: SolicitacaoId,
        registros: Vec<RemanejamentoFuncionarioId>,
        actor: Actor,
        occurred_at: DateTime<Utc>,
    },
    SolicitacaoRevisada {
        solicitacao_id: SolicitacaoId,
        anterior: StatusSolicitacao,
        novo: StatusSolicitacao,
        actor: Actor,
        occurred_at: DateTime<Utc>,
    },
    TarefasCriadas {
        solicitacao_id: SolicitacaoId,
        remanejamento_id: RemanejamentoFuncionarioId,
        tarefas: Vec<TarefaId>,
        actor: Actor,
        occurred_at: DateTime<Utc>,
    },
    TarefaConcluida {
        solicitacao_id: SolicitacaoId,
        remanejamento_id: RemanejamentoFuncionarioId,
        tarefa_id: TarefaId,
        actor: Actor,
        occurred_at: DateTime<Utc>,
    },
    TarefaAtualizada {
        solicitacao_id: SolicitacaoId,
        remanejamento_id: RemanejamentoFuncionarioId,
        tarefa_id: TarefaId,
        novo_status: StatusTarefa,
        status_alterado: bool,
        /// `status` was part of the update.
        recalcular: bool,
        actor: Actor,
        occurred_at: DateTime<Utc>,
    },
    TarefaExcluida {
        solicitacao_id: SolicitacaoId,
        remanejamento_id: RemanejamentoFuncionarioId,
        tarefa_id: TarefaId,
        actor: Actor,
        occurred_at: DateTime<Utc>,
    },
    StatusTarefasRecalculado {
        solicitacao_id: SolicitacaoId,
        remanejamento_id: RemanejamentoFuncionarioId,
        anterior: StatusTarefas,
        novo: StatusTarefas,
        actor: Actor,
        occurred_at: DateTime<Utc>,
    },
    PrestservAlterado {
        solicitacao_id: SolicitacaoId,
        remanejamento_id: RemanejamentoFuncionarioId,
        anterior: StatusPrestserv,
        novo: StatusPrestserv,
        actor: Actor,
        occurred_at: DateTime<Utc>,
    },
    ContratoTransferido {
        solicitacao_id: SolicitacaoId,
        remanejamento_id: RemanejamentoFuncionarioId,
        funcionario_id: FuncionarioId,
        contrato_anterior: Option<ContratoId>,
        contrato_novo: Option<ContratoId>,
        actor: Actor,
        occurred_at: DateTime<Utc>,
    },
    /// The record satisfies the completion predicate.
    RemanejamentoPronto {
        solicitacao_id: SolicitacaoId,
        remanejamento_id: RemanejamentoFuncionarioId,
        actor: Actor,
        occurred_at: DateTime<Utc>,
    },
    SolicitacaoConcluida {
        solicitacao_id: SolicitacaoId,
        actor: Actor,
        occurred_at: DateTime<Utc>,
    },
}

impl WorkflowEvent {
    pub fn solicitacao_id(&self) -> SolicitacaoId {
        match self {
            WorkflowEvent::SolicitacaoCriada { solicitacao_id, .. }
            | WorkflowEvent::SolicitacaoRevisada { solicitacao_id, .. }
            | WorkflowEvent::TarefasCriadas { solicitacao_id, .. }
            | WorkflowEvent::TarefaConcluida { solicitacao_id, .. }
            | WorkflowEvent::TarefaAtualizada { solicitacao_id, .. }
            | WorkflowEvent::TarefaExcluida { solicitacao_id, .. }
            | WorkflowEvent::StatusTarefasRecalculado { solicitacao_id, .. }
            | WorkflowEvent::PrestservAlterado { solicitacao_id, .. }
            | WorkflowEvent::ContratoTransferido { solicitacao_id, .. }
            | WorkflowEvent::RemanejamentoPronto { solicitacao_id, .. }
            | WorkflowEvent::SolicitacaoConcluida { solicitacao_id, .. } => *solicitacao_id,
        }
    }

    pub fn actor(&self) -> &Actor {
        match self {
            WorkflowEvent::SolicitacaoCriada { actor, .. }
            | WorkflowEvent::SolicitacaoRevisada { actor, .. }
            | WorkflowEvent::TarefasCriadas { actor, .. }
            | WorkflowEvent::TarefaConcluida { actor, .. }
            | WorkflowEvent::TarefaAtualizada { actor, .. }
            | WorkflowEvent::TarefaExcluida { actor, .. }
            | WorkflowEvent::StatusTarefasRecalculado { actor, .. }
            | WorkflowEvent::PrestservAlterado { actor, .. }
            | WorkflowEvent::ContratoTransferido { actor, .. }
            | WorkflowEvent::RemanejamentoPronto { actor, .. }
            | WorkflowEvent::SolicitacaoConcluida { actor, .. } => actor,
        }
    }

    /// Record whose checklist must be recomputed after this event, if any.
    pub fn registro_a_recalcular(&self) -> Option<RemanejamentoFuncionarioId> {
        match self {
            WorkflowEvent::TarefasCriadas { remanejamento_id, .. }
            | WorkflowEvent::TarefaConcluida { remanejamento_id, .. }
            | WorkflowEvent::TarefaExcluida { remanejamento_id, .. } => Some(*remanejamento_id),
            WorkflowEvent::TarefaAtualizada {
                remanejamento_id,
                recalcular: true,
                ..
            } => Some(*remanejamento_id),
            _ => None,
        }
    }

    /// Task that just reached CONCLUIDO, if any.
    pub fn tarefa_concluida(&self) -> Option<TarefaId> {
        match self {
            WorkflowEvent::TarefaConcluida { tarefa_id, .. } => Some(*tarefa_id),
            WorkflowEvent::TarefaAtualizada {
                tarefa_id,
                novo_status: StatusTarefa::Concluido,
                status_alterado: true,
                ..
            } => Some(*tarefa_id),
            _ => None,
        }
    }
}

impl Event for WorkflowEvent {
    fn event_type(&self) -> &'static str {
        match self {
            WorkflowEvent::SolicitacaoCriada { .. } => "remanejamento.solicitacao.criada",
            WorkflowEvent::SolicitacaoRevisada { .. } => "remanejamento.solicitacao.revisada",
            WorkflowEvent::TarefasCriadas { .. } => "remanejamento.tarefas.criadas",
            WorkflowEvent::TarefaConcluida { .. } => "remanejamento.tarefa.concluida",
            WorkflowEvent::TarefaAtualizada { .. } => "remanejamento.tarefa.atualizada",
            WorkflowEvent::TarefaExcluida { .. } => "remanejamento.tarefa.excluida",
            WorkflowEvent::StatusTarefasRecalculado { .. } => "remanejamento.status_tarefas.recalculado",
            WorkflowEvent::PrestservAlterado { .. } => "remanejamento.prestserv.alterado",
            WorkflowEvent::ContratoTransferido { .. } => "remanejamento.contrato.transferido",
            WorkflowEvent::RemanejamentoPronto { .. } => "remanejamento.funcionario.pronto",
            WorkflowEvent::SolicitacaoConcluida { .. } => "remanejamento.solicitacao.concluida",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            WorkflowEvent::SolicitacaoCriada { occurred_at, .. }
            | WorkflowEvent::SolicitacaoRevisada { occurred_at, .. }
            | WorkflowEvent::TarefasCriadas { occurred_at, .. }
            | WorkflowEvent::TarefaConcluida { occurred_at, .. }
            | WorkflowEvent::TarefaAtualizada { occurred_at, .. }
            | WorkflowEvent::TarefaExcluida { occurred_at, .. }
            | WorkflowEvent::StatusTarefasRecalculado { occurred_at, .. }
            | WorkflowEvent::PrestservAlterado { occurred_at, .. }
            | WorkflowEvent::ContratoTransferido { occurred_at, .. }
            | WorkflowEvent::RemanejamentoPronto { occurred_at, .. }
            | WorkflowEvent::SolicitacaoConcluida { occurred_at, .. } => *occurred_at,
        }
    }
}
