//! Per-employee reassignment record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use remanejamento_core::{
    AggregateRoot, Entity, FuncionarioId, ObservacaoId, RemanejamentoFuncionarioId, SolicitacaoId,
};

use crate::actor::Actor;

labeled_enum! {
    /// Derived checklist progress of one employee. Written only by the
    /// progress aggregator (and by request approval out of the initial state).
    pub enum StatusTarefas {
        AprovarSolicitacao => "APROVAR SOLICITAÇÃO",
        AtenderTarefas => "ATENDER TAREFAS",
        SubmeterRascunho => "SUBMETER RASCUNHO",
        Concluido => "CONCLUIDO",
        ReprovarTarefas => "REPROVAR TAREFAS",
    }
}

labeled_enum! {
    pub enum StatusPrestserv {
        Pendente => "PENDENTE",
        Criado => "CRIADO",
        Submetido => "SUBMETIDO",
        Aprovado => "APROVADO",
        Rejeitado => "REJEITADO",
    }
}

labeled_enum! {
    pub enum StatusFuncionario {
        Ativo => "ATIVO",
        Inativo => "INATIVO",
    }
}

impl StatusTarefas {
    /// Markers meaning "every checklist task is done".
    pub fn tarefas_completas(self) -> bool {
        matches!(self, StatusTarefas::SubmeterRascunho | StatusTarefas::Concluido)
    }
}

impl StatusPrestserv {
    /// Once submission has started no new checklist work may be added.
    pub fn bloqueia_novas_tarefas(self) -> bool {
        matches!(self, StatusPrestserv::Submetido | StatusPrestserv::Aprovado)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemanejamentoFuncionario {
    pub id: RemanejamentoFuncionarioId,
    pub funcionario_id: FuncionarioId,
    pub solicitacao_id: SolicitacaoId,
    pub status_tarefas: StatusTarefas,
    pub status_prestserv: StatusPrestserv,
    pub status_funcionario: StatusFuncionario,
    pub data_rascunho_criado: Option<DateTime<Utc>>,
    pub data_submetido: Option<DateTime<Utc>>,
    pub data_resposta: Option<DateTime<Utc>>,
    pub observacoes_prestserv: Option<String>,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
    pub version: u64,
}

impl AggregateRoot for RemanejamentoFuncionario {
    type Id = RemanejamentoFuncionarioId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl RemanejamentoFuncionario {
    pub fn novo(
        funcionario_id: FuncionarioId,
        solicitacao_id: SolicitacaoId,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RemanejamentoFuncionarioId::new(),
            funcionario_id,
            solicitacao_id,
            status_tarefas: StatusTarefas::AprovarSolicitacao,
            status_prestserv: StatusPrestserv::Pendente,
            status_funcionario: StatusFuncionario::Ativo,
            data_rascunho_criado: None,
            data_submetido: None,
            data_resposta: None,
            observacoes_prestserv: None,
            criado_em: at,
            atualizado_em: at,
            version: 0,
        }
    }

    pub fn aceita_novas_tarefas(&self) -> bool {
        !self.status_prestserv.bloqueia_novas_tarefas()
    }

    /// Satisfies the completion predicate of the parent request.
    pub fn completo(&self) -> bool {
        self.status_tarefas.tarefas_completas() && self.status_prestserv == StatusPrestserv::Aprovado
    }
}

/// Free-text note attached to an employee record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservacaoRemanejamentoFuncionario {
    pub id: ObservacaoId,
    pub remanejamento_id: RemanejamentoFuncionarioId,
    pub texto: String,
    pub autor: Actor,
    pub data_criacao: DateTime<Utc>,
}

impl Entity for ObservacaoRemanejamentoFuncionario {
    type Id = ObservacaoId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl ObservacaoRemanejamentoFuncionario {
    pub fn nova(
        remanejamento_id: RemanejamentoFuncionarioId,
        texto: impl Into<String>,
        autor: Actor,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ObservacaoId::new(),
            remanejamento_id,
            texto: texto.into(),
            autor,
            data_criacao: at,
        }
    }
}
