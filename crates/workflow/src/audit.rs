//! Append-only audit rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use remanejamento_core::{
    Entity, EventoId, HistoricoId, RemanejamentoFuncionarioId, SolicitacaoId, TarefaId, UserId,
};

use crate::actor::Actor;
use crate::funcionario::Funcionario;
use crate::tarefa::StatusTarefa;

labeled_enum! {
    pub enum EntidadeAuditada {
        Solicitacao => "SOLICITACAO",
        Prestserv => "PRESTSERV",
        Tarefa => "TAREFA",
        StatusTarefas => "STATUS_TAREFAS",
    }
}

/// One observed transition, with before/after values and attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricoRemanejamento {
    pub id: HistoricoId,
    pub solicitacao_id: SolicitacaoId,
    pub remanejamento_funcionario_id: Option<RemanejamentoFuncionarioId>,
    pub tarefa_id: Option<TarefaId>,
    pub entidade: EntidadeAuditada,
    pub campo_alterado: String,
    pub valor_anterior: Option<String>,
    pub valor_novo: Option<String>,
    pub descricao: String,
    pub usuario_responsavel_id: Option<UserId>,
    pub usuario_responsavel: String,
    pub data_acao: DateTime<Utc>,
    pub observacoes: Option<String>,
}

impl Entity for HistoricoRemanejamento {
    type Id = HistoricoId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// What an audit row is about: the audited field of one entity instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SujeitoAuditoria {
    entidade: EntidadeAuditada,
    solicitacao_id: SolicitacaoId,
    remanejamento_funcionario_id: Option<RemanejamentoFuncionarioId>,
    tarefa_id: Option<TarefaId>,
    campo_alterado: String,
}

impl HistoricoRemanejamento {
    pub fn novo(
        solicitacao_id: SolicitacaoId,
        entidade: EntidadeAuditada,
        campo_alterado: impl Into<String>,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: HistoricoId::new(),
            solicitacao_id,
            remanejamento_funcionario_id: None,
            tarefa_id: None,
            entidade,
            campo_alterado: campo_alterado.into(),
            valor_anterior: None,
            valor_novo: None,
            descricao: String::new(),
            usuario_responsavel_id: actor.user_id(),
            usuario_responsavel: actor.nome().to_string(),
            data_acao: at,
            observacoes: None,
        }
    }

    pub fn do_registro(mut self, id: RemanejamentoFuncionarioId) -> Self {
        self.remanejamento_funcionario_id = Some(id);
        self
    }

    pub fn da_tarefa(mut self, id: TarefaId) -> Self {
        self.tarefa_id = Some(id);
        self
    }

    pub fn valores(mut self, anterior: Option<String>, novo: Option<String>) -> Self {
        self.valor_anterior = anterior;
        self.valor_novo = novo;
        self
    }

    pub fn descricao(mut self, descricao: impl Into<String>) -> Self {
        self.descricao = descricao.into();
        self
    }

    pub fn observacoes(mut self, observacoes: impl Into<String>) -> Self {
        self.observacoes = Some(observacoes.into());
        self
    }

    pub fn sujeito(&self) -> SujeitoAuditoria {
        SujeitoAuditoria {
            entidade: self.entidade,
            solicitacao_id: self.solicitacao_id,
            remanejamento_funcionario_id: self.remanejamento_funcionario_id,
            tarefa_id: self.tarefa_id,
            campo_alterado: self.campo_alterado.clone(),
        }
    }

    /// Same subject and same before/after values.
    pub fn repete(&self, outro: &HistoricoRemanejamento) -> bool {
        self.valor_anterior == outro.valor_anterior
            && self.valor_novo == outro.valor_novo
            && self.sujeito() == outro.sujeito()
    }
}

/// Audit description naming the employee, e.g.
/// `"Prestserv aprovado - Maria Souza (matrícula 10231)"`.
pub fn descrever(acao: &str, funcionario: Option<&Funcionario>) -> String {
    match funcionario {
        Some(f) => format!("{acao} - {}", f.rotulo()),
        None => format!("{acao} - funcionário não identificado"),
    }
}

/// Per-task status change log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TarefaStatusEvento {
    pub id: EventoId,
    pub tarefa_id: TarefaId,
    pub remanejamento_funcionario_id: RemanejamentoFuncionarioId,
    pub status_anterior: Option<StatusTarefa>,
    pub status_novo: StatusTarefa,
    pub usuario_responsavel_id: Option<UserId>,
    pub usuario_responsavel: String,
    pub data_evento: DateTime<Utc>,
    pub observacoes: Option<String>,
}

impl TarefaStatusEvento {
    pub fn novo(
        tarefa_id: TarefaId,
        remanejamento_funcionario_id: RemanejamentoFuncionarioId,
        status_anterior: Option<StatusTarefa>,
        status_novo: StatusTarefa,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EventoId::new(),
            tarefa_id,
            remanejamento_funcionario_id,
            status_anterior,
            status_novo,
            usuario_responsavel_id: actor.user_id(),
            usuario_responsavel: actor.nome().to_string(),
            data_evento: at,
            observacoes: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remanejamento_core::{ContratoId, FuncionarioId};

    #[test]
    fn unattributed_rows_name_sistema() {
        let h = HistoricoRemanejamento::novo(
            SolicitacaoId(1),
            EntidadeAuditada::Solicitacao,
            "status",
            &Actor::Sistema,
            Utc::now(),
        );
        assert_eq!(h.usuario_responsavel, "Sistema");
        assert_eq!(h.usuario_responsavel_id, None);
    }

    #[test]
    fn subject_ignores_values_id_and_time() {
        let registro = RemanejamentoFuncionarioId::new();
        let build = || {
            HistoricoRemanejamento::novo(
                SolicitacaoId(1),
                EntidadeAuditada::StatusTarefas,
                "statusTarefas",
                &Actor::Sistema,
                Utc::now(),
            )
            .do_registro(registro)
            .valores(Some("ATENDER TAREFAS".into()), Some("SUBMETER RASCUNHO".into()))
        };
        let a = build();
        let b = build();
        assert_ne!(a.id, b.id);
        assert_eq!(a.sujeito(), b.sujeito());
        assert!(a.repete(&b));

        let c = build().valores(Some("x".into()), None);
        assert_eq!(a.sujeito(), c.sujeito());
        assert!(!a.repete(&c));

        let mut d = build();
        d.campo_alterado = "statusPrestserv".into();
        assert_ne!(a.sujeito(), d.sujeito());
    }

    #[test]
    fn description_embeds_employee_label() {
        let f = Funcionario {
            id: FuncionarioId(3),
            nome: "João Lima".into(),
            matricula: "777".into(),
            funcao: None,
            contrato_id: Some(ContratoId(1)),
            em_migracao: true,
        };
        assert_eq!(
            descrever("Tarefa concluída", Some(&f)),
            "Tarefa concluída - João Lima (matrícula 777)"
        );
    }
}
