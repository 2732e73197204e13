//! Reassignment request (aggregate root).

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use remanejamento_core::{
    AggregateRoot, ContratoId, DomainError, DomainResult, FuncionarioId, SolicitacaoId,
};

use crate::actor::Actor;

labeled_enum! {
    pub enum TipoSolicitacao {
        Remanejamento => "REMANEJAMENTO",
        Alocacao => "ALOCACAO",
        Desligamento => "DESLIGAMENTO",
    }
}

labeled_enum! {
    pub enum StatusSolicitacao {
        Pendente => "Pendente",
        EmAnalise => "Em_Analise",
        Aprovado => "Aprovado",
        Rejeitado => "Rejeitado",
        /// Reached only through the completion supervisor.
        Concluido => "Concluido",
    }
}

labeled_enum! {
    pub enum Prioridade {
        Baixa => "Baixa",
        Media => "Media",
        Alta => "Alta",
        Urgente => "Urgente",
    }
}

impl TipoSolicitacao {
    /// Dismissals leave the company; every other move needs a destination.
    pub fn exige_destino(self) -> bool {
        !matches!(self, TipoSolicitacao::Desligamento)
    }
}

impl StatusSolicitacao {
    /// Moves a reviewer may request. `Concluido` is never reviewable.
    pub fn pode_revisar_para(self, novo: StatusSolicitacao) -> bool {
        use StatusSolicitacao::*;
        matches!(
            (self, novo),
            (Pendente, EmAnalise | Aprovado | Rejeitado) | (EmAnalise, Aprovado | Rejeitado)
        )
    }

    /// Whether checklist work may still be added under this request.
    pub fn aceita_trabalho(self) -> bool {
        !matches!(self, StatusSolicitacao::Rejeitado | StatusSolicitacao::Concluido)
    }
}

/// Input of the request-creation collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NovaSolicitacao {
    pub tipo: TipoSolicitacao,
    pub funcionario_ids: Vec<FuncionarioId>,
    pub contrato_origem_id: Option<ContratoId>,
    pub contrato_destino_id: Option<ContratoId>,
    pub justificativa: Option<String>,
    pub prioridade: Prioridade,
    pub solicitado_por: Actor,
    pub occurred_at: DateTime<Utc>,
}

impl NovaSolicitacao {
    pub fn validar(&self) -> DomainResult<()> {
        if self.funcionario_ids.is_empty() {
            return Err(DomainError::validation(
                "a solicitação deve incluir ao menos um funcionário",
            ));
        }

        let mut vistos = HashSet::new();
        if let Some(dup) = self.funcionario_ids.iter().find(|id| !vistos.insert(**id)) {
            return Err(DomainError::validation(format!(
                "funcionário {dup} informado mais de uma vez"
            )));
        }

        match (self.tipo.exige_destino(), self.contrato_destino_id) {
            (true, None) => Err(DomainError::validation(format!(
                "contrato de destino é obrigatório para {}",
                self.tipo
            ))),
            (false, Some(_)) => Err(DomainError::validation(
                "DESLIGAMENTO não possui contrato de destino",
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolicitacaoRemanejamento {
    pub id: SolicitacaoId,
    pub tipo: TipoSolicitacao,
    pub contrato_origem_id: Option<ContratoId>,
    pub contrato_destino_id: Option<ContratoId>,
    pub status: StatusSolicitacao,
    pub prioridade: Prioridade,
    pub solicitado_por: Actor,
    pub justificativa: Option<String>,
    pub data_solicitacao: DateTime<Utc>,
    pub data_analise: Option<DateTime<Utc>>,
    pub data_aprovacao: Option<DateTime<Utc>>,
    pub data_conclusao: Option<DateTime<Utc>>,
    pub concluido_por: Option<Actor>,
    pub version: u64,
}

impl AggregateRoot for SolicitacaoRemanejamento {
    type Id = SolicitacaoId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl SolicitacaoRemanejamento {
    /// Build a validated, not-yet-persisted request.
    pub fn nova(id: SolicitacaoId, cmd: &NovaSolicitacao) -> DomainResult<Self> {
        cmd.validar()?;
        Ok(Self {
            id,
            tipo: cmd.tipo,
            contrato_origem_id: cmd.contrato_origem_id,
            contrato_destino_id: cmd.contrato_destino_id,
            status: StatusSolicitacao::Pendente,
            prioridade: cmd.prioridade,
            solicitado_por: cmd.solicitado_por.clone(),
            justificativa: cmd.justificativa.clone(),
            data_solicitacao: cmd.occurred_at,
            data_analise: None,
            data_aprovacao: None,
            data_conclusao: None,
            concluido_por: None,
            version: 0,
        })
    }

    /// Contract the employees' training matrix is taken from: the
    /// destination, or the origin for a dismissal.
    pub fn contrato_referencia(&self) -> Option<ContratoId> {
        self.contrato_destino_id.or(self.contrato_origem_id)
    }

    /// Reviewer decision. Returns the previous status.
    pub fn revisar(
        &mut self,
        novo: StatusSolicitacao,
        at: DateTime<Utc>,
    ) -> DomainResult<StatusSolicitacao> {
        if novo == StatusSolicitacao::Concluido {
            return Err(DomainError::invalid_state(
                "a solicitação só é concluída automaticamente quando todos os funcionários estiverem aprovados",
            ));
        }
        let anterior = self.status;
        if !anterior.pode_revisar_para(novo) {
            return Err(DomainError::invalid_state(format!(
                "transição de solicitação não permitida: {anterior} -> {novo}"
            )));
        }

        match novo {
            StatusSolicitacao::EmAnalise => self.data_analise = Some(at),
            StatusSolicitacao::Aprovado | StatusSolicitacao::Rejeitado => {
                self.data_analise.get_or_insert(at);
                if novo == StatusSolicitacao::Aprovado {
                    self.data_aprovacao = Some(at);
                }
            }
            _ => {}
        }
        self.status = novo;
        Ok(anterior)
    }

    /// Mark concluded. Returns `false` (and changes nothing) when it already is.
    pub fn concluir(&mut self, actor: &Actor, at: DateTime<Utc>) -> bool {
        if self.status == StatusSolicitacao::Concluido {
            return false;
        }
        self.status = StatusSolicitacao::Concluido;
        self.data_conclusao = Some(at);
        self.concluido_por = Some(actor.clone());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(tipo: TipoSolicitacao, destino: Option<i64>) -> NovaSolicitacao {
        NovaSolicitacao {
            tipo,
            funcionario_ids: vec![FuncionarioId(1), FuncionarioId(2)],
            contrato_origem_id: Some(ContratoId(3)),
            contrato_destino_id: destino.map(ContratoId),
            justificativa: Some("mobilização".into()),
            prioridade: Prioridade::Alta,
            solicitado_por: Actor::Sistema,
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn destination_rules_per_type() {
        assert!(cmd(TipoSolicitacao::Remanejamento, Some(7)).validar().is_ok());
        assert!(cmd(TipoSolicitacao::Desligamento, None).validar().is_ok());
        assert!(matches!(
            cmd(TipoSolicitacao::Alocacao, None).validar(),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            cmd(TipoSolicitacao::Desligamento, Some(7)).validar(),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn employees_must_be_present_and_unique() {
        let mut c = cmd(TipoSolicitacao::Remanejamento, Some(7));
        c.funcionario_ids.clear();
        assert!(c.validar().is_err());

        c.funcionario_ids = vec![FuncionarioId(1), FuncionarioId(1)];
        let err = c.validar().unwrap_err();
        assert!(err.to_string().contains("mais de uma vez"));
    }

    #[test]
    fn review_stamps_dates_and_refuses_conclusion() {
        let c = cmd(TipoSolicitacao::Remanejamento, Some(7));
        let mut s = SolicitacaoRemanejamento::nova(SolicitacaoId(1), &c).unwrap();
        assert_eq!(s.status, StatusSolicitacao::Pendente);

        assert!(matches!(
            s.revisar(StatusSolicitacao::Concluido, Utc::now()),
            Err(DomainError::InvalidState(_))
        ));

        let t = Utc::now();
        assert_eq!(s.revisar(StatusSolicitacao::EmAnalise, t).unwrap(), StatusSolicitacao::Pendente);
        assert_eq!(s.data_analise, Some(t));
        s.revisar(StatusSolicitacao::Aprovado, t).unwrap();
        assert_eq!(s.data_aprovacao, Some(t));

        assert!(matches!(
            s.revisar(StatusSolicitacao::Rejeitado, t),
            Err(DomainError::InvalidState(_))
        ));
    }

    #[test]
    fn conclusion_is_idempotent() {
        let c = cmd(TipoSolicitacao::Remanejamento, Some(7));
        let mut s = SolicitacaoRemanejamento::nova(SolicitacaoId(1), &c).unwrap();
        let first = Utc::now();
        assert!(s.concluir(&Actor::Sistema, first));
        assert!(!s.concluir(&Actor::Sistema, first + chrono::Duration::hours(1)));
        assert_eq!(s.data_conclusao, Some(first));
    }

    #[test]
    fn labels_round_trip_through_serde() {
        let json = serde_json::to_string(&StatusSolicitacao::EmAnalise).unwrap();
        assert_eq!(json, "\"Em_Analise\"");
        let back: StatusSolicitacao = serde_json::from_str("\"em analise\"").unwrap();
        assert_eq!(back, StatusSolicitacao::EmAnalise);
    }
}
