//! Durable qualification records derived from completed checklist tasks.
//!
//! Records are keyed per employee by training, else by standard template,
//! else by (tipo, responsavel). Merging only moves dates forward.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use remanejamento_core::{
    CapacitacaoId, Entity, FuncionarioId, RemanejamentoFuncionarioId, TarefaPadraoId, TreinamentoId,
};

use crate::catalog::{TarefaPadrao, Treinamento};
use crate::remanejamento::{RemanejamentoFuncionario, StatusPrestserv};
use crate::setor::Setor;
use crate::solicitacao::SolicitacaoRemanejamento;
use crate::tarefa::{StatusTarefa, TarefaRemanejamento};
use crate::texto::normalizar;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuncionarioCapacitacao {
    pub id: CapacitacaoId,
    pub funcionario_id: FuncionarioId,
    pub tarefa_padrao_id: Option<TarefaPadraoId>,
    pub treinamento_id: Option<TreinamentoId>,
    pub tipo: String,
    pub responsavel: String,
    pub descricao: Option<String>,
    pub data_conclusao: DateTime<Utc>,
    pub data_vencimento: Option<NaiveDate>,
    pub origem_remanejamento_id: Option<RemanejamentoFuncionarioId>,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
}

impl Entity for FuncionarioCapacitacao {
    type Id = CapacitacaoId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Upsert key of a qualification record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChaveCapacitacao {
    Treinamento {
        funcionario_id: FuncionarioId,
        treinamento_id: TreinamentoId,
    },
    TarefaPadrao {
        funcionario_id: FuncionarioId,
        tarefa_padrao_id: TarefaPadraoId,
    },
    /// Normalized `tipo` and `responsavel`.
    TipoResponsavel {
        funcionario_id: FuncionarioId,
        tipo: String,
        responsavel: String,
    },
}

impl ChaveCapacitacao {
    pub fn de(
        funcionario_id: FuncionarioId,
        treinamento_id: Option<TreinamentoId>,
        tarefa_padrao_id: Option<TarefaPadraoId>,
        tipo: &str,
        responsavel: &str,
    ) -> Self {
        match (treinamento_id, tarefa_padrao_id) {
            (Some(treinamento_id), _) => ChaveCapacitacao::Treinamento {
                funcionario_id,
                treinamento_id,
            },
            (None, Some(tarefa_padrao_id)) => ChaveCapacitacao::TarefaPadrao {
                funcionario_id,
                tarefa_padrao_id,
            },
            (None, None) => ChaveCapacitacao::TipoResponsavel {
                funcionario_id,
                tipo: normalizar(tipo),
                responsavel: normalizar(responsavel),
            },
        }
    }

    pub fn funcionario_id(&self) -> FuncionarioId {
        match self {
            ChaveCapacitacao::Treinamento { funcionario_id, .. }
            | ChaveCapacitacao::TarefaPadrao { funcionario_id, .. }
            | ChaveCapacitacao::TipoResponsavel { funcionario_id, .. } => *funcionario_id,
        }
    }
}

/// Qualification derived from one completed task, before upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacitacaoCandidata {
    pub funcionario_id: FuncionarioId,
    pub tarefa_padrao_id: Option<TarefaPadraoId>,
    pub treinamento_id: Option<TreinamentoId>,
    pub tipo: String,
    pub responsavel: String,
    pub descricao: Option<String>,
    pub data_conclusao: DateTime<Utc>,
    pub data_vencimento: Option<NaiveDate>,
    pub origem_remanejamento_id: RemanejamentoFuncionarioId,
}

impl CapacitacaoCandidata {
    pub fn chave(&self) -> ChaveCapacitacao {
        ChaveCapacitacao::de(
            self.funcionario_id,
            self.treinamento_id,
            self.tarefa_padrao_id,
            &self.tipo,
            &self.responsavel,
        )
    }
}

/// Build the candidate for a completed task, or `None` when the task does not
/// qualify (not completed, or `responsavel` outside RH/MEDICINA/TREINAMENTO).
///
/// `treinamento` and `template` are whatever the caller resolved; an explicit
/// task expiry wins over the one computed from the training's validity.
pub fn candidata_de_tarefa(
    tarefa: &TarefaRemanejamento,
    funcionario_id: FuncionarioId,
    treinamento: Option<&Treinamento>,
    template: Option<&TarefaPadrao>,
) -> Option<CapacitacaoCandidata> {
    if tarefa.status != StatusTarefa::Concluido {
        return None;
    }
    let data_conclusao = tarefa.data_conclusao?;
    let setor = Setor::do_responsavel(&tarefa.responsavel)?;

    let treinamento = treinamento.filter(|_| setor == Setor::Treinamento);
    let data_vencimento = tarefa.data_vencimento.or_else(|| {
        treinamento.and_then(|t| t.validade().vencimento_a_partir(data_conclusao.date_naive()))
    });

    Some(CapacitacaoCandidata {
        funcionario_id,
        tarefa_padrao_id: tarefa.tarefa_padrao_id.or(template.map(|t| t.id)),
        treinamento_id: tarefa.treinamento_id.or(treinamento.map(|t| t.id)),
        tipo: tarefa.tipo.clone(),
        responsavel: setor.as_str().to_string(),
        descricao: tarefa.descricao.clone(),
        data_conclusao,
        data_vencimento,
        origem_remanejamento_id: tarefa.remanejamento_id,
    })
}

/// Batch eligibility: the record was approved or its request already concluded.
pub fn registro_elegivel(
    registro: &RemanejamentoFuncionario,
    solicitacao: &SolicitacaoRemanejamento,
) -> bool {
    registro.status_prestserv == StatusPrestserv::Aprovado || solicitacao.data_conclusao.is_some()
}

impl FuncionarioCapacitacao {
    pub fn nova(c: &CapacitacaoCandidata, at: DateTime<Utc>) -> Self {
        Self {
            id: CapacitacaoId::new(),
            funcionario_id: c.funcionario_id,
            tarefa_padrao_id: c.tarefa_padrao_id,
            treinamento_id: c.treinamento_id,
            tipo: c.tipo.clone(),
            responsavel: c.responsavel.clone(),
            descricao: c.descricao.clone(),
            data_conclusao: c.data_conclusao,
            data_vencimento: c.data_vencimento,
            origem_remanejamento_id: Some(c.origem_remanejamento_id),
            criado_em: at,
            atualizado_em: at,
        }
    }

    pub fn chave(&self) -> ChaveCapacitacao {
        ChaveCapacitacao::de(
            self.funcionario_id,
            self.treinamento_id,
            self.tarefa_padrao_id,
            &self.tipo,
            &self.responsavel,
        )
    }

    /// Merge a newer observation of the same qualification. Returns whether
    /// anything changed. An older completion leaves the record untouched.
    pub fn mesclar(&mut self, c: &CapacitacaoCandidata, at: DateTime<Utc>) -> bool {
        if c.data_conclusao < self.data_conclusao {
            return false;
        }
        let mut alterado = false;

        if c.data_conclusao > self.data_conclusao {
            self.data_conclusao = c.data_conclusao;
            alterado = true;
        }
        if let Some(nova) = c.data_vencimento {
            if self.data_vencimento.is_none_or(|atual| nova > atual) {
                self.data_vencimento = Some(nova);
                alterado = true;
            }
        }
        if c.descricao.is_some() && c.descricao != self.descricao {
            self.descricao = c.descricao.clone();
            alterado = true;
        }
        if self.origem_remanejamento_id != Some(c.origem_remanejamento_id) {
            self.origem_remanejamento_id = Some(c.origem_remanejamento_id);
            alterado = true;
        }

        if alterado {
            self.atualizado_em = at;
        }
        alterado
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use remanejamento_core::TarefaId;

    use crate::solicitacao::Prioridade;

    fn treinamento() -> Treinamento {
        Treinamento {
            id: TreinamentoId(5),
            nome: "NR-10".into(),
            descricao: None,
            validade_valor: Some(24),
            validade_unidade: Some("meses".into()),
        }
    }

    fn concluida(responsavel: &str, quando: DateTime<Utc>) -> TarefaRemanejamento {
        TarefaRemanejamento {
            id: TarefaId::new(),
            remanejamento_id: RemanejamentoFuncionarioId::new(),
            tarefa_padrao_id: None,
            treinamento_id: None,
            setor: None,
            tipo: "NR-10".into(),
            descricao: Some("Segurança em eletricidade".into()),
            responsavel: responsavel.into(),
            status: StatusTarefa::Concluido,
            prioridade: Prioridade::Alta,
            data_criacao: quando,
            data_limite: None,
            data_vencimento: None,
            data_conclusao: Some(quando),
            observacoes: None,
        }
    }

    fn quando(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn only_department_owned_completed_tasks_qualify() {
        let t = concluida("Almoxarifado", quando(2026, 1, 10));
        assert!(candidata_de_tarefa(&t, FuncionarioId(1), None, None).is_none());

        let mut aberta = concluida("RH", quando(2026, 1, 10));
        aberta.status = StatusTarefa::Pendente;
        assert!(candidata_de_tarefa(&aberta, FuncionarioId(1), None, None).is_none());
    }

    #[test]
    fn expiry_is_computed_from_training_validity() {
        let t = concluida("TREINAMENTO", quando(2026, 1, 10));
        let c = candidata_de_tarefa(&t, FuncionarioId(1), Some(&treinamento()), None).unwrap();
        assert_eq!(c.treinamento_id, Some(TreinamentoId(5)));
        assert_eq!(c.data_vencimento, NaiveDate::from_ymd_opt(2028, 1, 10));
        assert!(matches!(c.chave(), ChaveCapacitacao::Treinamento { .. }));
    }

    #[test]
    fn explicit_task_expiry_wins() {
        let mut t = concluida("TREINAMENTO", quando(2026, 1, 10));
        t.data_vencimento = NaiveDate::from_ymd_opt(2027, 6, 1);
        let c = candidata_de_tarefa(&t, FuncionarioId(1), Some(&treinamento()), None).unwrap();
        assert_eq!(c.data_vencimento, NaiveDate::from_ymd_opt(2027, 6, 1));
    }

    #[test]
    fn key_falls_back_to_normalized_tipo_and_responsavel() {
        let a = ChaveCapacitacao::de(FuncionarioId(1), None, None, "Exame Médico", "medicina");
        let b = ChaveCapacitacao::de(FuncionarioId(1), None, None, "EXAME MEDICO", "MEDICINA");
        assert_eq!(a, b);
        let c = ChaveCapacitacao::de(FuncionarioId(1), None, Some(TarefaPadraoId(3)), "x", "RH");
        assert!(matches!(c, ChaveCapacitacao::TarefaPadrao { .. }));
    }

    #[test]
    fn older_completion_leaves_record_unchanged() {
        let recente = concluida("TREINAMENTO", quando(2026, 5, 1));
        let c1 = candidata_de_tarefa(&recente, FuncionarioId(1), Some(&treinamento()), None).unwrap();
        let mut registro = FuncionarioCapacitacao::nova(&c1, Utc::now());
        let antes = registro.clone();

        let antiga = concluida("TREINAMENTO", quando(2025, 5, 1));
        let c0 = candidata_de_tarefa(&antiga, FuncionarioId(1), Some(&treinamento()), None).unwrap();
        assert!(!registro.mesclar(&c0, Utc::now()));
        assert_eq!(registro, antes);
    }

    #[test]
    fn newer_completion_moves_dates_forward() {
        let c1 = candidata_de_tarefa(
            &concluida("TREINAMENTO", quando(2026, 1, 1)),
            FuncionarioId(1),
            Some(&treinamento()),
            None,
        )
        .unwrap();
        let mut registro = FuncionarioCapacitacao::nova(&c1, Utc::now());

        let c2 = candidata_de_tarefa(
            &concluida("TREINAMENTO", quando(2026, 1, 1) + Duration::days(90)),
            FuncionarioId(1),
            Some(&treinamento()),
            None,
        )
        .unwrap();
        assert!(registro.mesclar(&c2, Utc::now()));
        assert_eq!(registro.data_conclusao, c2.data_conclusao);
        assert_eq!(registro.data_vencimento, c2.data_vencimento);
        assert_eq!(registro.origem_remanejamento_id, Some(c2.origem_remanejamento_id));
    }
}
