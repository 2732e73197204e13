//! Checklist tasks owned by an employee record.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use remanejamento_core::{
    DomainError, DomainResult, Entity, RemanejamentoFuncionarioId, TarefaId, TarefaPadraoId,
    TreinamentoId,
};

use crate::actor::Actor;
use crate::catalog::{TarefaPadrao, Treinamento};
use crate::setor::Setor;
use crate::solicitacao::Prioridade;
use crate::texto::normalizar;

labeled_enum! {
    pub enum StatusTarefa {
        Pendente => "PENDENTE",
        EmAndamento => "EM_ANDAMENTO",
        Concluido => "CONCLUIDO" | "CONCLUIDA",
        Cancelado => "CANCELADO",
        Reprovado => "REPROVADO",
    }
}

impl StatusTarefa {
    /// Statuses that close a checklist item for progress purposes.
    pub fn is_terminal(self) -> bool {
        matches!(self, StatusTarefa::Concluido | StatusTarefa::Cancelado)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TarefaRemanejamento {
    pub id: TarefaId,
    pub remanejamento_id: RemanejamentoFuncionarioId,
    pub tarefa_padrao_id: Option<TarefaPadraoId>,
    pub treinamento_id: Option<TreinamentoId>,
    pub setor: Option<Setor>,
    pub tipo: String,
    pub descricao: Option<String>,
    /// Department string as entered (legacy rows may hold free text).
    pub responsavel: String,
    pub status: StatusTarefa,
    pub prioridade: Prioridade,
    pub data_criacao: DateTime<Utc>,
    pub data_limite: Option<DateTime<Utc>>,
    /// Qualification expiry, set on completion.
    pub data_vencimento: Option<NaiveDate>,
    pub data_conclusao: Option<DateTime<Utc>>,
    pub observacoes: Option<String>,
}

impl Entity for TarefaRemanejamento {
    type Id = TarefaId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for an on-demand task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NovaTarefa {
    pub remanejamento_id: RemanejamentoFuncionarioId,
    pub tipo: String,
    pub descricao: Option<String>,
    pub responsavel: String,
    pub tarefa_padrao_id: Option<TarefaPadraoId>,
    pub treinamento_id: Option<TreinamentoId>,
    pub prioridade: Option<Prioridade>,
    pub data_limite: Option<DateTime<Utc>>,
}

/// Partial update. At least one field must be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TarefaPatch {
    pub status: Option<StatusTarefa>,
    pub observacoes: Option<String>,
    pub data_conclusao: Option<DateTime<Utc>>,
    pub data_limite: Option<DateTime<Utc>>,
    pub data_vencimento: Option<NaiveDate>,
}

impl TarefaPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.observacoes.is_none()
            && self.data_conclusao.is_none()
            && self.data_limite.is_none()
            && self.data_vencimento.is_none()
    }
}

/// What a patch changed, for auditing and cascading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    pub status_anterior: StatusTarefa,
    pub status_novo: StatusTarefa,
    /// `status` was present in the patch (even if unchanged).
    pub status_informado: bool,
    pub data_limite_anterior: Option<DateTime<Utc>>,
    pub data_limite_nova: Option<DateTime<Utc>>,
}

impl PatchOutcome {
    pub fn status_alterado(&self) -> bool {
        self.status_anterior != self.status_novo
    }

    pub fn data_limite_alterada(&self) -> bool {
        self.data_limite_anterior != self.data_limite_nova
    }
}

impl TarefaRemanejamento {
    fn base(
        remanejamento_id: RemanejamentoFuncionarioId,
        tipo: String,
        responsavel: String,
        data_limite: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TarefaId::new(),
            remanejamento_id,
            tarefa_padrao_id: None,
            treinamento_id: None,
            setor: None,
            tipo,
            descricao: None,
            responsavel,
            status: StatusTarefa::Pendente,
            prioridade: Prioridade::Alta,
            data_criacao: at,
            data_limite,
            data_vencimento: None,
            data_conclusao: None,
            observacoes: None,
        }
    }

    /// Task instantiated from a RH/MEDICINA standard template.
    pub fn de_template(
        remanejamento_id: RemanejamentoFuncionarioId,
        template: &TarefaPadrao,
        data_limite: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Self {
        let mut t = Self::base(
            remanejamento_id,
            template.tipo.clone(),
            template.setor.as_str().to_string(),
            Some(data_limite),
            at,
        );
        t.tarefa_padrao_id = Some(template.id);
        t.setor = Some(template.setor);
        t.descricao = template.descricao.clone();
        t
    }

    /// Task instantiated from a training-matrix row.
    pub fn de_treinamento(
        remanejamento_id: RemanejamentoFuncionarioId,
        treinamento: &Treinamento,
        data_limite: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Self {
        let mut t = Self::base(
            remanejamento_id,
            treinamento.nome.clone(),
            Setor::Treinamento.as_str().to_string(),
            Some(data_limite),
            at,
        );
        t.treinamento_id = Some(treinamento.id);
        t.setor = Some(Setor::Treinamento);
        t.descricao = treinamento.descricao.clone();
        t
    }

    /// On-demand task. `setor` is whatever the caller could resolve.
    pub fn avulsa(
        nova: NovaTarefa,
        setor: Option<Setor>,
        data_limite_padrao: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let tipo = nova.tipo.trim().to_string();
        if tipo.is_empty() {
            return Err(DomainError::validation("tipo da tarefa é obrigatório"));
        }
        let responsavel = nova.responsavel.trim().to_string();
        if responsavel.is_empty() {
            return Err(DomainError::validation("responsável da tarefa é obrigatório"));
        }

        let mut t = Self::base(
            nova.remanejamento_id,
            tipo,
            responsavel,
            Some(nova.data_limite.unwrap_or(data_limite_padrao)),
            at,
        );
        t.tarefa_padrao_id = nova.tarefa_padrao_id;
        t.treinamento_id = nova.treinamento_id;
        t.descricao = nova.descricao;
        t.setor = setor;
        if let Some(p) = nova.prioridade {
            t.prioridade = p;
        }
        Ok(t)
    }

    /// Counts toward the training-reopen rule.
    pub fn is_ativa_de_treinamento(&self) -> bool {
        self.status != StatusTarefa::Cancelado && normalizar(&self.responsavel).contains("TREIN")
    }

    /// Department by priority: training link, template department, keywords.
    pub fn setor_resolvido(&self, setor_template: Option<Setor>) -> Option<Setor> {
        Setor::resolver(
            self.treinamento_id.is_some(),
            setor_template,
            &self.responsavel,
            &self.tipo,
            self.descricao.as_deref(),
        )
    }

    pub fn vencida(&self, agora: DateTime<Utc>) -> bool {
        !self.status.is_terminal() && self.data_limite.is_some_and(|limite| limite < agora)
    }

    /// Complete the task. Returns the previous status.
    pub fn concluir(
        &mut self,
        setor: Option<Setor>,
        data_vencimento: Option<NaiveDate>,
        at: DateTime<Utc>,
    ) -> StatusTarefa {
        let anterior = self.status;
        self.status = StatusTarefa::Concluido;
        self.data_conclusao = Some(at);
        if data_vencimento.is_some() {
            self.data_vencimento = data_vencimento;
        }
        if setor.is_some() {
            self.setor = setor;
        }
        anterior
    }

    pub fn aplicar_patch(
        &mut self,
        patch: &TarefaPatch,
        autor: &Actor,
        at: DateTime<Utc>,
    ) -> DomainResult<PatchOutcome> {
        if patch.is_empty() {
            return Err(DomainError::validation(
                "informe ao menos um campo: status, observacoes, dataConclusao, dataLimite ou dataVencimento",
            ));
        }

        let status_anterior = self.status;
        let data_limite_anterior = self.data_limite;

        if let Some(obs) = &patch.observacoes {
            self.observacoes = Some(obs.clone());
        }
        if patch.data_conclusao.is_some() {
            self.data_conclusao = patch.data_conclusao;
        }
        if patch.data_limite.is_some() {
            self.data_limite = patch.data_limite;
        }
        if patch.data_vencimento.is_some() {
            self.data_vencimento = patch.data_vencimento;
        }

        if let Some(novo) = patch.status {
            self.status = novo;
            if novo == StatusTarefa::Concluido {
                self.data_conclusao.get_or_insert(at);
            } else if status_anterior == StatusTarefa::Concluido {
                self.data_conclusao = None;
            }

            if novo != status_anterior && novo != StatusTarefa::Reprovado {
                self.anotar(&format!(
                    "[{}] Status alterado de {} para {} por {}",
                    at.format("%d/%m/%Y %H:%M"),
                    status_anterior,
                    novo,
                    autor.nome()
                ));
            }
        }

        Ok(PatchOutcome {
            status_anterior,
            status_novo: self.status,
            status_informado: patch.status.is_some(),
            data_limite_anterior,
            data_limite_nova: self.data_limite,
        })
    }

    fn anotar(&mut self, nota: &str) {
        match &mut self.observacoes {
            Some(obs) if !obs.is_empty() => {
                obs.push('\n');
                obs.push_str(nota);
            }
            _ => self.observacoes = Some(nota.to_string()),
        }
    }
}

/// Whether completing a task must carry an expiry date: any non-RH task whose
/// linked training has a finite validity.
pub fn vencimento_exigido(setor: Option<Setor>, treinamento: Option<&Treinamento>) -> bool {
    if setor == Some(Setor::Rh) {
        return false;
    }
    treinamento.is_some_and(|t| t.validade().is_finita())
}

/// Validate the expiry date supplied on completion against `hoje`.
pub fn validar_vencimento(
    exigido: bool,
    data: Option<NaiveDate>,
    hoje: NaiveDate,
    minimo_dias: u32,
) -> DomainResult<()> {
    if !exigido {
        return Ok(());
    }
    let Some(data) = data else {
        return Err(DomainError::validation(
            "data de vencimento é obrigatória para concluir tarefa de treinamento com validade",
        ));
    };
    let limite = hoje
        .checked_add_days(Days::new(u64::from(minimo_dias)))
        .unwrap_or(NaiveDate::MAX);
    if data < limite {
        return Err(DomainError::validation(format!(
            "data de vencimento deve ser pelo menos {minimo_dias} dias após hoje (mínimo {})",
            limite.format("%d/%m/%Y")
        )));
    }
    Ok(())
}
