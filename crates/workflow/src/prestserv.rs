//! External approval record ("Prestserv") state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use remanejamento_core::{DomainError, DomainResult};

use crate::remanejamento::{RemanejamentoFuncionario, StatusPrestserv};
use crate::tarefa::{StatusTarefa, TarefaRemanejamento};

/// Gate update as supplied by the caller. Explicit dates override stamping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtualizacaoPrestserv {
    pub status: Option<StatusPrestserv>,
    pub observacoes: Option<String>,
    pub data_rascunho_criado: Option<DateTime<Utc>>,
    pub data_submetido: Option<DateTime<Utc>>,
    pub data_resposta: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransicaoPrestserv {
    pub anterior: StatusPrestserv,
    pub novo: StatusPrestserv,
}

impl TransicaoPrestserv {
    pub fn aprovou(&self) -> bool {
        self.novo == StatusPrestserv::Aprovado && self.anterior != StatusPrestserv::Aprovado
    }
}

/// PENDENTE → CRIADO → SUBMETIDO → {APROVADO, REJEITADO}; a rejected record
/// may be redrafted or resubmitted, and SUBMETIDO may be re-entered.
pub fn transicao_permitida(de: StatusPrestserv, para: StatusPrestserv) -> bool {
    use StatusPrestserv::*;
    matches!(
        (de, para),
        (Pendente, Criado | Submetido)
            | (Criado, Submetido)
            | (Submetido, Submetido | Aprovado | Rejeitado)
            | (Rejeitado, Criado | Submetido)
    )
}

impl RemanejamentoFuncionario {
    pub fn aplicar_prestserv(
        &mut self,
        upd: &AtualizacaoPrestserv,
        tarefas: &[TarefaRemanejamento],
        at: DateTime<Utc>,
    ) -> DomainResult<TransicaoPrestserv> {
        let Some(novo) = upd.status else {
            return Err(DomainError::validation("statusPrestserv é obrigatório"));
        };
        let anterior = self.status_prestserv;
        if !transicao_permitida(anterior, novo) {
            return Err(DomainError::invalid_state(format!(
                "transição de Prestserv não permitida: {anterior} -> {novo}"
            )));
        }

        if novo == StatusPrestserv::Submetido {
            let pendentes = tarefas
                .iter()
                .filter(|t| t.status != StatusTarefa::Concluido)
                .count();
            if pendentes > 0 {
                return Err(DomainError::PendingTasks { pendentes });
            }
        }

        if upd.data_rascunho_criado.is_some() {
            self.data_rascunho_criado = upd.data_rascunho_criado;
        }
        if upd.data_submetido.is_some() {
            self.data_submetido = upd.data_submetido;
        }
        if upd.data_resposta.is_some() {
            self.data_resposta = upd.data_resposta;
        }

        match novo {
            StatusPrestserv::Criado => {
                self.data_rascunho_criado.get_or_insert(at);
            }
            StatusPrestserv::Submetido => {
                self.data_submetido = Some(upd.data_submetido.unwrap_or(at));
            }
            StatusPrestserv::Aprovado | StatusPrestserv::Rejeitado => {
                self.data_resposta = Some(upd.data_resposta.unwrap_or(at));
            }
            StatusPrestserv::Pendente => {}
        }

        if let Some(obs) = &upd.observacoes {
            self.observacoes_prestserv = Some(obs.clone());
        }
        self.status_prestserv = novo;
        self.atualizado_em = at;

        Ok(TransicaoPrestserv { anterior, novo })
    }
}
