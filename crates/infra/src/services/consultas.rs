//! Read-only views for reporting collaborators.

use chrono::{DateTime, Utc};
use serde::Serialize;

use remanejamento_core::{FuncionarioId, RemanejamentoFuncionarioId, SolicitacaoId, TarefaId};
use remanejamento_workflow::{
    FuncionarioCapacitacao, HistoricoRemanejamento, ObservacaoRemanejamentoFuncionario,
    RemanejamentoFuncionario, SolicitacaoRemanejamento, StatusTarefa, StatusTarefas,
    TarefaRemanejamento, TarefaStatusEvento,
};

use super::Contexto;
use crate::error::EngineResult;
use crate::store::AuditStore;

/// Task counts of one employee record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResumoProgresso {
    pub status_tarefas: Option<StatusTarefas>,
    pub total: usize,
    pub pendentes: usize,
    pub em_andamento: usize,
    pub concluidas: usize,
    pub canceladas: usize,
    pub reprovadas: usize,
    /// Open tasks past their deadline.
    pub vencidas: usize,
}

impl ResumoProgresso {
    pub fn de(registro: &RemanejamentoFuncionario, tarefas: &[TarefaRemanejamento], agora: DateTime<Utc>) -> Self {
        let mut r = ResumoProgresso {
            status_tarefas: Some(registro.status_tarefas),
            total: tarefas.len(),
            ..Default::default()
        };
        for t in tarefas {
            match t.status {
                StatusTarefa::Pendente => r.pendentes += 1,
                StatusTarefa::EmAndamento => r.em_andamento += 1,
                StatusTarefa::Concluido => r.concluidas += 1,
                StatusTarefa::Cancelado => r.canceladas += 1,
                StatusTarefa::Reprovado => r.reprovadas += 1,
            }
            if t.vencida(agora) {
                r.vencidas += 1;
            }
        }
        r
    }

    /// Share of closed tasks, 0–100.
    pub fn percentual_concluido(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let fechadas = self.concluidas + self.canceladas;
        ((fechadas * 100) / self.total) as u8
    }
}

#[derive(Clone)]
pub struct Consultas {
    ctx: Contexto,
    auditoria: std::sync::Arc<dyn AuditStore>,
}

impl core::fmt::Debug for Consultas {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Consultas").finish_non_exhaustive()
    }
}

impl Consultas {
    pub fn new(ctx: Contexto, auditoria: std::sync::Arc<dyn AuditStore>) -> Self {
        Self { ctx, auditoria }
    }

    pub async fn solicitacao(&self, id: SolicitacaoId) -> EngineResult<SolicitacaoRemanejamento> {
        self.ctx.solicitacao(id).await
    }

    pub async fn registros_da_solicitacao(
        &self,
        id: SolicitacaoId,
    ) -> EngineResult<Vec<RemanejamentoFuncionario>> {
        Ok(self.ctx.workflow.registros_da_solicitacao(id).await?)
    }

    pub async fn registro(&self, id: RemanejamentoFuncionarioId) -> EngineResult<RemanejamentoFuncionario> {
        self.ctx.registro(id).await
    }

    pub async fn tarefas_do_remanejamento(
        &self,
        id: RemanejamentoFuncionarioId,
    ) -> EngineResult<Vec<TarefaRemanejamento>> {
        self.ctx.registro(id).await?;
        Ok(self.ctx.workflow.tarefas_do_registro(id).await?)
    }

    pub async fn resumo_progresso(
        &self,
        id: RemanejamentoFuncionarioId,
        agora: DateTime<Utc>,
    ) -> EngineResult<ResumoProgresso> {
        let registro = self.ctx.registro(id).await?;
        let tarefas = self.ctx.workflow.tarefas_do_registro(id).await?;
        Ok(ResumoProgresso::de(&registro, &tarefas, agora))
    }

    pub async fn tarefas_vencidas(&self, agora: DateTime<Utc>) -> EngineResult<Vec<TarefaRemanejamento>> {
        Ok(self.ctx.workflow.tarefas_vencidas(agora).await?)
    }

    pub async fn observacoes(
        &self,
        id: RemanejamentoFuncionarioId,
    ) -> EngineResult<Vec<ObservacaoRemanejamentoFuncionario>> {
        Ok(self.ctx.workflow.observacoes(id).await?)
    }

    pub async fn historico_da_solicitacao(
        &self,
        id: SolicitacaoId,
    ) -> EngineResult<Vec<HistoricoRemanejamento>> {
        Ok(self.auditoria.historico_da_solicitacao(id).await?)
    }

    pub async fn eventos_da_tarefa(&self, id: TarefaId) -> EngineResult<Vec<TarefaStatusEvento>> {
        Ok(self.auditoria.eventos_da_tarefa(id).await?)
    }

    pub async fn capacitacoes_do_funcionario(
        &self,
        id: FuncionarioId,
    ) -> EngineResult<Vec<FuncionarioCapacitacao>> {
        Ok(self.ctx.capacitacoes.capacitacoes_do_funcionario(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use remanejamento_workflow::Prioridade;

    fn tarefa(status: StatusTarefa, limite: DateTime<Utc>) -> TarefaRemanejamento {
        TarefaRemanejamento {
            id: TarefaId::new(),
            remanejamento_id: RemanejamentoFuncionarioId::new(),
            tarefa_padrao_id: None,
            treinamento_id: None,
            setor: None,
            tipo: "Integração".into(),
            descricao: None,
            responsavel: "RH".into(),
            status,
            prioridade: Prioridade::Alta,
            data_criacao: limite - Duration::days(30),
            data_limite: Some(limite),
            data_vencimento: None,
            data_conclusao: None,
            observacoes: None,
        }
    }

    #[test]
    fn summary_counts_each_status_and_overdue_open_tasks() {
        let agora = Utc::now();
        let registro = RemanejamentoFuncionario::novo(FuncionarioId(1), SolicitacaoId(1), agora);
        let ontem = agora - Duration::days(1);
        let tarefas = vec![
            tarefa(StatusTarefa::Pendente, ontem),
            tarefa(StatusTarefa::EmAndamento, agora + Duration::days(3)),
            tarefa(StatusTarefa::Concluido, ontem),
            tarefa(StatusTarefa::Cancelado, ontem),
        ];

        let r = ResumoProgresso::de(&registro, &tarefas, agora);
        assert_eq!(r.total, 4);
        assert_eq!((r.pendentes, r.em_andamento, r.concluidas, r.canceladas), (1, 1, 1, 1));
        assert_eq!(r.vencidas, 1);
        assert_eq!(r.percentual_concluido(), 50);
    }

    #[test]
    fn empty_checklist_reads_as_complete() {
        let registro = RemanejamentoFuncionario::novo(FuncionarioId(1), SolicitacaoId(1), Utc::now());
        let r = ResumoProgresso::de(&registro, &[], Utc::now());
        assert_eq!(r.percentual_concluido(), 100);
    }
}
