//! Per-employee progress aggregator.

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use remanejamento_core::{ExpectedVersion, RemanejamentoFuncionarioId};
use remanejamento_workflow::audit::descrever;
use remanejamento_workflow::{
    Actor, EntidadeAuditada, HistoricoRemanejamento, NOTA_MATRIZ_TREINAMENTO,
    ObservacaoRemanejamentoFuncionario, Recalculo, RemanejamentoFuncionario, WorkflowEvent,
    recalcular_status_tarefas,
};

use super::{Contexto, Resultado, com_retentativas};
use crate::error::EngineResult;

#[derive(Debug, Clone)]
pub struct ProgressAggregator {
    ctx: Contexto,
}

impl ProgressAggregator {
    pub fn new(ctx: Contexto) -> Self {
        Self { ctx }
    }

    /// Recompute `status_tarefas` from the record's current task list.
    ///
    /// Emits `StatusTarefasRecalculado` when the status moved and
    /// `RemanejamentoPronto` when the record now satisfies the completion
    /// predicate.
    #[instrument(skip(self, actor), fields(%registro_id), err)]
    pub async fn recalcular(
        &self,
        registro_id: RemanejamentoFuncionarioId,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> EngineResult<Resultado<Recalculo>> {
        let (registro, recalculo) = com_retentativas(self.ctx.max_tentativas(), "recalcular_status_tarefas", || {
            self.aplicar(registro_id, at)
        })
        .await?;

        let mut eventos = Vec::new();
        if recalculo.alterado() {
            info!(anterior = %recalculo.anterior, novo = %recalculo.novo, "checklist status recomputed");
            let f = self.ctx.funcionario_para_auditoria(registro.funcionario_id).await;
            let mut historico = HistoricoRemanejamento::novo(
                registro.solicitacao_id,
                EntidadeAuditada::StatusTarefas,
                "statusTarefas",
                actor,
                at,
            )
            .do_registro(registro.id)
            .valores(Some(recalculo.anterior.to_string()), Some(recalculo.novo.to_string()))
            .descricao(descrever(
                &format!("Status das tarefas alterado de {} para {}", recalculo.anterior, recalculo.novo),
                f.as_ref(),
            ));
            if recalculo.reaberto_por_treinamento {
                historico = historico.observacoes(NOTA_MATRIZ_TREINAMENTO);
            }
            self.ctx.auditoria.registrar(historico).await;

            eventos.push(WorkflowEvent::StatusTarefasRecalculado {
                solicitacao_id: registro.solicitacao_id,
                remanejamento_id: registro.id,
                anterior: recalculo.anterior,
                novo: recalculo.novo,
                actor: actor.clone(),
                occurred_at: at,
            });
        } else {
            debug!(status = %recalculo.novo, "checklist status unchanged");
        }

        if recalculo.reaberto_por_treinamento {
            let nota = ObservacaoRemanejamentoFuncionario::nova(
                registro.id,
                NOTA_MATRIZ_TREINAMENTO,
                Actor::Sistema,
                at,
            );
            if let Err(error) = self.ctx.workflow.inserir_observacao(&nota).await {
                warn!(%error, registro_id = %registro.id, "failed to write training-matrix note");
            }
        }

        if recalculo.todas_concluidas && registro.completo() {
            eventos.push(WorkflowEvent::RemanejamentoPronto {
                solicitacao_id: registro.solicitacao_id,
                remanejamento_id: registro.id,
                actor: actor.clone(),
                occurred_at: at,
            });
        }

        Ok(Resultado::new(recalculo, eventos))
    }

    async fn aplicar(
        &self,
        id: RemanejamentoFuncionarioId,
        at: DateTime<Utc>,
    ) -> EngineResult<(RemanejamentoFuncionario, Recalculo)> {
        let mut registro = self.ctx.registro(id).await?;
        let tarefas = self.ctx.workflow.tarefas_do_registro(id).await?;
        let recalculo = recalcular_status_tarefas(&tarefas, registro.status_tarefas);

        if recalculo.alterado() {
            let lida = registro.version;
            registro.status_tarefas = recalculo.novo;
            registro.atualizado_em = at;
            registro.version = self
                .ctx
                .workflow
                .salvar_registro(&registro, ExpectedVersion::Exact(lida))
                .await?;
        }
        Ok((registro, recalculo))
    }
}
