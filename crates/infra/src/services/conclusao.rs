//! Request completion supervisor.

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use remanejamento_core::{AggregateRoot, ExpectedVersion, SolicitacaoId};
use remanejamento_workflow::{
    Actor, DecisaoConclusao, EntidadeAuditada, HistoricoRemanejamento, StatusSolicitacao,
    WorkflowEvent, avaliar_conclusao,
};

use super::{Contexto, Resultado, com_retentativas};
use crate::error::EngineResult;

#[derive(Debug, Clone)]
pub struct CompletionSupervisor {
    ctx: Contexto,
}

impl CompletionSupervisor {
    pub fn new(ctx: Contexto) -> Self {
        Self { ctx }
    }

    /// Conclude the request if every member is done.
    ///
    /// All-or-nothing across members and idempotent: a concluded request is
    /// left untouched. A lost race re-reads members and decides again.
    #[instrument(skip(self, actor), fields(%solicitacao_id), err)]
    pub async fn verificar(
        &self,
        solicitacao_id: SolicitacaoId,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> EngineResult<Resultado<DecisaoConclusao>> {
        let decisao = com_retentativas(self.ctx.max_tentativas(), "concluir_solicitacao", || {
            self.decidir(solicitacao_id, actor, at)
        })
        .await?;

        if decisao != DecisaoConclusao::Concluir {
            debug!(?decisao, "request not concluded");
            return Ok(Resultado::new(decisao, Vec::new()));
        }

        info!("request concluded");
        self.ctx
            .auditoria
            .registrar(
                HistoricoRemanejamento::novo(solicitacao_id, EntidadeAuditada::Solicitacao, "status", actor, at)
                    .valores(None, Some(StatusSolicitacao::Concluido.to_string()))
                    .descricao("Solicitação concluída: todos os funcionários com tarefas concluídas e Prestserv aprovado"),
            )
            .await;

        let evento = WorkflowEvent::SolicitacaoConcluida {
            solicitacao_id,
            actor: actor.clone(),
            occurred_at: at,
        };
        Ok(Resultado::new(decisao, vec![evento]))
    }

    async fn decidir(
        &self,
        id: SolicitacaoId,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> EngineResult<DecisaoConclusao> {
        let mut solicitacao = self.ctx.solicitacao(id).await?;
        let membros = self.ctx.workflow.registros_da_solicitacao(id).await?;

        let decisao = avaliar_conclusao(&solicitacao, &membros);
        if decisao == DecisaoConclusao::Concluir {
            let lida = solicitacao.version();
            solicitacao.concluir(actor, at);
            self.ctx
                .workflow
                .salvar_solicitacao(&solicitacao, ExpectedVersion::Exact(lida))
                .await?;
        }
        Ok(decisao)
    }
}
