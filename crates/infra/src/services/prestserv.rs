//! External approval gate ("Prestserv") and its approval side effects.

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use remanejamento_core::{ExpectedVersion, RemanejamentoFuncionarioId};
use remanejamento_workflow::audit::descrever;
use remanejamento_workflow::{
    Actor, AtualizacaoPrestserv, EntidadeAuditada, HistoricoRemanejamento, RemanejamentoFuncionario,
    StatusFuncionario, StatusPrestserv, TipoSolicitacao, TransicaoPrestserv, WorkflowEvent,
};

use super::{Contexto, Resultado, com_retentativas};
use crate::error::EngineResult;

#[derive(Debug, Clone)]
pub struct ApprovalGate {
    ctx: Contexto,
}

impl ApprovalGate {
    pub fn new(ctx: Contexto) -> Self {
        Self { ctx }
    }

    /// Move the record's Prestserv status.
    #[instrument(skip(self, upd, actor), fields(%registro_id, novo = ?upd.status), err)]
    pub async fn atualizar(
        &self,
        registro_id: RemanejamentoFuncionarioId,
        upd: &AtualizacaoPrestserv,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> EngineResult<Resultado<RemanejamentoFuncionario>> {
        let (registro, transicao) = com_retentativas(self.ctx.max_tentativas(), "atualizar_prestserv", || {
            self.transicionar(registro_id, upd, at)
        })
        .await?;

        info!(anterior = %transicao.anterior, novo = %transicao.novo, "prestserv status changed");
        let f = self.ctx.funcionario_para_auditoria(registro.funcionario_id).await;
        let mut historico = HistoricoRemanejamento::novo(
            registro.solicitacao_id,
            EntidadeAuditada::Prestserv,
            "statusPrestserv",
            actor,
            at,
        )
        .do_registro(registro.id)
        .valores(Some(transicao.anterior.to_string()), Some(transicao.novo.to_string()))
        .descricao(descrever(
            &format!("Prestserv alterado de {} para {}", transicao.anterior, transicao.novo),
            f.as_ref(),
        ));
        if let Some(obs) = &upd.observacoes {
            historico = historico.observacoes(obs.clone());
        }
        self.ctx.auditoria.registrar(historico).await;

        let evento = WorkflowEvent::PrestservAlterado {
            solicitacao_id: registro.solicitacao_id,
            remanejamento_id: registro.id,
            anterior: transicao.anterior,
            novo: transicao.novo,
            actor: actor.clone(),
            occurred_at: at,
        };
        Ok(Resultado::new(registro, vec![evento]))
    }

    async fn transicionar(
        &self,
        id: RemanejamentoFuncionarioId,
        upd: &AtualizacaoPrestserv,
        at: DateTime<Utc>,
    ) -> EngineResult<(RemanejamentoFuncionario, TransicaoPrestserv)> {
        let mut registro = self.ctx.registro(id).await?;
        let tarefas = self.ctx.workflow.tarefas_do_registro(id).await?;
        let lida = registro.version;
        let transicao = registro.aplicar_prestserv(upd, &tarefas, at)?;
        registro.version = self
            .ctx
            .workflow
            .salvar_registro(&registro, ExpectedVersion::Exact(lida))
            .await?;
        Ok((registro, transicao))
    }

    /// Side effects of an approval: the employee moves to the destination
    /// contract (a dismissal deactivates the employee instead) and stops
    /// migrating. This is the only write of the live contract assignment.
    #[instrument(skip(self, actor), fields(%registro_id), err)]
    pub async fn efetivar_aprovacao(
        &self,
        registro_id: RemanejamentoFuncionarioId,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> EngineResult<Vec<WorkflowEvent>> {
        let registro = self.ctx.registro(registro_id).await?;
        if registro.status_prestserv != StatusPrestserv::Aprovado {
            return Ok(Vec::new());
        }
        let solicitacao = self.ctx.solicitacao(registro.solicitacao_id).await?;
        let mut funcionario = self.ctx.funcionario(registro.funcionario_id).await?;

        let mut eventos = Vec::new();
        let contrato_anterior = funcionario.contrato_id;

        if solicitacao.tipo == TipoSolicitacao::Desligamento {
            funcionario.em_migracao = false;
            self.ctx.catalogo.salvar_funcionario(&funcionario).await?;
            com_retentativas(self.ctx.max_tentativas(), "inativar_funcionario", || {
                self.inativar(registro_id, at)
            })
            .await?;
            self.ctx
                .auditoria
                .registrar(
                    HistoricoRemanejamento::novo(solicitacao.id, EntidadeAuditada::Prestserv, "statusFuncionario", actor, at)
                        .do_registro(registro_id)
                        .valores(
                            Some(StatusFuncionario::Ativo.to_string()),
                            Some(StatusFuncionario::Inativo.to_string()),
                        )
                        .descricao(descrever("Desligamento efetivado", Some(&funcionario))),
                )
                .await;
        } else {
            funcionario.contrato_id = solicitacao.contrato_destino_id.or(contrato_anterior);
            funcionario.em_migracao = false;
            self.ctx.catalogo.salvar_funcionario(&funcionario).await?;

            info!(
                funcionario_id = %funcionario.id,
                anterior = ?contrato_anterior,
                novo = ?funcionario.contrato_id,
                "employee moved to destination contract"
            );
            self.ctx
                .auditoria
                .registrar(
                    HistoricoRemanejamento::novo(solicitacao.id, EntidadeAuditada::Prestserv, "contratoId", actor, at)
                        .do_registro(registro_id)
                        .valores(
                            contrato_anterior.map(|c| c.to_string()),
                            funcionario.contrato_id.map(|c| c.to_string()),
                        )
                        .descricao(descrever("Funcionário transferido para o contrato de destino", Some(&funcionario))),
                )
                .await;
            eventos.push(WorkflowEvent::ContratoTransferido {
                solicitacao_id: solicitacao.id,
                remanejamento_id: registro_id,
                funcionario_id: funcionario.id,
                contrato_anterior,
                contrato_novo: funcionario.contrato_id,
                actor: actor.clone(),
                occurred_at: at,
            });
        }

        if registro.completo() {
            eventos.push(WorkflowEvent::RemanejamentoPronto {
                solicitacao_id: solicitacao.id,
                remanejamento_id: registro_id,
                actor: actor.clone(),
                occurred_at: at,
            });
        }
        Ok(eventos)
    }

    async fn inativar(&self, id: RemanejamentoFuncionarioId, at: DateTime<Utc>) -> EngineResult<()> {
        let mut registro = self.ctx.registro(id).await?;
        if registro.status_funcionario == StatusFuncionario::Inativo {
            return Ok(());
        }
        let lida = registro.version;
        registro.status_funcionario = StatusFuncionario::Inativo;
        registro.atualizado_em = at;
        self.ctx
            .workflow
            .salvar_registro(&registro, ExpectedVersion::Exact(lida))
            .await?;
        Ok(())
    }
}
