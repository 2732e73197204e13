//! Request lifecycle: creation, reviewer decisions and per-record notes.

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use remanejamento_core::{
    AggregateRoot, DomainError, ExpectedVersion, RemanejamentoFuncionarioId, SolicitacaoId,
};
use remanejamento_workflow::audit::descrever;
use remanejamento_workflow::{
    Actor, EntidadeAuditada, HistoricoRemanejamento, NovaSolicitacao,
    ObservacaoRemanejamentoFuncionario, RemanejamentoFuncionario, SolicitacaoRemanejamento,
    StatusSolicitacao, StatusTarefas, WorkflowEvent,
};

use super::{Contexto, Resultado, com_retentativas};
use crate::error::EngineResult;

#[derive(Debug, Clone)]
pub struct SolicitacaoService {
    ctx: Contexto,
}

impl SolicitacaoService {
    pub fn new(ctx: Contexto) -> Self {
        Self { ctx }
    }

    /// Create the request and one record per employee, and flag the employees
    /// as migrating.
    #[instrument(skip(self, cmd), fields(tipo = %cmd.tipo, funcionarios = cmd.funcionario_ids.len()), err)]
    pub async fn criar(
        &self,
        cmd: NovaSolicitacao,
    ) -> EngineResult<Resultado<(SolicitacaoRemanejamento, Vec<RemanejamentoFuncionario>)>> {
        cmd.validar()?;

        let mut funcionarios = Vec::with_capacity(cmd.funcionario_ids.len());
        for id in &cmd.funcionario_ids {
            let f = self.ctx.funcionario(*id).await?;
            if f.em_migracao {
                return Err(DomainError::invalid_state(format!(
                    "funcionário {} já está em processo de remanejamento",
                    f.rotulo()
                ))
                .into());
            }
            funcionarios.push(f);
        }
        for contrato in [cmd.contrato_origem_id, cmd.contrato_destino_id].into_iter().flatten() {
            if self.ctx.catalogo.contrato(contrato).await?.is_none() {
                return Err(DomainError::not_found(format!("contrato {contrato}")).into());
            }
        }

        let id = self.ctx.workflow.proximo_id_solicitacao().await?;
        let solicitacao = SolicitacaoRemanejamento::nova(id, &cmd)?;
        let registros: Vec<_> = cmd
            .funcionario_ids
            .iter()
            .map(|f| RemanejamentoFuncionario::novo(*f, id, cmd.occurred_at))
            .collect();

        self.ctx.workflow.inserir_solicitacao(&solicitacao, &registros).await?;

        for f in &mut funcionarios {
            f.em_migracao = true;
            if let Err(error) = self.ctx.catalogo.salvar_funcionario(f).await {
                warn!(%error, funcionario_id = %f.id, "failed to flag employee as migrating");
            }
        }

        let actor = &cmd.solicitado_por;
        self.ctx
            .auditoria
            .registrar(
                HistoricoRemanejamento::novo(id, EntidadeAuditada::Solicitacao, "status", actor, cmd.occurred_at)
                    .valores(None, Some(solicitacao.status.to_string()))
                    .descricao(format!(
                        "Solicitação de {} criada com {} funcionário(s)",
                        solicitacao.tipo,
                        registros.len()
                    )),
            )
            .await;
        for (registro, f) in registros.iter().zip(&funcionarios) {
            self.ctx
                .auditoria
                .registrar(
                    HistoricoRemanejamento::novo(id, EntidadeAuditada::Solicitacao, "funcionario", actor, cmd.occurred_at)
                        .do_registro(registro.id)
                        .valores(None, Some(f.id.to_string()))
                        .descricao(descrever("Funcionário incluído na solicitação", Some(f))),
                )
                .await;
        }

        info!(solicitacao_id = %id, "request created");
        let evento = WorkflowEvent::SolicitacaoCriada {
            solicitacao_id: id,
            registros: registros.iter().map(|r| r.id).collect(),
            actor: actor.clone(),
            occurred_at: cmd.occurred_at,
        };
        Ok(Resultado::new((solicitacao, registros), vec![evento]))
    }

    /// Reviewer decision on a request.
    #[instrument(skip(self, actor), fields(%solicitacao_id, %novo), err)]
    pub async fn atualizar_status(
        &self,
        solicitacao_id: SolicitacaoId,
        novo: StatusSolicitacao,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> EngineResult<Resultado<SolicitacaoRemanejamento>> {
        let (solicitacao, anterior) =
            com_retentativas(self.ctx.max_tentativas(), "atualizar_status_solicitacao", || {
                self.revisar(solicitacao_id, novo, at)
            })
            .await?;

        self.ctx
            .auditoria
            .registrar(
                HistoricoRemanejamento::novo(solicitacao_id, EntidadeAuditada::Solicitacao, "status", actor, at)
                    .valores(Some(anterior.to_string()), Some(novo.to_string()))
                    .descricao(format!("Status da solicitação alterado de {anterior} para {novo}")),
            )
            .await;

        match novo {
            StatusSolicitacao::Aprovado => self.liberar_checklists(solicitacao_id, actor, at).await,
            StatusSolicitacao::Rejeitado => self.liberar_funcionarios(solicitacao_id).await,
            _ => {}
        }

        let evento = WorkflowEvent::SolicitacaoRevisada {
            solicitacao_id,
            anterior,
            novo,
            actor: actor.clone(),
            occurred_at: at,
        };
        Ok(Resultado::new(solicitacao, vec![evento]))
    }

    async fn revisar(
        &self,
        id: SolicitacaoId,
        novo: StatusSolicitacao,
        at: DateTime<Utc>,
    ) -> EngineResult<(SolicitacaoRemanejamento, StatusSolicitacao)> {
        let mut solicitacao = self.ctx.solicitacao(id).await?;
        let lida = solicitacao.version();
        let anterior = solicitacao.revisar(novo, at)?;
        solicitacao.version = self
            .ctx
            .workflow
            .salvar_solicitacao(&solicitacao, ExpectedVersion::Exact(lida))
            .await?;
        Ok((solicitacao, anterior))
    }

    /// Approval opens the checklist of every member still awaiting it.
    async fn liberar_checklists(&self, id: SolicitacaoId, actor: &Actor, at: DateTime<Utc>) {
        let registros = match self.ctx.workflow.registros_da_solicitacao(id).await {
            Ok(r) => r,
            Err(error) => {
                warn!(%error, solicitacao_id = %id, "failed to load members after approval");
                return;
            }
        };

        for registro in registros
            .into_iter()
            .filter(|r| r.status_tarefas == StatusTarefas::AprovarSolicitacao)
        {
            let rid = registro.id;
            let outcome = com_retentativas(self.ctx.max_tentativas(), "liberar_checklist", || {
                self.abrir_checklist(rid, at)
            })
            .await;
            match outcome {
                Ok(true) => {
                    let f = self.ctx.funcionario_para_auditoria(registro.funcionario_id).await;
                    self.ctx
                        .auditoria
                        .registrar(
                            HistoricoRemanejamento::novo(id, EntidadeAuditada::StatusTarefas, "statusTarefas", actor, at)
                                .do_registro(rid)
                                .valores(
                                    Some(StatusTarefas::AprovarSolicitacao.to_string()),
                                    Some(StatusTarefas::AtenderTarefas.to_string()),
                                )
                                .descricao(descrever("Solicitação aprovada, tarefas liberadas", f.as_ref())),
                        )
                        .await;
                }
                Ok(false) => {}
                Err(error) => warn!(%error, registro_id = %rid, "failed to open checklist"),
            }
        }
    }

    async fn abrir_checklist(&self, id: RemanejamentoFuncionarioId, at: DateTime<Utc>) -> EngineResult<bool> {
        let mut registro = self.ctx.registro(id).await?;
        if registro.status_tarefas != StatusTarefas::AprovarSolicitacao {
            return Ok(false);
        }
        let lida = registro.version;
        registro.status_tarefas = StatusTarefas::AtenderTarefas;
        registro.atualizado_em = at;
        self.ctx
            .workflow
            .salvar_registro(&registro, ExpectedVersion::Exact(lida))
            .await?;
        Ok(true)
    }

    /// A rejected request releases its employees.
    async fn liberar_funcionarios(&self, id: SolicitacaoId) {
        let registros = match self.ctx.workflow.registros_da_solicitacao(id).await {
            Ok(r) => r,
            Err(error) => {
                warn!(%error, solicitacao_id = %id, "failed to load members after rejection");
                return;
            }
        };
        for registro in registros {
            let Some(mut f) = self.ctx.funcionario_para_auditoria(registro.funcionario_id).await else {
                continue;
            };
            if !f.em_migracao {
                continue;
            }
            f.em_migracao = false;
            if let Err(error) = self.ctx.catalogo.salvar_funcionario(&f).await {
                warn!(%error, funcionario_id = %f.id, "failed to release employee");
            }
        }
    }

    pub async fn adicionar_observacao(
        &self,
        registro_id: RemanejamentoFuncionarioId,
        texto: &str,
        autor: &Actor,
        at: DateTime<Utc>,
    ) -> EngineResult<ObservacaoRemanejamentoFuncionario> {
        let texto = texto.trim();
        if texto.is_empty() {
            return Err(DomainError::validation("texto da observação é obrigatório").into());
        }
        self.ctx.registro(registro_id).await?;
        let observacao = ObservacaoRemanejamentoFuncionario::nova(registro_id, texto, autor.clone(), at);
        self.ctx.workflow.inserir_observacao(&observacao).await?;
        Ok(observacao)
    }
}

