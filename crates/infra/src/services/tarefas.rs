//! Task ledger: checklist task creation and transitions.
//!
//! Every mutation here ends by emitting an event the progress aggregator
//! reacts to; there is no task write path that skips recomputation.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{info, instrument, warn};

use remanejamento_core::{DomainError, RemanejamentoFuncionarioId, TarefaId};
use remanejamento_workflow::audit::descrever;
use remanejamento_workflow::{
    Actor, EntidadeAuditada, HistoricoRemanejamento, NovaTarefa, RemanejamentoFuncionario, Setor,
    SolicitacaoRemanejamento, StatusTarefa, TarefaPatch, TarefaRemanejamento, TarefaStatusEvento,
    WorkflowEvent, validar_vencimento, vencimento_exigido,
};

use super::{Contexto, Resultado};
use crate::error::EngineResult;

#[derive(Debug, Clone)]
pub struct TaskLedger {
    ctx: Contexto,
}

impl TaskLedger {
    pub fn new(ctx: Contexto) -> Self {
        Self { ctx }
    }

    fn prazo(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        at + Duration::days(i64::from(self.ctx.config.prazo_tarefa_dias))
    }

    /// Load the record and its request, refusing new work once submission
    /// started or the request is closed.
    async fn registro_aberto(
        &self,
        id: RemanejamentoFuncionarioId,
    ) -> EngineResult<(RemanejamentoFuncionario, SolicitacaoRemanejamento)> {
        let registro = self.ctx.registro(id).await?;
        if !registro.aceita_novas_tarefas() {
            return Err(DomainError::invalid_state(format!(
                "não é possível criar tarefas com Prestserv {}",
                registro.status_prestserv
            ))
            .into());
        }
        let solicitacao = self.ctx.solicitacao(registro.solicitacao_id).await?;
        if !solicitacao.status.aceita_trabalho() {
            return Err(DomainError::invalid_state(format!(
                "não é possível criar tarefas em solicitação {}",
                solicitacao.status
            ))
            .into());
        }
        Ok((registro, solicitacao))
    }

    /// Create the standard checklist of each requested department.
    #[instrument(skip(self, setores, actor), fields(%registro_id), err)]
    pub async fn criar_em_lote(
        &self,
        registro_id: RemanejamentoFuncionarioId,
        setores: &[&str],
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> EngineResult<Resultado<Vec<TarefaRemanejamento>>> {
        if setores.is_empty() {
            return Err(DomainError::validation("informe ao menos um setor").into());
        }
        let mut pedidos: Vec<Setor> = Vec::with_capacity(setores.len());
        for raw in setores {
            let setor = Setor::parse_requisitado(raw)?;
            if !pedidos.contains(&setor) {
                pedidos.push(setor);
            }
        }

        let (registro, solicitacao) = self.registro_aberto(registro_id).await?;
        let limite = self.prazo(at);

        let mut tarefas = Vec::new();
        for setor in &pedidos {
            match setor {
                Setor::Rh | Setor::Medicina => {
                    let templates = self.ctx.catalogo.tarefas_padrao_ativas(*setor).await?;
                    tarefas.extend(
                        templates
                            .iter()
                            .map(|t| TarefaRemanejamento::de_template(registro_id, t, limite, at)),
                    );
                }
                Setor::Treinamento => {
                    tarefas.extend(
                        self.tarefas_de_treinamento(&registro, &solicitacao, limite, at)
                            .await?,
                    );
                }
            }
        }

        self.ctx.workflow.inserir_tarefas(&tarefas).await?;

        let rotulo = pedidos.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ");
        info!(quantidade = tarefas.len(), setores = %rotulo, "checklist tasks created");

        let f = self.ctx.funcionario_para_auditoria(registro.funcionario_id).await;
        self.ctx
            .auditoria
            .registrar(
                HistoricoRemanejamento::novo(registro.solicitacao_id, EntidadeAuditada::Tarefa, "tarefas", actor, at)
                    .do_registro(registro_id)
                    .valores(None, Some(tarefas.len().to_string()))
                    .descricao(descrever(
                        &format!("{} tarefa(s) criada(s) para {rotulo}", tarefas.len()),
                        f.as_ref(),
                    )),
            )
            .await;

        let eventos = if tarefas.is_empty() {
            Vec::new()
        } else {
            vec![WorkflowEvent::TarefasCriadas {
                solicitacao_id: registro.solicitacao_id,
                remanejamento_id: registro_id,
                tarefas: tarefas.iter().map(|t| t.id).collect(),
                actor: actor.clone(),
                occurred_at: at,
            }]
        };
        Ok(Resultado::new(tarefas, eventos))
    }

    /// One task per training the contract's matrix requires for the
    /// employee's function. No matrix means no training task.
    async fn tarefas_de_treinamento(
        &self,
        registro: &RemanejamentoFuncionario,
        solicitacao: &SolicitacaoRemanejamento,
        limite: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> EngineResult<Vec<TarefaRemanejamento>> {
        let Some(contrato) = solicitacao.contrato_referencia() else {
            warn!(solicitacao_id = %solicitacao.id, "request has no contract, no training tasks");
            return Ok(Vec::new());
        };
        let funcionario = self.ctx.funcionario(registro.funcionario_id).await?;

        let treinamentos: BTreeSet<_> = self
            .ctx
            .catalogo
            .matriz_do_contrato(contrato)
            .await?
            .into_iter()
            .filter(|linha| linha.aplica_a(contrato, funcionario.funcao.as_deref()))
            .map(|linha| linha.treinamento_id)
            .collect();

        let mut tarefas = Vec::with_capacity(treinamentos.len());
        for id in treinamentos {
            match self.ctx.catalogo.treinamento(id).await? {
                Some(t) => tarefas.push(TarefaRemanejamento::de_treinamento(registro.id, &t, limite, at)),
                None => warn!(treinamento_id = %id, %contrato, "matrix references unknown training"),
            }
        }
        Ok(tarefas)
    }

    /// Create a single task with caller-supplied fields.
    #[instrument(skip(self, nova, actor), fields(registro_id = %nova.remanejamento_id), err)]
    pub async fn criar(
        &self,
        nova: NovaTarefa,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> EngineResult<Resultado<TarefaRemanejamento>> {
        let (registro, _) = self.registro_aberto(nova.remanejamento_id).await?;

        let setor_template = match nova.tarefa_padrao_id {
            Some(id) => Some(
                self.ctx
                    .catalogo
                    .tarefa_padrao(id)
                    .await?
                    .ok_or_else(|| DomainError::not_found(format!("tarefa padrão {id}")))?
                    .setor,
            ),
            None => None,
        };
        if let Some(id) = nova.treinamento_id {
            if self.ctx.catalogo.treinamento(id).await?.is_none() {
                return Err(DomainError::not_found(format!("treinamento {id}")).into());
            }
        }
        let setor = Setor::resolver(
            nova.treinamento_id.is_some(),
            setor_template,
            &nova.responsavel,
            &nova.tipo,
            nova.descricao.as_deref(),
        );

        let tarefa = TarefaRemanejamento::avulsa(nova, setor, self.prazo(at), at)?;
        self.ctx
            .workflow
            .inserir_tarefas(std::slice::from_ref(&tarefa))
            .await?;

        let f = self.ctx.funcionario_para_auditoria(registro.funcionario_id).await;
        self.ctx
            .auditoria
            .registrar(
                HistoricoRemanejamento::novo(registro.solicitacao_id, EntidadeAuditada::Tarefa, "tarefa", actor, at)
                    .do_registro(registro.id)
                    .da_tarefa(tarefa.id)
                    .valores(None, Some(tarefa.tipo.clone()))
                    .descricao(descrever(&format!("Tarefa {} criada", tarefa.tipo), f.as_ref())),
            )
            .await;

        let evento = WorkflowEvent::TarefasCriadas {
            solicitacao_id: registro.solicitacao_id,
            remanejamento_id: registro.id,
            tarefas: vec![tarefa.id],
            actor: actor.clone(),
            occurred_at: at,
        };
        Ok(Resultado::new(tarefa, vec![evento]))
    }

    /// Resolved setor of the task and whether completing it needs an expiry
    /// date.
    async fn exigencia_de_vencimento(
        &self,
        tarefa: &TarefaRemanejamento,
    ) -> EngineResult<(Option<Setor>, bool)> {
        let template = match tarefa.tarefa_padrao_id {
            Some(id) => self.ctx.catalogo.tarefa_padrao(id).await?,
            None => None,
        };
        let treinamento = match tarefa.treinamento_id {
            Some(id) => self.ctx.catalogo.treinamento(id).await?,
            None => None,
        };
        let setor = tarefa.setor_resolvido(template.as_ref().map(|t| t.setor));
        Ok((setor, vencimento_exigido(setor, treinamento.as_ref())))
    }

    /// Complete a task, enforcing the qualification-expiry rule of trainings
    /// with a finite validity.
    #[instrument(skip(self, actor), fields(%tarefa_id), err)]
    pub async fn concluir(
        &self,
        tarefa_id: TarefaId,
        data_vencimento: Option<NaiveDate>,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> EngineResult<Resultado<TarefaRemanejamento>> {
        let mut tarefa = self.ctx.tarefa(tarefa_id).await?;
        let registro = self.ctx.registro(tarefa.remanejamento_id).await?;

        let (setor, exigido) = self.exigencia_de_vencimento(&tarefa).await?;
        validar_vencimento(
            exigido,
            data_vencimento,
            at.date_naive(),
            self.ctx.config.validade_minima_dias,
        )?;

        let anterior = tarefa.concluir(setor, data_vencimento, at);
        self.ctx.workflow.salvar_tarefa(&tarefa).await?;

        self.ctx
            .auditoria
            .registrar_evento_tarefa(TarefaStatusEvento::novo(
                tarefa.id,
                registro.id,
                Some(anterior),
                StatusTarefa::Concluido,
                actor,
                at,
            ))
            .await;
        let f = self.ctx.funcionario_para_auditoria(registro.funcionario_id).await;
        self.ctx
            .auditoria
            .registrar(
                HistoricoRemanejamento::novo(registro.solicitacao_id, EntidadeAuditada::Tarefa, "status", actor, at)
                    .do_registro(registro.id)
                    .da_tarefa(tarefa.id)
                    .valores(Some(anterior.to_string()), Some(StatusTarefa::Concluido.to_string()))
                    .descricao(descrever(&format!("Tarefa {} concluída", tarefa.tipo), f.as_ref())),
            )
            .await;

        let evento = WorkflowEvent::TarefaConcluida {
            solicitacao_id: registro.solicitacao_id,
            remanejamento_id: registro.id,
            tarefa_id,
            actor: actor.clone(),
            occurred_at: at,
        };
        Ok(Resultado::new(tarefa, vec![evento]))
    }

    /// Generic update of status, notes and dates. Moving a task to CONCLUIDO
    /// here obeys the same expiry rule as `concluir`.
    #[instrument(skip(self, patch, actor), fields(%tarefa_id), err)]
    pub async fn atualizar(
        &self,
        tarefa_id: TarefaId,
        patch: &TarefaPatch,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> EngineResult<Resultado<TarefaRemanejamento>> {
        let mut tarefa = self.ctx.tarefa(tarefa_id).await?;
        let registro = self.ctx.registro(tarefa.remanejamento_id).await?;

        if patch.status == Some(StatusTarefa::Concluido) && tarefa.status != StatusTarefa::Concluido {
            let (_, exigido) = self.exigencia_de_vencimento(&tarefa).await?;
            validar_vencimento(
                exigido,
                patch.data_vencimento.or(tarefa.data_vencimento),
                at.date_naive(),
                self.ctx.config.validade_minima_dias,
            )?;
        }

        let outcome = tarefa.aplicar_patch(patch, actor, at)?;
        self.ctx.workflow.salvar_tarefa(&tarefa).await?;

        if outcome.status_alterado() || outcome.data_limite_alterada() {
            let f = self.ctx.funcionario_para_auditoria(registro.funcionario_id).await;
            if outcome.status_alterado() {
                self.ctx
                    .auditoria
                    .registrar_evento_tarefa(TarefaStatusEvento::novo(
                        tarefa.id,
                        registro.id,
                        Some(outcome.status_anterior),
                        outcome.status_novo,
                        actor,
                        at,
                    ))
                    .await;
                self.ctx
                    .auditoria
                    .registrar(
                        HistoricoRemanejamento::novo(registro.solicitacao_id, EntidadeAuditada::Tarefa, "status", actor, at)
                            .do_registro(registro.id)
                            .da_tarefa(tarefa.id)
                            .valores(
                                Some(outcome.status_anterior.to_string()),
                                Some(outcome.status_novo.to_string()),
                            )
                            .descricao(descrever(
                                &format!(
                                    "Tarefa {} alterada de {} para {}",
                                    tarefa.tipo, outcome.status_anterior, outcome.status_novo
                                ),
                                f.as_ref(),
                            )),
                    )
                    .await;
            }
            if outcome.data_limite_alterada() {
                self.ctx
                    .auditoria
                    .registrar(
                        HistoricoRemanejamento::novo(registro.solicitacao_id, EntidadeAuditada::Tarefa, "dataLimite", actor, at)
                            .do_registro(registro.id)
                            .da_tarefa(tarefa.id)
                            .valores(
                                outcome.data_limite_anterior.map(|d| d.to_rfc3339()),
                                outcome.data_limite_nova.map(|d| d.to_rfc3339()),
                            )
                            .descricao(descrever(
                                &format!("Prazo da tarefa {} alterado", tarefa.tipo),
                                f.as_ref(),
                            )),
                    )
                    .await;
            }
        }

        let evento = WorkflowEvent::TarefaAtualizada {
            solicitacao_id: registro.solicitacao_id,
            remanejamento_id: registro.id,
            tarefa_id,
            novo_status: outcome.status_novo,
            status_alterado: outcome.status_alterado(),
            recalcular: outcome.status_informado,
            actor: actor.clone(),
            occurred_at: at,
        };
        Ok(Resultado::new(tarefa, vec![evento]))
    }

    /// Delete a task. The audit row is built from the snapshot read before
    /// the delete and written after it.
    #[instrument(skip(self, actor), fields(%tarefa_id), err)]
    pub async fn excluir(
        &self,
        tarefa_id: TarefaId,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> EngineResult<Resultado<TarefaRemanejamento>> {
        let snapshot = self.ctx.tarefa(tarefa_id).await?;
        let registro = self.ctx.registro(snapshot.remanejamento_id).await?;

        if !self.ctx.workflow.excluir_tarefa(tarefa_id).await? {
            return Err(DomainError::not_found(format!("tarefa {tarefa_id}")).into());
        }

        let f = self.ctx.funcionario_para_auditoria(registro.funcionario_id).await;
        self.ctx
            .auditoria
            .registrar(
                HistoricoRemanejamento::novo(registro.solicitacao_id, EntidadeAuditada::Tarefa, "excluida", actor, at)
                    .do_registro(registro.id)
                    .da_tarefa(tarefa_id)
                    .valores(Some(snapshot.status.to_string()), None)
                    .descricao(descrever(&format!("Tarefa {} excluída", snapshot.tipo), f.as_ref())),
            )
            .await;

        let evento = WorkflowEvent::TarefaExcluida {
            solicitacao_id: registro.solicitacao_id,
            remanejamento_id: registro.id,
            tarefa_id,
            actor: actor.clone(),
            occurred_at: at,
        };
        Ok(Resultado::new(snapshot, vec![evento]))
    }
}
