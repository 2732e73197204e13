//! Capacitação archiver: turns completed department tasks into durable
//! qualification records.
//!
//! Runs inline after a task completes and as the offline backfill job.

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use remanejamento_core::TarefaId;
use remanejamento_workflow::texto::iguais;
use remanejamento_workflow::{
    FuncionarioCapacitacao, RemanejamentoFuncionario, Setor, StatusTarefa, TarefaPadrao,
    TarefaRemanejamento, Treinamento, candidata_de_tarefa, registro_elegivel,
};

use super::Contexto;
use crate::error::EngineResult;

/// Counters of one backfill run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelatorioBackfill {
    pub registros_lidos: usize,
    pub registros_elegiveis: usize,
    pub tarefas_avaliadas: usize,
    pub capacitacoes_gravadas: usize,
    pub falhas: usize,
}

#[derive(Debug, Clone)]
pub struct CapacitacaoArchiver {
    ctx: Contexto,
}

impl CapacitacaoArchiver {
    pub fn new(ctx: Contexto) -> Self {
        Self { ctx }
    }

    /// Archive one task. `None` when the task does not qualify or nothing
    /// changed.
    #[instrument(skip(self), fields(%tarefa_id), err)]
    pub async fn arquivar_tarefa(
        &self,
        tarefa_id: TarefaId,
        at: DateTime<Utc>,
    ) -> EngineResult<Option<FuncionarioCapacitacao>> {
        let tarefa = self.ctx.tarefa(tarefa_id).await?;
        let registro = self.ctx.registro(tarefa.remanejamento_id).await?;
        self.arquivar(&tarefa, &registro, at).await
    }

    async fn arquivar(
        &self,
        tarefa: &TarefaRemanejamento,
        registro: &RemanejamentoFuncionario,
        at: DateTime<Utc>,
    ) -> EngineResult<Option<FuncionarioCapacitacao>> {
        if tarefa.status != StatusTarefa::Concluido {
            return Ok(None);
        }
        let Some(setor) = Setor::do_responsavel(&tarefa.responsavel) else {
            debug!(tarefa_id = %tarefa.id, responsavel = %tarefa.responsavel, "task outside qualifying departments");
            return Ok(None);
        };

        let treinamento = self.resolver_treinamento(tarefa, setor).await?;
        let template = self.resolver_template(tarefa, setor).await?;

        let Some(candidata) = candidata_de_tarefa(
            tarefa,
            registro.funcionario_id,
            treinamento.as_ref(),
            template.as_ref(),
        ) else {
            return Ok(None);
        };

        match self.ctx.capacitacoes.capacitacao_por_chave(&candidata.chave()).await? {
            Some(mut existente) => {
                if !existente.mesclar(&candidata, at) {
                    debug!(capacitacao_id = %existente.id, "qualification already up to date");
                    return Ok(None);
                }
                self.ctx.capacitacoes.salvar_capacitacao(&existente).await?;
                Ok(Some(existente))
            }
            None => {
                let nova = FuncionarioCapacitacao::nova(&candidata, at);
                self.ctx.capacitacoes.salvar_capacitacao(&nova).await?;
                info!(
                    funcionario_id = %nova.funcionario_id,
                    tipo = %nova.tipo,
                    "qualification recorded"
                );
                Ok(Some(nova))
            }
        }
    }

    /// Linked training, or a case-insensitive name match for TREINAMENTO tasks.
    async fn resolver_treinamento(
        &self,
        tarefa: &TarefaRemanejamento,
        setor: Setor,
    ) -> EngineResult<Option<Treinamento>> {
        if let Some(id) = tarefa.treinamento_id {
            return Ok(self.ctx.catalogo.treinamento(id).await?);
        }
        if setor != Setor::Treinamento {
            return Ok(None);
        }
        Ok(self.ctx.catalogo.treinamento_por_nome(&tarefa.tipo).await?)
    }

    /// Linked template, or an active template of the same department and type.
    async fn resolver_template(
        &self,
        tarefa: &TarefaRemanejamento,
        setor: Setor,
    ) -> EngineResult<Option<TarefaPadrao>> {
        if let Some(id) = tarefa.tarefa_padrao_id {
            return Ok(self.ctx.catalogo.tarefa_padrao(id).await?);
        }
        if setor == Setor::Treinamento {
            return Ok(None);
        }
        let ativos = self.ctx.catalogo.tarefas_padrao_ativas(setor).await?;
        Ok(ativos.into_iter().find(|t| iguais(&t.tipo, &tarefa.tipo)))
    }

    /// Walk every record in chunks and archive the completed tasks of the
    /// eligible ones. Per-task failures are counted and logged, not fatal.
    #[instrument(skip(self), err)]
    pub async fn backfill(&self, at: DateTime<Utc>) -> EngineResult<RelatorioBackfill> {
        let lote = self.ctx.config.lote_backfill.max(1);
        let mut relatorio = RelatorioBackfill::default();
        let mut offset = 0u64;

        loop {
            let pagina = self.ctx.workflow.registros_pagina(offset, lote).await?;
            if pagina.is_empty() {
                break;
            }
            offset += pagina.len() as u64;
            relatorio.registros_lidos += pagina.len();

            for registro in &pagina {
                let solicitacao = match self.ctx.solicitacao(registro.solicitacao_id).await {
                    Ok(s) => s,
                    Err(error) => {
                        warn!(%error, registro_id = %registro.id, "skipping record without request");
                        relatorio.falhas += 1;
                        continue;
                    }
                };
                if !registro_elegivel(registro, &solicitacao) {
                    continue;
                }
                relatorio.registros_elegiveis += 1;

                let tarefas = self.ctx.workflow.tarefas_do_registro(registro.id).await?;
                for tarefa in tarefas.iter().filter(|t| t.status == StatusTarefa::Concluido) {
                    relatorio.tarefas_avaliadas += 1;
                    match self.arquivar(tarefa, registro, at).await {
                        Ok(Some(_)) => relatorio.capacitacoes_gravadas += 1,
                        Ok(None) => {}
                        Err(error) => {
                            warn!(%error, tarefa_id = %tarefa.id, "failed to archive qualification");
                            relatorio.falhas += 1;
                        }
                    }
                }
            }

            if pagina.len() < lote as usize {
                break;
            }
        }

        info!(?relatorio, "qualification backfill finished");
        Ok(relatorio)
    }
}
