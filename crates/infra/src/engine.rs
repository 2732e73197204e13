//! Engine facade: one entry point per workflow operation.
//!
//! Every mutating call commits through its service, then runs the returned
//! events through the pipeline so recompute, approval side effects,
//! conclusion and archiving happen before the call returns. The events of
//! the whole cascade are handed back with the result.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

use remanejamento_core::{FuncionarioId, RemanejamentoFuncionarioId, SolicitacaoId, TarefaId};
use remanejamento_events::{EventEnvelope, Subscription};
use remanejamento_workflow::{
    Actor, AtualizacaoPrestserv, DecisaoConclusao, FuncionarioCapacitacao, HistoricoRemanejamento,
    NovaSolicitacao, NovaTarefa, ObservacaoRemanejamentoFuncionario, RemanejamentoFuncionario,
    SolicitacaoRemanejamento, StatusSolicitacao, TarefaPatch, TarefaRemanejamento,
    TarefaStatusEvento, WorkflowEvent,
};

use crate::audit::AuditTrailRecorder;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::pipeline::{
    AprovacaoHandler, CapacitacaoHandler, ConclusaoHandler, ProgressoHandler, WorkflowBus,
    WorkflowPipeline,
};
use crate::services::{
    ApprovalGate, CapacitacaoArchiver, CompletionSupervisor, Consultas, Contexto, ProgressAggregator,
    RelatorioBackfill, Resultado, ResumoProgresso, SolicitacaoService, TaskLedger,
};
use crate::store::{
    AuditStore, CapacitacaoStore, CatalogStore, InMemoryStore, PostgresStore, StoreError, WorkflowStore,
};

/// The four persistence collaborators.
#[derive(Clone)]
pub struct Stores {
    pub workflow: Arc<dyn WorkflowStore>,
    pub catalogo: Arc<dyn CatalogStore>,
    pub capacitacoes: Arc<dyn CapacitacaoStore>,
    pub auditoria: Arc<dyn AuditStore>,
}

impl Stores {
    /// All four traits served by one backend.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: WorkflowStore + CatalogStore + CapacitacaoStore + AuditStore + 'static,
    {
        Self {
            workflow: store.clone(),
            catalogo: store.clone(),
            capacitacoes: store.clone(),
            auditoria: store,
        }
    }
}

pub struct RemanejamentoEngine {
    solicitacoes: SolicitacaoService,
    tarefas: TaskLedger,
    progresso: ProgressAggregator,
    prestserv: ApprovalGate,
    conclusao: CompletionSupervisor,
    capacitacao: CapacitacaoArchiver,
    consultas: Consultas,
    pipeline: WorkflowPipeline,
}

impl core::fmt::Debug for RemanejamentoEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RemanejamentoEngine")
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl RemanejamentoEngine {
    pub fn new(stores: Stores, config: EngineConfig) -> Self {
        let auditoria = Arc::new(AuditTrailRecorder::new(
            stores.auditoria.clone(),
            config.janela_deduplicacao_auditoria_segundos,
        ));
        let arquivar_inline = config.arquivar_capacitacao_na_conclusao;
        let ctx = Contexto {
            workflow: stores.workflow,
            catalogo: stores.catalogo,
            capacitacoes: stores.capacitacoes,
            auditoria,
            config: Arc::new(config),
        };

        let progresso = ProgressAggregator::new(ctx.clone());
        let prestserv = ApprovalGate::new(ctx.clone());
        let conclusao = CompletionSupervisor::new(ctx.clone());
        let capacitacao = CapacitacaoArchiver::new(ctx.clone());

        let mut pipeline = WorkflowPipeline::new(Arc::new(WorkflowBus::new()))
            .with_handler(Arc::new(ProgressoHandler::new(progresso.clone())))
            .with_handler(Arc::new(AprovacaoHandler::new(prestserv.clone())))
            .with_handler(Arc::new(ConclusaoHandler::new(conclusao.clone())));
        if arquivar_inline {
            pipeline = pipeline.with_handler(Arc::new(CapacitacaoHandler::new(capacitacao.clone())));
        }

        Self {
            solicitacoes: SolicitacaoService::new(ctx.clone()),
            tarefas: TaskLedger::new(ctx.clone()),
            consultas: Consultas::new(ctx, stores.auditoria),
            progresso,
            prestserv,
            conclusao,
            capacitacao,
            pipeline,
        }
    }

    /// Engine over a fresh in-memory store; the store is returned for seeding
    /// reference data.
    pub fn in_memory(config: EngineConfig) -> (Self, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        (Self::new(Stores::shared(store.clone()), config), store)
    }

    /// Engine over Postgres using `DATABASE_URL` from the config.
    pub async fn postgres(config: EngineConfig) -> EngineResult<Self> {
        let url = config
            .database_url
            .clone()
            .ok_or_else(|| StoreError::Backend("DATABASE_URL is not set".into()))?;
        let store = PostgresStore::connect(&url, config.database_max_connections).await?;
        store.aplicar_schema().await?;
        info!(max_connections = config.database_max_connections, "connected to postgres");
        Ok(Self::new(Stores::shared(Arc::new(store)), config))
    }

    /// Stream of every processed event, wrapped with a sequence number.
    pub fn subscribe(&self) -> Subscription<EventEnvelope<WorkflowEvent>> {
        self.pipeline.subscribe()
    }

    async fn cascata<T>(&self, r: Resultado<T>) -> Resultado<T> {
        let eventos = self.pipeline.processar(r.eventos).await;
        Resultado::new(r.valor, eventos)
    }

    // Requests

    pub async fn criar_solicitacao(
        &self,
        cmd: NovaSolicitacao,
    ) -> EngineResult<Resultado<(SolicitacaoRemanejamento, Vec<RemanejamentoFuncionario>)>> {
        let r = self.solicitacoes.criar(cmd).await?;
        Ok(self.cascata(r).await)
    }

    pub async fn atualizar_status_solicitacao(
        &self,
        id: SolicitacaoId,
        novo: StatusSolicitacao,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> EngineResult<Resultado<SolicitacaoRemanejamento>> {
        let r = self.solicitacoes.atualizar_status(id, novo, actor, at).await?;
        Ok(self.cascata(r).await)
    }

    pub async fn adicionar_observacao(
        &self,
        registro_id: RemanejamentoFuncionarioId,
        texto: &str,
        autor: &Actor,
        at: DateTime<Utc>,
    ) -> EngineResult<ObservacaoRemanejamentoFuncionario> {
        self.solicitacoes.adicionar_observacao(registro_id, texto, autor, at).await
    }

    pub async fn listar_observacoes(
        &self,
        registro_id: RemanejamentoFuncionarioId,
    ) -> EngineResult<Vec<ObservacaoRemanejamentoFuncionario>> {
        self.consultas.observacoes(registro_id).await
    }

    // Tasks

    pub async fn criar_tarefas_em_lote(
        &self,
        registro_id: RemanejamentoFuncionarioId,
        setores: &[&str],
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> EngineResult<Resultado<Vec<TarefaRemanejamento>>> {
        let r = self.tarefas.criar_em_lote(registro_id, setores, actor, at).await?;
        Ok(self.cascata(r).await)
    }

    pub async fn criar_tarefa(
        &self,
        nova: NovaTarefa,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> EngineResult<Resultado<TarefaRemanejamento>> {
        let r = self.tarefas.criar(nova, actor, at).await?;
        Ok(self.cascata(r).await)
    }

    pub async fn concluir_tarefa(
        &self,
        tarefa_id: TarefaId,
        data_vencimento: Option<NaiveDate>,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> EngineResult<Resultado<TarefaRemanejamento>> {
        let r = self.tarefas.concluir(tarefa_id, data_vencimento, actor, at).await?;
        Ok(self.cascata(r).await)
    }

    pub async fn atualizar_tarefa(
        &self,
        tarefa_id: TarefaId,
        patch: &TarefaPatch,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> EngineResult<Resultado<TarefaRemanejamento>> {
        let r = self.tarefas.atualizar(tarefa_id, patch, actor, at).await?;
        Ok(self.cascata(r).await)
    }

    pub async fn excluir_tarefa(
        &self,
        tarefa_id: TarefaId,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> EngineResult<Resultado<TarefaRemanejamento>> {
        let r = self.tarefas.excluir(tarefa_id, actor, at).await?;
        Ok(self.cascata(r).await)
    }

    /// Explicit recompute, for records whose tasks changed outside the engine.
    pub async fn recalcular_status_tarefas(
        &self,
        registro_id: RemanejamentoFuncionarioId,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> EngineResult<Resultado<RemanejamentoFuncionario>> {
        let r = self.progresso.recalcular(registro_id, actor, at).await?;
        let Resultado { eventos, .. } = self.cascata(r).await;
        let registro = self.consultas.registro(registro_id).await?;
        Ok(Resultado::new(registro, eventos))
    }

    // Approval gate

    pub async fn atualizar_prestserv(
        &self,
        registro_id: RemanejamentoFuncionarioId,
        upd: &AtualizacaoPrestserv,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> EngineResult<Resultado<RemanejamentoFuncionario>> {
        let r = self.prestserv.atualizar(registro_id, upd, actor, at).await?;
        Ok(self.cascata(r).await)
    }

    // Completion

    pub async fn verificar_conclusao(
        &self,
        id: SolicitacaoId,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> EngineResult<Resultado<DecisaoConclusao>> {
        let r = self.conclusao.verificar(id, actor, at).await?;
        Ok(self.cascata(r).await)
    }

    // Qualifications

    pub async fn arquivar_capacitacao(
        &self,
        tarefa_id: TarefaId,
        at: DateTime<Utc>,
    ) -> EngineResult<Option<FuncionarioCapacitacao>> {
        self.capacitacao.arquivar_tarefa(tarefa_id, at).await
    }

    pub async fn backfill_capacitacoes(&self, at: DateTime<Utc>) -> EngineResult<RelatorioBackfill> {
        self.capacitacao.backfill(at).await
    }

    // Reporting reads

    pub async fn solicitacao(&self, id: SolicitacaoId) -> EngineResult<SolicitacaoRemanejamento> {
        self.consultas.solicitacao(id).await
    }

    pub async fn registros_da_solicitacao(
        &self,
        id: SolicitacaoId,
    ) -> EngineResult<Vec<RemanejamentoFuncionario>> {
        self.consultas.registros_da_solicitacao(id).await
    }

    pub async fn registro(&self, id: RemanejamentoFuncionarioId) -> EngineResult<RemanejamentoFuncionario> {
        self.consultas.registro(id).await
    }

    pub async fn tarefas_do_remanejamento(
        &self,
        id: RemanejamentoFuncionarioId,
    ) -> EngineResult<Vec<TarefaRemanejamento>> {
        self.consultas.tarefas_do_remanejamento(id).await
    }

    pub async fn resumo_progresso(
        &self,
        id: RemanejamentoFuncionarioId,
        agora: DateTime<Utc>,
    ) -> EngineResult<ResumoProgresso> {
        self.consultas.resumo_progresso(id, agora).await
    }

    pub async fn tarefas_vencidas(&self, agora: DateTime<Utc>) -> EngineResult<Vec<TarefaRemanejamento>> {
        self.consultas.tarefas_vencidas(agora).await
    }

    pub async fn historico_da_solicitacao(
        &self,
        id: SolicitacaoId,
    ) -> EngineResult<Vec<HistoricoRemanejamento>> {
        self.consultas.historico_da_solicitacao(id).await
    }

    pub async fn eventos_da_tarefa(&self, id: TarefaId) -> EngineResult<Vec<TarefaStatusEvento>> {
        self.consultas.eventos_da_tarefa(id).await
    }

    pub async fn capacitacoes_do_funcionario(
        &self,
        id: FuncionarioId,
    ) -> EngineResult<Vec<FuncionarioCapacitacao>> {
        self.consultas.capacitacoes_do_funcionario(id).await
    }
}
