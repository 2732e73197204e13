//! Cascade of workflow events.
//!
//! ```text
//! task mutation ─▶ progress ─▶ (record ready) ─▶ completion
//! prestserv APROVADO ─▶ approval side effects ─▶ (record ready) ─▶ completion
//! task concluded ─▶ capacitação archiver
//! ```
//!
//! Events are drained FIFO. Each one is published on the bus for reporting
//! subscribers and then offered to every handler; follow-up events go to the
//! back of the queue. Everything here runs after the primary mutation has
//! been committed, so failures are logged and never reach the caller.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::{debug, warn};

use remanejamento_events::{Event, EventBus, EventEnvelope, EventHandler, InMemoryEventBus, Subscription};
use remanejamento_workflow::{StatusPrestserv, WorkflowEvent};

use crate::services::{
    ApprovalGate, CapacitacaoArchiver, CompletionSupervisor, ProgressAggregator,
};

/// Safety valve against a handler cycle.
const MAX_EVENTOS_POR_OPERACAO: usize = 10_000;

pub type WorkflowBus = InMemoryEventBus<EventEnvelope<WorkflowEvent>>;

pub struct WorkflowPipeline {
    bus: Arc<WorkflowBus>,
    sequencia: AtomicU64,
    handlers: Vec<Arc<dyn EventHandler<WorkflowEvent>>>,
}

impl core::fmt::Debug for WorkflowPipeline {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WorkflowPipeline")
            .field("handlers", &self.handlers.iter().map(|h| h.name()).collect::<Vec<_>>())
            .field("sequencia", &self.sequencia.load(Ordering::Relaxed))
            .finish()
    }
}

impl WorkflowPipeline {
    pub fn new(bus: Arc<WorkflowBus>) -> Self {
        Self {
            bus,
            sequencia: AtomicU64::new(0),
            handlers: Vec::new(),
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn EventHandler<WorkflowEvent>>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn subscribe(&self) -> Subscription<EventEnvelope<WorkflowEvent>> {
        self.bus.subscribe()
    }

    /// Drain `iniciais` and every follow-up. Returns all events processed,
    /// in processing order.
    pub async fn processar(&self, iniciais: Vec<WorkflowEvent>) -> Vec<WorkflowEvent> {
        let mut fila: VecDeque<WorkflowEvent> = iniciais.into();
        let mut processados = Vec::new();

        while let Some(evento) = fila.pop_front() {
            if processados.len() >= MAX_EVENTOS_POR_OPERACAO {
                warn!(pendentes = fila.len() + 1, "event cascade limit reached, dropping the rest");
                break;
            }

            let seq = self.sequencia.fetch_add(1, Ordering::SeqCst) + 1;
            if let Err(error) = self.bus.publish(EventEnvelope::wrap(seq, evento.clone())) {
                warn!(?error, event_type = evento.event_type(), "event publication failed");
            }

            for handler in &self.handlers {
                match handler.handle(&evento).await {
                    Ok(seguintes) => {
                        if !seguintes.is_empty() {
                            debug!(
                                handler = handler.name(),
                                event_type = evento.event_type(),
                                seguintes = seguintes.len(),
                                "handler emitted follow-up events"
                            );
                        }
                        fila.extend(seguintes);
                    }
                    Err(error) => warn!(
                        handler = handler.name(),
                        event_type = evento.event_type(),
                        solicitacao_id = %evento.solicitacao_id(),
                        error = %error,
                        "event handler failed"
                    ),
                }
            }
            processados.push(evento);
        }
        processados
    }
}

/// Recomputes `status_tarefas` after task mutations.
#[derive(Debug)]
pub struct ProgressoHandler {
    agregador: ProgressAggregator,
}

impl ProgressoHandler {
    pub fn new(agregador: ProgressAggregator) -> Self {
        Self { agregador }
    }
}

#[async_trait]
impl EventHandler<WorkflowEvent> for ProgressoHandler {
    fn name(&self) -> &'static str {
        "progresso"
    }

    async fn handle(&self, event: &WorkflowEvent) -> anyhow::Result<Vec<WorkflowEvent>> {
        let Some(registro_id) = event.registro_a_recalcular() else {
            return Ok(Vec::new());
        };
        let r = self
            .agregador
            .recalcular(registro_id, event.actor(), event.occurred_at())
            .await?;
        Ok(r.eventos)
    }
}

/// Applies the side effects of a Prestserv approval.
#[derive(Debug)]
pub struct AprovacaoHandler {
    gate: ApprovalGate,
}

impl AprovacaoHandler {
    pub fn new(gate: ApprovalGate) -> Self {
        Self { gate }
    }
}

#[async_trait]
impl EventHandler<WorkflowEvent> for AprovacaoHandler {
    fn name(&self) -> &'static str {
        "aprovacao"
    }

    async fn handle(&self, event: &WorkflowEvent) -> anyhow::Result<Vec<WorkflowEvent>> {
        match event {
            WorkflowEvent::PrestservAlterado {
                remanejamento_id,
                anterior,
                novo: StatusPrestserv::Aprovado,
                actor,
                occurred_at,
                ..
            } if *anterior != StatusPrestserv::Aprovado => Ok(self
                .gate
                .efetivar_aprovacao(*remanejamento_id, actor, *occurred_at)
                .await?),
            _ => Ok(Vec::new()),
        }
    }
}

/// Runs the completion supervisor when a record becomes ready.
#[derive(Debug)]
pub struct ConclusaoHandler {
    supervisor: CompletionSupervisor,
}

impl ConclusaoHandler {
    pub fn new(supervisor: CompletionSupervisor) -> Self {
        Self { supervisor }
    }
}

#[async_trait]
impl EventHandler<WorkflowEvent> for ConclusaoHandler {
    fn name(&self) -> &'static str {
        "conclusao"
    }

    async fn handle(&self, event: &WorkflowEvent) -> anyhow::Result<Vec<WorkflowEvent>> {
        let WorkflowEvent::RemanejamentoPronto {
            solicitacao_id,
            actor,
            occurred_at,
            ..
        } = event
        else {
            return Ok(Vec::new());
        };
        let r = self.supervisor.verificar(*solicitacao_id, actor, *occurred_at).await?;
        Ok(r.eventos)
    }
}

/// Archives the qualification of a task that just reached CONCLUIDO.
#[derive(Debug)]
pub struct CapacitacaoHandler {
    archiver: CapacitacaoArchiver,
}

impl CapacitacaoHandler {
    pub fn new(archiver: CapacitacaoArchiver) -> Self {
        Self { archiver }
    }
}

#[async_trait]
impl EventHandler<WorkflowEvent> for CapacitacaoHandler {
    fn name(&self) -> &'static str {
        "capacitacao"
    }

    async fn handle(&self, event: &WorkflowEvent) -> anyhow::Result<Vec<WorkflowEvent>> {
        if let Some(tarefa_id) = event.tarefa_concluida() {
            self.archiver.arquivar_tarefa(tarefa_id, event.occurred_at()).await?;
        }
        Ok(Vec::new())
    }
}
