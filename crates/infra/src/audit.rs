//! Audit trail recorder.
//!
//! Writes are fire-and-forget: a failed history write is logged and never
//! reaches the caller, so it can't undo or block the transition it describes.
//! Callers only record after the mutation is committed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use remanejamento_workflow::{HistoricoRemanejamento, SujeitoAuditoria, TarefaStatusEvento};

use crate::store::AuditStore;

pub struct AuditTrailRecorder {
    store: Arc<dyn AuditStore>,
    janela: Duration,
    /// Last row written per subject, while it is inside the window.
    ultimos: Mutex<HashMap<SujeitoAuditoria, HistoricoRemanejamento>>,
}

impl AuditTrailRecorder {
    /// `janela_segundos = 0` disables deduplication.
    pub fn new(store: Arc<dyn AuditStore>, janela_segundos: u64) -> Self {
        Self {
            store,
            janela: Duration::seconds(i64::try_from(janela_segundos).unwrap_or(i64::MAX / 1000)),
            ultimos: Mutex::new(HashMap::new()),
        }
    }

    /// Append one history row. Returns whether a row was written.
    pub async fn registrar(&self, historico: HistoricoRemanejamento) -> bool {
        if self.duplicado(&historico) {
            debug!(
                solicitacao_id = %historico.solicitacao_id,
                campo = %historico.campo_alterado,
                "skipping duplicate audit entry"
            );
            return false;
        }

        match self.store.inserir_historico(&historico).await {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    %error,
                    solicitacao_id = %historico.solicitacao_id,
                    entidade = %historico.entidade,
                    campo = %historico.campo_alterado,
                    "audit write failed"
                );
                false
            }
        }
    }

    pub async fn registrar_evento_tarefa(&self, evento: TarefaStatusEvento) -> bool {
        match self.store.inserir_evento_tarefa(&evento).await {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, tarefa_id = %evento.tarefa_id, "task status event write failed");
                false
            }
        }
    }

    /// A row is a duplicate only when it repeats the latest row of the same
    /// subject. A→B→A→B inside the window is four distinct transitions.
    fn duplicado(&self, historico: &HistoricoRemanejamento) -> bool {
        if self.janela <= Duration::zero() {
            return false;
        }
        let Ok(mut ultimos) = self.ultimos.lock() else {
            return false;
        };

        let agora = historico.data_acao;
        ultimos.retain(|_, ultimo| agora - ultimo.data_acao < self.janela);

        let sujeito = historico.sujeito();
        match ultimos.get(&sujeito) {
            Some(ultimo) if agora >= ultimo.data_acao && ultimo.repete(historico) => true,
            _ => {
                ultimos.insert(sujeito, historico.clone());
                false
            }
        }
    }
}

impl core::fmt::Debug for AuditTrailRecorder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuditTrailRecorder")
            .field("janela", &self.janela)
            .finish_non_exhaustive()
    }
}
