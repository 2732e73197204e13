//! Offline job: archive qualifications of every completed task of approved
//! records. Safe to re-run; already archived qualifications are left as is.

use anyhow::Context;
use chrono::Utc;

use remanejamento_infra::{EngineConfig, RemanejamentoEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    remanejamento_observability::init();

    let config = EngineConfig::from_env();
    tracing::info!(lote = config.lote_backfill, "starting qualification backfill");

    let engine = RemanejamentoEngine::postgres(config)
        .await
        .context("failed to open the workflow database")?;

    let relatorio = engine
        .backfill_capacitacoes(Utc::now())
        .await
        .context("qualification backfill aborted")?;

    if relatorio.falhas > 0 {
        tracing::warn!(falhas = relatorio.falhas, "backfill finished with failures");
    }
    tracing::info!(
        registros_lidos = relatorio.registros_lidos,
        registros_elegiveis = relatorio.registros_elegiveis,
        tarefas_avaliadas = relatorio.tarefas_avaliadas,
        capacitacoes_gravadas = relatorio.capacitacoes_gravadas,
        "backfill done"
    );
    Ok(())
}
