//! Engine configuration loaded from environment variables.

use tracing::warn;

pub const DEFAULT_PRAZO_TAREFA_DIAS: u32 = 30;
pub const DEFAULT_VALIDADE_MINIMA_DIAS: u32 = 30;
pub const DEFAULT_JANELA_DEDUP_AUDITORIA_SEGUNDOS: u64 = 5;
pub const DEFAULT_MAX_TENTATIVAS_CONFLITO: u32 = 3;
pub const DEFAULT_LOTE_BACKFILL: u32 = 200;
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Deadline of a new checklist task, in days from creation.
    pub prazo_tarefa_dias: u32,
    /// Minimum distance between today and a required qualification expiry.
    pub validade_minima_dias: u32,
    /// Identical audit rows inside this window are written once.
    pub janela_deduplicacao_auditoria_segundos: u64,
    pub max_tentativas_conflito: u32,
    /// Archive qualifications inline when a task completes.
    pub arquivar_capacitacao_na_conclusao: bool,
    pub lote_backfill: u32,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            prazo_tarefa_dias: DEFAULT_PRAZO_TAREFA_DIAS,
            validade_minima_dias: DEFAULT_VALIDADE_MINIMA_DIAS,
            janela_deduplicacao_auditoria_segundos: DEFAULT_JANELA_DEDUP_AUDITORIA_SEGUNDOS,
            max_tentativas_conflito: DEFAULT_MAX_TENTATIVAS_CONFLITO,
            arquivar_capacitacao_na_conclusao: true,
            lote_backfill: DEFAULT_LOTE_BACKFILL,
            database_url: None,
            database_max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset keys take defaults; unparsable values
    /// are logged and also take defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        Self {
            prazo_tarefa_dias: parse_or(&lookup, "REMANEJAMENTO_PRAZO_TAREFA_DIAS", d.prazo_tarefa_dias),
            validade_minima_dias: parse_or(
                &lookup,
                "REMANEJAMENTO_VALIDADE_MINIMA_DIAS",
                d.validade_minima_dias,
            ),
            janela_deduplicacao_auditoria_segundos: parse_or(
                &lookup,
                "REMANEJAMENTO_JANELA_DEDUP_AUDITORIA_SEGUNDOS",
                d.janela_deduplicacao_auditoria_segundos,
            ),
            max_tentativas_conflito: parse_or(
                &lookup,
                "REMANEJAMENTO_MAX_TENTATIVAS_CONFLITO",
                d.max_tentativas_conflito,
            )
            .max(1),
            arquivar_capacitacao_na_conclusao: parse_bool_or(
                &lookup,
                "REMANEJAMENTO_ARQUIVAR_CAPACITACAO",
                d.arquivar_capacitacao_na_conclusao,
            ),
            lote_backfill: parse_or(&lookup, "REMANEJAMENTO_LOTE_BACKFILL", d.lote_backfill).max(1),
            database_url: lookup("DATABASE_URL").filter(|s| !s.trim().is_empty()),
            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                d.database_max_connections,
            ),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: core::str::FromStr + Copy + core::fmt::Debug,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, ?default, "invalid config value, using default");
            default
        }),
    }
}

fn parse_bool_or<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => default,
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" | "sim" => true,
            "0" | "false" | "no" | "off" | "nao" | "não" => false,
            _ => {
                warn!(key, value = %v, default, "invalid boolean config value, using default");
                default
            }
        },
    }
}
