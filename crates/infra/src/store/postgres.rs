//! Postgres-backed implementation of the store traits.
//!
//! Schema: `migrations/0001_remanejamento.sql` (applied by
//! `PostgresStore::aplicar_schema`).
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `NotFound` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / RowNotFound / Other | N/A | `Backend` |
//!
//! Versioned writes use `UPDATE ... WHERE version = $n RETURNING version`; a
//! missing row after that is told apart from a stale version with a follow-up
//! read.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row};
use tracing::instrument;

use remanejamento_core::{
    ContratoId, DomainError, ExpectedVersion, FuncionarioId, RemanejamentoFuncionarioId,
    SolicitacaoId, TarefaId, TarefaPadraoId, TreinamentoId,
};
use remanejamento_workflow::texto::normalizar;
use remanejamento_workflow::{
    ChaveCapacitacao, Contrato, Funcionario, FuncionarioCapacitacao, HistoricoRemanejamento,
    MatrizTreinamento, ObservacaoRemanejamentoFuncionario, RemanejamentoFuncionario, Setor,
    SolicitacaoRemanejamento, TarefaPadrao, TarefaRemanejamento, TarefaStatusEvento, Treinamento,
};

use super::{
    AuditStore, CapacitacaoStore, CatalogStore, StoreError, StoreResult, WorkflowStore,
};

const SCHEMA: &str = include_str!("../../migrations/0001_remanejamento.sql");

const SOLICITACAO_COLS: &str = "id, tipo, contrato_origem_id, contrato_destino_id, status, prioridade, \
    solicitado_por, justificativa, data_solicitacao, data_analise, data_aprovacao, data_conclusao, \
    concluido_por, version";

const REGISTRO_COLS: &str = "id, funcionario_id, solicitacao_id, status_tarefas, status_prestserv, \
    status_funcionario, data_rascunho_criado, data_submetido, data_resposta, observacoes_prestserv, \
    criado_em, atualizado_em, version";

const TAREFA_COLS: &str = "id, remanejamento_id, tarefa_padrao_id, treinamento_id, setor, tipo, descricao, \
    responsavel, status, prioridade, data_criacao, data_limite, data_vencimento, data_conclusao, observacoes";

const CAPACITACAO_COLS: &str = "id, funcionario_id, tarefa_padrao_id, treinamento_id, tipo, responsavel, \
    descricao, data_conclusao, data_vencimento, origem_remanejamento_id, criado_em, atualizado_em";

const HISTORICO_COLS: &str = "id, solicitacao_id, remanejamento_funcionario_id, tarefa_id, entidade, \
    campo_alterado, valor_anterior, valor_novo, descricao, usuario_responsavel_id, usuario_responsavel, \
    data_acao, observacoes";

const EVENTO_COLS: &str = "id, tarefa_id, remanejamento_funcionario_id, status_anterior, status_novo, \
    usuario_responsavel_id, usuario_responsavel, data_evento, observacoes";

/// Postgres-backed store.
///
/// `Send + Sync`; all access goes through the SQLx connection pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create missing tables and indexes.
    #[instrument(skip(self), err)]
    pub async fn aplicar_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("aplicar_schema", e))?;
        Ok(())
    }

    async fn versao_atual(&self, tabela: &str, id: impl IdBind) -> StoreResult<Option<u64>> {
        let sql = format!("SELECT version FROM {tabela} WHERE id = $1");
        let row = id
            .bind_to(sqlx::query(&sql))
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("versao_atual", e))?;
        row.map(|r| col::<i64>(&r, "version").map(|v| v as u64)).transpose()
    }

    /// Turn a versioned UPDATE that matched no row into the right error.
    async fn falha_de_versao(
        &self,
        tabela: &str,
        id: impl IdBind + Copy + core::fmt::Display,
        expected: ExpectedVersion,
    ) -> StoreError {
        match self.versao_atual(tabela, id).await {
            Ok(Some(atual)) => StoreError::Conflict(format!(
                "{tabela} {id}: expected {expected:?}, found {atual}"
            )),
            Ok(None) => StoreError::NotFound(format!("{tabela} {id}")),
            Err(e) => e,
        }
    }
}

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>;

/// Binds a typed id as its column representation.
trait IdBind {
    fn bind_to<'q>(self, q: PgQuery<'q>) -> PgQuery<'q>;
}

impl IdBind for SolicitacaoId {
    fn bind_to<'q>(self, q: PgQuery<'q>) -> PgQuery<'q> {
        q.bind(self.get())
    }
}

impl IdBind for RemanejamentoFuncionarioId {
    fn bind_to<'q>(self, q: PgQuery<'q>) -> PgQuery<'q> {
        q.bind(*self.as_uuid())
    }
}

fn esperado(expected: ExpectedVersion) -> Option<i64> {
    match expected {
        ExpectedVersion::Any => None,
        ExpectedVersion::Exact(v) => Some(v as i64),
    }
}

fn col<'r, T>(row: &'r PgRow, name: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Backend(format!("failed to read column {name}: {e}")))
}

fn label<T>(row: &PgRow, name: &str) -> StoreResult<T>
where
    T: core::str::FromStr<Err = DomainError>,
{
    let raw: String = col(row, name)?;
    raw.parse()
        .map_err(|e: DomainError| StoreError::Backend(format!("column {name}: {e}")))
}

fn opt_label<T>(row: &PgRow, name: &str) -> StoreResult<Option<T>>
where
    T: core::str::FromStr<Err = DomainError>,
{
    let raw: Option<String> = col(row, name)?;
    raw.map(|s| {
        s.parse()
            .map_err(|e: DomainError| StoreError::Backend(format!("column {name}: {e}")))
    })
    .transpose()
}

fn json<T: DeserializeOwned>(row: &PgRow, name: &str) -> StoreResult<T> {
    let v: serde_json::Value = col(row, name)?;
    serde_json::from_value(v)
        .map_err(|e| StoreError::Backend(format!("column {name}: invalid json: {e}")))
}

fn opt_json<T: DeserializeOwned>(row: &PgRow, name: &str) -> StoreResult<Option<T>> {
    let v: Option<serde_json::Value> = col(row, name)?;
    v.map(|v| {
        serde_json::from_value(v)
            .map_err(|e| StoreError::Backend(format!("column {name}: invalid json: {e}")))
    })
    .transpose()
}

fn to_json<T: Serialize>(value: &T) -> StoreResult<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| StoreError::Backend(format!("json serialization failed: {e}")))
}

fn solicitacao_from_row(row: &PgRow) -> StoreResult<SolicitacaoRemanejamento> {
    Ok(SolicitacaoRemanejamento {
        id: SolicitacaoId(col(row, "id")?),
        tipo: label(row, "tipo")?,
        contrato_origem_id: col::<Option<i64>>(row, "contrato_origem_id")?.map(ContratoId),
        contrato_destino_id: col::<Option<i64>>(row, "contrato_destino_id")?.map(ContratoId),
        status: label(row, "status")?,
        prioridade: label(row, "prioridade")?,
        solicitado_por: json(row, "solicitado_por")?,
        justificativa: col(row, "justificativa")?,
        data_solicitacao: col(row, "data_solicitacao")?,
        data_analise: col(row, "data_analise")?,
        data_aprovacao: col(row, "data_aprovacao")?,
        data_conclusao: col(row, "data_conclusao")?,
        concluido_por: opt_json(row, "concluido_por")?,
        version: col::<i64>(row, "version")? as u64,
    })
}

fn registro_from_row(row: &PgRow) -> StoreResult<RemanejamentoFuncionario> {
    Ok(RemanejamentoFuncionario {
        id: RemanejamentoFuncionarioId::from_uuid(col(row, "id")?),
        funcionario_id: FuncionarioId(col(row, "funcionario_id")?),
        solicitacao_id: SolicitacaoId(col(row, "solicitacao_id")?),
        status_tarefas: label(row, "status_tarefas")?,
        status_prestserv: label(row, "status_prestserv")?,
        status_funcionario: label(row, "status_funcionario")?,
        data_rascunho_criado: col(row, "data_rascunho_criado")?,
        data_submetido: col(row, "data_submetido")?,
        data_resposta: col(row, "data_resposta")?,
        observacoes_prestserv: col(row, "observacoes_prestserv")?,
        criado_em: col(row, "criado_em")?,
        atualizado_em: col(row, "atualizado_em")?,
        version: col::<i64>(row, "version")? as u64,
    })
}

fn tarefa_from_row(row: &PgRow) -> StoreResult<TarefaRemanejamento> {
    Ok(TarefaRemanejamento {
        id: TarefaId::from_uuid(col(row, "id")?),
        remanejamento_id: RemanejamentoFuncionarioId::from_uuid(col(row, "remanejamento_id")?),
        tarefa_padrao_id: col::<Option<i64>>(row, "tarefa_padrao_id")?.map(TarefaPadraoId),
        treinamento_id: col::<Option<i64>>(row, "treinamento_id")?.map(TreinamentoId),
        setor: opt_label(row, "setor")?,
        tipo: col(row, "tipo")?,
        descricao: col(row, "descricao")?,
        responsavel: col(row, "responsavel")?,
        status: label(row, "status")?,
        prioridade: label(row, "prioridade")?,
        data_criacao: col(row, "data_criacao")?,
        data_limite: col(row, "data_limite")?,
        data_vencimento: col(row, "data_vencimento")?,
        data_conclusao: col(row, "data_conclusao")?,
        observacoes: col(row, "observacoes")?,
    })
}

fn capacitacao_from_row(row: &PgRow) -> StoreResult<FuncionarioCapacitacao> {
    Ok(FuncionarioCapacitacao {
        id: remanejamento_core::CapacitacaoId::from_uuid(col(row, "id")?),
        funcionario_id: FuncionarioId(col(row, "funcionario_id")?),
        tarefa_padrao_id: col::<Option<i64>>(row, "tarefa_padrao_id")?.map(TarefaPadraoId),
        treinamento_id: col::<Option<i64>>(row, "treinamento_id")?.map(TreinamentoId),
        tipo: col(row, "tipo")?,
        responsavel: col(row, "responsavel")?,
        descricao: col(row, "descricao")?,
        data_conclusao: col(row, "data_conclusao")?,
        data_vencimento: col(row, "data_vencimento")?,
        origem_remanejamento_id: col::<Option<uuid::Uuid>>(row, "origem_remanejamento_id")?
            .map(RemanejamentoFuncionarioId::from_uuid),
        criado_em: col(row, "criado_em")?,
        atualizado_em: col(row, "atualizado_em")?,
    })
}

fn historico_from_row(row: &PgRow) -> StoreResult<HistoricoRemanejamento> {
    Ok(HistoricoRemanejamento {
        id: remanejamento_core::HistoricoId::from_uuid(col(row, "id")?),
        solicitacao_id: SolicitacaoId(col(row, "solicitacao_id")?),
        remanejamento_funcionario_id: col::<Option<uuid::Uuid>>(row, "remanejamento_funcionario_id")?
            .map(RemanejamentoFuncionarioId::from_uuid),
        tarefa_id: col::<Option<uuid::Uuid>>(row, "tarefa_id")?.map(TarefaId::from_uuid),
        entidade: label(row, "entidade")?,
        campo_alterado: col(row, "campo_alterado")?,
        valor_anterior: col(row, "valor_anterior")?,
        valor_novo: col(row, "valor_novo")?,
        descricao: col(row, "descricao")?,
        usuario_responsavel_id: col::<Option<i64>>(row, "usuario_responsavel_id")?
            .map(remanejamento_core::UserId),
        usuario_responsavel: col(row, "usuario_responsavel")?,
        data_acao: col(row, "data_acao")?,
        observacoes: col(row, "observacoes")?,
    })
}

fn evento_from_row(row: &PgRow) -> StoreResult<TarefaStatusEvento> {
    Ok(TarefaStatusEvento {
        id: remanejamento_core::EventoId::from_uuid(col(row, "id")?),
        tarefa_id: TarefaId::from_uuid(col(row, "tarefa_id")?),
        remanejamento_funcionario_id: RemanejamentoFuncionarioId::from_uuid(col(
            row,
            "remanejamento_funcionario_id",
        )?),
        status_anterior: opt_label(row, "status_anterior")?,
        status_novo: label(row, "status_novo")?,
        usuario_responsavel_id: col::<Option<i64>>(row, "usuario_responsavel_id")?
            .map(remanejamento_core::UserId),
        usuario_responsavel: col(row, "usuario_responsavel")?,
        data_evento: col(row, "data_evento")?,
        observacoes: col(row, "observacoes")?,
    })
}

fn funcionario_from_row(row: &PgRow) -> StoreResult<Funcionario> {
    Ok(Funcionario {
        id: FuncionarioId(col(row, "id")?),
        nome: col(row, "nome")?,
        matricula: col(row, "matricula")?,
        funcao: col(row, "funcao")?,
        contrato_id: col::<Option<i64>>(row, "contrato_id")?.map(ContratoId),
        em_migracao: col(row, "em_migracao")?,
    })
}

fn tarefa_padrao_from_row(row: &PgRow) -> StoreResult<TarefaPadrao> {
    Ok(TarefaPadrao {
        id: TarefaPadraoId(col(row, "id")?),
        setor: label(row, "setor")?,
        tipo: col(row, "tipo")?,
        descricao: col(row, "descricao")?,
        ativo: col(row, "ativo")?,
    })
}

fn treinamento_from_row(row: &PgRow) -> StoreResult<Treinamento> {
    Ok(Treinamento {
        id: TreinamentoId(col(row, "id")?),
        nome: col(row, "nome")?,
        descricao: col(row, "descricao")?,
        validade_valor: col(row, "validade_valor")?,
        validade_unidade: col(row, "validade_unidade")?,
    })
}

fn map_rows<T>(rows: &[PgRow], f: fn(&PgRow) -> StoreResult<T>) -> StoreResult<Vec<T>> {
    rows.iter().map(f).collect()
}

fn bind_tarefa<'q>(q: PgQuery<'q>, t: &'q TarefaRemanejamento) -> PgQuery<'q> {
    q.bind(*t.id.as_uuid())
        .bind(*t.remanejamento_id.as_uuid())
        .bind(t.tarefa_padrao_id.map(TarefaPadraoId::get))
        .bind(t.treinamento_id.map(TreinamentoId::get))
        .bind(t.setor.map(Setor::as_str))
        .bind(&t.tipo)
        .bind(&t.descricao)
        .bind(&t.responsavel)
        .bind(t.status.as_str())
        .bind(t.prioridade.as_str())
        .bind(t.data_criacao)
        .bind(t.data_limite)
        .bind(t.data_vencimento)
        .bind(t.data_conclusao)
        .bind(&t.observacoes)
}

#[async_trait]
impl WorkflowStore for PostgresStore {
    async fn proximo_id_solicitacao(&self) -> StoreResult<SolicitacaoId> {
        let row = sqlx::query("SELECT nextval('solicitacao_remanejamento_id_seq') AS id")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("proximo_id_solicitacao", e))?;
        Ok(SolicitacaoId(col(&row, "id")?))
    }

    #[instrument(skip(self, solicitacao, registros), fields(solicitacao_id = %solicitacao.id, membros = registros.len()), err)]
    async fn inserir_solicitacao(
        &self,
        solicitacao: &SolicitacaoRemanejamento,
        registros: &[RemanejamentoFuncionario],
    ) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let sql = format!(
            "INSERT INTO solicitacoes_remanejamento ({SOLICITACAO_COLS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        );
        sqlx::query(&sql)
            .bind(solicitacao.id.get())
            .bind(solicitacao.tipo.as_str())
            .bind(solicitacao.contrato_origem_id.map(ContratoId::get))
            .bind(solicitacao.contrato_destino_id.map(ContratoId::get))
            .bind(solicitacao.status.as_str())
            .bind(solicitacao.prioridade.as_str())
            .bind(to_json(&solicitacao.solicitado_por)?)
            .bind(&solicitacao.justificativa)
            .bind(solicitacao.data_solicitacao)
            .bind(solicitacao.data_analise)
            .bind(solicitacao.data_aprovacao)
            .bind(solicitacao.data_conclusao)
            .bind(solicitacao.concluido_por.as_ref().map(to_json).transpose()?)
            .bind(solicitacao.version as i64)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_solicitacao", e))?;

        let sql = format!(
            "INSERT INTO remanejamentos_funcionario ({REGISTRO_COLS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
        );
        for r in registros {
            sqlx::query(&sql)
                .bind(*r.id.as_uuid())
                .bind(r.funcionario_id.get())
                .bind(r.solicitacao_id.get())
                .bind(r.status_tarefas.as_str())
                .bind(r.status_prestserv.as_str())
                .bind(r.status_funcionario.as_str())
                .bind(r.data_rascunho_criado)
                .bind(r.data_submetido)
                .bind(r.data_resposta)
                .bind(&r.observacoes_prestserv)
                .bind(r.criado_em)
                .bind(r.atualizado_em)
                .bind(r.version as i64)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("insert_registro", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    async fn solicitacao(&self, id: SolicitacaoId) -> StoreResult<Option<SolicitacaoRemanejamento>> {
        let sql = format!("SELECT {SOLICITACAO_COLS} FROM solicitacoes_remanejamento WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_solicitacao", e))?;
        row.as_ref().map(solicitacao_from_row).transpose()
    }

    #[instrument(skip(self, solicitacao), fields(solicitacao_id = %solicitacao.id, expected = ?expected), err)]
    async fn salvar_solicitacao(
        &self,
        solicitacao: &SolicitacaoRemanejamento,
        expected: ExpectedVersion,
    ) -> StoreResult<u64> {
        let row = sqlx::query(
            r#"
            UPDATE solicitacoes_remanejamento SET
                status = $2,
                prioridade = $3,
                justificativa = $4,
                data_analise = $5,
                data_aprovacao = $6,
                data_conclusao = $7,
                concluido_por = $8,
                version = version + 1
            WHERE id = $1 AND ($9::BIGINT IS NULL OR version = $9)
            RETURNING version
            "#,
        )
        .bind(solicitacao.id.get())
        .bind(solicitacao.status.as_str())
        .bind(solicitacao.prioridade.as_str())
        .bind(&solicitacao.justificativa)
        .bind(solicitacao.data_analise)
        .bind(solicitacao.data_aprovacao)
        .bind(solicitacao.data_conclusao)
        .bind(solicitacao.concluido_por.as_ref().map(to_json).transpose()?)
        .bind(esperado(expected))
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_solicitacao", e))?;

        match row {
            Some(row) => Ok(col::<i64>(&row, "version")? as u64),
            None => Err(self
                .falha_de_versao("solicitacoes_remanejamento", solicitacao.id, expected)
                .await),
        }
    }

    async fn registro(
        &self,
        id: RemanejamentoFuncionarioId,
    ) -> StoreResult<Option<RemanejamentoFuncionario>> {
        let sql = format!("SELECT {REGISTRO_COLS} FROM remanejamentos_funcionario WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_registro", e))?;
        row.as_ref().map(registro_from_row).transpose()
    }

    async fn registros_da_solicitacao(
        &self,
        id: SolicitacaoId,
    ) -> StoreResult<Vec<RemanejamentoFuncionario>> {
        let sql = format!(
            "SELECT {REGISTRO_COLS} FROM remanejamentos_funcionario \
             WHERE solicitacao_id = $1 ORDER BY criado_em, id"
        );
        let rows = sqlx::query(&sql)
            .bind(id.get())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("registros_da_solicitacao", e))?;
        map_rows(&rows, registro_from_row)
    }

    async fn registros_pagina(
        &self,
        offset: u64,
        limite: u32,
    ) -> StoreResult<Vec<RemanejamentoFuncionario>> {
        let sql = format!(
            "SELECT {REGISTRO_COLS} FROM remanejamentos_funcionario \
             ORDER BY criado_em, id OFFSET $1 LIMIT $2"
        );
        let rows = sqlx::query(&sql)
            .bind(offset as i64)
            .bind(i64::from(limite))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("registros_pagina", e))?;
        map_rows(&rows, registro_from_row)
    }

    #[instrument(skip(self, registro), fields(registro_id = %registro.id, expected = ?expected), err)]
    async fn salvar_registro(
        &self,
        registro: &RemanejamentoFuncionario,
        expected: ExpectedVersion,
    ) -> StoreResult<u64> {
        let row = sqlx::query(
            r#"
            UPDATE remanejamentos_funcionario SET
                status_tarefas = $2,
                status_prestserv = $3,
                status_funcionario = $4,
                data_rascunho_criado = $5,
                data_submetido = $6,
                data_resposta = $7,
                observacoes_prestserv = $8,
                atualizado_em = $9,
                version = version + 1
            WHERE id = $1 AND ($10::BIGINT IS NULL OR version = $10)
            RETURNING version
            "#,
        )
        .bind(*registro.id.as_uuid())
        .bind(registro.status_tarefas.as_str())
        .bind(registro.status_prestserv.as_str())
        .bind(registro.status_funcionario.as_str())
        .bind(registro.data_rascunho_criado)
        .bind(registro.data_submetido)
        .bind(registro.data_resposta)
        .bind(&registro.observacoes_prestserv)
        .bind(registro.atualizado_em)
        .bind(esperado(expected))
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_registro", e))?;

        match row {
            Some(row) => Ok(col::<i64>(&row, "version")? as u64),
            None => Err(self
                .falha_de_versao("remanejamentos_funcionario", registro.id, expected)
                .await),
        }
    }

    #[instrument(skip(self, tarefas), fields(quantidade = tarefas.len()), err)]
    async fn inserir_tarefas(&self, tarefas: &[TarefaRemanejamento]) -> StoreResult<()> {
        if tarefas.is_empty() {
            return Ok(());
        }
        let sql = format!(
            "INSERT INTO tarefas_remanejamento ({TAREFA_COLS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"
        );
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        for t in tarefas {
            bind_tarefa(sqlx::query(&sql), t)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("insert_tarefa", e))?;
        }
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    async fn tarefa(&self, id: TarefaId) -> StoreResult<Option<TarefaRemanejamento>> {
        let sql = format!("SELECT {TAREFA_COLS} FROM tarefas_remanejamento WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_tarefa", e))?;
        row.as_ref().map(tarefa_from_row).transpose()
    }

    async fn tarefas_do_registro(
        &self,
        id: RemanejamentoFuncionarioId,
    ) -> StoreResult<Vec<TarefaRemanejamento>> {
        let sql = format!(
            "SELECT {TAREFA_COLS} FROM tarefas_remanejamento \
             WHERE remanejamento_id = $1 ORDER BY data_criacao, id"
        );
        let rows = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("tarefas_do_registro", e))?;
        map_rows(&rows, tarefa_from_row)
    }

    async fn salvar_tarefa(&self, tarefa: &TarefaRemanejamento) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE tarefas_remanejamento SET
                setor = $2,
                status = $3,
                data_limite = $4,
                data_vencimento = $5,
                data_conclusao = $6,
                observacoes = $7
            WHERE id = $1
            "#,
        )
        .bind(*tarefa.id.as_uuid())
        .bind(tarefa.setor.map(Setor::as_str))
        .bind(tarefa.status.as_str())
        .bind(tarefa.data_limite)
        .bind(tarefa.data_vencimento)
        .bind(tarefa.data_conclusao)
        .bind(&tarefa.observacoes)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_tarefa", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("tarefa {}", tarefa.id)));
        }
        Ok(())
    }

    async fn excluir_tarefa(&self, id: TarefaId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tarefas_remanejamento WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_tarefa", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn tarefas_vencidas(&self, agora: DateTime<Utc>) -> StoreResult<Vec<TarefaRemanejamento>> {
        let sql = format!(
            "SELECT {TAREFA_COLS} FROM tarefas_remanejamento \
             WHERE data_limite < $1 AND status NOT IN ('CONCLUIDO', 'CANCELADO') \
             ORDER BY data_limite, id"
        );
        let rows = sqlx::query(&sql)
            .bind(agora)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("tarefas_vencidas", e))?;
        map_rows(&rows, tarefa_from_row)
    }

    async fn inserir_observacao(
        &self,
        observacao: &ObservacaoRemanejamentoFuncionario,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO observacoes_remanejamento_funcionario (id, remanejamento_id, texto, autor, data_criacao)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(*observacao.id.as_uuid())
        .bind(*observacao.remanejamento_id.as_uuid())
        .bind(&observacao.texto)
        .bind(to_json(&observacao.autor)?)
        .bind(observacao.data_criacao)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_observacao", e))?;
        Ok(())
    }

    async fn observacoes(
        &self,
        registro: RemanejamentoFuncionarioId,
    ) -> StoreResult<Vec<ObservacaoRemanejamentoFuncionario>> {
        let rows = sqlx::query(
            r#"
            SELECT id, remanejamento_id, texto, autor, data_criacao
            FROM observacoes_remanejamento_funcionario
            WHERE remanejamento_id = $1
            ORDER BY data_criacao, id
            "#,
        )
        .bind(*registro.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("observacoes", e))?;

        rows.iter()
            .map(|row| {
                Ok(ObservacaoRemanejamentoFuncionario {
                    id: remanejamento_core::ObservacaoId::from_uuid(col(row, "id")?),
                    remanejamento_id: RemanejamentoFuncionarioId::from_uuid(col(row, "remanejamento_id")?),
                    texto: col(row, "texto")?,
                    autor: json(row, "autor")?,
                    data_criacao: col(row, "data_criacao")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn funcionario(&self, id: FuncionarioId) -> StoreResult<Option<Funcionario>> {
        let row = sqlx::query(
            "SELECT id, nome, matricula, funcao, contrato_id, em_migracao FROM funcionarios WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_funcionario", e))?;
        row.as_ref().map(funcionario_from_row).transpose()
    }

    #[instrument(skip(self, funcionario), fields(funcionario_id = %funcionario.id), err)]
    async fn salvar_funcionario(&self, funcionario: &Funcionario) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE funcionarios SET contrato_id = $2, em_migracao = $3 WHERE id = $1",
        )
        .bind(funcionario.id.get())
        .bind(funcionario.contrato_id.map(ContratoId::get))
        .bind(funcionario.em_migracao)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_funcionario", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("funcionário {}", funcionario.id)));
        }
        Ok(())
    }

    async fn contrato(&self, id: ContratoId) -> StoreResult<Option<Contrato>> {
        let row = sqlx::query("SELECT id, numero, nome, cliente FROM contratos WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_contrato", e))?;
        row.map(|row| {
            Ok(Contrato {
                id: ContratoId(col(&row, "id")?),
                numero: col(&row, "numero")?,
                nome: col(&row, "nome")?,
                cliente: col(&row, "cliente")?,
            })
        })
        .transpose()
    }

    async fn tarefas_padrao_ativas(&self, setor: Setor) -> StoreResult<Vec<TarefaPadrao>> {
        let rows = sqlx::query(
            "SELECT id, setor, tipo, descricao, ativo FROM tarefas_padrao \
             WHERE ativo AND upper(setor) = $1 ORDER BY id",
        )
        .bind(setor.as_str())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("tarefas_padrao_ativas", e))?;
        map_rows(&rows, tarefa_padrao_from_row)
    }

    async fn tarefa_padrao(&self, id: TarefaPadraoId) -> StoreResult<Option<TarefaPadrao>> {
        let row = sqlx::query("SELECT id, setor, tipo, descricao, ativo FROM tarefas_padrao WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_tarefa_padrao", e))?;
        row.as_ref().map(tarefa_padrao_from_row).transpose()
    }

    async fn treinamento(&self, id: TreinamentoId) -> StoreResult<Option<Treinamento>> {
        let row = sqlx::query(
            "SELECT id, nome, descricao, validade_valor, validade_unidade FROM treinamentos WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_treinamento", e))?;
        row.as_ref().map(treinamento_from_row).transpose()
    }

    async fn treinamento_por_nome(&self, nome: &str) -> StoreResult<Option<Treinamento>> {
        // Accent folding happens in Rust; the catalog is small.
        let rows = sqlx::query(
            "SELECT id, nome, descricao, validade_valor, validade_unidade FROM treinamentos ORDER BY id",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("treinamento_por_nome", e))?;
        let todos = map_rows(&rows, treinamento_from_row)?;
        Ok(todos.into_iter().find(|t| t.tem_nome(nome)))
    }

    async fn matriz_do_contrato(&self, contrato: ContratoId) -> StoreResult<Vec<MatrizTreinamento>> {
        let rows = sqlx::query(
            "SELECT contrato_id, funcao, treinamento_id FROM matriz_treinamento WHERE contrato_id = $1",
        )
        .bind(contrato.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("matriz_do_contrato", e))?;
        rows.iter()
            .map(|row| {
                Ok(MatrizTreinamento {
                    contrato_id: ContratoId(col(row, "contrato_id")?),
                    funcao: col(row, "funcao")?,
                    treinamento_id: TreinamentoId(col(row, "treinamento_id")?),
                })
            })
            .collect()
    }
}

#[async_trait]
impl CapacitacaoStore for PostgresStore {
    async fn capacitacao_por_chave(
        &self,
        chave: &ChaveCapacitacao,
    ) -> StoreResult<Option<FuncionarioCapacitacao>> {
        let base = format!("SELECT {CAPACITACAO_COLS} FROM funcionario_capacitacoes WHERE funcionario_id = $1");
        let row = match chave {
            ChaveCapacitacao::Treinamento {
                funcionario_id,
                treinamento_id,
            } => {
                let sql = format!("{base} AND treinamento_id = $2 LIMIT 1");
                sqlx::query(&sql)
                    .bind(funcionario_id.get())
                    .bind(treinamento_id.get())
                    .fetch_optional(&*self.pool)
                    .await
            }
            ChaveCapacitacao::TarefaPadrao {
                funcionario_id,
                tarefa_padrao_id,
            } => {
                let sql = format!(
                    "{base} AND treinamento_id IS NULL AND tarefa_padrao_id = $2 LIMIT 1"
                );
                sqlx::query(&sql)
                    .bind(funcionario_id.get())
                    .bind(tarefa_padrao_id.get())
                    .fetch_optional(&*self.pool)
                    .await
            }
            ChaveCapacitacao::TipoResponsavel {
                funcionario_id,
                tipo,
                responsavel,
            } => {
                let sql = format!(
                    "{base} AND treinamento_id IS NULL AND tarefa_padrao_id IS NULL \
                     AND tipo_chave = $2 AND responsavel_chave = $3 LIMIT 1"
                );
                sqlx::query(&sql)
                    .bind(funcionario_id.get())
                    .bind(tipo)
                    .bind(responsavel)
                    .fetch_optional(&*self.pool)
                    .await
            }
        }
        .map_err(|e| map_sqlx_error("capacitacao_por_chave", e))?;

        row.as_ref().map(capacitacao_from_row).transpose()
    }

    #[instrument(skip(self, capacitacao), fields(capacitacao_id = %capacitacao.id), err)]
    async fn salvar_capacitacao(&self, capacitacao: &FuncionarioCapacitacao) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO funcionario_capacitacoes (
                id, funcionario_id, tarefa_padrao_id, treinamento_id, tipo, responsavel,
                tipo_chave, responsavel_chave, descricao, data_conclusao, data_vencimento,
                origem_remanejamento_id, criado_em, atualizado_em
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (id) DO UPDATE SET
                descricao = EXCLUDED.descricao,
                data_conclusao = EXCLUDED.data_conclusao,
                data_vencimento = EXCLUDED.data_vencimento,
                origem_remanejamento_id = EXCLUDED.origem_remanejamento_id,
                atualizado_em = EXCLUDED.atualizado_em
            "#,
        )
        .bind(*capacitacao.id.as_uuid())
        .bind(capacitacao.funcionario_id.get())
        .bind(capacitacao.tarefa_padrao_id.map(TarefaPadraoId::get))
        .bind(capacitacao.treinamento_id.map(TreinamentoId::get))
        .bind(&capacitacao.tipo)
        .bind(&capacitacao.responsavel)
        .bind(normalizar(&capacitacao.tipo))
        .bind(normalizar(&capacitacao.responsavel))
        .bind(&capacitacao.descricao)
        .bind(capacitacao.data_conclusao)
        .bind(capacitacao.data_vencimento)
        .bind(capacitacao.origem_remanejamento_id.map(|id| *id.as_uuid()))
        .bind(capacitacao.criado_em)
        .bind(capacitacao.atualizado_em)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_capacitacao", e))?;
        Ok(())
    }

    async fn capacitacoes_do_funcionario(
        &self,
        funcionario: FuncionarioId,
    ) -> StoreResult<Vec<FuncionarioCapacitacao>> {
        let sql = format!(
            "SELECT {CAPACITACAO_COLS} FROM funcionario_capacitacoes \
             WHERE funcionario_id = $1 ORDER BY data_conclusao, id"
        );
        let rows = sqlx::query(&sql)
            .bind(funcionario.get())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("capacitacoes_do_funcionario", e))?;
        map_rows(&rows, capacitacao_from_row)
    }
}

#[async_trait]
impl AuditStore for PostgresStore {
    async fn inserir_historico(&self, h: &HistoricoRemanejamento) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO historico_remanejamento ({HISTORICO_COLS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
        );
        sqlx::query(&sql)
            .bind(*h.id.as_uuid())
            .bind(h.solicitacao_id.get())
            .bind(h.remanejamento_funcionario_id.map(|id| *id.as_uuid()))
            .bind(h.tarefa_id.map(|id| *id.as_uuid()))
            .bind(h.entidade.as_str())
            .bind(&h.campo_alterado)
            .bind(&h.valor_anterior)
            .bind(&h.valor_novo)
            .bind(&h.descricao)
            .bind(h.usuario_responsavel_id.map(|u| u.get()))
            .bind(&h.usuario_responsavel)
            .bind(h.data_acao)
            .bind(&h.observacoes)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_historico", e))?;
        Ok(())
    }

    async fn inserir_evento_tarefa(&self, e: &TarefaStatusEvento) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO tarefa_status_eventos ({EVENTO_COLS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        );
        sqlx::query(&sql)
            .bind(*e.id.as_uuid())
            .bind(*e.tarefa_id.as_uuid())
            .bind(*e.remanejamento_funcionario_id.as_uuid())
            .bind(e.status_anterior.map(|s| s.as_str()))
            .bind(e.status_novo.as_str())
            .bind(e.usuario_responsavel_id.map(|u| u.get()))
            .bind(&e.usuario_responsavel)
            .bind(e.data_evento)
            .bind(&e.observacoes)
            .execute(&*self.pool)
            .await
            .map_err(|err| map_sqlx_error("insert_evento_tarefa", err))?;
        Ok(())
    }

    async fn historico_da_solicitacao(
        &self,
        id: SolicitacaoId,
    ) -> StoreResult<Vec<HistoricoRemanejamento>> {
        let sql = format!(
            "SELECT {HISTORICO_COLS} FROM historico_remanejamento \
             WHERE solicitacao_id = $1 ORDER BY data_acao, id"
        );
        let rows = sqlx::query(&sql)
            .bind(id.get())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("historico_da_solicitacao", e))?;
        map_rows(&rows, historico_from_row)
    }

    async fn eventos_da_tarefa(&self, id: TarefaId) -> StoreResult<Vec<TarefaStatusEvento>> {
        let sql = format!(
            "SELECT {EVENTO_COLS} FROM tarefa_status_eventos \
             WHERE tarefa_id = $1 ORDER BY data_evento, id"
        );
        let rows = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("eventos_da_tarefa", e))?;
        map_rows(&rows, evento_from_row)
    }
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") => StoreError::NotFound(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::RowNotFound => {
            StoreError::Backend(format!("unexpected row not found in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
