use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use remanejamento_core::{
    CapacitacaoId, ContratoId, ExpectedVersion, FuncionarioId, RemanejamentoFuncionarioId,
    SolicitacaoId, TarefaId, TarefaPadraoId, TreinamentoId,
};
use remanejamento_workflow::{
    ChaveCapacitacao, Contrato, Funcionario, FuncionarioCapacitacao, HistoricoRemanejamento,
    MatrizTreinamento, ObservacaoRemanejamentoFuncionario, RemanejamentoFuncionario, Setor,
    SolicitacaoRemanejamento, TarefaPadrao, TarefaRemanejamento, TarefaStatusEvento, Treinamento,
};

use super::{
    AuditStore, CapacitacaoStore, CatalogStore, StoreError, StoreResult, WorkflowStore,
};

/// In-memory implementation of every store trait.
///
/// Intended for tests/dev. Reference data is seeded through the `insert_*`
/// helpers.
#[derive(Debug)]
pub struct InMemoryStore {
    proximo_id: AtomicI64,
    solicitacoes: RwLock<HashMap<SolicitacaoId, SolicitacaoRemanejamento>>,
    registros: RwLock<HashMap<RemanejamentoFuncionarioId, RemanejamentoFuncionario>>,
    tarefas: RwLock<HashMap<TarefaId, TarefaRemanejamento>>,
    observacoes: RwLock<Vec<ObservacaoRemanejamentoFuncionario>>,
    funcionarios: RwLock<HashMap<FuncionarioId, Funcionario>>,
    contratos: RwLock<HashMap<ContratoId, Contrato>>,
    tarefas_padrao: RwLock<HashMap<TarefaPadraoId, TarefaPadrao>>,
    treinamentos: RwLock<HashMap<TreinamentoId, Treinamento>>,
    matriz: RwLock<Vec<MatrizTreinamento>>,
    capacitacoes: RwLock<HashMap<CapacitacaoId, FuncionarioCapacitacao>>,
    historico: RwLock<Vec<HistoricoRemanejamento>>,
    eventos_tarefa: RwLock<Vec<TarefaStatusEvento>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            proximo_id: AtomicI64::new(1),
            solicitacoes: RwLock::default(),
            registros: RwLock::default(),
            tarefas: RwLock::default(),
            observacoes: RwLock::default(),
            funcionarios: RwLock::default(),
            contratos: RwLock::default(),
            tarefas_padrao: RwLock::default(),
            treinamentos: RwLock::default(),
            matriz: RwLock::default(),
            capacitacoes: RwLock::default(),
            historico: RwLock::default(),
            eventos_tarefa: RwLock::default(),
        }
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

fn check_version(expected: ExpectedVersion, atual: u64, what: &str) -> StoreResult<()> {
    if expected.matches(atual) {
        Ok(())
    } else {
        Err(StoreError::Conflict(format!(
            "{what}: expected {expected:?}, found {atual}"
        )))
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_funcionario(&self, funcionario: Funcionario) {
        if let Ok(mut m) = self.funcionarios.write() {
            m.insert(funcionario.id, funcionario);
        }
    }

    pub fn insert_contrato(&self, contrato: Contrato) {
        if let Ok(mut m) = self.contratos.write() {
            m.insert(contrato.id, contrato);
        }
    }

    pub fn insert_tarefa_padrao(&self, template: TarefaPadrao) {
        if let Ok(mut m) = self.tarefas_padrao.write() {
            m.insert(template.id, template);
        }
    }

    pub fn insert_treinamento(&self, treinamento: Treinamento) {
        if let Ok(mut m) = self.treinamentos.write() {
            m.insert(treinamento.id, treinamento);
        }
    }

    pub fn insert_matriz(&self, linha: MatrizTreinamento) {
        if let Ok(mut m) = self.matriz.write() {
            m.push(linha);
        }
    }
}

#[async_trait]
impl WorkflowStore for InMemoryStore {
    async fn proximo_id_solicitacao(&self) -> StoreResult<SolicitacaoId> {
        Ok(SolicitacaoId(self.proximo_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn inserir_solicitacao(
        &self,
        solicitacao: &SolicitacaoRemanejamento,
        registros: &[RemanejamentoFuncionario],
    ) -> StoreResult<()> {
        let mut sols = self.solicitacoes.write().map_err(poisoned)?;
        let mut regs = self.registros.write().map_err(poisoned)?;
        if sols.contains_key(&solicitacao.id) {
            return Err(StoreError::Conflict(format!(
                "solicitação {} já existe",
                solicitacao.id
            )));
        }
        sols.insert(solicitacao.id, solicitacao.clone());
        for r in registros {
            regs.insert(r.id, r.clone());
        }
        Ok(())
    }

    async fn solicitacao(&self, id: SolicitacaoId) -> StoreResult<Option<SolicitacaoRemanejamento>> {
        Ok(self.solicitacoes.read().map_err(poisoned)?.get(&id).cloned())
    }

    async fn salvar_solicitacao(
        &self,
        solicitacao: &SolicitacaoRemanejamento,
        expected: ExpectedVersion,
    ) -> StoreResult<u64> {
        let mut sols = self.solicitacoes.write().map_err(poisoned)?;
        let atual = sols
            .get(&solicitacao.id)
            .ok_or_else(|| StoreError::NotFound(format!("solicitação {}", solicitacao.id)))?;
        check_version(expected, atual.version, "solicitação")?;

        let mut nova = solicitacao.clone();
        nova.version = atual.version + 1;
        let version = nova.version;
        sols.insert(nova.id, nova);
        Ok(version)
    }

    async fn registro(
        &self,
        id: RemanejamentoFuncionarioId,
    ) -> StoreResult<Option<RemanejamentoFuncionario>> {
        Ok(self.registros.read().map_err(poisoned)?.get(&id).cloned())
    }

    async fn registros_da_solicitacao(
        &self,
        id: SolicitacaoId,
    ) -> StoreResult<Vec<RemanejamentoFuncionario>> {
        let regs = self.registros.read().map_err(poisoned)?;
        let mut out: Vec<_> = regs.values().filter(|r| r.solicitacao_id == id).cloned().collect();
        out.sort_by_key(|r| (r.criado_em, r.id));
        Ok(out)
    }

    async fn registros_pagina(
        &self,
        offset: u64,
        limite: u32,
    ) -> StoreResult<Vec<RemanejamentoFuncionario>> {
        let regs = self.registros.read().map_err(poisoned)?;
        let mut todos: Vec<_> = regs.values().cloned().collect();
        todos.sort_by_key(|r| (r.criado_em, r.id));
        Ok(todos
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(limite as usize)
            .collect())
    }

    async fn salvar_registro(
        &self,
        registro: &RemanejamentoFuncionario,
        expected: ExpectedVersion,
    ) -> StoreResult<u64> {
        let mut regs = self.registros.write().map_err(poisoned)?;
        let atual = regs
            .get(&registro.id)
            .ok_or_else(|| StoreError::NotFound(format!("remanejamento {}", registro.id)))?;
        check_version(expected, atual.version, "remanejamento")?;

        let mut novo = registro.clone();
        novo.version = atual.version + 1;
        let version = novo.version;
        regs.insert(novo.id, novo);
        Ok(version)
    }

    async fn inserir_tarefas(&self, tarefas: &[TarefaRemanejamento]) -> StoreResult<()> {
        let mut m = self.tarefas.write().map_err(poisoned)?;
        for t in tarefas {
            m.insert(t.id, t.clone());
        }
        Ok(())
    }

    async fn tarefa(&self, id: TarefaId) -> StoreResult<Option<TarefaRemanejamento>> {
        Ok(self.tarefas.read().map_err(poisoned)?.get(&id).cloned())
    }

    async fn tarefas_do_registro(
        &self,
        id: RemanejamentoFuncionarioId,
    ) -> StoreResult<Vec<TarefaRemanejamento>> {
        let m = self.tarefas.read().map_err(poisoned)?;
        let mut out: Vec<_> = m.values().filter(|t| t.remanejamento_id == id).cloned().collect();
        out.sort_by_key(|t| (t.data_criacao, t.id));
        Ok(out)
    }

    async fn salvar_tarefa(&self, tarefa: &TarefaRemanejamento) -> StoreResult<()> {
        let mut m = self.tarefas.write().map_err(poisoned)?;
        match m.get_mut(&tarefa.id) {
            Some(slot) => {
                *slot = tarefa.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("tarefa {}", tarefa.id))),
        }
    }

    async fn excluir_tarefa(&self, id: TarefaId) -> StoreResult<bool> {
        Ok(self.tarefas.write().map_err(poisoned)?.remove(&id).is_some())
    }

    async fn tarefas_vencidas(&self, agora: DateTime<Utc>) -> StoreResult<Vec<TarefaRemanejamento>> {
        let m = self.tarefas.read().map_err(poisoned)?;
        let mut out: Vec<_> = m.values().filter(|t| t.vencida(agora)).cloned().collect();
        out.sort_by_key(|t| (t.data_limite, t.id));
        Ok(out)
    }

    async fn inserir_observacao(
        &self,
        observacao: &ObservacaoRemanejamentoFuncionario,
    ) -> StoreResult<()> {
        self.observacoes.write().map_err(poisoned)?.push(observacao.clone());
        Ok(())
    }

    async fn observacoes(
        &self,
        registro: RemanejamentoFuncionarioId,
    ) -> StoreResult<Vec<ObservacaoRemanejamentoFuncionario>> {
        Ok(self
            .observacoes
            .read()
            .map_err(poisoned)?
            .iter()
            .filter(|o| o.remanejamento_id == registro)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn funcionario(&self, id: FuncionarioId) -> StoreResult<Option<Funcionario>> {
        Ok(self.funcionarios.read().map_err(poisoned)?.get(&id).cloned())
    }

    async fn salvar_funcionario(&self, funcionario: &Funcionario) -> StoreResult<()> {
        let mut m = self.funcionarios.write().map_err(poisoned)?;
        match m.get_mut(&funcionario.id) {
            Some(slot) => {
                *slot = funcionario.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("funcionário {}", funcionario.id))),
        }
    }

    async fn contrato(&self, id: ContratoId) -> StoreResult<Option<Contrato>> {
        Ok(self.contratos.read().map_err(poisoned)?.get(&id).cloned())
    }

    async fn tarefas_padrao_ativas(&self, setor: Setor) -> StoreResult<Vec<TarefaPadrao>> {
        let m = self.tarefas_padrao.read().map_err(poisoned)?;
        let mut out: Vec<_> = m
            .values()
            .filter(|t| t.ativo && t.setor == setor)
            .cloned()
            .collect();
        out.sort_by_key(|t| t.id);
        Ok(out)
    }

    async fn tarefa_padrao(&self, id: TarefaPadraoId) -> StoreResult<Option<TarefaPadrao>> {
        Ok(self.tarefas_padrao.read().map_err(poisoned)?.get(&id).cloned())
    }

    async fn treinamento(&self, id: TreinamentoId) -> StoreResult<Option<Treinamento>> {
        Ok(self.treinamentos.read().map_err(poisoned)?.get(&id).cloned())
    }

    async fn treinamento_por_nome(&self, nome: &str) -> StoreResult<Option<Treinamento>> {
        let m = self.treinamentos.read().map_err(poisoned)?;
        let mut candidatos: Vec<_> = m.values().filter(|t| t.tem_nome(nome)).collect();
        candidatos.sort_by_key(|t| t.id);
        Ok(candidatos.first().map(|t| (*t).clone()))
    }

    async fn matriz_do_contrato(&self, contrato: ContratoId) -> StoreResult<Vec<MatrizTreinamento>> {
        Ok(self
            .matriz
            .read()
            .map_err(poisoned)?
            .iter()
            .filter(|l| l.contrato_id == contrato)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CapacitacaoStore for InMemoryStore {
    async fn capacitacao_por_chave(
        &self,
        chave: &ChaveCapacitacao,
    ) -> StoreResult<Option<FuncionarioCapacitacao>> {
        let m = self.capacitacoes.read().map_err(poisoned)?;
        Ok(m.values().find(|c| &c.chave() == chave).cloned())
    }

    async fn salvar_capacitacao(&self, capacitacao: &FuncionarioCapacitacao) -> StoreResult<()> {
        self.capacitacoes
            .write()
            .map_err(poisoned)?
            .insert(capacitacao.id, capacitacao.clone());
        Ok(())
    }

    async fn capacitacoes_do_funcionario(
        &self,
        funcionario: FuncionarioId,
    ) -> StoreResult<Vec<FuncionarioCapacitacao>> {
        let m = self.capacitacoes.read().map_err(poisoned)?;
        let mut out: Vec<_> = m
            .values()
            .filter(|c| c.funcionario_id == funcionario)
            .cloned()
            .collect();
        out.sort_by_key(|c| (c.data_conclusao, c.id));
        Ok(out)
    }
}

#[async_trait]
impl AuditStore for InMemoryStore {
    async fn inserir_historico(&self, historico: &HistoricoRemanejamento) -> StoreResult<()> {
        self.historico.write().map_err(poisoned)?.push(historico.clone());
        Ok(())
    }

    async fn inserir_evento_tarefa(&self, evento: &TarefaStatusEvento) -> StoreResult<()> {
        self.eventos_tarefa.write().map_err(poisoned)?.push(evento.clone());
        Ok(())
    }

    async fn historico_da_solicitacao(
        &self,
        id: SolicitacaoId,
    ) -> StoreResult<Vec<HistoricoRemanejamento>> {
        Ok(self
            .historico
            .read()
            .map_err(poisoned)?
            .iter()
            .filter(|h| h.solicitacao_id == id)
            .cloned()
            .collect())
    }

    async fn eventos_da_tarefa(&self, id: TarefaId) -> StoreResult<Vec<TarefaStatusEvento>> {
        Ok(self
            .eventos_tarefa
            .read()
            .map_err(poisoned)?
            .iter()
            .filter(|e| e.tarefa_id == id)
            .cloned()
            .collect())
    }
}
