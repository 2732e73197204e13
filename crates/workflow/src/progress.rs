//! Derived checklist progress of an employee record.
//!
//! `recalcular_status_tarefas` is the only place `status_tarefas` is decided.
//! It is pure: the service layer persists its result and cascades.

use crate::remanejamento::StatusTarefas;
use crate::tarefa::TarefaRemanejamento;

/// Note appended to the record when the training-reopen rule fires.
pub const NOTA_MATRIZ_TREINAMENTO: &str = "Reaberto automaticamente: nenhuma tarefa de treinamento ativa. \
Matriz inexistente ou vazia; o setor de TREINAMENTO deve criar a matriz de tarefas antes da nova submissão.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recalculo {
    pub anterior: StatusTarefas,
    pub novo: StatusTarefas,
    /// Empty list, or every task CONCLUIDO/CANCELADO.
    pub todas_concluidas: bool,
    pub treinamento_ativo: bool,
    /// The reopen rule forced `novo` back to ATENDER TAREFAS.
    pub reaberto_por_treinamento: bool,
}

impl Recalculo {
    pub fn alterado(&self) -> bool {
        self.anterior != self.novo
    }
}

pub fn recalcular_status_tarefas(
    tarefas: &[TarefaRemanejamento],
    atual: StatusTarefas,
) -> Recalculo {
    let todas_concluidas = tarefas.iter().all(|t| t.status.is_terminal());
    let treinamento_ativo = tarefas.iter().any(TarefaRemanejamento::is_ativa_de_treinamento);

    let padrao = if todas_concluidas {
        StatusTarefas::SubmeterRascunho
    } else {
        StatusTarefas::AtenderTarefas
    };

    let reaberto_por_treinamento = atual == StatusTarefas::SubmeterRascunho && !treinamento_ativo;
    let novo = if reaberto_por_treinamento {
        StatusTarefas::AtenderTarefas
    } else {
        padrao
    };

    Recalculo {
        anterior: atual,
        novo,
        todas_concluidas,
        treinamento_ativo,
        reaberto_por_treinamento,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use remanejamento_core::{RemanejamentoFuncionarioId, TarefaId};

    use crate::solicitacao::Prioridade;
    use crate::tarefa::StatusTarefa;

    fn tarefa(responsavel: &str, status: StatusTarefa) -> TarefaRemanejamento {
        TarefaRemanejamento {
            id: TarefaId::new(),
            remanejamento_id: RemanejamentoFuncionarioId::new(),
            tarefa_padrao_id: None,
            treinamento_id: None,
            setor: None,
            tipo: "item".into(),
            descricao: None,
            responsavel: responsavel.into(),
            status,
            prioridade: Prioridade::Alta,
            data_criacao: Utc::now(),
            data_limite: None,
            data_vencimento: None,
            data_conclusao: None,
            observacoes: None,
        }
    }

    #[test]
    fn empty_list_counts_as_done() {
        let r = recalcular_status_tarefas(&[], StatusTarefas::AtenderTarefas);
        assert!(r.todas_concluidas);
        assert_eq!(r.novo, StatusTarefas::SubmeterRascunho);
    }

    #[test]
    fn open_task_keeps_record_in_progress() {
        let tarefas = vec![
            tarefa("RH", StatusTarefa::Concluido),
            tarefa("TREINAMENTO", StatusTarefa::Pendente),
        ];
        let r = recalcular_status_tarefas(&tarefas, StatusTarefas::AprovarSolicitacao);
        assert_eq!(r.novo, StatusTarefas::AtenderTarefas);
        assert!(r.alterado());
    }

    #[test]
    fn reopens_when_no_training_task_is_active() {
        let tarefas = vec![
            tarefa("RH", StatusTarefa::Concluido),
            tarefa("TREINAMENTO", StatusTarefa::Cancelado),
        ];
        let r = recalcular_status_tarefas(&tarefas, StatusTarefas::SubmeterRascunho);
        assert!(r.todas_concluidas);
        assert!(r.reaberto_por_treinamento);
        assert_eq!(r.novo, StatusTarefas::AtenderTarefas);
        assert!(NOTA_MATRIZ_TREINAMENTO.contains("Matriz inexistente ou vazia"));
    }

    #[test]
    fn reopen_rule_only_applies_from_submeter_rascunho() {
        let tarefas = vec![tarefa("RH", StatusTarefa::Concluido)];
        let r = recalcular_status_tarefas(&tarefas, StatusTarefas::AtenderTarefas);
        assert!(!r.reaberto_por_treinamento);
        assert_eq!(r.novo, StatusTarefas::SubmeterRascunho);
    }

    #[test]
    fn stable_once_training_is_done() {
        let tarefas = vec![
            tarefa("RH", StatusTarefa::Concluido),
            tarefa("Treinamento", StatusTarefa::Concluido),
        ];
        let r = recalcular_status_tarefas(&tarefas, StatusTarefas::SubmeterRascunho);
        assert!(!r.alterado());
    }

    fn status_tarefa() -> impl Strategy<Value = StatusTarefa> {
        prop::sample::select(StatusTarefa::ALL.to_vec())
    }

    fn status_tarefas() -> impl Strategy<Value = StatusTarefas> {
        prop::sample::select(StatusTarefas::ALL.to_vec())
    }

    fn lista() -> impl Strategy<Value = Vec<TarefaRemanejamento>> {
        prop::collection::vec(
            (prop::sample::select(vec!["RH", "MEDICINA", "TREINAMENTO"]), status_tarefa()),
            0..12,
        )
        .prop_map(|v| v.into_iter().map(|(r, s)| tarefa(r, s)).collect())
    }

    proptest! {
        #[test]
        fn recomputation_is_deterministic(tarefas in lista(), atual in status_tarefas()) {
            let a = recalcular_status_tarefas(&tarefas, atual);
            let b = recalcular_status_tarefas(&tarefas, atual);
            prop_assert_eq!(a, b);
        }

        #[test]
        fn closed_lists_submit_and_new_open_task_reopens(
            n in 0usize..8,
            fechado in prop::sample::select(vec![StatusTarefa::Concluido, StatusTarefa::Cancelado]),
            aberto in prop::sample::select(vec![StatusTarefa::Pendente, StatusTarefa::EmAndamento, StatusTarefa::Reprovado]),
        ) {
            let mut tarefas: Vec<_> = (0..n).map(|_| tarefa("RH", fechado)).collect();
            tarefas.push(tarefa("TREINAMENTO", StatusTarefa::Concluido));

            let r = recalcular_status_tarefas(&tarefas, StatusTarefas::AtenderTarefas);
            prop_assert_eq!(r.novo, StatusTarefas::SubmeterRascunho);

            tarefas.push(tarefa("MEDICINA", aberto));
            let r = recalcular_status_tarefas(&tarefas, r.novo);
            prop_assert_eq!(r.novo, StatusTarefas::AtenderTarefas);
        }

        #[test]
        fn result_is_always_a_working_status(tarefas in lista(), atual in status_tarefas()) {
            let r = recalcular_status_tarefas(&tarefas, atual);
            prop_assert!(matches!(r.novo, StatusTarefas::AtenderTarefas | StatusTarefas::SubmeterRascunho));
        }
    }
}
