//! Reassignment workflow domain (requests, per-employee records, checklist
//! tasks, the external approval gate and derived qualification records).
//!
//! Everything here is deterministic decision logic over in-memory values.
//! Loading, persisting, auditing and cascading live in `remanejamento-infra`.

#[macro_use]
mod labels;

pub mod actor;
pub mod audit;
pub mod capacitacao;
pub mod catalog;
pub mod completion;
pub mod event;
pub mod funcionario;
pub mod prestserv;
pub mod progress;
pub mod remanejamento;
pub mod setor;
pub mod solicitacao;
pub mod tarefa;
pub mod texto;

pub use actor::Actor;
pub use audit::{EntidadeAuditada, HistoricoRemanejamento, SujeitoAuditoria, TarefaStatusEvento};
pub use capacitacao::{
    CapacitacaoCandidata, ChaveCapacitacao, FuncionarioCapacitacao, candidata_de_tarefa,
    registro_elegivel,
};
pub use catalog::{MatrizTreinamento, TarefaPadrao, Treinamento, UnidadeValidade, Validade};
pub use completion::{DecisaoConclusao, avaliar_conclusao, membro_completo};
pub use event::WorkflowEvent;
pub use funcionario::{Contrato, Funcionario};
pub use prestserv::{AtualizacaoPrestserv, TransicaoPrestserv, transicao_permitida};
pub use progress::{NOTA_MATRIZ_TREINAMENTO, Recalculo, recalcular_status_tarefas};
pub use remanejamento::{
    ObservacaoRemanejamentoFuncionario, RemanejamentoFuncionario, StatusFuncionario,
    StatusPrestserv, StatusTarefas,
};
pub use setor::Setor;
pub use solicitacao::{
    NovaSolicitacao, Prioridade, SolicitacaoRemanejamento, StatusSolicitacao, TipoSolicitacao,
};
pub use tarefa::{
    NovaTarefa, PatchOutcome, StatusTarefa, TarefaPatch, TarefaRemanejamento, validar_vencimento,
    vencimento_exigido,
};
