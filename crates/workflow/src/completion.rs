//! Request completion predicate.

use crate::remanejamento::RemanejamentoFuncionario;
use crate::solicitacao::{SolicitacaoRemanejamento, StatusSolicitacao};

/// One member satisfies the request's completion predicate.
pub fn membro_completo(membro: &RemanejamentoFuncionario) -> bool {
    membro.completo()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisaoConclusao {
    JaConcluida,
    Rejeitada,
    SemMembros,
    Pendente { membros_pendentes: usize },
    Concluir,
}

/// All-or-nothing across members.
pub fn avaliar_conclusao(
    solicitacao: &SolicitacaoRemanejamento,
    membros: &[RemanejamentoFuncionario],
) -> DecisaoConclusao {
    match solicitacao.status {
        StatusSolicitacao::Concluido => return DecisaoConclusao::JaConcluida,
        StatusSolicitacao::Rejeitado => return DecisaoConclusao::Rejeitada,
        _ => {}
    }
    if membros.is_empty() {
        return DecisaoConclusao::SemMembros;
    }
    let membros_pendentes = membros.iter().filter(|m| !membro_completo(m)).count();
    if membros_pendentes > 0 {
        DecisaoConclusao::Pendente { membros_pendentes }
    } else {
        DecisaoConclusao::Concluir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use remanejamento_core::{ContratoId, FuncionarioId, SolicitacaoId};

    use crate::actor::Actor;
    use crate::remanejamento::{StatusPrestserv, StatusTarefas};
    use crate::solicitacao::{NovaSolicitacao, Prioridade, TipoSolicitacao};

    fn solicitacao() -> SolicitacaoRemanejamento {
        let cmd = NovaSolicitacao {
            tipo: TipoSolicitacao::Remanejamento,
            funcionario_ids: vec![FuncionarioId(1)],
            contrato_origem_id: Some(ContratoId(1)),
            contrato_destino_id: Some(ContratoId(7)),
            justificativa: None,
            prioridade: Prioridade::Media,
            solicitado_por: Actor::Sistema,
            occurred_at: Utc::now(),
        };
        SolicitacaoRemanejamento::nova(SolicitacaoId(1), &cmd).unwrap()
    }

    fn membro(tarefas: StatusTarefas, prestserv: StatusPrestserv) -> RemanejamentoFuncionario {
        let mut m = RemanejamentoFuncionario::novo(FuncionarioId(1), SolicitacaoId(1), Utc::now());
        m.status_tarefas = tarefas;
        m.status_prestserv = prestserv;
        m
    }

    #[test]
    fn single_blocked_member_blocks_the_request() {
        let s = solicitacao();
        let membros = vec![
            membro(StatusTarefas::SubmeterRascunho, StatusPrestserv::Aprovado),
            membro(StatusTarefas::SubmeterRascunho, StatusPrestserv::Submetido),
        ];
        assert_eq!(
            avaliar_conclusao(&s, &membros),
            DecisaoConclusao::Pendente { membros_pendentes: 1 }
        );
    }

    #[test]
    fn concluded_and_rejected_requests_are_left_alone() {
        let mut s = solicitacao();
        let membros = vec![membro(StatusTarefas::Concluido, StatusPrestserv::Aprovado)];
        assert_eq!(avaliar_conclusao(&s, &membros), DecisaoConclusao::Concluir);

        s.concluir(&Actor::Sistema, Utc::now());
        assert_eq!(avaliar_conclusao(&s, &membros), DecisaoConclusao::JaConcluida);

        let mut r = solicitacao();
        r.status = StatusSolicitacao::Rejeitado;
        assert_eq!(avaliar_conclusao(&r, &membros), DecisaoConclusao::Rejeitada);
        assert_eq!(avaliar_conclusao(&solicitacao(), &[]), DecisaoConclusao::SemMembros);
    }

    fn membro_arbitrario() -> impl Strategy<Value = RemanejamentoFuncionario> {
        (
            prop::sample::select(StatusTarefas::ALL.to_vec()),
            prop::sample::select(StatusPrestserv::ALL.to_vec()),
        )
            .prop_map(|(t, p)| membro(t, p))
    }

    proptest! {
        #[test]
        fn concludes_iff_every_member_is_complete(
            membros in prop::collection::vec(membro_arbitrario(), 1..6)
        ) {
            let esperado = membros.iter().all(|m| {
                matches!(m.status_tarefas, StatusTarefas::SubmeterRascunho | StatusTarefas::Concluido)
                    && m.status_prestserv == StatusPrestserv::Aprovado
            });
            let decisao = avaliar_conclusao(&solicitacao(), &membros);
            prop_assert_eq!(decisao == DecisaoConclusao::Concluir, esperado);
        }
    }
}
