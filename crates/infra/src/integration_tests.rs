//! End-to-end tests of the workflow engine over the in-memory store.
//!
//! Covers the cascade: task mutation → progress → approval gate →
//! contract transfer → request conclusion → qualification archive, plus the
//! audit trail and event publication around it.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{DateTime, Days, Duration, Utc};

    use remanejamento_core::{
        ContratoId, ErrorKind, FuncionarioId, RemanejamentoFuncionarioId, SolicitacaoId, TarefaId,
        TarefaPadraoId, TreinamentoId, UserId,
    };
    use remanejamento_workflow::{
        Actor, AtualizacaoPrestserv, Contrato, DecisaoConclusao, EntidadeAuditada, Funcionario,
        HistoricoRemanejamento, MatrizTreinamento, NovaSolicitacao, NovaTarefa, Prioridade, Setor,
        StatusFuncionario, StatusPrestserv, StatusSolicitacao, StatusTarefa, StatusTarefas,
        TarefaPadrao, TarefaPatch, TarefaRemanejamento, TarefaStatusEvento, TipoSolicitacao,
        Treinamento,
    };

    use crate::config::EngineConfig;
    use crate::engine::{RemanejamentoEngine, Stores};
    use crate::store::{AuditStore, InMemoryStore, StoreError, StoreResult};

    const ORIGEM: ContratoId = ContratoId(3);
    const DESTINO: ContratoId = ContratoId(7);
    const NR35: TreinamentoId = TreinamentoId(50);

    fn gestor() -> Actor {
        Actor::usuario(UserId(10), "Ana Gestora")
    }

    fn semear(store: &InMemoryStore) {
        for (id, numero) in [(ORIGEM, "CT-003"), (DESTINO, "CT-007")] {
            store.insert_contrato(Contrato {
                id,
                numero: numero.into(),
                nome: format!("Contrato {numero}"),
                cliente: "Cliente".into(),
            });
        }
        for (id, nome, matricula) in [(1, "João Silva", "1001"), (2, "Maria Souza", "1002")] {
            store.insert_funcionario(Funcionario {
                id: FuncionarioId(id),
                nome: nome.into(),
                matricula: matricula.into(),
                funcao: Some("Soldador".into()),
                contrato_id: Some(ORIGEM),
                em_migracao: false,
            });
        }
        for i in 1..=8 {
            store.insert_tarefa_padrao(TarefaPadrao {
                id: TarefaPadraoId(i),
                setor: Setor::Rh,
                tipo: format!("Documento RH {i}"),
                descricao: None,
                ativo: true,
            });
        }
        store.insert_tarefa_padrao(TarefaPadrao {
            id: TarefaPadraoId(9),
            setor: Setor::Rh,
            tipo: "Documento descontinuado".into(),
            descricao: None,
            ativo: false,
        });
        store.insert_tarefa_padrao(TarefaPadrao {
            id: TarefaPadraoId(20),
            setor: Setor::Medicina,
            tipo: "ASO".into(),
            descricao: Some("Atestado de saúde ocupacional".into()),
            ativo: true,
        });
        store.insert_treinamento(Treinamento {
            id: NR35,
            nome: "NR-35 Trabalho em Altura".into(),
            descricao: None,
            validade_valor: Some(24),
            validade_unidade: Some("mes".into()),
        });
        store.insert_matriz(MatrizTreinamento {
            contrato_id: DESTINO,
            funcao: Some("soldador".into()),
            treinamento_id: NR35,
        });
    }

    fn montar() -> (RemanejamentoEngine, Arc<InMemoryStore>) {
        let (engine, store) = RemanejamentoEngine::in_memory(EngineConfig::default());
        semear(&store);
        (engine, store)
    }

    fn nova_solicitacao(tipo: TipoSolicitacao, funcionarios: &[i64], at: DateTime<Utc>) -> NovaSolicitacao {
        NovaSolicitacao {
            tipo,
            funcionario_ids: funcionarios.iter().map(|id| FuncionarioId(*id)).collect(),
            contrato_origem_id: Some(ORIGEM),
            contrato_destino_id: (tipo != TipoSolicitacao::Desligamento).then_some(DESTINO),
            justificativa: Some("Mobilização de frente de trabalho".into()),
            prioridade: Prioridade::Alta,
            solicitado_por: gestor(),
            occurred_at: at,
        }
    }

    /// Creates and approves a request; returns its id and the member records.
    async fn solicitacao_aprovada(
        engine: &RemanejamentoEngine,
        tipo: TipoSolicitacao,
        funcionarios: &[i64],
        at: DateTime<Utc>,
    ) -> (SolicitacaoId, Vec<RemanejamentoFuncionarioId>) {
        let criada = engine
            .criar_solicitacao(nova_solicitacao(tipo, funcionarios, at))
            .await
            .unwrap();
        let (solicitacao, registros) = criada.valor;
        engine
            .atualizar_status_solicitacao(solicitacao.id, StatusSolicitacao::Aprovado, &gestor(), at)
            .await
            .unwrap();
        (solicitacao.id, registros.iter().map(|r| r.id).collect())
    }

    async fn concluir_todas(engine: &RemanejamentoEngine, tarefas: &[TarefaRemanejamento], at: DateTime<Utc>) {
        for t in tarefas {
            let vencimento = t.treinamento_id.map(|_| at.date_naive() + Days::new(400));
            engine.concluir_tarefa(t.id, vencimento, &gestor(), at).await.unwrap();
        }
    }

    fn prestserv(status: StatusPrestserv) -> AtualizacaoPrestserv {
        AtualizacaoPrestserv {
            status: Some(status),
            ..Default::default()
        }
    }

    async fn aprovar_prestserv(engine: &RemanejamentoEngine, registro: RemanejamentoFuncionarioId, at: DateTime<Utc>) {
        for status in [StatusPrestserv::Criado, StatusPrestserv::Submetido, StatusPrestserv::Aprovado] {
            engine
                .atualizar_prestserv(registro, &prestserv(status), &gestor(), at)
                .await
                .unwrap();
        }
    }

    // Scenario 1
    #[tokio::test]
    async fn completing_every_rh_and_medical_task_allows_submission() {
        let (engine, _store) = montar();
        let agora = Utc::now();
        let (_, registros) = solicitacao_aprovada(&engine, TipoSolicitacao::Remanejamento, &[1], agora).await;
        let registro_id = registros[0];

        let criadas = engine
            .criar_tarefas_em_lote(registro_id, &["RH", "medicina"], &gestor(), agora)
            .await
            .unwrap();
        assert_eq!(criadas.valor.len(), 9);
        assert!(criadas.valor.iter().all(|t| t.status == StatusTarefa::Pendente));
        assert!(criadas.valor.iter().all(|t| t.data_limite == Some(agora + Duration::days(30))));
        assert_eq!(
            engine.registro(registro_id).await.unwrap().status_tarefas,
            StatusTarefas::AtenderTarefas
        );

        concluir_todas(&engine, &criadas.valor, agora).await;
        assert_eq!(
            engine.registro(registro_id).await.unwrap().status_tarefas,
            StatusTarefas::SubmeterRascunho
        );

        let depois = agora + Duration::minutes(5);
        let submetido = engine
            .atualizar_prestserv(registro_id, &prestserv(StatusPrestserv::Submetido), &gestor(), depois)
            .await
            .unwrap();
        assert_eq!(submetido.valor.status_prestserv, StatusPrestserv::Submetido);
        assert_eq!(submetido.valor.data_submetido, Some(depois));
    }

    // Scenario 2 / submission guard
    #[tokio::test]
    async fn submission_with_one_pending_task_reports_the_count() {
        let (engine, _store) = montar();
        let agora = Utc::now();
        let (_, registros) = solicitacao_aprovada(&engine, TipoSolicitacao::Remanejamento, &[1], agora).await;
        let registro_id = registros[0];

        let criadas = engine
            .criar_tarefas_em_lote(registro_id, &["RH", "MEDICINA"], &gestor(), agora)
            .await
            .unwrap()
            .valor;
        concluir_todas(&engine, &criadas[..8], agora).await;

        let err = engine
            .atualizar_prestserv(registro_id, &prestserv(StatusPrestserv::Submetido), &gestor(), agora)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Validation));
        assert_eq!(err.tarefas_pendentes(), Some(1));

        let registro = engine.registro(registro_id).await.unwrap();
        assert_eq!(registro.status_prestserv, StatusPrestserv::Pendente);
        assert_eq!(registro.data_submetido, None);
    }

    // Scenario 3 / reopen rule
    #[tokio::test]
    async fn cancelled_only_training_task_reopens_the_checklist() {
        let (engine, _store) = montar();
        let agora = Utc::now();
        let (_, registros) = solicitacao_aprovada(&engine, TipoSolicitacao::Remanejamento, &[1], agora).await;
        let registro_id = registros[0];

        let tarefas = engine
            .criar_tarefas_em_lote(registro_id, &["MEDICINA", "TREINAMENTO"], &gestor(), agora)
            .await
            .unwrap()
            .valor;
        assert_eq!(tarefas.len(), 2);
        let aso = tarefas.iter().find(|t| t.responsavel == "MEDICINA").unwrap().clone();
        let nr35 = tarefas.iter().find(|t| t.treinamento_id == Some(NR35)).unwrap().clone();

        let cancelar = TarefaPatch {
            status: Some(StatusTarefa::Cancelado),
            ..Default::default()
        };
        engine.atualizar_tarefa(nr35.id, &cancelar, &gestor(), agora).await.unwrap();
        engine.concluir_tarefa(aso.id, None, &gestor(), agora).await.unwrap();
        assert_eq!(
            engine.registro(registro_id).await.unwrap().status_tarefas,
            StatusTarefas::SubmeterRascunho
        );

        let editar = TarefaPatch {
            status: Some(StatusTarefa::Concluido),
            observacoes: Some("ASO revisado".into()),
            ..Default::default()
        };
        let depois = agora + Duration::minutes(1);
        engine.atualizar_tarefa(aso.id, &editar, &gestor(), depois).await.unwrap();

        assert_eq!(
            engine.registro(registro_id).await.unwrap().status_tarefas,
            StatusTarefas::AtenderTarefas
        );
        let notas = engine.listar_observacoes(registro_id).await.unwrap();
        assert_eq!(notas.len(), 1);
        assert!(notas[0].texto.contains("Matriz inexistente ou vazia"));
        assert_eq!(notas[0].autor, Actor::Sistema);
    }

    // Scenario 4 / expiry requirement
    #[tokio::test]
    async fn training_completion_requires_expiry_thirty_days_out() {
        let (engine, _store) = montar();
        let agora = Utc::now();
        let hoje = agora.date_naive();
        let (_, registros) = solicitacao_aprovada(&engine, TipoSolicitacao::Remanejamento, &[1], agora).await;

        let tarefas = engine
            .criar_tarefas_em_lote(registros[0], &["TREINAMENTO", "RH"], &gestor(), agora)
            .await
            .unwrap()
            .valor;
        let nr35 = tarefas.iter().find(|t| t.treinamento_id == Some(NR35)).unwrap().clone();
        let rh = tarefas.iter().find(|t| t.responsavel == "RH").unwrap().clone();

        let sem_data = engine.concluir_tarefa(nr35.id, None, &gestor(), agora).await.unwrap_err();
        assert_eq!(sem_data.kind(), Some(ErrorKind::Validation));

        let cedo = engine
            .concluir_tarefa(nr35.id, Some(hoje + Days::new(10)), &gestor(), agora)
            .await
            .unwrap_err();
        assert!(cedo.to_string().contains("deve ser pelo menos 30 dias após hoje"));
        let ainda_pendente = engine
            .tarefas_do_remanejamento(registros[0])
            .await
            .unwrap()
            .into_iter()
            .find(|t| t.id == nr35.id)
            .unwrap();
        assert_eq!(ainda_pendente.status, StatusTarefa::Pendente);

        let vencimento = hoje + Days::new(31);
        let ok = engine
            .concluir_tarefa(nr35.id, Some(vencimento), &gestor(), agora)
            .await
            .unwrap();
        assert_eq!(ok.valor.status, StatusTarefa::Concluido);
        assert_eq!(ok.valor.data_vencimento, Some(vencimento));

        engine.concluir_tarefa(rh.id, None, &gestor(), agora).await.unwrap();

        // archived inline, with the explicit expiry
        let capacitacoes = engine.capacitacoes_do_funcionario(FuncionarioId(1)).await.unwrap();
        let treinamento = capacitacoes.iter().find(|c| c.treinamento_id == Some(NR35)).unwrap();
        assert_eq!(treinamento.data_vencimento, Some(vencimento));
        assert_eq!(treinamento.origem_remanejamento_id, Some(registros[0]));
        assert_eq!(capacitacoes.len(), 2);
    }

    #[tokio::test]
    async fn completing_a_training_task_by_update_obeys_the_expiry_rule() {
        let (engine, _store) = montar();
        let agora = Utc::now();
        let hoje = agora.date_naive();
        let (_, registros) = solicitacao_aprovada(&engine, TipoSolicitacao::Remanejamento, &[1], agora).await;
        let tarefas = engine
            .criar_tarefas_em_lote(registros[0], &["TREINAMENTO", "RH"], &gestor(), agora)
            .await
            .unwrap()
            .valor;
        let nr35 = tarefas.iter().find(|t| t.treinamento_id == Some(NR35)).unwrap().clone();
        let rh = tarefas.iter().find(|t| t.responsavel == "RH").unwrap().clone();

        let concluir = |data_vencimento| TarefaPatch {
            status: Some(StatusTarefa::Concluido),
            data_vencimento,
            ..Default::default()
        };

        let sem_data = engine
            .atualizar_tarefa(nr35.id, &concluir(None), &gestor(), agora)
            .await
            .unwrap_err();
        assert_eq!(sem_data.kind(), Some(ErrorKind::Validation));

        let cedo = engine
            .atualizar_tarefa(nr35.id, &concluir(Some(hoje + Days::new(2))), &gestor(), agora)
            .await
            .unwrap_err();
        assert_eq!(cedo.kind(), Some(ErrorKind::Validation));
        assert!(engine.eventos_da_tarefa(nr35.id).await.unwrap().is_empty());

        let pendente = engine
            .tarefas_do_remanejamento(registros[0])
            .await
            .unwrap()
            .into_iter()
            .find(|t| t.id == nr35.id)
            .unwrap();
        assert_eq!(pendente.status, StatusTarefa::Pendente);
        assert_eq!(pendente.data_vencimento, None);

        let vencimento = hoje + Days::new(31);
        let ok = engine
            .atualizar_tarefa(nr35.id, &concluir(Some(vencimento)), &gestor(), agora)
            .await
            .unwrap();
        assert_eq!(ok.valor.status, StatusTarefa::Concluido);
        assert_eq!(ok.valor.data_vencimento, Some(vencimento));

        // RH-owned tasks never need an expiry date
        engine.atualizar_tarefa(rh.id, &concluir(None), &gestor(), agora).await.unwrap();
    }

    #[tokio::test]
    async fn reopening_and_recompleting_a_task_keeps_every_history_row() {
        let (engine, _store) = montar();
        let agora = Utc::now();
        let (solicitacao, registros) =
            solicitacao_aprovada(&engine, TipoSolicitacao::Remanejamento, &[1], agora).await;
        let aso = engine
            .criar_tarefas_em_lote(registros[0], &["MEDICINA"], &gestor(), agora)
            .await
            .unwrap()
            .valor
            .remove(0);

        let reabrir = TarefaPatch {
            status: Some(StatusTarefa::Pendente),
            ..Default::default()
        };
        engine.concluir_tarefa(aso.id, None, &gestor(), agora).await.unwrap();
        engine
            .atualizar_tarefa(aso.id, &reabrir, &gestor(), agora + Duration::seconds(1))
            .await
            .unwrap();
        engine
            .concluir_tarefa(aso.id, None, &gestor(), agora + Duration::seconds(2))
            .await
            .unwrap();

        let transicoes: Vec<String> = engine
            .historico_da_solicitacao(solicitacao)
            .await
            .unwrap()
            .into_iter()
            .filter(|h| h.tarefa_id == Some(aso.id) && h.campo_alterado == "status")
            .map(|h| format!("{}->{}", h.valor_anterior.unwrap_or_default(), h.valor_novo.unwrap_or_default()))
            .collect();
        assert_eq!(
            transicoes,
            vec!["PENDENTE->CONCLUIDO", "CONCLUIDO->PENDENTE", "PENDENTE->CONCLUIDO"]
        );
        assert_eq!(engine.eventos_da_tarefa(aso.id).await.unwrap().len(), 3);
    }

    // Scenario 5
    #[tokio::test]
    async fn approval_moves_employee_to_destination_contract() {
        let (engine, store) = montar();
        let agora = Utc::now();
        let (_, registros) = solicitacao_aprovada(&engine, TipoSolicitacao::Remanejamento, &[1], agora).await;
        let registro_id = registros[0];

        let tarefas = engine
            .criar_tarefas_em_lote(registro_id, &["MEDICINA", "TREINAMENTO"], &gestor(), agora)
            .await
            .unwrap()
            .valor;
        concluir_todas(&engine, &tarefas, agora).await;
        assert!(crate::store::CatalogStore::funcionario(store.as_ref(), FuncionarioId(1))
            .await
            .unwrap()
            .unwrap()
            .em_migracao);

        aprovar_prestserv(&engine, registro_id, agora).await;

        let funcionario = crate::store::CatalogStore::funcionario(store.as_ref(), FuncionarioId(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(funcionario.contrato_id, Some(DESTINO));
        assert!(!funcionario.em_migracao);
    }

    // Scenario 6 / all-or-nothing conclusion
    #[tokio::test]
    async fn request_concludes_only_when_every_member_is_approved() {
        let (engine, _store) = montar();
        let agora = Utc::now();
        let (sol_id, registros) =
            solicitacao_aprovada(&engine, TipoSolicitacao::Remanejamento, &[1, 2], agora).await;
        let (a, b) = (registros[0], registros[1]);

        for r in [a, b] {
            let tarefas = engine
                .criar_tarefas_em_lote(r, &["MEDICINA", "TREINAMENTO"], &gestor(), agora)
                .await
                .unwrap()
                .valor;
            concluir_todas(&engine, &tarefas, agora).await;
        }

        aprovar_prestserv(&engine, a, agora).await;
        let solicitacao = engine.solicitacao(sol_id).await.unwrap();
        assert_eq!(solicitacao.status, StatusSolicitacao::Aprovado);
        assert_eq!(solicitacao.data_conclusao, None);

        let pendente = engine.verificar_conclusao(sol_id, &gestor(), agora).await.unwrap();
        assert_eq!(pendente.valor, DecisaoConclusao::Pendente { membros_pendentes: 1 });

        let fim = agora + Duration::hours(1);
        aprovar_prestserv(&engine, b, fim).await;
        let solicitacao = engine.solicitacao(sol_id).await.unwrap();
        assert_eq!(solicitacao.status, StatusSolicitacao::Concluido);
        assert_eq!(solicitacao.data_conclusao, Some(fim));
        assert_eq!(solicitacao.concluido_por, Some(gestor()));
    }

    // Completion idempotence
    #[tokio::test]
    async fn rechecking_a_concluded_request_changes_nothing() {
        let (engine, _store) = montar();
        let agora = Utc::now();
        let (sol_id, registros) = solicitacao_aprovada(&engine, TipoSolicitacao::Remanejamento, &[1], agora).await;
        let tarefas = engine
            .criar_tarefas_em_lote(registros[0], &["MEDICINA"], &gestor(), agora)
            .await
            .unwrap()
            .valor;
        concluir_todas(&engine, &tarefas, agora).await;
        aprovar_prestserv(&engine, registros[0], agora).await;

        let antes = engine.solicitacao(sol_id).await.unwrap();
        assert_eq!(antes.status, StatusSolicitacao::Concluido);

        let depois = agora + Duration::days(2);
        let r = engine.verificar_conclusao(sol_id, &Actor::Sistema, depois).await.unwrap();
        assert_eq!(r.valor, DecisaoConclusao::JaConcluida);
        assert!(r.eventos.is_empty());
        assert_eq!(engine.solicitacao(sol_id).await.unwrap().data_conclusao, antes.data_conclusao);

        let concluidas = engine
            .historico_da_solicitacao(sol_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|h| {
                h.entidade == EntidadeAuditada::Solicitacao
                    && h.valor_novo.as_deref() == Some(StatusSolicitacao::Concluido.as_str())
            })
            .count();
        assert_eq!(concluidas, 1);
    }

    // Monotonic qualification dates
    #[tokio::test]
    async fn older_completion_leaves_archived_qualification_unchanged() {
        let (engine, _store) = montar();
        let agora = Utc::now();
        let (_, registros) = solicitacao_aprovada(&engine, TipoSolicitacao::Remanejamento, &[1], agora).await;
        let tarefas = engine
            .criar_tarefas_em_lote(registros[0], &["MEDICINA"], &gestor(), agora)
            .await
            .unwrap()
            .valor;
        let aso = &tarefas[0];
        engine.concluir_tarefa(aso.id, None, &gestor(), agora).await.unwrap();

        let arquivada = engine.capacitacoes_do_funcionario(FuncionarioId(1)).await.unwrap();
        assert_eq!(arquivada.len(), 1);
        assert_eq!(arquivada[0].data_conclusao, agora);

        let retroativa = TarefaPatch {
            data_conclusao: Some(agora - Duration::days(90)),
            ..Default::default()
        };
        engine.atualizar_tarefa(aso.id, &retroativa, &gestor(), agora).await.unwrap();
        let r = engine.arquivar_capacitacao(aso.id, agora + Duration::hours(1)).await.unwrap();
        assert!(r.is_none());

        let depois = engine.capacitacoes_do_funcionario(FuncionarioId(1)).await.unwrap();
        assert_eq!(depois, arquivada);
    }

    #[tokio::test]
    async fn backfill_archives_completed_tasks_of_approved_records() {
        let config = EngineConfig {
            arquivar_capacitacao_na_conclusao: false,
            lote_backfill: 1,
            ..EngineConfig::default()
        };
        let (engine, store) = RemanejamentoEngine::in_memory(config);
        semear(&store);
        let agora = Utc::now();

        let (_, aprovados) = solicitacao_aprovada(&engine, TipoSolicitacao::Remanejamento, &[1], agora).await;
        let tarefas = engine
            .criar_tarefas_em_lote(aprovados[0], &["MEDICINA", "TREINAMENTO"], &gestor(), agora)
            .await
            .unwrap()
            .valor;
        concluir_todas(&engine, &tarefas, agora).await;
        aprovar_prestserv(&engine, aprovados[0], agora).await;

        let (_, em_andamento) = solicitacao_aprovada(&engine, TipoSolicitacao::Remanejamento, &[2], agora).await;
        let tarefas = engine
            .criar_tarefas_em_lote(em_andamento[0], &["MEDICINA"], &gestor(), agora)
            .await
            .unwrap()
            .valor;
        concluir_todas(&engine, &tarefas, agora).await;

        assert!(engine.capacitacoes_do_funcionario(FuncionarioId(1)).await.unwrap().is_empty());

        let relatorio = engine.backfill_capacitacoes(agora).await.unwrap();
        assert_eq!(relatorio.registros_lidos, 2);
        assert_eq!(relatorio.registros_elegiveis, 1);
        assert_eq!(relatorio.capacitacoes_gravadas, 2);
        assert_eq!(relatorio.falhas, 0);
        assert_eq!(engine.capacitacoes_do_funcionario(FuncionarioId(1)).await.unwrap().len(), 2);
        assert!(engine.capacitacoes_do_funcionario(FuncionarioId(2)).await.unwrap().is_empty());

        let repeticao = engine.backfill_capacitacoes(agora).await.unwrap();
        assert_eq!(repeticao.capacitacoes_gravadas, 0);
    }

    #[tokio::test]
    async fn dismissal_approval_deactivates_instead_of_transferring() {
        let (engine, store) = montar();
        let agora = Utc::now();
        let (sol_id, registros) = solicitacao_aprovada(&engine, TipoSolicitacao::Desligamento, &[2], agora).await;
        let tarefas = engine
            .criar_tarefas_em_lote(registros[0], &["RH"], &gestor(), agora)
            .await
            .unwrap()
            .valor;
        concluir_todas(&engine, &tarefas, agora).await;
        aprovar_prestserv(&engine, registros[0], agora).await;

        let funcionario = crate::store::CatalogStore::funcionario(store.as_ref(), FuncionarioId(2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(funcionario.contrato_id, Some(ORIGEM));
        assert!(!funcionario.em_migracao);
        let registro = engine.registro(registros[0]).await.unwrap();
        assert_eq!(registro.status_funcionario, StatusFuncionario::Inativo);
        assert_eq!(engine.solicitacao(sol_id).await.unwrap().status, StatusSolicitacao::Concluido);
    }

    #[tokio::test]
    async fn no_new_tasks_once_prestserv_is_submitted() {
        let (engine, _store) = montar();
        let agora = Utc::now();
        let (_, registros) = solicitacao_aprovada(&engine, TipoSolicitacao::Remanejamento, &[1], agora).await;
        engine
            .atualizar_prestserv(registros[0], &prestserv(StatusPrestserv::Submetido), &gestor(), agora)
            .await
            .unwrap();

        let err = engine
            .criar_tarefas_em_lote(registros[0], &["RH"], &gestor(), agora)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidState));

        let avulsa = NovaTarefa {
            remanejamento_id: registros[0],
            tipo: "Crachá".into(),
            descricao: None,
            responsavel: "RH".into(),
            tarefa_padrao_id: None,
            treinamento_id: None,
            prioridade: None,
            data_limite: None,
        };
        let err = engine.criar_tarefa(avulsa, &gestor(), agora).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidState));
        assert!(engine.tarefas_do_remanejamento(registros[0]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_department_and_missing_record_are_rejected_before_writing() {
        let (engine, _store) = montar();
        let agora = Utc::now();
        let (_, registros) = solicitacao_aprovada(&engine, TipoSolicitacao::Remanejamento, &[1], agora).await;

        let err = engine
            .criar_tarefas_em_lote(registros[0], &["RH", "LOGISTICA"], &gestor(), agora)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Validation));
        assert!(engine.tarefas_do_remanejamento(registros[0]).await.unwrap().is_empty());

        let err = engine
            .criar_tarefas_em_lote(RemanejamentoFuncionarioId::new(), &["RH"], &gestor(), agora)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));

        let err = engine
            .concluir_tarefa(TarefaId::new(), None, &gestor(), agora)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn rejected_request_releases_employees_and_refuses_work() {
        let (engine, store) = montar();
        let agora = Utc::now();
        let criada = engine
            .criar_solicitacao(nova_solicitacao(TipoSolicitacao::Remanejamento, &[1], agora))
            .await
            .unwrap();
        let (solicitacao, registros) = criada.valor;

        let duplicada = engine
            .criar_solicitacao(nova_solicitacao(TipoSolicitacao::Alocacao, &[1], agora))
            .await
            .unwrap_err();
        assert_eq!(duplicada.kind(), Some(ErrorKind::InvalidState));

        engine
            .atualizar_status_solicitacao(solicitacao.id, StatusSolicitacao::Rejeitado, &gestor(), agora)
            .await
            .unwrap();
        let funcionario = crate::store::CatalogStore::funcionario(store.as_ref(), FuncionarioId(1))
            .await
            .unwrap()
            .unwrap();
        assert!(!funcionario.em_migracao);

        let err = engine
            .criar_tarefas_em_lote(registros[0].id, &["RH"], &gestor(), agora)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidState));

        let err = engine
            .atualizar_status_solicitacao(solicitacao.id, StatusSolicitacao::Concluido, &gestor(), agora)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidState));
    }

    #[tokio::test]
    async fn deleting_a_task_recomputes_and_audits_from_the_snapshot() {
        let (engine, _store) = montar();
        let agora = Utc::now();
        let (sol_id, registros) = solicitacao_aprovada(&engine, TipoSolicitacao::Remanejamento, &[1], agora).await;
        let tarefas = engine
            .criar_tarefas_em_lote(registros[0], &["MEDICINA", "TREINAMENTO"], &gestor(), agora)
            .await
            .unwrap()
            .valor;
        let aso = tarefas.iter().find(|t| t.responsavel == "MEDICINA").unwrap();
        let nr35 = tarefas.iter().find(|t| t.treinamento_id.is_some()).unwrap();
        engine.concluir_tarefa(aso.id, None, &gestor(), agora).await.unwrap();

        let excluida = engine.excluir_tarefa(nr35.id, &gestor(), agora).await.unwrap();
        assert_eq!(excluida.valor.id, nr35.id);
        assert_eq!(
            engine.registro(registros[0]).await.unwrap().status_tarefas,
            StatusTarefas::SubmeterRascunho
        );

        let historico = engine.historico_da_solicitacao(sol_id).await.unwrap();
        assert!(historico.iter().any(|h| h.tarefa_id == Some(nr35.id)
            && h.entidade == EntidadeAuditada::Tarefa
            && h.valor_anterior.as_deref() == Some(StatusTarefa::Pendente.as_str())));

        let err = engine.excluir_tarefa(nr35.id, &gestor(), agora).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn task_status_events_and_progress_summary() {
        let (engine, _store) = montar();
        let agora = Utc::now();
        let (_, registros) = solicitacao_aprovada(&engine, TipoSolicitacao::Remanejamento, &[1], agora).await;
        let tarefas = engine
            .criar_tarefas_em_lote(registros[0], &["RH"], &gestor(), agora)
            .await
            .unwrap()
            .valor;
        engine.concluir_tarefa(tarefas[0].id, None, &gestor(), agora).await.unwrap();
        let em_andamento = TarefaPatch {
            status: Some(StatusTarefa::EmAndamento),
            ..Default::default()
        };
        engine.atualizar_tarefa(tarefas[1].id, &em_andamento, &gestor(), agora).await.unwrap();

        let eventos = engine.eventos_da_tarefa(tarefas[0].id).await.unwrap();
        assert_eq!(eventos.len(), 1);
        assert_eq!(eventos[0].status_anterior, Some(StatusTarefa::Pendente));
        assert_eq!(eventos[0].status_novo, StatusTarefa::Concluido);
        assert_eq!(eventos[0].usuario_responsavel, "Ana Gestora");

        let resumo = engine
            .resumo_progresso(registros[0], agora + Duration::days(31))
            .await
            .unwrap();
        assert_eq!(resumo.total, 8);
        assert_eq!(resumo.concluidas, 1);
        assert_eq!(resumo.em_andamento, 1);
        assert_eq!(resumo.pendentes, 6);
        assert_eq!(resumo.vencidas, 7);
        assert_eq!(
            engine.tarefas_vencidas(agora + Duration::days(31)).await.unwrap().len(),
            7
        );
    }

    #[tokio::test]
    async fn cascade_is_published_in_processing_order() {
        let (engine, _store) = montar();
        let sub = engine.subscribe();
        let agora = Utc::now();
        let (sol_id, registros) = solicitacao_aprovada(&engine, TipoSolicitacao::Remanejamento, &[1], agora).await;
        let tarefas = engine
            .criar_tarefas_em_lote(registros[0], &["MEDICINA"], &gestor(), agora)
            .await
            .unwrap()
            .valor;
        concluir_todas(&engine, &tarefas, agora).await;
        sub.drain();

        let submetido = engine
            .atualizar_prestserv(registros[0], &prestserv(StatusPrestserv::Submetido), &gestor(), agora)
            .await
            .unwrap();
        assert_eq!(submetido.eventos.len(), 1);
        let r = engine
            .atualizar_prestserv(registros[0], &prestserv(StatusPrestserv::Aprovado), &gestor(), agora)
            .await
            .unwrap();

        let tipos: Vec<&str> = r.eventos.iter().map(remanejamento_events::Event::event_type).collect();
        assert_eq!(
            tipos,
            vec![
                "remanejamento.prestserv.alterado",
                "remanejamento.contrato.transferido",
                "remanejamento.funcionario.pronto",
                "remanejamento.solicitacao.concluida",
            ]
        );

        let publicados = sub.drain();
        assert_eq!(publicados.len(), 5);
        assert!(publicados.windows(2).all(|w| w[0].sequence_number() < w[1].sequence_number()));
        assert!(publicados.iter().all(|e| e.payload().solicitacao_id() == sol_id));
    }

    #[tokio::test]
    async fn audit_rows_name_the_actor_and_fall_back_to_sistema() {
        let (engine, _store) = montar();
        let agora = Utc::now();
        let (sol_id, registros) = solicitacao_aprovada(&engine, TipoSolicitacao::Remanejamento, &[1], agora).await;
        let sem_usuario = Actor::from_parts(None, None);
        engine
            .atualizar_prestserv(registros[0], &prestserv(StatusPrestserv::Criado), &sem_usuario, agora)
            .await
            .unwrap();

        let historico = engine.historico_da_solicitacao(sol_id).await.unwrap();
        let criacao = historico
            .iter()
            .find(|h| h.entidade == EntidadeAuditada::Solicitacao && h.campo_alterado == "status")
            .unwrap();
        assert_eq!(criacao.usuario_responsavel, "Ana Gestora");
        assert_eq!(criacao.usuario_responsavel_id, Some(UserId(10)));

        let prestserv = historico
            .iter()
            .find(|h| h.entidade == EntidadeAuditada::Prestserv)
            .unwrap();
        assert_eq!(prestserv.usuario_responsavel, "Sistema");
        assert_eq!(prestserv.usuario_responsavel_id, None);
        assert!(prestserv.descricao.contains("João Silva"));
    }

    struct AuditoriaIndisponivel;

    #[async_trait]
    impl AuditStore for AuditoriaIndisponivel {
        async fn inserir_historico(&self, _historico: &HistoricoRemanejamento) -> StoreResult<()> {
            Err(StoreError::Backend("audit table unavailable".into()))
        }

        async fn inserir_evento_tarefa(&self, _evento: &TarefaStatusEvento) -> StoreResult<()> {
            Err(StoreError::Backend("audit table unavailable".into()))
        }

        async fn historico_da_solicitacao(
            &self,
            _id: SolicitacaoId,
        ) -> StoreResult<Vec<HistoricoRemanejamento>> {
            Ok(Vec::new())
        }

        async fn eventos_da_tarefa(&self, _id: TarefaId) -> StoreResult<Vec<TarefaStatusEvento>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn audit_failures_never_block_transitions() {
        let store = Arc::new(InMemoryStore::new());
        semear(&store);
        let stores = Stores {
            auditoria: Arc::new(AuditoriaIndisponivel),
            ..Stores::shared(store.clone())
        };
        let engine = RemanejamentoEngine::new(stores, EngineConfig::default());
        let agora = Utc::now();

        let (sol_id, registros) = solicitacao_aprovada(&engine, TipoSolicitacao::Remanejamento, &[1], agora).await;
        let tarefas = engine
            .criar_tarefas_em_lote(registros[0], &["MEDICINA"], &gestor(), agora)
            .await
            .unwrap()
            .valor;
        concluir_todas(&engine, &tarefas, agora).await;
        aprovar_prestserv(&engine, registros[0], agora).await;

        assert_eq!(engine.solicitacao(sol_id).await.unwrap().status, StatusSolicitacao::Concluido);
        assert!(engine.historico_da_solicitacao(sol_id).await.unwrap().is_empty());
    }
}
