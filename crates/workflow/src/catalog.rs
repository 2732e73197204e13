//! Lookup inputs owned by catalog collaborators: standard-task templates,
//! the training catalog and the training matrix. The engine never mutates
//! these.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use remanejamento_core::{ContratoId, TarefaPadraoId, TreinamentoId, ValueObject};

use crate::setor::Setor;
use crate::texto::normalizar;

/// Standard checklist-task template for RH/MEDICINA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TarefaPadrao {
    pub id: TarefaPadraoId,
    pub setor: Setor,
    pub tipo: String,
    pub descricao: Option<String>,
    pub ativo: bool,
}

/// Unit of a training's validity period, normalized from free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnidadeValidade {
    Dias,
    Meses,
    Anos,
    /// No expiry ("único", "indeterminado", blank, unknown).
    Unico,
}

impl UnidadeValidade {
    pub fn normalizar(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return UnidadeValidade::Unico;
        };
        match normalizar(raw).as_str() {
            "DIA" | "DIAS" => UnidadeValidade::Dias,
            "MES" | "MESES" => UnidadeValidade::Meses,
            "ANO" | "ANOS" => UnidadeValidade::Anos,
            _ => UnidadeValidade::Unico,
        }
    }
}

/// Validity period of a training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validade {
    pub valor: u32,
    pub unidade: UnidadeValidade,
}

impl ValueObject for Validade {}

impl Validade {
    pub fn new(valor: Option<i64>, unidade: Option<&str>) -> Self {
        let valor = valor
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(0);
        Self {
            valor,
            unidade: UnidadeValidade::normalizar(unidade),
        }
    }

    /// Whether completing the training yields a finite expiry date.
    pub fn is_finita(&self) -> bool {
        self.unidade != UnidadeValidade::Unico && self.valor > 0
    }

    /// Expiry date of a qualification obtained on `data`.
    pub fn vencimento_a_partir(&self, data: NaiveDate) -> Option<NaiveDate> {
        if !self.is_finita() {
            return None;
        }
        match self.unidade {
            UnidadeValidade::Dias => data.checked_add_days(Days::new(u64::from(self.valor))),
            UnidadeValidade::Meses => data.checked_add_months(Months::new(self.valor)),
            UnidadeValidade::Anos => data.checked_add_months(Months::new(self.valor.saturating_mul(12))),
            UnidadeValidade::Unico => None,
        }
    }
}

/// Training-catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treinamento {
    pub id: TreinamentoId,
    pub nome: String,
    pub descricao: Option<String>,
    pub validade_valor: Option<i64>,
    pub validade_unidade: Option<String>,
}

impl Treinamento {
    pub fn validade(&self) -> Validade {
        Validade::new(self.validade_valor, self.validade_unidade.as_deref())
    }

    /// Case-insensitive exact name match.
    pub fn tem_nome(&self, nome: &str) -> bool {
        normalizar(&self.nome) == normalizar(nome)
    }
}

/// One row of a contract's training matrix: employees of `funcao` assigned to
/// `contrato_id` must hold `treinamento_id`. `funcao = None` applies to every
/// function on the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrizTreinamento {
    pub contrato_id: ContratoId,
    pub funcao: Option<String>,
    pub treinamento_id: TreinamentoId,
}

impl MatrizTreinamento {
    pub fn aplica_a(&self, contrato_id: ContratoId, funcao: Option<&str>) -> bool {
        if self.contrato_id != contrato_id {
            return false;
        }
        match (&self.funcao, funcao) {
            (None, _) => true,
            (Some(exigida), Some(atual)) => normalizar(exigida) == normalizar(atual),
            (Some(_), None) => false,
        }
    }
}
