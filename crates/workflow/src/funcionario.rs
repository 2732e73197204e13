//! Collaborator-owned records the engine reads and, on approval, writes.

use serde::{Deserialize, Serialize};

use remanejamento_core::{ContratoId, FuncionarioId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Funcionario {
    pub id: FuncionarioId,
    pub nome: String,
    pub matricula: String,
    pub funcao: Option<String>,
    /// Live contract assignment. Only the approval gate changes it.
    pub contrato_id: Option<ContratoId>,
    pub em_migracao: bool,
}

impl Funcionario {
    /// Human-readable label used in audit descriptions.
    pub fn rotulo(&self) -> String {
        format!("{} (matrícula {})", self.nome, self.matricula)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contrato {
    pub id: ContratoId,
    pub numero: String,
    pub nome: String,
    pub cliente: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_embeds_name_and_registration() {
        let f = Funcionario {
            id: FuncionarioId(1),
            nome: "Maria Souza".into(),
            matricula: "10231".into(),
            funcao: None,
            contrato_id: None,
            em_migracao: false,
        };
        assert_eq!(f.rotulo(), "Maria Souza (matrícula 10231)");
    }
}
