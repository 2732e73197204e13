//! Departments that own checklist tasks.

use remanejamento_core::{DomainError, DomainResult, ValueObject};

use crate::texto::normalizar;

labeled_enum! {
    /// Department responsible for a checklist task.
    pub enum Setor {
        Rh => "RH",
        Medicina => "MEDICINA",
        Treinamento => "TREINAMENTO",
    }
}

impl ValueObject for Setor {}

impl Setor {
    /// Parse a department requested by a caller. Anything outside the closed
    /// set is a validation error.
    pub fn parse_requisitado(raw: &str) -> DomainResult<Setor> {
        raw.parse().map_err(|_| {
            DomainError::validation(format!(
                "setor inválido: '{raw}' (esperado RH, MEDICINA ou TREINAMENTO)"
            ))
        })
    }

    /// Exact (normalized) match of a task's `responsavel` against the closed
    /// set. Used where only department-owned tasks qualify.
    pub fn do_responsavel(responsavel: &str) -> Option<Setor> {
        responsavel.parse().ok()
    }

    /// Degraded-input recovery: guess the department from free text.
    ///
    /// Fields are tried in order; within a field TREIN wins over MEDIC, which
    /// wins over the HR keywords. `RH` must be a whole word.
    pub fn inferir(campos: &[&str]) -> Option<Setor> {
        campos.iter().find_map(|campo| inferir_campo(campo))
    }

    /// Department of a task, by priority: linked training, then the linked
    /// template's department, then keyword inference.
    pub fn resolver(
        vinculada_a_treinamento: bool,
        setor_template: Option<Setor>,
        responsavel: &str,
        tipo: &str,
        descricao: Option<&str>,
    ) -> Option<Setor> {
        if vinculada_a_treinamento {
            return Some(Setor::Treinamento);
        }
        if let Some(setor) = setor_template {
            return Some(setor);
        }
        Setor::inferir(&[responsavel, tipo, descricao.unwrap_or_default()])
    }
}

fn inferir_campo(campo: &str) -> Option<Setor> {
    let texto = normalizar(campo);
    if texto.is_empty() {
        return None;
    }
    if texto.contains("TREIN") {
        return Some(Setor::Treinamento);
    }
    if texto.contains("MEDIC") {
        return Some(Setor::Medicina);
    }
    let palavra_rh = texto
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|w| w == "RH");
    if palavra_rh || texto.contains("RECURSOS") || texto.contains("HUMANOS") {
        return Some(Setor::Rh);
    }
    None
}
