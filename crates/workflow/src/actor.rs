use serde::{Deserialize, Serialize};

use remanejamento_core::UserId;

/// Who performed an operation, for audit attribution.
///
/// The identity collaborator may be absent or only know a display name; both
/// degrade gracefully and never block a transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tipo", rename_all = "snake_case")]
pub enum Actor {
    Usuario { id: UserId, nome: String },
    /// Free-text name without a user id.
    Nomeado { nome: String },
    #[default]
    Sistema,
}

impl Actor {
    pub fn usuario(id: UserId, nome: impl Into<String>) -> Self {
        Actor::Usuario {
            id,
            nome: nome.into(),
        }
    }

    /// Build from whatever the identity collaborator could supply.
    pub fn from_parts(id: Option<UserId>, nome: Option<String>) -> Self {
        let nome = nome.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        match (id, nome) {
            (Some(id), Some(nome)) => Actor::Usuario { id, nome },
            (Some(id), None) => Actor::Usuario {
                id,
                nome: format!("usuário {id}"),
            },
            (None, Some(nome)) => Actor::Nomeado { nome },
            (None, None) => Actor::Sistema,
        }
    }

    pub fn nome(&self) -> &str {
        match self {
            Actor::Usuario { nome, .. } | Actor::Nomeado { nome } => nome,
            Actor::Sistema => "Sistema",
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Actor::Usuario { id, .. } => Some(*id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_identity_degrades_to_sistema() {
        assert_eq!(Actor::from_parts(None, None), Actor::Sistema);
        assert_eq!(Actor::from_parts(None, Some("   ".into())), Actor::Sistema);
        assert_eq!(Actor::Sistema.nome(), "Sistema");
    }

    #[test]
    fn partial_identity_is_kept() {
        let a = Actor::from_parts(Some(UserId(9)), None);
        assert_eq!(a.user_id(), Some(UserId(9)));
        assert_eq!(a.nome(), "usuário 9");

        let b = Actor::from_parts(None, Some("Ana".into()));
        assert_eq!(b.nome(), "Ana");
        assert_eq!(b.user_id(), None);
    }
}
