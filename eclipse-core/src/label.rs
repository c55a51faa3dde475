//! # Rótulos de Sensibilidade e Predições por Token
//!
//! Define o vocabulário de rótulos emitido pelo modelo de marcação (tagger) e a
//! unidade básica que ele produz: a [`TokenPrediction`].
//!
//! ## Rótulos
//!
//! | Rótulo                 | Id do modelo | Significado                              |
//! |------------------------|--------------|------------------------------------------|
//! | `SECURITY_CREDENTIALS` | 3            | Senhas, chaves de API, tokens, chaves PEM |
//! | `PERSONAL_DATA`        | 4            | E-mail, telefone, SSN/CPF, cartão         |
//! | `NETWORK_INFORMATION`  | 1            | IPs, MACs, hosts, URLs                    |
//! | `BENIGN`               | 2            | Texto comum, sem informação sensível      |
//! | `O`                    | -100         | Fora de entidade (sem rótulo)             |
//!
//! O rótulo `error` não é emitido pelo modelo: ele marca segmentos cujo tagger falhou.

use serde::{Deserialize, Serialize};

/// Nome do rótulo "sem entidade" usado pelo modelo.
pub const NO_ENTITY_LABEL: &str = "O";

/// Nome do rótulo atribuído a segmentos em que o tagger falhou.
pub const ERROR_LABEL: &str = "error";

/// Rótulos reconhecidos pelo sistema de triagem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    /// **Sem entidade**: o token não carrega nenhuma categoria.
    #[serde(rename = "O")]
    Outside,
    /// **Informação de rede**: endereços IP/MAC, hosts, URLs internas.
    #[serde(rename = "NETWORK_INFORMATION")]
    NetworkInformation,
    /// **Benigno**: texto comum.
    #[serde(rename = "BENIGN")]
    Benign,
    /// **Credenciais**: senhas, chaves, tokens de acesso.
    #[serde(rename = "SECURITY_CREDENTIALS")]
    SecurityCredentials,
    /// **Dados pessoais**: e-mail, telefone, documentos, cartões.
    #[serde(rename = "PERSONAL_DATA")]
    PersonalData,
    /// **Falha**: marcador de segmento cujo tagger retornou erro.
    #[serde(rename = "error")]
    Error,
}

impl Label {
    /// Número total de rótulos
    pub const COUNT: usize = 6;

    /// Todos os rótulos em ordem de índice (para tabelas de agregação)
    pub const ALL: [Label; Label::COUNT] = [
        Label::Outside,
        Label::NetworkInformation,
        Label::Benign,
        Label::SecurityCredentials,
        Label::PersonalData,
        Label::Error,
    ];

    /// Nome do rótulo como o modelo o emite (ex: "PERSONAL_DATA")
    pub fn name(&self) -> &'static str {
        match self {
            Label::Outside => NO_ENTITY_LABEL,
            Label::NetworkInformation => "NETWORK_INFORMATION",
            Label::Benign => "BENIGN",
            Label::SecurityCredentials => "SECURITY_CREDENTIALS",
            Label::PersonalData => "PERSONAL_DATA",
            Label::Error => ERROR_LABEL,
        }
    }

    /// Índice fixo do rótulo (posição em [`Label::ALL`])
    pub fn index(&self) -> usize {
        match self {
            Label::Outside => 0,
            Label::NetworkInformation => 1,
            Label::Benign => 2,
            Label::SecurityCredentials => 3,
            Label::PersonalData => 4,
            Label::Error => 5,
        }
    }

    /// Prioridade de desempate: maior vence.
    ///
    /// `SECURITY_CREDENTIALS > PERSONAL_DATA > NETWORK_INFORMATION > BENIGN > O > error`
    pub fn priority(&self) -> u8 {
        match self {
            Label::SecurityCredentials => 5,
            Label::PersonalData => 4,
            Label::NetworkInformation => 3,
            Label::Benign => 2,
            Label::Outside => 1,
            Label::Error => 0,
        }
    }

    /// Indica se o rótulo é uma categoria sensível (rede, credenciais, dados pessoais)
    pub fn is_sensitive(&self) -> bool {
        matches!(
            self,
            Label::NetworkInformation | Label::SecurityCredentials | Label::PersonalData
        )
    }

    /// Parseia o rótulo a partir do nome emitido pelo modelo.
    ///
    /// `error` não é aceito: só o pipeline atribui esse rótulo.
    pub fn from_label(s: &str) -> Option<Self> {
        match s {
            NO_ENTITY_LABEL => Some(Label::Outside),
            "NETWORK_INFORMATION" => Some(Label::NetworkInformation),
            "BENIGN" => Some(Label::Benign),
            "SECURITY_CREDENTIALS" => Some(Label::SecurityCredentials),
            "PERSONAL_DATA" => Some(Label::PersonalData),
            _ => None,
        }
    }

    /// Id de classe usado pela cabeça de classificação do modelo
    pub fn model_id(&self) -> Option<i64> {
        match self {
            Label::Outside => Some(-100),
            Label::NetworkInformation => Some(1),
            Label::Benign => Some(2),
            Label::SecurityCredentials => Some(3),
            Label::PersonalData => Some(4),
            Label::Error => None,
        }
    }

    /// Converte um id de classe do modelo em rótulo. Ids desconhecidos viram `O`.
    pub fn from_model_id(id: i64) -> Self {
        Label::ALL
            .iter()
            .copied()
            .find(|label| label.model_id() == Some(id))
            .unwrap_or(Label::Outside)
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A predição do tagger para um único token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPrediction {
    pub token: String,
    pub label: Label,
    /// Confiança da predição (0.0 a 1.0)
    pub confidence: f64,
}

impl TokenPrediction {
    pub fn new(token: impl Into<String>, label: Label, confidence: f64) -> Self {
        Self {
            token: token.into(),
            label,
            confidence,
        }
    }

    /// Constrói a predição a partir da saída textual de um modelo.
    /// Rótulos desconhecidos são tratados como `O`.
    pub fn from_model_output(token: impl Into<String>, label: &str, confidence: f64) -> Self {
        Self::new(
            token,
            Label::from_label(label).unwrap_or(Label::Outside),
            confidence,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_names_round_trip() {
        for label in Label::ALL {
            if label == Label::Error {
                assert_eq!(Label::from_label(label.name()), None);
            } else {
                assert_eq!(Label::from_label(label.name()), Some(label));
            }
        }
    }

    #[test]
    fn test_all_labels_have_unique_indices_and_priorities() {
        let mut indices: Vec<usize> = Label::ALL.iter().map(|l| l.index()).collect();
        indices.sort();
        indices.dedup();
        assert_eq!(indices.len(), Label::COUNT);

        let mut priorities: Vec<u8> = Label::ALL.iter().map(|l| l.priority()).collect();
        priorities.sort();
        priorities.dedup();
        assert_eq!(priorities.len(), Label::COUNT);

        for (i, label) in Label::ALL.iter().enumerate() {
            assert_eq!(label.index(), i);
        }
    }

    #[test]
    fn test_priority_order() {
        assert!(Label::SecurityCredentials.priority() > Label::PersonalData.priority());
        assert!(Label::PersonalData.priority() > Label::NetworkInformation.priority());
        assert!(Label::NetworkInformation.priority() > Label::Benign.priority());
        assert!(Label::Benign.priority() > Label::Outside.priority());
    }

    #[test]
    fn test_model_ids() {
        assert_eq!(Label::from_model_id(-100), Label::Outside);
        assert_eq!(Label::from_model_id(1), Label::NetworkInformation);
        assert_eq!(Label::from_model_id(3), Label::SecurityCredentials);
        // id fora do vocabulário
        assert_eq!(Label::from_model_id(42), Label::Outside);
        assert_eq!(Label::Error.model_id(), None);
    }

    #[test]
    fn test_sensitive_labels() {
        assert!(Label::PersonalData.is_sensitive());
        assert!(!Label::Benign.is_sensitive());
        assert!(!Label::Outside.is_sensitive());
        assert!(!Label::Error.is_sensitive());
    }

    #[test]
    fn test_unknown_model_label_becomes_outside() {
        let p = TokenPrediction::from_model_output("foo", "B-PER", 0.7);
        assert_eq!(p.label, Label::Outside);
        assert_eq!(p.token, "foo");
    }

    #[test]
    fn test_label_serializes_as_model_name() {
        let json = serde_json::to_string(&Label::NetworkInformation).unwrap();
        assert_eq!(json, "\"NETWORK_INFORMATION\"");
        let back: Label = serde_json::from_str("\"error\"").unwrap();
        assert_eq!(back, Label::Error);
    }
}
