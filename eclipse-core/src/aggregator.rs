//! # Agregador de Rótulos
//!
//! Transforma a sequência de predições de um segmento em um único rótulo dominante.
//!
//! ## Algoritmo
//!
//! 1. Agrupa as predições por rótulo numa tabela fixa indexada por [`Label::index`]
//!    (nunca depende da ordem de iteração de um `HashMap`).
//! 2. Para cada grupo calcula a confiança média e o suporte (número de tokens).
//! 3. O grupo dominante é o de maior média; empates vão para o maior suporte e depois
//!    para a prioridade fixa do rótulo (`SECURITY_CREDENTIALS > PERSONAL_DATA >
//!    NETWORK_INFORMATION > BENIGN`).
//! 4. `O` só é candidato quando é o único rótulo presente.
//!
//! Um segmento sem predições resulta em `("O", 0.0, false)`.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::label::{Label, TokenPrediction};

/// Agregado de todas as predições de um mesmo rótulo dentro de um segmento.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: Label,
    pub mean_confidence: f64,
    /// Quantidade de tokens que contribuíram (sempre ≥ 1)
    pub support: usize,
}

/// Resultado da agregação de um segmento.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub dominant_label: Label,
    pub dominant_confidence: f64,
    pub support: usize,
    pub is_high_confidence: bool,
    /// Confiança média sobre todos os tokens, independente do rótulo
    pub average_confidence: f64,
    /// Rótulos diferentes de `O` encontrados, em ordem de índice
    pub detected_labels: Vec<Label>,
    /// Um placar por rótulo presente, em ordem de índice
    pub scores: Vec<LabelScore>,
}

impl Aggregate {
    fn empty() -> Self {
        Self {
            dominant_label: Label::Outside,
            dominant_confidence: 0.0,
            support: 0,
            is_high_confidence: false,
            average_confidence: 0.0,
            detected_labels: vec![],
            scores: vec![],
        }
    }
}

/// Decide se um veredicto é de alta confiança.
///
/// Função pura do rótulo e da confiança: o rótulo precisa ser sensível e a confiança
/// precisa atingir o limiar.
pub fn is_high_confidence(label: Label, confidence: f64, threshold: f64) -> bool {
    label.is_sensitive() && confidence >= threshold
}

/// Ordem de dominância entre dois candidatos `(confiança, suporte, rótulo)`.
///
/// `Ordering::Greater` significa que `a` domina `b`.
pub fn dominance(a: (f64, usize, Label), b: (f64, usize, Label)) -> Ordering {
    a.0.total_cmp(&b.0)
        .then(a.1.cmp(&b.1))
        .then(a.2.priority().cmp(&b.2.priority()))
}

/// Agrupa as predições por rótulo, calculando média e suporte.
pub fn score_labels(predictions: &[TokenPrediction]) -> Vec<LabelScore> {
    let mut sums = [0.0f64; Label::COUNT];
    let mut counts = [0usize; Label::COUNT];

    for prediction in predictions {
        let i = prediction.label.index();
        sums[i] += prediction.confidence;
        counts[i] += 1;
    }

    Label::ALL
        .iter()
        .filter(|label| counts[label.index()] > 0)
        .map(|label| {
            let i = label.index();
            LabelScore {
                label: *label,
                mean_confidence: (sums[i] / counts[i] as f64).clamp(0.0, 1.0),
                support: counts[i],
            }
        })
        .collect()
}

/// Escolhe o placar dominante. `O` só participa se for o único rótulo.
pub fn dominant(scores: &[LabelScore]) -> Option<&LabelScore> {
    let has_entity = scores.iter().any(|s| s.label != Label::Outside);
    scores
        .iter()
        .filter(|s| !has_entity || s.label != Label::Outside)
        .max_by(|a, b| {
            dominance(
                (a.mean_confidence, a.support, a.label),
                (b.mean_confidence, b.support, b.label),
            )
        })
}

/// Agrega as predições de um segmento em um rótulo dominante.
pub fn aggregate(predictions: &[TokenPrediction], threshold: f64) -> Aggregate {
    if predictions.is_empty() {
        return Aggregate::empty();
    }

    let scores = score_labels(predictions);
    let Some(best) = dominant(&scores) else {
        return Aggregate::empty();
    };

    let average_confidence = (predictions.iter().map(|p| p.confidence).sum::<f64>()
        / predictions.len() as f64)
        .clamp(0.0, 1.0);
    let detected_labels = scores
        .iter()
        .map(|s| s.label)
        .filter(|l| *l != Label::Outside)
        .collect();

    Aggregate {
        dominant_label: best.label,
        dominant_confidence: best.mean_confidence,
        support: best.support,
        is_high_confidence: is_high_confidence(best.label, best.mean_confidence, threshold),
        average_confidence,
        detected_labels,
        scores,
    }
}
