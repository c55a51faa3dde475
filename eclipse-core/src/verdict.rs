//! # Veredictos e Redução do Documento
//!
//! - [`SegmentVerdict`]: resultado de um segmento (linha ou texto inteiro).
//! - [`DocumentVerdict`]: resultado do documento, derivado de todos os segmentos.
//! - [`DocumentReducer`]: acumula veredictos de segmento e escolhe o dominante.
//!
//! ## Regra de redução
//!
//! O documento assume o veredicto do segmento de maior confiança **entre os de alta
//! confiança**. Se nenhum segmento for de alta confiança, assume o de maior confiança
//! geral. Empates seguem a mesma ordem do agregador (suporte, prioridade do rótulo)
//! e, por fim, o menor índice, de modo que a ordem de chegada não altera o resultado.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::aggregator::{dominance, Aggregate};
use crate::label::Label;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentVerdict {
    /// Índice do segmento no documento
    pub index: usize,
    pub processed_text: String,
    pub dominant_label: Label,
    pub dominant_confidence: f64,
    pub is_high_confidence: bool,
    /// Tokens que sustentam o rótulo dominante
    pub support: usize,
    pub average_confidence: f64,
    pub detected_labels: Vec<Label>,
    /// Mensagem do tagger quando o segmento falhou
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl SegmentVerdict {
    pub fn from_aggregate(index: usize, text: &str, aggregate: Aggregate) -> Self {
        Self {
            index,
            processed_text: text.to_string(),
            dominant_label: aggregate.dominant_label,
            dominant_confidence: aggregate.dominant_confidence,
            is_high_confidence: aggregate.is_high_confidence,
            support: aggregate.support,
            average_confidence: aggregate.average_confidence,
            detected_labels: aggregate.detected_labels,
            failure: None,
        }
    }

    /// Marcador de falha: rótulo `error`, confiança zero, nunca de alta confiança.
    pub fn failed(index: usize, text: &str, message: impl Into<String>) -> Self {
        Self {
            index,
            processed_text: text.to_string(),
            dominant_label: Label::Error,
            dominant_confidence: 0.0,
            is_high_confidence: false,
            support: 0,
            average_confidence: 0.0,
            detected_labels: vec![],
            failure: Some(message.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.dominant_label == Label::Error
    }

    /// `Greater` quando `self` deve representar o documento no lugar de `other`.
    fn outranks(&self, other: &SegmentVerdict) -> Ordering {
        dominance(
            (self.dominant_confidence, self.support, self.dominant_label),
            (other.dominant_confidence, other.support, other.dominant_label),
        )
        .then(other.index.cmp(&self.index))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentVerdict {
    /// Texto do segmento dominante (vazio quando não há segmentos)
    pub processed_text: String,
    pub dominant_label: Label,
    pub dominant_confidence: f64,
    pub is_high_confidence: bool,
    pub dominant_segment: Option<usize>,
    pub total_segments: usize,
    pub failed_segments: usize,
}

/// Acumulador da redução de documento.
#[derive(Debug, Clone, Default)]
pub struct DocumentReducer {
    best_high: Option<SegmentVerdict>,
    best_any: Option<SegmentVerdict>,
    total: usize,
    failed: usize,
}

impl DocumentReducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, verdict: &SegmentVerdict) {
        self.total += 1;
        if verdict.is_failure() {
            self.failed += 1;
        }
        if verdict.is_high_confidence {
            keep_best(&mut self.best_high, verdict);
        }
        keep_best(&mut self.best_any, verdict);
    }

    pub fn failed_segments(&self) -> usize {
        self.failed
    }

    pub fn total_segments(&self) -> usize {
        self.total
    }

    pub fn finish(self) -> DocumentVerdict {
        match self.best_high.or(self.best_any) {
            Some(best) => DocumentVerdict {
                processed_text: best.processed_text,
                dominant_label: best.dominant_label,
                dominant_confidence: best.dominant_confidence,
                is_high_confidence: best.is_high_confidence,
                dominant_segment: Some(best.index),
                total_segments: self.total,
                failed_segments: self.failed,
            },
            None => DocumentVerdict {
                processed_text: String::new(),
                dominant_label: Label::Outside,
                dominant_confidence: 0.0,
                is_high_confidence: false,
                dominant_segment: None,
                total_segments: 0,
                failed_segments: 0,
            },
        }
    }
}

fn keep_best(slot: &mut Option<SegmentVerdict>, candidate: &SegmentVerdict) {
    let replace = match slot {
        Some(current) => candidate.outranks(current) == Ordering::Greater,
        None => true,
    };
    if replace {
        *slot = Some(candidate.clone());
    }
}

/// Reduz uma sequência de veredictos de segmento a um veredicto de documento.
pub fn reduce<'a>(verdicts: impl IntoIterator<Item = &'a SegmentVerdict>) -> DocumentVerdict {
    let mut reducer = DocumentReducer::new();
    for verdict in verdicts {
        reducer.push(verdict);
    }
    reducer.finish()
}
