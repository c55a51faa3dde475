//! Relatório HTML da triagem (templates askama).
//!
//! Cada segmento vira uma linha do relatório. Linhas de alta confiança aparecem em
//! vermelho; no modo debug cada linha ganha o rótulo e a confiança com duas casas.
//! O texto é escapado pelo askama, já que o template é `.html`.

use askama::Template;
use eclipse_core::{DocumentVerdict, SegmentVerdict};

pub struct ReportLine {
    pub text: String,
    pub high: bool,
    /// Vazio fora do modo debug
    pub annotation: String,
}

#[derive(Template)]
#[template(path = "report.html")]
pub struct ReportTemplate {
    pub lines: Vec<ReportLine>,
    pub has_document: bool,
    pub document_label: String,
    pub document_confidence: String,
    pub document_high: bool,
    pub total_segments: usize,
    pub failed_segments: usize,
    pub char_count: usize,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub threshold: String,
}

fn annotate(verdict: &SegmentVerdict) -> String {
    match &verdict.failure {
        Some(message) => format!("Label: {}, Erro: {}", verdict.dominant_label, message),
        None => format!(
            "Label: {}, Conf.: {:.2}",
            verdict.dominant_label, verdict.dominant_confidence
        ),
    }
}

impl ReportTemplate {
    pub fn new(
        original_text: &str,
        segments: &[SegmentVerdict],
        document: Option<&DocumentVerdict>,
        debug: bool,
    ) -> Self {
        let lines = segments
            .iter()
            .map(|verdict| ReportLine {
                text: verdict.processed_text.clone(),
                high: verdict.is_high_confidence,
                annotation: if debug { annotate(verdict) } else { String::new() },
            })
            .collect();

        Self {
            lines,
            has_document: document.is_some(),
            document_label: document
                .map(|d| d.dominant_label.to_string())
                .unwrap_or_default(),
            document_confidence: document
                .map(|d| format!("{:.2}", d.dominant_confidence))
                .unwrap_or_default(),
            document_high: document.is_some_and(|d| d.is_high_confidence),
            total_segments: document.map_or(segments.len(), |d| d.total_segments),
            failed_segments: document.map_or(0, |d| d.failed_segments),
            char_count: original_text.chars().count(),
        }
    }
}

/// Renderiza o relatório de um documento já triado.
pub fn render_report(
    original_text: &str,
    segments: &[SegmentVerdict],
    document: Option<&DocumentVerdict>,
    debug: bool,
) -> Result<String, askama::Error> {
    ReportTemplate::new(original_text, segments, document, debug).render()
}
