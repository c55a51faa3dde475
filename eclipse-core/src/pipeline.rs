//! # Pipeline de Triagem — Lote, Linha a Linha e Eventos
//!
//! O pipeline coordena segmentação, tagger e agregação. Existe um único núcleo de
//! iteração, [`Screening`], que produz um [`SegmentVerdict`] por segmento sob demanda.
//! Os modos de uso diferem apenas no destino (sink) dos veredictos:
//!
//! - **Lote**: os veredictos vão para um acumulador que reduz o documento no final.
//! - **Linha a linha**: o chamador consome o próprio iterador, ou os veredictos são
//!   empurrados por um canal (`mpsc`) como [`ScreenEvent`]s, permitindo que o
//!   servidor WebSocket transmita o progresso em tempo real.
//!
//! Nenhum estado é compartilhado entre segmentos: parar de consumir no meio do
//! documento é sempre seguro.

use std::ops::ControlFlow;
use std::sync::mpsc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::adapter::{check_predictions, TaggerAdapter};
use crate::aggregator::aggregate;
use crate::config::{ProcessingMode, ScreenConfig};
use crate::error::ScreenError;
use crate::segment::{split, whole, Segment, Segments};
use crate::verdict::{DocumentReducer, DocumentVerdict, SegmentVerdict};

/// Eventos emitidos durante a triagem linha a linha.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ScreenEvent {
    /// Um segmento foi processado (inclusive quando o tagger falhou).
    SegmentScreened { verdict: SegmentVerdict },
    /// Todos os segmentos foram processados.
    Done {
        total_segments: usize,
        failed_segments: usize,
        processing_ms: u64,
    },
}

/// Resumo de uma passada sobre os segmentos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScreenSummary {
    pub total_segments: usize,
    pub failed_segments: usize,
    /// `true` se o sink interrompeu a passada antes do fim
    pub stopped: bool,
    pub processing_ms: u64,
}

/// Destino dos veredictos produzidos pelo núcleo de iteração.
pub trait VerdictSink {
    /// Recebe um veredicto. `Break` interrompe a passada.
    fn accept(&mut self, verdict: SegmentVerdict) -> ControlFlow<()>;

    /// Chamado uma vez ao final da passada (também após `Break`).
    fn finish(&mut self, _summary: &ScreenSummary) {}
}

impl VerdictSink for Vec<SegmentVerdict> {
    fn accept(&mut self, verdict: SegmentVerdict) -> ControlFlow<()> {
        self.push(verdict);
        ControlFlow::Continue(())
    }
}

impl VerdictSink for DocumentReducer {
    fn accept(&mut self, verdict: SegmentVerdict) -> ControlFlow<()> {
        self.push(&verdict);
        ControlFlow::Continue(())
    }
}

/// Envia cada veredicto como [`ScreenEvent::SegmentScreened`] e termina com
/// [`ScreenEvent::Done`]. Se o receptor for descartado, a passada para.
impl VerdictSink for mpsc::Sender<ScreenEvent> {
    fn accept(&mut self, verdict: SegmentVerdict) -> ControlFlow<()> {
        match self.send(ScreenEvent::SegmentScreened { verdict }) {
            Ok(()) => ControlFlow::Continue(()),
            Err(_) => ControlFlow::Break(()),
        }
    }

    fn finish(&mut self, summary: &ScreenSummary) {
        let _ = self.send(ScreenEvent::Done {
            total_segments: summary.total_segments,
            failed_segments: summary.failed_segments,
            processing_ms: summary.processing_ms,
        });
    }
}

/// Resultado do modo lote: veredictos por segmento e veredicto do documento.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub segments: Vec<SegmentVerdict>,
    pub document: DocumentVerdict,
}

/// Acumulador do modo lote: guarda os segmentos e reduz o documento.
#[derive(Debug, Default)]
pub struct BatchCollector {
    segments: Vec<SegmentVerdict>,
    reducer: DocumentReducer,
}

impl BatchCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_outcome(self) -> BatchOutcome {
        BatchOutcome {
            segments: self.segments,
            document: self.reducer.finish(),
        }
    }
}

impl VerdictSink for BatchCollector {
    fn accept(&mut self, verdict: SegmentVerdict) -> ControlFlow<()> {
        self.reducer.push(&verdict);
        self.segments.push(verdict);
        ControlFlow::Continue(())
    }
}

/// Processa um único segmento: tagger → validação → agregação.
///
/// Falhas do tagger viram veredicto de erro; nunca interrompem o documento.
pub fn screen_segment<A: TaggerAdapter + ?Sized>(
    adapter: &A,
    segment: Segment<'_>,
    threshold: f64,
) -> SegmentVerdict {
    let result = adapter
        .tag(segment.text)
        .and_then(|predictions| check_predictions(&predictions).map(|()| predictions));

    match result {
        Ok(predictions) => {
            let verdict = SegmentVerdict::from_aggregate(
                segment.index,
                segment.text,
                aggregate(&predictions, threshold),
            );
            debug!(
                "Segmento {} [{}]: {} ({:.2}) em {} tokens",
                segment.index,
                adapter.name(),
                verdict.dominant_label,
                verdict.dominant_confidence,
                predictions.len()
            );
            verdict
        }
        Err(err) => {
            warn!(
                "Tagger {} falhou no segmento {}: {}",
                adapter.name(),
                segment.index,
                err
            );
            SegmentVerdict::failed(segment.index, segment.text, err.to_string())
        }
    }
}

/// Núcleo de iteração: sequência preguiçosa de veredictos, um por segmento.
///
/// Para recomeçar, basta chamar o pipeline de novo com a mesma entrada.
pub struct Screening<'a, A: ?Sized> {
    adapter: &'a A,
    threshold: f64,
    segments: Segments<'a>,
}

impl<'a, A: TaggerAdapter + ?Sized> Screening<'a, A> {
    /// Segmentos separados pelo delimitador da configuração
    pub fn lines(adapter: &'a A, config: &'a ScreenConfig, text: &'a str) -> Self {
        Self {
            adapter,
            threshold: config.threshold,
            segments: split(text, &config.delimiter),
        }
    }

    /// O texto inteiro como um único segmento
    pub fn whole_text(adapter: &'a A, config: &ScreenConfig, text: &'a str) -> Self {
        Self {
            adapter,
            threshold: config.threshold,
            segments: whole(text),
        }
    }

    /// Empurra todos os veredictos para `sink`, até o fim ou até um `Break`.
    pub fn drain_into<S: VerdictSink + ?Sized>(self, sink: &mut S) -> ScreenSummary {
        let start = Instant::now();
        let mut summary = ScreenSummary::default();

        for verdict in self {
            summary.total_segments += 1;
            if verdict.is_failure() {
                summary.failed_segments += 1;
            }
            if sink.accept(verdict).is_break() {
                summary.stopped = true;
                break;
            }
        }

        summary.processing_ms = start.elapsed().as_millis() as u64;
        sink.finish(&summary);
        summary
    }
}

impl<'a, A: TaggerAdapter + ?Sized> Iterator for Screening<'a, A> {
    type Item = SegmentVerdict;

    fn next(&mut self) -> Option<SegmentVerdict> {
        let segment = self.segments.next()?;
        Some(screen_segment(self.adapter, segment, self.threshold))
    }
}

/// Saída de [`process`], conforme o modo configurado.
pub enum Processed<'a, A: ?Sized> {
    /// Modos `batch` e `whole_text`
    Document(BatchOutcome),
    /// Modo `stream`
    Stream(Screening<'a, A>),
}

impl<'a, A: TaggerAdapter + ?Sized> Processed<'a, A> {
    /// Converte qualquer saída em lote, consumindo o stream se necessário.
    pub fn into_outcome(self) -> BatchOutcome {
        match self {
            Processed::Document(outcome) => outcome,
            Processed::Stream(screening) => {
                let mut collector = BatchCollector::new();
                screening.drain_into(&mut collector);
                collector.into_outcome()
            }
        }
    }
}

/// Ponto de entrada: valida a configuração e processa `text` conforme `config.mode`.
pub fn process<'a, A: TaggerAdapter + ?Sized>(
    text: &'a str,
    adapter: &'a A,
    config: &'a ScreenConfig,
) -> Result<Processed<'a, A>, ScreenError> {
    config.validate()?;
    Ok(match config.mode {
        ProcessingMode::Batch => {
            Processed::Document(collect(Screening::lines(adapter, config, text)))
        }
        ProcessingMode::WholeText => {
            Processed::Document(collect(Screening::whole_text(adapter, config, text)))
        }
        ProcessingMode::Stream => Processed::Stream(Screening::lines(adapter, config, text)),
    })
}

fn collect<A: TaggerAdapter + ?Sized>(screening: Screening<'_, A>) -> BatchOutcome {
    let mut collector = BatchCollector::new();
    screening.drain_into(&mut collector);
    collector.into_outcome()
}

/// Triagem com tagger e configuração fixos.
///
/// A configuração é validada na construção; depois disso nenhum método falha.
pub struct Screener<A> {
    adapter: A,
    config: ScreenConfig,
}

impl<A: TaggerAdapter> Screener<A> {
    pub fn new(adapter: A, config: ScreenConfig) -> Result<Self, ScreenError> {
        config.validate()?;
        Ok(Self { adapter, config })
    }

    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Processa conforme o modo da configuração.
    pub fn process<'a>(&'a self, text: &'a str) -> Processed<'a, A> {
        match self.config.mode {
            ProcessingMode::Batch => Processed::Document(self.screen_document(text)),
            ProcessingMode::WholeText => Processed::Document(self.screen_whole(text)),
            ProcessingMode::Stream => Processed::Stream(self.screen_lines(text)),
        }
    }

    /// Veredictos linha a linha, sob demanda.
    pub fn screen_lines<'a>(&'a self, text: &'a str) -> Screening<'a, A> {
        Screening::lines(&self.adapter, &self.config, text)
    }

    /// Modo lote: todos os segmentos e o veredicto do documento.
    pub fn screen_document(&self, text: &str) -> BatchOutcome {
        collect(self.screen_lines(text))
    }

    /// O texto inteiro como um único segmento.
    pub fn screen_whole(&self, text: &str) -> BatchOutcome {
        collect(Screening::whole_text(&self.adapter, &self.config, text))
    }

    /// Empurra os veredictos linha a linha para `sink` (ex: um `mpsc::Sender<ScreenEvent>`).
    pub fn screen_streaming<S: VerdictSink + ?Sized>(&self, text: &str, sink: &mut S) -> ScreenSummary {
        self.screen_lines(text).drain_into(sink)
    }

    /// Modo lote com os segmentos processados em paralelo (rayon).
    ///
    /// Os veredictos são reunidos na ordem original antes da redução, então o
    /// resultado é idêntico ao de [`Screener::screen_document`].
    pub fn screen_parallel(&self, text: &str) -> BatchOutcome
    where
        A: Sync,
    {
        let segments: Vec<Segment<'_>> = split(text, &self.config.delimiter).collect();
        let verdicts: Vec<SegmentVerdict> = segments
            .par_iter()
            .map(|segment| screen_segment(&self.adapter, *segment, self.config.threshold))
            .collect();

        let mut collector = BatchCollector::new();
        for verdict in verdicts {
            let _ = collector.accept(verdict);
        }
        collector.into_outcome()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{AdapterError, ScriptedTagger};
    use crate::label::{Label, TokenPrediction};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn all(tokens: &str, label: Label, confidence: f64) -> Vec<TokenPrediction> {
        tokens
            .split_whitespace()
            .map(|t| TokenPrediction::new(t, label, confidence))
            .collect()
    }

    fn screener(tagger: ScriptedTagger) -> Screener<ScriptedTagger> {
        Screener::new(tagger, ScreenConfig::default()).unwrap()
    }

    #[test]
    fn test_single_network_line() {
        let text = "Call 10.0.0.5 now";
        let tagger = ScriptedTagger::new().with_response(text, all(text, Label::NetworkInformation, 0.9));
        let outcome = screener(tagger).screen_document(text);

        assert_eq!(outcome.segments.len(), 1);
        let v = &outcome.segments[0];
        assert_eq!(v.processed_text, "Call 10.0.0.5 now");
        assert_eq!(v.dominant_label, Label::NetworkInformation);
        assert!((v.dominant_confidence - 0.9).abs() < 1e-9);
        assert!(v.is_high_confidence);
    }

    #[test]
    fn test_no_entity_line() {
        let text = "The sky is blue";
        let tagger = ScriptedTagger::new().with_response(text, all(text, Label::Outside, 0.97));
        let outcome = screener(tagger).screen_document(text);

        let v = &outcome.segments[0];
        assert_eq!(v.dominant_label, Label::Outside);
        assert!((v.dominant_confidence - 0.97).abs() < 1e-9);
        assert!(!v.is_high_confidence);
    }

    #[test]
    fn test_empty_token_stream() {
        let outcome = screener(ScriptedTagger::new()).screen_document("anything");
        let v = &outcome.segments[0];
        assert_eq!(v.dominant_label, Label::Outside);
        assert_eq!(v.dominant_confidence, 0.0);
        assert!(!v.is_high_confidence);
    }

    #[test]
    fn test_batch_document_takes_high_confidence_line() {
        let tagger = ScriptedTagger::new()
            .with_response("line1", all("line1", Label::PersonalData, 0.95))
            .with_response("line2", all("line2", Label::Benign, 0.2));
        let outcome = screener(tagger).screen_document("line1\nline2");

        assert_eq!(outcome.document.processed_text, "line1");
        assert_eq!(outcome.document.dominant_label, Label::PersonalData);
        assert!((outcome.document.dominant_confidence - 0.95).abs() < 1e-9);
        assert!(outcome.document.is_high_confidence);
        assert_eq!(outcome.document.dominant_segment, Some(0));
    }

    fn failing_middle() -> ScriptedTagger {
        ScriptedTagger::new()
            .with_response("a", all("a", Label::Benign, 0.6))
            .with_failure("b", AdapterError::unavailable("sem modelo"))
            .with_response("c", all("c", Label::NetworkInformation, 0.9))
    }

    #[test]
    fn test_adapter_failure_in_batch() {
        let outcome = screener(failing_middle()).screen_document("a\nb\nc");
        assert_eq!(outcome.document.failed_segments, 1);
        assert_eq!(outcome.document.total_segments, 3);
        assert_eq!(outcome.document.dominant_label, Label::NetworkInformation);
        assert!(outcome.segments[1].is_failure());
    }

    #[test]
    fn test_adapter_failure_in_stream() {
        let s = screener(failing_middle());
        let verdicts: Vec<SegmentVerdict> = s.screen_lines("a\nb\nc").collect();
        assert_eq!(verdicts.len(), 3);
        assert_eq!(verdicts[1].dominant_label, Label::Error);
        assert!(!verdicts[1].is_high_confidence);
        assert!(verdicts[1].failure.as_deref().unwrap().contains("sem modelo"));
        assert_eq!(verdicts[2].dominant_label, Label::NetworkInformation);
    }

    #[test]
    fn test_invalid_confidence_is_adapter_failure() {
        let tagger = ScriptedTagger::new().with_response(
            "x",
            vec![TokenPrediction::new("x", Label::PersonalData, 1.7)],
        );
        let outcome = screener(tagger).screen_document("x");
        assert!(outcome.segments[0].is_failure());
        assert_eq!(outcome.document.failed_segments, 1);
    }

    #[test]
    fn test_stream_preserves_order_and_count() {
        let text = "l0\nl1\n\nl2\nl3\nl4";
        let tagger = ScriptedTagger::new().with_fallback(all("w", Label::Benign, 0.5));
        let s = screener(tagger);
        let indices: Vec<(usize, String)> = s
            .screen_lines(text)
            .map(|v| (v.index, v.processed_text))
            .collect();
        assert_eq!(
            indices,
            vec![
                (0, "l0".to_string()),
                (1, "l1".to_string()),
                (2, "l2".to_string()),
                (3, "l3".to_string()),
                (4, "l4".to_string()),
            ]
        );
    }

    #[test]
    fn test_stream_is_lazy() {
        struct Counting(AtomicUsize);
        impl TaggerAdapter for Counting {
            fn tag(&self, segment: &str) -> Result<Vec<TokenPrediction>, AdapterError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(vec![TokenPrediction::new(segment, Label::Benign, 0.5)])
            }
        }

        let s = Screener::new(Counting(AtomicUsize::new(0)), ScreenConfig::default()).unwrap();
        let mut lines = s.screen_lines("a\nb\nc\nd");
        assert_eq!(s.adapter().0.load(Ordering::SeqCst), 0);
        lines.next();
        lines.next();
        assert_eq!(s.adapter().0.load(Ordering::SeqCst), 2);
        drop(lines);
        assert_eq!(s.adapter().0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_determinism() {
        let tagger = ScriptedTagger::new()
            .with_response("x", all("x y", Label::PersonalData, 0.81))
            .with_response("y", all("y", Label::SecurityCredentials, 0.81));
        let s = screener(tagger);
        let first = s.screen_document("x\ny");
        let second = s.screen_document("x\ny");
        assert_eq!(first, second);
    }

    #[test]
    fn test_channel_streaming_emits_events() {
        let tagger = failing_middle();
        let s = screener(tagger);
        let (mut tx, rx) = mpsc::channel::<ScreenEvent>();
        let summary = s.screen_streaming("a\nb\nc", &mut tx);
        drop(tx);

        let events: Vec<ScreenEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0], ScreenEvent::SegmentScreened { verdict } if verdict.index == 0));
        assert!(matches!(
            events.last().unwrap(),
            ScreenEvent::Done { total_segments: 3, failed_segments: 1, .. }
        ));
        assert_eq!(summary.total_segments, 3);
        assert!(!summary.stopped);
    }

    #[test]
    fn test_channel_sink_stops_when_receiver_dropped() {
        let s = screener(ScriptedTagger::new());
        let (mut tx, rx) = mpsc::channel::<ScreenEvent>();
        drop(rx);
        let summary = s.screen_streaming("a\nb\nc", &mut tx);
        assert!(summary.stopped);
        assert_eq!(summary.total_segments, 1);
    }

    #[test]
    fn test_stream_reduced_externally_matches_batch() {
        let s = screener(failing_middle());
        let mut reducer = DocumentReducer::new();
        s.screen_streaming("a\nb\nc", &mut reducer);
        assert_eq!(reducer.finish(), s.screen_document("a\nb\nc").document);
    }

    #[test]
    fn test_whole_text_is_one_segment() {
        let text = "user: alice\npassword: hunter2";
        let tagger = ScriptedTagger::new().with_response(text, all("password hunter2", Label::SecurityCredentials, 0.92));
        let outcome = screener(tagger).screen_whole(text);
        assert_eq!(outcome.segments.len(), 1);
        assert_eq!(outcome.document.dominant_label, Label::SecurityCredentials);
        assert_eq!(outcome.document.processed_text, text);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let text = (0..40).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
        let mut tagger = ScriptedTagger::new().with_fallback(all("w", Label::Benign, 0.4));
        for i in (0..40).step_by(7) {
            let line = format!("line {}", i);
            tagger = tagger.with_response(&line, all("w", Label::PersonalData, 0.8 + i as f64 / 1000.0));
        }
        let s = screener(tagger);
        assert_eq!(s.screen_parallel(&text), s.screen_document(&text));
    }

    #[test]
    fn test_process_dispatches_on_mode() {
        let tagger = ScriptedTagger::new().with_fallback(all("w", Label::Benign, 0.5));

        let batch = ScreenConfig::default();
        match process("a\nb", &tagger, &batch).unwrap() {
            Processed::Document(outcome) => assert_eq!(outcome.segments.len(), 2),
            Processed::Stream(_) => panic!("esperava lote"),
        }

        let stream = ScreenConfig::default().with_mode(ProcessingMode::Stream);
        match process("a\nb", &tagger, &stream).unwrap() {
            Processed::Stream(lines) => assert_eq!(lines.count(), 2),
            Processed::Document(_) => panic!("esperava stream"),
        }

        let whole = ScreenConfig::default().with_mode(ProcessingMode::WholeText);
        let outcome = process("a\nb", &tagger, &whole).unwrap().into_outcome();
        assert_eq!(outcome.segments.len(), 1);
    }

    #[test]
    fn test_invalid_config_rejected_before_processing() {
        let tagger = ScriptedTagger::new();
        let config = ScreenConfig::default().with_threshold(1.5);
        assert!(matches!(
            process("a", &tagger, &config),
            Err(ScreenError::Configuration { .. })
        ));
        assert!(Screener::new(ScriptedTagger::new(), config).is_err());
    }

    #[test]
    fn test_empty_input_yields_empty_results() {
        let s = screener(ScriptedTagger::new());
        let outcome = s.screen_document("   \n\n");
        assert!(outcome.segments.is_empty());
        assert_eq!(outcome.document.total_segments, 0);
        assert_eq!(s.screen_lines("").count(), 0);
    }

    #[test]
    fn test_events_serialize_with_type_tag() {
        let event = ScreenEvent::Done {
            total_segments: 2,
            failed_segments: 0,
            processing_ms: 1,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Done");
        assert_eq!(json["data"]["total_segments"], 2);
    }
}
