//! # Padrões Regex de Informação Sensível
//!
//! Tabelas de expressões regulares usadas pelo tagger heurístico. Cada padrão
//! aponta para um rótulo e traz uma confiança base.
//!
//! A ordem de varredura importa: credenciais primeiro (strings de conexão contêm
//! `user:pass@host`, que também parece e-mail), depois dados pessoais e por fim
//! informação de rede. Trechos sobrepostos são resolvidos mantendo o mais longo
//! (mais específico) e, em empate, o de maior confiança.

use std::sync::LazyLock;

use regex::Regex;

use crate::label::Label;

/// Um padrão compilado. `None` quando a regex não compila.
pub struct SensitivePattern {
    pub name: &'static str,
    pub label: Label,
    pub regex: &'static LazyLock<Option<Regex>>,
    pub base_confidence: f64,
}

/// Um trecho do texto encontrado por um padrão.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternMatch {
    pub pattern_name: &'static str,
    pub label: Label,
    pub start: usize,
    pub end: usize,
    pub confidence: f64,
}

macro_rules! pattern {
    ($name:ident, $regex_str:expr) => {
        static $name: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new($regex_str).ok());
    };
}

// ── Credenciais ────────────────────────────────────────────────────────────
pattern!(
    RE_CONNECTION_STRING,
    r"(?i)\b(?:postgres(?:ql)?|mysql|mongodb(?:\+srv)?|redis|amqp|ftp)://[^\s:@/]+:[^\s@]+@[^\s]+"
);
pattern!(RE_PRIVATE_KEY, r"-----BEGIN (?:RSA |EC |DSA |OPENSSH )?PRIVATE KEY-----");
pattern!(RE_AWS_ACCESS_KEY, r"\bAKIA[0-9A-Z]{16}\b");
pattern!(RE_GITHUB_TOKEN, r"\bgh[pousr]_[A-Za-z0-9]{36}\b");
pattern!(RE_SLACK_TOKEN, r"\bxox[baprs]-[A-Za-z0-9-]{10,}\b");
pattern!(
    RE_JWT,
    r"\beyJ[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}\b"
);
pattern!(
    RE_PASSWORD_ASSIGN,
    r#"(?i)\b(?:password|passwd|pwd|senha)\s*[=:]\s*['"]?[^\s'"]{4,}['"]?"#
);
pattern!(
    RE_SECRET_ASSIGN,
    r#"(?i)\b(?:api[_-]?key|apikey|secret|token|auth_token|access_token|client_secret)\s*[=:]\s*['"]?[A-Za-z0-9_\-./+=]{8,}['"]?"#
);

// ── Dados pessoais ─────────────────────────────────────────────────────────
pattern!(RE_EMAIL, r"\b[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}\b");
pattern!(RE_SSN, r"\b\d{3}-\d{2}-\d{4}\b");
pattern!(RE_CPF, r"\b\d{3}\.\d{3}\.\d{3}-\d{2}\b");
pattern!(
    RE_CREDIT_CARD,
    r"\b(?:4\d{3}|5[1-5]\d{2}|3[47]\d{2}|6(?:011|5\d{2}))[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{3,4}\b"
);
pattern!(
    RE_PHONE,
    r"(?:\+\d{1,3}[-.\s]?)?\(?\b\d{3}\)?[-.\s]\d{3}[-.\s]\d{4}\b"
);
pattern!(
    RE_DATE_OF_BIRTH,
    r"(?i)\b(?:dob|born|birth(?:day|date)?|nascimento)\b\D{0,12}\d{1,2}[/\-.]\d{1,2}[/\-.](?:19|20)\d{2}\b"
);

// ── Informação de rede ─────────────────────────────────────────────────────
pattern!(
    RE_IPV4,
    r"\b(?:(?:25[0-5]|2[0-4]\d|[01]?\d\d?)\.){3}(?:25[0-5]|2[0-4]\d|[01]?\d\d?)(?:/\d{1,2}|:\d{1,5})?\b"
);
pattern!(RE_IPV6, r"\b(?:[0-9a-fA-F]{1,4}:){7}[0-9a-fA-F]{1,4}\b");
pattern!(RE_MAC, r"\b(?:[0-9a-fA-F]{2}[:-]){5}[0-9a-fA-F]{2}\b");
pattern!(RE_URL, r"\b(?:https?|ssh|sftp|smb|ldap)://[^\s]+");
pattern!(
    RE_INTERNAL_HOST,
    r"(?i)\b(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+(?:local|internal|intranet|corp|lan|localdomain)\b"
);

static CREDENTIAL_PATTERNS: &[SensitivePattern] = &[
    SensitivePattern { name: "connection_string", label: Label::SecurityCredentials, regex: &RE_CONNECTION_STRING, base_confidence: 0.97 },
    SensitivePattern { name: "private_key", label: Label::SecurityCredentials, regex: &RE_PRIVATE_KEY, base_confidence: 0.99 },
    SensitivePattern { name: "aws_access_key", label: Label::SecurityCredentials, regex: &RE_AWS_ACCESS_KEY, base_confidence: 0.98 },
    SensitivePattern { name: "github_token", label: Label::SecurityCredentials, regex: &RE_GITHUB_TOKEN, base_confidence: 0.98 },
    SensitivePattern { name: "slack_token", label: Label::SecurityCredentials, regex: &RE_SLACK_TOKEN, base_confidence: 0.96 },
    SensitivePattern { name: "jwt", label: Label::SecurityCredentials, regex: &RE_JWT, base_confidence: 0.95 },
    SensitivePattern { name: "password_assignment", label: Label::SecurityCredentials, regex: &RE_PASSWORD_ASSIGN, base_confidence: 0.94 },
    SensitivePattern { name: "secret_assignment", label: Label::SecurityCredentials, regex: &RE_SECRET_ASSIGN, base_confidence: 0.92 },
];

static PERSONAL_PATTERNS: &[SensitivePattern] = &[
    SensitivePattern { name: "email", label: Label::PersonalData, regex: &RE_EMAIL, base_confidence: 0.95 },
    SensitivePattern { name: "ssn", label: Label::PersonalData, regex: &RE_SSN, base_confidence: 0.93 },
    SensitivePattern { name: "cpf", label: Label::PersonalData, regex: &RE_CPF, base_confidence: 0.95 },
    SensitivePattern { name: "credit_card", label: Label::PersonalData, regex: &RE_CREDIT_CARD, base_confidence: 0.94 },
    SensitivePattern { name: "phone", label: Label::PersonalData, regex: &RE_PHONE, base_confidence: 0.88 },
    SensitivePattern { name: "date_of_birth", label: Label::PersonalData, regex: &RE_DATE_OF_BIRTH, base_confidence: 0.9 },
];

static NETWORK_PATTERNS: &[SensitivePattern] = &[
    SensitivePattern { name: "ipv4", label: Label::NetworkInformation, regex: &RE_IPV4, base_confidence: 0.95 },
    SensitivePattern { name: "ipv6", label: Label::NetworkInformation, regex: &RE_IPV6, base_confidence: 0.95 },
    SensitivePattern { name: "mac_address", label: Label::NetworkInformation, regex: &RE_MAC, base_confidence: 0.93 },
    SensitivePattern { name: "url", label: Label::NetworkInformation, regex: &RE_URL, base_confidence: 0.86 },
    SensitivePattern { name: "internal_host", label: Label::NetworkInformation, regex: &RE_INTERNAL_HOST, base_confidence: 0.9 },
];

/// Todos os padrões, na ordem de varredura.
pub fn all_patterns() -> impl Iterator<Item = &'static SensitivePattern> {
    CREDENTIAL_PATTERNS
        .iter()
        .chain(PERSONAL_PATTERNS)
        .chain(NETWORK_PATTERNS)
}

/// Nomes dos padrões cuja regex não compilou.
pub fn broken_patterns() -> Vec<&'static str> {
    all_patterns()
        .filter(|p| p.regex.is_none())
        .map(|p| p.name)
        .collect()
}

/// Varre `text` com todos os padrões e devolve os trechos não sobrepostos,
/// ordenados pela posição inicial.
pub fn scan(text: &str) -> Vec<PatternMatch> {
    let mut matches = Vec::new();

    for pattern in all_patterns() {
        let Some(re) = pattern.regex.as_ref() else { continue };
        for m in re.find_iter(text) {
            matches.push(PatternMatch {
                pattern_name: pattern.name,
                label: pattern.label,
                start: m.start(),
                end: m.end(),
                confidence: pattern.base_confidence,
            });
        }
    }

    resolve_overlaps(matches)
}

/// Mantém, entre trechos sobrepostos, o mais longo; em empate, o de maior confiança;
/// persistindo o empate, o que veio antes na ordem de varredura.
fn resolve_overlaps(mut matches: Vec<PatternMatch>) -> Vec<PatternMatch> {
    // sort_by é estável: a ordem de varredura desempata o resto
    matches.sort_by(|a, b| {
        (b.end - b.start)
            .cmp(&(a.end - a.start))
            .then(b.confidence.total_cmp(&a.confidence))
    });

    let mut kept: Vec<PatternMatch> = Vec::new();
    for candidate in matches {
        let overlaps = kept
            .iter()
            .any(|k| candidate.start < k.end && k.start < candidate.end);
        if !overlaps {
            kept.push(candidate);
        }
    }

    kept.sort_by_key(|m| m.start);
    kept
}
