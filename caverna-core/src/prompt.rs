//! Prompt construction for the "Capitão Cavernas" report.
//!
//! The prompt is a pure function of the [`AnalysisRequest`]: a fixed persona,
//! a period-qualified instruction, one line per selected metric (in selection
//! order) and a fixed closing block.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::format::{format_integer_pt_br, format_js_number};
use crate::types::{AnalysisRequest, MetricKind, MetricsSnapshot};

const PERSONA: &str = "Você é o Capitão Cavernas, um sábio analista de dados com décadas de experiência.
Você é conhecido por sua sagacidade, sabedoria e capacidade de extrair insights profundos dos dados.
Sua análise deve ser perspicaz, orientada por dados, mas também humana e compreensível.
Use seu tom característico de sabedoria ancestral combinado com expertise analítica moderna.";

const CLOSING: &str = "Forneça uma análise detalhada que inclua:
1. Insights principais sobre o comportamento dos usuários
2. Tendências identificadas nos dados
3. Recomendações estratégicas baseadas em sua experiência
4. Alertas sobre possíveis riscos ou oportunidades
5. Conclusões sábias sobre o estado geral da plataforma

Mantenha o tom profissional mas acessível, como se fosse um conselheiro experiente orientando uma equipe.
Responda em português brasileiro.
Máximo de 500 palavras.";

/// Build the completion prompt for a request.
pub fn build_prompt(request: &AnalysisRequest) -> String {
    let metric_lines = request
        .selected_metrics
        .iter()
        .map(|id| render_metric(id, &request.metrics))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{PERSONA}\n\nAnalise os seguintes dados de {} com sua perspectiva sábia e experiente:\n\n{}\n\n{CLOSING}",
        request.period.as_str(),
        metric_lines
    )
}

/// Render a single metric identifier as a prompt line.
///
/// Unknown identifiers render as an empty string.
pub fn render_metric(id: &str, metrics: &MetricsSnapshot) -> String {
    let Some(kind) = MetricKind::from_id(id) else {
        tracing::debug!(metric = id, "Unknown metric identifier, rendering empty line");
        return String::new();
    };

    match kind {
        MetricKind::ActiveUsers => {
            format!("Usuários Ativos: {}", format_integer_pt_br(metrics.active_users))
        }
        MetricKind::NewUsers => {
            format!("Novos Usuários: {}", format_integer_pt_br(metrics.new_users))
        }
        MetricKind::RetentionRate => {
            format!("Taxa de Retenção: {}%", format_js_number(metrics.retention_rate))
        }
        MetricKind::ConversionRate => {
            format!("Taxa de Conversão: {}%", format_js_number(metrics.conversion_rate))
        }
        MetricKind::UserGrowth => format!(
            "Crescimento de Usuários: {}",
            to_compact_json(&metrics.user_growth_data)
        ),
        MetricKind::Retention => format!(
            "Dados de Retenção: {}",
            to_compact_json(&metrics.retention_data)
        ),
        MetricKind::Subscriptions => format!(
            "Tipos de Assinatura: {}",
            to_compact_json(&metrics.subscription_types)
        ),
    }
}

/// SHA-256 of the prompt, hex encoded.
///
/// Logged instead of the prompt body so runs can be correlated without
/// writing metrics into log files.
pub fn prompt_fingerprint(prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hex::encode(hasher.finalize())
}

fn to_compact_json<T: Serialize + ?Sized>(value: &T) -> String {
    // Plain data with string keys always serializes.
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}
