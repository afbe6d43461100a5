//! Prompt template for alarm analysis.

use crate::models::AlarmQuery;

/// Returned instead of an analysis when generation fails.
pub const FALLBACK_MESSAGE: &str = "시스템 오류로 인해 분석을 완료할 수 없습니다.";

/// Answer the model is told to give when the context does not cover the
/// question.
pub const INSUFFICIENT_INFO: &str = "정보가 부족합니다";

const TEMPLATE: &str = "\
당신은 선박 엔지니어링 전문가입니다. 주어진 Context를 바탕으로 알람 원인을 분석하고 해결책을 제시하세요.
Context에 없는 내용은 지어내지 말고 \"정보가 부족합니다\"라고 말하세요.

Context:
{context}

Current Sensor Data:
{sensor_data}

Alarm Code:
{alarm_code}

User Question:
{question}

Answer (Korean):
";

/// Fill the template. Placeholders are substituted in a single pass, so
/// braces inside the retrieved context or the question are left alone.
pub fn render_prompt(context: &str, query: &AlarmQuery) -> String {
    let sensor_data = query.sensors.to_string();
    let mut out = String::with_capacity(TEMPLATE.len() + context.len() + 256);
    let mut rest = TEMPLATE;

    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let key = &rest[start + 1..start + len];
        let value = match key {
            "context" => context,
            "sensor_data" => sensor_data.as_str(),
            "alarm_code" => query.alarm_code.as_str(),
            "question" => query.question.as_str(),
            _ => &rest[start..=start + len],
        };
        out.push_str(&rest[..start]);
        out.push_str(value);
        rest = &rest[start + len + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SensorSnapshot;

    fn query() -> AlarmQuery {
        AlarmQuery::new(
            "E-101",
            SensorSnapshot::new()
                .with("temperature", 90.0)
                .with("pressure", 120.0),
        )
    }

    #[test]
    fn test_sections_in_order() {
        let prompt = render_prompt("E-101 overheat threshold", &query());
        let positions: Vec<usize> = [
            "Context:\nE-101 overheat threshold",
            "Current Sensor Data:\n{temperature: 90.0, pressure: 120.0}",
            "Alarm Code:\nE-101",
            "User Question:\n원인과 해결 방법을 요약해줘.",
            "Answer (Korean):",
        ]
        .iter()
        .map(|section| prompt.find(section).unwrap_or_else(|| panic!("missing {:?}", section)))
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(prompt.starts_with("당신은 선박 엔지니어링 전문가입니다."));
        assert!(prompt.contains(INSUFFICIENT_INFO));
    }

    #[test]
    fn test_braces_in_values_are_not_substituted() {
        let q = query().with_question("What does {alarm_code} mean?");
        let prompt = render_prompt("limit {context} table", &q);
        assert!(prompt.contains("Context:\nlimit {context} table\n"));
        assert!(prompt.contains("User Question:\nWhat does {alarm_code} mean?\n"));
    }

    #[test]
    fn test_empty_context() {
        let prompt = render_prompt("", &query());
        assert!(prompt.contains("Context:\n\n\nCurrent Sensor Data:"));
    }
}
