// src/utils/csv.rs

use crate::models::score::ScoreRecord;

/// Column order of the CSV export.
pub const CSV_COLUMNS: [&str; 10] = [
    "id",
    "name",
    "email",
    "score",
    "answeredQuestions",
    "totalQuestions",
    "timeTaken",
    "reason",
    "receivedAt",
    "date",
];

/// Wraps a value in double quotes, doubling any quote inside it.
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

/// Renders records as CSV with a header row. Every value is quoted and
/// missing values are empty.
pub fn scores_to_csv(records: &[ScoreRecord]) -> String {
    let mut out = CSV_COLUMNS.join(",");
    out.push('\n');

    for record in records {
        let row = [
            record.id.to_string(),
            record.name.clone(),
            opt(&record.email),
            opt(&record.score),
            opt(&record.answered_questions),
            opt(&record.total_questions),
            opt(&record.time_taken),
            opt(&record.reason),
            record.received_at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            opt(&record.date),
        ];
        let quoted: Vec<String> = row.iter().map(|v| quote(v)).collect();
        out.push_str(&quoted.join(","));
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::score::ScoreId;

    /// Minimal RFC 4180 line parser, enough to check the export re-parses.
    fn parse_line(line: &str) -> Vec<String> {
        let mut fields = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut chars = line.chars().peekable();

        while let Some(c) = chars.next() {
            match (c, in_quotes) {
                ('"', true) if chars.peek() == Some(&'"') => {
                    current.push('"');
                    chars.next();
                }
                ('"', _) => in_quotes = !in_quotes,
                (',', false) => fields.push(std::mem::take(&mut current)),
                (c, _) => current.push(c),
            }
        }
        fields.push(current);
        fields
    }

    fn record(reason: &str) -> ScoreRecord {
        ScoreRecord {
            id: ScoreId::Number(1714557600000),
            name: "Alice".to_string(),
            email: None,
            score: Some(18),
            answered_questions: Some(20),
            total_questions: Some(20),
            time_taken: Some("4:12".to_string()),
            reason: Some(reason.to_string()),
            received_at: "2024-05-01T10:00:00Z".parse().unwrap(),
            date: None,
        }
    }

    #[test]
    fn quote_doubles_internal_quotes() {
        assert_eq!(quote(r#"said "hi", then left"#), r#""said ""hi"", then left""#);
    }

    #[test]
    fn header_uses_fixed_column_order() {
        let csv = scores_to_csv(&[]);
        assert_eq!(
            csv,
            "id,name,email,score,answeredQuestions,totalQuestions,timeTaken,reason,receivedAt,date\n"
        );
    }

    #[test]
    fn embedded_comma_and_quote_round_trip() {
        let reason = r#"said "hi", then left"#;
        let csv = scores_to_csv(&[record(reason)]);
        let row = csv.lines().nth(1).unwrap();

        assert!(row.contains(r#""said ""hi"", then left""#));

        let fields = parse_line(row);
        assert_eq!(fields.len(), CSV_COLUMNS.len());
        assert_eq!(fields[7], reason);
        assert_eq!(fields[0], "1714557600000");
        assert_eq!(fields[2], "");
        assert_eq!(fields[8], "2024-05-01T10:00:00.000Z");
    }
}
