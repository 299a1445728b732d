use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

use super::Student;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonStatus {
    Scheduled,
    Done,
    Cancelled,
    Unknown,
}

impl std::fmt::Display for LessonStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LessonStatus::Scheduled => write!(f, "Agendada"),
            LessonStatus::Done => write!(f, "Realizada"),
            LessonStatus::Cancelled => write!(f, "Cancelada"),
            LessonStatus::Unknown => write!(f, "-"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: i64,
    /// Student name, or the student id when the table stores a reference
    #[serde(default, deserialize_with = "string_or_number")]
    pub aluno: Option<String>,
    /// Embedded student row when selected with `alunos(*)`
    #[serde(default, rename = "alunos", skip_serializing_if = "Option::is_none")]
    pub student: Option<Student>,
    /// ISO date, `YYYY-MM-DD` (timestamps are accepted, the time part is ignored)
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub horario: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub duracao: Option<String>,
    #[serde(default)]
    pub materia: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Lesson {
    pub fn date(&self) -> Option<NaiveDate> {
        let raw = self.data.as_deref()?;
        let day = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }

    pub fn day_of_month(&self) -> Option<u32> {
        self.date().map(|d| d.day())
    }

    pub fn student_name(&self) -> String {
        self.student
            .as_ref()
            .and_then(|s| s.nome.clone())
            .or_else(|| self.aluno.clone())
            .unwrap_or_else(|| "-".to_string())
    }

    pub fn status(&self) -> LessonStatus {
        match self.status.as_deref().map(|s| s.trim().to_lowercase()) {
            Some(s) if s == "agendada" || s == "scheduled" => LessonStatus::Scheduled,
            Some(s) if s == "realizada" || s == "concluida" || s == "concluída" => {
                LessonStatus::Done
            }
            Some(s) if s == "cancelada" || s == "cancelled" => LessonStatus::Cancelled,
            _ => LessonStatus::Unknown,
        }
    }
}

/// Accept `"Ana"`, `12` or `null` for text columns that some rows store as numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_minimal_row() {
        let lesson: Lesson = serde_json::from_value(json!({"id": 1})).unwrap();
        assert_eq!(lesson.id, 1);
        assert_eq!(lesson.date(), None);
        assert_eq!(lesson.status(), LessonStatus::Unknown);
        assert_eq!(lesson.student_name(), "-");
    }

    #[test]
    fn test_parse_full_row_with_embedded_student() {
        let lesson: Lesson = serde_json::from_value(json!({
            "id": 7,
            "aluno": 3,
            "alunos": {"id": 3, "nome": "Ana Souza", "serie": "7º ano"},
            "data": "2024-03-15T00:00:00+00:00",
            "horario": "14:00",
            "duracao": 60,
            "materia": "Matemática",
            "status": "Agendada",
            "created_at": "2024-03-01"
        }))
        .unwrap();

        assert_eq!(lesson.aluno.as_deref(), Some("3"));
        assert_eq!(lesson.duracao.as_deref(), Some("60"));
        assert_eq!(lesson.day_of_month(), Some(15));
        assert_eq!(lesson.student_name(), "Ana Souza");
        assert_eq!(lesson.status(), LessonStatus::Scheduled);
    }

    #[test]
    fn test_status_variants() {
        let mut lesson: Lesson = serde_json::from_value(json!({"id": 1})).unwrap();
        lesson.status = Some("concluída".to_string());
        assert_eq!(lesson.status(), LessonStatus::Done);
        lesson.status = Some(" CANCELADA ".to_string());
        assert_eq!(lesson.status(), LessonStatus::Cancelled);
    }
}
