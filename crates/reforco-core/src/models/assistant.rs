use serde::{Deserialize, Serialize};

use super::{Lesson, Student};

/// Body sent to the teacher-assistant edge function.
#[derive(Debug, Clone, Serialize)]
pub struct AssistantRequest<'a> {
    pub message: &'a str,
    pub context: &'a AssistantContext,
}

/// Recent rows forwarded with a question so answers can refer to real data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantContext {
    pub alunos: Vec<Student>,
    pub aulas: Vec<Lesson>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantReply {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub actions: Vec<AssistantAction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantAction {
    /// One of `review`, `schedule`, `contact`, `assessment`
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub description: String,
    /// `high`, `medium` or `low`
    #[serde(default)]
    pub priority: Option<String>,
}
