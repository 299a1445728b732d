use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    #[serde(default)]
    pub nome: Option<String>,
    /// School year, free text ("7º ano", "2º EM")
    #[serde(default)]
    pub serie: Option<String>,
    #[serde(default)]
    pub materia: Option<String>,
    #[serde(default)]
    pub proxima_aula: Option<String>,
}

impl Student {
    pub fn display_name(&self) -> String {
        self.nome
            .clone()
            .unwrap_or_else(|| format!("Aluno #{}", self.id))
    }
}
