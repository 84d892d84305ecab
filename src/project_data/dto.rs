use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One `projects_data` row with its tool ids folded into a comma list.
#[derive(Debug, Clone, FromRow)]
pub struct ProjectDataRow {
    pub id: i64,
    pub activity: String,
    pub fk_farm_task: i64,
    pub fk_project: i64,
    pub fk_user: i64,
    pub num_human_resources: i64,
    pub cost: f64,
    pub details: String,
    pub tools: Option<String>,
}

impl ProjectDataRow {
    pub fn tool_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .tools
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .filter_map(|id| id.trim().parse().ok())
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectData {
    pub id: i64,
    pub actividad: String,
    pub idproject: i64,
    #[serde(rename = "laborAgronomica")]
    pub labor_agronomica: i64,
    pub encargado: i64,
    pub equipos: Vec<i64>,
    #[serde(rename = "recursoHumano")]
    pub recurso_humano: i64,
    pub costo: f64,
    pub observaciones: String,
}

impl From<ProjectDataRow> for ProjectData {
    fn from(row: ProjectDataRow) -> Self {
        let equipos = row.tool_ids();
        Self {
            id: row.id,
            actividad: row.activity,
            idproject: row.fk_project,
            labor_agronomica: row.fk_farm_task,
            encargado: row.fk_user,
            equipos,
            recurso_humano: row.num_human_resources,
            costo: row.cost,
            observaciones: row.details,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectDataRequest {
    #[serde(default)]
    pub actividad: String,
    #[serde(default)]
    pub idproject: i64,
    #[serde(default, rename = "laborAgronomica")]
    pub labor_agronomica: i64,
    #[serde(default)]
    pub encargado: i64,
    #[serde(default)]
    pub equipos: Vec<i64>,
    #[serde(default, rename = "recursoHumano")]
    pub recurso_humano: i64,
    #[serde(default)]
    pub costo: f64,
    #[serde(default)]
    pub observaciones: Option<String>,
}

/// Partial update. `equipos: None` leaves tool links alone, `Some([])`
/// removes them all.
#[derive(Debug, Deserialize)]
pub struct UpdateProjectDataRequest {
    pub id: Option<i64>,
    pub actividad: Option<String>,
    pub idproject: Option<i64>,
    #[serde(rename = "laborAgronomica")]
    pub labor_agronomica: Option<i64>,
    pub encargado: Option<i64>,
    pub equipos: Option<Vec<i64>>,
    #[serde(rename = "recursoHumano")]
    pub recurso_humano: Option<i64>,
    pub costo: Option<f64>,
    pub observaciones: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProjectDataQuery {
    pub q: Option<String>,
    pub project_id: Option<i64>,
}

/// Column values for a new `projects_data` row.
#[derive(Debug, Clone)]
pub struct NewProjectData {
    pub activity: String,
    pub fk_farm_task: i64,
    pub fk_project: i64,
    pub fk_user: i64,
    pub num_human_resources: i64,
    pub cost: f64,
    pub details: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProjectDataChanges {
    pub activity: Option<String>,
    pub fk_farm_task: Option<i64>,
    pub fk_project: Option<i64>,
    pub fk_user: Option<i64>,
    pub num_human_resources: Option<i64>,
    pub cost: Option<f64>,
    pub details: Option<String>,
}

impl ProjectDataChanges {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply_to(&self, row: &mut ProjectDataRow) {
        if let Some(v) = &self.activity {
            row.activity = v.clone();
        }
        if let Some(v) = self.fk_farm_task {
            row.fk_farm_task = v;
        }
        if let Some(v) = self.fk_project {
            row.fk_project = v;
        }
        if let Some(v) = self.fk_user {
            row.fk_user = v;
        }
        if let Some(v) = self.num_human_resources {
            row.num_human_resources = v;
        }
        if let Some(v) = self.cost {
            row.cost = v;
        }
        if let Some(v) = &self.details {
            row.details = v.clone();
        }
    }
}
