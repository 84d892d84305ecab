use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct Project {
    pub id: i64,
    pub descripcion: String,
    pub fecha_inicio: String,
    pub fecha_cierre: String,
    pub estado: String,
    pub created_at: String,
}

/// Lifecycle state of a project, stored as its Spanish label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectStatus {
    #[serde(rename = "abierto")]
    Open,
    #[serde(rename = "cerrado")]
    Closed,
    #[serde(rename = "en pausa")]
    Paused,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "abierto",
            Self::Closed => "cerrado",
            Self::Paused => "en pausa",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl FromStr for ProjectStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "abierto" => Ok(Self::Open),
            "cerrado" => Ok(Self::Closed),
            "en pausa" => Ok(Self::Paused),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    #[serde(default)]
    pub descripcion: String,
    #[serde(default)]
    pub fecha_inicio: String,
    #[serde(default)]
    pub fecha_cierre: String,
}

/// Partial project update: absent fields are left untouched.
#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub id: Option<i64>,
    pub descripcion: Option<String>,
    pub fecha_inicio: Option<String>,
    pub fecha_cierre: Option<String>,
    pub estado: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub id: Option<i64>,
    pub estado: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProjectChanges {
    pub descripcion: Option<String>,
    pub fecha_inicio: Option<String>,
    pub fecha_cierre: Option<String>,
    pub estado: Option<ProjectStatus>,
}

impl ProjectChanges {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply_to(&self, project: &mut Project) {
        if let Some(v) = &self.descripcion {
            project.descripcion = v.clone();
        }
        if let Some(v) = &self.fecha_inicio {
            project.fecha_inicio = v.clone();
        }
        if let Some(v) = &self.fecha_cierre {
            project.fecha_cierre = v.clone();
        }
        if let Some(v) = self.estado {
            project.estado = v.as_str().to_string();
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserIdRequest {
    pub user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub user_id: Option<i64>,
    pub project_id: Option<i64>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeAssociationRequest {
    pub user_id: Option<i64>,
    pub old_project_id: Option<i64>,
    pub new_project_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveAssociationRequest {
    pub user_id: Option<i64>,
    pub project_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Membership {
    pub id: i64,
    pub user_id: i64,
    pub project_id: i64,
    pub role_in_project: String,
    pub assigned_at: String,
}

/// A project together with the caller-selected user's role in it.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserProject {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub project: Project,
    pub role_in_project: String,
}
