use std::fmt::Display;

use anyhow::Context;
use tracing::warn;

use super::dto::Project;

pub const CSV_HEADER: [&str; 6] = [
    "ID",
    "Descripcion",
    "FechaInicio",
    "FechaCierre",
    "Estado",
    "CreatedAt",
];

pub const CSV_FILENAME: &str = "proyectos.csv";

#[derive(Debug)]
pub struct CsvExport {
    pub body: Vec<u8>,
    pub skipped: usize,
}

/// Writes the header plus one line per decodable project. Rows that failed to
/// decode are logged and counted, never written.
pub fn write_projects_csv<I, E>(rows: I) -> anyhow::Result<CsvExport>
where
    I: IntoIterator<Item = Result<Project, E>>,
    E: Display,
{
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_HEADER).context("writing csv header")?;

    let mut skipped = 0;
    for row in rows {
        let project = match row {
            Ok(project) => project,
            Err(e) => {
                skipped += 1;
                warn!(error = %e, "skipping project row in csv export");
                continue;
            }
        };
        let id = project.id.to_string();
        wtr.write_record([
            id.as_str(),
            project.descripcion.as_str(),
            project.fecha_inicio.as_str(),
            project.fecha_cierre.as_str(),
            project.estado.as_str(),
            project.created_at.as_str(),
        ])
        .with_context(|| format!("writing csv row for project {}", project.id))?;
    }

    let body = wtr.into_inner().context("flushing csv writer")?;
    Ok(CsvExport { body, skipped })
}
