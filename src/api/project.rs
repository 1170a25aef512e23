use crate::api::authorized;
use crate::models::project::{parse_questions, Project, ProjectRow};
use crate::models::session::{Question, SessionId};
use anyhow::Result;
use log::{debug, error};
use reqwest::Client;

pub async fn get_project(
    client: &Client,
    base_url: &str,
    key: &str,
    title: &str,
) -> Result<Project, anyhow::Error> {
    let url = format!("{}/rest/v1/projects", base_url);
    let resp = authorized(client.get(&url), key)
        .query(&[
            ("title", format!("eq.{}", title)),
            ("select", "*,status_projs(*)".to_owned()),
        ])
        .send()
        .await?;
    if resp.status().is_success() {
        let rows = resp.json::<Vec<ProjectRow>>().await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No project titled {:?}", title))?;
        let project = Project::try_from(row)?;
        debug!("Project {} is {:?}", project.id, project.phase);
        Ok(project)
    } else {
        error!("Failed to get project {:?}: {}", title, resp.status());
        Err(anyhow::anyhow!("Failed to get project ({})", resp.status()))
    }
}

pub async fn get_questions(
    client: &Client,
    base_url: &str,
    key: &str,
    project_id: SessionId,
) -> Result<Vec<Question>, anyhow::Error> {
    let url = format!("{}/rest/v1/proj_has_questions", base_url);
    let resp = authorized(client.get(&url), key)
        .query(&[
            ("ref_id_projects", format!("eq.{}", project_id)),
            ("select", "*,questions(*)".to_owned()),
            ("order", "ref_id_questions".to_owned()),
        ])
        .send()
        .await?;
    if resp.status().is_success() {
        let rows = resp.json::<Vec<serde_json::Value>>().await?;
        let questions = parse_questions(rows);
        debug!("Project {} has {} questions", project_id, questions.len());
        Ok(questions)
    } else {
        error!("Failed to get questions for project {}: {}", project_id, resp.status());
        Err(anyhow::anyhow!("Failed to get questions ({})", resp.status()))
    }
}
