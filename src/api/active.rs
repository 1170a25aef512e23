use crate::api::authorized;
use crate::models::project::ActivePointerRow;
use anyhow::Result;
use log::{debug, error};
use reqwest::Client;

pub async fn get_active_pointer(
    client: &Client,
    base_url: &str,
    key: &str,
) -> Result<Option<String>, anyhow::Error> {
    let url = format!(
        "{}/rest/v1/active_project?id=eq.1&select=project_title",
        base_url
    );
    let resp = authorized(client.get(&url), key).send().await?;
    if resp.status().is_success() {
        let rows = resp.json::<Vec<ActivePointerRow>>().await?;
        let title = rows.into_iter().next().and_then(ActivePointerRow::into_title);
        debug!("Active pointer: {:?}", title);
        Ok(title)
    } else {
        error!("Failed to get active project: {}", resp.status());
        Err(anyhow::anyhow!("Failed to get active project ({})", resp.status()))
    }
}
