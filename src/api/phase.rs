use crate::api::authorized;
use crate::models::phase::{AppPhase, StatusAppRow};
use anyhow::Result;
use log::{debug, error};
use reqwest::Client;

pub async fn get_global_phase(
    client: &Client,
    base_url: &str,
    key: &str,
) -> Result<AppPhase, anyhow::Error> {
    let url = format!(
        "{}/rest/v1/status_app?id_status_app=eq.1&select=status_app",
        base_url
    );
    let resp = authorized(client.get(&url), key).send().await?;
    if resp.status().is_success() {
        let rows = resp.json::<Vec<StatusAppRow>>().await?;
        let flag = rows.into_iter().next().and_then(|row| row.flag);
        let phase = AppPhase::from_flag(flag.as_deref());
        debug!("Global phase {:?} -> {:?}", flag, phase);
        Ok(phase)
    } else {
        error!("Failed to get global phase: {}", resp.status());
        Err(anyhow::anyhow!("Failed to get global phase ({})", resp.status()))
    }
}
