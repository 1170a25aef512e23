use log::warn;
use serde::{Deserialize, Serialize};

/// Event-wide phase. Overrides whatever the session would show.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppPhase {
    Before,
    #[default]
    Live,
    After,
}

impl AppPhase {
    /// Maps the remote flag to a phase; unknown or missing values read as live.
    pub fn from_flag(flag: Option<&str>) -> Self {
        let Some(flag) = flag else {
            return AppPhase::Live;
        };
        match flag.trim().to_ascii_lowercase().as_str() {
            "before" | "antes" => AppPhase::Before,
            "live" | "durante" => AppPhase::Live,
            "after" | "depois" => AppPhase::After,
            other => {
                warn!("Unknown global phase {:?}, assuming live", other);
                AppPhase::Live
            }
        }
    }

    pub fn is_live(self) -> bool {
        self == AppPhase::Live
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct StatusAppRow {
    #[serde(rename = "status_app")]
    pub flag: Option<String>,
}
