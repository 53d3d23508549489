use std::env;

use crate::errors::AppError;
use crate::models::TransitionPolicy;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub transitions: TransitionPolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = TransitionPolicy::default();

        let allowed_targets = match env::var("BOOKING_ALLOWED_STATUSES") {
            Ok(list) => TransitionPolicy::parse_targets(&list)
                .map_err(|e| AppError::Config(format!("BOOKING_ALLOWED_STATUSES: {e}")))?,
            Err(_) => defaults.allowed_targets,
        };

        let enforce_graph = match env::var("BOOKING_ENFORCE_TRANSITIONS") {
            Ok(v) => parse_flag(&v).ok_or_else(|| {
                AppError::Config(format!(
                    "BOOKING_ENFORCE_TRANSITIONS: expected true or false, got {v:?}"
                ))
            })?,
            Err(_) => defaults.enforce_graph,
        };

        Ok(Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "homeservice.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            transitions: TransitionPolicy {
                allowed_targets,
                enforce_graph,
            },
        })
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
