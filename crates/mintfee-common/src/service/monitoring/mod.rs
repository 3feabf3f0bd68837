use std::collections::HashMap;

use serde::{Deserialize, Serialize};

mod metric;
pub use metric::Metric;

fn default_service_name() -> String {
    "mintfee".to_string()
}

/// OTLP collector the metrics are pushed to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    pub endpoint: String,
    pub token: Option<String>,

    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Configuration {
    fn headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        if let Some(token) = &self.token {
            headers.insert("Authorization".to_string(), format!("Basic {}", token));
        }

        headers
    }
}
