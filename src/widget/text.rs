use serde::{Deserialize, Serialize};

/// User-facing strings. Overridable from the `[text]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetText {
    pub pending: String,
    pub no_reply: String,
    pub connection_error: String,
    pub upload_pending: String,
    pub upload_network_error: String,
    pub upload_fallback: String,
    /// `{file}` is replaced with the uploaded file name.
    pub upload_success: String,
}

impl Default for WidgetText {
    fn default() -> Self {
        Self {
            pending: "Analyzing data...".to_string(),
            no_reply: "The analyst could not process the response.".to_string(),
            connection_error: "Error connecting to the server.".to_string(),
            upload_pending: "Processing...".to_string(),
            upload_network_error: "Upload failed".to_string(),
            upload_fallback: "The file could not be processed.".to_string(),
            upload_success: "✅ {file} loaded. What insight would you like to extract?"
                .to_string(),
        }
    }
}

impl WidgetText {
    pub fn upload_success_for(&self, file_name: &str) -> String {
        self.upload_success.replace("{file}", file_name)
    }
}
