use dashpad_core::AuthManager;

/// Shared application state: the process-wide auth manager plus the default
/// SharePoint configuration from the CLI.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthManager,
    pub site_url: String,
    pub list_name: String,
}

impl AppState {
    pub fn new(site_url: String, list_name: String) -> Self {
        AppState {
            auth: AuthManager::new(),
            site_url,
            list_name,
        }
    }
}
