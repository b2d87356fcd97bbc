use web_sys::window;

pub fn get_api_base_url() -> String {
    if let Some(window) = window() {
        if let Ok(host) = window.location().host() {
            // Same-origin deployments proxy /api to the Reward Service
            if !host.starts_with("127.0.0.1:8080") && !host.starts_with("localhost:8080") {
                return "".to_string();
            }
        }
    }

    // trunk serve on :8080, Reward Service on :3000
    "http://127.0.0.1:3000".to_string()
}

pub fn api_url(path: &str) -> String {
    format!("{}{}", get_api_base_url(), path)
}
