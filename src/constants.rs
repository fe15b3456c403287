use std::env;

// Endpoint and model defaults, overridable from the environment.
// Use lazy_static to initialize static variables safely.
lazy_static::lazy_static! {
    pub static ref GEMINI_API_URL: String = env::var("GEMINI_API_URL")
        .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string());
    pub static ref DEFAULT_MODEL: String = env::var("GLINT_MODEL")
        .unwrap_or_else(|_| "gemini-2.0-flash".to_string());
}
