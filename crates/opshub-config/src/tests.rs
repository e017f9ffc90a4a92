#[cfg(test)]
mod tests {
    use crate::Config;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> String {
        let config_path = dir.path().join("test_config.toml");
        fs::write(&config_path, content).unwrap();
        config_path.to_str().unwrap().to_string()
    }

    #[test]
    fn test_load_full_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(
            &temp_dir,
            r#"
[agents]
base_url = "http://agents.internal:8006/agents"
default_workflow = "access"
connect_timeout_seconds = 3

[api]
base_url = "https://hub.internal/api"
mock_fallback = false
timeout_seconds = 15

[chat]
ws_base_url = "wss://hub.internal"
client_id = "desk-7"

[session]
path = "/tmp/opshub-session.json"
"#,
        );

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.agents.base_url, "http://agents.internal:8006/agents");
        assert_eq!(config.agents.default_workflow.as_deref(), Some("access"));
        assert_eq!(config.agents.connect_timeout_seconds, 3);
        assert!(!config.api.mock_fallback);
        assert_eq!(config.api.timeout_seconds, 15);
        assert_eq!(config.chat_socket_url(), "wss://hub.internal/ws/chat/desk-7");
        assert_eq!(
            config.session_file(),
            std::path::PathBuf::from("/tmp/opshub-session.json")
        );
    }

    #[test]
    fn test_optional_sections_fall_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(
            &temp_dir,
            r#"
[agents]
base_url = "http://localhost:8006/agents"

[api]
base_url = "http://localhost:8000/api"
timeout_seconds = 30
"#,
        );

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.agents.default_workflow, None);
        assert_eq!(config.agents.connect_timeout_seconds, 10);
        assert!(!config.api.mock_fallback);
        assert_eq!(config.chat.client_id, "default");
        assert_eq!(config.chat_socket_url(), "ws://localhost:8000/ws/chat/default");
        assert!(config.session_file().ends_with("session.json"));
    }

    #[test]
    fn test_invalid_scheme_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(
            &temp_dir,
            r#"
[agents]
base_url = "localhost:8006/agents"

[api]
base_url = "http://localhost:8000/api"
timeout_seconds = 30
"#,
        );

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(
            err.to_string().contains("agents.base_url"),
            "error should name the bad field: {}",
            err
        );
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let result = Config::load(Some("/definitely/not/here/opshub.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_replace_loaded_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(
            &temp_dir,
            r#"
[agents]
base_url = "http://localhost:8006/agents"
default_workflow = "intune"

[api]
base_url = "http://localhost:8000/api"
timeout_seconds = 30
"#,
        );

        let config = Config::load_with_overrides(
            Some(&path),
            Some("http://10.0.0.5:9000/agents".to_string()),
            None,
            Some("resource".to_string()),
        )
        .unwrap();

        assert_eq!(config.agents.base_url, "http://10.0.0.5:9000/agents");
        assert_eq!(config.api.base_url, "http://localhost:8000/api");
        assert_eq!(config.agents.default_workflow.as_deref(), Some("resource"));
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(
            &temp_dir,
            r#"
[agents]
base_url = "http://localhost:8006/agents"

[api]
base_url = "http://localhost:8000/api"
timeout_seconds = 30
"#,
        );

        let result =
            Config::load_with_overrides(Some(&path), None, Some("ftp://nope".to_string()), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_save_and_reload_default() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("saved.toml");

        Config::default().save(&path).unwrap();
        let reloaded = Config::load(Some(path.to_str().unwrap())).unwrap();

        assert_eq!(reloaded.agents.base_url, "http://localhost:8006/agents");
        assert!(reloaded.api.mock_fallback);
    }
}
