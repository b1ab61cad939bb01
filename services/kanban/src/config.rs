//! Service configuration.
//!
//! Values come from `KANBAN_*` environment variables with defaults, then an
//! optional YAML file named by `KANBAN_CONFIG` overrides individual keys.
use anyhow::{Context, Result};
use kanban_entity::PaginationConfig;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct KanbanConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    /// Role whose holders pass every permission check. `None` disables the bypass.
    pub admin_role: Option<String>,
    /// Zero disables the permission cache.
    pub permission_cache_ttl: Duration,
    pub pagination: PaginationConfig,
    /// Encode board ids before they leave the service.
    pub secure_ids: bool,
}

#[derive(Debug, Default, Deserialize)]
struct KanbanConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    admin_role: Option<String>,
    permission_cache_ttl_secs: Option<u64>,
    page_size: Option<u64>,
    max_page_size: Option<u64>,
    max_limit: Option<u64>,
    secure_ids: Option<bool>,
}

impl KanbanConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("KANBAN_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .with_context(|| "parse KANBAN_BIND")?;
        let metrics_bind = std::env::var("KANBAN_METRICS_BIND")
            .unwrap_or_else(|_| "0.0.0.0:9090".to_string())
            .parse()
            .with_context(|| "parse KANBAN_METRICS_BIND")?;
        let admin_role = admin_role_from(
            std::env::var("KANBAN_ADMIN_ROLE").unwrap_or_else(|_| "administrator".to_string()),
        );
        let cache_ttl_secs: u64 = std::env::var("KANBAN_PERMISSION_CACHE_TTL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .with_context(|| "parse KANBAN_PERMISSION_CACHE_TTL_SECS")?;
        let default_page_size = std::env::var("KANBAN_PAGE_SIZE")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .with_context(|| "parse KANBAN_PAGE_SIZE")?;
        let max_page_size = std::env::var("KANBAN_MAX_PAGE_SIZE")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .with_context(|| "parse KANBAN_MAX_PAGE_SIZE")?;
        let max_limit = std::env::var("KANBAN_MAX_LIMIT")
            .unwrap_or_else(|_| "0".to_string())
            .parse()
            .with_context(|| "parse KANBAN_MAX_LIMIT")?;
        let secure_ids = std::env::var("KANBAN_SECURE_IDS")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .with_context(|| "parse KANBAN_SECURE_IDS")?;
        Ok(Self {
            bind_addr,
            metrics_bind,
            admin_role,
            permission_cache_ttl: Duration::from_secs(cache_ttl_secs),
            pagination: PaginationConfig {
                default_page_size,
                max_page_size,
                max_limit,
            },
            secure_ids,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("KANBAN_CONFIG") {
            let contents =
                fs::read_to_string(&path).with_context(|| format!("read KANBAN_CONFIG: {path}"))?;
            let override_cfg: KanbanConfigOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse kanban config yaml")?;
            config.apply(override_cfg)?;
        }
        Ok(config)
    }

    fn apply(&mut self, override_cfg: KanbanConfigOverride) -> Result<()> {
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.admin_role {
            self.admin_role = admin_role_from(value);
        }
        if let Some(value) = override_cfg.permission_cache_ttl_secs {
            self.permission_cache_ttl = Duration::from_secs(value);
        }
        if let Some(value) = override_cfg.page_size {
            self.pagination.default_page_size = value;
        }
        if let Some(value) = override_cfg.max_page_size {
            self.pagination.max_page_size = value;
        }
        if let Some(value) = override_cfg.max_limit {
            self.pagination.max_limit = value;
        }
        if let Some(value) = override_cfg.secure_ids {
            self.secure_ids = value;
        }
        Ok(())
    }
}

fn admin_role_from(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct EnvGuard {
        key: &'static str,
        prev: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let prev = std::env::var(key).ok();
            unsafe {
                std::env::set_var(key, value);
            }
            Self { key, prev }
        }

        fn unset(key: &'static str) -> Self {
            let prev = std::env::var(key).ok();
            unsafe {
                std::env::remove_var(key);
            }
            Self { key, prev }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.prev {
                unsafe {
                    std::env::set_var(self.key, value);
                }
            } else {
                unsafe {
                    std::env::remove_var(self.key);
                }
            }
        }
    }

    #[test]
    #[serial]
    fn defaults_when_env_missing() {
        let _guards = [
            EnvGuard::unset("KANBAN_BIND"),
            EnvGuard::unset("KANBAN_ADMIN_ROLE"),
            EnvGuard::unset("KANBAN_PERMISSION_CACHE_TTL_SECS"),
            EnvGuard::unset("KANBAN_PAGE_SIZE"),
            EnvGuard::unset("KANBAN_SECURE_IDS"),
        ];
        let config = KanbanConfig::from_env().expect("config");
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.admin_role.as_deref(), Some("administrator"));
        assert_eq!(config.permission_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.pagination.default_page_size, 10);
        assert_eq!(config.pagination.max_page_size, 100);
        assert!(config.secure_ids);
    }

    #[test]
    #[serial]
    fn empty_admin_role_disables_bypass() {
        let _guard = EnvGuard::set("KANBAN_ADMIN_ROLE", "  ");
        let config = KanbanConfig::from_env().expect("config");
        assert!(config.admin_role.is_none());
    }

    #[test]
    #[serial]
    fn invalid_bind_is_error() {
        let _guard = EnvGuard::set("KANBAN_BIND", "not-an-addr");
        let err = KanbanConfig::from_env().expect_err("invalid");
        assert!(err.to_string().contains("KANBAN_BIND"));
    }

    #[test]
    #[serial]
    fn yaml_overrides_env() {
        let dir = std::env::temp_dir().join(format!("kanban-config-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("dir");
        let path = dir.join("kanban.yaml");
        fs::write(
            &path,
            "bind_addr: 127.0.0.1:7000\npage_size: 25\nsecure_ids: false\npermission_cache_ttl_secs: 0\n",
        )
        .expect("write");
        let _bind = EnvGuard::unset("KANBAN_BIND");
        let _config = EnvGuard::set("KANBAN_CONFIG", path.to_str().expect("path"));

        let config = KanbanConfig::from_env_or_yaml().expect("config");
        assert_eq!(config.bind_addr.port(), 7000);
        assert_eq!(config.pagination.default_page_size, 25);
        assert!(!config.secure_ids);
        assert!(config.permission_cache_ttl.is_zero());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    #[serial]
    fn yaml_parse_failure_is_error() {
        let dir = std::env::temp_dir().join(format!("kanban-bad-config-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("dir");
        let path = dir.join("kanban.yaml");
        fs::write(&path, "page_size: [not, a, number]\n").expect("write");
        let _config = EnvGuard::set("KANBAN_CONFIG", path.to_str().expect("path"));
        assert!(KanbanConfig::from_env_or_yaml().is_err());
        let _ = fs::remove_dir_all(&dir);
    }
}
