// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates a commented hotpatch.yml template.

use std::path::{Path, PathBuf};

use super::{CONFIG_FILENAME, ConfigError};

pub const TEMPLATE: &str = r#"# How updates may be applied: auto | full-build-only | live-only
update_mode: auto

environment:
  kind: cluster        # cluster | compose
  cluster: local       # local clusters share this machine's container runtime
  # registry: localhost:5000

deploy_timeout: 2m

steps:
  deps:
    fall_back_on: [package.json, package-lock.json]
  src:
    sync: { local: ./src, remote: /app/src }
  restart: restart_container

targets:
  - name: my-app
    workload: deployment/my-app
    image: my-registry/my-app
    context: .
    live_update:
      - deps
      - src
      - run: { cmd: "npm run build", trigger: ["src/**/*.ts"] }
      - restart
"#;

/// Write the template to `dir`, refusing to overwrite unless `force`.
pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(ConfigError::AlreadyExists(config_path));
    }

    std::fs::write(&config_path, TEMPLATE).map_err(|source| ConfigError::Io {
        path: config_path.clone(),
        source,
    })?;

    Ok(config_path)
}
