//! Client identity/audit strings streamed during session setup (§4.3d).
//! Snapshotted once at driver construction so behavior stays deterministic
//! for tests rather than re-reading the environment mid-handshake.

#[derive(Debug, Clone)]
pub struct ClientIdentity {
    pub os: String,
    pub host: String,
    pub os_user: String,
    pub app_name: String,
    pub pid: i32,
}

impl ClientIdentity {
    /// Read OS, host name, OS user, PID and (unless `app_name` is given) the
    /// executable basename from the environment.
    pub fn snapshot(app_name: Option<String>) -> Self {
        Self {
            os: whoami::platform().to_string(),
            host: whoami::fallible::hostname().unwrap_or_else(|_| "unknown".to_string()),
            os_user: whoami::username(),
            app_name: app_name.unwrap_or_else(default_app_name),
            pid: std::process::id() as i32,
        }
    }
}

fn default_app_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "nz-client".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_uses_supplied_app_name_when_given() {
        let id = ClientIdentity::snapshot(Some("my-app".to_string()));
        assert_eq!(id.app_name, "my-app");
    }

    #[test]
    fn snapshot_falls_back_to_executable_basename() {
        let id = ClientIdentity::snapshot(None);
        assert!(!id.app_name.is_empty());
    }

    #[test]
    fn snapshot_captures_a_nonzero_pid() {
        let id = ClientIdentity::snapshot(None);
        assert!(id.pid > 0);
    }
}
