use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

const CONFIG: &str = r#"
[storage]
data_dir = "data"

[[users]]
id = "admin-1"
name = "Admin User"
email = "admin@example.com"
role = "admin"

[[users]]
id = "user-2"
name = "John Employee"
email = "john@example.com"
employee_id = "EMP001"

[[users]]
id = "user-3"
name = "Pat Worker"
employee_id = "EMP002"
"#;

pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn init() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        fs::write(dir.path().join("taskhub.toml"), CONFIG.trim_start())
            .expect("write taskhub.toml");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<()> {
        fs::write(self.dir.path().join("taskhub.toml"), contents)
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("taskhub").expect("taskhub binary");
        cmd.current_dir(self.dir.path());
        cmd.env_remove("TASKHUB_CONFIG");
        cmd.env_remove("TASKHUB_DATA_DIR");
        cmd.env_remove("TASKHUB_USER");
        cmd
    }
}
