//! Runtime environment handed to external container commands.
//!
//! Built once per invocation from declared variables, falling back to the
//! identity of the current process. Nothing here is global.

use std::collections::BTreeMap;

use crate::error::CoreError;

pub const DEFAULT_UMASK: &str = "27";
pub const DEFAULT_SERVICES_WAIT_TIME: u64 = 4;

/// Identity and timing defaults for container commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeEnv {
    pub uid: String,
    pub gid: String,
    pub umask: String,
    pub gitaggregate_uid: String,
    pub gitaggregate_gid: String,
    pub services_wait_time: u64,
}

/// Numeric identity of the running process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessIdentity {
    pub uid: u32,
    pub gid: u32,
}

impl ProcessIdentity {
    #[cfg(unix)]
    pub fn current() -> Self {
        Self {
            uid: nix::unistd::getuid().as_raw(),
            gid: nix::unistd::getgid().as_raw(),
        }
    }

    #[cfg(not(unix))]
    pub fn current() -> Self {
        Self { uid: 0, gid: 0 }
    }
}

impl RuntimeEnv {
    /// Resolve from the real process environment.
    pub fn from_process() -> Result<Self, CoreError> {
        Self::resolve(|key| std::env::var(key).ok(), ProcessIdentity::current())
    }

    /// `GID`/`UID` come from `DOODBA_GID`/`DOODBA_UID` or the process;
    /// the git-aggregate pair falls back to those; the umask falls back
    /// to `27` and the wait time to 4 seconds.
    pub fn resolve<F>(env: F, identity: ProcessIdentity) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let gid = env("DOODBA_GID").unwrap_or_else(|| identity.gid.to_string());
        let uid = env("DOODBA_UID").unwrap_or_else(|| identity.uid.to_string());
        let services_wait_time = match env("SERVICES_WAIT_TIME") {
            Some(raw) => raw.trim().parse().map_err(|_| CoreError::InvalidEnv {
                key: "SERVICES_WAIT_TIME".to_owned(),
                value: raw,
            })?,
            None => DEFAULT_SERVICES_WAIT_TIME,
        };

        Ok(Self {
            gitaggregate_gid: env("DOODBA_GITAGGREGATE_GID").unwrap_or_else(|| gid.clone()),
            gitaggregate_uid: env("DOODBA_GITAGGREGATE_UID").unwrap_or_else(|| uid.clone()),
            umask: env("DOODBA_UMASK").unwrap_or_else(|| DEFAULT_UMASK.to_owned()),
            gid,
            uid,
            services_wait_time,
        })
    }

    /// Variables to export into a container command, sorted by name.
    pub fn vars(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("GID", self.gid.clone()),
            ("UID", self.uid.clone()),
            ("DOODBA_UMASK", self.umask.clone()),
            ("DOODBA_GITAGGREGATE_GID", self.gitaggregate_gid.clone()),
            ("DOODBA_GITAGGREGATE_UID", self.gitaggregate_uid.clone()),
        ])
    }
}
