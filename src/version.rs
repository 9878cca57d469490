//! Build information baked in at compile time
//!
//! Set `NEEDYS_BUILD_TIME`, `NEEDYS_COMMIT` and `NEEDYS_RELEASE` when
//! building to fill these in; they read `unset` otherwise.

use serde::Serialize;

const UNSET: &str = "unset";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Version {
    pub build_time: String,
    pub commit: String,
    pub release: String,
}

impl Version {
    pub fn from_build_env() -> Self {
        Self {
            build_time: option_env!("NEEDYS_BUILD_TIME").unwrap_or(UNSET).to_string(),
            commit: option_env!("NEEDYS_COMMIT").unwrap_or(UNSET).to_string(),
            release: option_env!("NEEDYS_RELEASE")
                .unwrap_or(env!("CARGO_PKG_VERSION"))
                .to_string(),
        }
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::from_build_env()
    }
}
