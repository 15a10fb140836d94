//! Runtime secret resolution.
//!
//! # Contract
//! - Config YAML stores only env var NAMES (`ledger.auth_token_env`).
//! - Callers invoke [`resolve_secrets`] once at startup and pass the result to
//!   constructors; nothing else reads `std::env` for secrets.
//! - `Debug` redacts values; errors name the variable, never its value.
//!
//! | Profile  | `auth_token_env` set but variable unset |
//! |----------|------------------------------------------|
//! | operator | `SECRETS_MISSING`                        |
//! | demo     | resolves to `None`                       |

use anyhow::{bail, Result};

use crate::profile::{LedgerSettings, Profile};

#[derive(Clone, Default)]
pub struct ResolvedSecrets {
    /// Bearer token for the ledger RPC endpoint, if one is configured.
    pub rpc_auth_token: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field(
                "rpc_auth_token",
                &self.rpc_auth_token.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

/// Returns `None` if the variable is unset or blank.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

pub fn resolve_secrets(ledger: &LedgerSettings, profile: Profile) -> Result<ResolvedSecrets> {
    let Some(var) = ledger
        .auth_token_env
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
    else {
        return Ok(ResolvedSecrets::default());
    };

    let token = resolve_env(var);
    if token.is_none() && profile == Profile::Operator {
        bail!(
            "SECRETS_MISSING profile=operator: env var '{}' (ledger auth token) is not set or empty",
            var
        );
    }

    Ok(ResolvedSecrets {
        rpc_auth_token: token,
    })
}
