//! Secret definitions and resolution.
//!
//! A [`Secret`] names where a credential comes from. Sources are tried in
//! a fixed precedence: literal value, environment variable, file, then a
//! Kubernetes secret read through `kubectl`. A missing environment variable
//! falls through to the next source; every other source failure is final.

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

/// How often a running `kubectl` is polled for exit or cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// A reference to a key inside a Kubernetes secret.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalSecret {
    pub namespace: String,
    #[serde(alias = "secretName")]
    pub name: String,
    #[serde(alias = "secretKey")]
    pub key: String,
}

impl ExternalSecret {
    /// Usable only when all three fields are set.
    pub fn is_complete(&self) -> bool {
        !self.namespace.is_empty() && !self.name.is_empty() && !self.key.is_empty()
    }
}

/// Where a credential comes from. Empty fields count as unset.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Secret {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(alias = "fromEnv", skip_serializing_if = "Option::is_none")]
    pub from_env: Option<String>,
    #[serde(alias = "fromFile", skip_serializing_if = "Option::is_none")]
    pub from_file: Option<String>,
    #[serde(
        alias = "fromK8s",
        alias = "from_k8s",
        skip_serializing_if = "Option::is_none"
    )]
    pub from_external: Option<ExternalSecret>,
}

/// A single configured secret source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource<'a> {
    Value(&'a str),
    Env(&'a str),
    File(&'a str),
    External(&'a ExternalSecret),
}

fn non_empty(field: Option<&String>) -> Option<&str> {
    field.map(String::as_str).filter(|s| !s.is_empty())
}

impl Secret {
    /// A secret holding a literal value.
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// A secret read from an environment variable.
    pub fn env(var: impl Into<String>) -> Self {
        Self {
            from_env: Some(var.into()),
            ..Self::default()
        }
    }

    /// A secret read verbatim from a file.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            from_file: Some(path.into()),
            ..Self::default()
        }
    }

    /// The configured sources, in precedence order.
    pub fn sources(&self) -> Vec<SecretSource<'_>> {
        let mut sources = Vec::new();
        if let Some(v) = non_empty(self.value.as_ref()) {
            sources.push(SecretSource::Value(v));
        }
        if let Some(v) = non_empty(self.from_env.as_ref()) {
            sources.push(SecretSource::Env(v));
        }
        if let Some(v) = non_empty(self.from_file.as_ref()) {
            sources.push(SecretSource::File(v));
        }
        if let Some(ext) = self.from_external.as_ref().filter(|e| e.is_complete()) {
            sources.push(SecretSource::External(ext));
        }
        sources
    }

    /// Whether any source is configured.
    pub fn is_defined(&self) -> bool {
        !self.sources().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("value", &self.value.as_ref().map(|_| "..."))
            .field("from_env", &self.from_env)
            .field("from_file", &self.from_file)
            .field("from_external", &self.from_external)
            .finish()
    }
}

/// Resolves [`Secret`]s to their values.
#[derive(Debug, Clone)]
pub struct SecretResolver {
    kubectl: String,
    cancel: CancelToken,
}

impl Default for SecretResolver {
    fn default() -> Self {
        Self::new(CancelToken::new())
    }
}

impl SecretResolver {
    /// Resolver that runs `kubectl` from `PATH`.
    pub fn new(cancel: CancelToken) -> Self {
        Self::with_kubectl("kubectl", cancel)
    }

    /// Resolver that runs a specific `kubectl` binary.
    pub fn with_kubectl(kubectl: impl Into<String>, cancel: CancelToken) -> Self {
        Self {
            kubectl: kubectl.into(),
            cancel,
        }
    }

    /// Resolve a secret, failing if no source produces a value.
    pub fn resolve(&self, secret: &Secret) -> Result<String> {
        let mut reason = String::from("no secret source is defined");
        for source in secret.sources() {
            match source {
                SecretSource::Value(v) => return Ok(v.to_string()),
                SecretSource::Env(var) => match std::env::var(var) {
                    Ok(v) => {
                        log::debug!("secret read from environment variable {var}");
                        return Ok(v);
                    }
                    Err(_) => {
                        log::debug!("environment variable {var} is not set");
                        reason = format!("environment variable {var} is not set");
                    }
                },
                SecretSource::File(path) => return read_file(path),
                SecretSource::External(ext) => return self.read_external(ext),
            }
        }
        Err(Error::secret(reason))
    }

    /// Resolve a secret if one is defined.
    pub fn resolve_optional(&self, secret: &Secret) -> Result<Option<String>> {
        if secret.is_defined() {
            self.resolve(secret).map(Some)
        } else {
            Ok(None)
        }
    }

    fn read_external(&self, ext: &ExternalSecret) -> Result<String> {
        self.cancel.check()?;
        let jsonpath = format!("jsonpath={{.data.{}}}", ext.key);
        log::debug!(
            "reading key {} of secret {}/{} with {}",
            ext.key,
            ext.namespace,
            ext.name,
            self.kubectl
        );

        let mut child = Command::new(&self.kubectl)
            .args(["-n", &ext.namespace, "get", "secret", &ext.name, "-o", &jsonpath])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::secret(format!("cannot run {}: {e}", self.kubectl)))?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = loop {
            if self.cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::Cancelled);
            }
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    return Err(Error::secret(format!(
                        "waiting for {}: {e}",
                        self.kubectl
                    )));
                }
            }
        };

        let out = stdout.join().unwrap_or_default();
        let err = stderr.join().unwrap_or_default();
        if !status.success() {
            return Err(Error::secret(format!(
                "{} exited with {status}: {}",
                self.kubectl,
                err.trim()
            )));
        }

        let encoded = out.trim();
        if encoded.is_empty() {
            return Err(Error::secret(format!(
                "key {} not found in secret {}/{}",
                ext.key, ext.namespace, ext.name
            )));
        }
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| Error::secret(format!("invalid base64 in secret {}: {e}", ext.name)))?;
        String::from_utf8(bytes)
            .map_err(|_| Error::secret(format!("secret {} is not valid UTF-8", ext.name)))
    }
}

fn read_file(path: &str) -> Result<String> {
    let expanded = shellexpand::tilde(path);
    log::debug!("reading secret from file {expanded}");
    std::fs::read_to_string(expanded.as_ref())
        .map_err(|e| Error::secret(format!("cannot read {expanded}: {e}")))
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_string(&mut buf);
        }
        buf
    })
}
