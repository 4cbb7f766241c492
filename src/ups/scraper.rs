//! Device scraper
//!
//! Walks the resource graph of one UPS and assembles a [`DeviceSnapshot`].
//!
//! # Re-login
//!
//! Every GET goes through [`DeviceScraper::fetch`], which logs in again when the
//! device signals that the session is gone:
//!
//! - the JSON body carries an `errorCode` (session expired)
//! - the response is HTTP 401 or mentions `Unauthorized`
//! - the connection itself failed, or connecting timed out
//!
//! After a successful re-login the same GET is issued again. A call re-logs in
//! at most [`MAX_RELOGINS`] times; a device that keeps rejecting the fresh token
//! is reported as an authentication failure.
//!
//! # Degradation
//!
//! The section accessors (`get_system`, `get_temperature`, `get_measures`)
//! swallow login and JSON syntax errors, log them and report the section as
//! absent. Any other error is a hard failure and propagates.

use crate::config::ExporterConfig;
use crate::error::{ExporterError, LoginError, Result};
use crate::ups::paths::{
    INPUT_MEMBER_ID, MANAGER_PATH, OUTPUT_MEMBER_ID, POWER_DISTRIBUTION_PATH, TEMPERATURES_PATH,
};
use crate::ups::session::{Credentials, Session};
use crate::ups::types::*;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

pub const MAX_RELOGINS: usize = 1;

const SESSION_EXPIRED_KEY: &str = "errorCode";
const UNAUTHORIZED_MARKER: &str = "Unauthorized";

/// Why a GET has to be repeated after logging in again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relogin {
    SessionExpired,
    Unauthorized,
    ConnectionLost,
}

impl Relogin {
    /// Error reported when the retry budget is spent and the device still
    /// answers the same way.
    fn exhausted(self) -> ExporterError {
        let error = match self {
            Relogin::SessionExpired | Relogin::Unauthorized => LoginError::AuthenticationFailed,
            Relogin::ConnectionLost => LoginError::Connection,
        };
        error.into()
    }
}

enum Attempt {
    Payload(Value),
    Relogin(Relogin),
}

pub struct DeviceScraper {
    session: Session,
    name: Option<String>,
}

impl DeviceScraper {
    pub fn new(
        address: impl Into<String>,
        credentials: Credentials,
        name: Option<String>,
        config: &ExporterConfig,
    ) -> Result<Self> {
        Ok(Self {
            session: Session::new(address, credentials, config)?,
            name,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Configured name, or the one derived from the power distribution id
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Label identifying this device: its name, or its address until a name is known
    pub fn ups_id(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.session.address())
    }

    /// GET a device-relative path and parse the JSON body, logging in again
    /// when the device asks for it.
    pub async fn fetch(&mut self, path: &str) -> Result<Value> {
        let mut relogins = 0;
        loop {
            let cause = match self.attempt(path).await? {
                Attempt::Payload(value) => return Ok(value),
                Attempt::Relogin(cause) => cause,
            };
            if relogins == MAX_RELOGINS {
                debug!("{:?} persists after re-login on {}", cause, path);
                return Err(cause.exhausted());
            }
            relogins += 1;
            self.relogin(cause).await?;
        }
    }

    async fn attempt(&self, path: &str) -> Result<Attempt> {
        let response = match self.session.get(path).await {
            Ok(response) => response,
            Err(ExporterError::Http(e)) if e.is_connect() => {
                debug!("Connection error on {}, try to login again", path);
                return Ok(Attempt::Relogin(Relogin::ConnectionLost));
            }
            Err(e) => return Err(e),
        };

        let status = response.status();
        let body = response.text().await?;
        let parsed = serde_json::from_str::<Value>(&body);

        if let Ok(value) = &parsed {
            if value.get(SESSION_EXPIRED_KEY).is_some() {
                debug!("Session expired, reconnect");
                return Ok(Attempt::Relogin(Relogin::SessionExpired));
            }
        }
        if status == StatusCode::UNAUTHORIZED || body.contains(UNAUTHORIZED_MARKER) {
            debug!("Unauthorized, try to login");
            return Ok(Attempt::Relogin(Relogin::Unauthorized));
        }

        debug!("GET {} -> {}", path, status);
        Ok(Attempt::Payload(parsed?))
    }

    async fn relogin(&mut self, cause: Relogin) -> Result<()> {
        match self.session.refresh().await {
            Ok(()) => Ok(()),
            // A timeout here cannot be told apart from rejected credentials
            Err(e) if cause == Relogin::Unauthorized && e.is_timeout() => {
                Err(LoginError::AuthenticationFailed.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch a resource and deserialize it into the shape expected at that hop.
    async fn fetch_as<T: DeserializeOwned>(&mut self, resource: &str, path: &str) -> Result<T> {
        let value = self.fetch(path).await?;
        serde_json::from_value(value).map_err(|e| ExporterError::UnexpectedResponse {
            resource: resource.to_string(),
            reason: e.to_string(),
        })
    }

    fn degrade<T>(&self, section: &str, outcome: Result<T>) -> Result<Section<T>> {
        match outcome {
            Ok(value) => Ok(Section::Present(value)),
            Err(ExporterError::Json(e)) => {
                debug!("Failed to decode {} response", section);
                error!(
                    "Failed to read {} of {}: {}",
                    section,
                    self.session.address(),
                    e
                );
                Ok(Section::Absent)
            }
            Err(e) if e.is_degradable() => {
                error!(
                    "Failed to read {} of {}: {}",
                    section,
                    self.session.address(),
                    e
                );
                Ok(Section::Absent)
            }
            Err(e) => Err(e),
        }
    }

    /// Identification of the device (name, firmware and bootloader versions)
    pub async fn get_system(&mut self) -> Result<Section<SystemInfo>> {
        let outcome = self
            .fetch_as::<ManagerOverview>("manager", MANAGER_PATH)
            .await
            .map(|overview| overview.identification);
        self.degrade("system", outcome)
    }

    /// First temperature sensor of the environment service
    pub async fn get_temperature(&mut self) -> Result<Section<TemperatureInfo>> {
        let outcome = self.read_temperature().await;
        self.degrade("temperature", outcome)
    }

    async fn read_temperature(&mut self) -> Result<TemperatureInfo> {
        let collection: TemperatureCollection =
            self.fetch_as("temperatures", TEMPERATURES_PATH).await?;
        let first = collection
            .members
            .first()
            .ok_or_else(|| ExporterError::UnexpectedResponse {
                resource: "temperatures".to_string(),
                reason: "collection has no members".to_string(),
            })?;
        self.fetch_as("temperature", &first.id).await
    }

    /// Input, output and battery readings.
    ///
    /// Every hop depends on links from the previous one. A login or decode
    /// failure anywhere along the chain leaves the whole section absent.
    pub async fn get_measures(&mut self) -> Result<Section<MeasureInfo>> {
        let outcome = self.read_measures().await;
        self.degrade("measures", outcome)
    }

    async fn read_measures(&mut self) -> Result<MeasureInfo> {
        let overview: PowerDistribution = self
            .fetch_as("power distribution", POWER_DISTRIBUTION_PATH)
            .await?;

        if self.name.is_none() {
            let name = format!("ups_{}", overview.id_text());
            debug!("Naming {} as {}", self.session.address(), name);
            self.name = Some(name);
        }

        let inputs: PowerPort = self
            .fetch_as(
                "inputs",
                &format!("{}/{}", overview.inputs.id, INPUT_MEMBER_ID),
            )
            .await?;
        let outputs: PowerPort = self
            .fetch_as(
                "outputs",
                &format!("{}/{}", overview.outputs.id, OUTPUT_MEMBER_ID),
            )
            .await?;

        let backup: BackupSystem = self
            .fetch_as("backup system", &overview.backup_system.id)
            .await?;
        let powerbank: PowerBank = self
            .fetch_as("power bank", &backup.power_bank.id)
            .await?;

        Ok(MeasureInfo {
            ups_id: self.ups_id().to_string(),
            inputs,
            outputs,
            powerbank,
        })
    }

    /// Read all sections of one snapshot.
    ///
    /// Each section is attempted regardless of how the others went; a hard
    /// failure in any of them is returned once all three have been tried.
    /// A hard failure drops the whole snapshot, sections read fine included.
    pub async fn get_data(&mut self) -> Result<DeviceSnapshot> {
        let system = self.get_system().await;
        let temperature = self.get_temperature().await;
        let measures = self.get_measures().await;

        Ok(DeviceSnapshot {
            ups_id: self.ups_id().to_string(),
            system: system?,
            temperature: temperature?,
            measures: measures?,
        })
    }
}
