use super::commands;
use crate::error::{BridgeError, Result};
use crate::hub::Hub;
use crate::registration::Registration;
use log::{debug, error, warn};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Every command a device can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum CommandType {
    RegisterSensor,
    UpdateSensorStates,
    UpdateRegistration,
}

type Handler = fn(&Hub, &Registration, Value) -> Result<Value>;

impl CommandType {
    fn handler(self) -> Handler {
        match self {
            CommandType::RegisterSensor => commands::register_sensor,
            CommandType::UpdateSensorStates => commands::update_sensor_states,
            CommandType::UpdateRegistration => commands::update_registration,
        }
    }
}

#[derive(Clone)]
pub struct WebhookRouter {
    hub: Arc<Hub>,
}

impl WebhookRouter {
    pub fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }

    /// Run one command on behalf of the device owning `secret_handle`.
    ///
    /// An unknown handle fails with [`BridgeError::NotFound`] whatever the
    /// command type. Handler errors are returned unchanged.
    pub fn dispatch(&self, secret_handle: &str, command_type: &str, payload: Value) -> Result<Value> {
        let registration = self.hub.resolve(secret_handle).ok_or(BridgeError::NotFound)?;

        let command = CommandType::from_str(command_type).map_err(|_| {
            warn!("[Webhook] Unknown webhook command type: {}", command_type);
            BridgeError::validation(format!("Unknown command type: {}", command_type))
        })?;

        debug!(
            "[Webhook] Handling command '{}' for device {}",
            command, registration.device_id
        );

        let handler = command.handler();
        handler(self.hub.as_ref(), &registration, payload).inspect_err(|e| match e {
            BridgeError::Validation(msg) => debug!(
                "[Webhook] {} rejected for {}: {}",
                command, registration.device_id, msg
            ),
            other => error!(
                "[Webhook] {} failed for {}: {}",
                command, registration.device_id, other
            ),
        })
    }
}
