use serde::{Deserialize, Serialize};

use crate::models::Message;

/// Events sent over the `/ws` socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// The `auth` frame carried a valid token; the socket is now addressable.
    AuthSuccess,

    /// The `auth` frame was malformed or its token failed verification.
    AuthError,

    /// A message addressed to the connected user was persisted.
    NewMessage { message: Message },
}

/// Commands sent FROM client TO server over the socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayCommand {
    Auth { token: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_events_serialize_as_bare_type() {
        assert_eq!(
            serde_json::to_string(&GatewayEvent::AuthSuccess).unwrap(),
            r#"{"type":"auth_success"}"#
        );
        assert_eq!(
            serde_json::to_string(&GatewayEvent::AuthError).unwrap(),
            r#"{"type":"auth_error"}"#
        );
    }

    #[test]
    fn auth_command_parses() {
        let cmd: GatewayCommand = serde_json::from_str(r#"{"type":"auth","token":"abc"}"#).unwrap();
        let GatewayCommand::Auth { token } = cmd;
        assert_eq!(token, "abc");
    }
}
