use serde::Deserialize;
use serde_json::value::RawValue;

/// Tagged delivery envelope. `data` stays raw until the type is known.
#[derive(Debug, Deserialize)]
pub struct Envelope<'a> {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(borrow)]
    pub data: &'a RawValue,
}

/// Payload of a `user.created` event. Only `id` is required.
#[derive(Debug, Deserialize)]
pub struct ClerkUserCreated {
    pub id: String,
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
}

#[derive(Debug, Deserialize)]
pub struct EmailAddress {
    pub id: String,
    pub email_address: String,
}

impl ClerkUserCreated {
    pub fn display_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn primary_email(&self) -> Option<&str> {
        self.email_addresses
            .first()
            .map(|e| e.email_address.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_keeps_data_raw() {
        let body = r#"{"type":"session.created","data":{"anything":[1,2,3]},"object":"event"}"#;
        let env: Envelope = serde_json::from_str(body).unwrap();
        assert_eq!(env.event_type, "session.created");
        assert_eq!(env.data.get(), r#"{"anything":[1,2,3]}"#);
    }

    #[test]
    fn user_created_tolerates_sparse_payload() {
        let user: ClerkUserCreated = serde_json::from_str(r#"{"id":"user_29w83sxmDNGwOuEthce5gg56FcC"}"#).unwrap();
        assert_eq!(user.id, "user_29w83sxmDNGwOuEthce5gg56FcC");
        assert_eq!(user.display_name(), "");
        assert!(user.primary_email().is_none());
    }

    #[test]
    fn user_created_reads_profile_fields() {
        let user: ClerkUserCreated = serde_json::from_str(
            r#"{
                "id": "user_1",
                "object": "user",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "email_addresses": [{"id": "idn_1", "email_address": "ada@example.com"}]
            }"#,
        )
        .unwrap();
        assert_eq!(user.object.as_deref(), Some("user"));
        assert_eq!(user.display_name(), "Ada Lovelace");
        assert_eq!(user.primary_email(), Some("ada@example.com"));
    }
}
