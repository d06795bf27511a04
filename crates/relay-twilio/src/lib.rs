use relay_core::{InboundSms, RelayError};
use serde::{Deserialize, Serialize};

const PROVIDER: &str = "twilio";

/// Types used to parse Twilio inbound webhooks for SMS/MMS notifications.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TwilioInbound {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "To")]
    pub to: String,
    #[serde(rename = "Body")]
    pub body: Option<String>,
    #[serde(rename = "MediaUrl0")]
    pub media_url: Option<String>,
    #[serde(rename = "MessageSid")]
    pub message_sid: Option<String>,
}

impl From<TwilioInbound> for InboundSms {
    fn from(t: TwilioInbound) -> Self {
        let raw = serde_json::to_value(&t).unwrap_or_default();
        InboundSms {
            from: t.from,
            to: t.to,
            body: t.body,
            // Twilio sends MediaUrl0 as an empty field on plain SMS from
            // some REST proxies; treat empty as absent.
            media_url: t.media_url.filter(|u| !u.is_empty()),
            sid: t.message_sid.filter(|s| !s.is_empty()),
            provider: PROVIDER,
            raw,
        }
    }
}

/// Decode a Twilio webhook body into a normalized [`InboundSms`].
///
/// Twilio posts `application/x-www-form-urlencoded` by default; JSON bodies
/// are accepted too, keyed on the request content type.
pub fn decode_inbound(content_type: Option<&str>, body: &[u8]) -> Result<InboundSms, RelayError> {
    let inbound: TwilioInbound = if content_type.is_some_and(|ct| ct.starts_with("application/json"))
    {
        serde_json::from_slice(body).map_err(|e| RelayError::Parse(format!("json decode: {e}")))?
    } else {
        serde_urlencoded::from_bytes(body)
            .map_err(|e| RelayError::Parse(format!("form decode: {e}")))?
    };
    Ok(inbound.into())
}
