use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::EXTERNAL_CALL_TIMEOUT;
use crate::error::{Result, ServiceError};

/// Outbound telephony gateway for phone-based transfer targets
#[async_trait]
pub trait TelephonyGateway: Send + Sync {
    /// Place an outbound call; the gateway fetches `callback_url` for
    /// call-control markup when the call is answered
    async fn place_call(
        &self,
        phone_number: &str,
        callback_url: &str,
        status_callback_url: &str,
    ) -> Result<String>;

    async fn call_status(&self, call_id: &str) -> Result<String>;
}

/// Render call-control markup that optionally speaks a summary before
/// connecting the answered call to a room
pub fn render_voice_markup(room: &str, summary: Option<&str>) -> String {
    let mut body = String::new();
    if let Some(s) = summary.filter(|s| !s.trim().is_empty()) {
        body.push_str(&format!("    <Say>{}</Say>\n", escape_xml(s)));
    }
    body.push_str(&format!(
        "    <Connect>\n        <Room>{}</Room>\n    </Connect>\n",
        escape_xml(room)
    ));

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response>\n{}</Response>",
        body
    )
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// REST client shaped like the Twilio calls API
pub struct HttpTelephonyGateway {
    client: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

impl HttpTelephonyGateway {
    pub fn new(
        base_url: &str,
        account_sid: &str,
        auth_token: &str,
        from_number: &str,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            from_number: from_number.to_string(),
        }
    }

    fn calls_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.base_url, self.account_sid
        )
    }
}

#[async_trait]
impl TelephonyGateway for HttpTelephonyGateway {
    async fn place_call(
        &self,
        phone_number: &str,
        callback_url: &str,
        status_callback_url: &str,
    ) -> Result<String> {
        let form = [
            ("To", phone_number),
            ("From", self.from_number.as_str()),
            ("Url", callback_url),
            ("StatusCallback", status_callback_url),
            ("Method", "POST"),
        ];

        let request = self
            .client
            .post(self.calls_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send();

        let response = tokio::time::timeout(EXTERNAL_CALL_TIMEOUT, request)
            .await
            .map_err(|_| ServiceError::timeout("telephony call placement"))?
            .map_err(|e| ServiceError::upstream(format!("telephony request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ServiceError::upstream(format!(
                "telephony gateway returned {}",
                response.status()
            )));
        }

        let call: CallResource = response
            .json()
            .await
            .map_err(|e| ServiceError::upstream(format!("malformed call resource: {}", e)))?;

        info!("Placed outbound call {} to {}", call.sid, phone_number);
        Ok(call.sid)
    }

    async fn call_status(&self, call_id: &str) -> Result<String> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Calls/{}.json",
            self.base_url, self.account_sid, call_id
        );

        let request = self
            .client
            .get(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send();

        let response = tokio::time::timeout(EXTERNAL_CALL_TIMEOUT, request)
            .await
            .map_err(|_| ServiceError::timeout("telephony status fetch"))?
            .map_err(|e| ServiceError::upstream(format!("telephony request failed: {}", e)))?;

        let call: CallResource = response
            .json()
            .await
            .map_err(|e| ServiceError::upstream(format!("malformed call resource: {}", e)))?;

        Ok(call.status.unwrap_or_else(|| "unknown".to_string()))
    }
}
