// Record API endpoints
//
// Direct entity mutations (delete, status actions, batch deletes), the
// small JSON lookups the admin forms use for cascading selects, and the
// record detail reads behind read-only views.

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::client::FormClient;
use crate::envelope::{ActionReply, interpret_action};
use crate::error::Error;

/// Lookup path for the properties of one community.
pub const PROPERTIES_BY_COMMUNITY: &str = "/admin/api/properties-by-community/";

/// One entry of the property lookup used by cascading selects.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PropertyOption {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub full_address: Option<String>,
}

impl PropertyOption {
    /// Display text: name, then full address, then the id.
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.full_address.as_deref())
            .unwrap_or(&self.id)
    }
}

/// Primary keys come back as numbers or strings depending on the view.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Text fields of a record: strings, numbers (decimals, ids) or null.
fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// One payment record from `GET /api/payment/records/<id>/`.
///
/// Every field is optional: list views and older records omit some, and
/// the property and owner columns only appear on annotated responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PaymentRecordDetail {
    #[serde(deserialize_with = "opt_text")]
    pub id: Option<String>,
    #[serde(deserialize_with = "opt_text")]
    pub transaction_id: Option<String>,
    #[serde(deserialize_with = "opt_text")]
    pub out_trade_no: Option<String>,
    #[serde(deserialize_with = "opt_text")]
    pub property_unit: Option<String>,
    #[serde(deserialize_with = "opt_text")]
    pub floor_room: Option<String>,
    #[serde(deserialize_with = "opt_text")]
    pub payer: Option<String>,
    #[serde(deserialize_with = "opt_text")]
    pub owner: Option<String>,
    #[serde(deserialize_with = "opt_text")]
    pub amount: Option<String>,
    #[serde(deserialize_with = "opt_text")]
    pub payment_method: Option<String>,
    #[serde(deserialize_with = "opt_text")]
    pub payment_time: Option<String>,
    #[serde(deserialize_with = "opt_text")]
    pub operator: Option<String>,
    #[serde(deserialize_with = "opt_text")]
    pub status: Option<String>,
    #[serde(deserialize_with = "opt_text")]
    pub refund_amount: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PropertyLookup {
    #[serde(default)]
    properties: Vec<PropertyOption>,
}

impl FormClient {
    /// `DELETE <path>`.
    pub async fn delete(&self, path: &str, csrf: Option<&str>) -> Result<ActionReply, Error> {
        let url = self.resolve(path)?;
        debug!("DELETE {}", url);

        let builder = Self::apply_csrf(Self::background(self.http().delete(url)), csrf);
        let resp = builder.send().await.map_err(Error::Transport)?;
        Self::parse_action(resp).await
    }

    /// `DELETE <path>` with a JSON body (batch endpoints).
    pub async fn delete_with_body(
        &self,
        path: &str,
        body: &Value,
        csrf: Option<&str>,
    ) -> Result<ActionReply, Error> {
        let url = self.resolve(path)?;
        debug!("DELETE {} (with body)", url);

        let builder = Self::apply_csrf(Self::background(self.http().delete(url).json(body)), csrf);
        let resp = builder.send().await.map_err(Error::Transport)?;
        Self::parse_action(resp).await
    }

    /// `POST <path>` with a JSON body (status transitions, inline updates).
    pub async fn post_action(
        &self,
        path: &str,
        body: &Value,
        csrf: Option<&str>,
    ) -> Result<ActionReply, Error> {
        let url = self.resolve(path)?;
        debug!("POST {}", url);

        let builder = Self::apply_csrf(Self::background(self.http().post(url).json(body)), csrf);
        let resp = builder.send().await.map_err(Error::Transport)?;
        Self::parse_action(resp).await
    }

    /// Properties belonging to a community, for cascading selects.
    pub async fn properties_by_community(
        &self,
        community_id: &str,
    ) -> Result<Vec<PropertyOption>, Error> {
        let mut url = self.resolve(PROPERTIES_BY_COMMUNITY)?;
        url.query_pairs_mut()
            .append_pair("community_id", community_id);

        let lookup: PropertyLookup = self.get_json(url, "lookup failed").await?;
        Ok(lookup.properties)
    }

    /// `GET <path>` of a single record, e.g. `/api/payment/records/<id>/`.
    pub async fn record<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.resolve(path)?;
        self.get_json(url, "record not found").await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, fallback: &str) -> Result<T, Error> {
        debug!("GET {}", url);
        let resp = Self::background(self.http().get(url))
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;
        if !status.is_success() {
            let (status, message) = match interpret_action(status, &body) {
                Err(rejected) => rejected,
                Ok(_) => (status.as_u16(), fallback.to_owned()),
            };
            return Err(Error::Rejected { status, message });
        }

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    async fn parse_action(resp: reqwest::Response) -> Result<ActionReply, Error> {
        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;
        interpret_action(status, &body).map_err(|(status, message)| Error::Rejected { status, message })
    }
}
