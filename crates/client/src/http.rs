use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use orderdesk_core::config::{normalize_api_base_url, ApiConfig};
use orderdesk_core::domain::order::{Order, OrderId, OrderStatus, OrderSummary, StatusUpdate};
use orderdesk_core::errors::OrderApiError;
use orderdesk_core::ports::{OrderApi, OrderCollectionSource};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not build http client: {0}")]
    Build(#[from] reqwest::Error),
    #[error("api base url `{url}` is not usable: {reason}")]
    BaseUrl { url: String, reason: String },
}

/// Error body returned by the admin API on non-2xx responses.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrderPage {
    orders: Vec<OrderSummary>,
    #[serde(default)]
    next_cursor: Option<String>,
}

/// `reqwest`-backed order API rooted at a normalized `.../api` base URL.
#[derive(Clone, Debug)]
pub struct HttpOrderApi {
    client: Client,
    base_url: Url,
}

impl HttpOrderApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url: parse_base_url(base_url)? })
    }

    pub fn from_config(api: &ApiConfig) -> Result<Self, ClientError> {
        Self::new(&api.base_url, Duration::from_secs(api.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn receipt_url(&self, id: &OrderId) -> String {
        endpoint(&self.base_url, &["admin", "order", id.as_str(), "receipt"]).into()
    }

    fn order_url(&self, id: &OrderId) -> Url {
        endpoint(&self.base_url, &["admin", "order", id.as_str()])
    }

    async fn send(
        &self,
        id: Option<&OrderId>,
        request: RequestBuilder,
    ) -> Result<Response, OrderApiError> {
        let response =
            request.send().await.map_err(|error| OrderApiError::Transport(error.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(
            event_name = "order.api.error_response",
            status = status.as_u16(),
            body_len = body.len(),
            "order api returned an error response"
        );
        Err(map_error_response(id, status, &body))
    }
}

/// Download location of an order's payment receipt under `base_url`, or
/// `None` when the base cannot carry a path.
pub fn receipt_url(base_url: &str, id: &OrderId) -> Option<String> {
    let base = parse_base_url(base_url).ok()?;
    Some(endpoint(&base, &["admin", "order", id.as_str(), "receipt"]).into())
}

fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let normalized = normalize_api_base_url(raw);
    let url = Url::parse(&normalized).map_err(|error| ClientError::BaseUrl {
        url: normalized.clone(),
        reason: error.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ClientError::BaseUrl { url: normalized, reason: "no path".to_string() });
    }
    Ok(url)
}

/// `base` extended by `segments`; each one is percent-encoded as a single
/// path segment, so ids containing `/`, `?` or `#` stay inside it.
fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, OrderApiError> {
    response.json::<T>().await.map_err(|error| OrderApiError::Decode(error.to_string()))
}

/// 404 on an order route is `NotFound`; everything else keeps the server's
/// wording, falling back to the HTTP reason phrase.
pub(crate) fn map_error_response(
    id: Option<&OrderId>,
    status: StatusCode,
    body: &str,
) -> OrderApiError {
    if status == StatusCode::NOT_FOUND {
        if let Some(id) = id {
            return OrderApiError::NotFound(id.clone());
        }
    }

    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = [parsed.message, parsed.detail, parsed.error]
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    OrderApiError::Rejected { status_code: status.as_u16(), message }
}

#[async_trait]
impl OrderApi for HttpOrderApi {
    async fn fetch_order(&self, id: &OrderId) -> Result<Order, OrderApiError> {
        let response = self.send(Some(id), self.client.get(self.order_url(id))).await?;
        decode(response).await
    }

    async fn update_order_status(
        &self,
        id: &OrderId,
        update: &StatusUpdate,
    ) -> Result<Order, OrderApiError> {
        let url = endpoint(&self.base_url, &["admin", "order", id.as_str(), "status"]);
        let response = self.send(Some(id), self.client.patch(url).json(update)).await?;
        decode(response).await
    }

    async fn delete_order(&self, id: &OrderId) -> Result<(), OrderApiError> {
        self.send(Some(id), self.client.delete(self.order_url(id))).await?;
        Ok(())
    }
}

#[async_trait]
impl OrderCollectionSource for HttpOrderApi {
    async fn list_orders(
        &self,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderSummary>, OrderApiError> {
        let mut request = self.client.get(endpoint(&self.base_url, &["admin", "orders"]));
        if let Some(status) = status {
            request = request.query(&[("status", status.wire_label())]);
        }
        let page: OrderPage = decode(self.send(None, request).await?).await?;
        debug!(
            event_name = "order.api.listed",
            count = page.orders.len(),
            has_more = page.next_cursor.is_some(),
            "order page received"
        );
        Ok(page.orders)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::StatusCode;

    use orderdesk_core::domain::order::OrderId;
    use orderdesk_core::errors::OrderApiError;

    use super::{map_error_response, receipt_url, HttpOrderApi};

    #[test]
    fn not_found_on_order_route_keeps_identity() {
        let id = OrderId::new("ord-1");
        let error = map_error_response(Some(&id), StatusCode::NOT_FOUND, "");
        assert_eq!(error, OrderApiError::NotFound(id));
    }

    #[test]
    fn message_field_wins_over_detail_and_error() {
        let body = r#"{"error":"conflict","message":"Order already rejected","status_code":409,"detail":"state=rejected"}"#;
        let error = map_error_response(None, StatusCode::CONFLICT, body);
        assert_eq!(
            error,
            OrderApiError::Rejected {
                status_code: 409,
                message: "Order already rejected".to_string()
            }
        );
    }

    #[test]
    fn detail_then_error_then_reason_phrase() {
        let detail = map_error_response(
            None,
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"error":"validation","message":"  ","detail":"rejection_reason is empty"}"#,
        );
        assert_eq!(detail.server_message(), Some("rejection_reason is empty"));

        let error_only =
            map_error_response(None, StatusCode::BAD_REQUEST, r#"{"error":"bad_request"}"#);
        assert_eq!(error_only.server_message(), Some("bad_request"));

        let html = map_error_response(None, StatusCode::BAD_GATEWAY, "<html>oops</html>");
        assert_eq!(
            html,
            OrderApiError::Rejected { status_code: 502, message: "Bad Gateway".to_string() }
        );
    }

    #[test]
    fn urls_are_built_from_normalized_base() {
        let api = HttpOrderApi::new("shop.example.com/app", Duration::from_secs(5))
            .expect("client builds");

        assert_eq!(api.base_url(), "https://shop.example.com/api");
        assert_eq!(
            api.receipt_url(&OrderId::new("ord-7")),
            "https://shop.example.com/api/admin/order/ord-7/receipt"
        );
    }

    #[test]
    fn order_ids_are_encoded_as_one_path_segment() {
        let api = HttpOrderApi::new("https://shop.example.com/api", Duration::from_secs(5))
            .expect("client builds");

        assert_eq!(
            api.receipt_url(&OrderId::new("ord/7?x=1#top")),
            "https://shop.example.com/api/admin/order/ord%2F7%3Fx=1%23top/receipt"
        );
        assert_eq!(
            receipt_url("https://shop.example.com/api/", &OrderId::new("a b")).as_deref(),
            Some("https://shop.example.com/api/admin/order/a%20b/receipt")
        );
    }
}
