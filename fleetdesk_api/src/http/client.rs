use std::sync::Arc;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::{
    middleware::{Middleware, Next},
    request::{ApiRequest, ApiResponse},
    transport::HttpTransport,
};
use crate::{ApiError, ApiResult};

/// Single choke point for outbound calls: runs the middleware chain, then
/// turns non-2xx answers into [`ApiError`]s.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    stages: Arc<[Arc<dyn Middleware>]>,
}

pub struct ApiClientBuilder {
    transport: Arc<dyn HttpTransport>,
    stages: Vec<Arc<dyn Middleware>>,
}

impl ApiClientBuilder {
    pub fn with(self, stage: impl Middleware + 'static) -> Self {
        self.with_shared(Arc::new(stage))
    }

    pub fn with_shared(mut self, stage: Arc<dyn Middleware>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn build(self) -> ApiClient {
        ApiClient {
            transport: self.transport,
            stages: self.stages.into(),
        }
    }
}

impl ApiClient {
    pub fn builder(transport: Arc<dyn HttpTransport>) -> ApiClientBuilder {
        ApiClientBuilder {
            transport,
            stages: Vec::new(),
        }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub async fn send(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let response = Next::new(self.transport.as_ref(), &self.stages)
            .run(request)
            .await?;
        check_status(response)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let response = self.send(ApiRequest::get(path)).await?;
        unwrap_envelope(&response)
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(ApiRequest::post(path).with_json(body)?).await?;
        unwrap_envelope(&response)
    }

    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(ApiRequest::patch(path).with_json(body)?).await?;
        unwrap_envelope(&response)
    }

    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        self.send(ApiRequest::delete(path)).await?;
        Ok(())
    }
}

fn check_status(response: ApiResponse) -> ApiResult<ApiResponse> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let code = status.as_u16();
    let message = response
        .error_message()
        .unwrap_or_else(|| format!("request failed with status {code}"));

    Err(match code {
        401 => ApiError::Unauthorized { message },
        400..=499 => ApiError::Validation {
            status: code,
            message,
        },
        500..=599 => ApiError::Server {
            status: code,
            message,
        },
        _ => ApiError::UnexpectedStatus {
            status: code,
            message,
        },
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

/// Success bodies usually arrive as `{ "data": ... }`; bare payloads are
/// accepted too.
pub fn unwrap_envelope<T: DeserializeOwned>(response: &ApiResponse) -> ApiResult<T> {
    match response.json::<Envelope<T>>()? {
        Envelope::Wrapped { data } => Ok(data),
        Envelope::Bare(payload) => Ok(payload),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::StatusCode;
    use serde::Deserialize;
    use serde_json::json;

    use super::{ApiClient, unwrap_envelope};
    use crate::{
        ApiError,
        errors::ErrorKind,
        http::{ApiResponse, RequestLogger},
        testing::ScriptedTransport,
    };

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: String,
    }

    #[test]
    fn unwraps_enveloped_and_bare_payloads() {
        let wrapped = ApiResponse::json_body(
            StatusCode::OK,
            &json!({ "data": [{ "id": "a" }], "message": "ok", "statusCode": 200 }),
        );
        let items: Vec<Item> = unwrap_envelope(&wrapped).expect("wrapped");
        assert_eq!(items, vec![Item { id: "a".to_string() }]);

        let bare = ApiResponse::json_body(StatusCode::OK, &json!({ "id": "b" }));
        let item: Item = unwrap_envelope(&bare).expect("bare");
        assert_eq!(item.id, "b");
    }

    #[tokio::test]
    async fn maps_status_codes_to_taxonomy() {
        let cases = [
            (StatusCode::UNAUTHORIZED, ErrorKind::Auth),
            (StatusCode::UNPROCESSABLE_ENTITY, ErrorKind::Validation),
            (StatusCode::NOT_FOUND, ErrorKind::Validation),
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Server),
            (StatusCode::SERVICE_UNAVAILABLE, ErrorKind::Server),
        ];

        for (status, expected) in cases {
            let transport = Arc::new(ScriptedTransport::always(
                status,
                &json!({ "message": "nope" }).to_string(),
            ));
            let client = ApiClient::builder(transport).with(RequestLogger).build();
            let err = client
                .get_json::<serde_json::Value>("/locations")
                .await
                .expect_err("non-2xx should fail");
            assert_eq!(err.kind(), expected, "status {status}");
            assert!(err.to_string().contains("nope"), "status {status}");
        }
    }

    #[tokio::test]
    async fn generic_message_when_body_has_none() {
        let transport = Arc::new(ScriptedTransport::always(StatusCode::BAD_GATEWAY, ""));
        let client = ApiClient::builder(transport).build();

        let err = client
            .delete("/devices/dev-1")
            .await
            .expect_err("502 should fail");
        let ApiError::Server { status, message } = err else {
            panic!("expected server error");
        };
        assert_eq!(status, 502);
        assert_eq!(message, "request failed with status 502");
    }

    #[tokio::test]
    async fn network_failures_pass_through_unchanged() {
        let transport = Arc::new(ScriptedTransport::failing("connection refused"));
        let client = ApiClient::builder(transport).with(RequestLogger).build();

        let err = client
            .get_json::<serde_json::Value>("/dashboard/stats")
            .await
            .expect_err("transport failure");
        assert!(matches!(err, ApiError::Network { .. }));
        assert_eq!(client.stage_names(), vec!["request-logger"]);
    }
}
