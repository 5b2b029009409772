// src/api/rest.rs
use anyhow::Result;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn};

use crate::api::routes::api_routes;
use crate::api::AppState;
use crate::config::ServerConfig;

pub struct RestApi {
    server_config: ServerConfig,
}

impl RestApi {
    pub fn new(server_config: ServerConfig) -> Self {
        Self { server_config }
    }

    /// 啟動服務器，`shutdown` 完成時優雅關閉
    pub async fn start(
        self,
        state: AppState,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        // 建立應用
        let app = self.build_app(state);

        // 解析地址
        let addr = SocketAddr::from((
            self.server_config.host.parse::<std::net::IpAddr>()?,
            self.server_config.port,
        ));

        info!("Starting REST API server on {}", addr);

        // 啟動服務器
        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }

    /// 組裝路由與中間件
    pub fn build_app(&self, state: AppState) -> Router {
        Router::new()
            .merge(api_routes())
            .with_state(state)
            // 請求追蹤
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new())
                    .on_response(DefaultOnResponse::new()),
            )
            // CORS
            .layer(self.build_cors_layer())
            // 壓縮
            .layer(CompressionLayer::new())
            // 超時設置
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.server_config.request_timeout_secs,
            )))
    }

    fn build_cors_layer(&self) -> CorsLayer {
        let cors = CorsLayer::new()
            .allow_methods(vec![Method::GET, Method::POST])
            .allow_headers(vec![header::CONTENT_TYPE]);

        if !self.server_config.enable_cors {
            return cors;
        }

        let origins: Vec<HeaderValue> = self
            .server_config
            .cors_allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();

        cors.allow_origin(origins)
    }
}
