use std::sync::{mpsc, Arc};
use std::thread;

use actix_multipart::form::{bytes::Bytes, MultipartForm, MultipartFormConfig};
use actix_web::dev::Service;
use actix_web::dev::ServerHandle;
use actix_web::{web, App, HttpResponse, HttpServer};
use anyhow::Result;
use serde::Deserialize;
use serde_json::json;
use tokio::runtime::Runtime;

use crate::config::ServerConfig;
use crate::journey::Location;
use crate::journey_service::JourneyService;
use crate::upload_service::{validate_image, ImageFile, ImageUploadService, MAX_IMAGE_BYTES};

// Room for the 10 MiB ceiling plus form overhead; anything past the ceiling
// itself is rejected with a reason by `validate_image`.
const MULTIPART_MEMORY_LIMIT: usize = MAX_IMAGE_BYTES as usize + 1024 * 1024;

struct AppState {
    journey_service: Arc<dyn JourneyService>,
    upload_service: Arc<dyn ImageUploadService>,
    ping_message: String,
}

fn bad_request(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(json!({ "error": message }))
}

fn internal_error(e: anyhow::Error) -> HttpResponse {
    error!("request failed: {e}");
    HttpResponse::InternalServerError().json(json!({ "error": "internal server error" }))
}

// Fields are optional so an incomplete body gets a proper 400 with a reason
// instead of a deserialization error.
#[derive(Deserialize)]
struct GenerateJourneyBody {
    query: Option<String>,
    location: Option<Location>,
}

async fn generate_journey(
    body: web::Json<GenerateJourneyBody>,
    data: web::Data<AppState>,
) -> HttpResponse {
    let body = body.into_inner();
    let (query, location) = match (body.query, body.location) {
        (Some(query), Some(location)) => (query, location),
        (None, _) => return bad_request("missing query"),
        (_, None) => return bad_request("missing location"),
    };
    match data
        .journey_service
        .generate_journey(&query, &location)
        .await
    {
        Ok(journey) => HttpResponse::Ok().json(journey),
        Err(e) => internal_error(e),
    }
}

#[derive(MultipartForm)]
struct UploadForm {
    image: Option<Bytes>,
}

async fn upload_image(
    MultipartForm(form): MultipartForm<UploadForm>,
    data: web::Data<AppState>,
) -> HttpResponse {
    let image = match form.image {
        Some(image) => image,
        None => return bad_request("no image file in request"),
    };
    let file = ImageFile {
        filename: image
            .file_name
            .clone()
            .unwrap_or_else(|| "upload".to_string()),
        content_type: image
            .content_type
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or_default(),
        bytes: image.data.to_vec(),
    };
    if let Err(e) = validate_image(&file.content_type, file.size()) {
        return bad_request(&e.to_string());
    }
    match data.upload_service.upload_image(&file).await {
        Ok(ack) => HttpResponse::Ok().json(ack),
        Err(e) => internal_error(e),
    }
}

async fn ping(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": data.ping_message }))
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// The backend HTTP surface. Runs on its own thread with its own runtime so
/// the embedding application stays free of actix concerns; supports port 0
/// and reports the bound address back through a channel.
///
/// Handlers only route; the journey and upload semantics live behind the
/// injected services, so swapping the mock backend for a real one does not
/// touch this file.
pub struct ApiServer {
    config: ServerConfig,
    journey_service: Arc<dyn JourneyService>,
    upload_service: Arc<dyn ImageUploadService>,
    bound_port: Option<u16>,
    server_handle: Option<ServerHandle>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ApiServer {
    pub fn new(
        config: ServerConfig,
        journey_service: Arc<dyn JourneyService>,
        upload_service: Arc<dyn ImageUploadService>,
    ) -> Self {
        ApiServer {
            config,
            journey_service,
            upload_service,
            bound_port: None,
            server_handle: None,
            handle: None,
        }
    }

    pub fn base_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.host,
            self.bound_port.unwrap_or(self.config.port)
        )
    }

    pub fn start(&mut self) -> Result<()> {
        let app_state = web::Data::new(AppState {
            journey_service: self.journey_service.clone(),
            upload_service: self.upload_service.clone(),
            ping_message: self.config.ping_message.clone(),
        });
        let host = self.config.host.clone();
        let port = self.config.port;

        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let runtime = Runtime::new().expect("failed to create tokio runtime");
            runtime.block_on(async move {
                let server = HttpServer::new(move || {
                    App::new()
                        .app_data(app_state.clone())
                        .app_data(
                            MultipartFormConfig::default()
                                .total_limit(MULTIPART_MEMORY_LIMIT)
                                .memory_limit(MULTIPART_MEMORY_LIMIT),
                        )
                        .wrap_fn(|req, srv| {
                            info!("incoming request: {} {}", req.method(), req.uri());
                            srv.call(req)
                        })
                        .route("/api/generate-journey", web::post().to(generate_journey))
                        .route("/api/upload-image", web::post().to(upload_image))
                        .route("/api/ping", web::get().to(ping))
                        .route("/api/health", web::get().to(health))
                })
                .bind((host.as_str(), port))
                .expect("failed to bind server");

                let bound_port = server.addrs().first().map(|addr| addr.port()).unwrap_or(port);
                let server = server.run();
                tx.send((bound_port, server.handle()))
                    .expect("failed to send bound address");
                if let Err(e) = server.await {
                    error!("api server stopped with error: {e}");
                }
            });
        });

        let (bound_port, server_handle) = rx.recv()?;
        self.bound_port = Some(bound_port);
        self.server_handle = Some(server_handle);
        self.handle = Some(handle);
        info!("api server listening on {}", self.base_url());
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(server_handle) = self.server_handle.take() {
            pollster::block_on(server_handle.stop(true));
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        self.stop();
    }
}
