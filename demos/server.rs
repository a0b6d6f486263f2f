use std::sync::mpsc;
use std::sync::Arc;

use wayfarer_core::api_server::ApiServer;
use wayfarer_core::config::ServerConfig;
use wayfarer_core::journey_service::MockJourneyService;
use wayfarer_core::upload_service::MockUploadService;

pub fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all("./logs")?;
    wayfarer_core::logs::init("./logs")?;

    let config = ServerConfig::from_env();
    let mut server = ApiServer::new(
        config,
        Arc::new(MockJourneyService::new()),
        Arc::new(MockUploadService::new()),
    );
    server.start()?;

    let base_url = server.base_url();
    println!("================================================");
    println!("wayfarer mock backend running at {base_url}");
    println!();
    println!("  GET  {base_url}/api/ping");
    println!("  GET  {base_url}/api/health");
    println!("  POST {base_url}/api/generate-journey");
    println!(
        "       e.g. curl -X POST {base_url}/api/generate-journey \\
           -H 'Content-Type: application/json' \\
           -d '{{\"query\": \"waterfalls\", \"location\": {{\"latitude\": 40.0, \"longitude\": -74.0}}}}'"
    );
    println!("  POST {base_url}/api/upload-image (multipart field `image`)");
    println!();
    println!("  request logs land under ./logs/");
    println!("================================================");
    println!("Press Ctrl+C to exit");

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })?;
    rx.recv()?;

    println!("stopping server...");
    server.stop();
    Ok(())
}
