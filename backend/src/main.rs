mod certificates;
mod config;
mod error;
mod services;

use crate::certificates::document::DocumentTemplate;
use crate::certificates::ledger::Ledger;
use crate::certificates::pipeline::IssuancePipeline;
use crate::certificates::renderer::PdfRenderer;
use crate::config::Config;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use env_logger::Env;
use include_dir::{include_dir, Dir};
use log::{info, warn};
use mime_guess::from_path;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

static STATIC_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/static");

async fn serve_embedded(req: HttpRequest) -> HttpResponse {
    let path = req.path().trim_start_matches('/');
    let file_path = if path.is_empty() { "index.html" } else { path };

    match STATIC_DIR.get_file(file_path) {
        Some(file) => {
            let mime = from_path(file_path).first_or_octet_stream();
            HttpResponse::Ok()
                .content_type(mime.as_ref())
                .body(file.contents().to_vec())
        }
        None => HttpResponse::NotFound().body("Not Found"),
    }
}

fn build_pipeline(config: &Config) -> io::Result<IssuancePipeline> {
    let ledger = Ledger::open(&config.db_path).map_err(io::Error::other)?;
    match ledger.latest().map_err(io::Error::other)? {
        Some(last) => info!("Numbering continues after {}", last.certificate_number),
        None => info!("Ledger is empty, numbering starts from the first sequence"),
    }
    let document = match &config.document_template {
        Some(path) => {
            info!("Using document template {}", path.display());
            DocumentTemplate::from_file(path)?
        }
        None => DocumentTemplate::default(),
    };
    Ok(IssuancePipeline::new(
        ledger,
        Arc::new(PdfRenderer::new(&config.output_dir)),
        document,
        &config.base_dir,
    ))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let config = Config::from_env().map_err(io::Error::other)?;
    let url = config.url();

    let pipeline = web::Data::new(build_pipeline(&config)?);
    info!(
        "Ledger at {}, certificates written to {}",
        config.db_path.display(),
        config.output_dir.display()
    );

    if config.open_browser {
        let url_clone = url.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(500));
            if let Err(e) = webbrowser::open(&url_clone) {
                warn!("Could not open a browser: {}", e);
            }
        });
    }

    info!("Server running at {}", url);

    let bind = (config.host.clone(), config.port);
    let config = web::Data::new(config);
    HttpServer::new(move || {
        App::new()
            .app_data(web::PayloadConfig::default().limit(config.max_upload_bytes))
            .app_data(pipeline.clone())
            .app_data(config.clone())
            .service(
                web::resource("/")
                    .route(web::get().to(serve_embedded))
                    .route(web::post().to(services::certificates::issue::process)),
            )
            .service(services::certificates::configure_routes())
            .default_service(web::route().to(serve_embedded))
    })
    .bind(bind)?
    .run()
    .await
}
