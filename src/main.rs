// src/main.rs
use std::env;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cinelist::app::api::ApiClient;
use cinelist::app::cache;
use cinelist::app::session::{FileStore, KvStore, MemoryStore, Session};
use cinelist::config::load_config;

fn pick_renderer() -> eframe::Renderer {
    match env::var("CINELIST_RENDERER").as_deref() {
        Ok("glow") => eframe::Renderer::Glow,
        Ok("wgpu") => eframe::Renderer::Wgpu,
        _ => {
            // Default: Windows = WGPU (DX12), Others = Glow (GL)
            #[cfg(target_os = "windows")]
            { eframe::Renderer::Wgpu }
            #[cfg(not(target_os = "windows"))]
            { eframe::Renderer::Glow }
        }
    }
}

fn open_store() -> Box<dyn KvStore> {
    let dir = cache::store_dir();
    match FileStore::open(dir.clone()) {
        Ok(store) => {
            info!("session store at {}", dir.display());
            Box::new(store)
        }
        Err(e) => {
            warn!("session store at {} unavailable ({e}); nothing will persist", dir.display());
            Box::new(MemoryStore::default())
        }
    }
}

fn main() -> eframe::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let cfg = load_config();
    info!(
        api = %cfg.api_base_url,
        page_size = cfg.page_size,
        workers = cfg.poster_workers,
        "starting"
    );

    let api = match ApiClient::new(&cfg) {
        Ok(api) => api,
        Err(e) => {
            error!("could not build HTTP client: {e}");
            std::process::exit(1);
        }
    };
    let session = Session::load(open_store());

    let options = eframe::NativeOptions {
        renderer: pick_renderer(),
        multisampling: 0,
        ..Default::default()
    };

    match eframe::run_native(
        "Commitment Issues",
        options,
        Box::new(|_cc| Ok(Box::new(cinelist::app::CatalogApp::new(cfg, api, session)))),
    ) {
        Ok(_) => Ok(()),
        Err(e) => {
            error!("eframe failed to start: {e:?}");
            error!("Hint: on WSL use X/Wayland; on Windows try CINELIST_RENDERER=wgpu or glow.");
            Err(e)
        }
    }
}
