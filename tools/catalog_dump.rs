use cinelist::app::api::ApiClient;
use cinelist::app::cache;
use cinelist::app::filters::{derive_view, Marks, Selections};
use cinelist::app::session::{FileStore, Session};
use cinelist::app::types::{FormatType, SortBy};
use cinelist::config::load_config;
use std::env;
use std::fs::File;
use std::io::Write;

const USAGE: &str = "Usage: cargo run --bin catalog_dump [--sort popular|top_rated|favorited|watchlist] \
[--format movie|any] [--genre NAME]... [--search TEXT] [--favorites-from-store] [--out file]";

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1).cloned())
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        eprintln!("{USAGE}");
        std::process::exit(1);
    }

    let mut selections = Selections::default();
    if let Some(s) = flag_value(&args, "--sort") {
        let Some(sort_by) = SortBy::from_str(&s) else {
            eprintln!("Unknown sort `{s}`\n{USAGE}");
            std::process::exit(1);
        };
        selections.set_sort_by(sort_by);
    }
    if let Some(f) = flag_value(&args, "--format") {
        let Some(format) = FormatType::from_str(&f) else {
            eprintln!("Unknown format `{f}`\n{USAGE}");
            std::process::exit(1);
        };
        selections.set_format(format);
    }
    let genres: Vec<String> = args
        .windows(2)
        .filter(|w| w[0] == "--genre")
        .map(|w| w[1].clone())
        .collect();
    selections.set_selected_genres(genres);
    if let Some(q) = flag_value(&args, "--search") {
        selections.set_search_query(q);
    }

    let cfg = load_config();
    let marks = if args.iter().any(|a| a == "--favorites-from-store") {
        match FileStore::open(cache::store_dir()) {
            Ok(store) => Session::load(Box::new(store)).marks().clone(),
            Err(e) => {
                eprintln!("Could not open session store: {e}");
                Marks::default()
            }
        }
    } else {
        Marks::default()
    };

    let api = match ApiClient::new(&cfg) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("Could not build HTTP client: {e}");
            std::process::exit(1);
        }
    };
    println!("Fetching catalog from {}", api.base_url());

    let catalog = match api.fetch_catalog(cfg.page_size) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Catalog fetch failed: {e}");
            std::process::exit(1);
        }
    };

    let view = derive_view(&catalog, &selections, &marks);

    let mut output = String::new();
    output.push_str(&format!(
        "--- {} / {} ---\n",
        selections.sort_by().label(),
        selections.format().label()
    ));
    for (rank, movie) in view.iter(&catalog) {
        if view.show_ranks {
            output.push_str(&format!("{rank}. {} ({:.1})\n", movie.title, movie.rating));
        } else {
            output.push_str(&format!("- {} ({:.1})\n", movie.title, movie.rating));
        }
    }
    output.push_str(&format!("{}\n", view.summary()));

    let out_file = flag_value(&args, "--out");
    if let Some(path) = out_file {
        let written = File::create(&path).and_then(|mut f| f.write_all(output.as_bytes()));
        match written {
            Ok(()) => println!("Exported results to {path}"),
            Err(e) => {
                eprintln!("Failed to write {path}: {e}");
                std::process::exit(1);
            }
        }
    } else {
        print!("{output}");
    }
}
