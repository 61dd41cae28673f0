use std::path::PathBuf;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_status::SetStatus;

/// Serve the built front-end, answering unknown paths with its index page
pub fn spa_service(dir: &str) -> ServeDir<SetStatus<ServeFile>> {
    let dist = PathBuf::from(dir);
    let index = dist.join("index.html");
    ServeDir::new(dist).not_found_service(ServeFile::new(index))
}
