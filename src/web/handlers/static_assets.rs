//! Static asset handlers
//!
//! Serves the embedded stylesheet and countdown script.

use axum::{
    extract::Path,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::assets::StaticAssets;

/// `GET /static/{*path}`
pub async fn serve_static_asset(Path(path): Path<String>) -> Response {
    let asset_path = format!("static/{path}");

    match StaticAssets::get_asset(&asset_path) {
        Some(file) => {
            let mut headers = HeaderMap::new();
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(StaticAssets::get_content_type(&path)),
            );
            headers.insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static("public, max-age=86400"),
            );

            (headers, file.data.into_owned()).into_response()
        }
        None => (StatusCode::NOT_FOUND, "Asset not found").into_response(),
    }
}
