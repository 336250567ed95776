//! Liveness and pairing endpoints.
//!
//! `GET /` answers with a static line so a supervisor can see the process is
//! up. `GET /qr` renders the current pairing code as a scannable PNG, or 404
//! when no code has been issued yet.

use crate::pairing::PairingSlot;
use crate::Result;
use anyhow::Context;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use image::{DynamicImage, ImageOutputFormat};
use qrcode::QrCode;
use std::io::Cursor;
use std::net::SocketAddr;
use tracing::{error, info};

pub fn router(pairing: PairingSlot) -> Router {
    Router::new()
        .route("/", get(running))
        .route("/qr", get(qr))
        .with_state(pairing)
}

/// Binds the liveness server and serves until the process exits.
pub async fn serve(port: u16, pairing: PairingSlot) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind the liveness server to {addr}"))?;
    info!("Liveness server listening on http://{addr}");
    axum::serve(listener, router(pairing))
        .await
        .context("Liveness server exited")
}

async fn running() -> &'static str {
    "chatledger is running"
}

async fn qr(State(pairing): State<PairingSlot>) -> Response {
    let Some(code) = pairing.current().await else {
        return (StatusCode::NOT_FOUND, "No pairing code available.").into_response();
    };
    match render_png(&code) {
        Ok(png) => ([(header::CONTENT_TYPE, "image/png")], png).into_response(),
        Err(e) => {
            error!("Failed to render the pairing code: {e:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to generate QR code image.",
            )
                .into_response()
        }
    }
}

/// Renders the pairing code as a PNG of at least 300px.
fn render_png(code: &str) -> Result<Vec<u8>> {
    let qr = QrCode::new(code.as_bytes()).context("Pairing code does not fit in a QR code")?;
    let img = qr
        .render::<image::Luma<u8>>()
        .min_dimensions(300, 300)
        .build();
    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .context("Failed to encode the QR code as PNG")?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_qr_is_404_before_any_code_is_issued() {
        let response = qr(State(PairingSlot::default())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_qr_serves_png_once_a_code_exists() {
        let pairing = PairingSlot::default();
        pairing.set("pair-me").await;
        let response = qr(State(pairing)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/png"
        );
    }

    #[test]
    fn test_render_png_produces_png_bytes() {
        let png = render_png("some pairing payload").unwrap();
        // PNG magic number.
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);
    }
}
