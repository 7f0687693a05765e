//! Upload service against a local axum endpoint.

#![allow(clippy::panic)]

use axum::Router;
use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use tutor_link::error::UploadError;
use tutor_link::service::{Document, Uploader};

/// What the endpoint saw for one upload.
#[derive(Debug)]
struct Received {
    field: String,
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

async fn serve(app: Router) -> String {
    let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}/api/upload-pdf")
}

/// Endpoint that records the first multipart field and answers with
/// `reply` (or an empty body when `None`).
async fn recording_endpoint(
    reply: Option<&'static str>,
) -> (String, mpsc::UnboundedReceiver<Received>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let app = Router::new().route(
        "/api/upload-pdf",
        post(move |mut multipart: Multipart| {
            let tx = tx.clone();
            async move {
                if let Ok(Some(field)) = multipart.next_field().await {
                    let field_name = field.name().unwrap_or_default().to_string();
                    let file_name = field.file_name().map(str::to_string);
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
                    let _ = tx.send(Received {
                        field: field_name,
                        file_name,
                        content_type,
                        bytes,
                    });
                }
                match reply {
                    Some(message) => axum::Json(json!({ "message": message })).into_response(),
                    None => StatusCode::OK.into_response(),
                }
            }
        }),
    );
    (serve(app).await, rx)
}

#[tokio::test]
async fn uploads_pdf_as_multipart_file_field() {
    let (url, mut received) = recording_endpoint(Some("Indexed 3 pages")).await;
    let uploader = Uploader::new(url);

    let result = uploader
        .upload(Document::new("notes.pdf", "application/pdf", b"%PDF-1.4".to_vec()))
        .await;
    let message = match result {
        Ok(message) => message,
        Err(e) => panic!("upload failed: {e:?}"),
    };
    assert_eq!(message, "Indexed 3 pages");

    let Some(seen) = received.recv().await else {
        panic!("endpoint saw nothing");
    };
    assert_eq!(seen.field, "file");
    assert_eq!(seen.file_name.as_deref(), Some("notes.pdf"));
    assert_eq!(seen.content_type.as_deref(), Some("application/pdf"));
    assert_eq!(seen.bytes, b"%PDF-1.4");
}

#[tokio::test]
async fn falls_back_to_default_confirmation() {
    let (url, _received) = recording_endpoint(None).await;
    let uploader = Uploader::new(url);

    let result = uploader
        .upload(Document::new("ch2.pdf", "application/pdf", b"%PDF".to_vec()))
        .await;
    let message = match result {
        Ok(message) => message,
        Err(e) => panic!("upload failed: {e:?}"),
    };
    assert_eq!(message, "Successfully uploaded: ch2.pdf");
}

#[tokio::test]
async fn server_error_is_rejected_with_status() {
    let app = Router::new().route(
        "/api/upload-pdf",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let uploader = Uploader::new(serve(app).await);

    let result = uploader
        .upload(Document::new("a.pdf", "application/pdf", b"%PDF".to_vec()))
        .await;
    let err = match result {
        Err(err @ UploadError::Rejected { status: 500 }) => err,
        other => panic!("expected rejection, got {other:?}"),
    };
    assert_eq!(err.to_string(), "Upload failed.");
}

#[tokio::test]
async fn wrong_type_is_rejected_before_sending() {
    let (url, mut received) = recording_endpoint(Some("should not happen")).await;
    let uploader = Uploader::new(url);

    let result = uploader
        .upload(Document::new("photo.png", "image/png", vec![0u8; 8]))
        .await;
    let err = match result {
        Err(err @ UploadError::UnsupportedMimeType(_)) => err,
        other => panic!("expected type error, got {other:?}"),
    };
    assert_eq!(err.to_string(), "Please upload a valid PDF file.");
    assert!(received.try_recv().is_err());
}
