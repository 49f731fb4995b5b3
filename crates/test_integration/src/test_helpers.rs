use crate::runner::context::test_context::TestContext;
use crate::test_constants::DIMS;
use color_eyre::Result;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::io::Cursor;

/// A small PNG whose bytes are unique per `shade`.
pub fn png(shade: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([shade, 255 - shade, 128])))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Unit vector along dimension `i`.
pub fn axis(i: usize) -> Vec<f32> {
    let mut vector = vec![0.0; DIMS];
    vector[i] = 1.0;
    vector
}

pub fn image_form(file_name: &str, bytes: Vec<u8>, fields: &[(&str, String)]) -> Form {
    let mut form = Form::new().part("file", Part::bytes(bytes).file_name(file_name.to_string()));
    for (name, value) in fields {
        form = form.text((*name).to_string(), value.clone());
    }
    form
}

pub async fn post_form(context: &TestContext, path: &str, form: Form) -> Result<(StatusCode, Value)> {
    let response = context
        .http_client
        .post(context.url(path))
        .multipart(form)
        .send()
        .await?;
    let status = response.status();
    Ok((status, response.json().await?))
}

/// Indexes `shade`'s image as `photo_id` in `event_id`, scripted to contain `faces`.
pub async fn index_photo(
    context: &TestContext,
    shade: u8,
    photo_id: i64,
    event_id: i64,
    faces: &[Vec<f32>],
) -> Result<Value> {
    let image = png(shade)?;
    context.model.script(&image, faces);
    let form = image_form(
        "photo.png",
        image,
        &[("photo_id", photo_id.to_string()), ("event_id", event_id.to_string())],
    );
    let (status, body) = post_form(context, "/api/face/extract", form).await?;
    assert_eq!(status, StatusCode::OK, "extract failed: {body}");
    Ok(body)
}

pub async fn search(
    context: &TestContext,
    image: Vec<u8>,
    fields: &[(&str, String)],
) -> Result<(StatusCode, Value)> {
    post_form(context, "/api/face/search", image_form("query.jpg", image, fields)).await
}

pub fn match_ids(body: &Value) -> Vec<String> {
    body["matches"]
        .as_array()
        .map(|matches| {
            matches
                .iter()
                .filter_map(|m| m["vector_id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

pub async fn record_count(context: &TestContext) -> Result<u64> {
    let body: Value = context
        .http_client
        .get(context.url("/api/face/stats"))
        .send()
        .await?
        .json()
        .await?;
    Ok(body["record_count"].as_u64().unwrap_or_default())
}
