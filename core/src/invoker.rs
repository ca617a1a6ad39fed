//! Signed URL assembly and request construction.

use tracing::debug;
use uuid::Uuid;

use crate::config::BbbConfig;
use crate::http::{HttpMethod, HttpRequest};
use crate::query::Params;

/// `base_url + call + '?' + query + '&checksum=' + digest`.
///
/// The checksum covers the unsigned query only and is always the last
/// parameter. With no parameters the URL is `base_url + call + '?checksum=' +
/// digest`.
pub fn signed_url(config: &BbbConfig, call: &str, params: &Params) -> String {
    let query = params.encode();
    let checksum = config
        .checksum_algorithm
        .sign(&config.secret, &query, call);
    debug!(call, algorithm = %config.checksum_algorithm, "signed call");

    if query.is_empty() {
        format!("{}{call}?checksum={checksum}", config.base_url)
    } else {
        format!("{}{call}?{query}&checksum={checksum}", config.base_url)
    }
}

/// Plain GET of a signed URL.
pub fn get_request(url: String) -> HttpRequest {
    HttpRequest::get(url)
}

/// Multipart POST to a signed URL whose single `file` part references a
/// presentation by URL instead of carrying its bytes.
pub fn upload_request(url: String, slide_url: &str) -> HttpRequest {
    let boundary = format!("bbb-{}", Uuid::new_v4().simple());
    let document = presentation_modules(slide_url);

    let mut body = Vec::with_capacity(document.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"file\"; filename=\"\"\r\n\
          Content-Type: text/xml\r\n\r\n",
    );
    body.extend_from_slice(document.as_bytes());
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    HttpRequest {
        method: HttpMethod::Post,
        url,
        headers: vec![(
            "content-type".to_string(),
            format!("multipart/form-data; boundary={boundary}"),
        )],
        body: Some(body),
    }
}

/// `<modules>` document the server reads pre-upload slides from.
pub fn presentation_modules(slide_url: &str) -> String {
    format!(
        r#"<modules><module name="presentation"><document url="{}" /></module></modules>"#,
        quick_xml::escape::escape(slide_url)
    )
}
