//! Blocking Graph API client.
use super::error::{SocialError, AUTH_EXPIRED_CODE, NONEXISTING_FIELD_CODE};
use super::retry::RetryPolicy;
use super::{PostedPhoto, SocialClient};
use crate::clock::Clock;
use crate::config::FacebookSettings;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

const REACTIONS_FIELDS: &str = "reactions.summary(total_count)";
const STORY_ID_FIELD: &str = "page_story_id";
const MAX_ERROR_BODY_BYTES: usize = 512;

/// Page the access token belongs to.
#[derive(Debug, Clone)]
struct PageIdentity {
    id: String,
    name: String,
}

pub struct GraphClient {
    agent: ureq::Agent,
    base_url: String,
    access_token: String,
    page: PageIdentity,
    retry: RetryPolicy,
    clock: Rc<dyn Clock>,
}

#[derive(Deserialize)]
struct GraphErrorEnvelope {
    error: GraphErrorBody,
}

#[derive(Deserialize)]
struct GraphErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: i64,
    #[serde(default)]
    error_subcode: Option<i64>,
    #[serde(default)]
    is_transient: bool,
}

impl GraphClient {
    /// Build the client and resolve the page behind the token.
    ///
    /// An expired token fails here, before any frame is touched.
    pub fn connect(
        settings: &FacebookSettings,
        access_token: String,
        clock: Rc<dyn Clock>,
    ) -> Result<Self, SocialError> {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(settings.timeout_secs)))
            .http_status_as_error(false)
            .build();
        let mut client = Self {
            agent: ureq::Agent::new_with_config(config),
            base_url: format!(
                "{}/{}",
                settings.base_url.trim_end_matches('/'),
                settings.api_version
            ),
            access_token,
            page: PageIdentity {
                id: "me".to_string(),
                name: String::new(),
            },
            retry: settings.retry_policy(),
            clock,
        };
        let me = client.get_object("me", "name,id")?;
        client.page = PageIdentity {
            id: string_field(&me, "id")?,
            name: string_field(&me, "name")?,
        };
        tracing::info!(
            page_id = %client.page.id,
            page_name = %client.page.name,
            "connected to graph api"
        );
        Ok(client)
    }

    fn url(&self, object_id: &str, connection: Option<&str>) -> String {
        match connection {
            Some(connection) => format!("{}/{object_id}/{connection}", self.base_url),
            None => format!("{}/{object_id}", self.base_url),
        }
    }

    fn get_object(&self, object_id: &str, fields: &str) -> Result<Value, SocialError> {
        let url = self.url(object_id, None);
        tracing::debug!(%url, fields, "graph get");
        self.retry.run(self.clock.as_ref(), "get_object", || {
            let response = self
                .agent
                .get(&url)
                .query("access_token", self.access_token.as_str())
                .query("fields", fields)
                .call()
                .map_err(transport)?;
            read_response(response)
        })
    }

    fn post_multipart(
        &self,
        operation: &str,
        url: &str,
        fields: &[(&str, &str)],
        image: &Path,
    ) -> Result<Value, SocialError> {
        let bytes = std::fs::read(image).map_err(|source| SocialError::Io {
            path: image.to_path_buf(),
            source,
        })?;
        let file_name = image
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("frame");
        let boundary = format!(
            "framebot-{:x}-{:x}",
            self.clock.now().timestamp_micros(),
            std::process::id()
        );
        let body = multipart_body(&boundary, fields, "source", file_name, &bytes);
        let content_type = format!("multipart/form-data; boundary={boundary}");
        tracing::debug!(%url, bytes = body.len(), "graph multipart post");
        self.retry.run(self.clock.as_ref(), operation, || {
            let response = self
                .agent
                .post(url)
                .query("access_token", self.access_token.as_str())
                .header("Content-Type", content_type.as_str())
                .send(&body[..])
                .map_err(transport)?;
            read_response(response)
        })
    }

    fn fetch_reactions(&self, object_id: &str) -> Result<u64, SocialError> {
        let value = self.get_object(object_id, REACTIONS_FIELDS)?;
        parse_reaction_count(&value)
    }
}

impl SocialClient for GraphClient {
    fn post_photo(
        &self,
        image: &Path,
        caption: &str,
        target: Option<&str>,
    ) -> Result<PostedPhoto, SocialError> {
        let target = target.unwrap_or(self.page.id.as_str());
        let url = self.url(target, Some("photos"));
        let value = self.post_multipart("post_photo", &url, &[("message", caption)], image)?;
        parse_posted_photo(&value)
    }

    fn post_comment(
        &self,
        target: &str,
        caption: Option<&str>,
        image: Option<&Path>,
    ) -> Result<String, SocialError> {
        // The API rejects an empty message outright.
        let caption = caption.filter(|caption| !caption.is_empty());
        let url = self.url(target, Some("comments"));
        let value = match (caption, image) {
            (None, None) => {
                return Err(SocialError::InvalidRequest(
                    "a comment needs a caption or an image".to_string(),
                ))
            }
            (caption, Some(image)) => {
                let fields: Vec<(&str, &str)> =
                    caption.map(|caption| ("message", caption)).into_iter().collect();
                self.post_multipart("post_comment", &url, &fields, image)?
            }
            (Some(caption), None) => self.retry.run(self.clock.as_ref(), "post_comment", || {
                let response = self
                    .agent
                    .post(&url)
                    .query("access_token", self.access_token.as_str())
                    .send_form([("message", caption)])
                    .map_err(transport)?;
                read_response(response)
            })?,
        };
        string_field(&value, "id")
    }

    fn reaction_count(&self, post_id: &str) -> Result<u64, SocialError> {
        reactions_with_story_fallback(
            post_id,
            |object_id| self.fetch_reactions(object_id),
            |object_id| {
                let story = self.get_object(object_id, STORY_ID_FIELD)?;
                string_field(&story, STORY_ID_FIELD)
            },
        )
    }
}

/// Fetch reactions for `post_id`, retrying once through its story id.
///
/// Queues written by older versions hold photo ids, which have no reactions
/// edge and fail with code 100.
fn reactions_with_story_fallback(
    post_id: &str,
    mut fetch: impl FnMut(&str) -> Result<u64, SocialError>,
    story_id: impl FnOnce(&str) -> Result<String, SocialError>,
) -> Result<u64, SocialError> {
    match fetch(post_id) {
        Err(err) if err.graph_code() == Some(NONEXISTING_FIELD_CODE) => {
            tracing::warn!(
                post_id,
                "reactions requested with a photo id instead of a post id; resolving the story id"
            );
            let story_id = story_id(post_id)?;
            fetch(&story_id)
        }
        other => other,
    }
}

fn transport(err: ureq::Error) -> SocialError {
    SocialError::Transport(err.to_string())
}

fn read_response(mut response: ureq::http::Response<ureq::Body>) -> Result<Value, SocialError> {
    let status = response.status().as_u16();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|err| SocialError::Transport(err.to_string()))?;
    parse_graph_response(status, &body)
}

/// Map a raw Graph response onto a JSON value or a typed error.
fn parse_graph_response(status: u16, body: &str) -> Result<Value, SocialError> {
    if (200..300).contains(&status) {
        return serde_json::from_str(body)
            .map_err(|err| SocialError::Decode(format!("response JSON failed to parse: {err}")));
    }
    match serde_json::from_str::<GraphErrorEnvelope>(body) {
        Ok(GraphErrorEnvelope { error }) if error.code == AUTH_EXPIRED_CODE => {
            Err(SocialError::AuthExpired {
                code: error.code,
                message: error.message,
            })
        }
        Ok(GraphErrorEnvelope { error }) => Err(SocialError::Api {
            status,
            code: error.code,
            subcode: error.error_subcode,
            message: error.message,
            transient: error.is_transient,
        }),
        Err(_) => Err(SocialError::Http {
            status,
            body: truncate(body, MAX_ERROR_BODY_BYTES),
        }),
    }
}

fn parse_posted_photo(value: &Value) -> Result<PostedPhoto, SocialError> {
    let photo_id = string_field(value, "id")?;
    let post_id = match value.get("post_id").and_then(Value::as_str) {
        Some(post_id) => post_id.to_string(),
        None => {
            tracing::debug!(%photo_id, "photo response has no post_id; using the photo id");
            photo_id.clone()
        }
    };
    Ok(PostedPhoto { photo_id, post_id })
}

fn parse_reaction_count(value: &Value) -> Result<u64, SocialError> {
    value
        .pointer("/reactions/summary/total_count")
        .and_then(Value::as_u64)
        .ok_or_else(|| SocialError::Decode("missing reactions.summary.total_count".to_string()))
}

fn string_field(value: &Value, field: &str) -> Result<String, SocialError> {
    match value.get(field) {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(Value::Number(number)) => Ok(number.to_string()),
        _ => Err(SocialError::Decode(format!("missing field {field:?}"))),
    }
}

fn truncate(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

fn content_type_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Percent-encode the characters that would end a quoted header parameter,
/// the way browsers encode form-data names.
fn header_param(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn multipart_body(
    boundary: &str,
    fields: &[(&str, &str)],
    file_field: &str,
    file_name: &str,
    bytes: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + 512);
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{value}\r\n",
                header_param(name)
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
             Content-Type: {}\r\n\r\n",
            header_param(file_field),
            header_param(file_name),
            content_type_for(file_name)
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}
