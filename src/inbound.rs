//! Normalizes a raw Twilio webhook delivery into an inbound message event.

use std::collections::HashMap;

/// One attached media item: where to fetch it and which file extension the
/// declared content type maps to.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaItem {
    pub url: String,
    pub extension: &'static str,
}

/// A normalized inbound message: sender id, message text and attachments.
#[derive(Clone, Debug, PartialEq)]
pub struct IncomingMessage {
    pub from: String,
    pub body: String,
    pub media: Vec<MediaItem>,
}

/// Map a declared media content type to a local file extension. JPEG-family
/// types become `.jpg`; everything else defaults to `.png`.
fn extension_for(content_type: &str) -> &'static str {
    if content_type.contains("jpeg") {
        ".jpg"
    } else {
        ".png"
    }
}

/// Build an `IncomingMessage` from the webhook form fields.
///
/// Returns `None` when the delivery has no sender id. Body text is kept
/// verbatim; trimming and case folding happen at command comparison.
pub fn normalize(form: &HashMap<String, String>) -> Option<IncomingMessage> {
    let from = form.get("From")?.clone();
    if from.is_empty() {
        return None;
    }
    let body = form.get("Body").cloned().unwrap_or_default();

    let num_media = form
        .get("NumMedia")
        .and_then(|n| n.parse::<usize>().ok())
        .unwrap_or(0);

    let mut media = Vec::with_capacity(num_media);
    for i in 0..num_media {
        let Some(url) = form.get(&format!("MediaUrl{i}")) else {
            continue;
        };
        let content_type = form
            .get(&format!("MediaContentType{i}"))
            .map(String::as_str)
            .unwrap_or_default();
        media.push(MediaItem {
            url: url.clone(),
            extension: extension_for(content_type),
        });
    }

    Some(IncomingMessage { from, body, media })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_normalize_text_only() {
        let msg = normalize(&form(&[
            ("From", "whatsapp:+15551234567"),
            ("Body", "  /add  "),
            ("NumMedia", "0"),
        ]))
        .unwrap();

        assert_eq!(msg.from, "whatsapp:+15551234567");
        assert_eq!(msg.body, "  /add  ");
        assert!(msg.media.is_empty());
    }

    #[test]
    fn test_normalize_with_media() {
        let msg = normalize(&form(&[
            ("From", "whatsapp:+15551234567"),
            ("Body", ""),
            ("NumMedia", "2"),
            ("MediaUrl0", "https://api.twilio.com/media/0"),
            ("MediaContentType0", "image/jpeg"),
            ("MediaUrl1", "https://api.twilio.com/media/1"),
            ("MediaContentType1", "image/png"),
        ]))
        .unwrap();

        assert_eq!(msg.media.len(), 2);
        assert_eq!(msg.media[0].extension, ".jpg");
        assert_eq!(msg.media[1].extension, ".png");
    }

    #[test]
    fn test_normalize_unknown_content_type_defaults_to_png() {
        let msg = normalize(&form(&[
            ("From", "whatsapp:+15551234567"),
            ("NumMedia", "1"),
            ("MediaUrl0", "https://api.twilio.com/media/0"),
            ("MediaContentType0", "image/webp"),
        ]))
        .unwrap();

        assert_eq!(msg.media[0].extension, ".png");
    }

    #[test]
    fn test_normalize_without_sender_is_dropped() {
        assert!(normalize(&form(&[("Body", "hello")])).is_none());
        assert!(normalize(&form(&[("From", ""), ("Body", "hello")])).is_none());
    }

    #[test]
    fn test_normalize_garbage_num_media() {
        let msg = normalize(&form(&[
            ("From", "whatsapp:+15551234567"),
            ("Body", "hi"),
            ("NumMedia", "lots"),
        ]))
        .unwrap();
        assert!(msg.media.is_empty());
    }

    #[test]
    fn test_normalize_skips_missing_media_urls() {
        // NumMedia claims two attachments but only one URL is present.
        let msg = normalize(&form(&[
            ("From", "whatsapp:+15551234567"),
            ("NumMedia", "2"),
            ("MediaUrl0", "https://api.twilio.com/media/0"),
            ("MediaContentType0", "image/jpeg"),
        ]))
        .unwrap();
        assert_eq!(msg.media.len(), 1);
    }
}
