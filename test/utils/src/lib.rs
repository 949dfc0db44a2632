use serde_json::json;

/// A 1x1 transparent PNG.
pub fn png_fixture() -> &'static str {
    return "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";
}

/// A second, different payload so tests can tell generated images apart.
pub fn jpeg_fixture() -> &'static str {
    return "/9j/4AAQSkZJRgABAQEASABIAAD/2wBDAP//////////////////////////////////////////////////////////////////////////////////////wgALCAABAAEBAREA/8QAFBABAAAAAAAAAAAAAAAAAAAAAP/aAAgBAQABPxA=";
}

/// Body of a Gemini `generateContent` response carrying a single inline image.
pub fn gemini_image_response(mime_type: &str, data: &str) -> String {
    return json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [
                    { "text": "Here is your redesigned garden." },
                    { "inlineData": { "mimeType": mime_type, "data": data } }
                ]
            },
            "finishReason": "STOP"
        }]
    })
    .to_string();
}

/// Body of a Gemini `generateContent` response carrying a single text part.
pub fn gemini_text_response(text: &str) -> String {
    return json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{ "text": text }]
            },
            "finishReason": "STOP"
        }]
    })
    .to_string();
}
