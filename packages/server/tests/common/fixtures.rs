//! Test fixtures shared by the integration tests

pub const USER_ID: &str = "user-1";
pub const PHONE: &str = "+5561999999999";
pub const VALID_CPF: &str = "52998224725";
pub const REPEATED_DIGIT_CPF: &str = "11111111111";

/// A few bytes that pass for a JPEG
pub fn jpeg(tag: &str) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.extend_from_slice(tag.as_bytes());
    bytes
}

/// Minimal multipart/form-data body builder
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self {
            boundary: "verification-test-boundary".to_string(),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}.jpg\"\r\nContent-Type: {}\r\n\r\n",
                self.boundary, name, name, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Every field the document endpoint requires
    pub fn complete(session_id: &str) -> Self {
        Self::new()
            .text("userId", USER_ID)
            .text("sessionId", session_id)
            .text("cpf", VALID_CPF)
            .file("documentFront", "image/jpeg", &jpeg("front"))
            .file("documentBack", "image/jpeg", &jpeg("back"))
            .file("selfie", "image/jpeg", &jpeg("selfie"))
    }

    /// Content-Type header value and body bytes
    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.body,
        )
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}
