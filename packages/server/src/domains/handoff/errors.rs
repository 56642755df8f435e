use thiserror::Error;

use crate::common::CpfError;

#[derive(Error, Debug)]
pub enum HandoffError {
    #[error("User id is required")]
    MissingUserId,

    #[error("Invalid CPF: {0}")]
    InvalidCpf(#[from] CpfError),

    #[error("No public base URL configured and no request origin available")]
    NoBaseUrl,

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Failed to render QR code: {0}")]
    QrEncoding(String),

    #[error("Invalid verification link: {0}")]
    InvalidLink(String),
}
