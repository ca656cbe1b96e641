//! 分享解析错误

use thiserror::Error;

/// 解析分享链接过程中的错误
///
/// 需要验证（errno 400141）不在这里，而是 [`super::ShareListing::VerificationRequired`]。
#[derive(Debug, Error)]
pub enum ShareError {
    #[error("Failed to extract authentication tokens")]
    MissingToken,

    #[error("Invalid URL format")]
    InvalidUrlFormat,

    #[error("{message}")]
    UpstreamApi { errno: i64, message: String },

    #[error("No files found in response")]
    NoFileList,

    #[error("Failed to fetch directory contents")]
    NoDirectoryList,

    #[error("{}", http_message(.status, .source))]
    Http {
        status: Option<u16>,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid upstream response: {0}")]
    Decode(#[from] serde_json::Error),
}

fn http_message(status: &Option<u16>, source: &reqwest::Error) -> String {
    match status {
        Some(code) => format!("HTTP error: {}", code),
        None => format!("HTTP error: {}", source),
    }
}

impl ShareError {
    /// 对外暴露的错误码：上游错误透传 errno，其余统一 -1
    pub fn errno(&self) -> i64 {
        match self {
            ShareError::UpstreamApi { errno, .. } => *errno,
            _ => -1,
        }
    }
}

impl From<reqwest::Error> for ShareError {
    fn from(err: reqwest::Error) -> Self {
        ShareError::Http {
            status: err.status().map(|s| s.as_u16()),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno() {
        let err = ShareError::UpstreamApi {
            errno: 2,
            message: "share expired".to_string(),
        };
        assert_eq!(err.errno(), 2);
        assert_eq!(err.to_string(), "share expired");

        assert_eq!(ShareError::MissingToken.errno(), -1);
        assert_eq!(ShareError::InvalidUrlFormat.errno(), -1);
        assert_eq!(ShareError::NoFileList.errno(), -1);
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ShareError::MissingToken.to_string(),
            "Failed to extract authentication tokens"
        );
        assert_eq!(ShareError::InvalidUrlFormat.to_string(), "Invalid URL format");

        let decode = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(ShareError::from(decode)
            .to_string()
            .starts_with("Invalid upstream response"));
    }
}
