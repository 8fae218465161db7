use serde::Deserialize;

#[derive(Debug)]
pub enum Error {
    Http(reqwest::Error),
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },
    Decode(serde_json::Error),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e)
    }
}

impl Error {
    /// A wallet with no portfolio is reported by the venue as an error, not as
    /// an empty payload. The caller degrades to a zero-value default on this.
    pub fn is_no_portfolio(&self) -> bool {
        matches!(self, Error::Api { message, .. } if message.contains("No portfolio was found"))
    }
}

/// Error envelope of non-2xx responses.
#[derive(Deserialize, Debug)]
pub struct ApiError {
    pub error: ApiErrorBody,
}

#[derive(Deserialize, Debug)]
pub struct ApiErrorBody {
    pub code: Option<String>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_missing_portfolio() {
        let e = Error::Api {
            status: 404,
            code: None,
            message: "No portfolio was found for address 0xabc".to_owned(),
        };
        assert!(e.is_no_portfolio());
    }

    #[test]
    fn other_errors_are_not_missing_portfolio() {
        let e = Error::Api {
            status: 500,
            code: Some("internal".to_owned()),
            message: "upstream oracle timeout".to_owned(),
        };
        assert!(!e.is_no_portfolio());
    }
}
