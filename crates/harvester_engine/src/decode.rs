//! JSON decoding of the three API response shapes the harvester consumes.
use std::collections::BTreeMap;

use harvester_core::{Batch, Continuation, PageLinks};
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed api response: {message}")]
    Malformed { message: String },
}

/// The `error` object of an API-level failure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    #[serde(default)]
    pub info: Option<String>,
}

/// A decoded pagination response: either a batch or an API-level error.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchReply {
    Batch(Batch),
    ApiError(ApiErrorBody),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenReply {
    Token(String),
    /// The response had no usable `query.tokens.logintoken`; carries a short
    /// description of what came back instead.
    Missing(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginReply {
    /// The `login` object, with its result code verbatim.
    Result {
        result: String,
        reason: Option<String>,
    },
    ApiError(ApiErrorBody),
    /// Neither a `login` nor an `error` object was present.
    Unexpected(String),
}

#[derive(Deserialize)]
struct TokenEnvelope {
    #[serde(default)]
    query: Option<TokenQuery>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
struct TokenQuery {
    #[serde(default)]
    tokens: Option<Tokens>,
}

#[derive(Deserialize)]
struct Tokens {
    #[serde(default)]
    logintoken: Option<String>,
}

#[derive(Deserialize)]
struct LoginEnvelope {
    #[serde(default)]
    login: Option<LoginBody>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
struct LoginBody {
    result: String,
    #[serde(default)]
    reason: Option<ReasonText>,
}

// Older servers send `reason` as a string, newer ones as `{code, text}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ReasonText {
    Plain(String),
    Structured {
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        text: Option<String>,
    },
}

impl ReasonText {
    fn into_text(self) -> Option<String> {
        match self {
            ReasonText::Plain(text) => Some(text),
            ReasonText::Structured { code, text } => text.or(code),
        }
    }
}

#[derive(Deserialize)]
struct BatchEnvelope {
    #[serde(default)]
    query: Option<BatchQuery>,
    #[serde(default, rename = "continue")]
    continuation: Option<Continuation>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
struct BatchQuery {
    #[serde(default)]
    pages: Option<WirePages>,
}

// `formatversion=1` keys pages by id; `formatversion=2` sends a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum WirePages {
    Keyed(BTreeMap<String, WirePage>),
    Listed(Vec<WirePage>),
}

#[derive(Deserialize)]
struct WirePage {
    #[serde(default)]
    pageid: Option<i64>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    extlinks: Vec<WireLink>,
}

#[derive(Deserialize)]
struct WireLink {
    #[serde(default, rename = "*", alias = "url")]
    url: Option<String>,
}

fn parse<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DecodeError> {
    serde_json::from_slice(bytes).map_err(|err| DecodeError::Malformed {
        message: err.to_string(),
    })
}

pub fn decode_token(bytes: &[u8]) -> Result<TokenReply, DecodeError> {
    let envelope: TokenEnvelope = parse(bytes)?;
    let token = envelope
        .query
        .and_then(|query| query.tokens)
        .and_then(|tokens| tokens.logintoken)
        .filter(|token| !token.is_empty());

    Ok(match (token, envelope.error) {
        (Some(token), _) => TokenReply::Token(token),
        (None, Some(error)) => TokenReply::Missing(format!("api error {}", error.code)),
        (None, None) => TokenReply::Missing("no logintoken in response".to_string()),
    })
}

pub fn decode_login(bytes: &[u8]) -> Result<LoginReply, DecodeError> {
    let envelope: LoginEnvelope = parse(bytes)?;
    Ok(match (envelope.login, envelope.error) {
        (Some(login), _) => LoginReply::Result {
            result: login.result,
            reason: login.reason.and_then(ReasonText::into_text),
        },
        (None, Some(error)) => LoginReply::ApiError(error),
        (None, None) => LoginReply::Unexpected(String::from_utf8_lossy(bytes).into_owned()),
    })
}

pub fn decode_batch(bytes: &[u8]) -> Result<BatchReply, DecodeError> {
    let envelope: BatchEnvelope = parse(bytes)?;
    if let Some(error) = envelope.error {
        return Ok(BatchReply::ApiError(error));
    }

    let wire_pages = envelope.query.and_then(|query| query.pages);
    let pages = match wire_pages {
        None => Vec::new(),
        Some(WirePages::Keyed(map)) => map
            .into_iter()
            .map(|(id, page)| page.into_links(id))
            .collect(),
        Some(WirePages::Listed(list)) => list
            .into_iter()
            .map(|page| {
                let id = page.pageid.map(|id| id.to_string()).unwrap_or_default();
                page.into_links(id)
            })
            .collect(),
    };

    Ok(BatchReply::Batch(Batch {
        pages,
        continuation: envelope.continuation,
    }))
}

impl WirePage {
    fn into_links(self, page_id: String) -> PageLinks {
        PageLinks {
            page_id,
            title: self.title,
            links: self.extlinks.into_iter().filter_map(|link| link.url).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bytes(value: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn token_is_extracted() {
        let body = bytes(json!({"batchcomplete": "", "query": {"tokens": {"logintoken": "abc+\\"}}}));
        assert_eq!(decode_token(&body).unwrap(), TokenReply::Token("abc+\\".into()));
    }

    #[test]
    fn empty_token_counts_as_missing() {
        let body = bytes(json!({"query": {"tokens": {"logintoken": ""}}}));
        assert!(matches!(decode_token(&body).unwrap(), TokenReply::Missing(_)));
    }

    #[test]
    fn token_response_without_query_is_missing() {
        let body = bytes(json!({"error": {"code": "badvalue"}}));
        assert_eq!(
            decode_token(&body).unwrap(),
            TokenReply::Missing("api error badvalue".into())
        );
    }

    #[test]
    fn non_json_body_is_malformed() {
        assert!(matches!(
            decode_batch(b"<html>maintenance</html>"),
            Err(DecodeError::Malformed { .. })
        ));
    }

    #[test]
    fn login_reason_accepts_both_shapes() {
        let plain = bytes(json!({"login": {"result": "Failed", "reason": "Incorrect password"}}));
        let structured = bytes(json!({"login": {"result": "Failed", "reason": {"code": "wrongpassword", "text": "Incorrect password"}}}));
        for body in [plain, structured] {
            assert_eq!(
                decode_login(&body).unwrap(),
                LoginReply::Result {
                    result: "Failed".into(),
                    reason: Some("Incorrect password".into()),
                }
            );
        }
    }

    #[test]
    fn batch_with_keyed_pages_and_continuation() {
        let body = bytes(json!({
            "continue": {"gapcontinue": "Next_page", "continue": "gapcontinue||"},
            "query": {"pages": {
                "12": {"pageid": 12, "title": "A", "extlinks": [{"*": "https://x.org"}, {"*": "ftp://old"}]},
                "15": {"pageid": 15, "title": "B"}
            }}
        }));
        let BatchReply::Batch(batch) = decode_batch(&body).unwrap() else {
            panic!("expected batch");
        };
        assert_eq!(batch.pages.len(), 2);
        assert_eq!(batch.pages[0].page_id, "12");
        assert_eq!(batch.pages[0].links, vec!["https://x.org", "ftp://old"]);
        assert!(batch.pages[1].links.is_empty());
        let continuation = batch.continuation.unwrap();
        assert_eq!(continuation.fields()["gapcontinue"], json!("Next_page"));
    }

    #[test]
    fn batch_with_listed_pages() {
        let body = bytes(json!({
            "batchcomplete": true,
            "query": {"pages": [{"pageid": 3, "title": "C", "extlinks": [{"url": "http://y.org"}]}]}
        }));
        let BatchReply::Batch(batch) = decode_batch(&body).unwrap() else {
            panic!("expected batch");
        };
        assert_eq!(batch.pages[0].page_id, "3");
        assert_eq!(batch.pages[0].links, vec!["http://y.org"]);
        assert!(batch.continuation.is_none());
    }

    #[test]
    fn empty_wiki_yields_empty_batch() {
        let body = bytes(json!({"batchcomplete": ""}));
        assert_eq!(decode_batch(&body).unwrap(), BatchReply::Batch(Batch::default()));
    }

    #[test]
    fn api_error_takes_precedence() {
        let body = bytes(json!({"error": {"code": "readapidenied", "info": "You need read permission to use this module."}}));
        assert_eq!(
            decode_batch(&body).unwrap(),
            BatchReply::ApiError(ApiErrorBody {
                code: "readapidenied".into(),
                info: Some("You need read permission to use this module.".into()),
            })
        );
    }
}
