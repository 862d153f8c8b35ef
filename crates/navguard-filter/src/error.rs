//! Filter error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Rule `{identifier}` could not be compiled: {reason}")]
    RuleCompilation { identifier: String, reason: String },

    #[error("Invalid URL `{url}`: {source}")]
    UrlParse {
        url: String,
        #[source]
        source: url::ParseError,
    },
}
