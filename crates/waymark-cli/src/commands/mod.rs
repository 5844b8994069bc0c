//! Command implementations and the helpers they share.

pub mod details;
pub mod ids;
pub mod summary;
pub mod validate;

use tracing::warn;
use waymark_core::{FetchError, FilterNode, FilterParser};

/// Parse an optional filter argument.
pub fn parse_filter_arg(query: Option<&str>, strict: bool) -> anyhow::Result<Option<FilterNode>> {
    let Some(query) = query else {
        return Ok(None);
    };

    let parser = if strict {
        FilterParser::strict()
    } else {
        FilterParser::new()
    };

    match parser.parse(query) {
        Ok(node) => Ok(node),
        Err(e) if e.is_filter_error() => {
            Err(anyhow::Error::new(e).context(format!("invalid filter '{}'", query)))
        }
        Err(e) => Err(e.into()),
    }
}

/// Keep whatever a fetch produced; a partial failure is logged, not fatal.
pub fn accept_partial<T>(result: Result<Vec<T>, FetchError<T>>) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(err) => {
            let (partial, error) = err.into_parts();
            warn!(error = %error, results = partial.len(), "Showing partial results");
            partial
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waymark_core::GuidanceError;

    #[test]
    fn test_parse_filter_arg() {
        assert!(parse_filter_arg(None, true).unwrap().is_none());
        assert!(parse_filter_arg(Some("  "), false).unwrap().is_none());
        assert!(parse_filter_arg(Some("tier:must"), true).unwrap().is_some());

        assert!(parse_filter_arg(Some("priority:high"), false).unwrap().is_some());
        assert!(parse_filter_arg(Some("priority:high"), true).is_err());
        assert!(parse_filter_arg(Some("tier:must AND"), false).is_err());
    }

    #[test]
    fn test_parse_filter_arg_names_the_query() {
        let err = parse_filter_arg(Some("tier:must AND"), false).unwrap_err();
        assert_eq!(err.to_string(), "invalid filter 'tier:must AND'");
        let cause = err.downcast_ref::<GuidanceError>().unwrap();
        assert!(cause.is_filter_error());

        let err = parse_filter_arg(Some("priority:high"), true).unwrap_err();
        assert!(format!("{:#}", err).contains("priority"));
    }

    #[test]
    fn test_accept_partial() {
        assert_eq!(accept_partial::<u8>(Ok(vec![1, 2])), vec![1, 2]);

        let failed = FetchError::new(vec![3], GuidanceError::NotInitialized);
        assert_eq!(accept_partial(Err(failed)), vec![3]);
    }
}
