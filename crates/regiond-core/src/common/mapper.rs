//! Translation of store matches into per-protocol responses.
//!
//! Every function here is pure: no I/O, no metrics, no logging.
//!
//! | matches              | gRPC (`IsoCode`)     | HTTP (`FullAttributes`)  |
//! |----------------------|----------------------|--------------------------|
//! | empty                | `{"code":"unknown"}` | `{"name":"unknown"}`     |
//! | first lacks `"iso"`  | `{"code":"unknown"}` | first match's attributes |
//! | first has `"iso"`    | `{"code":<iso>}`     | first match's attributes |

use crate::{
    proto::RegionResponse,
    types::{Attributes, ISO_KEY, LookupOutcome, MatchPolicy, RegionMatch, UNKNOWN},
};

/// Key used in the HTTP body when no region matched.
pub const UNKNOWN_NAME_KEY: &str = "name";

/// Reduces the store's matches to an outcome under `policy`. Only the first
/// match is considered.
pub fn resolve(policy: MatchPolicy, matches: Vec<RegionMatch>) -> LookupOutcome {
    let Some(first) = matches.into_iter().next() else {
        return LookupOutcome::Unknown;
    };

    match policy {
        MatchPolicy::IsoCode if !first.attributes.contains_key(ISO_KEY) => LookupOutcome::Unknown,
        MatchPolicy::IsoCode | MatchPolicy::FullAttributes => {
            LookupOutcome::Found(first.attributes)
        }
    }
}

/// Fields of the HTTP JSON body for `outcome`.
pub fn json_fields(outcome: LookupOutcome) -> Attributes {
    match outcome {
        LookupOutcome::Found(attributes) => attributes,
        LookupOutcome::Unknown => {
            Attributes::from([(UNKNOWN_NAME_KEY.to_string(), UNKNOWN.to_string())])
        }
    }
}

impl From<LookupOutcome> for RegionResponse {
    fn from(outcome: LookupOutcome) -> Self {
        let code = match outcome {
            LookupOutcome::Found(mut attributes) => attributes
                .remove(ISO_KEY)
                .unwrap_or_else(|| UNKNOWN.to_string()),
            LookupOutcome::Unknown => UNKNOWN.to_string(),
        };
        Self { code }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn france() -> RegionMatch {
        RegionMatch::from_iter([("iso", "FR"), ("name", "France")])
    }

    fn unnamed_sea() -> RegionMatch {
        RegionMatch::from_iter([("name", "Mer Méditerranée")])
    }

    #[test]
    fn empty_matches_are_unknown_for_both_protocols() {
        let rpc = resolve(MatchPolicy::IsoCode, vec![]);
        let http = resolve(MatchPolicy::FullAttributes, vec![]);

        assert_eq!(RegionResponse::from(rpc).code, "unknown");
        assert_eq!(
            json_fields(http),
            Attributes::from([("name".to_string(), "unknown".to_string())])
        );
    }

    #[test]
    fn missing_iso_is_unknown_over_rpc_but_found_over_http() {
        let rpc = resolve(MatchPolicy::IsoCode, vec![unnamed_sea()]);
        let http = resolve(MatchPolicy::FullAttributes, vec![unnamed_sea()]);

        assert_eq!(rpc, LookupOutcome::Unknown);
        assert_eq!(RegionResponse::from(rpc).code, "unknown");
        assert_eq!(json_fields(http), unnamed_sea().attributes);
    }

    #[test]
    fn iso_code_is_reported_over_rpc() {
        let outcome = resolve(MatchPolicy::IsoCode, vec![france()]);
        assert!(outcome.is_found());
        assert_eq!(RegionResponse::from(outcome).code, "FR");
    }

    #[test]
    fn http_reports_every_attribute_of_first_match() {
        let outcome = resolve(MatchPolicy::FullAttributes, vec![france()]);
        assert_eq!(json_fields(outcome), france().attributes);
    }

    #[test]
    fn only_the_first_match_is_authoritative() {
        let rpc = resolve(MatchPolicy::IsoCode, vec![unnamed_sea(), france()]);
        assert_eq!(rpc, LookupOutcome::Unknown);

        let http = resolve(MatchPolicy::FullAttributes, vec![france(), unnamed_sea()]);
        assert_eq!(json_fields(http).get("iso").map(String::as_str), Some("FR"));
    }

    #[test]
    fn found_without_iso_still_renders_unknown_code() {
        let response = RegionResponse::from(LookupOutcome::Found(unnamed_sea().attributes));
        assert_eq!(response.code, "unknown");
    }
}
