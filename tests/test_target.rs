//! Tests for upstream target resolution

use harmonia_relay::relay::RelayError;
use harmonia_relay::relay::target::{FORWARDED_PARAMS, TargetSpec, check_host};
use std::collections::HashMap;

const BASE: &str = "https://music-api.gdstudio.xyz/api.php";

fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_direct_mode_takes_url_verbatim() {
    let target = TargetSpec::resolve(
        &query(&[("url", "https://example.com/data.json"), ("id", "9")]),
        BASE,
    );

    assert_eq!(target, TargetSpec::Direct("https://example.com/data.json".to_string()));
    assert_eq!(target.mode(), "direct");
    assert_eq!(target.to_url().unwrap().as_str(), "https://example.com/data.json");
}

#[test]
fn test_empty_url_falls_back_to_mapped() {
    let target = TargetSpec::resolve(&query(&[("url", ""), ("id", "9")]), BASE);

    assert_eq!(
        target,
        TargetSpec::Mapped {
            base: BASE.to_string(),
            params: vec![("id".to_string(), "9".to_string())],
        }
    );
}

#[test]
fn test_mapped_mode_filters_unknown_params() {
    let target = TargetSpec::resolve(
        &query(&[("source", "netease"), ("id", "123"), ("bogus", "ignored")]),
        BASE,
    );

    let url = target.to_url().unwrap();
    let query = url.query().unwrap();

    assert_eq!(target.mode(), "mapped");
    assert_eq!(url.host_str(), Some("music-api.gdstudio.xyz"));
    assert_eq!(url.path(), "/api.php");
    assert!(query.contains("source=netease&id=123"));
    assert!(!query.contains("bogus"));
}

#[test]
fn test_mapped_mode_omits_absent_and_empty_params() {
    let target = TargetSpec::resolve(&query(&[("types", "search"), ("name", "")]), BASE);

    let url = target.to_url().unwrap();
    assert_eq!(url.query(), Some("types=search"));
}

#[test]
fn test_mapped_mode_forwards_every_whitelisted_param() {
    let pairs: Vec<(&str, &str)> = FORWARDED_PARAMS.iter().map(|&n| (n, "v")).collect();
    let target = TargetSpec::resolve(&query(&pairs), BASE);

    let url = target.to_url().unwrap();
    let forwarded: Vec<String> = url.query_pairs().map(|(k, _)| k.into_owned()).collect();

    assert_eq!(forwarded, FORWARDED_PARAMS.map(str::to_string).to_vec());
}

#[test]
fn test_mapped_mode_keeps_names_and_values() {
    let target = TargetSpec::resolve(
        &query(&[("pages", "2"), ("name", "周杰伦 稻香"), ("br", "320")]),
        BASE,
    );

    let url = target.to_url().unwrap();
    let pairs: HashMap<String, String> = url.query_pairs().into_owned().collect();

    assert_eq!(pairs.get("pages").map(String::as_str), Some("2"));
    assert_eq!(pairs.get("name").map(String::as_str), Some("周杰伦 稻香"));
    assert_eq!(pairs.get("br").map(String::as_str), Some("320"));
}

#[test]
fn test_direct_mode_invalid_url_is_error() {
    let target = TargetSpec::resolve(&query(&[("url", "not a url")]), BASE);

    let err = target.to_url().unwrap_err();
    assert!(matches!(err, RelayError::InvalidTarget { .. }));
    assert!(err.to_string().starts_with("Invalid URL: not a url"));
}

#[test]
fn test_check_host_empty_allow_list_permits_all() {
    let url = url::Url::parse("https://anything.example/x").unwrap();

    assert!(check_host(&url, &[]).is_ok());
}

#[test]
fn test_check_host_allow_list() {
    let allowed = vec!["music-api.gdstudio.xyz".to_string()];
    let ok = url::Url::parse("https://MUSIC-API.gdstudio.xyz/api.php").unwrap();
    let denied = url::Url::parse("http://169.254.169.254/latest").unwrap();

    assert!(check_host(&ok, &allowed).is_ok());
    assert_eq!(
        check_host(&denied, &allowed),
        Err(RelayError::HostNotAllowed("169.254.169.254".to_string()))
    );
}
