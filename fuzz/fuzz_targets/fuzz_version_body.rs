//! Fuzz target: `RemoteVersion::from_body` + `versions_match`
//!
//! Drives arbitrary version endpoint bodies through the parser and the
//! containment rule, asserting that neither panics, that accepted bodies
//! are kept verbatim, and that an empty remote never matches.
//!
//! cargo fuzz run fuzz_version_body

#![no_main]

use libfuzzer_sys::fuzz_target;
use ota_agent::config::LOCAL_VERSION;
use ota_agent::update::{MAX_VERSION_LEN, RemoteVersion, versions_match};

fuzz_target!(|data: &[u8]| {
    match RemoteVersion::from_body(data) {
        Ok(remote) => {
            assert_eq!(remote.as_str().as_bytes(), data, "body must be kept verbatim");
            assert!(remote.as_str().len() <= MAX_VERSION_LEN);
            let matched = versions_match(LOCAL_VERSION, &remote);
            if remote.is_empty() {
                assert!(!matched, "empty remote must never match");
            } else {
                assert_eq!(matched, LOCAL_VERSION.contains(remote.as_str()));
            }
        }
        Err(_) => {
            assert!(data.len() > MAX_VERSION_LEN || core::str::from_utf8(data).is_err());
        }
    }
});
