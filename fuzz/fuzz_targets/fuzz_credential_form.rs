//! Fuzz target: `parse_form`
//!
//! Arbitrary request bodies must either be rejected with a typed error or
//! yield a submission whose fields fit their bounds.
//!
//! cargo fuzz run fuzz_credential_form

#![no_main]

use clocksync::provisioning::parse_form;
use clocksync::settings::{MAX_CREDENTIAL_LEN, Settings};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(body) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(submission) = parse_form(body) {
        assert!(submission.ssid.len() <= MAX_CREDENTIAL_LEN);
        assert!(submission.passphrase.len() <= MAX_CREDENTIAL_LEN);
        if submission.validate().is_ok() {
            let settings = submission.into_settings(&Settings::default());
            assert!(settings.is_plausible());
        }
    }
});
