//! Fuzz target: `StatusResponse::parse`
//!
//! Interprets the input as little-endian response words.  Parsing must
//! never panic, and an accepted five-word response must re-encode to the
//! same words.
//!
//! cargo fuzz run fuzz_status_response

#![no_main]

use libfuzzer_sys::fuzz_target;
use thermalctl::ilc::{RESPONSE_WORDS, StatusResponse};

fuzz_target!(|data: &[u8]| {
    let words: Vec<u16> = data
        .chunks_exact(2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .collect();

    match StatusResponse::parse(&words) {
        Ok(response) => {
            assert_eq!(words.len(), RESPONSE_WORDS);
            assert_eq!(response.to_words().as_slice(), words.as_slice());
        }
        Err(_) => {
            assert!(words.len() != RESPONSE_WORDS || words[0] > u16::from(u8::MAX));
        }
    }
});
