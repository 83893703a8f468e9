//! Fuzz target: inbound command decoding
//!
//! Splits the input at the first NUL into a command name and a JSON
//! parameter document, then runs name lookup, parameter decoding and
//! admission.  None of these may panic on any input.
//!
//! cargo fuzz run fuzz_command_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use thermalctl::app::commands::{Command, CommandName, Request};

fuzz_target!(|data: &[u8]| {
    let (name, params) = match data.iter().position(|&b| b == 0) {
        Some(i) => (&data[..i], &data[i + 1..]),
        None => (data, &[][..]),
    };

    let Ok(name) = std::str::from_utf8(name) else {
        return;
    };
    let Ok(name) = CommandName::parse(name) else {
        return;
    };
    let params = serde_json::from_slice(params).unwrap_or(serde_json::Value::Null);

    match Request::decode(name, &params) {
        Ok(Request::Command(kind)) => {
            assert_eq!(kind.command_name(), Some(name));
            if let Err(rejected) = Command::detached(kind).admit() {
                assert_eq!(rejected.acknowledge().code(), 103);
            }
        }
        Ok(Request::SetLogLevel { .. }) => assert_eq!(name, CommandName::SetLogLevel),
        Err(e) => assert_eq!(e.code(), 102),
    }
});
