//! Fuzz target: persisted `NodeConfig` blob (NVS load path)
//!
//! Feeds arbitrary bytes through the simulated NVS store and checks:
//! - No panics under any byte sequence
//! - `load` either fails cleanly or yields a config that validates
//! - Any config that loads survives a save/load cycle unchanged
//!
//! cargo fuzz run fuzz_config_blob

#![no_main]

use libfuzzer_sys::fuzz_target;
use thermolink::adapters::nvs::NvsAdapter;
use thermolink::app::ports::ConfigPort;

fuzz_target!(|data: &[u8]| {
    let Ok(nvs) = NvsAdapter::new() else {
        return;
    };
    nvs.sim_store_raw(data);

    let Ok(cfg) = nvs.load() else {
        return;
    };
    assert!(cfg.validate().is_ok());

    nvs.save(&cfg).unwrap();
    assert_eq!(nvs.load().unwrap(), cfg);

    // The blob format stays postcard.
    let bytes = postcard::to_allocvec(&cfg).unwrap();
    assert!(!bytes.is_empty());
});
