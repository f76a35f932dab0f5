#![no_main]

use libfuzzer_sys::fuzz_target;
use rumtk_serializers::delimited::{DelimitedConfig, DelimitedSerializer};
use rumtk_serializers::ncpdp::NCPDP;
use rumtk_serializers::x12::X12;
use rumtk_serializers::DataTypeSerializer;

fuzz_target!(|data: &[u8]| {
    let _ = X12.to_canonical_xml(data);
    let _ = NCPDP.to_canonical_xml(data);
    let delimited = DelimitedSerializer::new(DelimitedConfig::default());
    let _ = delimited.to_canonical_xml(data);
});
