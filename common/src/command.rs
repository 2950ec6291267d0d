//! Vendor command catalog and hex frame codec.
//!
//! Frames are fixed byte sequences written here exactly as the vendor
//! documents them, as whitespace-separated hex pairs. They are immutable;
//! everything downstream works on the encoded bytes.

use crate::types::InputSource;
use crate::{Error, Result};

pub const POWER_ON: &str = "06 14 00 04 00 34 11 00 00 5D";
pub const POWER_OFF: &str = "06 14 00 04 00 34 11 01 00 5E";

pub const INPUT_HDMI_1: &str = "06 14 00 04 00 34 13 01 03 63";
pub const INPUT_HDMI_2: &str = "06 14 00 04 00 34 13 01 07 67";
pub const INPUT_HDMI_3: &str = "06 14 00 04 00 34 13 01 09 69";
pub const INPUT_VGA: &str = "06 14 00 04 00 34 13 01 00 60";
pub const INPUT_DVI: &str = "06 14 00 04 00 34 13 01 0A 6A";
pub const INPUT_COMPONENT: &str = "06 14 00 04 00 34 13 01 0B 6B";
pub const INPUT_USB_C: &str = "06 14 00 04 00 34 13 01 0F 6F";
pub const INPUT_SVIDEO: &str = "06 14 00 04 00 34 13 01 06 66";

pub const GET_TEMPERATURE: &str = "07 14 00 05 00 34 00 00 15 03 65";
pub const GET_LAMP_HOURS: &str = "07 14 00 05 00 34 00 00 15 01 63";

pub const QUERY_POWER_STATUS: &str = "07 14 00 05 00 34 00 00 11 00 5E";
pub const QUERY_INPUT_STATUS: &str = "07 14 00 05 00 34 00 00 13 01 61";

const CATALOG: &[(&str, &str)] = &[
    ("POWER_ON", POWER_ON),
    ("POWER_OFF", POWER_OFF),
    ("INPUT_HDMI_1", INPUT_HDMI_1),
    ("INPUT_HDMI_2", INPUT_HDMI_2),
    ("INPUT_HDMI_3", INPUT_HDMI_3),
    ("INPUT_VGA", INPUT_VGA),
    ("INPUT_DVI", INPUT_DVI),
    ("INPUT_COMPONENT", INPUT_COMPONENT),
    ("INPUT_USB_C", INPUT_USB_C),
    ("INPUT_SVIDEO", INPUT_SVIDEO),
    ("GET_TEMPERATURE", GET_TEMPERATURE),
    ("GET_LAMP_HOURS", GET_LAMP_HOURS),
    ("QUERY_POWER_STATUS", QUERY_POWER_STATUS),
    ("QUERY_INPUT_STATUS", QUERY_INPUT_STATUS),
];

/// Looks up a catalog frame by its symbolic name.
pub fn by_name(name: &str) -> Option<&'static str> {
    CATALOG
        .iter()
        .find(|(catalog_name, _)| *catalog_name == name)
        .map(|(_, frame)| *frame)
}

/// Resolves a frame back to its catalog name, when it is a known command.
pub fn name_of(frame: &str) -> Option<&'static str> {
    let compact = strip_whitespace(frame).to_ascii_uppercase();
    CATALOG
        .iter()
        .find(|(_, catalog_frame)| strip_whitespace(catalog_frame) == compact)
        .map(|(name, _)| *name)
}

/// Frame for switching a projector to the named input. An unrecognized
/// name yields an empty frame, which encodes to a zero-byte send.
pub fn set_input(input: &str) -> &'static str {
    match InputSource::from_name(input) {
        Some(InputSource::Hdmi1) => INPUT_HDMI_1,
        Some(InputSource::Hdmi2) => INPUT_HDMI_2,
        Some(InputSource::Hdmi3) => INPUT_HDMI_3,
        Some(InputSource::Vga) => INPUT_VGA,
        Some(InputSource::Dvi) => INPUT_DVI,
        Some(InputSource::Component) => INPUT_COMPONENT,
        Some(InputSource::UsbC) => INPUT_USB_C,
        Some(InputSource::SVideo) => INPUT_SVIDEO,
        None => "",
    }
}

/// Converts a whitespace-separated hex frame into raw bytes.
pub fn encode_frame(frame: &str) -> Result<Vec<u8>> {
    hex::decode(strip_whitespace(frame))
        .map_err(|err| Error::Decode(format!("invalid hex frame: {err}")))
}

/// Renders raw device bytes in the hex form the decoders accept.
pub fn format_frame(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

fn strip_whitespace(frame: &str) -> String {
    frame
        .chars()
        .filter(|character| !character.is_ascii_whitespace())
        .collect()
}
